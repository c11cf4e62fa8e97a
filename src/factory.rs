//! Component factories.
//!
//! The InFactory holds two independent pools of pre-allocated slots
//! (incoming commands, incoming reports); the OutFactory holds one pool
//! of OutComponents.  `make` binds a kind descriptor looked up from the
//! sorted configuration tables, claims a slot, and stamps a fresh
//! monotonic instance identifier; `release` returns the slot and frees
//! any bound packet.  Pool exhaustion is non-fatal: the caller reports
//! it and drops the new work.

use crate::base::BaseCmp;
use crate::config::{Discriminant, FwAppConfig, InstanceId, ServSubType, ServType};
use crate::error::{AppErrCode, AppErrLatch, CmpKind};
use crate::incmd::InCommand;
use crate::inrep::InReport;
use crate::kinds::find_kind;
use crate::outcmp::OutComponent;
use crate::packet::{Pckt, PcktKind, PcktPool};
use log::debug;

/// Slots in the InFactory's command pool.
pub const MAX_IN_CMDS: usize = 8;
/// Slots in the InFactory's report pool.
pub const MAX_IN_REPS: usize = 8;
/// Slots in the OutFactory's component pool.
pub const MAX_OUT_CMPS: usize = 16;

/// Why a factory could not provide an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MakeErr {
    /// The kind triple is not in the configuration table.
    KindUnknown,
    /// Every pool slot is in use (or no packet could be allocated).
    PoolExhausted,
}

/// Handle to an InCommand slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InCmdHandle(pub(crate) usize);

/// Handle to an InReport slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InRepHandle(pub(crate) usize);

/// Handle to an OutComponent slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutCmpHandle(pub(crate) usize);

/// Either kind of incoming component, as held in a PCRL slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InCmpHandle {
    Cmd(InCmdHandle),
    Rep(InRepHandle),
}

// ---------------------------------------------------------------------------
// InFactory
// ---------------------------------------------------------------------------

/// Pools of pre-allocated InCommand and InReport instances.
pub struct InFactory {
    base: BaseCmp,
    cmds: [Option<InCommand>; MAX_IN_CMDS],
    reps: [Option<InReport>; MAX_IN_REPS],
    next_instance_id: InstanceId,
    n_alloc_cmds: usize,
    n_alloc_reps: usize,
}

impl InFactory {
    pub fn new() -> Self {
        Self {
            base: BaseCmp::new(CmpKind::InFactory, 0),
            cmds: core::array::from_fn(|_| None),
            reps: core::array::from_fn(|_| None),
            next_instance_id: 1,
            n_alloc_cmds: 0,
            n_alloc_reps: 0,
        }
    }

    pub fn base(&self) -> &BaseCmp {
        &self.base
    }

    pub fn init(&mut self) {
        if self.base.can_init() {
            self.base.mark_initialized();
        }
    }

    /// Release every held instance (and its packet) and return to a
    /// fresh configured state.  Instance identifiers stay monotonic
    /// across resets.
    pub fn configure(&mut self, pool: &mut PcktPool, err: &mut AppErrLatch) {
        if !self.base.can_configure() {
            return;
        }
        self.release_all(pool, err);
        self.base.mark_configured();
    }

    pub fn shutdown(&mut self, pool: &mut PcktPool, err: &mut AppErrLatch) {
        self.release_all(pool, err);
        self.base.mark_shutdown();
    }

    fn release_all(&mut self, pool: &mut PcktPool, err: &mut AppErrLatch) {
        for slot in &mut self.cmds {
            if let Some(cmd) = slot.take() {
                pool.release(cmd.pckt(), err);
            }
        }
        for slot in &mut self.reps {
            if let Some(rep) = slot.take() {
                pool.release(rep.pckt(), err);
            }
        }
        self.n_alloc_cmds = 0;
        self.n_alloc_reps = 0;
    }

    /// Claim an InCommand slot for a packet of the given kind.
    pub fn make_cmd(
        &mut self,
        t: ServType,
        st: ServSubType,
        d: Discriminant,
        pckt: Pckt,
        cfg: &'static FwAppConfig,
    ) -> Result<InCmdHandle, MakeErr> {
        let Some(kind_idx) = find_kind(cfg.in_cmd_kinds, t, st, d) else {
            return Err(MakeErr::KindUnknown);
        };
        let Some(free) = self.cmds.iter().position(Option::is_none) else {
            return Err(MakeErr::PoolExhausted);
        };
        let id = self.next_instance_id;
        self.next_instance_id += 1;
        self.cmds[free] = Some(InCommand::new(id, &cfg.in_cmd_kinds[kind_idx], pckt));
        self.n_alloc_cmds += 1;
        debug!("InFactory: InCommand {} for ({},{},{})", id, t, st, d);
        Ok(InCmdHandle(free))
    }

    /// Claim an InReport slot for a packet of the given kind.
    pub fn make_rep(
        &mut self,
        t: ServType,
        st: ServSubType,
        d: Discriminant,
        pckt: Pckt,
        cfg: &'static FwAppConfig,
    ) -> Result<InRepHandle, MakeErr> {
        let Some(kind_idx) = find_kind(cfg.in_rep_kinds, t, st, d) else {
            return Err(MakeErr::KindUnknown);
        };
        let Some(free) = self.reps.iter().position(Option::is_none) else {
            return Err(MakeErr::PoolExhausted);
        };
        let id = self.next_instance_id;
        self.next_instance_id += 1;
        self.reps[free] = Some(InReport::new(id, &cfg.in_rep_kinds[kind_idx], pckt));
        self.n_alloc_reps += 1;
        debug!("InFactory: InReport {} for ({},{},{})", id, t, st, d);
        Ok(InRepHandle(free))
    }

    /// Whether the matching kind table knows this triple.
    pub fn is_kind_known(
        &self,
        t: ServType,
        st: ServSubType,
        d: Discriminant,
        kind: PcktKind,
        cfg: &FwAppConfig,
    ) -> bool {
        match kind {
            PcktKind::Cmd => find_kind(cfg.in_cmd_kinds, t, st, d).is_some(),
            PcktKind::Rep => find_kind(cfg.in_rep_kinds, t, st, d).is_some(),
        }
    }

    pub fn cmd(&self, h: InCmdHandle) -> Option<&InCommand> {
        self.cmds.get(h.0).and_then(Option::as_ref)
    }

    pub fn cmd_mut(&mut self, h: InCmdHandle) -> Option<&mut InCommand> {
        self.cmds.get_mut(h.0).and_then(Option::as_mut)
    }

    pub fn rep(&self, h: InRepHandle) -> Option<&InReport> {
        self.reps.get(h.0).and_then(Option::as_ref)
    }

    pub fn rep_mut(&mut self, h: InRepHandle) -> Option<&mut InReport> {
        self.reps.get_mut(h.0).and_then(Option::as_mut)
    }

    /// Return a command slot to the pool, releasing its packet.
    ///
    /// Releasing an empty slot latches [`AppErrCode::PcktRelErr`] and
    /// has no further effect.
    pub fn release_cmd(&mut self, h: InCmdHandle, pool: &mut PcktPool, err: &mut AppErrLatch) {
        match self.cmds.get_mut(h.0).and_then(Option::take) {
            Some(cmd) => {
                pool.release(cmd.pckt(), err);
                self.n_alloc_cmds -= 1;
            }
            None => err.set(AppErrCode::PcktRelErr),
        }
    }

    /// Return a report slot to the pool, releasing its packet.
    pub fn release_rep(&mut self, h: InRepHandle, pool: &mut PcktPool, err: &mut AppErrLatch) {
        match self.reps.get_mut(h.0).and_then(Option::take) {
            Some(rep) => {
                pool.release(rep.pckt(), err);
                self.n_alloc_reps -= 1;
            }
            None => err.set(AppErrCode::PcktRelErr),
        }
    }

    pub fn n_of_alloc_cmds(&self) -> usize {
        self.n_alloc_cmds
    }

    pub fn n_of_alloc_reps(&self) -> usize {
        self.n_alloc_reps
    }
}

impl Default for InFactory {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// OutFactory
// ---------------------------------------------------------------------------

/// Pool of pre-allocated OutComponent instances.
pub struct OutFactory {
    base: BaseCmp,
    cmps: [Option<OutComponent>; MAX_OUT_CMPS],
    next_instance_id: InstanceId,
    n_alloc: usize,
}

impl OutFactory {
    pub fn new() -> Self {
        Self {
            base: BaseCmp::new(CmpKind::OutFactory, 0),
            cmps: core::array::from_fn(|_| None),
            next_instance_id: 1,
            n_alloc: 0,
        }
    }

    pub fn base(&self) -> &BaseCmp {
        &self.base
    }

    pub fn init(&mut self) {
        if self.base.can_init() {
            self.base.mark_initialized();
        }
    }

    pub fn configure(&mut self, pool: &mut PcktPool, err: &mut AppErrLatch) {
        if !self.base.can_configure() {
            return;
        }
        self.release_all(pool, err);
        self.base.mark_configured();
    }

    pub fn shutdown(&mut self, pool: &mut PcktPool, err: &mut AppErrLatch) {
        self.release_all(pool, err);
        self.base.mark_shutdown();
    }

    fn release_all(&mut self, pool: &mut PcktPool, err: &mut AppErrLatch) {
        for slot in &mut self.cmps {
            if let Some(cmp) = slot.take() {
                pool.release(cmp.pckt(), err);
            }
        }
        self.n_alloc = 0;
    }

    /// Claim an OutComponent slot and a packet for the given kind.
    ///
    /// The packet is stamped with the kind's header attributes; the
    /// destination is left for the maker to fill in.
    pub fn make(
        &mut self,
        t: ServType,
        st: ServSubType,
        d: Discriminant,
        cfg: &'static FwAppConfig,
        pool: &mut PcktPool,
        err: &mut AppErrLatch,
    ) -> Result<OutCmpHandle, MakeErr> {
        let Some(kind_idx) = find_kind(cfg.out_cmp_kinds, t, st, d) else {
            return Err(MakeErr::KindUnknown);
        };
        let kind = &cfg.out_cmp_kinds[kind_idx];
        let Some(serv_idx) = cfg
            .serv_desc
            .iter()
            .position(|s| s.serv_type == t && s.serv_sub_type == st)
        else {
            return Err(MakeErr::KindUnknown);
        };
        let Some(free) = self.cmps.iter().position(Option::is_none) else {
            return Err(MakeErr::PoolExhausted);
        };
        let Some(pckt) = pool.make(kind.pckt_length, err) else {
            return Err(MakeErr::PoolExhausted);
        };

        let id = self.next_instance_id;
        self.next_instance_id += 1;
        {
            let mut m = pool.pckt_mut(pckt);
            m.set_kind(PcktKind::Rep);
            m.set_serv_type(t);
            m.set_serv_sub_type(st);
            m.set_discriminant(d);
            m.set_src(cfg.host_app_id);
            m.set_cmd_rep_id(id);
        }
        self.cmps[free] = Some(OutComponent::new(id, kind, serv_idx, pckt));
        self.n_alloc += 1;
        debug!("OutFactory: OutComponent {} for ({},{},{})", id, t, st, d);
        Ok(OutCmpHandle(free))
    }

    pub fn cmp(&self, h: OutCmpHandle) -> Option<&OutComponent> {
        self.cmps.get(h.0).and_then(Option::as_ref)
    }

    pub fn cmp_mut(&mut self, h: OutCmpHandle) -> Option<&mut OutComponent> {
        self.cmps.get_mut(h.0).and_then(Option::as_mut)
    }

    /// Return a component slot to the pool, releasing its packet.
    pub fn release(&mut self, h: OutCmpHandle, pool: &mut PcktPool, err: &mut AppErrLatch) {
        match self.cmps.get_mut(h.0).and_then(Option::take) {
            Some(cmp) => {
                pool.release(cmp.pckt(), err);
                self.n_alloc -= 1;
            }
            None => err.set(AppErrCode::PcktRelErr),
        }
    }

    pub fn n_of_alloc(&self) -> usize {
        self.n_alloc
    }
}

impl Default for OutFactory {
    fn default() -> Self {
        Self::new()
    }
}
