//! Kind descriptors and lifecycle action tables.
//!
//! A *kind* is a `(serv_type, serv_sub_type, discriminant)` triple
//! identifying a packet shape.  Each kind carries a capability record of
//! plain `fn` pointers — the classic embedded table-dispatch pattern, no
//! trait objects, no heap:
//!
//! ```text
//! ┌────────────────── INCMD_KINDS ───────────────────────────────┐
//! │ (type, sub, disc) │ validity │ ready │ start │ progress │ …  │
//! ├───────────────────┼──────────┼───────┼───────┼──────────┼────┤
//! │ (17, 1, 0)        │ fn       │ fn    │ fn    │ fn       │ …  │
//! │ (3,  5, 1)        │ fn       │ fn    │ fn    │ fn       │ …  │
//! └───────────────────┴──────────┴───────┴───────┴──────────┴────┘
//! ```
//!
//! Tables are sorted ascending on the triple so lookup is a binary
//! search.  The [`defaults`] module provides trivially-succeeding
//! actions from which application tables are assembled.

use crate::config::{
    Discriminant, FailCode, FwAppConfig, ServSubType, ServType, TimeStamp,
};
use crate::error::{AppErrLatch, CmpKind, FwRepErr};
use crate::factory::{OutCmpHandle, OutFactory};
use crate::incmd::InCommand;
use crate::inrep::InReport;
use crate::outcmp::OutComponent;
use crate::outmanager::OutManager;
use crate::packet::PcktPool;
use crate::registry::OutRegistry;
use crate::stream::OutStream;

// ---------------------------------------------------------------------------
// Action outcome
// ---------------------------------------------------------------------------

/// Result of a lifecycle action, interpreted by the state-machine driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action finished its work.
    Completed,
    /// The action made progress and wants to run again next cycle.
    Continue,
    /// The action failed with the given code.
    Failed(FailCode),
}

// ---------------------------------------------------------------------------
// Execution contexts
// ---------------------------------------------------------------------------

/// Capabilities available to incoming-side lifecycle actions: the packet
/// pool (to read the wrapped packet) and the full outbound pipeline (to
/// generate telemetry in response to a command).
pub struct ActionCtx<'a> {
    pub pool: &'a mut PcktPool,
    pub out_factory: &'a mut OutFactory,
    pub out_managers: &'a mut [OutManager],
    pub out_registry: &'a mut OutRegistry,
    pub cfg: &'static FwAppConfig,
    pub err: &'a mut AppErrLatch,
    pub time: TimeStamp,
}

impl ActionCtx<'_> {
    /// Make an OutComponent of the given kind, reporting
    /// [`FwRepErr::OutFactoryFail`] on failure.
    pub fn make_out(
        &mut self,
        t: ServType,
        st: ServSubType,
        d: Discriminant,
    ) -> Option<OutCmpHandle> {
        match self.out_factory.make(t, st, d, self.cfg, self.pool, self.err) {
            Ok(h) => Some(h),
            Err(_) => {
                (self.cfg.rep_err)(FwRepErr::OutFactoryFail, CmpKind::OutFactory, 0, 0);
                None
            }
        }
    }

    /// Route a freshly made OutComponent to an OutManager (the OutLoader
    /// operation).
    pub fn load_out(&mut self, h: OutCmpHandle) -> bool {
        crate::outloader::load(
            h,
            self.cfg,
            self.pool,
            self.out_factory,
            self.out_managers,
            self.out_registry,
            self.err,
        )
    }
}

/// Capabilities available to outgoing-side lifecycle actions: the packet
/// pool, the enable-mask registry, and the OutStreams a serialized
/// report is handed to.
pub struct OutCmpCtx<'a> {
    pub pool: &'a mut PcktPool,
    pub registry: &'a OutRegistry,
    pub out_streams: &'a mut [OutStream],
    pub cfg: &'static FwAppConfig,
    pub err: &'a mut AppErrLatch,
    pub time: TimeStamp,
}

// ---------------------------------------------------------------------------
// Action function types
// ---------------------------------------------------------------------------

pub type InCmdCheckFn = fn(&InCommand, &mut ActionCtx<'_>) -> bool;
pub type InCmdActionFn = fn(&mut InCommand, &mut ActionCtx<'_>) -> ActionOutcome;
pub type InRepCheckFn = fn(&InReport, &mut ActionCtx<'_>) -> bool;
pub type InRepActionFn = fn(&mut InReport, &mut ActionCtx<'_>) -> ActionOutcome;
pub type OutCmpCheckFn = fn(&OutComponent, &mut OutCmpCtx<'_>) -> bool;
pub type OutCmpActionFn = fn(&mut OutComponent, &mut OutCmpCtx<'_>) -> ActionOutcome;
pub type OutCmpSerializeFn = fn(&mut OutComponent, &mut OutCmpCtx<'_>);

// ---------------------------------------------------------------------------
// Kind descriptors
// ---------------------------------------------------------------------------

/// Descriptor of one incoming command kind.
#[derive(Clone, Copy)]
pub struct InCmdKind {
    pub serv_type: ServType,
    pub serv_sub_type: ServSubType,
    pub discriminant: Discriminant,
    pub validity_check: InCmdCheckFn,
    pub ready_check: InCmdCheckFn,
    pub start_action: InCmdActionFn,
    pub progress_action: InCmdActionFn,
    pub termination_action: InCmdActionFn,
    pub abort_action: InCmdActionFn,
}

/// Descriptor of one incoming report kind.
#[derive(Clone, Copy)]
pub struct InRepKind {
    pub serv_type: ServType,
    pub serv_sub_type: ServSubType,
    pub discriminant: Discriminant,
    pub update_action: InRepActionFn,
    pub validity_check: InRepCheckFn,
}

/// Descriptor of one outgoing component kind.
#[derive(Clone, Copy)]
pub struct OutCmpKind {
    pub serv_type: ServType,
    pub serv_sub_type: ServSubType,
    pub discriminant: Discriminant,
    /// Length of the packet allocated for this kind.
    pub pckt_length: usize,
    pub enable_check: OutCmpCheckFn,
    pub ready_check: OutCmpCheckFn,
    pub repeat_check: OutCmpCheckFn,
    pub update_action: OutCmpActionFn,
    pub serialize: OutCmpSerializeFn,
}

/// Sort/search key shared by the three kind tables.
pub(crate) trait KindKey {
    fn key(&self) -> (ServType, ServSubType, Discriminant);
}

impl KindKey for InCmdKind {
    fn key(&self) -> (ServType, ServSubType, Discriminant) {
        (self.serv_type, self.serv_sub_type, self.discriminant)
    }
}

impl KindKey for InRepKind {
    fn key(&self) -> (ServType, ServSubType, Discriminant) {
        (self.serv_type, self.serv_sub_type, self.discriminant)
    }
}

impl KindKey for OutCmpKind {
    fn key(&self) -> (ServType, ServSubType, Discriminant) {
        (self.serv_type, self.serv_sub_type, self.discriminant)
    }
}

/// Binary search for an exact kind triple in a sorted table.
pub(crate) fn find_kind<K: KindKey>(
    table: &[K],
    t: ServType,
    st: ServSubType,
    d: Discriminant,
) -> Option<usize> {
    table.binary_search_by(|k| k.key().cmp(&(t, st, d))).ok()
}

// ---------------------------------------------------------------------------
// Stock actions
// ---------------------------------------------------------------------------

/// Trivially-succeeding checks and actions for assembling kind tables.
pub mod defaults {
    use super::{ActionCtx, ActionOutcome, OutCmpCtx};
    use crate::incmd::InCommand;
    use crate::inrep::InReport;
    use crate::outcmp::OutComponent;

    pub fn in_cmd_check_true(_cmd: &InCommand, _ctx: &mut ActionCtx<'_>) -> bool {
        true
    }

    pub fn in_cmd_action_success(_cmd: &mut InCommand, _ctx: &mut ActionCtx<'_>) -> ActionOutcome {
        ActionOutcome::Completed
    }

    pub fn in_rep_check_true(_rep: &InReport, _ctx: &mut ActionCtx<'_>) -> bool {
        true
    }

    pub fn in_rep_update_success(_rep: &mut InReport, _ctx: &mut ActionCtx<'_>) -> ActionOutcome {
        ActionOutcome::Completed
    }

    /// Consult the OutRegistry enable mask for the component's kind.
    pub fn out_cmp_enable_registry(cmp: &OutComponent, ctx: &mut OutCmpCtx<'_>) -> bool {
        let disc = ctx.pool.pckt(cmp.pckt()).discriminant();
        ctx.registry.is_enabled(cmp.serv_idx(), disc)
    }

    pub fn out_cmp_ready_true(_cmp: &OutComponent, _ctx: &mut OutCmpCtx<'_>) -> bool {
        true
    }

    /// One-shot components never repeat.
    pub fn out_cmp_repeat_never(_cmp: &OutComponent, _ctx: &mut OutCmpCtx<'_>) -> bool {
        false
    }

    pub fn out_cmp_update_noop(_cmp: &mut OutComponent, _ctx: &mut OutCmpCtx<'_>) -> ActionOutcome {
        ActionOutcome::Completed
    }

    /// Stamp the header attributes of the outgoing packet from its kind
    /// descriptor and the current time.
    pub fn out_cmp_serialize_header(cmp: &mut OutComponent, ctx: &mut OutCmpCtx<'_>) {
        let kind = cmp.kind();
        let time = ctx.time;
        let mut m = ctx.pool.pckt_mut(cmp.pckt());
        m.set_serv_type(kind.serv_type);
        m.set_serv_sub_type(kind.serv_sub_type);
        m.set_discriminant(kind.discriminant);
        m.set_time_stamp(time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::defaults as kd;

    fn cmd_kind(t: ServType, st: ServSubType, d: Discriminant) -> InCmdKind {
        InCmdKind {
            serv_type: t,
            serv_sub_type: st,
            discriminant: d,
            validity_check: kd::in_cmd_check_true,
            ready_check: kd::in_cmd_check_true,
            start_action: kd::in_cmd_action_success,
            progress_action: kd::in_cmd_action_success,
            termination_action: kd::in_cmd_action_success,
            abort_action: kd::in_cmd_action_success,
        }
    }

    #[test]
    fn find_kind_exact_match_only() {
        let table = [cmd_kind(3, 1, 0), cmd_kind(3, 5, 1), cmd_kind(17, 1, 0)];
        assert_eq!(find_kind(&table, 3, 5, 1), Some(1));
        assert_eq!(find_kind(&table, 17, 1, 0), Some(2));
        assert_eq!(find_kind(&table, 17, 1, 1), None);
        assert_eq!(find_kind(&table, 99, 1, 0), None);
    }
}
