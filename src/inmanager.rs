//! InManager — cyclic executor of pending incoming commands and reports.
//!
//! Holds the PCRL (Pending Command/Report List), a fixed slot array
//! walked in index order on every cycle.  Loads fill the first free
//! slot, scanning from a cached cursor that is invalidated whenever the
//! manager is executed or reset, so execution order preserves the order
//! of first placement.
//!
//! Retirement rules per cycle:
//! - InReports always retire after one execution, as Terminated.
//! - InCommands are executed, then offered termination; they retire
//!   only from a final state (Terminated or Aborted), otherwise they
//!   stay Pending for the next cycle.
//!
//! On retirement the InRegistry entry is updated and the instance goes
//! back to the InFactory, which frees its packet.

use crate::base::BaseCmp;
use crate::config::MAX_PCRL;
use crate::error::{AppErrCode, AppErrLatch, CmpKind, FwRepErr};
use crate::factory::{InCmpHandle, InFactory};
use crate::kinds::ActionCtx;
use crate::packet::PcktPool;
use crate::registry::{CmdRepState, InRegistry};
use log::debug;

/// Cyclic executor for incoming commands and reports.
pub struct InManager {
    base: BaseCmp,
    pcrl: [Option<InCmpHandle>; MAX_PCRL],
    size: usize,
    /// Cached first-free-slot cursor; 0 forces a rescan.
    next_free: usize,
    n_in_pcrl: usize,
    n_loaded: u32,
}

impl InManager {
    pub fn new(instance_id: u32, pcrl_size: usize) -> Self {
        Self {
            base: BaseCmp::new(CmpKind::InManager, instance_id),
            pcrl: [None; MAX_PCRL],
            size: pcrl_size.clamp(1, MAX_PCRL),
            next_free: 0,
            n_in_pcrl: 0,
            n_loaded: 0,
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

    /// Release every pending component and reset the counters.
    pub fn configure(&mut self, in_factory: &mut InFactory, pool: &mut PcktPool, err: &mut AppErrLatch) {
        if !self.base.can_configure() {
            return;
        }
        self.release_all(in_factory, pool, err);
        self.n_loaded = 0;
        self.base.mark_configured();
    }

    pub fn shutdown(&mut self, in_factory: &mut InFactory, pool: &mut PcktPool, err: &mut AppErrLatch) {
        self.release_all(in_factory, pool, err);
        self.base.mark_shutdown();
    }

    fn release_all(&mut self, in_factory: &mut InFactory, pool: &mut PcktPool, err: &mut AppErrLatch) {
        for slot in &mut self.pcrl {
            match slot.take() {
                Some(InCmpHandle::Cmd(h)) => in_factory.release_cmd(h, pool, err),
                Some(InCmpHandle::Rep(h)) => in_factory.release_rep(h, pool, err),
                None => {}
            }
        }
        self.n_in_pcrl = 0;
        self.next_free = 0;
    }

    /// Place a component in the first free PCRL slot and start registry
    /// tracking.  Returns `false` (latching and reporting `PcrlFull`)
    /// when saturated.
    pub fn load(
        &mut self,
        h: InCmpHandle,
        in_factory: &mut InFactory,
        in_registry: &mut InRegistry,
        ctx: &mut ActionCtx<'_>,
    ) -> bool {
        if self.n_in_pcrl == self.size {
            ctx.err.set(AppErrCode::InManagerPcrlFull);
            (ctx.cfg.rep_err)(
                FwRepErr::InManagerPcrlFull,
                CmpKind::InManager,
                self.base.instance_id(),
                0,
            );
            return false;
        }

        // First load since reset/execution: rescan for the free slot.
        let mut free = self.next_free;
        if free == 0 {
            for (i, slot) in self.pcrl[..self.size].iter().enumerate() {
                if slot.is_none() {
                    free = i;
                    break;
                }
            }
        }

        self.pcrl[free] = Some(h);
        self.n_in_pcrl += 1;
        self.n_loaded += 1;

        let instance_id = match h {
            InCmpHandle::Cmd(ch) => in_factory.cmd(ch).map(|c| c.base().instance_id()),
            InCmpHandle::Rep(rh) => in_factory.rep(rh).map(|r| r.base().instance_id()),
        };
        if let Some(id) = instance_id {
            let at = in_registry.start_tracking(id);
            match h {
                InCmpHandle::Cmd(ch) => {
                    if let Some(c) = in_factory.cmd_mut(ch) {
                        c.set_tracking_index(at);
                    }
                }
                InCmpHandle::Rep(rh) => {
                    if let Some(r) = in_factory.rep_mut(rh) {
                        r.set_tracking_index(at);
                    }
                }
            }
        }

        // Advance the cursor to the next free slot, if any.
        self.next_free = 0;
        for i in free + 1..self.size {
            if self.pcrl[i].is_none() {
                self.next_free = i;
                break;
            }
        }
        debug!(
            "InManager {}: loaded into slot {} ({} pending)",
            self.base.instance_id(),
            free,
            self.n_in_pcrl
        );
        true
    }

    /// Walk the PCRL in slot order, executing each pending component
    /// and retiring the ones that reached a final state.
    pub fn execute(
        &mut self,
        in_factory: &mut InFactory,
        in_registry: &mut InRegistry,
        ctx: &mut ActionCtx<'_>,
    ) {
        if !self.base.is_configured() {
            return;
        }
        self.next_free = 0;
        for i in 0..self.size {
            let Some(h) = self.pcrl[i] else { continue };

            let retired = match h {
                InCmpHandle::Cmd(ch) => {
                    let Some(cmd) = in_factory.cmd_mut(ch) else {
                        self.pcrl[i] = None;
                        continue;
                    };
                    cmd.execute(ctx);
                    cmd.terminate(ctx);
                    if cmd.is_in_aborted() {
                        Some((CmdRepState::Aborted, cmd.tracking_index(), cmd.base().instance_id()))
                    } else if cmd.is_in_terminated() {
                        Some((
                            CmdRepState::Terminated,
                            cmd.tracking_index(),
                            cmd.base().instance_id(),
                        ))
                    } else {
                        None
                    }
                }
                InCmpHandle::Rep(rh) => {
                    let Some(rep) = in_factory.rep_mut(rh) else {
                        self.pcrl[i] = None;
                        continue;
                    };
                    rep.execute(ctx);
                    Some((
                        CmdRepState::Terminated,
                        rep.tracking_index(),
                        rep.base().instance_id(),
                    ))
                }
            };

            if let Some((state, at, id)) = retired {
                in_registry.update_state(at, id, state);
                match h {
                    InCmpHandle::Cmd(ch) => in_factory.release_cmd(ch, ctx.pool, ctx.err),
                    InCmpHandle::Rep(rh) => in_factory.release_rep(rh, ctx.pool, ctx.err),
                }
                self.pcrl[i] = None;
                self.n_in_pcrl -= 1;
            }
        }
    }

    /// Components currently pending in the PCRL.
    pub fn n_of_pending(&self) -> usize {
        self.n_in_pcrl
    }

    /// Components loaded since the last reset (monotone between resets).
    pub fn n_of_loaded(&self) -> u32 {
        self.n_loaded
    }

    /// The PCRL size fixed at construction.
    pub fn pcrl_size(&self) -> usize {
        self.size
    }

    /// The handle in a given slot, for inspection.
    pub fn slot(&self, i: usize) -> Option<InCmpHandle> {
        self.pcrl.get(i).copied().flatten()
    }
}
