//! OutManager — cyclic executor of pending OutComponents.
//!
//! Holds the POCL (Pending OutComponent List).  Each cycle walks the
//! POCL in slot order, executes every component, and releases the ones
//! that reached a final state, updating their OutRegistry entry on the
//! way out.  Load order is preserved up to slot reuse, exactly as the
//! PCRL does on the incoming side.

use crate::base::BaseCmp;
use crate::config::{FwAppConfig, TimeStamp, MAX_POCL};
use crate::error::{AppErrCode, AppErrLatch, CmpKind, FwRepErr};
use crate::factory::{OutCmpHandle, OutFactory};
use crate::kinds::OutCmpCtx;
use crate::outcmp::OutCmpState;
use crate::packet::PcktPool;
use crate::registry::{CmdRepState, OutRegistry};
use crate::stream::OutStream;
use log::debug;

/// Cyclic executor for outgoing components.
pub struct OutManager {
    base: BaseCmp,
    pocl: [Option<OutCmpHandle>; MAX_POCL],
    size: usize,
    n_in_pocl: usize,
    n_loaded: u32,
}

impl OutManager {
    pub fn new(instance_id: u32, pocl_size: usize) -> Self {
        Self {
            base: BaseCmp::new(CmpKind::OutManager, instance_id),
            pocl: [None; MAX_POCL],
            size: pocl_size.clamp(1, MAX_POCL),
            n_in_pocl: 0,
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
    pub fn configure(&mut self, out_factory: &mut OutFactory, pool: &mut PcktPool, err: &mut AppErrLatch) {
        if !self.base.can_configure() {
            return;
        }
        self.release_all(out_factory, pool, err);
        self.n_loaded = 0;
        self.base.mark_configured();
    }

    pub fn shutdown(&mut self, out_factory: &mut OutFactory, pool: &mut PcktPool, err: &mut AppErrLatch) {
        self.release_all(out_factory, pool, err);
        self.base.mark_shutdown();
    }

    fn release_all(&mut self, out_factory: &mut OutFactory, pool: &mut PcktPool, err: &mut AppErrLatch) {
        for slot in &mut self.pocl {
            if let Some(h) = slot.take() {
                out_factory.release(h, pool, err);
            }
        }
        self.n_in_pocl = 0;
    }

    /// Place a component in the first free POCL slot and start registry
    /// tracking.  Returns `false` (latching and reporting `PoclFull`)
    /// when saturated.
    pub fn load(
        &mut self,
        h: OutCmpHandle,
        out_factory: &mut OutFactory,
        out_registry: &mut OutRegistry,
        cfg: &FwAppConfig,
        err: &mut AppErrLatch,
    ) -> bool {
        if self.n_in_pocl == self.size {
            err.set(AppErrCode::OutManagerPoclFull);
            (cfg.rep_err)(
                FwRepErr::OutManagerPoclFull,
                CmpKind::OutManager,
                self.base.instance_id(),
                0,
            );
            return false;
        }
        let Some(free) = self.pocl[..self.size].iter().position(Option::is_none) else {
            // Counter said there was room; treat as full.
            err.set(AppErrCode::OutManagerPoclFull);
            return false;
        };

        self.pocl[free] = Some(h);
        self.n_in_pocl += 1;
        self.n_loaded += 1;

        if let Some(cmp) = out_factory.cmp_mut(h) {
            let at = out_registry.start_tracking(cmp.base().instance_id());
            cmp.set_tracking_index(at);
        }
        debug!(
            "OutManager {}: loaded into slot {} ({} pending)",
            self.base.instance_id(),
            free,
            self.n_in_pocl
        );
        true
    }

    /// Walk the POCL in slot order, executing each component and
    /// releasing the ones that reached a final state.
    #[allow(clippy::too_many_arguments)]
    pub fn execute(
        &mut self,
        out_factory: &mut OutFactory,
        out_registry: &mut OutRegistry,
        out_streams: &mut [OutStream],
        pool: &mut PcktPool,
        cfg: &'static FwAppConfig,
        err: &mut AppErrLatch,
        time: TimeStamp,
    ) {
        if !self.base.is_configured() {
            return;
        }
        for i in 0..self.size {
            let Some(h) = self.pocl[i] else { continue };

            {
                let Some(cmp) = out_factory.cmp_mut(h) else {
                    self.pocl[i] = None;
                    continue;
                };
                let mut ctx = OutCmpCtx {
                    pool: &mut *pool,
                    registry: &*out_registry,
                    out_streams: &mut *out_streams,
                    cfg,
                    err: &mut *err,
                    time,
                };
                cmp.execute(&mut ctx);
            }

            let after = out_factory
                .cmp(h)
                .map(|c| (c.state(), c.tracking_index(), c.base().instance_id()));
            if let Some((state, at, id)) = after {
                let reg_state = match state {
                    OutCmpState::Terminated => Some(CmdRepState::Terminated),
                    OutCmpState::Aborted => Some(CmdRepState::Aborted),
                    OutCmpState::Loaded | OutCmpState::Pending => None,
                };
                if let Some(st) = reg_state {
                    out_registry.update_state(at, id, st);
                    out_factory.release(h, pool, err);
                    self.pocl[i] = None;
                    self.n_in_pocl -= 1;
                }
            }
        }
    }

    /// Components currently pending in the POCL.
    pub fn n_of_pending(&self) -> usize {
        self.n_in_pocl
    }

    /// Components loaded since the last reset.
    pub fn n_of_loaded(&self) -> u32 {
        self.n_loaded
    }

    /// The POCL size fixed at construction.
    pub fn pocl_size(&self) -> usize {
        self.size
    }
}
