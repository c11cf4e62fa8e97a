//! OutLoader — routes a freshly made OutComponent to an OutManager.
//!
//! Three steps: select the manager (application callback, default:
//! always manager 0), load it, then run the activation hook for
//! schedulers whose managers are otherwise quiescent.  A failed load
//! releases the component back to the OutFactory so a saturated POCL
//! cannot leak instances.
//!
//! Note on the original design: the reference implementation wires the
//! loader's initialization overrides onto its reset procedure.  Here
//! initialization and configuration are plain lifecycle methods, each
//! on its own path.

use crate::base::BaseCmp;
use crate::config::FwAppConfig;
use crate::error::{AppErrLatch, CmpKind};
use crate::factory::{OutCmpHandle, OutFactory};
use crate::outmanager::OutManager;
use crate::packet::PcktPool;
use crate::registry::OutRegistry;

/// Singleton router from OutFactory to OutManagers.
pub struct OutLoader {
    base: BaseCmp,
}

impl OutLoader {
    pub fn new() -> Self {
        Self {
            base: BaseCmp::new(CmpKind::OutLoader, 0),
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

    pub fn configure(&mut self) {
        if self.base.can_configure() {
            self.base.mark_configured();
        }
    }

    pub fn shutdown(&mut self) {
        self.base.mark_shutdown();
    }
}

impl Default for OutLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Route `h` to the OutManager chosen by the application's selector.
///
/// A selector answer beyond the configured manager count falls back to
/// manager 0.  Returns whether the load succeeded; on failure the
/// component has been released.
pub(crate) fn load(
    h: OutCmpHandle,
    cfg: &'static FwAppConfig,
    pool: &mut PcktPool,
    out_factory: &mut OutFactory,
    out_managers: &mut [OutManager],
    out_registry: &mut OutRegistry,
    err: &mut AppErrLatch,
) -> bool {
    let Some((t, st, d)) = out_factory.cmp(h).map(|c| {
        let k = c.kind();
        (k.serv_type, k.serv_sub_type, k.discriminant)
    }) else {
        return false;
    };

    let mut mgr = (cfg.select_out_manager)(t, st, d);
    if mgr >= out_managers.len() {
        mgr = 0;
    }
    let ok = out_managers[mgr].load(h, out_factory, out_registry, cfg, err);
    if ok {
        (cfg.activate_out_manager)(mgr);
    } else {
        out_factory.release(h, pool, err);
    }
    ok
}
