//! Framework context — the hexagonal core of the runtime.
//!
//! [`Framework`] owns every pool, factory, stream, manager and registry
//! and exposes the per-cycle drivers the scheduler calls.  All I/O
//! flows through transport traits injected at call sites, so the whole
//! pipeline runs against mock adapters in tests.
//!
//! ```text
//!  InTransport ──▶ ┌──────────────────────────────┐ ──▶ OutTransport
//!                  │          Framework           │
//!                  │ pools · factories · managers │ ──▶ ErrRepFn sink
//!                  └──────────────────────────────┘
//! ```
//!
//! A typical cycle, in the scheduler's chosen order:
//!
//! ```text
//! poll_in_stream(i, tr) ▸ execute_in_loader() ▸ execute_in_manager(i)
//!   ▸ (application service handlers) ▸ execute_out_manager(i)
//!   ▸ execute_out_stream(i, tr)
//! ```
//!
//! The core is single-threaded cooperative: no driver blocks, no locks
//! are taken, and every pool is mutated from exactly one cycle at a
//! time.  A multi-threaded embedding must serialise calls externally.

use crate::base::CmpState;
use crate::cfgcheck::{self, ConfigCheckOutcome};
use crate::config::{
    DestSrc, Discriminant, FwAppConfig, FwStatus, InstanceId, ServSubType, ServType,
    MAX_IN_MANAGERS, MAX_IN_STREAMS, MAX_OUT_MANAGERS, MAX_OUT_STREAMS,
};
use crate::error::{AppErrCode, AppErrLatch, CmpKind, FwRepErr};
use crate::factory::{InFactory, OutCmpHandle, OutFactory};
use crate::inloader::{self, InLoader};
use crate::inmanager::InManager;
use crate::kinds::ActionCtx;
use crate::outloader::{self, OutLoader};
use crate::outmanager::OutManager;
use crate::packet::{Pckt, PcktMut, PcktPool, PcktRef};
use crate::registry::{CmdRepState, InRegistry, OutRegistry};
use crate::stream::{InStream, InTransport, OutStream, OutTransport};
use log::{info, warn};

/// The framework context: every singleton in one explicit object.
///
/// Tests construct isolated contexts freely; nothing is process-global.
pub struct Framework {
    pub(crate) cfg: &'static FwAppConfig,
    pub(crate) err: AppErrLatch,
    pub(crate) pool: PcktPool,
    pub(crate) in_streams: heapless::Vec<InStream, MAX_IN_STREAMS>,
    pub(crate) out_streams: heapless::Vec<OutStream, MAX_OUT_STREAMS>,
    pub(crate) in_factory: InFactory,
    pub(crate) out_factory: OutFactory,
    pub(crate) in_loader: InLoader,
    pub(crate) out_loader: OutLoader,
    pub(crate) in_managers: heapless::Vec<InManager, MAX_IN_MANAGERS>,
    pub(crate) out_managers: heapless::Vec<OutManager, MAX_OUT_MANAGERS>,
    pub(crate) in_registry: InRegistry,
    pub(crate) out_registry: OutRegistry,
    state: CmpState,
}

impl Framework {
    /// Build the context from the application configuration.
    ///
    /// Only structural impossibilities (component counts beyond the
    /// compile-time caps) are rejected here; table-level inconsistencies
    /// are caught by [`configure`](Self::configure), which leaves the
    /// framework INITIALIZED on failure.
    pub fn new(cfg: &'static FwAppConfig) -> Result<Self, ConfigCheckOutcome> {
        if cfg.in_stream_pq_size.len() > MAX_IN_STREAMS
            || cfg.out_stream_pq_size.len() > MAX_OUT_STREAMS
            || cfg.in_manager_pcrl_size.len() > MAX_IN_MANAGERS
            || cfg.out_manager_pocl_size.len() > MAX_OUT_MANAGERS
        {
            return Err(ConfigCheckOutcome::OutRegistryInconsistent);
        }

        let mut in_streams = heapless::Vec::new();
        for (i, &sz) in cfg.in_stream_pq_size.iter().enumerate() {
            if in_streams
                .push(InStream::new(i as u32, sz, cfg.n_of_groups))
                .is_err()
            {
                return Err(ConfigCheckOutcome::OutRegistryInconsistent);
            }
        }
        let mut out_streams = heapless::Vec::new();
        for (i, &sz) in cfg.out_stream_pq_size.iter().enumerate() {
            let dest = cfg.out_stream_dest.get(i).copied().unwrap_or(0);
            if out_streams
                .push(OutStream::new(i as u32, dest, sz, cfg.n_of_groups))
                .is_err()
            {
                return Err(ConfigCheckOutcome::OutRegistryInconsistent);
            }
        }
        let mut in_managers = heapless::Vec::new();
        for (i, &sz) in cfg.in_manager_pcrl_size.iter().enumerate() {
            if in_managers.push(InManager::new(i as u32, sz)).is_err() {
                return Err(ConfigCheckOutcome::OutRegistryInconsistent);
            }
        }
        let mut out_managers = heapless::Vec::new();
        for (i, &sz) in cfg.out_manager_pocl_size.iter().enumerate() {
            if out_managers.push(OutManager::new(i as u32, sz)).is_err() {
                return Err(ConfigCheckOutcome::OutRegistryInconsistent);
            }
        }

        Ok(Self {
            cfg,
            err: AppErrLatch::new(),
            pool: PcktPool::new(),
            in_streams,
            out_streams,
            in_factory: InFactory::new(),
            out_factory: OutFactory::new(),
            in_loader: InLoader::new(),
            out_loader: OutLoader::new(),
            in_managers,
            out_managers,
            in_registry: InRegistry::new(),
            out_registry: OutRegistry::new(),
            state: CmpState::Created,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Move every component from CREATED to INITIALIZED.
    pub fn init(&mut self) {
        self.in_registry.init();
        self.out_registry.init(self.cfg.serv_desc);
        self.in_factory.init();
        self.out_factory.init();
        for s in &mut self.in_streams {
            s.init();
        }
        for s in &mut self.out_streams {
            s.init();
        }
        self.in_loader.init();
        self.out_loader.init();
        for m in &mut self.in_managers {
            m.init();
        }
        for m in &mut self.out_managers {
            m.init();
        }
        self.state = CmpState::Initialized;
        info!("framework initialized");
    }

    /// Run the configuration consistency check, then configure every
    /// component.  On a check failure the framework stays INITIALIZED
    /// and the outcome names the offending table.
    pub fn configure(&mut self) -> ConfigCheckOutcome {
        let outcome = cfgcheck::check(self.cfg);
        if outcome != ConfigCheckOutcome::ConfigOk {
            warn!("configuration check failed: {:?}", outcome);
            return outcome;
        }

        self.in_registry.configure();
        self.out_registry.configure();
        self.in_factory.configure(&mut self.pool, &mut self.err);
        self.out_factory.configure(&mut self.pool, &mut self.err);
        for s in &mut self.in_streams {
            s.configure(&mut self.pool, &mut self.err);
        }
        for s in &mut self.out_streams {
            s.configure(&mut self.pool, &mut self.err);
        }
        self.in_loader.configure();
        self.out_loader.configure();
        for m in &mut self.in_managers {
            m.configure(&mut self.in_factory, &mut self.pool, &mut self.err);
        }
        for m in &mut self.out_managers {
            m.configure(&mut self.out_factory, &mut self.pool, &mut self.err);
        }
        self.state = CmpState::Configured;
        info!("framework configured");
        ConfigCheckOutcome::ConfigOk
    }

    /// Release every held component and packet and return to CREATED.
    pub fn shutdown(&mut self) {
        for m in &mut self.in_managers {
            m.shutdown(&mut self.in_factory, &mut self.pool, &mut self.err);
        }
        for m in &mut self.out_managers {
            m.shutdown(&mut self.out_factory, &mut self.pool, &mut self.err);
        }
        self.in_factory.shutdown(&mut self.pool, &mut self.err);
        self.out_factory.shutdown(&mut self.pool, &mut self.err);
        for s in &mut self.in_streams {
            s.shutdown(&mut self.pool, &mut self.err);
        }
        for s in &mut self.out_streams {
            s.shutdown(&mut self.pool, &mut self.err);
        }
        self.in_loader.shutdown();
        self.out_loader.shutdown();
        self.in_registry.shutdown();
        self.out_registry.shutdown();
        self.state = CmpState::Created;
        info!("framework shut down");
    }

    pub fn state(&self) -> CmpState {
        self.state
    }

    // ── Cycle drivers ─────────────────────────────────────────

    /// Collect packets from an InStream's transport.
    pub fn poll_in_stream(&mut self, id: usize, transport: &mut impl InTransport) {
        let Some(s) = self.in_streams.get_mut(id) else {
            return;
        };
        s.poll(transport, &mut self.pool, self.cfg, &mut self.err);
    }

    /// Choose the InStream the InLoader reads on its next cycle.
    pub fn set_in_stream(&mut self, id: usize) {
        self.in_loader.set_in_stream(id);
    }

    /// One InLoader cycle: collect, re-route or run acceptance, load.
    pub fn execute_in_loader(&mut self) {
        inloader::execute(self);
    }

    /// One cycle of the given InManager over its PCRL.
    pub fn execute_in_manager(&mut self, id: usize) {
        if id >= self.in_managers.len() {
            self.err.set(AppErrCode::InManagerIllId);
            return;
        }
        let time = (self.cfg.time)();
        let Framework {
            pool,
            in_factory,
            in_managers,
            in_registry,
            out_factory,
            out_managers,
            out_registry,
            cfg,
            err,
            ..
        } = self;
        let mut ctx = ActionCtx {
            pool,
            out_factory,
            out_managers: &mut out_managers[..],
            out_registry,
            cfg: *cfg,
            err,
            time,
        };
        in_managers[id].execute(in_factory, in_registry, &mut ctx);
    }

    /// One cycle of the given OutManager over its POCL.
    pub fn execute_out_manager(&mut self, id: usize) {
        if id >= self.out_managers.len() {
            return;
        }
        let time = (self.cfg.time)();
        let Framework {
            pool,
            out_factory,
            out_managers,
            out_registry,
            out_streams,
            cfg,
            err,
            ..
        } = self;
        out_managers[id].execute(
            out_factory,
            out_registry,
            &mut out_streams[..],
            pool,
            *cfg,
            err,
            time,
        );
    }

    /// Drain an OutStream into its transport.
    pub fn execute_out_stream(&mut self, id: usize, transport: &mut impl OutTransport) {
        let Some(s) = self.out_streams.get_mut(id) else {
            return;
        };
        s.execute(transport, &mut self.pool, &mut self.err);
    }

    // ── Service-handler surface ───────────────────────────────

    /// Make an OutComponent addressed to `dest`, ready for loading.
    pub fn make_out_cmp(
        &mut self,
        t: ServType,
        st: ServSubType,
        d: Discriminant,
        dest: DestSrc,
    ) -> Option<OutCmpHandle> {
        match self
            .out_factory
            .make(t, st, d, self.cfg, &mut self.pool, &mut self.err)
        {
            Ok(h) => {
                if let Some(cmp) = self.out_factory.cmp(h) {
                    let p = cmp.pckt();
                    self.pool.pckt_mut(p).set_dest(dest);
                }
                Some(h)
            }
            Err(_) => {
                self.err.set(AppErrCode::OutFactoryFail);
                (self.cfg.rep_err)(FwRepErr::OutFactoryFail, CmpKind::OutFactory, 0, 0);
                None
            }
        }
    }

    /// Route a made OutComponent through the OutLoader.
    pub fn load_out_cmp(&mut self, h: OutCmpHandle) -> bool {
        let Framework {
            pool,
            out_factory,
            out_managers,
            out_registry,
            cfg,
            err,
            ..
        } = self;
        outloader::load(
            h,
            *cfg,
            pool,
            out_factory,
            &mut out_managers[..],
            out_registry,
            err,
        )
    }

    /// Run a service handler with incoming-side action capabilities
    /// (packet access plus the outbound pipeline).
    pub fn with_action_ctx<R>(&mut self, f: impl FnOnce(&mut ActionCtx<'_>) -> R) -> R {
        let time = (self.cfg.time)();
        let Framework {
            pool,
            out_factory,
            out_managers,
            out_registry,
            cfg,
            err,
            ..
        } = self;
        let mut ctx = ActionCtx {
            pool,
            out_factory,
            out_managers: &mut out_managers[..],
            out_registry,
            cfg: *cfg,
            err,
            time,
        };
        f(&mut ctx)
    }

    // ── Enable mask and registries ────────────────────────────

    /// Update the OutRegistry enable mask.
    pub fn set_enable(&mut self, t: ServType, st: ServSubType, d: Discriminant, enabled: bool) {
        self.out_registry.set_enable(t, st, d, enabled, &mut self.err);
    }

    /// Tracked state of an outgoing instance.
    pub fn out_cmp_state(&self, id: InstanceId) -> CmdRepState {
        self.out_registry.state_of(id)
    }

    /// Tracked state of an incoming instance.
    pub fn in_cmp_state(&self, id: InstanceId) -> CmdRepState {
        self.in_registry.state_of(id)
    }

    // ── Error planes ──────────────────────────────────────────

    /// The latched application error code.
    pub fn app_err_code(&self) -> AppErrCode {
        self.err.code()
    }

    pub fn clear_app_err(&mut self) {
        self.err.clear();
    }

    // ── Inspection ────────────────────────────────────────────

    pub fn pool(&self) -> &PcktPool {
        &self.pool
    }

    /// Make a raw packet for crafting test or service traffic.
    pub fn make_pckt(&mut self, len: usize) -> Option<Pckt> {
        self.pool.make(len, &mut self.err)
    }

    pub fn release_pckt(&mut self, p: Pckt) {
        self.pool.release(p, &mut self.err);
    }

    pub fn pckt(&self, p: Pckt) -> PcktRef<'_> {
        self.pool.pckt(p)
    }

    pub fn pckt_mut(&mut self, p: Pckt) -> PcktMut<'_> {
        self.pool.pckt_mut(p)
    }

    pub fn in_factory(&self) -> &InFactory {
        &self.in_factory
    }

    pub fn out_factory(&self) -> &OutFactory {
        &self.out_factory
    }

    pub fn in_manager(&self, id: usize) -> Option<&InManager> {
        self.in_managers.get(id)
    }

    pub fn out_manager(&self, id: usize) -> Option<&OutManager> {
        self.out_managers.get(id)
    }

    pub fn in_stream(&self, id: usize) -> Option<&InStream> {
        self.in_streams.get(id)
    }

    pub fn in_stream_mut(&mut self, id: usize) -> Option<&mut InStream> {
        self.in_streams.get_mut(id)
    }

    pub fn out_stream(&self, id: usize) -> Option<&OutStream> {
        self.out_streams.get(id)
    }

    pub fn out_stream_mut(&mut self, id: usize) -> Option<&mut OutStream> {
        self.out_streams.get_mut(id)
    }

    pub fn out_registry(&self) -> &OutRegistry {
        &self.out_registry
    }

    pub fn in_registry(&self) -> &InRegistry {
        &self.in_registry
    }

    /// Snapshot of resource usage across the context.
    pub fn status(&self) -> FwStatus {
        let mut st = FwStatus {
            n_allocated_pckts: self.pool.n_of_allocated(),
            n_allocated_in_cmds: self.in_factory.n_of_alloc_cmds(),
            n_allocated_in_reps: self.in_factory.n_of_alloc_reps(),
            n_allocated_out_cmps: self.out_factory.n_of_alloc(),
            in_manager_pending: heapless::Vec::new(),
            in_manager_loaded: heapless::Vec::new(),
            out_manager_pending: heapless::Vec::new(),
            in_stream_depth: heapless::Vec::new(),
            out_stream_depth: heapless::Vec::new(),
        };
        for m in &self.in_managers {
            let _ = st.in_manager_pending.push(m.n_of_pending());
            let _ = st.in_manager_loaded.push(m.n_of_loaded());
        }
        for m in &self.out_managers {
            let _ = st.out_manager_pending.push(m.n_of_pending());
        }
        for s in &self.in_streams {
            let _ = st.in_stream_depth.push(s.queue_depth());
        }
        for s in &self.out_streams {
            let _ = st.out_stream_depth.push(s.queue_depth());
        }
        st
    }
}
