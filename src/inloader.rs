//! InLoader — admission control for incoming packets.
//!
//! One packet per execution cycle flows through the pipeline:
//!
//! ```text
//!             ┌─ not local ──▶ forward to the re-routing OutStream
//!   InStream ─┤
//!             └─ local ──▶ 1. kind known?
//!                          2. factory slot free?
//!                          3. validity check passes?
//!                          4. InManager takes it?
//!                               │
//!                               └─ yes ──▶ (1,1) if acknowledged
//! ```
//!
//! Each failed stage emits a (1,2) acceptance-failure report with the
//! stage's failure code (commands) or an error-sink report (reports),
//! releases whatever was claimed, and ends the cycle.  The target
//! InStream is chosen beforehand with [`Framework::set_in_stream`]
//! (conceptually an argument of the execution command).
//!
//! [`Framework::set_in_stream`]: crate::framework::Framework::set_in_stream

use crate::base::BaseCmp;
use crate::error::{AppErrCode, CmpKind, FwRepErr};
use crate::factory::InCmpHandle;
use crate::framework::Framework;
use crate::kinds::ActionCtx;
use crate::packet::PcktKind;
use crate::stream;
use crate::verif;
use log::{debug, info};

/// Singleton collector from one InStream per cycle.
pub struct InLoader {
    base: BaseCmp,
    in_stream: Option<usize>,
}

impl InLoader {
    pub fn new() -> Self {
        Self {
            base: BaseCmp::new(CmpKind::InLoader, 0),
            in_stream: None,
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
            self.in_stream = None;
            self.base.mark_configured();
        }
    }

    pub fn shutdown(&mut self) {
        self.in_stream = None;
        self.base.mark_shutdown();
    }

    /// Choose the InStream polled on the next execution cycle.
    pub fn set_in_stream(&mut self, id: usize) {
        self.in_stream = Some(id);
    }

    pub fn in_stream(&self) -> Option<usize> {
        self.in_stream
    }
}

impl Default for InLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// One InLoader execution cycle over the framework context.
pub(crate) fn execute(fw: &mut Framework) {
    if !fw.in_loader.base().is_configured() {
        return;
    }
    let Some(sid) = fw.in_loader.in_stream() else {
        return;
    };
    let Some(p) = fw.in_streams.get_mut(sid).and_then(|s| s.get_pckt()) else {
        return;
    };

    let (dest, t, st, d, pckt_kind, ack_acc, tc_id, tc_src) = {
        let r = fw.pool.pckt(p);
        (
            r.dest(),
            r.serv_type(),
            r.serv_sub_type(),
            r.discriminant(),
            r.kind(),
            r.ack_acc(),
            r.cmd_rep_id(),
            r.src(),
        )
    };

    // Re-routing: packets not addressed to this application are
    // forwarded, never accepted.
    if dest != fw.cfg.host_app_id {
        let re_dest = (fw.cfg.re_route_dest)(dest);
        if re_dest == 0 {
            (fw.cfg.rep_err)(FwRepErr::InLoaderInvDest, CmpKind::InLoader, 0, u16::from(dest));
        } else {
            match stream::out_stream_for(fw.cfg, re_dest) {
                Some(i) => {
                    debug!("InLoader: re-routing packet to destination {}", re_dest);
                    let _ = fw.out_streams[i].send(p, &mut fw.pool, fw.cfg, &mut fw.err);
                }
                None => {
                    (fw.cfg.rep_err)(
                        FwRepErr::InLoaderInvDest,
                        CmpKind::InLoader,
                        0,
                        u16::from(re_dest),
                    );
                }
            }
        }
        fw.pool.release(p, &mut fw.err);
        return;
    }

    let time = (fw.cfg.time)();
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
    } = fw;
    let mut ctx = ActionCtx {
        pool,
        out_factory,
        out_managers: &mut out_managers[..],
        out_registry,
        cfg: *cfg,
        err,
        time,
    };

    // Stage 1: the kind must be in the configuration tables.
    if !in_factory.is_kind_known(t, st, d, pckt_kind, ctx.cfg) {
        info!("InLoader: unknown kind ({},{},{})", t, st, d);
        if pckt_kind == PcktKind::Cmd {
            verif::emit(&mut ctx, verif::SUB_ACC_FAIL, tc_id, tc_src, 0, verif::acc_fail::WRONG_TYPE);
        } else {
            (ctx.cfg.rep_err)(FwRepErr::InLoaderAccFail, CmpKind::InLoader, 0, u16::from(t));
        }
        ctx.pool.release(p, ctx.err);
        return;
    }

    match pckt_kind {
        PcktKind::Cmd => {
            // Stage 2: claim an instance.
            let Ok(ch) = in_factory.make_cmd(t, st, d, p, ctx.cfg) else {
                verif::emit(
                    &mut ctx,
                    verif::SUB_ACC_FAIL,
                    tc_id,
                    tc_src,
                    0,
                    verif::acc_fail::NO_FREE_SLOT,
                );
                ctx.pool.release(p, ctx.err);
                return;
            };

            // Stage 3: validity check configures the instance.
            let valid = in_factory
                .cmd_mut(ch)
                .is_some_and(|cmd| cmd.configure(&mut ctx));
            if !valid {
                verif::emit(&mut ctx, verif::SUB_ACC_FAIL, tc_id, tc_src, 0, verif::acc_fail::INVALID);
                in_factory.release_cmd(ch, ctx.pool, ctx.err);
                return;
            }

            // Stage 4: hand over to the selected InManager.
            let mgr = (ctx.cfg.select_in_manager)(t, st, d, PcktKind::Cmd);
            let loaded = match in_managers.get_mut(mgr) {
                Some(m) => m.load(InCmpHandle::Cmd(ch), in_factory, in_registry, &mut ctx),
                None => {
                    ctx.err.set(AppErrCode::InManagerIllId);
                    false
                }
            };
            if !loaded {
                verif::emit(&mut ctx, verif::SUB_ACC_FAIL, tc_id, tc_src, 0, verif::acc_fail::NO_LOAD);
                in_factory.release_cmd(ch, ctx.pool, ctx.err);
                return;
            }

            info!("InLoader: accepted command ({},{},{})", t, st, d);
            if ack_acc {
                verif::emit(&mut ctx, verif::SUB_ACC_SUCC, tc_id, tc_src, 0, 0);
            }
        }
        PcktKind::Rep => {
            let Ok(rh) = in_factory.make_rep(t, st, d, p, ctx.cfg) else {
                (ctx.cfg.rep_err)(FwRepErr::InLoaderAccFail, CmpKind::InLoader, 0, u16::from(t));
                ctx.pool.release(p, ctx.err);
                return;
            };
            let valid = in_factory
                .rep_mut(rh)
                .is_some_and(|rep| rep.configure(&mut ctx));
            if !valid {
                (ctx.cfg.rep_err)(FwRepErr::InLoaderAccFail, CmpKind::InLoader, 0, u16::from(t));
                in_factory.release_rep(rh, ctx.pool, ctx.err);
                return;
            }
            let mgr = (ctx.cfg.select_in_manager)(t, st, d, PcktKind::Rep);
            let loaded = match in_managers.get_mut(mgr) {
                Some(m) => m.load(InCmpHandle::Rep(rh), in_factory, in_registry, &mut ctx),
                None => {
                    ctx.err.set(AppErrCode::InManagerIllId);
                    false
                }
            };
            if !loaded {
                (ctx.cfg.rep_err)(FwRepErr::InLoaderAccFail, CmpKind::InLoader, 0, u16::from(t));
                in_factory.release_rep(rh, ctx.pool, ctx.err);
                return;
            }
            info!("InLoader: accepted report ({},{},{})", t, st, d);
        }
    }
}
