//! InCommand state machine.
//!
//! An InCommand wraps one incoming telecommand packet and carries its
//! handler state across execution cycles:
//!
//! ```text
//!   ACCEPTED ──ready & start ok──▶ PROGRESS ──terminate ok──▶ TERMINATED
//!       │                           │  ▲
//!       │                           └──┘ progress each cycle
//!       │                           │
//!       └────start failed───────────┴──progress/terminate failed──▶ ABORTED
//! ```
//!
//! Failure reports (1,4), (1,6) and (1,8) are always emitted at the
//! point of failure; the success reports (1,3), (1,5) and (1,7) only
//! when the packet's matching acknowledge flag is set.  Acceptance reports
//! (1,1)/(1,2) are the InLoader's business — by the time a command
//! exists in this state machine it has already been accepted.

use crate::base::BaseCmp;
use crate::config::{FailCode, InstanceId};
use crate::error::CmpKind;
use crate::kinds::{ActionCtx, ActionOutcome, InCmdKind};
use crate::packet::Pckt;
use crate::verif;
use log::{debug, info};

/// Nested state of a configured InCommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InCmdState {
    Accepted,
    Progress,
    Terminated,
    Aborted,
}

/// A framework-managed instance wrapping a single incoming telecommand.
pub struct InCommand {
    base: BaseCmp,
    kind: &'static InCmdKind,
    pckt: Pckt,
    state: InCmdState,
    progress_step: u32,
    progress_done: bool,
    fail_code: Option<FailCode>,
    tracking_index: usize,
}

impl InCommand {
    pub(crate) fn new(instance_id: InstanceId, kind: &'static InCmdKind, pckt: Pckt) -> Self {
        Self {
            base: BaseCmp::new(CmpKind::InCommand, instance_id),
            kind,
            pckt,
            state: InCmdState::Accepted,
            progress_step: 0,
            progress_done: false,
            fail_code: None,
            tracking_index: 0,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn base(&self) -> &BaseCmp {
        &self.base
    }

    pub fn kind(&self) -> &'static InCmdKind {
        self.kind
    }

    pub fn pckt(&self) -> Pckt {
        self.pckt
    }

    pub fn state(&self) -> InCmdState {
        self.state
    }

    pub fn is_in_terminated(&self) -> bool {
        self.state == InCmdState::Terminated
    }

    pub fn is_in_aborted(&self) -> bool {
        self.state == InCmdState::Aborted
    }

    /// The step identifier the progress action last recorded.
    pub fn progress_step(&self) -> u32 {
        self.progress_step
    }

    /// The failure code of the action that aborted this command, if any.
    pub fn fail_code(&self) -> Option<FailCode> {
        self.fail_code
    }

    pub(crate) fn tracking_index(&self) -> usize {
        self.tracking_index
    }

    pub(crate) fn set_tracking_index(&mut self, at: usize) {
        self.tracking_index = at;
    }

    // ── Handler hooks ─────────────────────────────────────────

    /// Record the current progress step; called by progress actions.
    pub fn set_progress_step(&mut self, step: u32) {
        self.progress_step = step;
    }

    /// Run the validity check and enter the configured state.
    ///
    /// Returns `false` (leaving the command unconfigured) when the
    /// check rejects the packet; the caller then releases the instance.
    pub(crate) fn configure(&mut self, ctx: &mut ActionCtx<'_>) -> bool {
        let kind = self.kind;
        if !(kind.validity_check)(self, ctx) {
            return false;
        }
        self.base.mark_initialized();
        self.base.mark_configured();
        true
    }

    // ── State machine ─────────────────────────────────────────

    /// One execution cycle.
    pub fn execute(&mut self, ctx: &mut ActionCtx<'_>) {
        match self.state {
            InCmdState::Accepted => {
                let kind = self.kind;
                if !(kind.ready_check)(self, ctx) {
                    debug!("InCommand {}: not ready", self.base.instance_id());
                    return;
                }
                match (kind.start_action)(self, ctx) {
                    ActionOutcome::Failed(code) => {
                        self.abort_with(code, ctx);
                        self.emit_fail(ctx, verif::SUB_START_FAIL, code);
                    }
                    ActionOutcome::Completed | ActionOutcome::Continue => {
                        debug!("InCommand {}: ACCEPTED -> PROGRESS", self.base.instance_id());
                        self.state = InCmdState::Progress;
                        if ctx.pool.pckt(self.pckt).ack_start() {
                            self.emit_succ(ctx, verif::SUB_START_SUCC);
                        }
                        self.run_progress(ctx);
                    }
                }
            }
            InCmdState::Progress => self.run_progress(ctx),
            InCmdState::Terminated | InCmdState::Aborted => {}
        }
    }

    /// Drive the termination action once progress has completed.
    ///
    /// Called by the InManager after every execution cycle; a no-op
    /// while the progress action still wants further cycles.
    pub fn terminate(&mut self, ctx: &mut ActionCtx<'_>) {
        if self.state != InCmdState::Progress || !self.progress_done {
            return;
        }
        let kind = self.kind;
        match (kind.termination_action)(self, ctx) {
            ActionOutcome::Failed(code) => {
                self.abort_with(code, ctx);
                self.emit_fail(ctx, verif::SUB_TERM_FAIL, code);
            }
            ActionOutcome::Completed | ActionOutcome::Continue => {
                info!("InCommand {}: TERMINATED", self.base.instance_id());
                self.state = InCmdState::Terminated;
                if ctx.pool.pckt(self.pckt).ack_term() {
                    self.emit_succ(ctx, verif::SUB_TERM_SUCC);
                }
            }
        }
    }

    /// Explicit handler-side abort.
    pub fn abort(&mut self, ctx: &mut ActionCtx<'_>) {
        if matches!(self.state, InCmdState::Terminated | InCmdState::Aborted) {
            return;
        }
        self.abort_with(0, ctx);
    }

    // ── Internal ──────────────────────────────────────────────

    fn run_progress(&mut self, ctx: &mut ActionCtx<'_>) {
        let kind = self.kind;
        match (kind.progress_action)(self, ctx) {
            ActionOutcome::Continue => {}
            ActionOutcome::Completed => {
                self.progress_done = true;
                if ctx.pool.pckt(self.pckt).ack_prog() {
                    self.emit_succ(ctx, verif::SUB_PROG_SUCC);
                }
            }
            ActionOutcome::Failed(code) => {
                self.abort_with(code, ctx);
                self.emit_fail(ctx, verif::SUB_PROG_FAIL, code);
            }
        }
    }

    fn abort_with(&mut self, code: FailCode, ctx: &mut ActionCtx<'_>) {
        let kind = self.kind;
        let _ = (kind.abort_action)(self, ctx);
        info!(
            "InCommand {}: ABORTED (code {})",
            self.base.instance_id(),
            code
        );
        self.state = InCmdState::Aborted;
        self.fail_code = Some(code);
    }

    fn emit_fail(&mut self, ctx: &mut ActionCtx<'_>, sub_type: u8, code: FailCode) {
        let (tc_id, tc_src) = {
            let r = ctx.pool.pckt(self.pckt);
            (r.cmd_rep_id(), r.src())
        };
        verif::emit(ctx, sub_type, tc_id, tc_src, self.progress_step, code);
    }

    fn emit_succ(&mut self, ctx: &mut ActionCtx<'_>, sub_type: u8) {
        let (tc_id, tc_src) = {
            let r = ctx.pool.pckt(self.pckt);
            (r.cmd_rep_id(), r.src())
        };
        verif::emit(ctx, sub_type, tc_id, tc_src, self.progress_step, 0);
    }
}
