//! InReport lifecycle.
//!
//! Far simpler than the InCommand machine: an incoming report runs its
//! update action exactly once (writing its payload into the external
//! data pool) and always retires after a single execution cycle.  An
//! update failure is routed to the application's error sink; incoming
//! reports never generate verification telemetry.

use crate::base::BaseCmp;
use crate::config::InstanceId;
use crate::error::{CmpKind, FwRepErr};
use crate::kinds::{ActionCtx, ActionOutcome, InRepKind};
use crate::packet::Pckt;

/// A framework-managed instance wrapping a single incoming report.
pub struct InReport {
    base: BaseCmp,
    kind: &'static InRepKind,
    pckt: Pckt,
    executed: bool,
    tracking_index: usize,
}

impl InReport {
    pub(crate) fn new(instance_id: InstanceId, kind: &'static InRepKind, pckt: Pckt) -> Self {
        Self {
            base: BaseCmp::new(CmpKind::InReport, instance_id),
            kind,
            pckt,
            executed: false,
            tracking_index: 0,
        }
    }

    pub fn base(&self) -> &BaseCmp {
        &self.base
    }

    pub fn kind(&self) -> &'static InRepKind {
        self.kind
    }

    pub fn pckt(&self) -> Pckt {
        self.pckt
    }

    pub(crate) fn tracking_index(&self) -> usize {
        self.tracking_index
    }

    pub(crate) fn set_tracking_index(&mut self, at: usize) {
        self.tracking_index = at;
    }

    /// Run the validity check and enter the configured state.
    pub(crate) fn configure(&mut self, ctx: &mut ActionCtx<'_>) -> bool {
        let kind = self.kind;
        if !(kind.validity_check)(self, ctx) {
            return false;
        }
        self.base.mark_initialized();
        self.base.mark_configured();
        true
    }

    /// Run the update action (first cycle only).
    pub fn execute(&mut self, ctx: &mut ActionCtx<'_>) {
        if self.executed {
            return;
        }
        self.executed = true;
        let kind = self.kind;
        if let ActionOutcome::Failed(code) = (kind.update_action)(self, ctx) {
            (ctx.cfg.rep_err)(
                FwRepErr::InRepUpdateFail,
                CmpKind::InReport,
                self.base.instance_id(),
                code,
            );
        }
    }
}
