//! OutComponent state machine.
//!
//! An OutComponent wraps one outgoing telemetry packet from creation to
//! hand-over:
//!
//! ```text
//!   LOADED ──enabled & ready──▶ PENDING ──serialize & send──▶ TERMINATED
//!      │                           │
//!      └──disabled──▶ ABORTED ◀────┘ (disabled while repeating)
//!                                  │
//!                                  └──repeat──▶ PENDING (next cycle)
//! ```
//!
//! The enable check is re-run on every cycle, so disabling a service
//! stops a repeating (periodic) component mid-flight.  The ready check
//! gates every individual emission, which is how periodic housekeeping
//! reports pace themselves.  Sending hands a *copy* of the packet to
//! the OutStream, leaving the component free to serialize and send
//! again on the next repeat cycle.

use crate::base::BaseCmp;
use crate::config::InstanceId;
use crate::error::CmpKind;
use crate::kinds::{ActionOutcome, OutCmpCtx, OutCmpKind};
use crate::packet::Pckt;
use crate::stream;
use log::{debug, info};

/// State of an OutComponent between load and release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutCmpState {
    Loaded,
    Pending,
    Terminated,
    Aborted,
}

/// A framework-managed instance wrapping a single outgoing report or
/// command.
pub struct OutComponent {
    base: BaseCmp,
    kind: &'static OutCmpKind,
    /// Row of the OutRegistry service table for this kind; cached at
    /// make time so the enable check is a plain index.
    serv_idx: usize,
    pckt: Pckt,
    state: OutCmpState,
    tracking_index: usize,
}

impl OutComponent {
    pub(crate) fn new(
        instance_id: InstanceId,
        kind: &'static OutCmpKind,
        serv_idx: usize,
        pckt: Pckt,
    ) -> Self {
        Self {
            base: BaseCmp::new(CmpKind::OutComponent, instance_id),
            kind,
            serv_idx,
            pckt,
            state: OutCmpState::Loaded,
            tracking_index: 0,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn base(&self) -> &BaseCmp {
        &self.base
    }

    pub fn kind(&self) -> &'static OutCmpKind {
        self.kind
    }

    pub fn serv_idx(&self) -> usize {
        self.serv_idx
    }

    pub fn pckt(&self) -> Pckt {
        self.pckt
    }

    pub fn state(&self) -> OutCmpState {
        self.state
    }

    pub fn is_final(&self) -> bool {
        matches!(self.state, OutCmpState::Terminated | OutCmpState::Aborted)
    }

    pub(crate) fn tracking_index(&self) -> usize {
        self.tracking_index
    }

    pub(crate) fn set_tracking_index(&mut self, at: usize) {
        self.tracking_index = at;
    }

    // ── State machine ─────────────────────────────────────────

    /// One execution cycle.
    pub fn execute(&mut self, ctx: &mut OutCmpCtx<'_>) {
        if self.is_final() {
            return;
        }
        let kind = self.kind;

        if !(kind.enable_check)(self, ctx) {
            info!(
                "OutComponent {}: ({},{}) disabled -> ABORTED",
                self.base.instance_id(),
                kind.serv_type,
                kind.serv_sub_type
            );
            self.state = OutCmpState::Aborted;
            return;
        }

        if !(kind.ready_check)(self, ctx) {
            debug!("OutComponent {}: not ready", self.base.instance_id());
            return;
        }
        self.state = OutCmpState::Pending;

        if let ActionOutcome::Failed(code) = (kind.update_action)(self, ctx) {
            info!(
                "OutComponent {}: update failed (code {}) -> ABORTED",
                self.base.instance_id(),
                code
            );
            self.state = OutCmpState::Aborted;
            return;
        }
        (kind.serialize)(self, ctx);

        match stream::send_to_dest(ctx, self.pckt) {
            stream::SendRes::Sent => {
                let repeat = (kind.repeat_check)(self, ctx);
                if repeat {
                    debug!("OutComponent {}: repeating", self.base.instance_id());
                    self.state = OutCmpState::Pending;
                } else {
                    self.state = OutCmpState::Terminated;
                }
            }
            stream::SendRes::Retry => {
                // Pool pressure; stay pending and try again next cycle.
            }
            stream::SendRes::NoRoute => {
                self.state = OutCmpState::Aborted;
            }
        }
    }
}
