//! Base component lifecycle state machine.
//!
//! Every managed component embeds a [`BaseCmp`] and drives it through
//! the shared lifecycle:
//!
//! ```text
//!     CREATED ──init──▶ INITIALIZED ──configure──▶ CONFIGURED ──execute*──▶ CONFIGURED
//!                                        │                        │
//!                                        └───────shutdown─────────┘──▶ CREATED
//! ```
//!
//! Components run their own initialization / configuration checks and
//! actions, then record the result here.  A failed check or action
//! leaves the state machine in its pre-state with the failure reason in
//! the outcome field.  `configure` is idempotent: it may be re-run from
//! CONFIGURED to return the component to a fresh configured state.

use crate::config::InstanceId;
use crate::error::CmpKind;
use log::debug;

/// Lifecycle states shared by all managed components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpState {
    Created,
    Initialized,
    Configured,
}

/// Outcome of the most recent lifecycle transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOutcome {
    Success,
    CheckFailed,
    ActionFailed,
}

/// Lifecycle bookkeeping embedded in every component.
#[derive(Debug, Clone, Copy)]
pub struct BaseCmp {
    kind: CmpKind,
    instance_id: InstanceId,
    state: CmpState,
    outcome: CmpOutcome,
}

impl BaseCmp {
    pub fn new(kind: CmpKind, instance_id: InstanceId) -> Self {
        Self {
            kind,
            instance_id,
            state: CmpState::Created,
            outcome: CmpOutcome::Success,
        }
    }

    pub fn kind(&self) -> CmpKind {
        self.kind
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    pub fn state(&self) -> CmpState {
        self.state
    }

    pub fn outcome(&self) -> CmpOutcome {
        self.outcome
    }

    pub fn is_configured(&self) -> bool {
        self.state == CmpState::Configured
    }

    // ── Transition guards ─────────────────────────────────────

    /// init is legal only from CREATED.
    pub fn can_init(&self) -> bool {
        self.state == CmpState::Created
    }

    /// configure is legal from INITIALIZED, and again from CONFIGURED.
    pub fn can_configure(&self) -> bool {
        matches!(self.state, CmpState::Initialized | CmpState::Configured)
    }

    // ── Transition commits ────────────────────────────────────

    /// Record a successful initialization.
    pub fn mark_initialized(&mut self) {
        debug!("{} {}: CREATED -> INITIALIZED", self.kind, self.instance_id);
        self.state = CmpState::Initialized;
        self.outcome = CmpOutcome::Success;
    }

    /// Record a successful configuration.
    pub fn mark_configured(&mut self) {
        debug!(
            "{} {}: {:?} -> CONFIGURED",
            self.kind, self.instance_id, self.state
        );
        self.state = CmpState::Configured;
        self.outcome = CmpOutcome::Success;
    }

    /// Record a failed transition; the state is left unchanged.
    pub fn mark_failed(&mut self, outcome: CmpOutcome) {
        self.outcome = outcome;
    }

    /// Record a shutdown; the component returns to CREATED.
    pub fn mark_shutdown(&mut self) {
        debug!("{} {}: {:?} -> CREATED", self.kind, self.instance_id, self.state);
        self.state = CmpState::Created;
        self.outcome = CmpOutcome::Success;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_happy_path() {
        let mut b = BaseCmp::new(CmpKind::InManager, 0);
        assert_eq!(b.state(), CmpState::Created);
        assert!(b.can_init());
        b.mark_initialized();
        assert!(!b.can_init(), "init only legal from CREATED");
        assert!(b.can_configure());
        b.mark_configured();
        assert!(b.is_configured());
        // configure is idempotent
        assert!(b.can_configure());
        b.mark_configured();
        assert!(b.is_configured());
        b.mark_shutdown();
        assert_eq!(b.state(), CmpState::Created);
    }

    #[test]
    fn failed_transition_keeps_pre_state() {
        let mut b = BaseCmp::new(CmpKind::OutManager, 1);
        b.mark_failed(CmpOutcome::CheckFailed);
        assert_eq!(b.state(), CmpState::Created);
        assert_eq!(b.outcome(), CmpOutcome::CheckFailed);
    }
}
