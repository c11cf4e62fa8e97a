//! Unified error types for the PUS runtime core.
//!
//! Errors travel on two planes:
//!
//! 1. **Application error latch** ([`AppErrLatch`]) — a process-wide
//!    last-error code set by the low-level primitives (packet allocation
//!    failure, double release, illegal registry arguments, manager id out
//!    of range).  The latch is overwritten by each new error and cleared
//!    only by an explicit caller.
//! 2. **Error report stream** — a callback into the application's
//!    telemetry error sink ([`ErrRepFn`](crate::config::ErrRepFn)) with a
//!    typed error kind plus the component type and instance identifiers.
//!
//! All variants are `Copy` so they can be cheaply passed through the
//! state machines without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Application error codes (latch plane)
// ---------------------------------------------------------------------------

/// Last-error codes latched by the low-level primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppErrCode {
    /// No error has been latched since the last clear.
    NoAppErr,
    /// A packet allocation request could not be satisfied.
    PcktAllocationFail,
    /// A packet was released that is not in the pool, or was already free.
    PcktRelErr,
    /// A service type unknown to the OutRegistry was named.
    IllServType,
    /// A service sub-type unknown to the OutRegistry was named.
    IllServSubType,
    /// A discriminant beyond the sub-type's declared maximum was named.
    IllDiscriminant,
    /// An InManager identifier out of range was named.
    InManagerIllId,
    /// An InManager's pending command/report list is saturated.
    InManagerPcrlFull,
    /// An OutManager's pending out-component list is saturated.
    OutManagerPoclFull,
    /// The OutFactory could not provide an OutComponent.
    OutFactoryFail,
}

impl fmt::Display for AppErrCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAppErr => write!(f, "no error"),
            Self::PcktAllocationFail => write!(f, "packet allocation failed"),
            Self::PcktRelErr => write!(f, "packet release error"),
            Self::IllServType => write!(f, "illegal service type"),
            Self::IllServSubType => write!(f, "illegal service sub-type"),
            Self::IllDiscriminant => write!(f, "illegal discriminant"),
            Self::InManagerIllId => write!(f, "InManager id out of range"),
            Self::InManagerPcrlFull => write!(f, "InManager PCRL full"),
            Self::OutManagerPoclFull => write!(f, "OutManager POCL full"),
            Self::OutFactoryFail => write!(f, "OutFactory allocation failed"),
        }
    }
}

/// Process-wide last-error latch.
///
/// Owned by the [`Framework`](crate::framework::Framework) context and
/// threaded by mutable reference into every primitive that can fail at
/// the application level.
#[derive(Debug, Clone, Copy)]
pub struct AppErrLatch {
    code: AppErrCode,
}

impl AppErrLatch {
    pub const fn new() -> Self {
        Self {
            code: AppErrCode::NoAppErr,
        }
    }

    /// Latch an error code, overwriting any previous one.
    pub fn set(&mut self, code: AppErrCode) {
        self.code = code;
    }

    /// The most recently latched code.
    pub fn code(&self) -> AppErrCode {
        self.code
    }

    /// Clear the latch back to [`AppErrCode::NoAppErr`].
    pub fn clear(&mut self) {
        self.code = AppErrCode::NoAppErr;
    }
}

impl Default for AppErrLatch {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Error report kinds (report plane)
// ---------------------------------------------------------------------------

/// Typed error kinds delivered to the application's error sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FwRepErr {
    /// An InStream's packet queue was full; the incoming packet was dropped.
    InStreamPQFull,
    /// A packet arrived with an unexpected group sequence counter.
    InStreamSeqCntErr,
    /// An OutStream's packet queue was full; the outgoing packet was dropped.
    OutStreamPQFull,
    /// No OutStream serves the packet's destination.
    OutStreamIllDest,
    /// A packet named a group beyond the configured group count.
    OutStreamIllGroup,
    /// An InManager rejected a load because its PCRL was full.
    InManagerPcrlFull,
    /// An OutManager rejected a load because its POCL was full.
    OutManagerPoclFull,
    /// The OutFactory could not provide an OutComponent (exhausted pool or
    /// unknown kind) while a verification report was being generated.
    OutFactoryFail,
    /// An incoming report's update action failed.
    InRepUpdateFail,
    /// A packet was re-routed to a destination with no known route.
    InLoaderInvDest,
    /// An incoming report failed one of the acceptance stages.
    InLoaderAccFail,
}

impl fmt::Display for FwRepErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InStreamPQFull => write!(f, "InStream packet queue full"),
            Self::InStreamSeqCntErr => write!(f, "InStream sequence counter gap"),
            Self::OutStreamPQFull => write!(f, "OutStream packet queue full"),
            Self::OutStreamIllDest => write!(f, "no OutStream for destination"),
            Self::OutStreamIllGroup => write!(f, "group out of range"),
            Self::InManagerPcrlFull => write!(f, "PCRL full"),
            Self::OutManagerPoclFull => write!(f, "POCL full"),
            Self::OutFactoryFail => write!(f, "OutFactory failed"),
            Self::InRepUpdateFail => write!(f, "InReport update failed"),
            Self::InLoaderInvDest => write!(f, "invalid re-routing destination"),
            Self::InLoaderAccFail => write!(f, "InReport acceptance failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Component identities (used in error reports and diagnostics)
// ---------------------------------------------------------------------------

/// Identifies which component class raised a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpKind {
    InStream,
    OutStream,
    InLoader,
    InManager,
    OutLoader,
    OutManager,
    InFactory,
    OutFactory,
    OutRegistry,
    InRegistry,
    InCommand,
    InReport,
    OutComponent,
}

impl fmt::Display for CmpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InStream => write!(f, "InStream"),
            Self::OutStream => write!(f, "OutStream"),
            Self::InLoader => write!(f, "InLoader"),
            Self::InManager => write!(f, "InManager"),
            Self::OutLoader => write!(f, "OutLoader"),
            Self::OutManager => write!(f, "OutManager"),
            Self::InFactory => write!(f, "InFactory"),
            Self::OutFactory => write!(f, "OutFactory"),
            Self::OutRegistry => write!(f, "OutRegistry"),
            Self::InRegistry => write!(f, "InRegistry"),
            Self::InCommand => write!(f, "InCommand"),
            Self::InReport => write!(f, "InReport"),
            Self::OutComponent => write!(f, "OutComponent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latch_overwrites_and_clears() {
        let mut latch = AppErrLatch::new();
        assert_eq!(latch.code(), AppErrCode::NoAppErr);

        latch.set(AppErrCode::PcktAllocationFail);
        latch.set(AppErrCode::PcktRelErr);
        assert_eq!(latch.code(), AppErrCode::PcktRelErr, "last error wins");

        latch.clear();
        assert_eq!(latch.code(), AppErrCode::NoAppErr);
    }
}
