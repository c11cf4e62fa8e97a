//! Application configuration tables.
//!
//! Everything the framework needs from the embedding application is
//! collected in one [`FwAppConfig`] of `&'static` tables and plain `fn`
//! pointers, handed to [`Framework::new`](crate::framework::Framework::new)
//! once at startup.  Kind tables must be sorted ascending on
//! `(serv_type, serv_sub_type, discriminant)` — verified by the
//! configuration consistency check before the framework will enter
//! CONFIGURED.
//!
//! The [`defaults`] module provides stock implementations for every
//! adaptation point so application tables can be assembled from parts.

use crate::error::{CmpKind, FwRepErr};
use crate::kinds::{InCmdKind, InRepKind, OutCmpKind};
use crate::packet::PcktKind;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Scalar attribute types
// ---------------------------------------------------------------------------

pub type ServType = u8;
pub type ServSubType = u8;
pub type Discriminant = u8;
pub type DestSrc = u8;
pub type Group = u8;
pub type SeqCnt = u32;
pub type InstanceId = u32;
pub type TimeStamp = u32;
/// Failure code carried by verification reports and action outcomes.
pub type FailCode = u16;

// ---------------------------------------------------------------------------
// Compile-time capacity caps
// ---------------------------------------------------------------------------

/// Published maximum for service types in kind tables.
pub const MAX_SERV_TYPE: ServType = 127;
/// Published maximum for service sub-types in kind tables.
pub const MAX_SERV_SUBTYPE: ServSubType = 127;

pub const MAX_IN_STREAMS: usize = 4;
pub const MAX_OUT_STREAMS: usize = 4;
pub const MAX_IN_MANAGERS: usize = 4;
pub const MAX_OUT_MANAGERS: usize = 4;
/// Per-manager cap on the pending command/report list.
pub const MAX_PCRL: usize = 16;
/// Per-manager cap on the pending out-component list.
pub const MAX_POCL: usize = 16;
/// Cap on sequence-counter groups per stream.
pub const MAX_GROUPS: usize = 4;
/// Cap on rows of the OutRegistry service table.
pub const MAX_SERV: usize = 16;
/// Bytes per discriminant-enable bitset (8 discriminants per byte).
pub const MAX_DISC_BYTES: usize = 32;

// ---------------------------------------------------------------------------
// Service descriptor (OutRegistry table row)
// ---------------------------------------------------------------------------

/// One row of the OutRegistry service table: a supported
/// (type, sub-type) pair and the largest discriminant it carries.
#[derive(Debug, Clone, Copy)]
pub struct ServDesc {
    pub serv_type: ServType,
    pub serv_sub_type: ServSubType,
    pub max_discriminant: Discriminant,
}

// ---------------------------------------------------------------------------
// Collaborator callback types
// ---------------------------------------------------------------------------

/// Returns the destination a non-local packet should be forwarded to,
/// or 0 if the argument destination is invalid.
pub type ReRouteFn = fn(DestSrc) -> DestSrc;

/// Selects the InManager an accepted command or report is loaded into.
pub type SelectInManagerFn = fn(ServType, ServSubType, Discriminant, PcktKind) -> usize;

/// Selects the OutManager a freshly made OutComponent is loaded into.
pub type SelectOutManagerFn = fn(ServType, ServSubType, Discriminant) -> usize;

/// Hook invoked after an OutComponent has been loaded into a manager.
pub type ActivateOutManagerFn = fn(usize);

/// Supplies the current time stamp for outgoing reports.
pub type TimeFn = fn() -> TimeStamp;

/// Error report sink: typed error kind, component class, instance, extra.
pub type ErrRepFn = fn(FwRepErr, CmpKind, InstanceId, u16);

// ---------------------------------------------------------------------------
// The application configuration record
// ---------------------------------------------------------------------------

/// Static configuration handed to the framework at construction.
///
/// Component counts are implied by table lengths: one InStream per
/// entry of `in_stream_pq_size`, one OutStream per entry of
/// `out_stream_pq_size` (whose destination is the matching entry of
/// `out_stream_dest`), and so on.
#[derive(Clone, Copy)]
pub struct FwAppConfig {
    /// The identifier of this application; packets addressed elsewhere
    /// are re-routed instead of accepted.
    pub host_app_id: DestSrc,
    /// Number of sequence-counter groups per stream.
    pub n_of_groups: usize,

    /// Incoming command kinds, sorted ascending on the kind triple.
    pub in_cmd_kinds: &'static [InCmdKind],
    /// Incoming report kinds, sorted ascending on the kind triple.
    pub in_rep_kinds: &'static [InRepKind],
    /// Outgoing component kinds, sorted ascending on the kind triple.
    pub out_cmp_kinds: &'static [OutCmpKind],
    /// OutRegistry service table, sorted ascending on (type, sub-type).
    pub serv_desc: &'static [ServDesc],

    /// Packet queue size per InStream.
    pub in_stream_pq_size: &'static [usize],
    /// Packet queue size per OutStream.
    pub out_stream_pq_size: &'static [usize],
    /// Destination served by each OutStream.
    pub out_stream_dest: &'static [DestSrc],
    /// PCRL size per InManager.
    pub in_manager_pcrl_size: &'static [usize],
    /// POCL size per OutManager.
    pub out_manager_pocl_size: &'static [usize],

    pub re_route_dest: ReRouteFn,
    pub select_in_manager: SelectInManagerFn,
    pub select_out_manager: SelectOutManagerFn,
    pub activate_out_manager: ActivateOutManagerFn,
    pub time: TimeFn,
    pub rep_err: ErrRepFn,
}

// ---------------------------------------------------------------------------
// Diagnostic snapshot
// ---------------------------------------------------------------------------

/// A point-in-time snapshot of framework resource usage, suitable for
/// logging or transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FwStatus {
    /// In-use packet buffers.
    pub n_allocated_pckts: usize,
    /// Allocated InCommand instances.
    pub n_allocated_in_cmds: usize,
    /// Allocated InReport instances.
    pub n_allocated_in_reps: usize,
    /// Allocated OutComponent instances.
    pub n_allocated_out_cmps: usize,
    /// Pending components per InManager.
    pub in_manager_pending: heapless::Vec<usize, MAX_IN_MANAGERS>,
    /// Components loaded since reset, per InManager.
    pub in_manager_loaded: heapless::Vec<u32, MAX_IN_MANAGERS>,
    /// Pending components per OutManager.
    pub out_manager_pending: heapless::Vec<usize, MAX_OUT_MANAGERS>,
    /// Queued packets per InStream.
    pub in_stream_depth: heapless::Vec<usize, MAX_IN_STREAMS>,
    /// Queued packets per OutStream.
    pub out_stream_depth: heapless::Vec<usize, MAX_OUT_STREAMS>,
}

// ---------------------------------------------------------------------------
// Stock adaptation-point implementations
// ---------------------------------------------------------------------------

/// Default implementations for every [`FwAppConfig`] callback.
pub mod defaults {
    use super::{DestSrc, Discriminant, InstanceId, ServSubType, ServType, TimeStamp};
    use crate::error::{CmpKind, FwRepErr};
    use crate::packet::PcktKind;

    /// Treat every destination as valid and return it unchanged.
    ///
    /// Suitable for gateways with one level of indirection.  Note the
    /// asymmetry with the name of the operation: no validation against
    /// the local application id is performed; an unknown destination is
    /// only caught later when no OutStream serves it.
    pub fn re_route_same(dest: DestSrc) -> DestSrc {
        dest
    }

    /// Treat every destination as invalid: no re-routing is performed.
    pub fn no_re_routing(_dest: DestSrc) -> DestSrc {
        0
    }

    /// Commands to InManager 0, reports to InManager 1.
    pub fn select_in_manager_split(
        _t: ServType,
        _st: ServSubType,
        _d: Discriminant,
        kind: PcktKind,
    ) -> usize {
        match kind {
            PcktKind::Cmd => 0,
            PcktKind::Rep => 1,
        }
    }

    /// Everything to InManager 0.
    pub fn select_in_manager_zero(
        _t: ServType,
        _st: ServSubType,
        _d: Discriminant,
        _kind: PcktKind,
    ) -> usize {
        0
    }

    /// Everything to OutManager 0.
    pub fn select_out_manager_zero(_t: ServType, _st: ServSubType, _d: Discriminant) -> usize {
        0
    }

    /// No activation hook.
    pub fn activate_noop(_mgr: usize) {}

    /// Fixed time source for embeddings without a clock.
    pub fn time_zero() -> TimeStamp {
        0
    }

    /// Error sink that forwards to the log facade.
    pub fn rep_err_log(kind: FwRepErr, cmp: CmpKind, instance: InstanceId, extra: u16) {
        log::warn!("{} {}: {} (extra={})", cmp, instance, kind, extra);
    }
}
