//! Command/report state registries.
//!
//! The [`OutRegistry`] answers two questions about outgoing commands and
//! reports: *may this kind be emitted at all* (the tri-level enable
//! mask: service type → sub-type → discriminant bitset) and *what became
//! of instance N* (a finite ring of the most recent
//! `(instance_id, state)` pairs, silently overwritten as it wraps).
//!
//! ```text
//!  enable mask                    tracking ring
//!  ┌─ type 1 ─────────────┐       ┌────┬────┬────┬────┐
//!  │ enabled: yes         │       │id 7│id 8│id 9│id 4│◀─ oldest,
//!  │ ├─ sub 1: yes        │       │Term│Pend│Pend│Abrt│   about to be
//!  │ ├─ sub 2: no         │       └────┴────┴────┴────┘   overwritten
//!  │ │   └─ disc bits 1010│             ▲ ring_idx
//! ```
//!
//! The [`InRegistry`] is the incoming-side sibling: the same tracking
//! ring, no enable mask.

use crate::base::BaseCmp;
use crate::config::{
    Discriminant, InstanceId, ServDesc, ServSubType, ServType, MAX_DISC_BYTES, MAX_SERV,
};
use crate::error::{AppErrCode, AppErrLatch, CmpKind};
use log::info;

/// Entries in the OutRegistry tracking ring.
pub const OUTREGISTRY_N: usize = 8;

/// Entries in the InRegistry tracking ring.
pub const INREGISTRY_N: usize = 8;

/// State of a tracked command or report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdRepState {
    /// The ring slot holds no entry (or the entry has been overwritten).
    NoEntry,
    /// The instance was never tracked.
    NotTracked,
    Pending,
    Terminated,
    Aborted,
}

// ---------------------------------------------------------------------------
// Tracking ring (shared by both registries)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Tracked {
    instance_id: InstanceId,
    state: CmdRepState,
}

/// Finite ring of the most recent `(instance_id, state)` pairs.
///
/// Instance identifiers are assigned monotonically and tracked in
/// insertion order, so the entries overwritten by the wrapping cursor
/// are always the oldest.  Remembering the highest overwritten id is
/// therefore enough to tell a rolled-out instance ([`CmdRepState::NoEntry`])
/// from one that was never tracked ([`CmdRepState::NotTracked`]).
struct TrackRing<const N: usize> {
    entries: [Tracked; N],
    /// Index of the next entry to write; advances modulo `N`.
    idx: usize,
    /// Highest instance id whose entry has been overwritten.
    overwritten_up_to: Option<InstanceId>,
}

impl<const N: usize> TrackRing<N> {
    fn new() -> Self {
        Self {
            entries: [Tracked {
                instance_id: 0,
                state: CmdRepState::NoEntry,
            }; N],
            idx: 0,
            overwritten_up_to: None,
        }
    }

    fn clear(&mut self) {
        for e in &mut self.entries {
            e.state = CmdRepState::NoEntry;
        }
        self.idx = 0;
        self.overwritten_up_to = None;
    }

    /// Record a new Pending entry; returns the ring index the caller
    /// must remember for later updates.
    fn start_tracking(&mut self, id: InstanceId) -> usize {
        let at = self.idx;
        if self.entries[at].state != CmdRepState::NoEntry {
            let old = self.entries[at].instance_id;
            self.overwritten_up_to = Some(self.overwritten_up_to.map_or(old, |m| m.max(old)));
        }
        self.entries[at] = Tracked {
            instance_id: id,
            state: CmdRepState::Pending,
        };
        self.idx = (self.idx + 1) % N;
        at
    }

    /// Update the entry at `at` — only while it still belongs to `id`.
    fn update_state(&mut self, at: usize, id: InstanceId, state: CmdRepState) {
        if self.entries[at].instance_id == id && self.entries[at].state != CmdRepState::NoEntry {
            self.entries[at].state = state;
        }
    }

    /// Scan backward from the most recent entry for `id`.
    fn state_of(&self, id: InstanceId) -> CmdRepState {
        let mut i = if self.idx > 0 { self.idx - 1 } else { N - 1 };
        for _ in 0..N {
            if self.entries[i].state == CmdRepState::NoEntry {
                break;
            }
            if self.entries[i].instance_id == id {
                return self.entries[i].state;
            }
            i = if i == 0 { N - 1 } else { i - 1 };
        }
        if self.overwritten_up_to.is_some_and(|m| id <= m) {
            CmdRepState::NoEntry
        } else {
            CmdRepState::NotTracked
        }
    }
}

// ---------------------------------------------------------------------------
// OutRegistry
// ---------------------------------------------------------------------------

struct ServSlot {
    serv_type: ServType,
    serv_sub_type: ServSubType,
    max_discriminant: Discriminant,
    type_enabled: bool,
    sub_type_enabled: bool,
    /// One bit per discriminant, bit `d-1` for discriminant `d`.
    disc_enabled: heapless::Vec<u8, MAX_DISC_BYTES>,
}

/// Enable mask plus tracking ring for outgoing commands and reports.
pub struct OutRegistry {
    base: BaseCmp,
    serv: heapless::Vec<ServSlot, MAX_SERV>,
    ring: TrackRing<OUTREGISTRY_N>,
}

impl OutRegistry {
    pub fn new() -> Self {
        Self {
            base: BaseCmp::new(CmpKind::OutRegistry, 0),
            serv: heapless::Vec::new(),
            ring: TrackRing::new(),
        }
    }

    pub fn base(&self) -> &BaseCmp {
        &self.base
    }

    /// Initialization action: build one slot per service-table row.
    pub fn init(&mut self, serv_desc: &[ServDesc]) {
        if !self.base.can_init() {
            return;
        }
        self.serv.clear();
        for desc in serv_desc {
            let n_bytes = (usize::from(desc.max_discriminant) + 7) / 8;
            let mut bits = heapless::Vec::new();
            for _ in 0..n_bytes {
                if bits.push(0xFF).is_err() {
                    break;
                }
            }
            let slot = ServSlot {
                serv_type: desc.serv_type,
                serv_sub_type: desc.serv_sub_type,
                max_discriminant: desc.max_discriminant,
                type_enabled: true,
                sub_type_enabled: true,
                disc_enabled: bits,
            };
            if self.serv.push(slot).is_err() {
                break;
            }
        }
        self.base.mark_initialized();
    }

    /// Configuration action: everything enabled, tracking ring cleared.
    pub fn configure(&mut self) {
        if !self.base.can_configure() {
            return;
        }
        for slot in &mut self.serv {
            slot.type_enabled = true;
            slot.sub_type_enabled = true;
            for b in &mut slot.disc_enabled {
                *b = 0xFF;
            }
        }
        self.ring.clear();
        self.base.mark_configured();
    }

    pub fn shutdown(&mut self) {
        self.serv.clear();
        self.ring.clear();
        self.base.mark_shutdown();
    }

    /// Index of the service-table row for `(t, st)`.
    pub fn serv_index(&self, t: ServType, st: ServSubType) -> Option<usize> {
        self.serv
            .iter()
            .position(|s| s.serv_type == t && s.serv_sub_type == st)
    }

    /// Update the enable mask.
    ///
    /// `st == 0` applies to every sub-type of `t`; `d == 0` applies to
    /// the sub-type flag.  Unknown type, sub-type, or out-of-range
    /// discriminant latches the matching application error.
    pub fn set_enable(
        &mut self,
        t: ServType,
        st: ServSubType,
        d: Discriminant,
        enabled: bool,
        err: &mut AppErrLatch,
    ) {
        if !self.serv.iter().any(|s| s.serv_type == t) {
            err.set(AppErrCode::IllServType);
            return;
        }
        if st == 0 {
            for slot in self.serv.iter_mut().filter(|s| s.serv_type == t) {
                slot.type_enabled = enabled;
            }
            info!("OutRegistry: service type {} -> enabled={}", t, enabled);
            return;
        }
        let Some(slot) = self
            .serv
            .iter_mut()
            .find(|s| s.serv_type == t && s.serv_sub_type == st)
        else {
            err.set(AppErrCode::IllServSubType);
            return;
        };
        if d == 0 {
            slot.sub_type_enabled = enabled;
            return;
        }
        if d > slot.max_discriminant {
            err.set(AppErrCode::IllDiscriminant);
            return;
        }
        let byte = usize::from(d - 1) / 8;
        let bit = (d - 1) % 8;
        if enabled {
            slot.disc_enabled[byte] |= 1 << bit;
        } else {
            slot.disc_enabled[byte] &= !(1 << bit);
        }
    }

    /// True iff the type is enabled, the sub-type is enabled, and the
    /// discriminant is zero or its bit is set.
    pub fn is_enabled(&self, serv_idx: usize, d: Discriminant) -> bool {
        let Some(slot) = self.serv.get(serv_idx) else {
            return false;
        };
        if !slot.type_enabled || !slot.sub_type_enabled {
            return false;
        }
        if d == 0 {
            return true;
        }
        if d > slot.max_discriminant {
            return false;
        }
        let byte = usize::from(d - 1) / 8;
        let bit = (d - 1) % 8;
        slot.disc_enabled[byte] & (1 << bit) != 0
    }

    pub fn start_tracking(&mut self, id: InstanceId) -> usize {
        self.ring.start_tracking(id)
    }

    pub fn update_state(&mut self, at: usize, id: InstanceId, state: CmdRepState) {
        self.ring.update_state(at, id, state);
    }

    pub fn state_of(&self, id: InstanceId) -> CmdRepState {
        self.ring.state_of(id)
    }
}

impl Default for OutRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// InRegistry
// ---------------------------------------------------------------------------

/// Tracking ring for incoming commands and reports.
pub struct InRegistry {
    base: BaseCmp,
    ring: TrackRing<INREGISTRY_N>,
}

impl InRegistry {
    pub fn new() -> Self {
        Self {
            base: BaseCmp::new(CmpKind::InRegistry, 0),
            ring: TrackRing::new(),
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
            self.ring.clear();
            self.base.mark_configured();
        }
    }

    pub fn shutdown(&mut self) {
        self.ring.clear();
        self.base.mark_shutdown();
    }

    pub fn start_tracking(&mut self, id: InstanceId) -> usize {
        self.ring.start_tracking(id)
    }

    pub fn update_state(&mut self, at: usize, id: InstanceId, state: CmdRepState) {
        self.ring.update_state(at, id, state);
    }

    pub fn state_of(&self, id: InstanceId) -> CmdRepState {
        self.ring.state_of(id)
    }
}

impl Default for InRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERV: &[ServDesc] = &[
        ServDesc {
            serv_type: 1,
            serv_sub_type: 1,
            max_discriminant: 0,
        },
        ServDesc {
            serv_type: 5,
            serv_sub_type: 2,
            max_discriminant: 10,
        },
    ];

    fn make_registry() -> OutRegistry {
        let mut reg = OutRegistry::new();
        reg.init(SERV);
        reg.configure();
        reg
    }

    #[test]
    fn everything_enabled_after_configure() {
        let reg = make_registry();
        let idx = reg.serv_index(5, 2).unwrap();
        assert!(reg.is_enabled(idx, 0));
        assert!(reg.is_enabled(idx, 1));
        assert!(reg.is_enabled(idx, 10));
        assert!(!reg.is_enabled(idx, 11), "beyond max discriminant");
    }

    #[test]
    fn disable_sub_type_masks_all_discriminants() {
        let mut reg = make_registry();
        let mut err = AppErrLatch::new();
        reg.set_enable(5, 2, 0, false, &mut err);
        let idx = reg.serv_index(5, 2).unwrap();
        assert!(!reg.is_enabled(idx, 0));
        assert!(!reg.is_enabled(idx, 3));
        assert_eq!(err.code(), AppErrCode::NoAppErr);
    }

    #[test]
    fn disable_whole_type_then_reenable_discriminant_path() {
        let mut reg = make_registry();
        let mut err = AppErrLatch::new();
        reg.set_enable(5, 0, 0, false, &mut err);
        let idx = reg.serv_index(5, 2).unwrap();
        assert!(!reg.is_enabled(idx, 1), "type-level disable wins");

        reg.set_enable(5, 0, 0, true, &mut err);
        reg.set_enable(5, 2, 3, false, &mut err);
        assert!(!reg.is_enabled(idx, 3));
        assert!(reg.is_enabled(idx, 4), "other discriminants unaffected");
    }

    #[test]
    fn illegal_arguments_latch_codes() {
        let mut reg = make_registry();
        let mut err = AppErrLatch::new();

        reg.set_enable(99, 1, 0, false, &mut err);
        assert_eq!(err.code(), AppErrCode::IllServType);

        reg.set_enable(5, 9, 0, false, &mut err);
        assert_eq!(err.code(), AppErrCode::IllServSubType);

        reg.set_enable(5, 2, 11, false, &mut err);
        assert_eq!(err.code(), AppErrCode::IllDiscriminant);
    }

    #[test]
    fn ring_overwrites_oldest_after_n_starts() {
        let mut reg = make_registry();
        let first = 100;
        let mut indices = heapless::Vec::<usize, 16>::new();
        for i in 0..=OUTREGISTRY_N as u32 {
            let _ = indices.push(reg.start_tracking(first + i));
        }
        // nine starts into a ring of eight: the first entry is gone
        assert_eq!(reg.state_of(first), CmdRepState::NoEntry);
        assert_eq!(
            reg.state_of(first + OUTREGISTRY_N as u32),
            CmdRepState::Pending
        );
        // positions advance modulo N
        assert_eq!(indices[0], indices[OUTREGISTRY_N]);
    }

    #[test]
    fn update_state_ignores_overwritten_entries() {
        let mut reg = make_registry();
        let at = reg.start_tracking(1);
        for i in 2..=(OUTREGISTRY_N as u32 + 1) {
            let _ = reg.start_tracking(i);
        }
        // entry for id 1 was overwritten; its recorded index now holds id 9
        reg.update_state(at, 1, CmdRepState::Terminated);
        assert_eq!(reg.state_of(1), CmdRepState::NoEntry);
    }

    #[test]
    fn never_tracked_is_distinguished_from_rolled_out() {
        let reg = make_registry();
        assert_eq!(reg.state_of(42), CmdRepState::NotTracked);
    }

    #[test]
    fn in_registry_ring_mirrors_out_registry_semantics() {
        let mut reg = InRegistry::new();
        reg.init();
        reg.configure();

        let at = reg.start_tracking(1);
        reg.update_state(at, 1, CmdRepState::Terminated);
        assert_eq!(reg.state_of(1), CmdRepState::Terminated);

        for i in 2..=(INREGISTRY_N as u32 + 1) {
            let _ = reg.start_tracking(i);
        }
        assert_eq!(reg.state_of(1), CmdRepState::NoEntry, "rolled out");
        assert_eq!(reg.state_of(2), CmdRepState::Pending);
    }
}
