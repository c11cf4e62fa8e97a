//! Packet handles, the packet pool, and the default attribute layout.
//!
//! A packet is an opaque byte buffer owned by the [`PcktPool`].  Callers
//! hold a non-owning [`Pckt`] handle and access the buffer only through
//! the attribute contract ([`PcktRef`] / [`PcktMut`]), never through raw
//! offsets.  The mapping of attributes to buffer positions is collected
//! in one offset table below; the rest of the crate is layout-agnostic.
//!
//! ```text
//! ┌────────────────────── PcktPool ──────────────────────┐
//! │  slot 0: [len][in_use][  bytes  ...............  ]   │
//! │  slot 1: [len][in_use][  bytes  ...............  ]   │
//! │  ...                                                 │
//! │  slot N: [len][in_use][  bytes  ...............  ]   │
//! └──────────────────────────────────────────────────────┘
//!          ▲ Pckt(i) handles index into the slot array
//! ```
//!
//! The pool pre-allocates every buffer at construction; `make` and
//! `release` only flip the in-use flag.  Double release is detected and
//! latched as [`AppErrCode::PcktRelErr`] without further effect.

use crate::config::{DestSrc, Discriminant, Group, InstanceId, SeqCnt, ServSubType, ServType, TimeStamp};
use crate::error::{AppErrCode, AppErrLatch};

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum length of a packet in bytes.  Every pool slot is this size.
pub const PCKT_MAX_LEN: usize = 128;

/// Number of pre-allocated packet buffers in the pool.
pub const PCKT_POOL_SIZE: usize = 20;

/// First byte of the parameter area; bytes below this hold the header
/// attributes.  Packets shorter than this cannot carry attributes.
pub const PCKT_HEADER_LEN: usize = 20;

// ---------------------------------------------------------------------------
// Attribute offset table (default layout)
// ---------------------------------------------------------------------------
//
// One dispatched table instead of per-attribute open-coded arithmetic.
// Multi-byte fields are little-endian.

const OFF_KIND: usize = 0;
const OFF_SERV_TYPE: usize = 1;
const OFF_SERV_SUB_TYPE: usize = 2;
const OFF_DISCRIMINANT: usize = 3;
const OFF_SRC: usize = 4;
const OFF_DEST: usize = 5;
const OFF_GROUP: usize = 6;
const OFF_ACK: usize = 7;
const OFF_SEQ_CNT: usize = 8;
const OFF_TIME_STAMP: usize = 12;
const OFF_CMD_REP_ID: usize = 16;

const ACK_ACC: u8 = 0b0001;
const ACK_START: u8 = 0b0010;
const ACK_PROG: u8 = 0b0100;
const ACK_TERM: u8 = 0b1000;

/// Whether a packet carries a command or a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PcktKind {
    Cmd = 1,
    Rep = 2,
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Non-owning handle to a pooled packet buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pckt(pub(crate) usize);

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

struct PcktSlot {
    bytes: [u8; PCKT_MAX_LEN],
    len: usize,
    in_use: bool,
}

/// Fixed-capacity allocator of raw packet buffers.
pub struct PcktPool {
    slots: [PcktSlot; PCKT_POOL_SIZE],
    n_allocated: usize,
}

impl PcktPool {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| PcktSlot {
                bytes: [0; PCKT_MAX_LEN],
                len: 0,
                in_use: false,
            }),
            n_allocated: 0,
        }
    }

    /// Claim a zero-initialised buffer of at least `len` bytes.
    ///
    /// Fails (returning `None` and latching
    /// [`AppErrCode::PcktAllocationFail`]) if `len` is zero, exceeds
    /// [`PCKT_MAX_LEN`], or no slot is free.
    pub fn make(&mut self, len: usize, err: &mut AppErrLatch) -> Option<Pckt> {
        if len == 0 || len > PCKT_MAX_LEN {
            err.set(AppErrCode::PcktAllocationFail);
            return None;
        }
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if !slot.in_use {
                slot.bytes = [0; PCKT_MAX_LEN];
                slot.len = len;
                slot.in_use = true;
                self.n_allocated += 1;
                return Some(Pckt(i));
            }
        }
        err.set(AppErrCode::PcktAllocationFail);
        None
    }

    /// Return a buffer to the pool.
    ///
    /// Releasing a handle that is out of range or already free latches
    /// [`AppErrCode::PcktRelErr`] and leaves the pool unchanged.
    pub fn release(&mut self, p: Pckt, err: &mut AppErrLatch) {
        match self.slots.get_mut(p.0) {
            Some(slot) if slot.in_use => {
                slot.in_use = false;
                slot.len = 0;
                self.n_allocated -= 1;
            }
            _ => {
                err.set(AppErrCode::PcktRelErr);
            }
        }
    }

    /// True iff a `make` with this length would currently succeed.
    pub fn is_avail(&self, len: usize) -> bool {
        len != 0 && len <= PCKT_MAX_LEN && self.n_allocated < PCKT_POOL_SIZE
    }

    /// Number of in-use slots.
    pub fn n_of_allocated(&self) -> usize {
        self.n_allocated
    }

    /// The fixed maximum packet length.
    pub fn max_length(&self) -> usize {
        PCKT_MAX_LEN
    }

    /// Read-only attribute view of a packet.
    pub fn pckt(&self, p: Pckt) -> PcktRef<'_> {
        let slot = &self.slots[p.0];
        debug_assert!(slot.in_use, "attribute access on a free packet slot");
        PcktRef {
            bytes: &slot.bytes[..slot.len],
        }
    }

    /// Mutable attribute view of a packet.
    pub fn pckt_mut(&mut self, p: Pckt) -> PcktMut<'_> {
        let slot = &mut self.slots[p.0];
        debug_assert!(slot.in_use, "attribute access on a free packet slot");
        PcktMut {
            bytes: &mut slot.bytes[..slot.len],
        }
    }

    /// Whether the handle currently names an in-use slot.
    pub fn is_in_use(&self, p: Pckt) -> bool {
        self.slots.get(p.0).is_some_and(|s| s.in_use)
    }

    /// Copy the contents of `src` into a freshly made packet of the same
    /// length.  Used by the OutStream to take ownership of outgoing
    /// frames without disturbing the originating component.
    pub fn duplicate(&mut self, src: Pckt, err: &mut AppErrLatch) -> Option<Pckt> {
        let len = self.slots[src.0].len;
        let copy = self.make(len, err)?;
        let (a, b) = if src.0 < copy.0 {
            let (lo, hi) = self.slots.split_at_mut(copy.0);
            (&lo[src.0], &mut hi[0])
        } else {
            let (lo, hi) = self.slots.split_at_mut(src.0);
            (&hi[0], &mut lo[copy.0])
        };
        b.bytes[..len].copy_from_slice(&a.bytes[..len]);
        Some(copy)
    }
}

impl Default for PcktPool {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Attribute views
// ---------------------------------------------------------------------------

fn read_u32(bytes: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([bytes[off], bytes[off + 1], bytes[off + 2], bytes[off + 3]])
}

/// Read-only view of a packet's attributes.
pub struct PcktRef<'a> {
    bytes: &'a [u8],
}

impl PcktRef<'_> {
    pub fn length(&self) -> usize {
        self.bytes.len()
    }

    pub fn kind(&self) -> PcktKind {
        if self.bytes[OFF_KIND] == PcktKind::Cmd as u8 {
            PcktKind::Cmd
        } else {
            PcktKind::Rep
        }
    }

    pub fn serv_type(&self) -> ServType {
        self.bytes[OFF_SERV_TYPE]
    }

    pub fn serv_sub_type(&self) -> ServSubType {
        self.bytes[OFF_SERV_SUB_TYPE]
    }

    pub fn discriminant(&self) -> Discriminant {
        self.bytes[OFF_DISCRIMINANT]
    }

    pub fn src(&self) -> DestSrc {
        self.bytes[OFF_SRC]
    }

    pub fn dest(&self) -> DestSrc {
        self.bytes[OFF_DEST]
    }

    pub fn group(&self) -> Group {
        self.bytes[OFF_GROUP]
    }

    pub fn seq_cnt(&self) -> SeqCnt {
        read_u32(self.bytes, OFF_SEQ_CNT)
    }

    pub fn time_stamp(&self) -> TimeStamp {
        read_u32(self.bytes, OFF_TIME_STAMP)
    }

    pub fn cmd_rep_id(&self) -> InstanceId {
        read_u32(self.bytes, OFF_CMD_REP_ID)
    }

    pub fn ack_acc(&self) -> bool {
        self.bytes[OFF_ACK] & ACK_ACC != 0
    }

    pub fn ack_start(&self) -> bool {
        self.bytes[OFF_ACK] & ACK_START != 0
    }

    pub fn ack_prog(&self) -> bool {
        self.bytes[OFF_ACK] & ACK_PROG != 0
    }

    pub fn ack_term(&self) -> bool {
        self.bytes[OFF_ACK] & ACK_TERM != 0
    }

    /// The parameter area (everything after the header).
    pub fn par_area(&self) -> &[u8] {
        &self.bytes[PCKT_HEADER_LEN.min(self.bytes.len())..]
    }

    /// The whole frame, for handing to a transport.
    pub fn raw(&self) -> &[u8] {
        self.bytes
    }
}

/// Mutable view of a packet's attributes.
pub struct PcktMut<'a> {
    bytes: &'a mut [u8],
}

impl PcktMut<'_> {
    pub fn set_kind(&mut self, kind: PcktKind) {
        self.bytes[OFF_KIND] = kind as u8;
    }

    pub fn set_serv_type(&mut self, v: ServType) {
        self.bytes[OFF_SERV_TYPE] = v;
    }

    pub fn set_serv_sub_type(&mut self, v: ServSubType) {
        self.bytes[OFF_SERV_SUB_TYPE] = v;
    }

    pub fn set_discriminant(&mut self, v: Discriminant) {
        self.bytes[OFF_DISCRIMINANT] = v;
    }

    pub fn set_src(&mut self, v: DestSrc) {
        self.bytes[OFF_SRC] = v;
    }

    pub fn set_dest(&mut self, v: DestSrc) {
        self.bytes[OFF_DEST] = v;
    }

    pub fn set_group(&mut self, v: Group) {
        self.bytes[OFF_GROUP] = v;
    }

    pub fn set_seq_cnt(&mut self, v: SeqCnt) {
        self.bytes[OFF_SEQ_CNT..OFF_SEQ_CNT + 4].copy_from_slice(&v.to_le_bytes());
    }

    pub fn set_time_stamp(&mut self, v: TimeStamp) {
        self.bytes[OFF_TIME_STAMP..OFF_TIME_STAMP + 4].copy_from_slice(&v.to_le_bytes());
    }

    pub fn set_cmd_rep_id(&mut self, v: InstanceId) {
        self.bytes[OFF_CMD_REP_ID..OFF_CMD_REP_ID + 4].copy_from_slice(&v.to_le_bytes());
    }

    pub fn set_ack_levels(&mut self, acc: bool, start: bool, prog: bool, term: bool) {
        let mut flags = 0;
        if acc {
            flags |= ACK_ACC;
        }
        if start {
            flags |= ACK_START;
        }
        if prog {
            flags |= ACK_PROG;
        }
        if term {
            flags |= ACK_TERM;
        }
        self.bytes[OFF_ACK] = flags;
    }

    /// Mutable parameter area.
    pub fn par_area_mut(&mut self) -> &mut [u8] {
        let start = PCKT_HEADER_LEN.min(self.bytes.len());
        &mut self.bytes[start..]
    }

    /// Overwrite the whole frame from transport bytes.
    pub fn fill_from(&mut self, frame: &[u8]) {
        let n = frame.len().min(self.bytes.len());
        self.bytes[..n].copy_from_slice(&frame[..n]);
    }

    /// Downgrade to a read-only view.
    pub fn as_ref(&self) -> PcktRef<'_> {
        PcktRef { bytes: self.bytes }
    }
}
