//! InStream / OutStream — per-channel packet streams.
//!
//! Each stream wraps a bounded [`PcktQueue`] and per-group sequence
//! counters.  Transports are injected at the call site through the
//! port traits below, so the streams never touch sockets directly and
//! the whole pipeline is testable with mock adapters:
//!
//! ```text
//!   InTransport ──▶ InStream ──▶ InLoader            (inbound)
//!   OutComponent ──▶ OutStream ──▶ OutTransport      (outbound)
//! ```
//!
//! The OutStream stamps the group sequence counter once, at enqueue
//! time, so a transport retry never double-increments a counter.  A
//! disabled OutStream keeps accepting packets but stops draining.

use crate::base::BaseCmp;
use crate::config::{DestSrc, FwAppConfig, SeqCnt, MAX_GROUPS};
use crate::error::{AppErrLatch, CmpKind, FwRepErr};
use crate::kinds::OutCmpCtx;
use crate::packet::{Pckt, PcktPool, PCKT_MAX_LEN};
use crate::queue::PcktQueue;
use log::{debug, warn};

// ---------------------------------------------------------------------------
// Transport ports
// ---------------------------------------------------------------------------

/// Inbound transport: yields one raw frame per call, `None` when idle.
pub trait InTransport {
    fn poll(&mut self, buf: &mut [u8]) -> Option<usize>;
}

/// Outbound transport: hands one frame to the link layer.
/// Returns `false` when the link is congested; the stream retries the
/// same packet on a later cycle.
pub trait OutTransport {
    fn send(&mut self, frame: &[u8]) -> bool;
}

// ---------------------------------------------------------------------------
// InStream
// ---------------------------------------------------------------------------

/// Inbound per-channel stream: collects packets from its transport and
/// offers them oldest-first to the InLoader.
pub struct InStream {
    base: BaseCmp,
    queue: PcktQueue,
    /// Last sequence counter seen per group (0 = none yet).
    seq_cnt: heapless::Vec<SeqCnt, MAX_GROUPS>,
    n_of_groups: usize,
    enabled: bool,
}

impl InStream {
    pub fn new(instance_id: u32, pq_size: usize, n_of_groups: usize) -> Self {
        let mut seq_cnt = heapless::Vec::new();
        for _ in 0..n_of_groups.min(MAX_GROUPS) {
            let _ = seq_cnt.push(0);
        }
        Self {
            base: BaseCmp::new(CmpKind::InStream, instance_id),
            queue: PcktQueue::new(pq_size),
            seq_cnt,
            n_of_groups: n_of_groups.min(MAX_GROUPS),
            enabled: true,
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

    /// Flush the queue, release all held packets, zero the counters.
    pub fn configure(&mut self, pool: &mut PcktPool, err: &mut AppErrLatch) {
        if !self.base.can_configure() {
            return;
        }
        self.reset(pool, err);
        self.base.mark_configured();
    }

    pub fn shutdown(&mut self, pool: &mut PcktPool, err: &mut AppErrLatch) {
        self.reset(pool, err);
        self.base.mark_shutdown();
    }

    fn reset(&mut self, pool: &mut PcktPool, err: &mut AppErrLatch) {
        self.queue.reset(pool, err);
        for c in &mut self.seq_cnt {
            *c = 0;
        }
        self.enabled = true;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Drain the transport into the packet queue.
    ///
    /// Each collected frame becomes a pool packet.  A sequence-counter
    /// gap within a group raises [`FwRepErr::InStreamSeqCntErr`] (with
    /// the expected counter as extra data) and resynchronises; the
    /// packet is still delivered.
    pub fn poll(
        &mut self,
        transport: &mut impl InTransport,
        pool: &mut PcktPool,
        cfg: &FwAppConfig,
        err: &mut AppErrLatch,
    ) {
        if !self.enabled || !self.base.is_configured() {
            return;
        }
        let mut buf = [0u8; PCKT_MAX_LEN];
        while let Some(n) = transport.poll(&mut buf) {
            if n == 0 {
                continue;
            }
            let Some(p) = pool.make(n, err) else {
                warn!("InStream {}: pool exhausted, frame dropped", self.base.instance_id());
                return;
            };
            pool.pckt_mut(p).fill_from(&buf[..n]);

            let (group, seq) = {
                let r = pool.pckt(p);
                (usize::from(r.group()), r.seq_cnt())
            };
            if group < self.n_of_groups {
                let expected = self.seq_cnt[group].wrapping_add(1);
                if self.seq_cnt[group] != 0 && seq != expected {
                    (cfg.rep_err)(
                        FwRepErr::InStreamSeqCntErr,
                        CmpKind::InStream,
                        self.base.instance_id(),
                        expected as u16,
                    );
                }
                self.seq_cnt[group] = seq;
            }

            if !self.queue.push(p) {
                (cfg.rep_err)(
                    FwRepErr::InStreamPQFull,
                    CmpKind::InStream,
                    self.base.instance_id(),
                    0,
                );
                pool.release(p, err);
                return;
            }
            debug!("InStream {}: collected {} bytes", self.base.instance_id(), n);
        }
    }

    /// The oldest collected packet, removed from the queue.
    pub fn get_pckt(&mut self) -> Option<Pckt> {
        self.queue.pop()
    }

    /// Whether a packet is waiting.
    pub fn pckt_avail(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.count()
    }
}

// ---------------------------------------------------------------------------
// OutStream
// ---------------------------------------------------------------------------

/// Outcome of handing a packet to [`send_to_dest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRes {
    /// The packet was copied into a stream queue (or dropped on a full
    /// queue, which is reported but not retried).
    Sent,
    /// Transient resource pressure; try again next cycle.
    Retry,
    /// No OutStream serves the destination.
    NoRoute,
}

/// Outbound per-channel stream: queues serialized packets and drains
/// them into its transport each cycle.
pub struct OutStream {
    base: BaseCmp,
    dest: DestSrc,
    queue: PcktQueue,
    /// Next sequence counter per group, stamped at enqueue.
    seq_cnt: heapless::Vec<SeqCnt, MAX_GROUPS>,
    n_of_groups: usize,
    enabled: bool,
}

impl OutStream {
    pub fn new(instance_id: u32, dest: DestSrc, pq_size: usize, n_of_groups: usize) -> Self {
        let mut seq_cnt = heapless::Vec::new();
        for _ in 0..n_of_groups.min(MAX_GROUPS) {
            let _ = seq_cnt.push(0);
        }
        Self {
            base: BaseCmp::new(CmpKind::OutStream, instance_id),
            dest,
            queue: PcktQueue::new(pq_size),
            seq_cnt,
            n_of_groups: n_of_groups.min(MAX_GROUPS),
            enabled: true,
        }
    }

    pub fn base(&self) -> &BaseCmp {
        &self.base
    }

    /// The destination this stream serves.
    pub fn dest(&self) -> DestSrc {
        self.dest
    }

    pub fn init(&mut self) {
        if self.base.can_init() {
            self.base.mark_initialized();
        }
    }

    pub fn configure(&mut self, pool: &mut PcktPool, err: &mut AppErrLatch) {
        if !self.base.can_configure() {
            return;
        }
        self.reset(pool, err);
        self.base.mark_configured();
    }

    pub fn shutdown(&mut self, pool: &mut PcktPool, err: &mut AppErrLatch) {
        self.reset(pool, err);
        self.base.mark_shutdown();
    }

    fn reset(&mut self, pool: &mut PcktPool, err: &mut AppErrLatch) {
        self.queue.reset(pool, err);
        for c in &mut self.seq_cnt {
            *c = 0;
        }
        self.enabled = true;
    }

    /// A disabled stream keeps queueing but stops draining.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Queue a copy of `src` for transmission, stamping the group
    /// sequence counter on the copy.
    pub fn send(
        &mut self,
        src: Pckt,
        pool: &mut PcktPool,
        cfg: &FwAppConfig,
        err: &mut AppErrLatch,
    ) -> SendRes {
        let Some(copy) = pool.duplicate(src, err) else {
            return SendRes::Retry;
        };

        let group = usize::from(pool.pckt(copy).group());
        if group < self.n_of_groups {
            let next = self.seq_cnt[group].wrapping_add(1);
            self.seq_cnt[group] = next;
            pool.pckt_mut(copy).set_seq_cnt(next);
        } else {
            (cfg.rep_err)(
                FwRepErr::OutStreamIllGroup,
                CmpKind::OutStream,
                self.base.instance_id(),
                group as u16,
            );
        }

        if self.queue.push(copy) {
            SendRes::Sent
        } else {
            (cfg.rep_err)(
                FwRepErr::OutStreamPQFull,
                CmpKind::OutStream,
                self.base.instance_id(),
                0,
            );
            pool.release(copy, err);
            SendRes::Sent
        }
    }

    /// Drain the queue into the transport, oldest first.  A transport
    /// refusal retains the packet for retry and ends the cycle.
    pub fn execute(
        &mut self,
        transport: &mut impl OutTransport,
        pool: &mut PcktPool,
        err: &mut AppErrLatch,
    ) {
        if !self.enabled || !self.base.is_configured() {
            return;
        }
        while let Some(p) = self.queue.peek_oldest() {
            let ok = transport.send(pool.pckt(p).raw());
            if !ok {
                debug!(
                    "OutStream {}: transport busy, retaining packet",
                    self.base.instance_id()
                );
                return;
            }
            let _ = self.queue.pop();
            pool.release(p, err);
        }
    }

    /// The sequence counter most recently stamped for a group.
    pub fn seq_cnt(&self, group: usize) -> SeqCnt {
        self.seq_cnt.get(group).copied().unwrap_or(0)
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.count()
    }
}

// ---------------------------------------------------------------------------
// Destination routing
// ---------------------------------------------------------------------------

/// Index of the OutStream serving `dest`, per the configuration table.
pub fn out_stream_for(cfg: &FwAppConfig, dest: DestSrc) -> Option<usize> {
    cfg.out_stream_dest.iter().position(|&d| d == dest)
}

/// Hand an OutComponent's serialized packet to the OutStream for its
/// destination.  Used from inside the OutComponent state machine.
pub(crate) fn send_to_dest(ctx: &mut OutCmpCtx<'_>, p: Pckt) -> SendRes {
    let dest = ctx.pool.pckt(p).dest();
    let Some(idx) = out_stream_for(ctx.cfg, dest) else {
        (ctx.cfg.rep_err)(FwRepErr::OutStreamIllDest, CmpKind::OutStream, 0, u16::from(dest));
        return SendRes::NoRoute;
    };
    ctx.out_streams[idx].send(p, ctx.pool, ctx.cfg, ctx.err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    /// Transport that yields a fixed list of frames then goes idle.
    struct ScriptedIn {
        frames: std::vec::Vec<std::vec::Vec<u8>>,
    }

    impl InTransport for ScriptedIn {
        fn poll(&mut self, buf: &mut [u8]) -> Option<usize> {
            if self.frames.is_empty() {
                return None;
            }
            let f = self.frames.remove(0);
            buf[..f.len()].copy_from_slice(&f);
            Some(f.len())
        }
    }

    /// Transport that records every frame it accepts.
    struct RecordingOut {
        frames: std::vec::Vec<std::vec::Vec<u8>>,
        accept: bool,
    }

    impl OutTransport for RecordingOut {
        fn send(&mut self, frame: &[u8]) -> bool {
            if self.accept {
                self.frames.push(frame.to_vec());
            }
            self.accept
        }
    }

    #[test]
    fn in_stream_collects_fifo() {
        let cfg = testutil::test_config();
        let mut err = AppErrLatch::new();
        let mut pool = PcktPool::new();
        let mut s = InStream::new(0, 4, 1);
        s.init();
        s.configure(&mut pool, &mut err);

        let mut tr = ScriptedIn {
            frames: vec![vec![1u8; 30], vec![2u8; 30]],
        };
        s.poll(&mut tr, &mut pool, cfg, &mut err);

        assert_eq!(s.queue_depth(), 2);
        let first = s.get_pckt().unwrap();
        assert_eq!(pool.pckt(first).raw()[25], 1, "oldest frame first");
        let second = s.get_pckt().unwrap();
        assert_eq!(pool.pckt(second).raw()[25], 2);
        assert!(!s.pckt_avail());
    }

    #[test]
    fn out_stream_stamps_monotonic_seq_cnt() {
        let cfg = testutil::test_config();
        let mut err = AppErrLatch::new();
        let mut pool = PcktPool::new();
        let mut s = OutStream::new(0, 9, 4, 1);
        s.init();
        s.configure(&mut pool, &mut err);

        let p = pool.make(30, &mut err).unwrap();
        assert_eq!(s.send(p, &mut pool, cfg, &mut err), SendRes::Sent);
        assert_eq!(s.send(p, &mut pool, cfg, &mut err), SendRes::Sent);
        assert_eq!(s.seq_cnt(0), 2);

        let mut tr = RecordingOut {
            frames: vec![],
            accept: true,
        };
        s.execute(&mut tr, &mut pool, &mut err);
        assert_eq!(tr.frames.len(), 2);
        // counters ride in the copies, oldest first
        assert_eq!(tr.frames[0][8], 1);
        assert_eq!(tr.frames[1][8], 2);
    }

    #[test]
    fn disabled_out_stream_retains_queue() {
        let cfg = testutil::test_config();
        let mut err = AppErrLatch::new();
        let mut pool = PcktPool::new();
        let mut s = OutStream::new(0, 9, 4, 1);
        s.init();
        s.configure(&mut pool, &mut err);

        let p = pool.make(30, &mut err).unwrap();
        let _ = s.send(p, &mut pool, cfg, &mut err);
        s.set_enabled(false);

        let mut tr = RecordingOut {
            frames: vec![],
            accept: true,
        };
        s.execute(&mut tr, &mut pool, &mut err);
        assert!(tr.frames.is_empty());
        assert_eq!(s.queue_depth(), 1);

        s.set_enabled(true);
        s.execute(&mut tr, &mut pool, &mut err);
        assert_eq!(tr.frames.len(), 1);
        assert_eq!(s.queue_depth(), 0);
    }

    #[test]
    fn seq_cnt_gap_is_reported_once_and_resyncs() {
        use crate::error::FwRepErr;
        use core::sync::atomic::{AtomicU32, Ordering};

        static SEQ_ERRS: AtomicU32 = AtomicU32::new(0);
        fn count_seq_err(kind: FwRepErr, _cmp: CmpKind, _id: u32, _extra: u16) {
            if kind == FwRepErr::InStreamSeqCntErr {
                SEQ_ERRS.fetch_add(1, Ordering::Relaxed);
            }
        }

        let mut cfg = *testutil::test_config();
        cfg.rep_err = count_seq_err;

        let mut err = AppErrLatch::new();
        let mut pool = PcktPool::new();
        let mut s = InStream::new(0, 8, 1);
        s.init();
        s.configure(&mut pool, &mut err);

        let frame_with_seq = |seq: u32| {
            let mut p2 = PcktPool::new();
            let mut e2 = AppErrLatch::new();
            let p = p2.make(30, &mut e2).unwrap();
            {
                let mut m = p2.pckt_mut(p);
                m.set_group(0);
                m.set_seq_cnt(seq);
            }
            p2.pckt(p).raw().to_vec()
        };

        let mut tr = ScriptedIn {
            frames: vec![frame_with_seq(5), frame_with_seq(9), frame_with_seq(10)],
        };
        SEQ_ERRS.store(0, Ordering::Relaxed);
        s.poll(&mut tr, &mut pool, &cfg, &mut err);

        assert_eq!(SEQ_ERRS.load(Ordering::Relaxed), 1, "one gap, one report");
        assert_eq!(s.queue_depth(), 3, "gapped packet still delivered");
    }

    #[test]
    fn transport_refusal_retains_packet_without_restamp() {
        let cfg = testutil::test_config();
        let mut err = AppErrLatch::new();
        let mut pool = PcktPool::new();
        let mut s = OutStream::new(0, 9, 4, 1);
        s.init();
        s.configure(&mut pool, &mut err);

        let p = pool.make(30, &mut err).unwrap();
        let _ = s.send(p, &mut pool, cfg, &mut err);

        let mut tr = RecordingOut {
            frames: vec![],
            accept: false,
        };
        s.execute(&mut tr, &mut pool, &mut err);
        assert_eq!(s.queue_depth(), 1, "refused packet retained");

        tr.accept = true;
        s.execute(&mut tr, &mut pool, &mut err);
        assert_eq!(tr.frames.len(), 1);
        assert_eq!(tr.frames[0][8], 1, "stamped once, at enqueue");
    }
}
