//! Property tests for the bounded core data structures.

use proptest::prelude::*;

use pusfw::config::ServDesc;
use pusfw::error::{AppErrCode, AppErrLatch};
use pusfw::packet::{PcktPool, PCKT_MAX_LEN, PCKT_POOL_SIZE};
use pusfw::queue::PcktQueue;
use pusfw::registry::{CmdRepState, OutRegistry, OUTREGISTRY_N};

// ── Packet pool accounting ────────────────────────────────────

#[derive(Debug, Clone)]
enum PoolOp {
    Make(usize),
    /// Release the i-th currently-held packet (modulo holdings).
    Release(usize),
    /// Release a handle we no longer hold (double release).
    DoubleRelease,
}

fn arb_pool_op() -> impl Strategy<Value = PoolOp> {
    prop_oneof![
        (1usize..=PCKT_MAX_LEN).prop_map(PoolOp::Make),
        (0usize..16).prop_map(PoolOp::Release),
        Just(PoolOp::DoubleRelease),
    ]
}

proptest! {
    /// After any operation sequence, the allocation counter equals the
    /// number of packets actually held and never exceeds the capacity.
    #[test]
    fn pool_counter_matches_holdings(ops in proptest::collection::vec(arb_pool_op(), 1..=60)) {
        let mut err = AppErrLatch::new();
        let mut pool = PcktPool::new();
        let mut held = Vec::new();
        let mut released = Vec::new();

        for op in ops {
            match op {
                PoolOp::Make(len) => {
                    if let Some(p) = pool.make(len, &mut err) {
                        held.push(p);
                    }
                }
                PoolOp::Release(i) => {
                    if !held.is_empty() {
                        let p = held.remove(i % held.len());
                        pool.release(p, &mut err);
                        released.push(p);
                    }
                }
                PoolOp::DoubleRelease => {
                    // Only meaningful while the slot has not been handed
                    // out again by a later make.
                    if let Some(&p) = released.last() {
                        if !held.contains(&p) {
                            let before = pool.n_of_allocated();
                            err.clear();
                            pool.release(p, &mut err);
                            prop_assert_eq!(err.code(), AppErrCode::PcktRelErr);
                            prop_assert_eq!(pool.n_of_allocated(), before);
                        }
                    }
                }
            }
            prop_assert_eq!(pool.n_of_allocated(), held.len());
            prop_assert!(pool.n_of_allocated() <= PCKT_POOL_SIZE);
        }
    }

    /// `is_avail` answers exactly whether the next make succeeds.
    #[test]
    fn pool_is_avail_predicts_make(n_first in 0usize..=PCKT_POOL_SIZE, len in 1usize..=PCKT_MAX_LEN) {
        let mut err = AppErrLatch::new();
        let mut pool = PcktPool::new();
        for _ in 0..n_first {
            let _ = pool.make(len, &mut err);
        }
        let predicted = pool.is_avail(len);
        prop_assert_eq!(predicted, pool.make(len, &mut err).is_some());
    }
}

// ── Packet queue vs a model FIFO ──────────────────────────────

proptest! {
    /// The ring buffer behaves exactly like an unbounded FIFO clipped
    /// to its size.
    #[test]
    fn queue_matches_model(size in 1usize..=16, ops in proptest::collection::vec(any::<bool>(), 1..=80)) {
        let mut err = AppErrLatch::new();
        let mut pool = PcktPool::new();
        let mut handles: Vec<_> = (0..PCKT_POOL_SIZE)
            .map(|_| pool.make(8, &mut err).unwrap())
            .collect();

        let mut q = PcktQueue::new(size);
        let mut model = std::collections::VecDeque::new();

        for push in ops {
            if push {
                if let Some(p) = handles.pop() {
                    let accepted = q.push(p);
                    prop_assert_eq!(accepted, model.len() < q.size());
                    if accepted {
                        model.push_back(p);
                    } else {
                        handles.push(p);
                    }
                }
            } else {
                let got = q.pop();
                prop_assert_eq!(got, model.pop_front());
                if let Some(p) = got {
                    handles.push(p);
                }
            }
            prop_assert_eq!(q.count(), model.len());
            prop_assert_eq!(q.is_empty(), model.is_empty());
            prop_assert_eq!(q.peek_oldest(), model.front().copied());
        }
    }
}

// ── OutRegistry tracking ring ─────────────────────────────────

static RING_SERV: [ServDesc; 1] = [ServDesc {
    serv_type: 5,
    serv_sub_type: 1,
    max_discriminant: 16,
}];

proptest! {
    /// After N starts, the most recent `OUTREGISTRY_N` instances are
    /// queryable as Pending; everything older has rolled out.
    #[test]
    fn ring_keeps_exactly_the_most_recent(n in 1u32..=40) {
        let mut reg = OutRegistry::new();
        reg.init(&RING_SERV);
        reg.configure();

        for id in 1..=n {
            let _ = reg.start_tracking(id);
        }
        let live_from = n.saturating_sub(OUTREGISTRY_N as u32) + 1;
        for id in 1..=n {
            let expected = if id >= live_from {
                CmdRepState::Pending
            } else {
                CmdRepState::NoEntry
            };
            prop_assert_eq!(reg.state_of(id), expected, "id {}", id);
        }
        prop_assert_eq!(reg.state_of(n + 1), CmdRepState::NotTracked);
    }

    /// Type-level disable masks every discriminant beneath it, and
    /// re-enable restores the discriminant bits untouched.
    #[test]
    fn type_disable_masks_all_discriminants(disc in 1u8..=16) {
        let mut err = AppErrLatch::new();
        let mut reg = OutRegistry::new();
        reg.init(&RING_SERV);
        reg.configure();
        let idx = reg.serv_index(5, 1).unwrap();

        reg.set_enable(5, 0, 0, false, &mut err);
        prop_assert!(!reg.is_enabled(idx, disc));
        prop_assert!(!reg.is_enabled(idx, 0));

        reg.set_enable(5, 0, 0, true, &mut err);
        prop_assert!(reg.is_enabled(idx, disc), "bits survive a type toggle");
        prop_assert_eq!(err.code(), AppErrCode::NoAppErr);
    }
}
