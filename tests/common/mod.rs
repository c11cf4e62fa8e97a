//! Shared configuration tables and mock transports for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use pusfw::config::{defaults as cd, FwAppConfig, ServDesc};
use pusfw::error::AppErrLatch;
use pusfw::framework::Framework;
use pusfw::incmd::InCommand;
use pusfw::kinds::defaults as kd;
use pusfw::kinds::{ActionCtx, ActionOutcome, InCmdKind, InRepKind, OutCmpCtx, OutCmpKind};
use pusfw::outcmp::OutComponent;
use pusfw::packet::{PcktKind, PcktPool};
use pusfw::stream::{InTransport, OutTransport};

/// This application's identifier.
pub const HOST: u8 = 10;
/// A neighbouring application, reachable through OutStream 1.
pub const OTHER_APP: u8 = 20;

// ── Controllable actions ──────────────────────────────────────

/// Cycles consumed so far by the (8,1) slow command's progress action.
pub static SLOW_STEPS: AtomicU32 = AtomicU32::new(0);

pub fn reset_slow_steps() {
    SLOW_STEPS.store(0, Ordering::Relaxed);
}

/// Progress action that wants three cycles before completing.
fn slow_progress(cmd: &mut InCommand, _ctx: &mut ActionCtx<'_>) -> ActionOutcome {
    let n = SLOW_STEPS.fetch_add(1, Ordering::Relaxed) + 1;
    cmd.set_progress_step(n);
    if n >= 3 {
        ActionOutcome::Completed
    } else {
        ActionOutcome::Continue
    }
}

/// Progress action that never completes.
fn hang_progress(cmd: &mut InCommand, _ctx: &mut ActionCtx<'_>) -> ActionOutcome {
    cmd.set_progress_step(1);
    ActionOutcome::Continue
}

/// Repeat check for periodic housekeeping reports.
fn repeat_always(_cmp: &OutComponent, _ctx: &mut OutCmpCtx<'_>) -> bool {
    true
}

// ── Kind tables ───────────────────────────────────────────────

const IN_CMD_KINDS: [InCmdKind; 3] = [
    InCmdKind {
        serv_type: 8,
        serv_sub_type: 1,
        discriminant: 0,
        validity_check: kd::in_cmd_check_true,
        ready_check: kd::in_cmd_check_true,
        start_action: kd::in_cmd_action_success,
        progress_action: slow_progress,
        termination_action: kd::in_cmd_action_success,
        abort_action: kd::in_cmd_action_success,
    },
    InCmdKind {
        serv_type: 8,
        serv_sub_type: 2,
        discriminant: 0,
        validity_check: kd::in_cmd_check_true,
        ready_check: kd::in_cmd_check_true,
        start_action: kd::in_cmd_action_success,
        progress_action: hang_progress,
        termination_action: kd::in_cmd_action_success,
        abort_action: kd::in_cmd_action_success,
    },
    InCmdKind {
        serv_type: 17,
        serv_sub_type: 1,
        discriminant: 0,
        validity_check: kd::in_cmd_check_true,
        ready_check: kd::in_cmd_check_true,
        start_action: kd::in_cmd_action_success,
        progress_action: kd::in_cmd_action_success,
        termination_action: kd::in_cmd_action_success,
        abort_action: kd::in_cmd_action_success,
    },
];

const IN_REP_KINDS: [InRepKind; 1] = [InRepKind {
    serv_type: 5,
    serv_sub_type: 4,
    discriminant: 0,
    update_action: kd::in_rep_update_success,
    validity_check: kd::in_rep_check_true,
}];

const fn one_shot(t: u8, st: u8, d: u8) -> OutCmpKind {
    OutCmpKind {
        serv_type: t,
        serv_sub_type: st,
        discriminant: d,
        pckt_length: 32,
        enable_check: kd::out_cmp_enable_registry,
        ready_check: kd::out_cmp_ready_true,
        repeat_check: kd::out_cmp_repeat_never,
        update_action: kd::out_cmp_update_noop,
        serialize: kd::out_cmp_serialize_header,
    }
}

const OUT_CMP_KINDS: [OutCmpKind; 11] = [
    one_shot(1, 1, 0),
    one_shot(1, 2, 0),
    one_shot(1, 3, 0),
    one_shot(1, 4, 0),
    one_shot(1, 5, 0),
    one_shot(1, 6, 0),
    one_shot(1, 7, 0),
    one_shot(1, 8, 0),
    OutCmpKind {
        serv_type: 3,
        serv_sub_type: 25,
        discriminant: 1,
        pckt_length: 48,
        enable_check: kd::out_cmp_enable_registry,
        ready_check: kd::out_cmp_ready_true,
        repeat_check: repeat_always,
        update_action: kd::out_cmp_update_noop,
        serialize: kd::out_cmp_serialize_header,
    },
    one_shot(5, 2, 0),
    one_shot(17, 2, 0),
];

const SERV_DESC: [ServDesc; 11] = [
    ServDesc { serv_type: 1, serv_sub_type: 1, max_discriminant: 0 },
    ServDesc { serv_type: 1, serv_sub_type: 2, max_discriminant: 0 },
    ServDesc { serv_type: 1, serv_sub_type: 3, max_discriminant: 0 },
    ServDesc { serv_type: 1, serv_sub_type: 4, max_discriminant: 0 },
    ServDesc { serv_type: 1, serv_sub_type: 5, max_discriminant: 0 },
    ServDesc { serv_type: 1, serv_sub_type: 6, max_discriminant: 0 },
    ServDesc { serv_type: 1, serv_sub_type: 7, max_discriminant: 0 },
    ServDesc { serv_type: 1, serv_sub_type: 8, max_discriminant: 0 },
    ServDesc { serv_type: 3, serv_sub_type: 25, max_discriminant: 4 },
    ServDesc { serv_type: 5, serv_sub_type: 2, max_discriminant: 10 },
    ServDesc { serv_type: 17, serv_sub_type: 2, max_discriminant: 0 },
];

const CFG: FwAppConfig = FwAppConfig {
    host_app_id: HOST,
    n_of_groups: 2,
    in_cmd_kinds: &IN_CMD_KINDS,
    in_rep_kinds: &IN_REP_KINDS,
    out_cmp_kinds: &OUT_CMP_KINDS,
    serv_desc: &SERV_DESC,
    in_stream_pq_size: &[8],
    out_stream_pq_size: &[8, 8],
    out_stream_dest: &[HOST, OTHER_APP],
    in_manager_pcrl_size: &[4, 4],
    out_manager_pocl_size: &[8],
    re_route_dest: cd::re_route_same,
    select_in_manager: cd::select_in_manager_split,
    select_out_manager: cd::select_out_manager_zero,
    activate_out_manager: cd::activate_noop,
    time: cd::time_zero,
    rep_err: cd::rep_err_log,
};

pub fn cfg() -> &'static FwAppConfig {
    &CFG
}

/// Same tables with the command kinds out of order, for exercising the
/// consistency gate.
const UNSORTED_IN_CMD_KINDS: [InCmdKind; 2] = [
    InCmdKind {
        serv_type: 17,
        serv_sub_type: 1,
        discriminant: 0,
        validity_check: kd::in_cmd_check_true,
        ready_check: kd::in_cmd_check_true,
        start_action: kd::in_cmd_action_success,
        progress_action: kd::in_cmd_action_success,
        termination_action: kd::in_cmd_action_success,
        abort_action: kd::in_cmd_action_success,
    },
    InCmdKind {
        serv_type: 8,
        serv_sub_type: 1,
        discriminant: 0,
        validity_check: kd::in_cmd_check_true,
        ready_check: kd::in_cmd_check_true,
        start_action: kd::in_cmd_action_success,
        progress_action: kd::in_cmd_action_success,
        termination_action: kd::in_cmd_action_success,
        abort_action: kd::in_cmd_action_success,
    },
];

const BAD_CFG: FwAppConfig = FwAppConfig {
    in_cmd_kinds: &UNSORTED_IN_CMD_KINDS,
    ..CFG
};

pub fn bad_cfg() -> &'static FwAppConfig {
    &BAD_CFG
}

/// A fully configured framework over the test tables.
pub fn make_fw() -> Framework {
    let mut fw = Framework::new(cfg()).expect("structurally valid config");
    fw.init();
    let outcome = fw.configure();
    assert_eq!(outcome, pusfw::cfgcheck::ConfigCheckOutcome::ConfigOk);
    fw
}

// ── Frame crafting ────────────────────────────────────────────

/// Build a raw telecommand frame through the packet attribute contract.
#[allow(clippy::too_many_arguments)]
pub fn tc_frame(
    t: u8,
    st: u8,
    d: u8,
    src: u8,
    dest: u8,
    ack_acc: bool,
    seq: u32,
    cmd_id: u32,
) -> Vec<u8> {
    frame(PcktKind::Cmd, t, st, d, src, dest, [ack_acc, false, false, false], seq, cmd_id)
}

/// Build a telecommand frame with all four acknowledge flags
/// (`[acc, start, progress, term]`) under the caller's control.
#[allow(clippy::too_many_arguments)]
pub fn tc_frame_acks(
    t: u8,
    st: u8,
    d: u8,
    src: u8,
    dest: u8,
    acks: [bool; 4],
    seq: u32,
    cmd_id: u32,
) -> Vec<u8> {
    frame(PcktKind::Cmd, t, st, d, src, dest, acks, seq, cmd_id)
}

/// Build a raw report frame.
pub fn rep_frame(t: u8, st: u8, d: u8, src: u8, dest: u8, seq: u32) -> Vec<u8> {
    frame(PcktKind::Rep, t, st, d, src, dest, [false; 4], seq, 0)
}

#[allow(clippy::too_many_arguments)]
fn frame(
    kind: PcktKind,
    t: u8,
    st: u8,
    d: u8,
    src: u8,
    dest: u8,
    acks: [bool; 4],
    seq: u32,
    cmd_id: u32,
) -> Vec<u8> {
    let mut err = AppErrLatch::new();
    let mut pool = PcktPool::new();
    let p = pool.make(40, &mut err).expect("scratch pool");
    {
        let mut m = pool.pckt_mut(p);
        m.set_kind(kind);
        m.set_serv_type(t);
        m.set_serv_sub_type(st);
        m.set_discriminant(d);
        m.set_src(src);
        m.set_dest(dest);
        m.set_group(0);
        m.set_seq_cnt(seq);
        m.set_cmd_rep_id(cmd_id);
        m.set_ack_levels(acks[0], acks[1], acks[2], acks[3]);
    }
    pool.pckt(p).raw().to_vec()
}

// ── Mock transports ───────────────────────────────────────────

/// Inbound transport fed from a scripted frame list.
pub struct ScriptedIn {
    pub frames: VecDeque<Vec<u8>>,
}

impl ScriptedIn {
    pub fn new(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames: frames.into(),
        }
    }
}

impl InTransport for ScriptedIn {
    fn poll(&mut self, buf: &mut [u8]) -> Option<usize> {
        let f = self.frames.pop_front()?;
        buf[..f.len()].copy_from_slice(&f);
        Some(f.len())
    }
}

/// Outbound transport recording every accepted frame.
pub struct RecordingOut {
    pub frames: Vec<Vec<u8>>,
    pub accept: bool,
}

impl RecordingOut {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            accept: true,
        }
    }
}

impl OutTransport for RecordingOut {
    fn send(&mut self, frame: &[u8]) -> bool {
        if self.accept {
            self.frames.push(frame.to_vec());
        }
        self.accept
    }
}
