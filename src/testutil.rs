//! Shared configuration tables for unit tests.

use crate::config::{defaults as cd, FwAppConfig, ServDesc};
use crate::kinds::defaults as kd;
use crate::kinds::{InCmdKind, InRepKind, OutCmpKind};

const IN_CMD_KINDS: [InCmdKind; 1] = [InCmdKind {
    serv_type: 17,
    serv_sub_type: 1,
    discriminant: 0,
    validity_check: kd::in_cmd_check_true,
    ready_check: kd::in_cmd_check_true,
    start_action: kd::in_cmd_action_success,
    progress_action: kd::in_cmd_action_success,
    termination_action: kd::in_cmd_action_success,
    abort_action: kd::in_cmd_action_success,
}];

const IN_CMD_KINDS_UNSORTED: [InCmdKind; 2] = [
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
        serv_type: 3,
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

const OUT_CMP_KINDS: [OutCmpKind; 3] = [
    OutCmpKind {
        serv_type: 1,
        serv_sub_type: 1,
        discriminant: 0,
        pckt_length: 32,
        enable_check: kd::out_cmp_enable_registry,
        ready_check: kd::out_cmp_ready_true,
        repeat_check: kd::out_cmp_repeat_never,
        update_action: kd::out_cmp_update_noop,
        serialize: kd::out_cmp_serialize_header,
    },
    OutCmpKind {
        serv_type: 1,
        serv_sub_type: 2,
        discriminant: 0,
        pckt_length: 32,
        enable_check: kd::out_cmp_enable_registry,
        ready_check: kd::out_cmp_ready_true,
        repeat_check: kd::out_cmp_repeat_never,
        update_action: kd::out_cmp_update_noop,
        serialize: kd::out_cmp_serialize_header,
    },
    OutCmpKind {
        serv_type: 17,
        serv_sub_type: 2,
        discriminant: 0,
        pckt_length: 32,
        enable_check: kd::out_cmp_enable_registry,
        ready_check: kd::out_cmp_ready_true,
        repeat_check: kd::out_cmp_repeat_never,
        update_action: kd::out_cmp_update_noop,
        serialize: kd::out_cmp_serialize_header,
    },
];

const SERV_DESC: [ServDesc; 3] = [
    ServDesc {
        serv_type: 1,
        serv_sub_type: 1,
        max_discriminant: 0,
    },
    ServDesc {
        serv_type: 1,
        serv_sub_type: 2,
        max_discriminant: 0,
    },
    ServDesc {
        serv_type: 17,
        serv_sub_type: 2,
        max_discriminant: 0,
    },
];

const TEST_CFG: FwAppConfig = FwAppConfig {
    host_app_id: 10,
    n_of_groups: 2,
    in_cmd_kinds: &IN_CMD_KINDS,
    in_rep_kinds: &IN_REP_KINDS,
    out_cmp_kinds: &OUT_CMP_KINDS,
    serv_desc: &SERV_DESC,
    in_stream_pq_size: &[4],
    out_stream_pq_size: &[4],
    out_stream_dest: &[9],
    in_manager_pcrl_size: &[4],
    out_manager_pocl_size: &[4],
    re_route_dest: cd::re_route_same,
    select_in_manager: cd::select_in_manager_zero,
    select_out_manager: cd::select_out_manager_zero,
    activate_out_manager: cd::activate_noop,
    time: cd::time_zero,
    rep_err: cd::rep_err_log,
};

const UNSORTED_CFG: FwAppConfig = FwAppConfig {
    in_cmd_kinds: &IN_CMD_KINDS_UNSORTED,
    ..TEST_CFG
};

pub(crate) fn test_config() -> &'static FwAppConfig {
    &TEST_CFG
}

pub(crate) fn unsorted_cmd_config() -> &'static FwAppConfig {
    &UNSORTED_CFG
}
