//! Configuration consistency checks.
//!
//! Four independent checks run before the framework will enter
//! CONFIGURED, each validating one user table: the OutRegistry service
//! table, the OutComponent kinds, the InCommand kinds, and the InReport
//! kinds.  The first failing table is named in the returned outcome and
//! the framework stays INITIALIZED.
//!
//! Checked per table: non-empty, sorted strictly ascending on
//! `(serv_type, serv_sub_type, discriminant)`, values within the
//! published maxima, packet lengths positive and within the pool's
//! buffer size, every queue/list size at least 1 and within its
//! compile-time cap, and every OutComponent kind present in the service
//! table with an adequate maximum discriminant.

use crate::config::{
    FwAppConfig, MAX_GROUPS, MAX_IN_MANAGERS, MAX_IN_STREAMS, MAX_OUT_MANAGERS, MAX_OUT_STREAMS,
    MAX_PCRL, MAX_POCL, MAX_SERV, MAX_SERV_SUBTYPE, MAX_SERV_TYPE,
};
use crate::kinds::KindKey;
use crate::packet::PCKT_MAX_LEN;
use crate::queue::MAX_PQ;

/// Outcome of the startup configuration check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCheckOutcome {
    ConfigOk,
    OutRegistryInconsistent,
    OutFactoryInconsistent,
    InFactoryInCmdInconsistent,
    InFactoryInRepInconsistent,
}

/// Run all four checks; the first failure wins.
pub fn check(cfg: &FwAppConfig) -> ConfigCheckOutcome {
    if !out_registry_check(cfg) {
        return ConfigCheckOutcome::OutRegistryInconsistent;
    }
    if !out_factory_check(cfg) {
        return ConfigCheckOutcome::OutFactoryInconsistent;
    }
    if !in_factory_cmd_check(cfg) {
        return ConfigCheckOutcome::InFactoryInCmdInconsistent;
    }
    if !in_factory_rep_check(cfg) {
        return ConfigCheckOutcome::InFactoryInRepInconsistent;
    }
    ConfigCheckOutcome::ConfigOk
}

fn sorted_ascending<K: KindKey>(table: &[K]) -> bool {
    table.windows(2).all(|w| w[0].key() < w[1].key())
}

fn within_maxima<K: KindKey>(table: &[K]) -> bool {
    table.iter().all(|k| {
        let (t, st, _) = k.key();
        t <= MAX_SERV_TYPE && st <= MAX_SERV_SUBTYPE
    })
}

fn sizes_ok(sizes: &[usize], n_max: usize, each_max: usize) -> bool {
    !sizes.is_empty() && sizes.len() <= n_max && sizes.iter().all(|&s| (1..=each_max).contains(&s))
}

fn out_registry_check(cfg: &FwAppConfig) -> bool {
    if cfg.serv_desc.is_empty() || cfg.serv_desc.len() > MAX_SERV {
        return false;
    }
    // Sorted ascending on (type, sub-type).
    let ordered = cfg
        .serv_desc
        .windows(2)
        .all(|w| (w[0].serv_type, w[0].serv_sub_type) < (w[1].serv_type, w[1].serv_sub_type));
    if !ordered {
        return false;
    }
    // Every service row must be emittable.
    for s in cfg.serv_desc {
        let present = cfg
            .out_cmp_kinds
            .iter()
            .any(|k| k.serv_type == s.serv_type && k.serv_sub_type == s.serv_sub_type);
        if !present {
            return false;
        }
    }

    if cfg.n_of_groups == 0 || cfg.n_of_groups > MAX_GROUPS {
        return false;
    }
    if !sizes_ok(cfg.in_stream_pq_size, MAX_IN_STREAMS, MAX_PQ) {
        return false;
    }
    if !sizes_ok(cfg.out_stream_pq_size, MAX_OUT_STREAMS, MAX_PQ) {
        return false;
    }
    if cfg.out_stream_dest.len() != cfg.out_stream_pq_size.len() {
        return false;
    }
    if !sizes_ok(cfg.in_manager_pcrl_size, MAX_IN_MANAGERS, MAX_PCRL) {
        return false;
    }
    sizes_ok(cfg.out_manager_pocl_size, MAX_OUT_MANAGERS, MAX_POCL)
}

fn out_factory_check(cfg: &FwAppConfig) -> bool {
    let kinds = cfg.out_cmp_kinds;
    if kinds.is_empty() || !sorted_ascending(kinds) || !within_maxima(kinds) {
        return false;
    }
    for k in kinds {
        if k.pckt_length == 0 || k.pckt_length > PCKT_MAX_LEN {
            return false;
        }
        // Each kind must be registered with room for its discriminant.
        let covered = cfg.serv_desc.iter().any(|s| {
            s.serv_type == k.serv_type
                && s.serv_sub_type == k.serv_sub_type
                && s.max_discriminant >= k.discriminant
        });
        if !covered {
            return false;
        }
    }
    true
}

fn in_factory_cmd_check(cfg: &FwAppConfig) -> bool {
    let kinds = cfg.in_cmd_kinds;
    !kinds.is_empty() && sorted_ascending(kinds) && within_maxima(kinds)
}

fn in_factory_rep_check(cfg: &FwAppConfig) -> bool {
    let kinds = cfg.in_rep_kinds;
    !kinds.is_empty() && sorted_ascending(kinds) && within_maxima(kinds)
}
