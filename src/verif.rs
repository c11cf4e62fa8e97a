//! Request-verification report emission (PUS service 1).
//!
//! The pipeline drivers call [`emit`] at the acceptance, start,
//! progress and termination milestones of a telecommand.  The report is
//! an ordinary OutComponent of kind `(1, sub_type, 0)` taken from the
//! OutFactory, addressed back to the command's source, with the
//! command's packet identifier, current progress step and failure code
//! in the parameter area.  OutFactory exhaustion is reported through
//! the error sink and otherwise swallowed — verification must never
//! take the pipeline down with it.

use crate::config::{DestSrc, FailCode, InstanceId, ServSubType, ServType};
use crate::kinds::ActionCtx;
use log::debug;

/// Service type of request-verification reports.
pub const SERV_VERIF: ServType = 1;

pub const SUB_ACC_SUCC: ServSubType = 1;
pub const SUB_ACC_FAIL: ServSubType = 2;
pub const SUB_START_SUCC: ServSubType = 3;
pub const SUB_START_FAIL: ServSubType = 4;
pub const SUB_PROG_SUCC: ServSubType = 5;
pub const SUB_PROG_FAIL: ServSubType = 6;
pub const SUB_TERM_SUCC: ServSubType = 7;
pub const SUB_TERM_FAIL: ServSubType = 8;

/// Acceptance failure codes carried in (1,2) reports.
pub mod acc_fail {
    use crate::config::FailCode;

    /// The kind triple is unknown to the InFactory tables.
    pub const WRONG_TYPE: FailCode = 1;
    /// The InFactory had no free instance slot.
    pub const NO_FREE_SLOT: FailCode = 2;
    /// The per-kind validity check rejected the packet.
    pub const INVALID: FailCode = 3;
    /// No InManager would take the component.
    pub const NO_LOAD: FailCode = 4;
}

/// Build and load one verification report.
///
/// `tc_id`/`tc_src` identify the telecommand being verified; `step` and
/// `code` are zero where they do not apply.
pub(crate) fn emit(
    ctx: &mut ActionCtx<'_>,
    sub_type: ServSubType,
    tc_id: InstanceId,
    tc_src: DestSrc,
    step: u32,
    code: FailCode,
) {
    let Some(h) = ctx.make_out(SERV_VERIF, sub_type, 0) else {
        return;
    };
    if let Some(cmp) = ctx.out_factory.cmp(h) {
        let pckt = cmp.pckt();
        let mut m = ctx.pool.pckt_mut(pckt);
        m.set_dest(tc_src);
        let par = m.par_area_mut();
        if par.len() >= 10 {
            par[0..4].copy_from_slice(&tc_id.to_le_bytes());
            par[4..8].copy_from_slice(&step.to_le_bytes());
            par[8..10].copy_from_slice(&code.to_le_bytes());
        }
    }
    debug!("verif: (1,{}) for command {} (code {})", sub_type, tc_id, code);
    let _ = ctx.load_out(h);
}
