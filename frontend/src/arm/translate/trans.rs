//! `Decode` implementation: maps every A32, T32 and T16 pattern to
//! its translation op.
//!
//! Most methods forward to the ops in the sibling modules with the
//! operation, operand size or flag behaviour spelled out; branches and
//! the odd one-off live here.

use tcg_core::{Cond, Context, MemOp, Type};

use super::dp::{AluOp, ExtendKind, MulAcc, StoreRegKind};
use super::ArmDisasContext;
use crate::arm::config::ArmFeature;
use crate::arm::cpu::THUMB_OFFSET;
use crate::arm::decode::*;
use crate::arm::helper::alu::{ParallelKind, ParallelPrefix};
use crate::arm::helper::Helper;
use crate::DisasJumpType;

impl ArmDisasContext<'_> {
    /// LDREX/STREX word forms.
    fn excl_ok(&self) -> bool {
        self.has(ArmFeature::V6)
    }

    /// Byte, halfword and A32 doubleword exclusives, and CLREX.
    fn excl_v6k_ok(&self) -> bool {
        self.has(ArmFeature::V6K) || (self.is_m() && self.has(ArmFeature::V7))
    }
}

impl Decode<Context> for ArmDisasContext<'_> {
    // ── Data processing ──

    fn trans_and_rrri(&mut self, ir: &mut Context, a: &ArgsSRrrShi) -> bool {
        self.op_s_rrr_shi(ir, a, AluOp::And, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_eor_rrri(&mut self, ir: &mut Context, a: &ArgsSRrrShi) -> bool {
        self.op_s_rrr_shi(ir, a, AluOp::Eor, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_orr_rrri(&mut self, ir: &mut Context, a: &ArgsSRrrShi) -> bool {
        self.op_s_rrr_shi(ir, a, AluOp::Orr, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_orn_rrri(&mut self, ir: &mut Context, a: &ArgsSRrrShi) -> bool {
        if !self.tb.thumb {
            return false;
        }
        self.op_s_rrr_shi(ir, a, AluOp::Orn, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_bic_rrri(&mut self, ir: &mut Context, a: &ArgsSRrrShi) -> bool {
        self.op_s_rrr_shi(ir, a, AluOp::Bic, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_add_rrri(&mut self, ir: &mut Context, a: &ArgsSRrrShi) -> bool {
        let kind = self.add_kind(a.rd, a.rn);
        self.op_s_rrr_shi(ir, a, AluOp::Add, a.s != 0, kind)
    }
    fn trans_adc_rrri(&mut self, ir: &mut Context, a: &ArgsSRrrShi) -> bool {
        self.op_s_rrr_shi(ir, a, AluOp::Adc, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_sub_rrri(&mut self, ir: &mut Context, a: &ArgsSRrrShi) -> bool {
        let Some((s, kind)) = self.sub_kind(ir, a.rd, a.rn, a.s != 0) else {
            return true;
        };
        self.op_s_rrr_shi(ir, a, AluOp::Sub, s, kind)
    }
    fn trans_sbc_rrri(&mut self, ir: &mut Context, a: &ArgsSRrrShi) -> bool {
        self.op_s_rrr_shi(ir, a, AluOp::Sbc, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_rsb_rrri(&mut self, ir: &mut Context, a: &ArgsSRrrShi) -> bool {
        self.op_s_rrr_shi(ir, a, AluOp::Rsb, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_rsc_rrri(&mut self, ir: &mut Context, a: &ArgsSRrrShi) -> bool {
        self.op_s_rrr_shi(ir, a, AluOp::Rsc, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_tst_xrri(&mut self, ir: &mut Context, a: &ArgsSRrrShi) -> bool {
        self.op_s_rrr_shi(ir, a, AluOp::And, true, StoreRegKind::None)
    }
    fn trans_teq_xrri(&mut self, ir: &mut Context, a: &ArgsSRrrShi) -> bool {
        self.op_s_rrr_shi(ir, a, AluOp::Eor, true, StoreRegKind::None)
    }
    fn trans_cmp_xrri(&mut self, ir: &mut Context, a: &ArgsSRrrShi) -> bool {
        self.op_s_rrr_shi(ir, a, AluOp::Sub, true, StoreRegKind::None)
    }
    fn trans_cmn_xrri(&mut self, ir: &mut Context, a: &ArgsSRrrShi) -> bool {
        self.op_s_rrr_shi(ir, a, AluOp::Add, true, StoreRegKind::None)
    }
    fn trans_mov_rxri(&mut self, ir: &mut Context, a: &ArgsSRrrShi) -> bool {
        let Some((s, kind)) = self.mov_kind(ir, a.rd, a.s != 0) else {
            return true;
        };
        self.op_s_rrr_shi(ir, a, AluOp::Mov, s, kind)
    }
    fn trans_mvn_rxri(&mut self, ir: &mut Context, a: &ArgsSRrrShi) -> bool {
        self.op_s_rrr_shi(ir, a, AluOp::Mvn, a.s != 0, StoreRegKind::Normal)
    }

    fn trans_and_rrrr(&mut self, ir: &mut Context, a: &ArgsSRrrShr) -> bool {
        self.op_s_rrr_shr(ir, a, AluOp::And, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_eor_rrrr(&mut self, ir: &mut Context, a: &ArgsSRrrShr) -> bool {
        self.op_s_rrr_shr(ir, a, AluOp::Eor, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_orr_rrrr(&mut self, ir: &mut Context, a: &ArgsSRrrShr) -> bool {
        self.op_s_rrr_shr(ir, a, AluOp::Orr, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_bic_rrrr(&mut self, ir: &mut Context, a: &ArgsSRrrShr) -> bool {
        self.op_s_rrr_shr(ir, a, AluOp::Bic, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_add_rrrr(&mut self, ir: &mut Context, a: &ArgsSRrrShr) -> bool {
        let kind = self.add_kind(a.rd, a.rn);
        self.op_s_rrr_shr(ir, a, AluOp::Add, a.s != 0, kind)
    }
    fn trans_adc_rrrr(&mut self, ir: &mut Context, a: &ArgsSRrrShr) -> bool {
        self.op_s_rrr_shr(ir, a, AluOp::Adc, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_sub_rrrr(&mut self, ir: &mut Context, a: &ArgsSRrrShr) -> bool {
        let Some((s, kind)) = self.sub_kind(ir, a.rd, a.rn, a.s != 0) else {
            return true;
        };
        self.op_s_rrr_shr(ir, a, AluOp::Sub, s, kind)
    }
    fn trans_sbc_rrrr(&mut self, ir: &mut Context, a: &ArgsSRrrShr) -> bool {
        self.op_s_rrr_shr(ir, a, AluOp::Sbc, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_rsb_rrrr(&mut self, ir: &mut Context, a: &ArgsSRrrShr) -> bool {
        self.op_s_rrr_shr(ir, a, AluOp::Rsb, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_rsc_rrrr(&mut self, ir: &mut Context, a: &ArgsSRrrShr) -> bool {
        self.op_s_rrr_shr(ir, a, AluOp::Rsc, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_tst_xrrr(&mut self, ir: &mut Context, a: &ArgsSRrrShr) -> bool {
        self.op_s_rrr_shr(ir, a, AluOp::And, true, StoreRegKind::None)
    }
    fn trans_teq_xrrr(&mut self, ir: &mut Context, a: &ArgsSRrrShr) -> bool {
        self.op_s_rrr_shr(ir, a, AluOp::Eor, true, StoreRegKind::None)
    }
    fn trans_cmp_xrrr(&mut self, ir: &mut Context, a: &ArgsSRrrShr) -> bool {
        self.op_s_rrr_shr(ir, a, AluOp::Sub, true, StoreRegKind::None)
    }
    fn trans_cmn_xrrr(&mut self, ir: &mut Context, a: &ArgsSRrrShr) -> bool {
        self.op_s_rrr_shr(ir, a, AluOp::Add, true, StoreRegKind::None)
    }
    fn trans_mov_rxrr(&mut self, ir: &mut Context, a: &ArgsSRrrShr) -> bool {
        let Some((s, kind)) = self.mov_kind(ir, a.rd, a.s != 0) else {
            return true;
        };
        self.op_s_rrr_shr(ir, a, AluOp::Mov, s, kind)
    }
    fn trans_mvn_rxrr(&mut self, ir: &mut Context, a: &ArgsSRrrShr) -> bool {
        self.op_s_rrr_shr(ir, a, AluOp::Mvn, a.s != 0, StoreRegKind::Normal)
    }

    fn trans_and_rri(&mut self, ir: &mut Context, a: &ArgsSRriRot) -> bool {
        self.op_s_rri_rot(ir, a, AluOp::And, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_eor_rri(&mut self, ir: &mut Context, a: &ArgsSRriRot) -> bool {
        self.op_s_rri_rot(ir, a, AluOp::Eor, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_orr_rri(&mut self, ir: &mut Context, a: &ArgsSRriRot) -> bool {
        self.op_s_rri_rot(ir, a, AluOp::Orr, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_orn_rri(&mut self, ir: &mut Context, a: &ArgsSRriRot) -> bool {
        if !self.tb.thumb {
            return false;
        }
        self.op_s_rri_rot(ir, a, AluOp::Orn, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_bic_rri(&mut self, ir: &mut Context, a: &ArgsSRriRot) -> bool {
        self.op_s_rri_rot(ir, a, AluOp::Bic, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_add_rri(&mut self, ir: &mut Context, a: &ArgsSRriRot) -> bool {
        let kind = self.add_kind(a.rd, a.rn);
        self.op_s_rri_rot(ir, a, AluOp::Add, a.s != 0, kind)
    }
    fn trans_adc_rri(&mut self, ir: &mut Context, a: &ArgsSRriRot) -> bool {
        self.op_s_rri_rot(ir, a, AluOp::Adc, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_sub_rri(&mut self, ir: &mut Context, a: &ArgsSRriRot) -> bool {
        let Some((s, kind)) = self.sub_kind(ir, a.rd, a.rn, a.s != 0) else {
            return true;
        };
        self.op_s_rri_rot(ir, a, AluOp::Sub, s, kind)
    }
    fn trans_sbc_rri(&mut self, ir: &mut Context, a: &ArgsSRriRot) -> bool {
        self.op_s_rri_rot(ir, a, AluOp::Sbc, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_rsb_rri(&mut self, ir: &mut Context, a: &ArgsSRriRot) -> bool {
        self.op_s_rri_rot(ir, a, AluOp::Rsb, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_rsc_rri(&mut self, ir: &mut Context, a: &ArgsSRriRot) -> bool {
        self.op_s_rri_rot(ir, a, AluOp::Rsc, a.s != 0, StoreRegKind::Normal)
    }
    fn trans_tst_xri(&mut self, ir: &mut Context, a: &ArgsSRriRot) -> bool {
        self.op_s_rri_rot(ir, a, AluOp::And, true, StoreRegKind::None)
    }
    fn trans_teq_xri(&mut self, ir: &mut Context, a: &ArgsSRriRot) -> bool {
        self.op_s_rri_rot(ir, a, AluOp::Eor, true, StoreRegKind::None)
    }
    fn trans_cmp_xri(&mut self, ir: &mut Context, a: &ArgsSRriRot) -> bool {
        self.op_s_rri_rot(ir, a, AluOp::Sub, true, StoreRegKind::None)
    }
    fn trans_cmn_xri(&mut self, ir: &mut Context, a: &ArgsSRriRot) -> bool {
        self.op_s_rri_rot(ir, a, AluOp::Add, true, StoreRegKind::None)
    }
    fn trans_mov_rxi(&mut self, ir: &mut Context, a: &ArgsSRriRot) -> bool {
        let Some((s, kind)) = self.mov_kind(ir, a.rd, a.s != 0) else {
            return true;
        };
        self.op_s_rri_rot(ir, a, AluOp::Mov, s, kind)
    }
    fn trans_mvn_rxi(&mut self, ir: &mut Context, a: &ArgsSRriRot) -> bool {
        self.op_s_rri_rot(ir, a, AluOp::Mvn, a.s != 0, StoreRegKind::Normal)
    }

    fn trans_movw(&mut self, ir: &mut Context, a: &ArgsRi) -> bool {
        self.op_movw(ir, a.rd, a.imm)
    }
    fn trans_movt(&mut self, ir: &mut Context, a: &ArgsRi) -> bool {
        self.op_movt(ir, a.rd, a.imm)
    }
    fn trans_adr(&mut self, ir: &mut Context, a: &ArgsRi) -> bool {
        self.op_adr(ir, a.rd, a.imm)
    }

    // ── Multiply ──

    fn trans_mul(&mut self, ir: &mut Context, a: &ArgsSRrrr) -> bool {
        self.op_mla(ir, a, false)
    }
    fn trans_mla(&mut self, ir: &mut Context, a: &ArgsSRrrr) -> bool {
        self.op_mla(ir, a, true)
    }
    fn trans_mls(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_mls(ir, a)
    }
    fn trans_umull(&mut self, ir: &mut Context, a: &ArgsSRrrr) -> bool {
        self.op_mlal(ir, a, true, false)
    }
    fn trans_umlal(&mut self, ir: &mut Context, a: &ArgsSRrrr) -> bool {
        self.op_mlal(ir, a, true, true)
    }
    fn trans_smull(&mut self, ir: &mut Context, a: &ArgsSRrrr) -> bool {
        self.op_mlal(ir, a, false, false)
    }
    fn trans_smlal(&mut self, ir: &mut Context, a: &ArgsSRrrr) -> bool {
        self.op_mlal(ir, a, false, true)
    }
    fn trans_umaal(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_umaal(ir, a)
    }
    fn trans_smulbb(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlaxxx(ir, a, MulAcc::None, false, false)
    }
    fn trans_smulbt(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlaxxx(ir, a, MulAcc::None, false, true)
    }
    fn trans_smultb(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlaxxx(ir, a, MulAcc::None, true, false)
    }
    fn trans_smultt(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlaxxx(ir, a, MulAcc::None, true, true)
    }
    fn trans_smlabb(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlaxxx(ir, a, MulAcc::Add, false, false)
    }
    fn trans_smlabt(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlaxxx(ir, a, MulAcc::Add, false, true)
    }
    fn trans_smlatb(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlaxxx(ir, a, MulAcc::Add, true, false)
    }
    fn trans_smlatt(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlaxxx(ir, a, MulAcc::Add, true, true)
    }
    fn trans_smlalbb(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlaxxx(ir, a, MulAcc::Long, false, false)
    }
    fn trans_smlalbt(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlaxxx(ir, a, MulAcc::Long, false, true)
    }
    fn trans_smlaltb(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlaxxx(ir, a, MulAcc::Long, true, false)
    }
    fn trans_smlaltt(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlaxxx(ir, a, MulAcc::Long, true, true)
    }
    fn trans_smlawb(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlawx(ir, a, true, false)
    }
    fn trans_smlawt(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlawx(ir, a, true, true)
    }
    fn trans_smulwb(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlawx(ir, a, false, false)
    }
    fn trans_smulwt(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlawx(ir, a, false, true)
    }
    fn trans_smlad(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlad(ir, a, false, false)
    }
    fn trans_smladx(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlad(ir, a, true, false)
    }
    fn trans_smlsd(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlad(ir, a, false, true)
    }
    fn trans_smlsdx(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlad(ir, a, true, true)
    }
    fn trans_smlald(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlald(ir, a, false, false)
    }
    fn trans_smlaldx(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlald(ir, a, true, false)
    }
    fn trans_smlsld(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlald(ir, a, false, true)
    }
    fn trans_smlsldx(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smlald(ir, a, true, true)
    }
    fn trans_smmla(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smmla(ir, a, false, false)
    }
    fn trans_smmlar(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smmla(ir, a, true, false)
    }
    fn trans_smmls(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smmla(ir, a, false, true)
    }
    fn trans_smmlsr(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_smmla(ir, a, true, true)
    }
    fn trans_usada8(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_usada8(ir, a)
    }
    fn trans_sdiv(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_div(ir, a, false)
    }
    fn trans_udiv(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        self.op_div(ir, a, true)
    }

    // ── Saturating, parallel and CRC ──

    fn trans_qadd(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_qaddsub(ir, a, true, false)
    }
    fn trans_qsub(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_qaddsub(ir, a, false, false)
    }
    fn trans_qdadd(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_qaddsub(ir, a, true, true)
    }
    fn trans_qdsub(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_qaddsub(ir, a, false, true)
    }
    fn trans_ssat(&mut self, ir: &mut Context, a: &ArgsSat) -> bool {
        self.op_sat(ir, a, Helper::Ssat)
    }
    fn trans_usat(&mut self, ir: &mut Context, a: &ArgsSat) -> bool {
        self.op_sat(ir, a, Helper::Usat)
    }
    fn trans_ssat16(&mut self, ir: &mut Context, a: &ArgsSat) -> bool {
        self.op_sat(ir, a, Helper::Ssat16)
    }
    fn trans_usat16(&mut self, ir: &mut Context, a: &ArgsSat) -> bool {
        self.op_sat(ir, a, Helper::Usat16)
    }
    fn trans_sadd16(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::S, ParallelKind::Add16)
    }
    fn trans_sasx(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::S, ParallelKind::Asx)
    }
    fn trans_ssax(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::S, ParallelKind::Sax)
    }
    fn trans_ssub16(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::S, ParallelKind::Sub16)
    }
    fn trans_sadd8(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::S, ParallelKind::Add8)
    }
    fn trans_ssub8(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::S, ParallelKind::Sub8)
    }
    fn trans_qadd16(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Q, ParallelKind::Add16)
    }
    fn trans_qasx(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Q, ParallelKind::Asx)
    }
    fn trans_qsax(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Q, ParallelKind::Sax)
    }
    fn trans_qsub16(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Q, ParallelKind::Sub16)
    }
    fn trans_qadd8(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Q, ParallelKind::Add8)
    }
    fn trans_qsub8(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Q, ParallelKind::Sub8)
    }
    fn trans_shadd16(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Sh, ParallelKind::Add16)
    }
    fn trans_shasx(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Sh, ParallelKind::Asx)
    }
    fn trans_shsax(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Sh, ParallelKind::Sax)
    }
    fn trans_shsub16(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Sh, ParallelKind::Sub16)
    }
    fn trans_shadd8(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Sh, ParallelKind::Add8)
    }
    fn trans_shsub8(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Sh, ParallelKind::Sub8)
    }
    fn trans_uadd16(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::U, ParallelKind::Add16)
    }
    fn trans_uasx(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::U, ParallelKind::Asx)
    }
    fn trans_usax(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::U, ParallelKind::Sax)
    }
    fn trans_usub16(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::U, ParallelKind::Sub16)
    }
    fn trans_uadd8(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::U, ParallelKind::Add8)
    }
    fn trans_usub8(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::U, ParallelKind::Sub8)
    }
    fn trans_uqadd16(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Uq, ParallelKind::Add16)
    }
    fn trans_uqasx(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Uq, ParallelKind::Asx)
    }
    fn trans_uqsax(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Uq, ParallelKind::Sax)
    }
    fn trans_uqsub16(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Uq, ParallelKind::Sub16)
    }
    fn trans_uqadd8(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Uq, ParallelKind::Add8)
    }
    fn trans_uqsub8(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Uq, ParallelKind::Sub8)
    }
    fn trans_uhadd16(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Uh, ParallelKind::Add16)
    }
    fn trans_uhasx(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Uh, ParallelKind::Asx)
    }
    fn trans_uhsax(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Uh, ParallelKind::Sax)
    }
    fn trans_uhsub16(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Uh, ParallelKind::Sub16)
    }
    fn trans_uhadd8(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Uh, ParallelKind::Add8)
    }
    fn trans_uhsub8(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_par_addsub(ir, a, ParallelPrefix::Uh, ParallelKind::Sub8)
    }
    fn trans_sel(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_sel(ir, a)
    }
    fn trans_pkh(&mut self, ir: &mut Context, a: &ArgsPkh) -> bool {
        self.op_pkh(ir, a)
    }
    fn trans_crc32b(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_crc32(ir, a, false, 1)
    }
    fn trans_crc32h(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_crc32(ir, a, false, 2)
    }
    fn trans_crc32w(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_crc32(ir, a, false, 4)
    }
    fn trans_crc32cb(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_crc32(ir, a, true, 1)
    }
    fn trans_crc32ch(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_crc32(ir, a, true, 2)
    }
    fn trans_crc32cw(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_crc32(ir, a, true, 4)
    }

    // ── Extend, reverse and bit fields ──

    fn trans_sxtab(&mut self, ir: &mut Context, a: &ArgsRrrRot) -> bool {
        self.op_xta(ir, a, true, ExtendKind::Byte)
    }
    fn trans_sxtah(&mut self, ir: &mut Context, a: &ArgsRrrRot) -> bool {
        self.op_xta(ir, a, true, ExtendKind::Half)
    }
    fn trans_sxtab16(&mut self, ir: &mut Context, a: &ArgsRrrRot) -> bool {
        self.op_xta(ir, a, true, ExtendKind::DualByte)
    }
    fn trans_uxtab(&mut self, ir: &mut Context, a: &ArgsRrrRot) -> bool {
        self.op_xta(ir, a, false, ExtendKind::Byte)
    }
    fn trans_uxtah(&mut self, ir: &mut Context, a: &ArgsRrrRot) -> bool {
        self.op_xta(ir, a, false, ExtendKind::Half)
    }
    fn trans_uxtab16(&mut self, ir: &mut Context, a: &ArgsRrrRot) -> bool {
        self.op_xta(ir, a, false, ExtendKind::DualByte)
    }
    fn trans_rev(&mut self, ir: &mut Context, a: &ArgsRr) -> bool {
        self.op_rev(ir, a.rd, a.rm)
    }
    fn trans_rev16(&mut self, ir: &mut Context, a: &ArgsRr) -> bool {
        self.op_rev16(ir, a.rd, a.rm)
    }
    fn trans_revsh(&mut self, ir: &mut Context, a: &ArgsRr) -> bool {
        self.op_revsh(ir, a.rd, a.rm)
    }
    fn trans_rbit(&mut self, ir: &mut Context, a: &ArgsRr) -> bool {
        self.op_rbit(ir, a.rd, a.rm)
    }
    fn trans_clz(&mut self, ir: &mut Context, a: &ArgsRr) -> bool {
        self.op_clz(ir, a.rd, a.rm)
    }
    fn trans_sbfx(&mut self, ir: &mut Context, a: &ArgsBfx) -> bool {
        self.op_bfx(ir, a, true)
    }
    fn trans_ubfx(&mut self, ir: &mut Context, a: &ArgsBfx) -> bool {
        self.op_bfx(ir, a, false)
    }
    fn trans_bfci(&mut self, ir: &mut Context, a: &ArgsBfi) -> bool {
        self.op_bfci(ir, a)
    }

    // ── Single loads and stores ──

    fn trans_ldr_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr) -> bool {
        self.op_load_rr(ir, a, MemOp::ul(), false)
    }
    fn trans_ldr_ri(&mut self, ir: &mut Context, a: &ArgsLdstRi) -> bool {
        self.op_load_ri(ir, a, MemOp::ul(), false)
    }
    fn trans_ldrt_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr) -> bool {
        self.op_load_rr(ir, a, MemOp::ul(), true)
    }
    fn trans_ldrt_ri(&mut self, ir: &mut Context, a: &ArgsLdstRi) -> bool {
        self.op_load_ri(ir, a, MemOp::ul(), true)
    }
    fn trans_ldrb_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr) -> bool {
        self.op_load_rr(ir, a, MemOp::ub(), false)
    }
    fn trans_ldrb_ri(&mut self, ir: &mut Context, a: &ArgsLdstRi) -> bool {
        self.op_load_ri(ir, a, MemOp::ub(), false)
    }
    fn trans_ldrbt_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr) -> bool {
        self.op_load_rr(ir, a, MemOp::ub(), true)
    }
    fn trans_ldrbt_ri(&mut self, ir: &mut Context, a: &ArgsLdstRi) -> bool {
        self.op_load_ri(ir, a, MemOp::ub(), true)
    }
    fn trans_ldrh_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr) -> bool {
        self.op_load_rr(ir, a, MemOp::uw(), false)
    }
    fn trans_ldrh_ri(&mut self, ir: &mut Context, a: &ArgsLdstRi) -> bool {
        self.op_load_ri(ir, a, MemOp::uw(), false)
    }
    fn trans_ldrht_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr) -> bool {
        self.op_load_rr(ir, a, MemOp::uw(), true)
    }
    fn trans_ldrht_ri(&mut self, ir: &mut Context, a: &ArgsLdstRi) -> bool {
        self.op_load_ri(ir, a, MemOp::uw(), true)
    }
    fn trans_ldrsb_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr) -> bool {
        self.op_load_rr(ir, a, MemOp::sb(), false)
    }
    fn trans_ldrsb_ri(&mut self, ir: &mut Context, a: &ArgsLdstRi) -> bool {
        self.op_load_ri(ir, a, MemOp::sb(), false)
    }
    fn trans_ldrsbt_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr) -> bool {
        self.op_load_rr(ir, a, MemOp::sb(), true)
    }
    fn trans_ldrsbt_ri(&mut self, ir: &mut Context, a: &ArgsLdstRi) -> bool {
        self.op_load_ri(ir, a, MemOp::sb(), true)
    }
    fn trans_ldrsh_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr) -> bool {
        self.op_load_rr(ir, a, MemOp::sw(), false)
    }
    fn trans_ldrsh_ri(&mut self, ir: &mut Context, a: &ArgsLdstRi) -> bool {
        self.op_load_ri(ir, a, MemOp::sw(), false)
    }
    fn trans_ldrsht_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr) -> bool {
        self.op_load_rr(ir, a, MemOp::sw(), true)
    }
    fn trans_ldrsht_ri(&mut self, ir: &mut Context, a: &ArgsLdstRi) -> bool {
        self.op_load_ri(ir, a, MemOp::sw(), true)
    }
    fn trans_str_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr) -> bool {
        self.op_store_rr(ir, a, MemOp::ul(), false)
    }
    fn trans_str_ri(&mut self, ir: &mut Context, a: &ArgsLdstRi) -> bool {
        self.op_store_ri(ir, a, MemOp::ul(), false)
    }
    fn trans_strt_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr) -> bool {
        self.op_store_rr(ir, a, MemOp::ul(), true)
    }
    fn trans_strt_ri(&mut self, ir: &mut Context, a: &ArgsLdstRi) -> bool {
        self.op_store_ri(ir, a, MemOp::ul(), true)
    }
    fn trans_strb_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr) -> bool {
        self.op_store_rr(ir, a, MemOp::ub(), false)
    }
    fn trans_strb_ri(&mut self, ir: &mut Context, a: &ArgsLdstRi) -> bool {
        self.op_store_ri(ir, a, MemOp::ub(), false)
    }
    fn trans_strbt_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr) -> bool {
        self.op_store_rr(ir, a, MemOp::ub(), true)
    }
    fn trans_strbt_ri(&mut self, ir: &mut Context, a: &ArgsLdstRi) -> bool {
        self.op_store_ri(ir, a, MemOp::ub(), true)
    }
    fn trans_strh_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr) -> bool {
        self.op_store_rr(ir, a, MemOp::uw(), false)
    }
    fn trans_strh_ri(&mut self, ir: &mut Context, a: &ArgsLdstRi) -> bool {
        self.op_store_ri(ir, a, MemOp::uw(), false)
    }
    fn trans_strht_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr) -> bool {
        self.op_store_rr(ir, a, MemOp::uw(), true)
    }
    fn trans_strht_ri(&mut self, ir: &mut Context, a: &ArgsLdstRi) -> bool {
        self.op_store_ri(ir, a, MemOp::uw(), true)
    }
    fn trans_ldrd_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr) -> bool {
        self.op_ldrd_rr(ir, a, false)
    }
    fn trans_strd_rr(&mut self, ir: &mut Context, a: &ArgsLdstRr) -> bool {
        self.op_ldrd_rr(ir, a, true)
    }
    fn trans_ldrd_ri_a32(&mut self, ir: &mut Context, a: &ArgsLdstRi) -> bool {
        self.op_ldrd_ri_a32(ir, a, false)
    }
    fn trans_strd_ri_a32(&mut self, ir: &mut Context, a: &ArgsLdstRi) -> bool {
        self.op_ldrd_ri_a32(ir, a, true)
    }
    fn trans_ldrd_ri_t32(&mut self, ir: &mut Context, a: &ArgsLdstRi2) -> bool {
        self.op_ldrd_ri_t32(ir, a, false)
    }
    fn trans_strd_ri_t32(&mut self, ir: &mut Context, a: &ArgsLdstRi2) -> bool {
        self.op_ldrd_ri_t32(ir, a, true)
    }

    fn trans_swp(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_swp(ir, a, MemOp::ul().with(MemOp::ALIGN))
    }
    fn trans_swpb(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        self.op_swp(ir, a, MemOp::ub())
    }

    // ── Exclusive and acquire/release ──

    fn trans_strex(&mut self, ir: &mut Context, a: &ArgsStrex) -> bool {
        if !self.excl_ok() {
            return false;
        }
        self.op_strex(ir, a, MemOp::SIZE_32, false)
    }
    fn trans_strexb(&mut self, ir: &mut Context, a: &ArgsStrex) -> bool {
        if !self.excl_v6k_ok() {
            return false;
        }
        self.op_strex(ir, a, MemOp::SIZE_8, false)
    }
    fn trans_strexh(&mut self, ir: &mut Context, a: &ArgsStrex) -> bool {
        if !self.excl_v6k_ok() {
            return false;
        }
        self.op_strex(ir, a, MemOp::SIZE_16, false)
    }
    fn trans_strexd_a32(&mut self, ir: &mut Context, a: &ArgsStrex) -> bool {
        if !self.excl_v6k_ok() {
            return false;
        }
        self.op_strexd_a32(ir, a, false)
    }
    fn trans_strexd_t32(&mut self, ir: &mut Context, a: &ArgsStrex) -> bool {
        if !self.has(ArmFeature::V7) {
            return false;
        }
        self.op_strex(ir, a, MemOp::SIZE_64, false)
    }
    fn trans_stlex(&mut self, ir: &mut Context, a: &ArgsStrex) -> bool {
        if !self.has(ArmFeature::V8) {
            return false;
        }
        self.op_strex(ir, a, MemOp::SIZE_32, true)
    }
    fn trans_stlexb(&mut self, ir: &mut Context, a: &ArgsStrex) -> bool {
        if !self.has(ArmFeature::V8) {
            return false;
        }
        self.op_strex(ir, a, MemOp::SIZE_8, true)
    }
    fn trans_stlexh(&mut self, ir: &mut Context, a: &ArgsStrex) -> bool {
        if !self.has(ArmFeature::V8) {
            return false;
        }
        self.op_strex(ir, a, MemOp::SIZE_16, true)
    }
    fn trans_stlexd_a32(&mut self, ir: &mut Context, a: &ArgsStrex) -> bool {
        if !self.has(ArmFeature::V8) {
            return false;
        }
        self.op_strexd_a32(ir, a, true)
    }
    fn trans_stlexd_t32(&mut self, ir: &mut Context, a: &ArgsStrex) -> bool {
        if !self.has(ArmFeature::V8) {
            return false;
        }
        self.op_strex(ir, a, MemOp::SIZE_64, true)
    }
    fn trans_ldrex(&mut self, ir: &mut Context, a: &ArgsLdrex) -> bool {
        if !self.excl_ok() {
            return false;
        }
        self.op_ldrex(ir, a, MemOp::SIZE_32, false)
    }
    fn trans_ldrexb(&mut self, ir: &mut Context, a: &ArgsLdrex) -> bool {
        if !self.excl_v6k_ok() {
            return false;
        }
        self.op_ldrex(ir, a, MemOp::SIZE_8, false)
    }
    fn trans_ldrexh(&mut self, ir: &mut Context, a: &ArgsLdrex) -> bool {
        if !self.excl_v6k_ok() {
            return false;
        }
        self.op_ldrex(ir, a, MemOp::SIZE_16, false)
    }
    fn trans_ldrexd_a32(&mut self, ir: &mut Context, a: &ArgsLdrex) -> bool {
        if !self.excl_v6k_ok() {
            return false;
        }
        self.op_ldrexd_a32(ir, a, false)
    }
    fn trans_ldrexd_t32(&mut self, ir: &mut Context, a: &ArgsLdrex) -> bool {
        if !self.has(ArmFeature::V7) {
            return false;
        }
        self.op_ldrex(ir, a, MemOp::SIZE_64, false)
    }
    fn trans_ldaex(&mut self, ir: &mut Context, a: &ArgsLdrex) -> bool {
        if !self.has(ArmFeature::V8) {
            return false;
        }
        self.op_ldrex(ir, a, MemOp::SIZE_32, true)
    }
    fn trans_ldaexb(&mut self, ir: &mut Context, a: &ArgsLdrex) -> bool {
        if !self.has(ArmFeature::V8) {
            return false;
        }
        self.op_ldrex(ir, a, MemOp::SIZE_8, true)
    }
    fn trans_ldaexh(&mut self, ir: &mut Context, a: &ArgsLdrex) -> bool {
        if !self.has(ArmFeature::V8) {
            return false;
        }
        self.op_ldrex(ir, a, MemOp::SIZE_16, true)
    }
    fn trans_ldaexd_a32(&mut self, ir: &mut Context, a: &ArgsLdrex) -> bool {
        if !self.has(ArmFeature::V8) {
            return false;
        }
        self.op_ldrexd_a32(ir, a, true)
    }
    fn trans_ldaexd_t32(&mut self, ir: &mut Context, a: &ArgsLdrex) -> bool {
        if !self.has(ArmFeature::V8) {
            return false;
        }
        self.op_ldrex(ir, a, MemOp::SIZE_64, true)
    }
    fn trans_stl(&mut self, ir: &mut Context, a: &ArgsLdrex) -> bool {
        self.op_stl(ir, a, MemOp::ul())
    }
    fn trans_stlb(&mut self, ir: &mut Context, a: &ArgsLdrex) -> bool {
        self.op_stl(ir, a, MemOp::ub())
    }
    fn trans_stlh(&mut self, ir: &mut Context, a: &ArgsLdrex) -> bool {
        self.op_stl(ir, a, MemOp::uw())
    }
    fn trans_lda(&mut self, ir: &mut Context, a: &ArgsLdrex) -> bool {
        self.op_lda(ir, a, MemOp::ul())
    }
    fn trans_ldab(&mut self, ir: &mut Context, a: &ArgsLdrex) -> bool {
        self.op_lda(ir, a, MemOp::ub())
    }
    fn trans_ldah(&mut self, ir: &mut Context, a: &ArgsLdrex) -> bool {
        self.op_lda(ir, a, MemOp::uw())
    }
    fn trans_clrex(&mut self, ir: &mut Context, _a: &ArgsEmpty) -> bool {
        if !self.excl_v6k_ok() {
            return false;
        }
        self.gen_clrex(ir);
        true
    }

    // ── Block transfers ──

    fn trans_stm(&mut self, ir: &mut Context, a: &ArgsLdstBlock) -> bool {
        self.op_stm(ir, a)
    }
    fn trans_stm_t32(&mut self, ir: &mut Context, a: &ArgsLdstBlock) -> bool {
        self.op_stm_t32(ir, a)
    }
    fn trans_ldm_a32(&mut self, ir: &mut Context, a: &ArgsLdstBlock) -> bool {
        self.op_ldm_a32(ir, a)
    }
    fn trans_ldm_t32(&mut self, ir: &mut Context, a: &ArgsLdstBlock) -> bool {
        self.op_ldm_t32(ir, a)
    }
    fn trans_ldm_t16(&mut self, ir: &mut Context, a: &ArgsLdstBlock) -> bool {
        self.op_ldm_t16(ir, a)
    }
    fn trans_rfe(&mut self, ir: &mut Context, a: &ArgsRfe) -> bool {
        self.op_rfe(ir, a)
    }
    fn trans_srs(&mut self, ir: &mut Context, a: &ArgsSrs) -> bool {
        self.op_srs(ir, a)
    }

    // ── Branches ──

    fn trans_b(&mut self, ir: &mut Context, a: &ArgsI) -> bool {
        let dest = self.jmp_target(a.imm);
        self.gen_jmp(ir, dest);
        true
    }

    fn trans_b_cond_thumb(&mut self, ir: &mut Context, a: &ArgsCi) -> bool {
        // 0b1110 and 0b1111 are other encodings.
        if a.cond >= 0xe {
            return false;
        }
        if self.condexec_mask != 0 {
            self.unallocated_encoding(ir);
            return true;
        }
        self.skip_unless(ir, a.cond as u32);
        let dest = self.jmp_target(a.imm);
        self.gen_jmp(ir, dest);
        true
    }

    fn trans_bl(&mut self, ir: &mut Context, a: &ArgsI) -> bool {
        let lr = self.pc_next() | self.tb.thumb as u32;
        ir.gen_movi(Type::I32, self.regs[14], lr as u64);
        let dest = self.jmp_target(a.imm);
        self.gen_jmp(ir, dest);
        true
    }

    fn trans_blx_i(&mut self, ir: &mut Context, a: &ArgsI) -> bool {
        // The Thumb form needs H == 0.
        if self.tb.thumb && a.imm & 2 != 0 {
            return false;
        }
        let lr = self.pc_next() | self.tb.thumb as u32;
        ir.gen_movi(Type::I32, self.regs[14], lr as u64);
        // Relative to the word-aligned PC.
        let dest = self.jmp_target(a.imm - (self.pc_curr & 3) as i64);
        let thumb = !self.tb.thumb;
        self.store_cpu_field_constant(ir, thumb as u32, THUMB_OFFSET);
        self.gen_jmp(ir, dest);
        true
    }

    fn trans_bl_blx_prefix(&mut self, ir: &mut Context, a: &ArgsI) -> bool {
        let hi = self.read_pc().wrapping_add((a.imm << 12) as u32);
        ir.gen_movi(Type::I32, self.regs[14], hi as u64);
        true
    }

    fn trans_bl_suffix(&mut self, ir: &mut Context, a: &ArgsI) -> bool {
        let tmp = ir.new_temp(Type::I32);
        ir.gen_addi(Type::I32, tmp, self.regs[14], ((a.imm << 1) | 1) as u64);
        let lr = self.pc_next() | 1;
        ir.gen_movi(Type::I32, self.regs[14], lr as u64);
        self.gen_bx(ir, tmp);
        true
    }

    fn trans_blx_suffix(&mut self, ir: &mut Context, a: &ArgsI) -> bool {
        if !self.has(ArmFeature::V5) {
            return false;
        }
        let tmp = ir.new_temp(Type::I32);
        ir.gen_addi(Type::I32, tmp, self.regs[14], (a.imm << 1) as u64);
        ir.gen_andi(Type::I32, tmp, tmp, 0xffff_fffc);
        let lr = self.pc_next() | 1;
        ir.gen_movi(Type::I32, self.regs[14], lr as u64);
        self.gen_bx(ir, tmp);
        true
    }

    fn trans_bx(&mut self, ir: &mut Context, a: &ArgsR) -> bool {
        if !self.has(ArmFeature::V4T) {
            return false;
        }
        let tmp = self.load_reg(ir, a.rm);
        self.gen_bx_excret(ir, tmp);
        true
    }

    /// Without Jazelle hardware, BXJ behaves as BX.
    fn trans_bxj(&mut self, ir: &mut Context, a: &ArgsR) -> bool {
        if !self.has(ArmFeature::JAZELLE) || self.is_m() {
            return false;
        }
        let tmp = self.load_reg(ir, a.rm);
        self.gen_bx(ir, tmp);
        true
    }

    fn trans_blx_r(&mut self, ir: &mut Context, a: &ArgsR) -> bool {
        if !self.has(ArmFeature::V5) {
            return false;
        }
        let tmp = self.load_reg(ir, a.rm);
        let lr = self.pc_next() | self.tb.thumb as u32;
        ir.gen_movi(Type::I32, self.regs[14], lr as u64);
        self.gen_bx_excret(ir, tmp);
        true
    }

    fn trans_cbz(&mut self, ir: &mut Context, a: &ArgsCbz) -> bool {
        if !self.has(ArmFeature::THUMB2) {
            return false;
        }
        let tmp = self.load_reg(ir, a.rn);
        self.gen_condlabel(ir);
        let cond = if a.nz != 0 { Cond::Eq } else { Cond::Ne };
        ir.gen_brcondi(Type::I32, tmp, 0, cond, self.condlabel);
        let dest = self.jmp_target(a.imm);
        self.gen_jmp(ir, dest);
        true
    }

    fn trans_tbb(&mut self, ir: &mut Context, a: &ArgsTbranch) -> bool {
        self.op_tbranch(ir, a, false)
    }
    fn trans_tbh(&mut self, ir: &mut Context, a: &ArgsTbranch) -> bool {
        self.op_tbranch(ir, a, true)
    }

    /// IT emits nothing: the translator applies the condition to the
    /// following instructions. A first condition of 0b1111 is treated
    /// as 0b1110.
    fn trans_it(&mut self, _ir: &mut Context, a: &ArgsIt) -> bool {
        self.condexec_cond = ((a.cond_mask >> 4) & 0xe) as u32;
        self.condexec_mask = (a.cond_mask & 0x1f) as u32;
        true
    }

    // ── Status registers and modes ──

    fn trans_msr_imm(&mut self, ir: &mut Context, a: &ArgsMsrI) -> bool {
        self.op_msr_imm(ir, a)
    }
    fn trans_msr_reg(&mut self, ir: &mut Context, a: &ArgsMsrReg) -> bool {
        self.op_msr_reg(ir, a)
    }
    fn trans_mrs_reg(&mut self, ir: &mut Context, a: &ArgsMrsReg) -> bool {
        self.op_mrs_reg(ir, a)
    }
    fn trans_msr_bank(&mut self, ir: &mut Context, a: &ArgsMsrBank) -> bool {
        self.op_msr_bank(ir, a)
    }
    fn trans_mrs_bank(&mut self, ir: &mut Context, a: &ArgsMrsBank) -> bool {
        self.op_mrs_bank(ir, a)
    }
    fn trans_msr_v7m(&mut self, ir: &mut Context, a: &ArgsMsrV7m) -> bool {
        self.op_msr_v7m(ir, a)
    }
    fn trans_mrs_v7m(&mut self, ir: &mut Context, a: &ArgsMrsV7m) -> bool {
        self.op_mrs_v7m(ir, a)
    }
    fn trans_cps(&mut self, ir: &mut Context, a: &ArgsCps) -> bool {
        self.op_cps(ir, a)
    }
    fn trans_cps_v7m(&mut self, ir: &mut Context, a: &ArgsAutoCpsV7m) -> bool {
        self.op_cps_v7m(ir, a.im != 0, a.i != 0, a.f != 0)
    }
    fn trans_setend(&mut self, ir: &mut Context, a: &ArgsSetend) -> bool {
        self.op_setend(ir, a.e != 0)
    }
    fn trans_eret(&mut self, ir: &mut Context, _a: &ArgsEmpty) -> bool {
        self.op_eret(ir)
    }

    // ── Exception generation ──

    fn trans_svc(&mut self, ir: &mut Context, a: &ArgsI) -> bool {
        self.op_svc(ir, a.imm)
    }
    fn trans_hvc(&mut self, ir: &mut Context, a: &ArgsI) -> bool {
        self.op_hvc(ir, a.imm)
    }
    fn trans_smc(&mut self, ir: &mut Context, _a: &ArgsI) -> bool {
        self.op_smc(ir)
    }
    fn trans_bkpt(&mut self, ir: &mut Context, a: &ArgsI) -> bool {
        self.op_bkpt(ir, a.imm)
    }
    fn trans_hlt(&mut self, ir: &mut Context, a: &ArgsI) -> bool {
        self.op_hlt(ir, a.imm)
    }
    fn trans_udf(&mut self, ir: &mut Context, _a: &ArgsEmpty) -> bool {
        self.unallocated_encoding(ir);
        true
    }

    // ── Hints and barriers ──

    fn trans_nop(&mut self, _ir: &mut Context, _a: &ArgsEmpty) -> bool {
        true
    }
    /// Error synchronization: nothing to synchronize here.
    fn trans_esb(&mut self, _ir: &mut Context, _a: &ArgsEmpty) -> bool {
        true
    }
    fn trans_yield(&mut self, ir: &mut Context, _a: &ArgsEmpty) -> bool {
        self.op_wfe_yield(ir, DisasJumpType::Yield)
    }
    fn trans_wfe(&mut self, ir: &mut Context, _a: &ArgsEmpty) -> bool {
        self.op_wfe_yield(ir, DisasJumpType::Wfe)
    }
    fn trans_wfi(&mut self, ir: &mut Context, _a: &ArgsEmpty) -> bool {
        self.op_wfi(ir)
    }
    fn trans_dsb(&mut self, ir: &mut Context, _a: &ArgsEmpty) -> bool {
        self.op_dmb(ir)
    }
    fn trans_dmb(&mut self, ir: &mut Context, _a: &ArgsEmpty) -> bool {
        self.op_dmb(ir)
    }
    fn trans_isb(&mut self, ir: &mut Context, _a: &ArgsEmpty) -> bool {
        self.op_isb(ir)
    }
    fn trans_sb(&mut self, ir: &mut Context, _a: &ArgsEmpty) -> bool {
        self.op_sb(ir)
    }
    fn trans_pld(&mut self, _ir: &mut Context, _a: &ArgsEmpty) -> bool {
        self.has(ArmFeature::V5)
    }
    fn trans_pldw(&mut self, _ir: &mut Context, _a: &ArgsEmpty) -> bool {
        self.has(ArmFeature::V7)
    }
    fn trans_pli(&mut self, _ir: &mut Context, _a: &ArgsEmpty) -> bool {
        self.has(ArmFeature::V7)
    }

    // ── Coprocessor ──

    fn trans_mcr(&mut self, ir: &mut Context, a: &ArgsMcr) -> bool {
        self.op_mcr_mrc(ir, a, false)
    }
    fn trans_mrc(&mut self, ir: &mut Context, a: &ArgsMcr) -> bool {
        self.op_mcr_mrc(ir, a, true)
    }
    fn trans_mcrr(&mut self, ir: &mut Context, a: &ArgsMcrr) -> bool {
        self.op_mcrr_mrrc(ir, a, false)
    }
    fn trans_mrrc(&mut self, ir: &mut Context, a: &ArgsMcrr) -> bool {
        self.op_mcrr_mrrc(ir, a, true)
    }

    // ── Field hooks ──

    fn times_2(&self, x: i64) -> i64 {
        x * 2
    }
    fn times_4(&self, x: i64) -> i64 {
        x * 4
    }
    fn negate(&self, x: i64) -> i64 {
        -x
    }
    fn plus_2(&self, x: i64) -> i64 {
        x + 2
    }

    /// Rotation of a T32 modified immediate; zero for the replicated
    /// byte forms.
    fn t32_expandimm_rot(&self, x: i64) -> i64 {
        if x & 0xc00 != 0 {
            (x >> 7) & 0x1f
        } else {
            0
        }
    }

    fn t32_expandimm_imm(&self, x: i64) -> i64 {
        let imm = x & 0xff;
        match (x >> 8) & 0xf {
            0 => imm,
            1 => imm * 0x0001_0001,
            2 => imm * 0x0100_0100,
            3 => imm * 0x0101_0101,
            // Rotated: the top bit is implied.
            _ => imm | 0x80,
        }
    }

    /// J1/J2 are stored inverted relative to the sign bit.
    fn t32_branch24(&self, x: i64) -> i64 {
        let x = if x >= 0 { x ^ (3 << 21) } else { x };
        x * 2
    }

    /// 16-bit data processing sets flags only outside an IT block.
    fn t16_setflags(&self, _x: i64) -> i64 {
        (self.condexec_mask == 0) as i64
    }

    /// PUSH list bit 8 is LR.
    fn t16_push_list(&self, x: i64) -> i64 {
        (x & 0xff) | ((x & 0x100) << 6)
    }

    /// POP list bit 8 is PC.
    fn t16_pop_list(&self, x: i64) -> i64 {
        (x & 0xff) | ((x & 0x100) << 7)
    }
}
