//! Data processing: ALU ops with their three operand forms,
//! multiplies, saturation, parallel arithmetic, packing and bit
//! fields.

use tcg_core::ir_builder::BSWAP_OS;
use tcg_core::{Cond, Context, TempIdx, Type};

use super::ArmDisasContext;
use crate::arm::config::ArmFeature;
use crate::arm::cpu::{QF_OFFSET, SPSR_OFFSET};
use crate::arm::decode::{
    ArgsBfi, ArgsBfx, ArgsPkh, ArgsRrr, ArgsRrrRot, ArgsRrrr, ArgsSRriRot, ArgsSRrrShi,
    ArgsSRrrShr, ArgsSRrrr, ArgsSat,
};
use crate::arm::helper::alu::{parallel_op, ParallelKind, ParallelPrefix};
use crate::arm::helper::Helper;
use crate::DisasJumpType;

/// Where the result of a data-processing op goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum StoreRegKind {
    /// Flag-setting compare: the result is dropped.
    None,
    Normal,
    /// SP destination with SP source.
    SpCheck,
    /// `SUBS PC, LR` style return: PC from the result, CPSR from
    /// SPSR.
    ExcRet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum AluOp {
    And,
    Eor,
    Orr,
    Orn,
    Bic,
    Mov,
    Mvn,
    Add,
    Adc,
    Sub,
    Sbc,
    Rsb,
    Rsc,
}

impl AluOp {
    /// Logical ops take C from the shifter and leave V alone.
    fn is_logic(self) -> bool {
        matches!(
            self,
            AluOp::And | AluOp::Eor | AluOp::Orr | AluOp::Orn | AluOp::Bic | AluOp::Mov | AluOp::Mvn
        )
    }

    /// Ops with no first operand.
    fn is_move(self) -> bool {
        matches!(self, AluOp::Mov | AluOp::Mvn)
    }
}

/// Source lanes of an extend instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ExtendKind {
    Byte,
    Half,
    /// Bytes 0 and 2 into two halfwords.
    DualByte,
}

/// Multiply-accumulate width of the halfword multiplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum MulAcc {
    None,
    Add,
    Long,
}

impl ArmDisasContext<'_> {
    /// `d = a <op> b`, setting NZCV for the arithmetic ops when `s`.
    fn gen_alu(&self, ir: &mut Context, op: AluOp, s: bool, d: TempIdx, a: TempIdx, b: TempIdx) {
        let ty = Type::I32;
        match op {
            AluOp::And => {
                ir.gen_and(ty, d, a, b);
            }
            AluOp::Eor => {
                ir.gen_xor(ty, d, a, b);
            }
            AluOp::Orr => {
                ir.gen_or(ty, d, a, b);
            }
            AluOp::Orn => {
                ir.gen_orc(ty, d, a, b);
            }
            AluOp::Bic => {
                ir.gen_andc(ty, d, a, b);
            }
            AluOp::Mov => {
                ir.gen_mov(ty, d, b);
            }
            AluOp::Mvn => {
                ir.gen_not(ty, d, b);
            }
            AluOp::Add if s => self.gen_add_cc(ir, d, a, b),
            AluOp::Add => {
                ir.gen_add(ty, d, a, b);
            }
            AluOp::Adc if s => self.gen_adc_cc(ir, d, a, b),
            AluOp::Adc => self.gen_add_carry(ir, d, a, b),
            AluOp::Sub if s => self.gen_sub_cc(ir, d, a, b),
            AluOp::Sub => {
                ir.gen_sub(ty, d, a, b);
            }
            AluOp::Sbc if s => self.gen_sbc_cc(ir, d, a, b),
            AluOp::Sbc => self.gen_sub_carry(ir, d, a, b),
            AluOp::Rsb if s => self.gen_sub_cc(ir, d, b, a),
            AluOp::Rsb => {
                ir.gen_sub(ty, d, b, a);
            }
            AluOp::Rsc if s => self.gen_sbc_cc(ir, d, b, a),
            AluOp::Rsc => self.gen_sub_carry(ir, d, b, a),
        }
    }

    fn store_reg_kind(&mut self, ir: &mut Context, rd: i64, kind: StoreRegKind, val: TempIdx) {
        match kind {
            StoreRegKind::None => {}
            // ALUWritePC interworks only from A32.
            StoreRegKind::Normal if self.tb.thumb => self.store_reg(ir, rd, val),
            StoreRegKind::Normal => self.store_reg_bx(ir, rd, val),
            StoreRegKind::SpCheck => self.store_sp_checked(ir, val),
            StoreRegKind::ExcRet => self.gen_exception_return(ir, val),
        }
    }

    /// Return from an exception: PC from `pc`, CPSR from `cpsr`.
    pub(super) fn gen_rfe(&mut self, ir: &mut Context, pc: TempIdx, cpsr: TempIdx) {
        self.store_reg(ir, 15, pc);
        self.translator_io_start(ir);
        self.call_void(ir, Helper::CpsrWriteEret, &[cpsr]);
        // Unmasked interrupts are checked in the main loop.
        self.base.is_jmp = DisasJumpType::Exit;
    }

    pub(super) fn gen_exception_return(&mut self, ir: &mut Context, pc: TempIdx) {
        let spsr = self.load_cpu_offset(ir, SPSR_OFFSET);
        self.gen_rfe(ir, pc, spsr);
    }

    /// Result routing of a SUB or MOV that may write the PC with
    /// flags set. `None` when the instruction UNDEFs; otherwise the
    /// flag-setting to use and the destination kind.
    fn pc_dest_kind(
        &mut self,
        ir: &mut Context,
        rd: i64,
        s: bool,
        sp_src: bool,
    ) -> Option<(bool, StoreRegKind)> {
        if rd == 15 && s {
            // UNPREDICTABLE in User mode (we UNDEF), UNDEFINED in Hyp.
            if self.is_user() || self.tb.current_el == 2 {
                self.unallocated_encoding(ir);
                return None;
            }
            // The exception return does not write NZCV.
            return Some((false, StoreRegKind::ExcRet));
        }
        if rd == 13 && sp_src {
            return Some((s, StoreRegKind::SpCheck));
        }
        Some((s, StoreRegKind::Normal))
    }

    // -- Operand forms --

    /// Register operand shifted by an immediate.
    pub(super) fn op_s_rrr_shi(
        &mut self,
        ir: &mut Context,
        a: &ArgsSRrrShi,
        op: AluOp,
        s: bool,
        kind: StoreRegKind,
    ) -> bool {
        let logic_cc = s && op.is_logic();
        let tmp2 = self.load_reg(ir, a.rm);
        self.gen_arm_shift_im(ir, tmp2, a.shty as u32, a.shim as u32, logic_cc);
        let tmp1 = if op.is_move() {
            ir.new_temp(Type::I32)
        } else {
            self.load_reg(ir, a.rn)
        };
        self.gen_alu(ir, op, s, tmp1, tmp1, tmp2);
        if logic_cc {
            self.gen_logic_cc(ir, tmp1);
        }
        self.store_reg_kind(ir, a.rd, kind, tmp1);
        true
    }

    /// Register operand shifted by a register.
    pub(super) fn op_s_rrr_shr(
        &mut self,
        ir: &mut Context,
        a: &ArgsSRrrShr,
        op: AluOp,
        s: bool,
        kind: StoreRegKind,
    ) -> bool {
        let logic_cc = s && op.is_logic();
        let shift = self.load_reg(ir, a.rs);
        let tmp2 = self.load_reg(ir, a.rm);
        self.gen_arm_shift_reg(ir, tmp2, a.shty as u32, shift, logic_cc);
        let tmp1 = if op.is_move() {
            ir.new_temp(Type::I32)
        } else {
            self.load_reg(ir, a.rn)
        };
        self.gen_alu(ir, op, s, tmp1, tmp1, tmp2);
        if logic_cc {
            self.gen_logic_cc(ir, tmp1);
        }
        self.store_reg_kind(ir, a.rd, kind, tmp1);
        true
    }

    /// Rotated immediate operand.
    pub(super) fn op_s_rri_rot(
        &mut self,
        ir: &mut Context,
        a: &ArgsSRriRot,
        op: AluOp,
        s: bool,
        kind: StoreRegKind,
    ) -> bool {
        let logic_cc = s && op.is_logic();
        let imm = (a.imm as u32).rotate_right(a.rot as u32);
        if logic_cc && a.rot != 0 {
            ir.gen_movi(Type::I32, self.cf, (imm >> 31) as u64);
        }
        let tmp2 = self.const32(ir, imm);
        let tmp1 = if op.is_move() {
            ir.new_temp(Type::I32)
        } else {
            self.load_reg(ir, a.rn)
        };
        self.gen_alu(ir, op, s, tmp1, tmp1, tmp2);
        if logic_cc {
            self.gen_logic_cc(ir, tmp1);
        }
        self.store_reg_kind(ir, a.rd, kind, tmp1);
        true
    }

    /// Destination routing shared by the three SUB forms.
    pub(super) fn sub_kind(
        &mut self,
        ir: &mut Context,
        rd: i64,
        rn: i64,
        s: bool,
    ) -> Option<(bool, StoreRegKind)> {
        self.pc_dest_kind(ir, rd, s, rn == 13)
    }

    /// Destination routing shared by the MOV forms.
    pub(super) fn mov_kind(&mut self, ir: &mut Context, rd: i64, s: bool) -> Option<(bool, StoreRegKind)> {
        self.pc_dest_kind(ir, rd, s, true)
    }

    pub(super) fn add_kind(&self, rd: i64, rn: i64) -> StoreRegKind {
        if rd == 13 && rn == 13 {
            StoreRegKind::SpCheck
        } else {
            StoreRegKind::Normal
        }
    }

    // -- Wide immediates --

    pub(super) fn op_movw(&mut self, ir: &mut Context, rd: i64, imm: i64) -> bool {
        if !self.has(ArmFeature::THUMB2) {
            return false;
        }
        let c = self.const32(ir, imm as u32);
        self.store_reg(ir, rd, c);
        true
    }

    pub(super) fn op_movt(&mut self, ir: &mut Context, rd: i64, imm: i64) -> bool {
        if !self.has(ArmFeature::THUMB2) {
            return false;
        }
        let tmp = self.load_reg(ir, rd);
        ir.gen_ext16u(Type::I32, tmp, tmp);
        ir.gen_ori(Type::I32, tmp, tmp, ((imm as u32) << 16) as u64);
        self.store_reg(ir, rd, tmp);
        true
    }

    pub(super) fn op_adr(&mut self, ir: &mut Context, rd: i64, imm: i64) -> bool {
        let t = self.add_reg_for_lit(ir, 15, imm as i32);
        self.store_reg_bx(ir, rd, t);
        true
    }

    // -- Multiply --

    /// A32 v6, or T32 with the DSP extension.
    fn dsp_ok(&self) -> bool {
        if self.tb.thumb {
            self.has(ArmFeature::THUMB_DSP)
        } else {
            self.has(ArmFeature::V6)
        }
    }

    /// A32 v5TE, or T32 with the DSP extension.
    fn dsp_v5_ok(&self) -> bool {
        if self.tb.thumb {
            self.has(ArmFeature::THUMB_DSP)
        } else {
            self.has(ArmFeature::V5)
        }
    }

    pub(super) fn op_mla(&mut self, ir: &mut Context, a: &ArgsSRrrr, add: bool) -> bool {
        let t1 = self.load_reg(ir, a.rn);
        let t2 = self.load_reg(ir, a.rm);
        ir.gen_mul(Type::I32, t1, t1, t2);
        if add {
            let t2 = self.load_reg(ir, a.ra);
            ir.gen_add(Type::I32, t1, t1, t2);
        }
        if a.s != 0 {
            self.gen_logic_cc(ir, t1);
        }
        self.store_reg(ir, a.rd, t1);
        true
    }

    pub(super) fn op_mls(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        if !self.has(ArmFeature::THUMB2) {
            return false;
        }
        let t1 = self.load_reg(ir, a.rn);
        let t2 = self.load_reg(ir, a.rm);
        ir.gen_mul(Type::I32, t1, t1, t2);
        let t2 = self.load_reg(ir, a.ra);
        ir.gen_sub(Type::I32, t1, t2, t1);
        self.store_reg(ir, a.rd, t1);
        true
    }

    /// Long multiply into RdHi:RdLo (`rd`:`ra`).
    pub(super) fn op_mlal(&mut self, ir: &mut Context, a: &ArgsSRrrr, uns: bool, add: bool) -> bool {
        let t0 = self.load_reg(ir, a.rm);
        let t1 = self.load_reg(ir, a.rn);
        if uns {
            ir.gen_mulu2(Type::I32, t0, t1, t0, t1);
        } else {
            ir.gen_muls2(Type::I32, t0, t1, t0, t1);
        }
        if add {
            let t2 = self.load_reg(ir, a.ra);
            let t3 = self.load_reg(ir, a.rd);
            ir.gen_add2(Type::I32, t0, t1, t0, t1, t2, t3);
        }
        if a.s != 0 {
            ir.gen_mov(Type::I32, self.nf, t1);
            ir.gen_or(Type::I32, self.zf, t0, t1);
        }
        self.store_reg(ir, a.ra, t0);
        self.store_reg(ir, a.rd, t1);
        true
    }

    pub(super) fn op_umaal(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        if !self.dsp_ok() {
            return false;
        }
        let t0 = self.load_reg(ir, a.rm);
        let t1 = self.load_reg(ir, a.rn);
        ir.gen_mulu2(Type::I32, t0, t1, t0, t1);
        let zero = self.const32(ir, 0);
        let t2 = self.load_reg(ir, a.ra);
        ir.gen_add2(Type::I32, t0, t1, t0, t1, t2, zero);
        let t2 = self.load_reg(ir, a.rd);
        ir.gen_add2(Type::I32, t0, t1, t0, t1, t2, zero);
        self.store_reg(ir, a.ra, t0);
        self.store_reg(ir, a.rd, t1);
        true
    }

    /// Signed 16x16 multiply of the halves picked by `x` and `y`.
    fn gen_mulxy(&self, ir: &mut Context, t0: TempIdx, t1: TempIdx, x: bool, y: bool) {
        if x {
            ir.gen_sari(Type::I32, t0, t0, 16);
        } else {
            ir.gen_ext16s(Type::I32, t0, t0);
        }
        if y {
            ir.gen_sari(Type::I32, t1, t1, 16);
        } else {
            ir.gen_ext16s(Type::I32, t1, t1);
        }
        ir.gen_mul(Type::I32, t0, t0, t1);
    }

    /// SMUL<x><y>, SMLA<x><y> and SMLAL<x><y>.
    pub(super) fn op_smlaxxx(
        &mut self,
        ir: &mut Context,
        a: &ArgsRrrr,
        acc: MulAcc,
        nt: bool,
        mt: bool,
    ) -> bool {
        if !self.dsp_v5_ok() {
            return false;
        }
        let t0 = self.load_reg(ir, a.rn);
        let t1 = self.load_reg(ir, a.rm);
        self.gen_mulxy(ir, t0, t1, nt, mt);
        match acc {
            MulAcc::None => self.store_reg(ir, a.rd, t0),
            MulAcc::Add => {
                let t1 = self.load_reg(ir, a.ra);
                let r = self.call(ir, Helper::AddSetq, &[t0, t1]);
                self.store_reg(ir, a.rd, r);
            }
            MulAcc::Long => {
                let tl = self.load_reg(ir, a.ra);
                let th = self.load_reg(ir, a.rd);
                let sign = ir.new_temp(Type::I32);
                ir.gen_sari(Type::I32, sign, t0, 31);
                ir.gen_add2(Type::I32, tl, th, tl, th, t0, sign);
                self.store_reg(ir, a.ra, tl);
                self.store_reg(ir, a.rd, th);
            }
        }
        true
    }

    /// SMULW<y> and SMLAW<y>: bits 47:16 of a 32x16 product.
    pub(super) fn op_smlawx(&mut self, ir: &mut Context, a: &ArgsRrrr, add: bool, mt: bool) -> bool {
        if !self.dsp_v5_ok() {
            return false;
        }
        let t0 = self.load_reg(ir, a.rn);
        let t1 = self.load_reg(ir, a.rm);
        // Put the halfword at the top so the result lands in the
        // high word of the 64-bit product.
        if mt {
            ir.gen_andi(Type::I32, t1, t1, 0xffff_0000);
        } else {
            ir.gen_shli(Type::I32, t1, t1, 16);
        }
        ir.gen_muls2(Type::I32, t0, t1, t0, t1);
        let res = if add {
            let ra = self.load_reg(ir, a.ra);
            self.call(ir, Helper::AddSetq, &[t1, ra])
        } else {
            t1
        };
        self.store_reg(ir, a.rd, res);
        true
    }

    /// `a = lo(a) * lo(b)`, `b = hi(a) * hi(b)`, signed halves.
    fn gen_smul_dual(&self, ir: &mut Context, a: TempIdx, b: TempIdx) {
        let tmp1 = ir.new_temp(Type::I32);
        let tmp2 = ir.new_temp(Type::I32);
        ir.gen_ext16s(Type::I32, tmp1, a);
        ir.gen_ext16s(Type::I32, tmp2, b);
        ir.gen_mul(Type::I32, tmp1, tmp1, tmp2);
        ir.gen_sari(Type::I32, a, a, 16);
        ir.gen_sari(Type::I32, b, b, 16);
        ir.gen_mul(Type::I32, b, b, a);
        ir.gen_mov(Type::I32, a, tmp1);
    }

    /// SMLAD, SMLSD and their X and no-accumulate forms.
    pub(super) fn op_smlad(&mut self, ir: &mut Context, a: &ArgsRrrr, m_swap: bool, sub: bool) -> bool {
        if !self.dsp_ok() {
            return false;
        }
        let t1 = self.load_reg(ir, a.rn);
        let t2 = self.load_reg(ir, a.rm);
        if m_swap {
            ir.gen_rotri(Type::I32, t2, t2, 16);
        }
        self.gen_smul_dual(ir, t1, t2);

        let res = if sub {
            // The difference cannot overflow; only the accumulate
            // may set Q.
            ir.gen_sub(Type::I32, t1, t1, t2);
            if a.ra != 15 {
                let ra = self.load_reg(ir, a.ra);
                self.call(ir, Helper::AddSetq, &[t1, ra])
            } else {
                t1
            }
        } else if a.ra == 15 {
            self.call(ir, Helper::AddSetq, &[t1, t2])
        } else {
            // Sum the products and Ra in 64 bits so an overflowing
            // intermediate does not set Q on its own.
            let p64 = ir.new_temp(Type::I64);
            let q64 = ir.new_temp(Type::I64);
            ir.gen_ext_i32_i64(p64, t1);
            ir.gen_ext_i32_i64(q64, t2);
            ir.gen_add(Type::I64, p64, p64, q64);
            let ra = self.load_reg(ir, a.ra);
            ir.gen_ext_i32_i64(q64, ra);
            ir.gen_add(Type::I64, p64, p64, q64);
            ir.gen_extr_i64_i32(t1, t2, p64);
            // Overflow iff the high half is not the sign of the low.
            let t3 = ir.new_temp(Type::I32);
            ir.gen_sari(Type::I32, t3, t1, 31);
            let qf = self.load_cpu_offset(ir, QF_OFFSET);
            let one = self.const32(ir, 1);
            ir.gen_movcond(Type::I32, qf, t2, t3, one, qf, Cond::Ne);
            self.store_cpu_offset(ir, qf, QF_OFFSET);
            t1
        };
        self.store_reg(ir, a.rd, res);
        true
    }

    /// Add the 64-bit value in `rhigh`:`rlow` to `val`.
    fn gen_addq(&self, ir: &mut Context, val: TempIdx, rlow: i64, rhigh: i64) {
        let lo = self.load_reg(ir, rlow);
        let hi = self.load_reg(ir, rhigh);
        let t = ir.new_temp(Type::I64);
        ir.gen_concat_i32_i64(t, lo, hi);
        ir.gen_add(Type::I64, val, val, t);
    }

    fn gen_storeq_reg(&mut self, ir: &mut Context, rlow: i64, rhigh: i64, val: TempIdx) {
        let lo = ir.new_temp(Type::I32);
        ir.gen_extrl_i64_i32(lo, val);
        self.store_reg(ir, rlow, lo);
        let hi = ir.new_temp(Type::I32);
        ir.gen_extrh_i64_i32(hi, val);
        self.store_reg(ir, rhigh, hi);
    }

    /// SMLALD and SMLSLD.
    pub(super) fn op_smlald(&mut self, ir: &mut Context, a: &ArgsRrrr, m_swap: bool, sub: bool) -> bool {
        if !self.dsp_ok() {
            return false;
        }
        let t1 = self.load_reg(ir, a.rn);
        let t2 = self.load_reg(ir, a.rm);
        if m_swap {
            ir.gen_rotri(Type::I32, t2, t2, 16);
        }
        self.gen_smul_dual(ir, t1, t2);
        let l1 = ir.new_temp(Type::I64);
        let l2 = ir.new_temp(Type::I64);
        ir.gen_ext_i32_i64(l1, t1);
        ir.gen_ext_i32_i64(l2, t2);
        if sub {
            ir.gen_sub(Type::I64, l1, l1, l2);
        } else {
            ir.gen_add(Type::I64, l1, l1, l2);
        }
        self.gen_addq(ir, l1, a.ra, a.rd);
        self.gen_storeq_reg(ir, a.ra, a.rd, l1);
        true
    }

    /// SMMLA, SMMLS and SMMUL, optionally rounding.
    pub(super) fn op_smmla(&mut self, ir: &mut Context, a: &ArgsRrrr, round: bool, sub: bool) -> bool {
        if !self.dsp_ok() {
            return false;
        }
        let t1 = self.load_reg(ir, a.rn);
        let t2 = self.load_reg(ir, a.rm);
        ir.gen_muls2(Type::I32, t2, t1, t1, t2);
        if a.ra != 15 {
            let t3 = self.load_reg(ir, a.ra);
            if sub {
                // 64-bit subtract: the low product word borrows and
                // is kept for the rounding below.
                let zero = self.const32(ir, 0);
                ir.gen_sub2(Type::I32, t2, t1, zero, t3, t2, t1);
            } else {
                ir.gen_add(Type::I32, t1, t1, t3);
            }
        }
        if round {
            // +0x80000000 carries into the high word when bit 31 of
            // the low word is set.
            ir.gen_shri(Type::I32, t2, t2, 31);
            ir.gen_add(Type::I32, t1, t1, t2);
        }
        self.store_reg(ir, a.rd, t1);
        true
    }

    pub(super) fn op_div(&mut self, ir: &mut Context, a: &ArgsRrrr, unsigned: bool) -> bool {
        let ok = if self.tb.thumb {
            self.has(ArmFeature::THUMB_DIV)
        } else {
            self.has(ArmFeature::ARM_DIV)
        };
        if !ok {
            return false;
        }
        let t1 = self.load_reg(ir, a.rn);
        let t2 = self.load_reg(ir, a.rm);
        let h = if unsigned { Helper::Udiv } else { Helper::Sdiv };
        let r = self.call(ir, h, &[t1, t2]);
        self.store_reg(ir, a.rd, r);
        true
    }

    pub(super) fn op_usada8(&mut self, ir: &mut Context, a: &ArgsRrrr) -> bool {
        if !self.dsp_ok() {
            return false;
        }
        let t1 = self.load_reg(ir, a.rn);
        let t2 = self.load_reg(ir, a.rm);
        let r = self.call(ir, Helper::Usad8, &[t1, t2]);
        if a.ra != 15 {
            let t2 = self.load_reg(ir, a.ra);
            ir.gen_add(Type::I32, r, r, t2);
        }
        self.store_reg(ir, a.rd, r);
        true
    }

    // -- Saturation --

    /// QADD, QSUB, QDADD and QDSUB.
    pub(super) fn op_qaddsub(&mut self, ir: &mut Context, a: &ArgsRrr, add: bool, doub: bool) -> bool {
        if !self.dsp_v5_ok() {
            return false;
        }
        let t0 = self.load_reg(ir, a.rm);
        let mut t1 = self.load_reg(ir, a.rn);
        if doub {
            t1 = self.call(ir, Helper::DoubleSaturate, &[t1]);
        }
        let h = if add {
            Helper::AddSaturate
        } else {
            Helper::SubSaturate
        };
        let r = self.call(ir, h, &[t0, t1]);
        self.store_reg(ir, a.rd, r);
        true
    }

    /// SSAT, USAT and the halfword forms.
    pub(super) fn op_sat(&mut self, ir: &mut Context, a: &ArgsSat, h: Helper) -> bool {
        if !self.has(ArmFeature::V6) {
            return false;
        }
        if matches!(h, Helper::Ssat16 | Helper::Usat16)
            && self.tb.thumb
            && !self.has(ArmFeature::THUMB_DSP)
        {
            return false;
        }
        let tmp = self.load_reg(ir, a.rn);
        let shift = a.imm as u32;
        if a.sh != 0 {
            ir.gen_sari(Type::I32, tmp, tmp, if shift == 0 { 31 } else { shift } as u64);
        } else {
            ir.gen_shli(Type::I32, tmp, tmp, shift as u64);
        }
        let sat = self.const32(ir, a.satimm as u32);
        let r = self.call(ir, h, &[tmp, sat]);
        self.store_reg(ir, a.rd, r);
        true
    }

    // -- Parallel add/subtract and SEL --

    pub(super) fn op_par_addsub(
        &mut self,
        ir: &mut Context,
        a: &ArgsRrr,
        prefix: ParallelPrefix,
        kind: ParallelKind,
    ) -> bool {
        if !self.dsp_ok() {
            return false;
        }
        let t0 = self.load_reg(ir, a.rn);
        let t1 = self.load_reg(ir, a.rm);
        let op = self.const32(ir, parallel_op(prefix, kind));
        let r = self.call(ir, Helper::ParallelAddSub, &[t0, t1, op]);
        self.store_reg(ir, a.rd, r);
        true
    }

    pub(super) fn op_sel(&mut self, ir: &mut Context, a: &ArgsRrr) -> bool {
        if !self.dsp_ok() {
            return false;
        }
        let t1 = self.load_reg(ir, a.rn);
        let t2 = self.load_reg(ir, a.rm);
        let r = self.call(ir, Helper::Sel, &[t1, t2]);
        self.store_reg(ir, a.rd, r);
        true
    }

    // -- Packing, extension and reversal --

    pub(super) fn op_pkh(&mut self, ir: &mut Context, a: &ArgsPkh) -> bool {
        if !self.dsp_ok() {
            return false;
        }
        let tn = self.load_reg(ir, a.rn);
        let tm = self.load_reg(ir, a.rm);
        let shift = a.imm as u32;
        if a.tb != 0 {
            // PKHTB: a zero shift means ASR #32, which #31 matches in
            // the bottom halfword.
            let shift = if shift == 0 { 31 } else { shift };
            ir.gen_sari(Type::I32, tm, tm, shift as u64);
            ir.gen_deposit(Type::I32, tn, tn, tm, 0, 16);
        } else {
            ir.gen_shli(Type::I32, tm, tm, shift as u64);
            ir.gen_deposit(Type::I32, tn, tm, tn, 0, 16);
        }
        self.store_reg(ir, a.rd, tn);
        true
    }

    /// Two 16-bit lanes added without carry between them.
    fn gen_add16(&self, ir: &mut Context, dest: TempIdx, t0: TempIdx, t1: TempIdx) {
        let tmp = ir.new_temp(Type::I32);
        ir.gen_xor(Type::I32, tmp, t0, t1);
        ir.gen_andi(Type::I32, tmp, tmp, 0x8000);
        ir.gen_andi(Type::I32, t0, t0, !0x8000u32 as u64);
        ir.gen_andi(Type::I32, t1, t1, !0x8000u32 as u64);
        ir.gen_add(Type::I32, t0, t0, t1);
        ir.gen_xor(Type::I32, dest, t0, tmp);
    }

    /// Sign-extend bytes 0 and 2 into the two halfwords.
    fn gen_sxtb16(&self, ir: &mut Context, var: TempIdx) {
        let lo = ir.new_temp(Type::I32);
        let hi = ir.new_temp(Type::I32);
        ir.gen_sextract(Type::I32, lo, var, 0, 8);
        ir.gen_sextract(Type::I32, hi, var, 16, 8);
        ir.gen_shli(Type::I32, hi, hi, 16);
        ir.gen_deposit(Type::I32, var, hi, lo, 0, 16);
    }

    /// SXTA*/UXTA* and, with `rn == 15`, the plain extends.
    pub(super) fn op_xta(
        &mut self,
        ir: &mut Context,
        a: &ArgsRrrRot,
        signed: bool,
        kind: ExtendKind,
    ) -> bool {
        if !self.has(ArmFeature::V6) {
            return false;
        }
        // The dual-byte forms are DSP instructions in T32.
        if kind == ExtendKind::DualByte && self.tb.thumb && !self.has(ArmFeature::THUMB_DSP) {
            return false;
        }
        let tmp = self.load_reg(ir, a.rm);
        ir.gen_rotri(Type::I32, tmp, tmp, (a.rot * 8) as u64);
        match (kind, signed) {
            (ExtendKind::Byte, true) => {
                ir.gen_ext8s(Type::I32, tmp, tmp);
            }
            (ExtendKind::Byte, false) => {
                ir.gen_ext8u(Type::I32, tmp, tmp);
            }
            (ExtendKind::Half, true) => {
                ir.gen_ext16s(Type::I32, tmp, tmp);
            }
            (ExtendKind::Half, false) => {
                ir.gen_ext16u(Type::I32, tmp, tmp);
            }
            (ExtendKind::DualByte, true) => self.gen_sxtb16(ir, tmp),
            (ExtendKind::DualByte, false) => {
                ir.gen_andi(Type::I32, tmp, tmp, 0x00ff_00ff);
            }
        }
        if a.rn != 15 {
            let tmp2 = self.load_reg(ir, a.rn);
            if kind == ExtendKind::DualByte {
                self.gen_add16(ir, tmp, tmp, tmp2);
            } else {
                ir.gen_add(Type::I32, tmp, tmp, tmp2);
            }
        }
        self.store_reg(ir, a.rd, tmp);
        true
    }

    pub(super) fn op_rev(&mut self, ir: &mut Context, rd: i64, rm: i64) -> bool {
        if !self.has(ArmFeature::V6) {
            return false;
        }
        let t = self.load_reg(ir, rm);
        ir.gen_bswap32(Type::I32, t, t, 0);
        self.store_reg(ir, rd, t);
        true
    }

    /// Byte-swap each halfword.
    pub(super) fn op_rev16(&mut self, ir: &mut Context, rd: i64, rm: i64) -> bool {
        if !self.has(ArmFeature::V6) {
            return false;
        }
        let var = self.load_reg(ir, rm);
        let tmp = ir.new_temp(Type::I32);
        ir.gen_shri(Type::I32, tmp, var, 8);
        ir.gen_andi(Type::I32, tmp, tmp, 0x00ff_00ff);
        ir.gen_andi(Type::I32, var, var, 0x00ff_00ff);
        ir.gen_shli(Type::I32, var, var, 8);
        ir.gen_or(Type::I32, var, var, tmp);
        self.store_reg(ir, rd, var);
        true
    }

    /// Byte-swap the low halfword and sign-extend.
    pub(super) fn op_revsh(&mut self, ir: &mut Context, rd: i64, rm: i64) -> bool {
        if !self.has(ArmFeature::V6) {
            return false;
        }
        let t = self.load_reg(ir, rm);
        ir.gen_bswap16(Type::I32, t, t, BSWAP_OS);
        self.store_reg(ir, rd, t);
        true
    }

    pub(super) fn op_rbit(&mut self, ir: &mut Context, rd: i64, rm: i64) -> bool {
        if !self.has(ArmFeature::THUMB2) {
            return false;
        }
        let t = self.load_reg(ir, rm);
        let r = self.call(ir, Helper::Rbit, &[t]);
        self.store_reg(ir, rd, r);
        true
    }

    pub(super) fn op_clz(&mut self, ir: &mut Context, rd: i64, rm: i64) -> bool {
        if !self.has(ArmFeature::V5) {
            return false;
        }
        let t = self.load_reg(ir, rm);
        let w = self.const32(ir, 32);
        ir.gen_clz(Type::I32, t, t, w);
        self.store_reg(ir, rd, t);
        true
    }

    // -- Bit fields --

    pub(super) fn op_bfx(&mut self, ir: &mut Context, a: &ArgsBfx, signed: bool) -> bool {
        if !self.has(ArmFeature::THUMB2) {
            return false;
        }
        let width = a.widthm1 as u32 + 1;
        let shift = a.lsb as u32;
        if shift + width > 32 {
            // UNPREDICTABLE; we UNDEF.
            self.unallocated_encoding(ir);
            return true;
        }
        let t = self.load_reg(ir, a.rn);
        if signed {
            ir.gen_sextract(Type::I32, t, t, shift, width);
        } else {
            ir.gen_extract(Type::I32, t, t, shift, width);
        }
        self.store_reg(ir, a.rd, t);
        true
    }

    /// BFI, or BFC when `rn` is 15.
    pub(super) fn op_bfci(&mut self, ir: &mut Context, a: &ArgsBfi) -> bool {
        if !self.has(ArmFeature::THUMB2) {
            return false;
        }
        let (msb, lsb) = (a.msb as u32, a.lsb as u32);
        if msb < lsb {
            // UNPREDICTABLE; we UNDEF.
            self.unallocated_encoding(ir);
            return true;
        }
        let width = msb + 1 - lsb;
        let t_in = if a.rn == 15 {
            self.const32(ir, 0)
        } else {
            self.load_reg(ir, a.rn)
        };
        let t_rd = self.load_reg(ir, a.rd);
        ir.gen_deposit(Type::I32, t_rd, t_rd, t_in, lsb, width);
        self.store_reg(ir, a.rd, t_rd);
        true
    }

    // -- CRC --

    /// CRC32{B,H,W} and CRC32C{B,H,W} over `bytes` bytes of Rm.
    pub(super) fn op_crc32(&mut self, ir: &mut Context, a: &ArgsRrr, castagnoli: bool, bytes: u32) -> bool {
        if !self.has(ArmFeature::CRC) {
            return false;
        }
        let t1 = self.load_reg(ir, a.rn);
        let t2 = self.load_reg(ir, a.rm);
        match bytes {
            1 => {
                ir.gen_ext8u(Type::I32, t2, t2);
            }
            2 => {
                ir.gen_ext16u(Type::I32, t2, t2);
            }
            _ => {}
        }
        let n = self.const32(ir, bytes);
        let h = if castagnoli { Helper::Crc32c } else { Helper::Crc32 };
        let r = self.call(ir, h, &[t1, t2, n]);
        self.store_reg(ir, a.rd, r);
        true
    }
}
