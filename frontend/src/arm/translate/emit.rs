//! Shared code generation: registers, flags, conditions, shifts,
//! guest memory, exceptions and block exits.

use tcg_core::tb::cflags::{CF_NO_GOTO_PTR, CF_NO_GOTO_TB, CF_USE_ICOUNT};
use tcg_core::{Cond, Context, MemOp, TempIdx, Type};

use super::{ArmDisasContext, TARGET_PAGE_MASK};
use crate::arm::config::ArmFeature;
use crate::arm::cpu::{
    CAN_DO_IO_OFFSET, CONDEXEC_OFFSET, MMU_PL1_S, MMU_USER_NS, MMU_USER_S, PSTATE_SS_OFFSET, THUMB_OFFSET,
};
use crate::arm::helper::Helper;
use crate::arm::syndrome::{
    syn_aa32_hvc, syn_aa32_smc, syn_aa32_svc, syn_data_abort_with_iss, syn_swstep,
    syn_uncategorized, EXCP_DEBUG, EXCP_EXCEPTION_EXIT, EXCP_HVC, EXCP_SMC, EXCP_SWI, EXCP_UDEF,
};
use crate::DisasJumpType;

/// Lowest PC value that an M-profile branch treats as an exception
/// return.
const EXC_RETURN_MIN_MAGIC: u32 = 0xff00_0000;

// Instruction-syndrome info passed with loads and stores.
pub(super) const ISS_REG_MASK: u32 = 0x1f;
pub(super) const ISS_INVALID: u32 = 1 << 5;
pub(super) const ISS_IS_ACQ_REL: u32 = 1 << 6;
pub(super) const ISS_IS_WRITE: u32 = 1 << 7;
pub(super) const ISS_IS_16BIT: u32 = 1 << 8;

pub(super) const SHIFT_LSL: u32 = 0;
pub(super) const SHIFT_LSR: u32 = 1;
pub(super) const SHIFT_ASR: u32 = 2;
pub(super) const SHIFT_ROR: u32 = 3;

/// A condition code lowered to `value <cond> 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisasCompare {
    pub cond: Cond,
    pub value: TempIdx,
}

impl ArmDisasContext<'_> {
    // -- Core registers --

    /// Architectural PC value: the current instruction plus 8 (A32)
    /// or 4 (T32).
    pub(super) fn read_pc(&self) -> u32 {
        self.pc_curr
            .wrapping_add(if self.tb.thumb { 4 } else { 8 })
    }

    /// Branch target for a PC-relative offset.
    pub(super) fn jmp_target(&self, diff: i64) -> u32 {
        self.read_pc().wrapping_add(diff as u32)
    }

    pub(super) fn load_reg_var(&self, ir: &mut Context, var: TempIdx, reg: i64) {
        if reg == 15 {
            ir.gen_movi(Type::I32, var, self.read_pc() as u64);
        } else {
            ir.gen_mov(Type::I32, var, self.regs[reg as usize]);
        }
    }

    /// Copy of register `reg` in a fresh temp.
    pub(super) fn load_reg(&self, ir: &mut Context, reg: i64) -> TempIdx {
        let t = ir.new_temp(Type::I32);
        self.load_reg_var(ir, t, reg);
        t
    }

    /// `reg + ofs`, where a PC base is the word-aligned literal base.
    pub(super) fn add_reg_for_lit(&self, ir: &mut Context, reg: i64, ofs: i32) -> TempIdx {
        let t = ir.new_temp(Type::I32);
        if reg == 15 {
            let v = (self.read_pc() & !3).wrapping_add(ofs as u32);
            ir.gen_movi(Type::I32, t, v as u64);
        } else {
            ir.gen_addi(Type::I32, t, self.regs[reg as usize], ofs as i64 as u64);
        }
        t
    }

    /// Write `var` to `reg`. A PC write drops the low bits and ends
    /// the block.
    pub(super) fn store_reg(&mut self, ir: &mut Context, reg: i64, var: TempIdx) {
        let r = self.regs[reg as usize];
        if reg == 15 {
            let mask = if self.tb.thumb { !1u32 } else { !3u32 };
            ir.gen_andi(Type::I32, r, var, mask as u64);
            self.base.is_jmp = DisasJumpType::Jump;
        } else if reg == 13 && self.is_m() {
            ir.gen_andi(Type::I32, r, var, !3u32 as u64);
        } else {
            ir.gen_mov(Type::I32, r, var);
        }
    }

    pub(super) fn store_sp_checked(&mut self, ir: &mut Context, var: TempIdx) {
        self.store_reg(ir, 13, var);
    }

    /// Data-processing write: from v7 a PC destination interworks.
    pub(super) fn store_reg_bx(&mut self, ir: &mut Context, reg: i64, var: TempIdx) {
        if reg == 15 && self.has(ArmFeature::V7) {
            self.gen_bx(ir, var);
        } else {
            self.store_reg(ir, reg, var);
        }
    }

    /// Load write: from v5 a PC destination interworks.
    pub(super) fn store_reg_from_load(&mut self, ir: &mut Context, reg: i64, var: TempIdx) {
        if reg == 15 && self.has(ArmFeature::V5) {
            self.gen_bx_excret(ir, var);
        } else {
            self.store_reg(ir, reg, var);
        }
    }

    /// Branch and exchange: bit 0 of `var` selects Thumb.
    pub(super) fn gen_bx(&mut self, ir: &mut Context, var: TempIdx) {
        self.base.is_jmp = DisasJumpType::Jump;
        ir.gen_andi(Type::I32, self.regs[15], var, !1u32 as u64);
        let t = ir.new_temp(Type::I32);
        ir.gen_andi(Type::I32, t, var, 1);
        ir.gen_st(Type::I32, t, self.env, THUMB_OFFSET);
    }

    /// BX that may be an M-profile exception return.
    pub(super) fn gen_bx_excret(&mut self, ir: &mut Context, var: TempIdx) {
        self.gen_bx(ir, var);
        if self.is_m() && self.tb.handler {
            self.base.is_jmp = DisasJumpType::BxExcret;
        }
    }

    fn gen_bx_excret_final_code(&mut self, ir: &mut Context) {
        let excret = ir.new_label();
        ir.gen_brcondi(
            Type::I32,
            self.regs[15],
            EXC_RETURN_MIN_MAGIC as u64,
            Cond::Geu,
            excret,
        );
        if self.tb.ss_active {
            self.gen_singlestep_exception(ir);
        } else {
            ir.gen_exit_tb(0);
        }
        ir.gen_set_label(excret);
        self.gen_ss_advance(ir);
        self.gen_exception_internal(ir, EXCP_EXCEPTION_EXIT);
    }

    // -- Env fields --

    pub(super) fn load_cpu_offset(&self, ir: &mut Context, offset: i64) -> TempIdx {
        let t = ir.new_temp(Type::I32);
        ir.gen_ld(Type::I32, t, self.env, offset);
        t
    }

    pub(super) fn store_cpu_offset(&self, ir: &mut Context, var: TempIdx, offset: i64) {
        ir.gen_st(Type::I32, var, self.env, offset);
    }

    pub(super) fn store_cpu_field_constant(&self, ir: &mut Context, val: u32, offset: i64) {
        let c = ir.new_const(Type::I32, val as u64);
        ir.gen_st(Type::I32, c, self.env, offset);
    }

    // -- Helper calls --

    pub(super) fn call(&self, ir: &mut Context, h: Helper, args: &[TempIdx]) -> TempIdx {
        let d = ir.new_temp(Type::I32);
        ir.gen_call(d, h.into(), args)
    }

    pub(super) fn call64(&self, ir: &mut Context, h: Helper, args: &[TempIdx]) -> TempIdx {
        let d = ir.new_temp(Type::I64);
        ir.gen_call(d, h.into(), args)
    }

    pub(super) fn call_void(&self, ir: &mut Context, h: Helper, args: &[TempIdx]) {
        ir.gen_call_void(h.into(), args);
    }

    pub(super) fn const32(&self, ir: &mut Context, v: u32) -> TempIdx {
        ir.new_const(Type::I32, v as u64)
    }

    // -- Flags --

    pub(super) fn gen_logic_cc(&self, ir: &mut Context, var: TempIdx) {
        ir.gen_mov(Type::I32, self.nf, var);
        ir.gen_mov(Type::I32, self.zf, var);
    }

    /// `dest = t0 + t1`, setting NZCV.
    pub(super) fn gen_add_cc(&self, ir: &mut Context, dest: TempIdx, t0: TempIdx, t1: TempIdx) {
        let zero = self.const32(ir, 0);
        ir.gen_add2(Type::I32, self.nf, self.cf, t0, zero, t1, zero);
        ir.gen_mov(Type::I32, self.zf, self.nf);
        ir.gen_xor(Type::I32, self.vf, self.nf, t0);
        let tmp = ir.new_temp(Type::I32);
        ir.gen_xor(Type::I32, tmp, t0, t1);
        ir.gen_andc(Type::I32, self.vf, self.vf, tmp);
        ir.gen_mov(Type::I32, dest, self.nf);
    }

    /// `dest = t0 + t1 + CF`, setting NZCV.
    pub(super) fn gen_adc_cc(&self, ir: &mut Context, dest: TempIdx, t0: TempIdx, t1: TempIdx) {
        let zero = self.const32(ir, 0);
        ir.gen_add2(Type::I32, self.nf, self.cf, t0, zero, self.cf, zero);
        ir.gen_add2(Type::I32, self.nf, self.cf, self.nf, self.cf, t1, zero);
        ir.gen_mov(Type::I32, self.zf, self.nf);
        ir.gen_xor(Type::I32, self.vf, self.nf, t0);
        let tmp = ir.new_temp(Type::I32);
        ir.gen_xor(Type::I32, tmp, t0, t1);
        ir.gen_andc(Type::I32, self.vf, self.vf, tmp);
        ir.gen_mov(Type::I32, dest, self.nf);
    }

    /// `dest = t0 - t1`, setting NZCV; C is "no borrow".
    pub(super) fn gen_sub_cc(&self, ir: &mut Context, dest: TempIdx, t0: TempIdx, t1: TempIdx) {
        ir.gen_sub(Type::I32, self.nf, t0, t1);
        ir.gen_mov(Type::I32, self.zf, self.nf);
        ir.gen_setcond(Type::I32, self.cf, t0, t1, Cond::Geu);
        ir.gen_xor(Type::I32, self.vf, self.nf, t0);
        let tmp = ir.new_temp(Type::I32);
        ir.gen_xor(Type::I32, tmp, t0, t1);
        ir.gen_and(Type::I32, self.vf, self.vf, tmp);
        ir.gen_mov(Type::I32, dest, self.nf);
    }

    /// `dest = t0 - t1 - !CF`, setting NZCV.
    pub(super) fn gen_sbc_cc(&self, ir: &mut Context, dest: TempIdx, t0: TempIdx, t1: TempIdx) {
        let tmp = ir.new_temp(Type::I32);
        ir.gen_not(Type::I32, tmp, t1);
        self.gen_adc_cc(ir, dest, t0, tmp);
    }

    /// `dest = t0 + t1 + CF`.
    pub(super) fn gen_add_carry(&self, ir: &mut Context, dest: TempIdx, t0: TempIdx, t1: TempIdx) {
        let tmp = ir.new_temp(Type::I32);
        ir.gen_add(Type::I32, tmp, t0, t1);
        ir.gen_add(Type::I32, dest, tmp, self.cf);
    }

    /// `dest = t0 - t1 + CF - 1`.
    pub(super) fn gen_sub_carry(&self, ir: &mut Context, dest: TempIdx, t0: TempIdx, t1: TempIdx) {
        let tmp = ir.new_temp(Type::I32);
        ir.gen_sub(Type::I32, tmp, t0, t1);
        ir.gen_add(Type::I32, tmp, tmp, self.cf);
        ir.gen_subi(Type::I32, dest, tmp, 1);
    }

    /// Set NZCV from the top four bits of `var`.
    pub(super) fn gen_set_nzcv(&self, ir: &mut Context, var: TempIdx) {
        ir.gen_andi(Type::I32, self.nf, var, 0x8000_0000);
        ir.gen_shli(Type::I32, self.vf, var, 3);
        ir.gen_extract(Type::I32, self.cf, var, 29, 1);
        // Z set means ZF == 0.
        let z = ir.new_temp(Type::I32);
        ir.gen_extract(Type::I32, z, var, 30, 1);
        ir.gen_xori(Type::I32, self.zf, z, 1);
    }

    // -- Conditions --

    /// Lower condition code `cc` to a comparison against zero.
    pub(super) fn test_cc(&self, ir: &mut Context, cc: u32) -> DisasCompare {
        let (cond, value) = match cc >> 1 {
            // EQ / NE
            0 => (Cond::Eq, self.zf),
            // CS / CC
            1 => (Cond::Ne, self.cf),
            // MI / PL
            2 => (Cond::Lt, self.nf),
            // VS / VC
            3 => (Cond::Lt, self.vf),
            // HI / LS: C && !Z. -CF is all ones for C; AND with ZF.
            4 => {
                let t = ir.new_temp(Type::I32);
                ir.gen_neg(Type::I32, t, self.cf);
                ir.gen_and(Type::I32, t, t, self.zf);
                (Cond::Ne, t)
            }
            // GE / LT: only the sign of N ^ V matters.
            5 => {
                let t = ir.new_temp(Type::I32);
                ir.gen_xor(Type::I32, t, self.vf, self.nf);
                (Cond::Ge, t)
            }
            // GT / LE: !Z && N == V. Spread ~(N ^ V) into a mask.
            6 => {
                let t = ir.new_temp(Type::I32);
                ir.gen_xor(Type::I32, t, self.vf, self.nf);
                ir.gen_sari(Type::I32, t, t, 31);
                ir.gen_andc(Type::I32, t, self.zf, t);
                (Cond::Ne, t)
            }
            // AL / NV
            _ => {
                return DisasCompare {
                    cond: Cond::Always,
                    value: self.zf,
                }
            }
        };
        let cond = if cc & 1 != 0 { cond.invert() } else { cond };
        DisasCompare { cond, value }
    }

    pub(super) fn jump_cc(&self, ir: &mut Context, cmp: DisasCompare, label: u32) {
        match cmp.cond {
            Cond::Always => ir.gen_br(label),
            Cond::Never => {}
            c => ir.gen_brcondi(Type::I32, cmp.value, 0, c, label),
        }
    }

    /// Branch to `label` if `cc` holds.
    pub(super) fn gen_test_cc(&self, ir: &mut Context, cc: u32, label: u32) {
        let cmp = self.test_cc(ir, cc);
        self.jump_cc(ir, cmp, label);
    }

    pub(super) fn gen_condlabel(&mut self, ir: &mut Context) {
        if !self.condjmp {
            self.condlabel = ir.new_label();
            self.condjmp = true;
        }
    }

    /// Skip the rest of the instruction unless `cond` holds.
    pub(super) fn skip_unless(&mut self, ir: &mut Context, cond: u32) {
        self.gen_condlabel(ir);
        let label = self.condlabel;
        self.gen_test_cc(ir, cond ^ 1, label);
    }

    // -- Shifts --

    /// CF = bit `shift` of `var`.
    fn shifter_out_im(&self, ir: &mut Context, var: TempIdx, shift: u32) {
        ir.gen_extract(Type::I32, self.cf, var, shift, 1);
    }

    /// Immediate shift of `var` in place; `flags` also sets the
    /// shifter carry-out.
    pub(super) fn gen_arm_shift_im(
        &self,
        ir: &mut Context,
        var: TempIdx,
        shiftop: u32,
        shift: u32,
        flags: bool,
    ) {
        match shiftop {
            SHIFT_LSL => {
                if shift != 0 {
                    if flags {
                        self.shifter_out_im(ir, var, 32 - shift);
                    }
                    ir.gen_shli(Type::I32, var, var, shift as u64);
                }
            }
            SHIFT_LSR => {
                // LSR #0 encodes LSR #32.
                if shift == 0 {
                    if flags {
                        ir.gen_shri(Type::I32, self.cf, var, 31);
                    }
                    ir.gen_movi(Type::I32, var, 0);
                } else {
                    if flags {
                        self.shifter_out_im(ir, var, shift - 1);
                    }
                    ir.gen_shri(Type::I32, var, var, shift as u64);
                }
            }
            SHIFT_ASR => {
                let shift = if shift == 0 { 32 } else { shift };
                if flags {
                    self.shifter_out_im(ir, var, shift - 1);
                }
                ir.gen_sari(Type::I32, var, var, shift.min(31) as u64);
            }
            _ => {
                if shift != 0 {
                    if flags {
                        self.shifter_out_im(ir, var, shift - 1);
                    }
                    ir.gen_rotri(Type::I32, var, var, shift as u64);
                } else {
                    // RRX
                    let tmp = ir.new_temp(Type::I32);
                    ir.gen_shli(Type::I32, tmp, self.cf, 31);
                    if flags {
                        self.shifter_out_im(ir, var, 0);
                    }
                    ir.gen_shri(Type::I32, var, var, 1);
                    ir.gen_or(Type::I32, var, var, tmp);
                }
            }
        }
    }

    /// Register-specified shift of `var` in place by the low byte of
    /// `shift`.
    pub(super) fn gen_arm_shift_reg(
        &self,
        ir: &mut Context,
        var: TempIdx,
        shiftop: u32,
        shift: TempIdx,
        flags: bool,
    ) {
        if flags {
            let h = match shiftop {
                SHIFT_LSL => Helper::ShlCc,
                SHIFT_LSR => Helper::ShrCc,
                SHIFT_ASR => Helper::SarCc,
                _ => Helper::RorCc,
            };
            ir.gen_call(var, h.into(), &[var, shift]);
            return;
        }
        match shiftop {
            SHIFT_LSL | SHIFT_LSR => {
                // Amounts of 32 and more give zero.
                let tmpd = ir.new_temp(Type::I32);
                let tmp1 = ir.new_temp(Type::I32);
                let zero = self.const32(ir, 0);
                ir.gen_andi(Type::I32, tmp1, shift, 0x1f);
                if shiftop == SHIFT_LSL {
                    ir.gen_shl(Type::I32, tmpd, var, tmp1);
                } else {
                    ir.gen_shr(Type::I32, tmpd, var, tmp1);
                }
                ir.gen_andi(Type::I32, tmp1, shift, 0xe0);
                ir.gen_movcond(Type::I32, var, tmp1, zero, zero, tmpd, Cond::Ne);
            }
            SHIFT_ASR => {
                let tmp1 = ir.new_temp(Type::I32);
                let max = self.const32(ir, 31);
                ir.gen_andi(Type::I32, tmp1, shift, 0xff);
                ir.gen_umin(Type::I32, tmp1, tmp1, max);
                ir.gen_sar(Type::I32, var, var, tmp1);
            }
            _ => {
                let tmp1 = ir.new_temp(Type::I32);
                ir.gen_andi(Type::I32, tmp1, shift, 0x1f);
                ir.gen_rotr(Type::I32, var, var, tmp1);
            }
        }
    }

    // -- PC and IT state --

    pub(super) fn gen_update_pc(&self, ir: &mut Context, pc: u32) {
        ir.gen_movi(Type::I32, self.regs[15], pc as u64);
    }

    /// Write the IT state back to the env before anything that can
    /// leave the block.
    pub(super) fn gen_set_condexec(&self, ir: &mut Context) {
        if self.condexec_mask != 0 {
            let val = (self.condexec_cond << 4) | (self.condexec_mask >> 1);
            self.store_cpu_field_constant(ir, val, CONDEXEC_OFFSET);
        }
    }

    /// Open an I/O window for the current instruction when counting
    /// instructions. The block then ends after it, so the count is
    /// exact at the access. Returns whether the window was opened.
    pub(super) fn translator_io_start(&mut self, ir: &mut Context) -> bool {
        if self.cflags & CF_USE_ICOUNT == 0 {
            return false;
        }
        self.store_cpu_field_constant(ir, 1, CAN_DO_IO_OFFSET);
        if self.base.is_jmp == DisasJumpType::Next {
            self.base.is_jmp = DisasJumpType::TooMany;
        }
        true
    }

    // -- Exceptions --

    pub(super) fn default_exception_el(&self) -> u32 {
        if self.tb.secure_routed_to_el3 {
            3
        } else {
            (self.tb.current_el as u32).max(1)
        }
    }

    pub(super) fn gen_exception(&self, ir: &mut Context, excp: u32, syn: u32, el: u32) {
        let args = [
            self.const32(ir, excp),
            self.const32(ir, syn),
            self.const32(ir, el),
        ];
        self.call_void(ir, Helper::Exception, &args);
    }

    fn gen_exception_internal(&self, ir: &mut Context, excp: u32) {
        self.gen_exception(ir, excp, 0, 0);
    }

    /// Raise an exception for the instruction at `pc`.
    pub(super) fn gen_exception_insn_el(
        &mut self,
        ir: &mut Context,
        pc: u32,
        excp: u32,
        syn: u32,
        el: u32,
    ) {
        self.gen_set_condexec(ir);
        self.gen_update_pc(ir, pc);
        self.gen_exception(ir, excp, syn, el);
        self.base.is_jmp = DisasJumpType::NoReturn;
    }

    pub(super) fn gen_exception_insn(&mut self, ir: &mut Context, pc: u32, excp: u32, syn: u32) {
        let el = self.default_exception_el();
        self.gen_exception_insn_el(ir, pc, excp, syn, el);
    }

    pub(super) fn gen_exception_internal_insn(&mut self, ir: &mut Context, pc: u32, excp: u32) {
        self.gen_set_condexec(ir);
        self.gen_update_pc(ir, pc);
        self.gen_exception_internal(ir, excp);
        self.base.is_jmp = DisasJumpType::NoReturn;
    }

    pub(super) fn gen_exception_bkpt_insn(&mut self, ir: &mut Context, syn: u32) {
        self.gen_set_condexec(ir);
        let pc = self.pc_curr;
        self.gen_update_pc(ir, pc);
        let s = self.const32(ir, syn);
        self.call_void(ir, Helper::ExceptionBkptInsn, &[s]);
        self.base.is_jmp = DisasJumpType::NoReturn;
    }

    /// UNDEF the current instruction.
    pub(super) fn unallocated_encoding(&mut self, ir: &mut Context) {
        log::trace!("undefined instruction {:#010x} at {:#x}", self.insn, self.pc_curr);
        let pc = self.pc_curr;
        self.gen_exception_insn(ir, pc, EXCP_UDEF, syn_uncategorized());
    }

    /// Leave the active-not-pending step state.
    pub(super) fn gen_ss_advance(&mut self, ir: &mut Context) {
        if self.tb.ss_active {
            self.pstate_ss = false;
            self.store_cpu_field_constant(ir, 0, PSTATE_SS_OFFSET);
        }
    }

    pub(super) fn gen_swstep_exception(&self, ir: &mut Context, isv: bool, ex: bool) {
        let el = self.default_exception_el();
        self.gen_exception(ir, EXCP_DEBUG, syn_swstep(false, isv, ex), el);
    }

    fn gen_step_complete_exception(&mut self, ir: &mut Context) {
        self.gen_ss_advance(ir);
        let ex = self.is_ldex;
        self.gen_swstep_exception(ir, true, ex);
        self.base.is_jmp = DisasJumpType::NoReturn;
    }

    pub(super) fn gen_singlestep_exception(&mut self, ir: &mut Context) {
        if self.tb.ss_active {
            self.gen_step_complete_exception(ir);
        } else {
            self.gen_exception_internal(ir, EXCP_DEBUG);
        }
    }

    // -- Block exits --

    fn use_goto_tb(&self, dest: u32) -> bool {
        self.cflags & CF_NO_GOTO_TB == 0
            && (self.base.pc_first as u32 ^ dest) & TARGET_PAGE_MASK == 0
    }

    /// Look the next block up by the PC in the env.
    pub(super) fn gen_goto_ptr(&self, ir: &mut Context) {
        if self.cflags & CF_NO_GOTO_PTR != 0 {
            ir.gen_exit_tb(0);
        } else {
            ir.gen_lookup_and_goto_ptr();
        }
    }

    /// Go to `dest` through chain slot `n` when the target is on this
    /// page.
    pub(super) fn gen_goto_tb(&mut self, ir: &mut Context, n: u32, dest: u32) {
        if self.use_goto_tb(dest) {
            ir.gen_goto_tb(n);
            self.gen_update_pc(ir, dest);
            ir.gen_exit_tb(n as u64);
        } else {
            self.gen_update_pc(ir, dest);
            self.gen_goto_ptr(ir);
        }
        self.base.is_jmp = DisasJumpType::NoReturn;
    }

    pub(super) fn gen_jmp_tb(&mut self, ir: &mut Context, dest: u32, tbno: u32) {
        if self.tb.ss_active {
            // Indirect, so the step exception still fires.
            self.gen_update_pc(ir, dest);
            self.base.is_jmp = DisasJumpType::Jump;
            return;
        }
        match self.base.is_jmp {
            DisasJumpType::Next | DisasJumpType::TooMany | DisasJumpType::NoReturn => {
                self.gen_goto_tb(ir, tbno, dest);
            }
            DisasJumpType::UpdateNoChain | DisasJumpType::UpdateExit => {
                // Already leaving for another reason: no chaining.
                self.gen_update_pc(ir, dest);
                self.gen_goto_ptr(ir);
                self.base.is_jmp = DisasJumpType::NoReturn;
            }
            other => {
                log::error!("jump to {dest:#x} after {other:?} at {:#x}", self.pc_curr);
                self.gen_update_pc(ir, dest);
                ir.gen_exit_tb(0);
                self.base.is_jmp = DisasJumpType::NoReturn;
            }
        }
    }

    pub(super) fn gen_jmp(&mut self, ir: &mut Context, dest: u32) {
        self.gen_jmp_tb(ir, dest, 0);
    }

    pub(super) fn tb_stop(&mut self, ir: &mut Context) {
        // condjmp is only still set here for a conditional branch or
        // trap, which has already written the PC.
        self.gen_set_condexec(ir);
        let next = self.pc_next();
        let len = self.curr_insn_len();

        if self.base.is_jmp == DisasJumpType::BxExcret {
            self.gen_bx_excret_final_code(ir);
        } else if self.tb.ss_active {
            match self.base.is_jmp {
                DisasJumpType::Swi => {
                    self.gen_ss_advance(ir);
                    let el = self.default_exception_el();
                    let syn = syn_aa32_svc(self.svc_imm, self.tb.thumb);
                    self.gen_exception(ir, EXCP_SWI, syn, el);
                }
                DisasJumpType::Hvc => {
                    self.gen_ss_advance(ir);
                    self.gen_exception(ir, EXCP_HVC, syn_aa32_hvc(self.svc_imm), 2);
                }
                DisasJumpType::Smc => {
                    self.gen_ss_advance(ir);
                    self.gen_exception(ir, EXCP_SMC, syn_aa32_smc(), 3);
                }
                DisasJumpType::NoReturn => {}
                j => {
                    if matches!(
                        j,
                        DisasJumpType::Next
                            | DisasJumpType::TooMany
                            | DisasJumpType::UpdateExit
                            | DisasJumpType::UpdateNoChain
                    ) {
                        self.gen_update_pc(ir, next);
                    }
                    // Single-stepping WFI does not halt.
                    self.gen_singlestep_exception(ir);
                }
            }
        } else {
            match self.base.is_jmp {
                DisasJumpType::Next | DisasJumpType::TooMany => {
                    self.gen_goto_tb(ir, 1, next);
                }
                DisasJumpType::UpdateNoChain => {
                    self.gen_update_pc(ir, next);
                    self.gen_goto_ptr(ir);
                }
                DisasJumpType::Jump => self.gen_goto_ptr(ir),
                DisasJumpType::UpdateExit => {
                    self.gen_update_pc(ir, next);
                    ir.gen_exit_tb(0);
                }
                DisasJumpType::Exit | DisasJumpType::BxExcret => ir.gen_exit_tb(0),
                DisasJumpType::NoReturn => {}
                DisasJumpType::Wfi => {
                    let l = self.const32(ir, len);
                    self.call_void(ir, Helper::Wfi, &[l]);
                    // Back to the main loop to check for interrupts.
                    ir.gen_exit_tb(0);
                }
                DisasJumpType::Wfe => {
                    let l = self.const32(ir, len);
                    self.call_void(ir, Helper::Wfe, &[l]);
                    ir.gen_exit_tb(0);
                }
                DisasJumpType::Yield => {
                    self.call_void(ir, Helper::Yield, &[]);
                    ir.gen_exit_tb(0);
                }
                DisasJumpType::Swi => {
                    let el = self.default_exception_el();
                    let syn = syn_aa32_svc(self.svc_imm, self.tb.thumb);
                    self.gen_exception(ir, EXCP_SWI, syn, el);
                }
                DisasJumpType::Hvc => {
                    self.gen_exception(ir, EXCP_HVC, syn_aa32_hvc(self.svc_imm), 2);
                }
                DisasJumpType::Smc => {
                    self.gen_exception(ir, EXCP_SMC, syn_aa32_smc(), 3);
                }
            }
        }

        if self.condjmp {
            // Condition-failed path of the final branch or trap.
            ir.gen_set_label(self.condlabel);
            self.condjmp = false;
            self.gen_set_condexec(ir);
            if self.tb.ss_active {
                self.gen_update_pc(ir, next);
                self.gen_singlestep_exception(ir);
            } else {
                self.gen_goto_tb(ir, 1, next);
            }
        }
    }

    // -- Guest memory --

    pub(super) fn get_mem_index(&self) -> u32 {
        self.tb.mmu_idx as u32
    }

    /// Memory index of an unprivileged (LDRT/STRT) access.
    pub(super) fn get_a32_user_mem_index(&self) -> u32 {
        if self.is_m() {
            return 0;
        }
        match self.tb.mmu_idx as u32 {
            MMU_USER_S | MMU_PL1_S => MMU_USER_S,
            _ => MMU_USER_NS,
        }
    }

    /// Add the block's alignment and endianness to `op`.
    pub(super) fn finalize_memop(&self, op: MemOp) -> MemOp {
        let mut op = op;
        if self.tb.align_mem && op.bits() & MemOp::ALIGN_MASK == 0 {
            op = op.with(MemOp::ALIGN);
        }
        if self.tb.be_data {
            op = op.with(MemOp::BSWAP);
        }
        op
    }

    /// Guest address for a 32-bit address value. BE32 swizzles
    /// sub-word addresses.
    pub(super) fn gen_aa32_addr(&self, ir: &mut Context, a32: TempIdx, op: MemOp) -> TempIdx {
        let size = op.size() as u32;
        if !self.cfg.user_only && self.tb.sctlr_b && size < 2 {
            let t = ir.new_temp(Type::I32);
            ir.gen_xori(Type::I32, t, a32, (4 - (1u64 << size)) as u64);
            t
        } else {
            a32
        }
    }

    pub(super) fn gen_aa32_ld_i32(
        &self,
        ir: &mut Context,
        val: TempIdx,
        a32: TempIdx,
        index: u32,
        op: MemOp,
    ) {
        let op = self.finalize_memop(op);
        let addr = self.gen_aa32_addr(ir, a32, op);
        ir.gen_qemu_ld(Type::I32, val, addr, op, index);
    }

    pub(super) fn gen_aa32_st_i32(
        &self,
        ir: &mut Context,
        val: TempIdx,
        a32: TempIdx,
        index: u32,
        op: MemOp,
    ) {
        let op = self.finalize_memop(op);
        let addr = self.gen_aa32_addr(ir, a32, op);
        ir.gen_qemu_st(Type::I32, val, addr, op, index);
    }

    pub(super) fn gen_aa32_ld_i64(
        &self,
        ir: &mut Context,
        val: TempIdx,
        a32: TempIdx,
        index: u32,
        op: MemOp,
    ) {
        let op = self.finalize_memop(op);
        let addr = self.gen_aa32_addr(ir, a32, op);
        ir.gen_qemu_ld(Type::I64, val, addr, op, index);
        // BE32 doubleword accesses swap the words.
        if !self.cfg.user_only && self.tb.sctlr_b && op.size() == MemOp::SIZE_64 {
            ir.gen_rotri(Type::I64, val, val, 32);
        }
    }

    pub(super) fn gen_aa32_st_i64(
        &self,
        ir: &mut Context,
        val: TempIdx,
        a32: TempIdx,
        index: u32,
        op: MemOp,
    ) {
        let op = self.finalize_memop(op);
        let addr = self.gen_aa32_addr(ir, a32, op);
        if !self.cfg.user_only && self.tb.sctlr_b && op.size() == MemOp::SIZE_64 {
            let t = ir.new_temp(Type::I64);
            ir.gen_rotri(Type::I64, t, val, 32);
            ir.gen_qemu_st(Type::I64, t, addr, op, index);
        } else {
            ir.gen_qemu_st(Type::I64, val, addr, op, index);
        }
    }

    /// Record the data-abort instruction syndrome of the current
    /// load or store.
    pub(super) fn disas_set_da_iss(&self, ir: &mut Context, op: MemOp, issinfo: u32) {
        if issinfo & ISS_INVALID != 0 {
            return;
        }
        let srt = issinfo & ISS_REG_MASK;
        // R15 transfers never report ISS.
        if srt == 15 {
            return;
        }
        let syn = syn_data_abort_with_iss(
            false,
            op.size() as u32,
            op.is_signed(),
            srt,
            issinfo & ISS_IS_ACQ_REL != 0,
            issinfo & ISS_IS_WRITE != 0,
            0,
            issinfo & ISS_IS_16BIT != 0,
        );
        ir.set_insn_start_param(2, syn);
    }

    pub(super) fn gen_aa32_ld_iss(
        &self,
        ir: &mut Context,
        val: TempIdx,
        a32: TempIdx,
        index: u32,
        op: MemOp,
        issinfo: u32,
    ) {
        self.gen_aa32_ld_i32(ir, val, a32, index, op);
        self.disas_set_da_iss(ir, op, issinfo);
    }

    pub(super) fn gen_aa32_st_iss(
        &self,
        ir: &mut Context,
        val: TempIdx,
        a32: TempIdx,
        index: u32,
        op: MemOp,
        issinfo: u32,
    ) {
        self.gen_aa32_st_i32(ir, val, a32, index, op);
        self.disas_set_da_iss(ir, op, issinfo | ISS_IS_WRITE);
    }
}
