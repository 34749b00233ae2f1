//! VFP: scalar and short-vector floating point, moves between the
//! core and FP register files, VLDR/VSTR/VLDM/VSTM and the FP system
//! registers.
//!
//! Single-precision registers are the 32-bit halves of D0-D15 and are
//! addressed with [`vfp_reg_offset`]. All arithmetic goes through the
//! `Vfp*` helpers, which implement the FPSCR semantics; the translator
//! only does the register plumbing, the FPSCR.LEN/STRIDE iteration and
//! the sign-bit tricks (VNEG, VABS).

use tcg_core::{Cond, Context, MemOp, TempIdx, Type};

use super::ArmDisasContext;
use crate::arm::cpu::{
    neon_element_offset, vfp_reg_offset, vfp_xreg_offset, FPEXC_EN, VFP_FPEXC, VFP_FPINST,
    VFP_FPINST2, VFP_FPSCR, VFP_FPSID, VFP_MVFR0, VFP_MVFR1, VFP_MVFR2,
};
use crate::arm::config::ArmFeature;
use crate::arm::helper::vfp::{
    FpOp, FpRounding, CVT_HALF, CVT_RMODE, CVT_RMODE_SHIFT, CVT_ROUND_ZERO, CVT_SIGNED,
    RINT_EXACT, RINT_FPSCR,
};
use crate::arm::helper::Helper;
use crate::arm::syndrome::{syn_fp_access_trap, syn_uncategorized, EXCP_NOCP, EXCP_UDEF};
use crate::arm::vfp_decode::*;

/// FPSCR.NZCV.
const FPSCR_NZCV_MASK: u32 = 0xf000_0000;

/// Rounding mode of the v8 VRINT{A,N,P,M} and VCVT{A,N,P,M} `rm`
/// field.
pub(super) const FP_DECODE_RM: [FpRounding; 4] = [
    FpRounding::TiesAway,
    FpRounding::TiesEven,
    FpRounding::PosInf,
    FpRounding::NegInf,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Prec {
    Single,
    Double,
}

impl Prec {
    pub(super) fn ty(self) -> Type {
        match self {
            Prec::Single => Type::I32,
            Prec::Double => Type::I64,
        }
    }

    fn ty_mask(self) -> u64 {
        match self {
            Prec::Single => 0xffff_ffff,
            Prec::Double => u64::MAX,
        }
    }

    fn sign(self) -> u64 {
        match self {
            Prec::Single => 0x8000_0000,
            Prec::Double => 1 << 63,
        }
    }

    /// A register in the first bank is always scalar in a short-vector
    /// operation.
    fn is_scalar(self, reg: i64) -> bool {
        match self {
            Prec::Single => reg & 0x18 == 0,
            Prec::Double => reg & 0xc == 0,
        }
    }

    /// Step `reg` by `delta`, wrapping within its bank.
    fn advance(self, reg: i64, delta: i64) -> i64 {
        match self {
            Prec::Single => ((reg + delta) & 7) | (reg & !7),
            Prec::Double => ((reg + delta) & 3) | (reg & !3),
        }
    }
}

/// FPSCR.LEN iteration of one short-vector operation.
struct ShortVec {
    len: u32,
    delta_d: i64,
    delta_m: i64,
}

impl ArmDisasContext<'_> {
    // -- Access checks --

    /// FP access trap first, then FPEXC.EN. `false` means an exception
    /// has been raised and the instruction is done.
    pub(super) fn vfp_access_check_a(&mut self, ir: &mut Context, ignore_enabled: bool) -> bool {
        if self.tb.fp_excp_el != 0 {
            let el = self.tb.fp_excp_el as u32;
            let pc = self.pc_curr;
            if self.is_m() {
                self.gen_exception_insn_el(ir, pc, EXCP_NOCP, syn_uncategorized(), el);
            } else {
                let syn = syn_fp_access_trap(true, 0xe, false, 0xa);
                self.gen_exception_insn_el(ir, pc, EXCP_UDEF, syn, el);
            }
            return false;
        }
        if !self.tb.vfp_enabled && !ignore_enabled {
            self.unallocated_encoding(ir);
            return false;
        }
        true
    }

    pub(super) fn vfp_access_check(&mut self, ir: &mut Context) -> bool {
        self.vfp_access_check_a(ir, false)
    }

    fn prec_ok(&self, p: Prec) -> bool {
        match p {
            Prec::Single => self.cfg.fp_sp(),
            Prec::Double => self.cfg.fp_dp(),
        }
    }

    /// D16-D31 only exist with 32 double registers.
    pub(super) fn dregs_ok(&self, regs: &[i64]) -> bool {
        self.cfg.simd_r32() || regs.iter().all(|&r| r & 0x10 == 0)
    }

    /// Precision and register-bank checks shared by every data
    /// processing op; `dregs` are the operands that name D registers.
    fn fp_regs_ok(&self, p: Prec, dregs: &[i64]) -> bool {
        self.prec_ok(p) && (p == Prec::Single || self.dregs_ok(dregs))
    }

    fn short_vec(&self, p: Prec, vd: i64, vm: i64) -> Option<ShortVec> {
        let len = self.tb.vec_len as u32;
        let stride = self.tb.vec_stride as i64;
        if !self.cfg.fp_short_vec() && (len != 0 || stride != 0) {
            return None;
        }
        if len == 0 || p.is_scalar(vd) {
            return Some(ShortVec { len: 0, delta_d: 0, delta_m: 0 });
        }
        let delta_d = match p {
            Prec::Single => stride + 1,
            Prec::Double => (stride >> 1) + 1,
        };
        let delta_m = if p.is_scalar(vm) { 0 } else { delta_d };
        Some(ShortVec { len, delta_d, delta_m })
    }

    // -- Register file --

    pub(super) fn vfp_load_reg32(&self, ir: &mut Context, reg: i64) -> TempIdx {
        let t = ir.new_temp(Type::I32);
        ir.gen_ld(Type::I32, t, self.env, vfp_reg_offset(false, reg as usize));
        t
    }

    pub(super) fn vfp_load_reg64(&self, ir: &mut Context, reg: i64) -> TempIdx {
        let t = ir.new_temp(Type::I64);
        ir.gen_ld(Type::I64, t, self.env, vfp_reg_offset(true, reg as usize));
        t
    }

    pub(super) fn vfp_store_reg32(&self, ir: &mut Context, var: TempIdx, reg: i64) {
        ir.gen_st(Type::I32, var, self.env, vfp_reg_offset(false, reg as usize));
    }

    pub(super) fn vfp_store_reg64(&self, ir: &mut Context, var: TempIdx, reg: i64) {
        ir.gen_st(Type::I64, var, self.env, vfp_reg_offset(true, reg as usize));
    }

    fn vfp_load(&self, ir: &mut Context, p: Prec, reg: i64) -> TempIdx {
        match p {
            Prec::Single => self.vfp_load_reg32(ir, reg),
            Prec::Double => self.vfp_load_reg64(ir, reg),
        }
    }

    fn vfp_store(&self, ir: &mut Context, p: Prec, var: TempIdx, reg: i64) {
        match p {
            Prec::Single => self.vfp_store_reg32(ir, var, reg),
            Prec::Double => self.vfp_store_reg64(ir, var, reg),
        }
    }

    // -- Arithmetic --

    pub(super) fn fp_arith(
        &self,
        ir: &mut Context,
        p: Prec,
        op: FpOp,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        let sel = self.const32(ir, op as u32);
        match p {
            Prec::Single => self.call(ir, Helper::VfpArith32, &[a, b, sel]),
            Prec::Double => self.call64(ir, Helper::VfpArith64, &[a, b, sel]),
        }
    }

    fn fp_neg(&self, ir: &mut Context, p: Prec, a: TempIdx) -> TempIdx {
        let t = ir.new_temp(p.ty());
        ir.gen_xori(p.ty(), t, a, p.sign())
    }

    fn fp_abs(&self, ir: &mut Context, p: Prec, a: TempIdx) -> TempIdx {
        let t = ir.new_temp(p.ty());
        ir.gen_andi(p.ty(), t, a, !p.sign() & p.ty_mask())
    }

    /// `op(d, n, m)` over FPSCR.LEN elements. `op` gets the old value
    /// of the destination when `reads_vd` is set.
    #[allow(clippy::too_many_arguments)]
    fn do_vfp_3op(
        &mut self,
        ir: &mut Context,
        p: Prec,
        vd: i64,
        vn: i64,
        vm: i64,
        reads_vd: bool,
        op: impl Fn(&Self, &mut Context, TempIdx, TempIdx, TempIdx) -> TempIdx,
    ) -> bool {
        if !self.fp_regs_ok(p, &[vd, vn, vm]) {
            return false;
        }
        let Some(sv) = self.short_vec(p, vd, vm) else {
            return false;
        };
        if !self.vfp_access_check(ir) {
            return true;
        }
        let (mut vd, mut vn, mut vm) = (vd, vn, vm);
        let mut len = sv.len;
        let mut f0 = self.vfp_load(ir, p, vn);
        let mut f1 = self.vfp_load(ir, p, vm);
        let mut fd = if reads_vd {
            self.vfp_load(ir, p, vd)
        } else {
            ir.new_temp(p.ty())
        };
        loop {
            let res = op(self, ir, fd, f0, f1);
            self.vfp_store(ir, p, res, vd);
            if len == 0 {
                break;
            }
            len -= 1;
            vd = p.advance(vd, sv.delta_d);
            vn = p.advance(vn, sv.delta_d);
            f0 = self.vfp_load(ir, p, vn);
            if sv.delta_m != 0 {
                vm = p.advance(vm, sv.delta_m);
                f1 = self.vfp_load(ir, p, vm);
            }
            if reads_vd {
                fd = self.vfp_load(ir, p, vd);
            }
        }
        true
    }

    /// `op(m)` over FPSCR.LEN elements. A scalar source with a vector
    /// destination computes once and stores to every element.
    fn do_vfp_2op(
        &mut self,
        ir: &mut Context,
        p: Prec,
        vd: i64,
        vm: i64,
        op: impl Fn(&Self, &mut Context, TempIdx) -> TempIdx,
    ) -> bool {
        if !self.fp_regs_ok(p, &[vd, vm]) {
            return false;
        }
        let Some(sv) = self.short_vec(p, vd, vm) else {
            return false;
        };
        if !self.vfp_access_check(ir) {
            return true;
        }
        let (mut vd, mut vm) = (vd, vm);
        let mut len = sv.len;
        let mut f0 = self.vfp_load(ir, p, vm);
        loop {
            let fd = op(self, ir, f0);
            self.vfp_store(ir, p, fd, vd);
            if len == 0 {
                break;
            }
            if sv.delta_m == 0 {
                for _ in 0..len {
                    vd = p.advance(vd, sv.delta_d);
                    self.vfp_store(ir, p, fd, vd);
                }
                break;
            }
            len -= 1;
            vd = p.advance(vd, sv.delta_d);
            vm = p.advance(vm, sv.delta_m);
            f0 = self.vfp_load(ir, p, vm);
        }
        true
    }

    fn do_vfp_binop(&mut self, ir: &mut Context, p: Prec, a: &ArgsVfpDnm, op: FpOp) -> bool {
        self.do_vfp_3op(ir, p, a.vd, a.vn, a.vm, false, |s, ir, _, n, m| {
            s.fp_arith(ir, p, op, n, m)
        })
    }

    /// VMLA, VMLS, VNMLS and VNMLA: a rounded multiply followed by a
    /// rounded add, with the product and/or the accumulator negated.
    fn do_vfp_mac(
        &mut self,
        ir: &mut Context,
        p: Prec,
        a: &ArgsVfpDnm,
        neg_prod: bool,
        neg_acc: bool,
    ) -> bool {
        self.do_vfp_3op(ir, p, a.vd, a.vn, a.vm, true, |s, ir, d, n, m| {
            let mut prod = s.fp_arith(ir, p, FpOp::Mul, n, m);
            if neg_prod {
                prod = s.fp_neg(ir, p, prod);
            }
            let acc = if neg_acc { s.fp_neg(ir, p, d) } else { d };
            s.fp_arith(ir, p, FpOp::Add, acc, prod)
        })
    }

    fn do_vfm(&mut self, ir: &mut Context, p: Prec, a: &ArgsVfpFm) -> bool {
        if !self.cfg.fp_fma() || !self.fp_regs_ok(p, &[a.vd, a.vn, a.vm]) {
            return false;
        }
        // Fused multiply-add has no short-vector form.
        if self.tb.vec_len != 0 || self.tb.vec_stride != 0 {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let mut n = self.vfp_load(ir, p, a.vn);
        let m = self.vfp_load(ir, p, a.vm);
        let mut d = self.vfp_load(ir, p, a.vd);
        if a.o2 != 0 {
            n = self.fp_neg(ir, p, n);
        }
        if a.o1 & 1 != 0 {
            d = self.fp_neg(ir, p, d);
        }
        let res = match p {
            Prec::Single => self.call(ir, Helper::VfpMulAdd32, &[n, m, d]),
            Prec::Double => self.call64(ir, Helper::VfpMulAdd64, &[n, m, d]),
        };
        self.vfp_store(ir, p, res, a.vd);
        true
    }

    fn do_vmov_imm(&mut self, ir: &mut Context, p: Prec, a: &ArgsVmovImm) -> bool {
        if !self.cfg.fp_v3() || !self.fp_regs_ok(p, &[a.vd]) {
            return false;
        }
        let Some(sv) = self.short_vec(p, a.vd, 0) else {
            return false;
        };
        if !self.vfp_access_check(ir) {
            return true;
        }
        let imm = ir.new_const(p.ty(), vfp_expand_imm(p, a.imm as u32));
        let mut vd = a.vd;
        self.vfp_store(ir, p, imm, vd);
        for _ in 0..sv.len {
            vd = p.advance(vd, sv.delta_d);
            self.vfp_store(ir, p, imm, vd);
        }
        true
    }

    fn do_vcmp(&mut self, ir: &mut Context, p: Prec, a: &ArgsVcmp) -> bool {
        if !self.fp_regs_ok(p, &[a.vd, a.vm]) {
            return false;
        }
        // The compare-with-zero form has Vm fixed at zero.
        if a.z != 0 && a.vm != 0 {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let d = self.vfp_load(ir, p, a.vd);
        let m = if a.z != 0 {
            ir.new_const(p.ty(), 0)
        } else {
            self.vfp_load(ir, p, a.vm)
        };
        let signaling = self.const32(ir, (a.e != 0) as u32);
        let h = match p {
            Prec::Single => Helper::VfpCmp32,
            Prec::Double => Helper::VfpCmp64,
        };
        self.call_void(ir, h, &[d, m, signaling]);
        true
    }

    /// Round to integral with `mode` (a `FpRounding`, optionally with
    /// the `RINT_*` flags).
    fn do_vrint(&mut self, ir: &mut Context, p: Prec, vd: i64, vm: i64, mode: u32) -> bool {
        if !self.cfg.fp_v8() || !self.fp_regs_ok(p, &[vd, vm]) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let v = self.vfp_load(ir, p, vm);
        let mode = self.const32(ir, mode);
        let res = match p {
            Prec::Single => self.call(ir, Helper::VfpRint32, &[v, mode]),
            Prec::Double => self.call64(ir, Helper::VfpRint64, &[v, mode]),
        };
        self.vfp_store(ir, p, res, vd);
        true
    }

    /// Float to 32-bit integer into a single register.
    fn do_vcvt_toint(&mut self, ir: &mut Context, p: Prec, vd: i64, vm: i64, flags: u32) -> bool {
        if !self.fp_regs_ok(p, &[vm]) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let v = self.vfp_load(ir, p, vm);
        let flags = self.const32(ir, flags);
        let h = match p {
            Prec::Single => Helper::VfpToInt32,
            Prec::Double => Helper::VfpToInt64,
        };
        let res = self.call(ir, h, &[v, flags]);
        self.vfp_store_reg32(ir, res, vd);
        true
    }

    fn do_vcvt_fix(&mut self, ir: &mut Context, p: Prec, a: &ArgsVcvtFix) -> bool {
        if !self.cfg.fp_v3() || !self.fp_regs_ok(p, &[a.vd]) {
            return false;
        }
        // opc is op:U:sx; sx selects a 32-bit rather than 16-bit
        // fixed-point value.
        let bits = if a.opc & 1 != 0 { 32 } else { 16 };
        let frac_bits = bits - a.imm;
        if frac_bits < 0 {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let mut flags = 0;
        if a.opc & 2 == 0 {
            flags |= CVT_SIGNED;
        }
        if a.opc & 1 == 0 {
            flags |= CVT_HALF;
        }
        let to_fixed = a.opc & 4 != 0;
        let shift = self.const32(ir, frac_bits as u32);
        let flags = self.const32(ir, flags);
        let v = self.vfp_load(ir, p, a.vd);
        let res = match (p, to_fixed) {
            (Prec::Single, true) => self.call(ir, Helper::VfpToFix32, &[v, shift, flags]),
            (Prec::Single, false) => self.call(ir, Helper::VfpFromFix32, &[v, shift, flags]),
            (Prec::Double, true) => self.call64(ir, Helper::VfpToFix64, &[v, shift, flags]),
            (Prec::Double, false) => {
                let lo = ir.new_temp(Type::I32);
                ir.gen_extrl_i64_i32(lo, v);
                self.call64(ir, Helper::VfpFromFix64, &[lo, shift, flags])
            }
        };
        self.vfp_store(ir, p, res, a.vd);
        true
    }

    fn do_vsel(&mut self, ir: &mut Context, p: Prec, a: &ArgsVsel) -> bool {
        if !self.cfg.fp_v8() || !self.fp_regs_ok(p, &[a.vd, a.vn, a.vm]) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let n = self.vfp_load(ir, p, a.vn);
        let m = self.vfp_load(ir, p, a.vm);
        let zero = self.const32(ir, 0);
        let c = ir.new_temp(Type::I32);
        match a.cc {
            // EQ: Z set.
            0 => {
                ir.gen_setcond(Type::I32, c, self.zf, zero, Cond::Eq);
            }
            // VS: V set.
            1 => {
                ir.gen_setcond(Type::I32, c, self.vf, zero, Cond::Lt);
            }
            // GE: N == V.
            2 => {
                let t = ir.new_temp(Type::I32);
                ir.gen_xor(Type::I32, t, self.vf, self.nf);
                ir.gen_setcond(Type::I32, c, t, zero, Cond::Ge);
            }
            // GT: !Z && N == V.
            _ => {
                let t = ir.new_temp(Type::I32);
                ir.gen_xor(Type::I32, t, self.vf, self.nf);
                let ge = ir.new_temp(Type::I32);
                ir.gen_setcond(Type::I32, ge, t, zero, Cond::Ge);
                let nz = ir.new_temp(Type::I32);
                ir.gen_setcond(Type::I32, nz, self.zf, zero, Cond::Ne);
                ir.gen_and(Type::I32, c, ge, nz);
            }
        }
        let (c, zero) = match p {
            Prec::Single => (c, zero),
            Prec::Double => {
                let c64 = ir.new_temp(Type::I64);
                ir.gen_ext_u32_i64(c64, c);
                (c64, ir.new_const(Type::I64, 0))
            }
        };
        let d = ir.new_temp(p.ty());
        ir.gen_movcond(p.ty(), d, c, zero, n, m, Cond::Ne);
        self.vfp_store(ir, p, d, a.vd);
        true
    }

    fn do_vminmaxnm(&mut self, ir: &mut Context, p: Prec, a: &ArgsVfpDnm, op: FpOp) -> bool {
        if !self.cfg.fp_v8() || !self.fp_regs_ok(p, &[a.vd, a.vn, a.vm]) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let n = self.vfp_load(ir, p, a.vn);
        let m = self.vfp_load(ir, p, a.vm);
        let res = self.fp_arith(ir, p, op, n, m);
        self.vfp_store(ir, p, res, a.vd);
        true
    }

    // -- Transfers --

    fn do_vldr_vstr(&mut self, ir: &mut Context, p: Prec, a: &ArgsVldrVstr) -> bool {
        if !self.fp_regs_ok(p, &[a.vd]) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let mut offset = (a.imm << 2) as i32;
        if a.u == 0 {
            offset = -offset;
        }
        let addr = self.add_reg_for_lit(ir, a.rn, offset);
        let idx = self.get_mem_index();
        match p {
            Prec::Single => {
                let op = MemOp::ul().with(MemOp::ALIGN);
                if a.l != 0 {
                    let t = ir.new_temp(Type::I32);
                    self.gen_aa32_ld_i32(ir, t, addr, idx, op);
                    self.vfp_store_reg32(ir, t, a.vd);
                } else {
                    let t = self.vfp_load_reg32(ir, a.vd);
                    self.gen_aa32_st_i32(ir, t, addr, idx, op);
                }
            }
            Prec::Double => {
                let op = MemOp::uq().with(MemOp::ALIGN_4);
                if a.l != 0 {
                    let t = ir.new_temp(Type::I64);
                    self.gen_aa32_ld_i64(ir, t, addr, idx, op);
                    self.vfp_store_reg64(ir, t, a.vd);
                } else {
                    let t = self.vfp_load_reg64(ir, a.vd);
                    self.gen_aa32_st_i64(ir, t, addr, idx, op);
                }
            }
        }
        true
    }

    fn do_vldm_vstm(&mut self, ir: &mut Context, p: Prec, a: &ArgsVldmVstm) -> bool {
        let n = match p {
            Prec::Single => a.imm,
            Prec::Double => a.imm >> 1,
        };
        if !self.prec_ok(p) || n == 0 || a.vd + n > 32 {
            return false;
        }
        if p == Prec::Double && (n > 16 || (!self.cfg.simd_r32() && a.vd + n > 16)) {
            return false;
        }
        // Writeback to the PC.
        if a.rn == 15 && a.w != 0 {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let addr = self.add_reg_for_lit(ir, a.rn, 0);
        if a.p != 0 {
            ir.gen_subi(Type::I32, addr, addr, (a.imm << 2) as u64);
        }
        let idx = self.get_mem_index();
        let step: i64 = match p {
            Prec::Single => 4,
            Prec::Double => 8,
        };
        for i in 0..n {
            let reg = a.vd + i;
            match p {
                Prec::Single => {
                    let op = MemOp::ul().with(MemOp::ALIGN);
                    if a.l != 0 {
                        let t = ir.new_temp(Type::I32);
                        self.gen_aa32_ld_i32(ir, t, addr, idx, op);
                        self.vfp_store_reg32(ir, t, reg);
                    } else {
                        let t = self.vfp_load_reg32(ir, reg);
                        self.gen_aa32_st_i32(ir, t, addr, idx, op);
                    }
                }
                Prec::Double => {
                    let op = MemOp::uq().with(MemOp::ALIGN_4);
                    if a.l != 0 {
                        let t = ir.new_temp(Type::I64);
                        self.gen_aa32_ld_i64(ir, t, addr, idx, op);
                        self.vfp_store_reg64(ir, t, reg);
                    } else {
                        let t = self.vfp_load_reg64(ir, reg);
                        self.gen_aa32_st_i64(ir, t, addr, idx, op);
                    }
                }
            }
            ir.gen_addi(Type::I32, addr, addr, step as u64);
        }
        if a.w != 0 {
            let adjust = if a.p != 0 {
                -step * n
            } else if p == Prec::Double && a.imm & 1 != 0 {
                // FLDMX/FSTMX: the odd immediate counts one more word.
                4
            } else {
                0
            };
            if adjust != 0 {
                ir.gen_addi(Type::I32, addr, addr, adjust as u64);
            }
            self.store_reg(ir, a.rn, addr);
        }
        true
    }

    fn do_vmov_64(&mut self, ir: &mut Context, p: Prec, a: &ArgsVmov64) -> bool {
        if !self.fp_regs_ok(p, &[a.vm]) {
            return false;
        }
        // S31 has no successor.
        if p == Prec::Single && a.vm == 31 {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        match p {
            Prec::Single => {
                if a.op != 0 {
                    let lo = self.vfp_load_reg32(ir, a.vm);
                    self.store_reg(ir, a.rt, lo);
                    let hi = self.vfp_load_reg32(ir, a.vm + 1);
                    self.store_reg(ir, a.rt2, hi);
                } else {
                    let lo = self.load_reg(ir, a.rt);
                    self.vfp_store_reg32(ir, lo, a.vm);
                    let hi = self.load_reg(ir, a.rt2);
                    self.vfp_store_reg32(ir, hi, a.vm + 1);
                }
            }
            Prec::Double => {
                if a.op != 0 {
                    let v = self.vfp_load_reg64(ir, a.vm);
                    let lo = ir.new_temp(Type::I32);
                    ir.gen_extrl_i64_i32(lo, v);
                    self.store_reg(ir, a.rt, lo);
                    let hi = ir.new_temp(Type::I32);
                    ir.gen_extrh_i64_i32(hi, v);
                    self.store_reg(ir, a.rt2, hi);
                } else {
                    let lo = self.load_reg(ir, a.rt);
                    let hi = self.load_reg(ir, a.rt2);
                    let v = ir.new_temp(Type::I64);
                    ir.gen_concat_i32_i64(v, lo, hi);
                    self.vfp_store_reg64(ir, v, a.vm);
                }
            }
        }
        true
    }

    /// VMRS/VMSR. The ID registers and FPEXC stay accessible while
    /// FPEXC.EN is clear.
    fn do_vmsr_vmrs(&mut self, ir: &mut Context, a: &ArgsVmsrVmrs) -> bool {
        if !self.cfg.fp_sp() && !self.cfg.neon() {
            return false;
        }
        let reg = a.reg as usize;
        if self.is_m() && reg != VFP_FPSCR {
            return false;
        }
        // Only FPSCR can target APSR_nzcv.
        if a.l != 0 && a.rt == 15 && reg != VFP_FPSCR {
            return false;
        }
        let user = self.is_user();
        let ignore_enabled = match reg {
            // VFPv3 makes every ID register privileged.
            VFP_FPSID => {
                if user && self.cfg.fp_v3() {
                    return false;
                }
                true
            }
            VFP_MVFR0 | VFP_MVFR1 => {
                if user || self.cfg.mvfr0 == 0 {
                    return false;
                }
                true
            }
            VFP_MVFR2 => {
                if user || !self.has(ArmFeature::V8) {
                    return false;
                }
                true
            }
            VFP_FPSCR => false,
            VFP_FPEXC => {
                if user {
                    return false;
                }
                true
            }
            // Gone in VFPv3.
            VFP_FPINST | VFP_FPINST2 => {
                if user || self.cfg.fp_v3() {
                    return false;
                }
                false
            }
            _ => return false,
        };
        if !self.vfp_access_check_a(ir, ignore_enabled) {
            return true;
        }
        let offset = vfp_xreg_offset(reg);
        if a.l != 0 {
            let t = self.load_cpu_offset(ir, offset);
            if a.rt == 15 {
                ir.gen_andi(Type::I32, t, t, FPSCR_NZCV_MASK as u64);
                self.gen_set_nzcv(ir, t);
            } else {
                self.store_reg(ir, a.rt, t);
            }
            return true;
        }
        match reg {
            // ID registers ignore writes.
            VFP_FPSID | VFP_MVFR0 | VFP_MVFR1 | VFP_MVFR2 => {}
            VFP_FPSCR => {
                let t = self.load_reg(ir, a.rt);
                self.call_void(ir, Helper::SetFpscr, &[t]);
                self.gen_lookup_tb(ir);
            }
            VFP_FPEXC => {
                // Only EN is writable.
                let t = self.load_reg(ir, a.rt);
                ir.gen_andi(Type::I32, t, t, FPEXC_EN as u64);
                self.store_cpu_offset(ir, t, offset);
                self.gen_rebuild_hflags(ir);
                self.gen_lookup_tb(ir);
            }
            _ => {
                let t = self.load_reg(ir, a.rt);
                self.store_cpu_offset(ir, t, offset);
            }
        }
        true
    }
}

/// The 8-bit VMOV immediate `abcdefgh` as a single or double value:
/// sign `a`, exponent `NOT(b):b..b:cd`, fraction `efgh` followed by
/// zeros.
pub(super) fn vfp_expand_imm(p: Prec, imm8: u32) -> u64 {
    let sign = if imm8 & 0x80 != 0 { 0x8000 } else { 0 };
    let b = imm8 & 0x40 != 0;
    let low = (imm8 & 0x3f) as u64;
    match p {
        Prec::Single => {
            let exp = if b { 0x3e00 } else { 0x4000 };
            ((sign | exp) as u64 | low << 3) << 16
        }
        Prec::Double => {
            let exp = if b { 0x3fc0 } else { 0x4000 };
            ((sign | exp) as u64 | low) << 48
        }
    }
}

fn cvt_int_flags(signed: bool, round_zero: bool) -> u32 {
    let mut flags = 0;
    if signed {
        flags |= CVT_SIGNED;
    }
    if round_zero {
        flags |= CVT_ROUND_ZERO;
    }
    flags
}

impl DecodeVfp<Context> for ArmDisasContext<'_> {
    // ── Core register transfers ──

    fn trans_vmov_to_gp(&mut self, ir: &mut Context, a: &ArgsVmovToGp) -> bool {
        let ok = if a.size == 2 { self.cfg.fp_sp() } else { self.cfg.neon() };
        if !ok || !self.dregs_ok(&[a.vn]) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let off = neon_element_offset(a.vn as usize, a.index as usize, a.size as u32);
        let t = ir.new_temp(Type::I32);
        match (a.size, a.u != 0) {
            (0, true) => ir.gen_ld8u(Type::I32, t, self.env, off),
            (0, false) => ir.gen_ld8s(Type::I32, t, self.env, off),
            (1, true) => ir.gen_ld16u(Type::I32, t, self.env, off),
            (1, false) => ir.gen_ld16s(Type::I32, t, self.env, off),
            _ => ir.gen_ld(Type::I32, t, self.env, off),
        };
        self.store_reg(ir, a.rt, t);
        true
    }

    fn trans_vmov_from_gp(&mut self, ir: &mut Context, a: &ArgsVmovFromGp) -> bool {
        let ok = if a.size == 2 { self.cfg.fp_sp() } else { self.cfg.neon() };
        if !ok || !self.dregs_ok(&[a.vn]) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let off = neon_element_offset(a.vn as usize, a.index as usize, a.size as u32);
        let t = self.load_reg(ir, a.rt);
        match a.size {
            0 => ir.gen_st8(Type::I32, t, self.env, off),
            1 => ir.gen_st16(Type::I32, t, self.env, off),
            _ => ir.gen_st(Type::I32, t, self.env, off),
        }
        true
    }

    fn trans_vdup(&mut self, ir: &mut Context, a: &ArgsVdup) -> bool {
        if !self.cfg.neon() || !self.dregs_ok(&[a.vn]) {
            return false;
        }
        if a.b != 0 && a.e != 0 {
            return false;
        }
        if a.q != 0 && a.vn & 1 != 0 {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let t = self.load_reg(ir, a.rt);
        if a.b != 0 {
            ir.gen_andi(Type::I32, t, t, 0xff);
            ir.gen_muli(Type::I32, t, t, 0x0101_0101);
        } else if a.e != 0 {
            ir.gen_andi(Type::I32, t, t, 0xffff);
            ir.gen_muli(Type::I32, t, t, 0x0001_0001);
        }
        let v = ir.new_temp(Type::I64);
        ir.gen_concat_i32_i64(v, t, t);
        self.vfp_store_reg64(ir, v, a.vn);
        if a.q != 0 {
            self.vfp_store_reg64(ir, v, a.vn + 1);
        }
        true
    }

    fn trans_vmsr_vmrs(&mut self, ir: &mut Context, a: &ArgsVmsrVmrs) -> bool {
        self.do_vmsr_vmrs(ir, a)
    }

    fn trans_vmov_single(&mut self, ir: &mut Context, a: &ArgsVmovSingle) -> bool {
        if !self.cfg.fp_sp() {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        if a.l != 0 {
            let t = self.vfp_load_reg32(ir, a.vn);
            if a.rt == 15 {
                self.gen_set_nzcv(ir, t);
            } else {
                self.store_reg(ir, a.rt, t);
            }
        } else {
            let t = self.load_reg(ir, a.rt);
            self.vfp_store_reg32(ir, t, a.vn);
        }
        true
    }

    fn trans_vmov_64_sp(&mut self, ir: &mut Context, a: &ArgsVmov64) -> bool {
        self.do_vmov_64(ir, Prec::Single, a)
    }
    fn trans_vmov_64_dp(&mut self, ir: &mut Context, a: &ArgsVmov64) -> bool {
        self.do_vmov_64(ir, Prec::Double, a)
    }

    // ── Loads and stores ──

    fn trans_vldr_vstr_sp(&mut self, ir: &mut Context, a: &ArgsVldrVstr) -> bool {
        self.do_vldr_vstr(ir, Prec::Single, a)
    }
    fn trans_vldr_vstr_dp(&mut self, ir: &mut Context, a: &ArgsVldrVstr) -> bool {
        self.do_vldr_vstr(ir, Prec::Double, a)
    }
    fn trans_vldm_vstm_sp(&mut self, ir: &mut Context, a: &ArgsVldmVstm) -> bool {
        self.do_vldm_vstm(ir, Prec::Single, a)
    }
    fn trans_vldm_vstm_dp(&mut self, ir: &mut Context, a: &ArgsVldmVstm) -> bool {
        self.do_vldm_vstm(ir, Prec::Double, a)
    }

    // ── Arithmetic ──

    fn trans_vmla_sp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vfp_mac(ir, Prec::Single, a, false, false)
    }
    fn trans_vmla_dp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vfp_mac(ir, Prec::Double, a, false, false)
    }
    fn trans_vmls_sp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vfp_mac(ir, Prec::Single, a, true, false)
    }
    fn trans_vmls_dp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vfp_mac(ir, Prec::Double, a, true, false)
    }
    fn trans_vnmls_sp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vfp_mac(ir, Prec::Single, a, false, true)
    }
    fn trans_vnmls_dp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vfp_mac(ir, Prec::Double, a, false, true)
    }
    fn trans_vnmla_sp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vfp_mac(ir, Prec::Single, a, true, true)
    }
    fn trans_vnmla_dp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vfp_mac(ir, Prec::Double, a, true, true)
    }
    fn trans_vmul_sp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vfp_binop(ir, Prec::Single, a, FpOp::Mul)
    }
    fn trans_vmul_dp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vfp_binop(ir, Prec::Double, a, FpOp::Mul)
    }
    fn trans_vnmul_sp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vfp_3op(ir, Prec::Single, a.vd, a.vn, a.vm, false, |s, ir, _, n, m| {
            let t = s.fp_arith(ir, Prec::Single, FpOp::Mul, n, m);
            s.fp_neg(ir, Prec::Single, t)
        })
    }
    fn trans_vnmul_dp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vfp_3op(ir, Prec::Double, a.vd, a.vn, a.vm, false, |s, ir, _, n, m| {
            let t = s.fp_arith(ir, Prec::Double, FpOp::Mul, n, m);
            s.fp_neg(ir, Prec::Double, t)
        })
    }
    fn trans_vadd_sp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vfp_binop(ir, Prec::Single, a, FpOp::Add)
    }
    fn trans_vadd_dp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vfp_binop(ir, Prec::Double, a, FpOp::Add)
    }
    fn trans_vsub_sp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vfp_binop(ir, Prec::Single, a, FpOp::Sub)
    }
    fn trans_vsub_dp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vfp_binop(ir, Prec::Double, a, FpOp::Sub)
    }
    fn trans_vdiv_sp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vfp_binop(ir, Prec::Single, a, FpOp::Div)
    }
    fn trans_vdiv_dp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vfp_binop(ir, Prec::Double, a, FpOp::Div)
    }
    fn trans_vfm_sp(&mut self, ir: &mut Context, a: &ArgsVfpFm) -> bool {
        self.do_vfm(ir, Prec::Single, a)
    }
    fn trans_vfm_dp(&mut self, ir: &mut Context, a: &ArgsVfpFm) -> bool {
        self.do_vfm(ir, Prec::Double, a)
    }
    fn trans_vmov_imm_sp(&mut self, ir: &mut Context, a: &ArgsVmovImm) -> bool {
        self.do_vmov_imm(ir, Prec::Single, a)
    }
    fn trans_vmov_imm_dp(&mut self, ir: &mut Context, a: &ArgsVmovImm) -> bool {
        self.do_vmov_imm(ir, Prec::Double, a)
    }

    // ── Two-operand ──

    fn trans_vmov_reg_sp(&mut self, ir: &mut Context, a: &ArgsVfpDm) -> bool {
        self.do_vfp_2op(ir, Prec::Single, a.vd, a.vm, |_, _, m| m)
    }
    fn trans_vmov_reg_dp(&mut self, ir: &mut Context, a: &ArgsVfpDm) -> bool {
        self.do_vfp_2op(ir, Prec::Double, a.vd, a.vm, |_, _, m| m)
    }
    fn trans_vabs_sp(&mut self, ir: &mut Context, a: &ArgsVfpDm) -> bool {
        self.do_vfp_2op(ir, Prec::Single, a.vd, a.vm, |s, ir, m| s.fp_abs(ir, Prec::Single, m))
    }
    fn trans_vabs_dp(&mut self, ir: &mut Context, a: &ArgsVfpDm) -> bool {
        self.do_vfp_2op(ir, Prec::Double, a.vd, a.vm, |s, ir, m| s.fp_abs(ir, Prec::Double, m))
    }
    fn trans_vneg_sp(&mut self, ir: &mut Context, a: &ArgsVfpDm) -> bool {
        self.do_vfp_2op(ir, Prec::Single, a.vd, a.vm, |s, ir, m| s.fp_neg(ir, Prec::Single, m))
    }
    fn trans_vneg_dp(&mut self, ir: &mut Context, a: &ArgsVfpDm) -> bool {
        self.do_vfp_2op(ir, Prec::Double, a.vd, a.vm, |s, ir, m| s.fp_neg(ir, Prec::Double, m))
    }
    fn trans_vsqrt_sp(&mut self, ir: &mut Context, a: &ArgsVfpDm) -> bool {
        self.do_vfp_2op(ir, Prec::Single, a.vd, a.vm, |s, ir, m| {
            s.call(ir, Helper::VfpSqrt32, &[m])
        })
    }
    fn trans_vsqrt_dp(&mut self, ir: &mut Context, a: &ArgsVfpDm) -> bool {
        self.do_vfp_2op(ir, Prec::Double, a.vd, a.vm, |s, ir, m| {
            s.call64(ir, Helper::VfpSqrt64, &[m])
        })
    }

    // ── Compare and convert ──

    fn trans_vcmp_sp(&mut self, ir: &mut Context, a: &ArgsVcmp) -> bool {
        self.do_vcmp(ir, Prec::Single, a)
    }
    fn trans_vcmp_dp(&mut self, ir: &mut Context, a: &ArgsVcmp) -> bool {
        self.do_vcmp(ir, Prec::Double, a)
    }
    fn trans_vrintr_sp(&mut self, ir: &mut Context, a: &ArgsVfpDm) -> bool {
        self.do_vrint(ir, Prec::Single, a.vd, a.vm, RINT_FPSCR)
    }
    fn trans_vrintr_dp(&mut self, ir: &mut Context, a: &ArgsVfpDm) -> bool {
        self.do_vrint(ir, Prec::Double, a.vd, a.vm, RINT_FPSCR)
    }
    fn trans_vrintz_sp(&mut self, ir: &mut Context, a: &ArgsVfpDm) -> bool {
        self.do_vrint(ir, Prec::Single, a.vd, a.vm, FpRounding::Zero as u32)
    }
    fn trans_vrintz_dp(&mut self, ir: &mut Context, a: &ArgsVfpDm) -> bool {
        self.do_vrint(ir, Prec::Double, a.vd, a.vm, FpRounding::Zero as u32)
    }
    fn trans_vrintx_sp(&mut self, ir: &mut Context, a: &ArgsVfpDm) -> bool {
        self.do_vrint(ir, Prec::Single, a.vd, a.vm, RINT_FPSCR | RINT_EXACT)
    }
    fn trans_vrintx_dp(&mut self, ir: &mut Context, a: &ArgsVfpDm) -> bool {
        self.do_vrint(ir, Prec::Double, a.vd, a.vm, RINT_FPSCR | RINT_EXACT)
    }

    /// Single to double.
    fn trans_vcvt_sp(&mut self, ir: &mut Context, a: &ArgsVfpDm) -> bool {
        if !self.cfg.fp_dp() || !self.dregs_ok(&[a.vd]) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let v = self.vfp_load_reg32(ir, a.vm);
        let res = self.call64(ir, Helper::VfpF32ToF64, &[v]);
        self.vfp_store_reg64(ir, res, a.vd);
        true
    }

    /// Double to single.
    fn trans_vcvt_dp(&mut self, ir: &mut Context, a: &ArgsVfpDm) -> bool {
        if !self.cfg.fp_dp() || !self.dregs_ok(&[a.vm]) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let v = self.vfp_load_reg64(ir, a.vm);
        let res = self.call(ir, Helper::VfpF64ToF32, &[v]);
        self.vfp_store_reg32(ir, res, a.vd);
        true
    }

    fn trans_vcvt_int_sp(&mut self, ir: &mut Context, a: &ArgsVcvtInt) -> bool {
        if !self.cfg.fp_sp() {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let v = self.vfp_load_reg32(ir, a.vm);
        let signed = self.const32(ir, (a.s != 0) as u32);
        let res = self.call(ir, Helper::VfpFromInt32, &[v, signed]);
        self.vfp_store_reg32(ir, res, a.vd);
        true
    }

    fn trans_vcvt_int_dp(&mut self, ir: &mut Context, a: &ArgsVcvtInt) -> bool {
        if !self.cfg.fp_dp() || !self.dregs_ok(&[a.vd]) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let v = self.vfp_load_reg32(ir, a.vm);
        let signed = self.const32(ir, (a.s != 0) as u32);
        let res = self.call64(ir, Helper::VfpFromInt64, &[v, signed]);
        self.vfp_store_reg64(ir, res, a.vd);
        true
    }

    fn trans_vcvt_fix_sp(&mut self, ir: &mut Context, a: &ArgsVcvtFix) -> bool {
        self.do_vcvt_fix(ir, Prec::Single, a)
    }
    fn trans_vcvt_fix_dp(&mut self, ir: &mut Context, a: &ArgsVcvtFix) -> bool {
        self.do_vcvt_fix(ir, Prec::Double, a)
    }
    fn trans_vcvt_sp_int(&mut self, ir: &mut Context, a: &ArgsVcvtToint) -> bool {
        let flags = cvt_int_flags(a.s != 0, a.rz != 0);
        self.do_vcvt_toint(ir, Prec::Single, a.vd, a.vm, flags)
    }
    fn trans_vcvt_dp_int(&mut self, ir: &mut Context, a: &ArgsVcvtToint) -> bool {
        let flags = cvt_int_flags(a.s != 0, a.rz != 0);
        self.do_vcvt_toint(ir, Prec::Double, a.vd, a.vm, flags)
    }

    // ── v8 additions (unconditional space) ──

    fn trans_vsel_sp(&mut self, ir: &mut Context, a: &ArgsVsel) -> bool {
        self.do_vsel(ir, Prec::Single, a)
    }
    fn trans_vsel_dp(&mut self, ir: &mut Context, a: &ArgsVsel) -> bool {
        self.do_vsel(ir, Prec::Double, a)
    }
    fn trans_vmaxnm_sp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vminmaxnm(ir, Prec::Single, a, FpOp::MaxNum)
    }
    fn trans_vmaxnm_dp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vminmaxnm(ir, Prec::Double, a, FpOp::MaxNum)
    }
    fn trans_vminnm_sp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vminmaxnm(ir, Prec::Single, a, FpOp::MinNum)
    }
    fn trans_vminnm_dp(&mut self, ir: &mut Context, a: &ArgsVfpDnm) -> bool {
        self.do_vminmaxnm(ir, Prec::Double, a, FpOp::MinNum)
    }
    fn trans_vrint_sp(&mut self, ir: &mut Context, a: &ArgsVrint) -> bool {
        let mode = FP_DECODE_RM[a.rm as usize & 3] as u32;
        self.do_vrint(ir, Prec::Single, a.vd, a.vm, mode)
    }
    fn trans_vrint_dp(&mut self, ir: &mut Context, a: &ArgsVrint) -> bool {
        let mode = FP_DECODE_RM[a.rm as usize & 3] as u32;
        self.do_vrint(ir, Prec::Double, a.vd, a.vm, mode)
    }
    fn trans_vcvt_rm_sp(&mut self, ir: &mut Context, a: &ArgsVcvtRm) -> bool {
        if !self.cfg.fp_v8() {
            return false;
        }
        let rm = FP_DECODE_RM[a.rm as usize & 3] as u32;
        let flags = CVT_RMODE | rm << CVT_RMODE_SHIFT | cvt_int_flags(a.op != 0, false);
        self.do_vcvt_toint(ir, Prec::Single, a.vd, a.vm, flags)
    }
    fn trans_vcvt_rm_dp(&mut self, ir: &mut Context, a: &ArgsVcvtRm) -> bool {
        if !self.cfg.fp_v8() {
            return false;
        }
        let rm = FP_DECODE_RM[a.rm as usize & 3] as u32;
        let flags = CVT_RMODE | rm << CVT_RMODE_SHIFT | cvt_int_flags(a.op != 0, false);
        self.do_vcvt_toint(ir, Prec::Double, a.vd, a.vm, flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_imm() {
        // 1.0, -2.0 and 0.125.
        assert_eq!(vfp_expand_imm(Prec::Single, 0x70), 0x3f80_0000);
        assert_eq!(vfp_expand_imm(Prec::Single, 0x80), 0xc000_0000);
        assert_eq!(vfp_expand_imm(Prec::Single, 0x40), 0x3e00_0000);
        assert_eq!(vfp_expand_imm(Prec::Double, 0x70), 1.0f64.to_bits());
        assert_eq!(vfp_expand_imm(Prec::Double, 0x80), (-2.0f64).to_bits());
    }

    #[test]
    fn short_vector_banks() {
        assert!(Prec::Single.is_scalar(7));
        assert!(!Prec::Single.is_scalar(8));
        assert_eq!(Prec::Single.advance(14, 2), 8);
        assert_eq!(Prec::Single.advance(9, 1), 10);
        assert!(Prec::Double.is_scalar(3));
        assert_eq!(Prec::Double.advance(7, 1), 4);
        assert_eq!(Prec::Double.advance(21, 2), 23);
    }
}
