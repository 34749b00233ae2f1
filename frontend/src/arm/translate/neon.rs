//! Advanced SIMD: data processing and element/structure loads and
//! stores.
//!
//! Every operation works on whole D registers held in 64-bit temps; a
//! Q-register operation runs the same code on both halves. Lane
//! arithmetic is done by the `Neon*` helpers, each group of encodings
//! being mapped to a helper operation plus a `size_ok` predicate.

use tcg_core::{Context, MemOp, TempIdx, Type};

use super::vfp::FP_DECODE_RM;
use super::ArmDisasContext;
use crate::arm::cpu::neon_element_offset;
use crate::arm::helper::neon::{
    NeonLongOp, NeonNarrowOp, NeonOp, NeonPermuteOp, NeonShiftOp, NeonUnary,
};
use crate::arm::helper::vfp::{
    FpRounding, CVT_RMODE, CVT_RMODE_SHIFT, CVT_SIGNED, FP_STANDARD, RINT_EXACT,
};
use crate::arm::helper::Helper;
use crate::arm::neon_decode::*;

/// Three registers of the same length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThreeSame {
    /// `d = op(n, m)`.
    Op(NeonOp),
    /// `d = op(m, n)`: shift-by-register forms shift Vm by Vn.
    Shift(NeonOp),
    /// Pairwise; D registers only.
    Pairwise(NeonOp),
    /// `d = acc(d, op(n, m))`.
    Acc(NeonOp, NeonOp),
    /// VAND, VBIC, VORR, VORN, VEOR, VBSL, VBIT, VBIF, indexed by
    /// `U:size`.
    Logic(u32),
    /// VFMA, or VFMS when set.
    Fma(bool),
}

fn three_same(op: i64, o1: bool, u: bool, size: u32) -> Option<(ThreeSame, bool)> {
    use NeonOp::*;
    use ThreeSame::*;
    let pick = |s: NeonOp, us: NeonOp| if u { us } else { s };
    // Float forms use size<1> as an opcode bit and size<0> = 0 (F32).
    let fs = size & 2 != 0;
    let f32_ok = size & 1 == 0;
    Some(match (op, o1) {
        (0, false) => (Op(pick(HaddS, HaddU)), size < 3),
        (0, true) => (Op(pick(QaddS, QaddU)), true),
        (1, false) => (Op(pick(RhaddS, RhaddU)), size < 3),
        (1, true) => (Logic((u as u32) << 2 | size), true),
        (2, false) => (Op(pick(HsubS, HsubU)), size < 3),
        (2, true) => (Op(pick(QsubS, QsubU)), true),
        (3, false) => (Op(pick(CgtS, CgtU)), size < 3),
        (3, true) => (Op(pick(CgeS, CgeU)), size < 3),
        (4, false) => (Shift(pick(ShlS, ShlU)), true),
        (4, true) => (Shift(pick(QshlS, QshlU)), true),
        (5, false) => (Shift(pick(RshlS, RshlU)), true),
        (5, true) => (Shift(pick(QrshlS, QrshlU)), true),
        (6, false) => (Op(pick(MaxS, MaxU)), size < 3),
        (6, true) => (Op(pick(MinS, MinU)), size < 3),
        (7, false) => (Op(pick(AbdS, AbdU)), size < 3),
        (7, true) => (Acc(pick(AbdS, AbdU), Add), size < 3),
        (8, false) => (Op(pick(Add, Sub)), true),
        (8, true) => (Op(pick(Tst, Ceq)), size < 3),
        (9, false) => (Acc(Mul, pick(Add, Sub)), size < 3),
        (9, true) if u => (Op(Pmul), size == 0),
        (9, true) => (Op(Mul), size < 3),
        (10, false) => (Pairwise(pick(PmaxS, PmaxU)), size < 3),
        (10, true) => (Pairwise(pick(PminS, PminU)), size < 3),
        (11, false) => (Op(pick(Qdmulh, Qrdmulh)), size == 1 || size == 2),
        (11, true) if !u => (Pairwise(Padd), size < 3),
        // SHA1/SHA256 (o1 = 0) and VQRDMLAH are not implemented.
        (12, true) if !u => (Fma(fs), f32_ok),
        (13, false) if !u => (Op(if fs { FSub } else { FAdd }), f32_ok),
        (13, false) if fs => (Op(FAbd), f32_ok),
        (13, false) => (Pairwise(FPadd), f32_ok),
        (13, true) if !u => (Acc(FMul, if fs { FSub } else { FAdd }), f32_ok),
        (13, true) if !fs => (Op(FMul), f32_ok),
        (14, false) if u => (Op(if fs { FCgt } else { FCge }), f32_ok),
        (14, false) if !fs => (Op(FCeq), f32_ok),
        (14, true) if u => (Op(if fs { FAcgt } else { FAcge }), f32_ok),
        (15, false) if !u => (Op(if fs { FMin } else { FMax }), f32_ok),
        (15, false) => (Pairwise(if fs { FPmin } else { FPmax }), f32_ok),
        (15, true) if !u => (Op(if fs { FRsqrts } else { FRecps }), f32_ok),
        (15, true) => (Op(if fs { FMinNum } else { FMaxNum }), f32_ok),
        _ => return None,
    })
}

/// Two registers, miscellaneous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TwoMisc {
    Unary(NeonUnary),
    /// VPADAL: pairwise add long and accumulate.
    Padal(NeonUnary),
    Not,
    Swap,
    Permute(NeonPermuteOp),
    Narrow(NeonNarrowOp),
    /// VSHLL with a shift of the element size.
    ShiftLong,
    /// VRINT{N,X,A,Z,M,P} with its `rint` mode.
    Rint(u32),
    /// VCVT{A,N,P,M} with its conversion flags.
    CvtRound(u32),
}

fn two_misc(op: i64, size: u32, q: bool) -> Option<(TwoMisc, bool)> {
    use NeonUnary::*;
    use TwoMisc::*;
    const INT_ZERO: [Option<NeonUnary>; 8] =
        [Some(Cgt0), Some(Cge0), Some(Ceq0), Some(Cle0), Some(Clt0), None, Some(Abs), Some(Neg)];
    const FP_ZERO: [Option<NeonUnary>; 8] = [
        Some(FCgt0),
        Some(FCge0),
        Some(FCeq0),
        Some(FCle0),
        Some(FClt0),
        None,
        Some(FAbs),
        Some(FNeg),
    ];
    let rint = |m: FpRounding| Rint(m as u32 | FP_STANDARD);
    Some(match op {
        0 => (Unary(Rev64), size < 3),
        1 => (Unary(Rev32), size < 2),
        2 => (Unary(Rev16), size == 0),
        4 => (Unary(PaddlS), size < 3),
        5 => (Unary(PaddlU), size < 3),
        8 => (Unary(Cls), size < 3),
        9 => (Unary(Clz), size < 3),
        10 => (Unary(Cnt), size == 0),
        11 => (Not, size == 0),
        12 => (Padal(PaddlS), size < 3),
        13 => (Padal(PaddlU), size < 3),
        14 => (Unary(Qabs), size < 3),
        15 => (Unary(Qneg), size < 3),
        16..=23 => (Unary(INT_ZERO[(op - 16) as usize]?), size < 3),
        24..=31 => (Unary(FP_ZERO[(op - 24) as usize]?), size == 2),
        32 => (Swap, size == 0),
        33 => (Permute(NeonPermuteOp::Trn), size < 3),
        34 => (Permute(NeonPermuteOp::Uzp), size < 2 || (size == 2 && q)),
        35 => (Permute(NeonPermuteOp::Zip), size < 2 || (size == 2 && q)),
        36 => (Narrow(if q { NeonNarrowOp::Qmovun } else { NeonNarrowOp::Movn }), size < 3),
        37 => (Narrow(if q { NeonNarrowOp::QmovnU } else { NeonNarrowOp::QmovnS }), size < 3),
        38 => (ShiftLong, size < 3 && !q),
        40 => (rint(FpRounding::TiesEven), size == 2),
        41 => (Rint(FpRounding::TiesEven as u32 | RINT_EXACT | FP_STANDARD), size == 2),
        42 => (rint(FpRounding::TiesAway), size == 2),
        43 => (rint(FpRounding::Zero), size == 2),
        45 => (rint(FpRounding::NegInf), size == 2),
        47 => (rint(FpRounding::PosInf), size == 2),
        48..=55 => {
            let k = (op - 48) as usize;
            let mut flags = CVT_RMODE | (FP_DECODE_RM[k >> 1] as u32) << CVT_RMODE_SHIFT | FP_STANDARD;
            if k & 1 == 0 {
                flags |= CVT_SIGNED;
            }
            (CvtRound(flags), size == 2)
        }
        56 => (Unary(RecpeU), size == 2),
        57 => (Unary(RsqrteU), size == 2),
        58 => (Unary(RecpeF), size == 2),
        59 => (Unary(RsqrteF), size == 2),
        60 => (Unary(CvtSF), size == 2),
        61 => (Unary(CvtUF), size == 2),
        62 => (Unary(CvtFS), size == 2),
        63 => (Unary(CvtFU), size == 2),
        // AES, SHA and the half-precision conversions are not implemented.
        _ => return None,
    })
}

/// Lane size and element width in bits of a shift-by-immediate
/// encoding, from `L:imm6`.
fn shift_size(l: bool, imm6: u32) -> Option<(u32, u32)> {
    if l {
        Some((3, 64))
    } else if imm6 & 0x20 != 0 {
        Some((2, 32))
    } else if imm6 & 0x10 != 0 {
        Some((1, 16))
    } else if imm6 & 0x08 != 0 {
        Some((0, 8))
    } else {
        None
    }
}

/// AdvSIMDExpandImm: the 64-bit constant of a modified-immediate
/// instruction.
pub(super) fn asimd_imm_const(imm8: u32, cmode: u32, op: bool) -> u64 {
    let imm = imm8 as u64;
    let imm32 = match cmode >> 1 {
        0..=3 => imm << (8 * (cmode >> 1)),
        4 => imm | imm << 16,
        5 => imm << 8 | imm << 24,
        6 if cmode & 1 == 0 => imm << 8 | 0xff,
        6 => imm << 16 | 0xffff,
        _ if cmode & 1 == 0 => {
            if !op {
                return imm * 0x0101_0101_0101_0101;
            }
            return (0..8)
                .filter(|i| imm8 >> i & 1 != 0)
                .fold(0, |r, i| r | 0xff << (8 * i));
        }
        _ => {
            let exp = if imm & 0x40 != 0 { 0x3e00_0000 } else { 0x4000_0000 };
            (imm & 0x80) << 24 | (imm & 0x3f) << 19 | exp
        }
    };
    imm32 | imm32 << 32
}

/// Element loads and stores of `VLDn`/`VSTn` (multiple structures):
/// registers, interleave and register spacing per `itype`.
const LS_ELEMENT_TYPE: [(i64, i64, i64); 11] = [
    (1, 4, 1),
    (1, 4, 2),
    (4, 1, 1),
    (2, 2, 2),
    (1, 3, 1),
    (1, 3, 2),
    (3, 1, 1),
    (1, 1, 1),
    (1, 2, 1),
    (1, 2, 2),
    (2, 1, 1),
];

/// Lane index, alignment field and register stride of a single-lane
/// load or store, from `size` and the `index_align` field.
fn single_lane_fields(size: u32, ia: i64) -> (usize, i64, i64) {
    match size {
        0 => ((ia >> 1) as usize, ia & 1, 1),
        1 => ((ia >> 2) as usize, ia & 3, ((ia >> 1) & 1) + 1),
        _ => ((ia >> 3) as usize, ia & 7, ((ia >> 2) & 1) + 1),
    }
}

/// Alignment requirement of `1 << log2` bytes.
fn pow2_align(log2: u32) -> u16 {
    (log2 as u16) << 4
}

/// The operands that must be even: all of `regs` for a Q operation.
fn q_only(q: bool, regs: &[i64]) -> &[i64] {
    if q {
        regs
    } else {
        &[]
    }
}

fn dup_mult(size: u32) -> u64 {
    match size {
        0 => 0x0101_0101_0101_0101,
        1 => 0x0001_0001_0001_0001,
        2 => 0x0000_0001_0000_0001,
        _ => 1,
    }
}

impl ArmDisasContext<'_> {
    fn neon_binop(&self, ir: &mut Context, op: NeonOp, size: u32, a: TempIdx, b: TempIdx) -> TempIdx {
        let sel = self.const32(ir, op.sel(size));
        self.call64(ir, Helper::NeonBinop, &[a, b, sel])
    }

    fn neon_unop(&self, ir: &mut Context, op: NeonUnary, size: u32, a: TempIdx) -> TempIdx {
        let sel = self.const32(ir, op.sel(size));
        self.call64(ir, Helper::NeonUnop, &[a, sel])
    }

    fn neon_long(
        &self,
        ir: &mut Context,
        op: NeonLongOp,
        unsigned: bool,
        size: u32,
        a: TempIdx,
        b: TempIdx,
    ) -> TempIdx {
        let sel = self.const32(ir, op.sel(unsigned, size));
        self.call64(ir, Helper::NeonLong, &[a, b, sel])
    }

    fn neon_widen(&self, ir: &mut Context, unsigned: bool, size: u32, a: TempIdx) -> TempIdx {
        let zero = self.const32(ir, 0);
        self.neon_long(ir, NeonLongOp::Widen, unsigned, size, a, zero)
    }

    fn neon_narrow(&self, ir: &mut Context, op: NeonNarrowOp, size: u32, lo: TempIdx, hi: TempIdx) -> TempIdx {
        let sel = self.const32(ir, op.sel(size));
        self.call64(ir, Helper::NeonNarrow, &[lo, hi, sel])
    }

    fn neon_shift(&self, ir: &mut Context, op: NeonShiftOp, size: u32, a: TempIdx, shift: u32) -> TempIdx {
        let sh = self.const32(ir, shift);
        let sel = self.const32(ir, op.sel(size));
        self.call64(ir, Helper::NeonShiftImm, &[a, sh, sel])
    }

    /// Low (`hi == false`) or high 32 bits of a D register value.
    fn neon_half(&self, ir: &mut Context, d: TempIdx, hi: bool) -> TempIdx {
        let t = ir.new_temp(Type::I32);
        if hi {
            ir.gen_extrh_i64_i32(t, d)
        } else {
            ir.gen_extrl_i64_i32(t, d)
        }
    }

    /// Element `index` of D`reg`, replicated across a doubleword.
    fn neon_dup_scalar(&self, ir: &mut Context, reg: i64, index: u32, size: u32) -> TempIdx {
        let d = self.vfp_load_reg64(ir, reg);
        let bits = 8 << size;
        let e = ir.new_temp(Type::I64);
        ir.gen_extract(Type::I64, e, d, index * bits, bits);
        let r = ir.new_temp(Type::I64);
        ir.gen_muli(Type::I64, r, e, dup_mult(size))
    }

    /// Apply `f` to each 32-bit lane of a doubleword.
    fn neon_lanes32<F>(&self, ir: &mut Context, d: TempIdx, f: F) -> TempIdx
    where
        F: Fn(&Self, &mut Context, TempIdx) -> TempIdx,
    {
        let lo = self.neon_half(ir, d, false);
        let hi = self.neon_half(ir, d, true);
        let rl = f(self, ir, lo);
        let rh = f(self, ir, hi);
        let r = ir.new_temp(Type::I64);
        ir.gen_concat_i32_i64(r, rl, rh)
    }

    /// Common checks of a data-processing encoding: the D registers
    /// exist and Q operands name even registers. `q_regs` are the
    /// operands that are Q registers.
    fn neon_regs_ok(&self, regs: &[i64], q_regs: &[i64]) -> bool {
        self.cfg.neon() && self.dregs_ok(regs) && q_regs.iter().all(|&r| r & 1 == 0)
    }

    fn neon_undef(&self, what: &str, insn_fields: impl std::fmt::Debug) -> bool {
        log::debug!("neon: unallocated {what} {insn_fields:?}");
        false
    }

    fn passes(q: bool) -> i64 {
        if q {
            2
        } else {
            1
        }
    }

    // -- Element access --

    fn neon_load_element(&self, ir: &mut Context, ty: Type, reg: i64, ele: usize, size: u32) -> TempIdx {
        let t = ir.new_temp(ty);
        let ofs = neon_element_offset(reg as usize, ele, size);
        match size {
            0 => ir.gen_ld8u(ty, t, self.env, ofs),
            1 => ir.gen_ld16u(ty, t, self.env, ofs),
            2 if ty == Type::I64 => ir.gen_ld32u(ty, t, self.env, ofs),
            _ => ir.gen_ld(ty, t, self.env, ofs),
        }
    }

    fn neon_store_element(&self, ir: &mut Context, ty: Type, reg: i64, ele: usize, size: u32, var: TempIdx) {
        let ofs = neon_element_offset(reg as usize, ele, size);
        match size {
            0 => ir.gen_st8(ty, var, self.env, ofs),
            1 => ir.gen_st16(ty, var, self.env, ofs),
            2 if ty == Type::I64 => ir.gen_st32(ty, var, self.env, ofs),
            _ => ir.gen_st(ty, var, self.env, ofs),
        }
    }

    fn gen_neon_ldst_base_update(&mut self, ir: &mut Context, rm: i64, rn: i64, stride: u32) {
        if rm == 15 {
            return;
        }
        let base = self.load_reg(ir, rn);
        if rm == 13 {
            ir.gen_addi(Type::I32, base, base, stride as u64);
        } else {
            let index = self.load_reg(ir, rm);
            ir.gen_add(Type::I32, base, base, index);
        }
        self.store_reg(ir, rn, base);
    }

    // -- Three registers --

    fn do_logic(&self, ir: &mut Context, sel: u32, n: TempIdx, m: TempIdx, d: TempIdx) -> TempIdx {
        let r = ir.new_temp(Type::I64);
        match sel {
            0 => ir.gen_and(Type::I64, r, n, m),
            1 => ir.gen_andc(Type::I64, r, n, m),
            2 => ir.gen_or(Type::I64, r, n, m),
            3 => ir.gen_orc(Type::I64, r, n, m),
            4 => ir.gen_xor(Type::I64, r, n, m),
            _ => {
                // VBSL selects by d, VBIT inserts n where m is set, VBIF
                // where m is clear: all are `base ^ ((n ^ base) & mask)`.
                let (base, mask) = match sel {
                    5 => (m, d),
                    _ => (d, m),
                };
                let t = ir.new_temp(Type::I64);
                ir.gen_xor(Type::I64, t, n, base);
                if sel == 7 {
                    ir.gen_andc(Type::I64, t, t, mask);
                } else {
                    ir.gen_and(Type::I64, t, t, mask);
                }
                ir.gen_xor(Type::I64, r, base, t)
            }
        }
    }

    fn do_3same(&mut self, ir: &mut Context, a: &ArgsNeon3same, op: ThreeSame, size: u32) -> bool {
        let q = a.q != 0;
        if matches!(op, ThreeSame::Pairwise(_)) && q {
            return false;
        }
        let regs = [a.vd, a.vn, a.vm];
        let q_regs = q_only(q, &regs);
        if !self.neon_regs_ok(&[a.vd, a.vn, a.vm], q_regs) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        for pass in 0..Self::passes(q) {
            let n = self.vfp_load_reg64(ir, a.vn + pass);
            let m = self.vfp_load_reg64(ir, a.vm + pass);
            let r = match op {
                ThreeSame::Op(o) | ThreeSame::Pairwise(o) => self.neon_binop(ir, o, size, n, m),
                ThreeSame::Shift(o) => self.neon_binop(ir, o, size, m, n),
                ThreeSame::Acc(o, acc) => {
                    let d = self.vfp_load_reg64(ir, a.vd + pass);
                    let t = self.neon_binop(ir, o, size, n, m);
                    self.neon_binop(ir, acc, size, d, t)
                }
                ThreeSame::Logic(sel) => {
                    let d = self.vfp_load_reg64(ir, a.vd + pass);
                    self.do_logic(ir, sel, n, m, d)
                }
                ThreeSame::Fma(neg) => {
                    let d = self.vfp_load_reg64(ir, a.vd + pass);
                    let neg = self.const32(ir, neg as u32);
                    self.call64(ir, Helper::NeonFma, &[n, m, d, neg])
                }
            };
            self.vfp_store_reg64(ir, r, a.vd + pass);
        }
        true
    }

    fn do_3diff_long(&mut self, ir: &mut Context, a: &ArgsNeon3diff, op: NeonLongOp, acc: Option<NeonOp>) -> bool {
        let (size, u) = (a.size as u32, a.u != 0);
        if !self.neon_regs_ok(&[a.vd, a.vn, a.vm], &[a.vd]) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        // Both sources are read in full before the first store, so a
        // destination overlapping a source is safe.
        let n = self.vfp_load_reg64(ir, a.vn);
        let m = self.vfp_load_reg64(ir, a.vm);
        let mut res = Vec::with_capacity(2);
        for pass in 0..2 {
            let nh = self.neon_half(ir, n, pass == 1);
            let mh = self.neon_half(ir, m, pass == 1);
            res.push(self.neon_long(ir, op, u, size, nh, mh));
        }
        for (pass, r) in (0..).zip(res) {
            let r = match acc {
                Some(acc) => {
                    let d = self.vfp_load_reg64(ir, a.vd + pass);
                    self.neon_binop(ir, acc, size + 1, d, r)
                }
                None => r,
            };
            self.vfp_store_reg64(ir, r, a.vd + pass);
        }
        true
    }

    fn do_3diff_wide(&mut self, ir: &mut Context, a: &ArgsNeon3diff, op: NeonOp) -> bool {
        let (size, u) = (a.size as u32, a.u != 0);
        if !self.neon_regs_ok(&[a.vd, a.vn, a.vm], &[a.vd, a.vn]) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let m = self.vfp_load_reg64(ir, a.vm);
        for pass in 0..2 {
            let mh = self.neon_half(ir, m, pass == 1);
            let w = self.neon_widen(ir, u, size, mh);
            let n = self.vfp_load_reg64(ir, a.vn + pass);
            let r = self.neon_binop(ir, op, size + 1, n, w);
            self.vfp_store_reg64(ir, r, a.vd + pass);
        }
        true
    }

    fn do_3diff_narrow(&mut self, ir: &mut Context, a: &ArgsNeon3diff, op: NeonOp) -> bool {
        let size = a.size as u32;
        if !self.neon_regs_ok(&[a.vd, a.vn, a.vm], &[a.vn, a.vm]) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let mut sums = [TempIdx(0); 2];
        for (pass, sum) in (0..).zip(sums.iter_mut()) {
            let n = self.vfp_load_reg64(ir, a.vn + pass);
            let m = self.vfp_load_reg64(ir, a.vm + pass);
            *sum = self.neon_binop(ir, op, size + 1, n, m);
        }
        let nop = if a.u != 0 {
            NeonNarrowOp::RoundHigh
        } else {
            NeonNarrowOp::High
        };
        let r = self.neon_narrow(ir, nop, size, sums[0], sums[1]);
        self.vfp_store_reg64(ir, r, a.vd);
        true
    }

    // -- Shift by immediate --

    fn do_2shift_narrow(&mut self, ir: &mut Context, a: &ArgsNeon2shift, size: u32, shift: u32) -> bool {
        if a.l != 0 || !self.neon_regs_ok(&[a.vd, a.vm], &[a.vm]) {
            return false;
        }
        let (u, round) = (a.u != 0, a.q != 0);
        let (sop, nop) = match (a.op, u) {
            // VSHRN, VRSHRN
            (8, false) => (NeonShiftOp::ShrU, NeonNarrowOp::Movn),
            // VQSHRUN, VQRSHRUN
            (8, true) => (NeonShiftOp::ShrS, NeonNarrowOp::Qmovun),
            // VQSHRN, VQRSHRN
            (_, false) => (NeonShiftOp::ShrS, NeonNarrowOp::QmovnS),
            (_, true) => (NeonShiftOp::ShrU, NeonNarrowOp::QmovnU),
        };
        let sop = match (round, sop) {
            (true, NeonShiftOp::ShrS) => NeonShiftOp::RshrS,
            (true, _) => NeonShiftOp::RshrU,
            (false, s) => s,
        };
        if !self.vfp_access_check(ir) {
            return true;
        }
        let mut halves = [TempIdx(0); 2];
        for (pass, h) in (0..).zip(halves.iter_mut()) {
            let m = self.vfp_load_reg64(ir, a.vm + pass);
            *h = self.neon_shift(ir, sop, size + 1, m, shift);
        }
        let r = self.neon_narrow(ir, nop, size, halves[0], halves[1]);
        self.vfp_store_reg64(ir, r, a.vd);
        true
    }

    fn do_2shift_long(&mut self, ir: &mut Context, a: &ArgsNeon2shift, size: u32, shift: u32) -> bool {
        if a.l != 0 || a.q != 0 || !self.neon_regs_ok(&[a.vd, a.vm], &[a.vd]) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let m = self.vfp_load_reg64(ir, a.vm);
        let mut res = [TempIdx(0); 2];
        for (pass, r) in res.iter_mut().enumerate() {
            let h = self.neon_half(ir, m, pass == 1);
            let w = self.neon_widen(ir, a.u != 0, size, h);
            *r = if shift != 0 {
                self.neon_shift(ir, NeonShiftOp::Shl, size + 1, w, shift)
            } else {
                w
            };
        }
        for (pass, r) in (0..).zip(res) {
            self.vfp_store_reg64(ir, r, a.vd + pass);
        }
        true
    }

    fn do_2shift_cvt(&mut self, ir: &mut Context, a: &ArgsNeon2shift) -> bool {
        let q = a.q != 0;
        let regs = [a.vd, a.vm];
        let q_regs = q_only(q, &regs);
        if a.l != 0 || a.imm6 & 0x20 == 0 || !self.neon_regs_ok(&[a.vd, a.vm], q_regs) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let frac = self.const32(ir, 64 - a.imm6 as u32);
        let to_fixed = if a.op == 15 { 2 } else { 0 };
        let sel = self.const32(ir, to_fixed | (a.u as u32 & 1));
        for pass in 0..Self::passes(q) {
            let m = self.vfp_load_reg64(ir, a.vm + pass);
            let r = self.call64(ir, Helper::NeonCvtFixed, &[m, frac, sel]);
            self.vfp_store_reg64(ir, r, a.vd + pass);
        }
        true
    }

    // -- Loads and stores --

    fn do_vldst_multiple(&mut self, ir: &mut Context, a: &ArgsVldstMultiple) -> bool {
        let Some(&(nregs, interleave, spacing)) = LS_ELEMENT_TYPE.get(a.itype as usize) else {
            return false;
        };
        match a.itype & 0xc {
            4 if a.align >= 2 => return false,
            8 if a.align == 3 => return false,
            _ => {}
        }
        let size = a.size as u32;
        if size == 3 && (interleave | spacing) != 1 {
            return false;
        }
        let last = a.vd + nregs - 1 + spacing * (interleave - 1);
        if !self.cfg.neon() || !self.dregs_ok(&[a.vd]) || last > 31 {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let mut align = if a.align != 0 {
            pow2_align(a.align as u32 + 2)
        } else {
            0
        };
        let idx = self.get_mem_index();
        let addr = self.load_reg(ir, a.rn);
        for reg in 0..nregs {
            for n in 0..(8 >> size) as usize {
                for xs in 0..interleave {
                    let tt = a.vd + reg + spacing * xs;
                    let op = MemOp::from_size(size).with(align);
                    if a.l != 0 {
                        let t = ir.new_temp(Type::I64);
                        self.gen_aa32_ld_i64(ir, t, addr, idx, op);
                        self.neon_store_element(ir, Type::I64, tt, n, size, t);
                    } else {
                        let t = self.neon_load_element(ir, Type::I64, tt, n, size);
                        self.gen_aa32_st_i64(ir, t, addr, idx, op);
                    }
                    ir.gen_addi(Type::I32, addr, addr, 1 << size);
                    // Only the first access carries the requested alignment.
                    align = 0;
                }
            }
        }
        self.gen_neon_ldst_base_update(ir, a.rm, a.rn, (nregs * interleave * 8) as u32);
        true
    }
}

impl DecodeNeon<Context> for ArmDisasContext<'_> {
    fn trans_neon_3same(&mut self, ir: &mut Context, a: &ArgsNeon3same) -> bool {
        let size = a.size as u32;
        let Some((op, size_ok)) = three_same(a.op, a.o1 != 0, a.u != 0, size) else {
            return self.neon_undef("3same", a);
        };
        if !size_ok {
            return self.neon_undef("3same size", a);
        }
        match op {
            ThreeSame::Fma(_) if !self.cfg.fp_fma() => return false,
            ThreeSame::Op(NeonOp::FMaxNum | NeonOp::FMinNum) if !self.cfg.fp_v8() => return false,
            _ => {}
        }
        let lane = if a.op >= 12 { 2 } else { size };
        self.do_3same(ir, a, op, lane)
    }

    fn trans_neon_1reg_imm(&mut self, ir: &mut Context, a: &ArgsNeon1regImm) -> bool {
        let q = a.q != 0;
        let regs = [a.vd];
        let q_regs = q_only(q, &regs);
        if !self.neon_regs_ok(&[a.vd], q_regs) {
            return false;
        }
        let (cmode, op) = (a.cmode as u32, a.op != 0);
        if cmode == 15 && op {
            return false;
        }
        let imm = asimd_imm_const(a.imm as u32, cmode, op);
        if !self.vfp_access_check(ir) {
            return true;
        }
        let logic = cmode & 1 != 0 && cmode < 12;
        for pass in 0..Self::passes(q) {
            let r = if logic {
                let d = self.vfp_load_reg64(ir, a.vd + pass);
                let r = ir.new_temp(Type::I64);
                if op {
                    // VBIC
                    ir.gen_andi(Type::I64, r, d, !imm)
                } else {
                    // VORR
                    ir.gen_ori(Type::I64, r, d, imm)
                }
            } else {
                let imm = if op && cmode != 14 { !imm } else { imm };
                ir.new_const(Type::I64, imm)
            };
            self.vfp_store_reg64(ir, r, a.vd + pass);
        }
        true
    }

    fn trans_neon_2shift(&mut self, ir: &mut Context, a: &ArgsNeon2shift) -> bool {
        let imm6 = a.imm6 as u32;
        let Some((size, esize)) = shift_size(a.l != 0, imm6) else {
            return false;
        };
        let right = if a.l != 0 { 64 - imm6 } else { 2 * esize - imm6 };
        let left = if a.l != 0 { imm6 } else { imm6 - esize };
        let u = a.u != 0;
        match a.op {
            8 | 9 => return self.do_2shift_narrow(ir, a, size, right),
            10 => return self.do_2shift_long(ir, a, size, left),
            14 | 15 => return self.do_2shift_cvt(ir, a),
            _ => {}
        }
        // (operation, shift, accumulate, insert)
        let (sop, shift, acc, insert) = match (a.op, u) {
            (0, _) => (Some(if u { NeonShiftOp::ShrU } else { NeonShiftOp::ShrS }), right, false, false),
            (1, _) => (Some(if u { NeonShiftOp::ShrU } else { NeonShiftOp::ShrS }), right, true, false),
            (2, _) => (Some(if u { NeonShiftOp::RshrU } else { NeonShiftOp::RshrS }), right, false, false),
            (3, _) => (Some(if u { NeonShiftOp::RshrU } else { NeonShiftOp::RshrS }), right, true, false),
            // VSRI
            (4, true) => (None, right, false, false),
            (5, false) => (Some(NeonShiftOp::Shl), left, false, false),
            // VSLI
            (5, true) => (None, left, false, true),
            (6, true) => (Some(NeonShiftOp::Qshlu), left, false, false),
            (7, _) => (Some(if u { NeonShiftOp::QshlU } else { NeonShiftOp::QshlS }), left, false, false),
            _ => return self.neon_undef("2shift", a),
        };
        let q = a.q != 0;
        let regs = [a.vd, a.vm];
        let q_regs = q_only(q, &regs);
        if !self.neon_regs_ok(&[a.vd, a.vm], q_regs) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        for pass in 0..Self::passes(q) {
            let m = self.vfp_load_reg64(ir, a.vm + pass);
            let r = match sop {
                Some(sop) => {
                    let r = self.neon_shift(ir, sop, size, m, shift);
                    if acc {
                        let d = self.vfp_load_reg64(ir, a.vd + pass);
                        self.neon_binop(ir, NeonOp::Add, size, d, r)
                    } else {
                        r
                    }
                }
                None => {
                    let d = self.vfp_load_reg64(ir, a.vd + pass);
                    let sh = self.const32(ir, shift);
                    let sel = self.const32(ir, (insert as u32) << 2 | size);
                    self.call64(ir, Helper::NeonShiftIns, &[d, m, sh, sel])
                }
            };
            self.vfp_store_reg64(ir, r, a.vd + pass);
        }
        true
    }

    fn trans_neon_vext(&mut self, ir: &mut Context, a: &ArgsNeonVext) -> bool {
        let q = a.q != 0;
        let regs = [a.vd, a.vn, a.vm];
        let q_regs = q_only(q, &regs);
        if !self.neon_regs_ok(&[a.vd, a.vn, a.vm], q_regs) || (!q && a.imm > 7) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        // Vm:Vn as a little-endian sequence of doublewords.
        let mut src = vec![self.vfp_load_reg64(ir, a.vn)];
        if q {
            src.push(self.vfp_load_reg64(ir, a.vn + 1));
        }
        src.push(self.vfp_load_reg64(ir, a.vm));
        if q {
            src.push(self.vfp_load_reg64(ir, a.vm + 1));
        }
        let (word, sh) = ((a.imm / 8) as usize, (a.imm % 8 * 8) as u64);
        let mut res = Vec::with_capacity(2);
        for k in 0..Self::passes(q) as usize {
            let lo = src[word + k];
            if sh == 0 {
                res.push(lo);
                continue;
            }
            let t = ir.new_temp(Type::I64);
            ir.gen_shri(Type::I64, t, lo, sh);
            let hi = ir.new_temp(Type::I64);
            ir.gen_shli(Type::I64, hi, src[word + k + 1], 64 - sh);
            res.push(ir.gen_or(Type::I64, t, t, hi));
        }
        for (pass, r) in (0..).zip(res) {
            self.vfp_store_reg64(ir, r, a.vd + pass);
        }
        true
    }

    fn trans_neon_2misc(&mut self, ir: &mut Context, a: &ArgsNeon2misc) -> bool {
        let (size, q) = (a.size as u32, a.q != 0);
        let Some((op, size_ok)) = two_misc(a.op, size, q) else {
            return self.neon_undef("2misc", a);
        };
        if !size_ok {
            return self.neon_undef("2misc size", a);
        }
        if matches!(op, TwoMisc::Rint(_) | TwoMisc::CvtRound(_)) && !self.cfg.fp_v8() {
            return false;
        }
        let regs = [a.vd, a.vm];
        let regs_ok = match op {
            TwoMisc::Narrow(_) => self.neon_regs_ok(&regs, &[a.vm]),
            TwoMisc::ShiftLong => self.neon_regs_ok(&regs, &[a.vd]),
            _ if q => self.neon_regs_ok(&regs, &regs),
            _ => self.neon_regs_ok(&regs, &[]),
        };
        if !regs_ok {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        match op {
            TwoMisc::Narrow(nop) => {
                let lo = self.vfp_load_reg64(ir, a.vm);
                let hi = self.vfp_load_reg64(ir, a.vm + 1);
                let r = self.neon_narrow(ir, nop, size, lo, hi);
                self.vfp_store_reg64(ir, r, a.vd);
                return true;
            }
            TwoMisc::ShiftLong => {
                let m = self.vfp_load_reg64(ir, a.vm);
                let mut res = [TempIdx(0); 2];
                for (pass, r) in res.iter_mut().enumerate() {
                    let h = self.neon_half(ir, m, pass == 1);
                    let w = self.neon_widen(ir, false, size, h);
                    *r = self.neon_shift(ir, NeonShiftOp::Shl, size + 1, w, 8 << size);
                }
                for (pass, r) in (0..).zip(res) {
                    self.vfp_store_reg64(ir, r, a.vd + pass);
                }
                return true;
            }
            TwoMisc::Swap => {
                for pass in 0..Self::passes(q) {
                    let d = self.vfp_load_reg64(ir, a.vd + pass);
                    let m = self.vfp_load_reg64(ir, a.vm + pass);
                    self.vfp_store_reg64(ir, m, a.vd + pass);
                    self.vfp_store_reg64(ir, d, a.vm + pass);
                }
                return true;
            }
            TwoMisc::Permute(pop) => {
                let rd = self.const32(ir, a.vd as u32);
                let rm = self.const32(ir, a.vm as u32);
                let sel = self.const32(ir, pop.sel(q, size));
                self.call_void(ir, Helper::NeonPermute, &[rd, rm, sel]);
                return true;
            }
            _ => {}
        }
        for pass in 0..Self::passes(q) {
            let m = self.vfp_load_reg64(ir, a.vm + pass);
            let r = match op {
                TwoMisc::Unary(u) => self.neon_unop(ir, u, size, m),
                TwoMisc::Padal(u) => {
                    let t = self.neon_unop(ir, u, size, m);
                    let d = self.vfp_load_reg64(ir, a.vd + pass);
                    self.neon_binop(ir, NeonOp::Add, size + 1, d, t)
                }
                TwoMisc::Not => {
                    let r = ir.new_temp(Type::I64);
                    ir.gen_not(Type::I64, r, m)
                }
                TwoMisc::Rint(mode) => self.neon_lanes32(ir, m, |s, ir, x| {
                    let mode = s.const32(ir, mode);
                    s.call(ir, Helper::VfpRint32, &[x, mode])
                }),
                TwoMisc::CvtRound(flags) => self.neon_lanes32(ir, m, |s, ir, x| {
                    let flags = s.const32(ir, flags);
                    s.call(ir, Helper::VfpToInt32, &[x, flags])
                }),
                TwoMisc::Narrow(_) | TwoMisc::ShiftLong | TwoMisc::Swap | TwoMisc::Permute(_) => {
                    return false;
                }
            };
            self.vfp_store_reg64(ir, r, a.vd + pass);
        }
        true
    }

    fn trans_neon_vtbl(&mut self, ir: &mut Context, a: &ArgsNeonVtbl) -> bool {
        if !self.neon_regs_ok(&[a.vd, a.vn, a.vm], &[]) {
            return false;
        }
        let last = a.vn + a.len;
        if last > 31 || !self.dregs_ok(&[last]) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let def = if a.op != 0 {
            self.vfp_load_reg64(ir, a.vd)
        } else {
            ir.new_const(Type::I64, 0)
        };
        let idx = self.vfp_load_reg64(ir, a.vm);
        let rn = self.const32(ir, a.vn as u32);
        let len = self.const32(ir, a.len as u32);
        let r = self.call64(ir, Helper::NeonTbl, &[idx, def, rn, len]);
        self.vfp_store_reg64(ir, r, a.vd);
        true
    }

    fn trans_neon_vdup_scalar(&mut self, ir: &mut Context, a: &ArgsNeonVdup) -> bool {
        let imm = a.imm as u32;
        let (size, index) = if imm & 1 != 0 {
            (0, imm >> 1)
        } else if imm & 2 != 0 {
            (1, imm >> 2)
        } else if imm & 4 != 0 {
            (2, imm >> 3)
        } else {
            return false;
        };
        let q = a.q != 0;
        let regs = [a.vd];
        let q_regs = q_only(q, &regs);
        if !self.neon_regs_ok(&[a.vd, a.vm], q_regs) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let r = self.neon_dup_scalar(ir, a.vm, index, size);
        for pass in 0..Self::passes(q) {
            self.vfp_store_reg64(ir, r, a.vd + pass);
        }
        true
    }

    fn trans_neon_3diff(&mut self, ir: &mut Context, a: &ArgsNeon3diff) -> bool {
        if a.size == 3 {
            return false;
        }
        let (size, u) = (a.size as u32, a.u != 0);
        match a.op {
            0 => self.do_3diff_long(ir, a, NeonLongOp::Add, None),
            1 => self.do_3diff_wide(ir, a, NeonOp::Add),
            2 => self.do_3diff_long(ir, a, NeonLongOp::Sub, None),
            3 => self.do_3diff_wide(ir, a, NeonOp::Sub),
            4 => self.do_3diff_narrow(ir, a, NeonOp::Add),
            5 => self.do_3diff_long(ir, a, NeonLongOp::Abd, Some(NeonOp::Add)),
            6 => self.do_3diff_narrow(ir, a, NeonOp::Sub),
            7 => self.do_3diff_long(ir, a, NeonLongOp::Abd, None),
            8 => self.do_3diff_long(ir, a, NeonLongOp::Mul, Some(NeonOp::Add)),
            9 if !u && size != 0 => self.do_3diff_long(ir, a, NeonLongOp::Qdmull, Some(NeonOp::QaddS)),
            10 => self.do_3diff_long(ir, a, NeonLongOp::Mul, Some(NeonOp::Sub)),
            11 if !u && size != 0 => self.do_3diff_long(ir, a, NeonLongOp::Qdmull, Some(NeonOp::QsubS)),
            12 => self.do_3diff_long(ir, a, NeonLongOp::Mul, None),
            13 if !u && size != 0 => self.do_3diff_long(ir, a, NeonLongOp::Qdmull, None),
            // VMULL.P64 needs the crypto extension.
            14 if !u && size == 0 => self.do_3diff_long(ir, a, NeonLongOp::Pmull, None),
            _ => self.neon_undef("3diff", a),
        }
    }

    fn trans_neon_2scalar(&mut self, ir: &mut Context, a: &ArgsNeon2scalar) -> bool {
        if a.size == 0 || a.size == 3 {
            return false;
        }
        let size = a.size as u32;
        let (reg, index) = if size == 1 {
            (a.vm & 7, ((a.vm >> 3) & 3) as u32)
        } else {
            (a.vm & 15, (a.vm >> 4) as u32)
        };
        let float = matches!(a.op, 1 | 5 | 9);
        if float && size != 2 {
            return false;
        }
        // Bit 24 is Q for the same-length forms and U for the long ones.
        let long = matches!(a.op, 2 | 3 | 6 | 7 | 10 | 11);
        let (q, u) = if long { (false, a.q != 0) } else { (a.q != 0, false) };
        if matches!(a.op, 3 | 7 | 11) && u {
            return false;
        }
        let regs = [a.vd, a.vn];
        let q_regs = if long { &regs[..1] } else { q_only(q, &regs) };
        if a.op >= 14 || !self.neon_regs_ok(&[a.vd, a.vn, reg], q_regs) {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let scalar = self.neon_dup_scalar(ir, reg, index, size);
        if long {
            let (op, acc) = match a.op {
                2 => (NeonLongOp::Mul, Some(NeonOp::Add)),
                3 => (NeonLongOp::Qdmull, Some(NeonOp::QaddS)),
                6 => (NeonLongOp::Mul, Some(NeonOp::Sub)),
                7 => (NeonLongOp::Qdmull, Some(NeonOp::QsubS)),
                10 => (NeonLongOp::Mul, None),
                _ => (NeonLongOp::Qdmull, None),
            };
            let n = self.vfp_load_reg64(ir, a.vn);
            let m = self.neon_half(ir, scalar, false);
            let mut res = [TempIdx(0); 2];
            for (pass, r) in res.iter_mut().enumerate() {
                let nh = self.neon_half(ir, n, pass == 1);
                *r = self.neon_long(ir, op, u, size, nh, m);
            }
            for (pass, r) in (0..).zip(res) {
                let r = match acc {
                    Some(acc) => {
                        let d = self.vfp_load_reg64(ir, a.vd + pass);
                        self.neon_binop(ir, acc, size + 1, d, r)
                    }
                    None => r,
                };
                self.vfp_store_reg64(ir, r, a.vd + pass);
            }
            return true;
        }
        let (mul, acc) = match a.op {
            0 => (NeonOp::Mul, Some(NeonOp::Add)),
            1 => (NeonOp::FMul, Some(NeonOp::FAdd)),
            4 => (NeonOp::Mul, Some(NeonOp::Sub)),
            5 => (NeonOp::FMul, Some(NeonOp::FSub)),
            8 => (NeonOp::Mul, None),
            9 => (NeonOp::FMul, None),
            12 => (NeonOp::Qdmulh, None),
            _ => (NeonOp::Qrdmulh, None),
        };
        for pass in 0..Self::passes(q) {
            let n = self.vfp_load_reg64(ir, a.vn + pass);
            let p = self.neon_binop(ir, mul, size, n, scalar);
            let r = match acc {
                Some(acc) => {
                    let d = self.vfp_load_reg64(ir, a.vd + pass);
                    self.neon_binop(ir, acc, size, d, p)
                }
                None => p,
            };
            self.vfp_store_reg64(ir, r, a.vd + pass);
        }
        true
    }

    fn trans_vldst_multiple(&mut self, ir: &mut Context, a: &ArgsVldstMultiple) -> bool {
        self.do_vldst_multiple(ir, a)
    }

    fn trans_vld_all_lanes(&mut self, ir: &mut Context, a: &ArgsVldAllLanes) -> bool {
        let nregs = a.n + 1;
        let mut size = a.size as u32;
        let mut align = 0;
        if size == 3 {
            // VLD4.32 with 16-byte alignment.
            if nregs != 4 || a.a == 0 {
                return false;
            }
            size = 2;
            align = pow2_align(4);
        } else if a.a != 0 {
            align = match (nregs, size) {
                (1, 0) | (3, _) => return false,
                (1, _) => MemOp::ALIGN,
                (2, _) => pow2_align(size + 1),
                (_, 2) => pow2_align(3),
                _ => pow2_align(size + 2),
            };
        }
        // VLD1 uses T for the number of registers written, VLD2-4 for
        // the register stride.
        let stride = if a.t != 0 { 2 } else { 1 };
        let copies = if nregs == 1 { stride } else { 1 };
        let last = if nregs == 1 {
            a.vd + copies - 1
        } else {
            a.vd + stride * (nregs - 1)
        };
        if !self.cfg.neon() || !self.dregs_ok(&[a.vd, last]) || last > 31 {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let idx = self.get_mem_index();
        let addr = self.load_reg(ir, a.rn);
        let mut vd = a.vd;
        for _ in 0..nregs {
            let t = ir.new_temp(Type::I32);
            self.gen_aa32_ld_i32(ir, t, addr, idx, MemOp::from_size(size).with(align));
            let w = ir.new_temp(Type::I64);
            ir.gen_ext_u32_i64(w, t);
            ir.gen_muli(Type::I64, w, w, dup_mult(size));
            for c in 0..copies {
                self.vfp_store_reg64(ir, w, vd + c);
            }
            ir.gen_addi(Type::I32, addr, addr, 1 << size);
            vd += stride;
            align = 0;
        }
        self.gen_neon_ldst_base_update(ir, a.rm, a.rn, (nregs as u32) << size);
        true
    }

    fn trans_vldst_single(&mut self, ir: &mut Context, a: &ArgsVldstSingle) -> bool {
        if a.size == 3 {
            return false;
        }
        let size = a.size as u32;
        let nregs = a.n + 1;
        let (index, align_f, stride) = single_lane_fields(size, a.ia);
        let bad = match nregs {
            1 => stride != 1 || align_f & (1 << size) != 0 || (size == 2 && (align_f == 1 || align_f == 2)),
            2 => size == 2 && align_f & 2 != 0,
            3 => align_f != 0,
            _ => size == 2 && align_f == 3,
        };
        if bad {
            return self.neon_undef("single lane", a);
        }
        let last = a.vd + stride * (nregs - 1);
        if !self.cfg.neon() || !self.dregs_ok(&[a.vd]) || last > 31 {
            return false;
        }
        if !self.vfp_access_check(ir) {
            return true;
        }
        let mut align = match (align_f, nregs) {
            (0, _) => 0,
            (_, 1) => MemOp::ALIGN,
            (_, 2) => pow2_align(size + 1),
            (_, _) if size == 2 => pow2_align(size + align_f as u32),
            _ => pow2_align(size + 2),
        };
        let idx = self.get_mem_index();
        let addr = self.load_reg(ir, a.rn);
        let mut vd = a.vd;
        for _ in 0..nregs {
            let op = MemOp::from_size(size).with(align);
            if a.l != 0 {
                let t = ir.new_temp(Type::I32);
                self.gen_aa32_ld_i32(ir, t, addr, idx, op);
                self.neon_store_element(ir, Type::I32, vd, index, size, t);
            } else {
                let t = self.neon_load_element(ir, Type::I32, vd, index, size);
                self.gen_aa32_st_i32(ir, t, addr, idx, op);
            }
            vd += stride;
            ir.gen_addi(Type::I32, addr, addr, 1 << size);
            align = 0;
        }
        self.gen_neon_ldst_base_update(ir, a.rm, a.rn, (nregs as u32) << size);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modified_immediates() {
        assert_eq!(asimd_imm_const(0xab, 0, false), 0x0000_00ab_0000_00ab);
        assert_eq!(asimd_imm_const(0xab, 6, false), 0xab00_0000_ab00_0000);
        assert_eq!(asimd_imm_const(0xab, 8, false), 0x00ab_00ab_00ab_00ab);
        assert_eq!(asimd_imm_const(0xab, 12, false), 0x0000_abff_0000_abff);
        assert_eq!(asimd_imm_const(0xab, 13, false), 0x00ab_ffff_00ab_ffff);
        assert_eq!(asimd_imm_const(0xab, 14, false), 0xabab_abab_abab_abab);
        assert_eq!(asimd_imm_const(0x81, 14, true), 0xff00_0000_0000_00ff);
        // 1.0f and -2.0f
        assert_eq!(asimd_imm_const(0x70, 15, false), 0x3f80_0000_3f80_0000);
        assert_eq!(asimd_imm_const(0x80, 15, false), 0xc000_0000_c000_0000);
    }

    #[test]
    fn three_same_table() {
        assert_eq!(three_same(8, false, false, 3), Some((ThreeSame::Op(NeonOp::Add), true)));
        assert_eq!(three_same(0, false, true, 3), Some((ThreeSame::Op(NeonOp::HaddU), false)));
        assert_eq!(three_same(4, false, false, 0), Some((ThreeSame::Shift(NeonOp::ShlS), true)));
        assert_eq!(three_same(1, true, true, 1), Some((ThreeSame::Logic(5), true)));
        assert_eq!(three_same(9, true, true, 1), Some((ThreeSame::Op(NeonOp::Pmul), false)));
        assert_eq!(three_same(13, false, false, 2), Some((ThreeSame::Op(NeonOp::FSub), true)));
        assert_eq!(three_same(13, false, false, 1), Some((ThreeSame::Op(NeonOp::FAdd), false)));
        assert_eq!(three_same(12, false, false, 0), None);
    }

    #[test]
    fn two_misc_table() {
        assert_eq!(two_misc(0, 2, false), Some((TwoMisc::Unary(NeonUnary::Rev64), true)));
        assert_eq!(two_misc(2, 1, false), Some((TwoMisc::Unary(NeonUnary::Rev16), false)));
        assert_eq!(two_misc(35, 2, false), Some((TwoMisc::Permute(NeonPermuteOp::Zip), false)));
        assert_eq!(two_misc(35, 2, true), Some((TwoMisc::Permute(NeonPermuteOp::Zip), true)));
        assert_eq!(two_misc(36, 1, true), Some((TwoMisc::Narrow(NeonNarrowOp::Qmovun), true)));
        assert_eq!(two_misc(21, 2, false), None);
        let Some((TwoMisc::CvtRound(flags), true)) = two_misc(55, 2, false) else {
            panic!("VCVTM.U32 not decoded");
        };
        assert_eq!(flags & CVT_SIGNED, 0);
        assert_eq!(flags >> CVT_RMODE_SHIFT & 7, FpRounding::NegInf as u32);
    }

    #[test]
    fn shift_immediates() {
        assert_eq!(shift_size(false, 0b001_011), Some((0, 8)));
        assert_eq!(shift_size(false, 0b010_000), Some((1, 16)));
        assert_eq!(shift_size(false, 0b111_111), Some((2, 32)));
        assert_eq!(shift_size(true, 0), Some((3, 64)));
        assert_eq!(shift_size(false, 0b000_111), None);
    }

    #[test]
    fn single_lane_index_align() {
        assert_eq!(single_lane_fields(0, 0b1110), (7, 0, 1));
        assert_eq!(single_lane_fields(1, 0b1010), (2, 2, 2));
        assert_eq!(single_lane_fields(2, 0b1101), (1, 5, 2));
    }
}
