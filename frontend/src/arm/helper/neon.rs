//! Advanced SIMD helpers.
//!
//! Operands are whole 64-bit D-register values with lane `i` of a
//! `8 << size`-bit element in bits `[i * esize +: esize]`. Q-register
//! operations call these once per half. Floating-point lanes use the
//! standard FPSCR; saturation sets FPSCR.QC.

use super::vfp::{self, FpOp, FpRounding, FpStatus, F32, FPSCR_DZC, FPSCR_IOC, FPSCR_IXC};
use super::vfp::{FPSCR_OFC, FPSCR_QC, FPSCR_UFC, FP_STANDARD};
use crate::arm::cpu::ArmCpu;

fn mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1 << bits) - 1
    }
}

fn lane(v: u64, i: u32, bits: u32) -> u64 {
    if bits >= 64 {
        v
    } else {
        (v >> (i * bits)) & mask(bits)
    }
}

fn sext(v: u64, bits: u32) -> i64 {
    ((v << (64 - bits)) as i64) >> (64 - bits)
}

/// Lane value as a wide integer, sign- or zero-extended.
fn wide(v: u64, bits: u32, signed: bool) -> i128 {
    if signed {
        sext(v, bits) as i128
    } else {
        (v & mask(bits)) as i128
    }
}

fn set_qc(cpu: &mut ArmCpu) {
    vfp::raise(cpu, FPSCR_QC);
}

/// Saturate `v` to a `bits`-wide signed or unsigned integer.
fn saturate(cpu: &mut ArmCpu, v: i128, bits: u32, signed: bool) -> u64 {
    let (min, max) = if signed {
        (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
    } else {
        (0, (1i128 << bits) - 1)
    };
    let r = if v < min {
        set_qc(cpu);
        min
    } else if v > max {
        set_qc(cpu);
        max
    } else {
        v
    };
    r as u64 & mask(bits)
}

/// Apply `f` lane-wise to `a` and `b`.
fn map2(a: u64, b: u64, size: u32, mut f: impl FnMut(u64, u64, u32) -> u64) -> u64 {
    let bits = 8 << size;
    let mut r = 0;
    for i in 0..64 / bits {
        r |= (f(lane(a, i, bits), lane(b, i, bits), bits) & mask(bits)) << (i * bits);
    }
    r
}

fn map1(a: u64, size: u32, mut f: impl FnMut(u64, u32) -> u64) -> u64 {
    map2(a, 0, size, |x, _, bits| f(x, bits))
}

/// Pairwise: the low half of the result comes from adjacent lanes of
/// `a`, the high half from `b`.
fn pairwise(a: u64, b: u64, size: u32, mut f: impl FnMut(u64, u64, u32) -> u64) -> u64 {
    let bits = 8 << size;
    let n = 64 / bits;
    let mut r = 0;
    for i in 0..n {
        let src = if i < n / 2 { a } else { b };
        let j = (i % (n / 2)) * 2;
        let v = f(lane(src, j, bits), lane(src, j + 1, bits), bits);
        r |= (v & mask(bits)) << (i * bits);
    }
    r
}

fn all_ones_if(c: bool, bits: u32) -> u64 {
    if c {
        mask(bits)
    } else {
        0
    }
}

/// Shift right by `n` with rounding, `n` in `1..`.
fn round_shr(v: i128, n: u32) -> i128 {
    let n = n.min(127);
    (v + (1i128 << (n - 1))) >> n
}

/// Shift by a signed register amount (VSHL, VRSHL, VQSHL, VQRSHL).
fn shift_by_reg(
    cpu: &mut ArmCpu,
    a: u64,
    shift: u64,
    bits: u32,
    signed: bool,
    round: bool,
    sat: bool,
) -> u64 {
    let s = shift as u8 as i8 as i32;
    let v = wide(a, bits, signed);
    if s >= 0 {
        if v == 0 {
            return 0;
        }
        let s = s.min(100) as u32;
        let r = v << s;
        if sat {
            return saturate(cpu, r, bits, signed);
        }
        return r as u64 & mask(bits);
    }
    let n = (-s) as u32;
    let r = if round {
        round_shr(v, n)
    } else {
        v >> n.min(127)
    };
    r as u64 & mask(bits)
}

fn clmul(a: u64, b: u64, bits: u32) -> u64 {
    let mut r = 0;
    for i in 0..bits {
        if (b >> i) & 1 != 0 {
            r ^= a << i;
        }
    }
    r
}

fn float_bin(cpu: &mut ArmCpu, a: u64, b: u64, op: FpOp) -> u64 {
    vfp::arith(cpu, F32, a, b, op as u32 | FP_STANDARD)
}

fn float_cmp(cpu: &mut ArmCpu, a: u64, b: u64, ge: bool, eq: bool, signaling: bool) -> u64 {
    let st = FpStatus::for_sel(cpu, FP_STANDARD);
    let r = vfp::compare(cpu, F32, st, a, b, signaling);
    let hit = match r {
        Some(std::cmp::Ordering::Greater) => ge,
        Some(std::cmp::Ordering::Equal) => eq,
        _ => false,
    };
    all_ones_if(hit, 32)
}

// ── Lane-wise binary operations ─────────────────────────────────

/// Two-operand lane operation for `Helper::NeonBinop`; the helper
/// argument is `op << 2 | size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum NeonOp {
    HaddS,
    HaddU,
    RhaddS,
    RhaddU,
    HsubS,
    HsubU,
    QaddS,
    QaddU,
    QsubS,
    QsubU,
    CgtS,
    CgtU,
    CgeS,
    CgeU,
    Tst,
    Ceq,
    /// Shift the first operand by the signed low byte of the second.
    ShlS,
    ShlU,
    RshlS,
    RshlU,
    QshlS,
    QshlU,
    QrshlS,
    QrshlU,
    MaxS,
    MaxU,
    MinS,
    MinU,
    AbdS,
    AbdU,
    Add,
    Sub,
    Mul,
    /// Polynomial multiply over GF(2), 8-bit lanes.
    Pmul,
    Padd,
    PmaxS,
    PmaxU,
    PminS,
    PminU,
    Qdmulh,
    Qrdmulh,
    FAdd,
    FSub,
    FMul,
    FAbd,
    FMax,
    FMin,
    FMaxNum,
    FMinNum,
    FRecps,
    FRsqrts,
    FCeq,
    FCge,
    FCgt,
    FAcge,
    FAcgt,
    FPadd,
    FPmax,
    FPmin,
}

impl NeonOp {
    const ALL: [NeonOp; 59] = [
        Self::HaddS,
        Self::HaddU,
        Self::RhaddS,
        Self::RhaddU,
        Self::HsubS,
        Self::HsubU,
        Self::QaddS,
        Self::QaddU,
        Self::QsubS,
        Self::QsubU,
        Self::CgtS,
        Self::CgtU,
        Self::CgeS,
        Self::CgeU,
        Self::Tst,
        Self::Ceq,
        Self::ShlS,
        Self::ShlU,
        Self::RshlS,
        Self::RshlU,
        Self::QshlS,
        Self::QshlU,
        Self::QrshlS,
        Self::QrshlU,
        Self::MaxS,
        Self::MaxU,
        Self::MinS,
        Self::MinU,
        Self::AbdS,
        Self::AbdU,
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Pmul,
        Self::Padd,
        Self::PmaxS,
        Self::PmaxU,
        Self::PminS,
        Self::PminU,
        Self::Qdmulh,
        Self::Qrdmulh,
        Self::FAdd,
        Self::FSub,
        Self::FMul,
        Self::FAbd,
        Self::FMax,
        Self::FMin,
        Self::FMaxNum,
        Self::FMinNum,
        Self::FRecps,
        Self::FRsqrts,
        Self::FCeq,
        Self::FCge,
        Self::FCgt,
        Self::FAcge,
        Self::FAcgt,
        Self::FPadd,
        Self::FPmax,
        Self::FPmin,
    ];

    /// Helper argument for this op on `8 << size`-bit lanes.
    pub const fn sel(self, size: u32) -> u32 {
        (self as u32) << 2 | size
    }

    fn from_sel(sel: u32) -> Option<(Self, u32)> {
        Self::ALL.get((sel >> 2) as usize).map(|&op| (op, sel & 3))
    }
}

pub fn binop(cpu: &mut ArmCpu, a: u64, b: u64, sel: u32) -> u64 {
    let Some((op, size)) = NeonOp::from_sel(sel) else {
        log::error!("bad Neon op selector {sel:#x}");
        return 0;
    };
    use NeonOp::*;
    let signed = matches!(
        op,
        HaddS | RhaddS | HsubS | QaddS | QsubS | CgtS | CgeS | ShlS | RshlS | QshlS | QrshlS
            | MaxS | MinS | AbdS | PmaxS | PminS
    );
    match op {
        Padd => pairwise(a, b, size, |x, y, _| x.wrapping_add(y)),
        PmaxS | PmaxU | PminS | PminU => pairwise(a, b, size, |x, y, bits| {
            let (vx, vy) = (wide(x, bits, signed), wide(y, bits, signed));
            let max = matches!(op, PmaxS | PmaxU);
            if (vx >= vy) == max {
                x
            } else {
                y
            }
        }),
        FPadd => pairwise(a, b, 2, |x, y, _| float_bin(cpu, x, y, FpOp::Add)),
        FPmax => pairwise(a, b, 2, |x, y, _| float_bin(cpu, x, y, FpOp::Max)),
        FPmin => pairwise(a, b, 2, |x, y, _| float_bin(cpu, x, y, FpOp::Min)),
        _ => map2(a, b, size, |x, y, bits| {
            let (vx, vy) = (wide(x, bits, signed), wide(y, bits, signed));
            match op {
                HaddS | HaddU => ((vx + vy) >> 1) as u64,
                RhaddS | RhaddU => ((vx + vy + 1) >> 1) as u64,
                HsubS | HsubU => ((vx - vy) >> 1) as u64,
                QaddS | QaddU => saturate(cpu, vx + vy, bits, signed),
                QsubS | QsubU => saturate(cpu, vx - vy, bits, signed),
                CgtS | CgtU => all_ones_if(vx > vy, bits),
                CgeS | CgeU => all_ones_if(vx >= vy, bits),
                Tst => all_ones_if(x & y != 0, bits),
                Ceq => all_ones_if(x == y, bits),
                ShlS | ShlU => shift_by_reg(cpu, x, y, bits, signed, false, false),
                RshlS | RshlU => shift_by_reg(cpu, x, y, bits, signed, true, false),
                QshlS | QshlU => shift_by_reg(cpu, x, y, bits, signed, false, true),
                QrshlS | QrshlU => shift_by_reg(cpu, x, y, bits, signed, true, true),
                MaxS | MaxU => vx.max(vy) as u64,
                MinS | MinU => vx.min(vy) as u64,
                AbdS | AbdU => (vx - vy).unsigned_abs() as u64,
                Add => x.wrapping_add(y),
                Sub => x.wrapping_sub(y),
                Mul => x.wrapping_mul(y),
                Pmul => clmul(x, y, bits),
                Qdmulh | Qrdmulh => {
                    let (sx, sy) = (sext(x, bits) as i128, sext(y, bits) as i128);
                    let mut p = 2 * sx * sy;
                    if op == Qrdmulh {
                        p += 1 << (bits - 1);
                    }
                    saturate(cpu, p >> bits, bits, true)
                }
                FAdd => float_bin(cpu, x, y, FpOp::Add),
                FSub => float_bin(cpu, x, y, FpOp::Sub),
                FMul => float_bin(cpu, x, y, FpOp::Mul),
                FAbd => float_bin(cpu, x, y, FpOp::Abd),
                FMax => float_bin(cpu, x, y, FpOp::Max),
                FMin => float_bin(cpu, x, y, FpOp::Min),
                FMaxNum => float_bin(cpu, x, y, FpOp::MaxNum),
                FMinNum => float_bin(cpu, x, y, FpOp::MinNum),
                FRecps => float_bin(cpu, x, y, FpOp::RecipStep),
                FRsqrts => float_bin(cpu, x, y, FpOp::RsqrtStep),
                FCeq => float_cmp(cpu, x, y, false, true, false),
                FCge => float_cmp(cpu, x, y, true, true, true),
                FCgt => float_cmp(cpu, x, y, true, false, true),
                FAcge => float_cmp(cpu, x & 0x7fff_ffff, y & 0x7fff_ffff, true, true, true),
                FAcgt => float_cmp(cpu, x & 0x7fff_ffff, y & 0x7fff_ffff, true, false, true),
                Padd | PmaxS | PmaxU | PminS | PminU | FPadd | FPmax | FPmin => unreachable!(),
            }
        }),
    }
}

/// Fused `d + (±a) * b` on single-precision lanes (VFMA, VFMS).
pub fn fma(cpu: &mut ArmCpu, a: u64, b: u64, d: u64, negate: bool) -> u64 {
    let sign = if negate { 0x8000_0000 } else { 0 };
    let mut r = 0;
    for i in 0..2 {
        let (x, y, z) = (lane(a, i, 32) ^ sign, lane(b, i, 32), lane(d, i, 32));
        r |= vfp::muladd(cpu, F32, x, y, z, FP_STANDARD) << (32 * i);
    }
    r
}

// ── Two-register miscellaneous ──────────────────────────────────

/// Operation for `Helper::NeonUnop`; the argument is `op << 2 | size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum NeonUnary {
    /// Reverse the elements within each doubleword.
    Rev64,
    Rev32,
    Rev16,
    /// Pairwise add into double-width lanes.
    PaddlS,
    PaddlU,
    Cls,
    Clz,
    Cnt,
    Qabs,
    Qneg,
    Cgt0,
    Cge0,
    Ceq0,
    Cle0,
    Clt0,
    Abs,
    Neg,
    FCgt0,
    FCge0,
    FCeq0,
    FCle0,
    FClt0,
    FAbs,
    FNeg,
    RecpeU,
    RsqrteU,
    RecpeF,
    RsqrteF,
    CvtSF,
    CvtUF,
    CvtFS,
    CvtFU,
}

impl NeonUnary {
    const ALL: [NeonUnary; 32] = [
        Self::Rev64,
        Self::Rev32,
        Self::Rev16,
        Self::PaddlS,
        Self::PaddlU,
        Self::Cls,
        Self::Clz,
        Self::Cnt,
        Self::Qabs,
        Self::Qneg,
        Self::Cgt0,
        Self::Cge0,
        Self::Ceq0,
        Self::Cle0,
        Self::Clt0,
        Self::Abs,
        Self::Neg,
        Self::FCgt0,
        Self::FCge0,
        Self::FCeq0,
        Self::FCle0,
        Self::FClt0,
        Self::FAbs,
        Self::FNeg,
        Self::RecpeU,
        Self::RsqrteU,
        Self::RecpeF,
        Self::RsqrteF,
        Self::CvtSF,
        Self::CvtUF,
        Self::CvtFS,
        Self::CvtFU,
    ];

    pub const fn sel(self, size: u32) -> u32 {
        (self as u32) << 2 | size
    }

    fn from_sel(sel: u32) -> Option<(Self, u32)> {
        Self::ALL.get((sel >> 2) as usize).map(|&op| (op, sel & 3))
    }
}

/// Reverse the order of `8 << size`-bit elements within each
/// `group`-bit container.
fn rev_within(a: u64, size: u32, group: u32) -> u64 {
    let bits = 8 << size;
    let per = group / bits;
    let mut r = 0;
    for i in 0..64 / bits {
        let base = i - i % per;
        let j = base + (per - 1 - i % per);
        r |= lane(a, i, bits) << (j * bits);
    }
    r
}

/// ARM RecipEstimate: `a` in 256..512, result in 256..512.
fn recip_estimate(a: u32) -> u32 {
    let a = a * 2 + 1;
    let b = (1 << 19) / a;
    (b + 1) / 2
}

/// ARM RecipSqrtEstimate: `a` in 128..512, result in 256..512.
fn rsqrt_estimate(a: u32) -> u32 {
    let a = if a < 256 {
        a * 2 + 1
    } else {
        (((a >> 1) << 1) + 1) * 2
    };
    let a = a as u64;
    let mut b = 512u64;
    while a * (b + 1) * (b + 1) < (1 << 28) {
        b += 1;
    }
    ((b + 1) / 2) as u32
}

fn recpe_u32(x: u32) -> u32 {
    if x & 0x8000_0000 == 0 {
        return u32::MAX;
    }
    recip_estimate(x >> 23) << 23
}

fn rsqrte_u32(x: u32) -> u32 {
    if x & 0xc000_0000 == 0 {
        return u32::MAX;
    }
    rsqrt_estimate(x >> 23) << 23
}

fn recpe_f32(cpu: &mut ArmCpu, x: u64) -> u64 {
    let st = FpStatus::for_sel(cpu, FP_STANDARD);
    let x = vfp::flush_input(cpu, F32, st, x);
    if let Some(n) = vfp::process_nans(cpu, F32, st, &[x]) {
        return n;
    }
    let sign = x & 0x8000_0000;
    let exp = ((x >> 23) & 0xff) as i32;
    let frac = x & 0x7f_ffff;
    if exp == 0xff {
        return sign;
    }
    if exp == 0 && frac == 0 {
        vfp::raise(cpu, FPSCR_DZC);
        return sign | 0x7f80_0000;
    }
    if exp == 0 {
        // Only reachable with FZ clear: a denormal whose reciprocal
        // overflows.
        vfp::raise(cpu, FPSCR_OFC | FPSCR_IXC);
        return sign | 0x7f80_0000;
    }
    if exp >= 253 {
        vfp::raise(cpu, FPSCR_UFC);
        return sign;
    }
    let scaled = (0x100 | (frac >> 15)) as u32;
    let estimate = recip_estimate(scaled) as u64;
    let result_exp = (253 - exp) as u64;
    sign | (result_exp << 23) | ((estimate & 0xff) << 15)
}

fn rsqrte_f32(cpu: &mut ArmCpu, x: u64) -> u64 {
    let st = FpStatus::for_sel(cpu, FP_STANDARD);
    let x = vfp::flush_input(cpu, F32, st, x);
    if let Some(n) = vfp::process_nans(cpu, F32, st, &[x]) {
        return n;
    }
    let sign = x & 0x8000_0000;
    let exp = ((x >> 23) & 0xff) as i32;
    let frac = x & 0x7f_ffff;
    if exp == 0 && frac == 0 {
        vfp::raise(cpu, FPSCR_DZC);
        return sign | 0x7f80_0000;
    }
    if sign != 0 {
        vfp::raise(cpu, FPSCR_IOC);
        return F32.default_nan();
    }
    if exp == 0xff {
        return 0;
    }
    let scaled = (if exp & 1 == 0 {
        0x100 | (frac >> 15)
    } else {
        0x80 | (frac >> 16)
    }) as u32;
    let result_exp = ((380 - exp) / 2) as u64;
    let estimate = rsqrt_estimate(scaled) as u64;
    (result_exp << 23) | ((estimate & 0xff) << 15)
}

pub fn unop(cpu: &mut ArmCpu, a: u64, sel: u32) -> u64 {
    let Some((op, size)) = NeonUnary::from_sel(sel) else {
        log::error!("bad Neon unary selector {sel:#x}");
        return 0;
    };
    use NeonUnary::*;
    let st = FpStatus::for_sel(cpu, FP_STANDARD);
    match op {
        Rev64 => rev_within(a, size, 64),
        Rev32 => rev_within(a, size, 32),
        Rev16 => rev_within(a, size, 16),
        PaddlS | PaddlU => {
            let signed = op == PaddlS;
            let bits = 8 << size;
            map1(a, size + 1, |v, _| {
                let lo = wide(v, bits, signed);
                let hi = wide(v >> bits, bits, signed);
                (lo + hi) as u64
            })
        }
        _ => map1(a, size, |x, bits| match op {
            Cls => {
                let v = sext(x, bits);
                let v = (if v < 0 { !v } else { v }) as u64;
                (v.leading_zeros() - (64 - bits)) as u64 - 1
            }
            Clz => (x.leading_zeros() - (64 - bits)) as u64,
            Cnt => x.count_ones() as u64,
            Qabs => saturate(cpu, (sext(x, bits) as i128).abs(), bits, true),
            Qneg => saturate(cpu, -(sext(x, bits) as i128), bits, true),
            Cgt0 => all_ones_if(sext(x, bits) > 0, bits),
            Cge0 => all_ones_if(sext(x, bits) >= 0, bits),
            Ceq0 => all_ones_if(x == 0, bits),
            Cle0 => all_ones_if(sext(x, bits) <= 0, bits),
            Clt0 => all_ones_if(sext(x, bits) < 0, bits),
            Abs => sext(x, bits).unsigned_abs(),
            Neg => x.wrapping_neg(),
            FCgt0 => float_cmp(cpu, x, 0, true, false, true),
            FCge0 => float_cmp(cpu, x, 0, true, true, true),
            FCeq0 => float_cmp(cpu, x, 0, false, true, false),
            FCle0 => float_cmp(cpu, 0, x, true, true, true),
            FClt0 => float_cmp(cpu, 0, x, true, false, true),
            FAbs => x & 0x7fff_ffff,
            FNeg => x ^ 0x8000_0000,
            RecpeU => recpe_u32(x as u32) as u64,
            RsqrteU => rsqrte_u32(x as u32) as u64,
            RecpeF => recpe_f32(cpu, x),
            RsqrteF => rsqrte_f32(cpu, x),
            CvtSF => vfp::from_fixed(cpu, F32, st, x, 0, true, 32),
            CvtUF => vfp::from_fixed(cpu, F32, st, x, 0, false, 32),
            CvtFS => vfp::to_fixed(cpu, F32, st, x, 0, true, 32, FpRounding::Zero),
            CvtFU => vfp::to_fixed(cpu, F32, st, x, 0, false, 32, FpRounding::Zero),
            Rev64 | Rev32 | Rev16 | PaddlS | PaddlU => unreachable!(),
        }),
    }
}

// ── Long and narrow ─────────────────────────────────────────────

/// Operation for `Helper::NeonLong`: two 32-bit halves of `8 << size`
/// lanes produce one 64-bit value of double-width lanes. The argument
/// is `op << 3 | unsigned << 2 | size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum NeonLongOp {
    /// Widen the first operand only.
    Widen,
    Add,
    Sub,
    Abd,
    Mul,
    /// Saturating doubling multiply, signed only.
    Qdmull,
    /// Polynomial multiply, 8-bit lanes only.
    Pmull,
}

impl NeonLongOp {
    const ALL: [NeonLongOp; 7] = [
        Self::Widen,
        Self::Add,
        Self::Sub,
        Self::Abd,
        Self::Mul,
        Self::Qdmull,
        Self::Pmull,
    ];

    pub const fn sel(self, unsigned: bool, size: u32) -> u32 {
        (self as u32) << 3 | (unsigned as u32) << 2 | size
    }
}

pub fn long(cpu: &mut ArmCpu, a: u32, b: u32, sel: u32) -> u64 {
    let Some(&op) = NeonLongOp::ALL.get((sel >> 3) as usize) else {
        log::error!("bad Neon long selector {sel:#x}");
        return 0;
    };
    let signed = sel & 4 == 0;
    let size = sel & 3;
    let bits = 8 << size;
    let mut r = 0u64;
    for i in 0..32 / bits {
        let x = lane(a as u64, i, bits);
        let y = lane(b as u64, i, bits);
        let (vx, vy) = (wide(x, bits, signed), wide(y, bits, signed));
        let v = match op {
            NeonLongOp::Widen => vx as u64,
            NeonLongOp::Add => (vx + vy) as u64,
            NeonLongOp::Sub => (vx - vy) as u64,
            NeonLongOp::Abd => (vx - vy).unsigned_abs() as u64,
            NeonLongOp::Mul => (vx * vy) as u64,
            NeonLongOp::Qdmull => {
                saturate(cpu, 2 * sext(x, bits) as i128 * sext(y, bits) as i128, 2 * bits, true)
            }
            NeonLongOp::Pmull => clmul(x, y, bits),
        };
        r |= (v & mask(2 * bits)) << (i * 2 * bits);
    }
    r
}

/// Operation for `Helper::NeonNarrow`; the argument is
/// `op << 2 | size` with `size` the destination lane size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum NeonNarrowOp {
    /// Keep the low half of each lane.
    Movn,
    /// Signed to signed, saturating.
    QmovnS,
    /// Unsigned to unsigned, saturating.
    QmovnU,
    /// Signed to unsigned, saturating.
    Qmovun,
    /// Keep the high half (VADDHN, VSUBHN).
    High,
    /// Rounded high half (VRADDHN, VRSUBHN).
    RoundHigh,
}

impl NeonNarrowOp {
    const ALL: [NeonNarrowOp; 6] = [
        Self::Movn,
        Self::QmovnS,
        Self::QmovnU,
        Self::Qmovun,
        Self::High,
        Self::RoundHigh,
    ];

    pub const fn sel(self, size: u32) -> u32 {
        (self as u32) << 2 | size
    }
}

/// Narrow the double-width lanes of `lo` then `hi` into one value.
pub fn narrow(cpu: &mut ArmCpu, lo: u64, hi: u64, sel: u32) -> u64 {
    let Some(&op) = NeonNarrowOp::ALL.get((sel >> 2) as usize) else {
        log::error!("bad Neon narrow selector {sel:#x}");
        return 0;
    };
    let bits = 8 << (sel & 3);
    let wbits = 2 * bits;
    let per = 64 / wbits;
    let mut r = 0u64;
    for i in 0..2 * per {
        let src = if i < per { lo } else { hi };
        let x = lane(src, i % per, wbits);
        let v = match op {
            NeonNarrowOp::Movn => x,
            NeonNarrowOp::QmovnS => saturate(cpu, sext(x, wbits) as i128, bits, true),
            NeonNarrowOp::QmovnU => saturate(cpu, x as i128, bits, false),
            NeonNarrowOp::Qmovun => saturate(cpu, sext(x, wbits) as i128, bits, false),
            NeonNarrowOp::High => x >> bits,
            NeonNarrowOp::RoundHigh => (x.wrapping_add(1 << (bits - 1)) & mask(wbits)) >> bits,
        };
        r |= (v & mask(bits)) << (i * bits);
    }
    r
}

// ── Shifts by immediate ─────────────────────────────────────────

/// Operation for `Helper::NeonShiftImm`; the argument is
/// `op << 2 | size`. Right shifts take `1..=esize`, left shifts
/// `0..esize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum NeonShiftOp {
    ShrS,
    ShrU,
    RshrS,
    RshrU,
    Shl,
    QshlS,
    QshlU,
    /// Signed input, unsigned saturation.
    Qshlu,
}

impl NeonShiftOp {
    const ALL: [NeonShiftOp; 8] = [
        Self::ShrS,
        Self::ShrU,
        Self::RshrS,
        Self::RshrU,
        Self::Shl,
        Self::QshlS,
        Self::QshlU,
        Self::Qshlu,
    ];

    pub const fn sel(self, size: u32) -> u32 {
        (self as u32) << 2 | size
    }
}

pub fn shift_imm(cpu: &mut ArmCpu, a: u64, shift: u32, sel: u32) -> u64 {
    let Some(&op) = NeonShiftOp::ALL.get((sel >> 2) as usize) else {
        log::error!("bad Neon shift selector {sel:#x}");
        return 0;
    };
    let n = shift.min(100);
    map1(a, sel & 3, |x, bits| match op {
        NeonShiftOp::ShrS => (wide(x, bits, true) >> n) as u64,
        NeonShiftOp::ShrU => (wide(x, bits, false) >> n) as u64,
        NeonShiftOp::RshrS => round_shr(wide(x, bits, true), n.max(1)) as u64,
        NeonShiftOp::RshrU => round_shr(wide(x, bits, false), n.max(1)) as u64,
        NeonShiftOp::Shl => (wide(x, bits, false) << n) as u64,
        NeonShiftOp::QshlS => saturate(cpu, wide(x, bits, true) << n, bits, true),
        NeonShiftOp::QshlU => saturate(cpu, wide(x, bits, false) << n, bits, false),
        NeonShiftOp::Qshlu => saturate(cpu, wide(x, bits, true) << n, bits, false),
    })
}

/// VSRI (`sel` bit 2 clear) and VSLI: shift `a` and insert it into
/// `d`, keeping the bits of `d` the shift vacates.
pub fn shift_insert(d: u64, a: u64, shift: u32, sel: u32) -> u64 {
    let left = sel & 4 != 0;
    map2(d, a, sel & 3, |x, y, bits| {
        if shift >= bits {
            return x;
        }
        let m = if left {
            (mask(bits) << shift) & mask(bits)
        } else {
            mask(bits) >> shift
        };
        let v = if left { y << shift } else { y >> shift };
        (x & !m) | (v & m)
    })
}

// ── Permutes and tables ─────────────────────────────────────────

/// Operation for `Helper::NeonPermute`; the argument is
/// `op << 3 | q << 2 | size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum NeonPermuteOp {
    Trn,
    Uzp,
    Zip,
}

impl NeonPermuteOp {
    pub const fn sel(self, q: bool, size: u32) -> u32 {
        (self as u32) << 3 | (q as u32) << 2 | size
    }
}

fn read_elems(cpu: &ArmCpu, reg: usize, regs: usize, bits: u32) -> Vec<u64> {
    let mut v = Vec::new();
    for r in reg..reg + regs {
        let d = cpu.env.vfp.zregs[r & 31];
        v.extend((0..64 / bits).map(|i| lane(d, i, bits)));
    }
    v
}

fn write_elems(cpu: &mut ArmCpu, reg: usize, elems: &[u64], bits: u32) {
    let per = (64 / bits) as usize;
    for (k, chunk) in elems.chunks(per).enumerate() {
        let mut d = 0;
        for (i, &e) in chunk.iter().enumerate() {
            d |= (e & mask(bits)) << (i as u32 * bits);
        }
        cpu.env.vfp.zregs[(reg + k) & 31] = d;
    }
}

/// VTRN, VUZP and VZIP on D registers `rd` and `rm` (Q registers
/// when `q`), in place.
pub fn permute(cpu: &mut ArmCpu, rd: u32, rm: u32, sel: u32) {
    let bits = 8 << (sel & 3);
    let regs = if sel & 4 != 0 { 2 } else { 1 };
    let (rd, rm) = (rd as usize, rm as usize);
    let mut d = read_elems(cpu, rd, regs, bits);
    let mut m = read_elems(cpu, rm, regs, bits);
    let n = d.len();
    match sel >> 3 {
        0 => {
            for i in (0..n).step_by(2) {
                std::mem::swap(&mut d[i + 1], &mut m[i]);
            }
        }
        1 => {
            let all: Vec<u64> = d.iter().chain(m.iter()).copied().collect();
            d = all.iter().step_by(2).copied().collect();
            m = all.iter().skip(1).step_by(2).copied().collect();
        }
        2 => {
            let all: Vec<u64> = d.iter().zip(m.iter()).flat_map(|(&x, &y)| [x, y]).collect();
            d = all[..n].to_vec();
            m = all[n..].to_vec();
        }
        op => {
            log::error!("bad Neon permute op {op}");
            return;
        }
    }
    write_elems(cpu, rd, &d, bits);
    write_elems(cpu, rm, &m, bits);
}

/// VTBL/VTBX: look up each byte of `idx` in the table of `len + 1`
/// registers starting at D`rn`; out-of-range indices take the byte of
/// `def`.
pub fn tbl(cpu: &mut ArmCpu, idx: u64, def: u64, rn: u32, len: u32) -> u64 {
    let table = read_elems(cpu, rn as usize, len as usize + 1, 8);
    let mut r = 0;
    for i in 0..8 {
        let k = lane(idx, i, 8) as usize;
        let byte = table.get(k).copied().unwrap_or_else(|| lane(def, i, 8));
        r |= byte << (i * 8);
    }
    r
}

/// Fixed-point conversion of single-precision lanes: `sel` bit 0
/// selects unsigned, bit 1 float-to-fixed.
pub fn cvt_fixed(cpu: &mut ArmCpu, a: u64, shift: u32, sel: u32) -> u64 {
    let signed = sel & 1 == 0;
    let to_fixed = sel & 2 != 0;
    let st = FpStatus::for_sel(cpu, FP_STANDARD);
    map1(a, 2, |x, _| {
        if to_fixed {
            vfp::to_fixed(cpu, F32, st, x, shift, signed, 32, FpRounding::Zero)
        } else {
            vfp::from_fixed(cpu, F32, st, x, shift, signed, 32)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::config::ArmCpuConfig;
    use crate::arm::cpu::VFP_FPSCR;

    fn cpu() -> ArmCpu {
        ArmCpu::new(ArmCpuConfig::cortex_a15()).expect("cpu")
    }

    fn qc(cpu: &ArmCpu) -> bool {
        cpu.env.vfp.xregs[VFP_FPSCR] & FPSCR_QC != 0
    }

    #[test]
    fn saturating_add_sets_qc() {
        let mut c = cpu();
        let r = binop(&mut c, 0x7f01, 0x0101, NeonOp::QaddS.sel(0));
        assert_eq!(r, 0x7f02);
        assert!(qc(&c));
        let mut c = cpu();
        assert_eq!(binop(&mut c, 0xfffe, 0x0001, NeonOp::QaddU.sel(1)), 0xffff);
        assert!(!qc(&c));
    }

    #[test]
    fn register_shifts() {
        let mut c = cpu();
        // -1 as a shift count is a right shift by one.
        assert_eq!(binop(&mut c, 0x80, 0xff, NeonOp::ShlU.sel(0)), 0x40);
        assert_eq!(binop(&mut c, 0x80, 0xff, NeonOp::ShlS.sel(0)), 0xc0);
        assert_eq!(binop(&mut c, 0x03, 0xff, NeonOp::RshlU.sel(0)), 0x02);
        assert_eq!(binop(&mut c, 0x40, 0x02, NeonOp::QshlS.sel(0)), 0x7f);
        assert!(qc(&c));
    }

    #[test]
    fn pairwise_add() {
        let mut c = cpu();
        let r = binop(&mut c, 0x0004_0003_0002_0001, 0x0040_0030_0020_0010, NeonOp::Padd.sel(1));
        assert_eq!(r, 0x0070_0030_0007_0003);
    }

    #[test]
    fn reverse_and_count() {
        let mut c = cpu();
        assert_eq!(unop(&mut c, 0x0706_0504_0302_0100, NeonUnary::Rev64.sel(0)), 0x0001_0203_0405_0607);
        assert_eq!(unop(&mut c, 0x0706_0504_0302_0100, NeonUnary::Rev16.sel(0)), 0x0607_0405_0203_0001);
        assert_eq!(unop(&mut c, 0x0f01, NeonUnary::Cnt.sel(0)), 0x0401);
        assert_eq!(unop(&mut c, 0x0001_0000_8000, NeonUnary::Clz.sel(1)) & 0xffff, 0);
        assert_eq!(unop(&mut c, 0x00ff, NeonUnary::Cls.sel(0)) & 0xff, 7);
    }

    #[test]
    fn long_and_narrow() {
        let mut c = cpu();
        // Signed 8-bit multiply long: -1 * 2 = -2.
        let r = long(&mut c, 0xff, 0x02, NeonLongOp::Mul.sel(false, 0));
        assert_eq!(r & 0xffff, 0xfffe);
        let r = narrow(&mut c, 0x0000_0000_0000_0180, 0, NeonNarrowOp::QmovnU.sel(0));
        assert_eq!(r & 0xff, 0xff);
        assert!(qc(&c));
        let r = narrow(&mut c, 0x0000_0000_0000_0180, 0, NeonNarrowOp::High.sel(0));
        assert_eq!(r & 0xff, 0x01);
    }

    #[test]
    fn shift_and_insert() {
        let mut c = cpu();
        assert_eq!(shift_imm(&mut c, 0x81, 1, NeonShiftOp::ShrS.sel(0)) & 0xff, 0xc0);
        assert_eq!(shift_imm(&mut c, 0x81, 8, NeonShiftOp::ShrU.sel(0)) & 0xff, 0);
        assert_eq!(shift_imm(&mut c, 0x03, 1, NeonShiftOp::RshrU.sel(0)) & 0xff, 2);
        // VSRI #4 keeps the top nibble of the destination.
        assert_eq!(shift_insert(0xa0, 0xff, 4, 0) & 0xff, 0xaf);
        assert_eq!(shift_insert(0x0a, 0xff, 4, 4) & 0xff, 0xfa);
    }

    #[test]
    fn permutes() {
        let mut c = cpu();
        c.env.vfp.zregs[0] = 0x0706_0504_0302_0100;
        c.env.vfp.zregs[1] = 0x1716_1514_1312_1110;
        permute(&mut c, 0, 1, NeonPermuteOp::Zip.sel(false, 0));
        assert_eq!(c.env.vfp.zregs[0], 0x1303_1202_1101_1000);
        assert_eq!(c.env.vfp.zregs[1], 0x1707_1606_1505_1404);
        permute(&mut c, 0, 1, NeonPermuteOp::Uzp.sel(false, 0));
        assert_eq!(c.env.vfp.zregs[0], 0x0706_0504_0302_0100);
        assert_eq!(c.env.vfp.zregs[1], 0x1716_1514_1312_1110);
    }

    #[test]
    fn table_lookup() {
        let mut c = cpu();
        c.env.vfp.zregs[2] = 0x0706_0504_0302_0100;
        let r = tbl(&mut c, 0x0908_0007, 0xaaaa_aaaa, 2, 0);
        assert_eq!(r & 0xffff_ffff, 0xaaaa_0007);
    }

    #[test]
    fn estimates() {
        // 1/1.0 estimates to 0.998046875.
        let mut c = cpu();
        assert_eq!(recpe_f32(&mut c, 0x3f80_0000), 0x3f7f_8000);
        assert_eq!(recpe_u32(0x8000_0000), 0xff80_0000);
        assert_eq!(recpe_u32(0x7fff_ffff), u32::MAX);
        assert_eq!(rsqrte_u32(0x3fff_ffff), u32::MAX);
    }
}
