//! VFP helpers: IEEE arithmetic, comparison and conversion with ARM
//! NaN propagation, flush-to-zero and cumulative exception flags.
//!
//! The arithmetic itself runs on the host FPU under the guest rounding
//! mode; NaN selection, default-NaN and flushing are done in software
//! because x86 disagrees with ARM on all three.

use std::cmp::Ordering;

use libc::c_int;

use crate::arm::config::ArmFeature;
use crate::arm::cpu::{ArmCpu, VFP_FPSCR};

extern "C" {
    fn feclearexcept(excepts: c_int) -> c_int;
    fn fegetround() -> c_int;
    fn feraiseexcept(excepts: c_int) -> c_int;
    fn fesetround(round: c_int) -> c_int;
    fn fetestexcept(excepts: c_int) -> c_int;
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
const FE_INVALID: c_int = 0x01;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
const FE_DIVBYZERO: c_int = 0x04;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
const FE_OVERFLOW: c_int = 0x08;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
const FE_UNDERFLOW: c_int = 0x10;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
const FE_INEXACT: c_int = 0x20;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
const FE_ALL_EXCEPT: c_int = 0x3f;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
const FE_TONEAREST: c_int = 0x0000;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
const FE_DOWNWARD: c_int = 0x0400;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
const FE_UPWARD: c_int = 0x0800;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
const FE_TOWARDZERO: c_int = 0x0c00;

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
compile_error!("fenv constants need porting for this host architecture");

// ── FPSCR ────────────────────────────────────────────────────────

pub const FPSCR_IOC: u32 = 1 << 0;
pub const FPSCR_DZC: u32 = 1 << 1;
pub const FPSCR_OFC: u32 = 1 << 2;
pub const FPSCR_UFC: u32 = 1 << 3;
pub const FPSCR_IXC: u32 = 1 << 4;
pub const FPSCR_IDC: u32 = 1 << 7;
pub const FPSCR_LEN: u32 = 7 << 16;
pub const FPSCR_STRIDE: u32 = 3 << 20;
pub const FPSCR_RMODE_SHIFT: u32 = 22;
pub const FPSCR_FZ: u32 = 1 << 24;
pub const FPSCR_DN: u32 = 1 << 25;
pub const FPSCR_QC: u32 = 1 << 27;
pub const FPSCR_NZCV: u32 = 0xf << 28;

/// Bits that a VMSR can change. The trap enables read as zero.
const FPSCR_WRITABLE: u32 = 0xfff7_009f;

/// Selector bit: evaluate under the Advanced SIMD "standard FPSCR"
/// (round to nearest, flush-to-zero, default NaN) instead of FPSCR.
pub const FP_STANDARD: u32 = 1 << 8;

/// Conversion flag: the integer side is signed.
pub const CVT_SIGNED: u32 = 1 << 0;
/// Conversion flag: round toward zero regardless of FPSCR.
pub const CVT_ROUND_ZERO: u32 = 1 << 1;
/// Conversion flag: the fixed-point side is 16 bits wide.
pub const CVT_HALF: u32 = 1 << 2;
/// Conversion flag: round with the `FpRounding` held in bits \[6:4\]
/// (VCVTA, VCVTN, VCVTP, VCVTM).
pub const CVT_RMODE: u32 = 1 << 3;
pub const CVT_RMODE_SHIFT: u32 = 4;

/// `rint` mode flag: take the rounding mode from FPSCR.
pub const RINT_FPSCR: u32 = 1 << 3;
/// `rint` mode flag: signal Inexact (VRINTX).
pub const RINT_EXACT: u32 = 1 << 4;

/// Rounding mode; the first four match the FPSCR.RMode encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum FpRounding {
    TiesEven = 0,
    PosInf = 1,
    NegInf = 2,
    Zero = 3,
    TiesAway = 4,
}

impl FpRounding {
    pub fn from_raw(v: u32) -> Self {
        match v {
            0 => Self::TiesEven,
            1 => Self::PosInf,
            2 => Self::NegInf,
            3 => Self::Zero,
            _ => Self::TiesAway,
        }
    }

    fn host(self) -> c_int {
        match self {
            Self::TiesEven | Self::TiesAway => FE_TONEAREST,
            Self::PosInf => FE_UPWARD,
            Self::NegInf => FE_DOWNWARD,
            Self::Zero => FE_TOWARDZERO,
        }
    }

    /// Round `x` to an integral value.
    fn round(self, x: f64) -> f64 {
        match self {
            Self::TiesEven => x.round_ties_even(),
            Self::TiesAway => x.round(),
            Self::PosInf => x.ceil(),
            Self::NegInf => x.floor(),
            Self::Zero => x.trunc(),
        }
    }
}

/// Two-operand arithmetic selected by the low byte of the helper
/// argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum FpOp {
    Add,
    Sub,
    Mul,
    Div,
    /// IEEE 754-2008 maxNum (VMAXNM).
    MaxNum,
    MinNum,
    /// Advanced SIMD VMAX: any NaN propagates.
    Max,
    Min,
    /// `|a - b|`.
    Abd,
    /// `2 - a * b`, fused (VRECPS).
    RecipStep,
    /// `(3 - a * b) / 2`, fused (VRSQRTS).
    RsqrtStep,
}

impl FpOp {
    const ALL: [FpOp; 11] = [
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::MaxNum,
        Self::MinNum,
        Self::Max,
        Self::Min,
        Self::Abd,
        Self::RecipStep,
        Self::RsqrtStep,
    ];

    pub fn from_raw(v: u32) -> Option<Self> {
        Self::ALL.get(v as usize).copied()
    }
}

/// The parts of FPSCR (or the standard FPSCR) that steer arithmetic.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FpStatus {
    pub rmode: FpRounding,
    pub fz: bool,
    pub dn: bool,
}

impl FpStatus {
    pub(crate) fn for_sel(cpu: &ArmCpu, sel: u32) -> Self {
        if sel & FP_STANDARD != 0 {
            return Self {
                rmode: FpRounding::TiesEven,
                fz: true,
                dn: true,
            };
        }
        let fpscr = cpu.env.vfp.xregs[VFP_FPSCR];
        Self {
            rmode: FpRounding::from_raw((fpscr >> FPSCR_RMODE_SHIFT) & 3),
            fz: fpscr & FPSCR_FZ != 0,
            dn: fpscr & FPSCR_DN != 0,
        }
    }
}

pub(crate) fn raise(cpu: &mut ArmCpu, flags: u32) {
    cpu.env.vfp.xregs[VFP_FPSCR] |= flags;
}

fn map_fenv_flags(flags: c_int) -> u32 {
    let mut out = 0;
    if flags & FE_INEXACT != 0 {
        out |= FPSCR_IXC;
    }
    if flags & FE_UNDERFLOW != 0 {
        out |= FPSCR_UFC;
    }
    if flags & FE_OVERFLOW != 0 {
        out |= FPSCR_OFC;
    }
    if flags & FE_DIVBYZERO != 0 {
        out |= FPSCR_DZC;
    }
    if flags & FE_INVALID != 0 {
        out |= FPSCR_IOC;
    }
    out
}

/// Run `f` under the host rounding mode for `rmode` and return its
/// result together with the FPSCR flags it raised. The caller's
/// floating-point environment is preserved.
fn with_fenv<T>(rmode: FpRounding, f: impl FnOnce() -> T) -> (T, u32) {
    let old_rm = unsafe { fegetround() };
    let old_exc = unsafe { fetestexcept(FE_ALL_EXCEPT) };
    unsafe {
        feclearexcept(FE_ALL_EXCEPT);
        fesetround(rmode.host());
    }
    let res = f();
    let raised = unsafe { fetestexcept(FE_ALL_EXCEPT) };
    unsafe {
        fesetround(old_rm);
        feclearexcept(FE_ALL_EXCEPT);
        feraiseexcept(old_exc);
    }
    (res, map_fenv_flags(raised))
}

// ── Formats ──────────────────────────────────────────────────────

/// Bit layout of a binary floating-point format, with values carried
/// in the low bits of a `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FpFormat {
    bits: u32,
    frac_bits: u32,
}

pub(crate) const F32: FpFormat = FpFormat {
    bits: 32,
    frac_bits: 23,
};
pub(crate) const F64: FpFormat = FpFormat {
    bits: 64,
    frac_bits: 52,
};

impl FpFormat {
    pub(crate) fn sign(self) -> u64 {
        1 << (self.bits - 1)
    }

    fn frac_mask(self) -> u64 {
        (1 << self.frac_bits) - 1
    }

    fn exp_mask(self) -> u64 {
        (self.sign() - 1) & !self.frac_mask()
    }

    fn quiet_bit(self) -> u64 {
        1 << (self.frac_bits - 1)
    }

    pub(crate) fn default_nan(self) -> u64 {
        self.exp_mask() | self.quiet_bit()
    }

    pub(crate) fn is_nan(self, x: u64) -> bool {
        x & self.exp_mask() == self.exp_mask() && x & self.frac_mask() != 0
    }

    pub(crate) fn is_snan(self, x: u64) -> bool {
        self.is_nan(x) && x & self.quiet_bit() == 0
    }

    fn is_denormal(self, x: u64) -> bool {
        x & self.exp_mask() == 0 && x & self.frac_mask() != 0
    }

    /// Exact widening to a host `f64`.
    pub(crate) fn to_f64(self, x: u64) -> f64 {
        if self.bits == 32 {
            f32::from_bits(x as u32) as f64
        } else {
            f64::from_bits(x)
        }
    }

    /// Round to this format under the current host rounding mode.
    pub(crate) fn from_f64(self, v: f64) -> u64 {
        if self.bits == 32 {
            (v as f32).to_bits() as u64
        } else {
            v.to_bits()
        }
    }
}

/// Flush a denormal input to a signed zero when FZ is set.
pub(crate) fn flush_input(cpu: &mut ArmCpu, fmt: FpFormat, st: FpStatus, x: u64) -> u64 {
    if st.fz && fmt.is_denormal(x) {
        raise(cpu, FPSCR_IDC);
        return x & fmt.sign();
    }
    x
}

/// ARM NaN selection: the first signalling NaN, else the first quiet
/// NaN, quietened; or the default NaN under DN. `None` when no
/// operand is a NaN.
pub(crate) fn process_nans(
    cpu: &mut ArmCpu,
    fmt: FpFormat,
    st: FpStatus,
    ops: &[u64],
) -> Option<u64> {
    if !ops.iter().any(|&x| fmt.is_nan(x)) {
        return None;
    }
    let snan = ops.iter().copied().find(|&x| fmt.is_snan(x));
    if snan.is_some() {
        raise(cpu, FPSCR_IOC);
    }
    if st.dn {
        return Some(fmt.default_nan());
    }
    let pick = snan.or_else(|| ops.iter().copied().find(|&x| fmt.is_nan(x)));
    pick.map(|x| x | fmt.quiet_bit())
}

/// Common tail of every rounding operation: host NaNs become the ARM
/// default NaN, FZ flushes tiny results, and the flags are
/// accumulated.
pub(crate) fn finish(
    cpu: &mut ArmCpu,
    fmt: FpFormat,
    st: FpStatus,
    mut res: u64,
    mut flags: u32,
) -> u64 {
    if fmt.is_nan(res) {
        res = fmt.default_nan();
    }
    if st.fz && fmt.is_denormal(res) {
        res &= fmt.sign();
        flags = (flags | FPSCR_UFC) & !FPSCR_IXC;
    }
    raise(cpu, flags);
    res
}

fn fused(fmt: FpFormat, a: f64, b: f64, c: f64) -> u64 {
    if fmt == F32 {
        (a as f32).mul_add(b as f32, c as f32).to_bits() as u64
    } else {
        a.mul_add(b, c).to_bits()
    }
}

// ── Arithmetic ───────────────────────────────────────────────────

fn minmax(cpu: &mut ArmCpu, fmt: FpFormat, st: FpStatus, a: u64, b: u64, op: FpOp) -> u64 {
    if matches!(op, FpOp::MaxNum | FpOp::MinNum) {
        // A single quiet NaN loses to a number.
        let quiet = |x| fmt.is_nan(x) && !fmt.is_snan(x);
        if quiet(a) && !fmt.is_nan(b) {
            return b;
        }
        if quiet(b) && !fmt.is_nan(a) {
            return a;
        }
    }
    if let Some(n) = process_nans(cpu, fmt, st, &[a, b]) {
        return n;
    }
    let (x, y) = (fmt.to_f64(a), fmt.to_f64(b));
    let max = matches!(op, FpOp::Max | FpOp::MaxNum);
    if x == y {
        // Only zeros of opposite sign differ here: +0 is the larger.
        return if max { a & b } else { a | b };
    }
    if (x > y) == max {
        a
    } else {
        b
    }
}

pub(crate) fn arith(cpu: &mut ArmCpu, fmt: FpFormat, a: u64, b: u64, sel: u32) -> u64 {
    let st = FpStatus::for_sel(cpu, sel);
    let Some(op) = FpOp::from_raw(sel & 0xff) else {
        log::error!("bad floating-point op selector {sel:#x}");
        return fmt.default_nan();
    };
    let a = flush_input(cpu, fmt, st, a);
    let b = flush_input(cpu, fmt, st, b);
    if matches!(op, FpOp::MaxNum | FpOp::MinNum | FpOp::Max | FpOp::Min) {
        return minmax(cpu, fmt, st, a, b, op);
    }
    if let Some(n) = process_nans(cpu, fmt, st, &[a, b]) {
        return n;
    }
    let (x, y) = (fmt.to_f64(a), fmt.to_f64(b));
    let inf_times_zero =
        (x.is_infinite() && y == 0.0) || (x == 0.0 && y.is_infinite());
    match op {
        FpOp::RecipStep if inf_times_zero => return fmt.from_f64(2.0),
        FpOp::RsqrtStep if inf_times_zero => return fmt.from_f64(1.5),
        _ => {}
    }
    let (res, flags) = with_fenv(st.rmode, || match op {
        FpOp::Add => fmt.from_f64(x + y),
        FpOp::Sub => fmt.from_f64(x - y),
        FpOp::Mul => fmt.from_f64(x * y),
        FpOp::Div => fmt.from_f64(x / y),
        FpOp::Abd => {
            let d = fmt.from_f64(x - y);
            if fmt.is_nan(d) {
                d
            } else {
                d & !fmt.sign()
            }
        }
        FpOp::RecipStep => fused(fmt, -x, y, 2.0),
        FpOp::RsqrtStep => {
            let r = fused(fmt, -x, y, 3.0);
            fmt.from_f64(fmt.to_f64(r) / 2.0)
        }
        FpOp::MaxNum | FpOp::MinNum | FpOp::Max | FpOp::Min => unreachable!(),
    });
    finish(cpu, fmt, st, res, flags)
}

pub fn arith32(cpu: &mut ArmCpu, a: u32, b: u32, sel: u32) -> u32 {
    arith(cpu, F32, a as u64, b as u64, sel) as u32
}

pub fn arith64(cpu: &mut ArmCpu, a: u64, b: u64, sel: u32) -> u64 {
    arith(cpu, F64, a, b, sel)
}

/// Fused `a * b + c` with the addend taking NaN priority.
pub(crate) fn muladd(cpu: &mut ArmCpu, fmt: FpFormat, a: u64, b: u64, c: u64, sel: u32) -> u64 {
    let st = FpStatus::for_sel(cpu, sel);
    let a = flush_input(cpu, fmt, st, a);
    let b = flush_input(cpu, fmt, st, b);
    let c = flush_input(cpu, fmt, st, c);
    let (x, y) = (fmt.to_f64(a), fmt.to_f64(b));
    let inf_times_zero = !fmt.is_nan(a)
        && !fmt.is_nan(b)
        && ((x.is_infinite() && y == 0.0) || (x == 0.0 && y.is_infinite()));
    if inf_times_zero && fmt.is_nan(c) && !fmt.is_snan(c) {
        raise(cpu, FPSCR_IOC);
        return fmt.default_nan();
    }
    if let Some(n) = process_nans(cpu, fmt, st, &[c, a, b]) {
        return n;
    }
    let z = fmt.to_f64(c);
    let (res, flags) = with_fenv(st.rmode, || fused(fmt, x, y, z));
    finish(cpu, fmt, st, res, flags)
}

pub fn muladd32(cpu: &mut ArmCpu, a: u32, b: u32, c: u32) -> u32 {
    muladd(cpu, F32, a as u64, b as u64, c as u64, 0) as u32
}

pub fn muladd64(cpu: &mut ArmCpu, a: u64, b: u64, c: u64) -> u64 {
    muladd(cpu, F64, a, b, c, 0)
}

fn sqrt(cpu: &mut ArmCpu, fmt: FpFormat, a: u64) -> u64 {
    let st = FpStatus::for_sel(cpu, 0);
    let a = flush_input(cpu, fmt, st, a);
    if let Some(n) = process_nans(cpu, fmt, st, &[a]) {
        return n;
    }
    let x = fmt.to_f64(a);
    let (res, flags) = with_fenv(st.rmode, || fmt.from_f64(x.sqrt()));
    finish(cpu, fmt, st, res, flags)
}

pub fn sqrt32(cpu: &mut ArmCpu, a: u32) -> u32 {
    sqrt(cpu, F32, a as u64) as u32
}

pub fn sqrt64(cpu: &mut ArmCpu, a: u64) -> u64 {
    sqrt(cpu, F64, a)
}

// ── Comparison ───────────────────────────────────────────────────

/// Ordered comparison; `None` when unordered. A signalling compare
/// raises Invalid on any NaN, a quiet one only on signalling NaNs.
pub(crate) fn compare(
    cpu: &mut ArmCpu,
    fmt: FpFormat,
    st: FpStatus,
    a: u64,
    b: u64,
    signaling: bool,
) -> Option<Ordering> {
    let a = flush_input(cpu, fmt, st, a);
    let b = flush_input(cpu, fmt, st, b);
    if fmt.is_nan(a) || fmt.is_nan(b) {
        if signaling || fmt.is_snan(a) || fmt.is_snan(b) {
            raise(cpu, FPSCR_IOC);
        }
        return None;
    }
    fmt.to_f64(a).partial_cmp(&fmt.to_f64(b))
}

fn cmp(cpu: &mut ArmCpu, fmt: FpFormat, a: u64, b: u64, signaling: bool) {
    let st = FpStatus::for_sel(cpu, 0);
    let nzcv = match compare(cpu, fmt, st, a, b, signaling) {
        Some(Ordering::Equal) => 0x6,
        Some(Ordering::Less) => 0x8,
        Some(Ordering::Greater) => 0x2,
        None => 0x3,
    };
    let fpscr = &mut cpu.env.vfp.xregs[VFP_FPSCR];
    *fpscr = (*fpscr & !FPSCR_NZCV) | (nzcv << 28);
}

pub fn cmp32(cpu: &mut ArmCpu, a: u32, b: u32, signaling: bool) {
    cmp(cpu, F32, a as u64, b as u64, signaling);
}

pub fn cmp64(cpu: &mut ArmCpu, a: u64, b: u64, signaling: bool) {
    cmp(cpu, F64, a, b, signaling);
}

// ── Precision conversion ─────────────────────────────────────────

pub fn f32_to_f64(cpu: &mut ArmCpu, a: u32) -> u64 {
    let st = FpStatus::for_sel(cpu, 0);
    let a = flush_input(cpu, F32, st, a as u64);
    if F32.is_nan(a) {
        if F32.is_snan(a) {
            raise(cpu, FPSCR_IOC);
        }
        if st.dn {
            return F64.default_nan();
        }
        let sign = (a & F32.sign()) << 32;
        let frac = (a & F32.frac_mask()) << 29;
        return sign | F64.exp_mask() | F64.quiet_bit() | frac;
    }
    F32.to_f64(a).to_bits()
}

pub fn f64_to_f32(cpu: &mut ArmCpu, a: u64) -> u32 {
    let st = FpStatus::for_sel(cpu, 0);
    let a = flush_input(cpu, F64, st, a);
    if F64.is_nan(a) {
        if F64.is_snan(a) {
            raise(cpu, FPSCR_IOC);
        }
        if st.dn {
            return F32.default_nan() as u32;
        }
        let sign = (a & F64.sign()) >> 32;
        let frac = (a & F64.frac_mask()) >> 29;
        return (sign | F32.exp_mask() | F32.quiet_bit() | frac) as u32;
    }
    let x = f64::from_bits(a);
    let (res, flags) = with_fenv(st.rmode, || F32.from_f64(x));
    finish(cpu, F32, st, res, flags) as u32
}

// ── Integer and fixed-point conversion ──────────────────────────

/// Convert `a * 2^shift` to a saturated `bits`-wide integer. Signed
/// results come back sign-extended.
#[allow(clippy::too_many_arguments)]
pub(crate) fn to_fixed(
    cpu: &mut ArmCpu,
    fmt: FpFormat,
    st: FpStatus,
    a: u64,
    shift: u32,
    signed: bool,
    bits: u32,
    rmode: FpRounding,
) -> u64 {
    let a = flush_input(cpu, fmt, st, a);
    if fmt.is_nan(a) {
        raise(cpu, FPSCR_IOC);
        return 0;
    }
    let x = fmt.to_f64(a) * 2f64.powi(shift as i32);
    let r = rmode.round(x);
    let (min, max) = if signed {
        (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1)
    } else {
        (0, (1i64 << bits) - 1)
    };
    if r < min as f64 {
        raise(cpu, FPSCR_IOC);
        return min as u64;
    }
    if r > max as f64 {
        raise(cpu, FPSCR_IOC);
        return max as u64;
    }
    if r != x {
        raise(cpu, FPSCR_IXC);
    }
    r as i64 as u64
}

/// Convert the low `bits` of `v`, read as a fixed-point number with
/// `shift` fraction bits, to `fmt`.
pub(crate) fn from_fixed(
    cpu: &mut ArmCpu,
    fmt: FpFormat,
    st: FpStatus,
    v: u64,
    shift: u32,
    signed: bool,
    bits: u32,
) -> u64 {
    let v = if signed {
        ((v << (64 - bits)) as i64 >> (64 - bits)) as f64
    } else {
        (v & ((1u64 << bits) - 1)) as f64
    };
    let x = v / 2f64.powi(shift as i32);
    let (res, flags) = with_fenv(st.rmode, || fmt.from_f64(x));
    finish(cpu, fmt, st, res, flags)
}

fn cvt_rounding(st: FpStatus, flags: u32) -> FpRounding {
    if flags & CVT_RMODE != 0 {
        FpRounding::from_raw((flags >> CVT_RMODE_SHIFT) & 7)
    } else if flags & CVT_ROUND_ZERO != 0 {
        FpRounding::Zero
    } else {
        st.rmode
    }
}

fn cvt_bits(flags: u32) -> u32 {
    if flags & CVT_HALF != 0 {
        16
    } else {
        32
    }
}

pub fn to_int32(cpu: &mut ArmCpu, a: u32, flags: u32) -> u32 {
    let st = FpStatus::for_sel(cpu, flags);
    let rmode = cvt_rounding(st, flags);
    to_fixed(cpu, F32, st, a as u64, 0, flags & CVT_SIGNED != 0, 32, rmode) as u32
}

pub fn to_int64(cpu: &mut ArmCpu, a: u64, flags: u32) -> u32 {
    let st = FpStatus::for_sel(cpu, flags);
    let rmode = cvt_rounding(st, flags);
    to_fixed(cpu, F64, st, a, 0, flags & CVT_SIGNED != 0, 32, rmode) as u32
}

pub fn from_int32(cpu: &mut ArmCpu, a: u32, signed: bool) -> u32 {
    let st = FpStatus::for_sel(cpu, 0);
    from_fixed(cpu, F32, st, a as u64, 0, signed, 32) as u32
}

pub fn from_int64(cpu: &mut ArmCpu, a: u32, signed: bool) -> u64 {
    let st = FpStatus::for_sel(cpu, 0);
    from_fixed(cpu, F64, st, a as u64, 0, signed, 32)
}

/// Float to fixed point always rounds toward zero.
pub fn to_fix32(cpu: &mut ArmCpu, a: u32, shift: u32, flags: u32) -> u32 {
    let st = FpStatus::for_sel(cpu, flags);
    let signed = flags & CVT_SIGNED != 0;
    let r = to_fixed(cpu, F32, st, a as u64, shift, signed, cvt_bits(flags), FpRounding::Zero);
    r as u32
}

pub fn to_fix64(cpu: &mut ArmCpu, a: u64, shift: u32, flags: u32) -> u64 {
    let st = FpStatus::for_sel(cpu, flags);
    let signed = flags & CVT_SIGNED != 0;
    to_fixed(cpu, F64, st, a, shift, signed, cvt_bits(flags), FpRounding::Zero)
}

pub fn from_fix32(cpu: &mut ArmCpu, a: u32, shift: u32, flags: u32) -> u32 {
    let st = FpStatus::for_sel(cpu, flags);
    let signed = flags & CVT_SIGNED != 0;
    from_fixed(cpu, F32, st, a as u64, shift, signed, cvt_bits(flags)) as u32
}

pub fn from_fix64(cpu: &mut ArmCpu, a: u32, shift: u32, flags: u32) -> u64 {
    let st = FpStatus::for_sel(cpu, flags);
    let signed = flags & CVT_SIGNED != 0;
    from_fixed(cpu, F64, st, a as u64, shift, signed, cvt_bits(flags))
}

// ── Round to integral ────────────────────────────────────────────

fn rint(cpu: &mut ArmCpu, fmt: FpFormat, a: u64, mode: u32) -> u64 {
    let st = FpStatus::for_sel(cpu, mode);
    let rmode = if mode & RINT_FPSCR != 0 {
        st.rmode
    } else {
        FpRounding::from_raw(mode & 7)
    };
    let a = flush_input(cpu, fmt, st, a);
    if let Some(n) = process_nans(cpu, fmt, st, &[a]) {
        return n;
    }
    let x = fmt.to_f64(a);
    if x.is_infinite() || x == 0.0 {
        return a;
    }
    let r = rmode.round(x);
    if mode & RINT_EXACT != 0 && r != x {
        raise(cpu, FPSCR_IXC);
    }
    // Integral values of the source format are exact in it.
    if fmt == F32 {
        (r as f32).to_bits() as u64
    } else {
        r.to_bits()
    }
}

pub fn rint32(cpu: &mut ArmCpu, a: u32, mode: u32) -> u32 {
    rint(cpu, F32, a as u64, mode) as u32
}

pub fn rint64(cpu: &mut ArmCpu, a: u64, mode: u32) -> u64 {
    rint(cpu, F64, a, mode)
}

// ── FPSCR ────────────────────────────────────────────────────────

/// VMSR FPSCR. Short-vector LEN/STRIDE only exist before ARMv8 on
/// A/R-profile cores.
pub fn set_fpscr(cpu: &mut ArmCpu, val: u32) {
    let mut mask = FPSCR_WRITABLE;
    if cpu.has(ArmFeature::V8) || cpu.is_m_profile() {
        mask &= !(FPSCR_LEN | FPSCR_STRIDE);
    }
    cpu.env.vfp.xregs[VFP_FPSCR] = val & mask;
    cpu.rebuild_hflags();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::config::ArmCpuConfig;

    fn cpu() -> ArmCpu {
        ArmCpu::new(ArmCpuConfig::cortex_a15()).expect("cpu")
    }

    fn fpscr(cpu: &ArmCpu) -> u32 {
        cpu.env.vfp.xregs[VFP_FPSCR]
    }

    const ONE: u32 = 0x3f80_0000;
    const TWO: u32 = 0x4000_0000;
    const SNAN: u32 = 0x7f80_0001;
    const QNAN: u32 = 0x7fc0_0002;

    #[test]
    fn add_and_inexact() {
        let mut c = cpu();
        assert_eq!(arith32(&mut c, ONE, ONE, FpOp::Add as u32), TWO);
        assert_eq!(fpscr(&c) & FPSCR_IXC, 0);
        // 1/3 is inexact.
        arith32(&mut c, ONE, 0x4040_0000, FpOp::Div as u32);
        assert_ne!(fpscr(&c) & FPSCR_IXC, 0);
    }

    #[test]
    fn nan_propagation_prefers_signalling() {
        let mut c = cpu();
        let r = arith32(&mut c, QNAN, SNAN, FpOp::Add as u32);
        assert_eq!(r, SNAN | 0x0040_0000);
        assert_ne!(fpscr(&c) & FPSCR_IOC, 0);

        let mut c = cpu();
        c.env.vfp.xregs[VFP_FPSCR] = FPSCR_DN;
        assert_eq!(arith32(&mut c, QNAN, ONE, FpOp::Mul as u32), 0x7fc0_0000);
    }

    #[test]
    fn invalid_produces_positive_default_nan() {
        let mut c = cpu();
        let inf = 0x7f80_0000;
        assert_eq!(arith32(&mut c, inf, inf, FpOp::Sub as u32), 0x7fc0_0000);
        assert_ne!(fpscr(&c) & FPSCR_IOC, 0);
    }

    #[test]
    fn flush_to_zero_inputs() {
        let mut c = cpu();
        c.env.vfp.xregs[VFP_FPSCR] = FPSCR_FZ;
        // Smallest denormal plus zero.
        assert_eq!(arith32(&mut c, 1, 0, FpOp::Add as u32), 0);
        assert_ne!(fpscr(&c) & FPSCR_IDC, 0);
    }

    #[test]
    fn compare_sets_nzcv() {
        let mut c = cpu();
        cmp32(&mut c, ONE, TWO, false);
        assert_eq!(fpscr(&c) >> 28, 0x8);
        cmp32(&mut c, TWO, TWO, false);
        assert_eq!(fpscr(&c) >> 28, 0x6);
        cmp32(&mut c, QNAN, TWO, false);
        assert_eq!(fpscr(&c) >> 28, 0x3);
        assert_eq!(fpscr(&c) & FPSCR_IOC, 0);
        cmp32(&mut c, QNAN, TWO, true);
        assert_ne!(fpscr(&c) & FPSCR_IOC, 0);
    }

    #[test]
    fn to_int_saturates() {
        let mut c = cpu();
        let big = 0x4f80_0000; // 2^32
        assert_eq!(to_int32(&mut c, big, CVT_SIGNED | CVT_ROUND_ZERO), i32::MAX as u32);
        assert_ne!(fpscr(&c) & FPSCR_IOC, 0);
        let neg = 0xbfc0_0000; // -1.5
        assert_eq!(to_int32(&mut c, neg, CVT_ROUND_ZERO), 0);
        assert_eq!(to_int32(&mut c, neg, CVT_SIGNED), -2i32 as u32);
        let away = CVT_SIGNED | CVT_RMODE | (FpRounding::TiesAway as u32) << CVT_RMODE_SHIFT;
        assert_eq!(to_int32(&mut c, 0x4020_0000, away), 3);
    }

    #[test]
    fn fixed_point_round_trip() {
        let mut c = cpu();
        // 1.5 with 8 fraction bits is 0x180.
        assert_eq!(to_fix32(&mut c, 0x3fc0_0000, 8, CVT_SIGNED), 0x180);
        assert_eq!(from_fix32(&mut c, 0x180, 8, CVT_SIGNED), 0x3fc0_0000);
        // A negative half-width value comes back sign-extended.
        assert_eq!(to_fix32(&mut c, 0xbf80_0000, 0, CVT_SIGNED | CVT_HALF), 0xffff_ffff);
    }

    #[test]
    fn rint_modes() {
        let mut c = cpu();
        let two_and_half = 0x4020_0000;
        assert_eq!(rint32(&mut c, two_and_half, FpRounding::TiesEven as u32), TWO);
        assert_eq!(rint32(&mut c, two_and_half, FpRounding::TiesAway as u32), 0x4040_0000);
        assert_eq!(fpscr(&c) & FPSCR_IXC, 0);
        rint32(&mut c, two_and_half, RINT_FPSCR | RINT_EXACT);
        assert_ne!(fpscr(&c) & FPSCR_IXC, 0);
    }

    #[test]
    fn maxnum_ignores_quiet_nan() {
        let mut c = cpu();
        assert_eq!(arith32(&mut c, QNAN, ONE, FpOp::MaxNum as u32), ONE);
        assert_eq!(arith32(&mut c, 0x8000_0000, 0, FpOp::Max as u32), 0);
        assert_eq!(arith32(&mut c, 0x8000_0000, 0, FpOp::Min as u32), 0x8000_0000);
    }

    #[test]
    fn precision_conversion() {
        let mut c = cpu();
        assert_eq!(f32_to_f64(&mut c, ONE), 1.0f64.to_bits());
        assert_eq!(f64_to_f32(&mut c, 0.1f64.to_bits()), 0.1f32.to_bits());
    }
}
