//! Runtime helpers called from translated code.
//!
//! Every helper is named by a `Helper` id; the id is the constant
//! argument of the IR `call` op. The executor hands the id and the
//! evaluated input temps to [`call`], which dispatches to the Rust
//! implementation. Helpers see the whole CPU, so they read and write
//! env fields directly instead of receiving the env pointer.

pub mod alu;
pub mod neon;
pub mod sys;
pub mod vfp;

use tcg_exec::{ExecError, Unwind};

use super::cpu::ArmCpu;

/// Signature shared by every helper.
pub type HelperFn = fn(&mut ArmCpu, &[u64]) -> Result<u64, Unwind>;

macro_rules! helpers {
    ($($(#[$meta:meta])* $name:ident($nargs:expr) => $body:expr;)*) => {
        /// Runtime helper ids.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum Helper {
            $($(#[$meta])* $name,)*
        }

        impl Helper {
            const ALL: &'static [Helper] = &[$(Helper::$name,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(Helper::$name => stringify!($name),)*
                }
            }

            /// Number of input arguments the helper reads.
            pub fn nargs(self) -> usize {
                match self {
                    $(Helper::$name => $nargs,)*
                }
            }

            fn func(self) -> HelperFn {
                match self {
                    $(Helper::$name => {
                        let f: HelperFn = $body;
                        f
                    })*
                }
            }
        }
    };
}

fn u32s(v: u64) -> u32 {
    v as u32
}

helpers! {
    // ── Integer ──
    ShlCc(2) => |c, a| Ok(alu::shl_cc(c, u32s(a[0]), u32s(a[1])) as u64);
    ShrCc(2) => |c, a| Ok(alu::shr_cc(c, u32s(a[0]), u32s(a[1])) as u64);
    SarCc(2) => |c, a| Ok(alu::sar_cc(c, u32s(a[0]), u32s(a[1])) as u64);
    RorCc(2) => |c, a| Ok(alu::ror_cc(c, u32s(a[0]), u32s(a[1])) as u64);
    AddSetq(2) => |c, a| Ok(alu::add_setq(c, u32s(a[0]), u32s(a[1])) as u64);
    AddSaturate(2) => |c, a| Ok(alu::add_saturate(c, u32s(a[0]), u32s(a[1])) as u64);
    SubSaturate(2) => |c, a| Ok(alu::sub_saturate(c, u32s(a[0]), u32s(a[1])) as u64);
    DoubleSaturate(1) => |c, a| Ok(alu::double_saturate(c, u32s(a[0])) as u64);
    Ssat(2) => |c, a| Ok(alu::ssat(c, u32s(a[0]), u32s(a[1])) as u64);
    Usat(2) => |c, a| Ok(alu::usat(c, u32s(a[0]), u32s(a[1])) as u64);
    Ssat16(2) => |c, a| Ok(alu::ssat16(c, u32s(a[0]), u32s(a[1])) as u64);
    Usat16(2) => |c, a| Ok(alu::usat16(c, u32s(a[0]), u32s(a[1])) as u64);
    /// Parallel add/subtract; the third argument is a `ParallelOp`
    /// encoding.
    ParallelAddSub(3) => |c, a| Ok(alu::parallel_addsub(c, u32s(a[0]), u32s(a[1]), u32s(a[2])) as u64);
    Sel(2) => |c, a| Ok(alu::sel(c, u32s(a[0]), u32s(a[1])) as u64);
    Usad8(2) => |_, a| Ok(alu::usad8(u32s(a[0]), u32s(a[1])) as u64);
    Sdiv(2) => |_, a| Ok(alu::sdiv(u32s(a[0]), u32s(a[1])) as u64);
    Udiv(2) => |_, a| Ok(alu::udiv(u32s(a[0]), u32s(a[1])) as u64);
    Crc32(3) => |_, a| Ok(alu::crc32(u32s(a[0]), u32s(a[1]), u32s(a[2])) as u64);
    Crc32c(3) => |_, a| Ok(alu::crc32c(u32s(a[0]), u32s(a[1]), u32s(a[2])) as u64);
    Rbit(1) => |_, a| Ok(u32s(a[0]).reverse_bits() as u64);

    // ── System ──
    CpsrRead(0) => |c, _| Ok(sys::cpsr_read(c) as u64);
    CpsrWrite(2) => |c, a| {
        sys::cpsr_write(c, u32s(a[0]), u32s(a[1]));
        Ok(0)
    };
    CpsrWriteEret(1) => |c, a| {
        sys::cpsr_write_eret(c, u32s(a[0]));
        Ok(0)
    };
    GetUserReg(1) => |c, a| Ok(sys::get_user_reg(c, u32s(a[0])) as u64);
    SetUserReg(2) => |c, a| {
        sys::set_user_reg(c, u32s(a[0]), u32s(a[1]));
        Ok(0)
    };
    GetR13Banked(1) => |c, a| sys::get_r13_banked(c, u32s(a[0])).map(u64::from);
    SetR13Banked(2) => |c, a| sys::set_r13_banked(c, u32s(a[0]), u32s(a[1])).map(|_| 0);
    MrsBanked(2) => |c, a| sys::mrs_banked(c, u32s(a[0]), u32s(a[1])).map(u64::from);
    MsrBanked(3) => |c, a| sys::msr_banked(c, u32s(a[0]), u32s(a[1]), u32s(a[2])).map(|_| 0);
    Setend(0) => |c, _| {
        sys::setend(c);
        Ok(0)
    };
    Wfi(1) => |c, a| sys::wfi(c, u32s(a[0])).map(|_| 0);
    Wfe(1) => |c, a| sys::wfe(c, u32s(a[0])).map(|_| 0);
    Yield(0) => |c, _| sys::yield_(c).map(|_| 0);
    PreHvc(0) => |c, _| sys::pre_hvc(c).map(|_| 0);
    PreSmc(1) => |c, a| sys::pre_smc(c, u32s(a[0])).map(|_| 0);
    GetCpReg(1) => |c, a| sys::get_cp_reg(c, u32s(a[0]));
    SetCpReg(2) => |c, a| sys::set_cp_reg(c, u32s(a[0]), a[1] & 0xffff_ffff).map(|_| 0);
    GetCpReg64(1) => |c, a| sys::get_cp_reg(c, u32s(a[0]));
    SetCpReg64(2) => |c, a| sys::set_cp_reg(c, u32s(a[0]), a[1]).map(|_| 0);
    AccessCheckCpReg(3) => |c, a| {
        sys::access_check_cp_reg(c, u32s(a[0]), u32s(a[1]), a[2] != 0).map(|_| 0)
    };
    RebuildHflags(0) => |c, _| {
        c.rebuild_hflags();
        Ok(0)
    };
    /// Raise `(excp, syndrome, target_el)`.
    Exception(3) => |c, a| Err(c.raise_exception(u32s(a[0]), u32s(a[1]), u32s(a[2])));
    ExceptionPcAlignment(1) => |c, a| Err(sys::exception_pc_alignment(c, u32s(a[0])));
    ExceptionBkptInsn(1) => |c, a| Err(sys::exception_bkpt_insn(c, u32s(a[0])));
    V7mMrs(1) => |c, a| Ok(sys::v7m_mrs(c, u32s(a[0])) as u64);
    V7mMsr(2) => |c, a| {
        sys::v7m_msr(c, u32s(a[0]), u32s(a[1]));
        Ok(0)
    };

    // ── VFP ──
    VfpArith32(3) => |c, a| Ok(vfp::arith32(c, u32s(a[0]), u32s(a[1]), u32s(a[2])) as u64);
    VfpArith64(3) => |c, a| Ok(vfp::arith64(c, a[0], a[1], u32s(a[2])));
    /// Fused `a * b + c`.
    VfpMulAdd32(3) => |c, a| Ok(vfp::muladd32(c, u32s(a[0]), u32s(a[1]), u32s(a[2])) as u64);
    VfpMulAdd64(3) => |c, a| Ok(vfp::muladd64(c, a[0], a[1], a[2]));
    VfpSqrt32(1) => |c, a| Ok(vfp::sqrt32(c, u32s(a[0])) as u64);
    VfpSqrt64(1) => |c, a| Ok(vfp::sqrt64(c, a[0]));
    VfpCmp32(3) => |c, a| {
        vfp::cmp32(c, u32s(a[0]), u32s(a[1]), a[2] != 0);
        Ok(0)
    };
    VfpCmp64(3) => |c, a| {
        vfp::cmp64(c, a[0], a[1], a[2] != 0);
        Ok(0)
    };
    VfpF32ToF64(1) => |c, a| Ok(vfp::f32_to_f64(c, u32s(a[0])));
    VfpF64ToF32(1) => |c, a| Ok(vfp::f64_to_f32(c, a[0]) as u64);
    VfpToInt32(2) => |c, a| Ok(vfp::to_int32(c, u32s(a[0]), u32s(a[1])) as u64);
    VfpToInt64(2) => |c, a| Ok(vfp::to_int64(c, a[0], u32s(a[1])) as u64);
    VfpFromInt32(2) => |c, a| Ok(vfp::from_int32(c, u32s(a[0]), a[1] != 0) as u64);
    VfpFromInt64(2) => |c, a| Ok(vfp::from_int64(c, u32s(a[0]), a[1] != 0));
    VfpToFix32(3) => |c, a| Ok(vfp::to_fix32(c, u32s(a[0]), u32s(a[1]), u32s(a[2])) as u64);
    VfpToFix64(3) => |c, a| Ok(vfp::to_fix64(c, a[0], u32s(a[1]), u32s(a[2])) as u64);
    VfpFromFix32(3) => |c, a| Ok(vfp::from_fix32(c, u32s(a[0]), u32s(a[1]), u32s(a[2])) as u64);
    VfpFromFix64(3) => |c, a| Ok(vfp::from_fix64(c, u32s(a[0]), u32s(a[1]), u32s(a[2])));
    VfpRint32(2) => |c, a| Ok(vfp::rint32(c, u32s(a[0]), u32s(a[1])) as u64);
    VfpRint64(2) => |c, a| Ok(vfp::rint64(c, a[0], u32s(a[1])));
    SetFpscr(1) => |c, a| {
        vfp::set_fpscr(c, u32s(a[0]));
        Ok(0)
    };

    // ── Advanced SIMD ──
    /// Lane-wise `op(a, b)` on one 64-bit register; the last argument
    /// is `op << 2 | size`.
    NeonBinop(3) => |c, a| Ok(neon::binop(c, a[0], a[1], u32s(a[2])));
    NeonFma(4) => |c, a| Ok(neon::fma(c, a[0], a[1], a[2], a[3] != 0));
    NeonUnop(2) => |c, a| Ok(neon::unop(c, a[0], u32s(a[1])));
    NeonLong(3) => |c, a| Ok(neon::long(c, u32s(a[0]), u32s(a[1]), u32s(a[2])));
    NeonNarrow(3) => |c, a| Ok(neon::narrow(c, a[0], a[1], u32s(a[2])) as u64);
    NeonShiftImm(3) => |c, a| Ok(neon::shift_imm(c, a[0], u32s(a[1]), u32s(a[2])));
    NeonShiftIns(4) => |_, a| Ok(neon::shift_insert(a[0], a[1], u32s(a[2]), u32s(a[3])));
    NeonPermute(3) => |c, a| {
        neon::permute(c, u32s(a[0]), u32s(a[1]), u32s(a[2]));
        Ok(0)
    };
    NeonTbl(4) => |c, a| Ok(neon::tbl(c, a[0], a[1], u32s(a[2]), u32s(a[3])));
    NeonCvtFixed(3) => |c, a| Ok(neon::cvt_fixed(c, a[0], u32s(a[1]), u32s(a[2])));
}

impl From<Helper> for u32 {
    fn from(h: Helper) -> u32 {
        h as u32
    }
}

impl TryFrom<u32> for Helper {
    type Error = ExecError;

    fn try_from(id: u32) -> Result<Self, ExecError> {
        Helper::ALL
            .get(id as usize)
            .copied()
            .ok_or(ExecError::UnknownHelper(id))
    }
}

/// Run helper `id` with `args` against `cpu`.
pub fn call(cpu: &mut ArmCpu, id: u32, args: &[u64]) -> Result<u64, Unwind> {
    let h = Helper::try_from(id)?;
    if args.len() < h.nargs() {
        log::error!("helper {} called with {} of {} args", h.name(), args.len(), h.nargs());
        return Err(ExecError::UnknownHelper(id).into());
    }
    log::trace!("helper {}({:x?})", h.name(), args);
    (h.func())(cpu, args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for (i, h) in Helper::ALL.iter().enumerate() {
            assert_eq!(u32::from(*h), i as u32);
            assert_eq!(Helper::try_from(i as u32), Ok(*h));
        }
        assert_eq!(
            Helper::try_from(Helper::ALL.len() as u32),
            Err(ExecError::UnknownHelper(Helper::ALL.len() as u32))
        );
    }
}
