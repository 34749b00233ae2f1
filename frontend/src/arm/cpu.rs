//! AArch32 CPU state.
//!
//! `ArmEnv` is the `#[repr(C)]` block that IR globals index into;
//! `ArmCpu` wraps it together with the model configuration and the
//! coprocessor register table and implements the architectural state
//! transitions (mode switch, CPSR access, exception recording).

use std::mem::offset_of;
use std::sync::Arc;

use tcg_exec::Unwind;

use super::config::{ArmCpuConfig, ArmFeature, ConfigError};
use super::coproc::{CpRegError, CpRegTable};
use super::syndrome::{EXCP_HLT, EXCP_UDEF};

// ── Processor modes ──────────────────────────────────────────────

pub const MODE_USR: u32 = 0x10;
pub const MODE_FIQ: u32 = 0x11;
pub const MODE_IRQ: u32 = 0x12;
pub const MODE_SVC: u32 = 0x13;
pub const MODE_MON: u32 = 0x16;
pub const MODE_ABT: u32 = 0x17;
pub const MODE_HYP: u32 = 0x1a;
pub const MODE_UND: u32 = 0x1b;
pub const MODE_SYS: u32 = 0x1f;

// ── CPSR bits ────────────────────────────────────────────────────

pub const CPSR_M: u32 = 0x1f;
pub const CPSR_T: u32 = 1 << 5;
pub const CPSR_F: u32 = 1 << 6;
pub const CPSR_I: u32 = 1 << 7;
pub const CPSR_A: u32 = 1 << 8;
pub const CPSR_E: u32 = 1 << 9;
pub const CPSR_IT_2_7: u32 = 0xfc00;
pub const CPSR_GE: u32 = 0xf << 16;
pub const CPSR_IL: u32 = 1 << 20;
pub const CPSR_J: u32 = 1 << 24;
pub const CPSR_IT_0_1: u32 = 3 << 25;
pub const CPSR_Q: u32 = 1 << 27;
pub const CPSR_V: u32 = 1 << 28;
pub const CPSR_C: u32 = 1 << 29;
pub const CPSR_Z: u32 = 1 << 30;
pub const CPSR_N: u32 = 1 << 31;

pub const CPSR_NZCV: u32 = CPSR_N | CPSR_Z | CPSR_C | CPSR_V;
pub const CPSR_AIF: u32 = CPSR_A | CPSR_I | CPSR_F;
pub const CPSR_IT: u32 = CPSR_IT_0_1 | CPSR_IT_2_7;
/// Bits held outside `uncached_cpsr`.
pub const CACHED_CPSR_BITS: u32 = CPSR_T | CPSR_GE | CPSR_IT | CPSR_Q | CPSR_NZCV;
/// Bits writable from User mode.
pub const CPSR_USER: u32 = CPSR_NZCV | CPSR_Q | CPSR_GE | CPSR_E;
/// Execution state bits, never written by MSR to the CPSR.
pub const CPSR_EXEC: u32 = CPSR_T | CPSR_IT | CPSR_J | CPSR_IL;

// ── System register bits used outside the coprocessor table ─────

pub const SCTLR_M: u32 = 1 << 0;
pub const SCTLR_A: u32 = 1 << 1;
pub const SCTLR_B: u32 = 1 << 7;
pub const SCTLR_V: u32 = 1 << 13;
pub const SCTLR_NMFI: u32 = 1 << 27;

pub const SCR_NS: u32 = 1 << 0;
pub const SCR_FW: u32 = 1 << 4;
pub const SCR_AW: u32 = 1 << 5;
pub const SCR_SMD: u32 = 1 << 7;
pub const SCR_HCE: u32 = 1 << 8;

pub const HCR_TWI: u32 = 1 << 13;
pub const HCR_TWE: u32 = 1 << 14;
pub const HCR_TSC: u32 = 1 << 19;
pub const HCR_TGE: u32 = 1 << 27;
pub const HCR_HCD: u32 = 1 << 29;

pub const FPEXC_EN: u32 = 1 << 30;

/// Indices into `VfpState::xregs`.
pub const VFP_FPSID: usize = 0;
pub const VFP_FPSCR: usize = 1;
pub const VFP_MVFR2: usize = 5;
pub const VFP_MVFR1: usize = 6;
pub const VFP_MVFR0: usize = 7;
pub const VFP_FPEXC: usize = 8;
pub const VFP_FPINST: usize = 9;
pub const VFP_FPINST2: usize = 10;

/// M-profile CONTROL.nPRIV.
pub const V7M_CONTROL_NPRIV: u32 = 1 << 0;
/// M-profile CONTROL.SPSEL.
pub const V7M_CONTROL_SPSEL: u32 = 1 << 1;

/// Memory indices (`mem_idx` of guest accesses).
pub const MMU_USER_NS: u32 = 0;
pub const MMU_PL1_NS: u32 = 1;
pub const MMU_PL2: u32 = 2;
pub const MMU_USER_S: u32 = 3;
pub const MMU_PL1_S: u32 = 4;

// ── Register file ────────────────────────────────────────────────

/// VFP/Advanced SIMD register file and control registers.
#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct VfpState {
    /// D0-D31; Q`n` is D`2n`:D`2n+1` and S`2n`/S`2n+1` are the low
    /// and high halves of D`n`.
    pub zregs: [u64; 32],
    /// FPSID, FPSCR, MVFR*, FPEXC, FPINST*. FPSCR holds every field,
    /// including QC, LEN and STRIDE.
    pub xregs: [u32; 16],
}

/// The subset of CP15 (and CP14) state with storage in the env.
#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct Cp15State {
    pub sctlr: u32,
    pub actlr: u32,
    pub cpacr: u32,
    pub ttbcr: u32,
    pub ttbr0: u64,
    pub ttbr1: u64,
    pub par: u64,
    pub dacr: u32,
    pub dfsr: u32,
    pub ifsr: u32,
    pub dfar: u32,
    pub ifar: u32,
    pub prrr: u32,
    pub nmrr: u32,
    pub contextidr: u32,
    pub fcseidr: u32,
    pub tpidrurw: u32,
    pub tpidruro: u32,
    pub tpidrprw: u32,
    pub vbar: u32,
    pub mvbar: u32,
    pub scr: u32,
    pub sder: u32,
    pub nsacr: u32,
    pub hcr: u32,
    pub hstr: u32,
    pub hcptr: u32,
    pub hsctlr: u32,
    pub hvbar: u32,
    pub htpidr: u32,
    pub cntfrq: u32,
    pub cntkctl: u32,
    pub cntpct: u64,
    pub csselr: u32,
    /// Debug status and control (DBGDSCR), holding MDSCR.SS in bit 0.
    pub mdscr: u32,
}

/// M-profile system state.
#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct V7mState {
    /// Inactive stack pointer (PSP when MSP is in use, and the reverse).
    pub other_sp: u32,
    pub primask: u32,
    pub basepri: u32,
    pub faultmask: u32,
    pub control: u32,
    /// Current exception number (IPSR).
    pub exception: u32,
}

/// The exception most recently raised by translated code.
///
/// Exceptions are recorded here, never delivered; the embedder
/// reads the record after the execution loop stops.
#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct ExceptionState {
    pub index: u32,
    pub syndrome: u32,
    pub target_el: u32,
    pub vaddress: u32,
    pub fsr: u32,
}

/// AArch32 CPU architectural state.
///
/// Layout must be `#[repr(C)]` so that IR globals can reference
/// fields at fixed offsets from the env pointer.
#[repr(C)]
#[derive(Debug, Clone, Default)]
pub struct ArmEnv {
    /// R0-R15 of the current mode.
    pub regs: [u32; 16],
    /// Carry flag, 0 or 1.
    pub cf: u32,
    /// Overflow flag in bit 31.
    pub vf: u32,
    /// Negative flag in bit 31.
    pub nf: u32,
    /// Zero flag: Z is set when this is zero.
    pub zf: u32,
    /// Sticky saturation flag, 0 or 1.
    pub qf: u32,
    /// GE[3:0].
    pub ge: u32,
    pub thumb: u32,
    /// IT state, ITSTATE[7:0].
    pub condexec_bits: u32,
    /// CPSR bits not held in the fields above.
    pub uncached_cpsr: u32,
    /// SPSR of the current mode.
    pub spsr: u32,
    pub banked_spsr: [u32; 8],
    pub banked_r13: [u32; 8],
    pub banked_r14: [u32; 8],
    /// R8-R12 of the non-FIQ modes while in FIQ mode.
    pub usr_regs: [u32; 5],
    /// R8-R12 of FIQ mode while in any other mode.
    pub fiq_regs: [u32; 5],
    pub elr_hyp: u32,
    /// Monitored address; `u64::MAX` when the monitor is open.
    pub exclusive_addr: u64,
    pub exclusive_val: u64,
    pub vfp: VfpState,
    pub cp15: Cp15State,
    pub v7m: V7mState,
    pub exception: ExceptionState,
    /// PSTATE.SS for software step.
    pub pstate_ss: u32,
    pub halted: u32,
    /// Non-zero while the executing instruction may touch I/O with
    /// instruction counting on.
    pub can_do_io: u32,
    pub event_register: u32,
    /// Cached `TbFlags::pack()`, refreshed by `rebuild_hflags`.
    pub hflags: u64,
}

// ── Field offsets ────────────────────────────────────────────────

pub const fn reg_offset(n: usize) -> i64 {
    (offset_of!(ArmEnv, regs) + n * 4) as i64
}

pub const CF_OFFSET: i64 = offset_of!(ArmEnv, cf) as i64;
pub const VF_OFFSET: i64 = offset_of!(ArmEnv, vf) as i64;
pub const NF_OFFSET: i64 = offset_of!(ArmEnv, nf) as i64;
pub const ZF_OFFSET: i64 = offset_of!(ArmEnv, zf) as i64;
pub const QF_OFFSET: i64 = offset_of!(ArmEnv, qf) as i64;
pub const GE_OFFSET: i64 = offset_of!(ArmEnv, ge) as i64;
pub const THUMB_OFFSET: i64 = offset_of!(ArmEnv, thumb) as i64;
pub const CONDEXEC_OFFSET: i64 = offset_of!(ArmEnv, condexec_bits) as i64;
pub const SPSR_OFFSET: i64 = offset_of!(ArmEnv, spsr) as i64;
pub const EXCLUSIVE_ADDR_OFFSET: i64 = offset_of!(ArmEnv, exclusive_addr) as i64;
pub const EXCLUSIVE_VAL_OFFSET: i64 = offset_of!(ArmEnv, exclusive_val) as i64;
pub const PSTATE_SS_OFFSET: i64 = offset_of!(ArmEnv, pstate_ss) as i64;
pub const CAN_DO_IO_OFFSET: i64 = offset_of!(ArmEnv, can_do_io) as i64;
pub const ELR_HYP_OFFSET: i64 = offset_of!(ArmEnv, elr_hyp) as i64;

const VFP_BASE: usize = offset_of!(ArmEnv, vfp);
const ZREGS_BASE: usize = VFP_BASE + offset_of!(VfpState, zregs);
const XREGS_BASE: usize = VFP_BASE + offset_of!(VfpState, xregs);
const CP15_BASE: usize = offset_of!(ArmEnv, cp15);

pub const fn vfp_xreg_offset(n: usize) -> i64 {
    (XREGS_BASE + n * 4) as i64
}

pub const FPSCR_OFFSET: i64 = vfp_xreg_offset(VFP_FPSCR);

/// Offset of D`reg`.
pub const fn neon_full_reg_offset(reg: usize) -> i64 {
    (ZREGS_BASE + reg * 8) as i64
}

/// Offset of S`reg` (`dp == false`) or D`reg` (`dp == true`).
pub const fn vfp_reg_offset(dp: bool, reg: usize) -> i64 {
    if dp {
        return neon_full_reg_offset(reg);
    }
    let mut ofs = ZREGS_BASE + (reg >> 1) * 8;
    let upper = reg & 1 != 0;
    if upper != cfg!(target_endian = "big") {
        ofs += 4;
    }
    ofs as i64
}

/// Offset of element `element` of size `1 << size` in D`reg`.
pub const fn neon_element_offset(reg: usize, element: usize, size: u32) -> i64 {
    let esize = 1usize << size;
    let mut ofs = element * esize;
    if cfg!(target_endian = "big") && esize < 8 {
        ofs ^= 8 - esize;
    }
    neon_full_reg_offset(reg) + ofs as i64
}

/// Offset of a field of `Cp15State`, as the coprocessor table stores
/// it.
pub const fn cp15_offset(field: usize) -> i64 {
    (CP15_BASE + field) as i64
}

#[macro_export]
#[doc(hidden)]
macro_rules! cp15_field {
    ($f:ident) => {
        $crate::arm::cpu::cp15_offset(::std::mem::offset_of!(
            $crate::arm::cpu::Cp15State,
            $f
        ))
    };
}

// ── Banking ──────────────────────────────────────────────────────

/// Index into `banked_r13`/`banked_spsr` for `mode`.
pub fn bank_number(mode: u32) -> usize {
    match mode {
        MODE_USR | MODE_SYS => 0,
        MODE_SVC => 1,
        MODE_ABT => 2,
        MODE_UND => 3,
        MODE_IRQ => 4,
        MODE_FIQ => 5,
        MODE_HYP => 6,
        MODE_MON => 7,
        _ => {
            log::warn!("bad mode {mode:#x} in bank_number");
            0
        }
    }
}

/// Index into `banked_r14`; Hyp mode shares LR with User mode.
pub fn r14_bank_number(mode: u32) -> usize {
    if mode == MODE_HYP {
        0
    } else {
        bank_number(mode)
    }
}

/// CPSR bits implemented for the given feature set.
pub fn cpsr_valid_mask(features: ArmFeature) -> u32 {
    let mut valid = CPSR_M | CPSR_AIF | CPSR_IL | CPSR_NZCV;
    if features.contains(ArmFeature::V4T) {
        valid |= CPSR_T;
    }
    if features.contains(ArmFeature::V5) {
        valid |= CPSR_Q;
    }
    if features.contains(ArmFeature::V6) {
        valid |= CPSR_E | CPSR_GE;
    }
    if features.contains(ArmFeature::THUMB2) {
        valid |= CPSR_IT;
    }
    if features.contains(ArmFeature::JAZELLE) {
        valid |= CPSR_J;
    }
    valid
}

/// Who is writing the CPSR; decides which mode changes are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpsrWriteType {
    /// MSR, CPS and friends.
    ByInstr,
    /// RFE, exception-returning LDM/SUBS, ERET.
    ExceptionReturn,
    /// Reset and state restore: no checks, no side effects.
    Raw,
}

// ── Translation flags ────────────────────────────────────────────

/// Translation-relevant CPU state, packed into the TB `flags` word.
///
/// Everything the translator specialises on must be here, so that a
/// TB is only reused under the state it was generated for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TbFlags {
    pub thumb: bool,
    pub condexec: u8,
    pub sctlr_b: bool,
    pub be_data: bool,
    pub mmu_idx: u8,
    pub current_el: u8,
    pub ns: bool,
    pub fp_excp_el: u8,
    pub vfp_enabled: bool,
    pub vec_len: u8,
    pub vec_stride: u8,
    pub align_mem: bool,
    pub ss_active: bool,
    pub pstate_ss: bool,
    pub handler: bool,
    pub hstr_active: bool,
    pub illegal: bool,
    /// Secure EL0 whose exceptions go to AArch32 EL3.
    pub secure_routed_to_el3: bool,
}

impl TbFlags {
    pub fn pack(&self) -> u64 {
        let mut f = self.thumb as u64;
        f |= (self.condexec as u64) << 1;
        f |= (self.sctlr_b as u64) << 9;
        f |= (self.be_data as u64) << 10;
        f |= ((self.mmu_idx & 7) as u64) << 11;
        f |= ((self.current_el & 3) as u64) << 14;
        f |= (self.ns as u64) << 16;
        f |= ((self.fp_excp_el & 3) as u64) << 17;
        f |= (self.vfp_enabled as u64) << 19;
        f |= ((self.vec_len & 7) as u64) << 20;
        f |= ((self.vec_stride & 3) as u64) << 23;
        f |= (self.align_mem as u64) << 25;
        f |= (self.ss_active as u64) << 26;
        f |= (self.pstate_ss as u64) << 27;
        f |= (self.handler as u64) << 28;
        f |= (self.hstr_active as u64) << 29;
        f |= (self.illegal as u64) << 30;
        f |= (self.secure_routed_to_el3 as u64) << 31;
        f
    }

    pub fn unpack(f: u64) -> Self {
        let bit = |n: u32| (f >> n) & 1 != 0;
        let field = |n: u32, len: u32| ((f >> n) & ((1 << len) - 1)) as u8;
        Self {
            thumb: bit(0),
            condexec: field(1, 8),
            sctlr_b: bit(9),
            be_data: bit(10),
            mmu_idx: field(11, 3),
            current_el: field(14, 2),
            ns: bit(16),
            fp_excp_el: field(17, 2),
            vfp_enabled: bit(19),
            vec_len: field(20, 3),
            vec_stride: field(23, 2),
            align_mem: bit(25),
            ss_active: bit(26),
            pstate_ss: bit(27),
            handler: bit(28),
            hstr_active: bit(29),
            illegal: bit(30),
            secure_routed_to_el3: bit(31),
        }
    }
}

// ── CPU ──────────────────────────────────────────────────────────

/// Errors building an `ArmCpu`.
#[derive(Debug, thiserror::Error)]
pub enum CpuInitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    CpReg(#[from] CpRegError),
}

/// An AArch32 CPU: state, model and coprocessor registers.
pub struct ArmCpu {
    pub env: Box<ArmEnv>,
    pub config: ArmCpuConfig,
    pub cpregs: Arc<CpRegTable>,
}

impl ArmCpu {
    /// Build a CPU for `config` (finalized here) and reset it.
    pub fn new(config: ArmCpuConfig) -> Result<Self, CpuInitError> {
        let config = config.finalize()?;
        let cpregs = Arc::new(CpRegTable::for_config(&config)?);
        let mut cpu = Self {
            env: Box::default(),
            config,
            cpregs,
        };
        cpu.reset();
        Ok(cpu)
    }

    pub fn has(&self, f: ArmFeature) -> bool {
        self.config.features.contains(f)
    }

    pub fn is_m_profile(&self) -> bool {
        self.has(ArmFeature::M)
    }

    /// Architectural reset.
    pub fn reset(&mut self) {
        *self.env = ArmEnv::default();
        let cfg = &self.config;
        let env = &mut *self.env;

        self.cpregs.reset(env);
        env.exclusive_addr = u64::MAX;
        env.zf = 1;

        env.vfp.xregs[VFP_FPSID] = cfg.fpsid;
        env.vfp.xregs[VFP_MVFR0] = cfg.mvfr0;
        env.vfp.xregs[VFP_MVFR1] = cfg.mvfr1;
        env.vfp.xregs[VFP_MVFR2] = cfg.mvfr2;

        if cfg.features.contains(ArmFeature::M) {
            env.uncached_cpsr = 0;
            env.thumb = 1;
            env.v7m.control = 0;
            self.rebuild_hflags();
            return;
        }

        let mode = cfg.reset_mode;
        env.uncached_cpsr = mode | CPSR_AIF;
        if cfg.user_only {
            env.uncached_cpsr = MODE_USR;
            // User-mode emulation runs with the FPU already enabled.
            env.vfp.xregs[VFP_FPEXC] = FPEXC_EN;
            env.cp15.cpacr = 0xf << 20;
        }
        if cfg.be32 {
            env.cp15.sctlr |= SCTLR_B;
        }
        if cfg.big_endian_data {
            env.uncached_cpsr |= CPSR_E;
        }
        if cfg.features.contains(ArmFeature::EL3) && !cfg.user_only {
            // Reset into Secure state; Monitor mode counts as secure anyway.
            env.cp15.scr &= !SCR_NS;
        } else {
            env.cp15.scr |= SCR_NS;
        }
        if env.cp15.sctlr & SCTLR_V != 0 {
            env.regs[15] = 0xffff_0000;
        }
        self.rebuild_hflags();
    }

    // ── CPSR ──

    pub fn cpsr_read(&self) -> u32 {
        let env = &*self.env;
        env.uncached_cpsr
            | (env.nf & 0x8000_0000)
            | (((env.zf == 0) as u32) << 30)
            | (env.cf << 29)
            | ((env.vf & 0x8000_0000) >> 3)
            | (env.qf << 27)
            | (env.thumb << 5)
            | ((env.condexec_bits & 3) << 25)
            | ((env.condexec_bits & 0xfc) << 8)
            | (env.ge << 16)
    }

    pub fn cpsr_write(&mut self, val: u32, mut mask: u32, write_type: CpsrWriteType) {
        {
            let env = &mut *self.env;
            if mask & CPSR_NZCV != 0 {
                env.zf = !val & CPSR_Z;
                env.nf = val;
                env.cf = (val >> 29) & 1;
                env.vf = (val << 3) & 0x8000_0000;
            }
            if mask & CPSR_Q != 0 {
                env.qf = (val & CPSR_Q != 0) as u32;
            }
            if mask & CPSR_T != 0 {
                env.thumb = (val & CPSR_T != 0) as u32;
            }
            if mask & CPSR_IT_0_1 != 0 {
                env.condexec_bits &= !3;
                env.condexec_bits |= (val >> 25) & 3;
            }
            if mask & CPSR_IT_2_7 != 0 {
                env.condexec_bits &= 3;
                env.condexec_bits |= (val >> 8) & 0xfc;
            }
            if mask & CPSR_GE != 0 {
                env.ge = (val >> 16) & 0xf;
            }
        }

        // Without EL2, SCR.AW/FW decide whether Non-secure code may
        // change CPSR.A and CPSR.F.
        if write_type != CpsrWriteType::Raw
            && !self.has(ArmFeature::EL2)
            && self.has(ArmFeature::EL3)
            && !self.is_secure()
        {
            let changed = (self.env.uncached_cpsr ^ val) & mask;
            if changed & CPSR_A != 0 && self.env.cp15.scr & SCR_AW == 0 {
                mask &= !CPSR_A;
            }
            if changed & CPSR_F != 0 {
                if self.env.cp15.scr & SCR_FW == 0 {
                    mask &= !CPSR_F;
                }
                if self.env.cp15.sctlr & SCTLR_NMFI != 0 && val & CPSR_F != 0 {
                    mask &= !CPSR_F;
                }
            }
        }

        if write_type != CpsrWriteType::Raw
            && (self.env.uncached_cpsr ^ val) & mask & CPSR_M != 0
        {
            if self.env.uncached_cpsr & CPSR_M == MODE_USR {
                mask &= !CPSR_M;
            } else if self.bad_mode_switch(val & CPSR_M, write_type) {
                mask &= !CPSR_M;
                if write_type == CpsrWriteType::ExceptionReturn {
                    // Illegal return: keep the mode, flag PSTATE.IL.
                    self.env.uncached_cpsr |= CPSR_IL;
                    mask &= !CPSR_IL;
                }
            } else {
                self.switch_mode(val & CPSR_M);
            }
        } else if write_type == CpsrWriteType::Raw && mask & CPSR_M != 0 {
            self.switch_mode(val & CPSR_M);
        }

        mask &= !CACHED_CPSR_BITS;
        let env = &mut *self.env;
        env.uncached_cpsr = (env.uncached_cpsr & !mask) | (val & mask);
    }

    fn bad_mode_switch(&self, mode: u32, write_type: CpsrWriteType) -> bool {
        let cur = self.env.uncached_cpsr & CPSR_M;
        if write_type == CpsrWriteType::ByInstr && (cur == MODE_HYP || mode == MODE_HYP) {
            return true;
        }
        match mode {
            MODE_USR => false,
            MODE_SYS | MODE_SVC | MODE_ABT | MODE_UND | MODE_IRQ | MODE_FIQ => {
                write_type == CpsrWriteType::ByInstr
                    && self.env.cp15.hcr & HCR_TGE != 0
                    && cur == MODE_MON
                    && !self.is_secure_below_el3()
            }
            MODE_HYP => !self.has(ArmFeature::EL2) || self.current_el() < 2,
            MODE_MON => !self.has(ArmFeature::EL3) || self.current_el() < 3,
            _ => true,
        }
    }

    /// Switch register banks from the current mode to `mode`. Only
    /// the banked registers move; the caller updates CPSR.M.
    pub fn switch_mode(&mut self, mode: u32) {
        let env = &mut *self.env;
        let old = env.uncached_cpsr & CPSR_M;
        if mode == old {
            return;
        }
        if old == MODE_FIQ {
            env.fiq_regs.copy_from_slice(&env.regs[8..13]);
            env.regs[8..13].copy_from_slice(&env.usr_regs);
        } else if mode == MODE_FIQ {
            env.usr_regs.copy_from_slice(&env.regs[8..13]);
            env.regs[8..13].copy_from_slice(&env.fiq_regs);
        }

        let i = bank_number(old);
        env.banked_r13[i] = env.regs[13];
        env.banked_spsr[i] = env.spsr;
        let i = bank_number(mode);
        env.regs[13] = env.banked_r13[i];
        env.spsr = env.banked_spsr[i];

        env.banked_r14[r14_bank_number(old)] = env.regs[14];
        env.regs[14] = env.banked_r14[r14_bank_number(mode)];
        env.uncached_cpsr = (env.uncached_cpsr & !CPSR_M) | mode;
    }

    pub fn mode(&self) -> u32 {
        self.env.uncached_cpsr & CPSR_M
    }

    // ── Privilege and security ──

    pub fn is_secure_below_el3(&self) -> bool {
        self.has(ArmFeature::EL3) && self.env.cp15.scr & SCR_NS == 0
    }

    pub fn is_secure(&self) -> bool {
        if self.has(ArmFeature::EL3) && self.mode() == MODE_MON {
            return true;
        }
        self.is_secure_below_el3()
    }

    pub fn current_el(&self) -> u32 {
        if self.is_m_profile() {
            let handler = self.env.v7m.exception != 0;
            return (handler || self.env.v7m.control & V7M_CONTROL_NPRIV == 0) as u32;
        }
        match self.mode() {
            MODE_USR => 0,
            MODE_HYP => 2,
            MODE_MON => 3,
            _ if self.is_secure() => 3,
            _ => 1,
        }
    }

    pub fn el2_enabled(&self) -> bool {
        self.has(ArmFeature::EL2) && !self.is_secure_below_el3()
    }

    /// Target EL of exceptions that are not routed elsewhere.
    pub fn exception_target_el(&self) -> u32 {
        let el = self.current_el().max(1);
        if el == 1 && self.has(ArmFeature::EL3) && self.is_secure() {
            return 3;
        }
        el
    }

    pub fn mmu_index(&self) -> u32 {
        let el = self.current_el();
        if self.is_m_profile() {
            return el;
        }
        let secure = self.is_secure();
        match (el, secure) {
            (0, false) => MMU_USER_NS,
            (0, true) => MMU_USER_S,
            (2, _) => MMU_PL2,
            (_, false) => MMU_PL1_NS,
            (_, true) => MMU_PL1_S,
        }
    }

    /// Which EL traps FP/SIMD instructions at `cur_el`, or 0 if none.
    pub fn fp_exception_el(&self, cur_el: u32) -> u32 {
        if !self.has(ArmFeature::V6) {
            return 0;
        }
        let cpacr = self.env.cp15.cpacr;
        let fpen = (cpacr >> 20) & 3;
        if self.is_m_profile() {
            let priv_ok = cur_el != 0;
            let pass = match fpen {
                3 => true,
                1 => priv_ok,
                _ => false,
            };
            return (!pass) as u32;
        }
        let trapped = match fpen {
            1 => cur_el == 0,
            0 | 2 => true,
            _ => false,
        };
        if trapped {
            if cur_el == 3 || self.is_secure_below_el3() {
                return 3;
            }
            if cur_el <= 1 {
                return 1;
            }
        }
        if self.has(ArmFeature::EL3)
            && cur_el <= 2
            && !self.is_secure_below_el3()
            && self.env.cp15.nsacr & (1 << 10) == 0
        {
            return if cur_el == 2 { 2 } else { 1 };
        }
        if cur_el <= 2 && self.el2_enabled() && self.env.cp15.hcptr & (1 << 10) != 0 {
            return 2;
        }
        0
    }

    pub fn data_is_big_endian(&self) -> bool {
        if self.is_m_profile() {
            return self.config.big_endian_data;
        }
        // BE32 (SCTLR.B) is word-invariant: word accesses stay
        // little-endian and only sub-word addresses are swizzled.
        self.env.uncached_cpsr & CPSR_E != 0
    }

    /// Compute the translation flags for the current state.
    pub fn tb_flags(&self) -> TbFlags {
        let env = &*self.env;
        let el = self.current_el();
        let m = self.is_m_profile();
        let fpexc_en = env.vfp.xregs[VFP_FPEXC] & FPEXC_EN != 0;
        let fpscr = env.vfp.xregs[VFP_FPSCR];
        let ss_active = !m && env.cp15.mdscr & 1 != 0 && el == 0;
        let hstr_active =
            !m && el < 2 && self.el2_enabled() && env.cp15.hstr & 0xffff != 0;
        TbFlags {
            thumb: env.thumb != 0,
            condexec: env.condexec_bits as u8,
            sctlr_b: !m && env.cp15.sctlr & SCTLR_B != 0,
            be_data: self.data_is_big_endian(),
            mmu_idx: self.mmu_index() as u8,
            current_el: el as u8,
            ns: !m && !self.is_secure(),
            fp_excp_el: self.fp_exception_el(el) as u8,
            vfp_enabled: m || fpexc_en,
            vec_len: ((fpscr >> 16) & 7) as u8,
            vec_stride: ((fpscr >> 20) & 3) as u8,
            align_mem: env.cp15.sctlr & SCTLR_A != 0,
            ss_active,
            pstate_ss: ss_active && env.pstate_ss != 0,
            handler: m && env.v7m.exception != 0,
            hstr_active,
            illegal: !m && env.uncached_cpsr & CPSR_IL != 0,
            secure_routed_to_el3: el == 0 && self.has(ArmFeature::EL3) && self.is_secure(),
        }
    }

    /// Recompute the cached translation flags after a state change
    /// that the translator specialises on.
    pub fn rebuild_hflags(&mut self) {
        self.env.hflags = self.tb_flags().pack();
    }

    /// Flags word for the next TB lookup. Thumb and IT state change
    /// inside translated code without a rebuild, so they are read live
    /// on top of the cached word.
    pub fn lookup_flags(&self) -> u64 {
        let mut f = TbFlags::unpack(self.env.hflags);
        f.thumb = self.env.thumb != 0;
        f.condexec = self.env.condexec_bits as u8;
        f.pack()
    }

    // ── Exceptions ──

    /// Record an exception for the embedder and unwind out of the TB.
    pub fn raise_exception(&mut self, excp: u32, syndrome: u32, target_el: u32) -> Unwind {
        log::debug!(
            "exception {excp} syndrome {syndrome:#x} -> EL{target_el} at pc {:#x}",
            self.env.regs[15]
        );
        let env = &mut *self.env;
        env.exception.index = excp;
        env.exception.syndrome = syndrome;
        env.exception.target_el = target_el;
        env.exclusive_addr = u64::MAX;
        Unwind::Exception
    }

    pub fn raise_undef(&mut self, syndrome: u32) -> Unwind {
        let el = self.exception_target_el();
        self.raise_exception(EXCP_UDEF, syndrome, el)
    }

    /// Stop the CPU until an interrupt arrives.
    pub fn halt(&mut self) -> Unwind {
        self.env.halted = 1;
        self.env.exception.index = EXCP_HLT;
        Unwind::Exception
    }
}
