//! System helpers: CPSR and banked register access, hints, exception
//! entry checks and coprocessor register access.

use std::sync::Arc;

use tcg_exec::{ExecError, Unwind};

use crate::arm::config::ArmFeature;
use crate::arm::coproc::{read_cpreg, write_cpreg, CpAccessResult};
use crate::arm::cpu::*;
use crate::arm::syndrome::*;

// ── CPSR ──

pub fn cpsr_read(cpu: &mut ArmCpu) -> u32 {
    cpu.cpsr_read() & !CPSR_EXEC
}

pub fn cpsr_write(cpu: &mut ArmCpu, val: u32, mask: u32) {
    cpu.cpsr_write(val, mask, CpsrWriteType::ByInstr);
    cpu.rebuild_hflags();
}

/// CPSR write on exception return (RFE, LDM ^, SUBS PC, ERET).
pub fn cpsr_write_eret(cpu: &mut ArmCpu, val: u32) {
    let mask = cpsr_valid_mask(cpu.config.features);
    cpu.cpsr_write(val, mask, CpsrWriteType::ExceptionReturn);
    let env = &mut *cpu.env;
    env.regs[15] &= if env.thumb != 0 { !1 } else { !3 };
    cpu.rebuild_hflags();
}

// ── User and banked registers ──

pub fn get_user_reg(cpu: &mut ArmCpu, regno: u32) -> u32 {
    let env = &*cpu.env;
    let regno = regno as usize & 15;
    match regno {
        13 => env.banked_r13[bank_number(MODE_USR)],
        14 => env.banked_r14[r14_bank_number(MODE_USR)],
        8..=12 if cpu.mode() == MODE_FIQ => env.usr_regs[regno - 8],
        _ => env.regs[regno],
    }
}

pub fn set_user_reg(cpu: &mut ArmCpu, regno: u32, val: u32) {
    let fiq = cpu.mode() == MODE_FIQ;
    let env = &mut *cpu.env;
    let regno = regno as usize & 15;
    match regno {
        13 => env.banked_r13[bank_number(MODE_USR)] = val,
        14 => env.banked_r14[r14_bank_number(MODE_USR)] = val,
        8..=12 if fiq => env.usr_regs[regno - 8] = val,
        _ => env.regs[regno] = val,
    }
}

fn srs_from_sys_mode(cpu: &mut ArmCpu) -> Result<(), Unwind> {
    // SRS is UNPREDICTABLE from System mode; we UNDEF.
    if cpu.mode() == MODE_SYS {
        return Err(cpu.raise_undef(syn_uncategorized()));
    }
    Ok(())
}

pub fn get_r13_banked(cpu: &mut ArmCpu, mode: u32) -> Result<u32, Unwind> {
    srs_from_sys_mode(cpu)?;
    Ok(if cpu.mode() == mode {
        cpu.env.regs[13]
    } else {
        cpu.env.banked_r13[bank_number(mode)]
    })
}

pub fn set_r13_banked(cpu: &mut ArmCpu, mode: u32, val: u32) -> Result<(), Unwind> {
    srs_from_sys_mode(cpu)?;
    if cpu.mode() == mode {
        cpu.env.regs[13] = val;
    } else {
        cpu.env.banked_r13[bank_number(mode)] = val;
    }
    Ok(())
}

/// Register numbers used by the banked MRS/MSR helpers beyond R8-R14.
pub const BANKED_SPSR: u32 = 16;
pub const BANKED_ELR_HYP: u32 = 17;

/// Run-time checks for MRS/MSR (banked) that depend on the current
/// mode rather than only on the translation flags.
fn banked_exc_checks(cpu: &mut ArmCpu, tgtmode: u32, regno: u32) -> Result<(), Unwind> {
    let curmode = cpu.mode();
    let bad = if tgtmode == MODE_HYP {
        match regno {
            BANKED_ELR_HYP => curmode != MODE_HYP && curmode != MODE_MON,
            _ => curmode != MODE_MON,
        }
    } else {
        curmode == tgtmode || (tgtmode == MODE_MON && !cpu.is_secure())
    };
    if bad || cpu.current_el() == 0 {
        return Err(cpu.raise_undef(syn_uncategorized()));
    }
    Ok(())
}

pub fn mrs_banked(cpu: &mut ArmCpu, tgtmode: u32, regno: u32) -> Result<u32, Unwind> {
    banked_exc_checks(cpu, tgtmode, regno)?;
    let curmode = cpu.mode();
    let env = &*cpu.env;
    Ok(match regno {
        BANKED_SPSR => env.banked_spsr[bank_number(tgtmode)],
        BANKED_ELR_HYP => env.elr_hyp,
        13 => env.banked_r13[bank_number(tgtmode)],
        14 => env.banked_r14[r14_bank_number(tgtmode)],
        8..=12 => {
            let i = regno as usize - 8;
            match (tgtmode == MODE_FIQ, curmode == MODE_FIQ) {
                (true, true) | (false, false) => env.regs[regno as usize],
                (true, false) => env.fiq_regs[i],
                (false, true) => env.usr_regs[i],
            }
        }
        _ => return Err(cpu.raise_undef(syn_uncategorized())),
    })
}

pub fn msr_banked(cpu: &mut ArmCpu, val: u32, tgtmode: u32, regno: u32) -> Result<(), Unwind> {
    banked_exc_checks(cpu, tgtmode, regno)?;
    let curmode = cpu.mode();
    let env = &mut *cpu.env;
    match regno {
        BANKED_SPSR => env.banked_spsr[bank_number(tgtmode)] = val,
        BANKED_ELR_HYP => env.elr_hyp = val,
        13 => env.banked_r13[bank_number(tgtmode)] = val,
        14 => env.banked_r14[r14_bank_number(tgtmode)] = val,
        8..=12 => {
            let i = regno as usize - 8;
            match (tgtmode == MODE_FIQ, curmode == MODE_FIQ) {
                (true, true) | (false, false) => env.regs[regno as usize] = val,
                (true, false) => env.fiq_regs[i] = val,
                (false, true) => env.usr_regs[i] = val,
            }
        }
        _ => {
            log::debug!("MSR (banked) to bad register {regno}");
        }
    }
    Ok(())
}

pub fn setend(cpu: &mut ArmCpu) {
    cpu.env.uncached_cpsr ^= CPSR_E;
    cpu.rebuild_hflags();
}

// ── Hints ──

const SCTLR_NTWI: u32 = 1 << 16;
const SCTLR_NTWE: u32 = 1 << 18;
const SCR_TWI: u32 = 1 << 12;
const SCR_TWE: u32 = 1 << 13;

/// EL that WFI (`is_wfe == false`) or WFE traps to, or 0.
fn check_wfx_trap(cpu: &ArmCpu, is_wfe: bool) -> u32 {
    if cpu.is_m_profile() {
        return 0;
    }
    let cur_el = cpu.current_el();
    let env = &*cpu.env;
    if cur_el < 1 {
        let ntw = if is_wfe { SCTLR_NTWE } else { SCTLR_NTWI };
        if env.cp15.sctlr & ntw == 0 && cpu.has(ArmFeature::V8) {
            return if cpu.is_secure_below_el3() && cpu.has(ArmFeature::EL3) {
                3
            } else {
                1
            };
        }
    }
    if cur_el < 2 && cpu.el2_enabled() {
        let tw = if is_wfe { HCR_TWE } else { HCR_TWI };
        if env.cp15.hcr & tw != 0 {
            return 2;
        }
    }
    if cur_el < 3 && cpu.has(ArmFeature::EL3) && cpu.has(ArmFeature::V8) {
        let tw = if is_wfe { SCR_TWE } else { SCR_TWI };
        if env.cp15.scr & tw != 0 {
            return 3;
        }
    }
    0
}

/// WFI: halt, or trap if configured. The PC already points past the
/// instruction.
pub fn wfi(cpu: &mut ArmCpu, insn_len: u32) -> Result<(), Unwind> {
    let target_el = check_wfx_trap(cpu, false);
    if target_el != 0 {
        cpu.env.regs[15] = cpu.env.regs[15].wrapping_sub(insn_len);
        let syn = syn_wfx(true, 0xe, 0, insn_len == 2);
        return Err(cpu.raise_exception(EXCP_UDEF, syn, target_el));
    }
    Err(cpu.halt())
}

pub fn wfe(cpu: &mut ArmCpu, insn_len: u32) -> Result<(), Unwind> {
    let target_el = check_wfx_trap(cpu, true);
    if target_el != 0 {
        cpu.env.regs[15] = cpu.env.regs[15].wrapping_sub(insn_len);
        let syn = syn_wfx(true, 0xe, 1, insn_len == 2);
        return Err(cpu.raise_exception(EXCP_UDEF, syn, target_el));
    }
    if cpu.env.event_register != 0 {
        cpu.env.event_register = 0;
        return Ok(());
    }
    yield_(cpu)
}

pub fn yield_(cpu: &mut ArmCpu) -> Result<(), Unwind> {
    cpu.env.exception.index = EXCP_YIELD;
    Err(Unwind::Exception)
}

// ── HVC/SMC entry checks ──

pub fn pre_hvc(cpu: &mut ArmCpu) -> Result<(), Unwind> {
    let undef = if !cpu.has(ArmFeature::EL2) || cpu.is_secure_below_el3() {
        true
    } else if cpu.has(ArmFeature::EL3) {
        cpu.env.cp15.scr & SCR_HCE == 0
    } else {
        cpu.env.cp15.hcr & HCR_HCD != 0
    };
    if undef {
        return Err(cpu.raise_undef(syn_uncategorized()));
    }
    Ok(())
}

pub fn pre_smc(cpu: &mut ArmCpu, syndrome: u32) -> Result<(), Unwind> {
    let cur_el = cpu.current_el();
    let secure = cpu.is_secure();
    let smd = cpu.env.cp15.scr & SCR_SMD != 0 && !secure;
    let have_el3 = cpu.has(ArmFeature::EL3);

    // HCR.TSC traps SMC from Non-secure EL1 to Hyp, even when SMD is
    // set or EL3 is missing.
    if cur_el == 1 && cpu.el2_enabled() && cpu.env.cp15.hcr & HCR_TSC != 0 {
        return Err(cpu.raise_exception(EXCP_HYP_TRAP, syndrome, 2));
    }
    if !have_el3 || smd {
        return Err(cpu.raise_undef(syn_uncategorized()));
    }
    Ok(())
}

// ── Coprocessor registers ──

fn cpreg(cpu: &ArmCpu, id: u32) -> Result<Arc<crate::arm::coproc::CpRegTable>, Unwind> {
    if cpu.cpregs.get(id).is_none() {
        return Err(ExecError::UnknownHelper(id).into());
    }
    Ok(Arc::clone(&cpu.cpregs))
}

pub fn get_cp_reg(cpu: &mut ArmCpu, id: u32) -> Result<u64, Unwind> {
    let table = cpreg(cpu, id)?;
    let ri = table.get(id).ok_or(ExecError::UnknownHelper(id))?;
    Ok(read_cpreg(cpu, ri))
}

pub fn set_cp_reg(cpu: &mut ArmCpu, id: u32, v: u64) -> Result<(), Unwind> {
    let table = cpreg(cpu, id)?;
    let ri = table.get(id).ok_or(ExecError::UnknownHelper(id))?;
    write_cpreg(cpu, ri, v);
    Ok(())
}

/// Run-time access checks: the EL0 HSTR trap and the register's own
/// access function.
pub fn access_check_cp_reg(
    cpu: &mut ArmCpu,
    id: u32,
    syndrome: u32,
    isread: bool,
) -> Result<(), Unwind> {
    let table = cpreg(cpu, id)?;
    let ri = table.get(id).ok_or(ExecError::UnknownHelper(id))?;

    if cpu.current_el() == 0 && ri.cp == 15 && cpu.el2_enabled() {
        let mask = 1u32 << if ri.is64 { ri.crm } else { ri.crn };
        let mask = mask & !(1 << 4 | 1 << 14);
        if cpu.env.cp15.hstr & mask != 0 {
            return Err(cpu.raise_exception(EXCP_UDEF, syndrome, 2));
        }
    }

    let res = match ri.accessfn {
        Some(f) => f(cpu, ri, isread),
        None => CpAccessResult::Ok,
    };
    let (syn, el) = match res {
        CpAccessResult::Ok => return Ok(()),
        CpAccessResult::Trap => (syndrome, cpu.exception_target_el()),
        CpAccessResult::TrapEl2 => (syndrome, 2),
        CpAccessResult::TrapEl3 => (syndrome, 3),
        CpAccessResult::TrapUncategorized => (syn_uncategorized(), cpu.exception_target_el()),
    };
    log::debug!("cp access to {} trapped to EL{el}", ri.name);
    Err(cpu.raise_exception(EXCP_UDEF, syn, el))
}

// ── Exceptions ──

/// Prefetch abort for a misaligned PC.
pub fn exception_pc_alignment(cpu: &mut ArmCpu, vaddr: u32) -> Unwind {
    let el = cpu.exception_target_el();
    cpu.env.exception.vaddress = vaddr;
    cpu.env.exception.fsr = FSR_ALIGNMENT;
    cpu.raise_exception(EXCP_PREFETCH_ABORT, syn_pcalignment(), el)
}

/// BKPT: a debug exception to the debug target EL.
pub fn exception_bkpt_insn(cpu: &mut ArmCpu, syndrome: u32) -> Unwind {
    let route_to_el2 = cpu.current_el() < 2
        && cpu.el2_enabled()
        && cpu.env.cp15.hcr & HCR_TGE != 0;
    let el = if route_to_el2 { 2 } else { cpu.exception_target_el() };
    // Debug exceptions report FSR "debug event".
    cpu.env.exception.fsr = 0x2;
    cpu.raise_exception(EXCP_BKPT, syndrome, el)
}

// ── M-profile special registers ──

const SYSM_MSP: u32 = 8;
const SYSM_PSP: u32 = 9;
const SYSM_PRIMASK: u32 = 16;
const SYSM_BASEPRI: u32 = 17;
const SYSM_BASEPRI_MAX: u32 = 18;
const SYSM_FAULTMASK: u32 = 19;
const SYSM_CONTROL: u32 = 20;

/// Whether R13 currently holds the process stack pointer.
fn v7m_using_psp(cpu: &ArmCpu) -> bool {
    cpu.env.v7m.exception == 0 && cpu.env.v7m.control & V7M_CONTROL_SPSEL != 0
}

pub fn v7m_mrs(cpu: &mut ArmCpu, sysm: u32) -> u32 {
    let sysm = sysm & 0xff;
    let privileged = cpu.current_el() != 0;
    let env = &*cpu.env;
    let xpsr = || {
        let mut v = 0;
        if sysm & 4 == 0 {
            v |= cpu.cpsr_read() & (CPSR_NZCV | CPSR_Q);
            if cpu.has(ArmFeature::THUMB_DSP) {
                v |= env.ge << 16;
            }
        }
        if sysm & 1 != 0 {
            v |= env.v7m.exception;
        }
        v
    };
    match sysm {
        0..=7 => xpsr(),
        _ if !privileged && sysm != SYSM_CONTROL => 0,
        SYSM_MSP => {
            if v7m_using_psp(cpu) {
                env.v7m.other_sp
            } else {
                env.regs[13]
            }
        }
        SYSM_PSP => {
            if v7m_using_psp(cpu) {
                env.regs[13]
            } else {
                env.v7m.other_sp
            }
        }
        SYSM_PRIMASK => env.v7m.primask,
        SYSM_BASEPRI | SYSM_BASEPRI_MAX => env.v7m.basepri,
        SYSM_FAULTMASK => env.v7m.faultmask,
        SYSM_CONTROL => env.v7m.control,
        _ => {
            log::warn!("MRS of unknown M-profile special register {sysm}");
            0
        }
    }
}

/// `maskreg` packs the MSR mask field in bits \[11:10\] above SYSm.
pub fn v7m_msr(cpu: &mut ArmCpu, maskreg: u32, val: u32) {
    let mask = (maskreg >> 10) & 3;
    let sysm = maskreg & 0xff;
    let privileged = cpu.current_el() != 0;

    if sysm <= 7 {
        // Only the APSR part of the xPSR views is writable.
        if sysm & 4 == 0 {
            if mask & 2 != 0 {
                cpu.cpsr_write(val, CPSR_NZCV | CPSR_Q, CpsrWriteType::ByInstr);
            }
            if mask & 1 != 0 && cpu.has(ArmFeature::THUMB_DSP) {
                cpu.env.ge = (val >> 16) & 0xf;
            }
        }
        cpu.rebuild_hflags();
        return;
    }
    if !privileged {
        return;
    }
    let using_psp = v7m_using_psp(cpu);
    let env = &mut *cpu.env;
    match sysm {
        SYSM_MSP => {
            if using_psp {
                env.v7m.other_sp = val & !3;
            } else {
                env.regs[13] = val & !3;
            }
        }
        SYSM_PSP => {
            if using_psp {
                env.regs[13] = val & !3;
            } else {
                env.v7m.other_sp = val & !3;
            }
        }
        SYSM_PRIMASK => env.v7m.primask = val & 1,
        SYSM_BASEPRI => env.v7m.basepri = val & 0xff,
        SYSM_BASEPRI_MAX => {
            let v = val & 0xff;
            if v != 0 && (v < env.v7m.basepri || env.v7m.basepri == 0) {
                env.v7m.basepri = v;
            }
        }
        SYSM_FAULTMASK => env.v7m.faultmask = val & 1,
        SYSM_CONTROL => {
            // SPSEL is only writable from Thread mode.
            let new_spsel = val & V7M_CONTROL_SPSEL != 0;
            if env.v7m.exception == 0 && new_spsel != (env.v7m.control & V7M_CONTROL_SPSEL != 0) {
                std::mem::swap(&mut env.regs[13], &mut env.v7m.other_sp);
                env.v7m.control ^= V7M_CONTROL_SPSEL;
            }
            env.v7m.control =
                (env.v7m.control & !V7M_CONTROL_NPRIV) | (val & V7M_CONTROL_NPRIV);
        }
        _ => log::warn!("MSR to unknown M-profile special register {sysm}"),
    }
    cpu.rebuild_hflags();
}
