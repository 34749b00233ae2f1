//! Status registers, banked registers, coprocessor access and
//! system instructions.

use super::*;
use tcg_exec::ExitReason;
use tcg_frontend::arm::coproc::{CpRegKey, CpRegTable};
use tcg_frontend::arm::cpu::*;
use tcg_frontend::arm::syndrome::*;

const CORTEX_A15_MIDR: u32 = 0x412f_c0f1;

fn msr_cpsr(mask: u32, rm: u32) -> u32 {
    0xe120_f000 | (mask << 16) | rm
}

fn mrs(rd: u32, spsr: bool) -> u32 {
    0xe10f_0000 | ((spsr as u32) << 22) | (rd << 12)
}

// ── CPSR/SPSR ─────────────────────────────────────────────────

#[test]
fn test_msr_flags_then_mrs() {
    let mut m = user();
    m.env_mut().regs[0] = 0xf800_0000;
    run_a32(&mut m, &[msr_cpsr(0b1000, 0), mrs(1, false), svc(0)]);
    let r1 = m.env().regs[1];
    assert_eq!(r1 & 0xf800_0000, 0xf800_0000);
    assert_eq!(r1 & CPSR_M, MODE_USR);
    assert_eq!(nzcv(&m), 0xf);
}

#[test]
fn test_user_cannot_change_mode() {
    let mut m = user();
    m.env_mut().regs[0] = MODE_SVC;
    run_a32(&mut m, &[msr_cpsr(0b0001, 0), svc(0)]);
    assert_eq!(m.cpu.mode(), MODE_USR);
}

#[test]
fn test_mrs_spsr() {
    let mut m = privileged();
    m.env_mut().spsr = 0x6000_01d3;
    run_a32(&mut m, &[mrs(4, true), svc(0)]);
    assert_eq!(m.env().regs[4], 0x6000_01d3);
}

#[test]
fn test_mode_switch_banks_sp() {
    let mut m = privileged();
    m.env_mut().regs[0] = CPSR_AIF | MODE_SYS;
    m.env_mut().regs[1] = CPSR_AIF | MODE_SVC;
    m.env_mut().regs[13] = 0x1111;
    run_a32(
        &mut m,
        &[
            msr_cpsr(0b0001, 0),
            mov_reg(2, 13),
            mov_imm(13, 0x40),
            msr_cpsr(0b0001, 1),
            mov_reg(3, 13),
            svc(0),
        ],
    );
    let env = m.env();
    // SYS shares the USR bank, which is still zero after reset.
    assert_eq!(env.regs[2], 0);
    assert_eq!(env.regs[3], 0x1111);
    assert_eq!(env.banked_r13[bank_number(MODE_USR)], 0x40);
    assert_eq!(m.cpu.mode(), MODE_SVC);
}

#[test]
fn test_exception_return_restores_cpsr() {
    let mut m = privileged();
    m.env_mut().spsr = MODE_USR;
    m.env_mut().regs[14] = CODE + 0x20;
    m.env_mut().banked_r13[bank_number(MODE_USR)] = 0x5555;
    load_a32_at(&mut m, CODE + 0x20, &[svc(0)]);
    // subs pc, lr, #0
    run_a32(&mut m, &[dp_imm(AL, OP_SUB, 1, 14, 15, 0, 0)]);
    assert_eq!(m.cpu.mode(), MODE_USR);
    assert_eq!(m.cpu.current_el(), 0);
    assert_eq!(m.env().regs[13], 0x5555);
    assert_eq!(m.env().regs[15], CODE + 0x24);
}

// ── Coprocessor registers ─────────────────────────────────────

#[test]
fn test_mrc_midr_privileged() {
    let mut m = privileged();
    run_a32(&mut m, &[mrc_p15(0, 2, 0, 0, 0), svc(0)]);
    assert_eq!(m.env().regs[2], CORTEX_A15_MIDR);
}

#[test]
fn test_mrc_midr_from_user_is_undef() {
    let mut m = user();
    load_a32(&mut m, &[mrc_p15(0, 2, 0, 0, 0), svc(0)]);
    assert_eq!(run(&mut m), ExitReason::Exception);
    assert_eq!(m.env().exception.index, EXCP_UDEF);
    assert_eq!(m.env().regs[15], CODE);
}

#[test]
fn test_tpidrurw_round_trip_from_user() {
    let mut m = user();
    m.env_mut().regs[0] = 0xdead_beef;
    run_a32(
        &mut m,
        &[mcr_p15(0, 0, 13, 0, 2), mrc_p15(0, 1, 13, 0, 2), svc(0)],
    );
    assert_eq!(m.env().regs[1], 0xdead_beef);
    assert_eq!(m.env().cp15.tpidrurw, 0xdead_beef);
}

#[test]
fn test_sctlr_write_changes_translation() {
    let mut m = privileged();
    m.env_mut().regs[1] = DATA + 2;
    m.env_mut().regs[2] = m.env().cp15.sctlr | SCTLR_A;
    load_a32(
        &mut m,
        &[
            // Unaligned load is fine before SCTLR.A is set.
            ldr_imm(0, 1, 0),
            mcr_p15(0, 2, 1, 0, 0),
            ldr_imm(0, 1, 0),
            svc(0),
        ],
    );
    assert_eq!(run(&mut m), ExitReason::Exception);
    let e = &m.env().exception;
    assert_eq!(e.index, EXCP_DATA_ABORT);
    assert_eq!(e.fsr, FSR_ALIGNMENT);
    assert_eq!(m.env().regs[15], CODE + 8);
}

// ── Hints ─────────────────────────────────────────────────────

#[test]
fn test_wfi_halts() {
    let mut m = privileged();
    load_a32(&mut m, &[0xe320_f003, svc(0)]);
    assert_eq!(run(&mut m), ExitReason::Halted);
    assert_eq!(m.env().regs[15], CODE + 4);
    assert_ne!(m.env().halted, 0);
}

#[test]
fn test_v5_cp15_wfi_halts() {
    let mut m = machine(ArmCpuConfig::arm926());
    // mcr p15, 0, r0, c7, c8, 2
    load_a32(&mut m, &[mcr_p15(0, 0, 7, 8, 2), svc(0)]);
    assert_eq!(run(&mut m), ExitReason::Halted);
    assert_eq!(m.env().regs[15], CODE + 4);
}

#[test]
fn test_c7_c8_slot_depends_on_architecture() {
    let key = CpRegKey { cp: 15, is64: false, ns: false, crn: 7, crm: 8, opc1: 0, opc2: 2 };
    let name = |cfg: ArmCpuConfig| {
        let cfg = cfg.finalize().unwrap();
        let table = CpRegTable::for_config(&cfg).unwrap();
        table.lookup(&key).map(|(_, ri)| ri.name)
    };
    assert_eq!(name(ArmCpuConfig::arm926()), Some("WFI_v5"));
    assert_eq!(name(ArmCpuConfig::arm1176()), Some("ATS1CUR"));
    assert_eq!(name(ArmCpuConfig::cortex_a15()), Some("ATS1CUR"));
}

#[test]
fn test_nop_and_barriers() {
    let mut m = user();
    run_a32(
        &mut m,
        &[
            // nop
            0xe320_f000,
            // dmb ish
            0xf57f_f05b,
            // isb
            0xf57f_f06f,
            mov_imm(0, 9),
            svc(0),
        ],
    );
    assert_eq!(m.env().regs[0], 9);
}
