//! T16/T32 decoding, IT blocks and interworking.

use super::*;
use tcg_exec::ExitReason;
use tcg_frontend::arm::syndrome::*;

// IT EQ and ITE EQ.
const IT_EQ: u16 = 0xbf08;
const ITE_EQ: u16 = 0xbf0c;

fn ite_program(m: &mut ArmMachine) {
    run_thumb(
        m,
        &[t_cmp_imm(0, 5), ITE_EQ, t_movs(1, 1), t_movs(2, 2), t_svc(0)],
    );
}

#[test]
fn test_ite_then_branch() {
    let mut m = user();
    m.env_mut().regs[0] = 5;
    ite_program(&mut m);
    assert_eq!(m.env().regs[1], 1);
    assert_eq!(m.env().regs[2], 0);
    assert_eq!(m.env().condexec_bits, 0);
}

#[test]
fn test_ite_else_branch() {
    let mut m = user();
    m.env_mut().regs[0] = 4;
    ite_program(&mut m);
    assert_eq!(m.env().regs[1], 0);
    assert_eq!(m.env().regs[2], 2);
}

#[test]
fn test_movs_inside_it_keeps_flags() {
    let mut m = user();
    m.env_mut().regs[0] = 5;
    // Inside an IT block MOVS is MOV and must not clear Z.
    run_thumb(&mut m, &[t_cmp_imm(0, 5), IT_EQ, t_movs(1, 1), t_svc(0)]);
    assert_eq!(m.env().regs[1], 1);
    assert_eq!(nzcv(&m), 0b0110);
}

#[test]
fn test_thumb_loop() {
    let mut m = user();
    m.env_mut().regs[0] = 0;
    m.env_mut().regs[1] = 10;
    run_thumb(
        &mut m,
        &[
            t_adds_reg(0, 0, 1),
            t_subs_imm3(1, 1, 1),
            t_bcond(NE as u16, -4),
            t_svc(0),
        ],
    );
    assert_eq!(m.env().regs[0], 55);
    assert_eq!(m.env().regs[15], CODE + 8);
}

#[test]
fn test_t32_movw_movt() {
    let mut m = user();
    let lo = t32_mov16(false, 3, 0x1234);
    let hi = t32_mov16(true, 3, 0xabcd);
    run_thumb(&mut m, &[lo[0], lo[1], hi[0], hi[1], t_svc(0)]);
    assert_eq!(m.env().regs[3], 0xabcd_1234);
}

#[test]
fn test_t32_bl_and_bx_lr() {
    let mut m = user();
    let bl = t32_bl(2);
    run_thumb(
        &mut m,
        &[bl[0], bl[1], t_svc(0), T_NOP, t_movs(0, 7), T_BX_LR],
    );
    assert_eq!(m.env().regs[0], 7);
    // LR carries the Thumb bit.
    assert_eq!(m.env().regs[14], (CODE + 4) | 1);
    assert_eq!(m.env().regs[15], CODE + 6);
    assert_eq!(m.env().thumb, 1);
}

#[test]
fn test_thumb_svc_syndrome_is_16bit() {
    let mut m = user();
    run_thumb(&mut m, &[t_svc(0x12)]);
    assert_eq!(m.env().exception.syndrome, syn_aa32_svc(0x12, true));
    assert_eq!(m.env().exception.syndrome & IL, 0);
}

#[test]
fn test_thumb_udf() {
    let mut m = user();
    load_thumb(&mut m, &[T_NOP, 0xde01, t_svc(0)]);
    assert_eq!(run(&mut m), ExitReason::Exception);
    assert_eq!(m.env().exception.index, EXCP_UDEF);
    assert_eq!(m.env().regs[15], CODE + 2);
}

#[test]
fn test_thumb_data_abort_is_16bit() {
    let mut m = user();
    m.env_mut().regs[1] = UNMAPPED;
    // ldr r2, [r1]
    load_thumb(&mut m, &[0x680a, t_svc(0)]);
    assert_eq!(run(&mut m), ExitReason::Exception);
    let e = &m.env().exception;
    assert_eq!(e.index, EXCP_DATA_ABORT);
    assert_eq!(e.syndrome & IL, 0);
    assert_eq!((e.syndrome >> 16) & 0x1f, 2);
    assert_eq!(m.env().regs[15], CODE);
}

#[test]
fn test_abort_inside_it_block_restores_condexec() {
    let mut m = user();
    m.env_mut().regs[0] = 5;
    m.env_mut().regs[1] = UNMAPPED;
    // cmp r0, #5; it eq; ldr r2, [r1]
    load_thumb(&mut m, &[t_cmp_imm(0, 5), IT_EQ, 0x680a, t_svc(0)]);
    assert_eq!(run(&mut m), ExitReason::Exception);
    assert_eq!(m.env().exception.index, EXCP_DATA_ABORT);
    assert_eq!(m.env().regs[15], CODE + 4);
    // Still inside the block: EQ with one instruction left.
    assert_ne!(m.env().condexec_bits, 0);
    assert_eq!(m.env().condexec_bits >> 4, EQ);
}

#[test]
fn test_thumb_bx_enters_a32_target() {
    let mut m = user();
    let target = CODE + 0x100;
    m.env_mut().regs[0] = target;
    // bx r0
    load_thumb(&mut m, &[0x4700, T_NOP]);
    m.load_words(target, &[mov_imm(1, 9), svc(3)]).unwrap();
    run_to_svc(&mut m);
    assert_eq!(m.env().thumb, 0);
    assert_eq!(m.env().regs[1], 9);
    assert_eq!(m.env().regs[15], target + 8);
    assert_eq!(m.env().exception.syndrome, syn_aa32_svc(3, false));
}

#[test]
fn test_it_state_survives_one_insn_blocks() {
    let mut m = machine(ArmCpuConfig::cortex_a15().user_only(true).max_insns(1));
    m.env_mut().regs[0] = 4;
    // One instruction per block: the IT state crosses block lookups.
    run_thumb(&mut m, &[t_cmp_imm(0, 5), IT_EQ, t_movs(1, 1), t_svc(0)]);
    assert_eq!(m.env().regs[1], 0);
    assert_eq!(m.env().condexec_bits, 0);
}
