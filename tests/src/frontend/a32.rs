//! A32 data processing, branches and memory access.

use super::*;
use tcg_exec::ExitReason;
use tcg_frontend::arm::cpu::MODE_USR;
use tcg_frontend::arm::syndrome::*;

// ── Data processing ───────────────────────────────────────────

#[test]
fn test_arith_and_logic() {
    let mut m = user();
    m.env_mut().regs[0] = 5;
    m.env_mut().regs[1] = 7;
    run_a32(
        &mut m,
        &[
            add_reg(2, 0, 1),
            dp_reg(AL, OP_SUB, 0, 1, 3, 0, LSL, 0),
            dp_imm(AL, OP_RSB, 0, 0, 4, 0, 0),
            dp_reg(AL, OP_AND, 0, 0, 5, 1, LSL, 0),
            dp_reg(AL, OP_ORR, 0, 0, 6, 1, LSL, 0),
            dp_reg(AL, OP_EOR, 0, 0, 7, 1, LSL, 0),
            dp_imm(AL, OP_BIC, 0, 1, 8, 0, 2),
            dp_imm(AL, OP_MVN, 0, 0, 9, 0, 0),
            svc(0),
        ],
    );
    let r = &m.env().regs;
    assert_eq!(r[2], 12);
    assert_eq!(r[3], 2);
    assert_eq!(r[4], (-5i32) as u32);
    assert_eq!(r[5], 5 & 7);
    assert_eq!(r[6], 5 | 7);
    assert_eq!(r[7], 5 ^ 7);
    assert_eq!(r[8], 7 & !2);
    assert_eq!(r[9], u32::MAX);
    // PC points past the SVC.
    assert_eq!(r[15], CODE + 9 * 4);
}

#[test]
fn test_rotated_immediate() {
    let mut m = user();
    // 0xff ror 8
    run_a32(&mut m, &[dp_imm(AL, OP_MOV, 0, 0, 0, 4, 0xff), svc(0)]);
    assert_eq!(m.env().regs[0], 0xff00_0000);
}

#[test]
fn test_movw_movt() {
    let mut m = user();
    run_a32(&mut m, &[movw(3, 0x5678), movt(3, 0x1234), svc(0)]);
    assert_eq!(m.env().regs[3], 0x1234_5678);
}

#[test]
fn test_shift_by_register() {
    let mut m = user();
    m.env_mut().regs[0] = 1;
    m.env_mut().regs[1] = 3;
    m.env_mut().regs[3] = 4;
    m.env_mut().regs[4] = 0x8000_0000;
    m.env_mut().regs[5] = 40;
    run_a32(
        &mut m,
        &[
            dp_rsr(OP_ADD, 0, 0, 2, 1, LSL, 3),
            // Register shifts of 32 or more give 0 (LSR) or the sign (ASR).
            dp_rsr(OP_MOV, 0, 0, 6, 4, LSR, 5),
            dp_rsr(OP_MOV, 0, 0, 7, 4, ASR, 5),
            svc(0),
        ],
    );
    assert_eq!(m.env().regs[2], 1 + (3 << 4));
    assert_eq!(m.env().regs[6], 0);
    assert_eq!(m.env().regs[7], u32::MAX);
}

#[test]
fn test_adds_carry_and_zero() {
    let mut m = user();
    m.env_mut().regs[0] = u32::MAX;
    run_a32(&mut m, &[dp_imm(AL, OP_ADD, 1, 0, 1, 0, 1), svc(0)]);
    assert_eq!(m.env().regs[1], 0);
    // Z and C
    assert_eq!(nzcv(&m), 0b0110);
}

#[test]
fn test_subs_overflow() {
    let mut m = user();
    m.env_mut().regs[0] = 0x8000_0000;
    run_a32(&mut m, &[dp_imm(AL, OP_SUB, 1, 0, 1, 0, 1), svc(0)]);
    assert_eq!(m.env().regs[1], 0x7fff_ffff);
    // C (no borrow) and V
    assert_eq!(nzcv(&m), 0b0011);
}

#[test]
fn test_adc_sbc_use_carry() {
    let mut m = user();
    m.env_mut().regs[0] = 10;
    m.env_mut().regs[1] = 3;
    run_a32(
        &mut m,
        &[
            // Set C: 10 - 3 does not borrow.
            dp_reg(AL, OP_CMP, 1, 0, 0, 1, LSL, 0),
            dp_reg(AL, OP_ADC, 0, 0, 2, 1, LSL, 0),
            dp_reg(AL, OP_SBC, 0, 0, 3, 1, LSL, 0),
            svc(0),
        ],
    );
    assert_eq!(m.env().regs[2], 14);
    assert_eq!(m.env().regs[3], 7);
}

#[test]
fn test_shifter_carry_out() {
    let mut m = user();
    m.env_mut().regs[0] = 0x8000_0001;
    run_a32(&mut m, &[dp_reg(AL, OP_MOV, 1, 0, 1, 0, LSL, 1), svc(0)]);
    assert_eq!(m.env().regs[1], 2);
    assert_eq!(nzcv(&m), 0b0010);
}

#[test]
fn test_multiply_and_divide() {
    let mut m = user();
    m.env_mut().regs[0] = u32::MAX;
    m.env_mut().regs[1] = 2;
    m.env_mut().regs[5] = (-7i32) as u32;
    m.env_mut().regs[6] = 0;
    run_a32(
        &mut m,
        &[
            // mul r2, r0, r1
            0xe002_0190,
            // umull r3, r4, r0, r1
            0xe084_3190,
            // sdiv r7, r5, r1
            0xe717_f115,
            // udiv r8, r0, r6 (divide by zero gives 0)
            0xe738_f610,
            svc(0),
        ],
    );
    let r = &m.env().regs;
    assert_eq!(r[2], 0xffff_fffe);
    assert_eq!(r[3], 0xffff_fffe);
    assert_eq!(r[4], 1);
    assert_eq!(r[7], (-3i32) as u32);
    assert_eq!(r[8], 0);
}

#[test]
fn test_bit_manipulation() {
    let mut m = user();
    m.env_mut().regs[0] = 0x00f0_0000;
    run_a32(
        &mut m,
        &[
            // clz r2, r0
            0xe16f_2f10,
            // rev r3, r0
            0xe6bf_3f30,
            // ubfx r4, r0, #20, #4
            0xe7e3_4a50,
            svc(0),
        ],
    );
    assert_eq!(m.env().regs[2], 8);
    assert_eq!(m.env().regs[3], 0x0000_f000);
    assert_eq!(m.env().regs[4], 0xf);
}

#[test]
fn test_qadd_saturates_and_sets_q() {
    let mut m = user();
    m.env_mut().regs[0] = 0x7fff_ffff;
    m.env_mut().regs[1] = 1;
    // qadd r2, r0, r1
    run_a32(&mut m, &[0xe101_2050, svc(0)]);
    assert_eq!(m.env().regs[2], 0x7fff_ffff);
    assert_ne!(m.cpu.cpsr_read() & (1 << 27), 0);
}

#[test]
fn test_uadd8_then_sel() {
    let mut m = user();
    m.env_mut().regs[0] = 0xff01_ff01;
    m.env_mut().regs[1] = 0x0101_0101;
    m.env_mut().regs[4] = 0xaaaa_aaaa;
    m.env_mut().regs[5] = 0xbbbb_bbbb;
    run_a32(
        &mut m,
        &[
            // uadd8 r2, r0, r1
            0xe650_2f91,
            // sel r3, r4, r5
            0xe684_3fb5,
            svc(0),
        ],
    );
    assert_eq!(m.env().regs[2], 0x0002_0002);
    assert_eq!((m.cpu.cpsr_read() >> 16) & 0xf, 0b1010);
    assert_eq!(m.env().regs[3], 0xaabb_aabb);
}

#[test]
fn test_pkhtb_zero_shift_is_asr_32() {
    let mut m = user();
    m.env_mut().regs[0] = 0x1234_5678;
    m.env_mut().regs[1] = 0x8000_0000;
    // pkhtb r2, r0, r1 (shift field 0 encodes ASR #32)
    run_a32(&mut m, &[0xe680_2051, svc(0)]);
    assert_eq!(m.env().regs[2], 0x1234_ffff);
}

// ── Conditional execution ─────────────────────────────────────

#[test]
fn test_condition_codes() {
    let mut m = user();
    m.env_mut().regs[0] = 5;
    run_a32(
        &mut m,
        &[
            dp_imm(AL, OP_CMP, 1, 0, 0, 0, 5),
            dp_imm(EQ, OP_MOV, 0, 0, 1, 0, 1),
            dp_imm(NE, OP_MOV, 0, 0, 2, 0, 1),
            dp_imm(GE, OP_MOV, 0, 0, 3, 0, 1),
            dp_imm(LT, OP_MOV, 0, 0, 4, 0, 1),
            svc(0),
        ],
    );
    let r = &m.env().regs;
    assert_eq!((r[1], r[2], r[3], r[4]), (1, 0, 1, 0));
}

#[test]
fn test_skipped_load_does_not_fault() {
    let mut m = user();
    m.env_mut().regs[5] = UNMAPPED;
    // Z is clear at reset, so the EQ load is skipped.
    run_a32(&mut m, &[(EQ << 28) | (ldr_imm(0, 5, 0) & 0x0fff_ffff), svc(0)]);
    assert_eq!(m.env().regs[0], 0);
}

/// Architectural truth of condition `cond` under NZCV `f`.
fn cond_holds(cond: u32, f: u32) -> bool {
    let (n, z, c, v) = (f & 8 != 0, f & 4 != 0, f & 2 != 0, f & 1 != 0);
    let r = match cond >> 1 {
        0 => z,
        1 => c,
        2 => n,
        3 => v,
        4 => c && !z,
        5 => n == v,
        6 => !z && n == v,
        _ => true,
    };
    if cond & 1 != 0 && cond != 0xf {
        !r
    } else {
        r
    }
}

#[test]
fn test_condition_truth_table() {
    for cond in 0..15 {
        for f in 0..16u32 {
            let mut m = user();
            {
                let env = m.env_mut();
                env.nf = (f >> 3) << 31;
                env.zf = (f & 4 == 0) as u32;
                env.cf = (f >> 1) & 1;
                env.vf = (f & 1) << 31;
            }
            run_a32(&mut m, &[dp_imm(cond, OP_MOV, 0, 0, 0, 0, 1), svc(0)]);
            assert_eq!(
                m.env().regs[0] == 1,
                cond_holds(cond, f),
                "cond {cond:#x} nzcv {f:04b}"
            );
            assert_eq!(nzcv(&m), f);
        }
    }
}

// ── Branches ──────────────────────────────────────────────────

#[test]
fn test_backward_branch_loop() {
    let mut m = user();
    run_a32(
        &mut m,
        &[
            mov_imm(0, 0),
            mov_imm(1, 10),
            add_reg(0, 0, 1),
            dp_imm(AL, OP_SUB, 1, 1, 1, 0, 1),
            b(NE, false, -4),
            svc(0),
        ],
    );
    assert_eq!(m.env().regs[0], 55);
    assert_eq!(m.env().regs[1], 0);
}

#[test]
fn test_loop_with_one_insn_per_block() {
    let mut m = machine(ArmCpuConfig::cortex_a15().user_only(true).max_insns(1));
    run_a32(
        &mut m,
        &[
            mov_imm(0, 0),
            mov_imm(1, 4),
            add_reg(0, 0, 1),
            dp_imm(AL, OP_SUB, 1, 1, 1, 0, 1),
            b(NE, false, -4),
            svc(0),
        ],
    );
    assert_eq!(m.env().regs[0], 10);
}

#[test]
fn test_bl_and_return() {
    let mut m = user();
    run_a32(
        &mut m,
        &[
            mov_imm(0, 1),
            b(AL, true, 1),
            add_imm(0, 0, 100),
            svc(0),
            add_imm(0, 0, 10),
            bx(14),
        ],
    );
    assert_eq!(m.env().regs[0], 111);
    assert_eq!(m.env().regs[14], CODE + 8);
}

#[test]
fn test_bx_to_thumb() {
    let mut m = user();
    m.env_mut().regs[0] = CODE + 0x101;
    m.load_halfwords(CODE + 0x100, &[t_movs(1, 42), t_svc(0)]).unwrap();
    run_a32(&mut m, &[bx(0)]);
    assert_eq!(m.env().thumb, 1);
    assert_eq!(m.env().regs[1], 42);
    assert_eq!(m.env().regs[15], CODE + 0x104);
}

#[test]
fn test_budget_exhausted_in_tight_loop() {
    let mut m = user();
    load_a32(&mut m, &[b(AL, false, -2)]);
    let mut exec = tcg_exec::ExecEnv::default();
    assert_eq!(m.run(&mut exec, 100).unwrap(), ExitReason::Budget);
    assert_eq!(m.env().regs[15], CODE);
}

// ── Loads and stores ──────────────────────────────────────────

#[test]
fn test_load_store_addressing_modes() {
    let mut m = user();
    m.env_mut().regs[0] = 0x1122_3344;
    m.env_mut().regs[1] = DATA;
    m.write_bytes(DATA + 0x20, &[0xf0]).unwrap();
    run_a32(
        &mut m,
        &[
            str_imm(0, 1, 0),
            ldrb(2, 1, 1),
            ldst_extra(1, 1, 1, 0, 1, 3, 2, SH_H),
            // str r0, [r1, #4]!
            ldst_imm(0, 0, 1, 1, 1, 1, 0, 4),
            // ldr r5, [r1], #4
            ldst_imm(1, 0, 0, 1, 0, 1, 5, 4),
            // ldrsb r6, [r1, #0x18]
            ldst_extra(1, 1, 1, 0, 1, 6, 0x18, SH_SB_D),
            svc(0),
        ],
    );
    let r = &m.env().regs;
    assert_eq!(m.read_u32(DATA).unwrap(), 0x1122_3344);
    assert_eq!(r[2], 0x33);
    assert_eq!(r[3], 0x1122);
    assert_eq!(m.read_u32(DATA + 4).unwrap(), 0x1122_3344);
    assert_eq!(r[5], 0x1122_3344);
    assert_eq!(r[1], DATA + 8);
    assert_eq!(r[6], 0xffff_fff0);
}

#[test]
fn test_ldrd_strd() {
    let mut m = user();
    m.env_mut().regs[0] = DATA;
    m.env_mut().regs[4] = DATA + 0x10;
    m.load_words(DATA, &[1, 2, 3, 4]).unwrap();
    run_a32(
        &mut m,
        &[
            // ldrd r2, r3, [r0, #8]!
            ldst_extra(0, 1, 1, 1, 0, 2, 8, SH_SB_D),
            // ldrd r0, r1, [r0, #-8]: the base is overwritten by the first load
            ldst_extra(0, 1, 0, 0, 0, 0, 8, SH_SB_D),
            // strd r2, r3, [r4]
            ldst_extra(0, 1, 1, 0, 4, 2, 0, SH_SH_STRD),
            svc(0),
        ],
    );
    let r = &m.env().regs;
    assert_eq!((r[0], r[1], r[2], r[3]), (1, 2, 3, 4));
    assert_eq!(m.read_u32(DATA + 0x10).unwrap(), 3);
    assert_eq!(m.read_u32(DATA + 0x14).unwrap(), 4);
}

#[test]
fn test_push_pop() {
    let mut m = user();
    let sp = DATA + 0x100;
    m.env_mut().regs[13] = sp;
    for i in 0..4 {
        m.env_mut().regs[i] = 0x10 + i as u32;
    }
    run_a32(
        &mut m,
        &[
            // stmdb sp!, {r0-r3}
            0xe92d_000f,
            // ldmia sp!, {r4-r7}
            0xe8bd_00f0,
            svc(0),
        ],
    );
    let r = &m.env().regs;
    assert_eq!(&r[4..8], &[0x10, 0x11, 0x12, 0x13]);
    assert_eq!(r[13], sp);
    assert_eq!(m.read_u32(sp - 16).unwrap(), 0x10);
}

#[test]
fn test_pop_into_pc() {
    let mut m = user();
    let sp = DATA + 0x100;
    m.env_mut().regs[13] = sp;
    m.load_words(sp, &[0x77, CODE + 0x20]).unwrap();
    load_a32_at(&mut m, CODE + 0x20, &[svc(0)]);
    // ldmia sp!, {r4, pc}
    run_a32(&mut m, &[0xe8bd_8010, udf(0)]);
    assert_eq!(m.env().regs[4], 0x77);
    assert_eq!(m.env().regs[13], sp + 8);
    assert_eq!(m.env().regs[15], CODE + 0x24);
}

#[test]
fn test_unaligned_word_load_without_strict_alignment() {
    let mut m = user();
    m.env_mut().regs[1] = DATA + 1;
    m.write_bytes(DATA, &[0x00, 0x11, 0x22, 0x33, 0x44]).unwrap();
    run_a32(&mut m, &[ldr_imm(0, 1, 0), svc(0)]);
    assert_eq!(m.env().regs[0], 0x4433_2211);
}

#[test]
fn test_ldm_loaded_base_wins() {
    let mut m = user();
    m.env_mut().regs[0] = DATA;
    m.load_words(DATA, &[10, 20, 30]).unwrap();
    // ldm r0, {r0, r1, r2}
    run_a32(&mut m, &[0xe890_0007, svc(0)]);
    let r = &m.env().regs;
    assert_eq!((r[0], r[1], r[2]), (10, 20, 30));
}

#[test]
fn test_stm_writeback_stores_original_base() {
    let mut m = user();
    m.env_mut().regs[0] = DATA;
    m.env_mut().regs[1] = 1;
    m.env_mut().regs[2] = 2;
    // stm r0!, {r0, r1, r2}
    run_a32(&mut m, &[0xe8a0_0007, svc(0)]);
    assert_eq!(m.read_u32(DATA).unwrap(), DATA);
    assert_eq!(m.read_u32(DATA + 4).unwrap(), 1);
    assert_eq!(m.read_u32(DATA + 8).unwrap(), 2);
    assert_eq!(m.env().regs[0], DATA + 12);
}

#[test]
fn test_ldrd_odd_rt_is_undef() {
    let mut m = user();
    m.env_mut().regs[0] = DATA;
    // ldrd r1, r2, [r0]
    load_a32(&mut m, &[ldst_extra(0, 1, 1, 0, 0, 1, 0, SH_SB_D), svc(0)]);
    assert_eq!(run(&mut m), ExitReason::Exception);
    assert_eq!(m.env().exception.index, EXCP_UDEF);
    assert_eq!(m.env().regs[15], CODE);
}

#[test]
fn test_ldm_exception_return_restores_cpsr() {
    let mut m = privileged();
    m.env_mut().regs[0] = DATA;
    m.env_mut().spsr = 0x8000_0000 | MODE_USR;
    m.load_words(DATA, &[CODE + 0x100]).unwrap();
    load_a32_at(&mut m, CODE + 0x100, &[svc(0)]);
    // ldm r0, {pc}^
    run_a32(&mut m, &[0xe8d0_8000, udf(0)]);
    assert_eq!(m.cpu.mode(), MODE_USR);
    assert_eq!(nzcv(&m), 0b1000);
    assert_eq!(m.env().regs[15], CODE + 0x104);
}

#[test]
fn test_user_bank_transfers_undef_in_user_mode() {
    // ldm r0, {r1}^ and stm r0, {r1}^
    for insn in [0xe8d0_0002, 0xe8c0_0002] {
        let mut m = user();
        m.env_mut().regs[0] = DATA;
        m.env_mut().regs[1] = 7;
        load_a32(&mut m, &[insn, svc(0)]);
        assert_eq!(run(&mut m), ExitReason::Exception);
        assert_eq!(m.env().exception.index, EXCP_UDEF, "{insn:#x}");
        assert_eq!(m.env().regs[15], CODE);
        assert_eq!(m.read_u32(DATA).unwrap(), 0);
    }
}

#[test]
fn test_subs_pc_lr_undef_in_user_mode() {
    let mut m = user();
    m.env_mut().regs[14] = CODE + 0x100;
    // subs pc, lr, #0
    load_a32(&mut m, &[dp_imm(AL, OP_SUB, 1, 14, 15, 0, 0), svc(0)]);
    assert_eq!(run(&mut m), ExitReason::Exception);
    assert_eq!(m.env().exception.index, EXCP_UDEF);
    assert_eq!(m.env().regs[15], CODE);
    assert_eq!(m.cpu.mode(), MODE_USR);
}

// ── Exclusives ────────────────────────────────────────────────

#[test]
fn test_ldrex_strex_success_then_failure() {
    let mut m = user();
    m.env_mut().regs[1] = DATA;
    m.load_words(DATA, &[41]).unwrap();
    run_a32(
        &mut m,
        &[
            ldrex(0, 1),
            add_imm(0, 0, 1),
            strex(2, 0, 1),
            // The monitor was released by the first STREX.
            strex(3, 0, 1),
            svc(0),
        ],
    );
    assert_eq!(m.read_u32(DATA).unwrap(), 42);
    assert_eq!(m.env().regs[2], 0);
    assert_eq!(m.env().regs[3], 1);
    assert_eq!(m.env().exclusive_addr, u64::MAX);
}

#[test]
fn test_strex_fails_when_memory_changed() {
    let mut m = user();
    m.env_mut().regs[1] = DATA;
    m.load_words(DATA, &[41]).unwrap();
    run_a32(
        &mut m,
        &[ldrex(0, 1), mov_imm(4, 7), str_imm(4, 1, 0), strex(2, 0, 1), svc(0)],
    );
    assert_eq!(m.env().regs[2], 1);
    assert_eq!(m.read_u32(DATA).unwrap(), 7);
}

#[test]
fn test_ldrex_requires_alignment() {
    let mut m = user();
    m.env_mut().regs[1] = DATA + 2;
    load_a32(&mut m, &[ldrex(0, 1), svc(0)]);
    assert_eq!(run(&mut m), ExitReason::Exception);
    let e = &m.env().exception;
    assert_eq!(e.index, EXCP_DATA_ABORT);
    assert_eq!(e.fsr, FSR_ALIGNMENT);
    assert_eq!(e.vaddress, DATA + 2);
    assert_eq!(m.env().regs[15], CODE);
}

fn ldrexd_pair(cfg: ArmCpuConfig) -> (u32, u32) {
    let mut m = machine(cfg);
    m.env_mut().regs[1] = DATA;
    m.write_bytes(DATA, &[0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88]).unwrap();
    // ldrexd r2, r3, [r1]
    run_a32(&mut m, &[0xe1b1_2f9f, svc(0)]);
    (m.env().regs[2], m.env().regs[3])
}

#[test]
fn test_ldrexd_low_word_goes_to_rt() {
    let le = ldrexd_pair(ArmCpuConfig::cortex_a15().user_only(true));
    assert_eq!(le, (0x4433_2211, 0x8877_6655));
    let be = ldrexd_pair(ArmCpuConfig::cortex_a15().user_only(true).big_endian(true));
    assert_eq!(be, (0x1122_3344, 0x5566_7788));
}

#[test]
fn test_strex_status_equals_value_is_undef() {
    let mut m = user();
    m.env_mut().regs[1] = DATA;
    load_a32(&mut m, &[ldrex(0, 1), strex(0, 0, 1), svc(0)]);
    assert_eq!(run(&mut m), ExitReason::Exception);
    assert_eq!(m.env().exception.index, EXCP_UDEF);
    assert_eq!(m.env().regs[15], CODE + 4);
    assert_eq!(m.read_u32(DATA).unwrap(), 0);
}

// ── Faults ────────────────────────────────────────────────────

#[test]
fn test_data_abort_syndrome() {
    let mut m = user();
    m.env_mut().regs[1] = UNMAPPED;
    load_a32(&mut m, &[mov_imm(0, 1), ldr_imm(2, 1, 4), svc(0)]);
    assert_eq!(run(&mut m), ExitReason::Exception);
    let e = &m.env().exception;
    assert_eq!(e.index, EXCP_DATA_ABORT);
    assert_eq!(e.vaddress, UNMAPPED + 4);
    assert_eq!(e.fsr, FSR_EXTERNAL);
    assert_eq!(e.target_el, 1);
    // Taken from EL0: lower-EL data abort with a valid ISS.
    assert_eq!(syn_get_ec(e.syndrome), EC_DATAABORT);
    assert_ne!(e.syndrome & ISV, 0);
    assert_ne!(e.syndrome & IL, 0);
    assert_eq!((e.syndrome >> 22) & 3, 2);
    assert_eq!((e.syndrome >> 16) & 0x1f, 2);
    assert_eq!(e.syndrome & (1 << 6), 0);
    assert_eq!(e.syndrome & 0x3f, FSC_EXTERNAL);
    // PC is restored to the faulting load; earlier insns committed.
    assert_eq!(m.env().regs[15], CODE + 4);
    assert_eq!(m.env().regs[0], 1);
}

#[test]
fn test_store_abort_sets_wnr() {
    let mut m = user();
    m.env_mut().regs[1] = UNMAPPED;
    load_a32(&mut m, &[str_imm(3, 1, 0), svc(0)]);
    assert_eq!(run(&mut m), ExitReason::Exception);
    let s = m.env().exception.syndrome;
    assert_ne!(s & (1 << 6), 0);
    assert_eq!((s >> 16) & 0x1f, 3);
}

#[test]
fn test_strict_alignment_faults_word_access() {
    let mut m = user();
    m.env_mut().cp15.sctlr |= tcg_frontend::arm::cpu::SCTLR_A;
    m.env_mut().regs[1] = DATA + 2;
    load_a32(&mut m, &[ldr_imm(0, 1, 0), svc(0)]);
    assert_eq!(run(&mut m), ExitReason::Exception);
    let e = &m.env().exception;
    assert_eq!(e.index, EXCP_DATA_ABORT);
    assert_eq!(e.fsr, FSR_ALIGNMENT);
    assert_eq!(e.syndrome & 0x3f, FSC_ALIGNMENT);
}

#[test]
fn test_udf_raises_undef_at_insn() {
    let mut m = user();
    load_a32(&mut m, &[mov_imm(0, 3), udf(0x12), svc(0)]);
    assert_eq!(run(&mut m), ExitReason::Exception);
    let e = &m.env().exception;
    assert_eq!(e.index, EXCP_UDEF);
    assert_eq!(syn_get_ec(e.syndrome), EC_UNCATEGORIZED);
    assert_eq!(m.env().regs[15], CODE + 4);
    assert_eq!(m.env().regs[0], 3);
}

#[test]
fn test_svc_syndrome() {
    let mut m = user();
    run_a32(&mut m, &[svc(0x12_3456)]);
    // Only the low 16 bits of the immediate are reported.
    assert_eq!(m.env().exception.syndrome, syn_aa32_svc(0x3456, false));
    assert_eq!(m.env().regs[15], CODE + 4);
}

// ── Endianness ────────────────────────────────────────────────

#[test]
fn test_be8_data_accesses() {
    let mut m = machine(ArmCpuConfig::cortex_a15().user_only(true).big_endian(true));
    m.env_mut().regs[1] = DATA;
    m.env_mut().regs[2] = 0xaabb_ccdd;
    m.write_bytes(DATA, &[0x11, 0x22, 0x33, 0x44]).unwrap();
    run_a32(
        &mut m,
        &[
            ldr_imm(0, 1, 0),
            ldst_extra(1, 1, 1, 0, 1, 3, 0, SH_H),
            str_imm(2, 1, 4),
            svc(0),
        ],
    );
    assert_eq!(m.env().regs[0], 0x1122_3344);
    assert_eq!(m.env().regs[3], 0x1122);
    assert_eq!(m.read_bytes(DATA + 4, 4).unwrap(), &[0xaa, 0xbb, 0xcc, 0xdd]);
}

#[test]
fn test_be32_swizzles_byte_addresses() {
    let mut m = machine(ArmCpuConfig::arm926().be32(true));
    m.env_mut().regs[1] = DATA;
    m.write_bytes(DATA, &[0x11, 0x22, 0x33, 0x44]).unwrap();
    run_a32(&mut m, &[ldrb(0, 1, 0), ldr_imm(2, 1, 0), svc(0)]);
    assert_eq!(m.env().regs[0], 0x44);
    assert_eq!(m.env().regs[2], 0x4433_2211);
}
