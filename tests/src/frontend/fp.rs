//! VFP and Advanced SIMD.

use super::*;
use tcg_exec::ExitReason;
use tcg_frontend::arm::cpu::{VFP_FPEXC, VFP_FPSCR};
use tcg_frontend::arm::helper::vfp::FPSCR_DZC;
use tcg_frontend::arm::syndrome::*;
use tcg_frontend::arm::ArmFeature;

// ── Register file access ──────────────────────────────────────

fn set_s(m: &mut ArmMachine, n: usize, v: f32) {
    let z = &mut m.env_mut().vfp.zregs[n / 2];
    let shift = (n % 2) * 32;
    *z = (*z & !(0xffff_ffffu64 << shift)) | ((v.to_bits() as u64) << shift);
}

fn get_s(m: &ArmMachine, n: usize) -> f32 {
    f32::from_bits((m.env().vfp.zregs[n / 2] >> ((n % 2) * 32)) as u32)
}

fn set_d(m: &mut ArmMachine, n: usize, v: f64) {
    m.env_mut().vfp.zregs[n] = v.to_bits();
}

fn get_d(m: &ArmMachine, n: usize) -> f64 {
    f64::from_bits(m.env().vfp.zregs[n])
}

fn lanes32(lo: u32, hi: u32) -> u64 {
    (hi as u64) << 32 | lo as u64
}

// vadd.f32 s0, s1, s2
const VADD_F32_S0_S1_S2: u32 = 0xee30_0a81;
// vdiv.f32 s0, s1, s2
const VDIV_F32_S0_S1_S2: u32 = 0xee80_0a81;
// vdiv.f64 d0, d1, d2
const VDIV_F64_D0_D1_D2: u32 = 0xee81_0b02;
// vcmp.f32 s0, s1
const VCMP_F32_S0_S1: u32 = 0xeeb4_0a60;
// vmrs APSR_nzcv, fpscr
const VMRS_APSR_NZCV: u32 = 0xeef1_fa10;
// vadd.i32 q0, q1, q2
const VADD_I32_Q0_Q1_Q2: u32 = 0xf222_0844;
// vshrn.i16 d0, q1, #4
const VSHRN_I16_D0_Q1_4: u32 = 0xf28c_0812;
// vcnt.8 d0, d1
const VCNT_8_D0_D1: u32 = 0xf3b0_0501;

// ── VFP ───────────────────────────────────────────────────────

#[test]
fn test_vadd_f32() {
    let mut m = user();
    set_s(&mut m, 1, 1.5);
    set_s(&mut m, 2, 2.25);
    run_a32(&mut m, &[VADD_F32_S0_S1_S2, svc(0)]);
    assert_eq!(get_s(&m, 0), 3.75);
    // S1 shares D0 with S0 and is untouched.
    assert_eq!(get_s(&m, 1), 1.5);
}

#[test]
fn test_vdiv_f64() {
    let mut m = user();
    set_d(&mut m, 1, 7.5);
    set_d(&mut m, 2, 2.5);
    run_a32(&mut m, &[VDIV_F64_D0_D1_D2, svc(0)]);
    assert_eq!(get_d(&m, 0), 3.0);
}

#[test]
fn test_divide_by_zero_sets_cumulative_flag() {
    let mut m = user();
    set_s(&mut m, 1, 1.0);
    set_s(&mut m, 2, 0.0);
    run_a32(&mut m, &[VDIV_F32_S0_S1_S2, svc(0)]);
    assert_eq!(get_s(&m, 0), f32::INFINITY);
    assert_ne!(m.env().vfp.xregs[VFP_FPSCR] & FPSCR_DZC, 0);
}

#[test]
fn test_vcmp_then_vmrs_sets_apsr() {
    let mut m = user();
    set_s(&mut m, 0, 1.0);
    set_s(&mut m, 1, 2.0);
    run_a32(
        &mut m,
        &[
            VCMP_F32_S0_S1,
            VMRS_APSR_NZCV,
            // movlt r0, #1
            dp_imm(LT, OP_MOV, 0, 0, 0, 0, 1),
            svc(0),
        ],
    );
    // Less than: N only.
    assert_eq!(nzcv(&m), 0b1000);
    assert_eq!(m.env().regs[0], 1);
}

#[test]
fn test_vmov_core_and_single() {
    let mut m = user();
    m.env_mut().regs[5] = 0x4049_0fdb;
    run_a32(
        &mut m,
        &[
            // vmov s4, r5
            0xee02_5a10,
            // vmov r3, s4
            0xee12_3a10,
            svc(0),
        ],
    );
    assert_eq!(m.env().regs[3], 0x4049_0fdb);
    assert_eq!(m.env().vfp.zregs[2] as u32, 0x4049_0fdb);
}

#[test]
fn test_vldr_double() {
    let mut m = user();
    m.env_mut().regs[1] = DATA;
    m.write_bytes(DATA + 8, &2.5f64.to_le_bytes()).unwrap();
    // vldr d3, [r1, #8]
    run_a32(&mut m, &[0xed91_3b02, svc(0)]);
    assert_eq!(get_d(&m, 3), 2.5);
}

#[test]
fn test_vfp_disabled_is_undef() {
    let mut m = user();
    m.env_mut().vfp.xregs[VFP_FPEXC] = 0;
    load_a32(&mut m, &[VADD_F32_S0_S1_S2, svc(0)]);
    assert_eq!(run(&mut m), ExitReason::Exception);
    let e = &m.env().exception;
    assert_eq!(e.index, EXCP_UDEF);
    assert_eq!(syn_get_ec(e.syndrome), EC_UNCATEGORIZED);
    assert_eq!(m.env().regs[15], CODE);
}

#[test]
fn test_user_process_fpu_is_not_trapped() {
    let m = user();
    let features = m.cpu.config.features;
    assert!(!features.intersects(ArmFeature::EL2 | ArmFeature::EL3));
    assert_eq!(m.cpu.tb_flags().fp_excp_el, 0);
    assert!(m.cpu.tb_flags().vfp_enabled);
}

#[test]
fn test_cpacr_trap_wins_over_fpexc() {
    // Out of reset CPACR denies the FPU and FPEXC.EN is clear too;
    // the access trap is reported, not the plain UNDEF.
    let mut m = privileged();
    load_a32(&mut m, &[VADD_F32_S0_S1_S2, svc(0)]);
    assert_eq!(run(&mut m), ExitReason::Exception);
    let e = &m.env().exception;
    assert_eq!(e.index, EXCP_UDEF);
    assert_eq!(syn_get_ec(e.syndrome), EC_ADVSIMDFPACCESSTRAP);
    assert_eq!(e.target_el, 3);
}

// ── Advanced SIMD ─────────────────────────────────────────────

#[test]
fn test_vadd_i32_quad() {
    let mut m = user();
    {
        let z = &mut m.env_mut().vfp.zregs;
        z[2] = lanes32(1, 2);
        z[3] = lanes32(3, u32::MAX);
        z[4] = lanes32(10, 20);
        z[5] = lanes32(30, 1);
    }
    run_a32(&mut m, &[VADD_I32_Q0_Q1_Q2, svc(0)]);
    let z = &m.env().vfp.zregs;
    assert_eq!(z[0], lanes32(11, 22));
    // Lanes wrap independently.
    assert_eq!(z[1], lanes32(33, 0));
}

#[test]
fn test_vld1_vst1_with_writeback() {
    let mut m = user();
    m.env_mut().regs[1] = DATA;
    m.env_mut().regs[2] = DATA + 0x40;
    m.load_words(DATA, &[1, 2, 3, 4]).unwrap();
    run_a32(
        &mut m,
        &[
            // vld1.32 {d0, d1}, [r1]!
            0xf421_0a8d,
            // vst1.32 {d0, d1}, [r2]
            0xf402_0a8f,
            svc(0),
        ],
    );
    let z = &m.env().vfp.zregs;
    assert_eq!(z[0], lanes32(1, 2));
    assert_eq!(z[1], lanes32(3, 4));
    assert_eq!(m.env().regs[1], DATA + 16);
    assert_eq!(m.read_u32(DATA + 0x4c).unwrap(), 4);
}

#[test]
fn test_neon_disabled_is_undef() {
    let mut m = user();
    m.env_mut().vfp.xregs[VFP_FPEXC] = 0;
    load_a32(&mut m, &[VADD_I32_Q0_Q1_Q2, svc(0)]);
    assert_eq!(run(&mut m), ExitReason::Exception);
    assert_eq!(m.env().exception.index, EXCP_UDEF);
}

fn lanes16(l: [u16; 4]) -> u64 {
    l.iter().rev().fold(0, |acc, &v| acc << 16 | v as u64)
}

fn expect_undef(m: &mut ArmMachine, insn: u32) {
    load_a32(m, &[insn, svc(0)]);
    assert_eq!(run(m), ExitReason::Exception);
    assert_eq!(m.env().exception.index, EXCP_UDEF, "{insn:#010x}");
    assert_eq!(m.env().regs[15], CODE);
}

#[test]
fn test_vshrn_takes_shift_from_element_size() {
    let mut m = user();
    {
        let z = &mut m.env_mut().vfp.zregs;
        z[2] = lanes16([0x1234, 0xabcd, 0x0ff0, 0x8001]);
        z[3] = lanes16([0x0010, 0x00f0, 0xfff0, 0x7ff0]);
    }
    run_a32(&mut m, &[VSHRN_I16_D0_Q1_4, svc(0)]);
    // Each halfword shifted right by 4, keeping the low byte.
    assert_eq!(m.env().vfp.zregs[0], 0xffff_0f01_00ff_bc23);
    assert_eq!(m.env().vfp.zregs[2], lanes16([0x1234, 0xabcd, 0x0ff0, 0x8001]));
}

#[test]
fn test_vcnt_counts_bits_per_byte() {
    let mut m = user();
    m.env_mut().vfp.zregs[1] = 0x8000_0000_ff0f_0301;
    run_a32(&mut m, &[VCNT_8_D0_D1, svc(0)]);
    assert_eq!(m.env().vfp.zregs[0], 0x0100_0000_0804_0201);
}

#[test]
fn test_two_reg_misc_bad_size_is_undef() {
    // vcnt.16 d0, d1
    let mut m = user();
    expect_undef(&mut m, VCNT_8_D0_D1 | 1 << 18);
}

#[test]
fn test_quad_op_with_odd_register_is_undef() {
    // vadd.i32 q0, <d3>, q2
    let mut m = user();
    expect_undef(&mut m, VADD_I32_Q0_Q1_Q2 | 1 << 16);
    // vshrn.i16 d0, <d3>, #4
    let mut m = user();
    expect_undef(&mut m, VSHRN_I16_D0_Q1_4 | 1);
}
