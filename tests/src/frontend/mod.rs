//! Frontend translation tests: encode real A32/T32 instructions, run
//! them through `ArmMachine` (translate, interpret, chain) and verify
//! the resulting CPU state.
//!
//! Every program ends in an SVC, so a clean run stops with
//! `ExitReason::Exception` and `EXCP_SWI` pending.

mod a32;
mod flags;
mod fp;
mod ir;
mod system;
mod thumb;

use tcg_exec::{ExecEnv, ExitReason};
use tcg_frontend::arm::syndrome::EXCP_SWI;
use tcg_frontend::arm::{ArmCpuConfig, ArmMachine};

/// Guest RAM covers `[0, RAM_SIZE)`.
const RAM_SIZE: usize = 0x1_0000;
/// Programs are loaded here.
const CODE: u32 = 0x1000;
/// Scratch data area.
const DATA: u32 = 0x8000;
/// First address past guest RAM.
const UNMAPPED: u32 = 0x2_0000;

// ── A32 encoders ──────────────────────────────────────────────

const EQ: u32 = 0x0;
const NE: u32 = 0x1;
const GE: u32 = 0xa;
const LT: u32 = 0xb;
const AL: u32 = 0xe;

const OP_AND: u32 = 0;
const OP_EOR: u32 = 1;
const OP_SUB: u32 = 2;
const OP_RSB: u32 = 3;
const OP_ADD: u32 = 4;
const OP_ADC: u32 = 5;
const OP_SBC: u32 = 6;
const OP_CMP: u32 = 10;
const OP_ORR: u32 = 12;
const OP_MOV: u32 = 13;
const OP_BIC: u32 = 14;
const OP_MVN: u32 = 15;

const LSL: u32 = 0;
const LSR: u32 = 1;
const ASR: u32 = 2;

/// Data processing, rotated immediate. `rot` is the 4-bit field
/// (rotation amount / 2).
fn dp_imm(cond: u32, op: u32, s: u32, rn: u32, rd: u32, rot: u32, imm8: u32) -> u32 {
    (cond << 28) | (1 << 25) | (op << 21) | (s << 20) | (rn << 16) | (rd << 12) | (rot << 8) | imm8
}

/// Data processing, register shifted by immediate.
#[allow(clippy::too_many_arguments)]
fn dp_reg(cond: u32, op: u32, s: u32, rn: u32, rd: u32, rm: u32, shty: u32, shimm: u32) -> u32 {
    (cond << 28) | (op << 21) | (s << 20) | (rn << 16) | (rd << 12) | (shimm << 7) | (shty << 5) | rm
}

/// Data processing, register shifted by register.
fn dp_rsr(op: u32, s: u32, rn: u32, rd: u32, rm: u32, shty: u32, rs: u32) -> u32 {
    (AL << 28) | (op << 21) | (s << 20) | (rn << 16) | (rd << 12) | (rs << 8) | (shty << 5) | (1 << 4) | rm
}

fn mov_imm(rd: u32, imm8: u32) -> u32 {
    dp_imm(AL, OP_MOV, 0, 0, rd, 0, imm8)
}

fn mov_reg(rd: u32, rm: u32) -> u32 {
    dp_reg(AL, OP_MOV, 0, 0, rd, rm, LSL, 0)
}

fn add_imm(rd: u32, rn: u32, imm8: u32) -> u32 {
    dp_imm(AL, OP_ADD, 0, rn, rd, 0, imm8)
}

fn add_reg(rd: u32, rn: u32, rm: u32) -> u32 {
    dp_reg(AL, OP_ADD, 0, rn, rd, rm, LSL, 0)
}

fn movw(rd: u32, imm16: u32) -> u32 {
    0xe300_0000 | ((imm16 >> 12) << 16) | (rd << 12) | (imm16 & 0xfff)
}

fn movt(rd: u32, imm16: u32) -> u32 {
    0xe340_0000 | ((imm16 >> 12) << 16) | (rd << 12) | (imm16 & 0xfff)
}

/// Single word/byte load or store with a 12-bit immediate.
#[allow(clippy::too_many_arguments)]
fn ldst_imm(l: u32, b: u32, p: u32, u: u32, w: u32, rn: u32, rt: u32, imm12: u32) -> u32 {
    0xe400_0000
        | (p << 24)
        | (u << 23)
        | (b << 22)
        | (w << 21)
        | (l << 20)
        | (rn << 16)
        | (rt << 12)
        | imm12
}

fn ldr_imm(rt: u32, rn: u32, imm12: u32) -> u32 {
    ldst_imm(1, 0, 1, 1, 0, rn, rt, imm12)
}

fn str_imm(rt: u32, rn: u32, imm12: u32) -> u32 {
    ldst_imm(0, 0, 1, 1, 0, rn, rt, imm12)
}

fn ldrb(rt: u32, rn: u32, imm12: u32) -> u32 {
    ldst_imm(1, 1, 1, 1, 0, rn, rt, imm12)
}

const SH_H: u32 = 0b01;
const SH_SB_D: u32 = 0b10;
const SH_SH_STRD: u32 = 0b11;

/// Halfword, signed byte and doubleword transfers with an 8-bit
/// immediate. `sh` is bits 6:5 (together with `l` it picks the op).
#[allow(clippy::too_many_arguments)]
fn ldst_extra(l: u32, p: u32, u: u32, w: u32, rn: u32, rt: u32, imm8: u32, sh: u32) -> u32 {
    0xe040_0090
        | (p << 24)
        | (u << 23)
        | (w << 21)
        | (l << 20)
        | (rn << 16)
        | (rt << 12)
        | ((imm8 >> 4) << 8)
        | (sh << 5)
        | (imm8 & 0xf)
}

fn ldrex(rt: u32, rn: u32) -> u32 {
    0xe190_0f9f | (rn << 16) | (rt << 12)
}

fn strex(rd: u32, rt: u32, rn: u32) -> u32 {
    0xe180_0f90 | (rn << 16) | (rd << 12) | rt
}

/// B/BL with a word offset relative to the instruction address + 8.
fn b(cond: u32, link: bool, words: i32) -> u32 {
    (cond << 28) | (0xa << 24) | ((link as u32) << 24) | (words as u32 & 0xff_ffff)
}

fn bx(rm: u32) -> u32 {
    0xe12f_ff10 | rm
}

fn svc(imm24: u32) -> u32 {
    0xef00_0000 | imm24
}

fn udf(imm: u32) -> u32 {
    0xe7f0_00f0 | ((imm >> 4) << 8) | (imm & 0xf)
}

fn mrc_p15(opc1: u32, rt: u32, crn: u32, crm: u32, opc2: u32) -> u32 {
    0xee10_0f10 | (opc1 << 21) | (crn << 16) | (rt << 12) | (opc2 << 5) | crm
}

fn mcr_p15(opc1: u32, rt: u32, crn: u32, crm: u32, opc2: u32) -> u32 {
    0xee00_0f10 | (opc1 << 21) | (crn << 16) | (rt << 12) | (opc2 << 5) | crm
}

// ── T16/T32 encoders ──────────────────────────────────────────

fn t_movs(rd: u16, imm8: u16) -> u16 {
    0x2000 | (rd << 8) | imm8
}

fn t_cmp_imm(rn: u16, imm8: u16) -> u16 {
    0x2800 | (rn << 8) | imm8
}

fn t_adds_reg(rd: u16, rn: u16, rm: u16) -> u16 {
    0x1800 | (rm << 6) | (rn << 3) | rd
}

fn t_subs_imm3(rd: u16, rn: u16, imm3: u16) -> u16 {
    0x1e00 | (imm3 << 6) | (rn << 3) | rd
}

/// Conditional branch, offset in halfwords from the instruction + 4.
fn t_bcond(cond: u16, halves: i16) -> u16 {
    0xd000 | (cond << 8) | (halves as u16 & 0xff)
}

fn t_svc(imm8: u16) -> u16 {
    0xdf00 | imm8
}

const T_NOP: u16 = 0xbf00;
const T_BX_LR: u16 = 0x4770;

/// MOVW/MOVT (T3/T1) as two halfwords.
fn t32_mov16(top: bool, rd: u16, imm16: u16) -> [u16; 2] {
    let base = if top { 0xf2c0 } else { 0xf240 };
    let hw1 = base | (((imm16 >> 11) & 1) << 10) | (imm16 >> 12);
    let hw2 = (((imm16 >> 8) & 7) << 12) | (rd << 8) | (imm16 & 0xff);
    [hw1, hw2]
}

/// BL with a small forward offset in halfwords from the instruction + 4.
fn t32_bl(halves: u16) -> [u16; 2] {
    [0xf000 | (halves >> 11), 0xf800 | (halves & 0x7ff)]
}

// ── Runner ────────────────────────────────────────────────────

fn machine(cfg: ArmCpuConfig) -> ArmMachine {
    let _ = env_logger::builder().is_test(true).try_init();
    ArmMachine::new(cfg, 0, RAM_SIZE).unwrap()
}

/// EL0 with the FPU enabled, as for a Linux user process.
fn user() -> ArmMachine {
    machine(ArmCpuConfig::cortex_a15().user_only(true))
}

/// Secure SVC mode straight out of reset.
fn privileged() -> ArmMachine {
    machine(ArmCpuConfig::cortex_a15())
}

fn load_a32(m: &mut ArmMachine, code: &[u32]) {
    load_a32_at(m, CODE, code);
    m.env_mut().regs[15] = CODE;
    m.env_mut().thumb = 0;
}

fn load_a32_at(m: &mut ArmMachine, addr: u32, code: &[u32]) {
    m.load_words(addr, code).unwrap();
}

fn load_thumb(m: &mut ArmMachine, code: &[u16]) {
    m.load_halfwords(CODE, code).unwrap();
    m.env_mut().regs[15] = CODE;
    m.env_mut().thumb = 1;
}

fn run(m: &mut ArmMachine) -> ExitReason {
    let mut exec = ExecEnv::default();
    m.run(&mut exec, 10_000).unwrap()
}

/// Run until the terminating SVC.
fn run_to_svc(m: &mut ArmMachine) {
    assert_eq!(run(m), ExitReason::Exception);
    assert_eq!(m.env().exception.index, EXCP_SWI, "stopped at pc {:#x}", m.env().regs[15]);
}

fn run_a32(m: &mut ArmMachine, code: &[u32]) {
    load_a32(m, code);
    run_to_svc(m);
}

fn run_thumb(m: &mut ArmMachine, code: &[u16]) {
    load_thumb(m, code);
    run_to_svc(m);
}

fn nzcv(m: &ArmMachine) -> u32 {
    m.cpu.cpsr_read() >> 28
}
