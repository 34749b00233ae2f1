//! Shape of the IR the translator emits for single instructions.

use super::*;
use tcg_core::dump::dump_to_string;
use tcg_core::tb::cflags::{CF_LAST_IO, CF_USE_ICOUNT};
use tcg_core::{Context, Op, Opcode, TempIdx, TempKind};
use tcg_exec::GuestCpu;
use tcg_frontend::arm::cpu::CAN_DO_IO_OFFSET;

/// Translate the one-instruction block at `CODE`.
fn translate_one(code: &[u32]) -> Context {
    let mut m = user();
    load_a32(&mut m, code);
    m.cpu.rebuild_hflags();
    let flags = m.get_flags();
    let mut ir = Context::new();
    // cflags carry the instruction count limit in their low bits.
    let size = m.gen_code(&mut ir, CODE, flags, 1);
    assert_eq!(size, 4);
    ir
}

fn global_named(ir: &Context, name: &str) -> TempIdx {
    ir.globals()
        .iter()
        .find(|t| t.name == Some(name))
        .map(|t| t.idx)
        .unwrap_or_else(|| panic!("no global {name}"))
}

/// Ops of the instruction body: after its `insn_start`, before the
/// block epilogue starts writing the PC.
fn body(ir: &Context) -> Vec<&Op> {
    let pc = global_named(ir, "pc");
    ir.ops()
        .iter()
        .skip_while(|op| op.opc != Opcode::InsnStart)
        .skip(1)
        .take_while(|op| !op.opc.is_tb_exit() && !op.oargs().contains(&pc))
        .collect()
}

fn const_val(ir: &Context, t: TempIdx) -> Option<u64> {
    let t = ir.temp(t);
    (t.kind == TempKind::Const).then_some(t.val)
}

#[test]
fn test_add_immediate_emits_load_add_store() {
    // add r0, r0, #1
    let ir = translate_one(&[0xe280_0001]);
    let r0 = global_named(&ir, "r0");
    let ops = body(&ir);
    let opcs: Vec<Opcode> = ops.iter().map(|op| op.opc).collect();
    assert_eq!(opcs, [Opcode::Mov, Opcode::Add, Opcode::Mov], "{}", dump_to_string(&ir));

    assert_eq!(ops[0].iargs(), [r0]);
    let add = ops[1];
    assert_eq!(add.iargs()[0], ops[0].oargs()[0]);
    assert_eq!(const_val(&ir, add.iargs()[1]), Some(1));
    assert_eq!(ops[2].oargs(), [r0]);
    assert_eq!(ops[2].iargs(), add.oargs());
}

#[test]
fn test_add_without_s_leaves_flags_alone() {
    let ir = translate_one(&[0xe280_0001]);
    let flags: Vec<TempIdx> = ["NF", "ZF", "CF", "VF"]
        .iter()
        .map(|n| global_named(&ir, n))
        .collect();
    for op in ir.ops() {
        assert!(
            op.oargs().iter().all(|t| !flags.contains(t)),
            "{:?} writes a flag",
            op.opc
        );
    }
}

#[test]
fn test_literal_load_uses_pc_plus_8() {
    // ldr r1, [pc, #0]
    let ir = translate_one(&[0xe59f_1000]);
    let ops = body(&ir);
    let ld = ops
        .iter()
        .find(|op| op.opc == Opcode::QemuLd)
        .expect("no guest load");
    let addr = ld.iargs()[0];
    let def = ops
        .iter()
        .find(|op| op.oargs() == [addr])
        .expect("address not computed in the insn");
    assert_eq!(def.opc, Opcode::Mov);
    assert_eq!(const_val(&ir, def.iargs()[0]), Some((CODE + 8) as u64));
}

#[test]
fn test_dump_names_globals() {
    let ir = translate_one(&[0xe280_0001]);
    let text = dump_to_string(&ir);
    assert!(text.contains("add_i32"), "{text}");
    assert!(text.contains("r0"), "{text}");
    assert!(text.contains(&format!("0x{CODE:08x}")), "{text}");
}

/// Constants stored to the env field at `offset`, in op order.
fn env_stores(ir: &Context, offset: i64) -> Vec<Option<u64>> {
    ir.ops()
        .iter()
        .filter(|op| op.opc == Opcode::St && op.cargs()[0].0 == offset as u32)
        .map(|op| const_val(ir, op.iargs()[0]))
        .collect()
}

#[test]
fn test_counter_read_ends_block_under_icount() {
    // mrrc p15, 0, r0, r1, c14 (CNTPCT)
    let code = [0xec51_0f0e, mov_imm(2, 1), svc(0)];
    let mut m = privileged();
    load_a32(&mut m, &code);
    m.cpu.rebuild_hflags();
    let flags = m.get_flags();

    let mut ir = Context::new();
    let size = m.gen_code(&mut ir, CODE, flags, 3 | CF_USE_ICOUNT);
    assert_eq!(size, 4, "{}", dump_to_string(&ir));
    assert_eq!(env_stores(&ir, CAN_DO_IO_OFFSET), [Some(0), Some(1)]);
    assert!(ir.ops().iter().all(|op| op.opc != Opcode::GotoTb));

    let mut ir = Context::new();
    let size = m.gen_code(&mut ir, CODE, flags, 3);
    assert_eq!(size, 12);
    assert!(env_stores(&ir, CAN_DO_IO_OFFSET).is_empty());
}

#[test]
fn test_exception_return_opens_io_window_under_icount() {
    // ldm r0, {pc}^
    let mut m = privileged();
    load_a32(&mut m, &[0xe8d0_8000]);
    m.cpu.rebuild_hflags();
    let flags = m.get_flags();
    let mut ir = Context::new();
    m.gen_code(&mut ir, CODE, flags, 1 | CF_USE_ICOUNT);
    assert_eq!(env_stores(&ir, CAN_DO_IO_OFFSET), [Some(0), Some(1)]);
}

#[test]
fn test_last_io_block_allows_io_in_final_insn() {
    let mut m = user();
    load_a32(&mut m, &[mov_imm(0, 1), mov_imm(1, 2)]);
    m.cpu.rebuild_hflags();
    let flags = m.get_flags();
    let mut ir = Context::new();
    let size = m.gen_code(&mut ir, CODE, flags, 2 | CF_USE_ICOUNT | CF_LAST_IO);
    assert_eq!(size, 8);
    assert_eq!(env_stores(&ir, CAN_DO_IO_OFFSET), [Some(0), Some(1)]);
}
