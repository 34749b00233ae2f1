use tcg_core::opcode::*;
use tcg_core::types::Type;

#[test]
fn table_covers_every_opcode() {
    assert_eq!(OPCODE_DEFS.len(), Opcode::Count as usize);
    assert_eq!(Opcode::Mov.def().name, "mov");
    assert_eq!(Opcode::InsnStart.def().name, "insn_start");
}

#[test]
fn argument_counts() {
    let d = Opcode::MovCond.def();
    assert_eq!((d.nb_oargs, d.nb_iargs, d.nb_cargs), (1, 4, 1));
    assert_eq!(d.nb_args(), 6);
    // cmpxchg: old <- addr, cmp, new; memop and mmu index
    assert_eq!(Opcode::AtomicCmpXchg.def().nb_args(), 6);
    assert_eq!(Opcode::InsnStart.def().nb_cargs, 3);
}

#[test]
fn tb_exits() {
    for opc in [Opcode::GotoTb, Opcode::ExitTb, Opcode::LookupAndGotoPtr] {
        assert!(opc.is_tb_exit(), "{opc:?}");
    }
    assert!(!Opcode::Br.is_tb_exit());
    assert!(!Opcode::Call.is_tb_exit());
}

#[test]
fn carry_chain_ops() {
    for opc in [Opcode::AddCO, Opcode::AddCI, Opcode::SubBO, Opcode::SubBI] {
        assert!(opc.uses_carry());
        assert!(opc.is_int_polymorphic());
    }
    assert!(!Opcode::Add.uses_carry());
}

#[test]
fn guest_memory_ops_have_side_effects() {
    for opc in [Opcode::QemuLd, Opcode::QemuSt, Opcode::AtomicCmpXchg] {
        let f = opc.def().flags;
        assert!(f.contains(OpFlags::SIDE_EFFECTS | OpFlags::CALL_CLOBBER));
    }
}

#[test]
fn fixed_width_conversions() {
    assert_eq!(Opcode::ExtUI32I64.fixed_type(), Some(Type::I64));
    assert_eq!(Opcode::ExtrhI64I32.fixed_type(), Some(Type::I32));
    assert_eq!(Opcode::Add.fixed_type(), None);
    assert!(!Opcode::ExtI32I64.is_int_polymorphic());
}
