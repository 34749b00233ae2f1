use tcg_core::{Context, TempKind, Type};

fn ctx_with_globals() -> Context {
    let mut ctx = Context::new();
    let env = ctx.new_fixed(Type::I64, "env");
    ctx.new_global(Type::I32, env, 0, "r0");
    ctx.new_global(Type::I32, env, 4, "r1");
    ctx
}

#[test]
fn globals_are_found_by_offset() {
    let ctx = ctx_with_globals();
    assert_eq!(ctx.nb_globals(), 3);
    let r1 = ctx.find_global(4).unwrap();
    assert_eq!(ctx.temp(r1).name, Some("r1"));
    assert_eq!(ctx.temp(r1).kind, TempKind::Global);
    assert_eq!(ctx.find_global(8), None);
}

#[test]
fn reset_keeps_globals_and_drops_locals() {
    let mut ctx = ctx_with_globals();
    let t = ctx.new_temp(Type::I32);
    ctx.new_label();
    ctx.gen_insn_start(0x1000, 0, 0);
    assert!(t.0 >= 3);
    ctx.reset();
    assert_eq!(ctx.nb_temps(), 3);
    assert!(ctx.ops().is_empty());
    assert!(ctx.labels().is_empty());
    assert!(ctx.insn_starts().is_empty());
    assert!(ctx.find_global(0).is_some());
}

#[test]
fn constants_are_deduplicated_per_type() {
    let mut ctx = Context::new();
    let a = ctx.new_const(Type::I32, 5);
    let b = ctx.new_const(Type::I32, 5);
    let c = ctx.new_const(Type::I64, 5);
    assert_eq!(a, b);
    assert_ne!(a, c);
    // Values are truncated to the type before lookup.
    assert_eq!(ctx.new_const(Type::I32, 0x1_0000_0005), a);
}

#[test]
#[should_panic]
fn globals_after_locals_are_rejected() {
    let mut ctx = Context::new();
    let env = ctx.new_fixed(Type::I64, "env");
    ctx.new_temp(Type::I32);
    ctx.new_global(Type::I32, env, 0, "late");
}

#[test]
fn insn_start_param_patches_last_insn() {
    let mut ctx = Context::new();
    ctx.gen_insn_start(0x1000, 0, 0);
    ctx.gen_insn_start(0x1004, 0, 0);
    ctx.set_insn_start_param(2, 0x9200_0000);
    let first = ctx.op(ctx.insn_starts()[0]);
    let last = ctx.op(ctx.insn_starts()[1]);
    assert_eq!(first.cargs()[2].0, 0);
    assert_eq!(last.cargs()[2].0, 0x9200_0000);
    assert_eq!(last.cargs()[0].0, 0x1004);
}

#[test]
fn labels_record_placement() {
    let mut ctx = Context::new();
    let l = ctx.new_label();
    assert!(!ctx.label(l).present);
    ctx.gen_br(l);
    assert!(ctx.label(l).has_pending_uses());
    ctx.gen_set_label(l);
    assert!(ctx.label(l).present);
    assert!(!ctx.label(l).has_pending_uses());
    assert_eq!(ctx.label(l).position, Some(ctx.ops()[1].idx));
    assert_eq!(ctx.label(l).uses, [ctx.ops()[0].idx]);
}
