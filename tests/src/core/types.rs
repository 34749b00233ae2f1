use tcg_core::types::*;

#[test]
fn type_sizes() {
    assert_eq!(Type::I32.size_bits(), 32);
    assert_eq!(Type::I64.size_bits(), 64);
    assert_eq!(Type::I32.size_bytes(), 4);
    assert_eq!(Type::I64.size_bytes(), 8);
    assert_eq!(Type::I32.mask(), 0xffff_ffff);
}

const CONDS: [Cond; 14] = [
    Cond::Never,
    Cond::Always,
    Cond::Eq,
    Cond::Ne,
    Cond::Lt,
    Cond::Ge,
    Cond::Le,
    Cond::Gt,
    Cond::Ltu,
    Cond::Geu,
    Cond::Leu,
    Cond::Gtu,
    Cond::TstEq,
    Cond::TstNe,
];

#[test]
fn cond_invert_is_involution() {
    for c in CONDS {
        assert_eq!(c.invert().invert(), c, "{c:?}");
    }
}

#[test]
fn cond_swap() {
    assert_eq!(Cond::Lt.swap(), Cond::Gt);
    assert_eq!(Cond::Leu.swap(), Cond::Geu);
    assert_eq!(Cond::Eq.swap(), Cond::Eq);
    assert_eq!(Cond::TstNe.swap(), Cond::TstNe);
}

#[test]
fn cond_raw_round_trip() {
    for c in CONDS {
        assert_eq!(Cond::from_raw(c as u32), Some(c));
    }
    assert_eq!(Cond::from_raw(2), None);
}

#[test]
fn cond_eval_respects_width() {
    // -1 as i32 is less than 0; as u32 it is the largest value.
    assert!(Cond::Lt.eval(Type::I32, 0xffff_ffff, 0));
    assert!(Cond::Gtu.eval(Type::I32, 0xffff_ffff, 0));
    assert!(!Cond::Lt.eval(Type::I64, 0xffff_ffff, 0));
    assert!(Cond::TstNe.eval(Type::I32, 0b1010, 0b0010));
    assert!(Cond::TstEq.eval(Type::I32, 0b1010, 0b0101));
}

#[test]
fn memop_fields() {
    let op = MemOp::sw().with(MemOp::BSWAP);
    assert_eq!(op.size(), MemOp::SIZE_16);
    assert_eq!(op.size_bytes(), 2);
    assert!(op.is_signed());
    assert!(op.is_bswap());
    assert!(!op.without(MemOp::BSWAP).is_bswap());
    assert_eq!(MemOp::from_size(3), MemOp::uq());
}

#[test]
fn memop_alignment() {
    assert_eq!(MemOp::ul().align_bytes(), 1);
    assert_eq!(MemOp::ul().with(MemOp::ALIGN).align_bytes(), 4);
    assert_eq!(MemOp::uq().with(MemOp::ALIGN).align_bytes(), 8);
    assert_eq!(MemOp::ub().with(MemOp::ALIGN_16).align_bytes(), 16);
    assert_eq!(MemOp::uw().with(MemOp::ALIGN_4).align_bytes(), 4);
}
