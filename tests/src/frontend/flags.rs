//! NZCV from the translated flag-setting ALU ops against a bit-level
//! reference.

use super::*;
use proptest::prelude::*;

/// `a + b + carry_in` with AArch32 NZCV.
fn add_with_carry(a: u32, b: u32, carry_in: u32) -> (u32, u32) {
    let wide = a as u64 + b as u64 + carry_in as u64;
    let r = wide as u32;
    let n = r >> 31;
    let z = (r == 0) as u32;
    let c = (wide >> 32) as u32;
    let v = ((a ^ r) & (b ^ r)) >> 31;
    (r, (n << 3) | (z << 2) | (c << 1) | v)
}

/// Run `op r2, r0, r1` with the flags set so that C equals `carry`.
fn run_flag_op(op: u32, a: u32, b: u32, carry: bool) -> (u32, u32) {
    let mut m = user();
    m.env_mut().regs[0] = a;
    m.env_mut().regs[1] = b;
    m.env_mut().cf = carry as u32;
    run_a32(&mut m, &[dp_reg(AL, op, 1, 0, 2, 1, LSL, 0), svc(0)]);
    (m.env().regs[2], nzcv(&m))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_adds_flags(a in any::<u32>(), b in any::<u32>()) {
        prop_assert_eq!(run_flag_op(OP_ADD, a, b, false), add_with_carry(a, b, 0));
    }

    #[test]
    fn prop_subs_flags(a in any::<u32>(), b in any::<u32>()) {
        prop_assert_eq!(run_flag_op(OP_SUB, a, b, false), add_with_carry(a, !b, 1));
    }

    #[test]
    fn prop_adcs_flags(a in any::<u32>(), b in any::<u32>(), c in any::<bool>()) {
        prop_assert_eq!(run_flag_op(OP_ADC, a, b, c), add_with_carry(a, b, c as u32));
    }

    #[test]
    fn prop_sbcs_flags(a in any::<u32>(), b in any::<u32>(), c in any::<bool>()) {
        prop_assert_eq!(run_flag_op(OP_SBC, a, b, c), add_with_carry(a, !b, c as u32));
    }

    #[test]
    fn prop_cmp_matches_subs(a in any::<u32>(), b in any::<u32>()) {
        let mut m = user();
        m.env_mut().regs[0] = a;
        m.env_mut().regs[1] = b;
        run_a32(&mut m, &[dp_reg(AL, OP_CMP, 1, 0, 0, 1, LSL, 0), svc(0)]);
        prop_assert_eq!(nzcv(&m), add_with_carry(a, !b, 1).1);
        // CMP writes no register.
        prop_assert_eq!(m.env().regs[0], a);
    }
}

#[test]
fn test_reference_model_corners() {
    assert_eq!(add_with_carry(u32::MAX, 1, 0), (0, 0b0110));
    assert_eq!(add_with_carry(0x7fff_ffff, 1, 0), (0x8000_0000, 0b1001));
    // 0 - 0: Z and C (no borrow)
    assert_eq!(add_with_carry(0, !0, 1), (0, 0b0110));
}
