use tcg_core::tb::cflags::*;
use tcg_core::tb::*;
use tcg_core::MAX_INSNS;

#[test]
fn tb_new() {
    let tb = TranslationBlock::new(0x1000, 7, CF_NO_GOTO_TB);
    assert_eq!(tb.pc, 0x1000);
    assert_eq!(tb.flags, 7);
    assert_eq!(tb.cflags, CF_NO_GOTO_TB);
    assert_eq!(tb.size, 0);
    assert_eq!(tb.icount, 0);
    assert_eq!(tb.jmp_dest, [None, None]);
    assert_eq!(tb.hash_next, None);
    assert!(!tb.invalid);
}

#[test]
fn tb_hash_in_range() {
    for pc in [0u32, 0x1000, 0x8000_0002, 0xffff_fffe] {
        for flags in [0u64, 1, u64::MAX] {
            assert!(TranslationBlock::hash(pc, flags) < TB_HASH_SIZE);
        }
    }
}

#[test]
fn tb_hash_depends_on_flags() {
    // A32 and T32 translations of one address live in different
    // buckets in practice.
    assert_ne!(
        TranslationBlock::hash(0x1000, 0),
        TranslationBlock::hash(0x1000, 1)
    );
}

#[test]
fn tb_jmp_dest() {
    let mut tb = TranslationBlock::new(0x1000, 0, 0);
    tb.set_jmp_dest(1, 42);
    assert_eq!(tb.jmp_dest, [None, Some(42)]);
}

#[test]
#[should_panic]
fn tb_jmp_dest_slot_out_of_range() {
    TranslationBlock::new(0, 0, 0).set_jmp_dest(2, 0);
}

#[test]
fn tb_max_insns() {
    assert_eq!(TranslationBlock::max_insns(0), MAX_INSNS as u32);
    assert_eq!(TranslationBlock::max_insns(1), 1);
    assert_eq!(TranslationBlock::max_insns(CF_NO_GOTO_TB | 5), 5);
}

#[test]
fn jump_cache_halfword_index() {
    let mut jc = JumpCache::new();
    jc.insert(0x1002, 3);
    assert_eq!(jc.lookup(0x1002), Some(3));
    assert_eq!(jc.lookup(0x1000), None);
    // Aliases one cache size (in halfwords) away.
    let alias = 0x1002 + 2 * TB_JMP_CACHE_SIZE as u32;
    assert_eq!(jc.lookup(alias), Some(3));
    jc.remove(0x1002);
    assert_eq!(jc.lookup(0x1002), None);
    jc.insert(0x2000, 1);
    jc.invalidate();
    assert_eq!(jc.lookup(0x2000), None);
}
