/// A cached translation block.
///
/// Maps to QEMU's `TranslationBlock`: the mapping from a guest code
/// region to its translated IR.
#[derive(Debug, Clone)]
pub struct TranslationBlock {
    /// Guest PC where this TB starts.
    pub pc: u32,
    /// CPU state flags that affect translation (mode, Thumb, IT state...).
    pub flags: u64,
    /// Compile flags (instruction count limit, single-step, etc.).
    pub cflags: u32,
    /// Size of guest code covered by this TB, in bytes.
    pub size: u32,
    /// Number of guest instructions in this TB.
    pub icount: u16,

    /// Destination TB index for each `goto_tb` slot, once chained.
    pub jmp_dest: [Option<usize>; 2],

    /// Index of the next TB in the same hash bucket, or `None`.
    pub hash_next: Option<usize>,

    /// Whether this TB has been invalidated.
    pub invalid: bool,
}

/// Compile flags for TranslationBlock.cflags.
pub mod cflags {
    /// Mask for the instruction count limit (0 = no limit).
    pub const CF_COUNT_MASK: u32 = 0x0000_01FF;
    /// Last I/O instruction in the TB.
    pub const CF_LAST_IO: u32 = 0x0000_8000;
    /// Do not chain to other TBs with goto_tb.
    pub const CF_NO_GOTO_TB: u32 = 0x0000_0200;
    /// Do not use the TB lookup for indirect jumps.
    pub const CF_NO_GOTO_PTR: u32 = 0x0000_0400;
    /// TB is being single-stepped.
    pub const CF_SINGLE_STEP: u32 = 0x0000_0800;
    /// Use icount (deterministic execution).
    pub const CF_USE_ICOUNT: u32 = 0x0000_2000;
    /// Other vCPUs run in parallel: exclusives must be atomic.
    pub const CF_PARALLEL: u32 = 0x0008_0000;
}

impl TranslationBlock {
    pub fn new(pc: u32, flags: u64, cflags: u32) -> Self {
        Self {
            pc,
            flags,
            cflags,
            size: 0,
            icount: 0,
            jmp_dest: [None; 2],
            hash_next: None,
            invalid: false,
        }
    }

    /// Compute hash bucket index for TB lookup.
    pub fn hash(pc: u32, flags: u64) -> usize {
        let h = (pc as u64).wrapping_mul(0x9e3779b97f4a7c15) ^ flags;
        (h as usize) & (TB_HASH_SIZE - 1)
    }

    /// Record the chained destination for exit slot `n`.
    pub fn set_jmp_dest(&mut self, n: usize, dest: usize) {
        assert!(n < 2);
        self.jmp_dest[n] = Some(dest);
    }

    /// Maximum number of guest instructions per TB.
    pub fn max_insns(cflags: u32) -> u32 {
        let count = cflags & cflags::CF_COUNT_MASK;
        if count == 0 {
            crate::context::MAX_INSNS as u32
        } else {
            count
        }
    }
}

/// Number of buckets in the global TB hash table.
pub const TB_HASH_SIZE: usize = 1 << 15; // 32768

/// Number of entries in the per-CPU jump cache.
pub const TB_JMP_CACHE_SIZE: usize = 1 << 12; // 4096

/// Per-CPU direct-mapped TB jump cache.
///
/// Indexed by `(pc >> 1) & (TB_JMP_CACHE_SIZE - 1)` since Thumb code
/// is halfword aligned.
pub struct JumpCache {
    entries: Box<[Option<usize>; TB_JMP_CACHE_SIZE]>,
}

impl JumpCache {
    pub fn new() -> Self {
        Self {
            entries: Box::new([None; TB_JMP_CACHE_SIZE]),
        }
    }

    fn index(pc: u32) -> usize {
        (pc as usize >> 1) & (TB_JMP_CACHE_SIZE - 1)
    }

    pub fn lookup(&self, pc: u32) -> Option<usize> {
        self.entries[Self::index(pc)]
    }

    pub fn insert(&mut self, pc: u32, tb_idx: usize) {
        self.entries[Self::index(pc)] = Some(tb_idx);
    }

    pub fn remove(&mut self, pc: u32) {
        self.entries[Self::index(pc)] = None;
    }

    pub fn invalidate(&mut self) {
        self.entries.fill(None);
    }
}

impl Default for JumpCache {
    fn default() -> Self {
        Self::new()
    }
}
