use tcg_core::tb::{TranslationBlock, TB_HASH_SIZE};
use tcg_core::Context;

use crate::ExecError;

const MAX_TBS: usize = 65536;

/// Storage and hash-table lookup for TBs.
///
/// Each TB keeps the IR it was translated to; the interpreter runs
/// that IR directly.
pub struct TbStore {
    tbs: Vec<TranslationBlock>,
    code: Vec<Context>,
    hash: Vec<Option<usize>>,
}

impl TbStore {
    pub fn new() -> Self {
        Self {
            tbs: Vec::new(),
            code: Vec::new(),
            hash: vec![None; TB_HASH_SIZE],
        }
    }

    /// Allocate a new TB holding the translated `code`.
    pub fn alloc(
        &mut self,
        tb: TranslationBlock,
        code: Context,
    ) -> Result<usize, ExecError> {
        if self.tbs.len() >= MAX_TBS {
            return Err(ExecError::TbStoreFull);
        }
        self.tbs.push(tb);
        self.code.push(code);
        Ok(self.tbs.len() - 1)
    }

    pub fn get(&self, idx: usize) -> &TranslationBlock {
        &self.tbs[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut TranslationBlock {
        &mut self.tbs[idx]
    }

    /// The IR of TB `idx`.
    pub fn code(&self, idx: usize) -> &Context {
        &self.code[idx]
    }

    /// Whether TB `idx` is valid for the given lookup key.
    pub fn matches(&self, idx: usize, pc: u32, flags: u64, cflags: u32) -> bool {
        let tb = &self.tbs[idx];
        !tb.invalid && tb.pc == pc && tb.flags == flags && tb.cflags == cflags
    }

    /// Lookup a valid TB by (pc, flags, cflags) in the hash table.
    pub fn lookup(&self, pc: u32, flags: u64, cflags: u32) -> Option<usize> {
        let mut cur = self.hash[TranslationBlock::hash(pc, flags)];
        while let Some(idx) = cur {
            if self.matches(idx, pc, flags, cflags) {
                return Some(idx);
            }
            cur = self.tbs[idx].hash_next;
        }
        None
    }

    /// Insert a TB into the hash table (prepend to bucket).
    pub fn insert(&mut self, tb_idx: usize) {
        let bucket = {
            let tb = &self.tbs[tb_idx];
            TranslationBlock::hash(tb.pc, tb.flags)
        };
        self.tbs[tb_idx].hash_next = self.hash[bucket];
        self.hash[bucket] = Some(tb_idx);
    }

    /// Mark a TB as invalid, unlink chained jumps into it, and
    /// remove it from the hash chain.
    pub fn invalidate(&mut self, tb_idx: usize) {
        self.tbs[tb_idx].invalid = true;
        self.tbs[tb_idx].jmp_dest = [None; 2];
        for tb in &mut self.tbs {
            for dest in &mut tb.jmp_dest {
                if *dest == Some(tb_idx) {
                    *dest = None;
                }
            }
        }

        let bucket = {
            let tb = &self.tbs[tb_idx];
            TranslationBlock::hash(tb.pc, tb.flags)
        };
        let mut prev: Option<usize> = None;
        let mut cur = self.hash[bucket];
        while let Some(idx) = cur {
            let next = self.tbs[idx].hash_next;
            if idx == tb_idx {
                match prev {
                    Some(p) => self.tbs[p].hash_next = next,
                    None => self.hash[bucket] = next,
                }
                self.tbs[idx].hash_next = None;
                return;
            }
            prev = cur;
            cur = next;
        }
    }

    /// Invalidate every TB overlapping the guest range
    /// `[start, start + len)`.
    pub fn invalidate_range(&mut self, start: u32, len: u32) {
        let end = start as u64 + len as u64;
        let hits: Vec<usize> = self
            .tbs
            .iter()
            .enumerate()
            .filter(|(_, tb)| {
                let s = tb.pc as u64;
                !tb.invalid && s < end && s + tb.size as u64 > start as u64
            })
            .map(|(i, _)| i)
            .collect();
        for idx in hits {
            self.invalidate(idx);
        }
    }

    /// Flush all TBs and reset the hash table.
    pub fn flush(&mut self) {
        self.tbs.clear();
        self.code.clear();
        self.hash.fill(None);
    }

    pub fn len(&self) -> usize {
        self.tbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tbs.is_empty()
    }
}

impl Default for TbStore {
    fn default() -> Self {
        Self::new()
    }
}
