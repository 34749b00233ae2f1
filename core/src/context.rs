use std::collections::HashMap;

use crate::label::Label;
use crate::op::{Op, OpIdx};
use crate::opcode::Opcode;
use crate::temp::{Temp, TempIdx, TempKind};
use crate::types::{Type, TYPE_COUNT};

/// Maximum number of guest instructions per TB.
pub const MAX_INSNS: usize = 512;

/// Per-thread TCG translation context.
///
/// Maps to QEMU's `TCGContext`. Holds all state needed during
/// translation of a single translation block: temporaries, IR ops
/// and labels.
#[derive(Clone)]
pub struct Context {
    temps: Vec<Temp>,
    ops: Vec<Op>,
    labels: Vec<Label>,

    /// Number of global temps (always at the front of `temps`).
    nb_globals: u32,

    // -- Constant deduplication --
    /// Per-type hash map from constant value to TempIdx,
    /// avoiding duplicate const temps.
    const_table: [HashMap<u64, TempIdx>; TYPE_COUNT],

    // -- Guest instruction tracking --
    /// Op index of each `insn_start`, indexed by guest insn number.
    insn_starts: Vec<OpIdx>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            temps: Vec::with_capacity(256),
            ops: Vec::with_capacity(512),
            labels: Vec::with_capacity(32),
            nb_globals: 0,
            const_table: Default::default(),
            insn_starts: Vec::with_capacity(MAX_INSNS),
        }
    }

    /// Reset context for translating a new TB. Preserves globals.
    pub fn reset(&mut self) {
        self.temps.truncate(self.nb_globals as usize);
        self.ops.clear();
        self.labels.clear();
        for table in &mut self.const_table {
            table.clear();
        }
        self.insn_starts.clear();
    }

    // -- Temp allocation --

    pub fn nb_globals(&self) -> u32 {
        self.nb_globals
    }

    pub fn nb_temps(&self) -> u32 {
        self.temps.len() as u32
    }

    /// Allocate a new EBB-scoped temporary.
    pub fn new_temp(&mut self, ty: Type) -> TempIdx {
        let idx = TempIdx(self.temps.len() as u32);
        self.temps.push(Temp::new_ebb(idx, ty));
        idx
    }

    /// Allocate a new TB-scoped temporary.
    pub fn new_temp_tb(&mut self, ty: Type) -> TempIdx {
        let idx = TempIdx(self.temps.len() as u32);
        self.temps.push(Temp::new_tb(idx, ty));
        idx
    }

    /// Get or create a constant temp (deduplicated per type).
    pub fn new_const(&mut self, ty: Type, val: u64) -> TempIdx {
        let val = val & ty.mask();
        let type_idx = ty as usize;
        if let Some(&existing) = self.const_table[type_idx].get(&val) {
            return existing;
        }
        let idx = TempIdx(self.temps.len() as u32);
        self.temps.push(Temp::new_const(idx, ty, val));
        self.const_table[type_idx].insert(val, idx);
        idx
    }

    /// Register a global temp (must be called before any
    /// non-global allocation).
    /// The `base` is the TempIdx of the env pointer (a fixed temp).
    pub fn new_global(
        &mut self,
        ty: Type,
        base: TempIdx,
        offset: i64,
        name: &'static str,
    ) -> TempIdx {
        assert_eq!(
            self.temps.len() as u32,
            self.nb_globals,
            "globals must be registered before locals"
        );
        let idx = TempIdx(self.temps.len() as u32);
        self.temps
            .push(Temp::new_global(idx, ty, base, offset, name));
        self.nb_globals += 1;
        idx
    }

    /// Register the env-pointer temp (must be called
    /// before any non-global allocation).
    pub fn new_fixed(&mut self, ty: Type, name: &'static str) -> TempIdx {
        assert_eq!(
            self.temps.len() as u32,
            self.nb_globals,
            "fixed temps must be registered before locals"
        );
        let idx = TempIdx(self.temps.len() as u32);
        self.temps.push(Temp::new_fixed(idx, ty, name));
        self.nb_globals += 1;
        idx
    }

    /// Find a previously registered global by env offset.
    pub fn find_global(&self, offset: i64) -> Option<TempIdx> {
        self.globals()
            .iter()
            .find(|t| t.kind == TempKind::Global && t.mem_offset == offset)
            .map(|t| t.idx)
    }

    pub fn temp(&self, idx: TempIdx) -> &Temp {
        &self.temps[idx.0 as usize]
    }

    pub fn temp_mut(&mut self, idx: TempIdx) -> &mut Temp {
        &mut self.temps[idx.0 as usize]
    }

    pub fn temps(&self) -> &[Temp] {
        &self.temps
    }

    /// Iterate over global temps only.
    pub fn globals(&self) -> &[Temp] {
        &self.temps[..self.nb_globals as usize]
    }

    // -- Op emission --

    pub fn emit_op(&mut self, op: Op) -> OpIdx {
        let idx = op.idx;
        if op.opc == Opcode::InsnStart {
            self.insn_starts.push(idx);
        }
        self.ops.push(op);
        idx
    }

    pub fn next_op_idx(&self) -> OpIdx {
        OpIdx(self.ops.len() as u32)
    }

    pub fn op(&self, idx: OpIdx) -> &Op {
        &self.ops[idx.0 as usize]
    }

    pub fn op_mut(&mut self, idx: OpIdx) -> &mut Op {
        &mut self.ops[idx.0 as usize]
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }

    // -- Guest instruction boundaries --

    /// Op index of every `insn_start`, in guest order.
    pub fn insn_starts(&self) -> &[OpIdx] {
        &self.insn_starts
    }

    /// The most recent `insn_start` op, if any.
    pub fn last_insn_start(&self) -> Option<OpIdx> {
        self.insn_starts.last().copied()
    }

    /// Patch parameter `n` of the most recent `insn_start`.
    ///
    /// Maps to QEMU's `tcg_set_insn_start_param()`; used to attach a
    /// syndrome word to an instruction after its decode has started.
    pub fn set_insn_start_param(&mut self, n: usize, val: u32) {
        if let Some(idx) = self.last_insn_start() {
            self.ops[idx.0 as usize].cargs_mut()[n] = TempIdx(val);
        }
    }

    // -- Labels --

    pub fn new_label(&mut self) -> u32 {
        let id = self.labels.len() as u32;
        self.labels.push(Label::new(id));
        id
    }

    pub fn label(&self, id: u32) -> &Label {
        &self.labels[id as usize]
    }

    pub fn label_mut(&mut self, id: u32) -> &mut Label {
        &mut self.labels[id as usize]
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
