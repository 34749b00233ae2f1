use crate::types::Type;

/// Lifetime/scope of a TCG temporary.
///
/// Maps to QEMU's `TCGTempKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TempKind {
    /// Live within a single extended basic block.
    Ebb,
    /// Live across the entire translation block.
    Tb,
    /// Backed by a field of the guest CPU env; survives between TBs.
    Global,
    /// The env pointer itself.
    Fixed,
    /// Compile-time constant.
    Const,
}

/// Index into the Context's temp pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TempIdx(pub u32);

/// A TCG temporary variable.
///
/// There is no host register state here: temps are only ever
/// evaluated by the interpreter, which keeps values in its own frame.
#[derive(Debug, Clone)]
pub struct Temp {
    pub idx: TempIdx,
    pub ty: Type,
    pub kind: TempKind,
    /// Immediate value of a `Const` temp, masked to `ty`.
    pub val: u64,
    /// Env base of a `Global` temp.
    pub mem_base: Option<TempIdx>,
    /// Byte offset of a `Global` temp inside the env.
    pub mem_offset: i64,
    /// Name used by the IR dump ("r0", "CF", "env").
    pub name: Option<&'static str>,
}

impl Temp {
    fn with_kind(idx: TempIdx, ty: Type, kind: TempKind) -> Self {
        Self {
            idx,
            ty,
            kind,
            val: 0,
            mem_base: None,
            mem_offset: 0,
            name: None,
        }
    }

    pub fn new_ebb(idx: TempIdx, ty: Type) -> Self {
        Self::with_kind(idx, ty, TempKind::Ebb)
    }

    pub fn new_tb(idx: TempIdx, ty: Type) -> Self {
        Self::with_kind(idx, ty, TempKind::Tb)
    }

    pub fn new_const(idx: TempIdx, ty: Type, val: u64) -> Self {
        Self {
            val: val & ty.mask(),
            ..Self::with_kind(idx, ty, TempKind::Const)
        }
    }

    pub fn new_global(
        idx: TempIdx,
        ty: Type,
        base: TempIdx,
        offset: i64,
        name: &'static str,
    ) -> Self {
        Self {
            mem_base: Some(base),
            mem_offset: offset,
            name: Some(name),
            ..Self::with_kind(idx, ty, TempKind::Global)
        }
    }

    pub fn new_fixed(idx: TempIdx, ty: Type, name: &'static str) -> Self {
        Self {
            name: Some(name),
            ..Self::with_kind(idx, ty, TempKind::Fixed)
        }
    }

    pub fn is_const(&self) -> bool {
        self.kind == TempKind::Const
    }

    pub fn is_global(&self) -> bool {
        self.kind == TempKind::Global
    }

    pub fn is_fixed(&self) -> bool {
        self.kind == TempKind::Fixed
    }
}
