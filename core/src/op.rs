use crate::opcode::Opcode;
use crate::temp::TempIdx;
use crate::types::Type;

/// Maximum number of arguments per IR operation.
pub const MAX_OP_ARGS: usize = 10;

/// Index into the Context's op list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpIdx(pub u32);

/// A single TCG IR operation.
///
/// Maps to QEMU's `TCGOp`. Each op has an opcode, a type (for
/// polymorphic ops), opcode-specific parameters, and up to
/// MAX_OP_ARGS arguments.
#[derive(Debug, Clone)]
pub struct Op {
    pub idx: OpIdx,
    pub opc: Opcode,
    /// Operand type for type-polymorphic ops (I32 or I64).
    pub op_type: Type,
    /// Opcode-specific parameter 1 (CALLI: number of call inputs).
    pub param1: u8,
    /// Opcode-specific parameter 2 (CALLO: number of call outputs).
    pub param2: u8,
    /// Arguments: temp indices, label ids, or encoded immediates.
    pub args: [TempIdx; MAX_OP_ARGS],
    pub nargs: u8,
}

impl Op {
    pub fn new(idx: OpIdx, opc: Opcode, op_type: Type) -> Self {
        Self {
            idx,
            opc,
            op_type,
            param1: 0,
            param2: 0,
            args: [TempIdx(0); MAX_OP_ARGS],
            nargs: 0,
        }
    }

    pub fn with_args(
        idx: OpIdx,
        opc: Opcode,
        op_type: Type,
        args: &[TempIdx],
    ) -> Self {
        let mut op = Self::new(idx, opc, op_type);
        let n = args.len().min(MAX_OP_ARGS);
        op.args[..n].copy_from_slice(&args[..n]);
        op.nargs = n as u8;
        op
    }

    fn counts(&self) -> (usize, usize, usize) {
        let def = self.opc.def();
        if self.opc == Opcode::Call {
            (
                self.param2 as usize,
                self.param1 as usize,
                def.nb_cargs as usize,
            )
        } else {
            (
                def.nb_oargs as usize,
                def.nb_iargs as usize,
                def.nb_cargs as usize,
            )
        }
    }

    /// Get the output arguments slice (based on opcode definition).
    pub fn oargs(&self) -> &[TempIdx] {
        let (o, _, _) = self.counts();
        &self.args[..o]
    }

    /// Get the input arguments slice.
    pub fn iargs(&self) -> &[TempIdx] {
        let (o, i, _) = self.counts();
        &self.args[o..o + i]
    }

    /// Get the constant arguments slice.
    pub fn cargs(&self) -> &[TempIdx] {
        let (o, i, c) = self.counts();
        &self.args[o + i..o + i + c]
    }

    pub fn cargs_mut(&mut self) -> &mut [TempIdx] {
        let (o, i, c) = self.counts();
        &mut self.args[o + i..o + i + c]
    }
}
