use bitflags::bitflags;

use crate::types::Type;

/// IR opcodes. Integer ops are type-polymorphic: one opcode serves
/// both I32 and I64, with the width carried in `Op::op_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // Moves and conditional selects.
    Mov = 0,
    SetCond,
    NegSetCond,
    MovCond,

    Add,
    Sub,
    Mul,
    Neg,
    MulS2, // signed double-width product
    MulU2, // unsigned double-width product

    // Carry chain. `*CO` writes the carry register, `*CI` consumes it;
    // ARM ADC/SBC and 64-bit accumulates are built from these.
    AddCO,
    AddCI,
    SubBO,
    SubBI,

    And,
    Or,
    Xor,
    Not,
    AndC, // a & !b
    OrC, // a | !b

    // Shifts take the count modulo the width.
    Shl,
    Shr,
    Sar,
    RotL,
    RotR,

    // Bit fields: `extract(src, ofs, len)`, `deposit(base, val, ofs, len)`.
    Extract,
    SExtract,
    Deposit,

    Bswap16,
    Bswap32,
    Clz,

    // Fixed-width conversions between I32 and I64.
    ExtI32I64,
    ExtUI32I64,
    ExtrlI64I32,
    ExtrhI64I32,

    // Loads and stores relative to a host pointer (the CPU env).
    Ld8U,
    Ld8S,
    Ld16U,
    Ld16S,
    Ld32U,
    Ld32S,
    Ld,
    St8,
    St16,
    St32,
    St,

    // Guest memory: the `MemOp` and mmu index travel as constants.
    QemuLd,
    QemuSt,
    AtomicCmpXchg, // returns the old value
    AtomicXchg,

    // Control flow.
    Br,
    BrCond,
    SetLabel,
    GotoTb, // chainable direct jump
    ExitTb, // back to the exec loop with a value
    LookupAndGotoPtr, // indirect jump keyed on the env PC
    Mb,

    // Helper call: `param1` inputs, `param2` outputs.
    Call,

    Nop,
    Discard,
    InsnStart, // guest pc, condexec and syndrome words

    /// Number of opcodes; not an op.
    Count,
}

bitflags! {
    /// Static properties of an opcode (QEMU `TCG_OPF_*`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpFlags: u16 {
        /// Leaves the translation block.
        const BB_EXIT = 0x01;
        /// The next op starts a new basic block.
        const BB_END = 0x02;
        /// Leaves generated code (helper call or guest memory access).
        const CALL_CLOBBER = 0x04;
        /// Never dead, even when its outputs are unused.
        const SIDE_EFFECTS = 0x08;
        /// Works on I32 or I64.
        const INT = 0x10;
        const COND_BRANCH = 0x80;
        /// Writes the carry register.
        const CARRY_OUT = 0x100;
        /// Reads the carry register.
        const CARRY_IN = 0x200;
    }
}

/// Argument layout and flags of one opcode.
///
/// `Call` takes its in/out counts from the op (`param1`/`param2`).
#[derive(Debug, Clone, Copy)]
pub struct OpDef {
    pub name: &'static str,
    pub nb_oargs: u8,
    pub nb_iargs: u8,
    pub nb_cargs: u8,
    pub flags: OpFlags,
}

impl OpDef {
    pub const fn nb_args(&self) -> u8 {
        self.nb_oargs + self.nb_iargs + self.nb_cargs
    }
}

const fn def(name: &'static str, o: u8, i: u8, c: u8, flags: OpFlags) -> OpDef {
    OpDef {
        name,
        nb_oargs: o,
        nb_iargs: i,
        nb_cargs: c,
        flags,
    }
}

const NONE: OpFlags = OpFlags::empty();
const INT: OpFlags = OpFlags::INT;
const BB_END: OpFlags = OpFlags::BB_END;
const SIDE_EFFECTS: OpFlags = OpFlags::SIDE_EFFECTS;
const INT_CO: OpFlags = INT.union(OpFlags::CARRY_OUT);
const INT_CI: OpFlags = INT.union(OpFlags::CARRY_IN);
const GUEST_MEM: OpFlags = INT.union(OpFlags::CALL_CLOBBER).union(SIDE_EFFECTS);
const BRCOND: OpFlags = INT.union(BB_END).union(OpFlags::COND_BRANCH);
const TB_END: OpFlags = BB_END.union(OpFlags::BB_EXIT);
const CALL: OpFlags = OpFlags::CALL_CLOBBER.union(SIDE_EFFECTS);

/// Indexed by `Opcode as usize`; counts are (outputs, inputs, constants).
pub static OPCODE_DEFS: [OpDef; Opcode::Count as usize] = [
    /* Mov              */ def("mov", 1, 1, 0, INT),
    /* SetCond          */ def("setcond", 1, 2, 1, INT),
    /* NegSetCond       */ def("negsetcond", 1, 2, 1, INT),
    /* MovCond          */ def("movcond", 1, 4, 1, INT),
    /* Add              */ def("add", 1, 2, 0, INT),
    /* Sub              */ def("sub", 1, 2, 0, INT),
    /* Mul              */ def("mul", 1, 2, 0, INT),
    /* Neg              */ def("neg", 1, 1, 0, INT),
    /* MulS2            */ def("muls2", 2, 2, 0, INT),
    /* MulU2            */ def("mulu2", 2, 2, 0, INT),
    /* AddCO            */ def("addco", 1, 2, 0, INT_CO),
    /* AddCI            */ def("addci", 1, 2, 0, INT_CI),
    /* SubBO            */ def("subbo", 1, 2, 0, INT_CO),
    /* SubBI            */ def("subbi", 1, 2, 0, INT_CI),
    /* And              */ def("and", 1, 2, 0, INT),
    /* Or               */ def("or", 1, 2, 0, INT),
    /* Xor              */ def("xor", 1, 2, 0, INT),
    /* Not              */ def("not", 1, 1, 0, INT),
    /* AndC             */ def("andc", 1, 2, 0, INT),
    /* OrC              */ def("orc", 1, 2, 0, INT),
    /* Shl              */ def("shl", 1, 2, 0, INT),
    /* Shr              */ def("shr", 1, 2, 0, INT),
    /* Sar              */ def("sar", 1, 2, 0, INT),
    /* RotL             */ def("rotl", 1, 2, 0, INT),
    /* RotR             */ def("rotr", 1, 2, 0, INT),
    /* Extract          */ def("extract", 1, 1, 2, INT),
    /* SExtract         */ def("sextract", 1, 1, 2, INT),
    /* Deposit          */ def("deposit", 1, 2, 2, INT),
    /* Bswap16          */ def("bswap16", 1, 1, 1, INT),
    /* Bswap32          */ def("bswap32", 1, 1, 1, INT),
    /* Clz              */ def("clz", 1, 2, 0, INT),
    /* ExtI32I64        */ def("ext_i32_i64", 1, 1, 0, NONE),
    /* ExtUI32I64       */ def("extu_i32_i64", 1, 1, 0, NONE),
    /* ExtrlI64I32      */ def("extrl_i64_i32", 1, 1, 0, NONE),
    /* ExtrhI64I32      */ def("extrh_i64_i32", 1, 1, 0, NONE),
    /* Ld8U             */ def("ld8u", 1, 1, 1, INT),
    /* Ld8S             */ def("ld8s", 1, 1, 1, INT),
    /* Ld16U            */ def("ld16u", 1, 1, 1, INT),
    /* Ld16S            */ def("ld16s", 1, 1, 1, INT),
    /* Ld32U            */ def("ld32u", 1, 1, 1, INT),
    /* Ld32S            */ def("ld32s", 1, 1, 1, INT),
    /* Ld               */ def("ld", 1, 1, 1, INT),
    /* St8              */ def("st8", 0, 2, 1, INT),
    /* St16             */ def("st16", 0, 2, 1, INT),
    /* St32             */ def("st32", 0, 2, 1, INT),
    /* St               */ def("st", 0, 2, 1, INT),
    /* QemuLd           */ def("qemu_ld", 1, 1, 2, GUEST_MEM),
    /* QemuSt           */ def("qemu_st", 0, 2, 2, GUEST_MEM),
    /* AtomicCmpXchg    */ def("atomic_cmpxchg", 1, 3, 2, GUEST_MEM),
    /* AtomicXchg       */ def("atomic_xchg", 1, 2, 2, GUEST_MEM),
    /* Br               */ def("br", 0, 0, 1, BB_END),
    /* BrCond           */ def("brcond", 0, 2, 2, BRCOND),
    /* SetLabel         */ def("set_label", 0, 0, 1, BB_END),
    /* GotoTb           */ def("goto_tb", 0, 0, 1, TB_END),
    /* ExitTb           */ def("exit_tb", 0, 0, 1, TB_END),
    /* LookupAndGotoPtr */ def("lookup_and_goto_ptr", 0, 0, 0, TB_END),
    /* Mb               */ def("mb", 0, 0, 1, SIDE_EFFECTS),
    /* Call             */ def("call", 0, 0, 1, CALL),
    /* Nop              */ def("nop", 0, 0, 0, NONE),
    /* Discard          */ def("discard", 1, 0, 0, NONE),
    /* InsnStart        */ def("insn_start", 0, 0, 3, NONE),
];

impl Opcode {
    pub fn def(self) -> &'static OpDef {
        &OPCODE_DEFS[self as usize]
    }

    /// The width of an op that is not type-polymorphic.
    pub fn fixed_type(self) -> Option<Type> {
        match self {
            Opcode::ExtI32I64 | Opcode::ExtUI32I64 => Some(Type::I64),
            Opcode::ExtrlI64I32 | Opcode::ExtrhI64I32 => Some(Type::I32),
            _ => None,
        }
    }

    pub fn is_int_polymorphic(self) -> bool {
        self.def().flags.contains(OpFlags::INT)
    }

    /// Whether this op ends the translation block.
    pub fn is_tb_exit(self) -> bool {
        self.def().flags.contains(OpFlags::BB_EXIT)
    }

    /// Whether this op reads or writes the carry register.
    pub fn uses_carry(self) -> bool {
        self.def()
            .flags
            .intersects(OpFlags::CARRY_IN.union(OpFlags::CARRY_OUT))
    }
}
