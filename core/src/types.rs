/// TCG IR value types.
///
/// Maps to QEMU's `TCGType`. AArch32 translation only needs the two
/// scalar widths; NEON is lowered to 32/64-bit chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Type {
    I32 = 0,
    I64 = 1,
}

pub const TYPE_COUNT: usize = 2;

impl Type {
    pub const fn size_bits(self) -> u32 {
        match self {
            Type::I32 => 32,
            Type::I64 => 64,
        }
    }

    pub const fn size_bytes(self) -> u32 {
        self.size_bits() / 8
    }

    /// Mask of the significant bits of a value of this type.
    pub const fn mask(self) -> u64 {
        match self {
            Type::I32 => 0xffff_ffff,
            Type::I64 => u64::MAX,
        }
    }
}

/// Comparison conditions for branch/setcond operations.
///
/// Maps to QEMU's `TCGCond`. Encoding matches QEMU for direct translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Cond {
    Never = 0,
    Always = 1,
    Eq = 8,
    Ne = 9,
    // Signed
    Lt = 10,
    Ge = 11,
    Le = 12,
    Gt = 13,
    // Unsigned
    Ltu = 14,
    Geu = 15,
    Leu = 16,
    Gtu = 17,
    // Test (AND then compare vs 0)
    TstEq = 18,
    TstNe = 19,
}

impl Cond {
    /// Return the inverted condition.
    pub const fn invert(self) -> Cond {
        match self {
            Cond::Never => Cond::Always,
            Cond::Always => Cond::Never,
            Cond::Eq => Cond::Ne,
            Cond::Ne => Cond::Eq,
            Cond::Lt => Cond::Ge,
            Cond::Ge => Cond::Lt,
            Cond::Le => Cond::Gt,
            Cond::Gt => Cond::Le,
            Cond::Ltu => Cond::Geu,
            Cond::Geu => Cond::Ltu,
            Cond::Leu => Cond::Gtu,
            Cond::Gtu => Cond::Leu,
            Cond::TstEq => Cond::TstNe,
            Cond::TstNe => Cond::TstEq,
        }
    }

    /// Swap operand order (e.g. Lt becomes Gt).
    pub const fn swap(self) -> Cond {
        match self {
            Cond::Eq
            | Cond::Ne
            | Cond::Never
            | Cond::Always
            | Cond::TstEq
            | Cond::TstNe => self,
            Cond::Lt => Cond::Gt,
            Cond::Ge => Cond::Le,
            Cond::Le => Cond::Ge,
            Cond::Gt => Cond::Lt,
            Cond::Ltu => Cond::Gtu,
            Cond::Geu => Cond::Leu,
            Cond::Leu => Cond::Geu,
            Cond::Gtu => Cond::Ltu,
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(self, Cond::Lt | Cond::Ge | Cond::Le | Cond::Gt)
    }

    pub const fn is_unsigned(self) -> bool {
        matches!(self, Cond::Ltu | Cond::Geu | Cond::Leu | Cond::Gtu)
    }

    pub const fn is_tst(self) -> bool {
        matches!(self, Cond::TstEq | Cond::TstNe)
    }

    /// Decode the raw constant-argument encoding.
    pub const fn from_raw(v: u32) -> Option<Cond> {
        Some(match v {
            0 => Cond::Never,
            1 => Cond::Always,
            8 => Cond::Eq,
            9 => Cond::Ne,
            10 => Cond::Lt,
            11 => Cond::Ge,
            12 => Cond::Le,
            13 => Cond::Gt,
            14 => Cond::Ltu,
            15 => Cond::Geu,
            16 => Cond::Leu,
            17 => Cond::Gtu,
            18 => Cond::TstEq,
            19 => Cond::TstNe,
            _ => return None,
        })
    }

    /// Evaluate the condition on two values of type `ty`.
    pub fn eval(self, ty: Type, a: u64, b: u64) -> bool {
        let (a, b) = (a & ty.mask(), b & ty.mask());
        let (sa, sb) = match ty {
            Type::I32 => (a as u32 as i32 as i64, b as u32 as i32 as i64),
            Type::I64 => (a as i64, b as i64),
        };
        match self {
            Cond::Never => false,
            Cond::Always => true,
            Cond::Eq => a == b,
            Cond::Ne => a != b,
            Cond::Lt => sa < sb,
            Cond::Ge => sa >= sb,
            Cond::Le => sa <= sb,
            Cond::Gt => sa > sb,
            Cond::Ltu => a < b,
            Cond::Geu => a >= b,
            Cond::Leu => a <= b,
            Cond::Gtu => a > b,
            Cond::TstEq => a & b == 0,
            Cond::TstNe => a & b != 0,
        }
    }
}

/// Memory operation descriptor — encodes size, signedness,
/// endianness, alignment.
///
/// Maps to QEMU's `MemOp`. Guest RAM is little-endian; `BSWAP`
/// marks a big-endian access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemOp(u16);

impl MemOp {
    pub const SIZE_8: u16 = 0;
    pub const SIZE_16: u16 = 1;
    pub const SIZE_32: u16 = 2;
    pub const SIZE_64: u16 = 3;
    pub const SIZE_MASK: u16 = 0x3;

    pub const SIGN: u16 = 1 << 2;
    pub const BSWAP: u16 = 1 << 3;
    pub const ALIGN_2: u16 = 1 << 4;
    pub const ALIGN_4: u16 = 2 << 4;
    pub const ALIGN_8: u16 = 3 << 4;
    pub const ALIGN_16: u16 = 4 << 4;
    /// Alignment equal to the access size.
    pub const ALIGN: u16 = 7 << 4;
    pub const ALIGN_MASK: u16 = 7 << 4;

    pub const fn new(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn ub() -> Self {
        Self(Self::SIZE_8)
    }
    pub const fn sb() -> Self {
        Self(Self::SIZE_8 | Self::SIGN)
    }
    pub const fn uw() -> Self {
        Self(Self::SIZE_16)
    }
    pub const fn sw() -> Self {
        Self(Self::SIZE_16 | Self::SIGN)
    }
    pub const fn ul() -> Self {
        Self(Self::SIZE_32)
    }
    pub const fn sl() -> Self {
        Self(Self::SIZE_32 | Self::SIGN)
    }
    pub const fn uq() -> Self {
        Self(Self::SIZE_64)
    }

    /// Memop for an unsigned access of `1 << size` bytes.
    pub const fn from_size(size: u32) -> Self {
        Self(size as u16 & Self::SIZE_MASK)
    }

    pub const fn with(self, bits: u16) -> Self {
        Self(self.0 | bits)
    }

    pub const fn without(self, bits: u16) -> Self {
        Self(self.0 & !bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }
    pub const fn size(self) -> u16 {
        self.0 & Self::SIZE_MASK
    }
    pub const fn is_signed(self) -> bool {
        self.0 & Self::SIGN != 0
    }
    pub const fn is_bswap(self) -> bool {
        self.0 & Self::BSWAP != 0
    }
    pub const fn size_bytes(self) -> u32 {
        1 << self.size()
    }

    /// Required address alignment in bytes (1 = unaligned allowed).
    pub const fn align_bytes(self) -> u32 {
        match (self.0 & Self::ALIGN_MASK) >> 4 {
            0 => 1,
            7 => self.size_bytes(),
            a => 1 << a,
        }
    }
}

/// Barrier kinds for `mb`, mirroring QEMU's `TCGBar`.
pub mod bar {
    pub const MO_LD_LD: u32 = 0x01;
    pub const MO_ST_LD: u32 = 0x02;
    pub const MO_LD_ST: u32 = 0x04;
    pub const MO_ST_ST: u32 = 0x08;
    pub const MO_ALL: u32 = 0x0f;
    /// Load-acquire ordering.
    pub const LDAQ: u32 = 0x10;
    /// Store-release ordering.
    pub const STRL: u32 = 0x20;
    /// Sequential consistency.
    pub const SC: u32 = 0x30;
}
