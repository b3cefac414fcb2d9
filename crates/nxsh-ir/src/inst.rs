//! Instruction tags — a base opcode plus type modifier bits.

/// The base opcode of an operation, stored in the low 16 bits of the
/// packed tag.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[repr(u16)]
pub enum Opcode {
    Add = 1,
    AtomicAdd,
    AtomicAnd,
    AtomicCompareAndSwap,
    AtomicMaxS32,
    AtomicMaxU32,
    AtomicMinS32,
    AtomicMinU32,
    AtomicOr,
    AtomicSwap,
    AtomicXor,
    BitwiseAnd,
    BitwiseExclusiveOr,
    BitwiseOr,
    Branch,
    BranchIfFalse,
    BranchIfTrue,
    Call,
    CompareEqual,
    CompareGreater,
    CompareGreaterOrEqual,
    CompareGreaterOrEqualU32,
    CompareGreaterU32,
    CompareLess,
    CompareLessOrEqual,
    CompareLessOrEqualU32,
    CompareLessU32,
    CompareNotEqual,
    ConditionalSelect,
    ConvertFP32ToS32,
    ConvertFP32ToU32,
    ConvertS32ToFP32,
    ConvertU32ToFP32,
    Copy,
    Ddx,
    Ddy,
    Divide,
    ImageAtomic,
    LoadConstant,
    LoadGlobal,
    LoadStorage,
    MemoryBarrier,
    Multiply,
    Negate,
    PackHalf2x16,
    Return,
    ShiftLeft,
    ShiftRightS32,
    ShiftRightU32,
    ShuffleXor,
    StoreGlobal,
    StoreStorage,
    Subtract,
    SwizzleAdd,
    TextureSample,
    UnpackHalf2x16,
}

impl Opcode {
    /// Returns `true` for operations with observable side effects.
    ///
    /// Such nodes are never removed, even when every destination is dead.
    pub fn has_side_effects(self) -> bool {
        matches!(
            self,
            Self::AtomicAdd
                | Self::AtomicAnd
                | Self::AtomicCompareAndSwap
                | Self::AtomicMaxS32
                | Self::AtomicMaxU32
                | Self::AtomicMinS32
                | Self::AtomicMinU32
                | Self::AtomicOr
                | Self::AtomicSwap
                | Self::AtomicXor
                | Self::Call
                | Self::ImageAtomic
        )
    }

    /// Returns `true` for block terminators.
    pub fn is_branch(self) -> bool {
        matches!(self, Self::Branch | Self::BranchIfFalse | Self::BranchIfTrue)
    }

    /// Returns `true` for texture accesses.
    pub fn is_texture(self) -> bool {
        matches!(self, Self::TextureSample)
    }
}

/// Type modifier bits, occupying the high half of the packed tag.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct TypeFlags(u32);

impl TypeFlags {
    /// Integer-typed operation (no modifier bits).
    pub const EMPTY: Self = Self(0);
    /// 32-bit floating point.
    pub const FP32: Self = Self(1 << 16);
    /// 64-bit floating point.
    pub const FP64: Self = Self(1 << 17);

    /// Raw bit representation, already shifted into the high half.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if `self` contains all flags in `other`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for TypeFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A packed instruction tag: base [`Opcode`] plus [`TypeFlags`].
///
/// The 32-bit encoding returned by [`raw`](Self::raw) keeps the opcode in
/// the low bits; classify independent of typing with `raw() & MASK`.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct Instruction {
    op: Opcode,
    ty: TypeFlags,
}

impl Instruction {
    /// Mask selecting the base opcode from a packed tag.
    pub const MASK: u32 = 0xffff;

    /// An integer-typed instruction.
    pub const fn new(op: Opcode) -> Self {
        Self {
            op,
            ty: TypeFlags::EMPTY,
        }
    }

    /// An FP32-typed instruction.
    pub const fn fp32(op: Opcode) -> Self {
        Self {
            op,
            ty: TypeFlags::FP32,
        }
    }

    /// An FP64-typed instruction.
    pub const fn fp64(op: Opcode) -> Self {
        Self {
            op,
            ty: TypeFlags::FP64,
        }
    }

    /// The base opcode.
    pub fn opcode(self) -> Opcode {
        self.op
    }

    /// The type modifier bits.
    pub fn type_flags(self) -> TypeFlags {
        self.ty
    }

    /// Returns `true` if the base opcode is `op`, ignoring type modifiers.
    pub fn is(self, op: Opcode) -> bool {
        self.op == op
    }

    /// Returns `true` for floating-point typed instructions of any width.
    pub fn is_fp(self) -> bool {
        self.ty.contains(TypeFlags::FP32) || self.ty.contains(TypeFlags::FP64)
    }

    /// Returns `true` for FP32-typed instructions.
    pub fn is_fp32(self) -> bool {
        self.ty.contains(TypeFlags::FP32)
    }

    /// The packed 32-bit tag: `opcode | type bits`.
    pub fn raw(self) -> u32 {
        self.op as u32 | self.ty.bits()
    }
}

impl From<Opcode> for Instruction {
    fn from(op: Opcode) -> Self {
        Self::new(op)
    }
}

/// Modifier bits of a texture access.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct TextureFlags(u32);

impl TextureFlags {
    /// Plain access against a fixed binding.
    pub const NONE: Self = Self(0);
    /// The handle is supplied as a runtime value in source 0.
    pub const BINDLESS: Self = Self(1);
    /// The access indexes a fixed binding table with source 0.
    pub const INDEXED: Self = Self(2);

    /// Returns `true` if `self` contains all flags in `other`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `self` with the flags in `other` cleared.
    pub fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl std::ops::BitOr for TextureFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for TextureFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}
