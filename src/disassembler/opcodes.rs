//! The CIL opcode table (ECMA-335 Partition III).

use std::fmt;

/// The operand that follows an opcode in the instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// No operand.
    None,
    /// 1-byte immediate or short branch offset.
    Int8,
    /// 2-byte argument or local index.
    Int16,
    /// 4-byte immediate or branch offset.
    Int32,
    /// 8-byte immediate.
    Int64,
    /// 4-byte metadata token.
    Token,
    /// 4-byte `#US` heap token of `ldstr`.
    String,
    /// `u32` count followed by that many 4-byte branch offsets.
    Switch,
}

impl OperandKind {
    /// Width in bytes; `None` for the variable-length switch table.
    #[must_use]
    pub fn size(self) -> Option<usize> {
        match self {
            OperandKind::None => Some(0),
            OperandKind::Int8 => Some(1),
            OperandKind::Int16 => Some(2),
            OperandKind::Int32 | OperandKind::Token | OperandKind::String => Some(4),
            OperandKind::Int64 => Some(8),
            OperandKind::Switch => None,
        }
    }
}

/// A one- or two-byte CIL opcode. Two-byte opcodes carry their `0xFE` prefix in the high byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpCode(pub u16);

macro_rules! opcodes {
    ($($name:ident = $value:literal, $mnemonic:literal, $operand:ident;)*) => {
        #[allow(missing_docs)]
        impl OpCode {
            $(
                pub const $name: OpCode = OpCode($value);
            )*
        }

        fn lookup(value: u16) -> Option<(&'static str, OperandKind)> {
            match value {
                $($value => Some(($mnemonic, OperandKind::$operand)),)*
                _ => None,
            }
        }
    };
}

opcodes! {
    NOP = 0x00, "nop", None;
    BREAK = 0x01, "break", None;
    LDARG_0 = 0x02, "ldarg.0", None;
    LDARG_1 = 0x03, "ldarg.1", None;
    LDARG_2 = 0x04, "ldarg.2", None;
    LDARG_3 = 0x05, "ldarg.3", None;
    LDLOC_0 = 0x06, "ldloc.0", None;
    LDLOC_1 = 0x07, "ldloc.1", None;
    LDLOC_2 = 0x08, "ldloc.2", None;
    LDLOC_3 = 0x09, "ldloc.3", None;
    STLOC_0 = 0x0A, "stloc.0", None;
    STLOC_1 = 0x0B, "stloc.1", None;
    STLOC_2 = 0x0C, "stloc.2", None;
    STLOC_3 = 0x0D, "stloc.3", None;
    LDARG_S = 0x0E, "ldarg.s", Int8;
    LDARGA_S = 0x0F, "ldarga.s", Int8;
    STARG_S = 0x10, "starg.s", Int8;
    LDLOC_S = 0x11, "ldloc.s", Int8;
    LDLOCA_S = 0x12, "ldloca.s", Int8;
    STLOC_S = 0x13, "stloc.s", Int8;
    LDNULL = 0x14, "ldnull", None;
    LDC_I4_M1 = 0x15, "ldc.i4.m1", None;
    LDC_I4_0 = 0x16, "ldc.i4.0", None;
    LDC_I4_1 = 0x17, "ldc.i4.1", None;
    LDC_I4_2 = 0x18, "ldc.i4.2", None;
    LDC_I4_3 = 0x19, "ldc.i4.3", None;
    LDC_I4_4 = 0x1A, "ldc.i4.4", None;
    LDC_I4_5 = 0x1B, "ldc.i4.5", None;
    LDC_I4_6 = 0x1C, "ldc.i4.6", None;
    LDC_I4_7 = 0x1D, "ldc.i4.7", None;
    LDC_I4_8 = 0x1E, "ldc.i4.8", None;
    LDC_I4_S = 0x1F, "ldc.i4.s", Int8;
    LDC_I4 = 0x20, "ldc.i4", Int32;
    LDC_I8 = 0x21, "ldc.i8", Int64;
    LDC_R4 = 0x22, "ldc.r4", Int32;
    LDC_R8 = 0x23, "ldc.r8", Int64;
    DUP = 0x25, "dup", None;
    POP = 0x26, "pop", None;
    JMP = 0x27, "jmp", Token;
    CALL = 0x28, "call", Token;
    CALLI = 0x29, "calli", Token;
    RET = 0x2A, "ret", None;
    BR_S = 0x2B, "br.s", Int8;
    BRFALSE_S = 0x2C, "brfalse.s", Int8;
    BRTRUE_S = 0x2D, "brtrue.s", Int8;
    BEQ_S = 0x2E, "beq.s", Int8;
    BGE_S = 0x2F, "bge.s", Int8;
    BGT_S = 0x30, "bgt.s", Int8;
    BLE_S = 0x31, "ble.s", Int8;
    BLT_S = 0x32, "blt.s", Int8;
    BNE_UN_S = 0x33, "bne.un.s", Int8;
    BGE_UN_S = 0x34, "bge.un.s", Int8;
    BGT_UN_S = 0x35, "bgt.un.s", Int8;
    BLE_UN_S = 0x36, "ble.un.s", Int8;
    BLT_UN_S = 0x37, "blt.un.s", Int8;
    BR = 0x38, "br", Int32;
    BRFALSE = 0x39, "brfalse", Int32;
    BRTRUE = 0x3A, "brtrue", Int32;
    BEQ = 0x3B, "beq", Int32;
    BGE = 0x3C, "bge", Int32;
    BGT = 0x3D, "bgt", Int32;
    BLE = 0x3E, "ble", Int32;
    BLT = 0x3F, "blt", Int32;
    BNE_UN = 0x40, "bne.un", Int32;
    BGE_UN = 0x41, "bge.un", Int32;
    BGT_UN = 0x42, "bgt.un", Int32;
    BLE_UN = 0x43, "ble.un", Int32;
    BLT_UN = 0x44, "blt.un", Int32;
    SWITCH = 0x45, "switch", Switch;
    LDIND_I1 = 0x46, "ldind.i1", None;
    LDIND_U1 = 0x47, "ldind.u1", None;
    LDIND_I2 = 0x48, "ldind.i2", None;
    LDIND_U2 = 0x49, "ldind.u2", None;
    LDIND_I4 = 0x4A, "ldind.i4", None;
    LDIND_U4 = 0x4B, "ldind.u4", None;
    LDIND_I8 = 0x4C, "ldind.i8", None;
    LDIND_I = 0x4D, "ldind.i", None;
    LDIND_R4 = 0x4E, "ldind.r4", None;
    LDIND_R8 = 0x4F, "ldind.r8", None;
    LDIND_REF = 0x50, "ldind.ref", None;
    STIND_REF = 0x51, "stind.ref", None;
    STIND_I1 = 0x52, "stind.i1", None;
    STIND_I2 = 0x53, "stind.i2", None;
    STIND_I4 = 0x54, "stind.i4", None;
    STIND_I8 = 0x55, "stind.i8", None;
    STIND_R4 = 0x56, "stind.r4", None;
    STIND_R8 = 0x57, "stind.r8", None;
    ADD = 0x58, "add", None;
    SUB = 0x59, "sub", None;
    MUL = 0x5A, "mul", None;
    DIV = 0x5B, "div", None;
    DIV_UN = 0x5C, "div.un", None;
    REM = 0x5D, "rem", None;
    REM_UN = 0x5E, "rem.un", None;
    AND = 0x5F, "and", None;
    OR = 0x60, "or", None;
    XOR = 0x61, "xor", None;
    SHL = 0x62, "shl", None;
    SHR = 0x63, "shr", None;
    SHR_UN = 0x64, "shr.un", None;
    NEG = 0x65, "neg", None;
    NOT = 0x66, "not", None;
    CONV_I1 = 0x67, "conv.i1", None;
    CONV_I2 = 0x68, "conv.i2", None;
    CONV_I4 = 0x69, "conv.i4", None;
    CONV_I8 = 0x6A, "conv.i8", None;
    CONV_R4 = 0x6B, "conv.r4", None;
    CONV_R8 = 0x6C, "conv.r8", None;
    CONV_U4 = 0x6D, "conv.u4", None;
    CONV_U8 = 0x6E, "conv.u8", None;
    CALLVIRT = 0x6F, "callvirt", Token;
    CPOBJ = 0x70, "cpobj", Token;
    LDOBJ = 0x71, "ldobj", Token;
    LDSTR = 0x72, "ldstr", String;
    NEWOBJ = 0x73, "newobj", Token;
    CASTCLASS = 0x74, "castclass", Token;
    ISINST = 0x75, "isinst", Token;
    CONV_R_UN = 0x76, "conv.r.un", None;
    UNBOX = 0x79, "unbox", Token;
    THROW = 0x7A, "throw", None;
    LDFLD = 0x7B, "ldfld", Token;
    LDFLDA = 0x7C, "ldflda", Token;
    STFLD = 0x7D, "stfld", Token;
    LDSFLD = 0x7E, "ldsfld", Token;
    LDSFLDA = 0x7F, "ldsflda", Token;
    STSFLD = 0x80, "stsfld", Token;
    STOBJ = 0x81, "stobj", Token;
    CONV_OVF_I1_UN = 0x82, "conv.ovf.i1.un", None;
    CONV_OVF_I2_UN = 0x83, "conv.ovf.i2.un", None;
    CONV_OVF_I4_UN = 0x84, "conv.ovf.i4.un", None;
    CONV_OVF_I8_UN = 0x85, "conv.ovf.i8.un", None;
    CONV_OVF_U1_UN = 0x86, "conv.ovf.u1.un", None;
    CONV_OVF_U2_UN = 0x87, "conv.ovf.u2.un", None;
    CONV_OVF_U4_UN = 0x88, "conv.ovf.u4.un", None;
    CONV_OVF_U8_UN = 0x89, "conv.ovf.u8.un", None;
    CONV_OVF_I_UN = 0x8A, "conv.ovf.i.un", None;
    CONV_OVF_U_UN = 0x8B, "conv.ovf.u.un", None;
    BOX = 0x8C, "box", Token;
    NEWARR = 0x8D, "newarr", Token;
    LDLEN = 0x8E, "ldlen", None;
    LDELEMA = 0x8F, "ldelema", Token;
    LDELEM_I1 = 0x90, "ldelem.i1", None;
    LDELEM_U1 = 0x91, "ldelem.u1", None;
    LDELEM_I2 = 0x92, "ldelem.i2", None;
    LDELEM_U2 = 0x93, "ldelem.u2", None;
    LDELEM_I4 = 0x94, "ldelem.i4", None;
    LDELEM_U4 = 0x95, "ldelem.u4", None;
    LDELEM_I8 = 0x96, "ldelem.i8", None;
    LDELEM_I = 0x97, "ldelem.i", None;
    LDELEM_R4 = 0x98, "ldelem.r4", None;
    LDELEM_R8 = 0x99, "ldelem.r8", None;
    LDELEM_REF = 0x9A, "ldelem.ref", None;
    STELEM_I = 0x9B, "stelem.i", None;
    STELEM_I1 = 0x9C, "stelem.i1", None;
    STELEM_I2 = 0x9D, "stelem.i2", None;
    STELEM_I4 = 0x9E, "stelem.i4", None;
    STELEM_I8 = 0x9F, "stelem.i8", None;
    STELEM_R4 = 0xA0, "stelem.r4", None;
    STELEM_R8 = 0xA1, "stelem.r8", None;
    STELEM_REF = 0xA2, "stelem.ref", None;
    LDELEM = 0xA3, "ldelem", Token;
    STELEM = 0xA4, "stelem", Token;
    UNBOX_ANY = 0xA5, "unbox.any", Token;
    CONV_OVF_I1 = 0xB3, "conv.ovf.i1", None;
    CONV_OVF_U1 = 0xB4, "conv.ovf.u1", None;
    CONV_OVF_I2 = 0xB5, "conv.ovf.i2", None;
    CONV_OVF_U2 = 0xB6, "conv.ovf.u2", None;
    CONV_OVF_I4 = 0xB7, "conv.ovf.i4", None;
    CONV_OVF_U4 = 0xB8, "conv.ovf.u4", None;
    CONV_OVF_I8 = 0xB9, "conv.ovf.i8", None;
    CONV_OVF_U8 = 0xBA, "conv.ovf.u8", None;
    REFANYVAL = 0xC2, "refanyval", Token;
    CKFINITE = 0xC3, "ckfinite", None;
    MKREFANY = 0xC6, "mkrefany", Token;
    LDTOKEN = 0xD0, "ldtoken", Token;
    CONV_U2 = 0xD1, "conv.u2", None;
    CONV_U1 = 0xD2, "conv.u1", None;
    CONV_I = 0xD3, "conv.i", None;
    CONV_OVF_I = 0xD4, "conv.ovf.i", None;
    CONV_OVF_U = 0xD5, "conv.ovf.u", None;
    ADD_OVF = 0xD6, "add.ovf", None;
    ADD_OVF_UN = 0xD7, "add.ovf.un", None;
    MUL_OVF = 0xD8, "mul.ovf", None;
    MUL_OVF_UN = 0xD9, "mul.ovf.un", None;
    SUB_OVF = 0xDA, "sub.ovf", None;
    SUB_OVF_UN = 0xDB, "sub.ovf.un", None;
    ENDFINALLY = 0xDC, "endfinally", None;
    LEAVE = 0xDD, "leave", Int32;
    LEAVE_S = 0xDE, "leave.s", Int8;
    STIND_I = 0xDF, "stind.i", None;
    CONV_U = 0xE0, "conv.u", None;
    ARGLIST = 0xFE00, "arglist", None;
    CEQ = 0xFE01, "ceq", None;
    CGT = 0xFE02, "cgt", None;
    CGT_UN = 0xFE03, "cgt.un", None;
    CLT = 0xFE04, "clt", None;
    CLT_UN = 0xFE05, "clt.un", None;
    LDFTN = 0xFE06, "ldftn", Token;
    LDVIRTFTN = 0xFE07, "ldvirtftn", Token;
    LDARG = 0xFE09, "ldarg", Int16;
    LDARGA = 0xFE0A, "ldarga", Int16;
    STARG = 0xFE0B, "starg", Int16;
    LDLOC = 0xFE0C, "ldloc", Int16;
    LDLOCA = 0xFE0D, "ldloca", Int16;
    STLOC = 0xFE0E, "stloc", Int16;
    LOCALLOC = 0xFE0F, "localloc", None;
    ENDFILTER = 0xFE11, "endfilter", None;
    UNALIGNED = 0xFE12, "unaligned.", Int8;
    VOLATILE = 0xFE13, "volatile.", None;
    TAIL = 0xFE14, "tail.", None;
    INITOBJ = 0xFE15, "initobj", Token;
    CONSTRAINED = 0xFE16, "constrained.", Token;
    CPBLK = 0xFE17, "cpblk", None;
    INITBLK = 0xFE18, "initblk", None;
    NO = 0xFE19, "no.", Int8;
    RETHROW = 0xFE1A, "rethrow", None;
    SIZEOF = 0xFE1C, "sizeof", Token;
    REFANYTYPE = 0xFE1D, "refanytype", None;
    READONLY = 0xFE1E, "readonly.", None;
}

impl OpCode {
    /// The assembler name, e.g. `ldsfld`; `None` for byte values that are not opcodes.
    #[must_use]
    pub fn mnemonic(self) -> Option<&'static str> {
        lookup(self.0).map(|(mnemonic, _)| mnemonic)
    }

    /// The operand kind; `None` for unknown opcodes.
    #[must_use]
    pub fn operand(self) -> Option<OperandKind> {
        lookup(self.0).map(|(_, operand)| operand)
    }

    /// Returns `true` if the operand is a metadata token worth reporting.
    #[must_use]
    pub fn carries_token(self) -> bool {
        self.operand() == Some(OperandKind::Token)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mnemonic() {
            Some(mnemonic) => f.write_str(mnemonic),
            None => write!(f, "0x{:04x}", self.0),
        }
    }
}

/// Width of the fixed-size operand of `opcode`: 0, 1, 2, 4 or 8.
///
/// `None` for unknown opcodes and for `switch`, whose operand is variable-length.
#[must_use]
pub fn operand_size(opcode: OpCode) -> Option<usize> {
    opcode.operand().and_then(OperandKind::size)
}
