use crate::constants;
use crate::enums::*;

/// Packs one instruction into its four bytes, first byte first.
///
/// The nibble layout is `[OC|MOD] [A|B] [C|Dhi] [Dlo]`; the displacement is
/// truncated to its low 12 bits.
#[inline]
pub fn pack(oc: OpClass, modifier: u8, a: u8, b: u8, c: u8, disp: i32) -> [u8; 4] {
    [
        (((enum_to_u32(oc) as u8) << 4) & 0xF0) | (modifier & 0x0F),
        ((a << 4) & 0xF0) | (b & 0x0F),
        ((c << 4) & 0xF0) | (((disp >> 8) as u8) & 0x0F),
        disp as u8,
    ]
}

#[inline]
pub fn make_halt() -> [u8; 4] {
    pack(OpClass::HALT, 0, 0, 0, 0, 0)
}

#[inline]
pub fn make_int() -> [u8; 4] {
    pack(OpClass::INT, 0, 0, 0, 0, 0)
}

#[inline]
pub fn make_call(mode: CallMode, a: u8, b: u8, disp: i32) -> [u8; 4] {
    pack(OpClass::CALL, enum_to_u32(mode) as u8, a, b, 0, disp)
}

#[inline]
pub fn make_jump(mode: JumpMode, a: u8, b: u8, c: u8, disp: i32) -> [u8; 4] {
    pack(OpClass::JUMP, enum_to_u32(mode) as u8, a, b, c, disp)
}

#[inline]
pub fn make_xchg(b: u8, c: u8) -> [u8; 4] {
    pack(OpClass::XCHG, 0, 0, b, c, 0)
}

#[inline]
pub fn make_arit(op: AritOp, a: u8, b: u8, c: u8) -> [u8; 4] {
    pack(OpClass::ARIT, enum_to_u32(op) as u8, a, b, c, 0)
}

#[inline]
pub fn make_log(op: LogOp, a: u8, b: u8, c: u8) -> [u8; 4] {
    pack(OpClass::LOG, enum_to_u32(op) as u8, a, b, c, 0)
}

#[inline]
pub fn make_sh(op: ShOp, a: u8, b: u8, c: u8) -> [u8; 4] {
    pack(OpClass::SH, enum_to_u32(op) as u8, a, b, c, 0)
}

#[inline]
pub fn make_st(mode: StMode, a: u8, b: u8, c: u8, disp: i32) -> [u8; 4] {
    pack(OpClass::ST, enum_to_u32(mode) as u8, a, b, c, disp)
}

#[inline]
pub fn make_ld(mode: LdMode, a: u8, b: u8, c: u8, disp: i32) -> [u8; 4] {
    pack(OpClass::LD, enum_to_u32(mode) as u8, a, b, c, disp)
}

/// Field view of one fetched instruction. `disp` is already sign-extended;
/// it is kept as `u32` so address arithmetic can wrap.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Fields {
    pub modifier: u8,
    pub a: usize,
    pub b: usize,
    pub c: usize,
    pub disp: u32,
}

pub fn decode_fields(bytes: [u8; 4]) -> Fields {
    let mut disp = ((u32::from(bytes[2]) << 8) & 0xF00) | u32::from(bytes[3]);

    if disp & constants::DISP_SIGN_MASK != 0 {
        disp |= constants::DISP_EXTENSION;
    }

    Fields {
        modifier: bytes[0] & 0x0F,
        a: (bytes[1] >> 4) as usize,
        b: (bytes[1] & 0x0F) as usize,
        c: (bytes[2] >> 4) as usize,
        disp,
    }
}

/// Extracts the instruction family from a fetched instruction, or `None` for
/// an unassigned opcode nibble.
pub fn op_class(bytes: [u8; 4]) -> Option<OpClass> {
    num_traits::FromPrimitive::from_u32(u32::from(bytes[0] >> 4))
}
