use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::ToPrimitive;
use util::EnumFromStr;
use util_derive::EnumFromStr;

// Instruction format, one nibble per field except the displacement:
//
//          +------+------+-----+-----+-----+------------+
//          |31    |      |     |     |     |           0|
//          +------+------+-----+-----+-----+------------+
//          |  OC  | MOD  |  A  |  B  |  C  |     D      |
//          +------+------+-----+-----+-----+------------+
//
// D is a signed 12-bit displacement, sign-extended to 32 bits before use.
// The four instruction bytes are stored in the order written above, most
// significant byte first; 32-bit *data* words are little-endian.

/// High nibble of the first instruction byte: the instruction family.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum OpClass {
    //  Family | MOD meaning
    //---------+------------------------------------------------------------
    HALT, //   | ignored; stops the machine
    INT,  //   | ignored; raises the software interrupt
    CALL, //   | see `CallMode`
    JUMP, //   | see `JumpMode`
    XCHG, //   | ignored; swaps GPR[B] and GPR[C]
    ARIT, //   | see `AritOp`: GPR[A] = GPR[B] op GPR[C]
    LOG,  //   | see `LogOp`:  GPR[A] = GPR[B] op GPR[C] (NOT uses B only)
    SH,   //   | see `ShOp`:   GPR[A] = GPR[B] shifted by GPR[C]
    ST,   //   | see `StMode`
    LD,   //   | see `LdMode`
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum CallMode {
    DIR, // push pc; pc = GPR[A] + GPR[B] + D
    IND, // push pc; pc = mem[GPR[A] + GPR[B] + D]
}

/// Jump modes. The upper half (`*I`) reads the target out of memory instead
/// of jumping to the computed address itself.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum JumpMode {
    JMP, //  pc = GPR[A] + D
    JEQ, //  if GPR[B] == GPR[C]: pc = GPR[A] + D
    JNE, //  if GPR[B] != GPR[C]: pc = GPR[A] + D
    JGT, //  if GPR[B] >  GPR[C] (signed): pc = GPR[A] + D
    JMPI = 8, // pc = mem[GPR[A] + D]
    JEQI,     // if GPR[B] == GPR[C]: pc = mem[GPR[A] + D]
    JNEI,     // if GPR[B] != GPR[C]: pc = mem[GPR[A] + D]
    JGTI,     // if GPR[B] >  GPR[C] (signed): pc = mem[GPR[A] + D]
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive, EnumFromStr)]
pub enum AritOp {
    ADD,
    SUB,
    MUL,
    DIV,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive, EnumFromStr)]
pub enum LogOp {
    NOT, // GPR[A] = ~GPR[B]
    AND,
    OR,
    XOR,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive, EnumFromStr)]
pub enum ShOp {
    SHL,
    SHR,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum StMode {
    DIR,  // mem[GPR[A] + GPR[B] + D] = GPR[C]
    PUSH, // GPR[A] += D; mem[GPR[A]] = GPR[C]
    IND,  // mem[mem[GPR[A] + GPR[B] + D]] = GPR[C]
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum LdMode {
    GPRCSR, // GPR[A] = CSR[B]
    GPRGPR, // GPR[A] = GPR[B] + D
    GPRMEM, // GPR[A] = mem[GPR[B] + GPR[C] + D]
    GPRPOP, // GPR[A] = mem[GPR[B]]; GPR[B] += D
    CSRGPR, // CSR[A] = GPR[B]
    CSRCSR, // CSR[A] = CSR[B] + D
    CSRMEM, // CSR[A] = mem[GPR[B] + GPR[C] + D]
    CSRPOP, // CSR[A] = mem[GPR[B]]; GPR[B] += D
}

/// Control and status registers.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive, EnumFromStr)]
pub enum Csr {
    STATUS,
    HANDLER,
    CAUSE,
}

#[inline]
pub fn enum_to_u32<T: ToPrimitive + Copy>(val: T) -> u32 {
    val.to_u32().unwrap()
}

macro_rules! impl_enum_display {
    ($e:ty) => {
        impl std::fmt::Display for $e {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                std::fmt::Debug::fmt(self, f)
            }
        }
    };
}

impl_enum_display!(OpClass);
impl_enum_display!(AritOp);
impl_enum_display!(LogOp);
impl_enum_display!(ShOp);
impl_enum_display!(Csr);
