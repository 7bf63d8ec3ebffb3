//! Machine model shared by the assembler, linker and emulator of the
//! toolchain: the instruction field layout, the opcode and addressing-mode
//! enums, the encode/decode helpers, sparse byte-addressed memory and the
//! emulator core itself ([`Processor`](struct.Processor.html)).

pub mod constants;

mod enums;
mod instructions;
mod memory;
mod processor;

pub use crate::enums::*;
pub use crate::instructions::*;
pub use crate::memory::Memory;
pub use crate::processor::{Processor, TickResult};

pub use util::Endian;

/// Machine word. Instructions and materialised values are all 32 bits wide.
pub type Word = u32;
