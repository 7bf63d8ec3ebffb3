use num_traits::FromPrimitive;

use super::{Processor, TickResult};
use crate::constants;
use crate::enums::*;
use crate::instructions::{decode_fields, op_class, Fields};

impl Processor {
    /// Fetches, decodes and executes one instruction.
    ///
    /// Any instruction with an unassigned opcode nibble or modifier enters the
    /// software-interrupt path instead of stopping the machine.
    pub fn tick(&mut self) -> TickResult {
        let pc = self.gpr[constants::PC];
        let bytes = [
            self.memory().read_byte(pc),
            self.memory().read_byte(pc.wrapping_add(1)),
            self.memory().read_byte(pc.wrapping_add(2)),
            self.memory().read_byte(pc.wrapping_add(3)),
        ];
        self.gpr[constants::PC] = pc.wrapping_add(constants::WORD_BYTES);

        let fields = decode_fields(bytes);

        match op_class(bytes) {
            Some(OpClass::HALT) => return TickResult::Halt,
            Some(OpClass::INT) => self.interrupt(constants::CAUSE_SOFTWARE_INTERRUPT),
            Some(OpClass::CALL) => self.exec_call(fields),
            Some(OpClass::JUMP) => self.exec_jump(fields),
            Some(OpClass::XCHG) => self.exec_xchg(fields),
            Some(OpClass::ARIT) => self.exec_arit(fields),
            Some(OpClass::LOG) => self.exec_log(fields),
            Some(OpClass::SH) => self.exec_sh(fields),
            Some(OpClass::ST) => self.exec_st(fields),
            Some(OpClass::LD) => self.exec_ld(fields),
            None => self.interrupt(constants::CAUSE_INVALID_INSTRUCTION),
        }

        TickResult::Next
    }

    /// Trap entry: save pc and status on the stack, record the cause, mask
    /// further interrupts and transfer to the handler.
    fn interrupt(&mut self, cause: u32) {
        self.push(self.gpr[constants::PC]);
        self.push(self.csr[Csr::STATUS as usize]);
        self.csr[Csr::CAUSE as usize] = cause;
        self.csr[Csr::STATUS as usize] &= !constants::STATUS_INTERRUPT_MASK;
        self.gpr[constants::PC] = self.csr[Csr::HANDLER as usize];
    }

    fn exec_call(&mut self, f: Fields) {
        self.push(self.gpr[constants::PC]);

        let address = self.gpr[f.a].wrapping_add(self.gpr[f.b]).wrapping_add(f.disp);
        match CallMode::from_u32(u32::from(f.modifier)) {
            Some(CallMode::DIR) => self.gpr[constants::PC] = address,
            Some(CallMode::IND) => self.gpr[constants::PC] = self.memory().read_word(address),
            None => self.interrupt(constants::CAUSE_INVALID_INSTRUCTION),
        }
    }

    fn exec_jump(&mut self, f: Fields) {
        let address = self.gpr[f.a].wrapping_add(f.disp);
        let taken = |mode: JumpMode, b: u32, c: u32| match mode {
            JumpMode::JMP | JumpMode::JMPI => true,
            JumpMode::JEQ | JumpMode::JEQI => b == c,
            JumpMode::JNE | JumpMode::JNEI => b != c,
            JumpMode::JGT | JumpMode::JGTI => (b as i32) > (c as i32),
        };

        match JumpMode::from_u32(u32::from(f.modifier)) {
            Some(mode) => {
                if taken(mode, self.gpr[f.b], self.gpr[f.c]) {
                    self.gpr[constants::PC] = match mode {
                        JumpMode::JMP | JumpMode::JEQ | JumpMode::JNE | JumpMode::JGT => address,
                        _ => self.memory().read_word(address),
                    };
                }
            }
            None => self.interrupt(constants::CAUSE_INVALID_INSTRUCTION),
        }
    }

    fn exec_xchg(&mut self, f: Fields) {
        let temp = self.gpr[f.b];
        let other = self.gpr[f.c];
        self.set_gpr(f.b, other);
        self.set_gpr(f.c, temp);
    }

    fn exec_arit(&mut self, f: Fields) {
        let b = self.gpr[f.b];
        let c = self.gpr[f.c];

        match AritOp::from_u32(u32::from(f.modifier)) {
            Some(AritOp::ADD) => self.set_gpr(f.a, b.wrapping_add(c)),
            Some(AritOp::SUB) => self.set_gpr(f.a, b.wrapping_sub(c)),
            Some(AritOp::MUL) => self.set_gpr(f.a, b.wrapping_mul(c)),
            Some(AritOp::DIV) => {
                if c == 0 {
                    self.interrupt(constants::CAUSE_INVALID_INSTRUCTION);
                } else {
                    self.set_gpr(f.a, b / c);
                }
            }
            None => self.interrupt(constants::CAUSE_INVALID_INSTRUCTION),
        }
    }

    fn exec_log(&mut self, f: Fields) {
        let b = self.gpr[f.b];
        let c = self.gpr[f.c];

        match LogOp::from_u32(u32::from(f.modifier)) {
            Some(LogOp::NOT) => self.set_gpr(f.a, !b),
            Some(LogOp::AND) => self.set_gpr(f.a, b & c),
            Some(LogOp::OR) => self.set_gpr(f.a, b | c),
            Some(LogOp::XOR) => self.set_gpr(f.a, b ^ c),
            None => self.interrupt(constants::CAUSE_INVALID_INSTRUCTION),
        }
    }

    fn exec_sh(&mut self, f: Fields) {
        let b = self.gpr[f.b];
        let c = self.gpr[f.c];

        match ShOp::from_u32(u32::from(f.modifier)) {
            Some(ShOp::SHL) => self.set_gpr(f.a, b.wrapping_shl(c)),
            Some(ShOp::SHR) => self.set_gpr(f.a, b.wrapping_shr(c)),
            None => self.interrupt(constants::CAUSE_INVALID_INSTRUCTION),
        }
    }

    fn exec_st(&mut self, f: Fields) {
        let address = self.gpr[f.a].wrapping_add(self.gpr[f.b]).wrapping_add(f.disp);

        match StMode::from_u32(u32::from(f.modifier)) {
            Some(StMode::DIR) => {
                let value = self.gpr[f.c];
                self.memory_mut().write_word(address, value);
            }
            Some(StMode::IND) => {
                let target = self.memory().read_word(address);
                let value = self.gpr[f.c];
                self.memory_mut().write_word(target, value);
            }
            Some(StMode::PUSH) => {
                self.set_gpr(f.a, self.gpr[f.a].wrapping_add(f.disp));
                let target = self.gpr[f.a];
                let value = self.gpr[f.c];
                self.memory_mut().write_word(target, value);
            }
            None => self.interrupt(constants::CAUSE_INVALID_INSTRUCTION),
        }
    }

    fn exec_ld(&mut self, f: Fields) {
        let indexed = self.gpr[f.b].wrapping_add(self.gpr[f.c]).wrapping_add(f.disp);

        match LdMode::from_u32(u32::from(f.modifier)) {
            Some(LdMode::GPRCSR) => {
                let value = self.csr_read(f.b);
                self.set_gpr(f.a, value);
            }
            Some(LdMode::GPRGPR) => self.set_gpr(f.a, self.gpr[f.b].wrapping_add(f.disp)),
            Some(LdMode::GPRMEM) => {
                let value = self.memory().read_word(indexed);
                self.set_gpr(f.a, value);
            }
            Some(LdMode::GPRPOP) => {
                let value = self.memory().read_word(self.gpr[f.b]);
                self.set_gpr(f.a, value);
                let moved = self.gpr[f.b].wrapping_add(f.disp);
                self.set_gpr(f.b, moved);
            }
            Some(LdMode::CSRGPR) => self.csr_write(f.a, self.gpr[f.b]),
            Some(LdMode::CSRCSR) => {
                let value = self.csr_read(f.b).wrapping_add(f.disp);
                self.csr_write(f.a, value);
            }
            Some(LdMode::CSRMEM) => {
                let value = self.memory().read_word(indexed);
                self.csr_write(f.a, value);
            }
            Some(LdMode::CSRPOP) => {
                let value = self.memory().read_word(self.gpr[f.b]);
                self.csr_write(f.a, value);
                let moved = self.gpr[f.b].wrapping_add(f.disp);
                self.set_gpr(f.b, moved);
            }
            None => self.interrupt(constants::CAUSE_INVALID_INSTRUCTION),
        }
    }
}
