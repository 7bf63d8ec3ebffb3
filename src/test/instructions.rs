use super::{load_words, run_words};
use crate::constants::{self, ENTRY_POINT};
use crate::*;

#[test]
fn halt_stops_the_machine() {
    let processor = run_words(&[make_halt()]);
    assert_eq!(processor.gpr(constants::PC), ENTRY_POINT + 4);
}

#[test]
fn add_program() {
    let processor = run_words(&[
        make_ld(LdMode::GPRGPR, 1, 0, 0, 5),
        make_ld(LdMode::GPRGPR, 2, 0, 0, 7),
        make_arit(AritOp::ADD, 1, 1, 2),
        make_halt(),
    ]);
    assert_eq!(processor.gpr(1), 12);
}

#[test]
fn sub_wraps() {
    let processor = run_words(&[
        make_ld(LdMode::GPRGPR, 1, 0, 0, 3),
        make_ld(LdMode::GPRGPR, 2, 0, 0, 5),
        make_arit(AritOp::SUB, 1, 1, 2),
        make_halt(),
    ]);
    assert_eq!(processor.gpr(1), (-2i32) as u32);
}

#[test]
fn mul_and_div_are_unsigned() {
    let processor = run_words(&[
        make_ld(LdMode::GPRGPR, 1, 0, 0, 7),
        make_ld(LdMode::GPRGPR, 2, 0, 0, 2),
        make_arit(AritOp::MUL, 3, 1, 2),
        make_arit(AritOp::DIV, 4, 1, 2),
        make_halt(),
    ]);
    assert_eq!(processor.gpr(3), 14);
    assert_eq!(processor.gpr(4), 3);
}

#[test]
fn div_by_zero_traps() {
    // handler is 0, and untouched memory reads as halt
    let processor = run_words(&[make_arit(AritOp::DIV, 1, 1, 2), make_halt()]);
    assert_eq!(processor.csr(Csr::CAUSE), constants::CAUSE_INVALID_INSTRUCTION);
}

#[test]
fn logic_operations() {
    let processor = run_words(&[
        make_ld(LdMode::GPRGPR, 1, 0, 0, 0b1100),
        make_ld(LdMode::GPRGPR, 2, 0, 0, 0b1010),
        make_log(LogOp::AND, 3, 1, 2),
        make_log(LogOp::OR, 4, 1, 2),
        make_log(LogOp::XOR, 5, 1, 2),
        make_log(LogOp::NOT, 6, 1, 0),
        make_halt(),
    ]);
    assert_eq!(processor.gpr(3), 0b1000);
    assert_eq!(processor.gpr(4), 0b1110);
    assert_eq!(processor.gpr(5), 0b0110);
    assert_eq!(processor.gpr(6), !0b1100u32);
}

#[test]
fn shifts() {
    let processor = run_words(&[
        make_ld(LdMode::GPRGPR, 1, 0, 0, 1),
        make_ld(LdMode::GPRGPR, 2, 0, 0, 4),
        make_sh(ShOp::SHL, 3, 1, 2),
        make_ld(LdMode::GPRGPR, 4, 0, 0, 0x100),
        make_sh(ShOp::SHR, 5, 4, 2),
        make_halt(),
    ]);
    assert_eq!(processor.gpr(3), 16);
    assert_eq!(processor.gpr(5), 0x10);
}

#[test]
fn shift_count_is_taken_modulo_word_width() {
    let processor = run_words(&[
        make_ld(LdMode::GPRGPR, 1, 0, 0, 1),
        make_ld(LdMode::GPRGPR, 2, 0, 0, 32),
        make_sh(ShOp::SHL, 3, 1, 2),
        make_halt(),
    ]);
    assert_eq!(processor.gpr(3), 1);
}

#[test]
fn xchg_swaps() {
    let processor = run_words(&[
        make_ld(LdMode::GPRGPR, 1, 0, 0, 1),
        make_ld(LdMode::GPRGPR, 2, 0, 0, 2),
        make_xchg(1, 2),
        make_halt(),
    ]);
    assert_eq!(processor.gpr(1), 2);
    assert_eq!(processor.gpr(2), 1);
}

#[test]
fn xchg_never_writes_r0() {
    let processor = run_words(&[
        make_ld(LdMode::GPRGPR, 1, 0, 0, 7),
        make_xchg(0, 1),
        make_halt(),
    ]);
    assert_eq!(processor.gpr(0), 0);
    assert_eq!(processor.gpr(1), 0);
}

#[test]
fn writes_to_r0_are_discarded() {
    let processor = run_words(&[make_ld(LdMode::GPRGPR, 0, 0, 0, 5), make_halt()]);
    assert_eq!(processor.gpr(0), 0);
}

#[test]
fn displacement_is_signed() {
    let processor = run_words(&[
        make_ld(LdMode::GPRGPR, 2, 0, 0, 10),
        make_ld(LdMode::GPRGPR, 1, 2, 0, -1),
        make_halt(),
    ]);
    assert_eq!(processor.gpr(1), 9);
}

#[test]
fn store_direct_and_load_back() {
    let processor = run_words(&[
        make_ld(LdMode::GPRGPR, 1, 0, 0, 42),
        make_st(StMode::DIR, 0, 0, 1, 0x100),
        make_ld(LdMode::GPRMEM, 3, 0, 0, 0x100),
        make_halt(),
    ]);
    assert_eq!(processor.memory().read_word(0x100), 42);
    assert_eq!(processor.gpr(3), 42);
}

#[test]
fn store_indirect_goes_through_the_pointer() {
    let mut processor = Processor::new();
    load_words(
        &mut processor,
        &[
            make_ld(LdMode::GPRGPR, 1, 0, 0, 42),
            make_st(StMode::IND, 0, 0, 1, 0x200),
            make_halt(),
        ],
    );
    processor.memory_mut().write_word(0x200, 0x300);
    processor.run();

    assert_eq!(processor.memory().read_word(0x300), 42);
}

#[test]
fn push_then_pop_through_instructions() {
    let processor = run_words(&[
        make_ld(LdMode::GPRGPR, 1, 0, 0, 0x123),
        make_st(StMode::PUSH, 14, 0, 1, -4),
        make_ld(LdMode::GPRPOP, 2, 14, 0, 4),
        make_halt(),
    ]);
    assert_eq!(processor.gpr(2), 0x123);
    assert_eq!(processor.gpr(14), 0);
}

#[test]
fn call_pushes_the_return_address() {
    let processor = run_words(&[make_call(CallMode::DIR, 0, 0, 0x100)]);

    // untouched memory at the target reads as halt
    assert_eq!(processor.gpr(14), 0xFFFF_FFFC);
    assert_eq!(processor.memory().read_word(0xFFFF_FFFC), ENTRY_POINT + 4);
}

#[test]
fn call_and_ret() {
    let processor = run_words(&[
        make_call(CallMode::DIR, 15, 0, 8), // to entry + 12
        make_halt(),
        make_halt(),
        make_ld(LdMode::GPRGPR, 3, 0, 0, 9),
        make_ld(LdMode::GPRPOP, 15, 14, 0, 4), // ret
    ]);

    assert_eq!(processor.gpr(3), 9);
    assert_eq!(processor.gpr(14), 0);
    assert_eq!(processor.gpr(constants::PC), ENTRY_POINT + 8);
}

#[test]
fn conditional_jump_taken_and_not_taken() {
    // equal: skip the marker load
    let processor = run_words(&[
        make_ld(LdMode::GPRGPR, 1, 0, 0, 3),
        make_ld(LdMode::GPRGPR, 2, 0, 0, 3),
        make_jump(JumpMode::JEQ, 15, 1, 2, 4),
        make_ld(LdMode::GPRGPR, 4, 0, 0, 1),
        make_halt(),
    ]);
    assert_eq!(processor.gpr(4), 0);

    // not equal: fall through
    let processor = run_words(&[
        make_ld(LdMode::GPRGPR, 1, 0, 0, 3),
        make_ld(LdMode::GPRGPR, 2, 0, 0, 4),
        make_jump(JumpMode::JEQ, 15, 1, 2, 4),
        make_ld(LdMode::GPRGPR, 4, 0, 0, 1),
        make_halt(),
    ]);
    assert_eq!(processor.gpr(4), 1);
}

#[test]
fn greater_than_compares_signed() {
    let processor = run_words(&[
        make_ld(LdMode::GPRGPR, 1, 0, 0, -1),
        make_ld(LdMode::GPRGPR, 2, 0, 0, 1),
        make_jump(JumpMode::JGT, 15, 1, 2, 4),
        make_ld(LdMode::GPRGPR, 4, 0, 0, 1),
        make_halt(),
    ]);
    // -1 > 1 is false for signed values, so the marker load runs
    assert_eq!(processor.gpr(4), 1);
}

#[test]
fn indirect_jump_reads_the_target_from_memory() {
    let mut processor = Processor::new();
    load_words(
        &mut processor,
        &[
            make_jump(JumpMode::JMPI, 15, 0, 0, 0xFC),
            make_halt(),
            make_ld(LdMode::GPRGPR, 5, 0, 0, 7),
            make_halt(),
        ],
    );
    processor
        .memory_mut()
        .write_word(ENTRY_POINT + 0x100, ENTRY_POINT + 8);
    processor.run();

    assert_eq!(processor.gpr(5), 7);
}

#[test]
fn software_interrupt_enters_the_handler() {
    let handler = 0x100;
    let mut processor = Processor::new();
    load_words(
        &mut processor,
        &[
            make_ld(LdMode::GPRGPR, 1, 0, 0, handler),
            make_ld(LdMode::CSRGPR, Csr::HANDLER as u8, 1, 0, 0),
            make_int(),
            make_halt(),
        ],
    );
    processor.memory_mut().load(
        handler as u32,
        &make_ld(LdMode::GPRGPR, 2, 0, 0, 7),
    );
    processor
        .memory_mut()
        .load(handler as u32 + 4, &make_halt());
    processor.run();

    assert_eq!(processor.csr(Csr::CAUSE), constants::CAUSE_SOFTWARE_INTERRUPT);
    assert_eq!(processor.gpr(2), 7);
    // pc and status were pushed big-to-little
    assert_eq!(processor.gpr(14), 0xFFFF_FFF8);
    assert_eq!(processor.memory().read_word(0xFFFF_FFFC), ENTRY_POINT + 12);
    assert_eq!(processor.memory().read_word(0xFFFF_FFF8), 0);
}

#[test]
fn invalid_opcode_traps_with_cause_one() {
    let mut processor = Processor::new();
    processor.memory_mut().load(ENTRY_POINT, &[0xF0, 0, 0, 0]);
    processor.run();

    assert_eq!(processor.csr(Csr::CAUSE), constants::CAUSE_INVALID_INSTRUCTION);
}

#[test]
fn interrupt_return_restores_status() {
    let handler = 0x100u32;
    let mut processor = Processor::new();
    load_words(
        &mut processor,
        &[
            make_ld(LdMode::GPRGPR, 1, 0, 0, handler as i32),
            make_ld(LdMode::CSRGPR, Csr::HANDLER as u8, 1, 0, 0),
            make_ld(LdMode::GPRGPR, 2, 0, 0, 5),
            make_ld(LdMode::CSRGPR, Csr::STATUS as u8, 2, 0, 0),
            make_int(),
            make_halt(),
        ],
    );
    // the handler is a bare iret: pop status, then pop pc
    processor
        .memory_mut()
        .load(handler, &make_ld(LdMode::CSRPOP, Csr::STATUS as u8, 14, 0, 4));
    processor
        .memory_mut()
        .load(handler + 4, &make_ld(LdMode::GPRPOP, 15, 14, 0, 4));
    processor.run();

    assert_eq!(processor.csr(Csr::STATUS), 5);
    assert_eq!(processor.csr(Csr::CAUSE), constants::CAUSE_SOFTWARE_INTERRUPT);
    assert_eq!(processor.gpr(14), 0);
    assert_eq!(processor.gpr(constants::PC), ENTRY_POINT + 24);
}

#[test]
fn csr_read_back() {
    let processor = run_words(&[
        make_ld(LdMode::GPRGPR, 1, 0, 0, 0x2A),
        make_ld(LdMode::CSRGPR, Csr::STATUS as u8, 1, 0, 0),
        make_ld(LdMode::GPRCSR, 3, Csr::STATUS as u8, 0, 0),
        make_halt(),
    ]);
    assert_eq!(processor.gpr(3), 0x2A);
}

#[test]
fn csr_to_csr_with_offset() {
    let processor = run_words(&[
        make_ld(LdMode::CSRCSR, Csr::HANDLER as u8, Csr::STATUS as u8, 0, 0x10),
        make_ld(LdMode::GPRCSR, 4, Csr::HANDLER as u8, 0, 0),
        make_halt(),
    ]);
    assert_eq!(processor.gpr(4), 0x10);
}
