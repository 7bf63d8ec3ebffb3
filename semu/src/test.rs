use std::collections::BTreeMap;

/// Assembles the given modules, links them under the placement map and pushes
/// the result through the textual image format, exactly as the command-line
/// tools hand it over.
fn build_image(sources: &[(&str, &str)], placements: &[(u32, &str)]) -> Vec<(u32, Vec<u8>)> {
    let objects = sources
        .iter()
        .map(|(name, source)| ((*name).to_owned(), sasm::assemble(source).unwrap()))
        .collect();
    let placements: BTreeMap<u32, String> = placements
        .iter()
        .map(|(address, name)| (*address, (*name).to_owned()))
        .collect();

    let image = slink::link(objects, &placements).unwrap();

    let mut buffer = Vec::new();
    sobj::image::write(&mut buffer, &image).unwrap();
    sobj::image::read(&buffer[..]).unwrap()
}

#[test]
fn wide_constant_load_round_trip() {
    let blocks = build_image(
        &[("a.o", ".section text\nld $0x12345678, %r1\nhalt\n.end")],
        &[(0x4000_0000, "text")],
    );

    let processor = crate::run_blocks(&blocks);
    assert_eq!(processor.gpr(1), 0x1234_5678);
}

#[test]
fn small_sum_program() {
    let source = "
.section text
.global _start
_start: ld $5, %r1
        ld $7, %r2
        add %r2, %r1
        halt
.end
";
    let blocks = build_image(&[("sum.o", source)], &[(0x4000_0000, "text")]);

    let processor = crate::run_blocks(&blocks);
    assert_eq!(processor.gpr(1), 0xC);
}

#[test]
fn cross_module_call_and_return() {
    let main = "
.extern helper
.section text
.global _start
_start: call helper
        ld $1, %r4
        halt
.end
";
    let helper = "
.section text
.global helper
helper: ld $9, %r3
        ret
.end
";
    let blocks = build_image(
        &[("main.o", main), ("helper.o", helper)],
        &[(0x4000_0000, "text")],
    );

    let processor = crate::run_blocks(&blocks);
    assert_eq!(processor.gpr(3), 9);
    assert_eq!(processor.gpr(4), 1);
}

#[test]
fn memory_operand_reads_linked_data() {
    let source = "
.global value
.section text
ld value, %r1
halt
.section data
value: .word 42
.end
";
    let blocks = build_image(&[("a.o", source)], &[(0x4000_0000, "text")]);

    let processor = crate::run_blocks(&blocks);
    assert_eq!(processor.gpr(1), 42);
}

#[test]
fn store_to_linked_data_section() {
    let source = "
.global slot
.section text
ld $77, %r1
st %r1, slot
halt
.section data
slot: .word 0
.end
";
    let blocks = build_image(&[("a.o", source)], &[(0x4000_0000, "text")]);

    let processor = crate::run_blocks(&blocks);

    // data follows text; the slot is its first word
    let data_address = blocks
        .iter()
        .map(|(address, bytes)| *address + bytes.len() as u32)
        .max()
        .unwrap()
        - 4;
    assert_eq!(processor.memory().read_word(data_address), 77);
}

#[test]
fn branch_loop_counts_down() {
    let source = "
.section text
.global _start
_start: ld $3, %r1
        ld $1, %r2
        ld $0, %r3
loop:   beq %r1, %r3, done
        sub %r2, %r1
        jmp loop
done:   halt
.end
";
    let blocks = build_image(&[("loop.o", source)], &[(0x4000_0000, "text")]);

    let processor = crate::run_blocks(&blocks);
    assert_eq!(processor.gpr(1), 0);
}
