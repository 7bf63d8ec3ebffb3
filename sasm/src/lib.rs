//! Two-pass assembler for the 32-bit load/store toolchain.
//!
//! The entry point is [`assemble`](fn.assemble.html), which takes assembly
//! source text and returns the relocatable object module as a
//! [`sobj::ObjectFile`](../sobj/struct.ObjectFile.html). Parsing uses [pest];
//! the crate's [`Error`](type.Error.html) type is an alias of
//! `pest::error::Error`, so every diagnostic — syntactic or semantic — points
//! at a source span and pretty-prints with line/column context.
//!
//! # Source language
//!
//! Comments start with `#` and run to the end of the line. Newlines are
//! ordinary whitespace. Registers are `%r0`..`%r15` with the aliases `%sp`
//! (`%r14`) and `%pc` (`%r15`); control/status registers are `%status`,
//! `%handler` and `%cause`. Integer literals are decimal or `0x`-hexadecimal.
//!
//! ## Directives
//!
//!  Directive        | Effect
//! ------------------|------------------------------------------------------
//! `name:`           | define `name` at the current location
//! `.global a, b`    | export symbols to the linker; must be defined here
//! `.extern a, b`    | declare symbols that another module defines
//! `.section name`   | switch to a new section (a leading `.` is allowed)
//! `.word v, w`      | emit 32-bit words; each element a literal or a symbol
//! `.skip n`         | emit `n` zero bytes
//! `.end`            | finish; anything after it is ignored
//!
//! ## Instructions
//!
//!  Mnemonic | Syntax                     | Notes
//! ----------|----------------------------|--------------------------------
//! `halt`    | `halt`                     | stop the machine
//! `int`     | `int`                      | software interrupt
//! `iret`    | `iret`                     | pop status, then pop pc
//! `ret`     | `ret`                      | pop pc
//! `call`    | `call target`              | target: literal or symbol
//! `jmp`     | `jmp target`               |
//! `beq`     | `beq %r1, %r2, target`     | also `bne`, `bgt`
//! `push`    | `push %r1`                 |
//! `pop`     | `pop %r1`                  |
//! `xchg`    | `xchg %rS, %rD`            | swap
//! `add`     | `add %rS, %rD`             | `%rD op= %rS`; likewise `sub`, `mul`, `div`, `and`, `or`, `xor`, `shl`, `shr`
//! `not`     | `not %r1`                  | in place
//! `ld`      | `ld operand, %rD`          | see operand forms below
//! `st`      | `st %rS, operand`          | memory operand forms only
//! `csrrd`   | `csrrd %status, %r1`       | `%r1 = csr`
//! `csrwr`   | `csrwr %r1, %status`       | `csr = %r1`
//!
//! ## Operand forms
//!
//!  Syntax          | Meaning
//! -----------------|------------------------------------------------------
//! `$literal`       | the value itself
//! `$symbol`        | the symbol's address
//! `literal`        | memory at the literal address
//! `symbol`         | memory at the symbol's address
//! `%reg`           | register
//! `[%reg]`         | memory at the register's value
//! `[%reg + lit]`   | memory at register plus offset (offset must fit 12 bits)
//! `[%reg + sym]`   | rejected; symbol values are unknown at assembly time
//!
//! Literals that do not fit the signed 12-bit displacement field, and all
//! symbol references, are placed in a per-section pool appended after the
//! section's last byte and reached PC-relative. See
//! [`Options`](struct.Options.html) for the legacy always-pool switch.
//!
//! [pest]: https://docs.rs/pest/

mod assembler;
mod parser;
mod section;
mod statement;


use parser::{AsmParser, Rule};
use pest::iterators::Pair;
use pest::{Parser, Span};

pub use assembler::{fits_displacement, Options};

pub type Error = pest::error::Error<Rule>;

pub type Result<T> = std::result::Result<T, Error>;

/// Assembles `input` into one relocatable object module.
pub fn assemble(input: &str) -> Result<sobj::ObjectFile> {
    assemble_with_options(input, Options::default())
}

pub fn assemble_with_options(input: &str, options: Options) -> Result<sobj::ObjectFile> {
    let statements = statement::process_program(parse(input)?)?;

    let end = statements
        .iter()
        .position(|statement| matches!(statement, statement::Statement::End))
        .ok_or_else(|| {
            let at_end = Span::new(input, input.len(), input.len()).unwrap();
            new_parser_error(at_end, "missing .end directive".to_owned())
        })?;

    assembler::Assembler::new(options).run(&statements[..=end])
}

pub(crate) fn new_parser_error(span: Span, message: String) -> Error {
    Error::new_from_span(pest::error::ErrorVariant::CustomError { message }, span)
}

fn parse(input: &str) -> Result<Pair<Rule>> {
    Ok(AsmParser::parse(Rule::program, input)?.next().unwrap())
}
