use crate::parser::Rule;
use crate::{new_parser_error, Result};
use matches::debug_assert_matches;
use pest::iterators::Pair;
use pest::Span;
use scpu::{AritOp, Csr, LogOp, ShOp};
use util::{EnumFromStr, ParseEnumError};
use util_derive::EnumFromStr;

/// Target of `call`, `jmp` and the conditional branches.
#[derive(Debug, PartialEq)]
pub enum JumpTarget<'i> {
    Literal(i32),
    Symbol(Span<'i>),
}

/// The eight addressing forms of `ld`/`st` operands.
#[derive(Debug, PartialEq)]
pub enum Operand<'i> {
    Immediate(i32),
    SymbolValue(Span<'i>),
    MemLiteral(i32),
    MemSymbol(Span<'i>),
    RegDirect(u8),
    RegIndirect(u8),
    RegPlusLit(u8, i32),
    RegPlusSym(u8, Span<'i>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumFromStr)]
pub enum BranchKind {
    BEQ,
    BNE,
    BGT,
}

#[derive(Debug, PartialEq)]
pub enum Instruction<'i> {
    Halt,
    Int,
    Iret,
    Ret,
    Call { target: JumpTarget<'i> },
    Jmp { target: JumpTarget<'i> },
    Branch { kind: BranchKind, gpr1: u8, gpr2: u8, target: JumpTarget<'i> },
    Push { reg: u8 },
    Pop { reg: u8 },
    Xchg { src: u8, dst: u8 },
    Arit { op: AritOp, src: u8, dst: u8 },
    Not { reg: u8 },
    Log { op: LogOp, src: u8, dst: u8 },
    Sh { op: ShOp, src: u8, dst: u8 },
    Ld { operand: Operand<'i>, dst: u8 },
    St { src: u8, operand: Operand<'i> },
    Csrrd { csr: Csr, dst: u8 },
    Csrwr { src: u8, csr: Csr },
}

#[derive(Debug, PartialEq)]
pub enum WordArg<'i> {
    Literal(i32),
    Symbol(Span<'i>),
}

#[derive(Debug, PartialEq)]
pub enum Statement<'i> {
    Label(Span<'i>),
    Global(Vec<Span<'i>>),
    Extern(Vec<Span<'i>>),
    Section(Span<'i>),
    Word(Vec<WordArg<'i>>, Span<'i>),
    Skip(u32, Span<'i>),
    End,
    Instruction(Instruction<'i>, Span<'i>),
}

fn process_int(pair: Pair<Rule>) -> Result<i32> {
    debug_assert_matches!(pair.as_rule(), Rule::int);
    let inner = pair.into_inner().next().unwrap();
    let span = inner.as_span();

    match inner.as_rule() {
        Rule::hex_uint => {
            let digits = inner.into_inner().next().unwrap();
            u32::from_str_radix(digits.as_str(), 16)
                .map(|value| value as i32)
                .map_err(|err| new_parser_error(span, format!("parsing integer failed: {}", err)))
        }
        Rule::dec_int => {
            let value: i64 = inner
                .as_str()
                .parse()
                .map_err(|err| new_parser_error(span.clone(), format!("parsing integer failed: {}", err)))?;
            if value < i64::from(i32::min_value()) || value > i64::from(u32::max_value()) {
                Err(new_parser_error(span, "integer out of 32-bit range".to_owned()))
            } else {
                Ok(value as i32)
            }
        }
        _ => unreachable!(),
    }
}

fn process_uint(pair: Pair<Rule>) -> Result<u32> {
    debug_assert_matches!(pair.as_rule(), Rule::uint);
    let inner = pair.into_inner().next().unwrap();
    let span = inner.as_span();

    let (digits, radix) = match inner.as_rule() {
        Rule::hex_uint => (inner.into_inner().next().unwrap().as_str().to_owned(), 16),
        Rule::dec_uint => (inner.as_str().to_owned(), 10),
        _ => unreachable!(),
    };

    u32::from_str_radix(&digits, radix)
        .map_err(|err| new_parser_error(span, format!("parsing integer failed: {}", err)))
}

fn process_register(pair: Pair<Rule>) -> Result<u8> {
    debug_assert_matches!(pair.as_rule(), Rule::register);
    let name = pair.into_inner().next().unwrap();
    let span = name.as_span();

    match name.as_str() {
        "sp" => Ok(scpu::constants::SP as u8),
        "pc" => Ok(scpu::constants::PC as u8),
        text => {
            let index: u32 = text[1..]
                .parse()
                .map_err(|err| new_parser_error(span.clone(), format!("bad register: {}", err)))?;
            if index as usize >= scpu::constants::GPR_COUNT {
                Err(new_parser_error(span, format!("no such register %{}", text)))
            } else {
                Ok(index as u8)
            }
        }
    }
}

fn process_enum<T: EnumFromStr>(pair: &Pair<Rule>) -> Result<T> {
    T::from_str(&pair.as_str().to_uppercase())
        .map_err(|err: ParseEnumError| new_parser_error(pair.as_span(), format!("{}", err)))
}

fn process_csr(pair: Pair<Rule>) -> Result<Csr> {
    debug_assert_matches!(pair.as_rule(), Rule::csr);
    process_enum(&pair.into_inner().next().unwrap())
}

fn process_jump_target(pair: Pair<Rule>) -> Result<JumpTarget> {
    debug_assert_matches!(pair.as_rule(), Rule::jump_target);
    let inner = pair.into_inner().next().unwrap();

    match inner.as_rule() {
        Rule::int => Ok(JumpTarget::Literal(process_int(inner)?)),
        Rule::identifier => Ok(JumpTarget::Symbol(inner.as_span())),
        _ => unreachable!(),
    }
}

fn process_operand(pair: Pair<Rule>) -> Result<Operand> {
    debug_assert_matches!(pair.as_rule(), Rule::operand);
    let inner = pair.into_inner().next().unwrap();
    let rule = inner.as_rule();
    let mut pairs = inner.into_inner();

    Ok(match rule {
        Rule::imm_lit => Operand::Immediate(process_int(pairs.next().unwrap())?),
        Rule::imm_sym => Operand::SymbolValue(pairs.next().unwrap().as_span()),
        Rule::reg_dir => Operand::RegDirect(process_register(pairs.next().unwrap())?),
        Rule::reg_ind => Operand::RegIndirect(process_register(pairs.next().unwrap())?),
        Rule::reg_ind_off => {
            let reg = process_register(pairs.next().unwrap())?;
            let offset = pairs.next().unwrap().into_inner().next().unwrap();
            match offset.as_rule() {
                Rule::int => Operand::RegPlusLit(reg, process_int(offset)?),
                Rule::identifier => Operand::RegPlusSym(reg, offset.as_span()),
                _ => unreachable!(),
            }
        }
        Rule::mem_lit => Operand::MemLiteral(process_int(pairs.next().unwrap())?),
        Rule::mem_sym => Operand::MemSymbol(pairs.next().unwrap().as_span()),
        _ => unreachable!(),
    })
}

fn process_instruction(pair: Pair<Rule>) -> Result<Instruction> {
    debug_assert_matches!(pair.as_rule(), Rule::instruction);
    let inner = pair.into_inner().next().unwrap();
    let rule = inner.as_rule();
    let mut pairs = inner.into_inner();

    Ok(match rule {
        Rule::i_halt => Instruction::Halt,
        Rule::i_int => Instruction::Int,
        Rule::i_iret => Instruction::Iret,
        Rule::i_ret => Instruction::Ret,
        Rule::i_call => Instruction::Call {
            target: process_jump_target(pairs.next().unwrap())?,
        },
        Rule::i_jmp => Instruction::Jmp {
            target: process_jump_target(pairs.next().unwrap())?,
        },
        Rule::i_branch => Instruction::Branch {
            kind: process_enum(&pairs.next().unwrap())?,
            gpr1: process_register(pairs.next().unwrap())?,
            gpr2: process_register(pairs.next().unwrap())?,
            target: process_jump_target(pairs.next().unwrap())?,
        },
        Rule::i_push => Instruction::Push {
            reg: process_register(pairs.next().unwrap())?,
        },
        Rule::i_pop => Instruction::Pop {
            reg: process_register(pairs.next().unwrap())?,
        },
        Rule::i_xchg => {
            let src = process_register(pairs.next().unwrap())?;
            let dst = process_register(pairs.next().unwrap())?;
            Instruction::Xchg { src, dst }
        }
        Rule::i_arit => {
            let op = process_enum(&pairs.next().unwrap())?;
            let src = process_register(pairs.next().unwrap())?;
            let dst = process_register(pairs.next().unwrap())?;
            Instruction::Arit { op, src, dst }
        }
        Rule::i_not => Instruction::Not {
            reg: process_register(pairs.next().unwrap())?,
        },
        Rule::i_log => {
            let op = process_enum(&pairs.next().unwrap())?;
            let src = process_register(pairs.next().unwrap())?;
            let dst = process_register(pairs.next().unwrap())?;
            Instruction::Log { op, src, dst }
        }
        Rule::i_sh => {
            let op = process_enum(&pairs.next().unwrap())?;
            let src = process_register(pairs.next().unwrap())?;
            let dst = process_register(pairs.next().unwrap())?;
            Instruction::Sh { op, src, dst }
        }
        Rule::i_ld => {
            let operand = process_operand(pairs.next().unwrap())?;
            let dst = process_register(pairs.next().unwrap())?;
            Instruction::Ld { operand, dst }
        }
        Rule::i_st => {
            let src = process_register(pairs.next().unwrap())?;
            let operand = process_operand(pairs.next().unwrap())?;
            Instruction::St { src, operand }
        }
        Rule::i_csrrd => {
            let csr = process_csr(pairs.next().unwrap())?;
            let dst = process_register(pairs.next().unwrap())?;
            Instruction::Csrrd { csr, dst }
        }
        Rule::i_csrwr => {
            let src = process_register(pairs.next().unwrap())?;
            let csr = process_csr(pairs.next().unwrap())?;
            Instruction::Csrwr { src, csr }
        }
        _ => unreachable!(),
    })
}

fn process_directive(pair: Pair<Rule>) -> Result<Statement> {
    debug_assert_matches!(pair.as_rule(), Rule::directive);
    let inner = pair.into_inner().next().unwrap();
    let rule = inner.as_rule();
    let span = inner.as_span();
    let mut pairs = inner.into_inner();

    Ok(match rule {
        Rule::d_global | Rule::d_extern => {
            let names = pairs
                .next()
                .unwrap()
                .into_inner()
                .map(|name| name.as_span())
                .collect();
            if rule == Rule::d_global {
                Statement::Global(names)
            } else {
                Statement::Extern(names)
            }
        }
        Rule::d_section => Statement::Section(pairs.next().unwrap().as_span()),
        Rule::d_word => {
            let mut args = Vec::new();
            for arg in pairs {
                let value = arg.into_inner().next().unwrap();
                args.push(match value.as_rule() {
                    Rule::int => WordArg::Literal(process_int(value)?),
                    Rule::identifier => WordArg::Symbol(value.as_span()),
                    _ => unreachable!(),
                });
            }
            Statement::Word(args, span)
        }
        Rule::d_skip => Statement::Skip(process_uint(pairs.next().unwrap())?, span),
        Rule::d_end => Statement::End,
        _ => unreachable!(),
    })
}

pub fn process_program(pair: Pair<Rule>) -> Result<Vec<Statement>> {
    debug_assert_matches!(pair.as_rule(), Rule::program);

    let mut statements = Vec::new();
    for statement in pair.into_inner() {
        if statement.as_rule() == Rule::EOI {
            continue;
        }
        debug_assert_matches!(statement.as_rule(), Rule::statement);

        let span = statement.as_span();
        let inner = statement.into_inner().next().unwrap();
        statements.push(match inner.as_rule() {
            Rule::directive => process_directive(inner)?,
            Rule::label => Statement::Label(inner.into_inner().next().unwrap().as_span()),
            Rule::instruction => Statement::Instruction(process_instruction(inner)?, span),
            _ => unreachable!(),
        });
    }

    Ok(statements)
}
