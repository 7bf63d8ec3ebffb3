use crate::section::Section;
use crate::statement::{BranchKind, Instruction, JumpTarget, Operand, Statement, WordArg};
use crate::{new_parser_error, Result};
use indexmap::IndexMap;
use pest::Span;
use scpu::constants::{DISP_MAX, DISP_MIN, PC, SP, WORD_BYTES};
use scpu::*;

/// Assembler switches.
#[derive(Clone, Copy, Debug, Default)]
pub struct Options {
    /// Route every literal through the literal pool instead of using the
    /// short forms for values that fit the 12-bit displacement. Object files
    /// produced by the historic encoder always took the pool path; this
    /// switch reproduces that layout.
    pub pool_all_literals: bool,
}

/// Checks the true signed 12-bit displacement range, independent of
/// [`Options::pool_all_literals`].
pub fn fits_displacement(value: i32) -> bool {
    value >= DISP_MIN && value <= DISP_MAX
}

#[derive(Clone, Debug)]
struct SymbolInfo {
    value: u32,
    is_global: bool,
    is_defined: bool,
    is_extern: bool,
    section: Option<String>,
}

impl SymbolInfo {
    fn undefined() -> SymbolInfo {
        SymbolInfo {
            value: 0,
            is_global: false,
            is_defined: false,
            is_extern: false,
            section: None,
        }
    }
}

/// What a relocation resolves against. Lowered to the object format's single
/// name field on output; the two cases are kept apart everywhere else.
enum RelocTarget {
    /// A global (or external) symbol, resolved by the linker's symbol table.
    Symbol(String),
    /// Start of the named section as placed from this module, plus addend.
    Section(String),
}

impl RelocTarget {
    fn into_name(self) -> String {
        match self {
            RelocTarget::Symbol(name) => name,
            RelocTarget::Section(name) => name,
        }
    }
}

pub struct Assembler {
    options: Options,
    second_pass: bool,
    symbol_table: IndexMap<String, SymbolInfo>,
    sections: IndexMap<String, Section>,
    current: Option<Section>,
    output: Vec<sobj::Section>,
    lc: u32,
}

impl Assembler {
    pub fn new(options: Options) -> Assembler {
        Assembler {
            options,
            second_pass: false,
            symbol_table: IndexMap::new(),
            sections: IndexMap::new(),
            current: None,
            output: Vec::new(),
            lc: 0,
        }
    }

    /// Runs both passes over the statement stream. The stream must end with
    /// the `.end` directive; the caller drops anything after it.
    pub fn run(mut self, statements: &[Statement]) -> Result<sobj::ObjectFile> {
        self.execute_pass(statements)?;

        self.second_pass = true;
        self.lc = 0;
        self.execute_pass(statements)?;

        Ok(self.into_object())
    }

    fn execute_pass(&mut self, statements: &[Statement]) -> Result<()> {
        for statement in statements {
            match statement {
                Statement::Label(name) => self.label(name)?,
                Statement::Global(names) => self.global(names)?,
                Statement::Extern(names) => self.extern_symbols(names)?,
                Statement::Section(name) => self.section(name)?,
                Statement::Word(args, span) => self.word(args, span)?,
                Statement::Skip(count, span) => self.skip(*count, span)?,
                Statement::End => return self.end(),
                Statement::Instruction(instruction, span) => {
                    self.instruction(instruction, span)?
                }
            }
        }
        unreachable!()
    }

    fn into_object(self) -> sobj::ObjectFile {
        let symbols = self
            .symbol_table
            .into_iter()
            .filter(|(_, info)| info.is_global)
            .map(|(name, info)| sobj::Symbol {
                name,
                value: info.value,
                is_defined: info.is_defined,
                section: info.section,
            })
            .collect();

        sobj::ObjectFile {
            sections: self.output,
            symbols,
        }
    }

    // ----- directives -----

    fn label(&mut self, name: &Span) -> Result<()> {
        if self.second_pass {
            return Ok(());
        }

        let section = match &self.current {
            Some(section) => section.name.clone(),
            None => {
                return Err(new_parser_error(
                    name.clone(),
                    "label outside of a section".to_owned(),
                ))
            }
        };

        let text = name.as_str();
        let value = self.lc;
        match self.symbol_table.get_mut(text) {
            Some(info) => {
                if info.is_defined {
                    return Err(new_parser_error(
                        name.clone(),
                        format!("symbol {} defined twice", text),
                    ));
                }
                if info.is_extern {
                    return Err(new_parser_error(
                        name.clone(),
                        format!("symbol {} declared extern but defined here", text),
                    ));
                }
                info.is_defined = true;
                info.value = value;
                info.section = Some(section);
            }
            None => {
                self.symbol_table.insert(
                    text.to_owned(),
                    SymbolInfo {
                        value,
                        is_global: false,
                        is_defined: true,
                        is_extern: false,
                        section: Some(section),
                    },
                );
            }
        }
        Ok(())
    }

    fn global(&mut self, names: &[Span]) -> Result<()> {
        for name in names {
            let text = name.as_str();
            if self.second_pass {
                if !self.symbol_table[text].is_defined {
                    return Err(new_parser_error(
                        name.clone(),
                        format!("global symbol {} is not defined", text),
                    ));
                }
            } else {
                self.symbol_table
                    .entry(text.to_owned())
                    .or_insert_with(SymbolInfo::undefined)
                    .is_global = true;
            }
        }
        Ok(())
    }

    fn extern_symbols(&mut self, names: &[Span]) -> Result<()> {
        if self.second_pass {
            return Ok(());
        }

        for name in names {
            let text = name.as_str();
            let info = self
                .symbol_table
                .entry(text.to_owned())
                .or_insert_with(SymbolInfo::undefined);
            if info.is_defined {
                return Err(new_parser_error(
                    name.clone(),
                    format!("symbol {} declared extern but defined here", text),
                ));
            }
            info.is_global = true;
            info.is_extern = true;
        }
        Ok(())
    }

    fn section(&mut self, name: &Span) -> Result<()> {
        let text = name.as_str();

        if self.second_pass {
            self.finalize_current();
            self.current = self.sections.shift_remove(text);
            debug_assert!(self.current.is_some());
        } else {
            self.close_current();
            if self.sections.contains_key(text) {
                return Err(new_parser_error(
                    name.clone(),
                    format!("section {} defined twice", text),
                ));
            }
            self.current = Some(Section::new(text));
        }

        self.lc = 0;
        Ok(())
    }

    fn word(&mut self, args: &[WordArg], span: &Span) -> Result<()> {
        for arg in args {
            match arg {
                WordArg::Literal(literal) => {
                    let value = *literal as u32;
                    let second_pass = self.second_pass;
                    let section = self.current_mut(span)?;
                    if second_pass {
                        section.write_word(value);
                    }
                }
                WordArg::Symbol(name) => {
                    if self.second_pass {
                        self.check_resolvable(name)?;
                        let relocation = self.relocation_for(name.as_str(), self.lc);
                        let section = self.current_mut(span)?;
                        section.relocations.push(relocation);
                        section.write_word(0);
                    } else {
                        self.current_mut(span)?;
                        self.symbol_table
                            .entry(name.as_str().to_owned())
                            .or_insert_with(SymbolInfo::undefined);
                    }
                }
            }
            self.advance(WORD_BYTES, span)?;
        }
        Ok(())
    }

    fn skip(&mut self, count: u32, span: &Span) -> Result<()> {
        let second_pass = self.second_pass;
        let section = self.current_mut(span)?;
        if second_pass {
            let new_len = section.content.len() + count as usize;
            section.content.resize(new_len, 0);
        }
        self.advance(count, span)
    }

    fn end(&mut self) -> Result<()> {
        if self.second_pass {
            self.finalize_current();
        } else {
            self.close_current();
        }
        Ok(())
    }

    /// Pass one: fix the section's length, lay out its pools and store it.
    fn close_current(&mut self) {
        if let Some(mut section) = self.current.take() {
            section.length = self.lc;
            section.allocate_pools();
            self.sections.insert(section.name.clone(), section);
        }
    }

    /// Pass two: pad to the pooled length, materialise literals, turn every
    /// symbol-pool slot into a relocation and move the section to the output.
    fn finalize_current(&mut self) {
        if let Some(mut section) = self.current.take() {
            section.write_literals();

            for (name, &offset) in &section.symbol_pool {
                let relocation = self.relocation_for(name, offset);
                section.relocations.push(relocation);
            }

            self.output.push(sobj::Section {
                name: section.name,
                length: section.length,
                content: section.content,
                relocations: section.relocations,
            });
        }
    }

    /// The global/local relocation rule: global and still-undefined symbols
    /// are named directly; a local defined symbol becomes "start of its
    /// defining section plus its offset there".
    fn relocation_for(&self, name: &str, offset: u32) -> sobj::Relocation {
        let info = &self.symbol_table[name];
        let (target, addend) = if info.is_global || !info.is_defined {
            (RelocTarget::Symbol(name.to_owned()), 0)
        } else {
            let section = info.section.clone().unwrap();
            (RelocTarget::Section(section), info.value as i32)
        };

        sobj::Relocation {
            offset,
            addend,
            name: target.into_name(),
        }
    }

    // ----- instructions -----

    fn instruction(&mut self, instruction: &Instruction, span: &Span) -> Result<()> {
        let pc = PC as u8;
        let sp = SP as u8;

        match instruction {
            Instruction::Halt => self.emit(make_halt(), span),
            Instruction::Int => self.emit(make_int(), span),
            Instruction::Iret => {
                // pop status, then pop pc
                self.emit(
                    make_ld(LdMode::CSRPOP, Csr::STATUS as u8, sp, 0, WORD_BYTES as i32),
                    span,
                )?;
                self.emit(make_ld(LdMode::GPRPOP, pc, sp, 0, WORD_BYTES as i32), span)
            }
            Instruction::Ret => {
                self.emit(make_ld(LdMode::GPRPOP, pc, sp, 0, WORD_BYTES as i32), span)
            }
            Instruction::Push { reg } => self.emit(
                make_st(StMode::PUSH, sp, 0, *reg, -(WORD_BYTES as i32)),
                span,
            ),
            Instruction::Pop { reg } => self.emit(
                make_ld(LdMode::GPRPOP, *reg, sp, 0, WORD_BYTES as i32),
                span,
            ),
            Instruction::Call { target } => self.flow(
                OpClass::CALL,
                CallMode::DIR as u8,
                CallMode::IND as u8,
                0,
                0,
                target,
                span,
            ),
            Instruction::Jmp { target } => self.flow(
                OpClass::JUMP,
                JumpMode::JMP as u8,
                JumpMode::JMPI as u8,
                0,
                0,
                target,
                span,
            ),
            Instruction::Branch {
                kind,
                gpr1,
                gpr2,
                target,
            } => {
                let (short, pooled) = match kind {
                    BranchKind::BEQ => (JumpMode::JEQ, JumpMode::JEQI),
                    BranchKind::BNE => (JumpMode::JNE, JumpMode::JNEI),
                    BranchKind::BGT => (JumpMode::JGT, JumpMode::JGTI),
                };
                self.flow(
                    OpClass::JUMP,
                    short as u8,
                    pooled as u8,
                    *gpr1,
                    *gpr2,
                    target,
                    span,
                )
            }
            Instruction::Xchg { src, dst } => self.emit(make_xchg(*src, *dst), span),
            Instruction::Arit { op, src, dst } => {
                self.emit(make_arit(*op, *dst, *dst, *src), span)
            }
            Instruction::Not { reg } => self.emit(make_log(LogOp::NOT, *reg, *reg, 0), span),
            Instruction::Log { op, src, dst } => self.emit(make_log(*op, *dst, *dst, *src), span),
            Instruction::Sh { op, src, dst } => self.emit(make_sh(*op, *dst, *dst, *src), span),
            Instruction::Ld { operand, dst } => self.load(operand, *dst, span),
            Instruction::St { src, operand } => self.store(*src, operand, span),
            Instruction::Csrrd { csr, dst } => {
                self.emit(make_ld(LdMode::GPRCSR, *dst, *csr as u8, 0, 0), span)
            }
            Instruction::Csrwr { src, csr } => {
                self.emit(make_ld(LdMode::CSRGPR, *csr as u8, *src, 0, 0), span)
            }
        }
    }

    /// Shared encoder for `call`, `jmp` and the conditional branches: a short
    /// absolute form when the literal target fits the displacement, otherwise
    /// the memory-indirect form reading the target from this section's pool.
    fn flow(
        &mut self,
        oc: OpClass,
        short_mod: u8,
        pooled_mod: u8,
        b: u8,
        c: u8,
        target: &JumpTarget,
        span: &Span,
    ) -> Result<()> {
        let pc = PC as u8;

        match target {
            JumpTarget::Literal(literal) if self.use_short_form(*literal) => {
                self.emit(pack(oc, short_mod, 0, b, c, *literal), span)
            }
            JumpTarget::Literal(literal) => {
                let disp = if self.second_pass {
                    self.literal_disp(*literal, span)?
                } else {
                    self.current_mut(span)?.register_literal(*literal);
                    0
                };
                self.emit(pack(oc, pooled_mod, pc, b, c, disp), span)
            }
            JumpTarget::Symbol(name) => {
                let disp = if self.second_pass {
                    self.symbol_disp(name)?
                } else {
                    self.symbol_used(name, span)?;
                    0
                };
                self.emit(pack(oc, pooled_mod, pc, b, c, disp), span)
            }
        }
    }

    fn load(&mut self, operand: &Operand, dst: u8, span: &Span) -> Result<()> {
        let pc = PC as u8;

        match operand {
            Operand::Immediate(literal) if self.use_short_form(*literal) => {
                self.emit(make_ld(LdMode::GPRGPR, dst, 0, 0, *literal), span)
            }
            Operand::Immediate(literal) => {
                let disp = if self.second_pass {
                    self.literal_disp(*literal, span)?
                } else {
                    self.current_mut(span)?.register_literal(*literal);
                    0
                };
                self.emit(make_ld(LdMode::GPRMEM, dst, pc, 0, disp), span)
            }
            Operand::SymbolValue(name) => {
                let disp = if self.second_pass {
                    self.symbol_disp(name)?
                } else {
                    self.symbol_used(name, span)?;
                    0
                };
                self.emit(make_ld(LdMode::GPRMEM, dst, pc, 0, disp), span)
            }
            Operand::MemLiteral(literal) if self.use_short_form(*literal) => {
                self.emit(make_ld(LdMode::GPRMEM, dst, 0, 0, *literal), span)
            }
            Operand::MemLiteral(literal) => {
                // two instructions: load the pooled address, then dereference
                let disp = if self.second_pass {
                    self.literal_disp(*literal, span)?
                } else {
                    self.current_mut(span)?.register_literal(*literal);
                    0
                };
                self.emit(make_ld(LdMode::GPRMEM, dst, pc, 0, disp), span)?;
                self.emit(make_ld(LdMode::GPRMEM, dst, dst, 0, 0), span)
            }
            Operand::MemSymbol(name) => {
                let disp = if self.second_pass {
                    self.symbol_disp(name)?
                } else {
                    self.symbol_used(name, span)?;
                    0
                };
                self.emit(make_ld(LdMode::GPRMEM, dst, pc, 0, disp), span)?;
                self.emit(make_ld(LdMode::GPRMEM, dst, dst, 0, 0), span)
            }
            Operand::RegDirect(reg) => self.emit(make_ld(LdMode::GPRGPR, dst, *reg, 0, 0), span),
            Operand::RegIndirect(reg) => {
                self.emit(make_ld(LdMode::GPRMEM, dst, *reg, 0, 0), span)
            }
            Operand::RegPlusLit(reg, literal) => {
                if !fits_displacement(*literal) {
                    return Err(new_parser_error(
                        span.clone(),
                        format!("offset {} does not fit 12 bits", literal),
                    ));
                }
                self.emit(make_ld(LdMode::GPRMEM, dst, *reg, 0, *literal), span)
            }
            Operand::RegPlusSym(_, name) => Err(new_parser_error(
                name.clone(),
                "symbol value is unknown at assembly time".to_owned(),
            )),
        }
    }

    fn store(&mut self, src: u8, operand: &Operand, span: &Span) -> Result<()> {
        let pc = PC as u8;

        match operand {
            Operand::Immediate(_) | Operand::SymbolValue(_) => Err(new_parser_error(
                span.clone(),
                "cannot store to an immediate".to_owned(),
            )),
            Operand::RegDirect(_) => Err(new_parser_error(
                span.clone(),
                "cannot store to a register value".to_owned(),
            )),
            Operand::MemLiteral(literal) if self.use_short_form(*literal) => {
                self.emit(make_st(StMode::DIR, 0, 0, src, *literal), span)
            }
            Operand::MemLiteral(literal) => {
                let disp = if self.second_pass {
                    self.literal_disp(*literal, span)?
                } else {
                    self.current_mut(span)?.register_literal(*literal);
                    0
                };
                self.emit(make_st(StMode::IND, pc, 0, src, disp), span)
            }
            Operand::MemSymbol(name) => {
                let disp = if self.second_pass {
                    self.symbol_disp(name)?
                } else {
                    self.symbol_used(name, span)?;
                    0
                };
                self.emit(make_st(StMode::IND, pc, 0, src, disp), span)
            }
            Operand::RegIndirect(reg) => self.emit(make_st(StMode::DIR, *reg, 0, src, 0), span),
            Operand::RegPlusLit(reg, literal) => {
                if !fits_displacement(*literal) {
                    return Err(new_parser_error(
                        span.clone(),
                        format!("offset {} does not fit 12 bits", literal),
                    ));
                }
                self.emit(make_st(StMode::DIR, *reg, 0, src, *literal), span)
            }
            Operand::RegPlusSym(_, name) => Err(new_parser_error(
                name.clone(),
                "symbol value is unknown at assembly time".to_owned(),
            )),
        }
    }

    // ----- shared plumbing -----

    fn current_mut(&mut self, span: &Span) -> Result<&mut Section> {
        match &mut self.current {
            Some(section) => Ok(section),
            None => Err(new_parser_error(
                span.clone(),
                "statement outside of a section".to_owned(),
            )),
        }
    }

    /// Emits one instruction word on the second pass and advances the
    /// location counter on both.
    fn emit(&mut self, bytes: [u8; 4], span: &Span) -> Result<()> {
        let second_pass = self.second_pass;
        let section = self.current_mut(span)?;
        if second_pass {
            section.emit(bytes);
        }
        self.advance(WORD_BYTES, span)
    }

    fn advance(&mut self, bytes: u32, span: &Span) -> Result<()> {
        match self.lc.checked_add(bytes) {
            Some(lc) => {
                self.lc = lc;
                Ok(())
            }
            None => Err(new_parser_error(
                span.clone(),
                "section exceeds the 32-bit address space".to_owned(),
            )),
        }
    }

    fn use_short_form(&self, literal: i32) -> bool {
        !self.options.pool_all_literals && fits_displacement(literal)
    }

    /// Pass one: record that this section refers to `name` through its pool.
    fn symbol_used(&mut self, name: &Span, span: &Span) -> Result<()> {
        self.current_mut(span)?.register_symbol(name.as_str());
        self.symbol_table
            .entry(name.as_str().to_owned())
            .or_insert_with(SymbolInfo::undefined);
        Ok(())
    }

    /// A symbol reference can be resolved if it is defined here or left to
    /// the linker as a global/external. Anything else never gets a value.
    fn check_resolvable(&self, name: &Span) -> Result<()> {
        let info = &self.symbol_table[name.as_str()];
        if !info.is_defined && !info.is_global {
            Err(new_parser_error(
                name.clone(),
                format!("symbol {} is not defined", name.as_str()),
            ))
        } else {
            Ok(())
        }
    }

    /// Pass two: PC-relative displacement from the next instruction to the
    /// pool slot holding `literal`.
    fn literal_disp(&self, literal: i32, span: &Span) -> Result<i32> {
        let section = self.current.as_ref().unwrap();
        let offset = section.literal_pool[&literal];
        self.pool_disp(offset, span)
    }

    fn symbol_disp(&self, name: &Span) -> Result<i32> {
        self.check_resolvable(name)?;
        let section = self.current.as_ref().unwrap();
        let offset = section.symbol_pool[name.as_str()];
        self.pool_disp(offset, name)
    }

    fn pool_disp(&self, offset: u32, span: &Span) -> Result<i32> {
        let disp = i64::from(offset) - i64::from(self.lc) - i64::from(WORD_BYTES);
        if disp < i64::from(DISP_MIN) || disp > i64::from(DISP_MAX) {
            Err(new_parser_error(
                span.clone(),
                "pool slot is out of PC-relative reach".to_owned(),
            ))
        } else {
            Ok(disp as i32)
        }
    }
}
