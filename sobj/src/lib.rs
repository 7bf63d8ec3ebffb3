//! The file contracts shared by the toolchain: the relocatable object-module
//! format produced by the assembler and consumed by the linker, and (in
//! [`image`](image/index.html)) the textual memory image produced by the
//! linker and consumed by the emulator.
//!
//! An object module is a line-oriented text stream: a record per section,
//! then the symbol-table record.
//!
//! ```text
//! <section-name>
//! <decimal length>
//! <hex bytes, space-separated, whole content on one line>
//! <reloc-offset> <reloc-addend> <symbol-or-section-name>
//! ...
//! ---
//! <section-name>
//! ...
//! Symbol table:
//! <name> <value> <0|1 defined> <section-name-or-UND>
//! ...
//! ```
//!
//! Only global symbols appear in the symbol-table record; local labels reach
//! the linker indirectly, as relocations whose name field carries the
//! defining section's name.

pub mod image;

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Lines, Read, Write};
use std::path::Path;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Parse { line: usize, message: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "{}", err),
            Error::Parse { line, message } => write!(f, "line {}: {}", line, message),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// One linker fixup: write the resolved value of `name` (plus `addend`) at
/// `offset` within the owning section.
///
/// `name` is either a global symbol or, for references to local labels, the
/// name of the label's defining section with the label's section offset as
/// the addend. The wire format does not distinguish the two; the linker
/// resolves through its symbol table first and falls back to sections.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relocation {
    pub offset: u32,
    pub addend: i32,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub length: u32,
    pub content: Vec<u8>,
    pub relocations: Vec<Relocation>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub value: u32,
    pub is_defined: bool,
    /// `None` for symbols imported from another module (`UND` on the wire).
    pub section: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct ObjectFile {
    pub sections: Vec<Section>,
    pub symbols: Vec<Symbol>,
}

const SECTION_TERMINATOR: &str = "---";
const SYMBOL_TABLE_HEADER: &str = "Symbol table:";
const UNDEFINED_SECTION: &str = "UND";

pub fn write<W: Write>(writer: &mut W, object: &ObjectFile) -> io::Result<()> {
    for section in &object.sections {
        writeln!(writer, "{}", section.name)?;
        writeln!(writer, "{}", section.length)?;

        let bytes: Vec<String> = section
            .content
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect();
        writeln!(writer, "{}", bytes.join(" "))?;

        for relocation in &section.relocations {
            writeln!(
                writer,
                "{} {} {}",
                relocation.offset, relocation.addend, relocation.name
            )?;
        }
        writeln!(writer, "{}", SECTION_TERMINATOR)?;
    }

    writeln!(writer, "{}", SYMBOL_TABLE_HEADER)?;
    for symbol in &object.symbols {
        writeln!(
            writer,
            "{} {} {} {}",
            symbol.name,
            symbol.value,
            symbol.is_defined as u32,
            symbol.section.as_deref().unwrap_or(UNDEFINED_SECTION)
        )?;
    }
    Ok(())
}

struct LineSource<R: Read> {
    lines: Lines<BufReader<R>>,
    line: usize,
}

impl<R: Read> LineSource<R> {
    fn new(reader: R) -> LineSource<R> {
        LineSource {
            lines: BufReader::new(reader).lines(),
            line: 0,
        }
    }

    fn next(&mut self) -> Result<Option<String>> {
        self.line += 1;
        match self.lines.next() {
            Some(line) => Ok(Some(line?)),
            None => Ok(None),
        }
    }

    fn expect(&mut self, what: &str) -> Result<String> {
        match self.next()? {
            Some(line) => Ok(line),
            None => Err(self.error(format!("unexpected end of file, expected {}", what))),
        }
    }

    fn error(&self, message: String) -> Error {
        Error::Parse {
            line: self.line,
            message,
        }
    }
}

fn parse_u32<R: Read>(source: &LineSource<R>, text: &str, radix: u32) -> Result<u32> {
    u32::from_str_radix(text, radix)
        .map_err(|err| source.error(format!("bad number \"{}\": {}", text, err)))
}

pub fn read<R: Read>(reader: R) -> Result<ObjectFile> {
    let mut source = LineSource::new(reader);
    let mut object = ObjectFile::default();

    loop {
        let name = match source.next()? {
            None => return Err(source.error("missing symbol table".to_owned())),
            Some(line) => {
                if line == SYMBOL_TABLE_HEADER {
                    break;
                }
                line
            }
        };

        let length = source.expect("section length")?;
        let length = parse_u32(&source, length.trim(), 10)?;

        let mut content = Vec::new();
        for token in source.expect("section content")?.split_whitespace() {
            content.push(parse_u32(&source, token, 16)? as u8);
        }

        let mut relocations = Vec::new();
        loop {
            let line = source.expect("relocation record")?;
            if line == SECTION_TERMINATOR {
                break;
            }

            let mut tokens = line.split_whitespace();
            let (offset, addend, symbol) = match (tokens.next(), tokens.next(), tokens.next()) {
                (Some(offset), Some(addend), Some(symbol)) => (offset, addend, symbol),
                _ => return Err(source.error(format!("malformed relocation \"{}\"", line))),
            };

            relocations.push(Relocation {
                offset: parse_u32(&source, offset, 10)?,
                addend: addend
                    .parse()
                    .map_err(|err| source.error(format!("bad addend \"{}\": {}", addend, err)))?,
                name: symbol.to_owned(),
            });
        }

        object.sections.push(Section {
            name,
            length,
            content,
            relocations,
        });
    }

    while let Some(line) = source.next()? {
        if line.trim().is_empty() {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let (name, value, defined, section) =
            match (tokens.next(), tokens.next(), tokens.next(), tokens.next()) {
                (Some(name), Some(value), Some(defined), Some(section)) => {
                    (name, value, defined, section)
                }
                _ => return Err(source.error(format!("malformed symbol \"{}\"", line))),
            };

        object.symbols.push(Symbol {
            name: name.to_owned(),
            value: parse_u32(&source, value, 10)?,
            is_defined: defined == "1",
            section: if section == UNDEFINED_SECTION {
                None
            } else {
                Some(section.to_owned())
            },
        });
    }

    Ok(object)
}

pub trait ReadObjExt: Read + Sized {
    fn read_obj(self) -> Result<ObjectFile> {
        read(self)
    }
}

impl<R: Read + Sized> ReadObjExt for R {}

pub trait WriteObjExt: Write + Sized {
    fn write_obj(&mut self, object: &ObjectFile) -> io::Result<()> {
        write(self, object)
    }
}

impl<W: Write + Sized> WriteObjExt for W {}

pub fn read_file<P: AsRef<Path>>(path: P) -> Result<ObjectFile> {
    File::open(path)?.read_obj()
}

pub fn write_file<P: AsRef<Path>>(path: P, object: &ObjectFile) -> io::Result<()> {
    BufWriter::new(File::create(path)?).write_obj(object)
}
