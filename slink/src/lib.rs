//! Linker core: merges same-named sections from several object modules,
//! resolves symbols, rewrites relocated words in place and produces the
//! absolute memory image.
//!
//! Placement runs in two phases. Explicit placements are honoured in
//! ascending address order; for each placed section name, every module's
//! contribution is appended in module order. Whatever remains is then laid
//! out from the running end, in module order and module-internal section
//! order. Every input section keeps its own content and final location, so
//! relocations always patch the module that emitted them.

use byteorder::ByteOrder;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fmt;
use util::Endian;

#[derive(Debug)]
pub enum Error {
    DuplicateSymbol(String),
    UndefinedSymbol(String),
    MissingSection { symbol: String, section: String },
    UnknownRelocation { section: String, name: String },
    BadRelocation { section: String, offset: u32 },
    PlacementOverlap { section: String, address: u32 },
    AddressSpaceExhausted { section: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::DuplicateSymbol(name) => {
                write!(f, "symbol {} defined in multiple modules", name)
            }
            Error::UndefinedSymbol(name) => write!(f, "symbol {} was never defined", name),
            Error::MissingSection { symbol, section } => write!(
                f,
                "symbol {} refers to section {} which its module does not contain",
                symbol, section
            ),
            Error::UnknownRelocation { section, name } => write!(
                f,
                "relocation in section {} against unknown name {}",
                section, name
            ),
            Error::BadRelocation { section, offset } => write!(
                f,
                "relocation at offset {} lies outside section {}",
                offset, section
            ),
            Error::PlacementOverlap { section, address } => write!(
                f,
                "section {} cannot be placed at 0x{:x}: it overlaps an earlier placement",
                section, address
            ),
            Error::AddressSpaceExhausted { section } => write!(
                f,
                "section {} does not fit below the end of the address space",
                section
            ),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

struct LinkSymbol {
    value: u32,
    is_defined: bool,
    section: Option<String>,
    file: String,
}

struct InputSection {
    data: sobj::Section,
    location: u32,
    placed: bool,
}

pub struct Linker {
    lc: u64,
    files: Vec<String>,
    sections: IndexMap<String, Vec<InputSection>>,
    symbol_table: IndexMap<String, LinkSymbol>,
}

/// Links `objects` (in input order, each tagged with its module name) under
/// the given `address -> section` placement map and returns the image blocks.
pub fn link(
    objects: Vec<(String, sobj::ObjectFile)>,
    placements: &BTreeMap<u32, String>,
) -> Result<BTreeMap<u32, Vec<u8>>> {
    let mut linker = Linker::new();
    for (file, object) in objects {
        linker.add_object(file, object)?;
    }
    linker.check_undefined_symbols()?;
    linker.place_sections(placements)?;
    linker.update_symbols()?;
    linker.relocate()?;
    Ok(linker.into_image())
}

impl Linker {
    pub fn new() -> Linker {
        Linker {
            lc: 0,
            files: Vec::new(),
            sections: IndexMap::new(),
            symbol_table: IndexMap::new(),
        }
    }

    pub fn add_object(&mut self, file: String, object: sobj::ObjectFile) -> Result<()> {
        for symbol in object.symbols {
            self.add_symbol(&file, symbol)?;
        }

        let mut input_sections = Vec::new();
        for mut section in object.sections {
            // tolerate modules that leave trailing reserved bytes implicit
            let length = section.length as usize;
            if section.content.len() < length {
                section.content.resize(length, 0);
            }
            input_sections.push(InputSection {
                data: section,
                location: 0,
                placed: false,
            });
        }

        self.files.push(file.clone());
        self.sections.insert(file, input_sections);
        Ok(())
    }

    /// Defined beats undefined; two definitions of one name are fatal.
    fn add_symbol(&mut self, file: &str, symbol: sobj::Symbol) -> Result<()> {
        let incoming = LinkSymbol {
            value: symbol.value,
            is_defined: symbol.is_defined,
            section: symbol.section,
            file: file.to_owned(),
        };

        match self.symbol_table.get_mut(&symbol.name) {
            Some(existing) => {
                if existing.is_defined && incoming.is_defined {
                    return Err(Error::DuplicateSymbol(symbol.name));
                }
                if incoming.is_defined {
                    *existing = incoming;
                }
            }
            None => {
                self.symbol_table.insert(symbol.name, incoming);
            }
        }
        Ok(())
    }

    pub fn check_undefined_symbols(&self) -> Result<()> {
        for (name, symbol) in &self.symbol_table {
            if !symbol.is_defined {
                return Err(Error::UndefinedSymbol(name.clone()));
            }
        }
        Ok(())
    }

    pub fn place_sections(&mut self, placements: &BTreeMap<u32, String>) -> Result<()> {
        for (&address, name) in placements {
            if self.lc > u64::from(address) {
                return Err(Error::PlacementOverlap {
                    section: name.clone(),
                    address,
                });
            }
            self.lc = u64::from(address);

            for file in self.files.clone() {
                self.place_in_file(&file, Some(name.as_str()))?;
            }
        }

        for file in self.files.clone() {
            self.place_in_file(&file, None)?;
        }
        Ok(())
    }

    /// Places this module's sections at the running location counter: the one
    /// named `filter`, or every section still unplaced when `filter` is
    /// `None`.
    fn place_in_file(&mut self, file: &str, filter: Option<&str>) -> Result<()> {
        let mut lc = self.lc;
        for section in self.sections.get_mut(file).unwrap() {
            if section.placed {
                continue;
            }
            if let Some(name) = filter {
                if section.data.name != name {
                    continue;
                }
            }

            if lc + u64::from(section.data.length) > 0xFFFF_FFFF {
                return Err(Error::AddressSpaceExhausted {
                    section: section.data.name.clone(),
                });
            }

            section.location = lc as u32;
            section.placed = true;
            lc += u64::from(section.data.length);
        }
        self.lc = lc;
        Ok(())
    }

    /// Turns every defined symbol's section offset into an absolute address.
    pub fn update_symbols(&mut self) -> Result<()> {
        for (name, symbol) in &mut self.symbol_table {
            let section_name = match &symbol.section {
                Some(section) => section,
                None => {
                    return Err(Error::MissingSection {
                        symbol: name.clone(),
                        section: "UND".to_owned(),
                    })
                }
            };

            let section = self
                .sections
                .get(&symbol.file)
                .and_then(|sections| {
                    sections
                        .iter()
                        .find(|section| &section.data.name == section_name)
                })
                .ok_or_else(|| Error::MissingSection {
                    symbol: name.clone(),
                    section: section_name.clone(),
                })?;

            symbol.value = symbol.value.wrapping_add(section.location);
        }
        Ok(())
    }

    /// Rewrites every relocated word. A name found in the symbol table
    /// resolves to that symbol's absolute address; otherwise it names a
    /// section, and resolves to that section's location *as contributed by
    /// the same module* plus the addend.
    pub fn relocate(&mut self) -> Result<()> {
        for file in &self.files {
            let file_sections = &self.sections[file.as_str()];

            let mut patches = Vec::new();
            for (index, section) in file_sections.iter().enumerate() {
                for relocation in &section.data.relocations {
                    let value = match self.symbol_table.get(&relocation.name) {
                        Some(symbol) => symbol.value,
                        None => {
                            let named = file_sections
                                .iter()
                                .find(|candidate| candidate.data.name == relocation.name)
                                .ok_or_else(|| Error::UnknownRelocation {
                                    section: section.data.name.clone(),
                                    name: relocation.name.clone(),
                                })?;
                            named.location.wrapping_add(relocation.addend as u32)
                        }
                    };

                    let end = relocation.offset as usize + 4;
                    if end > section.data.content.len() {
                        return Err(Error::BadRelocation {
                            section: section.data.name.clone(),
                            offset: relocation.offset,
                        });
                    }
                    patches.push((index, relocation.offset as usize, value));
                }
            }

            let file_sections = self.sections.get_mut(file.as_str()).unwrap();
            for (index, offset, value) in patches {
                let content = &mut file_sections[index].data.content;
                Endian::write_u32(&mut content[offset..offset + 4], value);
            }
        }
        Ok(())
    }

    pub fn into_image(self) -> BTreeMap<u32, Vec<u8>> {
        let mut blocks = BTreeMap::new();
        for (_, sections) in self.sections {
            for section in sections {
                if section.placed && !section.data.content.is_empty() {
                    blocks.insert(section.location, section.data.content);
                }
            }
        }
        blocks
    }
}

impl Default for Linker {
    fn default() -> Linker {
        Linker::new()
    }
}

#[cfg(test)]
mod test;
