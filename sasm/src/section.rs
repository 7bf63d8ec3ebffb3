use byteorder::ByteOrder;
use indexmap::IndexMap;
use scpu::constants::WORD_BYTES;
use util::Endian;

/// A section being assembled.
///
/// During pass one only `length` and the pools are maintained; pass two fills
/// `content` and `relocations`. The pools are insertion-ordered, and each
/// entry's offset is assigned exactly once, when the section is closed at the
/// end of pass one — pass two only reads them back.
pub struct Section {
    pub name: String,
    pub content: Vec<u8>,
    pub literal_pool: IndexMap<i32, u32>,
    pub symbol_pool: IndexMap<String, u32>,
    pub relocations: Vec<sobj::Relocation>,
    pub length: u32,
}

impl Section {
    pub fn new(name: &str) -> Section {
        Section {
            name: name.to_owned(),
            content: Vec::new(),
            literal_pool: IndexMap::new(),
            symbol_pool: IndexMap::new(),
            relocations: Vec::new(),
            length: 0,
        }
    }

    /// Interns a literal that will live in this section's pool. The offset is
    /// a placeholder until [`allocate_pools`](#method.allocate_pools) runs.
    pub fn register_literal(&mut self, literal: i32) {
        self.literal_pool.entry(literal).or_insert(0);
    }

    pub fn register_symbol(&mut self, name: &str) {
        if !self.symbol_pool.contains_key(name) {
            self.symbol_pool.insert(name.to_owned(), 0);
        }
    }

    /// Lays the pools out after the last directive-emitted byte: literals
    /// first, then symbol slots, four bytes each. Fixes `length` for good.
    pub fn allocate_pools(&mut self) {
        for offset in self.literal_pool.values_mut() {
            *offset = self.length;
            self.length += WORD_BYTES;
        }
        for offset in self.symbol_pool.values_mut() {
            *offset = self.length;
            self.length += WORD_BYTES;
        }
    }

    /// Zero-fills the pool area and materialises the pooled literals. Symbol
    /// slots stay zero; the linker patches them through relocations.
    pub fn write_literals(&mut self) {
        self.content.resize(self.length as usize, 0);
        for (&literal, &offset) in &self.literal_pool {
            let offset = offset as usize;
            Endian::write_i32(&mut self.content[offset..offset + 4], literal);
        }
    }

    pub fn emit(&mut self, bytes: [u8; 4]) {
        self.content.extend_from_slice(&bytes);
    }

    pub fn write_word(&mut self, value: u32) {
        let mut bytes = [0u8; 4];
        Endian::write_u32(&mut bytes, value);
        self.emit(bytes);
    }
}
