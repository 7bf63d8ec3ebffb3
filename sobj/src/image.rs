//! The textual memory image emitted by the linker and loaded by the emulator.
//!
//! Every line is a start address followed by up to eight data bytes:
//!
//! ```text
//! 40000000: 92 10 00 08 00 00 00 00
//! 40000008: 78 56 34 12
//! ```
//!
//! Contiguous blocks continue the eight-byte grouping; a gap restarts the
//! line with the new address. Readers tolerate any number of bytes per line.

use super::{Error, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

const BYTES_PER_LINE: usize = 8;

pub fn write<W: Write>(writer: &mut W, blocks: &BTreeMap<u32, Vec<u8>>) -> io::Result<()> {
    let mut location = 0u32;
    let mut count = 0;
    let mut first = true;

    for (&start, bytes) in blocks {
        if first || location != start {
            location = start;
            count = 0;
            if !first {
                writeln!(writer)?;
            }
            first = false;
            write!(writer, "{:04x}:", location)?;
        }

        for &byte in bytes {
            if count == BYTES_PER_LINE {
                writeln!(writer)?;
                count = 0;
                write!(writer, "{:04x}:", location)?;
            }
            write!(writer, " {:02x}", byte)?;
            location = location.wrapping_add(1);
            count += 1;
        }
    }

    if !first {
        writeln!(writer)?;
    }
    Ok(())
}

pub fn read<R: Read>(reader: R) -> Result<Vec<(u32, Vec<u8>)>> {
    let mut blocks = Vec::new();

    for (index, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        let mut tokens = line.split_whitespace();

        let address = match tokens.next() {
            None => continue,
            Some(token) => {
                let digits = token.trim_end_matches(':');
                if digits.len() == token.len() {
                    return Err(Error::Parse {
                        line: index + 1,
                        message: format!("expected \"<address>:\", found \"{}\"", token),
                    });
                }
                u32::from_str_radix(digits, 16).map_err(|err| Error::Parse {
                    line: index + 1,
                    message: format!("bad address \"{}\": {}", token, err),
                })?
            }
        };

        let mut bytes = Vec::new();
        for token in tokens {
            bytes.push(
                u8::from_str_radix(token, 16).map_err(|err| Error::Parse {
                    line: index + 1,
                    message: format!("bad byte \"{}\": {}", token, err),
                })?,
            );
        }
        blocks.push((address, bytes));
    }

    Ok(blocks)
}

pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<(u32, Vec<u8>)>> {
    read(File::open(path)?)
}

pub fn write_file<P: AsRef<Path>>(path: P, blocks: &BTreeMap<u32, Vec<u8>>) -> io::Result<()> {
    write(&mut BufWriter::new(File::create(path)?), blocks)
}
