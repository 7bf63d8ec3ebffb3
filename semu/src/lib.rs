//! Emulator front end.
//!
//! Loads the textual memory image produced by the linker into a fresh
//! [`Processor`](../scpu/struct.Processor.html), runs it until `halt` and
//! hands the final machine state back to the caller.

use scpu::Processor;
use std::fmt;
use std::path::Path;

#[derive(Debug)]
pub enum Error {
    Image(sobj::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Image(err) => write!(f, "loading image failed: {}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<sobj::Error> for Error {
    fn from(err: sobj::Error) -> Error {
        Error::Image(err)
    }
}

/// Copies image blocks into the processor's memory.
pub fn load_image(processor: &mut Processor, blocks: &[(u32, Vec<u8>)]) {
    for (address, bytes) in blocks {
        processor.memory_mut().load(*address, bytes);
    }
}

/// Runs an already-loaded processor to `halt` and returns it.
pub fn run_blocks(blocks: &[(u32, Vec<u8>)]) -> Processor {
    let mut processor = Processor::new();
    load_image(&mut processor, blocks);
    processor.run();
    processor
}

/// Loads the image file at `path` and runs it to `halt`.
pub fn run_file<P: AsRef<Path>>(path: P) -> Result<Processor, Error> {
    let blocks = sobj::image::read_file(path)?;
    Ok(run_blocks(&blocks))
}

#[cfg(test)]
mod test;
