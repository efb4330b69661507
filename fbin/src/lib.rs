//! The binary listing format produced by the assembler and consumed by the
//! virtual machine: ASCII text, one 8-digit binary string per line, one line
//! per memory cell, with no trailing newline after the last line.

use std::fs::File;
use std::io::prelude::*;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

/// An in-memory listing: one byte per line of the on-disk form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Listing {
    bytes: Vec<u8>,
}

impl Listing {
    pub fn from(bytes: Vec<u8>) -> Listing {
        Listing { bytes }
    }

    pub fn copy_from(bytes: &[u8]) -> Listing {
        Listing {
            bytes: Vec::from(bytes),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..]
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The on-disk lines, without newlines.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.bytes.iter().map(|byte| format!("{:08b}", byte))
    }
}

fn invalid_line(index: usize, line: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!(
            "line {} is not an 8-bit binary string: \"{}\"",
            index + 1,
            line
        ),
    )
}

fn parse_line(index: usize, line: &str) -> io::Result<u8> {
    if line.len() != 8 || !line.bytes().all(|b| b == b'0' || b == b'1') {
        return Err(invalid_line(index, line));
    }
    u8::from_str_radix(line, 2).map_err(|_| invalid_line(index, line))
}

pub fn read<R: Read>(reader: &mut R) -> io::Result<Listing> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    let mut bytes = Vec::new();
    for (index, line) in text.lines().enumerate() {
        bytes.push(parse_line(index, line.trim_end_matches('\r'))?);
    }

    Ok(Listing::from(bytes))
}

pub fn write<W: Write>(writer: &mut W, listing: &Listing) -> io::Result<()> {
    for (index, line) in listing.lines().enumerate() {
        if index > 0 {
            writer.write_all(b"\n")?;
        }
        writer.write_all(line.as_bytes())?;
    }
    Ok(())
}

pub trait ReadListingExt: Read + Sized {
    fn read_listing(&mut self) -> io::Result<Listing> {
        read(self)
    }
}

impl<R: Read + Sized> ReadListingExt for R {}

pub trait WriteListingExt: Write + Sized {
    fn write_listing(&mut self, listing: &Listing) -> io::Result<()> {
        write(self, listing)
    }
}

impl<W: Write + Sized> WriteListingExt for W {}

pub fn read_file<P: AsRef<Path>>(path: P) -> io::Result<Listing> {
    BufReader::new(File::open(path)?).read_listing()
}

pub fn write_file<P: AsRef<Path>>(path: P, listing: &Listing) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_listing(listing)?;
    writer.flush()
}
