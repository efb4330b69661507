//! Drives the FCPU toolchain: assembles `.asm` sources into `.bin` listings
//! and boots listings on the virtual machine.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use fbin::Listing;
use fcpu::{Computer, ExitCode, ImageError};

#[derive(Debug)]
pub enum Error {
    Asm(fasm::Error),
    Io(io::Error, PathBuf),
    Image(ImageError),
    MissingFile(PathBuf),
    WrongExtension(PathBuf),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Asm(error) => write!(f, "{}", error),
            Error::Io(error, path) => write!(f, "file \"{}\": {}", path.display(), error),
            Error::Image(error) => write!(f, "{}", error),
            Error::MissingFile(path) => {
                write!(f, "file \"{}\" does not exist", path.display())
            }
            Error::WrongExtension(path) => write!(
                f,
                "wrong file format for \"{}\", expected \".asm\" or \".bin\"",
                path.display()
            ),
        }
    }
}

impl From<fasm::Error> for Error {
    fn from(error: fasm::Error) -> Error {
        Error::Asm(error)
    }
}

impl From<ImageError> for Error {
    fn from(error: ImageError) -> Error {
        Error::Image(error)
    }
}

/// Knobs for the run loop.
pub struct RunOptions {
    /// Target clock frequency in Hertz; zero runs unthrottled.
    pub clock_hz: u32,
    /// Safety cap on executed cycles.
    pub max_cycles: Option<u64>,
    /// Print a line per CPU phase while running.
    pub trace: bool,
}

impl Default for RunOptions {
    fn default() -> RunOptions {
        RunOptions {
            clock_hz: 0,
            max_cycles: None,
            trace: false,
        }
    }
}

/// Assembles a source file and writes the listing as `<input>.bin`, either
/// beside the input or under `output_dir`. Returns the listing path.
pub fn assemble_file(input: &Path, output_dir: Option<&Path>) -> Result<PathBuf, Error> {
    let source =
        fs::read_to_string(input).map_err(|error| Error::Io(error, input.to_owned()))?;
    let listing = fasm::assemble(&source)?;

    let sibling = input.with_extension("bin");
    let output_path = match (output_dir, sibling.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => sibling,
    };

    fbin::write_file(&output_path, &listing)
        .map_err(|error| Error::Io(error, output_path.clone()))?;
    Ok(output_path)
}

/// Boots a listing on a fresh machine and runs it to completion.
pub fn run_listing(listing: &Listing, options: &RunOptions) -> Result<(Computer, ExitCode), Error> {
    let mut computer = Computer::new();
    computer.set_clock_hz(options.clock_hz);
    computer.set_max_cycles(options.max_cycles);
    computer.load_image(listing.bytes())?;

    if options.trace {
        computer.cpu_mut().on_phase(|phase, snapshot| {
            eprintln!(
                "[{}] pc={} ir={} ar={} acc={} sr={}",
                phase,
                snapshot.program_counter,
                snapshot.instruction_register,
                snapshot.address_register,
                snapshot.accumulator,
                snapshot.status,
            );
        });
    }

    let exit_code = computer.run();
    Ok((computer, exit_code))
}

/// Reads a `.bin` listing and runs it.
pub fn run_file(path: &Path, options: &RunOptions) -> Result<(Computer, ExitCode), Error> {
    let listing = fbin::read_file(path).map_err(|error| Error::Io(error, path.to_owned()))?;
    run_listing(&listing, options)
}
