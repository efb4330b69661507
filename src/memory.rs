use std::error::Error as StdError;
use std::fmt;

use crate::bits::{Bits, Selector};
use crate::constants::BYTE_WIDTH;

/// A storage cell gated by read and write enable signals.
///
/// Reads return zero while the read enable is clear, and writes are ignored
/// while the write enable is clear. The enables are transient control signals;
/// the CPU clears them with its bus flush after every phase. Written values
/// are truncated to the cell width.
///
/// # Examples
/// ```
/// use fcpu::{Bits, Register};
///
/// let mut register = Register::new(8);
/// register.write(Bits::byte(7));
/// assert_eq!(register.peek().to_int(), 0);
///
/// register.set_write_enable(true);
/// register.write(Bits::byte(7));
/// assert_eq!(register.read().to_int(), 0);
///
/// register.set_read_enable(true);
/// assert_eq!(register.read().to_int(), 7);
/// ```
pub struct Register {
    memory: Bits,
    read_enable: bool,
    write_enable: bool,
}

impl Register {
    pub fn new(width: u32) -> Register {
        Register {
            memory: Bits::new(width),
            read_enable: false,
            write_enable: false,
        }
    }

    /// Reads through the gate: zero unless the read enable is set.
    pub fn read(&self) -> Bits {
        if self.read_enable {
            self.memory
        } else {
            Bits::new(self.memory.width())
        }
    }

    /// Writes through the gate: ignored unless the write enable is set.
    pub fn write(&mut self, value: Bits) {
        if self.write_enable {
            self.memory = Bits::from_int(value.to_int(), self.memory.width());
        }
    }

    /// Reads the cell contents regardless of the gate. Debug access only;
    /// the CPU itself always goes through [`read`](#method.read).
    pub fn peek(&self) -> Bits {
        self.memory
    }

    pub fn read_enable(&self) -> bool {
        self.read_enable
    }

    pub fn write_enable(&self) -> bool {
        self.write_enable
    }

    pub fn set_read_enable(&mut self, enabled: bool) {
        self.read_enable = enabled;
    }

    pub fn set_write_enable(&mut self, enabled: bool) {
        self.write_enable = enabled;
    }

    pub fn clear_enables(&mut self) {
        self.read_enable = false;
        self.write_enable = false;
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.memory, self.memory.to_int())
    }
}

/// Error returned when a memory image does not match the RAM shape.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ImageError {
    WrongLength { expected: usize, actual: usize },
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ImageError::WrongLength { expected, actual } => write!(
                f,
                "image of {} bytes does not fit a memory of {} bytes",
                actual, expected
            ),
        }
    }
}

impl StdError for ImageError {}

/// Random access memory: an ordered bank of byte cells behind an address
/// register and a gated bus.
///
/// Bus reads return the cell picked by the address while the read enable is
/// set, and zero otherwise; bus writes commit to the addressed cell only
/// while the write enable is set.
///
/// # Examples
/// ```
/// use fcpu::{Bits, Ram};
///
/// let mut ram = Ram::new(8);
/// ram.set_address(Bits::from_int(7, 3));
/// ram.set_write_enable(true);
/// ram.set_bus(Bits::byte(42));
/// ram.clear_enables();
///
/// assert_eq!(ram.bus().to_int(), 0);
/// ram.set_read_enable(true);
/// assert_eq!(ram.bus().to_int(), 42);
/// ```
pub struct Ram {
    cells: Vec<Bits>,
    address: Bits,
    read_enable: bool,
    write_enable: bool,
    selector: Selector,
}

fn address_width(size: usize) -> u32 {
    let mut width = 1;
    while (1usize << width) < size {
        width += 1;
    }
    width
}

impl Ram {
    pub fn new(size: usize) -> Ram {
        let width = address_width(size);
        Ram {
            cells: vec![Bits::new(BYTE_WIDTH); size],
            address: Bits::new(width),
            read_enable: false,
            write_enable: false,
            selector: Selector::new(width),
        }
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn address(&self) -> Bits {
        self.address
    }

    pub fn set_address(&mut self, value: Bits) {
        self.address = Bits::from_int(value.to_int(), self.address.width());
    }

    pub fn read_enable(&self) -> bool {
        self.read_enable
    }

    pub fn write_enable(&self) -> bool {
        self.write_enable
    }

    pub fn set_read_enable(&mut self, enabled: bool) {
        self.read_enable = enabled;
    }

    pub fn set_write_enable(&mut self, enabled: bool) {
        self.write_enable = enabled;
    }

    pub fn clear_enables(&mut self) {
        self.read_enable = false;
        self.write_enable = false;
    }

    /// Reads the bus: the addressed cell while read-enabled, zero otherwise.
    pub fn bus(&mut self) -> Bits {
        if self.read_enable {
            self.selector.set_selection(self.address);
            self.selector
                .select(&self.cells)
                .copied()
                .unwrap_or_else(|| Bits::new(BYTE_WIDTH))
        } else {
            Bits::new(BYTE_WIDTH)
        }
    }

    /// Drives the bus: commits to the addressed cell while write-enabled.
    pub fn set_bus(&mut self, value: Bits) {
        if self.write_enable {
            self.selector.set_selection(self.address);
            if let Some(cell) = self.selector.select_mut(&mut self.cells) {
                *cell = Bits::from_int(value.to_int(), BYTE_WIDTH);
            }
        }
    }

    /// Replaces the whole memory with `image`, which must hold exactly one
    /// byte per cell.
    pub fn load_image(&mut self, image: &[u8]) -> Result<(), ImageError> {
        if image.len() != self.cells.len() {
            return Err(ImageError::WrongLength {
                expected: self.cells.len(),
                actual: image.len(),
            });
        }

        self.cells = image.iter().map(|&byte| Bits::byte(byte)).collect();
        Ok(())
    }

    /// Debug read of a single cell, bypassing the bus.
    pub fn cell(&self, index: usize) -> Option<Bits> {
        self.cells.get(index).copied()
    }
}

impl fmt::Display for Ram {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (index, byte) in self.cells.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{:03}: {}", index, byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn register_read_is_gated() {
        let mut register = Register::new(8);
        register.set_write_enable(true);
        register.write(Bits::byte(9));

        assert_eq!(register.read(), Bits::byte(0));
        register.set_read_enable(true);
        assert_eq!(register.read(), Bits::byte(9));
    }

    #[test]
    fn register_write_is_gated() {
        let mut register = Register::new(8);
        register.write(Bits::byte(9));
        assert_eq!(register.peek(), Bits::byte(0));
    }

    #[test]
    fn register_write_truncates_to_width() {
        let mut register = Register::new(8);
        register.set_write_enable(true);
        register.write(Bits::from_int(256, 9));
        assert_eq!(register.peek(), Bits::byte(0));
    }

    #[test]
    fn register_clear_enables_resets_both_gates() {
        let mut register = Register::new(8);
        register.set_read_enable(true);
        register.set_write_enable(true);
        register.clear_enables();
        assert!(!register.read_enable());
        assert!(!register.write_enable());
    }

    #[test]
    fn ram_address_width_covers_all_cells() {
        assert_eq!(Ram::new(256).address().width(), 8);
        assert_eq!(Ram::new(8).address().width(), 3);
        assert_eq!(Ram::new(2).address().width(), 1);
    }

    #[test]
    fn ram_bus_round_trip() {
        let mut ram = Ram::new(16);
        ram.set_address(Bits::from_int(3, 4));
        ram.set_write_enable(true);
        ram.set_bus(Bits::byte(77));
        ram.clear_enables();

        ram.set_address(Bits::from_int(3, 4));
        ram.set_read_enable(true);
        assert_eq!(ram.bus(), Bits::byte(77));
    }

    #[test]
    fn ram_bus_reads_zero_without_enable() {
        let mut ram = Ram::new(16);
        ram.set_address(Bits::from_int(3, 4));
        assert_eq!(ram.bus(), Bits::byte(0));
    }

    #[test]
    fn ram_ignores_writes_without_enable() {
        let mut ram = Ram::new(16);
        ram.set_address(Bits::from_int(3, 4));
        ram.set_bus(Bits::byte(77));
        assert_eq!(ram.cell(3), Some(Bits::byte(0)));
    }

    #[test]
    fn load_image_requires_exact_length() {
        let mut ram = Ram::new(4);
        assert_eq!(
            ram.load_image(&[1, 2, 3]),
            Err(ImageError::WrongLength {
                expected: 4,
                actual: 3
            })
        );

        assert_eq!(ram.load_image(&[1, 2, 3, 4]), Ok(()));
        assert_eq!(ram.cell(0), Some(Bits::byte(1)));
        assert_eq!(ram.cell(3), Some(Bits::byte(4)));
    }
}
