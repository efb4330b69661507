use num_derive::{FromPrimitive, ToPrimitive};

use crate::bits::Bits;
use crate::constants::BYTE_WIDTH;

/// Functions the ALU can compute, in opcode order.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum AluFunct {
    //  Funct | Effect
    //--------+------------------------------------------------
    ADD, // | output = A + B; carry = overflowing bits
    SUB, // | output = A - B; negative set on borrow
    NOT, // | output = ~A
    INC, // | output = A + 1
    DEC, // | output = A - 1; negative set on borrow
    OR,  // | output = A | B
    AND, // | output = A & B
    XOR, // | output = A ^ B
}

/// Combinational arithmetic/logic unit.
///
/// Selecting a funct with [`set_funct`] immediately recomputes the output and
/// flags from the current A and B inputs. The zero flag is not stored; it is
/// derived on read as `A - B == 0`. Writing either input clears the negative
/// flag, the carry keeps the value of the last addition.
///
/// [`set_funct`]: ./struct.Alu.html#method.set_funct
pub struct Alu {
    a: Bits,
    b: Bits,
    output: Bits,
    carry: u32,
    negative: bool,
}

impl Alu {
    pub fn new() -> Alu {
        Alu {
            a: Bits::new(BYTE_WIDTH),
            b: Bits::new(BYTE_WIDTH),
            output: Bits::new(BYTE_WIDTH),
            carry: 0,
            negative: false,
        }
    }

    pub fn a(&self) -> Bits {
        self.a
    }

    pub fn b(&self) -> Bits {
        self.b
    }

    pub fn output(&self) -> Bits {
        self.output
    }

    /// Number of bits the last addition overflowed the byte width by.
    pub fn carry(&self) -> u32 {
        self.carry
    }

    pub fn negative(&self) -> bool {
        self.negative
    }

    /// Derived zero flag: set when `A - B == 0`.
    pub fn zero(&self) -> bool {
        self.a == self.b
    }

    pub fn set_a(&mut self, value: Bits) {
        self.negative = false;
        self.a = value;
    }

    pub fn set_b(&mut self, value: Bits) {
        self.negative = false;
        self.b = value;
    }

    /// Selects a function and recomputes output and flags.
    pub fn set_funct(&mut self, funct: AluFunct) {
        let one = Bits::from_int(1, BYTE_WIDTH);

        match funct {
            AluFunct::ADD => {
                let (output, carry) = self.a.add(self.b);
                self.output = output;
                self.carry = carry;
            }
            AluFunct::SUB => {
                let (output, borrow) = self.a.sub(self.b);
                self.output = output;
                if borrow {
                    self.negative = true;
                }
            }
            AluFunct::NOT => {
                self.output = !self.a;
            }
            AluFunct::INC => {
                let (output, _) = self.a.add(one);
                self.output = output;
            }
            AluFunct::DEC => {
                let (output, borrow) = self.a.sub(one);
                self.output = output;
                if borrow {
                    self.negative = true;
                }
            }
            AluFunct::OR => {
                self.output = self.a | self.b;
            }
            AluFunct::AND => {
                self.output = self.a & self.b;
            }
            AluFunct::XOR => {
                self.output = self.a ^ self.b;
            }
        }
    }
}

impl Default for Alu {
    fn default() -> Alu {
        Alu::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use num_traits::FromPrimitive;

    fn alu_with(a: u8, b: u8) -> Alu {
        let mut alu = Alu::new();
        alu.set_a(Bits::byte(a));
        alu.set_b(Bits::byte(b));
        alu
    }

    #[test]
    fn funct_selection_indices() {
        assert_eq!(AluFunct::from_u32(0), Some(AluFunct::ADD));
        assert_eq!(AluFunct::from_u32(1), Some(AluFunct::SUB));
        assert_eq!(AluFunct::from_u32(2), Some(AluFunct::NOT));
        assert_eq!(AluFunct::from_u32(3), Some(AluFunct::INC));
        assert_eq!(AluFunct::from_u32(4), Some(AluFunct::DEC));
        assert_eq!(AluFunct::from_u32(5), Some(AluFunct::OR));
        assert_eq!(AluFunct::from_u32(6), Some(AluFunct::AND));
        assert_eq!(AluFunct::from_u32(7), Some(AluFunct::XOR));
        assert_eq!(AluFunct::from_u32(8), None);
    }

    #[test]
    fn add_matches_integer_addition_modulo_256() {
        for &(a, b) in &[(0u32, 0u32), (5, 7), (100, 200), (255, 255)] {
            let mut alu = alu_with(a as u8, b as u8);
            alu.set_funct(AluFunct::ADD);
            assert_eq!(alu.output().to_int(), (a + b) % 256);
        }
    }

    #[test]
    fn add_sets_carry_on_overflow() {
        let mut alu = alu_with(200, 100);
        alu.set_funct(AluFunct::ADD);
        assert_eq!(alu.output().to_int(), 44);
        assert_eq!(alu.carry(), 1);
    }

    #[test]
    fn sub_matches_integer_subtraction_modulo_256() {
        let mut alu = alu_with(55, 13);
        alu.set_funct(AluFunct::SUB);
        assert_eq!(alu.output().to_int(), 42);
        assert!(!alu.negative());
    }

    #[test]
    fn sub_underflow_sets_negative_flag() {
        let mut alu = alu_with(3, 5);
        alu.set_funct(AluFunct::SUB);
        assert_eq!(alu.output().to_int(), 254);
        assert!(alu.negative());
    }

    #[test]
    fn not_is_complement_law() {
        for value in 0..256u32 {
            let mut alu = alu_with(value as u8, 0);
            alu.set_funct(AluFunct::NOT);
            assert_eq!(alu.output().to_int(), 255 - value);
        }
    }

    #[test]
    fn inc_wraps_at_width() {
        let mut alu = alu_with(255, 0);
        alu.set_funct(AluFunct::INC);
        assert_eq!(alu.output().to_int(), 0);
    }

    #[test]
    fn dec_of_zero_sets_negative_flag() {
        let mut alu = alu_with(0, 0);
        alu.set_funct(AluFunct::DEC);
        assert_eq!(alu.output().to_int(), 255);
        assert!(alu.negative());
    }

    #[test]
    fn zero_flag_is_derived_from_inputs() {
        let alu = alu_with(5, 5);
        assert!(alu.zero());

        let alu = alu_with(5, 7);
        assert!(!alu.zero());
    }

    #[test]
    fn writing_an_input_clears_negative_flag() {
        let mut alu = alu_with(3, 5);
        alu.set_funct(AluFunct::SUB);
        assert!(alu.negative());

        alu.set_a(Bits::byte(9));
        assert!(!alu.negative());
    }

    #[test]
    fn bitwise_functs() {
        let mut alu = alu_with(0b1100_1010, 0b1010_0110);

        alu.set_funct(AluFunct::AND);
        assert_eq!(alu.output().to_int(), 0b1000_0010);

        alu.set_funct(AluFunct::OR);
        assert_eq!(alu.output().to_int(), 0b1110_1110);

        alu.set_funct(AluFunct::XOR);
        assert_eq!(alu.output().to_int(), 0b0110_1100);
    }
}
