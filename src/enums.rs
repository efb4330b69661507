use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::ToPrimitive;

/// Instruction set, in dispatch order. The enum discriminant is the opcode
/// byte an instruction assembles to.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum Opcode {
    //  Mnemonic | Operand byte            | Effect
    //-----------+-------------------------+--------------------------------------------
    HLT,  // | 00000000                | Sets the halt flag
    LDA,  // | RAM address             | ax <- RAM[address]
    LDB,  // | RAM address             | bx <- RAM[address]
    LDC,  // | RAM address             | cx <- RAM[address]
    LDD,  // | RAM address             | dx <- RAM[address]
    STA,  // | RAM address             | RAM[address] <- ax
    STB,  // | RAM address             | RAM[address] <- bx
    STC,  // | RAM address             | RAM[address] <- cx
    STD,  // | RAM address             | RAM[address] <- dx
    ADD,  // | reg2 nibble, reg1 nibble| acc <- reg1 + reg2; status updated
    SUB,  // | reg2 nibble, reg1 nibble| acc <- reg1 - reg2; status updated
    INC,  // | 0000, register nibble   | register <- register + 1; status updated
    DEC,  // | 0000, register nibble   | register <- register - 1; status updated
    CMP,  // | reg2 nibble, reg1 nibble| status updated from reg1 - reg2
    JIL,  // | RAM address             | PC <- address when the negative flag is set
    JIG,  // | RAM address             | PC <- address when the negative flag is clear
    JIE,  // | RAM address             | PC <- address when the zero flag is set
    JNE,  // | RAM address             | PC <- address when the zero flag is clear
    PUSH, // | 0000, register nibble   | stack pointer <- register
    POP,  // | 0000, register nibble   | register <- stack pointer
    CALL, // | RAM address             | stack pointer <- PC; PC <- address
    RET,  // | 00000000                | PC <- stack pointer
}

/// Registers addressable from operand bytes, in code order.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum RegisterId {
    AX,  // 0000
    BX,  // 0001
    CX,  // 0010
    DX,  // 0011
    ACC, // 0100, accumulator
    SR,  // 0101, status register
}

/// Error returned when a mnemonic or register name matches no variant.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ParseEnumError {
    pub value: String,
    pub enum_name: &'static str,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "failed to parse \"{}\" as {}",
            &self.value, &self.enum_name
        )
    }
}

impl StdError for ParseEnumError {}

macro_rules! impl_enum_display {
    ($e:ty) => {
        impl fmt::Display for $e {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

impl_enum_display!(Opcode);
impl_enum_display!(RegisterId);

macro_rules! impl_enum_from_str {
    ($e:ident, $($text:literal => $variant:ident),+ $(,)?) => {
        impl FromStr for $e {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<$e, ParseEnumError> {
                match s {
                    $($text => Ok($e::$variant),)+
                    _ => Err(ParseEnumError {
                        value: s.to_owned(),
                        enum_name: stringify!($e),
                    }),
                }
            }
        }
    };
}

impl_enum_from_str!(Opcode,
    "hlt" => HLT,
    "lda" => LDA,
    "ldb" => LDB,
    "ldc" => LDC,
    "ldd" => LDD,
    "sta" => STA,
    "stb" => STB,
    "stc" => STC,
    "std" => STD,
    "add" => ADD,
    "sub" => SUB,
    "inc" => INC,
    "dec" => DEC,
    "cmp" => CMP,
    "jil" => JIL,
    "jig" => JIG,
    "jie" => JIE,
    "jne" => JNE,
    "push" => PUSH,
    "pop" => POP,
    "call" => CALL,
    "ret" => RET,
);

impl_enum_from_str!(RegisterId,
    "ax" => AX,
    "bx" => BX,
    "cx" => CX,
    "dx" => DX,
    "acc" => ACC,
    "sr" => SR,
);

#[inline]
pub fn enum_to_u32<T: ToPrimitive + Copy>(val: T) -> u32 {
    val.to_u32().unwrap()
}

#[inline]
pub fn register_index(id: RegisterId) -> usize {
    enum_to_u32(id) as usize
}

/// The opcode byte a mnemonic assembles to.
#[inline]
pub fn opcode_value(opcode: Opcode) -> u8 {
    enum_to_u32(opcode) as u8
}

/// The 4-bit code a register is addressed by in operand bytes.
#[inline]
pub fn register_code(id: RegisterId) -> u8 {
    enum_to_u32(id) as u8
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn opcode_values_match_the_dispatch_order() {
        assert_eq!(opcode_value(Opcode::HLT), 0);
        assert_eq!(opcode_value(Opcode::LDA), 1);
        assert_eq!(opcode_value(Opcode::STA), 5);
        assert_eq!(opcode_value(Opcode::ADD), 9);
        assert_eq!(opcode_value(Opcode::CMP), 13);
        assert_eq!(opcode_value(Opcode::JNE), 17);
        assert_eq!(opcode_value(Opcode::RET), 21);
    }

    #[test]
    fn register_codes() {
        assert_eq!(register_code(RegisterId::AX), 0b0000);
        assert_eq!(register_code(RegisterId::BX), 0b0001);
        assert_eq!(register_code(RegisterId::CX), 0b0010);
        assert_eq!(register_code(RegisterId::DX), 0b0011);
        assert_eq!(register_code(RegisterId::ACC), 0b0100);
        assert_eq!(register_code(RegisterId::SR), 0b0101);
    }

    #[test]
    fn mnemonics_parse_to_opcodes() {
        assert_eq!("lda".parse::<Opcode>(), Ok(Opcode::LDA));
        assert_eq!("push".parse::<Opcode>(), Ok(Opcode::PUSH));
        assert_eq!("hlt".parse::<Opcode>(), Ok(Opcode::HLT));
    }

    #[test]
    fn unknown_mnemonic_reports_the_value() {
        let err = "mov".parse::<Opcode>().unwrap_err();
        assert_eq!(err.value, "mov");
        assert_eq!(err.enum_name, "Opcode");
    }

    #[test]
    fn register_names_parse_to_ids() {
        assert_eq!("ax".parse::<RegisterId>(), Ok(RegisterId::AX));
        assert_eq!("sr".parse::<RegisterId>(), Ok(RegisterId::SR));
        assert!("ex".parse::<RegisterId>().is_err());
    }
}
