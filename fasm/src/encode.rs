use fcpu::{opcode_value, register_code, Opcode, RegisterId};

use crate::instructions::{Instruction, Operand, OperandKind};
use crate::{new_parser_error, Result};

/// Emits the two bytes of one instruction: opcode, then operand.
///
/// Symbol operands must have been resolved to addresses beforehand; any
/// symbol still present is expected to name a register.
pub fn encode_instruction(instruction: &Instruction) -> Result<[u8; 2]> {
    let opcode = parse_opcode(instruction)?;

    let operand = match opcode {
        Opcode::HLT | Opcode::RET => {
            expect_operands(instruction, 0)?;
            0
        }
        Opcode::LDA
        | Opcode::LDB
        | Opcode::LDC
        | Opcode::LDD
        | Opcode::STA
        | Opcode::STB
        | Opcode::STC
        | Opcode::STD
        | Opcode::JIL
        | Opcode::JIG
        | Opcode::JIE
        | Opcode::JNE
        | Opcode::CALL => {
            let operands = expect_operands(instruction, 1)?;
            address_operand(&operands[0])?
        }
        Opcode::ADD | Opcode::SUB | Opcode::CMP => {
            let operands = expect_operands(instruction, 2)?;
            let first = register_operand(&operands[0])?;
            let second = register_operand(&operands[1])?;
            register_code(second) << 4 | register_code(first)
        }
        Opcode::INC | Opcode::DEC | Opcode::PUSH | Opcode::POP => {
            let operands = expect_operands(instruction, 1)?;
            register_code(register_operand(&operands[0])?)
        }
    };

    Ok([opcode_value(opcode), operand])
}

fn parse_opcode(instruction: &Instruction) -> Result<Opcode> {
    instruction
        .mnemonic
        .as_str()
        .to_lowercase()
        .parse()
        .map_err(|_| {
            new_parser_error(
                instruction.mnemonic.clone(),
                format!(
                    "operation \"{}\" is not a valid operation",
                    instruction.mnemonic.as_str()
                ),
            )
        })
}

fn register_operand(operand: &Operand) -> Result<RegisterId> {
    let error = || {
        new_parser_error(
            operand.span.clone(),
            format!(
                "register \"{}\" is not a valid register",
                operand.span.as_str()
            ),
        )
    };

    match operand.kind {
        OperandKind::Symbol => operand
            .span
            .as_str()
            .to_lowercase()
            .parse()
            .map_err(|_| error()),
        _ => Err(error()),
    }
}

fn address_operand(operand: &Operand) -> Result<u8> {
    match operand.kind {
        OperandKind::Literal(address) | OperandKind::Byte(address) => Ok(address),
        OperandKind::Symbol => Err(new_parser_error(
            operand.span.clone(),
            format!(
                "\"{}\" is not a RAM address or a known symbol",
                operand.span.as_str()
            ),
        )),
    }
}

fn expect_operands<'a, 'i>(
    instruction: &'a Instruction<'i>,
    count: usize,
) -> Result<&'a [Operand<'i>]> {
    if instruction.operands.len() == count {
        Ok(&instruction.operands[..])
    } else {
        Err(new_parser_error(
            instruction.span.clone(),
            format!(
                "\"{}\" expects {} operand(s), found {}",
                instruction.mnemonic.as_str(),
                count,
                instruction.operands.len()
            ),
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::Rule;
    use crate::test::parse_rule;

    fn encode(input: &str) -> Result<[u8; 2]> {
        let pair = parse_rule(Rule::instruction, input).unwrap();
        let instruction = crate::instructions::process_instruction(pair)?;
        encode_instruction(&instruction)
    }

    #[test]
    fn load_family_encodes_the_address() {
        assert_eq!(encode("lda 11111111").unwrap(), [0b0000_0001, 255]);
        assert_eq!(encode("ldd $7").unwrap(), [0b0000_0100, 7]);
        assert_eq!(encode("sta $200").unwrap(), [0b0000_0101, 200]);
    }

    #[test]
    fn add_packs_the_second_register_into_the_high_nibble() {
        assert_eq!(encode("add ax, bx").unwrap(), [0b0000_1001, 0b0001_0000]);
        assert_eq!(encode("sub cx, dx").unwrap(), [0b0000_1010, 0b0011_0010]);
        assert_eq!(encode("cmp ax, acc").unwrap(), [0b0000_1101, 0b0100_0000]);
    }

    #[test]
    fn single_register_family_uses_the_low_nibble() {
        assert_eq!(encode("inc ax").unwrap(), [0b0000_1011, 0b0000_0000]);
        assert_eq!(encode("dec dx").unwrap(), [0b0000_1100, 0b0000_0011]);
        assert_eq!(encode("push bx").unwrap(), [0b0001_0010, 0b0000_0001]);
        assert_eq!(encode("pop sr").unwrap(), [0b0001_0011, 0b0000_0101]);
    }

    #[test]
    fn jumps_and_call_encode_the_target() {
        assert_eq!(encode("jil $12").unwrap(), [0b0000_1110, 12]);
        assert_eq!(encode("jig $12").unwrap(), [0b0000_1111, 12]);
        assert_eq!(encode("jie $12").unwrap(), [0b0001_0000, 12]);
        assert_eq!(encode("jne $12").unwrap(), [0b0001_0001, 12]);
        assert_eq!(encode("call 11110000").unwrap(), [0b0001_0100, 240]);
    }

    #[test]
    fn zero_operand_mnemonics() {
        assert_eq!(encode("hlt").unwrap(), [0, 0]);
        assert_eq!(encode("ret").unwrap(), [0b0001_0101, 0]);
    }

    #[test]
    fn unknown_mnemonic_is_a_compile_error() {
        let error = encode("mov ax, bx").unwrap_err();
        assert!(error.to_string().contains("not a valid operation"));
    }

    #[test]
    fn unknown_register_is_a_compile_error() {
        let error = encode("add ax, ex").unwrap_err();
        assert!(error.to_string().contains("not a valid register"));
    }

    #[test]
    fn missing_operand_is_a_compile_error_naming_the_line() {
        let error = encode("add ax").unwrap_err();
        let message = error.to_string();
        assert!(message.contains("expects 2 operand(s), found 1"));
        assert!(message.contains("add ax"));
    }

    #[test]
    fn excess_operands_are_a_compile_error() {
        let error = encode("inc ax, bx").unwrap_err();
        assert!(error.to_string().contains("expects 1 operand(s), found 2"));
    }

    #[test]
    fn unresolved_symbol_is_not_an_address() {
        let error = encode("lda somewhere").unwrap_err();
        assert!(error.to_string().contains("somewhere"));
    }
}
