use fcpu::constants::{INSTRUCTION_BYTES, RAM_SIZE};
use fbin::Listing;

use crate::data::Variable;
use crate::encode::encode_instruction;
use crate::error::LayoutError;
use crate::instructions::{Instruction, OperandKind, Subroutine};
use crate::{Program, Result};

/// A variable with its assigned RAM address.
struct VariableSlot<'i> {
    name: &'i str,
    address: u8,
    value: u8,
}

/// A subroutine label with its assigned RAM start address.
struct SubroutineSlot<'i> {
    label: &'i str,
    address: u8,
}

/// Lays a parsed program out in memory and encodes it.
///
/// The listing is the concatenation `[instructions | padding | subroutines |
/// data]`, always exactly one byte per memory cell.
pub fn layout(mut program: Program) -> Result<Listing> {
    let code_bytes = program.text.len() * INSTRUCTION_BYTES;
    let subroutine_bytes: usize = program
        .subroutines
        .iter()
        .map(|subroutine| subroutine.lines.len() * INSTRUCTION_BYTES)
        .sum();
    let data_bytes = program.data.len();

    let required = code_bytes + subroutine_bytes + data_bytes;
    if required > RAM_SIZE {
        return Err(LayoutError {
            required,
            capacity: RAM_SIZE,
        }
        .into());
    }

    let variables = assign_variables(&program.data);
    let subroutines = assign_subroutines(&program.subroutines, RAM_SIZE - data_bytes);

    let mut bytes = Vec::with_capacity(RAM_SIZE);
    for instruction in &mut program.text {
        resolve_operands(instruction, &variables, &subroutines);
        bytes.extend_from_slice(&encode_instruction(instruction)?);
    }

    let mut tail = Vec::with_capacity(subroutine_bytes + data_bytes);
    for subroutine in &mut program.subroutines {
        for line in &mut subroutine.lines {
            resolve_operands(line, &variables, &subroutines);
            tail.extend_from_slice(&encode_instruction(line)?);
        }
    }

    // Data cells appear in ascending address order, the reverse of
    // declaration order.
    for slot in variables.iter().rev() {
        tail.push(slot.value);
    }

    let padding = RAM_SIZE - bytes.len() - tail.len();
    bytes.extend(std::iter::repeat(0u8).take(padding));
    bytes.extend_from_slice(&tail);

    debug_assert_eq!(bytes.len(), RAM_SIZE);
    Ok(Listing::from(bytes))
}

/// The first declared variable lands at the top of memory, each following
/// declaration one cell below it.
fn assign_variables<'i>(variables: &[Variable<'i>]) -> Vec<VariableSlot<'i>> {
    variables
        .iter()
        .enumerate()
        .map(|(index, variable)| VariableSlot {
            name: variable.name.as_str(),
            address: (RAM_SIZE - 1 - index) as u8,
            value: variable.value,
        })
        .collect()
}

/// Subroutines are stacked directly below the data block, two bytes per
/// instruction, so that the bodies sit in declaration order.
fn assign_subroutines<'i>(
    subroutines: &[Subroutine<'i>],
    first_free: usize,
) -> Vec<SubroutineSlot<'i>> {
    let mut slots = Vec::with_capacity(subroutines.len());
    let mut previous = first_free;

    for subroutine in subroutines.iter().rev() {
        let address = previous - subroutine.lines.len() * INSTRUCTION_BYTES;
        slots.push(SubroutineSlot {
            label: subroutine.label.as_str(),
            address: address as u8,
        });
        previous = address;
    }

    slots.reverse();
    slots
}

/// Rewrites symbol operands to their resolved addresses: variables first,
/// then subroutine labels, first match winning. Tokens matching neither table
/// pass through untouched.
fn resolve_operands(
    instruction: &mut Instruction,
    variables: &[VariableSlot],
    subroutines: &[SubroutineSlot],
) {
    for operand in &mut instruction.operands {
        if let OperandKind::Symbol = operand.kind {
            let token = operand.span.as_str();

            if let Some(slot) = variables.iter().find(|slot| slot.name == token) {
                operand.kind = OperandKind::Byte(slot.address);
            } else if let Some(slot) = subroutines.iter().find(|slot| slot.label == token) {
                operand.kind = OperandKind::Byte(slot.address);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parse_program;

    #[test]
    fn variables_are_assigned_descending_addresses() {
        let program = parse_program("section .data\nx = 1\ny = 2\nz = 3").unwrap();
        let slots = assign_variables(&program.data);

        assert_eq!(slots[0].address, 255);
        assert_eq!(slots[1].address, 254);
        assert_eq!(slots[2].address, 253);
    }

    #[test]
    fn subroutines_stack_below_the_data_block() {
        let source = "section .data
x = 1
section .subroutines
first:
inc ax
ret
second:
ret";
        let program = parse_program(source).unwrap();
        let slots = assign_subroutines(&program.subroutines, RAM_SIZE - program.data.len());

        // `second` (one line) sits at 253, `first` (two lines) below it.
        assert_eq!(slots[0].label, "first");
        assert_eq!(slots[0].address, 249);
        assert_eq!(slots[1].label, "second");
        assert_eq!(slots[1].address, 253);
    }

    #[test]
    fn layout_is_code_padding_subroutines_data() {
        let source = "section .data
x = 1
section .text
call work
hlt
section .subroutines
work:
inc ax
ret";
        let listing = layout(parse_program(source).unwrap()).unwrap();
        let bytes = listing.bytes();

        assert_eq!(bytes.len(), RAM_SIZE);

        // code: call 251; hlt
        assert_eq!(&bytes[0..4], &[0b0001_0100, 251, 0, 0]);
        // padding up to the subroutine block
        assert!(bytes[4..251].iter().all(|&byte| byte == 0));
        // subroutine body: inc ax; ret
        assert_eq!(&bytes[251..255], &[0b0000_1011, 0, 0b0001_0101, 0]);
        // data block
        assert_eq!(bytes[255], 1);
    }

    #[test]
    fn text_operands_resolve_variables_before_subroutines() {
        let source = "section .data
work = 9
section .text
lda work
hlt
section .subroutines
work:
ret";
        let listing = layout(parse_program(source).unwrap()).unwrap();

        // The variable table wins: operand is the data address, not the
        // subroutine address.
        assert_eq!(listing.bytes()[1], 255);
    }

    #[test]
    fn over_full_program_is_a_layout_error() {
        let mut source = String::from("section .text\n");
        for _ in 0..130 {
            source.push_str("lda $0\n");
        }

        let error = layout(parse_program(&source).unwrap()).unwrap_err();
        match error {
            crate::Error::Layout(layout_error) => {
                assert_eq!(layout_error.required, 260);
                assert_eq!(layout_error.capacity, RAM_SIZE);
            }
            other => panic!("expected a layout error, got: {}", other),
        }
    }
}
