use matches::debug_assert_matches;
use pest::iterators::Pair;
use pest::Span;

use crate::parser::Rule;
use crate::{new_parser_error, Result};

/// How an operand token is interpreted before symbol resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandKind {
    /// A bare name: register, variable, or subroutine label.
    Symbol,
    /// A `$`-prefixed decimal RAM address.
    Literal(u8),
    /// A raw 8-bit binary RAM address, or a resolved symbol.
    Byte(u8),
}

#[derive(Clone, Debug)]
pub struct Operand<'i> {
    pub span: Span<'i>,
    pub kind: OperandKind,
}

#[derive(Clone, Debug)]
pub struct Instruction<'i> {
    pub span: Span<'i>,
    pub mnemonic: Span<'i>,
    pub operands: Vec<Operand<'i>>,
}

#[derive(Clone, Debug)]
pub struct Subroutine<'i> {
    pub label: Span<'i>,
    pub lines: Vec<Instruction<'i>>,
}

pub fn process_text<'i>(
    pair: Pair<'i, Rule>,
    instructions: &mut Vec<Instruction<'i>>,
) -> Result<()> {
    debug_assert_matches!(pair.as_rule(), Rule::text_section);

    for instruction in pair.into_inner() {
        instructions.push(process_instruction(instruction)?);
    }

    Ok(())
}

pub fn process_subroutines<'i>(
    pair: Pair<'i, Rule>,
    subroutines: &mut Vec<Subroutine<'i>>,
) -> Result<()> {
    debug_assert_matches!(pair.as_rule(), Rule::subroutines_section);

    for subroutine in pair.into_inner() {
        debug_assert_matches!(subroutine.as_rule(), Rule::subroutine);

        let mut pairs = subroutine.into_inner();
        let label = pairs.next().unwrap().into_inner().next().unwrap().as_span();

        let mut lines = Vec::new();
        for inner in pairs {
            match inner.as_rule() {
                Rule::instruction => lines.push(process_instruction(inner)?),
                // The closing `ret` becomes the final line of the body.
                Rule::ret_line => lines.push(Instruction {
                    span: inner.as_span(),
                    mnemonic: inner.as_span(),
                    operands: Vec::new(),
                }),
                _ => unreachable!(),
            }
        }

        subroutines.push(Subroutine { label, lines });
    }

    Ok(())
}

pub(crate) fn process_instruction<'i>(pair: Pair<'i, Rule>) -> Result<Instruction<'i>> {
    debug_assert_matches!(pair.as_rule(), Rule::instruction);

    let span = pair.as_span();
    let mut pairs = pair.into_inner();
    let mnemonic = pairs.next().unwrap().as_span();

    let mut operands = Vec::new();
    for operand in pairs {
        operands.push(process_operand(operand)?);
    }

    Ok(Instruction {
        span,
        mnemonic,
        operands,
    })
}

fn process_operand<'i>(pair: Pair<'i, Rule>) -> Result<Operand<'i>> {
    debug_assert_matches!(pair.as_rule(), Rule::operand);

    let inner = pair.into_inner().next().unwrap();
    let span = inner.as_span();

    let kind = match inner.as_rule() {
        Rule::literal => OperandKind::Literal(process_address_literal(span.clone())?),
        // The grammar guarantees exactly eight binary digits here.
        Rule::bin_byte => OperandKind::Byte(u8::from_str_radix(span.as_str(), 2).unwrap()),
        Rule::name => OperandKind::Symbol,
        _ => unreachable!(),
    };

    Ok(Operand { span, kind })
}

fn process_address_literal(span: Span) -> Result<u8> {
    let digits = &span.as_str()[1..];
    match digits.parse::<u32>() {
        Ok(address) if address <= 255 => Ok(address as u8),
        _ => {
            let message = format!("\"{}\" is not a valid RAM address", span.as_str());
            Err(new_parser_error(span, message))
        }
    }
}
