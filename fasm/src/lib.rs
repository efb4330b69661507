//! Assembler for the [fcpu](../fcpu/index.html) virtual machine.
//!
//! [`assemble`](fn.assemble.html) accepts a program written in the FCPU
//! assembly dialect and produces the 256-line binary listing the machine
//! boots from, represented by the [`Listing`](../fbin/struct.Listing.html)
//! type from the [fbin](../fbin/index.html) crate.
//!
//! Parsing is implemented with [pest]; compile errors carry pest spans, so
//! rendering an [`Error`](enum.Error.html) shows the offending source line.
//!
//! # The FCPU assembly dialect
//!
//! A program is made of up to three sections, in any order. A `;` starts a
//! comment that runs to the end of the line.
//!
//! ## `section .data`
//!
//! One variable per line, written `name = value` with a decimal value from 0
//! to 255. The first declared variable is stored in the topmost memory cell,
//! each later one directly below it.
//!
//! ## `section .text`
//!
//! One instruction per line: a mnemonic followed by zero, one or two
//! comma-separated operands. Operands are register names (`ax`, `bx`, `cx`,
//! `dx`, `acc`, `sr`), variable or subroutine names, `$`-prefixed decimal
//! addresses, or raw 8-digit binary addresses.
//!
//! Mnemonic | Syntax              | Effect
//! ---------|---------------------|------------------------------------------
//! `hlt`    | `hlt`               | Stop the machine
//! `lda`    | `lda address`       | Load a memory cell into `ax` (`ldb`, `ldc`, `ldd` likewise)
//! `sta`    | `sta address`       | Store `ax` into a memory cell (`stb`, `stc`, `std` likewise)
//! `add`    | `add reg1, reg2`    | `acc = reg1 + reg2`, status updated
//! `sub`    | `sub reg1, reg2`    | `acc = reg1 - reg2`, status updated
//! `inc`    | `inc reg`           | `reg = reg + 1`, status updated
//! `dec`    | `dec reg`           | `reg = reg - 1`, status updated
//! `cmp`    | `cmp reg1, reg2`    | Status updated from `reg1 - reg2`
//! `jil`    | `jil address`       | Jump when the negative flag is set
//! `jig`    | `jig address`       | Jump when the negative flag is clear
//! `jie`    | `jie address`       | Jump when the zero flag is set
//! `jne`    | `jne address`       | Jump when the zero flag is clear
//! `push`   | `push reg`          | Copy the register into the stack pointer
//! `pop`    | `pop reg`           | Copy the stack pointer into the register
//! `call`   | `call label`        | Save the program counter, jump to a subroutine
//! `ret`    | `ret`               | Return to the saved program counter
//!
//! ## `section .subroutines`
//!
//! Each subroutine starts with `label:` on its own line and ends with `ret`.
//! Subroutines are placed in high memory, directly below the data block, and
//! are reached with `call label`.
//!
//! ```text
//! section .data
//! x = 5
//! section .text
//! lda x
//! inc ax
//! hlt
//! ```
//!
//! [pest]: https://docs.rs/pest/

mod data;
mod encode;
mod error;
mod instructions;
mod layout;
mod parser;


use pest::error::ErrorVariant;
use pest::iterators::Pair;
use pest::{Parser, Span};

use fbin::Listing;

pub use crate::data::Variable;
pub use crate::encode::encode_instruction;
pub use crate::error::{Error, LayoutError};
pub use crate::instructions::{Instruction, Operand, OperandKind, Subroutine};
pub use crate::parser::{AsmParser, Rule};

pub type Result<T> = std::result::Result<T, Error>;

/// A parsed program: the three sections as flat record lists.
#[derive(Clone, Debug, Default)]
pub struct Program<'i> {
    pub data: Vec<Variable<'i>>,
    pub text: Vec<Instruction<'i>>,
    pub subroutines: Vec<Subroutine<'i>>,
}

/// Assembles a source program into its binary listing.
pub fn assemble(input: &str) -> Result<Listing> {
    layout::layout(parse_program(input)?)
}

/// Parses a source program into its sectioned records. Repeated sections of
/// the same kind are concatenated.
pub fn parse_program(input: &str) -> Result<Program> {
    let mut program = Program::default();

    for section in parse(input)?.into_inner() {
        match section.as_rule() {
            Rule::data_section => data::process_data(section, &mut program.data)?,
            Rule::text_section => instructions::process_text(section, &mut program.text)?,
            Rule::subroutines_section => {
                instructions::process_subroutines(section, &mut program.subroutines)?
            }
            Rule::EOI => {}
            _ => unreachable!(),
        }
    }

    Ok(program)
}

fn parse(input: &str) -> Result<Pair<Rule>> {
    Ok(AsmParser::parse(Rule::program, input)?.next().unwrap())
}

pub(crate) fn new_parser_error(span: Span, message: String) -> Error {
    Error::Parse(pest::error::Error::new_from_span(
        ErrorVariant::CustomError { message },
        span,
    ))
}
