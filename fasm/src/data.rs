use matches::debug_assert_matches;
use pest::iterators::Pair;
use pest::Span;

use crate::parser::Rule;
use crate::{new_parser_error, Result};

/// One `.data` declaration: a named byte cell.
#[derive(Clone, Debug)]
pub struct Variable<'i> {
    pub name: Span<'i>,
    pub value: u8,
}

pub fn process_data<'i>(
    pair: Pair<'i, Rule>,
    variables: &mut Vec<Variable<'i>>,
) -> Result<()> {
    debug_assert_matches!(pair.as_rule(), Rule::data_section);

    for line in pair.into_inner() {
        debug_assert_matches!(line.as_rule(), Rule::data_line);

        let mut pairs = line.into_inner();
        let name = pairs.next().unwrap().as_span();
        let value = process_byte_value(pairs.next().unwrap())?;
        variables.push(Variable { name, value });
    }

    Ok(())
}

fn process_byte_value(pair: Pair<Rule>) -> Result<u8> {
    let span = pair.as_span();
    match span.as_str().parse::<u32>() {
        Ok(value) if value <= 255 => Ok(value as u8),
        _ => {
            let message = format!("data value \"{}\" does not fit in one byte", span.as_str());
            Err(new_parser_error(span, message))
        }
    }
}

#[cfg(test)]
mod test {
    use crate::parser::Rule;
    use crate::test::parse_rule;

    #[test]
    fn data_line_splits_name_and_value() {
        let pair = parse_rule(Rule::data_line, "total = 42").unwrap();
        let mut inner = pair.into_inner();
        assert_eq!(inner.next().unwrap().as_str(), "total");
        assert_eq!(inner.next().unwrap().as_str(), "42");
    }

    #[test]
    fn data_line_requires_single_spaces_around_the_sign() {
        assert!(parse_rule(Rule::data_line, "x=5").is_err());
        assert!(parse_rule(Rule::data_line, "x  = 5").is_err());
        assert!(parse_rule(Rule::data_line, "x =  5").is_err());
    }

    #[test]
    fn values_above_a_byte_are_rejected() {
        let pair = parse_rule(Rule::data_line, "x = 300").unwrap();
        let value_pair = pair.into_inner().nth(1).unwrap();

        let error = super::process_byte_value(value_pair).unwrap_err();
        assert!(error.to_string().contains("300"));
    }

    #[test]
    fn values_up_to_a_byte_are_accepted() {
        let pair = parse_rule(Rule::data_line, "x = 255").unwrap();
        let value_pair = pair.into_inner().nth(1).unwrap();

        assert_eq!(super::process_byte_value(value_pair).unwrap(), 255);
    }
}
