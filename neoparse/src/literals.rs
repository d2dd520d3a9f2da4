use num::Num;
use pest::iterators::Pair;
use std::num::ParseIntError;

use crate::parser::Rule;
use crate::{new_parser_error, Result};

fn process_num_lit<T>(pair: &Pair<Rule>, digits: &str, radix: u32) -> Result<T>
where
    T: Num<FromStrRadixErr = ParseIntError>,
{
    T::from_str_radix(digits, radix)
        .map_err(|err| new_parser_error(pair.as_span(), format!("Parsing integer failed: {}", err)))
}

/// Parses a decimal or `0x`-prefixed integer literal. The value is read
/// into 64 bits and truncated; overflow of the 32-bit result is not
/// diagnosed.
pub fn process_int(pair: &Pair<Rule>) -> Result<i32> {
    let text = pair.as_str();
    let wide: i64 = if text.starts_with("0x") {
        process_num_lit(pair, &text[2..], 16)?
    } else {
        process_num_lit(pair, text, 10)?
    };
    Ok(wide as i32)
}

/// Extracts the single character of a character literal.
pub fn process_char(pair: Pair<Rule>) -> Result<char> {
    let inner = match pair.into_inner().next() {
        Some(inner) => inner,
        None => unreachable!(),
    };
    let span = inner.as_span();
    inner
        .as_str()
        .chars()
        .next()
        .ok_or_else(|| new_parser_error(span, "missing char".to_owned()))
}
