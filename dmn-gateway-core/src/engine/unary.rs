//! Unary tests: the condition cells of a decision table
//!
//! Supported grammar:
//!
//! ```text
//! test        := "-" | "not(" disjunction ")" | disjunction
//! disjunction := condition ("," condition)*
//! condition   := interval | comparison | literal
//! interval    := ("[" | "(" | "]") number ".." number ("]" | ")" | "[")
//! comparison  := ("<=" | ">=" | "<" | ">" | "=") number
//! literal     := string | number | "true" | "false"
//! ```

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, tag},
    character::complete::{char, digit1, multispace0, none_of},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    error::{context, convert_error, VerboseError},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::value::Value;

type Res<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// A parsed cell condition.
#[derive(Debug, Clone, PartialEq)]
pub enum UnaryTest {
    /// `-`: matches anything, including a missing input
    Any,
    /// Matches when any condition holds
    AnyOf(Vec<Condition>),
    /// Matches when no condition holds
    Not(Vec<Condition>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals(Value),
    Compare(CmpOp, f64),
    Interval {
        low: f64,
        low_closed: bool,
        high: f64,
        high_closed: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl UnaryTest {
    /// Test an input value. A missing input only satisfies `-`.
    pub fn matches(&self, input: Option<&Value>) -> bool {
        match self {
            UnaryTest::Any => true,
            UnaryTest::AnyOf(conditions) => {
                input.is_some_and(|v| conditions.iter().any(|c| c.matches(v)))
            }
            UnaryTest::Not(conditions) => {
                input.is_some_and(|v| !conditions.iter().any(|c| c.matches(v)))
            }
        }
    }
}

impl Condition {
    pub fn matches(&self, input: &Value) -> bool {
        match self {
            Condition::Equals(expected) => expected == input,
            Condition::Compare(op, rhs) => input.as_f64().is_some_and(|n| match op {
                CmpOp::Lt => n < *rhs,
                CmpOp::Le => n <= *rhs,
                CmpOp::Gt => n > *rhs,
                CmpOp::Ge => n >= *rhs,
            }),
            Condition::Interval {
                low,
                low_closed,
                high,
                high_closed,
            } => input.as_f64().is_some_and(|n| {
                let above = if *low_closed { n >= *low } else { n > *low };
                let below = if *high_closed { n <= *high } else { n < *high };
                above && below
            }),
        }
    }
}

/// Parse a single decision-table cell.
pub fn parse_unary_test(input: &str) -> Result<UnaryTest, String> {
    match all_consuming(ws(unary_test))(input) {
        Ok((_, test)) => Ok(test),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(convert_error(input, e)),
        Err(nom::Err::Incomplete(_)) => Err("Incomplete input".to_string()),
    }
}

fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> Res<'a, O>
where
    F: FnMut(&'a str) -> Res<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn unary_test(input: &str) -> Res<'_, UnaryTest> {
    alt((
        map(negation, UnaryTest::Not),
        map(disjunction, UnaryTest::AnyOf),
        value(UnaryTest::Any, char('-')),
    ))(input)
}

fn negation(input: &str) -> Res<'_, Vec<Condition>> {
    preceded(
        tag("not"),
        delimited(
            ws(char('(')),
            disjunction,
            context("closing parenthesis", char(')')),
        ),
    )(input)
}

fn disjunction(input: &str) -> Res<'_, Vec<Condition>> {
    separated_list1(ws(char(',')), ws(condition))(input)
}

fn condition(input: &str) -> Res<'_, Condition> {
    alt((interval, comparison, map(literal, Condition::Equals)))(input)
}

fn interval(input: &str) -> Res<'_, Condition> {
    let (input, open) = alt((char('['), char('('), char(']')))(input)?;
    let (input, low) = ws(number)(input)?;
    let (input, _) = tag("..")(input)?;
    let (input, high) = ws(number)(input)?;
    let (input, close) = context("interval end", alt((char(']'), char(')'), char('['))))(input)?;

    Ok((
        input,
        Condition::Interval {
            low,
            low_closed: open == '[',
            high,
            high_closed: close == ']',
        },
    ))
}

fn comparison(input: &str) -> Res<'_, Condition> {
    let (input, op) = alt((tag("<="), tag(">="), tag("<"), tag(">"), tag("=")))(input)?;
    let (input, rhs) = preceded(multispace0, number)(input)?;

    let condition = match op {
        "<=" => Condition::Compare(CmpOp::Le, rhs),
        ">=" => Condition::Compare(CmpOp::Ge, rhs),
        "<" => Condition::Compare(CmpOp::Lt, rhs),
        ">" => Condition::Compare(CmpOp::Gt, rhs),
        _ => Condition::Equals(Value::Number(rhs)),
    };
    Ok((input, condition))
}

fn literal(input: &str) -> Res<'_, Value> {
    alt((
        map(string_literal, Value::String),
        value(Value::Bool(true), tag("true")),
        value(Value::Bool(false), tag("false")),
        map(number, Value::Number),
    ))(input)
}

fn string_literal(input: &str) -> Res<'_, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                none_of("\\\""),
                '\\',
                alt((value("\\", tag("\\")), value("\"", tag("\"")))),
            )),
            Option::unwrap_or_default,
        ),
        context("closing quote", char('"')),
    )(input)
}

// Digits only, so "5..8" splits into 5 and 8 rather than "5." and ".8".
fn number(input: &str) -> Res<'_, f64> {
    map_res(
        recognize(tuple((opt(char('-')), digit1, opt(pair(char('.'), digit1))))),
        str::parse::<f64>,
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> UnaryTest {
        parse_unary_test(s).unwrap()
    }

    #[test]
    fn test_dash_is_any_but_negative_number_is_not() {
        assert_eq!(parse("-"), UnaryTest::Any);
        assert_eq!(
            parse("-5"),
            UnaryTest::AnyOf(vec![Condition::Equals(Value::Number(-5.0))])
        );
    }

    #[test]
    fn test_string_list() {
        let test = parse(r#""Fall", "Winter","Spring""#);
        assert!(test.matches(Some(&Value::from("Winter"))));
        assert!(!test.matches(Some(&Value::from("Summer"))));
        assert!(!test.matches(None));
    }

    #[test]
    fn test_escaped_and_empty_strings() {
        assert_eq!(
            parse(r#""say \"hi\"""#),
            UnaryTest::AnyOf(vec![Condition::Equals(Value::from(r#"say "hi""#))])
        );
        assert_eq!(
            parse(r#""""#),
            UnaryTest::AnyOf(vec![Condition::Equals(Value::from(""))])
        );
    }

    #[test]
    fn test_comparisons() {
        let le = parse("<= 8");
        assert!(le.matches(Some(&Value::Number(8.0))));
        assert!(!le.matches(Some(&Value::Number(8.5))));

        let gt = parse(">8");
        assert!(gt.matches(Some(&Value::Number(9.0))));
        assert!(!gt.matches(Some(&Value::Number(8.0))));
        assert!(!gt.matches(Some(&Value::from("9"))));

        assert!(parse("= 3").matches(Some(&Value::Number(3.0))));
    }

    #[test]
    fn test_intervals() {
        let closed = parse("[5..8]");
        assert!(closed.matches(Some(&Value::Number(5.0))));
        assert!(closed.matches(Some(&Value::Number(8.0))));
        assert!(!closed.matches(Some(&Value::Number(8.1))));

        let half_open = parse("]5..8)");
        assert!(!half_open.matches(Some(&Value::Number(5.0))));
        assert!(half_open.matches(Some(&Value::Number(7.9))));
        assert!(!half_open.matches(Some(&Value::Number(8.0))));
    }

    #[test]
    fn test_negation() {
        let test = parse(r#"not("Stew", "Spareribs")"#);
        assert!(test.matches(Some(&Value::from("Steak"))));
        assert!(!test.matches(Some(&Value::from("Stew"))));
        assert!(!test.matches(None));
    }

    #[test]
    fn test_booleans() {
        let test = parse("true");
        assert!(test.matches(Some(&Value::Bool(true))));
        assert!(!test.matches(Some(&Value::Bool(false))));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_unary_test("[5..").is_err());
        assert!(parse_unary_test(r#""unterminated"#).is_err());
        assert!(parse_unary_test("<= eight").is_err());
        assert!(parse_unary_test("").is_err());
    }
}
