//! Parse formulas from their textual representation.
//!
//! Operators, from tightest to loosest binding:
//!
//! | Syntax                              | Meaning                            |
//! | ----------------------------------- | ---------------------------------- |
//! | `e1 < e2`, `<=`, `>`, `>=`, `=`     | predicate over arithmetic terms    |
//! | `true`, `false`, `( φ )`            | constants and grouping             |
//! | `!φ`, `F[a,b] φ`, `G[a,b] φ`        | negation, eventually, always       |
//! | `φ => ψ`                            | implication                        |
//! | `φ && ψ`                            | conjunction                        |
//! | `φ \|\| ψ`                          | disjunction                        |
//! | `φ U[a,b] ψ`                        | until                              |
//! | `φ >> ψ`                            | concatenation                      |
//!
//! All binary operators associate to the left. Arithmetic terms support `+ - * / ^`, unary
//! minus, and the functions `sqrt`, `log`, `ln`, `abs`, `der` and `int`.
//!
//! ```rust
//! use fleance::parser::parse_formula;
//!
//! let formula = parse_formula("!(x < 10) && F[0,2] y > 2 || G[1,3] z <= 8").unwrap();
//! assert_eq!(formula.to_string(), "((!x < 10 && F[0,2] y > 2) || G[1,3] z <= 8)");
//! ```

use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, digit0, digit1, multispace0, one_of};
use nom::combinator::{map, map_res, not, opt, recognize, value};
use nom::error::{Error as NomError, ErrorKind};
use nom::multi::many0;
use nom::sequence::{delimited, pair, preceded, terminated, tuple};
use nom::IResult;
use thiserror::Error;

use crate::expression::{ArithmeticOp, Expression, Function};
use crate::formula::{Formula, Interval, Predicate, Relation};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("could not parse formula at \"{0}\"")]
    Syntax(String),

    #[error("could not parse remaining input \"{0}\"")]
    Incomplete(String),
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn var_name(input: &str) -> IResult<&str, String> {
    let mut ident = recognize(pair(take_while1(is_ident_start), opt(take_while1(is_ident_char))));
    let (rest, name) = ident(input)?;

    Ok((rest, name.to_string()))
}

fn keyword<'a>(word: &'a str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| -> IResult<&'a str, &'a str> {
        let mut parser = delimited(multispace0, terminated(tag(word), not(take_while1(is_ident_char))), multispace0);
        parser(input)
    }
}

fn op0<'a>(op: &'a str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| -> IResult<&'a str, &'a str> {
        let mut parser = delimited(multispace0, tag(op), multispace0);
        parser(input)
    }
}

fn number(input: &str) -> IResult<&str, f64> {
    let fraction = recognize(pair(char('.'), digit0));
    let leading = recognize(pair(digit1, opt(fraction)));
    let trailing = recognize(pair(char('.'), digit1));
    let exponent = tuple((one_of("eE"), opt(one_of("+-")), digit1));

    let mut parser = map_res(recognize(pair(alt((leading, trailing)), opt(exponent))), f64::from_str);
    parser(input)
}

fn integer(input: &str) -> IResult<&str, usize> {
    let mut parser = map_res(digit1, usize::from_str);
    parser(input)
}

fn time_bounds(input: &str) -> IResult<&str, Interval> {
    let bounds = tuple((op0("["), integer, op0(","), integer, op0("]")));
    let mut parser = map_res(bounds, |(_, low, _, high, _)| Interval::new(low, high));

    parser(input)
}

fn call(input: &str) -> IResult<&str, Expression> {
    let (rest, name) = var_name(input)?;
    let function = match name.as_str() {
        "sqrt" => Function::Sqrt,
        "log" => Function::Log10,
        "ln" => Function::Ln,
        "abs" => Function::Abs,
        "der" => Function::Derivative,
        "int" => Function::Integral,
        _ => return Err(nom::Err::Error(NomError::new(input, ErrorKind::Tag))),
    };

    let mut argument = delimited(op0("("), expression, op0(")"));
    let (rest, argument) = argument(rest)?;

    Ok((rest, Expression::call(function, argument)))
}

fn atom(input: &str) -> IResult<&str, Expression> {
    let mut parser = delimited(
        multispace0,
        alt((
            map(number, Expression::Constant),
            call,
            map(var_name, Expression::Variable),
            delimited(op0("("), expression, op0(")")),
        )),
        multispace0,
    );

    parser(input)
}

fn power(input: &str) -> IResult<&str, Expression> {
    let (rest, base) = atom(input)?;
    let (rest, exponent) = opt(preceded(op0("^"), unary_minus))(rest)?;

    let expr = match exponent {
        Some(exponent) => Expression::binary(ArithmeticOp::Pow, base, exponent),
        None => base,
    };

    Ok((rest, expr))
}

fn unary_minus(input: &str) -> IResult<&str, Expression> {
    let negated = map(preceded(op0("-"), unary_minus), |inner| Expression::Negate(Box::new(inner)));
    let mut parser = alt((negated, power));

    parser(input)
}

fn term(input: &str) -> IResult<&str, Expression> {
    let ops = alt((value(ArithmeticOp::Mul, op0("*")), value(ArithmeticOp::Div, op0("/"))));
    let (rest, first) = unary_minus(input)?;
    let (rest, others) = many0(pair(ops, unary_minus))(rest)?;

    let expr = others
        .into_iter()
        .fold(first, |left, (op, right)| Expression::binary(op, left, right));

    Ok((rest, expr))
}

fn expression(input: &str) -> IResult<&str, Expression> {
    let ops = alt((value(ArithmeticOp::Add, op0("+")), value(ArithmeticOp::Sub, op0("-"))));
    let (rest, first) = term(input)?;
    let (rest, others) = many0(pair(ops, term))(rest)?;

    let expr = others
        .into_iter()
        .fold(first, |left, (op, right)| Expression::binary(op, left, right));

    Ok((rest, expr))
}

fn relation(input: &str) -> IResult<&str, Relation> {
    let mut parser = alt((
        value(Relation::Le, op0("<=")),
        value(Relation::Ge, op0(">=")),
        value(Relation::Lt, op0("<")),
        value(Relation::Gt, terminated(op0(">"), not(char('>')))),
        value(Relation::Eq, terminated(op0("="), not(char('>')))),
    ));

    parser(input)
}

fn predicate(input: &str) -> IResult<&str, Predicate> {
    let mut parser = tuple((expression, relation, expression));
    let (rest, (left, relation, right)) = parser(input)?;

    Ok((rest, Predicate::new(left, relation, right)))
}

fn primary(input: &str) -> IResult<&str, Formula> {
    let mut parser = alt((
        value(Formula::Constant(true), keyword("true")),
        value(Formula::Constant(false), keyword("false")),
        map(predicate, Formula::Predicate),
        delimited(op0("("), property, op0(")")),
    ));

    parser(input)
}

fn unary(input: &str) -> IResult<&str, Formula> {
    let negation = map(preceded(op0("!"), unary), Formula::not);
    let always = map(pair(preceded(op0("G"), time_bounds), unary), |(interval, child)| {
        Formula::always(interval, child)
    });
    let eventually = map(pair(preceded(op0("F"), time_bounds), unary), |(interval, child)| {
        Formula::eventually(interval, child)
    });

    let mut parser = alt((negation, always, eventually, primary));
    parser(input)
}

fn binary_level<'a, P>(
    operand: P,
    op: &'static str,
    build: fn(Formula, Formula) -> Formula,
) -> impl FnMut(&'a str) -> IResult<&'a str, Formula>
where
    P: Fn(&'a str) -> IResult<&'a str, Formula> + Copy,
{
    move |input: &'a str| -> IResult<&'a str, Formula> {
        let (rest, first) = operand(input)?;
        let (rest, others) = many0(preceded(op0(op), operand))(rest)?;

        Ok((rest, others.into_iter().fold(first, build)))
    }
}

fn implies(input: &str) -> IResult<&str, Formula> {
    binary_level(unary, "=>", Formula::implies)(input)
}

fn and(input: &str) -> IResult<&str, Formula> {
    binary_level(implies, "&&", Formula::and)(input)
}

fn or(input: &str) -> IResult<&str, Formula> {
    binary_level(and, "||", Formula::or)(input)
}

fn until(input: &str) -> IResult<&str, Formula> {
    let (rest, first) = or(input)?;
    let (rest, others) = many0(pair(preceded(op0("U"), time_bounds), or))(rest)?;

    let formula = others
        .into_iter()
        .fold(first, |left, (interval, right)| Formula::until(interval, left, right));

    Ok((rest, formula))
}

fn property(input: &str) -> IResult<&str, Formula> {
    binary_level(until, ">>", Formula::concatenation)(input)
}

fn finish<'a, T>(input: &'a str, result: IResult<&'a str, T>) -> Result<T, ParseError> {
    let (rest, parsed) = result.map_err(|err| match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => ParseError::Syntax(e.input.to_string()),
        nom::Err::Incomplete(_) => ParseError::Syntax(input.to_string()),
    })?;

    if !rest.is_empty() {
        return Err(ParseError::Incomplete(rest.to_string()));
    }

    Ok(parsed)
}

/// Parse a complete formula.
pub fn parse_formula(input: &str) -> Result<Formula, ParseError> {
    let result = delimited(multispace0, property, multispace0)(input);
    finish(input, result)
}

/// Parse a single predicate such as `x + y <= 2 * z`.
pub fn parse_predicate(input: &str) -> Result<Predicate, ParseError> {
    let result = delimited(multispace0, predicate, multispace0)(input);
    finish(input, result)
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::{expression, number, parse_formula, parse_predicate, time_bounds, ParseError};
    use crate::expression::{ArithmeticOp, Expression, Function};
    use crate::formula::{Formula, Interval, Predicate, Relation};

    fn p(name: &str, relation: Relation, threshold: f64) -> Formula {
        Formula::predicate(Predicate::linear(name, relation, threshold))
    }

    #[test]
    fn parse_number() -> Result<(), Box<dyn Error>> {
        assert_eq!(number("123.345")?, ("", 123.345));
        assert_eq!(number("12")?, ("", 12.0));
        assert_eq!(number(".5e2 rest")?, (" rest", 50.0));
        assert!(number("abc").is_err());

        Ok(())
    }

    #[test]
    fn parse_bounds() -> Result<(), Box<dyn Error>> {
        assert_eq!(time_bounds("[ 1, 3 ]")?, ("", Interval::new(1, 3)?));
        assert!(time_bounds("[3,1]").is_err());

        Ok(())
    }

    #[test]
    fn parse_arithmetic() -> Result<(), Box<dyn Error>> {
        let (rest, expr) = expression("1 + 2 * x ^ 2 - -y")?;
        let expected = Expression::binary(
            ArithmeticOp::Sub,
            Expression::binary(
                ArithmeticOp::Add,
                Expression::constant(1.0),
                Expression::binary(
                    ArithmeticOp::Mul,
                    Expression::constant(2.0),
                    Expression::binary(ArithmeticOp::Pow, Expression::variable("x"), Expression::constant(2.0)),
                ),
            ),
            Expression::Negate(Box::new(Expression::variable("y"))),
        );

        assert_eq!(rest, "");
        assert_eq!(expr, expected);

        let (_, expr) = expression("der(speed) / abs(log(10))")?;
        let expected = Expression::binary(
            ArithmeticOp::Div,
            Expression::call(Function::Derivative, Expression::variable("speed")),
            Expression::call(Function::Abs, Expression::call(Function::Log10, Expression::constant(10.0))),
        );

        assert_eq!(expr, expected);

        Ok(())
    }

    #[test]
    fn parse_predicates() -> Result<(), Box<dyn Error>> {
        assert_eq!(
            parse_predicate("(x + 1) >= 2 * y")?,
            Predicate::new(
                Expression::binary(ArithmeticOp::Add, Expression::variable("x"), Expression::constant(1.0)),
                Relation::Ge,
                Expression::binary(ArithmeticOp::Mul, Expression::constant(2.0), Expression::variable("y")),
            )
        );
        assert_eq!(parse_predicate("x = 3")?, Predicate::linear("x", Relation::Eq, 3.0));

        Ok(())
    }

    #[test]
    fn fixture_precedence() -> Result<(), Box<dyn Error>> {
        let formula = parse_formula("!(x < 10) && F[0, 2] y > 2 || G[1, 3] z<=8")?;
        let expected = Formula::or(
            Formula::and(
                Formula::not(p("x", Relation::Lt, 10.0)),
                Formula::eventually(Interval::new(0, 2)?, p("y", Relation::Gt, 2.0)),
            ),
            Formula::always(Interval::new(1, 3)?, p("z", Relation::Le, 8.0)),
        );

        assert_eq!(formula, expected);

        Ok(())
    }

    #[test]
    fn binary_precedence() -> Result<(), Box<dyn Error>> {
        let a = || p("a", Relation::Gt, 0.0);
        let b = || p("b", Relation::Gt, 0.0);
        let c = || p("c", Relation::Gt, 0.0);

        assert_eq!(
            parse_formula("a > 0 => b > 0 && c > 0")?,
            Formula::and(Formula::implies(a(), b()), c())
        );
        assert_eq!(
            parse_formula("a > 0 || b > 0 U[0,4] c > 0")?,
            Formula::until(Interval::new(0, 4)?, Formula::or(a(), b()), c())
        );
        assert_eq!(
            parse_formula("F[0,1] a > 0 >> G[0,2] b > 0 >> true")?,
            Formula::concatenation(
                Formula::concatenation(
                    Formula::eventually(Interval::new(0, 1)?, a()),
                    Formula::always(Interval::new(0, 2)?, b())
                ),
                Formula::constant(true)
            )
        );
        assert_eq!(parse_formula("a > 0 || b > 0 || c > 0")?, Formula::or(Formula::or(a(), b()), c()));

        Ok(())
    }

    #[test]
    fn display_round_trip() -> Result<(), Box<dyn Error>> {
        let text = "G[0,5] (speed <= 30 => F[1,3] (brake > 0.5 || !(sqrt(der(rpm)) = 2))) U[2,4] false";
        let formula = parse_formula(text)?;

        assert_eq!(parse_formula(&formula.to_string())?, formula);

        Ok(())
    }

    #[test]
    fn errors() {
        assert!(matches!(parse_formula("x <"), Err(ParseError::Syntax(_))));
        assert_eq!(
            parse_formula("x < 1 )"),
            Err(ParseError::Incomplete(")".to_string()))
        );
        assert!(parse_formula("F[3,1] x < 1").is_err());
        assert!(parse_formula("x ! 3").is_err());
    }
}
