use super::{ErrorContext, ParseError, Parser};

pub fn map<I, O1, O2, P, F>(parser: P, f: F) -> impl Parser<I, O2>
where
    I: Clone,
    P: Parser<I, O1>,
    F: Fn(O1) -> O2,
{
    move |input: &mut I| parser.parse(input).map(&f)
}

pub fn map_res<I, O1, O2, P, F, E>(parser: P, f: F) -> impl Parser<I, O2>
where
    I: Clone,
    P: Parser<I, O1>,
    F: Fn(O1) -> Result<O2, E>,
    E: Into<ParseError>,
{
    move |input: &mut I| {
        let o1 = parser.parse(input)?;
        f(o1).map_err(|e| e.into())
    }
}

/// Runs the second parser on the output of the first one.
/// The second parser does not need to consume everything.
pub fn map_parser<I, O1, O2, P1, P2>(first: P1, second: P2) -> impl Parser<I, O2>
where
    I: Clone,
    O1: Clone,
    P1: Parser<I, O1>,
    P2: Parser<O1, O2>,
{
    move |input: &mut I| {
        let mut o1 = first.parse(input)?;
        second.parse(&mut o1)
    }
}

pub fn peek<I, O, P>(parser: P) -> impl Parser<I, O>
where
    I: Clone,
    P: Parser<I, O>,
{
    move |input: &mut I| parser.parse(&mut input.clone())
}

pub fn cond<I, O, P>(condition: bool, parser: P) -> impl Parser<I, Option<O>>
where
    I: Clone,
    P: Parser<I, O>,
{
    move |input: &mut I| {
        if condition {
            parser.parse(input).map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Tries the parser and returns `None` instead of non-fatal errors
pub fn opt<I, O, P>(parser: P) -> impl Parser<I, Option<O>>
where
    I: Clone,
    P: Parser<I, O>,
{
    move |input: &mut I| match parser.parse_peek(input) {
        Ok(o) => Ok(Some(o)),
        Err(ParseError::Recoverable(_)) | Err(ParseError::Incomplete(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn repeat<I, O, P>(parser: P, count: usize) -> impl Parser<I, Vec<O>>
where
    I: Clone,
    P: Parser<I, O>,
{
    move |input: &mut I| (0..count).map(|_| parser.parse(input)).collect()
}

/// Turns missing input into a recoverable error. Used where the input is known to be complete,
/// like the payload of a command class.
pub fn complete<I, O, P>(parser: P) -> impl Parser<I, O>
where
    I: Clone,
    P: Parser<I, O>,
{
    move |input: &mut I| match parser.parse(input) {
        Err(ParseError::Incomplete(n)) => Err(ParseError::recoverable(format!(
            "unexpected end of input, {:?} more bytes needed",
            n
        ))),
        res => res,
    }
}

/// Replaces the context of non-incomplete errors
pub fn context<I, O, P, C>(ctx: C, parser: P) -> impl Parser<I, O>
where
    I: Clone,
    P: Parser<I, O>,
    C: Clone + Into<ErrorContext>,
{
    move |input: &mut I| match parser.parse(input) {
        Err(ParseError::Recoverable(_)) => Err(ParseError::Recoverable(ctx.clone().into())),
        Err(ParseError::Final(_)) => Err(ParseError::Final(ctx.clone().into())),
        res => res,
    }
}
