use super::{Needed, ParseError, ParseResult, Parser};
use bytes::{Buf, Bytes};

/// Takes exactly `count` bytes. Fails with [`ParseError::Incomplete`] if the input is too short.
pub fn take(count: impl Into<usize>) -> impl Parser<Bytes, Bytes> {
    let count: usize = count.into();
    move |input: &mut Bytes| {
        if input.len() < count {
            Err(ParseError::needed(count - input.len()))
        } else {
            Ok(input.split_to(count))
        }
    }
}

/// Takes bytes as long as the predicate holds, possibly none
pub fn take_while(predicate: impl Fn(u8) -> bool) -> impl Parser<Bytes, Bytes> {
    move |input: &mut Bytes| {
        let end = input
            .iter()
            .position(|v| !predicate(*v))
            .unwrap_or(input.len());
        Ok(input.split_to(end))
    }
}

/// Expects the given byte. A mismatch is recoverable so alternatives can be tried.
pub fn literal(lit: u8) -> impl Parser<Bytes, u8> {
    move |input: &mut Bytes| {
        let Some(&b) = input.first() else {
            return Err(ParseError::needed(1));
        };
        if b == lit {
            input.advance(1);
            Ok(lit)
        } else {
            Err(ParseError::recoverable(format!(
                "expected {:#04x}, found {:#04x}",
                lit, b
            )))
        }
    }
}

/// Consumes the given number of bytes without producing any output
pub fn skip(count: impl Into<usize>) -> impl Parser<Bytes, ()> {
    let count: usize = count.into();
    move |input: &mut Bytes| {
        take(count).parse(input)?;
        Ok(())
    }
}

/// Takes everything that is left
pub fn rest(input: &mut Bytes) -> ParseResult<Bytes> {
    Ok(input.split_to(input.len()))
}

/// Takes a length byte followed by that many bytes
pub fn length_prefixed(input: &mut Bytes) -> ParseResult<Bytes> {
    let len = be_u8(input)?;
    take(len).parse(input)
}

macro_rules! impl_int {
    ($un:ident, 1) => {
        paste::paste! {
            pub fn [<be_ $un>](input: &mut Bytes) -> ParseResult<$un> {
                if input.remaining() < 1 {
                    Err(ParseError::Incomplete(Needed::Size(1)))
                } else {
                    Ok(input.[<get_ $un>]())
                }
            }
        }
    };
    ($un:ident, $bytes:literal) => {
        paste::paste! {
            pub fn [<be_ $un>](input: &mut Bytes) -> ParseResult<$un> {
                if input.remaining() < $bytes {
                    Err(ParseError::Incomplete(Needed::Size($bytes - input.remaining())))
                } else {
                    Ok(input.[<get_ $un>]())
                }
            }
        }
    };
}

impl_int!(u8, 1);
impl_int!(u16, 2);
impl_int!(u32, 4);
impl_int!(i8, 1);
impl_int!(i16, 2);
impl_int!(i32, 4);
