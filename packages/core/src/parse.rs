extern crate bytes as bytes_crate;
use bytes_crate::Bytes;

pub mod bytes;
pub mod combinators;

mod error;
pub use error::*;

/// Implemented by types that can be read from the start of a byte buffer, advancing it
pub trait Parsable
where
    Self: Sized,
{
    fn parse(i: &mut Bytes) -> ParseResult<Self>;

    /// Parses the whole buffer, ignoring any trailing bytes
    fn try_from_bytes(data: impl Into<Bytes>) -> ParseResult<Self> {
        let mut data = data.into();
        Self::parse(&mut data)
    }
}

pub trait Parser<I: Clone, O = Self> {
    /// Execute the parser on the input, advancing the input
    fn parse(&self, input: &mut I) -> ParseResult<O>;

    /// Execute the parser on the input, advancing the input only in case of success
    fn parse_peek(&self, input: &mut I) -> ParseResult<O> {
        let checkpoint = input.clone();
        let res = self.parse(input);
        if res.is_err() {
            *input = checkpoint;
        }
        res
    }
}

// Convenience implementation of Parser for functions
impl<I, O, F> Parser<I, O> for F
where
    I: Clone,
    F: Fn(&mut I) -> ParseResult<O>,
{
    fn parse(&self, input: &mut I) -> ParseResult<O> {
        self(input)
    }
}

macro_rules! impl_parser_for_tuple {
    ($($idx:literal),+) => {
        paste::paste! {
            impl<I, $([<O $idx>], [<P $idx>]),+> Parser<I, ($([<O $idx>]),+,)> for ($([<P $idx>]),+,)
            where
                I: Clone,
                $(
                    [<P $idx>]: Parser<I, [<O $idx>]>,
                )+
            {
                fn parse(&self, input: &mut I) -> ParseResult<($([<O $idx>]),+,)> {
                    Ok(($(self.$idx.parse(input)?),+,))
                }
            }
        }
    };
}

impl_parser_for_tuple!(0, 1);
impl_parser_for_tuple!(0, 1, 2);
impl_parser_for_tuple!(0, 1, 2, 3);
impl_parser_for_tuple!(0, 1, 2, 3, 4);
impl_parser_for_tuple!(0, 1, 2, 3, 4, 5);
