use std::borrow::Cow;
use unicode_segmentation::UnicodeSegmentation;

#[macro_export]
macro_rules! submodule {
    ($name:ident) => {
        mod $name;
        pub use $name::*;
    };
}

/// Creates a `Bytes` instance from a hex string. Panics on invalid input, so this is meant for tests
/// and constants only.
#[macro_export]
macro_rules! hex_bytes {
    ($hex:expr) => {
        ::bytes::Bytes::from(::hex::decode($hex).expect("invalid hex literal"))
    };
}

/// Creates a `Vec<u8>` from a hex string. Panics on invalid input.
#[macro_export]
macro_rules! hex_literal {
    ($hex:expr) => {
        ::hex::decode($hex).expect("invalid hex literal")
    };
}

/// Returns the display width of a string in grapheme clusters
pub fn str_width(s: &str) -> usize {
    s.graphemes(true).count()
}

/// Splits a (possibly multi-line) string into its lines
pub fn to_lines(text: impl Into<Cow<'static, str>>) -> Vec<Cow<'static, str>> {
    match text.into() {
        Cow::Borrowed(s) => s.split('\n').map(Cow::Borrowed).collect(),
        Cow::Owned(s) => s.split('\n').map(|l| Cow::Owned(l.to_owned())).collect(),
    }
}

/// Formats a byte buffer as `0x...`, for use with `custom_debug_derive`
pub fn hex_fmt<T: AsRef<[u8]>>(data: &T, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "0x{}", hex::encode(data.as_ref()))
}

#[test]
fn test_to_lines() {
    assert_eq!(to_lines("foo"), vec!["foo"]);
    assert_eq!(to_lines(String::from("foo\nbar")), vec!["foo", "bar"]);
}

#[test]
fn test_str_width() {
    assert_eq!(str_width("Node 003"), 8);
    assert_eq!(str_width("«"), 1);
}
