use super::{Serializable, ensure_capacity};
use bytes::{BufMut, BytesMut};

macro_rules! impl_int {
    ($un:ident, $bytes:literal) => {
        paste::paste! {
            pub fn [<be_ $un>](val: $un) -> impl Serializable {
                move |output: &mut BytesMut| {
                    ensure_capacity(output, $bytes);
                    output.[<put_ $un>](val);
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

pub fn slice<S>(data: S) -> impl Serializable
where
    S: AsRef<[u8]>,
{
    move |output: &mut BytesMut| {
        let data = data.as_ref();
        ensure_capacity(output, data.len());
        output.extend_from_slice(data);
    }
}

/// Writes a signed value in the given number of bytes (1, 2 or 4), big endian
pub fn sized_int(size: u8, val: i32) -> impl Serializable {
    move |output: &mut BytesMut| match size {
        1 => be_i8(val as i8).serialize(output),
        2 => be_i16(val as i16).serialize(output),
        _ => be_i32(val).serialize(output),
    }
}

pub fn empty(_: &mut BytesMut) {}
