extern crate bytes as bytes_crate;
use bytes_crate::{BufMut, Bytes, BytesMut};

pub mod bytes;
pub mod sequence;

pub const DEFAULT_CAPACITY: usize = 64;
const CAPACITY_INCREMENT: usize = 32;

pub trait Serializable {
    /// Write the value into the given buffer
    fn serialize(&self, output: &mut BytesMut);

    fn as_bytes_mut(&self) -> BytesMut {
        let mut output = BytesMut::with_capacity(DEFAULT_CAPACITY);
        self.serialize(&mut output);
        output
    }

    fn as_bytes(&self) -> Bytes {
        self.as_bytes_mut().freeze()
    }
}

// Convenience implementation of Serializable for functions
impl<F> Serializable for F
where
    F: Fn(&mut BytesMut),
{
    fn serialize(&self, output: &mut BytesMut) {
        self(output)
    }
}

impl<T> Serializable for Option<T>
where
    T: Serializable,
{
    fn serialize(&self, output: &mut BytesMut) {
        if let Some(v) = self {
            v.serialize(output);
        }
    }
}

// BytesMut does not grow implicitly on every write path, so all serializers
// reserve before writing.

/// Ensures that the given buffer has enough remaining capacity to write the given number of bytes.
#[inline(always)]
pub(crate) fn ensure_capacity(output: &mut BytesMut, required: usize) {
    if output.remaining_mut() < required {
        // Frames rarely exceed the initial 64 bytes, and if so not by much
        let additional = required.div_ceil(CAPACITY_INCREMENT) * CAPACITY_INCREMENT;
        output.reserve(additional);
    }
}
