//! Versioned binary records. Every record is framed by a start marker, its format version
//! and an end marker. Fields are written in a fixed order, fields added in later versions
//! are appended and get their default when an older record is read.

use crate::device_info::ManIds;
use crate::error::PersistError;
use crate::unit_info::{UnitOptions, UnitRecord};
use bytes::{Bytes, BytesMut};
use zwave_core::parse::bytes::{be_u8, be_u16, be_u32, take};
use zwave_core::prelude::*;
use zwave_core::serialize::bytes::{be_u8 as put_u8, be_u16 as put_u16, be_u32 as put_u32, slice};

pub const START_MARKER: u8 = 0x5a;
pub const END_MARKER: u8 = 0xa5;

pub type PersistResult<T> = Result<T, PersistError>;

/// A record that can be written to and read from persistent storage
pub trait Persist: Sized {
    /// The version written by [`Persist::persist`] and the highest one [`Persist::restore`] reads
    const VERSION: u16;

    fn write_fields(&self, output: &mut BytesMut);

    /// Reads the fields of a record with the given format version
    fn read_fields(input: &mut Bytes, version: u16) -> PersistResult<Self>;

    fn write_to(&self, output: &mut BytesMut) {
        put_u8(START_MARKER).serialize(output);
        put_u16(Self::VERSION).serialize(output);
        self.write_fields(output);
        put_u8(END_MARKER).serialize(output);
    }

    fn persist(&self) -> Bytes {
        let mut output = BytesMut::new();
        self.write_to(&mut output);
        output.freeze()
    }

    /// Reads one record from the start of the input, advancing it
    fn read_from(input: &mut Bytes) -> PersistResult<Self> {
        read_with_max(input, Self::VERSION)
    }

    fn restore(data: impl Into<Bytes>) -> PersistResult<Self> {
        Self::read_from(&mut data.into())
    }
}

/// Reads a record, rejecting versions above `max`
pub fn read_with_max<T: Persist>(input: &mut Bytes, max: u16) -> PersistResult<T> {
    expect_marker(input, START_MARKER)?;
    let version = be_u16(input)?;
    if version > max {
        return Err(PersistError::VersionTooHigh { found: version, max });
    }
    if version == 0 {
        return Err(PersistError::Invalid("version 0".to_string()));
    }
    let ret = T::read_fields(input, version)?;
    expect_marker(input, END_MARKER)?;
    Ok(ret)
}

fn expect_marker(input: &mut Bytes, expected: u8) -> PersistResult<()> {
    let found = be_u8(input)?;
    if found != expected {
        return Err(PersistError::BadMarker { expected, found });
    }
    Ok(())
}

/// Writes a length-prefixed string. Longer strings are cut at the last character that fits.
pub fn write_str(output: &mut BytesMut, s: &str) {
    let mut end = s.len().min(u16::MAX as usize);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    put_u16(end as u16).serialize(output);
    slice(&s.as_bytes()[..end]).serialize(output);
}

pub fn read_str(input: &mut Bytes) -> PersistResult<String> {
    let len = be_u16(input)?;
    let data = take(len).parse(input)?;
    String::from_utf8(data.to_vec()).map_err(|e| PersistError::Invalid(e.to_string()))
}

pub fn write_bool(output: &mut BytesMut, value: bool) {
    put_u8(value as u8).serialize(output);
}

pub fn read_bool(input: &mut Bytes) -> PersistResult<bool> {
    match be_u8(input)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(PersistError::Invalid(format!("{:#04x} is not a boolean", other))),
    }
}

impl Persist for ManIds {
    const VERSION: u16 = 1;

    fn write_fields(&self, output: &mut BytesMut) {
        put_u16(self.manufacturer).serialize(output);
        put_u16(self.product_type).serialize(output);
        put_u16(self.product_id).serialize(output);
    }

    fn read_fields(input: &mut Bytes, _version: u16) -> PersistResult<Self> {
        let (manufacturer, product_type, product_id) = (be_u16, be_u16, be_u16).parse(input)?;
        Ok(Self::new(manufacturer, product_type, product_id))
    }
}

impl Persist for UnitOptions {
    const VERSION: u16 = 1;

    fn write_fields(&self, output: &mut BytesMut) {
        put_u16(self.len() as u16).serialize(output);
        for (key, value) in self.iter() {
            write_str(output, key);
            write_str(output, value);
        }
    }

    fn read_fields(input: &mut Bytes, _version: u16) -> PersistResult<Self> {
        let count = be_u16(input)?;
        (0..count)
            .map(|_| -> PersistResult<(String, String)> { Ok((read_str(input)?, read_str(input)?)) })
            .collect()
    }
}

/// v1: node id, name, manufacturer ids.
/// v2: adds the options, the serial and the manual binding flag.
impl Persist for UnitRecord {
    const VERSION: u16 = 2;

    fn write_fields(&self, output: &mut BytesMut) {
        put_u8(self.node_id.raw()).serialize(output);
        write_str(output, &self.name);
        self.man_ids.write_to(output);
        // v2
        self.options.write_to(output);
        put_u32(self.serial).serialize(output);
        write_bool(output, self.manual_binding);
    }

    fn read_fields(input: &mut Bytes, version: u16) -> PersistResult<Self> {
        let node_id = NodeId::new(be_u8(input)?);
        let name = read_str(input)?;
        let man_ids = ManIds::read_from(input)?;
        let mut ret = Self {
            node_id,
            name,
            man_ids,
            manual_binding: false,
            options: UnitOptions::default(),
            serial: 0,
        };
        if version >= 2 {
            ret.options = UnitOptions::read_from(input)?;
            ret.serial = be_u32(input)?;
            ret.manual_binding = read_bool(input)?;
        }
        Ok(ret)
    }
}
