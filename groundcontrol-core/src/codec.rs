//! Binary wire codec for [`Event`](crate::event::Event).
//!
//! Layout (all multi-byte lengths little-endian):
//!
//! ```text
//! [major: u8] [minor: u8] [toc: u8]
//! if toc & 0b001: [len: u32-le] [recipient bytes]
//! if toc & 0b010: [len: u32-le] [type bytes]
//! if toc & 0b100: [count: u32-le] ([keylen: u32-le][key] [vallen: u32-le][val]) * count
//! ```
//!
//! The codec is pure: no I/O, no allocation beyond the output buffer and the
//! decoded fields themselves. Framing (the separate 4-byte length header
//! that precedes an encoded event on the wire) is the caller's
//! responsibility; see `groundcontrol::net` for that half.

use crate::error::{CodecError, Result};
use crate::event::{Event, Properties, CURRENT_VERSION};
use bytes::{Bytes, BytesMut};

const FLAG_RECIPIENT: u8 = 1 << 0;
const FLAG_TYPE: u8 = 1 << 1;
const FLAG_PROPERTIES: u8 = 1 << 2;

/// Encode an event into its wire representation.
///
/// Infallible: see the note on [`CodecError`](crate::error::CodecError) for
/// why a non-byte-string field error has no counterpart here.
#[must_use]
pub fn encode(event: &Event) -> Bytes {
    let mut out = BytesMut::new();
    let (major, minor) = event.version();
    out.extend_from_slice(&[major, minor]);

    let mut toc = 0u8;
    if event.recipient().is_some() {
        toc |= FLAG_RECIPIENT;
    }
    if event.event_type().is_some() {
        toc |= FLAG_TYPE;
    }
    if event.properties().is_some() {
        toc |= FLAG_PROPERTIES;
    }
    out.extend_from_slice(&[toc]);

    if let Some(recipient) = event.recipient() {
        write_field(&mut out, recipient);
    }
    if let Some(event_type) = event.event_type() {
        write_field(&mut out, event_type);
    }
    if let Some(properties) = event.properties() {
        write_properties(&mut out, properties);
    }

    out.freeze()
}

fn write_field(out: &mut BytesMut, field: &[u8]) {
    let len = saturate_len(field.len());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&field[..len as usize]);
}

fn write_properties(out: &mut BytesMut, properties: &Properties) {
    let count = saturate_len(properties.len());
    out.extend_from_slice(&count.to_le_bytes());
    for (key, value) in properties.iter().take(count as usize) {
        write_field(out, key);
        write_field(out, value);
    }
}

fn saturate_len(len: usize) -> u32 {
    len.min(u32::MAX as usize) as u32
}

/// Decode an event from its wire representation.
///
/// # Errors
///
/// Returns [`CodecError::Truncated`] or [`CodecError::TruncatedProperty`] if
/// `bytes` ends before a declared field or property has been fully read.
/// Returns [`CodecError::VersionMismatch`] if the major version does not
/// match [`CURRENT_VERSION`]'s; a differing minor version is accepted, on
/// the assumption that minor bumps only add fields within the same layout.
pub fn decode(bytes: &[u8]) -> Result<Event> {
    let mut cursor = Cursor::new(bytes);

    let major = cursor.take_u8()?;
    let minor = cursor.take_u8()?;
    if major != CURRENT_VERSION.0 {
        return Err(CodecError::VersionMismatch { major, minor });
    }
    let toc = cursor.take_u8()?;

    let recipient = if toc & FLAG_RECIPIENT != 0 {
        Some(cursor.take_field()?)
    } else {
        None
    };

    let event_type = if toc & FLAG_TYPE != 0 {
        Some(cursor.take_field()?)
    } else {
        None
    };

    let properties = if toc & FLAG_PROPERTIES != 0 {
        let count = cursor.take_u32_le()? as usize;
        let mut props = Properties::with_capacity(count);
        for index in 0..count {
            let key = cursor
                .take_field()
                .map_err(|_| CodecError::TruncatedProperty { index })?;
            let value = cursor
                .take_field()
                .map_err(|_| CodecError::TruncatedProperty { index })?;
            props.insert(key, value);
        }
        Some(props)
    } else {
        None
    };

    Ok(Event::from_parts((major, minor), recipient, event_type, properties))
}

/// A small forward-only byte cursor used only by [`decode`].
struct Cursor<'a> {
    remaining: &'a [u8],
}

impl<'a> Cursor<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { remaining: bytes }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining.len() < n {
            return Err(CodecError::Truncated {
                expected: n,
                found: self.remaining.len(),
            });
        }
        let (head, tail) = self.remaining.split_at(n);
        self.remaining = tail;
        Ok(head)
    }

    fn take_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn take_u32_le(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn take_field(&mut self) -> Result<Bytes> {
        let len = self.take_u32_le()? as usize;
        Ok(Bytes::copy_from_slice(self.take(len)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn round_trips_empty_event() {
        let ev = Event::new();
        let encoded = encode(&ev);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, ev);
    }

    #[test]
    fn round_trips_full_event() {
        let ev = Event::new()
            .with_recipient(Bytes::from_static(b"sat-7"))
            .with_type(Bytes::from_static(b"x"))
            .with_property(Bytes::from_static(b"k"), Bytes::from_static(b"v"))
            .with_property(Bytes::from_static(b"k2"), Bytes::from_static(b"v2"));

        let encoded = encode(&ev);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, ev);
    }

    /// Encoding an event with a type and two properties begins with version
    /// 0x00 0x01, toc 0x06 (type|properties), then the type field, then the
    /// property count.
    #[test]
    fn s5_matches_literal_byte_layout() {
        let ev = Event::new()
            .with_type(Bytes::from_static(b"x"))
            .with_property(Bytes::from_static(b"k"), Bytes::from_static(b"v"))
            .with_property(Bytes::from_static(b"k2"), Bytes::from_static(b"v2"));

        let encoded = encode(&ev);
        assert_eq!(&encoded[0..2], &[0x00, 0x01]);
        assert_eq!(encoded[2], 0x06);
        assert_eq!(&encoded[3..7], &[0x01, 0x00, 0x00, 0x00]);
        assert_eq!(&encoded[7..8], b"x");
        assert_eq!(&encoded[8..12], &[0x02, 0x00, 0x00, 0x00]);

        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, ev);
    }

    #[test]
    fn truncated_stream_is_format_error() {
        let ev = Event::new().with_type(Bytes::from_static(b"motion"));
        let encoded = encode(&ev);
        let truncated = &encoded[..encoded.len() - 2];
        assert!(matches!(
            decode(truncated),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn rejects_mismatched_major_version() {
        let ev = Event::new().with_type(Bytes::from_static(b"motion"));
        let mut encoded = encode(&ev).to_vec();
        encoded[0] = 7; // bogus major version
        assert!(matches!(
            decode(&encoded),
            Err(CodecError::VersionMismatch { major: 7, minor: 1 })
        ));
    }

    #[test]
    fn accepts_differing_minor_version() {
        let ev = Event::new().with_type(Bytes::from_static(b"motion"));
        let mut encoded = encode(&ev).to_vec();
        encoded[1] = 9; // differing minor version, same major
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.event_type(), Some(&b"motion"[..]));
        assert_eq!(decoded.version(), (0, 9));
    }

    #[test]
    fn length_fields_are_little_endian() {
        let ev = Event::new().with_recipient(Bytes::from_static(b"ab"));
        let encoded = encode(&ev);
        // version(2) + toc(1) + len(4) -> len bytes at offset 3..7
        assert_eq!(&encoded[3..7], &[0x02, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn property_ordering_is_not_significant() {
        let a = Event::new()
            .with_property(Bytes::from_static(b"a"), Bytes::from_static(b"1"))
            .with_property(Bytes::from_static(b"b"), Bytes::from_static(b"2"));
        let b = Event::new()
            .with_property(Bytes::from_static(b"b"), Bytes::from_static(b"2"))
            .with_property(Bytes::from_static(b"a"), Bytes::from_static(b"1"));
        assert_eq!(a, b);
        assert_eq!(decode(&encode(&a)).unwrap(), decode(&encode(&b)).unwrap());
    }
}
