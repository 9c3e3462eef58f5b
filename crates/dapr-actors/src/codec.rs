//! Wire format for remoted method calls.
//!
//! Request: `[interface_id:4][method_id:4][arg_count:4]([len:4][arg:len])*`
//! Response: `[has_value:1]([len:4][value:len])?`
//!
//! All integers are big-endian. Arguments and return values are produced by
//! the serializer registry; the codec never looks inside them. Raw
//! (non-remoted) invocations bypass this module entirely.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::MalformedMessageError;

/// interface_id + method_id + arg_count
pub const REQUEST_HEADER_SIZE: usize = 12;

/// has_value flag
pub const RESPONSE_HEADER_SIZE: usize = 1;

const LENGTH_PREFIX_SIZE: usize = 4;

const NO_VALUE: u8 = 0;
const HAS_VALUE: u8 = 1;

/// A remoted call: numeric interface/method ids plus serialized arguments in
/// declared order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnvelope {
    pub interface_id: i32,
    pub method_id: i32,
    pub arguments: Vec<Bytes>,
}

impl RequestEnvelope {
    pub fn encode(&self) -> Bytes {
        let size = REQUEST_HEADER_SIZE
            + self
                .arguments
                .iter()
                .map(|argument| LENGTH_PREFIX_SIZE + argument.len())
                .sum::<usize>();

        let mut buf = BytesMut::with_capacity(size);
        buf.put_i32(self.interface_id);
        buf.put_i32(self.method_id);
        buf.put_u32(self.arguments.len() as u32);
        for argument in &self.arguments {
            put_chunk(&mut buf, argument);
        }
        buf.freeze()
    }

    pub fn decode(mut buf: Bytes) -> Result<Self, MalformedMessageError> {
        ensure_remaining(&buf, REQUEST_HEADER_SIZE, "request header")?;
        let interface_id = buf.get_i32();
        let method_id = buf.get_i32();
        let count = buf.get_u32() as usize;

        // A corrupt count must not drive the allocation
        let mut arguments = Vec::with_capacity(count.min(buf.remaining() / LENGTH_PREFIX_SIZE));
        for _ in 0..count {
            arguments.push(take_chunk(&mut buf, "argument")?);
        }
        ensure_consumed(&buf)?;

        Ok(Self {
            interface_id,
            method_id,
            arguments,
        })
    }
}

/// The reply to a remoted call. `None` is a void return, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub value: Option<Bytes>,
}

impl ResponseEnvelope {
    pub fn void() -> Self {
        Self { value: None }
    }

    pub fn with_value(value: impl Into<Bytes>) -> Self {
        Self {
            value: Some(value.into()),
        }
    }

    pub fn encode(&self) -> Bytes {
        match &self.value {
            None => Bytes::from_static(&[NO_VALUE]),
            Some(value) => {
                let mut buf =
                    BytesMut::with_capacity(RESPONSE_HEADER_SIZE + LENGTH_PREFIX_SIZE + value.len());
                buf.put_u8(HAS_VALUE);
                put_chunk(&mut buf, value);
                buf.freeze()
            }
        }
    }

    pub fn decode(mut buf: Bytes) -> Result<Self, MalformedMessageError> {
        ensure_remaining(&buf, RESPONSE_HEADER_SIZE, "response header")?;
        let value = match buf.get_u8() {
            NO_VALUE => None,
            HAS_VALUE => Some(take_chunk(&mut buf, "return value")?),
            flag => return Err(MalformedMessageError::InvalidFlag(flag)),
        };
        ensure_consumed(&buf)?;

        Ok(Self { value })
    }
}

fn put_chunk(buf: &mut BytesMut, chunk: &[u8]) {
    buf.put_u32(chunk.len() as u32);
    buf.put_slice(chunk);
}

fn take_chunk(buf: &mut Bytes, what: &'static str) -> Result<Bytes, MalformedMessageError> {
    ensure_remaining(buf, LENGTH_PREFIX_SIZE, what)?;
    let len = buf.get_u32() as usize;
    ensure_remaining(buf, len, what)?;
    Ok(buf.split_to(len))
}

fn ensure_remaining(
    buf: &Bytes,
    needed: usize,
    what: &'static str,
) -> Result<(), MalformedMessageError> {
    if buf.remaining() < needed {
        return Err(MalformedMessageError::Truncated {
            what,
            needed,
            available: buf.remaining(),
        });
    }
    Ok(())
}

fn ensure_consumed(buf: &Bytes) -> Result<(), MalformedMessageError> {
    if buf.has_remaining() {
        return Err(MalformedMessageError::TrailingBytes(buf.remaining()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_layout() {
        let envelope = RequestEnvelope {
            interface_id: 7,
            method_id: -2,
            arguments: vec![Bytes::from_static(b"ab"), Bytes::new()],
        };

        let encoded = envelope.encode();
        assert_eq!(
            encoded.as_ref(),
            &[
                0, 0, 0, 7, // interface
                0xff, 0xff, 0xff, 0xfe, // method
                0, 0, 0, 2, // count
                0, 0, 0, 2, b'a', b'b', // first argument
                0, 0, 0, 0, // empty second argument
            ]
        );
        assert_eq!(RequestEnvelope::decode(encoded).unwrap(), envelope);
    }

    #[test]
    fn test_void_response_is_single_byte() {
        let encoded = ResponseEnvelope::void().encode();
        assert_eq!(encoded.as_ref(), &[0]);
        assert_eq!(ResponseEnvelope::decode(encoded).unwrap().value, None);
    }

    #[test]
    fn test_value_response() {
        let encoded = ResponseEnvelope::with_value(&b"\"ok\""[..]).encode();
        assert_eq!(&encoded[..5], &[1, 0, 0, 0, 4]);
        assert_eq!(
            ResponseEnvelope::decode(encoded).unwrap().value,
            Some(Bytes::from_static(b"\"ok\""))
        );
    }

    #[test]
    fn test_short_header_is_malformed() {
        assert_eq!(
            RequestEnvelope::decode(Bytes::from_static(&[0, 0, 0, 1, 0])),
            Err(MalformedMessageError::Truncated {
                what: "request header",
                needed: REQUEST_HEADER_SIZE,
                available: 5,
            })
        );
        assert!(matches!(
            ResponseEnvelope::decode(Bytes::new()),
            Err(MalformedMessageError::Truncated { needed: 1, available: 0, .. })
        ));
    }

    #[test]
    fn test_truncated_argument() {
        // Declares one argument of 10 bytes but carries 3
        let buf = Bytes::from_static(&[0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 10, 1, 2, 3]);
        assert_eq!(
            RequestEnvelope::decode(buf),
            Err(MalformedMessageError::Truncated {
                what: "argument",
                needed: 10,
                available: 3,
            })
        );
    }

    #[test]
    fn test_huge_argument_count_does_not_allocate() {
        let buf = Bytes::from_static(&[0, 0, 0, 1, 0, 0, 0, 1, 0xff, 0xff, 0xff, 0xff]);
        assert!(matches!(
            RequestEnvelope::decode(buf),
            Err(MalformedMessageError::Truncated { what: "argument", .. })
        ));
    }

    #[test]
    fn test_bad_flag_and_trailing_bytes() {
        assert_eq!(
            ResponseEnvelope::decode(Bytes::from_static(&[2])),
            Err(MalformedMessageError::InvalidFlag(2))
        );
        assert_eq!(
            ResponseEnvelope::decode(Bytes::from_static(&[0, 9, 9])),
            Err(MalformedMessageError::TrailingBytes(2))
        );
    }
}
