//! Tri-mode wire codec.
//!
//! Every record describes its layout exactly once, in [`Wire::operate`]. The
//! same description is then driven by a [`Reader`], a [`Writer`] or a
//! [`Measurer`], so decode, encode and size can never disagree about field
//! order or width. All multi-byte scalars are big-endian.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("unexpected end of buffer: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },
    #[error("{what} count {count} does not fit in its length field")]
    LengthOverflow { what: &'static str, count: usize },
}

/// A record with a fixed wire schema.
///
/// `operate` must visit fields in wire order. Writers and measurers never
/// mutate the record; readers overwrite every field they visit.
pub trait Wire {
    fn operate<C: Codec>(&mut self, codec: &mut C) -> Result<(), CodecError>;
}

/// An enumeration that round-trips through a raw integer of a declared width.
///
/// Decoding never rejects a value: unknown tags are kept verbatim.
pub trait OpenEnum<R>: Copy {
    fn from_raw(raw: R) -> Self;
    fn to_raw(self) -> R;
}

pub trait Codec: Sized {
    fn u8(&mut self, v: &mut u8) -> Result<(), CodecError>;
    fn i8(&mut self, v: &mut i8) -> Result<(), CodecError>;
    fn u16(&mut self, v: &mut u16) -> Result<(), CodecError>;
    fn i16(&mut self, v: &mut i16) -> Result<(), CodecError>;
    fn u32(&mut self, v: &mut u32) -> Result<(), CodecError>;
    fn i32(&mut self, v: &mut i32) -> Result<(), CodecError>;
    fn u64(&mut self, v: &mut u64) -> Result<(), CodecError>;
    fn i64(&mut self, v: &mut i64) -> Result<(), CodecError>;
    fn f32(&mut self, v: &mut f32) -> Result<(), CodecError>;
    fn f64(&mut self, v: &mut f64) -> Result<(), CodecError>;

    /// Fixed-width ASCII text. Longer text is truncated on write, shorter
    /// text is NUL padded; trailing NULs are stripped on read.
    fn ascii(&mut self, text: &mut String, len: usize) -> Result<(), CodecError>;

    /// Zero bytes on write, skipped on read.
    fn padding(&mut self, len: usize) -> Result<(), CodecError>;

    /// One-byte element count. On read the vector is resized to the decoded
    /// count with default elements, ready to be filled by [`Codec::records`].
    fn count_u8<T: Default>(
        &mut self,
        items: &mut Vec<T>,
        what: &'static str,
    ) -> Result<(), CodecError>;

    /// Four-byte element count, otherwise as [`Codec::count_u8`].
    fn count_u32<T: Default>(
        &mut self,
        items: &mut Vec<T>,
        what: &'static str,
    ) -> Result<(), CodecError>;

    /// Byte blob prefixed with its length in bits (four bytes). The payload
    /// is zero padded to a multiple of eight bytes.
    fn bit_blob(&mut self, data: &mut Vec<u8>) -> Result<(), CodecError>;

    fn record<T: Wire>(&mut self, record: &mut T) -> Result<(), CodecError> {
        record.operate(self)
    }

    fn records<T: Wire>(&mut self, records: &mut [T]) -> Result<(), CodecError> {
        for record in records {
            record.operate(self)?;
        }
        Ok(())
    }

    fn enum_u8<E: OpenEnum<u8>>(&mut self, value: &mut E) -> Result<(), CodecError> {
        let mut raw = value.to_raw();
        self.u8(&mut raw)?;
        *value = E::from_raw(raw);
        Ok(())
    }

    fn enum_u16<E: OpenEnum<u16>>(&mut self, value: &mut E) -> Result<(), CodecError> {
        let mut raw = value.to_raw();
        self.u16(&mut raw)?;
        *value = E::from_raw(raw);
        Ok(())
    }
}

fn blob_padding(len: usize) -> usize {
    (8 - len % 8) % 8
}

macro_rules! read_scalars {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            fn $name(&mut self, v: &mut $ty) -> Result<(), CodecError> {
                *v = <$ty>::from_be_bytes(self.take_array()?);
                Ok(())
            }
        )*
    };
}

macro_rules! write_scalars {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            fn $name(&mut self, v: &mut $ty) -> Result<(), CodecError> {
                self.out.extend_from_slice(&v.to_be_bytes());
                Ok(())
            }
        )*
    };
}

macro_rules! measure_scalars {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            fn $name(&mut self, _v: &mut $ty) -> Result<(), CodecError> {
                self.len += std::mem::size_of::<$ty>();
                Ok(())
            }
        )*
    };
}

pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.buf.len() - self.pos;
        if n > remaining {
            return Err(CodecError::UnexpectedEof {
                needed: n,
                remaining,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}

impl Codec for Reader<'_> {
    read_scalars! {
        u8: u8, i8: i8, u16: u16, i16: i16, u32: u32, i32: i32,
        u64: u64, i64: i64, f32: f32, f64: f64,
    }

    fn ascii(&mut self, text: &mut String, len: usize) -> Result<(), CodecError> {
        let raw = self.take(len)?;
        let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        *text = raw[..end]
            .iter()
            .map(|&b| if b.is_ascii() { b as char } else { '?' })
            .collect();
        Ok(())
    }

    fn padding(&mut self, len: usize) -> Result<(), CodecError> {
        self.take(len).map(|_| ())
    }

    fn count_u8<T: Default>(
        &mut self,
        items: &mut Vec<T>,
        _what: &'static str,
    ) -> Result<(), CodecError> {
        let mut count = 0u8;
        self.u8(&mut count)?;
        items.clear();
        items.resize_with(count as usize, T::default);
        Ok(())
    }

    fn count_u32<T: Default>(
        &mut self,
        items: &mut Vec<T>,
        _what: &'static str,
    ) -> Result<(), CodecError> {
        let mut count = 0u32;
        self.u32(&mut count)?;
        // Every element occupies at least one byte, so a count larger than
        // what is left cannot be honoured.
        let remaining = self.buf.len() - self.pos;
        if count as usize > remaining {
            return Err(CodecError::UnexpectedEof {
                needed: count as usize,
                remaining,
            });
        }
        items.clear();
        items.resize_with(count as usize, T::default);
        Ok(())
    }

    fn bit_blob(&mut self, data: &mut Vec<u8>) -> Result<(), CodecError> {
        let mut bits = 0u32;
        self.u32(&mut bits)?;
        let len = (bits as usize).div_ceil(8);
        *data = self.take(len)?.to_vec();
        self.padding(blob_padding(len))
    }
}

#[derive(Debug, Default)]
pub struct Writer {
    out: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(out: Vec<u8>) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.out
    }
}

impl Codec for Writer {
    write_scalars! {
        u8: u8, i8: i8, u16: u16, i16: i16, u32: u32, i32: i32,
        u64: u64, i64: i64, f32: f32, f64: f64,
    }

    fn ascii(&mut self, text: &mut String, len: usize) -> Result<(), CodecError> {
        let start = self.out.len();
        self.out.extend(
            text.chars()
                .take(len)
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' }),
        );
        self.out.resize(start + len, 0);
        Ok(())
    }

    fn padding(&mut self, len: usize) -> Result<(), CodecError> {
        self.out.resize(self.out.len() + len, 0);
        Ok(())
    }

    fn count_u8<T: Default>(
        &mut self,
        items: &mut Vec<T>,
        what: &'static str,
    ) -> Result<(), CodecError> {
        let mut count = u8::try_from(items.len()).map_err(|_| CodecError::LengthOverflow {
            what,
            count: items.len(),
        })?;
        self.u8(&mut count)
    }

    fn count_u32<T: Default>(
        &mut self,
        items: &mut Vec<T>,
        what: &'static str,
    ) -> Result<(), CodecError> {
        let mut count = u32::try_from(items.len()).map_err(|_| CodecError::LengthOverflow {
            what,
            count: items.len(),
        })?;
        self.u32(&mut count)
    }

    fn bit_blob(&mut self, data: &mut Vec<u8>) -> Result<(), CodecError> {
        let mut bits = data
            .len()
            .checked_mul(8)
            .and_then(|bits| u32::try_from(bits).ok())
            .ok_or(CodecError::LengthOverflow {
                what: "variable datum",
                count: data.len(),
            })?;
        self.u32(&mut bits)?;
        self.out.extend_from_slice(data);
        self.padding(blob_padding(data.len()))
    }
}

#[derive(Debug, Default)]
pub struct Measurer {
    len: usize,
}

impl Measurer {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Codec for Measurer {
    measure_scalars! {
        u8: u8, i8: i8, u16: u16, i16: i16, u32: u32, i32: i32,
        u64: u64, i64: i64, f32: f32, f64: f64,
    }

    fn ascii(&mut self, _text: &mut String, len: usize) -> Result<(), CodecError> {
        self.len += len;
        Ok(())
    }

    fn padding(&mut self, len: usize) -> Result<(), CodecError> {
        self.len += len;
        Ok(())
    }

    fn count_u8<T: Default>(
        &mut self,
        _items: &mut Vec<T>,
        _what: &'static str,
    ) -> Result<(), CodecError> {
        self.len += 1;
        Ok(())
    }

    fn count_u32<T: Default>(
        &mut self,
        _items: &mut Vec<T>,
        _what: &'static str,
    ) -> Result<(), CodecError> {
        self.len += 4;
        Ok(())
    }

    fn bit_blob(&mut self, data: &mut Vec<u8>) -> Result<(), CodecError> {
        self.len += 4 + data.len() + blob_padding(data.len());
        Ok(())
    }
}

/// Encodes `record` into a fresh buffer.
///
/// [`Wire::operate`] takes `&mut self` since one schema also decodes, so the
/// shared-reference helpers here run it on a copy. Callers that encode the
/// same value more than once should clone it themselves and drive the codecs
/// directly, as [`encode_datagram`](super::encode_datagram) does.
pub fn encode<T: Wire + Clone>(record: &T) -> Result<Vec<u8>, CodecError> {
    let mut writer = Writer::new();
    record.clone().operate(&mut writer)?;
    Ok(writer.into_inner())
}

pub fn encode_into<T: Wire + Clone>(record: &T, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let mut writer = Writer::with_buffer(std::mem::take(out));
    let result = record.clone().operate(&mut writer);
    *out = writer.into_inner();
    result
}

pub fn decode<T: Wire + Default>(bytes: &[u8]) -> Result<T, CodecError> {
    let mut reader = Reader::new(bytes);
    let mut record = T::default();
    record.operate(&mut reader)?;
    Ok(record)
}

/// Decodes one record from the front of `bytes` and returns the unread tail.
pub fn decode_prefix<T: Wire + Default>(bytes: &[u8]) -> Result<(T, &[u8]), CodecError> {
    let mut reader = Reader::new(bytes);
    let mut record = T::default();
    record.operate(&mut reader)?;
    Ok((record, reader.remaining()))
}

/// Encoded size of `record` in bytes. Copies the record, see [`encode`].
pub fn measure<T: Wire + Clone>(record: &T) -> usize {
    let mut measurer = Measurer::default();
    // Every Measurer primitive returns Ok.
    let _ = record.clone().operate(&mut measurer);
    measurer.len()
}
