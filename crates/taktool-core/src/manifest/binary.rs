//! Little-endian chunk primitives shared by the binary XML and resource
//! table decoders.

use thiserror::Error;

pub(crate) const RES_STRING_POOL_TYPE: u16 = 0x0001;

pub(crate) const TYPE_NULL: u8 = 0x00;
pub(crate) const TYPE_REFERENCE: u8 = 0x01;
pub(crate) const TYPE_ATTRIBUTE: u8 = 0x02;
pub(crate) const TYPE_STRING: u8 = 0x03;
pub(crate) const TYPE_FLOAT: u8 = 0x04;
pub(crate) const TYPE_DYNAMIC_REFERENCE: u8 = 0x07;
pub(crate) const TYPE_INT_DEC: u8 = 0x10;
pub(crate) const TYPE_INT_HEX: u8 = 0x11;
pub(crate) const TYPE_INT_BOOLEAN: u8 = 0x12;
pub(crate) const TYPE_FIRST_COLOR: u8 = 0x1c;
pub(crate) const TYPE_LAST_COLOR: u8 = 0x1f;

pub(crate) const NO_ENTRY: u32 = 0xFFFF_FFFF;

const UTF8_FLAG: u32 = 1 << 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of data at offset {offset}")]
    Truncated { offset: usize },

    #[error("expected chunk type 0x{expected:04x}, found 0x{found:04x}")]
    UnexpectedChunk { expected: u16, found: u16 },

    #[error("malformed chunk at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: &'static str },

    #[error("string index {index} out of range")]
    StringIndex { index: u32 },

    #[error("missing string pool")]
    MissingStringPool,
}

pub(crate) type DecodeResult<T> = std::result::Result<T, DecodeError>;

pub(crate) fn u8_at(data: &[u8], offset: usize) -> DecodeResult<u8> {
    data.get(offset)
        .copied()
        .ok_or(DecodeError::Truncated { offset })
}

pub(crate) fn u16_at(data: &[u8], offset: usize) -> DecodeResult<u16> {
    let bytes = data
        .get(offset..offset + 2)
        .ok_or(DecodeError::Truncated { offset })?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

pub(crate) fn u32_at(data: &[u8], offset: usize) -> DecodeResult<u32> {
    let bytes = data
        .get(offset..offset + 4)
        .ok_or(DecodeError::Truncated { offset })?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Common header in front of every chunk
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChunkHeader {
    pub kind: u16,
    pub header_size: usize,
    pub size: usize,
}

impl ChunkHeader {
    pub(crate) fn read(data: &[u8], offset: usize) -> DecodeResult<Self> {
        let kind = u16_at(data, offset)?;
        let header_size = u16_at(data, offset + 2)? as usize;
        let size = u32_at(data, offset + 4)? as usize;

        if header_size < 8 || size < header_size {
            return Err(DecodeError::Malformed {
                offset,
                reason: "chunk smaller than its header",
            });
        }
        if offset + size > data.len() {
            return Err(DecodeError::Truncated {
                offset: offset + size,
            });
        }

        Ok(Self {
            kind,
            header_size,
            size,
        })
    }

    pub(crate) fn expect(data: &[u8], offset: usize, kind: u16) -> DecodeResult<Self> {
        let header = Self::read(data, offset)?;
        if header.kind != kind {
            return Err(DecodeError::UnexpectedChunk {
                expected: kind,
                found: header.kind,
            });
        }
        Ok(header)
    }
}

/// Iterate the child chunks in `data[start..end]`.
pub(crate) fn chunks(
    data: &[u8],
    start: usize,
    end: usize,
) -> impl Iterator<Item = DecodeResult<(usize, ChunkHeader)>> + '_ {
    let mut offset = start;
    let mut failed = false;
    std::iter::from_fn(move || {
        if failed || offset + 8 > end {
            return None;
        }
        match ChunkHeader::read(&data[..end], offset) {
            Ok(header) => {
                let at = offset;
                offset += header.size;
                Some(Ok((at, header)))
            }
            Err(e) => {
                failed = true;
                Some(Err(e))
            }
        }
    })
}

/// Decoded `ResStringPool`
#[derive(Debug, Default)]
pub(crate) struct StringPool {
    strings: Vec<String>,
}

impl StringPool {
    /// Decode the pool chunk that starts at `chunk[0]`.
    pub(crate) fn decode(chunk: &[u8]) -> DecodeResult<Self> {
        let header = ChunkHeader::expect(chunk, 0, RES_STRING_POOL_TYPE)?;
        let count = u32_at(chunk, 8)? as usize;
        let flags = u32_at(chunk, 16)?;
        let strings_start = u32_at(chunk, 20)? as usize;
        let utf8 = flags & UTF8_FLAG != 0;

        let chunk = &chunk[..header.size];
        let mut strings = Vec::with_capacity(count.min(chunk.len() / 4));
        for i in 0..count {
            let offset = u32_at(chunk, header.header_size + i * 4)? as usize;
            let at = strings_start + offset;
            let value = if utf8 {
                decode_utf8(chunk, at)?
            } else {
                decode_utf16(chunk, at)?
            };
            strings.push(value);
        }

        Ok(Self { strings })
    }

    pub(crate) fn get(&self, index: u32) -> DecodeResult<&str> {
        self.strings
            .get(index as usize)
            .map(String::as_str)
            .ok_or(DecodeError::StringIndex { index })
    }

    pub(crate) fn len(&self) -> usize {
        self.strings.len()
    }
}

fn decode_utf8(data: &[u8], at: usize) -> DecodeResult<String> {
    // UTF-16 length first, then the byte length; both are 1 or 2 bytes
    let (_, skip) = utf8_length(data, at)?;
    let (len, skip2) = utf8_length(data, at + skip)?;
    let start = at + skip + skip2;
    let bytes = data
        .get(start..start + len)
        .ok_or(DecodeError::Truncated { offset: start })?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

fn utf8_length(data: &[u8], at: usize) -> DecodeResult<(usize, usize)> {
    let first = u8_at(data, at)? as usize;
    if first & 0x80 != 0 {
        let second = u8_at(data, at + 1)? as usize;
        Ok((((first & 0x7F) << 8) | second, 2))
    } else {
        Ok((first, 1))
    }
}

fn decode_utf16(data: &[u8], at: usize) -> DecodeResult<String> {
    let first = u16_at(data, at)? as usize;
    let (len, skip) = if first & 0x8000 != 0 {
        let second = u16_at(data, at + 2)? as usize;
        (((first & 0x7FFF) << 16) | second, 4)
    } else {
        (first, 2)
    };

    let start = at + skip;
    let units = (0..len)
        .map(|i| u16_at(data, start + i * 2))
        .collect::<DecodeResult<Vec<u16>>>()?;
    Ok(String::from_utf16_lossy(&units))
}

/// Render a non-string, non-reference typed value.
pub(crate) fn render_scalar(data_type: u8, data: u32) -> String {
    match data_type {
        TYPE_NULL => String::new(),
        TYPE_INT_DEC => (data as i32).to_string(),
        TYPE_INT_HEX => format!("0x{:08x}", data),
        TYPE_INT_BOOLEAN => (data != 0).to_string(),
        TYPE_FLOAT => f32::from_bits(data).to_string(),
        TYPE_ATTRIBUTE => format!("?0x{:08x}", data),
        TYPE_REFERENCE | TYPE_DYNAMIC_REFERENCE => format!("@0x{:08x}", data),
        TYPE_FIRST_COLOR..=TYPE_LAST_COLOR => format!("#{:08x}", data),
        _ => format!("0x{:08x}", data),
    }
}
