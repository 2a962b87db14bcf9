//! Compiled resource table (`resources.arsc`)
//!
//! Only what is needed to turn `@string/...` and `@mipmap/...` references in
//! the manifest into text: simple entry values per resource id. Bag (style,
//! array, plural) entries are skipped.

use std::collections::HashMap;

use super::binary::{
    chunks, render_scalar, u16_at, u32_at, u8_at, ChunkHeader, DecodeError, DecodeResult,
    StringPool, NO_ENTRY, RES_STRING_POOL_TYPE, TYPE_DYNAMIC_REFERENCE, TYPE_REFERENCE,
    TYPE_STRING,
};

const RES_TABLE_TYPE: u16 = 0x0002;
const RES_TABLE_PACKAGE_TYPE: u16 = 0x0200;
const RES_TABLE_TYPE_TYPE: u16 = 0x0201;

const FLAG_SPARSE: u8 = 0x01;
const FLAG_OFFSET16: u8 = 0x02;

const ENTRY_FLAG_COMPLEX: u16 = 0x0001;
const ENTRY_FLAG_COMPACT: u16 = 0x0008;

/// Reference chains longer than this are treated as unresolvable
const MAX_REFERENCE_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy)]
struct TableValue {
    data_type: u8,
    data: u32,
    default_config: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ResourceTable {
    strings: StringPool,
    values: HashMap<u32, TableValue>,
}

impl ResourceTable {
    pub(crate) fn decode(data: &[u8]) -> DecodeResult<Self> {
        let header = ChunkHeader::expect(data, 0, RES_TABLE_TYPE)?;
        let mut table = Self::default();
        let mut has_pool = false;

        for chunk in chunks(data, header.header_size, header.size) {
            let (offset, child) = chunk?;
            let body = &data[offset..offset + child.size];
            match child.kind {
                RES_STRING_POOL_TYPE if !has_pool => {
                    table.strings = StringPool::decode(body)?;
                    has_pool = true;
                }
                RES_TABLE_PACKAGE_TYPE => table.read_package(body)?,
                _ => {}
            }
        }

        if !has_pool {
            return Err(DecodeError::MissingStringPool);
        }
        Ok(table)
    }

    fn read_package(&mut self, package: &[u8]) -> DecodeResult<()> {
        let header = ChunkHeader::read(package, 0)?;
        let package_id = u32_at(package, 8)?;

        for chunk in chunks(package, header.header_size, header.size) {
            let (offset, child) = chunk?;
            if child.kind == RES_TABLE_TYPE_TYPE {
                self.read_type(package_id, &package[offset..offset + child.size])?;
            }
        }
        Ok(())
    }

    fn read_type(&mut self, package_id: u32, chunk: &[u8]) -> DecodeResult<()> {
        let header = ChunkHeader::read(chunk, 0)?;
        let type_id = u8_at(chunk, 8)? as u32;
        let flags = u8_at(chunk, 9)?;
        let entry_count = u32_at(chunk, 12)? as usize;
        let entries_start = u32_at(chunk, 16)? as usize;
        let default_config = is_default_config(chunk, header.header_size)?;

        for (index, offset) in entry_offsets(chunk, header.header_size, flags, entry_count)? {
            let at = entries_start + offset;
            let Some((data_type, data)) = read_entry(chunk, at)? else {
                continue;
            };
            let id = (package_id << 24) | (type_id << 16) | index as u32;
            let value = TableValue {
                data_type,
                data,
                default_config,
            };

            // Keep the first configuration seen unless a default one shows up later
            match self.values.get(&id) {
                Some(existing) if existing.default_config || !default_config => {}
                _ => {
                    self.values.insert(id, value);
                }
            }
        }
        Ok(())
    }

    /// Resolve a resource id to text, following references.
    pub(crate) fn resolve(&self, id: u32) -> Option<String> {
        let mut id = id;
        for _ in 0..MAX_REFERENCE_DEPTH {
            let value = self.values.get(&id)?;
            match value.data_type {
                TYPE_STRING => return self.strings.get(value.data).ok().map(str::to_string),
                TYPE_REFERENCE | TYPE_DYNAMIC_REFERENCE => id = value.data,
                other => return Some(render_scalar(other, value.data)),
            }
        }
        None
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }
}

/// A configuration whose fields past the size are all zero matches every device.
fn is_default_config(chunk: &[u8], header_size: usize) -> DecodeResult<bool> {
    const CONFIG_OFFSET: usize = 20;
    let config_size = u32_at(chunk, CONFIG_OFFSET)? as usize;
    let end = CONFIG_OFFSET + config_size;
    if config_size < 4 || end > header_size {
        return Err(DecodeError::Malformed {
            offset: CONFIG_OFFSET,
            reason: "config does not fit in type header",
        });
    }
    Ok(chunk[CONFIG_OFFSET + 4..end].iter().all(|b| *b == 0))
}

/// (entry index, offset from entries start) for every present entry
fn entry_offsets(
    chunk: &[u8],
    table_start: usize,
    flags: u8,
    entry_count: usize,
) -> DecodeResult<Vec<(usize, usize)>> {
    let mut offsets = Vec::new();
    for i in 0..entry_count {
        if flags & FLAG_SPARSE != 0 {
            let index = u16_at(chunk, table_start + i * 4)? as usize;
            let offset = u16_at(chunk, table_start + i * 4 + 2)? as usize * 4;
            offsets.push((index, offset));
        } else if flags & FLAG_OFFSET16 != 0 {
            let raw = u16_at(chunk, table_start + i * 2)?;
            if raw != 0xFFFF {
                offsets.push((i, raw as usize * 4));
            }
        } else {
            let raw = u32_at(chunk, table_start + i * 4)?;
            if raw != NO_ENTRY {
                offsets.push((i, raw as usize));
            }
        }
    }
    Ok(offsets)
}

/// Returns the simple value of the entry at `at`, or `None` for bag entries.
fn read_entry(chunk: &[u8], at: usize) -> DecodeResult<Option<(u8, u32)>> {
    let size = u16_at(chunk, at)? as usize;
    let flags = u16_at(chunk, at + 2)?;

    if flags & ENTRY_FLAG_COMPACT != 0 {
        // Compact entries keep the type in the flags and the data in the key slot
        let data = u32_at(chunk, at + 4)?;
        return Ok(Some(((flags >> 8) as u8, data)));
    }
    if flags & ENTRY_FLAG_COMPLEX != 0 {
        return Ok(None);
    }

    let value_at = at + size;
    let data_type = u8_at(chunk, value_at + 3)?;
    let data = u32_at(chunk, value_at + 4)?;
    Ok(Some((data_type, data)))
}
