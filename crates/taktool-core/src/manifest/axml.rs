//! Android binary XML (`AndroidManifest.xml` as stored inside an APK)

use super::arsc::ResourceTable;
use super::binary::{
    chunks, render_scalar, u16_at, u32_at, u8_at, ChunkHeader, DecodeError, DecodeResult,
    StringPool, NO_ENTRY, RES_STRING_POOL_TYPE, TYPE_DYNAMIC_REFERENCE, TYPE_REFERENCE,
    TYPE_STRING,
};
use super::Element;

const RES_XML_TYPE: u16 = 0x0003;
const RES_XML_RESOURCE_MAP_TYPE: u16 = 0x0180;
const RES_XML_START_ELEMENT_TYPE: u16 = 0x0102;

const DEFAULT_ATTRIBUTE_SIZE: usize = 20;

/// Framework attribute ids for the attributes this tool reads, used when a
/// shrinker has blanked the attribute name strings.
const FRAMEWORK_ATTRIBUTES: &[(u32, &str)] = &[
    (0x0101_0001, "label"),
    (0x0101_0002, "icon"),
    (0x0101_0003, "name"),
    (0x0101_0020, "description"),
    (0x0101_0024, "value"),
    (0x0101_021b, "versionCode"),
    (0x0101_021c, "versionName"),
];

/// Decode a binary XML document into its start elements, in document order.
pub(crate) fn decode(data: &[u8], table: Option<&ResourceTable>) -> DecodeResult<Vec<Element>> {
    let header = ChunkHeader::expect(data, 0, RES_XML_TYPE)?;

    let mut pool: Option<StringPool> = None;
    let mut resource_ids: Vec<u32> = Vec::new();
    let mut elements = Vec::new();

    for chunk in chunks(data, header.header_size, header.size) {
        let (offset, child) = chunk?;
        let body = &data[offset..offset + child.size];
        match child.kind {
            RES_STRING_POOL_TYPE if pool.is_none() => pool = Some(StringPool::decode(body)?),
            RES_XML_RESOURCE_MAP_TYPE => {
                resource_ids = (child.header_size..child.size)
                    .step_by(4)
                    .map(|at| u32_at(body, at))
                    .collect::<DecodeResult<_>>()?;
            }
            RES_XML_START_ELEMENT_TYPE => {
                let pool = pool.as_ref().ok_or(DecodeError::MissingStringPool)?;
                let decoder = Decoder {
                    pool,
                    resource_ids: &resource_ids,
                    table,
                };
                elements.push(decoder.start_element(body, child.header_size)?);
            }
            _ => {}
        }
    }

    Ok(elements)
}

struct Decoder<'a> {
    pool: &'a StringPool,
    resource_ids: &'a [u32],
    table: Option<&'a ResourceTable>,
}

impl Decoder<'_> {
    fn start_element(&self, chunk: &[u8], ext: usize) -> DecodeResult<Element> {
        let name = self.pool.get(u32_at(chunk, ext + 4)?)?;
        let attribute_start = u16_at(chunk, ext + 8)? as usize;
        let attribute_size = match u16_at(chunk, ext + 10)? as usize {
            0 => DEFAULT_ATTRIBUTE_SIZE,
            size => size,
        };
        let attribute_count = u16_at(chunk, ext + 12)? as usize;

        let mut element = Element::new(name);
        for i in 0..attribute_count {
            let at = ext + attribute_start + i * attribute_size;
            let name_index = u32_at(chunk, at + 4)?;
            let raw_value = u32_at(chunk, at + 8)?;
            let data_type = u8_at(chunk, at + 15)?;
            let data = u32_at(chunk, at + 16)?;

            let name = self.attribute_name(name_index)?;
            let value = self.attribute_value(raw_value, data_type, data)?;
            element.attributes.push((name, value));
        }
        Ok(element)
    }

    fn attribute_name(&self, index: u32) -> DecodeResult<String> {
        let name = self.pool.get(index)?;
        if !name.is_empty() {
            return Ok(name.to_string());
        }

        let known = self
            .resource_ids
            .get(index as usize)
            .and_then(|id| FRAMEWORK_ATTRIBUTES.iter().find(|(attr, _)| attr == id))
            .map(|(_, name)| name.to_string());
        Ok(known.unwrap_or_default())
    }

    fn attribute_value(&self, raw_value: u32, data_type: u8, data: u32) -> DecodeResult<String> {
        if raw_value != NO_ENTRY {
            return Ok(self.pool.get(raw_value)?.to_string());
        }

        Ok(match data_type {
            TYPE_STRING => self.pool.get(data)?.to_string(),
            TYPE_REFERENCE | TYPE_DYNAMIC_REFERENCE => self
                .table
                .and_then(|table| table.resolve(data))
                .unwrap_or_else(|| render_scalar(data_type, data)),
            other => render_scalar(other, data),
        })
    }
}
