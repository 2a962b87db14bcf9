//! Test fixtures: in-memory APKs, binary XML and resource table encoders,
//! and a manifest parser that serves canned documents.

use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{Result, TaktoolError};
use crate::manifest::{Element, ManifestDocument, ManifestParser};
use crate::record::{ArtifactRecord, Kind};

const NO_ENTRY: u32 = 0xFFFF_FFFF;

pub(crate) fn record(identity: &str, display_name: &str, revision: &str) -> ArtifactRecord {
    ArtifactRecord {
        platform: "Android".to_string(),
        kind: Kind::from_identity(identity),
        identity: identity.to_string(),
        display_name: display_name.to_string(),
        version: "1.0".to_string(),
        revision: revision.to_string(),
        artifact_path: PathBuf::from(format!("{identity}-{revision}.apk")),
        icon_ref: String::new(),
        description: String::new(),
        digest: "0".repeat(64),
        min_platform_version: 1,
        min_host_version: String::new(),
        size_bytes: 0,
    }
}

pub(crate) fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub(crate) fn write_apk(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, zip_bytes(entries)).unwrap();
    path
}

/// Read every entry of a zip file into memory.
pub(crate) fn read_zip(path: &Path) -> HashMap<String, Vec<u8>> {
    use std::io::Read;

    let mut archive = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
    let mut entries = HashMap::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        entries.insert(file.name().to_string(), data);
    }
    entries
}

pub(crate) fn manifest_doc(identity: &str, label: &str, version_code: &str) -> ManifestDocument {
    ManifestDocument::new(vec![
        Element::new("manifest")
            .with_attr("package", identity)
            .with_attr("versionCode", version_code)
            .with_attr("versionName", format!("1.{version_code}")),
        Element::new("application")
            .with_attr("label", label)
            .with_attr("icon", "res/mipmap-mdpi/ic_launcher.png"),
    ])
}

/// Serves documents by artifact file name.
#[derive(Default)]
pub(crate) struct StaticManifestParser {
    documents: HashMap<String, ManifestDocument>,
}

impl StaticManifestParser {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, file_name: &str, document: ManifestDocument) -> Self {
        self.documents.insert(file_name.to_string(), document);
        self
    }
}

impl ManifestParser for StaticManifestParser {
    fn parse(&self, artifact: &Path) -> Result<ManifestDocument> {
        let name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.documents
            .get(&name)
            .cloned()
            .ok_or_else(|| TaktoolError::Parse {
                path: artifact.to_path_buf(),
                message: "no manifest".to_string(),
            })
    }
}

fn push_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn push_utf8_len(buf: &mut Vec<u8>, len: usize) {
    if len > 0x7F {
        buf.push(((len >> 8) as u8) | 0x80);
        buf.push(len as u8);
    } else {
        buf.push(len as u8);
    }
}

fn pool_chunk<S: AsRef<str>>(strings: &[S], utf8: bool) -> Vec<u8> {
    let mut data = Vec::new();
    let mut offsets = Vec::new();
    for s in strings {
        let s = s.as_ref();
        offsets.push(data.len() as u32);
        if utf8 {
            push_utf8_len(&mut data, s.encode_utf16().count());
            push_utf8_len(&mut data, s.len());
            data.extend_from_slice(s.as_bytes());
            data.push(0);
        } else {
            let units: Vec<u16> = s.encode_utf16().collect();
            push_u16(&mut data, units.len() as u16);
            for unit in units {
                push_u16(&mut data, unit);
            }
            push_u16(&mut data, 0);
        }
    }
    while data.len() % 4 != 0 {
        data.push(0);
    }

    let header_size = 28;
    let strings_start = header_size + 4 * strings.len();
    let mut chunk = Vec::new();
    push_u16(&mut chunk, 0x0001);
    push_u16(&mut chunk, header_size as u16);
    push_u32(&mut chunk, (strings_start + data.len()) as u32);
    push_u32(&mut chunk, strings.len() as u32);
    push_u32(&mut chunk, 0);
    push_u32(&mut chunk, if utf8 { 1 << 8 } else { 0 });
    push_u32(&mut chunk, strings_start as u32);
    push_u32(&mut chunk, 0);
    for offset in offsets {
        push_u32(&mut chunk, offset);
    }
    chunk.extend_from_slice(&data);
    chunk
}

pub(crate) fn string_pool_chunk(strings: &[&str]) -> Vec<u8> {
    pool_chunk(strings, false)
}

pub(crate) fn string_pool_chunk_utf8(strings: &[&str]) -> Vec<u8> {
    pool_chunk(strings, true)
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum AxmlValue<'a> {
    Str(&'a str),
    Int(i32),
    Bool(bool),
    Ref(u32),
}

struct EncodedAttr {
    namespace: u32,
    name: u32,
    raw: u32,
    data_type: u8,
    data: u32,
}

const ANDROID_NS_PREFIX: &str = "android";
const ANDROID_NS_URI: &str = "http://schemas.android.com/apk/res/android";

/// Builds a binary XML document. Elements are flat start/end pairs unless
/// `nested` is set, in which case every element encloses the next one.
#[derive(Default)]
pub(crate) struct AxmlBuilder {
    strings: Vec<String>,
    resource_ids: Vec<u32>,
    elements: Vec<(u32, Vec<EncodedAttr>)>,
    namespace: Option<(u32, u32)>,
    nested: bool,
}

impl AxmlBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, s: &str) -> u32 {
        if let Some(i) = self.strings.iter().position(|x| x == s) {
            return i as u32;
        }
        self.strings.push(s.to_string());
        (self.strings.len() - 1) as u32
    }

    /// A blank name string that only the resource map can identify
    fn blank_name(&mut self, id: u32) -> u32 {
        let index = self.strings.len();
        self.strings.push(String::new());
        self.resource_ids.resize(index + 1, 0);
        self.resource_ids[index] = id;
        index as u32
    }

    fn encode(&mut self, name: u32, value: AxmlValue<'_>) -> EncodedAttr {
        let (raw, data_type, data) = match value {
            AxmlValue::Str(s) => {
                let index = self.intern(s);
                (index, 0x03, index)
            }
            AxmlValue::Int(n) => (NO_ENTRY, 0x10, n as u32),
            AxmlValue::Bool(b) => (NO_ENTRY, 0x12, if b { NO_ENTRY } else { 0 }),
            AxmlValue::Ref(id) => (NO_ENTRY, 0x01, id),
        };
        EncodedAttr {
            namespace: NO_ENTRY,
            name,
            raw,
            data_type,
            data,
        }
    }

    /// Declare `xmlns:android` around the document, as aapt2 does. Attributes
    /// other than `package` added afterwards live in that namespace.
    pub(crate) fn android_namespace(mut self) -> Self {
        let prefix = self.intern(ANDROID_NS_PREFIX);
        let uri = self.intern(ANDROID_NS_URI);
        self.namespace = Some((prefix, uri));
        self
    }

    pub(crate) fn nested(mut self) -> Self {
        self.nested = true;
        self
    }

    pub(crate) fn element(mut self, name: &str, attrs: &[(&str, AxmlValue<'_>)]) -> Self {
        let name = self.intern(name);
        let mut encoded = Vec::new();
        for (attr, value) in attrs {
            let attr_name = self.intern(attr);
            let mut attr_value = self.encode(attr_name, *value);
            if let (Some((_, uri)), false) = (self.namespace, *attr == "package") {
                attr_value.namespace = uri;
            }
            encoded.push(attr_value);
        }
        self.elements.push((name, encoded));
        self
    }

    pub(crate) fn element_with_ids(mut self, name: &str, attrs: &[(u32, AxmlValue<'_>)]) -> Self {
        let name = self.intern(name);
        let mut encoded = Vec::new();
        for (id, value) in attrs {
            let attr = self.blank_name(*id);
            encoded.push(self.encode(attr, *value));
        }
        self.elements.push((name, encoded));
        self
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let mut body = pool_chunk(&self.strings, false);

        if !self.resource_ids.is_empty() {
            push_u16(&mut body, 0x0180);
            push_u16(&mut body, 8);
            push_u32(&mut body, (8 + 4 * self.resource_ids.len()) as u32);
            for id in &self.resource_ids {
                push_u32(&mut body, *id);
            }
        }

        if let Some((prefix, uri)) = self.namespace {
            push_namespace(&mut body, 0x0100, prefix, uri);
        }

        let mut closing = Vec::new();
        for (line, (name, attrs)) in self.elements.iter().enumerate() {
            push_u16(&mut body, 0x0102);
            push_u16(&mut body, 16);
            push_u32(&mut body, (36 + 20 * attrs.len()) as u32);
            push_u32(&mut body, line as u32 + 2);
            push_u32(&mut body, NO_ENTRY);
            push_u32(&mut body, NO_ENTRY);
            push_u32(&mut body, *name);
            push_u16(&mut body, 20);
            push_u16(&mut body, 20);
            push_u16(&mut body, attrs.len() as u16);
            push_u16(&mut body, 0);
            push_u16(&mut body, 0);
            push_u16(&mut body, 0);
            for attr in attrs {
                push_u32(&mut body, attr.namespace);
                push_u32(&mut body, attr.name);
                push_u32(&mut body, attr.raw);
                push_u16(&mut body, 8);
                body.push(0);
                body.push(attr.data_type);
                push_u32(&mut body, attr.data);
            }

            let mut end = Vec::new();
            push_u16(&mut end, 0x0103);
            push_u16(&mut end, 16);
            push_u32(&mut end, 24);
            push_u32(&mut end, line as u32 + 2);
            push_u32(&mut end, NO_ENTRY);
            push_u32(&mut end, NO_ENTRY);
            push_u32(&mut end, *name);
            if self.nested {
                closing.push(end);
            } else {
                body.extend_from_slice(&end);
            }
        }
        for end in closing.iter().rev() {
            body.extend_from_slice(end);
        }

        if let Some((prefix, uri)) = self.namespace {
            push_namespace(&mut body, 0x0101, prefix, uri);
        }

        let mut doc = Vec::new();
        push_u16(&mut doc, 0x0003);
        push_u16(&mut doc, 8);
        push_u32(&mut doc, (8 + body.len()) as u32);
        doc.extend_from_slice(&body);
        doc
    }
}

fn push_namespace(buf: &mut Vec<u8>, kind: u16, prefix: u32, uri: u32) {
    push_u16(buf, kind);
    push_u16(buf, 16);
    push_u32(buf, 24);
    push_u32(buf, 1);
    push_u32(buf, NO_ENTRY);
    push_u32(buf, prefix);
    push_u32(buf, uri);
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum TableEntry {
    String(u32),
    Reference(u32),
    Int(i32),
    Bool(bool),
    Missing,
}

/// Builds a resource table with a single `0x7f` package.
pub(crate) struct ArscBuilder {
    strings: Vec<String>,
    /// (type id, entry count, chunk)
    types: Vec<(u8, usize, Vec<u8>)>,
    config_size: usize,
    aapt2: bool,
}

impl ArscBuilder {
    pub(crate) fn new(strings: &[&str]) -> Self {
        Self {
            strings: strings.iter().map(|s| s.to_string()).collect(),
            types: Vec::new(),
            config_size: 8,
            aapt2: false,
        }
    }

    /// Lay the package out like aapt2: type and key string pools, a type spec
    /// before each type, full size configurations and a library chunk.
    /// Call before adding type chunks.
    pub(crate) fn aapt2_layout(mut self) -> Self {
        self.aapt2 = true;
        self.config_size = 64;
        self
    }

    /// `specific` marks a non-default configuration.
    pub(crate) fn type_chunk(mut self, type_id: u8, specific: bool, entries: &[TableEntry]) -> Self {
        let header_size = 20 + self.config_size;
        let entries_start = header_size + 4 * entries.len();

        let mut offsets = Vec::new();
        let mut data = Vec::new();
        for entry in entries {
            let (data_type, value) = match *entry {
                TableEntry::String(i) => (0x03, i),
                TableEntry::Reference(id) => (0x01, id),
                TableEntry::Int(n) => (0x10, n as u32),
                TableEntry::Bool(b) => (0x12, if b { NO_ENTRY } else { 0 }),
                TableEntry::Missing => {
                    offsets.push(NO_ENTRY);
                    continue;
                }
            };
            offsets.push(data.len() as u32);
            push_u16(&mut data, 8);
            push_u16(&mut data, 0);
            push_u32(&mut data, 0);
            push_u16(&mut data, 8);
            data.push(0);
            data.push(data_type);
            push_u32(&mut data, value);
        }

        let mut chunk = Vec::new();
        push_u16(&mut chunk, 0x0201);
        push_u16(&mut chunk, header_size as u16);
        push_u32(&mut chunk, (entries_start + data.len()) as u32);
        chunk.push(type_id);
        chunk.push(0);
        push_u16(&mut chunk, 0);
        push_u32(&mut chunk, entries.len() as u32);
        push_u32(&mut chunk, entries_start as u32);
        push_u32(&mut chunk, self.config_size as u32);
        push_u32(&mut chunk, u32::from(specific));
        chunk.resize(header_size, 0);
        for offset in offsets {
            push_u32(&mut chunk, offset);
        }
        chunk.extend_from_slice(&data);

        self.types.push((type_id, entries.len(), chunk));
        self
    }

    fn type_spec(type_id: u8, entry_count: usize) -> Vec<u8> {
        let mut spec = Vec::new();
        push_u16(&mut spec, 0x0202);
        push_u16(&mut spec, 16);
        push_u32(&mut spec, (16 + 4 * entry_count) as u32);
        spec.push(type_id);
        spec.push(0);
        push_u16(&mut spec, 0);
        push_u32(&mut spec, entry_count as u32);
        for _ in 0..entry_count {
            push_u32(&mut spec, 0);
        }
        spec
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let pool = pool_chunk(&self.strings, true);

        let mut children = Vec::new();
        let mut type_strings_at = 0;
        let mut key_strings_at = 0;
        if self.aapt2 {
            let max_type = self.types.iter().map(|(id, _, _)| *id).max().unwrap_or(0);
            let max_entries = self.types.iter().map(|(_, n, _)| *n).max().unwrap_or(0);
            let type_names: Vec<String> = (1..=max_type).map(|id| format!("type{id}")).collect();
            let key_names: Vec<String> = (0..max_entries).map(|i| format!("entry{i}")).collect();

            type_strings_at = 288;
            children.extend_from_slice(&pool_chunk(&type_names, true));
            key_strings_at = 288 + children.len();
            children.extend_from_slice(&pool_chunk(&key_names, true));
        }

        let mut specified = Vec::new();
        for (type_id, entry_count, chunk) in &self.types {
            if self.aapt2 && !specified.contains(type_id) {
                children.extend_from_slice(&Self::type_spec(*type_id, *entry_count));
                specified.push(*type_id);
            }
            children.extend_from_slice(chunk);
        }

        if self.aapt2 {
            push_u16(&mut children, 0x0203);
            push_u16(&mut children, 12);
            push_u32(&mut children, 12);
            push_u32(&mut children, 0);
        }

        let mut package = Vec::new();
        push_u16(&mut package, 0x0200);
        push_u16(&mut package, 288);
        push_u32(&mut package, (288 + children.len()) as u32);
        push_u32(&mut package, 0x7f);
        package.extend_from_slice(&[0u8; 256]);
        push_u32(&mut package, type_strings_at as u32);
        push_u32(&mut package, 0);
        push_u32(&mut package, key_strings_at as u32);
        push_u32(&mut package, 0);
        push_u32(&mut package, 0);
        package.extend_from_slice(&children);

        let mut table = Vec::new();
        push_u16(&mut table, 0x0002);
        push_u16(&mut table, 12);
        push_u32(&mut table, (12 + pool.len() + package.len()) as u32);
        push_u32(&mut table, 1);
        table.extend_from_slice(&pool);
        table.extend_from_slice(&package);
        table
    }
}

/// A complete APK with binary manifest, resource table and a PNG icon.
pub(crate) fn real_apk(dir: &Path, file_name: &str, identity: &str, label: &str, code: i32) -> PathBuf {
    let manifest = AxmlBuilder::new()
        .element(
            "manifest",
            &[
                ("package", AxmlValue::Str(identity)),
                ("versionCode", AxmlValue::Int(code)),
                ("versionName", AxmlValue::Str("2.0")),
            ],
        )
        .element(
            "application",
            &[
                ("label", AxmlValue::Ref(0x7f01_0000)),
                ("icon", AxmlValue::Ref(0x7f02_0000)),
            ],
        )
        .element(
            "meta-data",
            &[
                ("name", AxmlValue::Str("plugin-api")),
                ("value", AxmlValue::Str("com.atakmap.app@5.1.0.CIV")),
            ],
        )
        .build();
    let resources = ArscBuilder::new(&[label, "res/mipmap-mdpi/ic_launcher.png"])
        .type_chunk(1, false, &[TableEntry::String(0)])
        .type_chunk(2, true, &[TableEntry::String(1)])
        .build();

    write_apk(
        dir,
        file_name,
        &[
            ("AndroidManifest.xml", manifest.as_slice()),
            ("resources.arsc", resources.as_slice()),
            ("res/mipmap-mdpi/ic_launcher.png", ICON_BYTES),
        ],
    )
}

/// Stand-in icon payload; the pipeline copies icon bytes verbatim.
pub(crate) const ICON_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nembedded-icon";
