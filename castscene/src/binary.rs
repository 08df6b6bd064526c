//! Cast (`.cast`) binary reader and writer.
//!
//! Parsing is IO-free: it operates on an in-memory byte slice. `CastFile::load`/`save` are thin
//! filesystem wrappers on top.

use crate::{CAST_MAGIC, CAST_VERSION, CastFile, CastNode, CastProperty, Error, NodeKind};
use crate::PropertyValues;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::Write;
use std::path::Path;

const FILE_HEADER_LEN: usize = 0x10;
const NODE_HEADER_LEN: usize = 0x18;
const PROPERTY_HEADER_LEN: usize = 0x08;
const MAX_NODE_DEPTH: usize = 256;

#[derive(Clone, Debug)]
struct BinaryInput<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> BinaryInput<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.cursor)
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8], Error> {
        if self.remaining() < len {
            return Err(Error::BinaryParse {
                message: format!(
                    "unexpected EOF while reading {what} (len={len}) at offset {}",
                    self.cursor
                ),
            });
        }
        let slice = &self.bytes[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(slice)
    }

    fn take_elements(&mut self, count: usize, size: usize, what: &str) -> Result<&'a [u8], Error> {
        let len = count.checked_mul(size).ok_or_else(|| Error::BinaryParse {
            message: format!("{what} count {count} overflows at offset {}", self.cursor),
        })?;
        self.take(len, what)
    }

    fn read_u16(&mut self) -> Result<u16, Error> {
        Ok(LittleEndian::read_u16(self.take(2, "u16")?))
    }

    fn read_u32(&mut self) -> Result<u32, Error> {
        Ok(LittleEndian::read_u32(self.take(4, "u32")?))
    }

    fn read_u64(&mut self) -> Result<u64, Error> {
        Ok(LittleEndian::read_u64(self.take(8, "u64")?))
    }

    fn read_utf8(&mut self, len: usize, what: &str) -> Result<String, Error> {
        let offset = self.cursor;
        let bytes = self.take(len, what)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|e| Error::BinaryParse {
                message: format!("invalid utf-8 in {what} at offset {offset}: {e}"),
            })
    }

    fn read_c_string(&mut self) -> Result<String, Error> {
        let offset = self.cursor;
        let rest = &self.bytes[self.cursor.min(self.bytes.len())..];
        let Some(end) = rest.iter().position(|&b| b == 0) else {
            return Err(Error::BinaryParse {
                message: format!("unterminated string at offset {offset}"),
            });
        };
        let value = self.read_utf8(end, "string")?;
        self.cursor += 1;
        Ok(value)
    }

    fn read_f32_array(&mut self, count: usize, what: &str) -> Result<Vec<f32>, Error> {
        let bytes = self.take_elements(count, 4, what)?;
        let mut out = vec![0.0f32; count];
        LittleEndian::read_f32_into(bytes, &mut out);
        Ok(out)
    }

    fn read_property(&mut self) -> Result<CastProperty, Error> {
        let type_bytes = self.take(2, "property type")?;
        let type_id: String = type_bytes
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| char::from(b))
            .collect();
        let name_len = self.read_u16()? as usize;
        let count = self.read_u32()? as usize;
        let name = self.read_utf8(name_len, "property name")?;

        let values = match type_id.as_str() {
            "b" => PropertyValues::Byte(self.take(count, "byte values")?.to_vec()),
            "h" => {
                let bytes = self.take_elements(count, 2, "short values")?;
                let mut out = vec![0u16; count];
                LittleEndian::read_u16_into(bytes, &mut out);
                PropertyValues::Short(out)
            }
            "i" => {
                let bytes = self.take_elements(count, 4, "integer values")?;
                let mut out = vec![0u32; count];
                LittleEndian::read_u32_into(bytes, &mut out);
                PropertyValues::Integer32(out)
            }
            "l" => {
                let bytes = self.take_elements(count, 8, "long values")?;
                let mut out = vec![0u64; count];
                LittleEndian::read_u64_into(bytes, &mut out);
                PropertyValues::Integer64(out)
            }
            "f" => PropertyValues::Float(self.read_f32_array(count, "float values")?),
            "d" => {
                let bytes = self.take_elements(count, 8, "double values")?;
                let mut out = vec![0f64; count];
                LittleEndian::read_f64_into(bytes, &mut out);
                PropertyValues::Double(out)
            }
            "s" => PropertyValues::String(self.read_c_string()?),
            "2v" => PropertyValues::Vector2(
                self.read_f32_array(count.saturating_mul(2), "vector2 values")?
                    .chunks_exact(2)
                    .map(|c| [c[0], c[1]])
                    .collect(),
            ),
            "3v" => PropertyValues::Vector3(
                self.read_f32_array(count.saturating_mul(3), "vector3 values")?
                    .chunks_exact(3)
                    .map(|c| [c[0], c[1], c[2]])
                    .collect(),
            ),
            "4v" => PropertyValues::Vector4(
                self.read_f32_array(count.saturating_mul(4), "vector4 values")?
                    .chunks_exact(4)
                    .map(|c| [c[0], c[1], c[2], c[3]])
                    .collect(),
            ),
            _ => {
                return Err(Error::BinaryUnsupportedPropertyType {
                    property: name,
                    value: type_id,
                });
            }
        };

        Ok(CastProperty { name, values })
    }

    fn read_node(&mut self, depth: usize) -> Result<CastNode, Error> {
        // Bound recursion on malformed input.
        if depth > MAX_NODE_DEPTH {
            return Err(Error::BinaryParse {
                message: format!("node nesting too deep at offset {}", self.cursor),
            });
        }

        let identifier = self.read_u32()?;
        let _node_len = self.read_u32()?;
        let hash = self.read_u64()?;
        let property_count = self.read_u32()? as usize;
        let child_count = self.read_u32()? as usize;

        let mut node = CastNode::with_hash(NodeKind::from_id(identifier), hash);
        for _ in 0..property_count {
            let property = self.read_property()?;
            node.set_property(&property.name, property.values);
        }
        for _ in 0..child_count {
            let child = self.read_node(depth + 1)?;
            node.push_child(child);
        }
        Ok(node)
    }
}

fn property_len(property: &CastProperty) -> usize {
    let values = match &property.values {
        PropertyValues::Byte(v) => v.len(),
        PropertyValues::Short(v) => v.len() * 2,
        PropertyValues::Integer32(v) => v.len() * 4,
        PropertyValues::Integer64(v) => v.len() * 8,
        PropertyValues::Float(v) => v.len() * 4,
        PropertyValues::Double(v) => v.len() * 8,
        PropertyValues::String(s) => s.len() + 1,
        PropertyValues::Vector2(v) => v.len() * 8,
        PropertyValues::Vector3(v) => v.len() * 12,
        PropertyValues::Vector4(v) => v.len() * 16,
    };
    PROPERTY_HEADER_LEN + property.name.len() + values
}

fn node_len(node: &CastNode) -> usize {
    NODE_HEADER_LEN
        + node.properties().iter().map(property_len).sum::<usize>()
        + node.children().iter().map(node_len).sum::<usize>()
}

fn write_err(e: std::io::Error) -> Error {
    Error::BinaryWrite {
        message: e.to_string(),
    }
}

fn narrow_u32(value: usize, what: &str) -> Result<u32, Error> {
    u32::try_from(value).map_err(|_| Error::BinaryWrite {
        message: format!("{what} {value} exceeds the format's 32-bit limit"),
    })
}

fn write_property<W: Write>(out: &mut W, property: &CastProperty) -> Result<(), Error> {
    let mut type_id = [0u8; 2];
    for (slot, b) in type_id.iter_mut().zip(property.values.type_id().bytes()) {
        *slot = b;
    }
    let name_len = u16::try_from(property.name.len()).map_err(|_| Error::BinaryWrite {
        message: format!("property name '{}' is too long", property.name),
    })?;

    out.write_all(&type_id).map_err(write_err)?;
    out.write_u16::<LittleEndian>(name_len).map_err(write_err)?;
    out.write_u32::<LittleEndian>(narrow_u32(property.values.len(), "value count")?)
        .map_err(write_err)?;
    out.write_all(property.name.as_bytes()).map_err(write_err)?;

    match &property.values {
        PropertyValues::Byte(v) => out.write_all(v).map_err(write_err)?,
        PropertyValues::Short(v) => {
            for &x in v {
                out.write_u16::<LittleEndian>(x).map_err(write_err)?;
            }
        }
        PropertyValues::Integer32(v) => {
            for &x in v {
                out.write_u32::<LittleEndian>(x).map_err(write_err)?;
            }
        }
        PropertyValues::Integer64(v) => {
            for &x in v {
                out.write_u64::<LittleEndian>(x).map_err(write_err)?;
            }
        }
        PropertyValues::Float(v) => {
            for &x in v {
                out.write_f32::<LittleEndian>(x).map_err(write_err)?;
            }
        }
        PropertyValues::Double(v) => {
            for &x in v {
                out.write_f64::<LittleEndian>(x).map_err(write_err)?;
            }
        }
        PropertyValues::String(s) => {
            out.write_all(s.as_bytes()).map_err(write_err)?;
            out.write_u8(0).map_err(write_err)?;
        }
        PropertyValues::Vector2(v) => {
            for &x in v.iter().flatten() {
                out.write_f32::<LittleEndian>(x).map_err(write_err)?;
            }
        }
        PropertyValues::Vector3(v) => {
            for &x in v.iter().flatten() {
                out.write_f32::<LittleEndian>(x).map_err(write_err)?;
            }
        }
        PropertyValues::Vector4(v) => {
            for &x in v.iter().flatten() {
                out.write_f32::<LittleEndian>(x).map_err(write_err)?;
            }
        }
    }
    Ok(())
}

fn write_node<W: Write>(out: &mut W, node: &CastNode) -> Result<(), Error> {
    out.write_u32::<LittleEndian>(node.kind().id())
        .map_err(write_err)?;
    out.write_u32::<LittleEndian>(narrow_u32(node_len(node), "node length")?)
        .map_err(write_err)?;
    out.write_u64::<LittleEndian>(node.hash()).map_err(write_err)?;
    out.write_u32::<LittleEndian>(narrow_u32(node.properties().len(), "property count")?)
        .map_err(write_err)?;
    out.write_u32::<LittleEndian>(narrow_u32(node.children().len(), "child count")?)
        .map_err(write_err)?;

    for property in node.properties() {
        write_property(out, property)?;
    }
    for child in node.children() {
        write_node(out, child)?;
    }
    Ok(())
}

impl CastFile {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut input = BinaryInput::new(bytes);
        if input.remaining() < FILE_HEADER_LEN {
            return Err(Error::BinaryParse {
                message: "file is shorter than the Cast header".to_string(),
            });
        }

        let magic = input.read_u32()?;
        if magic != CAST_MAGIC {
            return Err(Error::BinaryInvalidMagic { value: magic });
        }
        let version = input.read_u32()?;
        if version != CAST_VERSION {
            log::debug!("reading Cast container version {version}");
        }
        let root_count = input.read_u32()? as usize;
        let _reserved = input.read_u32()?;

        let mut roots = Vec::with_capacity(root_count.min(1024));
        for _ in 0..root_count {
            roots.push(input.read_node(0)?);
        }
        if input.remaining() > 0 {
            log::debug!("ignoring {} trailing bytes after Cast roots", input.remaining());
        }
        Ok(Self::from_roots(roots))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let body: usize = self.roots().iter().map(node_len).sum();
        let mut out = Vec::with_capacity(FILE_HEADER_LEN + body);
        out.write_u32::<LittleEndian>(CAST_MAGIC).map_err(write_err)?;
        out.write_u32::<LittleEndian>(CAST_VERSION)
            .map_err(write_err)?;
        out.write_u32::<LittleEndian>(narrow_u32(self.roots().len(), "root count")?)
            .map_err(write_err)?;
        out.write_u32::<LittleEndian>(0).map_err(write_err)?;
        for root in self.roots() {
            write_node(&mut out, root)?;
        }
        Ok(out)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
