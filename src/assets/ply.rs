//! PLY mesh decoding for layer geometry
//!
//! Supports `ascii`, `binary_little_endian` and `binary_big_endian` bodies.
//! Only positions, texture coordinates and face indices are kept; any other
//! element or property is read and discarded.

/// Decoded mesh for one depth layer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerGeometry {
    /// Vertex positions in the capture rig's coordinate system
    pub positions: Vec<[f32; 3]>,
    /// Texture coordinates into the atlas, one per position
    pub uvs: Vec<[f32; 2]>,
    /// Triangle list indices
    pub indices: Vec<u32>,
}

impl LayerGeometry {
    /// Get vertex count
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get triangle count
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Decode a PLY byte stream
    pub fn from_ply(bytes: &[u8]) -> Result<Self, PlyError> {
        decode(bytes)
    }
}

/// PLY decoding errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlyError {
    #[error("missing 'ply' magic line")]
    BadMagic,
    #[error("header is not terminated by end_header")]
    MissingEndHeader,
    #[error("unsupported PLY format: {0}")]
    UnsupportedFormat(String),
    #[error("malformed header line: {0}")]
    MalformedHeader(String),
    #[error("unknown property type: {0}")]
    UnknownType(String),
    #[error("unexpected end of data")]
    UnexpectedEof,
    #[error("invalid number: {0}")]
    InvalidNumber(String),
    #[error("missing '{0}' element")]
    MissingElement(&'static str),
    #[error("vertex element lacks '{0}' property")]
    MissingProperty(&'static str),
    #[error("face {face} has fewer than three vertices")]
    DegenerateFace { face: usize },
    #[error("face {face} references vertex {index} but only {vertex_count} vertices exist")]
    IndexOutOfRange {
        face: usize,
        index: u32,
        vertex_count: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Float64,
}

impl ScalarType {
    fn parse(name: &str) -> Result<Self, PlyError> {
        match name {
            "char" | "int8" => Ok(Self::Int8),
            "uchar" | "uint8" => Ok(Self::UInt8),
            "short" | "int16" => Ok(Self::Int16),
            "ushort" | "uint16" => Ok(Self::UInt16),
            "int" | "int32" => Ok(Self::Int32),
            "uint" | "uint32" => Ok(Self::UInt32),
            "float" | "float32" => Ok(Self::Float32),
            "double" | "float64" => Ok(Self::Float64),
            other => Err(PlyError::UnknownType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Property {
    Scalar {
        name: String,
        ty: ScalarType,
    },
    List {
        name: String,
        count_ty: ScalarType,
        item_ty: ScalarType,
    },
}

impl Property {
    fn name(&self) -> &str {
        match self {
            Property::Scalar { name, .. } | Property::List { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Element {
    name: String,
    count: usize,
    properties: Vec<Property>,
}

#[derive(Debug)]
struct Header {
    format: Format,
    elements: Vec<Element>,
    body_offset: usize,
}

fn parse_header(bytes: &[u8]) -> Result<Header, PlyError> {
    let mut offset = 0;
    let mut format = None;
    let mut elements: Vec<Element> = Vec::new();
    let mut first = true;

    loop {
        let rest = &bytes[offset..];
        let Some(newline) = rest.iter().position(|&b| b == b'\n') else {
            return Err(if first { PlyError::BadMagic } else { PlyError::MissingEndHeader });
        };
        let line = String::from_utf8_lossy(&rest[..newline]);
        let line = line.trim();
        offset += newline + 1;

        if first {
            if line != "ply" {
                return Err(PlyError::BadMagic);
            }
            first = false;
            continue;
        }

        let mut words = line.split_whitespace();
        match words.next() {
            None | Some("comment") | Some("obj_info") => {}
            Some("format") => {
                format = Some(match words.next() {
                    Some("ascii") => Format::Ascii,
                    Some("binary_little_endian") => Format::BinaryLittleEndian,
                    Some("binary_big_endian") => Format::BinaryBigEndian,
                    other => {
                        return Err(PlyError::UnsupportedFormat(
                            other.unwrap_or_default().to_string(),
                        ))
                    }
                });
            }
            Some("element") => {
                let (Some(name), Some(count)) = (words.next(), words.next()) else {
                    return Err(PlyError::MalformedHeader(line.to_string()));
                };
                let count = count
                    .parse::<usize>()
                    .map_err(|_| PlyError::MalformedHeader(line.to_string()))?;
                elements.push(Element {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            Some("property") => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| PlyError::MalformedHeader(line.to_string()))?;
                let property = match words.next() {
                    Some("list") => {
                        let (Some(count_ty), Some(item_ty), Some(name)) =
                            (words.next(), words.next(), words.next())
                        else {
                            return Err(PlyError::MalformedHeader(line.to_string()));
                        };
                        Property::List {
                            name: name.to_string(),
                            count_ty: ScalarType::parse(count_ty)?,
                            item_ty: ScalarType::parse(item_ty)?,
                        }
                    }
                    Some(ty) => {
                        let name = words
                            .next()
                            .ok_or_else(|| PlyError::MalformedHeader(line.to_string()))?;
                        Property::Scalar {
                            name: name.to_string(),
                            ty: ScalarType::parse(ty)?,
                        }
                    }
                    None => return Err(PlyError::MalformedHeader(line.to_string())),
                };
                element.properties.push(property);
            }
            Some("end_header") => break,
            Some(_) => return Err(PlyError::MalformedHeader(line.to_string())),
        }
    }

    let format =
        format.ok_or_else(|| PlyError::UnsupportedFormat("missing format line".to_string()))?;
    Ok(Header {
        format,
        elements,
        body_offset: offset,
    })
}

/// Sequential value reader over a PLY body
trait ValueReader {
    fn read(&mut self, ty: ScalarType) -> Result<f64, PlyError>;
}

struct AsciiReader<'a> {
    tokens: std::str::SplitAsciiWhitespace<'a>,
}

impl ValueReader for AsciiReader<'_> {
    fn read(&mut self, _ty: ScalarType) -> Result<f64, PlyError> {
        let token = self.tokens.next().ok_or(PlyError::UnexpectedEof)?;
        token
            .parse::<f64>()
            .map_err(|_| PlyError::InvalidNumber(token.to_string()))
    }
}

struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
    big_endian: bool,
}

impl BinaryReader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], PlyError> {
        let end = self.pos + N;
        let slice = self.data.get(self.pos..end).ok_or(PlyError::UnexpectedEof)?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }
}

macro_rules! read_endian {
    ($self:ident, $ty:ty) => {{
        let raw = $self.take::<{ std::mem::size_of::<$ty>() }>()?;
        if $self.big_endian {
            <$ty>::from_be_bytes(raw) as f64
        } else {
            <$ty>::from_le_bytes(raw) as f64
        }
    }};
}

impl ValueReader for BinaryReader<'_> {
    fn read(&mut self, ty: ScalarType) -> Result<f64, PlyError> {
        Ok(match ty {
            ScalarType::Int8 => read_endian!(self, i8),
            ScalarType::UInt8 => read_endian!(self, u8),
            ScalarType::Int16 => read_endian!(self, i16),
            ScalarType::UInt16 => read_endian!(self, u16),
            ScalarType::Int32 => read_endian!(self, i32),
            ScalarType::UInt32 => read_endian!(self, u32),
            ScalarType::Float32 => read_endian!(self, f32),
            ScalarType::Float64 => read_endian!(self, f64),
        })
    }
}

/// Read one property value, returning list items for list properties
fn read_property(
    reader: &mut dyn ValueReader,
    property: &Property,
    list_out: &mut Vec<f64>,
) -> Result<f64, PlyError> {
    match property {
        Property::Scalar { ty, .. } => reader.read(*ty),
        Property::List {
            count_ty, item_ty, ..
        } => {
            let count = reader.read(*count_ty)?;
            if count < 0.0 || count.fract() != 0.0 {
                return Err(PlyError::InvalidNumber(count.to_string()));
            }
            list_out.clear();
            for _ in 0..count as usize {
                list_out.push(reader.read(*item_ty)?);
            }
            Ok(count)
        }
    }
}

fn find_property(element: &Element, names: &[&str]) -> Option<usize> {
    element
        .properties
        .iter()
        .position(|p| matches!(p, Property::Scalar { .. }) && names.contains(&p.name()))
}

/// Convert a face list entry to a vertex index
fn vertex_index(value: f64, face: usize) -> Result<u32, PlyError> {
    if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(PlyError::InvalidNumber(format!(
            "face {} vertex index {}",
            face, value
        )));
    }
    Ok(value as u32)
}

/// Decode a PLY byte stream into layer geometry
pub fn decode(bytes: &[u8]) -> Result<LayerGeometry, PlyError> {
    let header = parse_header(bytes)?;
    let body = &bytes[header.body_offset..];

    let mut ascii;
    let mut binary;
    let reader: &mut dyn ValueReader = match header.format {
        Format::Ascii => {
            let text = std::str::from_utf8(body)
                .map_err(|_| PlyError::InvalidNumber("non-UTF-8 ascii body".to_string()))?;
            ascii = AsciiReader {
                tokens: text.split_ascii_whitespace(),
            };
            &mut ascii
        }
        Format::BinaryLittleEndian | Format::BinaryBigEndian => {
            binary = BinaryReader {
                data: body,
                pos: 0,
                big_endian: header.format == Format::BinaryBigEndian,
            };
            &mut binary
        }
    };

    let mut geometry = LayerGeometry::default();
    let mut saw_vertices = false;
    let mut saw_faces = false;
    let mut values = Vec::new();
    let mut list = Vec::new();

    for element in &header.elements {
        match element.name.as_str() {
            "vertex" => {
                saw_vertices = true;
                let x = find_property(element, &["x"]).ok_or(PlyError::MissingProperty("x"))?;
                let y = find_property(element, &["y"]).ok_or(PlyError::MissingProperty("y"))?;
                let z = find_property(element, &["z"]).ok_or(PlyError::MissingProperty("z"))?;
                let u = find_property(element, &["s", "u", "texture_u"]);
                let v = find_property(element, &["t", "v", "texture_v"]);

                // Every vertex needs at least one body byte; the header count is untrusted
                let capacity = element.count.min(body.len());
                geometry.positions.reserve(capacity);
                geometry.uvs.reserve(capacity);
                for _ in 0..element.count {
                    values.clear();
                    for property in &element.properties {
                        values.push(read_property(reader, property, &mut list)?);
                    }
                    geometry
                        .positions
                        .push([values[x] as f32, values[y] as f32, values[z] as f32]);
                    let uv_u = u.map(|i| values[i] as f32).unwrap_or(0.0);
                    let uv_v = v.map(|i| values[i] as f32).unwrap_or(0.0);
                    geometry.uvs.push([uv_u, uv_v]);
                }
            }
            "face" => {
                saw_faces = true;
                if element.properties.is_empty() {
                    continue;
                }
                let index_property = element.properties.iter().position(|p| {
                    matches!(p, Property::List { .. })
                        && matches!(p.name(), "vertex_indices" | "vertex_index")
                });
                let mut polygon = Vec::new();

                for face in 0..element.count {
                    polygon.clear();
                    for (i, property) in element.properties.iter().enumerate() {
                        read_property(reader, property, &mut list)?;
                        if Some(i) == index_property {
                            for &value in &list {
                                polygon.push(vertex_index(value, face)?);
                            }
                        }
                    }
                    if index_property.is_none() {
                        continue;
                    }
                    if polygon.len() < 3 {
                        return Err(PlyError::DegenerateFace { face });
                    }
                    // Fan triangulation around the first corner.
                    for k in 1..polygon.len() - 1 {
                        geometry
                            .indices
                            .extend_from_slice(&[polygon[0], polygon[k], polygon[k + 1]]);
                    }
                }
            }
            _ => {
                // Without properties an element occupies no bytes, whatever its count
                if element.properties.is_empty() {
                    continue;
                }
                for _ in 0..element.count {
                    for property in &element.properties {
                        read_property(reader, property, &mut list)?;
                    }
                }
            }
        }
    }

    if !saw_vertices {
        return Err(PlyError::MissingElement("vertex"));
    }

    let vertex_count = geometry.positions.len();
    if !saw_faces {
        // Unindexed meshes are treated as a plain triangle list.
        let usable = vertex_count - vertex_count % 3;
        geometry.indices = (0..usable as u32).collect();
    }

    if let Some((position, &index)) = geometry
        .indices
        .iter()
        .enumerate()
        .find(|(_, &index)| index as usize >= vertex_count)
    {
        return Err(PlyError::IndexOutOfRange {
            face: position / 3,
            index,
            vertex_count,
        });
    }

    Ok(geometry)
}
