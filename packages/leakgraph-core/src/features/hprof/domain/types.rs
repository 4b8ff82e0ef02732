//! Primitive vocabulary of the hprof format

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of object identifiers in a dump, declared once in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentifierSize {
    U1,
    U2,
    U4,
    U8,
}

impl IdentifierSize {
    /// Parse the header's identifier size. Anything but 1, 2, 4 or 8 is unsupported.
    pub fn from_u32(size: u32) -> Option<Self> {
        match size {
            1 => Some(Self::U1),
            2 => Some(Self::U2),
            4 => Some(Self::U4),
            8 => Some(Self::U8),
            _ => None,
        }
    }

    /// Width in bytes
    #[inline]
    pub fn bytes(self) -> u32 {
        match self {
            Self::U1 => 1,
            Self::U2 => 2,
            Self::U4 => 4,
            Self::U8 => 8,
        }
    }
}

/// Element type of primitive arrays and primitive fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveType {
    Boolean,
    Char,
    Float,
    Double,
    Byte,
    Short,
    Int,
    Long,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 8] = [
        Self::Boolean,
        Self::Char,
        Self::Float,
        Self::Double,
        Self::Byte,
        Self::Short,
        Self::Int,
        Self::Long,
    ];

    /// hprof basic type tag
    pub fn tag(self) -> u8 {
        match self {
            Self::Boolean => 4,
            Self::Char => 5,
            Self::Float => 6,
            Self::Double => 7,
            Self::Byte => 8,
            Self::Short => 9,
            Self::Int => 10,
            Self::Long => 11,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    /// Width of one value in bytes
    #[inline]
    pub fn byte_size(self) -> u32 {
        match self {
            Self::Boolean | Self::Byte => 1,
            Self::Char | Self::Short => 2,
            Self::Float | Self::Int => 4,
            Self::Double | Self::Long => 8,
        }
    }

    /// Java keyword, used to name primitive array classes (`int[]`)
    pub fn java_name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Char => "char",
            Self::Float => "float",
            Self::Double => "double",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
        }
    }

    /// JVM descriptor letter (`I` for int)
    pub fn descriptor(self) -> char {
        match self {
            Self::Boolean => 'Z',
            Self::Char => 'C',
            Self::Float => 'F',
            Self::Double => 'D',
            Self::Byte => 'B',
            Self::Short => 'S',
            Self::Int => 'I',
            Self::Long => 'J',
        }
    }

    pub fn from_descriptor(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.descriptor() == c)
    }
}

/// Declared type of a field: an object reference or a primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Object,
    Primitive(PrimitiveType),
}

impl FieldType {
    /// hprof basic type tag of object references
    pub const OBJECT_TAG: u8 = 2;

    pub fn tag(self) -> u8 {
        match self {
            Self::Object => Self::OBJECT_TAG,
            Self::Primitive(p) => p.tag(),
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        if tag == Self::OBJECT_TAG {
            Some(Self::Object)
        } else {
            PrimitiveType::from_tag(tag).map(Self::Primitive)
        }
    }

    /// Width of a value of this type in a record
    #[inline]
    pub fn byte_size(self, id_size: IdentifierSize) -> u32 {
        match self {
            Self::Object => id_size.bytes(),
            Self::Primitive(p) => p.byte_size(),
        }
    }
}

/// A field or static value read from a record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HeapValue {
    /// Object reference; `0` is null
    Object(u64),
    Boolean(bool),
    Char(u16),
    Float(f32),
    Double(f64),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
}

impl HeapValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Object(_) => FieldType::Object,
            Self::Boolean(_) => FieldType::Primitive(PrimitiveType::Boolean),
            Self::Char(_) => FieldType::Primitive(PrimitiveType::Char),
            Self::Float(_) => FieldType::Primitive(PrimitiveType::Float),
            Self::Double(_) => FieldType::Primitive(PrimitiveType::Double),
            Self::Byte(_) => FieldType::Primitive(PrimitiveType::Byte),
            Self::Short(_) => FieldType::Primitive(PrimitiveType::Short),
            Self::Int(_) => FieldType::Primitive(PrimitiveType::Int),
            Self::Long(_) => FieldType::Primitive(PrimitiveType::Long),
        }
    }

    /// Referenced object id, `None` for primitives and null references
    #[inline]
    pub fn as_object_id(&self) -> Option<u64> {
        match self {
            Self::Object(id) if *id != 0 => Some(*id),
            _ => None,
        }
    }

    #[inline]
    pub fn is_null_reference(&self) -> bool {
        matches!(self, Self::Object(0))
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_byte(&self) -> Option<i8> {
        match self {
            Self::Byte(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for HeapValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(0) => write!(f, "null"),
            Self::Object(id) => write!(f, "@0x{:x}", id),
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Char(v) => match char::from_u32(u32::from(*v)) {
                Some(c) => write!(f, "'{}'", c),
                None => write!(f, "\\u{:04x}", v),
            },
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::Byte(v) => write!(f, "{}", v),
            Self::Short(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Long(v) => write!(f, "{}", v),
        }
    }
}

/// Format version announced by the header string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HprofVersion {
    /// `JAVA PROFILE 1.0.1`
    V1_0_1,
    /// `JAVA PROFILE 1.0.2`, heap dump segments
    V1_0_2,
    /// `JAVA PROFILE 1.0.3`, Android extensions
    V1_0_3,
}

impl HprofVersion {
    pub fn header_string(self) -> &'static str {
        match self {
            Self::V1_0_1 => "JAVA PROFILE 1.0.1",
            Self::V1_0_2 => "JAVA PROFILE 1.0.2",
            Self::V1_0_3 => "JAVA PROFILE 1.0.3",
        }
    }

    pub fn from_header_string(s: &str) -> Option<Self> {
        [Self::V1_0_1, Self::V1_0_2, Self::V1_0_3]
            .into_iter()
            .find(|v| v.header_string() == s)
    }
}

/// Fixed header at the start of every dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HprofHeader {
    pub version: HprofVersion,
    pub identifier_size: IdentifierSize,
    /// Milliseconds since the epoch when the dump was written
    pub timestamp_millis: u64,
}

impl HprofHeader {
    /// Header for a freshly written dump
    pub fn new(version: HprofVersion, identifier_size: IdentifierSize, timestamp_millis: u64) -> Self {
        Self {
            version,
            identifier_size,
            timestamp_millis,
        }
    }

    /// Bytes occupied by the header on disk
    pub fn byte_size(&self) -> u64 {
        // version string + NUL + u32 id size + u64 timestamp
        self.version.header_string().len() as u64 + 1 + 4 + 8
    }
}

/// Convert a JVM internal class name to the dotted form used everywhere else.
///
/// `java/lang/String` → `java.lang.String`, `[Ljava/lang/Object;` →
/// `java.lang.Object[]`, `[[I` → `int[][]`.
pub fn normalize_class_name(raw: &str) -> String {
    let dims = raw.chars().take_while(|&c| c == '[').count();
    if dims == 0 {
        return raw.replace('/', ".");
    }

    let element = &raw[dims..];
    let base = if let Some(object) = element.strip_prefix('L') {
        object.trim_end_matches(';').replace('/', ".")
    } else {
        let mut chars = element.chars();
        match (chars.next().and_then(PrimitiveType::from_descriptor), chars.next()) {
            (Some(p), None) => p.java_name().to_string(),
            _ => element.replace('/', "."),
        }
    };

    let mut name = base;
    for _ in 0..dims {
        name.push_str("[]");
    }
    name
}
