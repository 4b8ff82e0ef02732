//! Index entries and the materialized class table

use super::types::{FieldType, HeapValue, IdentifierSize, PrimitiveType};
use serde::{Deserialize, Serialize};

/// Location and minimal metadata of one object-defining sub-record
///
/// `position` is the absolute offset of the sub-record tag byte and
/// `record_size` its full length including the tag, so hydrating an object is
/// a single positioned read of `record_size` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexedObject {
    Class {
        position: u64,
        superclass_id: u64,
        instance_size: u32,
        record_size: u32,
    },
    Instance {
        position: u64,
        class_id: u64,
        record_size: u32,
    },
    ObjectArray {
        position: u64,
        array_class_id: u64,
        record_size: u32,
    },
    PrimitiveArray {
        position: u64,
        primitive_type: PrimitiveType,
        record_size: u32,
    },
}

impl IndexedObject {
    #[inline]
    pub fn position(&self) -> u64 {
        match *self {
            Self::Class { position, .. }
            | Self::Instance { position, .. }
            | Self::ObjectArray { position, .. }
            | Self::PrimitiveArray { position, .. } => position,
        }
    }

    #[inline]
    pub fn record_size(&self) -> u32 {
        match *self {
            Self::Class { record_size, .. }
            | Self::Instance { record_size, .. }
            | Self::ObjectArray { record_size, .. }
            | Self::PrimitiveArray { record_size, .. } => record_size,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Class { .. } => ObjectKind::Class,
            Self::Instance { .. } => ObjectKind::Instance,
            Self::ObjectArray { .. } => ObjectKind::ObjectArray,
            Self::PrimitiveArray { .. } => ObjectKind::PrimitiveArray,
        }
    }
}

/// Payload-free discriminant of [`IndexedObject`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Class,
    Instance,
    ObjectArray,
    PrimitiveArray,
}

/// Instance field declaration with its resolved name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
}

/// Static field with its value, as stored in the class dump
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticField {
    pub name: String,
    pub value: HeapValue,
}

/// Class table entry, fully materialized during indexing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub id: u64,
    /// Dotted class name (`java.lang.String`, `int[]`)
    pub name: String,
    /// `0` for `java.lang.Object` and interfaces
    pub superclass_id: u64,
    pub class_loader_id: u64,
    pub instance_size: u32,
    pub static_fields: Vec<StaticField>,
    /// Fields declared by this class only, in declaration order
    pub instance_fields: Vec<FieldDef>,
}

impl ClassDef {
    pub fn static_field(&self, name: &str) -> Option<&StaticField> {
        self.static_fields.iter().find(|f| f.name == name)
    }

    /// Bytes of static field values, the shallow size of a class object
    pub fn static_fields_byte_size(&self, id_size: IdentifierSize) -> u64 {
        self.static_fields
            .iter()
            .map(|f| u64::from(f.value.field_type().byte_size(id_size)))
            .sum()
    }

    /// Bytes this class's own fields occupy in an instance record
    pub fn declared_fields_byte_size(&self, id_size: IdentifierSize) -> u32 {
        self.instance_fields
            .iter()
            .map(|f| f.field_type.byte_size(id_size))
            .sum()
    }

    pub fn is_array_class(&self) -> bool {
        self.name.ends_with("[]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_class() -> ClassDef {
        ClassDef {
            id: 10,
            name: "com.example.Holder".to_string(),
            superclass_id: 1,
            class_loader_id: 0,
            instance_size: 12,
            static_fields: vec![
                StaticField {
                    name: "INSTANCE".to_string(),
                    value: HeapValue::Object(20),
                },
                StaticField {
                    name: "count".to_string(),
                    value: HeapValue::Int(3),
                },
            ],
            instance_fields: vec![
                FieldDef {
                    name: "next".to_string(),
                    field_type: FieldType::Object,
                },
                FieldDef {
                    name: "size".to_string(),
                    field_type: FieldType::Primitive(PrimitiveType::Long),
                },
            ],
        }
    }

    #[test]
    fn test_class_def_sizes() {
        let class = sample_class();
        assert_eq!(class.static_fields_byte_size(IdentifierSize::U4), 8);
        assert_eq!(class.static_fields_byte_size(IdentifierSize::U8), 12);
        assert_eq!(class.declared_fields_byte_size(IdentifierSize::U4), 12);
        assert!(!class.is_array_class());
        assert_eq!(class.static_field("count").map(|f| f.value), Some(HeapValue::Int(3)));
    }

    #[test]
    fn test_indexed_object_accessors() {
        let entry = IndexedObject::Instance {
            position: 128,
            class_id: 10,
            record_size: 33,
        };
        assert_eq!(entry.position(), 128);
        assert_eq!(entry.record_size(), 33);
        assert_eq!(entry.kind(), ObjectKind::Instance);
    }
}
