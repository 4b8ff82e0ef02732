//! Hydrated heap objects

use super::layout::FieldLayout;
use crate::features::hprof::{
    FieldDef, HeapValue, ObjectKind, PrimitiveArrayValues, PrimitiveType, StaticField,
};
use std::fmt;
use std::sync::Arc;

/// A class object, built from the class table without touching the source
#[derive(Debug, Clone, PartialEq)]
pub struct HeapClass {
    pub id: u64,
    pub name: String,
    /// `0` when there is no superclass
    pub superclass_id: u64,
    pub instance_size: u32,
    pub static_fields: Vec<StaticField>,
    pub instance_fields: Vec<FieldDef>,
}

impl HeapClass {
    pub fn static_field(&self, name: &str) -> Option<HeapValue> {
        self.static_fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value)
    }

    pub fn has_superclass(&self) -> bool {
        self.superclass_id != 0
    }
}

/// An instance with every field value decoded
#[derive(Debug, Clone)]
pub struct HeapInstance {
    pub id: u64,
    pub class_id: u64,
    pub class_name: String,
    pub(crate) layout: Arc<FieldLayout>,
    /// Values aligned with `layout.slots()`
    pub(crate) values: Vec<HeapValue>,
}

impl HeapInstance {
    /// Value of `name`, searching the instance's own class first, then superclasses
    pub fn field(&self, name: &str) -> Option<HeapValue> {
        self.layout.position_of(name).map(|i| self.values[i])
    }

    /// Value of `name` as declared by the class named `class_name`
    pub fn field_in(&self, class_name: &str, name: &str) -> Option<HeapValue> {
        self.layout
            .slots()
            .iter()
            .position(|slot| &*slot.declaring_class_name == class_name && &*slot.name == name)
            .map(|i| self.values[i])
    }

    /// Referenced object id of `name`, `None` if null, primitive or absent
    pub fn object_field(&self, name: &str) -> Option<u64> {
        self.field(name).and_then(|v| v.as_object_id())
    }

    /// `(declaring class name, field name, value)` in layout order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str, HeapValue)> + '_ {
        self.layout
            .slots()
            .iter()
            .zip(self.values.iter())
            .map(|(slot, value)| (&*slot.declaring_class_name, &*slot.name, *value))
    }

    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }
}

impl PartialEq for HeapInstance {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.class_id == other.class_id && self.values == other.values
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapObjectArray {
    pub id: u64,
    pub array_class_id: u64,
    /// e.g. `java.lang.Object[]`
    pub class_name: String,
    /// Element ids; `0` is null
    pub element_ids: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeapPrimitiveArray {
    pub id: u64,
    pub values: PrimitiveArrayValues,
}

impl HeapPrimitiveArray {
    pub fn primitive_type(&self) -> PrimitiveType {
        self.values.primitive_type()
    }

    /// e.g. `int[]`
    pub fn class_name(&self) -> String {
        format!("{}[]", self.primitive_type().java_name())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Object hydrated from the index plus one read of its record
#[derive(Debug, Clone, PartialEq)]
pub enum HeapObject {
    Class(HeapClass),
    Instance(HeapInstance),
    ObjectArray(HeapObjectArray),
    PrimitiveArray(HeapPrimitiveArray),
}

impl HeapObject {
    pub fn id(&self) -> u64 {
        match self {
            Self::Class(c) => c.id,
            Self::Instance(i) => i.id,
            Self::ObjectArray(a) => a.id,
            Self::PrimitiveArray(a) => a.id,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Class(_) => ObjectKind::Class,
            Self::Instance(_) => ObjectKind::Instance,
            Self::ObjectArray(_) => ObjectKind::ObjectArray,
            Self::PrimitiveArray(_) => ObjectKind::PrimitiveArray,
        }
    }

    /// Class name of the object; a class object reports its own name
    pub fn class_name(&self) -> String {
        match self {
            Self::Class(c) => c.name.clone(),
            Self::Instance(i) => i.class_name.clone(),
            Self::ObjectArray(a) => a.class_name.clone(),
            Self::PrimitiveArray(a) => a.class_name(),
        }
    }

    pub fn as_class(&self) -> Option<&HeapClass> {
        match self {
            Self::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&HeapInstance> {
        match self {
            Self::Instance(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_object_array(&self) -> Option<&HeapObjectArray> {
        match self {
            Self::ObjectArray(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_primitive_array(&self) -> Option<&HeapPrimitiveArray> {
        match self {
            Self::PrimitiveArray(a) => Some(a),
            _ => None,
        }
    }
}

impl fmt::Display for HeapObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(c) => write!(f, "class {}", c.name),
            _ => write!(f, "{}@0x{:x}", self.class_name(), self.id()),
        }
    }
}
