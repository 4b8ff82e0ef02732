//! Per-class instance field layout

use crate::features::hprof::{ClassDef, FieldType, IdentifierSize};
use std::sync::Arc;

/// One field slot in an instance record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSlot {
    pub name: Arc<str>,
    pub field_type: FieldType,
    /// Class declaring the field
    pub declaring_class_id: u64,
    pub declaring_class_name: Arc<str>,
    /// Byte offset inside the instance field data
    pub offset: u32,
}

/// Field slots of an instance, most derived class first
///
/// Within one class, fields keep declaration order. A name shadowed by a
/// subclass appears once per declaring class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldLayout {
    slots: Vec<FieldSlot>,
    byte_size: u32,
}

impl FieldLayout {
    /// Lay out `class_id` by walking `lookup` up the superclass chain
    pub fn compute<'a>(
        class_id: u64,
        id_size: IdentifierSize,
        lookup: impl Fn(u64) -> Option<&'a ClassDef>,
    ) -> Self {
        let mut slots = Vec::new();
        let mut offset = 0u32;
        let mut current = class_id;
        let mut depth = 0usize;

        while let Some(class) = lookup(current) {
            let declaring_class_name: Arc<str> = Arc::from(class.name.as_str());
            for field in &class.instance_fields {
                slots.push(FieldSlot {
                    name: Arc::from(field.name.as_str()),
                    field_type: field.field_type,
                    declaring_class_id: class.id,
                    declaring_class_name: Arc::clone(&declaring_class_name),
                    offset,
                });
                offset += field.field_type.byte_size(id_size);
            }
            current = class.superclass_id;
            depth += 1;
            // A superclass cycle only occurs in corrupt dumps
            if current == 0 || depth > MAX_HIERARCHY_DEPTH {
                break;
            }
        }

        Self {
            slots,
            byte_size: offset,
        }
    }

    pub fn slots(&self) -> &[FieldSlot] {
        &self.slots
    }

    /// Bytes of field data an instance of this class carries
    pub fn byte_size(&self) -> u32 {
        self.byte_size
    }

    /// Position of the first (most derived) slot named `name`
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| &*s.name == name)
    }

    /// Position of `name` as declared by `declaring_class_id`
    pub fn position_in(&self, declaring_class_id: u64, name: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.declaring_class_id == declaring_class_id && &*s.name == name)
    }
}

/// Guard against superclass cycles in corrupt dumps
pub const MAX_HIERARCHY_DEPTH: usize = 1024;
