//! Name deobfuscation lookup table

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Obfuscated class and field names to their clear names
///
/// Unknown names pass through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObfuscationMapping {
    classes: FxHashMap<String, String>,
    /// Keyed by obfuscated class, then obfuscated field
    fields: FxHashMap<String, FxHashMap<String, String>>,
}

impl ObfuscationMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, obfuscated: impl Into<String>, clear: impl Into<String>) {
        self.classes.insert(obfuscated.into(), clear.into());
    }

    pub fn add_field(
        &mut self,
        obfuscated_class: impl Into<String>,
        obfuscated_field: impl Into<String>,
        clear_field: impl Into<String>,
    ) {
        self.fields
            .entry(obfuscated_class.into())
            .or_default()
            .insert(obfuscated_field.into(), clear_field.into());
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.fields.is_empty()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Clear class name; array suffixes are preserved
    pub fn deobfuscate_class(&self, class_name: &str) -> String {
        let element = class_name.trim_end_matches("[]");
        let suffix = &class_name[element.len()..];
        match self.classes.get(element) {
            Some(clear) => format!("{}{}", clear, suffix),
            None => class_name.to_string(),
        }
    }

    /// Clear field name of `field_name` declared by the obfuscated class
    pub fn deobfuscate_field(&self, obfuscated_class: &str, field_name: &str) -> String {
        self.fields
            .get(obfuscated_class)
            .and_then(|fields| fields.get(field_name))
            .cloned()
            .unwrap_or_else(|| field_name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_passes_unknown_names_through() {
        let mut mapping = ObfuscationMapping::new();
        mapping.add_class("a.b", "com.example.Session");
        mapping.add_field("a.b", "c", "listeners");

        assert_eq!(mapping.deobfuscate_class("a.b"), "com.example.Session");
        assert_eq!(mapping.deobfuscate_class("a.b[][]"), "com.example.Session[][]");
        assert_eq!(mapping.deobfuscate_class("x.y"), "x.y");
        assert_eq!(mapping.deobfuscate_field("a.b", "c"), "listeners");
        assert_eq!(mapping.deobfuscate_field("a.b", "d"), "d");
    }
}
