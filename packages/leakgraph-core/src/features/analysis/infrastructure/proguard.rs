//! ProGuard / R8 `mapping.txt` reader
//!
//! ```text
//! com.example.Session -> a.b:
//!     java.util.List listeners -> c
//!     void close() -> d
//!     12:14:void flush():40:42 -> e
//! ```
//!
//! Class lines are unindented and end with `:`; indented lines without `(`
//! are fields. Methods and `#` comments are skipped.

use crate::errors::{LeakgraphError, Result};
use crate::features::analysis::domain::ObfuscationMapping;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

const ARROW: &str = " -> ";

pub struct ProguardMappingReader;

impl ProguardMappingReader {
    pub fn read_file(path: impl AsRef<Path>) -> Result<ObfuscationMapping> {
        let file = File::open(path.as_ref())?;
        Self::read(BufReader::new(file))
    }

    pub fn read_str(content: &str) -> Result<ObfuscationMapping> {
        Self::read(content.as_bytes())
    }

    /// Parse a mapping; malformed class lines fail with their byte offset
    pub fn read(mut reader: impl BufRead) -> Result<ObfuscationMapping> {
        let mut mapping = ObfuscationMapping::new();
        let mut current_class: Option<String> = None;
        let mut offset = 0u64;
        let mut line = String::new();

        loop {
            line.clear();
            let read = reader.read_line(&mut line)?;
            if read == 0 {
                break;
            }
            let line_offset = offset;
            offset += read as u64;

            let trimmed = line.trim_end();
            if trimmed.trim_start().is_empty() || trimmed.trim_start().starts_with('#') {
                continue;
            }

            if !trimmed.starts_with(char::is_whitespace) {
                let Some(body) = trimmed.strip_suffix(':') else {
                    return Err(LeakgraphError::parse(line_offset, "class mapping line must end with ':'"));
                };
                let Some((clear, obfuscated)) = body.split_once(ARROW) else {
                    return Err(LeakgraphError::parse(line_offset, "class mapping line lacks ' -> '"));
                };
                let (clear, obfuscated) = (clear.trim(), obfuscated.trim());
                mapping.add_class(obfuscated, clear);
                current_class = Some(obfuscated.to_string());
                continue;
            }

            let member = trimmed.trim();
            if member.contains('(') {
                continue;
            }
            let (Some(class), Some((declaration, obfuscated))) =
                (current_class.as_deref(), member.split_once(ARROW))
            else {
                continue;
            };
            if let Some(clear_field) = declaration.split_whitespace().last() {
                mapping.add_field(class, obfuscated.trim(), clear_field);
            }
        }

        debug!(classes = mapping.class_count(), "Obfuscation mapping loaded");
        Ok(mapping)
    }
}
