use std::path::Path;

use crate::{read_file, ReferenceDataError};

/// Ordered names looked up by small integer index, one per line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameTable {
    names: Vec<String>,
}

impl NameTable {
    /// Splits newline-separated text into a table.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            names: text.lines().map(str::to_owned).collect(),
        }
    }

    /// Reads a newline-separated table from disk.
    pub fn load(path: &Path) -> Result<Self, ReferenceDataError> {
        read_file(path).map(|text| Self::from_text(&text))
    }

    /// Name stored at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Name stored at `index`, or the index itself when the table is short.
    #[must_use]
    pub fn name_or_index(&self, index: usize) -> String {
        self.get(index).map_or_else(|| index.to_string(), str::to_owned)
    }

    /// Number of names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table holds no names.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
