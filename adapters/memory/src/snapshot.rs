use std::{
    collections::{BTreeMap, HashMap},
    io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::{MemoryChannel, PointerParseError, PointerPath};

/// Failures raised by [`SnapshotChannel`].
#[derive(Debug, Error)]
pub enum SnapshotChannelError {
    /// The snapshot file could not be read.
    #[error("failed to read snapshot {}", path.display())]
    Io {
        /// Snapshot file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The snapshot is not a JSON object of pointer paths.
    #[error("failed to parse snapshot")]
    Json(#[from] serde_json::Error),
    /// A snapshot key is not a valid pointer path.
    #[error(transparent)]
    Pointer(#[from] PointerParseError),
    /// A snapshot value is neither an integer nor a hexadecimal string.
    #[error("value `{value}` at {path} is not a 64-bit integer or a byte string")]
    InvalidValue {
        /// Pointer the value was stored under.
        path: String,
        /// Offending value.
        value: String,
    },
    /// A read addressed memory the snapshot did not capture.
    #[error("snapshot has no value at {path}")]
    Unmapped {
        /// Pointer that was read.
        path: String,
    },
    /// A read asked for more bytes than the snapshot captured.
    #[error("snapshot holds {captured} bytes at {path} but {requested} were read")]
    ShortRead {
        /// Pointer that was read.
        path: String,
        /// Bytes captured at the pointer.
        captured: usize,
        /// Bytes the read asked for.
        requested: usize,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotValue {
    Number(u64),
    Text(String),
    Bytes { bytes: String },
}

impl SnapshotValue {
    fn parse(self, path: &str) -> Result<Vec<u8>, SnapshotChannelError> {
        let invalid = |value: &str| SnapshotChannelError::InvalidValue {
            path: path.to_owned(),
            value: value.to_owned(),
        };
        match self {
            Self::Number(value) => Ok(value.to_le_bytes().to_vec()),
            Self::Text(text) => {
                let digits = text
                    .strip_prefix("0x")
                    .or_else(|| text.strip_prefix("0X"))
                    .unwrap_or(text.as_str());
                u64::from_str_radix(digits, 16)
                    .map(|value| value.to_le_bytes().to_vec())
                    .map_err(|_| invalid(&text))
            }
            Self::Bytes { bytes } => decode_hex(&bytes).ok_or_else(|| invalid(&bytes)),
        }
    }
}

/// Decodes a string of hexadecimal byte pairs, ignoring whitespace.
fn decode_hex(text: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = text.bytes().filter(|byte| !byte.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks_exact(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(pair, 16).ok()
        })
        .collect()
}

/// Channel answering reads from captured values and recording writes.
///
/// Snapshots are JSON objects mapping bracket-notation pointers to integers,
/// hexadecimal strings or `{ "bytes": "..." }` byte dumps. Integers are held
/// as eight little-endian bytes, so narrower reads see their low bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotChannel {
    values: HashMap<PointerPath, Vec<u8>>,
    writes: Vec<(PointerPath, Vec<u8>)>,
}

impl SnapshotChannel {
    /// Creates a channel that has captured nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the channel with `value` captured at `path`.
    #[must_use]
    pub fn with_value(self, path: PointerPath, value: u64) -> Self {
        self.with_bytes(path, value.to_le_bytes().to_vec())
    }

    /// Returns the channel with `bytes` captured starting at `path`.
    #[must_use]
    pub fn with_bytes(mut self, path: PointerPath, bytes: Vec<u8>) -> Self {
        let _ = self.values.insert(path, bytes);
        self
    }

    /// Parses a snapshot document.
    pub fn from_json_str(json: &str) -> Result<Self, SnapshotChannelError> {
        let document: BTreeMap<String, SnapshotValue> = serde_json::from_str(json)?;
        let mut values = HashMap::with_capacity(document.len());
        for (key, value) in document {
            let value = value.parse(&key)?;
            let _ = values.insert(key.parse::<PointerPath>()?, value);
        }
        debug!(values = values.len(), "loaded memory snapshot");
        Ok(Self {
            values,
            writes: Vec::new(),
        })
    }

    /// Reads and parses a snapshot file.
    pub fn load(path: &Path) -> Result<Self, SnapshotChannelError> {
        let json = std::fs::read_to_string(path).map_err(|source| SnapshotChannelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Writes received so far, in order.
    #[must_use]
    pub fn writes(&self) -> &[(PointerPath, Vec<u8>)] {
        &self.writes
    }
}

impl MemoryChannel for SnapshotChannel {
    type Error = SnapshotChannelError;

    fn read_bytes(&mut self, path: &PointerPath, len: usize) -> Result<Vec<u8>, Self::Error> {
        let captured = self
            .values
            .get(path)
            .ok_or_else(|| SnapshotChannelError::Unmapped {
                path: path.to_string(),
            })?;
        captured
            .get(..len)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| SnapshotChannelError::ShortRead {
                path: path.to_string(),
                captured: captured.len(),
                requested: len,
            })
    }

    fn write_bytes(&mut self, path: &PointerPath, bytes: &[u8]) -> Result<(), Self::Error> {
        self.writes.push((path.clone(), bytes.to_vec()));
        Ok(())
    }
}
