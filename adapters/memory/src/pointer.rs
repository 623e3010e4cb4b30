use std::{fmt, str::FromStr};

use thiserror::Error;

/// Chain of offsets from the main module: every offset but the last is added
/// and then dereferenced.
///
/// Renders in bracket notation, e.g. `[[main+4268EE0]+330]+90`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerPath {
    offsets: Vec<u64>,
}

impl PointerPath {
    /// Creates a path from its offsets, the first relative to the main module.
    #[must_use]
    pub const fn new(offsets: Vec<u64>) -> Self {
        Self { offsets }
    }

    /// Dereferences the current address and adds `offset`.
    #[must_use]
    pub fn then(mut self, offset: u64) -> Self {
        self.offsets.push(offset);
        self
    }

    /// Offsets in order.
    #[must_use]
    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }
}

impl fmt::Display for PointerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depth = self.offsets.len().saturating_sub(1);
        for _ in 0..depth {
            f.write_str("[")?;
        }
        f.write_str("main")?;
        for (index, offset) in self.offsets.iter().enumerate() {
            if index > 0 {
                f.write_str("]")?;
            }
            write!(f, "+{offset:X}")?;
        }
        Ok(())
    }
}

/// Reasons a bracket-notation pointer path cannot be parsed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PointerParseError {
    /// The path does not start from `main`.
    #[error("pointer `{path}` does not start from main")]
    MissingBase {
        /// Rejected input.
        path: String,
    },
    /// Opening and closing brackets do not pair up.
    #[error("pointer `{path}` has unbalanced brackets")]
    UnbalancedBrackets {
        /// Rejected input.
        path: String,
    },
    /// An offset is not a `+`-prefixed hexadecimal number.
    #[error("pointer `{path}` has invalid offset `{offset}`")]
    InvalidOffset {
        /// Rejected input.
        path: String,
        /// Offending segment.
        offset: String,
    },
}

impl FromStr for PointerPath {
    type Err = PointerParseError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let trimmed = path.trim();
        let depth = trimmed.bytes().take_while(|byte| *byte == b'[').count();
        let rest = trimmed[depth..]
            .strip_prefix("main")
            .ok_or_else(|| PointerParseError::MissingBase {
                path: path.to_owned(),
            })?;

        if rest.is_empty() {
            return if depth == 0 {
                Ok(Self::default())
            } else {
                Err(PointerParseError::UnbalancedBrackets {
                    path: path.to_owned(),
                })
            };
        }

        let segments: Vec<&str> = rest.split(']').collect();
        if segments.len() != depth + 1 {
            return Err(PointerParseError::UnbalancedBrackets {
                path: path.to_owned(),
            });
        }

        let offsets = segments
            .into_iter()
            .map(|segment| {
                segment
                    .strip_prefix('+')
                    .and_then(|digits| u64::from_str_radix(digits, 16).ok())
                    .ok_or_else(|| PointerParseError::InvalidOffset {
                        path: path.to_owned(),
                        offset: segment.to_owned(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { offsets })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bracket_notation() {
        let path: PointerPath = "[[main+4268ee0]+330]+90".parse().expect("valid pointer");
        assert_eq!(path.offsets(), &[0x4268EE0, 0x330, 0x90]);
        assert_eq!(path.to_string(), "[[main+4268EE0]+330]+90");
    }

    #[test]
    fn single_offset_has_no_brackets() {
        let path = PointerPath::new(vec![0x10]);
        assert_eq!(path.to_string(), "main+10");
        assert_eq!("main+10".parse(), Ok(path));
    }

    #[test]
    fn rejects_malformed_paths() {
        assert!(matches!(
            "[heap+10]+4".parse::<PointerPath>(),
            Err(PointerParseError::MissingBase { .. })
        ));
        assert!(matches!(
            "[[main+10]+4".parse::<PointerPath>(),
            Err(PointerParseError::UnbalancedBrackets { .. })
        ));
        assert!(matches!(
            "[main+10]+zz".parse::<PointerPath>(),
            Err(PointerParseError::InvalidOffset { .. })
        ));
    }
}
