//! Binary file format for compiled scripts.
//!
//! Stores a parsed [`Script`] so hosts can ship compiled handlers without
//! re-parsing source text.
//!
//! # File Format
//!
//! ```text
//! +--------------------+
//! | Magic (4 bytes)    |  "HTBC"
//! +--------------------+
//! | Version (4 bytes)  |  u32 format version
//! +--------------------+
//! | Flags (4 bytes)    |  u32, reserved
//! +--------------------+
//! | Length (4 bytes)   |  u32 length of serialized script
//! +--------------------+
//! | Data (N bytes)     |  bincode-serialized Script
//! +--------------------+
//! ```

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use hypertalk_vm_parser::Script;

/// Magic bytes identifying a compiled script file
pub const MAGIC: &[u8; 4] = b"HTBC";

/// Current format version
pub const VERSION: u32 = 1;

const HEADER_LEN: usize = 16;

/// Bytecode format error
#[derive(Debug)]
pub enum BytecodeError {
    /// I/O error during file operations
    IoError(std::io::Error),
    /// Invalid magic bytes - not a compiled script file
    InvalidMagic,
    /// Unsupported format version
    UnsupportedVersion(u32),
    /// Deserialization error
    DeserializeError(String),
    /// Serialization error
    SerializeError(String),
}

impl std::fmt::Display for BytecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BytecodeError::IoError(e) => write!(f, "I/O error: {}", e),
            BytecodeError::InvalidMagic => {
                write!(f, "invalid magic bytes - not a compiled script file")
            }
            BytecodeError::UnsupportedVersion(v) => {
                write!(f, "unsupported version: {} (current: {})", v, VERSION)
            }
            BytecodeError::DeserializeError(e) => write!(f, "failed to deserialize: {}", e),
            BytecodeError::SerializeError(e) => write!(f, "failed to serialize: {}", e),
        }
    }
}

impl std::error::Error for BytecodeError {}

impl From<std::io::Error> for BytecodeError {
    fn from(e: std::io::Error) -> Self {
        BytecodeError::IoError(e)
    }
}

/// Save a compiled script to a file
pub fn save<P: AsRef<Path>>(script: &Script, path: P) -> Result<(), BytecodeError> {
    let bytes = save_to_bytes(script)?;
    let mut file = File::create(path)?;
    file.write_all(&bytes)?;
    Ok(())
}

/// Load a compiled script from a file
pub fn load<P: AsRef<Path>>(path: P) -> Result<Script, BytecodeError> {
    let mut file = File::open(path)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    load_from_bytes(&data)
}

/// Serialize a compiled script to bytes (for in-memory use)
pub fn save_to_bytes(script: &Script) -> Result<Vec<u8>, BytecodeError> {
    let data =
        bincode::serialize(script).map_err(|e| BytecodeError::SerializeError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_LEN + data.len());
    result.extend_from_slice(MAGIC);
    result.extend_from_slice(&VERSION.to_le_bytes());
    result.extend_from_slice(&0u32.to_le_bytes());
    result.extend_from_slice(&(data.len() as u32).to_le_bytes());
    result.extend_from_slice(&data);
    Ok(result)
}

/// Deserialize a compiled script from bytes
pub fn load_from_bytes(data: &[u8]) -> Result<Script, BytecodeError> {
    if data.len() < HEADER_LEN || &data[0..4] != MAGIC {
        return Err(BytecodeError::InvalidMagic);
    }

    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version > VERSION {
        return Err(BytecodeError::UnsupportedVersion(version));
    }

    let length = u32::from_le_bytes([data[12], data[13], data[14], data[15]]) as usize;
    if data.len() < HEADER_LEN + length {
        return Err(BytecodeError::DeserializeError("truncated data".to_string()));
    }

    bincode::deserialize(&data[HEADER_LEN..HEADER_LEN + length])
        .map_err(|e| BytecodeError::DeserializeError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::parse_source;

    fn sample_script() -> Script {
        parse_source("on main\nput 5 into x\nend main\n", "sample.ht").unwrap()
    }

    #[test]
    fn test_save_load_bytes() {
        let script = sample_script();
        let bytes = save_to_bytes(&script).unwrap();
        let loaded = load_from_bytes(&bytes).unwrap();
        assert_eq!(script, loaded);
    }

    #[test]
    fn test_magic_and_version() {
        let bytes = save_to_bytes(&sample_script()).unwrap();
        assert_eq!(&bytes[0..4], MAGIC);
        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        assert_eq!(version, VERSION);
    }

    #[test]
    fn test_invalid_magic() {
        let result = load_from_bytes(b"XXXX\x01\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00");
        assert!(matches!(result, Err(BytecodeError::InvalidMagic)));
    }

    #[test]
    fn test_unsupported_version() {
        let mut data = Vec::new();
        data.extend_from_slice(MAGIC);
        data.extend_from_slice(&999u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());

        let result = load_from_bytes(&data);
        assert!(matches!(result, Err(BytecodeError::UnsupportedVersion(999))));
    }

    #[test]
    fn test_save_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.htbc");

        let script = sample_script();
        save(&script, &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(script, loaded);
    }
}
