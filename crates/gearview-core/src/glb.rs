//! Binary glTF (GLB) container header check
//!
//! Only the 12-byte header is inspected; parsing the chunks is left to the
//! renderer's loader.

use thiserror::Error;

/// `glTF` in little-endian
pub const GLB_MAGIC: u32 = 0x4654_6C67;

/// Size of the fixed GLB header
pub const GLB_HEADER_LEN: usize = 12;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GlbError {
    #[error("payload too short for a GLB header ({0} bytes)")]
    TooShort(usize),
    #[error("bad GLB magic 0x{0:08x}")]
    BadMagic(u32),
    #[error("unsupported GLB version {0}")]
    UnsupportedVersion(u32),
    #[error("GLB declares {declared} bytes but payload has {actual}")]
    BadLength { declared: u32, actual: usize },
}

/// Parsed GLB header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlbHeader {
    pub version: u32,
    /// Total length declared by the header, in bytes
    pub length: u32,
}

impl GlbHeader {
    /// Parse and check the header of a GLB payload
    pub fn parse(bytes: &[u8]) -> Result<Self, GlbError> {
        if bytes.len() < GLB_HEADER_LEN {
            return Err(GlbError::TooShort(bytes.len()));
        }

        let magic = read_u32(bytes, 0);
        if magic != GLB_MAGIC {
            return Err(GlbError::BadMagic(magic));
        }

        let version = read_u32(bytes, 4);
        if version != 2 {
            return Err(GlbError::UnsupportedVersion(version));
        }

        let length = read_u32(bytes, 8);
        if (length as usize) < GLB_HEADER_LEN || length as usize > bytes.len() {
            return Err(GlbError::BadLength {
                declared: length,
                actual: bytes.len(),
            });
        }

        Ok(Self { version, length })
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
pub(crate) fn minimal_glb() -> Vec<u8> {
    // Header followed by an empty JSON chunk ("{}" padded to 4 bytes)
    let json = b"{}  ";
    let total = (GLB_HEADER_LEN + 8 + json.len()) as u32;
    let mut out = Vec::new();
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&total.to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&0x4E4F_534Au32.to_le_bytes());
    out.extend_from_slice(json);
    out
}
