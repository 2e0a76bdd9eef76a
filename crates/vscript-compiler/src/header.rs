//! Compiled resource header.
//!
//! Every compiled script resource is an 8-byte header followed by a WASM
//! module:
//!
//! ```text
//! magic u32 LE ("CSL_") | version u32 LE | module bytes...
//! ```

/// `'_LSC'` read as a little-endian `u32`.
pub const RESOURCE_MAGIC: u32 = 0x5F4C_5343;
pub const RESOURCE_VERSION: u32 = 0;
pub const HEADER_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceHeader {
    pub magic: u32,
    pub version: u32,
}

impl Default for ResourceHeader {
    fn default() -> Self {
        Self {
            magic: RESOURCE_MAGIC,
            version: RESOURCE_VERSION,
        }
    }
}

impl ResourceHeader {
    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.magic.to_le_bytes());
        buf.extend_from_slice(&self.version.to_le_bytes());
    }

    /// Split `bytes` into a header and the payload after it. Returns `None`
    /// when the input is too short or does not start with the resource magic.
    pub fn parse(bytes: &[u8]) -> Option<(Self, &[u8])> {
        let (head, rest) = bytes.split_first_chunk::<HEADER_SIZE>()?;
        let magic = u32::from_le_bytes([head[0], head[1], head[2], head[3]]);
        let version = u32::from_le_bytes([head[4], head[5], head[6], head[7]]);
        (magic == RESOURCE_MAGIC).then_some((Self { magic, version }, rest))
    }
}
