//! Cast container version.

/// Cast file magic (`"cast"` read as a little-endian u32).
pub const CAST_MAGIC: u32 = 0x7473_6163;

/// Container version written into exported files.
pub const CAST_VERSION: u32 = 1;
