//! Binary reader and writer primitives shared by the replay formats
//!
//! All three formats are little-endian. Strings are length-prefixed with an
//! `i32` byte count followed by raw UTF-8 bytes:
//!
//! ```text
//! ┌───────────────┬──────────────────────────┐
//! │ len: i32      │ bytes: [u8; len]         │
//! └───────────────┴──────────────────────────┘
//! ```
//!
//! Compound values are stored field by field:
//!
//! ```text
//! vec3      = x: f32, y: f32, z: f32
//! quat      = x: f32, y: f32, z: f32, w: f32
//! transform = position: vec3, rotation: quat
//! ```

mod reader;
mod writer;

pub use reader::ReplayReader;
pub use writer::ReplayWriter;

/// Longest string accepted by the tolerant reader when probing for the next
/// length prefix
pub const MAX_PLAUSIBLE_STRING_LEN: i32 = 300;
