//! Replay file formats
//!
//! Three unrelated binary formats decode into the same [`ReplayWrapper`]:
//!
//! | Format     | Extension | Recognised by                     |
//! |------------|-----------|-----------------------------------|
//! | legacy     | `.reqlay` | `A1 D2 45` magic (v1 has none)    |
//! | BSOR       | `.bsor`   | `i32` magic `0x442D3D69`          |
//! | ScoreSaber | `.dat`    | `"ScoreSaber Replay 👌🤠\r\n"`    |
//!
//! Decoders share only the reader and the model.

pub mod bsor;
pub mod legacy;
pub mod scoresaber;

use crate::error::{ReplayError, Result};
use crate::model::ReplayWrapper;
use std::path::Path;

/// A replay file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Legacy,
    Bsor,
    ScoreSaber,
}

impl Format {
    /// Identify a format from its leading bytes
    ///
    /// Legacy v1 files carry no magic and are never sniffed.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(scoresaber::HEADER) {
            Some(Format::ScoreSaber)
        } else if bytes.starts_with(&bsor::MAGIC.to_le_bytes()) {
            Some(Format::Bsor)
        } else if legacy::has_magic(bytes) {
            Some(Format::Legacy)
        } else {
            None
        }
    }

    /// Identify a format from a file extension
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "reqlay" => Some(Format::Legacy),
            "bsor" => Some(Format::Bsor),
            "dat" => Some(Format::ScoreSaber),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Legacy => "legacy",
            Format::Bsor => "bsor",
            Format::ScoreSaber => "scoresaber",
        }
    }
}

/// Settings shared by the decoders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Average only the yaw of head rotations on 360/90 degree maps
    pub yaw_only_for_rotating_maps: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            yaw_only_for_rotating_maps: true,
        }
    }
}

impl DecodeOptions {
    pub(crate) fn yaw_only(&self, characteristic: &str) -> bool {
        self.yaw_only_for_rotating_maps
            && (characteristic.contains("360") || characteristic.contains("90"))
    }
}

/// Decode a buffer in a known format
pub fn decode(bytes: &[u8], format: Format, options: &DecodeOptions) -> Result<ReplayWrapper> {
    match format {
        Format::Legacy => legacy::decode(bytes),
        Format::Bsor => bsor::decode_with(bytes, options),
        Format::ScoreSaber => scoresaber::decode_with(bytes, options),
    }
}

/// Decode a file of any supported format
///
/// The format is sniffed from the leading bytes, falling back to the file
/// extension (the only way to recognise a legacy v1 file).
pub fn decode_file(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<ReplayWrapper> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let format = Format::sniff(&bytes)
        .or_else(|| Format::from_extension(path))
        .ok_or_else(|| {
            ReplayError::format(format!("unrecognised replay file {}", path.display()))
        })?;
    Ok(decode(&bytes, format, options)?.with_path(path))
}
