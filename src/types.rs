//! Shared codec types for mocap-rs
//!
//! # Main Types
//!
//! - [`ByteOrder`] - Processor convention used for multi-byte values in a file
//! - [`StorageFormat`] - Fixed-point or floating-point sample storage
//! - [`WritingFlags`] - Derived-state resynchronization requested before encoding
//! - [`FileType`] - Binary or text codec
//!
//! # Processor Codes
//!
//! C3D files record their byte order as `83 + code` in the fourth byte of the
//! parameter section:
//!
//! | Code | Byte order          |
//! |------|---------------------|
//! | 1    | IEEE little endian  |
//! | 2    | VAX little endian   |
//! | 3    | IEEE big endian     |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// Offset added to the processor code in the parameter section prefix
pub const PROCESSOR_CODE_BASE: u8 = 83;

/// Byte order used to encode multi-byte numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ByteOrder {
    /// DEC VAX convention: little-endian integers, VAX-F floats
    #[serde(rename = "VAX_LittleEndian")]
    VaxLittleEndian,
    /// Intel convention
    #[default]
    #[serde(rename = "IEEE_LittleEndian")]
    IeeeLittleEndian,
    /// MIPS/SGI convention
    #[serde(rename = "IEEE_BigEndian")]
    IeeeBigEndian,
}

impl ByteOrder {
    /// Byte order of the host
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::IeeeBigEndian
        } else {
            ByteOrder::IeeeLittleEndian
        }
    }

    /// Processor code stored in C3D files
    pub fn processor_code(self) -> u8 {
        match self {
            ByteOrder::IeeeLittleEndian => 1,
            ByteOrder::VaxLittleEndian => 2,
            ByteOrder::IeeeBigEndian => 3,
        }
    }

    /// Decode a processor code, `None` for anything unknown
    pub fn from_processor_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(ByteOrder::IeeeLittleEndian),
            2 => Some(ByteOrder::VaxLittleEndian),
            3 => Some(ByteOrder::IeeeBigEndian),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ByteOrder::VaxLittleEndian => "VAX_LittleEndian",
            ByteOrder::IeeeLittleEndian => "IEEE_LittleEndian",
            ByteOrder::IeeeBigEndian => "IEEE_BigEndian",
        }
    }

    pub fn all() -> [ByteOrder; 3] {
        [
            ByteOrder::VaxLittleEndian,
            ByteOrder::IeeeLittleEndian,
            ByteOrder::IeeeBigEndian,
        ]
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ByteOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vax_littleendian" | "vax" => Ok(ByteOrder::VaxLittleEndian),
            "ieee_littleendian" | "le" | "little" => Ok(ByteOrder::IeeeLittleEndian),
            "ieee_bigendian" | "be" | "big" => Ok(ByteOrder::IeeeBigEndian),
            other => Err(format!("unknown byte order '{}'", other)),
        }
    }
}

/// How point and analog samples are stored in the data section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StorageFormat {
    /// Scaled 16-bit integers
    #[default]
    Integer,
    /// 32-bit floats
    Float,
}

impl StorageFormat {
    /// Decode the signed header scale factor.
    ///
    /// A zero scale is not a valid header.
    pub fn from_scale(scale: f32) -> Option<Self> {
        if scale > 0.0 {
            Some(StorageFormat::Integer)
        } else if scale < 0.0 {
            Some(StorageFormat::Float)
        } else {
            None
        }
    }

    /// Apply the storage sign convention to a magnitude
    pub fn signed_scale(self, magnitude: f32) -> f32 {
        match self {
            StorageFormat::Integer => magnitude.abs(),
            StorageFormat::Float => -magnitude.abs(),
        }
    }

    /// Bytes per stored sample
    pub fn sample_size(self) -> usize {
        match self {
            StorageFormat::Integer => 2,
            StorageFormat::Float => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StorageFormat::Integer => "Integer",
            StorageFormat::Float => "Float",
        }
    }
}

impl fmt::Display for StorageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StorageFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "integer" | "int" => Ok(StorageFormat::Integer),
            "float" | "real" => Ok(StorageFormat::Float),
            other => Err(format!("unknown storage format '{}'", other)),
        }
    }
}

/// Derived state to recompute from the acquisition right before encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WritingFlags {
    /// Recompute the point scale (and analog scales) from the sample values
    #[serde(default)]
    pub scales_from_data_update: bool,
    /// Rebuild the POINT/ANALOG/EVENT/TRIAL parameter groups
    #[serde(default)]
    pub metadata_from_data_update: bool,
}

impl WritingFlags {
    pub const NONE: WritingFlags = WritingFlags {
        scales_from_data_update: false,
        metadata_from_data_update: false,
    };
    pub const SCALES_FROM_DATA_UPDATE: WritingFlags = WritingFlags {
        scales_from_data_update: true,
        metadata_from_data_update: false,
    };
    pub const METADATA_FROM_DATA_UPDATE: WritingFlags = WritingFlags {
        scales_from_data_update: false,
        metadata_from_data_update: true,
    };
    pub const ALL: WritingFlags = WritingFlags {
        scales_from_data_update: true,
        metadata_from_data_update: true,
    };

    pub fn contains(self, other: WritingFlags) -> bool {
        (!other.scales_from_data_update || self.scales_from_data_update)
            && (!other.metadata_from_data_update || self.metadata_from_data_update)
    }

    pub fn is_empty(self) -> bool {
        self == Self::NONE
    }
}

impl Default for WritingFlags {
    fn default() -> Self {
        Self::ALL
    }
}

impl BitOr for WritingFlags {
    type Output = WritingFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        WritingFlags {
            scales_from_data_update: self.scales_from_data_update || rhs.scales_from_data_update,
            metadata_from_data_update: self.metadata_from_data_update
                || rhs.metadata_from_data_update,
        }
    }
}

/// Nature of the file handled by a codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    Binary,
    Ascii,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processor_codes() {
        for order in ByteOrder::all() {
            assert_eq!(
                ByteOrder::from_processor_code(order.processor_code() as i32),
                Some(order)
            );
        }
        assert_eq!(ByteOrder::from_processor_code(0), None);
        assert_eq!(ByteOrder::from_processor_code(4), None);
    }

    #[test]
    fn test_storage_format_from_scale() {
        assert_eq!(StorageFormat::from_scale(0.083), Some(StorageFormat::Integer));
        assert_eq!(StorageFormat::from_scale(-0.083), Some(StorageFormat::Float));
        assert_eq!(StorageFormat::from_scale(0.0), None);
        assert_eq!(StorageFormat::Float.signed_scale(0.5), -0.5);
        assert_eq!(StorageFormat::Integer.signed_scale(-0.5), 0.5);
    }

    #[test]
    fn test_writing_flags() {
        let flags = WritingFlags::SCALES_FROM_DATA_UPDATE | WritingFlags::METADATA_FROM_DATA_UPDATE;
        assert_eq!(flags, WritingFlags::ALL);
        assert!(flags.contains(WritingFlags::SCALES_FROM_DATA_UPDATE));
        assert!(!WritingFlags::NONE.contains(WritingFlags::METADATA_FROM_DATA_UPDATE));
        assert!(WritingFlags::NONE.is_empty());
        assert_eq!(WritingFlags::default(), WritingFlags::ALL);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("VAX_LittleEndian".parse::<ByteOrder>(), Ok(ByteOrder::VaxLittleEndian));
        assert_eq!("be".parse::<ByteOrder>(), Ok(ByteOrder::IeeeBigEndian));
        assert_eq!("Float".parse::<StorageFormat>(), Ok(StorageFormat::Float));
        assert!("mips".parse::<ByteOrder>().is_err());
    }
}
