//! Decoded records handed to the consumer.

use super::wire::{DftRow, MetadataDimensions, MetadataTransform, DFT_MAX_ROWS};

/// One normalized stylus sample.
///
/// `x`, `y` and `pressure` live in the unit interval; `altitude` and
/// `azimuth` are radians (0 when the device does not report tilt).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StylusSample {
    pub serial: u32,

    pub proximity: bool,
    pub contact: bool,
    pub button: bool,
    pub rubber: bool,

    pub x: f64,
    pub y: f64,
    pub pressure: f64,
    pub altitude: f64,
    pub azimuth: f64,

    /// Controller-assigned, 0 when not supported.
    pub timestamp: u16,
}

/// One capacitive heatmap. `data` borrows the input buffer and holds
/// `width * height` intensity values, LOWER meaning stronger contact.
#[derive(Debug, Clone, Copy)]
pub struct Heatmap<'a> {
    pub width: u8,
    pub height: u8,

    pub y_min: u8,
    pub y_max: u8,
    pub x_min: u8,
    pub x_max: u8,
    pub z_min: u8,
    /// Never 0; devices that leave it unset get 255.
    pub z_max: u8,

    pub timestamp: Option<u32>,

    pub data: &'a [u8],
}

/// Per-axis DFT measurements from one antenna sweep of the touch controller.
///
/// Only the first `num_rows` entries of `x` and `y` carry data. `group`
/// is present when a preceding pen-metadata report matched this window's
/// sequence number and data type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DftWindow {
    pub timestamp: u32,
    pub num_rows: u8,
    pub seq_num: u8,
    pub data_type: u8,
    pub group: Option<u32>,

    pub x: [DftRow; DFT_MAX_ROWS],
    pub y: [DftRow; DFT_MAX_ROWS],
}

impl DftWindow {
    /// Number of valid rows per axis.
    pub fn rows(&self) -> usize {
        usize::from(self.num_rows).min(DFT_MAX_ROWS)
    }
}

/// Device self-description from a metadata frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metadata {
    pub dimensions: MetadataDimensions,
    pub transform: MetadataTransform,
    pub unknown_byte: u8,
    pub unknown: [f32; 16],
}
