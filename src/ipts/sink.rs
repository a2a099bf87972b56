//! Callback contract by which decoded events leave the core.

use super::model::{DftWindow, Heatmap, Metadata, StylusSample};

/// Receiver for decoded records.
///
/// Callbacks run synchronously during parsing, in wire order, at most once
/// per decoded record. They must not fail and must not retain the heatmap
/// data slice beyond the call; the underlying buffer is reused for the next
/// pass. All methods default to doing nothing, so a consumer only implements
/// the records it cares about.
pub trait EventSink {
    fn on_stylus(&mut self, _sample: &StylusSample) {}

    fn on_heatmap(&mut self, _heatmap: &Heatmap<'_>) {}

    /// Only fired on HID-native devices with a DFT-based pen.
    fn on_dft(&mut self, _window: &DftWindow) {}

    fn on_metadata(&mut self, _metadata: &Metadata) {}
}
