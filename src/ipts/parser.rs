//! Recursive-descent parser for the IPTS container hierarchy.
//!
//! One call to [`FrameParser::parse`] decodes one input buffer: a top-level
//! HID frame that may nest further HID frames, a heatmap container, device
//! metadata, a legacy payload, or a flat list of reports. Unknown frames and
//! reports are skipped over their declared size so firmware additions do not
//! break decoding. Nesting is bounded by the protocol itself (at most five
//! container layers), so plain recursion is fine.

use super::model::{DftWindow, Heatmap, Metadata, StylusSample};
use super::reader::{FromWire, ParseError, Reader};
use super::sink::EventSink;
use super::wire::{
    DftRow, DftWindowHeader, HeatmapDim, HeatmapHeader, HidFrameHeader, LegacyGroup, LegacyHeader,
    MetadataDimensions, MetadataTransform, PenMetadata, ReportHeader, StylusGroup, StylusSampleV1,
    StylusSampleV2, TimestampReport, ANGLE_DIVISOR, DFT_MAX_ROWS, FRAME_HEATMAP, FRAME_HID,
    FRAME_LEGACY, FRAME_METADATA, FRAME_REPORTS, LEGACY_GROUP_STYLUS, LEGACY_GROUP_TOUCH,
    MAX_PRESSURE, MAX_PRESSURE_V1, MAX_X, MAX_Y, REPORT_HEATMAP_DATA, REPORT_HEATMAP_DIM,
    REPORT_PEN_DFT_WINDOW, REPORT_PEN_METADATA, REPORT_STYLUS_MPP_1_0, REPORT_STYLUS_MPP_1_51,
    REPORT_STYLUS_V1, REPORT_STYLUS_V2, REPORT_TIMESTAMP, STYLUS_MODE_BUTTON, STYLUS_MODE_CONTACT,
    STYLUS_MODE_PROXIMITY, STYLUS_MODE_RUBBER,
};

/// How a stylus report encodes its samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StylusVariant {
    /// No tilt, 1024-step pressure, contact taken from the mode bits.
    V1,
    /// Tilt and 4096-step pressure, contact taken from the mode bits.
    V2,
    /// V1 layout, but contact derived from pressure (MPP 1.0).
    Mpp1_0,
    /// V2 layout, but contact derived from pressure (MPP 1.51).
    Mpp1_51,
}

impl StylusVariant {
    fn has_tilt(self) -> bool {
        matches!(self, StylusVariant::V2 | StylusVariant::Mpp1_51)
    }

    /// MPP reports carry an unreliable contact flag in eraser mode, so
    /// contact is derived from pressure instead.
    fn contact_from_pressure(self) -> bool {
        matches!(self, StylusVariant::Mpp1_0 | StylusVariant::Mpp1_51)
    }

    fn sample_size(self) -> usize {
        if self.has_tilt() {
            StylusSampleV2::WIRE_SIZE
        } else {
            StylusSampleV1::WIRE_SIZE
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedDim {
    dim: HeatmapDim,
    pass: u64,
}

/// Walks one input buffer at a time and dispatches decoded records to an
/// [`EventSink`].
///
/// The cached dimensions, timestamp and pen metadata are the only state
/// carried between passes; instances are cheap but not re-entrant, so use
/// one per decoding thread.
#[derive(Debug)]
pub struct FrameParser {
    mpp_1_0_report: u8,
    mpp_1_51_report: u8,

    dim: Option<CachedDim>,
    timestamp: Option<u32>,
    pen_meta: Option<PenMetadata>,
    pass: u64,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub fn new() -> Self {
        Self::with_mpp_reports(REPORT_STYLUS_MPP_1_0, REPORT_STYLUS_MPP_1_51)
    }

    /// Some device generations number the MPP stylus reports differently;
    /// this lets the host supply the values from its configuration.
    pub fn with_mpp_reports(mpp_1_0: u8, mpp_1_51: u8) -> Self {
        Self {
            mpp_1_0_report: mpp_1_0,
            mpp_1_51_report: mpp_1_51,
            dim: None,
            timestamp: None,
            pen_meta: None,
            pass: 0,
        }
    }

    /// Decode one buffer: skip `header_bytes` of transport header, then
    /// parse one top-level HID frame.
    ///
    /// On error the pass is abandoned; records decoded before the error have
    /// already reached the sink, the rest of the buffer is dropped.
    pub fn parse<S: EventSink>(
        &mut self,
        data: &[u8],
        header_bytes: usize,
        sink: &mut S,
    ) -> Result<(), ParseError> {
        self.pass += 1;
        let mut reader = Reader::new(data);
        reader.skip(header_bytes)?;
        self.parse_frame(&mut reader, sink)
    }

    fn parse_frame<S: EventSink>(
        &mut self,
        reader: &mut Reader<'_>,
        sink: &mut S,
    ) -> Result<(), ParseError> {
        let header: HidFrameHeader = reader.read()?;

        // The declared size counts the header itself.
        let payload = (header.size as usize)
            .checked_sub(HidFrameHeader::WIRE_SIZE)
            .ok_or_else(|| reader.out_of_range(header.size as usize))?;
        let mut sub = reader.sub(payload)?;

        match header.kind {
            FRAME_HID => {
                while sub.size() > 0 {
                    self.parse_frame(&mut sub, sink)?;
                }
            }
            FRAME_HEATMAP => self.parse_heatmap_frame(&mut sub, sink)?,
            FRAME_METADATA => self.parse_metadata(&mut sub, sink)?,
            FRAME_LEGACY => self.parse_legacy(&mut sub, sink)?,
            FRAME_REPORTS => {
                // Some SP7 units emit a malformed 4-byte probe packet here.
                if sub.size() != 4 {
                    self.parse_reports(&mut sub, sink)?;
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn parse_heatmap_frame<S: EventSink>(
        &mut self,
        reader: &mut Reader<'_>,
        sink: &mut S,
    ) -> Result<(), ParseError> {
        let header: HeatmapHeader = reader.read()?;
        let mut sub = reader.sub(header.size as usize)?;
        self.emit_heatmap(&mut sub, sink)
    }

    fn parse_metadata<S: EventSink>(
        &mut self,
        reader: &mut Reader<'_>,
        sink: &mut S,
    ) -> Result<(), ParseError> {
        let dimensions: MetadataDimensions = reader.read()?;
        let unknown_byte: u8 = reader.read()?;
        let transform: MetadataTransform = reader.read()?;
        let mut unknown = [0f32; 16];
        for value in &mut unknown {
            *value = reader.read()?;
        }

        // A metadata update invalidates previously cached heatmap dimensions.
        self.dim = None;

        let metadata = Metadata {
            dimensions,
            transform,
            unknown_byte,
            unknown,
        };
        sink.on_metadata(&metadata);
        Ok(())
    }

    fn parse_legacy<S: EventSink>(
        &mut self,
        reader: &mut Reader<'_>,
        sink: &mut S,
    ) -> Result<(), ParseError> {
        let header: LegacyHeader = reader.read()?;

        for _ in 0..header.frames {
            let group: LegacyGroup = reader.read()?;

            match group.kind {
                LEGACY_GROUP_STYLUS | LEGACY_GROUP_TOUCH => {
                    let mut sub = reader.sub(group.size as usize)?;
                    self.parse_reports(&mut sub, sink)?;
                }
                _ => reader.skip(group.size as usize)?,
            }
        }

        Ok(())
    }

    fn parse_reports<S: EventSink>(
        &mut self,
        reader: &mut Reader<'_>,
        sink: &mut S,
    ) -> Result<(), ParseError> {
        // Runt trailers shorter than a report header are tolerated.
        while reader.size() >= ReportHeader::WIRE_SIZE {
            let header: ReportHeader = reader.read()?;
            let mut sub = reader.sub(header.size as usize)?;

            match header.kind {
                k if k == REPORT_STYLUS_V1 => {
                    self.parse_stylus(&mut sub, StylusVariant::V1, sink)?
                }
                k if k == REPORT_STYLUS_V2 => {
                    self.parse_stylus(&mut sub, StylusVariant::V2, sink)?
                }
                k if k == self.mpp_1_0_report => {
                    self.parse_stylus(&mut sub, StylusVariant::Mpp1_0, sink)?
                }
                k if k == self.mpp_1_51_report => {
                    self.parse_stylus(&mut sub, StylusVariant::Mpp1_51, sink)?
                }
                REPORT_HEATMAP_DIM => {
                    let mut dim: HeatmapDim = sub.read()?;
                    // Devices that leave the intensity range unset get a
                    // sane default.
                    if dim.z_max == 0 {
                        dim.z_max = 255;
                    }
                    self.dim = Some(CachedDim {
                        dim,
                        pass: self.pass,
                    });
                }
                REPORT_HEATMAP_DATA => self.emit_heatmap(&mut sub, sink)?,
                REPORT_TIMESTAMP => {
                    let time: TimestampReport = sub.read()?;
                    self.timestamp = Some(time.timestamp);
                }
                REPORT_PEN_METADATA => self.pen_meta = Some(sub.read()?),
                REPORT_PEN_DFT_WINDOW => self.parse_dft_window(&mut sub, sink)?,
                _ => {}
            }
        }

        Ok(())
    }

    /// The controller sends a burst of samples per report; only the last
    /// (freshest) one is emitted. Forwarding all of them would multiply the
    /// event rate and add visible jitter downstream.
    fn parse_stylus<S: EventSink>(
        &mut self,
        reader: &mut Reader<'_>,
        variant: StylusVariant,
        sink: &mut S,
    ) -> Result<(), ParseError> {
        let group: StylusGroup = reader.read()?;
        if group.elements == 0 {
            return Ok(());
        }

        reader.skip((usize::from(group.elements) - 1) * variant.sample_size())?;

        let mut sample = if variant.has_tilt() {
            let raw: StylusSampleV2 = reader.read()?;
            StylusSample {
                serial: group.serial,
                proximity: raw.mode & STYLUS_MODE_PROXIMITY != 0,
                contact: raw.mode & STYLUS_MODE_CONTACT != 0,
                button: raw.mode & STYLUS_MODE_BUTTON != 0,
                rubber: raw.mode & STYLUS_MODE_RUBBER != 0,
                x: f64::from(raw.x) / f64::from(MAX_X),
                y: f64::from(raw.y) / f64::from(MAX_Y),
                pressure: f64::from(raw.pressure) / f64::from(MAX_PRESSURE),
                altitude: f64::from(raw.altitude) / ANGLE_DIVISOR,
                azimuth: f64::from(raw.azimuth) / ANGLE_DIVISOR,
                timestamp: raw.timestamp,
            }
        } else {
            let raw: StylusSampleV1 = reader.read()?;
            let mode = u16::from(raw.mode);
            StylusSample {
                serial: group.serial,
                proximity: mode & STYLUS_MODE_PROXIMITY != 0,
                contact: mode & STYLUS_MODE_CONTACT != 0,
                button: mode & STYLUS_MODE_BUTTON != 0,
                rubber: mode & STYLUS_MODE_RUBBER != 0,
                x: f64::from(raw.x) / f64::from(MAX_X),
                y: f64::from(raw.y) / f64::from(MAX_Y),
                pressure: f64::from(raw.pressure) / f64::from(MAX_PRESSURE_V1),
                altitude: 0.0,
                azimuth: 0.0,
                timestamp: 0,
            }
        };

        if variant.contact_from_pressure() {
            sample.contact = sample.pressure > 0.0;
        }

        sample.x = sample.x.clamp(0.0, 1.0);
        sample.y = sample.y.clamp(0.0, 1.0);
        sample.pressure = sample.pressure.clamp(0.0, 1.0);
        sample.proximity |= sample.contact;

        sink.on_stylus(&sample);
        Ok(())
    }

    /// Dimensions cached in one pass apply to heatmap data in the same or
    /// the immediately following pass; anything older is stale.
    fn current_dim(&self) -> Option<HeatmapDim> {
        self.dim
            .filter(|cached| self.pass - cached.pass <= 1)
            .map(|cached| cached.dim)
    }

    fn emit_heatmap<S: EventSink>(
        &mut self,
        reader: &mut Reader<'_>,
        sink: &mut S,
    ) -> Result<(), ParseError> {
        let Some(dim) = self.current_dim() else {
            return Ok(());
        };

        let len = usize::from(dim.width) * usize::from(dim.height);
        let data = reader.subspan(len)?;

        let heatmap = Heatmap {
            width: dim.width,
            height: dim.height,
            y_min: dim.y_min,
            y_max: dim.y_max,
            x_min: dim.x_min,
            x_max: dim.x_max,
            z_min: dim.z_min,
            z_max: dim.z_max,
            timestamp: self.timestamp.take(),
            data,
        };
        sink.on_heatmap(&heatmap);
        Ok(())
    }

    fn parse_dft_window<S: EventSink>(
        &mut self,
        reader: &mut Reader<'_>,
        sink: &mut S,
    ) -> Result<(), ParseError> {
        let header: DftWindowHeader = reader.read()?;

        // Seen on some firmware revisions; tolerate instead of failing the pass.
        if usize::from(header.num_rows) > DFT_MAX_ROWS {
            return Ok(());
        }

        let mut window = DftWindow {
            timestamp: header.timestamp,
            num_rows: header.num_rows,
            seq_num: header.seq_num,
            data_type: header.data_type,
            group: None,
            x: [DftRow::default(); DFT_MAX_ROWS],
            y: [DftRow::default(); DFT_MAX_ROWS],
        };

        for i in 0..window.rows() {
            window.x[i] = reader.read()?;
        }
        for i in 0..window.rows() {
            window.y[i] = reader.read()?;
        }

        // The group counter only attaches when the preceding pen metadata
        // matches both the sequence number and the data type.
        window.group = self
            .pen_meta
            .filter(|meta| meta.seq_num == header.seq_num && meta.data_type == header.data_type)
            .map(|meta| meta.group);

        sink.on_dft(&window);
        Ok(())
    }
}
