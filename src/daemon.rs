//! Wire the decoder core to the device transport and uinput.

use crate::config::Config;
use crate::device::Transport;
use crate::ipts::{DftProcessor, DftWindow, EventSink, FrameParser, Heatmap, Metadata, StylusSample};
use crate::uinput::StylusDevice;

/// Decoded-event consumer of the running daemon: stylus samples go straight
/// to uinput, DFT windows through the pen pipeline first. Heatmaps and
/// metadata only feed the pipeline's sensor dimensions; contact finding is
/// a separate concern and not handled here.
struct ForwardSink {
    stylus: StylusDevice,
    dft: DftProcessor,
}

impl EventSink for ForwardSink {
    fn on_stylus(&mut self, sample: &StylusSample) {
        if let Err(e) = self.stylus.emit(sample) {
            log::error!("Failed to emit stylus sample: {}", e);
        }
    }

    fn on_dft(&mut self, window: &DftWindow) {
        let Self { stylus, dft } = self;
        dft.process(window, |sample| {
            if let Err(e) = stylus.emit(sample) {
                log::error!("Failed to emit stylus sample: {}", e);
            }
        });
    }

    fn on_heatmap(&mut self, heatmap: &Heatmap<'_>) {
        self.dft
            .set_dimensions(u32::from(heatmap.width), u32::from(heatmap.height));
    }

    fn on_metadata(&mut self, metadata: &Metadata) {
        log::info!(
            "Sensor grid: {}x{} over {}x{} units",
            metadata.dimensions.columns,
            metadata.dimensions.rows,
            metadata.dimensions.width,
            metadata.dimensions.height,
        );
        self.dft
            .set_dimensions(metadata.dimensions.columns, metadata.dimensions.rows);
    }
}

pub fn run(config: &Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut transport = Transport::open(&config.device)?;
    log::info!("Reading from {}", config.device);

    let stylus = StylusDevice::create(config)?;
    let dft = DftProcessor::new(config.invert_x, config.invert_y)
        .with_position_exp(config.position_exp);

    let mut sink = ForwardSink { stylus, dft };
    let mut parser = FrameParser::with_mpp_reports(config.mpp_1_0_report, config.mpp_1_51_report);

    let mut passes: u64 = 0;
    loop {
        let data = transport.read_pass()?;
        if data.is_empty() {
            return Err("device closed".into());
        }

        // A bad buffer only costs this pass; frame boundaries line up with
        // buffer boundaries again on the next read.
        if let Err(e) = parser.parse(data, config.header_size, &mut sink) {
            log::warn!("Dropped buffer: {}", e);
        }

        if passes == 0 {
            log::info!("First buffer decoded (data is flowing)");
        }
        passes += 1;
        if passes % 5000 == 0 {
            log::debug!("Buffers decoded: {}", passes);
        }
    }
}
