//! Dump decoded IPTS records for debugging.
//! Run: ipts-pad dump to stream and print everything the decoder emits.

use crate::config::Config;
use crate::device::Transport;
use crate::ipts::{DftWindow, EventSink, FrameParser, Heatmap, Metadata, StylusSample};

fn dft_type_name(data_type: u8) -> &'static str {
    match data_type {
        crate::ipts::wire::DFT_POSITION => "position",
        crate::ipts::wire::DFT_BUTTON => "button",
        crate::ipts::wire::DFT_PRESSURE => "pressure",
        _ => "?",
    }
}

#[derive(Default)]
struct DumpSink {
    n: u64,
}

impl DumpSink {
    fn next(&mut self) -> u64 {
        self.n += 1;
        self.n
    }
}

impl EventSink for DumpSink {
    fn on_stylus(&mut self, s: &StylusSample) {
        println!(
            "{:6}  stylus serial={:08x} prox={} contact={} button={} rubber={} x={:.4} y={:.4} pressure={:.4}",
            self.next(),
            s.serial,
            s.proximity as u8,
            s.contact as u8,
            s.button as u8,
            s.rubber as u8,
            s.x,
            s.y,
            s.pressure,
        );
    }

    fn on_heatmap(&mut self, h: &Heatmap<'_>) {
        println!(
            "{:6}  heatmap {}x{} z=[{}..{}] timestamp={:?}",
            self.next(),
            h.width,
            h.height,
            h.z_min,
            h.z_max,
            h.timestamp,
        );
    }

    fn on_dft(&mut self, w: &DftWindow) {
        println!(
            "{:6}  dft {} rows={} seq={} group={:?}",
            self.next(),
            dft_type_name(w.data_type),
            w.num_rows,
            w.seq_num,
            w.group,
        );
    }

    fn on_metadata(&mut self, m: &Metadata) {
        println!(
            "{:6}  metadata grid={}x{} size={}x{}",
            self.next(),
            m.dimensions.columns,
            m.dimensions.rows,
            m.dimensions.width,
            m.dimensions.height,
        );
    }
}

pub fn run(config: &Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut transport = Transport::open(&config.device)?;
    eprintln!("Dumping records from {} (Ctrl+C to stop):\n", config.device);

    let mut parser = FrameParser::with_mpp_reports(config.mpp_1_0_report, config.mpp_1_51_report);
    let mut sink = DumpSink::default();

    loop {
        let data = transport.read_pass()?;
        if data.is_empty() {
            return Err("device closed".into());
        }
        if let Err(e) = parser.parse(data, config.header_size, &mut sink) {
            eprintln!("dropped buffer: {}", e);
        }
    }
}
