//! Decoder core for the IPTS data stream.
//!
//! Raw buffers read from the kernel device go through [`parser::FrameParser`],
//! which walks the nested container hierarchy and hands decoded records to an
//! [`sink::EventSink`]. DFT windows from pen-capable devices are turned into
//! stylus samples by [`dft::DftProcessor`]. Nothing in here performs I/O,
//! logs, or allocates during steady-state decoding.

pub mod dft;
pub mod model;
pub mod parser;
pub mod reader;
pub mod sink;
pub mod stylus;
pub mod wire;

pub use dft::DftProcessor;
pub use model::{DftWindow, Heatmap, Metadata, StylusSample};
pub use parser::FrameParser;
pub use reader::{ParseError, Reader};
pub use sink::EventSink;
pub use stylus::StylusTracker;
