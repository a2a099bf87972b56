//! Decode the Intel Precise Touch & Stylus (IPTS) data stream and forward
//! the resulting input events to uinput.
//!
//! The `ipts` module is the decoder core and has no I/O of its own; the
//! remaining modules form the daemon shell around it (character-device
//! transport, uinput forwarding, configuration, debugging dump).

pub mod config;
pub mod daemon;
pub mod device;
pub mod dump;
pub mod ipts;
pub mod uinput;
