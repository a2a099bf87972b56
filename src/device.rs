//! Character-device transport for IPTS data buffers.
//!
//! The kernel driver hands out one framed buffer per read(); each buffer is
//! one decode pass. Frame boundaries are only recoverable at buffer
//! boundaries, so a short or corrupt buffer is dropped whole.

use std::fs::File;
use std::io::{self, Read};

/// Largest buffer the driver hands out.
const BUFFER_SIZE: usize = 0x10000;

pub struct Transport {
    file: File,
    buffer: Vec<u8>,
}

impl Transport {
    pub fn open(path: &str) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            file,
            buffer: vec![0u8; BUFFER_SIZE],
        })
    }

    /// Block until the device produces the next buffer. An empty slice
    /// means the device is gone.
    pub fn read_pass(&mut self) -> io::Result<&[u8]> {
        let n = self.file.read(&mut self.buffer)?;
        Ok(&self.buffer[..n])
    }
}
