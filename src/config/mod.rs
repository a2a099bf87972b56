mod cli;
mod file;

pub use cli::{Cli, Command};

use crate::ipts::dft::DEFAULT_POSITION_EXP;
use crate::ipts::wire::{REPORT_STYLUS_MPP_1_0, REPORT_STYLUS_MPP_1_51};

pub const DEFAULT_DEVICE: &str = "/dev/ithc";

/// Merged configuration from CLI args and TOML file.
#[derive(Debug, Clone)]
pub struct Config {
    pub device: String,
    pub invert_x: bool,
    pub invert_y: bool,
    /// Physical display size in millimeters; 0 disables axis resolution.
    pub width: u32,
    pub height: u32,
    /// Transport header bytes skipped at the start of each buffer.
    pub header_size: usize,
    pub position_exp: f64,
    pub mpp_1_0_report: u8,
    pub mpp_1_51_report: u8,
}

impl Config {
    /// Load configuration by merging the TOML file with CLI overrides.
    pub fn load(cli: &Cli) -> Self {
        let file_config = file::load(cli.config.as_deref());

        Self {
            device: cli
                .device
                .clone()
                .or(file_config.device)
                .unwrap_or_else(|| DEFAULT_DEVICE.into()),
            invert_x: cli.invert_x || file_config.invert_x,
            invert_y: cli.invert_y || file_config.invert_y,
            width: cli.width.or(file_config.width).unwrap_or(0),
            height: cli.height.or(file_config.height).unwrap_or(0),
            header_size: cli.header_size.or(file_config.header_size).unwrap_or(0),
            position_exp: file_config.position_exp.unwrap_or(DEFAULT_POSITION_EXP),
            mpp_1_0_report: file_config.mpp_1_0_report.unwrap_or(REPORT_STYLUS_MPP_1_0),
            mpp_1_51_report: file_config
                .mpp_1_51_report
                .unwrap_or(REPORT_STYLUS_MPP_1_51),
        }
    }
}
