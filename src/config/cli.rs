use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ipts-pad")]
#[command(about = "Userspace touch/stylus daemon for Intel Precise Touch & Stylus devices")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// IPTS character device to read from
    #[arg(long, env = "IPTS_PAD_DEVICE")]
    pub device: Option<String>,

    /// Mirror stylus coordinates along the X axis
    #[arg(long)]
    pub invert_x: bool,

    /// Mirror stylus coordinates along the Y axis
    #[arg(long)]
    pub invert_y: bool,

    /// Physical display width in millimeters (for axis resolution)
    #[arg(long)]
    pub width: Option<u32>,

    /// Physical display height in millimeters (for axis resolution)
    #[arg(long)]
    pub height: Option<u32>,

    /// Transport header bytes to skip at the start of each buffer
    #[arg(long)]
    pub header_size: Option<usize>,

    /// Path to config file
    #[arg(long, env = "IPTS_PAD_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Decode the data stream and print every record for debugging
    Dump,
}
