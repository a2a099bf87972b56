use std::thread;
use std::time::Duration;

use clap::Parser;

use ipts_pad::config::{Cli, Command, Config};
use ipts_pad::{daemon, dump};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    if let Some(Command::Dump) = cli.command {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
        let config = Config::load(&cli);
        return dump::run(&config);
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Config::load(&cli);

    log::info!(
        "ipts-pad starting (device={}, invert_x={}, invert_y={})",
        config.device,
        config.invert_x,
        config.invert_y
    );

    loop {
        if let Err(e) = daemon::run(&config) {
            log::error!("{}", e);
        }
        log::warn!("Device lost, reopening in 2s…");
        thread::sleep(Duration::from_secs(2));
    }
}
