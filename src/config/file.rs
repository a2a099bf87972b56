use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub device: Option<String>,
    #[serde(default)]
    pub invert_x: bool,
    #[serde(default)]
    pub invert_y: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub header_size: Option<usize>,
    /// Exponent of the DFT position fit; only touch if diagonal lines jitter.
    pub position_exp: Option<f64>,
    /// Report numbers of the MPP stylus reports, for devices on the older
    /// numbering scheme.
    pub mpp_1_0_report: Option<u8>,
    pub mpp_1_51_report: Option<u8>,
}

/// Read the first usable config file: the explicitly given path if any,
/// otherwise the usual locations. Missing files are skipped, unparsable
/// ones are skipped with a warning, and defaults apply when nothing is left.
pub fn load(explicit: Option<&Path>) -> FileConfig {
    let candidates = match explicit {
        Some(path) => vec![path.to_path_buf()],
        None => search_paths(),
    };

    for path in candidates {
        match read(&path) {
            Ok(Some(config)) => {
                log::debug!("Using config file {}", path.display());
                return config;
            }
            Ok(None) => {}
            Err(e) => log::warn!("Ignoring config file {}: {}", path.display(), e),
        }
    }

    FileConfig::default()
}

fn read(path: &Path) -> Result<Option<FileConfig>, toml::de::Error> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Ok(None);
    };
    toml::from_str(&content).map(Some)
}

fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("ipts-pad.toml")];

    if let Ok(home) = std::env::var("HOME") {
        paths.push(
            [home.as_str(), ".config", "ipts-pad", "config.toml"]
                .iter()
                .collect(),
        );
    }

    paths.push(PathBuf::from("/etc/ipts-pad/config.toml"));
    paths
}
