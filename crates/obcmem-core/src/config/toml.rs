//! TOML board configuration parsing
//!
//! Parses board files in TOML format:
//!
//! ```toml
//! [board]
//! name = "obc-rev-b"
//!
//! [transfer]
//! queue_depth = 4
//! bounce_size = "2 KiB"
//! max_transfer = "1 MiB"
//!
//! [[region]]
//! id = "external-nor"
//! base = 0x6400_0000
//! size = "4 MiB"
//! sector_size = "64 KiB"
//! paired_sectors = true
//! ```

use std::fs;
use std::path::Path;

use super::{BoardConfig, RegionConfig, TransferConfig};
use crate::error::ConfigError;
use crate::region::RegionId;

/// TOML board file structure
#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlBoardFile {
    board: Option<TomlBoardMeta>,
    transfer: Option<TomlTransfer>,
    #[serde(default)]
    region: Vec<TomlRegion>,
}

/// Board metadata
#[derive(Debug, serde::Deserialize)]
struct TomlBoardMeta {
    name: Option<String>,
}

/// Transfer settings in TOML
#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlTransfer {
    queue_depth: Option<usize>,
    #[serde(default, deserialize_with = "deserialize_opt_size")]
    bounce_size: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_opt_size")]
    max_transfer: Option<u32>,
}

/// Region definition in TOML
#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlRegion {
    id: RegionId,
    #[serde(deserialize_with = "deserialize_size")]
    base: u32,
    #[serde(deserialize_with = "deserialize_size")]
    size: u32,
    #[serde(default, deserialize_with = "deserialize_opt_size")]
    sector_size: Option<u32>,
    #[serde(default)]
    paired_sectors: bool,
    #[serde(default, deserialize_with = "deserialize_opt_size")]
    page_size: Option<u32>,
}

/// A number that may be written as an integer or as a string
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum SizeOrInt {
    Int(u32),
    Str(String),
}

impl SizeOrInt {
    fn resolve(self) -> Result<u32, String> {
        match self {
            SizeOrInt::Int(n) => Ok(n),
            SizeOrInt::Str(s) => parse_size(&s),
        }
    }
}

/// Deserialize a u32 that can be hex (0x...), decimal or a size ("4 KiB")
fn deserialize_size<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    SizeOrInt::deserialize(deserializer)?
        .resolve()
        .map_err(serde::de::Error::custom)
}

fn deserialize_opt_size<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    match Option::<SizeOrInt>::deserialize(deserializer)? {
        Some(value) => value.resolve().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

/// Parse a size string like "16 MiB", "0x1000" or "4096"
pub fn parse_size(s: &str) -> Result<u32, String> {
    let s = s.trim().replace('_', "");

    // Try plain number first
    if let Ok(n) = s.parse::<u32>() {
        return Ok(n);
    }

    // Try hex
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u32::from_str_radix(hex.trim(), 16).map_err(|e| format!("invalid hex: {}", e));
    }

    // Try with suffix
    let s_lower = s.to_lowercase();
    let (num_str, multiplier) = if let Some(n) = s_lower.strip_suffix("mib") {
        (n.trim(), 1024 * 1024)
    } else if let Some(n) = s_lower.strip_suffix("mb") {
        (n.trim(), 1024 * 1024)
    } else if let Some(n) = s_lower.strip_suffix("kib") {
        (n.trim(), 1024)
    } else if let Some(n) = s_lower.strip_suffix("kb") {
        (n.trim(), 1024)
    } else if let Some(n) = s_lower.strip_suffix('b') {
        (n.trim(), 1)
    } else {
        return Err(format!("invalid size: {}", s));
    };

    let num: u32 = num_str.parse().map_err(|_| format!("invalid size: {}", s))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size too large: {}", s))
}

impl BoardConfig {
    /// Load a board configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a board configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: TomlBoardFile =
            ::toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let mut config = BoardConfig::new();

        if let Some(meta) = file.board {
            config.name = meta.name;
        }

        if let Some(transfer) = file.transfer {
            let defaults = TransferConfig::default();
            config.transfer = TransferConfig {
                queue_depth: transfer.queue_depth.unwrap_or(defaults.queue_depth),
                bounce_size: transfer.bounce_size.unwrap_or(defaults.bounce_size),
                max_transfer: transfer.max_transfer.unwrap_or(defaults.max_transfer),
            };
        }

        for region in file.region {
            config.add_region(RegionConfig {
                id: region.id,
                base: region.base,
                size: region.size,
                sector_size: region.sector_size,
                paired_sectors: region.paired_sectors,
                page_size: region.page_size,
            });
        }

        config.sort_by_address();
        config.validate()?;
        Ok(config)
    }

    /// Convert the configuration to a TOML string
    pub fn to_toml_string(&self) -> String {
        let mut output = String::new();

        output.push_str("[board]\n");
        if let Some(name) = &self.name {
            output.push_str(&format!("name = \"{}\"\n", name));
        }
        output.push('\n');

        output.push_str("[transfer]\n");
        output.push_str(&format!("queue_depth = {}\n", self.transfer.queue_depth));
        output.push_str(&format!(
            "bounce_size = \"{}\"\n",
            format_size(self.transfer.bounce_size)
        ));
        output.push_str(&format!(
            "max_transfer = \"{}\"\n",
            format_size(self.transfer.max_transfer)
        ));
        output.push('\n');

        for region in &self.regions {
            output.push_str("[[region]]\n");
            output.push_str(&format!("id = \"{}\"\n", region.id));
            output.push_str(&format!("base = 0x{:08X}\n", region.base));
            output.push_str(&format!("size = \"{}\"\n", format_size(region.size)));
            if let Some(sector_size) = region.sector_size {
                output.push_str(&format!("sector_size = \"{}\"\n", format_size(sector_size)));
            }
            if region.paired_sectors {
                output.push_str("paired_sectors = true\n");
            }
            if let Some(page_size) = region.page_size {
                output.push_str(&format!("page_size = {}\n", page_size));
            }
            output.push('\n');
        }

        output
    }
}

/// Format a size as human-readable string
pub fn format_size(size: u32) -> String {
    if size >= 1024 * 1024 && size % (1024 * 1024) == 0 {
        format!("{} MiB", size / (1024 * 1024))
    } else if size >= 1024 && size % 1024 == 0 {
        format!("{} KiB", size / 1024)
    } else {
        format!("{}", size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert_eq!(parse_size("0x1000").unwrap(), 4096);
        assert_eq!(parse_size("0x2000_0000").unwrap(), 0x2000_0000);
        assert_eq!(parse_size("4 KiB").unwrap(), 4096);
        assert_eq!(parse_size("4KiB").unwrap(), 4096);
        assert_eq!(parse_size("16 MiB").unwrap(), 16 * 1024 * 1024);
        assert!(parse_size("8192 MiB").is_err());
        assert!(parse_size("lots").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[board]
name = "Test Board"

[transfer]
queue_depth = 2
bounce_size = "2 KiB"

[[region]]
id = "qspi"
base = 0x90000000
size = "1 MiB"
sector_size = "4 KiB"
page_size = 256

[[region]]
id = "internal-ram"
base = "0x20000000"
size = "64 KiB"

[[region]]
id = "external-nor"
base = 0x64000000
size = "1 MiB"
sector_size = "64 KiB"
paired_sectors = true
"#;
        let config = BoardConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.name.as_deref(), Some("Test Board"));
        assert_eq!(config.transfer.queue_depth, 2);
        assert_eq!(config.transfer.bounce_size, 2048);
        assert_eq!(config.transfer.max_transfer, 1024 * 1024);
        assert_eq!(config.regions.len(), 3);

        // Sorted by base address
        assert_eq!(config.regions[0].id, RegionId::InternalRam);
        assert_eq!(config.regions[1].id, RegionId::ExternalNor);
        assert!(config.regions[1].paired_sectors);
        assert_eq!(config.regions[2].page_size, Some(256));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let unknown = r#"
[[region]]
id = "scratchpad"
base = 0
size = 16
"#;
        assert!(matches!(
            BoardConfig::from_toml_str(unknown),
            Err(ConfigError::Parse(_))
        ));

        let overlapping = r#"
[[region]]
id = "internal-ram"
base = 0x1000
size = 0x1000

[[region]]
id = "external-ram"
base = 0x1800
size = 0x1000
"#;
        assert!(matches!(
            BoardConfig::from_toml_str(overlapping),
            Err(ConfigError::OverlappingRegions(..))
        ));
    }

    #[test]
    fn test_toml_string_reparses() {
        let config = BoardConfig::default();
        let reparsed = BoardConfig::from_toml_str(&config.to_toml_string()).unwrap();
        assert_eq!(reparsed.regions, {
            let mut sorted = config.regions.clone();
            sorted.sort_by_key(|r| r.base);
            sorted
        });
        assert_eq!(reparsed.transfer, config.transfer);
    }
}
