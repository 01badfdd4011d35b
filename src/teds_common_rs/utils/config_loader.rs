use log::warn;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::teds_common_rs::record::core::bit_utils::ReservedBytes;
use crate::teds_common_rs::record::core::exceptions::{TedsError, TedsResult};
use crate::teds_common_rs::record::encoder::{EncoderConfig, FillPattern};
use super::log_config::parse_level;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    pub buffer_size: usize,
    pub reserved: ReservedBytes,
    pub fill: FillPattern,
}
impl Default for EncoderSettings {
    fn default() -> Self {
        let c = EncoderConfig::default();
        Self { buffer_size: c.buffer_size, reserved: c.reserved, fill: c.fill }
    }
}
impl EncoderSettings {
    pub fn to_encoder_config(&self) -> EncoderConfig {
        EncoderConfig::new(self.buffer_size).with_reserved(self.reserved).with_fill(self.fill)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings { pub fields_path: PathBuf, pub strict_ranges: bool }
impl Default for SourceSettings { fn default() -> Self { Self { fields_path: PathBuf::from("teds_fields.toml"), strict_ranges: false } } }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings { pub image_path: Option<PathBuf>, pub verify: bool }
impl Default for DeviceSettings { fn default() -> Self { Self { image_path: None, verify: true } } }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings { pub level: String, pub timestamps: bool }
impl Default for LogSettings { fn default() -> Self { Self { level: "info".into(), timestamps: true } } }

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TedsConfig {
    pub encoder: EncoderSettings,
    pub source: SourceSettings,
    pub device: DeviceSettings,
    pub logging: LogSettings,
}

pub struct ConfigLoader { config_paths: Vec<PathBuf>, env_prefix: String }
impl ConfigLoader {
    pub fn new() -> Self { Self { config_paths: vec![PathBuf::from("teds.toml"), PathBuf::from("teds.json"), PathBuf::from("config.toml"), PathBuf::from("config.json")], env_prefix: "TEDS_".into() } }
    pub fn with_paths(paths: Vec<PathBuf>) -> Self { Self { config_paths: paths, env_prefix: "TEDS_".into() } }
    pub fn with_env_prefix(mut self, prefix: &str) -> Self { self.env_prefix = prefix.into(); self }
    pub fn load(&self) -> TedsResult<TedsConfig> {
        let mut config = TedsConfig::default();
        for path in &self.config_paths {
            if path.exists() { match self.load_from_file(path) { Ok(fc) => { config = fc; break; }, Err(e) => { warn!("Failed to load config from {:?}: {}", path, e); } } }
        }
        config = self.apply_env_overrides(config)?;
        self.validate_config(&config)?;
        Ok(config)
    }
    fn load_from_file(&self, path: &Path) -> TedsResult<TedsConfig> {
        let content = fs::read_to_string(path).map_err(|e| TedsError::Config(format!("Failed to read config file: {}", e)))?;
        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| TedsError::Config(format!("Failed to parse JSON config: {}", e))),
            Some("toml") => toml::from_str(&content).map_err(|e| TedsError::Config(format!("Failed to parse TOML config: {}", e))),
            _ => Err(TedsError::Config("Unsupported config file format".into())),
        }
    }
    fn env(&self, key: &str) -> Option<String> { env::var(format!("{}{}", self.env_prefix, key)).ok() }
    fn apply_env_overrides(&self, mut config: TedsConfig) -> TedsResult<TedsConfig> {
        if let Some(size) = self.env("BUFFER_SIZE") { config.encoder.buffer_size = size.parse().map_err(|_| TedsError::Config("Invalid buffer size in environment variable".into()))?; }
        if let Some(reserved) = self.env("RESERVED") {
            config.encoder.reserved = match reserved.to_lowercase().as_str() {
                "leading" | "leading_byte" => ReservedBytes::LeadingByte,
                "block" | "every_block" => ReservedBytes::EveryBlock { block_size: block_size_of(config.encoder.reserved) },
                _ => return Err(TedsError::Config(format!("Invalid reserved byte policy '{}' (leading or block)", reserved))),
            };
        }
        if let Some(size) = self.env("BLOCK_SIZE") {
            let block_size = size.parse().map_err(|_| TedsError::Config("Invalid block size in environment variable".into()))?;
            config.encoder.reserved = ReservedBytes::EveryBlock { block_size };
        }
        if let Some(fill) = self.env("FILL") { config.encoder.fill = parse_fill(&fill)?; }
        if let Some(path) = self.env("FIELDS_PATH") { config.source.fields_path = PathBuf::from(path); }
        if let Some(path) = self.env("IMAGE_PATH") { config.device.image_path = Some(PathBuf::from(path)); }
        if let Some(level) = self.env("LOG_LEVEL") { config.logging.level = level; }
        Ok(config)
    }
    fn validate_config(&self, config: &TedsConfig) -> TedsResult<()> {
        if config.encoder.buffer_size < 2 { return Err(TedsError::Config("Buffer size must be at least 2 bytes".into())); }
        config.encoder.reserved.validate().map_err(|e| TedsError::Config(e.to_string()))?;
        if let FillPattern::PageMarker { offset, .. } = config.encoder.fill { if offset >= config.encoder.reserved.block_len(config.encoder.buffer_size) { return Err(TedsError::Config("Page marker offset must lie inside a block".into())); } }
        parse_level(&config.logging.level).map_err(TedsError::Config)?;
        Ok(())
    }
    pub fn save_config(&self, config: &TedsConfig, path: &Path) -> TedsResult<()> {
        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(config).map_err(|e| TedsError::Config(format!("Failed to serialize config to JSON: {}", e)))?,
            Some("toml") => toml::to_string_pretty(config).map_err(|e| TedsError::Config(format!("Failed to serialize config to TOML: {}", e)))?,
            _ => return Err(TedsError::Config("Unsupported config file format for saving".into())),
        };
        fs::write(path, content).map_err(|e| TedsError::Config(format!("Failed to write config file: {}", e)))?;
        Ok(())
    }
}
impl Default for ConfigLoader { fn default() -> Self { Self::new() } }

fn block_size_of(reserved: ReservedBytes) -> usize {
    match reserved { ReservedBytes::EveryBlock { block_size } => block_size, ReservedBytes::LeadingByte => ReservedBytes::DEFAULT_BLOCK_SIZE }
}

/// `zero`, `uniform:<byte>` or `marker:<offset>:<byte>` (bytes in hex or decimal)
pub fn parse_fill(s: &str) -> TedsResult<FillPattern> {
    let invalid = || TedsError::Config(format!("Invalid fill pattern '{}' (zero, uniform:<byte> or marker:<offset>:<byte>)", s));
    let parts: Vec<&str> = s.trim().split(':').collect();
    match parts.as_slice() {
        ["zero"] | ["zeroed"] => Ok(FillPattern::Zeroed),
        ["uniform", value] => Ok(FillPattern::Uniform { value: parse_byte(value).ok_or_else(invalid)? }),
        ["marker", offset, marker] => Ok(FillPattern::PageMarker { offset: offset.parse().map_err(|_| invalid())?, marker: parse_byte(marker).ok_or_else(invalid)? }),
        _ => Err(invalid()),
    }
}

fn parse_byte(s: &str) -> Option<u8> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) { Some(h) => u8::from_str_radix(h, 16).ok(), None => s.parse().ok() }
}
