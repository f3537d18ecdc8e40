//! Layered configuration
//!
//! A view reads its settings from a module layer first, then the global
//! settings layer, then the built-in default. Both layers are JSON objects of
//! sections mapping keys to values:
//!
//! ```json
//! { "MAP": { "REFRESH": 5, "SAT_COLOUR": "0xF0F000FF", "SHOWTRACKS": [25544] } }
//! ```

pub mod defaults;
pub mod keys;

use anyhow::Context;
use directories::ProjectDirs;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Colour packed as `0xRRGGBBAA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba(pub u32);

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba(0);

    pub fn with_alpha(self, alpha: u8) -> Self {
        Rgba((self.0 & 0xFFFF_FF00) | alpha as u32)
    }

    fn parse(s: &str) -> Option<Self> {
        let hex = s
            .trim()
            .trim_start_matches('#')
            .trim_start_matches("0x")
            .trim_start_matches("0X");
        u32::from_str_radix(hex, 16).ok().map(Rgba)
    }
}

impl From<u32> for Rgba {
    fn from(v: u32) -> Self {
        Rgba(v)
    }
}

/// Read access to configuration values with caller-supplied defaults.
pub trait ConfigAccessor {
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
    fn get_color(&self, section: &str, key: &str, default: u32) -> Rgba;
    fn get_str(&self, section: &str, key: &str, default: &str) -> String;
    /// Integer set such as a list of catalogue numbers; empty when unset.
    fn get_int_list(&self, section: &str, key: &str) -> Vec<i64>;
}

/// One configuration layer with an optional fallback layer.
#[derive(Debug, Clone, Default)]
pub struct ModuleConfig {
    sections: Map<String, Value>,
    fallback: Option<Arc<ModuleConfig>>,
}

impl ModuleConfig {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        match serde_json::from_str::<Value>(text).context("invalid json")? {
            Value::Object(sections) => Ok(Self {
                sections,
                fallback: None,
            }),
            other => anyhow::bail!("configuration must be a JSON object, got {}", other),
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn with_fallback(mut self, fallback: Arc<ModuleConfig>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Set a value in this layer, creating the section if needed.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<Value>) {
        let entry = self
            .sections
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(map) = entry {
            map.insert(key.to_string(), value.into());
        }
    }

    fn own_value(&self, section: &str, key: &str) -> Option<&Value> {
        self.sections.get(section)?.get(key)
    }

    /// First value along the layer chain that `convert` accepts.
    fn lookup<T>(&self, section: &str, key: &str, convert: impl Fn(&Value) -> Option<T>) -> Option<T> {
        let mut layer = Some(self);
        while let Some(cfg) = layer {
            if let Some(value) = cfg.own_value(section, key) {
                match convert(value) {
                    Some(v) => return Some(v),
                    None => warn!("{}/{} has unexpected value {}, ignoring", section, key, value),
                }
            }
            layer = cfg.fallback.as_deref();
        }
        None
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        _ => None,
    }
}

fn as_color(value: &Value) -> Option<Rgba> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()).map(Rgba),
        Value::String(s) => Rgba::parse(s),
        _ => None,
    }
}

fn as_int_list(value: &Value) -> Option<Vec<i64>> {
    match value {
        Value::Array(items) => items.iter().map(as_int).collect(),
        // semicolon separated, e.g. "25544;28654"
        Value::String(s) => s
            .split(';')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.parse().ok())
            .collect(),
        _ => None,
    }
}

impl ConfigAccessor for ModuleConfig {
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.lookup(section, key, as_int).unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.lookup(section, key, as_bool).unwrap_or(default)
    }

    fn get_color(&self, section: &str, key: &str, default: u32) -> Rgba {
        self.lookup(section, key, as_color).unwrap_or(Rgba(default))
    }

    fn get_str(&self, section: &str, key: &str, default: &str) -> String {
        self.lookup(section, key, |v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| default.to_string())
    }

    fn get_int_list(&self, section: &str, key: &str) -> Vec<i64> {
        self.lookup(section, key, as_int_list).unwrap_or_default()
    }
}

/// Global settings file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub path: Option<PathBuf>,
    pub global: Arc<ModuleConfig>,
}

impl Settings {
    /// Load `settings.json` from the platform config directory, e.g.
    /// `~/.config/orbitview/` on Linux. A missing file gives an empty layer.
    pub fn load() -> anyhow::Result<Self> {
        let proj_dirs = ProjectDirs::from("", "", "orbitview")
            .ok_or_else(|| anyhow::anyhow!("Failed to resolve config directory"))?;
        Self::load_from(&proj_dirs.config_dir().join("settings.json"))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let global = if path.exists() {
            ModuleConfig::load(path)?
        } else {
            debug!("no settings at {}, using defaults", path.display());
            ModuleConfig::empty()
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            global: Arc::new(global),
        })
    }

    /// Module layer backed by these settings.
    pub fn module(&self, module: ModuleConfig) -> ModuleConfig {
        module.with_fallback(self.global.clone())
    }
}
