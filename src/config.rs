//! Batch configuration.
//!
//! Handles loading, merging and validating `mailbatch.toml`. Values are
//! layered: stock defaults, then the config file, then command-line
//! overrides. Each layer is a sparse TOML table merged over the one below.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [grouping]
//! max_size = "45MiB"        # bytes, or a size string (B, KB, KiB, MB, MiB, GB, GiB)
//! # order_by = "image.date" # dotted key path; omit to keep input order
//! reverse = false
//!
//! [thumbnails]
//! max_dimension = 80        # longer edge in pixels, 0 disables thumbnails
//! quality = 85              # JPEG quality (1-100)
//!
//! [subject]
//! title = "batch mailer"
//! template = "{title} #{num} ({progress}/{total}) {size}"
//!
//! [processing]
//! # max_processes = 4       # omit for auto = CPU cores
//! skip_unreadable = false
//!
//! [mail]
//! # from = "Me <me@example.com>"
//! to = []
//! cc = []
//! bcc = []
//! # smtp = "smtp.example.com:587"
//! # user_name = "me@example.com"
//! mode = "tls"              # normal | ssl | tls
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::Quality;
use crate::message::{Addressing, Mailbox, Mode, SmtpServer};
use crate::pipeline::{DEFAULT_MAX_SIZE, ErrorPolicy, PlanOptions};
use crate::sort::KeyPath;
use crate::subject::{DEFAULT_TEMPLATE, DEFAULT_TITLE, SubjectTemplate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE: &str = "mailbatch.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("invalid size {0:?} (expected e.g. 1048576, \"10MB\" or \"45MiB\")")]
    Size(String),
}

/// Configuration loaded from `mailbatch.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    pub grouping: GroupingConfig,
    pub thumbnails: ThumbnailsConfig,
    pub subject: SubjectConfig,
    pub processing: ProcessingConfig,
    pub mail: MailConfig,
}

impl BatchConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grouping.max_size.0 == 0 {
            return Err(ConfigError::Validation(
                "grouping.max_size must be positive".into(),
            ));
        }
        if !(1..=100).contains(&self.thumbnails.quality) {
            return Err(ConfigError::Validation(
                "thumbnails.quality must be 1-100".into(),
            ));
        }
        self.key_path()?;
        self.subject_template()?;
        Ok(())
    }

    pub fn key_path(&self) -> Result<Option<KeyPath>, ConfigError> {
        self.grouping
            .order_by
            .as_deref()
            .map(|key| {
                key.parse()
                    .map_err(|e| ConfigError::Validation(format!("grouping.order_by: {e}")))
            })
            .transpose()
    }

    pub fn subject_template(&self) -> Result<SubjectTemplate, ConfigError> {
        self.subject
            .template
            .parse()
            .map_err(|e| ConfigError::Validation(format!("subject.template: {e}")))
    }

    pub fn thumbnail_quality(&self) -> Quality {
        Quality::new(self.thumbnails.quality)
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        if self.processing.skip_unreadable {
            ErrorPolicy::Skip
        } else {
            ErrorPolicy::Abort
        }
    }

    pub fn addressing(&self) -> Addressing {
        let mail = &self.mail;
        Addressing {
            from: mail.from.clone(),
            to: mail.to.clone(),
            cc: mail.cc.clone(),
            bcc: mail.bcc.clone(),
            smtp: mail.smtp.clone(),
            user_name: mail.user_name.clone(),
            password: None,
            mode: mail.mode,
        }
    }

    pub fn plan_options(&self) -> Result<PlanOptions, ConfigError> {
        Ok(PlanOptions {
            max_size: self.grouping.max_size.0,
            order_by: self.key_path()?,
            reverse: self.grouping.reverse,
            title: self.subject.title.clone(),
            template: self.subject_template()?,
            addressing: self.addressing(),
        })
    }
}

/// A byte count written as an integer or a size string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSize", into = "u64")]
pub struct ByteSize(pub u64);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSize {
    Bytes(u64),
    Text(String),
}

impl TryFrom<RawSize> for ByteSize {
    type Error = ConfigError;

    fn try_from(raw: RawSize) -> Result<Self, Self::Error> {
        match raw {
            RawSize::Bytes(n) => Ok(Self(n)),
            RawSize::Text(s) => parse_size(&s).map(Self),
        }
    }
}

impl From<ByteSize> for u64 {
    fn from(size: ByteSize) -> Self {
        size.0
    }
}

/// Parse `"1048576"`, `"10MB"`, `"45MiB"`, `"1.5 GiB"` into bytes.
///
/// Decimal units (`KB`, `MB`, ...) are powers of 1000, binary units
/// (`KiB`, `MiB`, ...) powers of 1024. Units are case-insensitive.
pub fn parse_size(s: &str) -> Result<u64, ConfigError> {
    let invalid = || ConfigError::Size(s.to_string());
    let trimmed = s.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    let number: f64 = number.parse().map_err(|_| invalid())?;
    let multiplier: u64 = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" => 1000,
        "kib" => 1 << 10,
        "m" | "mb" => 1000 * 1000,
        "mib" => 1 << 20,
        "g" | "gb" => 1000 * 1000 * 1000,
        "gib" => 1 << 30,
        _ => return Err(invalid()),
    };
    let bytes = (number * multiplier as f64).round();
    if !bytes.is_finite() || bytes > u64::MAX as f64 {
        return Err(invalid());
    }
    Ok(bytes as u64)
}

/// How records are ordered and packed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupingConfig {
    /// Every group's total stays below this.
    pub max_size: ByteSize,
    /// Dotted key path such as `image.date` or `file.size`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    pub reverse: bool,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            max_size: ByteSize(DEFAULT_MAX_SIZE),
            order_by: None,
            reverse: false,
        }
    }
}

/// Thumbnails inlined into the HTML report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    /// Longer edge in pixels; 0 disables thumbnails.
    pub max_dimension: u32,
    /// JPEG quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            max_dimension: 80,
            quality: 85,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubjectConfig {
    pub title: String,
    pub template: String,
}

impl Default for SubjectConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

/// Parallel extraction settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel extraction workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
    /// Leave out files that cannot be read instead of failing the batch.
    pub skip_unreadable: bool,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Addressing defaults copied into every message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MailConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Mailbox>,
    pub to: Vec<Mailbox>,
    pub cc: Vec<Mailbox>,
    pub bcc: Vec<Mailbox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smtp: Option<SmtpServer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub mode: Mode,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(BatchConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<BatchConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: BatchConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective configuration.
///
/// An explicit `path` must exist; without one, [`CONFIG_FILE`] in the
/// working directory is used if present. `overrides` (typically built from
/// command-line flags) is merged last.
pub fn load_config(
    path: Option<&Path>,
    overrides: Option<toml::Value>,
) -> Result<BatchConfig, ConfigError> {
    let file = match path {
        Some(path) => Some(load_raw_config(path)?.ok_or_else(|| ConfigError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
        })?),
        None => load_raw_config(Path::new(CONFIG_FILE))?,
    };
    let base = match file {
        Some(file) => merge_toml(stock_defaults_value()?, file),
        None => stock_defaults_value()?,
    };
    resolve_config(base, overrides)
}

/// Returns a fully-commented stock `mailbatch.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# mailbatch configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Command-line flags override values from this file.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Grouping
# ---------------------------------------------------------------------------
[grouping]
# Every message stays strictly below this total attachment size.
# Integer bytes or a size string: B, KB, MB, GB (powers of 1000),
# KiB, MiB, GiB (powers of 1024).
max_size = "45MiB"

# Order files before grouping by a dotted key path, for example
# "image.date", "file.name", "file.size" or "file.date.modified".
# Files lacking the key come first. Omit to keep the given order.
# order_by = "image.date"

# Reverse the order (files lacking the key then come last).
reverse = false

# ---------------------------------------------------------------------------
# Thumbnails in the HTML report
# ---------------------------------------------------------------------------
[thumbnails]
# Longer edge in pixels. Smaller images are not upscaled. 0 disables.
max_dimension = 80

# JPEG quality (1 = worst, 100 = best).
quality = 85

# ---------------------------------------------------------------------------
# Subject lines
# ---------------------------------------------------------------------------
[subject]
title = "batch mailer"

# Placeholders: {title} {num} {progress} {total} {size}
# Use {{ and }} for literal braces.
template = "{title} #{num} ({progress}/{total}) {size}"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel extraction workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# Leave out files that cannot be read instead of failing the whole batch.
skip_unreadable = false

# ---------------------------------------------------------------------------
# Mail addressing (copied into every message)
# ---------------------------------------------------------------------------
[mail]
# from = "Me <me@example.com>"
to = []
cc = []
bcc = []

# Submission server as host or host:port. When omitted, smtp.<sender domain>
# on port 25 is assumed.
# smtp = "smtp.example.com:587"

# Defaults to the sender address when a password is supplied.
# user_name = "me@example.com"

# normal | ssl | tls
mode = "tls"
"##
}
