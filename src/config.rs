//! # Configuration Management
//!
//! Loads the converter's settings from several sources:
//! - TOML configuration file (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Built-in defaults
//!
//! ## Configuration Priority (highest to lowest):
//! 1. `HOST` / `PORT` (deployment platform conventions)
//! 2. Environment variables (APP_SERVER__PORT, APP_UPLOAD__MAX_SAMPLES, etc.)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: Converts between these structs and TOML/JSON/environment data
//! - **Builder pattern**: `config::Config::builder()` stacks sources in priority order
//! - **Result<T, E>**: Loading and validation both report failures instead of panicking

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration.
///
/// ## Sections:
/// - **server**: Where the HTTP server listens
/// - **upload**: Limits applied to uploads before anything is encoded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upload: UploadConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any address (containers, production)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Limits on what a single request may upload.
///
/// ## Why limits:
/// Every upload is read fully into memory before it is encoded, so these
/// bound the memory one request can claim. None of them affect the container
/// format itself; a container encoded under one set of limits decodes fine
/// under any other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum number of sample files in one conversion
    pub max_samples: usize,

    /// Maximum size of a single sample file in bytes
    pub max_sample_bytes: usize,

    /// Maximum size of the manifest form field in bytes
    pub max_manifest_bytes: usize,

    /// Maximum size of a container posted to the inspect endpoint
    pub max_container_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            upload: UploadConfig {
                max_samples: 128,
                max_sample_bytes: 64 * 1024 * 1024,      // 64 MiB
                max_manifest_bytes: 1024 * 1024,         // 1 MiB
                max_container_bytes: 512 * 1024 * 1024,  // 512 MiB
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources in priority order.
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__HOST=0.0.0.0`: Override server host
    /// - `APP_UPLOAD__MAX_SAMPLES=32`: Allow at most 32 samples per conversion
    /// - `PORT=8080`: Special case for deployment platforms
    ///
    /// ## Note on separators:
    /// Keys such as `max_samples` contain underscores, so nesting is marked
    /// with a double underscore instead of a single one.
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - Every upload limit is greater than 0
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        let limits = [
            ("max_samples", self.upload.max_samples),
            ("max_sample_bytes", self.upload.max_sample_bytes),
            ("max_manifest_bytes", self.upload.max_manifest_bytes),
            ("max_container_bytes", self.upload.max_container_bytes),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(anyhow::anyhow!("Upload limit {} must be greater than 0", name));
            }
        }

        Ok(())
    }

    /// Apply a partial update from a JSON string (used by `PUT /api/v1/config`).
    ///
    /// Only the fields present in the JSON change. For example
    /// `{"upload": {"max_samples": 16}}` leaves everything else alone.
    /// The result is validated before returning.
    ///
    /// `server` values are stored but the listener is bound once at startup,
    /// so they only take effect after a restart.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        let partial_config: serde_json::Value = serde_json::from_str(json_str)?;

        if let Some(server) = partial_config.get("server") {
            if let Some(host) = server.get("host").and_then(|v| v.as_str()) {
                self.server.host = host.to_string();
            }
            if let Some(port) = server.get("port").and_then(|v| v.as_u64()) {
                self.server.port = u16::try_from(port)
                    .map_err(|_| anyhow::anyhow!("Server port {} is out of range", port))?;
            }
        }

        if let Some(upload) = partial_config.get("upload") {
            let fields: [(&str, &mut usize); 4] = [
                ("max_samples", &mut self.upload.max_samples),
                ("max_sample_bytes", &mut self.upload.max_sample_bytes),
                ("max_manifest_bytes", &mut self.upload.max_manifest_bytes),
                ("max_container_bytes", &mut self.upload.max_container_bytes),
            ];
            for (key, slot) in fields {
                if let Some(value) = upload.get(key).and_then(|v| v.as_u64()) {
                    *slot = usize::try_from(value)
                        .map_err(|_| anyhow::anyhow!("Upload limit {} value {} is out of range", key, value))?;
                }
            }
        }

        self.validate()?;
        Ok(())
    }
}
