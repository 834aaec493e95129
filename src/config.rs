//! Configuration management for img2color.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `IMG2COLOR_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use img2color::config::Config;
//!
//! // Parse from command line and environment
//! let config = Config::parse();
//! config.validate()?;
//!
//! println!("Listening on {}", config.bind_address());
//! ```
//!
//! # Environment Variables
//!
//! - `IMG2COLOR_HOST` - Server bind address (default: 0.0.0.0)
//! - `IMG2COLOR_PORT` - Server port (default: 3000)
//! - `IMG2COLOR_CACHE_ENABLED` - Enable the color cache (default: false)
//! - `IMG2COLOR_CACHE_CAPACITY` - Max cached colors (default: 10000)
//! - `IMG2COLOR_STORE_ENABLED` - Record computed colors (default: false)
//! - `IMG2COLOR_STORE_PATH` - Color log file (default: img2color-colors.jsonl)
//! - `IMG2COLOR_STORE_REQUIRED` - Refuse to start without the store (default: false)
//! - `IMG2COLOR_ALLOWED_REFERERS` - Comma-separated referer patterns (default: allow all)
//! - `IMG2COLOR_TARGET_WIDTH` - Downscale width before averaging (default: 50)
//! - `IMG2COLOR_FETCH_TIMEOUT_SECS` - Remote fetch timeout (default: 10)
//! - `IMG2COLOR_REQUEST_TIMEOUT_SECS` - Whole pipeline timeout (default: 30)
//! - `IMG2COLOR_MAX_BODY_BYTES` - Largest accepted image body (default: 20 MiB)
//! - `IMG2COLOR_USER_AGENT` - User agent sent to image hosts

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::color::DEFAULT_TARGET_WIDTH;
use crate::fetch::{DEFAULT_MAX_BODY_BYTES, DEFAULT_USER_AGENT};
use crate::gateway::DEFAULT_CACHE_CAPACITY;
use crate::server::RefererPolicy;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default color log file.
pub const DEFAULT_STORE_PATH: &str = "img2color-colors.jsonl";

/// Default fetch timeout in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Default whole-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Largest accepted `--target-width`.
pub const MAX_TARGET_WIDTH: u32 = 4096;

// =============================================================================
// CLI Arguments
// =============================================================================

/// img2color - Average color of remote images over HTTP.
///
/// Serves `GET /api?img=<url>`, answering with the mean color of the image
/// as `{"RGB":"#rrggbb"}`.
#[derive(Parser, Debug, Clone)]
#[command(name = "img2color")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "IMG2COLOR_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "IMG2COLOR_PORT")]
    pub port: u16,

    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Cache computed colors in memory, keyed by URL.
    #[arg(long, default_value_t = false, env = "IMG2COLOR_CACHE_ENABLED")]
    pub cache_enabled: bool,

    /// Maximum number of cached colors.
    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY, env = "IMG2COLOR_CACHE_CAPACITY")]
    pub cache_capacity: usize,

    // =========================================================================
    // Store Configuration
    // =========================================================================
    /// Record every computed color in an append-only log file.
    #[arg(long, default_value_t = false, env = "IMG2COLOR_STORE_ENABLED")]
    pub store_enabled: bool,

    /// JSON Lines file for recorded colors.
    #[arg(long, default_value = DEFAULT_STORE_PATH, env = "IMG2COLOR_STORE_PATH")]
    pub store_path: PathBuf,

    /// Exit at startup if the store cannot be opened.
    ///
    /// Without this flag the server runs without persistence instead.
    #[arg(long, default_value_t = false, env = "IMG2COLOR_STORE_REQUIRED")]
    pub store_required: bool,

    // =========================================================================
    // Referer Configuration
    // =========================================================================
    /// Allowed referer host patterns (comma-separated, `*` wildcard).
    ///
    /// If not specified, every referer is allowed.
    #[arg(long, env = "IMG2COLOR_ALLOWED_REFERERS", value_delimiter = ',')]
    pub allowed_referers: Vec<String>,

    // =========================================================================
    // Pipeline Configuration
    // =========================================================================
    /// Width images are downscaled to before averaging.
    #[arg(long, default_value_t = DEFAULT_TARGET_WIDTH, env = "IMG2COLOR_TARGET_WIDTH")]
    pub target_width: u32,

    /// Timeout for fetching a remote image, in seconds.
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS, env = "IMG2COLOR_FETCH_TIMEOUT_SECS")]
    pub fetch_timeout_secs: u64,

    /// Timeout for fetch plus computation, in seconds.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS, env = "IMG2COLOR_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: u64,

    /// Largest accepted image body in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES, env = "IMG2COLOR_MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    /// User-Agent header sent to image hosts.
    #[arg(long, default_value = DEFAULT_USER_AGENT, env = "IMG2COLOR_USER_AGENT")]
    pub user_agent: String,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_capacity == 0 {
            return Err("cache_capacity must be greater than 0".to_string());
        }

        if self.store_enabled && self.store_path.as_os_str().is_empty() {
            return Err(
                "Store is enabled but no path provided. Set --store-path or IMG2COLOR_STORE_PATH"
                    .to_string(),
            );
        }

        if self.target_width == 0 || self.target_width > MAX_TARGET_WIDTH {
            return Err(format!(
                "target_width must be between 1 and {}",
                MAX_TARGET_WIDTH
            ));
        }

        if self.fetch_timeout_secs == 0 {
            return Err("fetch_timeout_secs must be greater than 0".to_string());
        }
        if self.request_timeout_secs < self.fetch_timeout_secs {
            return Err(
                "request_timeout_secs must be greater than or equal to fetch_timeout_secs"
                    .to_string(),
            );
        }

        if self.max_body_bytes == 0 {
            return Err("max_body_bytes must be greater than 0".to_string());
        }

        if self.user_agent.trim().is_empty() {
            return Err("user_agent must not be empty".to_string());
        }

        self.referer_policy()?;

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Compile the referer allow-list.
    pub fn referer_policy(&self) -> Result<RefererPolicy, String> {
        RefererPolicy::new(&self.allowed_referers)
            .map_err(|e| format!("Invalid allowed_referers pattern: {}", e))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// =============================================================================
// Tests
// =============================================================================
