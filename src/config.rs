//! Configuration for imagepress.
//!
//! Configuration is read from command-line arguments and environment
//! variables with an `IMG_` prefix, with sensible defaults for everything
//! except the S3 bucket.
//!
//! # Environment Variables
//!
//! - `IMG_HOST` - Server bind address (default: 0.0.0.0)
//! - `IMG_PORT` - Server port (default: 8100)
//! - `IMG_S3_BUCKET` - S3 bucket name (required)
//! - `IMG_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `IMG_S3_REGION` - AWS region (default: us-east-1)
//! - `IMG_CACHE_BYTES` - Result cache byte budget; <= 0 disables caching
//! - `IMG_MAX_UPLOAD_SIZE` - Maximum upload payload in bytes
//! - `IMG_MAX_CONCURRENCY` - Pipeline concurrency ceiling; 0 = 2x cores
//! - `IMG_CACHE_MAX_AGE` - HTTP cache max-age seconds (default: 7 days)

use clap::Parser;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8100;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default result cache byte budget: 128MB.
pub const DEFAULT_CACHE_BYTES: i64 = 128 * 1024 * 1024;

/// Default maximum upload payload: 5MB.
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 5 * 1024 * 1024;

/// Default HTTP cache max-age in seconds (7 days).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 7 * 24 * 3600;

// =============================================================================
// CLI Arguments
// =============================================================================

/// imagepress - an on-demand image transform server.
///
/// Serves processed image variants (crop, rotate, resize, format, quality,
/// gamma) from originals stored in S3 or S3-compatible storage, and accepts
/// normalized uploads into the same bucket.
#[derive(Parser, Debug, Clone)]
#[command(name = "imagepress")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "IMG_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "IMG_PORT")]
    pub port: u16,

    // =========================================================================
    // S3 Configuration
    // =========================================================================
    /// S3 bucket name holding the source images.
    #[arg(long, env = "IMG_S3_BUCKET")]
    pub s3_bucket: String,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, env = "IMG_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, default_value = DEFAULT_REGION, env = "IMG_S3_REGION")]
    pub s3_region: String,

    // =========================================================================
    // Cache and Resource Configuration
    // =========================================================================
    /// Result cache byte budget. Zero or negative disables caching.
    #[arg(long, default_value_t = DEFAULT_CACHE_BYTES, env = "IMG_CACHE_BYTES")]
    pub cache_bytes: i64,

    /// Maximum upload payload size in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_SIZE, env = "IMG_MAX_UPLOAD_SIZE")]
    pub max_upload_size: usize,

    /// Maximum number of pipeline executions running concurrently.
    ///
    /// Zero means "derive from hardware": 2x the logical core count.
    #[arg(long, default_value_t = 0, env = "IMG_MAX_CONCURRENCY")]
    pub max_concurrency: usize,

    /// HTTP Cache-Control max-age in seconds for delivered variants.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "IMG_CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated). If not specified, any origin.
    #[arg(long, env = "IMG_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

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
        if self.s3_bucket.is_empty() {
            return Err("S3 bucket name is required. Set --s3-bucket or IMG_S3_BUCKET".to_string());
        }

        if self.max_upload_size == 0 {
            return Err("max_upload_size must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether the result cache is enabled.
    pub fn cache_enabled(&self) -> bool {
        self.cache_bytes > 0
    }
}

// =============================================================================
// Tests
// =============================================================================
