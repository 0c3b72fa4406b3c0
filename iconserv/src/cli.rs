use std::path::PathBuf;

use clap::Parser;

/// Icon cache and resolution server.
#[derive(Parser, Debug)]
#[command(name = "iconserv", version, about)]
pub struct CliArgs {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Root directory of the bundled asset categories
    #[arg(long, env = "ASSETS_ROOT", default_value = "assets")]
    pub assets_root: PathBuf,

    /// Directory backing the durable object store
    #[arg(long, env = "STORE_DIR", default_value = "store")]
    pub store_dir: PathBuf,

    /// Fast cache size in megabytes
    #[arg(long, env = "CACHE_MB", default_value_t = 256)]
    pub cache_mb: u64,

    /// Admin credential required by the purge and prefetch endpoints
    #[arg(long, env = "ADMIN_AUTH")]
    pub admin_token: Option<String>,

    /// CDN edge purge endpoint
    #[arg(long, env = "CDN_PURGE_ENDPOINT")]
    pub cdn_endpoint: Option<String>,

    /// CDN edge purge credential
    #[arg(long, env = "CDN_PURGE_TOKEN")]
    pub cdn_token: Option<String>,

    /// Resolver data-table overrides (JSON file)
    #[arg(long, env = "RESOLVER_CONFIG")]
    pub resolver_config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
