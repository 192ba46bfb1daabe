use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "spalloc-server", version, about = "Spalloc core allocation service")]
pub struct Args {
    /// Path to the TOML configuration document. Missing file is an error;
    /// omitting this flag entirely runs on defaults plus env overrides.
    #[arg(long, env = "SPALLOC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address the health/readiness surface listens on.
    #[arg(long, env = "SPALLOC_HEALTH_ADDR", default_value = "0.0.0.0:8080")]
    pub health_addr: String,

    /// Grace period given to in-flight loop iterations before the process
    /// forcibly joins their tasks on shutdown.
    #[arg(long, env = "SPALLOC_SHUTDOWN_GRACE_SECS", default_value_t = 10)]
    pub shutdown_grace_secs: u64,
}
