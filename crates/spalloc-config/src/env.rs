//! Environment-variable overrides, applied after the file and before
//! validation (`SPALLOC_` prefix, matching the teacher's `KNHK_` convention).

use crate::schema::SpallocConfig;
use std::env;

pub fn apply_env_overrides(config: &mut SpallocConfig) {
    if let Some(v) = parse_env("SPALLOC_ALLOCATOR_PERIOD_SECS") {
        config.allocator.period_secs = v;
    }
    if let Some(v) = parse_env("SPALLOC_ALLOCATOR_IMPORTANCE_SPAN") {
        config.allocator.importance_span = v;
    }
    if let Some(v) = parse_env("SPALLOC_KEEPALIVE_MIN_SECS") {
        config.keepalive.min_secs = v;
    }
    if let Some(v) = parse_env("SPALLOC_KEEPALIVE_MAX_SECS") {
        config.keepalive.max_secs = v;
    }
    if let Some(v) = parse_env("SPALLOC_KEEPALIVE_EXPIRY_PERIOD_SECS") {
        config.keepalive.expiry_period_secs = v;
    }
    if let Some(v) = parse_env("SPALLOC_TRANSCEIVER_DUMMY") {
        config.transceiver.dummy = v;
    }
    if let Ok(url) = env::var("SPALLOC_DB_URL") {
        config.db.url = url;
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
