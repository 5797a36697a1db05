//! Configuration loading and validation
//!
//! Configuration is a TOML file with kebab-case keys, loaded once at startup
//! and validated before anything runs. The scheduler section is handed to
//! each scheduler instance by value; there is no shared process-wide
//! default.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{
    BrowserConfig, CacheConfig, Config, CrawlConfig, SchedulerConfig, UserAgentConfig,
};
pub use validation::validate;
