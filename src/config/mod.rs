//! Configuration module for Petrel
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Every component takes its settings explicitly at construction;
//! there is no process-wide mutable configuration.
//!
//! # Example
//!
//! ```no_run
//! use petrel::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Delay range: {}-{}s", config.crawler.min_delay, config.crawler.max_delay);
//! ```

mod parser;
mod types;
mod validation;

pub use parser::{load_config, load_config_or_default};
pub use types::{Config, CrawlerConfig, OutputConfig, SecurityConfig};
pub use validation::validate;
