//! Configuration file handling and logging setup.

pub mod config;
pub mod logger;

pub use config::{load_config, save_config, validate_config};
pub use logger::init_logger;
