pub mod config_loader;
pub mod log_config;
