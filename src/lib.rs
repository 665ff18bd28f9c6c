pub mod adapters;
pub mod config;
pub mod core;
pub mod daemon;
pub mod logging;
