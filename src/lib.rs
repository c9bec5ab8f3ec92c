pub mod aggregate;
pub mod checks;
pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod exit;
pub mod manifest;
pub mod platform;
pub mod probe;
pub mod resolve;
pub mod ui;
