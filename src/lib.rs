#![allow(clippy::uninlined_format_args)]

pub mod analytics;
pub mod app;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod player;
pub mod storage;
pub mod trace;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
