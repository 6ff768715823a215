//! station-mapper: read station CSV files and render interactive HTML maps.

pub mod app;
pub mod cli;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod map;
