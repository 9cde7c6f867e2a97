//! California Housing preparation and decision-tree export.
//!
//! Two batch pipelines share this library: `caltree-prepare` writes a
//! stratified train/test CSV pair, and `caltree-train` fits a regression tree
//! on the training CSV and exports `tree.json` plus `meta.json`.

/// Application directory helpers.
pub mod app_dirs;
mod atomic_file;
/// Pipeline configuration files.
pub mod config;
/// Datasets, CSV I/O and the stratified splitter.
pub mod dataset;
mod http_client;
/// Tracing subscriber setup.
pub mod logging;
/// Tree fitting, export and metrics.
pub mod ml;
