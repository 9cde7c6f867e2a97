//! Tree fitting, export and evaluation.
//!
//! [`train::train_and_export`] ties the pieces together: it fits a
//! [`cart::RegressionTree`], turns its arrays into an [`export::TreeExport`]
//! and writes the matching [`meta::ModelMetadata`].

pub mod cart;
pub mod export;
pub mod meta;
pub mod metrics;
pub mod train;
