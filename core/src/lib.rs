//! Credit-decision bias audit.
//!
//! Joins customer records with credit-risk predictions and measures
//! rejection disparities across nationality, locality, sex, age and
//! ethnicity.

pub mod bias_analysis;
pub mod config;
pub mod consolidation;
pub mod error;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod scoring;
pub mod snapshot;
pub mod source;
pub mod stats;
pub mod store;
pub mod summary;
pub mod types;
