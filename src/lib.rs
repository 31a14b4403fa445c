//! Credit-risk scoring pipeline: dataset merging, stratified partitioning,
//! classifier training, and an HTTP scoring service over one shared
//! feature-mapping core.
/// Persisted model artifact bundle.
pub mod artifacts;
/// External field mapping, coercion, and feature-vector assembly.
pub mod features;
/// Logging setup.
pub mod logging;
/// Classifier candidates and metrics.
pub mod ml;
/// Standard feature scaling.
pub mod scaler;
/// Unified schema and source rename tables.
pub mod schema;
/// HTTP scoring service.
pub mod service;
/// Stratified train/val/test partitioning.
pub mod split;
/// Synthetic artifact generation.
pub mod synthetic;
/// Tabular data with CSV persistence.
pub mod table;
/// Offline training orchestration.
pub mod trainer;
