//! Gradient-boosted decision stumps for binary classification.

mod model;
mod train;

pub use model::{GbdtModel, Stump};
pub use train::{TrainOptions, train_gbdt};
