//! Logistic-regression candidate model.

mod model;
mod train;

pub use model::LogRegModel;
pub use train::{TrainOptions, train_logreg};
