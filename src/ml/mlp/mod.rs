//! Dense gesture classifier: model, trainer and TensorFlow.js export.

mod model;
pub mod tfjs;
mod train;

pub use model::{DenseLayer, GestureMlp};
pub use tfjs::{TfjsError, load_layers_model, save_layers_model};
pub use train::{EpochMetrics, TrainDataset, TrainOptions, TrainOutcome, train_mlp};
