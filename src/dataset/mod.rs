//! Gesture sample files: loading, validation, merging and train/held-out splitting.

pub mod merge;
mod sample;
mod split;

pub use merge::{MergeError, MergeSummary, SkippedFile, merge_samples};
pub use sample::{
    DEFAULT_INPUT_WIDTH, DatasetError, GestureSample, LANDMARK_COUNT, load_samples,
    validate_samples,
};
pub use split::{SplitIndices, split_train_test};
