// Pipeline processing: the transformations the native stages apply

pub mod cleaning;
pub mod split;

pub use cleaning::{clean, CleaningSummary};
pub use split::{train_test_split, SplitParameters};
