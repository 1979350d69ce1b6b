pub mod report;

pub use report::{ClassificationReport, ConfusionMatrix, percent, write_csv};
