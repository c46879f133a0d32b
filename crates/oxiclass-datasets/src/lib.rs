//! Datasets for the classification walkthrough: synthetic generators for
//! the worked example and the student-performance records for the exercise.

pub mod dataset;
pub mod grade;
pub mod students;
pub mod synthetic;

pub use dataset::{ClassCount, Dataset};
pub use grade::{GradeLevel, GradeError};
pub use students::*;
pub use synthetic::*;
