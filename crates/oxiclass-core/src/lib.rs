pub mod tensor;
pub mod shape;
pub mod dtype;
pub mod error;
pub mod traits;
pub mod validation;

pub use tensor::Tensor;
pub use shape::Shape;
pub use dtype::Float;
pub use error::{MlError, MlResult};
pub use traits::{Classifier, Transformer};
