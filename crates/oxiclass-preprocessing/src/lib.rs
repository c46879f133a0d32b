pub mod scaler;
pub mod encoder;
pub mod split;

pub use scaler::*;
pub use encoder::*;
pub use split::*;
