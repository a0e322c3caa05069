pub mod macros;
pub mod sample;
pub mod series;
pub mod summary;

pub use sample::*;
pub use series::*;
pub use summary::*;
