//! Stage documents and progress persistence.

pub mod load;
pub mod progress;

pub use load::*;
pub use progress::*;
