pub mod flatten;
pub mod outliner;

pub use flatten::*;
pub use outliner::*;
