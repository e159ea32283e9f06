pub mod debounce;
pub mod store;

pub use debounce::*;
pub use store::*;
