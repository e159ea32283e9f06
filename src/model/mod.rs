pub mod forest;
pub mod item;
pub mod settings;
pub mod status;

pub use forest::*;
pub use item::*;
pub use settings::*;
pub use status::*;
