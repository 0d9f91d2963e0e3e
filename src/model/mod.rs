pub mod common;
pub mod user_context;
pub mod wardrobe;

pub use common::*;
pub use user_context::*;
pub use wardrobe::*;
