pub mod filesystem;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use filesystem::*;
pub use memory::*;
pub use postgres::*;
pub use traits::*;
