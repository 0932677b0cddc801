pub mod pool;
pub mod queries;
pub mod writes;

pub use pool::create_pool;
pub use queries::*;
