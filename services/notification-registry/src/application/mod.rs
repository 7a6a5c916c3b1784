//! 应用层

mod commands;
mod handlers;
mod queries;

pub use commands::*;
pub use handlers::*;
pub use queries::*;
