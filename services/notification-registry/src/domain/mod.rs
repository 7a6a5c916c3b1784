//! 领域层

mod installation;
mod repository;

pub use installation::*;
pub use repository::*;
