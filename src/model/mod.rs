pub mod analytics;
pub mod entities;
pub mod row;

pub use analytics::*;
pub use entities::*;
pub use row::*;
