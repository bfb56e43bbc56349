//! Feature derivation stages
//!
//! Each stage takes a table and returns a new one.

pub mod attributes;
pub mod category;
pub mod filter;
pub mod lag;
pub mod reshape;

pub use category::CompetitionCategories;
pub use filter::{CompetitionFilter, ResultFilter};
pub use lag::{LagWindowEngine, LaggedFeature};
pub use reshape::EntityReshaper;
