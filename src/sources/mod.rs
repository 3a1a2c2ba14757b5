//! Directory-specific selectors and built-in query modes

pub mod bcorp;
pub mod peta;

pub use bcorp::BCorp;
pub use peta::Peta;
