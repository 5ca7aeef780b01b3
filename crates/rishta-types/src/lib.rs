pub mod error;
pub mod lifecycle;
pub mod profile;

pub use error::{Result, RishtaError};
