pub mod contract;
pub mod error;
pub mod fakes;
pub mod types;

pub use contract::*;
pub use error::*;
pub use types::*;
