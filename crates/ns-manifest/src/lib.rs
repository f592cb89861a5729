pub mod cache;
pub mod fingerprint;
pub mod manifest;

pub use cache::*;
pub use fingerprint::*;
pub use manifest::*;
