pub mod backoff;
pub mod deadline;
pub mod diagnostics;
pub mod ids;
pub mod model;
pub mod sleep;
pub mod time;
pub mod types;

pub use backoff::*;
pub use deadline::*;
pub use diagnostics::*;
pub use ids::*;
pub use model::*;
pub use sleep::*;
pub use time::*;
pub use types::*;
