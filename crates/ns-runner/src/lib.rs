pub mod auditor;
pub mod config;
pub mod hints;
pub mod scenario;

pub use auditor::*;
pub use config::*;
pub use hints::*;
