//! Output contract enforcement: normalize untrusted model output, then gate it.
//!
//! Stage order is fixed: normalize → evidence gate → confidence gate. The
//! confidence gate runs last so it can override everything upstream.

pub mod confidence;
pub mod evidence;
pub mod gate;
pub mod normalize;
pub mod parse;
pub mod pipeline;

pub use confidence::*;
pub use evidence::*;
pub use gate::*;
pub use normalize::*;
pub use parse::*;
pub use pipeline::*;
