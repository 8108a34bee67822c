pub mod context;
pub mod pipeline;
pub mod session;
pub mod synthesizer;

pub use context::ContextAssembler;
pub use pipeline::*;
pub use session::*;
pub use synthesizer::*;
