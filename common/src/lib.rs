pub mod error;
pub mod catalog;
pub mod llm;
pub mod executor;
pub mod agent;
pub mod tracing;

pub use error::{Txt2SqlError, Result};
pub use agent::{FinalReport, LoopConfig, LoopController, SessionState};
pub use catalog::Catalog;
