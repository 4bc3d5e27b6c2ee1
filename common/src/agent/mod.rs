pub mod parser;
pub mod prompt;
pub mod state;
pub mod generate;
pub mod execute;
pub mod validate;
pub mod controller;

#[cfg(test)]
pub(crate) mod testing;

pub use parser::{extract_fenced_block, parse_sql, parse_verdict, Parsed, Verdict};
pub use prompt::{build_generation_prompt, build_validation_prompt};
pub use state::{FinalReport, SessionState, MAX_ATTEMPTS};
pub use generate::generate_sql;
pub use execute::execute_sql;
pub use validate::validate_result;
pub use controller::{route_after_validation, LoopConfig, LoopController, Phase, SESSION_ABORTED_ISSUE};
