pub mod generator;
pub mod watsonx;

pub use generator::{complete, TextGenerator};
pub use watsonx::{WatsonxClient, WatsonxConfig};
