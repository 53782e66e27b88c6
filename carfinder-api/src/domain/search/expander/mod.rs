//! Query expansion implementations.

#[cfg(test)]
mod mock;
mod openai;

#[cfg(test)]
pub use mock::MockExpander;
pub use openai::{OpenAiExpander, DEFAULT_BASE_URL, DEFAULT_MODEL};
