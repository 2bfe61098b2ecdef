pub mod client;
pub mod parse;
pub mod schemas;

pub use client::{AiClient, AiError, OpenAiClient};
