pub mod client;
pub mod services;

pub use client::{AiClient, GenerationReply, GenerationRequest, HttpAiClient, StaticAiClient, TokenUsage};
pub use services::*;
