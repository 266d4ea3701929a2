//! Wire-format clients for LLM backends.

pub mod openai;
