//! Watson Assistant webhook relay: validates webhook calls, forwards the text to an
//! OpenAI-compatible completion service, and answers in the webhook response format.

pub mod completion;
pub mod config;
pub mod llm;
pub mod webhook;
