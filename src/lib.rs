//! Replybot - webhook chatbot answering from a phrase corpus
//!
//! Incoming chat messages are embedded and compared against a corpus of
//! greetings and questions. A close enough match is answered with its stored
//! reply; anything else goes to a text-generation model and the answer is
//! marked as generated.

pub mod app;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod gateway;
pub mod generation;
pub mod resolver;
pub mod responder;
pub mod server;

pub use error::{ReplybotError, Result};
