// Copyright © 2025 Stephan Kunz

//! The Bot: one interpreter instance walking a shared [`crate::tree::Tree`].

pub mod error;
pub mod http_client;
pub mod interpreter;
pub mod state;

pub use error::Error;
pub use http_client::{HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use interpreter::{run_to_completion, step};
pub use state::{ApiCall, Bot, BotState, Frame, FrameLocals, Outcome};
