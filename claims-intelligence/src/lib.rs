pub mod audit;
pub mod config;
pub mod decision;
pub mod error;
pub mod extract;
pub mod governance;
pub mod llm;
pub mod memory;
pub mod models;
pub mod prompts;
pub mod quotes;
pub mod retrieval;
pub mod service;
pub mod tasks;
pub mod underwriting;
pub mod workflow;

pub use error::{ClaimsError, Result};
pub use service::{AppState, create_app};
