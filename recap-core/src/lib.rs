pub mod config;
pub mod db;
pub mod error;
pub mod ipc;
pub mod llm;
pub mod models;
pub mod repo;

pub use config::RecapConfig;
pub use error::RecapError;
pub use llm::{
    CallParams, CompletionBackend, CompletionConfig, CompletionError, OpenAiCompletionClient,
};
pub use repo::MessageRepository;
