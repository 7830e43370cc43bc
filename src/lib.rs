pub mod aggregate;
pub mod analyze;
pub mod chat;
pub mod cli;
pub mod completion;
pub mod config;
pub mod context;
pub mod conversation;
pub mod corpus;
pub mod insights;
pub mod interview;
pub mod metrics;
pub mod serve;

use std::path::PathBuf;

#[derive(Debug)]
pub enum ExitIntelError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Config(String),
    ConfigurationMissing(String),
    CorpusNotFound(PathBuf),
    Completion(String),
    Extraction(String),
    Conversation(String),
    NotFound(String),
    AmbiguousSelector { selector: String, matches: usize },
}

impl std::fmt::Display for ExitIntelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitIntelError::Io(e) => write!(f, "io: {e}"),
            ExitIntelError::Json(e) => write!(f, "json: {e}"),
            ExitIntelError::Config(msg) => write!(f, "config: {msg}"),
            ExitIntelError::ConfigurationMissing(msg) => write!(f, "configuration missing: {msg}"),
            ExitIntelError::CorpusNotFound(path) => write!(
                f,
                "corpus not found: {} (run `exitintel analyze` first)",
                path.display()
            ),
            ExitIntelError::Completion(msg) => write!(f, "completion: {msg}"),
            ExitIntelError::Extraction(msg) => write!(f, "extraction: {msg}"),
            ExitIntelError::Conversation(msg) => write!(f, "conversation: {msg}"),
            ExitIntelError::NotFound(selector) => write!(f, "no interview matches {selector:?}"),
            ExitIntelError::AmbiguousSelector { selector, matches } => {
                write!(f, "{selector:?} matches {matches} interviews")
            }
        }
    }
}

impl std::error::Error for ExitIntelError {}

impl From<std::io::Error> for ExitIntelError {
    fn from(e: std::io::Error) -> Self {
        ExitIntelError::Io(e)
    }
}

impl From<serde_json::Error> for ExitIntelError {
    fn from(e: serde_json::Error) -> Self {
        ExitIntelError::Json(e)
    }
}
