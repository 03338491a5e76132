pub mod client;
pub mod diagnostics;
pub mod endpoint;
pub mod error;
pub mod models;
pub mod prefs;
pub mod state;

// Re-export main types for convenience
pub use client::LmStudioClient;
pub use diagnostics::{DiagStatus, DiagnosticReport, DiagnosticResult, DiagnosticsRunner};
pub use endpoint::{DEFAULT_API_URL, DEFAULT_MODEL};
pub use error::ApiError;
pub use models::ModelDescriptor;
pub use prefs::{FileStore, KeyValueStore};
pub use state::{ChatMessage, ChatRole, Conversation};
