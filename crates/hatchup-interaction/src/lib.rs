//! HTTP adapters for the collaborators HatchUp talks to: the completion
//! service, the identity provider, and MCP tool back-ends.

pub mod completion;
pub mod document;
pub mod identity;
pub mod mcp;

pub use completion::OpenAiCompatibleCompletion;
pub use document::{CompletionDeckAnalyzer, PlainTextExtractor};
pub use identity::SupabaseIdentityProvider;
pub use mcp::{HttpToolConnector, HttpToolSession};
