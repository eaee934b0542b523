//! Multi-agent orchestration core.
//!
//! This crate turns a customer message into a reply by way of:
//! 1. **Routing** (`supervisor`) - the supervisor picks the collaborator(s)
//!    whose delegation instruction matches the request
//! 2. **Deciding** (`collaborator`) - each domain agent runs a bounded
//!    decide/execute loop against its declared actions
//! 3. **Executing** (`executor`) - typed action dispatch into the per-domain
//!    stores
//! 4. **Persisting** (`runtime`) - the session store keeps the conversation
//!    across turns with idle-TTL expiry
//!
//! The language model and knowledge retrieval are consumed behind the
//! `CompletionClient` and `KnowledgeLookup` traits; nothing in this crate
//! depends on a particular provider.

pub mod collaborator;
pub mod completion;
pub mod executor;
pub mod http;
pub mod knowledge;
pub mod roster;
pub mod runtime;
pub mod supervisor;

pub use collaborator::DomainAgent;
pub use completion::{
    CompletionClient, CompletionError, CompletionRequest, ScriptedCompletionClient,
    TranscriptEntry, TranscriptRole,
};
pub use executor::ActionExecutor;
pub use http::HttpCompletionClient;
pub use knowledge::{KnowledgeError, KnowledgeLookup, Passage, StaticKnowledgeBase};
pub use roster::{build_supervisor, RosterStores};
pub use runtime::{OrchestratorRuntime, TurnOutcome};
pub use supervisor::{CollaboratorBinding, SupervisorRouter, TurnReply};
