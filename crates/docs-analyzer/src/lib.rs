//! `docs-analyzer` — client for the knl documentation-analysis backend.
//!
//! The backend is a separate server process reached over a local stdio
//! transport: requests and responses are JSON-RPC 2.0 messages, one per
//! line. The workflow in `knl-cli` only sees the [`AnalysisBackend`]
//! capability trait, so it is transport-agnostic and testable with a fake:
//!
//! ```text
//! ProposalRequest
//!     │
//!     ▼
//! AnalysisBackend::propose
//!     ├── StdioBackend      ← spawns the analyzer, initialize → tools/list
//!     │                        → tools/call → shutdown
//!     └── HeuristicBackend  ← local counting checks, no subprocess
//!     ▼
//! UpdateProposal
//! ```
//!
//! Backend failure is recoverable by design: callers catch the error, log a
//! warning, and fall back to [`HeuristicBackend`].

pub mod client;
pub mod error;
pub mod heuristic;

pub(crate) mod process;

pub use client::{ProposalRequest, StdioBackend};
pub use error::AnalyzerError;
pub use heuristic::HeuristicBackend;

use knl_core::docs::proposal::UpdateProposal;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Capability interface for proposal generation. One implementation per
/// transport.
pub trait AnalysisBackend {
    fn propose(&self, request: &ProposalRequest) -> Result<UpdateProposal>;
}
