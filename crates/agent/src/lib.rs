//! Model-backed processing for support conversations.
//!
//! - `llm`, `ollama`, `simulated`: the model client seam and its two backends
//! - `prompt`, `structured`, `stages`: prompt rendering, schema-first parsing and
//!   the five model-backed stages
//! - `orchestrator`: one conversation through the fixed stage order
//! - `runtime`: many conversations through a bounded worker pool
//!
//! The model only produces text. Stage order, validation, timing and persistence are
//! decided here, deterministically.

pub mod llm;
pub mod ollama;
pub mod orchestrator;
pub mod prompt;
pub mod runtime;
pub mod seed;
pub mod simulated;
pub mod stages;
pub mod structured;

pub use llm::{client_from_config, CompletionOptions, LlmClient, ModelError};
pub use orchestrator::{Orchestrator, OrchestratorSettings, PipelineError, StageFailure};
pub use runtime::{ConversationOutcome, PipelineRuntime, RunError};
pub use simulated::SimulatedClient;
pub use stages::StageSet;
pub use structured::ParsedStageOutput;
