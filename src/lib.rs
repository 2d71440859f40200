//! # DeepTutor backend core
//!
//! Provider selection and gating for the DeepTutor tutoring backend.
//!
//! ## Pipelines
//!
//! [`pipeline::PipelineRegistry`] maps provider ids (`realtimex`, `lightrag`,
//! `raganything`, `raganything_docling`, `llamaindex`) to factories. Optional
//! backends are Cargo features; when one is compiled out its provider stays
//! listed as unavailable with an install hint instead of disappearing.
//!
//! ## RealTimeX
//!
//! When the service runs inside the RealTimeX desktop app, LLM and embedding
//! calls go through its SDK:
//! - [`realtimex::RealtimeXContext`] owns the shared SDK handle and the cached
//!   detection result
//! - [`realtimex::ProvidersCache`] keeps the remote provider listings for a TTL
//! - [`adapter`] translates requests and errors between the SDK and callers
//!
//! ## Selection
//!
//! [`selection::SelectionStore`] persists the chosen provider/model per config
//! type in a single JSON document.
//!
//! Everything long-lived is gathered in [`state::AppState`].

pub mod adapter;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod realtimex;
pub mod selection;
pub mod state;

// Re-exports
pub use error::*;
pub use selection::{ConfigType, Selection, SelectionStore};
pub use state::AppState;
