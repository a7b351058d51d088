//! # ARS Common Library
//!
//! Shared code for the ambiguity resolution services:
//! - Process event model (Event, frames, classification results, outcomes)
//! - Wire codecs (XES event XML, JSON event objects)
//! - Configuration loading
//! - Orchestration lifecycle events (OrchestratorEvent enum, EventBus)

pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod wire;

pub use error::{Error, Result};
pub use model::{
    ClassificationResult, Event, FrameBatch, FrameReference, PublicationTarget, ResolutionOutcome,
};
