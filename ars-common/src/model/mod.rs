//! Process event data model
//!
//! Everything here is immutable once constructed. The only mutable state in the
//! system (the sliding event window) lives in the orchestrator crate.

mod classification;
mod event;
mod frames;
mod outcome;

pub use classification::ClassificationResult;
pub use event::{
    parse_timestamp, Attribute, Event, CONCEPT_NAME, LOCATION_STATION, PERFORMER_PREFIX,
    TARGET_PREFIX, TIMESTAMP, TIME_PREFIX,
};
pub use frames::{FrameBatch, FrameReference};
pub use outcome::{PublicationTarget, ResolutionOutcome};
