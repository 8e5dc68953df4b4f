//! Shared test mocks and utilities for the leaderboard services.

mod aggregate;
mod clock;
mod repository;
mod transport;

pub use aggregate::{
    SCORECARD_CREATED, SCORECARD_DELETED, SCORECARD_SCORED, Scorecard, ScorecardEvent,
    ScorecardEventKind,
};
pub use clock::{FixedClock, ManualClock};
pub use repository::{FailingEventRepository, InMemoryEventStore};
pub use transport::{RecordingDeadLetterSink, ScriptedTransport, SentMessage};
