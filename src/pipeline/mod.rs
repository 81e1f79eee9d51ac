/// Background finishing of captured photos
///
/// `coordinator.rs` admits captures up to a concurrency ceiling, runs the
/// watermark compositor and the album save off the caller's thread, and
/// publishes the finished photo.

pub mod coordinator;

pub use coordinator::{Diagnostics, FinishingCoordinator};
