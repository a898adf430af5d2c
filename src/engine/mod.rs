//! Acquisition and transcoding engines
//!
//! Both engines own a [`ProcessSupervisor`](crate::process::ProcessSupervisor),
//! report through [`ProgressCallback`], and can be cancelled from any task
//! while an operation is in flight.

pub mod acquisition;
pub mod progress;
pub mod transcode;

pub use acquisition::AcquisitionEngine;
pub use progress::{
    ConsoleProgressCallback, JsonProgressCallback, NoOpProgressCallback, ProgressCallback,
};
pub use transcode::TranscodeEngine;
