//! Testing utilities and mock implementations.
//!
//! [`MockToolRunner`] stands in for the external media tool so frame probes
//! and conversion sessions can be exercised without ffmpeg installed.

mod mock_runner;

pub use mock_runner::MockToolRunner;
