//! Progress reporting for bulk statistics jobs.
//!
//! Decouples [`crate::bulk`] from any rendering backend. The CLI plugs in
//! `indicatif` bars.

/// Receives progress updates from a long-running job.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Mark the job complete with a final message.
    fn finish(&self, msg: String);
}
