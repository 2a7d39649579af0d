//! crates/logging/src/tracing_macros.rs
//! Convenience macros for backup-engine tracing.
//!
//! These macros wrap the standard tracing macros with the target of one
//! engine subsystem, matching [`Subsystem::target`](crate::Subsystem::target).

/// Emit a phase-2 progress trace (file dispositions, phase boundaries).
///
/// # Example
/// ```ignore
/// trace_phase2!("unchanged: {}", path);
/// ```
#[macro_export]
macro_rules! trace_phase2 {
    ($($arg:tt)*) => {
        ::tracing::info!(target: "backup::phase2", $($arg)*);
    };
}

/// Emit a manifest read/write trace.
///
/// # Example
/// ```ignore
/// trace_manifest!("opened {}", path.display());
/// ```
#[macro_export]
macro_rules! trace_manifest {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "backup::manifest", $($arg)*);
    };
}

/// Emit a signature/delta trace.
///
/// # Example
/// ```ignore
/// trace_delta!("block length {} for {} bytes", block_len, bytes);
/// ```
#[macro_export]
macro_rules! trace_delta {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "backup::delta", $($arg)*);
    };
}

/// Emit a trace for a record received from the client.
///
/// # Example
/// ```ignore
/// trace_recv!("end of file for {}", path);
/// ```
#[macro_export]
macro_rules! trace_recv {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "backup::receiver", $($arg)*);
    };
}

/// Emit a trace for a request sent to the client.
///
/// # Example
/// ```ignore
/// trace_send!("requesting {}", path);
/// ```
#[macro_export]
macro_rules! trace_send {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "backup::sender", $($arg)*);
    };
}

/// Emit a low-level I/O trace.
///
/// # Example
/// ```ignore
/// trace_io!("flushed {} bytes", count);
/// ```
#[macro_export]
macro_rules! trace_io {
    ($($arg:tt)*) => {
        ::tracing::trace!(target: "backup::io", $($arg)*);
    };
}

/// Emit a block cache trace.
///
/// # Example
/// ```ignore
/// trace_cache!("loaded {} blocks from {}", count, path.display());
/// ```
#[macro_export]
macro_rules! trace_cache {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "backup::cache", $($arg)*);
    };
}

/// Emit a statistics trace.
///
/// # Example
/// ```ignore
/// trace_stats!("new files: {}", count);
/// ```
#[macro_export]
macro_rules! trace_stats {
    ($($arg:tt)*) => {
        ::tracing::info!(target: "backup::stats", $($arg)*);
    };
}
