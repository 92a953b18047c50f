pub mod game;

// ============================================================================
// Profiling Macros
// ============================================================================

/// Log a message every `$every` iterations of a hot loop when the
/// `perf_stats` feature is enabled.
///
/// # Example
/// ```ignore
/// profile_log!(iterations, 10_000, "[PATH] open={}", open_set.len());
/// ```
///
/// # Zero-Cost Abstraction
/// When compiled without the `perf_stats` feature, this expands to an empty block.
/// Even the arguments (e.g., `open_set.len()`) are not evaluated.
#[macro_export]
#[cfg(feature = "perf_stats")]
macro_rules! profile_log {
    ($counter:expr, $every:expr, $($arg:tt)*) => {
        if $counter % $every == 0 {
            tracing::info!($($arg)*);
        }
    };
}

#[macro_export]
#[cfg(not(feature = "perf_stats"))]
macro_rules! profile_log {
    ($counter:expr, $every:expr, $($arg:tt)*) => {};
}
