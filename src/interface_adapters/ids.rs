use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a process-unique connection id. Identities are connection-scoped
/// and nothing outlives the process, so a plain monotonic counter suffices.
pub fn next_connection_id() -> u64 {
    NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)
}
