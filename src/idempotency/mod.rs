//! Idempotent request coordination
//!
//! Deduplicates POST-style mutating requests with a client-supplied key
//! (`X-Idempotency-Key`), scoped per client, plus a fingerprint of method,
//! path and body. The shared
//! cache doubles as a distributed lock (create-if-absent) and as the memo of
//! the original response.
//!
//! # Guarantees
//!
//! 1. **Dedup**: at most one handler execution per key at a time; concurrent
//!    duplicates observe `RequestBeingProcessed`.
//! 2. **Fingerprint isolation**: a key reused with a different body, method or
//!    path is rejected.
//! 3. **Replay**: a finished key replays the original status/body/headers.
//! 4. **Failure releases**: a non-2xx outcome deletes the lock so a retry is fresh.
//!
//! A crashed worker's pending lock simply expires after the pending TTL; the
//! retry then re-executes (at-most-once weakens to at-least-once in that case).

pub mod coordinator;
pub mod error;
pub mod fingerprint;
pub mod record;

pub use coordinator::{
    FinalizeAction, GuardOutcome, IdempotencyCoordinator, IdempotencyTicket, is_success_status,
};
pub use error::IdempotencyError;
pub use fingerprint::{RequestScope, fingerprint};
pub use record::{CachedResponse, IdempotencyRecord, ProcessStatus};
