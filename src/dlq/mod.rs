//! Dead-letter retry tracking
//!
//! A request carrying `X-DLQ-Process-Id` is an external re-delivery of work
//! that previously failed. The tracker keeps a bounded retry counter per
//! process in the shared cache and escalates to a notification sink once the
//! counter passes `max_retry` or the failure is not retryable, so the
//! external queue converges instead of looping forever.
//!
//! Requests without the header, or whose process id has no stored status,
//! pass through untouched.

pub mod error;
pub mod notify;
pub mod status;
pub mod tracker;

pub use error::{DlqError, NotifyError};
pub use notify::{LogNotifier, Notifier, WebhookNotifier};
pub use status::{DlqRetryStatus, RetryDecision};
pub use tracker::{DlqReport, DlqRetryTracker, extract_error_message};
