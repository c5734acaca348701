//! Live crawl progress
//!
//! The coordinator emits `ProgressEvent`s; the `ProgressBroadcaster` fans
//! them out to every subscribed connection.

mod broadcaster;
mod event;

pub use broadcaster::{ProgressBroadcaster, SubscriberId, Subscription};
pub use event::{EventStatus, ProgressEvent};
