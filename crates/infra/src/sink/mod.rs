//! Sink queue implementation: Azure Storage Queues.
//!
//! Bodies are base64-encoded into a single `MessageText` element, so the
//! bytes a consumer decodes are exactly the bytes received from the source.

pub mod connection_string;
pub mod shared_key;
pub mod storage_queue;

pub use connection_string::{StorageAccount, StorageCredential};
pub use storage_queue::StorageQueueSink;
