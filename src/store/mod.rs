//! Document store for cached explanation records.
//!
//! The store is used as a write-once cache: one `get` by exam id per request
//! and at most one `put` on a miss. Records are never updated or deleted here.
//!
//! | Backend | Description |
//! |---------|-------------|
//! | [`FirestoreStore`] | Cloud Firestore over its REST API, server-assigned `createdAt` |
//! | [`MemoryStore`] | Process-local map, for tests and running without credentials |

mod firestore;
mod memory;
mod value;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::types::ExplanationRecord;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ExplanationStore: Send + Sync {
    async fn get(&self, exam_id: &str) -> Result<Option<ExplanationRecord>>;

    /// Write `record` under its exam id, stamping `createdAt` with the
    /// store's own clock. An existing document is overwritten (last writer wins).
    async fn put(&self, record: &ExplanationRecord) -> Result<()>;

    fn name(&self) -> &'static str;
}
