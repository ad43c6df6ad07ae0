use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use super::ExplanationStore;
use crate::types::ExplanationRecord;
use crate::Result;

/// In-memory store. Counts reads and writes so tests can assert on them.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, ExplanationRecord>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a record, bypassing the write counter.
    pub fn seed(&self, mut record: ExplanationRecord) {
        record.created_at.get_or_insert_with(Utc::now);
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(record.exam_id.clone(), record);
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ExplanationStore for MemoryStore {
    async fn get(&self, exam_id: &str) -> Result<Option<ExplanationRecord>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .records
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(exam_id)
            .cloned())
    }

    async fn put(&self, record: &ExplanationRecord) -> Result<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let mut stored = record.clone();
        stored.created_at = Some(Utc::now());
        self.records
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(stored.exam_id.clone(), stored);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
