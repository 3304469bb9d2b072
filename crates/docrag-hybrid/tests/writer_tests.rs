mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::MemoryVectorIndex;
use docrag_core::retry::RetryPolicy;
use docrag_core::traits::LexicalIndex;
use docrag_core::types::{Chunk, PointId, RetrievalHit, SearchFilter};
use docrag_core::{Error, Result};
use docrag_hybrid::DualIndexWriter;

/// Lexical index whose every write fails as if the database were locked.
#[derive(Default)]
struct LockedLexical {
    calls: AtomicUsize,
}

impl LockedLexical {
    fn locked(&self) -> Error {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Error::Lexical("database is locked".into())
    }
}

impl LexicalIndex for LockedLexical {
    fn init(&self) -> Result<()> {
        Err(self.locked())
    }

    fn upsert(&self, _chunks: &[&Chunk]) -> Result<()> {
        Err(self.locked())
    }

    fn delete_by_doc_id(&self, _doc_id: &str) -> Result<usize> {
        Err(self.locked())
    }

    fn clear(&self) -> Result<()> {
        Err(self.locked())
    }

    fn search(&self, _query: &str, _limit: usize, _filter: &SearchFilter) -> Result<Vec<RetrievalHit>> {
        Ok(Vec::new())
    }

    fn ids_for_doc(&self, _doc_id: &str) -> Result<Vec<PointId>> {
        Ok(Vec::new())
    }
}

fn writer(lexical: Arc<LockedLexical>, policy: RetryPolicy) -> DualIndexWriter {
    DualIndexWriter::new(Arc::new(MemoryVectorIndex::default()), lexical, 2, policy).expect("writer")
}

#[tokio::test]
async fn lexical_retry_sleeps_without_blocking_the_runtime() {
    let slow = RetryPolicy { attempts: 4, sleep: Duration::from_millis(300) };
    let writer = writer(Arc::new(LockedLexical::default()), slow);

    let started = Instant::now();
    let out = tokio::time::timeout(Duration::from_millis(50), writer.delete_by_doc_id("doc-1")).await;

    assert!(out.is_err(), "timeout must fire while the writer waits between attempts");
    assert!(started.elapsed() < Duration::from_millis(250), "runtime stalled for {:?}", started.elapsed());
}

#[tokio::test]
async fn lexical_failures_exhaust_the_policy() {
    let lexical = Arc::new(LockedLexical::default());
    let writer = writer(lexical.clone(), RetryPolicy { attempts: 3, sleep: Duration::ZERO });

    let err = writer.wipe().await.expect_err("lexical clear keeps failing");
    assert!(matches!(err, Error::UpstreamUnavailable { .. }), "{err}");
    assert!(err.to_string().contains("database is locked"));
    assert_eq!(lexical.calls.load(Ordering::SeqCst), 3);

    let err = writer.ensure_ready(8).await.expect_err("lexical init keeps failing");
    assert!(matches!(err, Error::UpstreamUnavailable { .. }));
    assert_eq!(lexical.calls.load(Ordering::SeqCst), 6);
}
