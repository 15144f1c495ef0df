use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use super::StreamCompletion;
use super::StreamContextManager;
use crate::Result;
use crate::StreamContext;
use crate::StreamStatus;

struct RecordingCompletion {
    completions: Arc<Mutex<Vec<(String, StreamContext, StreamStatus)>>>,
}

#[async_trait]
impl StreamCompletion for RecordingCompletion {
    async fn on_stream_completion(
        &self,
        host: &str,
        context: StreamContext,
        status: StreamStatus,
    ) -> Result<()> {
        self.completions
            .lock()
            .unwrap()
            .push((host.to_string(), context, status));
        Ok(())
    }
}

fn context(
    table: &str,
    local_file: &str,
    bytes: u64,
) -> StreamContext {
    StreamContext {
        table: table.to_string(),
        target_file: local_file.to_string(),
        expected_bytes: bytes,
    }
}

#[tokio::test]
async fn test_host_is_done_when_set_drains() {
    let manager = StreamContextManager::new();
    let completions = Arc::new(Mutex::new(Vec::new()));
    manager.register_stream_completion_handler(
        "peer1",
        Arc::new(RecordingCompletion {
            completions: completions.clone(),
        }),
    );

    manager.add_stream_context(
        "peer1",
        "users-1-Data.db",
        context("ks", "/data/ks/users-9-tmp-Data.db", 100),
        StreamStatus::new("users-1-Data.db", 100),
    );
    manager.add_stream_context(
        "peer1",
        "users-1-Index.db",
        context("ks", "/data/ks/users-9-tmp-Index.db", 10),
        StreamStatus::new("users-1-Index.db", 10),
    );

    assert!(!manager.is_done("peer1"));
    assert_eq!(manager.pending_count("peer1"), 2);

    manager.complete_file("peer1", "users-1-Data.db", 100).await;
    assert!(!manager.is_done("peer1"));

    manager.complete_file("peer1", "users-1-Index.db", 10).await;
    assert!(manager.is_done("peer1"));

    let seen = completions.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].2.bytes_received, 100);
    assert_eq!(seen[1].2.bytes_received, 10);
}

#[tokio::test]
async fn test_local_path_lookup_uses_source_name() {
    let manager = StreamContextManager::new();
    manager.add_stream_context(
        "peer1",
        "users-1-Data.db",
        context("ks", "/data/ks/users-9-tmp-Data.db", 100),
        StreamStatus::new("users-1-Data.db", 100),
    );

    assert_eq!(
        manager.local_path("peer1", "users-1-Data.db"),
        Some("/data/ks/users-9-tmp-Data.db".to_string())
    );
    assert_eq!(manager.local_path("peer1", "users-2-Data.db"), None);
    assert_eq!(manager.local_path("peer2", "users-1-Data.db"), None);
}

#[tokio::test]
async fn test_unknown_completion_is_ignored() {
    let manager = StreamContextManager::new();
    manager.complete_file("ghost", "users-1-Data.db", 5).await;
    assert!(manager.is_done("ghost"));
}

#[tokio::test]
async fn test_completion_order_does_not_matter() {
    for order in [[0usize, 1, 2], [2, 1, 0], [1, 2, 0]] {
        let manager = StreamContextManager::new();
        let completions = Arc::new(Mutex::new(Vec::new()));
        manager.register_stream_completion_handler(
            "peer1",
            Arc::new(RecordingCompletion {
                completions: completions.clone(),
            }),
        );

        let files = ["users-1-Data.db", "users-1-Index.db", "users-1-Filter.db"];
        for file in files {
            manager.add_stream_context(
                "peer1",
                file,
                context("ks", &format!("/data/ks/{file}"), 10),
                StreamStatus::new(file, 10),
            );
        }

        for i in order {
            manager.complete_file("peer1", files[i], 10).await;
        }

        assert!(manager.is_done("peer1"));
        assert_eq!(completions.lock().unwrap().len(), 3);
    }
}

/// A handler that re-registers the file, the way a `Stream` verdict
/// does; the host must stay outstanding.
struct ReAddingCompletion {
    manager: Arc<StreamContextManager>,
}

#[async_trait]
impl StreamCompletion for ReAddingCompletion {
    async fn on_stream_completion(
        &self,
        host: &str,
        context: StreamContext,
        status: StreamStatus,
    ) -> Result<()> {
        self.manager.add_stream_context(
            host,
            &status.file,
            context,
            StreamStatus::new(status.file.clone(), status.expected_bytes),
        );
        Ok(())
    }
}

#[tokio::test]
async fn test_re_added_file_keeps_host_outstanding() {
    let manager = Arc::new(StreamContextManager::new());
    manager.register_stream_completion_handler(
        "peer1",
        Arc::new(ReAddingCompletion {
            manager: manager.clone(),
        }),
    );
    manager.add_stream_context(
        "peer1",
        "users-1-Data.db",
        context("ks", "/data/ks/users-9-tmp-Data.db", 100),
        StreamStatus::new("users-1-Data.db", 100),
    );

    manager.complete_file("peer1", "users-1-Data.db", 40).await;
    assert!(!manager.is_done("peer1"));
    assert_eq!(manager.pending_count("peer1"), 1);
}
