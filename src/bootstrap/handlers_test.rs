use std::sync::Arc;
use std::sync::Mutex;

use bytes::Bytes;
use tempfile::TempDir;

use super::BootstrapCompletionHandler;
use super::BootstrapContext;
use super::BootstrapTerminateHandler;
use super::BootstrapTokenHandler;
use crate::constants::BOOTSTRAP_MODE;
use crate::network::MockTransport;
use crate::network::Transport;
use crate::network::VerbHandler;
use crate::ring::Endpoint;
use crate::ring::Token;
use crate::test_utils::fast_config;
use crate::Message;
use crate::StreamAction;
use crate::StreamContext;
use crate::StreamStatus;
use crate::StreamStatusMessage;
use crate::Verb;

fn dirs() -> (TempDir, TempDir) {
    (TempDir::new().unwrap(), TempDir::new().unwrap())
}

fn ctx_with(
    host: &str,
    transport: Arc<dyn Transport>,
    dirs: &(TempDir, TempDir),
) -> Arc<BootstrapContext> {
    let config = fast_config(host, 100, 1, None, &dirs.0, &dirs.1);
    BootstrapContext::new(config, transport)
}

fn capturing_transport(sink: Arc<Mutex<Vec<Message>>>) -> Arc<MockTransport> {
    let mut transport = MockTransport::new();
    transport.expect_send_one_way().returning(move |message, _| {
        sink.lock().unwrap().push(message);
        Ok(())
    });
    Arc::new(transport)
}

fn seed_three_node_ring(ctx: &BootstrapContext) {
    ctx.token_metadata
        .update(Token(10), Endpoint::new("a", 7000), false);
    ctx.token_metadata
        .update(Token(20), Endpoint::new("b", 7000), false);
    ctx.token_metadata
        .update(Token(30), Endpoint::new("c", 7000), false);
}

#[tokio::test]
async fn test_token_handler_replies_with_data_median() {
    let dirs = dirs();
    let ctx = ctx_with("a", Arc::new(MockTransport::new()), &dirs);
    seed_three_node_ring(&ctx);
    // a's primary range is the wrap arc (30,10]; its data median is 5.
    ctx.storage.set_key_sample(vec![Token(5)]);

    let handler = BootstrapTokenHandler::new(ctx);
    let request = Message::new(
        Verb::BootstrapToken,
        &Endpoint::new("d", 7000),
        Bytes::new(),
    );
    let reply = handler.do_verb(request).await.unwrap().expect("reply");
    assert_eq!(reply.body, Bytes::from_static(b"5"));
}

#[tokio::test]
async fn test_token_handler_without_ring_position_fails() {
    let dirs = dirs();
    let ctx = ctx_with("a", Arc::new(MockTransport::new()), &dirs);

    let handler = BootstrapTokenHandler::new(ctx);
    let request = Message::new(
        Verb::BootstrapToken,
        &Endpoint::new("d", 7000),
        Bytes::new(),
    );
    assert!(handler.do_verb(request).await.is_err());
}

#[tokio::test]
async fn test_terminate_delete_frees_slot_and_stream_repeats() {
    let dirs = dirs();
    let sink = Arc::new(Mutex::new(Vec::new()));
    let ctx = ctx_with("a", capturing_transport(sink.clone()), &dirs);

    let target = Endpoint::new("d", 7000);
    let manager = ctx.stream_managers.get_or_create(&target);
    let file = dirs.0.path().join("users-1-Data.db");
    std::fs::write(&file, b"rows").unwrap();
    let key = file.display().to_string();
    manager.add_file(file, 4);

    let handler = BootstrapTerminateHandler::new(ctx);

    // Delete acknowledges and frees the slot.
    let mut status = StreamStatus::new(key.clone(), 4);
    status.set_action(StreamAction::Delete);
    let message = Message::new(
        Verb::BootstrapTerminate,
        &target,
        Message::encode_body(&StreamStatusMessage {
            status: Some(status),
        }),
    );
    handler.do_verb(message).await.unwrap();
    assert!(manager.is_done());

    // Stream on an unknown (already freed) file is harmless.
    let mut status = StreamStatus::new(key, 4);
    status.set_action(StreamAction::Stream);
    let message = Message::new(
        Verb::BootstrapTerminate,
        &target,
        Message::encode_body(&StreamStatusMessage {
            status: Some(status),
        }),
    );
    handler.do_verb(message).await.unwrap();
}

#[tokio::test]
async fn test_completion_verdicts_and_install() {
    let dirs = dirs();
    let sink = Arc::new(Mutex::new(Vec::new()));
    let ctx = ctx_with("d", capturing_transport(sink.clone()), &dirs);

    ctx.gossiper.add_application_state(BOOTSTRAP_MODE, "true");
    ctx.storage.add_bootstrap_source(Endpoint::new("a", 7000));

    let local_dir = ctx.storage.data_file_location("ks");
    std::fs::create_dir_all(&local_dir).unwrap();
    let local_data = local_dir.join("users-1-tmp-Data.db");

    let handler = Arc::new(BootstrapCompletionHandler::new(&ctx));
    ctx.stream_contexts
        .register_stream_completion_handler("a", handler.clone());

    let source_file = "/remote/users-1-Data.db";
    let context = StreamContext {
        table: "ks".to_string(),
        target_file: local_data.display().to_string(),
        expected_bytes: 4,
    };
    ctx.stream_contexts.add_stream_context(
        "a",
        source_file,
        context,
        StreamStatus::new(source_file, 4),
    );

    // First attempt arrives short: verdict must be Stream and the
    // context must be re-registered for the retry.
    ctx.stream_contexts.complete_file("a", source_file, 2).await;
    {
        let sent = sink.lock().unwrap();
        let verdict: StreamStatusMessage = sent[0].decode_body().unwrap();
        assert_eq!(verdict.status.unwrap().action(), StreamAction::Stream);
    }
    assert!(!ctx.stream_contexts.is_done("a"));
    assert_eq!(ctx.storage.bootstrap_source_count(), 1);
    assert!(ctx.gossiper.local_application_state(BOOTSTRAP_MODE).is_some());

    // Retry lands intact: installed, Delete, source drained, mode off.
    std::fs::write(&local_data, b"rows").unwrap();
    ctx.stream_contexts.complete_file("a", source_file, 4).await;
    {
        let sent = sink.lock().unwrap();
        let verdict: StreamStatusMessage = sent[1].decode_body().unwrap();
        assert_eq!(verdict.status.unwrap().action(), StreamAction::Delete);
    }

    let store = ctx.storage.column_family_store("ks", "users");
    assert_eq!(store.sstables().len(), 1);
    assert_eq!(store.sstables()[0].file_name(), "users-1-Data.db");
    assert_eq!(ctx.storage.bootstrap_source_count(), 0);
    assert!(ctx.gossiper.local_application_state(BOOTSTRAP_MODE).is_none());
}

#[tokio::test]
async fn test_completion_install_failure_is_not_fatal() {
    let dirs = dirs();
    let sink = Arc::new(Mutex::new(Vec::new()));
    let ctx = ctx_with("d", capturing_transport(sink.clone()), &dirs);

    let handler = Arc::new(BootstrapCompletionHandler::new(&ctx));
    ctx.stream_contexts
        .register_stream_completion_handler("a", handler);

    // The local file never materialized; install fails, verdict is
    // Stream, nothing panics.
    let source_file = "/remote/users-3-Data.db";
    let context = StreamContext {
        table: "ks".to_string(),
        target_file: ctx
            .storage
            .data_file_location("ks")
            .join("users-3-tmp-Data.db")
            .display()
            .to_string(),
        expected_bytes: 4,
    };
    ctx.stream_contexts.add_stream_context(
        "a",
        source_file,
        context,
        StreamStatus::new(source_file, 4),
    );

    ctx.stream_contexts.complete_file("a", source_file, 4).await;
    let sent = sink.lock().unwrap();
    let verdict: StreamStatusMessage = sent[0].decode_body().unwrap();
    assert_eq!(verdict.status.unwrap().action(), StreamAction::Stream);
}
