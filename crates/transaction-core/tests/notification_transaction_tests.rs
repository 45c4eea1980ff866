mod common;

use std::sync::Arc;

use bytes::Bytes;
use rmms_transaction_core::{
    AutoDownloadSettings, Mailbox, MemoryMessageStore, MessageRef, NotificationIndication, Pdu, SendConfirmation,
    Transaction, TransactionConfig, TransactionContext, TransactionPhase, TransactionRequest, TransactionState,
};

use common::*;

const CONTENT_URL: &str = "http://mmsc.example.com/get?id=42";

async fn run_notification(ctx: &TransactionContext, location: &MessageRef) -> TransactionState {
    let mut tx = Transaction::new(TransactionRequest::notification(location.clone()), 3);
    tx.process(ctx).unwrap();
    tx.wait().await;
    tx.state()
}

fn placeholder(store: &MemoryMessageStore, content_location: Option<&str>) -> MessageRef {
    let mut indication = NotificationIndication::new("N42", CONTENT_URL);
    indication.content_location = content_location.map(str::to_string);
    store.insert(Some(Pdu::NotificationIndication(indication)), Mailbox::NotificationPlaceholder)
}

#[tokio::test]
async fn test_download_moves_content_into_inbox() {
    init_logging();
    let store = MemoryMessageStore::new();
    let location = placeholder(&store, Some(CONTENT_URL));
    let transport = ScriptedTransport::serving(retrieve_conf_text("see you at 8"));

    let state = run_notification(&context(&store, transport.clone()), &location).await;

    assert_eq!(state.phase(), TransactionPhase::Success);
    let inbox = state.result_location().unwrap().clone();
    assert_ne!(inbox, location);
    assert_eq!(store.mailbox_of(&inbox), Some(Mailbox::Inbox));
    assert!(store.stored(&inbox).unwrap().as_text);
    assert_eq!(store.mailbox_of(&location), None);
    assert_eq!(store.delete_count(), 1);
    assert_eq!(transport.get_urls(), vec![CONTENT_URL.to_string()]);
    assert_eq!(transport.post_count(), 0);
}

#[tokio::test]
async fn test_disabled_policy_skips_download() {
    let store = MemoryMessageStore::new();
    let location = placeholder(&store, Some(CONTENT_URL));
    let transport = ScriptedTransport::serving(retrieve_conf_text("hi"));
    let ctx = context_with(
        Arc::new(store.clone()),
        transport.clone(),
        AutoDownloadSettings::new(false),
        TransactionConfig::default(),
    );

    let state = run_notification(&ctx, &location).await;

    assert_eq!(state.phase(), TransactionPhase::Success);
    assert_eq!(state.result_location(), Some(&location));
    assert_eq!(transport.get_count(), 0);
    assert_eq!(store.mailbox_of(&location), Some(Mailbox::NotificationPlaceholder));
    assert_eq!(store.delete_count(), 0);
}

#[tokio::test]
async fn test_missing_content_location_fails() {
    let store = MemoryMessageStore::new();
    let location = placeholder(&store, None);
    let transport = ScriptedTransport::serving(retrieve_conf_text("hi"));

    let state = run_notification(&context(&store, transport.clone()), &location).await;

    assert_eq!(state.phase(), TransactionPhase::Failed);
    assert_eq!(state.error_message(), Some("no content location in notification"));
    assert_eq!(transport.get_count(), 0);
}

#[tokio::test]
async fn test_failed_download_keeps_placeholder() {
    let store = MemoryMessageStore::new();
    let location = placeholder(&store, Some(CONTENT_URL));
    let transport = ScriptedTransport::silent();

    let state = run_notification(&context(&store, transport.clone()), &location).await;

    assert_eq!(state.phase(), TransactionPhase::Failed);
    assert!(state.error_message().unwrap().starts_with("failed to download MMS content"));
    assert_eq!(transport.get_count(), 1);
    assert_eq!(store.mailbox_of(&location), Some(Mailbox::NotificationPlaceholder));
    assert_eq!(store.count_in(Mailbox::Inbox), 0);
}

#[tokio::test]
async fn test_wrong_pdu_type_is_a_parse_failure() {
    let store = MemoryMessageStore::new();
    let location = placeholder(&store, Some(CONTENT_URL));
    let conf = rmms_transaction_core::PduCodec::compose(
        &rmms_transaction_core::WapPduCodec::new(),
        &Pdu::SendConfirmation(SendConfirmation::ok("T1")),
    )
    .unwrap();
    let transport = ScriptedTransport::serving(conf);

    let state = run_notification(&context(&store, transport), &location).await;

    assert_eq!(state.phase(), TransactionPhase::Failed);
    assert!(state
        .error_message()
        .unwrap()
        .starts_with("failed to parse retrieve confirmation"));
    assert_eq!(store.count_in(Mailbox::Inbox), 0);
}

#[tokio::test]
async fn test_garbage_download_is_a_parse_failure() {
    let store = MemoryMessageStore::new();
    let location = placeholder(&store, Some(CONTENT_URL));
    let transport = ScriptedTransport::serving(Bytes::from_static(b"not an mms"));

    let state = run_notification(&context(&store, transport), &location).await;

    assert_eq!(state.phase(), TransactionPhase::Failed);
    assert_eq!(store.mailbox_of(&location), Some(Mailbox::NotificationPlaceholder));
}

#[tokio::test]
async fn test_persist_failure_is_fatal() {
    let store = MemoryMessageStore::new();
    let location = placeholder(&store, Some(CONTENT_URL));
    let mut faulty = FaultyStore::new(store.clone());
    faulty.fail_persist = true;
    let ctx = context_with(
        Arc::new(faulty),
        ScriptedTransport::serving(retrieve_conf_text("hi")),
        AutoDownloadSettings::default(),
        TransactionConfig::default(),
    );

    let state = run_notification(&ctx, &location).await;

    assert_eq!(state.phase(), TransactionPhase::Failed);
    assert!(state.error_message().unwrap().starts_with("failed to persist"));
    assert_eq!(store.mailbox_of(&location), Some(Mailbox::NotificationPlaceholder));
    assert_eq!(store.delete_count(), 0);
}

#[tokio::test]
async fn test_placeholder_delete_failure_is_a_note() {
    let store = MemoryMessageStore::new();
    let location = placeholder(&store, Some(CONTENT_URL));
    let mut faulty = FaultyStore::new(store.clone());
    faulty.fail_delete = true;
    let ctx = context_with(
        Arc::new(faulty),
        ScriptedTransport::serving(retrieve_conf_text("hi")),
        AutoDownloadSettings::default(),
        TransactionConfig::default(),
    );

    let state = run_notification(&ctx, &location).await;

    assert_eq!(state.phase(), TransactionPhase::Success);
    assert_eq!(store.count_in(Mailbox::Inbox), 1);
    assert!(state
        .error_message()
        .unwrap()
        .contains("failed to delete notification placeholder"));
}

#[tokio::test]
async fn test_placeholder_without_notification_fails_to_load() {
    let store = MemoryMessageStore::new();
    let location = store.insert(None, Mailbox::NotificationPlaceholder);
    let transport = ScriptedTransport::serving(retrieve_conf_text("hi"));

    let state = run_notification(&context(&store, transport.clone()), &location).await;

    assert_eq!(state.phase(), TransactionPhase::Failed);
    assert!(state.error_message().unwrap().starts_with("failed to load notification"));
    assert_eq!(transport.get_count(), 0);
}
