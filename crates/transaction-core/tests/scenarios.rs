//! End-to-end flows through the sender, receiver and dispatcher

mod common;

use std::sync::Arc;
use std::time::Duration;

use rmms_transaction_core::{
    AutoDownloadSettings, Mailbox, MemoryMessageStore, MessageSender, NotificationIndication, Pdu, PduCodec,
    PushReceiver, SendRequest, ServiceError, TransactionConfig, TransactionKey, TransactionPhase,
    TransactionService, WapPduCodec,
};

use common::*;

fn draft(store: &MemoryMessageStore) -> rmms_transaction_core::MessageRef {
    store.insert(
        Some(Pdu::SendRequest(
            SendRequest::new("T7")
                .with_recipient("+15550003333/TYPE=PLMN")
                .with_subject("weekend"),
        )),
        Mailbox::Draft,
    )
}

fn push_bytes(transaction_id: &str) -> bytes::Bytes {
    let indication = NotificationIndication::new(transaction_id, "http://mmsc.example.com/get?id=7");
    WapPduCodec::new()
        .compose(&Pdu::NotificationIndication(indication))
        .unwrap()
}

#[tokio::test]
async fn scenario_a_send_accepted_on_first_post() {
    init_logging();
    let store = MemoryMessageStore::new();
    let location = draft(&store);
    let transport = ScriptedTransport::answering(send_conf_ok());
    let service = TransactionService::start(context(&store, transport.clone())).unwrap();
    let mut events = service.subscribe();
    let sender = MessageSender::new(service.clone());

    let outbox = sender.send_message(&location, 11).await.unwrap();
    let state = wait_finished(&mut events, &TransactionKey::send(outbox.clone())).await;

    assert_eq!(state.phase(), TransactionPhase::Success);
    assert_eq!(store.mailbox_of(&outbox), Some(Mailbox::Sent));
    assert_eq!(transport.post_count(), 1);

    let Some(Pdu::SendRequest(stored)) = store.stored(&outbox).unwrap().pdu else {
        panic!("send request missing");
    };
    assert_eq!(stored.expiry, Some(7 * 24 * 60 * 60));
    assert!(!stored.delivery_report);
    assert!(!stored.read_report);
    assert!(stored.date.is_some());
}

#[tokio::test(start_paused = true)]
async fn scenario_b_mmsc_never_answers() {
    let store = MemoryMessageStore::new();
    let location = draft(&store);
    let transport = ScriptedTransport::silent();
    // One attempt, nothing filed: the message must stay where the failed attempt left it
    let config = TransactionConfig::default().with_max_retries(0).with_file_failed_sends(false);
    let ctx = context_with(Arc::new(store.clone()), transport.clone(), AutoDownloadSettings::default(), config);
    let service = TransactionService::start(ctx).unwrap();
    let mut events = service.subscribe();
    let started = tokio::time::Instant::now();

    let outbox = MessageSender::new(service.clone()).send_message(&location, 12).await.unwrap();
    let state = wait_finished(&mut events, &TransactionKey::send(outbox.clone())).await;

    assert_eq!(state.phase(), TransactionPhase::Failed);
    assert_eq!(state.error_message(), Some("no response from MMSC after retries"));
    assert_eq!(transport.post_count(), 3);
    assert!(started.elapsed() >= Duration::from_secs(6));
    assert_eq!(store.mailbox_of(&outbox), Some(Mailbox::Outbox));
}

#[tokio::test(start_paused = true)]
async fn scenario_b_with_outer_retries_files_into_failed() {
    let store = MemoryMessageStore::new();
    let location = draft(&store);
    let transport = ScriptedTransport::silent();
    let service = TransactionService::start(context(&store, transport.clone())).unwrap();
    let mut events = service.subscribe();

    let outbox = MessageSender::new(service.clone()).send_message(&location, 12).await.unwrap();
    let state = wait_finished(&mut events, &TransactionKey::send(outbox.clone())).await;

    assert_eq!(state.phase(), TransactionPhase::Failed);
    // 4 attempts of 3 POSTs each
    assert_eq!(transport.post_count(), 12);
    assert_eq!(store.mailbox_of(&outbox), Some(Mailbox::Failed));
}

#[tokio::test]
async fn scenario_c_push_downloads_into_inbox() {
    let store = MemoryMessageStore::new();
    let transport = ScriptedTransport::serving(retrieve_conf_text("dinner at 8?"));
    let service = TransactionService::start(context(&store, transport.clone())).unwrap();
    let mut events = service.subscribe();
    let receiver = PushReceiver::new(service.clone());

    let placeholder = receiver.handle_push(&push_bytes("N7")).await.unwrap().unwrap();
    let state = wait_finished(&mut events, &TransactionKey::notification(placeholder.clone())).await;

    assert_eq!(state.phase(), TransactionPhase::Success);
    let inbox = state.result_location().unwrap();
    assert_eq!(store.mailbox_of(inbox), Some(Mailbox::Inbox));
    assert_eq!(store.mailbox_of(&placeholder), None);
    assert_eq!(store.delete_count(), 1);
    assert_eq!(transport.get_count(), 1);
}

#[tokio::test]
async fn test_repeated_push_is_ignored() {
    let store = MemoryMessageStore::new();
    let transport = ScriptedTransport::serving(retrieve_conf_text("hi"));
    let service = TransactionService::start(context(&store, transport.clone())).unwrap();
    let mut events = service.subscribe();
    let receiver = PushReceiver::new(service.clone());

    let first = receiver.handle_push(&push_bytes("N8")).await.unwrap();
    assert!(first.is_some());
    assert_eq!(receiver.handle_push(&push_bytes("N8")).await.unwrap(), None);

    events_until_idle(&mut events).await;
    assert_eq!(transport.get_count(), 1);
    assert_eq!(store.count_in(Mailbox::Inbox), 1);
}

#[tokio::test]
async fn test_push_with_download_disabled_leaves_placeholder() {
    let store = MemoryMessageStore::new();
    let transport = ScriptedTransport::serving(retrieve_conf_text("hi"));
    let ctx = context_with(
        Arc::new(store.clone()),
        transport.clone(),
        AutoDownloadSettings::new(false),
        TransactionConfig::default(),
    );
    let service = TransactionService::start(ctx).unwrap();
    let receiver = PushReceiver::new(service.clone());

    let placeholder = receiver.handle_push(&push_bytes("N9")).await.unwrap().unwrap();

    assert!(service.is_idle());
    assert_eq!(store.mailbox_of(&placeholder), Some(Mailbox::NotificationPlaceholder));
    assert_eq!(transport.get_count(), 0);
}

#[tokio::test]
async fn test_push_rejects_other_pdus() {
    let store = MemoryMessageStore::new();
    let service = TransactionService::start(context(&store, ScriptedTransport::silent())).unwrap();
    let receiver = PushReceiver::new(service);

    assert!(receiver.handle_push(&send_conf_ok()).await.is_err());
    assert!(receiver.handle_push(b"\x00\x01garbage").await.is_err());
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn test_sending_a_non_draft_fails() {
    let store = MemoryMessageStore::new();
    let sent = store.insert(None, Mailbox::Sent);
    let service = TransactionService::start(context(&store, ScriptedTransport::silent())).unwrap();

    assert!(MessageSender::new(service.clone()).send_message(&sent, 1).await.is_err());
    assert!(service.is_idle());
}

#[tokio::test]
async fn test_push_retried_after_store_failure() {
    let store = MemoryMessageStore::new();
    let faulty = FaultyStore::new(store.clone()).fail_next_persists(1);
    let transport = ScriptedTransport::serving(retrieve_conf_text("second try"));
    let ctx = context_with(
        Arc::new(faulty),
        transport.clone(),
        AutoDownloadSettings::default(),
        TransactionConfig::default(),
    );
    let service = TransactionService::start(ctx).unwrap();
    let mut events = service.subscribe();
    let receiver = PushReceiver::new(service.clone());

    assert!(receiver.handle_push(&push_bytes("TX-9")).await.is_err());
    assert_eq!(store.len(), 0);

    // The carrier re-sends the same notification
    let placeholder = receiver.handle_push(&push_bytes("TX-9")).await.unwrap().unwrap();
    let state = wait_finished(&mut events, &TransactionKey::notification(placeholder)).await;

    assert_eq!(state.phase(), TransactionPhase::Success);
    assert_eq!(store.count_in(Mailbox::Inbox), 1);
    assert_eq!(receiver.handle_push(&push_bytes("TX-9")).await.unwrap(), None);
}

#[tokio::test]
async fn test_send_after_shutdown_leaves_draft_alone() {
    let store = MemoryMessageStore::new();
    let location = draft(&store);
    let service = TransactionService::start(context(&store, ScriptedTransport::silent())).unwrap();
    service.shutdown().await;

    let result = MessageSender::new(service).send_message(&location, 3).await;

    assert!(matches!(result, Err(ServiceError::Stopped)));
    assert_eq!(store.mailbox_of(&location), Some(Mailbox::Draft));
    let Some(Pdu::SendRequest(request)) = store.stored(&location).unwrap().pdu else {
        panic!("send request missing");
    };
    assert!(request.date.is_none());
}
