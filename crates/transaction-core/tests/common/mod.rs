//! Shared stubs for the transaction-core integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::Level;

use rmms_infra_common::logging::{try_setup_logging, LoggingConfig};
use rmms_transaction_core::pdu::{CodecError, CodecResult};
use rmms_transaction_core::store::{StoreError, StoreResult};
use rmms_transaction_core::{
    AutoDownloadSettings, HttpTransport, Mailbox, MemoryMessageStore, MessageRef, MessageStore, MessageUpdate, Pdu,
    PduCodec, PduPart, RetrieveConfirmation, SendConfirmation, ServiceEvent, StaticCarrierConfig,
    TransactionConfig, TransactionContext, TransactionKey, TransactionState, TransportError, TransportResult,
    WapPduCodec,
};

pub const MMSC_URL: &str = "http://mmsc.example.com/mms";

pub fn init_logging() {
    let _ = try_setup_logging(LoggingConfig::new(Level::DEBUG, "transaction-core-tests"));
}

/// One scripted answer to a POST
#[derive(Debug, Clone)]
pub enum Reply {
    Bytes(Bytes),
    NoResponse,
    Error,
}

/// HTTP transport answering from a script and recording every call
#[derive(Default)]
pub struct ScriptedTransport {
    posts: Mutex<VecDeque<Reply>>,
    post_fallback: Mutex<Option<Bytes>>,
    get_reply: Mutex<Option<Bytes>>,
    post_calls: AtomicUsize,
    get_calls: AtomicUsize,
    post_times: Mutex<Vec<Instant>>,
    tokens: Mutex<Vec<u64>>,
    bodies: Mutex<Vec<Bytes>>,
    get_urls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    /// Every POST ends without a response
    pub fn silent() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every POST is answered with `body`
    pub fn answering(body: impl Into<Bytes>) -> Arc<Self> {
        let transport = Self::default();
        *transport.post_fallback.lock() = Some(body.into());
        Arc::new(transport)
    }

    /// Answers the first POSTs from `script`, then falls back to no response
    pub fn scripted(script: Vec<Reply>) -> Arc<Self> {
        let transport = Self::default();
        *transport.posts.lock() = script.into();
        Arc::new(transport)
    }

    /// Every GET returns `body`
    pub fn serving(body: impl Into<Bytes>) -> Arc<Self> {
        let transport = Self::default();
        *transport.get_reply.lock() = Some(body.into());
        Arc::new(transport)
    }

    pub fn post_count(&self) -> usize {
        self.post_calls.load(Ordering::SeqCst)
    }

    pub fn get_count(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn post_times(&self) -> Vec<Instant> {
        self.post_times.lock().clone()
    }

    pub fn tokens(&self) -> Vec<u64> {
        self.tokens.lock().clone()
    }

    pub fn bodies(&self) -> Vec<Bytes> {
        self.bodies.lock().clone()
    }

    pub fn get_urls(&self) -> Vec<String> {
        self.get_urls.lock().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn post(&self, _url: &str, body: Bytes, _content_type: &str, token: u64) -> TransportResult<Option<Bytes>> {
        self.post_calls.fetch_add(1, Ordering::SeqCst);
        self.post_times.lock().push(Instant::now());
        self.tokens.lock().push(token);
        self.bodies.lock().push(body);

        let scripted = self.posts.lock().pop_front();
        match scripted {
            Some(Reply::Bytes(body)) => Ok(Some(body)),
            Some(Reply::NoResponse) => Ok(None),
            Some(Reply::Error) => Err(TransportError::Request("connection reset".to_string())),
            None => Ok(self.post_fallback.lock().clone()),
        }
    }

    async fn get(&self, url: &str) -> TransportResult<Option<Bytes>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.get_urls.lock().push(url.to_string());
        Ok(self.get_reply.lock().clone())
    }
}

/// Codec whose `compose` always fails
#[derive(Debug, Default)]
pub struct BrokenComposer;

impl PduCodec for BrokenComposer {
    fn compose(&self, _pdu: &Pdu) -> CodecResult<Bytes> {
        Err(CodecError::InvalidValue {
            field: "content type",
            reason: "unsupported".to_string(),
        })
    }

    fn parse(&self, data: &[u8]) -> CodecResult<Pdu> {
        WapPduCodec::new().parse(data)
    }
}

/// Store wrapper that fails selected operations
#[derive(Clone, Default)]
pub struct FaultyStore {
    pub inner: MemoryMessageStore,
    pub fail_load: bool,
    pub fail_persist: bool,
    pub fail_delete: bool,
    pub fail_update: bool,
    /// Moves into this mailbox fail
    pub fail_move_into: Option<Mailbox>,
    /// Persists still to fail before `persist` recovers
    pub persist_failures: Arc<AtomicUsize>,
}

impl FaultyStore {
    pub fn new(inner: MemoryMessageStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    /// Fail the next `count` persists, then behave normally
    pub fn fail_next_persists(self, count: usize) -> Self {
        self.persist_failures.store(count, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl MessageStore for FaultyStore {
    async fn load(&self, location: &MessageRef) -> StoreResult<Option<Pdu>> {
        if self.fail_load {
            return Err(StoreError::backend("disk I/O error"));
        }
        self.inner.load(location).await
    }

    async fn persist(&self, pdu: &Pdu, mailbox: Mailbox, as_text: bool) -> StoreResult<MessageRef> {
        let transient = self
            .persist_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if self.fail_persist || transient {
            return Err(StoreError::backend("database is locked"));
        }
        self.inner.persist(pdu, mailbox, as_text).await
    }

    async fn move_to(&self, location: &MessageRef, dest: Mailbox) -> StoreResult<MessageRef> {
        if self.fail_move_into == Some(dest) {
            return Err(StoreError::backend("database is locked"));
        }
        self.inner.move_to(location, dest).await
    }

    async fn delete(&self, location: &MessageRef) -> StoreResult<()> {
        if self.fail_delete {
            return Err(StoreError::backend("database is locked"));
        }
        self.inner.delete(location).await
    }

    async fn update(&self, location: &MessageRef, update: &MessageUpdate) -> StoreResult<()> {
        if self.fail_update {
            return Err(StoreError::backend("database is locked"));
        }
        self.inner.update(location, update).await
    }
}

pub fn context_with(
    store: Arc<dyn MessageStore>,
    http: Arc<dyn HttpTransport>,
    policy: AutoDownloadSettings,
    config: TransactionConfig,
) -> TransactionContext {
    TransactionContext::builder()
        .store(store)
        .http(http)
        .carrier(Arc::new(StaticCarrierConfig::new(MMSC_URL).with_line_number("+15550001111")))
        .policy(Arc::new(policy))
        .config(config)
        .build()
        .expect("valid context")
}

pub fn context(store: &MemoryMessageStore, http: Arc<dyn HttpTransport>) -> TransactionContext {
    context_with(
        Arc::new(store.clone()),
        http,
        AutoDownloadSettings::default(),
        TransactionConfig::default(),
    )
}

pub fn send_conf_ok() -> Bytes {
    WapPduCodec::new()
        .compose(&Pdu::SendConfirmation(SendConfirmation::ok("T1")))
        .expect("compose m-send-conf")
}

pub fn retrieve_conf_text(body: &str) -> Bytes {
    let conf = RetrieveConfirmation {
        transaction_id: Some("T9".to_string()),
        message_id: Some("M9".to_string()),
        from: Some("+15550002222".to_string()),
        subject: Some("hello".to_string()),
        parts: vec![PduPart::text(body)],
        ..Default::default()
    };
    WapPduCodec::new()
        .compose(&Pdu::RetrieveConfirmation(conf))
        .expect("compose m-retrieve-conf")
}

/// Wait (in virtual time when paused) for the key's `Finished` event
pub async fn wait_finished(events: &mut broadcast::Receiver<ServiceEvent>, key: &TransactionKey) -> TransactionState {
    tokio::time::timeout(Duration::from_secs(3600), async {
        loop {
            match events.recv().await {
                Ok(ServiceEvent::Finished { key: finished, state }) if &finished == key => return state,
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event stream closed"),
            }
        }
    })
    .await
    .expect("transaction finished in time")
}

/// Collect events until the dispatcher reports idle
pub async fn events_until_idle(events: &mut broadcast::Receiver<ServiceEvent>) -> Vec<ServiceEvent> {
    tokio::time::timeout(Duration::from_secs(3600), async {
        let mut seen = Vec::new();
        loop {
            match events.recv().await {
                Ok(ServiceEvent::Idle) => return seen,
                Ok(event) => seen.push(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event stream closed"),
            }
        }
    })
    .await
    .expect("dispatcher went idle in time")
}
