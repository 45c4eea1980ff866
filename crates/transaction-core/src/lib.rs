//! # MMS transaction engine
//!
//! This crate moves multimedia messages between a local message store and a
//! carrier's MMSC over the WAP/MMS HTTP protocol, keeping each message's mailbox
//! (DRAFT → OUTBOX → SENT/FAILED, NOTIFICATION_PLACEHOLDER → INBOX) in step
//! with what the carrier actually accepted or delivered.
//!
//! ## Architecture
//!
//! ```text
//!   MessageSender ─┐                    ┌─ SendTransaction ─────────┐
//!                  ├─ TransactionService ┤                           ├─ MessageStore
//!   PushReceiver ──┘   (dispatcher)      └─ NotificationTransaction ─┤  PduCodec
//!                                                                    └─ HttpTransport
//!   SendingStrategySelector ─ DirectApi | LegacyBroadcast | TransactionEngine
//! ```
//!
//! - [`transaction`]: the lifecycle ([`TransactionState`]), the two protocol
//!   implementations and the worker that runs one attempt.
//! - [`service`]: the dispatcher. At most one transaction per
//!   `(location, kind)`, a bounded worker pool and an outer exponential retry layer.
//! - [`sender`] / [`receiver`]: glue that queues drafts and turns WAP pushes into
//!   notification transactions.
//! - [`strategy`]: ordered fallback across alternative send mechanisms.
//! - Collaborators: [`store`], [`pdu`], [`http`], [`carrier`], [`policy`].
//!
//! Transactions never raise errors to their caller. Each attempt records the
//! outcome in its state; callers observe state, events or the store.

pub mod carrier;
pub mod config;
pub mod error;
pub mod http;
pub mod mailbox;
pub mod pdu;
pub mod policy;
pub mod receiver;
pub mod sender;
pub mod service;
pub mod store;
pub mod strategy;
pub mod transaction;

pub use carrier::{CarrierConfig, StaticCarrierConfig};
pub use config::{FeatureFlags, HttpTransportConfig, SelectorConfig, TransactionConfig, MAX_RETRY_LIMIT};
pub use error::{ServiceError, ServiceResult, TransactionError, TransactionResult};
pub use http::{HttpTransport, ReqwestTransport, TransportError, TransportResult};
pub use mailbox::{Mailbox, MessageRef};
pub use pdu::{
    CodecError, NotificationIndication, Pdu, PduCodec, PduPart, RetrieveConfirmation, SendConfirmation,
    SendRequest, WapPduCodec,
};
pub use policy::{AutoDownloadPolicy, AutoDownloadSettings};
pub use receiver::PushReceiver;
pub use sender::MessageSender;
pub use service::{ServiceEvent, TransactionService};
pub use store::{MemoryMessageStore, MessageStore, MessageUpdate, StoreError};
pub use strategy::{CapabilityInfo, SendingStrategy, SendingStrategySelector};
pub use transaction::{
    Transaction, TransactionContext, TransactionKey, TransactionKind, TransactionPhase, TransactionRequest,
    TransactionState,
};
