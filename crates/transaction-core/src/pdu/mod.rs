//! MMS protocol data units
//!
//! Typed views of the four PDUs the transaction engine exchanges with an MMSC.
//! They are plain data; [`PduCodec`] turns them into wire bytes and back.
//!
//! | PDU | Direction | Used by |
//! |-----|-----------|---------|
//! | [`SendRequest`] | phone → MMSC | send transaction |
//! | [`SendConfirmation`] | MMSC → phone | send transaction |
//! | [`NotificationIndication`] | MMSC → phone (WAP push) | push receiver, notification transaction |
//! | [`RetrieveConfirmation`] | MMSC → phone | notification transaction |

pub mod codec;
pub mod headers;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;

pub use codec::{CodecError, CodecResult, PduCodec, WapPduCodec};

/// X-Mms-Priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn code(&self) -> u8 {
        match self {
            Priority::Low => headers::PRIORITY_LOW,
            Priority::Normal => headers::PRIORITY_NORMAL,
            Priority::High => headers::PRIORITY_HIGH,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            headers::PRIORITY_LOW => Some(Priority::Low),
            headers::PRIORITY_NORMAL => Some(Priority::Normal),
            headers::PRIORITY_HIGH => Some(Priority::High),
            _ => None,
        }
    }
}

/// X-Mms-Message-Class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageClass {
    #[default]
    Personal,
    Advertisement,
    Informational,
    Auto,
}

impl MessageClass {
    pub fn code(&self) -> u8 {
        match self {
            MessageClass::Personal => headers::MESSAGE_CLASS_PERSONAL,
            MessageClass::Advertisement => headers::MESSAGE_CLASS_ADVERTISEMENT,
            MessageClass::Informational => headers::MESSAGE_CLASS_INFORMATIONAL,
            MessageClass::Auto => headers::MESSAGE_CLASS_AUTO,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            headers::MESSAGE_CLASS_PERSONAL => Some(MessageClass::Personal),
            headers::MESSAGE_CLASS_ADVERTISEMENT => Some(MessageClass::Advertisement),
            headers::MESSAGE_CLASS_INFORMATIONAL => Some(MessageClass::Informational),
            headers::MESSAGE_CLASS_AUTO => Some(MessageClass::Auto),
            _ => None,
        }
    }
}

/// X-Mms-Response-Status of a send confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Ok,
    ErrorUnspecified,
    ServiceDenied,
    MessageFormatCorrupt,
    SendingAddressUnresolved,
    MessageNotFound,
    NetworkProblem,
    ContentNotAccepted,
    UnsupportedMessage,
    /// A code outside the 1.2 table; carriers do send these
    Other(u8),
}

impl ResponseStatus {
    pub fn code(&self) -> u8 {
        match self {
            ResponseStatus::Ok => headers::RESPONSE_STATUS_OK,
            ResponseStatus::ErrorUnspecified => headers::RESPONSE_STATUS_ERROR_UNSPECIFIED,
            ResponseStatus::ServiceDenied => headers::RESPONSE_STATUS_ERROR_SERVICE_DENIED,
            ResponseStatus::MessageFormatCorrupt => headers::RESPONSE_STATUS_ERROR_MESSAGE_FORMAT_CORRUPT,
            ResponseStatus::SendingAddressUnresolved => headers::RESPONSE_STATUS_ERROR_SENDING_ADDRESS_UNRESOLVED,
            ResponseStatus::MessageNotFound => headers::RESPONSE_STATUS_ERROR_MESSAGE_NOT_FOUND,
            ResponseStatus::NetworkProblem => headers::RESPONSE_STATUS_ERROR_NETWORK_PROBLEM,
            ResponseStatus::ContentNotAccepted => headers::RESPONSE_STATUS_ERROR_CONTENT_NOT_ACCEPTED,
            ResponseStatus::UnsupportedMessage => headers::RESPONSE_STATUS_ERROR_UNSUPPORTED_MESSAGE,
            ResponseStatus::Other(code) => *code,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            headers::RESPONSE_STATUS_OK => ResponseStatus::Ok,
            headers::RESPONSE_STATUS_ERROR_UNSPECIFIED => ResponseStatus::ErrorUnspecified,
            headers::RESPONSE_STATUS_ERROR_SERVICE_DENIED => ResponseStatus::ServiceDenied,
            headers::RESPONSE_STATUS_ERROR_MESSAGE_FORMAT_CORRUPT => ResponseStatus::MessageFormatCorrupt,
            headers::RESPONSE_STATUS_ERROR_SENDING_ADDRESS_UNRESOLVED => ResponseStatus::SendingAddressUnresolved,
            headers::RESPONSE_STATUS_ERROR_MESSAGE_NOT_FOUND => ResponseStatus::MessageNotFound,
            headers::RESPONSE_STATUS_ERROR_NETWORK_PROBLEM => ResponseStatus::NetworkProblem,
            headers::RESPONSE_STATUS_ERROR_CONTENT_NOT_ACCEPTED => ResponseStatus::ContentNotAccepted,
            headers::RESPONSE_STATUS_ERROR_UNSUPPORTED_MESSAGE => ResponseStatus::UnsupportedMessage,
            other => ResponseStatus::Other(other),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ResponseStatus::Ok)
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.code())
    }
}

/// One body part of a multipart message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PduPart {
    pub content_type: String,
    pub data: Bytes,
}

impl PduPart {
    pub fn new(content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// A `text/plain` part
    pub fn text(body: impl Into<String>) -> Self {
        Self::new("text/plain", Bytes::from(body.into()))
    }

    pub fn is_text(&self) -> bool {
        self.content_type.starts_with("text/")
    }
}

/// M-Send.req
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub transaction_id: String,
    pub from: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub date: Option<DateTime<Utc>>,
    pub subject: Option<String>,
    /// Relative expiry in seconds
    pub expiry: Option<u64>,
    pub priority: Priority,
    pub delivery_report: bool,
    pub read_report: bool,
    pub message_class: MessageClass,
    pub content_type: String,
    pub parts: Vec<PduPart>,
}

impl SendRequest {
    pub fn new(transaction_id: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            from: None,
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            date: None,
            subject: None,
            expiry: None,
            priority: Priority::Normal,
            delivery_report: false,
            read_report: false,
            message_class: MessageClass::Personal,
            content_type: headers::MULTIPART_MIXED.to_string(),
            parts: Vec::new(),
        }
    }

    /// Minimal request used when the store holds no PDU for a queued message
    pub fn synthesized() -> Self {
        Self::new(format!("T{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn with_recipient(mut self, address: impl Into<String>) -> Self {
        self.to.push(address.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_part(mut self, part: PduPart) -> Self {
        self.parts.push(part);
        self
    }
}

/// M-Send.conf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendConfirmation {
    pub transaction_id: Option<String>,
    pub message_id: Option<String>,
    pub response_status: ResponseStatus,
}

impl SendConfirmation {
    pub fn ok(transaction_id: impl Into<String>) -> Self {
        Self {
            transaction_id: Some(transaction_id.into()),
            message_id: None,
            response_status: ResponseStatus::Ok,
        }
    }
}

/// M-Notification.ind, delivered by WAP push
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationIndication {
    pub transaction_id: String,
    pub content_location: Option<String>,
    pub message_size: Option<u64>,
    /// Relative expiry in seconds
    pub expiry: Option<u64>,
    pub from: Option<String>,
    pub subject: Option<String>,
    pub message_class: Option<MessageClass>,
}

impl NotificationIndication {
    pub fn new(transaction_id: impl Into<String>, content_location: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            content_location: Some(content_location.into()),
            message_size: None,
            expiry: None,
            from: None,
            subject: None,
            message_class: None,
        }
    }
}

/// M-Retrieve.conf
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RetrieveConfirmation {
    pub transaction_id: Option<String>,
    pub message_id: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub from: Option<String>,
    pub to: Vec<String>,
    pub subject: Option<String>,
    pub priority: Priority,
    pub content_type: Option<String>,
    pub parts: Vec<PduPart>,
}

impl RetrieveConfirmation {
    /// True when every part is text; such messages are stored as plain text
    pub fn is_text_only(&self) -> bool {
        !self.parts.is_empty() && self.parts.iter().all(PduPart::is_text)
    }
}

/// Any PDU the engine handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pdu {
    SendRequest(SendRequest),
    SendConfirmation(SendConfirmation),
    NotificationIndication(NotificationIndication),
    RetrieveConfirmation(RetrieveConfirmation),
}

impl Pdu {
    /// X-Mms-Message-Type code
    pub fn message_type(&self) -> u8 {
        match self {
            Pdu::SendRequest(_) => headers::MESSAGE_TYPE_SEND_REQ,
            Pdu::SendConfirmation(_) => headers::MESSAGE_TYPE_SEND_CONF,
            Pdu::NotificationIndication(_) => headers::MESSAGE_TYPE_NOTIFICATION_IND,
            Pdu::RetrieveConfirmation(_) => headers::MESSAGE_TYPE_RETRIEVE_CONF,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Pdu::SendRequest(_) => "m-send-req",
            Pdu::SendConfirmation(_) => "m-send-conf",
            Pdu::NotificationIndication(_) => "m-notification-ind",
            Pdu::RetrieveConfirmation(_) => "m-retrieve-conf",
        }
    }
}

impl From<SendRequest> for Pdu {
    fn from(req: SendRequest) -> Self {
        Pdu::SendRequest(req)
    }
}

impl From<SendConfirmation> for Pdu {
    fn from(conf: SendConfirmation) -> Self {
        Pdu::SendConfirmation(conf)
    }
}

impl From<NotificationIndication> for Pdu {
    fn from(ind: NotificationIndication) -> Self {
        Pdu::NotificationIndication(ind)
    }
}

impl From<RetrieveConfirmation> for Pdu {
    fn from(conf: RetrieveConfirmation) -> Self {
        Pdu::RetrieveConfirmation(conf)
    }
}
