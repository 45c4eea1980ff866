//! Binary encoding of MMS PDUs
//!
//! [`WapPduCodec`] implements the header subset the engine needs from the WAP
//! MMS encapsulation: short and long integers, text strings, value-length
//! wrapped `From`/`Expiry` values, `Content-Type` and a uintvar-framed multipart
//! body. Headers it does not model are skipped using the generic WSP value
//! rules so carrier extensions do not break parsing.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{TimeZone, Utc};
use thiserror::Error;

use super::headers as h;
use super::{
    MessageClass, NotificationIndication, Pdu, PduPart, Priority, ResponseStatus,
    RetrieveConfirmation, SendConfirmation, SendRequest,
};

/// Errors raised while encoding or decoding a PDU
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("empty PDU")]
    Empty,

    #[error("truncated PDU: need {required} bytes, {available} available")]
    Truncated { required: usize, available: usize },

    #[error("PDU does not start with a message type header")]
    MissingMessageType,

    #[error("unsupported message type 0x{0:02X}")]
    UnknownMessageType(u8),

    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl CodecError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        CodecError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Converts PDUs to and from wire bytes
pub trait PduCodec: Send + Sync {
    /// Encode a PDU
    fn compose(&self, pdu: &Pdu) -> CodecResult<Bytes>;

    /// Decode a PDU
    fn parse(&self, data: &[u8]) -> CodecResult<Pdu>;
}

/// WAP binary codec for the supported header subset
#[derive(Debug, Clone, Copy, Default)]
pub struct WapPduCodec;

impl WapPduCodec {
    pub fn new() -> Self {
        Self
    }
}

impl PduCodec for WapPduCodec {
    fn compose(&self, pdu: &Pdu) -> CodecResult<Bytes> {
        let mut buf = BytesMut::with_capacity(256);
        buf.put_u8(h::MESSAGE_TYPE);
        buf.put_u8(pdu.message_type());

        match pdu {
            Pdu::SendRequest(req) => encode_send_request(&mut buf, req)?,
            Pdu::SendConfirmation(conf) => encode_send_confirmation(&mut buf, conf)?,
            Pdu::NotificationIndication(ind) => encode_notification(&mut buf, ind)?,
            Pdu::RetrieveConfirmation(conf) => encode_retrieve_confirmation(&mut buf, conf)?,
        }

        Ok(buf.freeze())
    }

    fn parse(&self, data: &[u8]) -> CodecResult<Pdu> {
        if data.is_empty() {
            return Err(CodecError::Empty);
        }

        let mut buf = data;
        if get_u8(&mut buf)? != h::MESSAGE_TYPE {
            return Err(CodecError::MissingMessageType);
        }
        let message_type = get_u8(&mut buf)?;

        match message_type {
            h::MESSAGE_TYPE_SEND_REQ => {
                let headers = HeaderSet::decode(&mut buf, true)?;
                let parts = decode_body(&mut buf, headers.content_type.as_deref())?;
                Ok(Pdu::SendRequest(headers.into_send_request(parts)))
            }
            h::MESSAGE_TYPE_SEND_CONF => {
                let headers = HeaderSet::decode(&mut buf, false)?;
                Ok(Pdu::SendConfirmation(headers.into_send_confirmation()))
            }
            h::MESSAGE_TYPE_NOTIFICATION_IND => {
                let headers = HeaderSet::decode(&mut buf, false)?;
                Ok(Pdu::NotificationIndication(headers.into_notification()))
            }
            h::MESSAGE_TYPE_RETRIEVE_CONF => {
                let headers = HeaderSet::decode(&mut buf, true)?;
                let parts = decode_body(&mut buf, headers.content_type.as_deref())?;
                Ok(Pdu::RetrieveConfirmation(headers.into_retrieve_confirmation(parts)))
            }
            other => Err(CodecError::UnknownMessageType(other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

const QUOTE: u8 = 0x7F;
const LENGTH_QUOTE: u8 = 0x1F;

fn encode_send_request(buf: &mut BytesMut, req: &SendRequest) -> CodecResult<()> {
    put_text_header(buf, h::TRANSACTION_ID, "transaction id", &req.transaction_id)?;
    put_version(buf);
    if let Some(date) = req.date {
        let secs = u64::try_from(date.timestamp())
            .map_err(|_| CodecError::invalid("date", "before the epoch"))?;
        buf.put_u8(h::DATE);
        put_long_integer(buf, secs);
    }
    put_from(buf, req.from.as_deref())?;
    for address in &req.to {
        put_text_header(buf, h::TO, "to", address)?;
    }
    for address in &req.cc {
        put_text_header(buf, h::CC, "cc", address)?;
    }
    for address in &req.bcc {
        put_text_header(buf, h::BCC, "bcc", address)?;
    }
    if let Some(subject) = &req.subject {
        put_text_header(buf, h::SUBJECT, "subject", subject)?;
    }
    buf.put_u8(h::MESSAGE_CLASS);
    buf.put_u8(req.message_class.code());
    if let Some(expiry) = req.expiry {
        put_relative_expiry(buf, expiry);
    }
    buf.put_u8(h::PRIORITY);
    buf.put_u8(req.priority.code());
    buf.put_u8(h::DELIVERY_REPORT);
    buf.put_u8(yes_no(req.delivery_report));
    buf.put_u8(h::READ_REPORT);
    buf.put_u8(yes_no(req.read_report));

    // Content-Type is always the last header; the body follows it
    put_text_header(buf, h::CONTENT_TYPE, "content type", &req.content_type)?;
    encode_body(buf, &req.content_type, &req.parts)
}

fn encode_send_confirmation(buf: &mut BytesMut, conf: &SendConfirmation) -> CodecResult<()> {
    if let Some(id) = &conf.transaction_id {
        put_text_header(buf, h::TRANSACTION_ID, "transaction id", id)?;
    }
    put_version(buf);
    buf.put_u8(h::RESPONSE_STATUS);
    buf.put_u8(conf.response_status.code());
    if let Some(id) = &conf.message_id {
        put_text_header(buf, h::MESSAGE_ID, "message id", id)?;
    }
    Ok(())
}

fn encode_notification(buf: &mut BytesMut, ind: &NotificationIndication) -> CodecResult<()> {
    put_text_header(buf, h::TRANSACTION_ID, "transaction id", &ind.transaction_id)?;
    put_version(buf);
    if ind.from.is_some() {
        put_from(buf, ind.from.as_deref())?;
    }
    if let Some(subject) = &ind.subject {
        put_text_header(buf, h::SUBJECT, "subject", subject)?;
    }
    if let Some(class) = ind.message_class {
        buf.put_u8(h::MESSAGE_CLASS);
        buf.put_u8(class.code());
    }
    if let Some(size) = ind.message_size {
        buf.put_u8(h::MESSAGE_SIZE);
        put_long_integer(buf, size);
    }
    if let Some(expiry) = ind.expiry {
        put_relative_expiry(buf, expiry);
    }
    if let Some(location) = &ind.content_location {
        put_text_header(buf, h::CONTENT_LOCATION, "content location", location)?;
    }
    Ok(())
}

fn encode_retrieve_confirmation(buf: &mut BytesMut, conf: &RetrieveConfirmation) -> CodecResult<()> {
    if let Some(id) = &conf.transaction_id {
        put_text_header(buf, h::TRANSACTION_ID, "transaction id", id)?;
    }
    put_version(buf);
    if let Some(id) = &conf.message_id {
        put_text_header(buf, h::MESSAGE_ID, "message id", id)?;
    }
    if let Some(date) = conf.date {
        let secs = u64::try_from(date.timestamp())
            .map_err(|_| CodecError::invalid("date", "before the epoch"))?;
        buf.put_u8(h::DATE);
        put_long_integer(buf, secs);
    }
    if conf.from.is_some() {
        put_from(buf, conf.from.as_deref())?;
    }
    for address in &conf.to {
        put_text_header(buf, h::TO, "to", address)?;
    }
    if let Some(subject) = &conf.subject {
        put_text_header(buf, h::SUBJECT, "subject", subject)?;
    }
    buf.put_u8(h::PRIORITY);
    buf.put_u8(conf.priority.code());

    let content_type = conf.content_type.as_deref().unwrap_or(h::MULTIPART_MIXED);
    put_text_header(buf, h::CONTENT_TYPE, "content type", content_type)?;
    encode_body(buf, content_type, &conf.parts)
}

fn encode_body(buf: &mut BytesMut, content_type: &str, parts: &[PduPart]) -> CodecResult<()> {
    if !is_multipart(content_type) {
        // Single-part message: the body is the first part's data verbatim
        if let Some(part) = parts.first() {
            buf.put_slice(&part.data);
        }
        return Ok(());
    }

    put_uintvar(buf, parts.len() as u64);
    for part in parts {
        let mut part_headers = BytesMut::new();
        put_text(&mut part_headers, "part content type", &part.content_type)?;

        put_uintvar(buf, part_headers.len() as u64);
        put_uintvar(buf, part.data.len() as u64);
        buf.put_slice(&part_headers);
        buf.put_slice(&part.data);
    }
    Ok(())
}

fn put_version(buf: &mut BytesMut) {
    buf.put_u8(h::MMS_VERSION);
    buf.put_u8(h::CURRENT_MMS_VERSION | 0x80);
}

fn put_from(buf: &mut BytesMut, from: Option<&str>) -> CodecResult<()> {
    let mut value = BytesMut::new();
    match from {
        Some(address) => {
            value.put_u8(h::FROM_ADDRESS_PRESENT_TOKEN);
            put_text(&mut value, "from", address)?;
        }
        None => value.put_u8(h::FROM_INSERT_ADDRESS_TOKEN),
    }
    buf.put_u8(h::FROM);
    put_value_length(buf, value.len());
    buf.put_slice(&value);
    Ok(())
}

fn put_relative_expiry(buf: &mut BytesMut, seconds: u64) {
    let mut value = BytesMut::new();
    value.put_u8(h::TIME_TOKEN_RELATIVE);
    put_long_integer(&mut value, seconds);
    buf.put_u8(h::EXPIRY);
    put_value_length(buf, value.len());
    buf.put_slice(&value);
}

fn put_text_header(buf: &mut BytesMut, code: u8, field: &'static str, text: &str) -> CodecResult<()> {
    buf.put_u8(code);
    put_text(buf, field, text)
}

/// Text-string: optional quote, bytes, NUL terminator
fn put_text(buf: &mut BytesMut, field: &'static str, text: &str) -> CodecResult<()> {
    let bytes = text.as_bytes();
    if bytes.contains(&0) {
        return Err(CodecError::invalid(field, "contains a NUL byte"));
    }
    if bytes.first().is_some_and(|b| *b >= 0x80) {
        buf.put_u8(QUOTE);
    }
    buf.put_slice(bytes);
    buf.put_u8(0);
    Ok(())
}

/// Long-integer: short length followed by big-endian octets
fn put_long_integer(buf: &mut BytesMut, value: u64) {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count().min(bytes.len() - 1);
    let significant = &bytes[skip..];
    buf.put_u8(significant.len() as u8);
    buf.put_slice(significant);
}

/// Uintvar: 7 bits per octet, most significant group first
fn put_uintvar(buf: &mut BytesMut, value: u64) {
    let mut groups = [0u8; 10];
    let mut count = 0;
    let mut rest = value;
    loop {
        groups[count] = (rest & 0x7F) as u8;
        count += 1;
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }
    for i in (0..count).rev() {
        let continuation = if i == 0 { 0 } else { 0x80 };
        buf.put_u8(groups[i] | continuation);
    }
}

fn put_value_length(buf: &mut BytesMut, len: usize) {
    if len < LENGTH_QUOTE as usize {
        buf.put_u8(len as u8);
    } else {
        buf.put_u8(LENGTH_QUOTE);
        put_uintvar(buf, len as u64);
    }
}

fn yes_no(flag: bool) -> u8 {
    if flag {
        h::VALUE_YES
    } else {
        h::VALUE_NO
    }
}

fn is_multipart(content_type: &str) -> bool {
    content_type.starts_with("application/vnd.wap.multipart") || content_type.starts_with("multipart/")
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Every header the engine understands, collected before building a typed PDU
#[derive(Debug, Default)]
struct HeaderSet {
    transaction_id: Option<String>,
    message_id: Option<String>,
    from: Option<String>,
    to: Vec<String>,
    cc: Vec<String>,
    bcc: Vec<String>,
    date: Option<u64>,
    subject: Option<String>,
    expiry: Option<u64>,
    priority: Option<Priority>,
    delivery_report: Option<bool>,
    read_report: Option<bool>,
    message_class: Option<MessageClass>,
    response_status: Option<ResponseStatus>,
    content_location: Option<String>,
    message_size: Option<u64>,
    content_type: Option<String>,
}

impl HeaderSet {
    /// Read headers until the end of input, or until `Content-Type` when a body follows.
    fn decode(buf: &mut &[u8], body_follows: bool) -> CodecResult<Self> {
        let mut headers = HeaderSet::default();

        while buf.has_remaining() {
            let field = buf[0];
            if field < 0x80 {
                // Application header: token-text name and text value
                let name = get_text(buf)?;
                skip_value(buf)?;
                tracing::trace!(header = %name, "Skipping application header");
                continue;
            }
            buf.advance(1);

            match field {
                h::TRANSACTION_ID => headers.transaction_id = Some(get_text(buf)?),
                h::MESSAGE_ID => headers.message_id = Some(get_text(buf)?),
                h::MMS_VERSION => {
                    get_integer(buf, "mms version")?;
                }
                h::FROM => headers.from = get_from(buf)?,
                h::TO => headers.to.push(get_encoded_string(buf, "to")?),
                h::CC => headers.cc.push(get_encoded_string(buf, "cc")?),
                h::BCC => headers.bcc.push(get_encoded_string(buf, "bcc")?),
                h::DATE => headers.date = Some(get_long_integer(buf, "date")?),
                h::SUBJECT => headers.subject = Some(get_encoded_string(buf, "subject")?),
                h::EXPIRY => headers.expiry = Some(get_expiry(buf)?),
                h::PRIORITY => headers.priority = Priority::from_code(get_u8(buf)?),
                h::DELIVERY_REPORT => headers.delivery_report = Some(get_u8(buf)? == h::VALUE_YES),
                h::READ_REPORT => headers.read_report = Some(get_u8(buf)? == h::VALUE_YES),
                h::MESSAGE_CLASS => headers.message_class = get_message_class(buf)?,
                h::RESPONSE_STATUS => {
                    headers.response_status = Some(ResponseStatus::from_code(get_u8(buf)?))
                }
                h::CONTENT_LOCATION => headers.content_location = Some(get_text(buf)?),
                h::MESSAGE_SIZE => headers.message_size = Some(get_long_integer(buf, "message size")?),
                h::CONTENT_TYPE => {
                    headers.content_type = Some(get_content_type(buf)?);
                    if body_follows {
                        break;
                    }
                }
                other => {
                    tracing::trace!(field = h::field_name(other), code = other, "Skipping header");
                    skip_value(buf)?;
                }
            }
        }

        Ok(headers)
    }

    fn into_send_request(self, parts: Vec<PduPart>) -> SendRequest {
        let mut req = SendRequest::new(self.transaction_id.unwrap_or_default());
        req.from = self.from;
        req.to = self.to;
        req.cc = self.cc;
        req.bcc = self.bcc;
        req.date = self.date.and_then(timestamp);
        req.subject = self.subject;
        req.expiry = self.expiry;
        req.priority = self.priority.unwrap_or_default();
        req.delivery_report = self.delivery_report.unwrap_or(false);
        req.read_report = self.read_report.unwrap_or(false);
        req.message_class = self.message_class.unwrap_or_default();
        if let Some(content_type) = self.content_type {
            req.content_type = content_type;
        }
        req.parts = parts;
        req
    }

    fn into_send_confirmation(self) -> SendConfirmation {
        SendConfirmation {
            transaction_id: self.transaction_id,
            message_id: self.message_id,
            // A confirmation without a status is treated as unspecified failure
            response_status: self.response_status.unwrap_or(ResponseStatus::ErrorUnspecified),
        }
    }

    fn into_notification(self) -> NotificationIndication {
        NotificationIndication {
            transaction_id: self.transaction_id.unwrap_or_default(),
            content_location: self.content_location,
            message_size: self.message_size,
            expiry: self.expiry,
            from: self.from,
            subject: self.subject,
            message_class: self.message_class,
        }
    }

    fn into_retrieve_confirmation(self, parts: Vec<PduPart>) -> RetrieveConfirmation {
        RetrieveConfirmation {
            transaction_id: self.transaction_id,
            message_id: self.message_id,
            date: self.date.and_then(timestamp),
            from: self.from,
            to: self.to,
            subject: self.subject,
            priority: self.priority.unwrap_or_default(),
            content_type: self.content_type,
            parts,
        }
    }
}

fn timestamp(secs: u64) -> Option<chrono::DateTime<Utc>> {
    let secs = i64::try_from(secs).ok()?;
    Utc.timestamp_opt(secs, 0).single()
}

fn decode_body(buf: &mut &[u8], content_type: Option<&str>) -> CodecResult<Vec<PduPart>> {
    if !buf.has_remaining() {
        return Ok(Vec::new());
    }

    let content_type = content_type.unwrap_or(h::MULTIPART_MIXED);
    if !is_multipart(content_type) {
        let data = Bytes::copy_from_slice(buf);
        let len = buf.len();
        buf.advance(len);
        return Ok(vec![PduPart::new(content_type, data)]);
    }

    let count = get_uintvar(buf)?;
    let mut parts = Vec::with_capacity(count.min(64) as usize);
    for _ in 0..count {
        let headers_len = get_uintvar(buf)? as usize;
        let data_len = get_uintvar(buf)? as usize;

        ensure(buf, headers_len)?;
        let whole: &[u8] = *buf;
        let (mut part_headers, rest) = whole.split_at(headers_len);
        *buf = rest;
        let part_type = if part_headers.has_remaining() {
            get_content_type(&mut part_headers)?
        } else {
            "application/octet-stream".to_string()
        };

        ensure(buf, data_len)?;
        let data = Bytes::copy_from_slice(&buf[..data_len]);
        buf.advance(data_len);

        parts.push(PduPart::new(part_type, data));
    }
    Ok(parts)
}

fn ensure(buf: &&[u8], required: usize) -> CodecResult<()> {
    if buf.remaining() < required {
        return Err(CodecError::Truncated {
            required,
            available: buf.remaining(),
        });
    }
    Ok(())
}

fn get_u8(buf: &mut &[u8]) -> CodecResult<u8> {
    ensure(buf, 1)?;
    Ok(buf.get_u8())
}

fn peek(buf: &&[u8]) -> CodecResult<u8> {
    buf.first().copied().ok_or(CodecError::Truncated {
        required: 1,
        available: 0,
    })
}

fn get_text(buf: &mut &[u8]) -> CodecResult<String> {
    let end = buf.iter().position(|b| *b == 0).ok_or(CodecError::Truncated {
        required: buf.len() + 1,
        available: buf.len(),
    })?;
    let mut raw = &buf[..end];
    if raw.first() == Some(&QUOTE) {
        raw = &raw[1..];
    }
    let text = String::from_utf8_lossy(raw).into_owned();
    buf.advance(end + 1);
    Ok(text)
}

fn get_long_integer(buf: &mut &[u8], field: &'static str) -> CodecResult<u64> {
    let len = get_u8(buf)? as usize;
    if len == 0 || len > 8 {
        return Err(CodecError::invalid(field, format!("long integer of {} octets", len)));
    }
    ensure(buf, len)?;
    let value = buf[..len].iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    buf.advance(len);
    Ok(value)
}

/// Integer-value: a short integer or a long integer
fn get_integer(buf: &mut &[u8], field: &'static str) -> CodecResult<u64> {
    let first = peek(buf)?;
    if first >= 0x80 {
        buf.advance(1);
        Ok(u64::from(first & 0x7F))
    } else {
        get_long_integer(buf, field)
    }
}

fn get_uintvar(buf: &mut &[u8]) -> CodecResult<u64> {
    let mut value = 0u64;
    for _ in 0..5 {
        let b = get_u8(buf)?;
        value = (value << 7) | u64::from(b & 0x7F);
        if b & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(CodecError::invalid("uintvar", "longer than 5 octets"))
}

fn get_value_length(buf: &mut &[u8]) -> CodecResult<usize> {
    let first = get_u8(buf)?;
    match first {
        0..=30 => Ok(first as usize),
        LENGTH_QUOTE => Ok(get_uintvar(buf)? as usize),
        other => Err(CodecError::invalid("value length", format!("0x{:02X}", other))),
    }
}

/// Split off a value-length prefixed value
fn take_value<'a>(buf: &mut &'a [u8]) -> CodecResult<&'a [u8]> {
    let len = get_value_length(buf)?;
    ensure(buf, len)?;
    let whole: &'a [u8] = *buf;
    let (value, rest) = whole.split_at(len);
    *buf = rest;
    Ok(value)
}

/// Encoded-string-value: a text string, or value-length + charset + text
fn get_encoded_string(buf: &mut &[u8], field: &'static str) -> CodecResult<String> {
    if peek(buf)? <= LENGTH_QUOTE {
        let mut value = take_value(buf)?;
        get_integer(&mut value, field)?;
        get_text(&mut value)
    } else {
        get_text(buf)
    }
}

fn get_from(buf: &mut &[u8]) -> CodecResult<Option<String>> {
    let mut value = take_value(buf)?;
    match get_u8(&mut value)? {
        h::FROM_ADDRESS_PRESENT_TOKEN => Ok(Some(get_encoded_string(&mut value, "from")?)),
        h::FROM_INSERT_ADDRESS_TOKEN => Ok(None),
        other => Err(CodecError::invalid("from", format!("token 0x{:02X}", other))),
    }
}

/// Expiry as relative seconds; absolute dates are converted against the current time
fn get_expiry(buf: &mut &[u8]) -> CodecResult<u64> {
    let mut value = take_value(buf)?;
    let token = get_u8(&mut value)?;
    let seconds = get_long_integer(&mut value, "expiry")?;
    match token {
        h::TIME_TOKEN_RELATIVE => Ok(seconds),
        h::TIME_TOKEN_ABSOLUTE => {
            let now = Utc::now().timestamp().max(0) as u64;
            Ok(seconds.saturating_sub(now))
        }
        other => Err(CodecError::invalid("expiry", format!("token 0x{:02X}", other))),
    }
}

fn get_message_class(buf: &mut &[u8]) -> CodecResult<Option<MessageClass>> {
    if peek(buf)? >= 0x80 {
        Ok(MessageClass::from_code(get_u8(buf)?))
    } else {
        // Token-text class names are carrier specific
        get_text(buf)?;
        Ok(None)
    }
}

/// Content-type-value: constrained media (text or well-known code) or the general form
fn get_content_type(buf: &mut &[u8]) -> CodecResult<String> {
    let first = peek(buf)?;
    if first >= 0x80 {
        buf.advance(1);
        return Ok(well_known_media(first & 0x7F).to_string());
    }
    if first <= LENGTH_QUOTE {
        let mut value = take_value(buf)?;
        let media = peek(&value)?;
        // Parameters after the media type are not used
        return if media >= 0x80 {
            Ok(well_known_media(media & 0x7F).to_string())
        } else {
            get_text(&mut value)
        };
    }
    get_text(buf)
}

fn well_known_media(code: u8) -> &'static str {
    match code {
        0x00 => "*/*",
        0x03 => "text/plain",
        0x1D => "image/gif",
        0x1E => "image/jpeg",
        0x20 => "image/png",
        0x22 => "application/vnd.wap.multipart.*",
        0x23 => "application/vnd.wap.multipart.mixed",
        0x33 => "application/vnd.wap.multipart.related",
        _ => "application/octet-stream",
    }
}

/// Skip a header value using the generic WSP rules
fn skip_value(buf: &mut &[u8]) -> CodecResult<()> {
    let first = peek(buf)?;
    match first {
        0..=30 => {
            buf.advance(1);
            ensure(buf, first as usize)?;
            buf.advance(first as usize);
        }
        LENGTH_QUOTE => {
            take_value(buf)?;
        }
        32..=127 => {
            get_text(buf)?;
        }
        _ => buf.advance(1),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> WapPduCodec {
        WapPduCodec::new()
    }

    #[test]
    fn test_uintvar_encoding() {
        let mut buf = BytesMut::new();
        put_uintvar(&mut buf, 0x7F);
        put_uintvar(&mut buf, 0x80);
        put_uintvar(&mut buf, 0x3FFF);
        assert_eq!(&buf[..], &[0x7F, 0x81, 0x00, 0xFF, 0x7F]);

        let mut slice = &buf[..];
        assert_eq!(get_uintvar(&mut slice).unwrap(), 0x7F);
        assert_eq!(get_uintvar(&mut slice).unwrap(), 0x80);
        assert_eq!(get_uintvar(&mut slice).unwrap(), 0x3FFF);
    }

    #[test]
    fn test_long_integer_is_minimal() {
        let mut buf = BytesMut::new();
        put_long_integer(&mut buf, 604_800);
        assert_eq!(&buf[..], &[0x03, 0x09, 0x3A, 0x80]);

        let mut buf = BytesMut::new();
        put_long_integer(&mut buf, 0);
        assert_eq!(&buf[..], &[0x01, 0x00]);
    }

    #[test]
    fn test_parse_send_confirmation_bytes() {
        // X-Mms-Message-Type: m-send-conf, Transaction-ID "T1", Version 1.2, Status OK, Message-ID "M9"
        let data = [
            0x8C, 0x81, 0x98, b'T', b'1', 0x00, 0x8D, 0x92, 0x92, 0x80, 0x8B, b'M', b'9', 0x00,
        ];
        match codec().parse(&data).unwrap() {
            Pdu::SendConfirmation(conf) => {
                assert_eq!(conf.transaction_id.as_deref(), Some("T1"));
                assert_eq!(conf.message_id.as_deref(), Some("M9"));
                assert!(conf.response_status.is_ok());
            }
            other => panic!("unexpected PDU {:?}", other),
        }
    }

    #[test]
    fn test_unknown_headers_are_skipped() {
        // Response-Text (0x93, text), Status (0x95, short int), an application header, then status
        let mut data = vec![0x8C, 0x81, 0x93];
        data.extend_from_slice(b"accepted\0");
        data.extend_from_slice(&[0x95, 0x80]);
        data.extend_from_slice(b"X-Carrier\0value\0");
        data.extend_from_slice(&[0x92, 0x86]);

        match codec().parse(&data).unwrap() {
            Pdu::SendConfirmation(conf) => {
                assert_eq!(conf.response_status, ResponseStatus::NetworkProblem);
            }
            other => panic!("unexpected PDU {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(codec().parse(&[]), Err(CodecError::Empty));
        assert_eq!(codec().parse(b"<html>"), Err(CodecError::MissingMessageType));
        assert_eq!(
            codec().parse(&[0x8C, 0x85]),
            Err(CodecError::UnknownMessageType(h::MESSAGE_TYPE_ACKNOWLEDGE_IND))
        );
        assert!(matches!(
            codec().parse(&[0x8C, 0x81, 0x98, b'T']),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn test_send_request_survives_compose_and_parse() {
        let mut req = SendRequest::new("T42")
            .with_recipient("+15551234567/TYPE=PLMN")
            .with_subject("hello")
            .with_part(PduPart::text("see you at 8"))
            .with_part(PduPart::new("image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0]));
        req.from = Some("+15550000000/TYPE=PLMN".into());
        req.date = Utc.timestamp_opt(1_700_000_000, 0).single();
        req.expiry = Some(604_800);

        let bytes = codec().compose(&Pdu::SendRequest(req.clone())).unwrap();
        assert_eq!(&bytes[..2], &[0x8C, 0x80]);
        assert_eq!(codec().parse(&bytes).unwrap(), Pdu::SendRequest(req));
    }

    #[test]
    fn test_compose_rejects_nul_in_text() {
        let req = SendRequest::new("T1").with_subject("bad\0subject");
        assert!(matches!(
            codec().compose(&Pdu::SendRequest(req)),
            Err(CodecError::InvalidValue { field: "subject", .. })
        ));
    }

    #[test]
    fn test_notification_with_insert_address_from() {
        let mut ind = NotificationIndication::new("N7", "http://mmsc.example/get?id=7");
        ind.message_size = Some(20_480);
        ind.expiry = Some(3_600);
        ind.message_class = Some(MessageClass::Personal);

        let bytes = codec().compose(&Pdu::NotificationIndication(ind.clone())).unwrap();
        assert_eq!(codec().parse(&bytes).unwrap(), Pdu::NotificationIndication(ind));
    }

    #[test]
    fn test_single_part_body() {
        let conf = RetrieveConfirmation {
            transaction_id: Some("R1".into()),
            content_type: Some("text/plain".into()),
            parts: vec![PduPart::text("just text")],
            ..Default::default()
        };
        let bytes = codec().compose(&Pdu::RetrieveConfirmation(conf)).unwrap();
        match codec().parse(&bytes).unwrap() {
            Pdu::RetrieveConfirmation(parsed) => {
                assert_eq!(parsed.parts, vec![PduPart::text("just text")]);
                assert!(parsed.is_text_only());
            }
            other => panic!("unexpected PDU {:?}", other),
        }
    }
}
