//! WAP-MMS header field codes and well-known values (OMA MMS Encapsulation 1.2)

// Message types (X-Mms-Message-Type values)
pub const MESSAGE_TYPE_SEND_REQ: u8 = 0x80;
pub const MESSAGE_TYPE_SEND_CONF: u8 = 0x81;
pub const MESSAGE_TYPE_NOTIFICATION_IND: u8 = 0x82;
pub const MESSAGE_TYPE_NOTIFYRESP_IND: u8 = 0x83;
pub const MESSAGE_TYPE_RETRIEVE_CONF: u8 = 0x84;
pub const MESSAGE_TYPE_ACKNOWLEDGE_IND: u8 = 0x85;
pub const MESSAGE_TYPE_DELIVERY_IND: u8 = 0x86;

// Header field codes
pub const BCC: u8 = 0x81;
pub const CC: u8 = 0x82;
pub const CONTENT_LOCATION: u8 = 0x83;
pub const CONTENT_TYPE: u8 = 0x84;
pub const DATE: u8 = 0x85;
pub const DELIVERY_REPORT: u8 = 0x86;
pub const DELIVERY_TIME: u8 = 0x87;
pub const EXPIRY: u8 = 0x88;
pub const FROM: u8 = 0x89;
pub const MESSAGE_CLASS: u8 = 0x8A;
pub const MESSAGE_ID: u8 = 0x8B;
pub const MESSAGE_TYPE: u8 = 0x8C;
pub const MMS_VERSION: u8 = 0x8D;
pub const MESSAGE_SIZE: u8 = 0x8E;
pub const PRIORITY: u8 = 0x8F;
pub const READ_REPORT: u8 = 0x90;
pub const RESPONSE_STATUS: u8 = 0x92;
pub const RESPONSE_TEXT: u8 = 0x93;
pub const SENDER_VISIBILITY: u8 = 0x94;
pub const STATUS: u8 = 0x95;
pub const SUBJECT: u8 = 0x96;
pub const TO: u8 = 0x97;
pub const TRANSACTION_ID: u8 = 0x98;

// Response status values
pub const RESPONSE_STATUS_OK: u8 = 0x80;
pub const RESPONSE_STATUS_ERROR_UNSPECIFIED: u8 = 0x81;
pub const RESPONSE_STATUS_ERROR_SERVICE_DENIED: u8 = 0x82;
pub const RESPONSE_STATUS_ERROR_MESSAGE_FORMAT_CORRUPT: u8 = 0x83;
pub const RESPONSE_STATUS_ERROR_SENDING_ADDRESS_UNRESOLVED: u8 = 0x84;
pub const RESPONSE_STATUS_ERROR_MESSAGE_NOT_FOUND: u8 = 0x85;
pub const RESPONSE_STATUS_ERROR_NETWORK_PROBLEM: u8 = 0x86;
pub const RESPONSE_STATUS_ERROR_CONTENT_NOT_ACCEPTED: u8 = 0x87;
pub const RESPONSE_STATUS_ERROR_UNSUPPORTED_MESSAGE: u8 = 0x88;

// Priority values
pub const PRIORITY_LOW: u8 = 0x80;
pub const PRIORITY_NORMAL: u8 = 0x81;
pub const PRIORITY_HIGH: u8 = 0x82;

// Yes/No values (delivery and read reports)
pub const VALUE_YES: u8 = 0x80;
pub const VALUE_NO: u8 = 0x81;

// Message class values
pub const MESSAGE_CLASS_PERSONAL: u8 = 0x80;
pub const MESSAGE_CLASS_ADVERTISEMENT: u8 = 0x81;
pub const MESSAGE_CLASS_INFORMATIONAL: u8 = 0x82;
pub const MESSAGE_CLASS_AUTO: u8 = 0x83;

// Expiry / delivery-time value tokens
pub const TIME_TOKEN_ABSOLUTE: u8 = 0x80;
pub const TIME_TOKEN_RELATIVE: u8 = 0x81;

// From header tokens
pub const FROM_ADDRESS_PRESENT_TOKEN: u8 = 0x80;
pub const FROM_INSERT_ADDRESS_TOKEN: u8 = 0x81;

/// Version 1.2, encoded as a short integer
pub const CURRENT_MMS_VERSION: u8 = 0x12;

/// MIME type of an encoded PDU on the wire
pub const MMS_CONTENT_TYPE: &str = "application/vnd.wap.mms-message";

/// Content type used for multipart bodies without an explicit one
pub const MULTIPART_MIXED: &str = "application/vnd.wap.multipart.mixed";

/// Human readable name of a header field code, for logs
pub fn field_name(code: u8) -> &'static str {
    match code {
        BCC => "Bcc",
        CC => "Cc",
        CONTENT_LOCATION => "X-Mms-Content-Location",
        CONTENT_TYPE => "Content-Type",
        DATE => "Date",
        DELIVERY_REPORT => "X-Mms-Delivery-Report",
        DELIVERY_TIME => "X-Mms-Delivery-Time",
        EXPIRY => "X-Mms-Expiry",
        FROM => "From",
        MESSAGE_CLASS => "X-Mms-Message-Class",
        MESSAGE_ID => "Message-ID",
        MESSAGE_TYPE => "X-Mms-Message-Type",
        MMS_VERSION => "X-Mms-MMS-Version",
        MESSAGE_SIZE => "X-Mms-Message-Size",
        PRIORITY => "X-Mms-Priority",
        READ_REPORT => "X-Mms-Read-Report",
        RESPONSE_STATUS => "X-Mms-Response-Status",
        RESPONSE_TEXT => "X-Mms-Response-Text",
        SENDER_VISIBILITY => "X-Mms-Sender-Visibility",
        STATUS => "X-Mms-Status",
        SUBJECT => "Subject",
        TO => "To",
        TRANSACTION_ID => "X-Mms-Transaction-ID",
        _ => "unknown",
    }
}
