use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use log::{debug, info};

use crate::error::DiscoveryError;

/// Subject phrase YouTube uses for "is streaming live now" notices
pub const LIVE_MARKER: &str = "ライブ配信中です";

/// Gmail emits URL-safe base64, with or without trailing padding
const TRANSPORT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decoded view of a live notification
#[derive(Debug, Clone)]
pub struct Envelope {
    pub subject: String,
    pub html: String,
}

pub struct NotificationDecoder {
    marker: String,
}

impl Default for NotificationDecoder {
    fn default() -> Self {
        Self::new(LIVE_MARKER)
    }
}

impl NotificationDecoder {
    pub fn new(marker: impl Into<String>) -> Self {
        NotificationDecoder { marker: marker.into() }
    }

    /// Decode a transport-encoded message and keep it only if its subject
    /// announces a live stream.
    pub fn decode(&self, raw: &str) -> Result<Envelope, DiscoveryError> {
        let bytes = TRANSPORT
            .decode(raw.trim_end())
            .map_err(|e| DiscoveryError::Payload(format!("invalid base64: {}", e)))?;

        debug!("Decoded payload, size: {} bytes", bytes.len());

        self.decode_mime(&bytes)
    }

    /// Parse an RFC 822 message that is already transport-decoded
    pub fn decode_mime(&self, bytes: &[u8]) -> Result<Envelope, DiscoveryError> {
        let message = mail_parser::MessageParser::default()
            .parse(bytes)
            .ok_or_else(|| DiscoveryError::Payload("unable to parse MIME envelope".to_string()))?;

        let subject = message.subject().unwrap_or_default().to_string();
        info!("📨 Subject: {}", subject);

        if !subject.contains(&self.marker) {
            return Err(DiscoveryError::NotALive { subject });
        }

        let html = message
            .body_html(0)
            .map(|body| body.into_owned())
            .unwrap_or_default();

        Ok(Envelope { subject, html })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};

    const LIVE_EMAIL: &str = "From: YouTube <noreply@youtube.com>\r\n\
Subject: =?UTF-8?B?44OG44K544OI44OB44Oj44Oz44ON44Or44GM44Op44Kk44OW6YWN5L+h5Lit44Gn44GZ?=\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/alternative; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: text/plain; charset=UTF-8\r\n\
\r\n\
Watch now\r\n\
--b1\r\n\
Content-Type: text/html; charset=UTF-8\r\n\
\r\n\
<html><body><a href=\"https://www.youtube.com/redirect?u=x\">watch</a></body></html>\r\n\
--b1--\r\n";

    #[test]
    fn test_decode_live_notification() {
        let raw = URL_SAFE.encode(LIVE_EMAIL);
        let envelope = NotificationDecoder::default().decode(&raw).unwrap();

        assert!(envelope.subject.contains(LIVE_MARKER));
        assert!(envelope.html.contains("<a href="));
    }

    #[test]
    fn test_decode_accepts_unpadded_payload() {
        let raw = URL_SAFE_NO_PAD.encode(LIVE_EMAIL);
        assert!(NotificationDecoder::default().decode(&raw).is_ok());
    }

    #[test]
    fn test_decode_rejects_other_subjects() {
        let email = "From: someone@example.com\r\nSubject: Weekly digest\r\n\
Content-Type: text/html\r\n\r\n<p>hello</p>\r\n";
        let raw = URL_SAFE.encode(email);

        match NotificationDecoder::default().decode(&raw) {
            Err(DiscoveryError::NotALive { subject }) => assert_eq!(subject, "Weekly digest"),
            other => panic!("expected NotALive, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        let result = NotificationDecoder::default().decode("not*base64!");
        assert!(matches!(result, Err(DiscoveryError::Payload(_))));
    }

    #[test]
    fn test_custom_marker() {
        let email = "Subject: is live now\r\nContent-Type: text/html\r\n\r\n<p>x</p>\r\n";
        let decoder = NotificationDecoder::new("is live now");
        assert!(decoder.decode_mime(email.as_bytes()).is_ok());
    }
}
