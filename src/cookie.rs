//! Cookie header parsing and the session cookie wire format.
//!
//! The session cookie value is a percent-encoded JSON object:
//! `{"sessionId": "...", "customerId": "..."}` with `customerId` optional.

use serde::{Deserialize, Deserializer, Serialize};

use crate::event::loose_string;

/// Session record persisted in the visitor's session cookie.
///
/// Fields of an unexpected JSON type read as absent (numbers as strings), so
/// a cookie written by another SDK version keeps its session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    #[serde(default, deserialize_with = "loose_session_id")]
    pub session_id: String,
    #[serde(
        default,
        deserialize_with = "loose_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub customer_id: Option<String>,
}

fn loose_session_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_string(deserializer)?.unwrap_or_default())
}

impl SessionCookie {
    pub fn new(session_id: String, customer_id: Option<String>) -> Self {
        Self {
            session_id,
            customer_id,
        }
    }

    /// Customer id, treating an empty string as absent.
    pub fn customer_id(&self) -> Option<&str> {
        self.customer_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn has_session(&self) -> bool {
        !self.session_id.is_empty()
    }
}

#[derive(Debug)]
pub enum CookieError {
    Encoding(String),
    Json(String),
}

impl std::fmt::Display for CookieError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CookieError::Encoding(msg) => write!(f, "invalid percent-encoding: {}", msg),
            CookieError::Json(msg) => write!(f, "invalid session cookie JSON: {}", msg),
        }
    }
}

impl std::error::Error for CookieError {}

/// Find the value of `name` in a raw `Cookie` header.
///
/// The name must start the header or follow a space, and the value runs to
/// the next `;` or the end of input. Empty values are skipped.
pub fn read_named_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    if name.is_empty() {
        return None;
    }
    let needle = format!("{}=", name);

    header.match_indices(&needle).find_map(|(idx, _)| {
        if idx > 0 && header.as_bytes()[idx - 1] != b' ' {
            return None;
        }
        let rest = &header[idx + needle.len()..];
        let value = rest.split(';').next().unwrap_or_default();
        (!value.is_empty()).then_some(value)
    })
}

pub fn encode_session_cookie(record: &SessionCookie) -> Result<String, CookieError> {
    let json = serde_json::to_string(record).map_err(|e| CookieError::Json(e.to_string()))?;
    Ok(urlencoding::encode(&json).into_owned())
}

pub fn decode_session_cookie(raw: &str) -> Result<SessionCookie, CookieError> {
    let json = urlencoding::decode(raw).map_err(|e| CookieError::Encoding(e.to_string()))?;
    serde_json::from_str(&json).map_err(|e| CookieError::Json(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_first_cookie_in_header() {
        assert_eq!(
            read_named_cookie("dub_id=click123; other=value", "dub_id"),
            Some("click123")
        );
    }

    #[test]
    fn reads_cookie_after_separator() {
        assert_eq!(
            read_named_cookie("other=value; dub_id=click123", "dub_id"),
            Some("click123")
        );
    }

    #[test]
    fn empty_header_has_no_cookie() {
        assert_eq!(read_named_cookie("", "dub_id"), None);
    }

    #[test]
    fn name_must_match_exactly() {
        assert_eq!(read_named_cookie("my_dub_id=nope", "dub_id"), None);
        assert_eq!(read_named_cookie("DUB_ID=nope", "dub_id"), None);
        assert_eq!(
            read_named_cookie("my_dub_id=nope; dub_id=yes", "dub_id"),
            Some("yes")
        );
    }

    #[test]
    fn empty_value_is_skipped() {
        assert_eq!(read_named_cookie("dub_id=; other=1", "dub_id"), None);
        assert_eq!(
            read_named_cookie("dub_id=; dub_id=second", "dub_id"),
            Some("second")
        );
    }

    #[test]
    fn value_is_returned_raw() {
        assert_eq!(
            read_named_cookie("mc_dub=%7B%22a%22%7D", "mc_dub"),
            Some("%7B%22a%22%7D")
        );
    }

    #[test]
    fn encoded_cookie_is_header_safe() {
        let record = SessionCookie::new("session123".into(), Some("customer456".into()));
        let encoded = encode_session_cookie(&record).unwrap();

        assert!(!encoded.contains(['"', '{', '}', ',', ';', ' ']));
        assert_eq!(decode_session_cookie(&encoded).unwrap(), record);
    }

    #[test]
    fn missing_customer_id_is_not_serialized() {
        let record = SessionCookie::new("abc".into(), None);
        let encoded = encode_session_cookie(&record).unwrap();
        let json = urlencoding::decode(&encoded).unwrap();
        assert_eq!(json, r#"{"sessionId":"abc"}"#);
    }

    #[test]
    fn decodes_cookie_written_by_browser_sdk() {
        let raw = "%7B%22sessionId%22%3A%22s1%22%2C%22customerId%22%3A%22c1%22%7D";
        let record = decode_session_cookie(raw).unwrap();
        assert_eq!(record.session_id, "s1");
        assert_eq!(record.customer_id(), Some("c1"));
    }

    #[test]
    fn invalid_json_is_rejected() {
        let err = decode_session_cookie("not-json").unwrap_err();
        assert!(matches!(err, CookieError::Json(_)));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let err = decode_session_cookie("%FF%FE").unwrap_err();
        assert!(matches!(err, CookieError::Encoding(_)));
    }

    #[test]
    fn numeric_fields_are_read_as_strings() {
        let raw = urlencoding::encode(r#"{"sessionId":"s","customerId":42}"#);
        let record = decode_session_cookie(&raw).unwrap();
        assert_eq!(record.session_id, "s");
        assert_eq!(record.customer_id(), Some("42"));

        let raw = urlencoding::encode(r#"{"sessionId":123}"#);
        let record = decode_session_cookie(&raw).unwrap();
        assert_eq!(record.session_id, "123");
        assert!(record.has_session());
    }

    #[test]
    fn wrong_typed_customer_id_is_dropped() {
        let raw = urlencoding::encode(r#"{"sessionId":"s","customerId":{"id":1}}"#);
        let record = decode_session_cookie(&raw).unwrap();
        assert_eq!(record.session_id, "s");
        assert_eq!(record.customer_id(), None);
    }

    #[test]
    fn record_without_session_id_decodes_empty() {
        let record = decode_session_cookie("%7B%7D").unwrap();
        assert!(!record.has_session());
    }

    #[test]
    fn empty_customer_id_counts_as_absent() {
        let record = SessionCookie::new("s".into(), Some(String::new()));
        assert_eq!(record.customer_id(), None);
    }
}
