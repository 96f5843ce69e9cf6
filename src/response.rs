//! Response parsers: verified iDx documents to typed records.
//!
//! Documents are first converted to the compact JSON tree of
//! [`xml::compact`](crate::xml::compact). iDx elements are looked up by local
//! name since acquirers differ in the prefix they bind the iDx namespace to.

mod directory;
mod models;
mod status;
mod transaction;

pub use directory::parse_directory;
pub use models::*;
pub use status::{SamlVariant, parse_status};
pub use transaction::parse_transaction;

use serde_json::Value;
use tracing::info;

use crate::error::{Error, Result};
use crate::xml::compact::{self, child, text};

const ERROR_ROOT: &str = "AcquirerErrorRes";

/// Document element of a verified response
enum Document<'a> {
    Success(&'a Value),
    Error(&'a Value),
}

fn classify<'a>(tree: &'a Value, success_root: &str) -> Result<Document<'a>> {
    if let Some(root) = child(tree, ERROR_ROOT) {
        info!(expected = success_root, "Acquirer answered with an error response");
        return Ok(Document::Error(root));
    }
    child(tree, success_root)
        .map(Document::Success)
        .ok_or_else(|| Error::Decode(format!("Expected {success_root} or {ERROR_ROOT}")))
}

/// Parse `xml` and dispatch on its document element
fn decode<T>(
    xml: &str,
    success_root: &str,
    success: impl FnOnce(&Value) -> Result<T>,
) -> Result<Outcome<T>> {
    let tree = compact::to_compact(xml)?;
    match classify(&tree, success_root)? {
        Document::Success(root) => success(root).map(Outcome::Success),
        Document::Error(root) => error_response(root).map(Outcome::Error),
    }
}

fn error_response(root: &Value) -> Result<ErrorResponse> {
    let create_date_timestamp = text_at(root, &["createDateTimestamp"])?;
    let error = child(root, "Error").ok_or_else(|| missing(&["Error"]))?;

    let payload = if child(error, "errorCode").is_none() {
        ErrorPayload::Message(text(error).unwrap_or_default().trim().to_string())
    } else {
        ErrorPayload::Detail(ErrorDetail {
            error_code: text_at(error, &["errorCode"])?,
            error_message: text_at(error, &["errorMessage"]).unwrap_or_default(),
            error_detail: optional_text(error, "errorDetail"),
            suggested_action: optional_text(error, "suggestedAction"),
            consumer_message: optional_text(error, "consumerMessage"),
        })
    };

    Ok(ErrorResponse {
        create_date_timestamp,
        error: payload,
    })
}

/// Text of the element at `path` (local names) below `node`
fn text_at(node: &Value, path: &[&str]) -> Result<String> {
    let mut current = node;
    for name in path {
        current = child(current, name).ok_or_else(|| missing(path))?;
    }
    text(current)
        .map(str::to_string)
        .ok_or_else(|| missing(path))
}

fn optional_text(node: &Value, name: &str) -> Option<String> {
    child(node, name).and_then(text).map(str::to_string)
}

fn missing(path: &[&str]) -> Error {
    Error::Decode(format!("Missing element {}", path.join("/")))
}

fn acquirer(root: &Value) -> Result<Acquirer> {
    Ok(Acquirer {
        acquirer_id: text_at(root, &["Acquirer", "acquirerID"])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_with_text_payload() {
        let xml = r#"<ns3:AcquirerErrorRes xmlns:ns3="http://www.betaalvereniging.nl/iDx/messages/Merchant-Acquirer/1.0.0">
            <ns3:createDateTimestamp>2024-01-01T00:00:00Z</ns3:createDateTimestamp>
            <ns3:Error>AB1234 Some failure</ns3:Error>
        </ns3:AcquirerErrorRes>"#;

        let outcome = decode(xml, "AcquirerTrxRes", |_| Ok(())).unwrap();
        assert_eq!(
            outcome,
            Outcome::Error(ErrorResponse {
                create_date_timestamp: "2024-01-01T00:00:00Z".into(),
                error: ErrorPayload::Message("AB1234 Some failure".into()),
            })
        );
    }

    #[test]
    fn test_error_response_with_detail() {
        let xml = r#"<AcquirerErrorRes>
            <createDateTimestamp>2024-01-01T00:00:00Z</createDateTimestamp>
            <Error>
                <errorCode>SO1000</errorCode>
                <errorMessage>Failure in system</errorMessage>
                <consumerMessage>Try again later</consumerMessage>
            </Error>
        </AcquirerErrorRes>"#;

        let outcome = decode(xml, "DirectoryRes", |_| Ok(())).unwrap();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "createDateTimestamp": "2024-01-01T00:00:00Z",
                "Error": {
                    "errorCode": "SO1000",
                    "errorMessage": "Failure in system",
                    "consumerMessage": "Try again later"
                }
            })
        );
    }

    #[test]
    fn test_unexpected_document_is_decode_error() {
        let result = decode("<Other/>", "DirectoryRes", |_| Ok(()));
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_text_at_reports_path() {
        let tree = compact::to_compact("<a><b/></a>").unwrap();
        let err = text_at(&tree, &["a", "b", "c"]).unwrap_err();
        assert_eq!(err.to_string(), "Malformed response: Missing element a/b/c");
    }
}
