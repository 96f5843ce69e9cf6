//! Decoded response records, serialized with the field names callers of
//! the iDx JSON surface expect.

use serde::Serialize;
use std::collections::BTreeMap;

/// A decoded answer: the requested record, or the bank's error document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Outcome<T> {
    Success(T),
    Error(ErrorResponse),
}

impl<T> Outcome<T> {
    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    #[serde(rename = "createDateTimestamp")]
    pub create_date_timestamp: String,
    #[serde(rename = "Error")]
    pub error: ErrorPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorPayload {
    /// `Error` element carrying text only
    Message(String),
    Detail(ErrorDetail),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub error_code: String,
    pub error_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Acquirer {
    #[serde(rename = "acquirerID")]
    pub acquirer_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryResponse {
    #[serde(rename = "createDateTimestamp")]
    pub create_date_timestamp: String,
    #[serde(rename = "Acquirer")]
    pub acquirer: Acquirer,
    #[serde(rename = "Directory")]
    pub directory: Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directory {
    #[serde(rename = "directoryDateTimestamp")]
    pub directory_date_timestamp: String,
    #[serde(rename = "Country")]
    pub countries: Vec<Country>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Country {
    #[serde(rename = "countryNames")]
    pub country_names: String,
    #[serde(rename = "Issuer")]
    pub issuers: Vec<Issuer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issuer {
    #[serde(rename = "issuerID")]
    pub issuer_id: String,
    #[serde(rename = "issuerName")]
    pub issuer_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionResponse {
    #[serde(rename = "createDateTimestamp")]
    pub create_date_timestamp: String,
    #[serde(rename = "Acquirer")]
    pub acquirer: Acquirer,
    #[serde(rename = "Issuer")]
    pub issuer: IssuerAuthentication,
    #[serde(rename = "Transaction")]
    pub transaction: TransactionInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuerAuthentication {
    #[serde(rename = "issuerAuthenticationURL")]
    pub issuer_authentication_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionInfo {
    #[serde(rename = "transactionID")]
    pub transaction_id: String,
    #[serde(rename = "transactionCreateDateTimestamp")]
    pub transaction_create_date_timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusResponse {
    #[serde(rename = "createDateTimestamp")]
    pub create_date_timestamp: String,
    #[serde(rename = "Acquirer")]
    pub acquirer: Acquirer,
    #[serde(rename = "Transaction")]
    pub transaction: StatusTransaction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusTransaction {
    #[serde(rename = "transactionID")]
    pub transaction_id: String,
    pub status: String,
    #[serde(rename = "statusDateTimestamp")]
    pub status_date_timestamp: String,
    #[serde(rename = "Response")]
    pub response: AssertionResult,
}

/// The SAML response block of a status answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AssertionResult {
    Complete(AssertionResponse),
    /// The block was malformed; serialized as an empty object
    Partial {
        #[serde(skip)]
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionResponse {
    #[serde(rename = "TransactionID")]
    pub transaction_id: String,
    #[serde(rename = "EntranceCode")]
    pub entrance_code: String,
    #[serde(rename = "StatusCode")]
    pub status_code: String,
    #[serde(rename = "IssuerID")]
    pub issuer_id: String,
    #[serde(rename = "Attributes")]
    pub attributes: BTreeMap<String, String>,
}
