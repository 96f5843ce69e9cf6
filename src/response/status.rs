use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::Result;
use crate::response::{
    AssertionResponse, AssertionResult, Outcome, StatusResponse, StatusTransaction, acquirer,
    decode, text_at,
};
use crate::xml::compact::{self, ATTRIBUTES, child, one_or_many, text};

const NAME_ID_KEY: &str = "NameID";
const CONSUMER_PREFIX: &str = "consumer.";
const STATUS_PREFIX: &str = "status:";

/// Namespace-prefix generation of the SAML block inside the status container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlVariant {
    /// `samlp:` / `saml:`
    Saml,
    /// `saml2p:` / `saml2:`
    Saml2,
}

impl SamlVariant {
    /// Pick the variant from the keys of the transaction container
    pub fn detect(container: &Value) -> Self {
        if container.get("samlp:Response").is_some() {
            SamlVariant::Saml
        } else {
            SamlVariant::Saml2
        }
    }

    /// Qualified name of a SAML protocol element
    pub fn protocol(self, local: &str) -> String {
        match self {
            SamlVariant::Saml => format!("samlp:{local}"),
            SamlVariant::Saml2 => format!("saml2p:{local}"),
        }
    }

    /// Qualified name of a SAML assertion element
    pub fn assertion(self, local: &str) -> String {
        match self {
            SamlVariant::Saml => format!("saml:{local}"),
            SamlVariant::Saml2 => format!("saml2:{local}"),
        }
    }
}

/// Decode a verified `AcquirerStatusRes`.
///
/// `decrypted` holds the plaintexts of the document's `EncryptedData`
/// blocks. A malformed SAML block does not fail the call: the outer status
/// fields are returned with [`AssertionResult::Partial`].
pub fn parse_status(xml: &str, decrypted: &[String]) -> Result<Outcome<StatusResponse>> {
    decode(xml, "AcquirerStatusRes", |root| {
        let transaction = child(root, "Transaction").unwrap_or(&Value::Null);

        let response = match child(transaction, "container") {
            Some(container) => {
                let variant = SamlVariant::detect(container);
                debug!(?variant, "SAML variant detected");
                assemble(container, variant, decrypted)
            }
            None => Err("Transaction has no container".to_string()),
        };
        let response = response.unwrap_or_else(|reason| {
            warn!(%reason, "Status response block could not be decoded");
            AssertionResult::Partial { reason }
        });

        Ok(StatusResponse {
            create_date_timestamp: text_at(root, &["createDateTimestamp"])?,
            acquirer: acquirer(root)?,
            transaction: StatusTransaction {
                transaction_id: text_at(root, &["Transaction", "transactionID"])?,
                status: text_at(root, &["Transaction", "status"])?,
                status_date_timestamp: text_at(root, &["Transaction", "statusDateTimestamp"])?,
                response,
            },
        })
    })
}

fn assemble(
    container: &Value,
    variant: SamlVariant,
    decrypted: &[String],
) -> std::result::Result<AssertionResult, String> {
    let response = field(container, &variant.protocol("Response"))?;

    let status_value = attribute(
        field(field(response, &variant.protocol("Status"))?, &variant.protocol("StatusCode"))?,
        "Value",
    )?;
    let status_code = status_value
        .split_once(STATUS_PREFIX)
        .map_or(status_value, |(_, code)| code);

    let issuer = field(field(response, &variant.assertion("Assertion"))?, &variant.assertion("Issuer"))?;

    let mut attributes = BTreeMap::new();
    for block in decrypted {
        let (key, value) = decode_attribute(block, variant)?;
        attributes.insert(key, value);
    }

    Ok(AssertionResult::Complete(AssertionResponse {
        transaction_id: attribute(response, "ID")?.to_string(),
        entrance_code: attribute(response, "InResponseTo")?.to_string(),
        status_code: status_code.to_string(),
        issuer_id: text(issuer).ok_or("Issuer has no text")?.to_string(),
        attributes,
    }))
}

/// Fold one decrypted block into an attribute entry
fn decode_attribute(block: &str, variant: SamlVariant) -> std::result::Result<(String, String), String> {
    let tree = compact::to_compact(block).map_err(|e| e.to_string())?;

    if let Some(name_id) = tree.get(variant.assertion(NAME_ID_KEY)) {
        let value = text(name_id).unwrap_or_default();
        return Ok((NAME_ID_KEY.to_string(), value.to_string()));
    }

    let attr = field(&tree, &variant.assertion("Attribute"))?;
    let name = attribute(attr, "Name")?;
    let key = name
        .split_once(CONSUMER_PREFIX)
        .map_or(name, |(_, suffix)| suffix);
    let value = attr
        .get(variant.assertion("AttributeValue"))
        .and_then(|v| one_or_many(v).into_iter().next())
        .and_then(text)
        .unwrap_or_default();

    Ok((key.to_string(), value.to_string()))
}

fn field<'a>(node: &'a Value, qname: &str) -> std::result::Result<&'a Value, String> {
    node.get(qname).ok_or_else(|| format!("Missing {qname}"))
}

fn attribute<'a>(node: &'a Value, name: &str) -> std::result::Result<&'a str, String> {
    node.get(ATTRIBUTES)
        .and_then(|attrs| attrs.get(name))
        .and_then(Value::as_str)
        .ok_or_else(|| format!("Missing attribute {name}"))
}
