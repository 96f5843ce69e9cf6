//! Request formatting: typed iDx request messages, serialized and signed.

mod directory;
mod status;
mod transaction;

pub use directory::directory_request;
pub use status::status_request;
pub use transaction::transaction_request;

use chrono::{SecondsFormat, Utc};
use quick_xml::se::to_string_with_root as xml_to_string;
use secrecy::ExposeSecret;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::crypto::rsa::{RsaPrivateKey, RsaPublicKey};
use crate::dsig::{self, SignConfig};
use crate::error::Result;
use crate::params::GeneralParameters;
use crate::xml::{self, XML_DECLARATION};

pub const VERSION: &str = "1.0.0";
pub const PRODUCT_ID: &str = "NL:BVN:BankID:1.0";

#[derive(Debug, Serialize)]
struct Merchant<'a> {
    #[serde(rename = "merchantID")]
    merchant_id: &'a str,
    #[serde(rename = "subID")]
    sub_id: &'a str,
    #[serde(rename = "merchantReturnURL", skip_serializing_if = "Option::is_none")]
    return_url: Option<&'a str>,
}

impl<'a> Merchant<'a> {
    fn new(general: &'a GeneralParameters) -> Self {
        Self {
            merchant_id: &general.merchant_id,
            sub_id: &general.merchant_sub_id,
            return_url: None,
        }
    }
}

/// Current UTC time as ISO-8601 with millisecond precision
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

static LAST_SUFFIX_MS: AtomicU64 = AtomicU64::new(0);

/// Base-36 millisecond clock, strictly increasing within the process
pub fn entrance_suffix() -> String {
    let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
    let mut last = LAST_SUFFIX_MS.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_SUFFIX_MS.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
        {
            Ok(_) => return to_base36(next),
            Err(current) => last = current,
        }
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    loop {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
        if value == 0 {
            break;
        }
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Signing configuration for the merchant described by `general`
pub fn sign_config(general: &GeneralParameters) -> dsig::Result<SignConfig> {
    Ok(SignConfig {
        private_key: RsaPrivateKey::from_pem(general.private_key.expose_secret())?,
        public_key: RsaPublicKey::from_key_material(&general.public_key)?,
        key_name: dsig::key_name(&general.public_key_fingerprint),
    })
}

/// Serialize `message` under `root`, prepend the XML declaration and sign
fn to_signed_xml<T: Serialize>(
    root: &str,
    message: &T,
    general: &GeneralParameters,
) -> Result<String> {
    let body = xml_to_string(root, message).map_err(xml::Error::from)?;
    let unsigned = format!("{XML_DECLARATION}{body}");
    let signed = dsig::sign_document(&unsigned, &sign_config(general)?)?;

    debug!(root, bytes = signed.len(), "Request built and signed");
    Ok(signed)
}
