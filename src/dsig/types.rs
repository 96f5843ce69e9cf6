//! Serde model of the `Signature` element.
//!
//! Element names are matched by local name when reading, so documents that
//! use a `ds:` prefix deserialize the same as ones that declare the default
//! namespace on `Signature`.

use serde::{Deserialize, Serialize};

use crate::crypto::HashAlg;
use crate::dsig::{Error, Result, algorithms};

/// Element carrying an `Algorithm` attribute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmElement {
    #[serde(rename = "@Algorithm")]
    pub algorithm: String,

    #[serde(
        rename = "InclusiveNamespaces",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub inclusive_namespaces: Option<InclusiveNamespaces>,
}

impl AlgorithmElement {
    pub fn new(algorithm: &str) -> Self {
        Self {
            algorithm: algorithm.to_string(),
            inclusive_namespaces: None,
        }
    }

    /// Prefixes listed in `InclusiveNamespaces/@PrefixList`
    pub fn prefix_list(&self) -> Option<Vec<&str>> {
        self.inclusive_namespaces
            .as_ref()
            .map(|ns| ns.prefix_list.split_whitespace().collect())
    }
}

pub type CanonicalizationMethod = AlgorithmElement;
pub type SignatureMethod = AlgorithmElement;
pub type DigestMethod = AlgorithmElement;
pub type Transform = AlgorithmElement;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InclusiveNamespaces {
    #[serde(rename = "@PrefixList", default)]
    pub prefix_list: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transforms {
    #[serde(rename = "Transform", default)]
    pub transforms: Vec<Transform>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "@URI", default)]
    pub uri: String,

    #[serde(rename = "Transforms", default, skip_serializing_if = "Option::is_none")]
    pub transforms: Option<Transforms>,

    #[serde(rename = "DigestMethod")]
    pub digest_method: DigestMethod,

    #[serde(rename = "DigestValue")]
    pub digest_value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedInfo {
    #[serde(rename = "@xmlns", default, skip_serializing_if = "Option::is_none")]
    pub xmlns: Option<String>,

    #[serde(rename = "CanonicalizationMethod")]
    pub canonicalization_method: CanonicalizationMethod,

    #[serde(rename = "SignatureMethod")]
    pub signature_method: SignatureMethod,

    #[serde(rename = "Reference", default)]
    pub references: Vec<Reference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyInfo {
    #[serde(rename = "KeyName", default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    #[serde(rename = "@xmlns", default, skip_serializing_if = "Option::is_none")]
    pub xmlns: Option<String>,

    #[serde(rename = "SignedInfo")]
    pub signed_info: SignedInfo,

    #[serde(rename = "SignatureValue")]
    pub signature_value: String,

    #[serde(rename = "KeyInfo", default, skip_serializing_if = "Option::is_none")]
    pub key_info: Option<KeyInfo>,
}

/// Map a `DigestMethod` URI to its hash algorithm
pub(crate) fn digest_alg(uri: &str) -> Result<HashAlg> {
    match uri {
        algorithms::SHA1 => Ok(HashAlg::Sha1),
        algorithms::SHA256 => Ok(HashAlg::Sha256),
        algorithms::SHA512 => Ok(HashAlg::Sha512),
        alg => Err(Error::Verification(format!(
            "Unsupported digest algorithm: {alg}"
        ))),
    }
}

/// Map a `SignatureMethod` URI to the digest used under RSA PKCS#1 v1.5
pub(crate) fn signature_alg(uri: &str) -> Result<HashAlg> {
    match uri {
        algorithms::RSA_SHA1 => Ok(HashAlg::Sha1),
        algorithms::RSA_SHA256 => Ok(HashAlg::Sha256),
        algorithms::RSA_SHA512 => Ok(HashAlg::Sha512),
        alg => Err(Error::Verification(format!(
            "Unsupported signature algorithm: {alg}"
        ))),
    }
}
