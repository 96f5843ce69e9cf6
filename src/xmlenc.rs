//! XML-Encryption `EncryptedData` decryption.
//!
//! Only the receiving side is implemented: session keys arrive RSA-wrapped in
//! an `EncryptedKey`, either inside the data's `KeyInfo` or as a sibling
//! within the same encrypted container.

mod error;

pub use error::Error;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use quick_xml::de::from_str as xml_from_str;
use serde::Deserialize;
use tracing::debug;

use crate::crypto::rsa::{self, KeyTransport, RsaPrivateKey};
use crate::crypto::sym::Cipher;
use crate::crypto::HashAlg;
use crate::xml::{self, Span, ns};

pub type Result<T> = std::result::Result<T, Error>;

// Algorithm URIs
pub mod algorithms {
    // Block ciphers
    pub const AES128_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes128-cbc";
    pub const AES192_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes192-cbc";
    pub const AES256_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes256-cbc";
    pub const AES128_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes128-gcm";
    pub const AES192_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes192-gcm";
    pub const AES256_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes256-gcm";

    // Key transport
    pub const RSA_1_5: &str = "http://www.w3.org/2001/04/xmlenc#rsa-1_5";
    pub const RSA_OAEP_MGF1P: &str = "http://www.w3.org/2001/04/xmlenc#rsa-oaep-mgf1p";
    pub const RSA_OAEP: &str = "http://www.w3.org/2009/xmlenc11#rsa-oaep";

    // Mask generation functions
    pub const MGF1_SHA1: &str = "http://www.w3.org/2009/xmlenc11#mgf1sha1";
    pub const MGF1_SHA256: &str = "http://www.w3.org/2009/xmlenc11#mgf1sha256";
    pub const MGF1_SHA512: &str = "http://www.w3.org/2009/xmlenc11#mgf1sha512";

    // OAEP digests
    pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
    pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
    pub const SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlgorithmElement {
    #[serde(rename = "@Algorithm")]
    pub algorithm: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncryptionMethod {
    #[serde(rename = "@Algorithm")]
    pub algorithm: String,

    #[serde(rename = "DigestMethod", default)]
    pub digest_method: Option<AlgorithmElement>,

    #[serde(rename = "MGF", default)]
    pub mgf: Option<AlgorithmElement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CipherData {
    #[serde(rename = "CipherValue")]
    pub cipher_value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncryptedKey {
    #[serde(rename = "EncryptionMethod")]
    pub encryption_method: EncryptionMethod,

    #[serde(rename = "CipherData")]
    pub cipher_data: CipherData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyInfo {
    #[serde(rename = "EncryptedKey", default)]
    pub encrypted_key: Option<EncryptedKey>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncryptedData {
    #[serde(rename = "EncryptionMethod")]
    pub encryption_method: EncryptionMethod,

    #[serde(rename = "KeyInfo", default)]
    pub key_info: Option<KeyInfo>,

    #[serde(rename = "CipherData")]
    pub cipher_data: CipherData,
}

impl EncryptionMethod {
    fn cipher(&self) -> Result<Cipher> {
        match self.algorithm.as_str() {
            algorithms::AES128_CBC => Ok(Cipher::Aes128Cbc),
            algorithms::AES192_CBC => Ok(Cipher::Aes192Cbc),
            algorithms::AES256_CBC => Ok(Cipher::Aes256Cbc),
            algorithms::AES128_GCM => Ok(Cipher::Aes128Gcm),
            algorithms::AES192_GCM => Ok(Cipher::Aes192Gcm),
            algorithms::AES256_GCM => Ok(Cipher::Aes256Gcm),
            alg => Err(Error::UnsupportedAlgorithm(alg.to_string())),
        }
    }

    fn key_transport(&self) -> Result<KeyTransport> {
        match self.algorithm.as_str() {
            algorithms::RSA_1_5 => Ok(KeyTransport::Pkcs1),
            // mgf1p fixes MGF1 to SHA-1, the digest defaults to SHA-1
            algorithms::RSA_OAEP_MGF1P => Ok(KeyTransport::Oaep {
                digest: self.oaep_digest()?,
                mgf1: HashAlg::Sha1,
            }),
            algorithms::RSA_OAEP => {
                let mgf1 = match self.mgf.as_ref().map(|m| m.algorithm.as_str()) {
                    None | Some(algorithms::MGF1_SHA1) => HashAlg::Sha1,
                    Some(algorithms::MGF1_SHA256) => HashAlg::Sha256,
                    Some(algorithms::MGF1_SHA512) => HashAlg::Sha512,
                    Some(alg) => return Err(Error::UnsupportedAlgorithm(alg.to_string())),
                };
                Ok(KeyTransport::Oaep {
                    digest: self.oaep_digest()?,
                    mgf1,
                })
            }
            alg => Err(Error::UnsupportedAlgorithm(alg.to_string())),
        }
    }

    fn oaep_digest(&self) -> Result<HashAlg> {
        match self.digest_method.as_ref().map(|d| d.algorithm.as_str()) {
            None | Some(algorithms::SHA1) => Ok(HashAlg::Sha1),
            Some(algorithms::SHA256) => Ok(HashAlg::Sha256),
            Some(algorithms::SHA512) => Ok(HashAlg::Sha512),
            Some(alg) => Err(Error::UnsupportedAlgorithm(alg.to_string())),
        }
    }
}

impl EncryptedKey {
    /// Unwrap the session key with our private key
    pub fn unwrap_key(&self, private_key: &RsaPrivateKey) -> Result<Vec<u8>> {
        let transport = self.encryption_method.key_transport()?;
        let wrapped = decode_base64(&self.cipher_data.cipher_value)?;
        Ok(rsa::decrypt_key(private_key, wrapped, transport)?)
    }
}

/// Decrypt a single `EncryptedData` element to its plaintext XML.
///
/// `sibling_key` is used when the element's `KeyInfo` carries no
/// `EncryptedKey` of its own.
pub fn decrypt_element(
    encrypted_data_xml: &str,
    sibling_key: Option<&str>,
    private_key: &RsaPrivateKey,
) -> Result<String> {
    let data: EncryptedData = xml_from_str(encrypted_data_xml)?;

    let encrypted_key = match data.key_info.and_then(|k| k.encrypted_key) {
        Some(key) => key,
        None => {
            let sibling = sibling_key.ok_or(Error::MissingKey)?;
            xml_from_str(sibling)?
        }
    };

    let cipher = data.encryption_method.cipher()?;
    let session_key = encrypted_key.unwrap_key(private_key)?;
    let ciphertext = decode_base64(&data.cipher_data.cipher_value)?;
    let plaintext = cipher.decrypt(&session_key, &ciphertext)?;

    Ok(String::from_utf8(plaintext)?)
}

/// Decrypt every `EncryptedData` block of `xml`, returning the plaintexts in
/// document order.
///
/// Blocks are decrypted in parallel; any failing block fails the whole call.
pub async fn decrypt_all(xml: &str, private_key: &RsaPrivateKey) -> Result<Vec<String>> {
    let blocks = locate_blocks(xml)?;
    debug!(blocks = blocks.len(), "Decrypting EncryptedData blocks");

    let handles: Vec<_> = blocks
        .into_iter()
        .map(|(data, key)| {
            let data = xml[data.start..data.end].to_string();
            let key = key.map(|span| xml[span.start..span.end].to_string());
            let private_key = private_key.clone();
            tokio::task::spawn_blocking(move || {
                decrypt_element(&data, key.as_deref(), &private_key)
            })
        })
        .collect();

    let mut plaintexts = Vec::with_capacity(handles.len());
    for handle in handles {
        plaintexts.push(handle.await??);
    }
    Ok(plaintexts)
}

/// Pair every `EncryptedData` with the `EncryptedKey` sitting next to it,
/// if its key is not embedded
fn locate_blocks(xml: &str) -> Result<Vec<(Span, Option<Span>)>> {
    let data_spans = xml::find_elements(xml, "EncryptedData", Some(ns::XMLENC), None)?;
    let free_keys: Vec<Span> = xml::find_elements(xml, "EncryptedKey", Some(ns::XMLENC), None)?
        .into_iter()
        .filter(|key| !data_spans.iter().any(|data| data.contains(key)))
        .collect();

    let blocks = data_spans
        .iter()
        .map(|data| {
            let no_data_between = |from: usize, to: usize| {
                !data_spans
                    .iter()
                    .any(|other| other.start >= from && other.start < to)
            };
            let following = free_keys
                .iter()
                .find(|key| key.start >= data.end && no_data_between(data.end, key.start));
            let preceding = free_keys
                .iter()
                .rev()
                .find(|key| key.end <= data.start && no_data_between(key.end, data.start));
            (*data, following.or(preceding).copied())
        })
        .collect();
    Ok(blocks)
}

fn decode_base64(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.split_whitespace().collect();
    Ok(BASE64.decode(compact)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{KeyPlacement, TestIdentity, encrypt_block};

    const NAME_ID: &str = "<saml2:NameID>TNQ-BIN-123</saml2:NameID>";
    const ATTRIBUTE: &str = r#"<saml2:Attribute Name="urn:nl:bvn:bankid:1.0:consumer.bin"><saml2:AttributeValue>abc</saml2:AttributeValue></saml2:Attribute>"#;

    #[tokio::test]
    async fn test_decrypt_all_in_document_order() {
        let identity = TestIdentity::generate();
        let xml = format!(
            "<root>{}{}</root>",
            encrypt_block(&identity, NAME_ID, algorithms::AES256_CBC, KeyPlacement::KeyInfo),
            encrypt_block(&identity, ATTRIBUTE, algorithms::AES128_GCM, KeyPlacement::Sibling),
        );

        let plaintexts = decrypt_all(&xml, &identity.private_key).await.unwrap();
        assert_eq!(plaintexts, vec![NAME_ID.to_string(), ATTRIBUTE.to_string()]);
    }

    #[tokio::test]
    async fn test_no_blocks_yields_nothing() {
        let identity = TestIdentity::generate();
        let plaintexts = decrypt_all("<root/>", &identity.private_key).await.unwrap();
        assert!(plaintexts.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_key_fails_whole_call() {
        let identity = TestIdentity::generate();
        let other = TestIdentity::generate();
        let xml = format!(
            "<root>{}</root>",
            encrypt_block(&identity, NAME_ID, algorithms::AES256_GCM, KeyPlacement::KeyInfo),
        );

        assert!(decrypt_all(&xml, &other.private_key).await.is_err());
    }

    #[test]
    fn test_missing_key_is_reported() {
        let identity = TestIdentity::generate();
        let block = encrypt_block(&identity, NAME_ID, algorithms::AES128_CBC, KeyPlacement::Sibling);
        let data_span = xml::find_elements(&block, "EncryptedData", Some(ns::XMLENC), None).unwrap()[0];

        let result = decrypt_element(
            &block[data_span.start..data_span.end],
            None,
            &identity.private_key,
        );
        assert!(matches!(result, Err(Error::MissingKey)));
    }

    #[test]
    fn test_unsupported_cipher_is_rejected() {
        let method = EncryptionMethod {
            algorithm: "http://www.w3.org/2001/04/xmlenc#tripledes-cbc".into(),
            digest_method: None,
            mgf: None,
        };
        assert!(matches!(method.cipher(), Err(Error::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn test_oaep_parameters() {
        let method = EncryptionMethod {
            algorithm: algorithms::RSA_OAEP.into(),
            digest_method: Some(AlgorithmElement {
                algorithm: algorithms::SHA256.into(),
            }),
            mgf: Some(AlgorithmElement {
                algorithm: algorithms::MGF1_SHA256.into(),
            }),
        };
        assert_eq!(
            method.key_transport().unwrap(),
            KeyTransport::Oaep {
                digest: HashAlg::Sha256,
                mgf1: HashAlg::Sha256,
            }
        );
    }
}
