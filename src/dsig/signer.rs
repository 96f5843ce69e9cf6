use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use quick_xml::se::to_string_with_root as xml_to_string;
use tracing::debug;

use crate::crypto::rsa::{self, RsaPrivateKey, RsaPublicKey};
use crate::crypto::HashAlg;
use crate::dsig::{
    AlgorithmElement, Error, KeyInfo, Reference, Result, Signature, SignedInfo, Transforms,
    algorithms, verifier,
};
use crate::xml::{self, ns};

/// Configuration for signing outgoing messages
pub struct SignConfig {
    /// Merchant signing key
    pub private_key: RsaPrivateKey,

    /// Public half of the signing key, used for the self-check
    pub public_key: RsaPublicKey,

    /// Text placed in `KeyInfo/KeyName`
    pub key_name: String,
}

/// Sign `xml` with an enveloped signature appended to the document element.
///
/// The signed document is verified against `config.public_key` before it is
/// returned; a document that does not verify is never handed out.
pub fn sign_document(xml: &str, config: &SignConfig) -> Result<String> {
    let canonical = xml::canonicalize(xml, None)?;
    let digest = HashAlg::Sha256.hash(canonical.as_bytes())?;

    let reference = Reference {
        uri: String::new(),
        transforms: Some(Transforms {
            transforms: vec![
                AlgorithmElement::new(algorithms::ENVELOPED_SIGNATURE),
                AlgorithmElement::new(algorithms::EXCLUSIVE_C14N),
            ],
        }),
        digest_method: AlgorithmElement::new(algorithms::SHA256),
        digest_value: BASE64.encode(&digest),
    };

    let mut signed_info = SignedInfo {
        xmlns: Some(ns::DSIG.to_string()),
        canonicalization_method: AlgorithmElement::new(algorithms::EXCLUSIVE_C14N),
        signature_method: AlgorithmElement::new(algorithms::RSA_SHA256),
        references: vec![reference],
    };

    // Standalone SignedInfo with its inherited namespace canonicalizes the
    // same as the embedded one
    let signed_info_xml = xml_to_string("SignedInfo", &signed_info)?;
    let signed_info_c14n = xml::canonicalize(&signed_info_xml, None)?;

    let signature_value = rsa::sign(
        &config.private_key,
        signed_info_c14n.as_bytes(),
        HashAlg::Sha256,
    )?;

    signed_info.xmlns = None;
    let signature = Signature {
        xmlns: Some(ns::DSIG.to_string()),
        signed_info,
        signature_value: BASE64.encode(&signature_value),
        key_info: Some(KeyInfo {
            key_name: Some(config.key_name.clone()),
        }),
    };

    let signature_xml = xml_to_string("Signature", &signature)?;
    let signed = xml::insert_before_root_end(xml, &signature_xml)?;

    verifier::verify_with_key(&signed, &config.public_key).map_err(|e| match e {
        Error::Verification(detail) => {
            Error::Verification(format!("Own signature does not verify: {detail}"))
        }
        other => other,
    })?;

    debug!(bytes = signed.len(), "Document signed");
    Ok(signed)
}
