use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use quick_xml::de::from_str as xml_from_str;
use tracing::debug;

use crate::crypto::rsa::{self, RsaPublicKey};
use crate::dsig::types::{digest_alg, signature_alg};
use crate::dsig::{Error, Reference, Result, Signature, algorithms, key_info};
use crate::xml::{self, Span, ns};

/// Verify the enveloped signature of `signed_xml` against caller-provided
/// key material and hand the document back for parsing.
pub fn verify<'a>(signed_xml: &'a str, key_material: &str) -> Result<&'a str> {
    let signed_xml = signed_xml.trim();
    let public_key = key_info::provided_key(key_material)?;
    verify_with_key(signed_xml, &public_key)?;
    Ok(signed_xml)
}

/// Verify the last XML-DSig `Signature` that is a direct child of the
/// document element
pub fn verify_with_key(signed_xml: &str, public_key: &RsaPublicKey) -> Result<()> {
    let signature_span = xml::find_elements(signed_xml, "Signature", Some(ns::DSIG), Some(2))?
        .pop()
        .ok_or_else(|| Error::Verification("No signature found in document".into()))?;

    let signature: Signature =
        xml_from_str(&signed_xml[signature_span.start..signature_span.end])?;
    let signed_info = &signature.signed_info;

    if signed_info.references.is_empty() {
        return Err(Error::Verification("SignedInfo has no references".into()));
    }
    for reference in &signed_info.references {
        verify_reference(signed_xml, signature_span, reference)?;
    }

    let canon_method = &signed_info.canonicalization_method;
    if canon_method.algorithm != algorithms::EXCLUSIVE_C14N {
        return Err(Error::Verification(format!(
            "Unsupported canonicalization algorithm: {}",
            canon_method.algorithm
        )));
    }

    let signed_info_span = xml::find_elements(signed_xml, "SignedInfo", Some(ns::DSIG), Some(3))?
        .into_iter()
        .find(|span| signature_span.contains(span))
        .ok_or_else(|| Error::Verification("SignedInfo not found".into()))?;
    let signed_info_xml = xml::extract_in_context(signed_xml, signed_info_span)?;
    let prefixes = canon_method.prefix_list();
    let signed_info_c14n = xml::canonicalize(&signed_info_xml, prefixes.as_deref())?;

    let hash_alg = signature_alg(&signed_info.signature_method.algorithm)?;
    let signature_bytes = decode_base64(&signature.signature_value)?;

    if !rsa::verify(
        public_key,
        signed_info_c14n.as_bytes(),
        &signature_bytes,
        hash_alg,
    )? {
        return Err(Error::Verification("Signature value does not match".into()));
    }

    debug!(
        references = signed_info.references.len(),
        "Signature verified"
    );
    Ok(())
}

/// Recompute and compare the digest of a single reference
fn verify_reference(signed_xml: &str, signature_span: Span, reference: &Reference) -> Result<()> {
    let transforms = reference
        .transforms
        .as_ref()
        .map(|t| t.transforms.as_slice())
        .unwrap_or_default();

    let mut prefixes = None;
    let mut enveloped = false;
    for transform in transforms {
        match transform.algorithm.as_str() {
            algorithms::ENVELOPED_SIGNATURE => enveloped = true,
            algorithms::EXCLUSIVE_C14N => prefixes = transform.prefix_list(),
            alg => {
                return Err(Error::Verification(format!("Unsupported transform: {alg}")));
            }
        }
    }

    let document = if enveloped {
        xml::remove_span(signed_xml, signature_span)
    } else {
        signed_xml.to_string()
    };

    let target = match reference.uri.as_str() {
        "" => document,
        uri => {
            let id = uri.strip_prefix('#').ok_or_else(|| {
                Error::Verification(format!("Unsupported reference URI: {uri}"))
            })?;
            let span = match xml::find_elements_by_id(&document, id)?.as_slice() {
                [span] => *span,
                [] => {
                    return Err(Error::Verification(format!(
                        "Referenced element not found: {uri}"
                    )));
                }
                _ => {
                    return Err(Error::Verification(format!("Id '{id}' is not unique")));
                }
            };
            // only the document element may be referenced
            if span.start != xml::document_element(&document)?.start {
                return Err(Error::Verification(format!(
                    "Reference {uri} does not cover the document element"
                )));
            }
            xml::extract_in_context(&document, span)?
        }
    };

    let canonical = xml::canonicalize(&target, prefixes.as_deref())?;
    let hash_alg = digest_alg(&reference.digest_method.algorithm)?;
    let computed = hash_alg.hash(canonical.as_bytes())?;
    let expected = decode_base64(&reference.digest_value)?;

    if computed != expected {
        return Err(Error::Verification(format!(
            "Digest mismatch for reference '{}'",
            reference.uri
        )));
    }
    Ok(())
}

/// Base64 text content may be wrapped over several lines
fn decode_base64(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.split_whitespace().collect();
    Ok(BASE64.decode(compact)?)
}
