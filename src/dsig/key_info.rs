use crate::crypto::rsa::RsaPublicKey;
use crate::dsig::Result;

/// Public key used to verify a signature from caller-provided key material.
///
/// The material is a PEM certificate, a PEM public key, or the bare base64
/// body of a DER certificate.
pub fn provided_key(material: &str) -> Result<RsaPublicKey> {
    Ok(RsaPublicKey::from_key_material(material)?)
}

/// `KeyInfo` content identifying our signing key to the counterparty
pub fn key_name(fingerprint: &str) -> String {
    fingerprint.trim().to_string()
}
