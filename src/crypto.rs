mod errors;
pub mod rsa;
pub mod sym;

pub use errors::Error;

use errors::CryptoResult;
use openssl::hash::MessageDigest;
use openssl::x509::X509;

/// Digest algorithms named by XML-DSig and XML-Enc URIs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlg {
    Sha1,
    Sha256,
    Sha512,
}

impl HashAlg {
    pub fn hash(self, data: impl AsRef<[u8]>) -> CryptoResult<Vec<u8>> {
        Ok(openssl::hash::hash(self.message_digest(), data.as_ref())?.to_vec())
    }

    pub(crate) fn message_digest(self) -> MessageDigest {
        match self {
            HashAlg::Sha1 => MessageDigest::sha1(),
            HashAlg::Sha256 => MessageDigest::sha256(),
            HashAlg::Sha512 => MessageDigest::sha512(),
        }
    }
}

/// Upper-case hex SHA-1 thumbprint of a PEM certificate.
///
/// This is the value banks expect in the `KeyName` of a merchant signature.
pub fn certificate_fingerprint(cert_pem: impl AsRef<[u8]>) -> CryptoResult<String> {
    let cert = X509::from_pem(cert_pem.as_ref())?;
    let der = cert.to_der()?;
    Ok(hex::encode_upper(HashAlg::Sha1.hash(der)?))
}
