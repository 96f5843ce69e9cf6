use crate::crypto::HashAlg;
use crate::crypto::errors::{CryptoResult, Error};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use openssl::encrypt::Decrypter;
use openssl::pkey::{PKey, Private, Public};
use openssl::rsa::{Padding, Rsa};
use openssl::sign::{Signer, Verifier};
use openssl::x509::X509;
use std::fmt;

const PEM_CERTIFICATE_MARKER: &str = "-----BEGIN CERTIFICATE-----";
const PEM_RSA_PUBLIC_KEY_MARKER: &str = "-----BEGIN RSA PUBLIC KEY-----";
const PEM_MARKER: &str = "-----BEGIN";

/// Smallest modulus accepted from key files and counterparty certificates
pub const MIN_KEY_BITS: u32 = 2048;

fn check_rsa_bits<T: openssl::pkey::HasPublic>(key: &PKey<T>) -> CryptoResult<()> {
    if key.rsa().is_err() {
        return Err(Error::InvalidKey("Key is not an RSA key".into()));
    }
    if key.bits() < MIN_KEY_BITS {
        return Err(Error::InvalidKey(format!(
            "RSA key of {} bits is below the {MIN_KEY_BITS}-bit minimum",
            key.bits()
        )));
    }
    Ok(())
}

/// Merchant signing and decryption key
#[derive(Clone)]
pub struct RsaPrivateKey {
    key: PKey<Private>,
}

impl fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("bits", &self.key.bits())
            .finish_non_exhaustive()
    }
}

impl RsaPrivateKey {
    pub fn generate(bits: u32) -> CryptoResult<Self> {
        Self::from_pkey(PKey::from_rsa(Rsa::generate(bits)?)?)
    }

    /// PKCS#1 or PKCS#8 PEM
    pub fn from_pem(pem: impl AsRef<[u8]>) -> CryptoResult<Self> {
        Self::from_pkey(PKey::private_key_from_pem(pem.as_ref())?)
    }

    fn from_pkey(key: PKey<Private>) -> CryptoResult<Self> {
        check_rsa_bits(&key)?;
        Ok(Self { key })
    }

    pub fn to_pem(&self) -> CryptoResult<String> {
        let pem = self.key.private_key_to_pem_pkcs8()?;
        String::from_utf8(pem).map_err(|e| Error::Invalid(e.to_string()))
    }

    pub fn public_key(&self) -> CryptoResult<RsaPublicKey> {
        let der = self.key.public_key_to_der()?;
        RsaPublicKey::from_pkey(PKey::public_key_from_der(&der)?)
    }

    pub(crate) fn pkey(&self) -> &PKey<Private> {
        &self.key
    }
}

/// Counterparty verification key
#[derive(Debug, Clone)]
pub struct RsaPublicKey {
    key: PKey<Public>,
}

impl RsaPublicKey {
    /// Load a SubjectPublicKeyInfo or PKCS#1 PEM public key
    pub fn from_pem(pem_bytes: impl AsRef<[u8]>) -> CryptoResult<Self> {
        let pem_bytes = pem_bytes.as_ref();
        let key = if String::from_utf8_lossy(pem_bytes).contains(PEM_RSA_PUBLIC_KEY_MARKER) {
            PKey::from_rsa(Rsa::public_key_from_pem_pkcs1(pem_bytes)?)?
        } else {
            PKey::public_key_from_pem(pem_bytes)?
        };
        Self::from_pkey(key)
    }

    pub fn from_certificate_pem(pem: impl AsRef<[u8]>) -> CryptoResult<Self> {
        Self::from_pkey(X509::from_pem(pem.as_ref())?.public_key()?)
    }

    pub fn from_certificate_der(der: impl AsRef<[u8]>) -> CryptoResult<Self> {
        Self::from_pkey(X509::from_der(der.as_ref())?.public_key()?)
    }

    /// Interpret key material as configured by a caller.
    ///
    /// Accepts a PEM certificate, a PEM public key, or the bare base64 body
    /// of a DER certificate.
    pub fn from_key_material(material: &str) -> CryptoResult<Self> {
        let material = material.trim();
        if material.is_empty() {
            return Err(Error::InvalidKey("Key material is empty".into()));
        }

        if material.contains(PEM_CERTIFICATE_MARKER) {
            Self::from_certificate_pem(material)
        } else if material.contains(PEM_MARKER) {
            Self::from_pem(material)
        } else {
            let compact: String = material.split_whitespace().collect();
            let der = BASE64
                .decode(compact)
                .map_err(|e| Error::InvalidKey(format!("Key material is not PEM or base64: {e}")))?;
            Self::from_certificate_der(der)
        }
    }

    fn from_pkey(key: PKey<Public>) -> CryptoResult<Self> {
        check_rsa_bits(&key)?;
        Ok(Self { key })
    }

    /// SubjectPublicKeyInfo PEM
    pub fn to_pem(&self) -> CryptoResult<String> {
        let pem = self.key.public_key_to_pem()?;
        String::from_utf8(pem).map_err(|e| Error::Invalid(e.to_string()))
    }

    pub(crate) fn pkey(&self) -> &PKey<Public> {
        &self.key
    }
}

/// Key transport schemes used to wrap XML-Encryption session keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTransport {
    /// RSAES-PKCS1-v1_5
    Pkcs1,
    /// RSAES-OAEP
    Oaep { digest: HashAlg, mgf1: HashAlg },
}

/// RSASSA-PKCS1-v1_5 signature over `data`
pub fn sign(private_key: &RsaPrivateKey, data: impl AsRef<[u8]>, hash_alg: HashAlg) -> CryptoResult<Vec<u8>> {
    let mut signer = Signer::new(hash_alg.message_digest(), private_key.pkey())?;
    Ok(signer.sign_oneshot_to_vec(data.as_ref())?)
}

/// `Ok(false)` for a signature that does not match; `Err` only when the
/// check itself cannot run
pub fn verify(
    public_key: &RsaPublicKey,
    data: impl AsRef<[u8]>,
    signature: &[u8],
    hash_alg: HashAlg,
) -> CryptoResult<bool> {
    if signature.len() != public_key.pkey().size() {
        return Ok(false);
    }

    let mut verifier = Verifier::new(hash_alg.message_digest(), public_key.pkey())?;
    Ok(verifier.verify_oneshot(signature, data.as_ref())?)
}

/// Unwrap a session key encrypted to our RSA key
pub fn decrypt_key(
    private_key: &RsaPrivateKey,
    wrapped: impl AsRef<[u8]>,
    transport: KeyTransport,
) -> CryptoResult<Vec<u8>> {
    let wrapped = wrapped.as_ref();
    let mut decrypter = Decrypter::new(private_key.pkey())?;
    match transport {
        KeyTransport::Pkcs1 => decrypter.set_rsa_padding(Padding::PKCS1)?,
        KeyTransport::Oaep { digest, mgf1 } => {
            decrypter.set_rsa_padding(Padding::PKCS1_OAEP)?;
            decrypter.set_rsa_oaep_md(digest.message_digest())?;
            decrypter.set_rsa_mgf1_md(mgf1.message_digest())?;
        }
    }

    let mut key = vec![0u8; decrypter.decrypt_len(wrapped)?];
    let len = decrypter.decrypt(wrapped, &mut key)?;
    key.truncate(len);
    Ok(key)
}
