//! Throw-away keys, certificates and encrypted blocks for unit tests.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::encrypt::Encrypter;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::rand::rand_bytes;
use openssl::rsa::Padding;
use openssl::symm::{self, Cipher as OpenSslCipher};
use openssl::x509::{X509Builder, X509NameBuilder};
use secrecy::SecretString;

use crate::crypto::rsa::{self, RsaPrivateKey, RsaPublicKey};
use crate::crypto::{HashAlg, certificate_fingerprint};
use crate::dsig::{self, SignConfig};
use crate::params::GeneralParameters;
use crate::xml::{self, ns};
use crate::xmlenc::algorithms;

/// An RSA key pair with a self-signed certificate
pub struct TestIdentity {
    pub private_key: RsaPrivateKey,
    pub private_key_pem: String,
    pub public_key_pem: String,
    pub certificate_pem: String,
    pub fingerprint: String,
}

impl TestIdentity {
    pub fn generate() -> Self {
        let private_key = RsaPrivateKey::generate(2048).unwrap();
        let pkey = private_key.pkey();

        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_nid(Nid::COMMONNAME, "idin test").unwrap();
        let name = name.build();

        let mut builder = X509Builder::new().unwrap();
        builder.set_version(2).unwrap();
        let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
        builder.set_serial_number(&serial).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(pkey).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(365).unwrap())
            .unwrap();
        builder.sign(pkey, MessageDigest::sha256()).unwrap();
        let certificate = builder.build();

        let certificate_pem = String::from_utf8(certificate.to_pem().unwrap()).unwrap();
        Self {
            private_key_pem: private_key.to_pem().unwrap(),
            public_key_pem: private_key.public_key().unwrap().to_pem().unwrap(),
            fingerprint: certificate_fingerprint(&certificate_pem).unwrap(),
            certificate_pem,
            private_key,
        }
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.private_key.public_key().unwrap()
    }

    pub fn sign_config(&self) -> SignConfig {
        SignConfig {
            private_key: self.private_key.clone(),
            public_key: self.public_key(),
            key_name: self.fingerprint.clone(),
        }
    }

    /// Merchant parameters signing with this identity, trusting `bank` for
    /// responses
    pub fn general_parameters(&self, bank: &TestIdentity, endpoint: &str) -> GeneralParameters {
        GeneralParameters {
            merchant_id: "0020000387".into(),
            merchant_sub_id: "0".into(),
            private_key: SecretString::from(self.private_key_pem.clone()),
            public_key: self.certificate_pem.clone(),
            public_key_fingerprint: self.fingerprint.clone(),
            routing_cert: bank.certificate_pem.clone(),
            routing_endpoint: endpoint.into(),
        }
    }

    /// Sign the element carrying `Id="{id}"` with a `ds:` prefixed enveloped
    /// signature appended to the document element
    pub fn sign_by_id(&self, xml: &str, id: &str) -> String {
        let span = xml::find_elements_by_id(xml, id).unwrap()[0];
        let target = xml::extract_in_context(xml, span).unwrap();
        let digest = HashAlg::Sha256
            .hash(xml::canonicalize(&target, None).unwrap())
            .unwrap();

        let signature = format!(
            r##"<ds:Signature><ds:SignedInfo><ds:CanonicalizationMethod Algorithm="{c14n}"/><ds:SignatureMethod Algorithm="{method}"/><ds:Reference URI="#{id}"><ds:Transforms><ds:Transform Algorithm="{enveloped}"/><ds:Transform Algorithm="{c14n}"/></ds:Transforms><ds:DigestMethod Algorithm="{digest_method}"/><ds:DigestValue>{digest}</ds:DigestValue></ds:Reference></ds:SignedInfo><ds:SignatureValue>SIGNATURE</ds:SignatureValue></ds:Signature>"##,
            c14n = dsig::algorithms::EXCLUSIVE_C14N,
            enveloped = dsig::algorithms::ENVELOPED_SIGNATURE,
            method = dsig::algorithms::RSA_SHA256,
            digest_method = dsig::algorithms::SHA256,
            digest = BASE64.encode(digest),
        );
        let signed = xml::insert_before_root_end(xml, &signature).unwrap();

        let signed_info = xml::find_elements(&signed, "SignedInfo", Some(ns::DSIG), Some(3))
            .unwrap()
            .pop()
            .unwrap();
        let signed_info = xml::extract_in_context(&signed, signed_info).unwrap();
        let canonical = xml::canonicalize(&signed_info, None).unwrap();
        let value = rsa::sign(&self.private_key, canonical, HashAlg::Sha256).unwrap();

        signed.replace("SIGNATURE", &BASE64.encode(&value))
    }
}

/// Where the wrapped session key of an encrypted block is placed
#[derive(Debug, Clone, Copy)]
pub enum KeyPlacement {
    /// `EncryptedData/KeyInfo/EncryptedKey`
    KeyInfo,
    /// `EncryptedKey` following `EncryptedData` in the same container
    Sibling,
}

/// Encrypt `plaintext` to `recipient` as an `EncryptedAttribute` container
pub fn encrypt_block(
    recipient: &TestIdentity,
    plaintext: &str,
    algorithm: &str,
    placement: KeyPlacement,
) -> String {
    let (cipher, key_len, iv_len, aead) = match algorithm {
        algorithms::AES128_CBC => (OpenSslCipher::aes_128_cbc(), 16, 16, false),
        algorithms::AES256_CBC => (OpenSslCipher::aes_256_cbc(), 32, 16, false),
        algorithms::AES128_GCM => (OpenSslCipher::aes_128_gcm(), 16, 12, true),
        algorithms::AES256_GCM => (OpenSslCipher::aes_256_gcm(), 32, 12, true),
        other => panic!("unsupported test cipher {other}"),
    };

    let mut session_key = vec![0u8; key_len];
    rand_bytes(&mut session_key).unwrap();
    let mut iv = vec![0u8; iv_len];
    rand_bytes(&mut iv).unwrap();

    let mut payload = iv.clone();
    if aead {
        let mut tag = [0u8; 16];
        let ciphertext =
            symm::encrypt_aead(cipher, &session_key, Some(&iv), &[], plaintext.as_bytes(), &mut tag)
                .unwrap();
        payload.extend_from_slice(&ciphertext);
        payload.extend_from_slice(&tag);
    } else {
        let ciphertext = symm::encrypt(cipher, &session_key, Some(&iv), plaintext.as_bytes()).unwrap();
        payload.extend_from_slice(&ciphertext);
    }

    let public_key = recipient.public_key();
    let mut encrypter = Encrypter::new(public_key.pkey()).unwrap();
    encrypter.set_rsa_padding(Padding::PKCS1_OAEP).unwrap();
    let mut wrapped = vec![0u8; encrypter.encrypt_len(&session_key).unwrap()];
    let len = encrypter.encrypt(&session_key, &mut wrapped).unwrap();
    wrapped.truncate(len);

    let encrypted_key = format!(
        r#"<xenc:EncryptedKey><xenc:EncryptionMethod Algorithm="{transport}"/><xenc:CipherData><xenc:CipherValue>{value}</xenc:CipherValue></xenc:CipherData></xenc:EncryptedKey>"#,
        transport = algorithms::RSA_OAEP_MGF1P,
        value = BASE64.encode(&wrapped),
    );
    let (key_info, sibling) = match placement {
        KeyPlacement::KeyInfo => (format!("<ds:KeyInfo>{encrypted_key}</ds:KeyInfo>"), String::new()),
        KeyPlacement::Sibling => (String::new(), encrypted_key),
    };

    format!(
        r#"<saml2:EncryptedAttribute xmlns:saml2="{saml}" xmlns:xenc="{xenc}" xmlns:ds="{dsig}"><xenc:EncryptedData Type="http://www.w3.org/2001/04/xmlenc#Element"><xenc:EncryptionMethod Algorithm="{algorithm}"/>{key_info}<xenc:CipherData><xenc:CipherValue>{value}</xenc:CipherValue></xenc:CipherData></xenc:EncryptedData>{sibling}</saml2:EncryptedAttribute>"#,
        saml = ns::SAML_ASSERTION,
        xenc = ns::XMLENC,
        dsig = ns::DSIG,
        value = BASE64.encode(&payload),
    )
}
