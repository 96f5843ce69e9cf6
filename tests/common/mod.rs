#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    routing::post,
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use idin_client::{
    GeneralParameters,
    crypto::{
        certificate_fingerprint,
        rsa::{RsaPrivateKey, RsaPublicKey},
    },
    dsig::{SignConfig, sign_document},
    xml::ns,
    xmlenc::algorithms,
};
use openssl::{
    asn1::Asn1Time,
    bn::BigNum,
    encrypt::Encrypter,
    hash::MessageDigest,
    nid::Nid,
    pkey::{PKey, Private},
    rand::rand_bytes,
    rsa::{Padding, Rsa},
    symm::{self, Cipher},
    x509::{X509Builder, X509NameBuilder},
};
use secrecy::SecretString;

pub const IDX_NS: &str = "http://www.betaalvereniging.nl/iDx/messages/Merchant-Acquirer/1.0.0";

/// Key pair and self-signed certificate of a merchant or a bank
pub struct Identity {
    pub key_pem: String,
    pub certificate_pem: String,
    pub fingerprint: String,
    pkey: PKey<Private>,
}

impl Identity {
    pub fn generate(common_name: &str) -> Self {
        let pkey = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_nid(Nid::COMMONNAME, common_name).unwrap();
        let name = name.build();

        let mut builder = X509Builder::new().unwrap();
        builder.set_version(2).unwrap();
        let serial = BigNum::from_u32(7).unwrap().to_asn1_integer().unwrap();
        builder.set_serial_number(&serial).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&pkey).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(30).unwrap())
            .unwrap();
        builder.sign(&pkey, MessageDigest::sha256()).unwrap();

        let certificate_pem = String::from_utf8(builder.build().to_pem().unwrap()).unwrap();
        let key_pem = String::from_utf8(pkey.private_key_to_pem_pkcs8().unwrap()).unwrap();

        Self {
            fingerprint: certificate_fingerprint(&certificate_pem).unwrap(),
            key_pem,
            certificate_pem,
            pkey,
        }
    }

    /// Sign `xml` the way a routing service signs its replies
    pub fn sign(&self, xml: &str) -> String {
        let config = SignConfig {
            private_key: RsaPrivateKey::from_pem(&self.key_pem).unwrap(),
            public_key: RsaPublicKey::from_certificate_pem(&self.certificate_pem).unwrap(),
            key_name: self.fingerprint.clone(),
        };
        sign_document(xml, &config).unwrap()
    }

    /// Parameters of a merchant using this identity and trusting `bank`
    pub fn general_parameters(&self, bank: &Identity, endpoint: &str) -> GeneralParameters {
        GeneralParameters {
            merchant_id: "0020000387".into(),
            merchant_sub_id: "0".into(),
            private_key: SecretString::from(self.key_pem.clone()),
            public_key: self.certificate_pem.clone(),
            public_key_fingerprint: self.fingerprint.clone(),
            routing_cert: bank.certificate_pem.clone(),
            routing_endpoint: endpoint.into(),
        }
    }

    /// Encrypt `plaintext` to this identity as an `EncryptedAttribute`
    /// (AES-256-CBC, session key wrapped with RSA-OAEP)
    pub fn encrypt_attribute(&self, plaintext: &str) -> String {
        let mut session_key = [0u8; 32];
        rand_bytes(&mut session_key).unwrap();
        let mut iv = [0u8; 16];
        rand_bytes(&mut iv).unwrap();

        let mut payload = iv.to_vec();
        payload.extend(
            symm::encrypt(
                Cipher::aes_256_cbc(),
                &session_key,
                Some(&iv),
                plaintext.as_bytes(),
            )
            .unwrap(),
        );

        let mut encrypter = Encrypter::new(&self.pkey).unwrap();
        encrypter.set_rsa_padding(Padding::PKCS1_OAEP).unwrap();
        let mut wrapped = vec![0u8; encrypter.encrypt_len(&session_key).unwrap()];
        let len = encrypter.encrypt(&session_key, &mut wrapped).unwrap();
        wrapped.truncate(len);

        format!(
            r#"<saml2:EncryptedAttribute xmlns:saml2="{saml}"><xenc:EncryptedData xmlns:xenc="{xenc}"><xenc:EncryptionMethod Algorithm="{data_alg}"/><ds:KeyInfo xmlns:ds="{dsig}"><xenc:EncryptedKey><xenc:EncryptionMethod Algorithm="{key_alg}"/><xenc:CipherData><xenc:CipherValue>{key}</xenc:CipherValue></xenc:CipherData></xenc:EncryptedKey></ds:KeyInfo><xenc:CipherData><xenc:CipherValue>{data}</xenc:CipherValue></xenc:CipherData></xenc:EncryptedData></saml2:EncryptedAttribute>"#,
            saml = ns::SAML_ASSERTION,
            xenc = ns::XMLENC,
            dsig = ns::DSIG,
            data_alg = algorithms::AES256_CBC,
            key_alg = algorithms::RSA_OAEP_MGF1P,
            key = BASE64.encode(&wrapped),
            data = BASE64.encode(&payload),
        )
    }
}

struct BankState {
    status: StatusCode,
    reply: String,
    requests: Mutex<Vec<String>>,
}

/// Routing service double answering every POST with one canned reply
pub struct FakeBank {
    pub endpoint: String,
    state: Arc<BankState>,
}

impl FakeBank {
    /// Request bodies received so far
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn handle(State(state): State<Arc<BankState>>, body: String) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    state.requests.lock().unwrap().push(body);
    (
        state.status,
        [(header::CONTENT_TYPE, "text/xml; charset=utf-8")],
        state.reply.clone(),
    )
}

// Helper function to spawn a routing service on a random port
pub async fn spawn_bank(status: StatusCode, reply: String) -> FakeBank {
    let state = Arc::new(BankState {
        status,
        reply,
        requests: Mutex::new(Vec::new()),
    });
    let app = Router::new()
        .route("/idx", post(handle))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("failed to run fake bank");
    });

    FakeBank {
        endpoint: format!("http://127.0.0.1:{port}/idx"),
        state,
    }
}
