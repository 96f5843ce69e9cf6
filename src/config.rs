use std::{collections::HashMap, fs, path::Path, time::Duration};

use config::{Config as ConfigLib, ConfigError, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;

use crate::crypto::certificate_fingerprint;
use crate::params::{GeneralParameters, TransactionParams};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub merchant: MerchantConfig,
    pub routing: RoutingConfig,
    pub keys: KeysConfig,
    pub transaction: TransactionDefaults,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MerchantConfig {
    pub id: String,
    pub sub_id: String,
    #[serde(default)]
    pub return_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    pub endpoint: String,
    /// PEM certificate of the routing service
    pub certificate_path: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeysConfig {
    pub private_key_path: String,
    pub certificate_path: String,
    /// `KeyName` sent with signatures; derived from the certificate when unset
    #[serde(default)]
    pub fingerprint: Option<String>,
}

/// Values a merchant usually keeps fixed across transactions
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionDefaults {
    pub default_language: String,
    pub expiration_period: String,
    pub id_prefix: String,
    pub loa: String,
    pub requested_service: u32,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_sources(None)
    }

    pub fn load_with_sources(
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ConfigLib::builder()
            .set_default("merchant.sub_id", "0")?
            .set_default("transaction.default_language", "nl")?
            .set_default("transaction.expiration_period", "PT5M")?
            .set_default("transaction.id_prefix", "ID")?
            .set_default("transaction.loa", "loa3")?
            .set_default("transaction.requested_service", 21968)?
            .add_source(File::with_name("config/settings").required(false));

        // An explicit map replaces the process environment so tests stay isolated
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // e.g. IDIN_MERCHANT__ID or IDIN_ROUTING__ENDPOINT
            builder = builder.add_source(
                Environment::with_prefix("IDIN")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }

    /// Read the configured key files into the parameters every call needs
    pub fn general_parameters(&self) -> Result<GeneralParameters, ConfigError> {
        let private_key = read_file(&self.keys.private_key_path)?;
        let certificate = read_file(&self.keys.certificate_path)?;
        let routing_cert = read_file(&self.routing.certificate_path)?;

        let fingerprint = match &self.keys.fingerprint {
            Some(fingerprint) => fingerprint.clone(),
            None => certificate_fingerprint(&certificate).map_err(|e| {
                ConfigError::Message(format!(
                    "Cannot fingerprint {}: {e}",
                    self.keys.certificate_path
                ))
            })?,
        };

        Ok(GeneralParameters {
            merchant_id: self.merchant.id.clone(),
            merchant_sub_id: self.merchant.sub_id.clone(),
            private_key: SecretString::from(private_key),
            public_key: certificate,
            public_key_fingerprint: fingerprint,
            routing_cert,
            routing_endpoint: self.routing.endpoint.clone(),
        })
    }

    /// Transaction parameters from the configured defaults
    pub fn transaction_params(
        &self,
        issuer_id: &str,
        transaction_id: &str,
    ) -> Result<TransactionParams, ConfigError> {
        let return_url = self
            .merchant
            .return_url
            .clone()
            .ok_or_else(|| ConfigError::NotFound("merchant.return_url".into()))?;

        Ok(TransactionParams {
            default_language: self.transaction.default_language.clone(),
            expiration_period: self.transaction.expiration_period.clone(),
            id_prefix: self.transaction.id_prefix.clone(),
            issuer_id: issuer_id.to_string(),
            loa: self.transaction.loa.clone(),
            merchant_return_url: return_url,
            requested_service: self.transaction.requested_service,
            transaction_id: transaction_id.to_string(),
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.routing.timeout_secs.map(Duration::from_secs)
    }
}

fn read_file(path: &str) -> Result<String, ConfigError> {
    fs::read_to_string(Path::new(path))
        .map_err(|e| ConfigError::Message(format!("Cannot read {path}: {e}")))
}
