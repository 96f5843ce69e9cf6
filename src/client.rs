//! Public entry points for the three iDx operations.
//!
//! Every operation validates its parameters before any I/O, signs its
//! request, verifies the signed reply and decodes it. An error document from
//! the bank comes back as [`Outcome::Error`], not as `Err`.

use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::{info, instrument};

use crate::crypto::rsa::RsaPrivateKey;
use crate::error::Result;
use crate::params::{GeneralParameters, ParameterError, StatusParameters, TransactionParams};
use crate::response::{
    self, DirectoryResponse, Outcome, StatusResponse, TransactionResponse,
};
use crate::transport::{HttpTransport, Transport, fetch_response};
use crate::{request, xmlenc};

/// iDIN client bound to one merchant configuration
pub struct IdinClient<T: Transport = HttpTransport> {
    general: GeneralParameters,
    transport: T,
}

impl IdinClient<HttpTransport> {
    pub fn new(general: GeneralParameters) -> Self {
        Self::with_transport(general, HttpTransport::default())
    }
}

impl<T: Transport> IdinClient<T> {
    pub fn with_transport(general: GeneralParameters, transport: T) -> Self {
        Self { general, transport }
    }

    pub fn general_parameters(&self) -> &GeneralParameters {
        &self.general
    }

    /// Fetch the list of participating issuers
    #[instrument(skip(self), fields(merchant = %self.general.merchant_id))]
    pub async fn get_directory(&self) -> Result<Outcome<DirectoryResponse>> {
        self.general.validate()?;

        let payload = request::directory_request(&self.general)?;
        let reply = self.send(payload).await?;
        let outcome = response::parse_directory(&reply)?;

        info!(error = outcome.is_error(), "Directory response decoded");
        Ok(outcome)
    }

    /// Start an authentication at the issuer named in `params`
    #[instrument(skip(self, params), fields(transaction_id = %params.transaction_id))]
    pub async fn get_transaction(
        &self,
        params: &TransactionParams,
    ) -> Result<Outcome<TransactionResponse>> {
        params.validate()?;
        self.general.validate()?;

        let payload = request::transaction_request(&self.general, params)?;
        let reply = self.send(payload).await?;
        let outcome = response::parse_transaction(&reply)?;

        info!(error = outcome.is_error(), "Transaction response decoded");
        Ok(outcome)
    }

    /// Query the outcome of a transaction and decrypt the consumer attributes
    #[instrument(skip(self, params), fields(transaction_id = %params.transaction_id))]
    pub async fn get_status(&self, params: &StatusParameters) -> Result<Outcome<StatusResponse>> {
        params.validate()?;
        self.general.validate()?;

        let payload = request::status_request(&self.general, params)?;
        let reply = self.send(payload).await?;

        let private_key = RsaPrivateKey::from_pem(self.general.private_key.expose_secret())
            .map_err(xmlenc::Error::from)?;
        let decrypted = xmlenc::decrypt_all(&reply, &private_key).await?;
        let outcome = response::parse_status(&reply, &decrypted)?;

        info!(
            error = outcome.is_error(),
            attributes = decrypted.len(),
            "Status response decoded"
        );
        Ok(outcome)
    }

    async fn send(&self, payload: String) -> Result<String> {
        fetch_response(
            &self.transport,
            &self.general.routing_endpoint,
            payload,
            &self.general.routing_cert,
        )
        .await
    }
}

/// Directory call on untyped parameters
pub async fn get_directory_json<T: Transport>(
    transport: T,
    general: Option<&Value>,
) -> Result<Outcome<DirectoryResponse>> {
    let general = GeneralParameters::from_value(general)?;
    IdinClient::with_transport(general, transport)
        .get_directory()
        .await
}

/// Transaction call on untyped parameters
pub async fn get_transaction_json<T: Transport>(
    transport: T,
    general: Option<&Value>,
    specific: Option<&Value>,
) -> Result<Outcome<TransactionResponse>> {
    let (general, params) = untyped(general, specific, TransactionParams::from_value)?;
    IdinClient::with_transport(general, transport)
        .get_transaction(&params)
        .await
}

/// Status call on untyped parameters
pub async fn get_status_json<T: Transport>(
    transport: T,
    general: Option<&Value>,
    specific: Option<&Value>,
) -> Result<Outcome<StatusResponse>> {
    let (general, params) = untyped(general, specific, StatusParameters::from_value)?;
    IdinClient::with_transport(general, transport)
        .get_status(&params)
        .await
}

/// Presence checks in the order callers of the JSON surface rely on:
/// general object, specific object, specific keys, general keys
fn untyped<P>(
    general: Option<&Value>,
    specific: Option<&Value>,
    parse_specific: impl FnOnce(Option<&Value>) -> std::result::Result<P, ParameterError>,
) -> std::result::Result<(GeneralParameters, P), ParameterError> {
    if general.is_none() {
        return Err(ParameterError::NoGeneralParameters);
    }
    if specific.is_none() {
        return Err(ParameterError::NoSpecificParameters);
    }
    let params = parse_specific(specific)?;
    let general = GeneralParameters::from_value(general)?;
    Ok((general, params))
}
