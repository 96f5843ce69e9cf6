use serde::Serialize;

use crate::error::Result;
use crate::params::{GeneralParameters, TransactionParams};
use crate::request::{
    Merchant, PRODUCT_ID, VERSION, entrance_suffix, timestamp, to_signed_xml,
};
use crate::xml::ns;

const SAML_VERSION: &str = "2.0";
const PROTOCOL_BINDING: &str = "nl:bvn:bankid:1.0:protocol:iDx";
const LOA_PREFIX: &str = "nl:bvn:bankid:1.0:";

#[derive(Debug, Serialize)]
struct AcquirerTrxReq<'a> {
    #[serde(rename = "@version")]
    version: &'static str,
    #[serde(rename = "@productID")]
    product_id: &'static str,
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "@xmlns:ds")]
    xmlns_ds: &'static str,
    #[serde(rename = "createDateTimestamp")]
    create_date_timestamp: String,
    #[serde(rename = "Issuer")]
    issuer: Issuer<'a>,
    #[serde(rename = "Merchant")]
    merchant: Merchant<'a>,
    #[serde(rename = "Transaction")]
    transaction: Transaction<'a>,
}

#[derive(Debug, Serialize)]
struct Issuer<'a> {
    #[serde(rename = "issuerID")]
    issuer_id: &'a str,
}

#[derive(Debug, Serialize)]
struct Transaction<'a> {
    #[serde(rename = "expirationPeriod")]
    expiration_period: &'a str,
    language: &'a str,
    #[serde(rename = "entranceCode")]
    entrance_code: String,
    container: Container<'a>,
}

#[derive(Debug, Serialize)]
struct Container<'a> {
    #[serde(rename = "samlp:AuthnRequest")]
    authn_request: AuthnRequest<'a>,
}

#[derive(Debug, Serialize)]
struct AuthnRequest<'a> {
    #[serde(rename = "@xmlns:samlp")]
    xmlns_samlp: &'static str,
    #[serde(rename = "@xmlns:saml")]
    xmlns_saml: &'static str,
    #[serde(rename = "@AttributeConsumingServiceIndex")]
    attribute_consuming_service_index: u32,
    #[serde(rename = "@ID")]
    id: String,
    #[serde(rename = "@IssueInstant")]
    issue_instant: String,
    #[serde(rename = "@Version")]
    version: &'static str,
    #[serde(rename = "@ProtocolBinding")]
    protocol_binding: &'static str,
    #[serde(rename = "@AssertionConsumerServiceURL")]
    assertion_consumer_service_url: &'a str,
    #[serde(rename = "saml:Issuer")]
    issuer: &'a str,
    #[serde(rename = "samlp:RequestedAuthnContext")]
    requested_authn_context: RequestedAuthnContext,
}

#[derive(Debug, Serialize)]
struct RequestedAuthnContext {
    #[serde(rename = "@Comparison")]
    comparison: &'static str,
    #[serde(rename = "saml:AuthnContextClassRef")]
    authn_context_class_ref: String,
}

/// Signed `AcquirerTrxReq` starting an authentication at the chosen issuer.
///
/// The embedded SAML `AuthnRequest` is identified by `idPrefix + transactionId`;
/// the entrance code appends a process-unique time suffix to that.
pub fn transaction_request(
    general: &GeneralParameters,
    params: &TransactionParams,
) -> Result<String> {
    let request_id = format!("{}{}", params.id_prefix, params.transaction_id);
    let now = timestamp();

    let request = AcquirerTrxReq {
        version: VERSION,
        product_id: PRODUCT_ID,
        xmlns: ns::IDX,
        xmlns_ds: ns::DSIG,
        create_date_timestamp: now.clone(),
        issuer: Issuer {
            issuer_id: &params.issuer_id,
        },
        merchant: Merchant {
            return_url: Some(&params.merchant_return_url),
            ..Merchant::new(general)
        },
        transaction: Transaction {
            expiration_period: &params.expiration_period,
            language: &params.default_language,
            entrance_code: format!("{request_id}{}", entrance_suffix()),
            container: Container {
                authn_request: AuthnRequest {
                    xmlns_samlp: ns::SAML_PROTOCOL,
                    xmlns_saml: ns::SAML_ASSERTION,
                    attribute_consuming_service_index: params.requested_service,
                    id: request_id,
                    issue_instant: now,
                    version: SAML_VERSION,
                    protocol_binding: PROTOCOL_BINDING,
                    assertion_consumer_service_url: &params.merchant_return_url,
                    issuer: &general.merchant_id,
                    requested_authn_context: RequestedAuthnContext {
                        comparison: "minimum",
                        authn_context_class_ref: format!("{LOA_PREFIX}{}", params.loa),
                    },
                },
            },
        },
    };
    to_signed_xml("AcquirerTrxReq", &request, general)
}
