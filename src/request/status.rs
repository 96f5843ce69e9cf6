use serde::Serialize;

use crate::error::Result;
use crate::params::{GeneralParameters, StatusParameters};
use crate::request::{Merchant, PRODUCT_ID, VERSION, timestamp, to_signed_xml};
use crate::xml::ns;

#[derive(Debug, Serialize)]
struct AcquirerStatusReq<'a> {
    #[serde(rename = "@version")]
    version: &'static str,
    #[serde(rename = "@productID")]
    product_id: &'static str,
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "@xmlns:ds")]
    xmlns_ds: &'static str,
    #[serde(rename = "@xmlns:xsi")]
    xmlns_xsi: &'static str,
    #[serde(rename = "createDateTimestamp")]
    create_date_timestamp: String,
    #[serde(rename = "Merchant")]
    merchant: Merchant<'a>,
    #[serde(rename = "Transaction")]
    transaction: Transaction<'a>,
}

#[derive(Debug, Serialize)]
struct Transaction<'a> {
    #[serde(rename = "transactionID")]
    transaction_id: &'a str,
}

/// Signed `AcquirerStatusReq` for a previously started transaction
pub fn status_request(general: &GeneralParameters, params: &StatusParameters) -> Result<String> {
    let request = AcquirerStatusReq {
        version: VERSION,
        product_id: PRODUCT_ID,
        xmlns: ns::IDX,
        xmlns_ds: ns::DSIG,
        xmlns_xsi: ns::XSI,
        create_date_timestamp: timestamp(),
        merchant: Merchant::new(general),
        transaction: Transaction {
            transaction_id: &params.transaction_id,
        },
    };
    to_signed_xml("AcquirerStatusReq", &request, general)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestIdentity;

    #[test]
    fn test_status_request_carries_transaction_id() {
        let merchant = TestIdentity::generate();
        let general = merchant.general_parameters(&merchant, "http://localhost");
        let params = StatusParameters {
            transaction_id: "0050000000000123".into(),
        };

        let xml = status_request(&general, &params).unwrap();
        assert!(xml.contains("<AcquirerStatusReq version=\"1.0.0\""));
        assert!(xml.contains("<Transaction><transactionID>0050000000000123</transactionID></Transaction>"));
    }
}
