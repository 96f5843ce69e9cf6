use serde::Serialize;

use crate::error::Result;
use crate::params::GeneralParameters;
use crate::request::{Merchant, PRODUCT_ID, VERSION, timestamp, to_signed_xml};
use crate::xml::ns;

#[derive(Debug, Serialize)]
struct DirectoryReq<'a> {
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
}

/// Signed `DirectoryReq` asking for the list of participating issuers
pub fn directory_request(general: &GeneralParameters) -> Result<String> {
    let request = DirectoryReq {
        version: VERSION,
        product_id: PRODUCT_ID,
        xmlns: ns::IDX,
        xmlns_ds: ns::DSIG,
        xmlns_xsi: ns::XSI,
        create_date_timestamp: timestamp(),
        merchant: Merchant::new(general),
    };
    to_signed_xml("DirectoryReq", &request, general)
}
