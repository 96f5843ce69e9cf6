use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::response::{
    Country, Directory, DirectoryResponse, Issuer, Outcome, acquirer, decode, text_at,
};
use crate::xml::compact::{child, one_or_many};

/// Decode a verified `DirectoryRes`.
///
/// Countries and their issuers are always returned as lists, whether the
/// document holds one or several of them.
pub fn parse_directory(xml: &str) -> Result<Outcome<DirectoryResponse>> {
    decode(xml, "DirectoryRes", |root| {
        let directory = child(root, "Directory").unwrap_or(&Value::Null);
        let countries = one_or_many(child(directory, "Country").unwrap_or(&Value::Null))
            .into_iter()
            .map(country)
            .collect::<Result<Vec<_>>>()?;

        debug!(countries = countries.len(), "Directory decoded");
        Ok(DirectoryResponse {
            create_date_timestamp: text_at(root, &["createDateTimestamp"])?,
            acquirer: acquirer(root)?,
            directory: Directory {
                directory_date_timestamp: text_at(root, &["Directory", "directoryDateTimestamp"])?,
                countries,
            },
        })
    })
}

fn country(node: &Value) -> Result<Country> {
    let issuers = one_or_many(child(node, "Issuer").unwrap_or(&Value::Null))
        .into_iter()
        .map(|issuer| {
            Ok(Issuer {
                issuer_id: text_at(issuer, &["issuerID"])?,
                issuer_name: text_at(issuer, &["issuerName"])?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Country {
        country_names: text_at(node, &["countryNames"])?,
        issuers,
    })
}
