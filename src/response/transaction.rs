use crate::error::Result;
use crate::response::{
    IssuerAuthentication, Outcome, TransactionInfo, TransactionResponse, acquirer, decode, text_at,
};

/// Decode a verified `AcquirerTrxRes`
pub fn parse_transaction(xml: &str) -> Result<Outcome<TransactionResponse>> {
    decode(xml, "AcquirerTrxRes", |root| {
        Ok(TransactionResponse {
            create_date_timestamp: text_at(root, &["createDateTimestamp"])?,
            acquirer: acquirer(root)?,
            issuer: IssuerAuthentication {
                issuer_authentication_url: text_at(root, &["Issuer", "issuerAuthenticationURL"])?,
            },
            transaction: TransactionInfo {
                transaction_id: text_at(root, &["Transaction", "transactionID"])?,
                transaction_create_date_timestamp: text_at(
                    root,
                    &["Transaction", "transactionCreateDateTimestamp"],
                )?,
            },
        })
    })
}
