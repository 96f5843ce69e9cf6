pub mod client;
pub mod config;
pub mod crypto;
pub mod dsig;
pub mod error;
pub mod params;
pub mod request;
pub mod response;
pub mod telemetry;
pub mod transport;
pub mod xml;
pub mod xmlenc;

#[cfg(test)]
mod testing;

pub use client::{IdinClient, get_directory_json, get_status_json, get_transaction_json};
pub use error::{Error, Result};
pub use params::{GeneralParameters, ParameterError, StatusParameters, TransactionParams};
pub use response::Outcome;
