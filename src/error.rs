use crate::params::ParameterError;
use crate::transport::TransportError;
use crate::{dsig, xml, xmlenc};

/// Errors raised by the client operations.
///
/// An error answer from the bank is not an `Error`; it decodes to
/// [`Outcome::Error`](crate::response::Outcome::Error).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Signature(#[from] dsig::Error),

    #[error("Attribute decryption failed: {0}")]
    Decryption(#[from] xmlenc::Error),

    #[error(transparent)]
    Xml(#[from] xml::Error),

    #[error("Malformed response: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, Error>;
