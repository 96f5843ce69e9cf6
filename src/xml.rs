//! XML plumbing shared by the signature, encryption and message layers.
//!
//! Everything here works on the raw document text with `quick-xml`, so the
//! bytes that are signed or verified are exactly the bytes on the wire.

mod c14n;
pub mod compact;
mod error;
mod utils;

pub use c14n::canonicalize;
pub use error::Error;
pub use utils::{
    Span, document_element, extract_in_context, find_elements, find_elements_by_id,
    insert_before_root_end, remove_span,
};

pub type Result<T> = std::result::Result<T, Error>;

/// Declaration prepended to every outgoing message
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

// Namespaces
pub mod ns {
    pub const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";
    pub const XMLENC: &str = "http://www.w3.org/2001/04/xmlenc#";
    pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
    pub const IDX: &str = "http://www.betaalvereniging.nl/iDx/messages/Merchant-Acquirer/1.0.0";
    pub const SAML_PROTOCOL: &str = "urn:oasis:names:tc:SAML:2.0:protocol";
    pub const SAML_ASSERTION: &str = "urn:oasis:names:tc:SAML:2.0:assertion";
}
