//! Proxy key handling and validation of submitted listing URLs.

mod api_key;
mod validator;

pub use api_key::ProxyApiKey;
pub use validator::UrlValidator;
