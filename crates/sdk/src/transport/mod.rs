//! Transport layer for the Tessera SDK.

pub mod http;

pub use http::HttpTransport;
