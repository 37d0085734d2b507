//! Generation oracle adapters: HTTP transport, response decoding, retry.

pub mod decode;
pub mod http;
pub mod retry;

pub use http::HttpOracle;
pub use retry::RetryPolicy;
