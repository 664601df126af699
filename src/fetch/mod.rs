//! HTTP fetch layer with cookie/header passthrough.
//!
//! This module wraps `reqwest` behind the failure policy the crawler relies
//! on: a forced `Connection: keep-alive` header, exactly one retry after a
//! fixed delay when the transport fails, and lenient non-200 handling unless
//! the caller opts into strict mode.
//!
//! # Example
//!
//! ```no_run
//! use gallerist_core::fetch::FetchClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FetchClient::new();
//! let bytes = client.fetch_bytes("https://example.com/galleries").await?;
//! println!("fetched {} bytes", bytes.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod cookies;
mod disposition;
mod error;

pub use client::{DEFAULT_RETRY_DELAY, FetchClient, NameSource};
pub use cookies::{CookieInput, cookie_header_to_map};
pub use disposition::filename_from_disposition;
pub use error::FetchError;
