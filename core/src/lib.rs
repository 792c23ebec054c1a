//! Shared logic for the horoscope endpoint: configuration check, the Notion
//! database query, row flattening and the JSON response envelope. The
//! hosting adapters only translate requests and responses.

pub mod config;
pub mod horoscope;
pub mod notion;
pub mod service;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use config::{ConfigError, Credentials, Environment, ProcessEnv};
pub use horoscope::Horoscope;
pub use notion::{DatabaseQuery, NotionClient, NotionError};
pub use service::{fetch_horoscopes, Envelope, HoroscopeError, HoroscopeService, CORS_HEADERS};
