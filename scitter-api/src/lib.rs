//! Read-only client for the Scitter microblogging API.
//!
//! [`Scitter`] checks credentials and fetches timelines over the shared
//! [`scitter_http`] transport; [`decode`] turns response bodies into typed
//! [`Status`] / [`User`] values.
//!
//! ```no_run
//! # async fn demo() -> Result<(), scitter_api::ScitterError> {
//! use scitter_api::{QueryParam, Scitter};
//!
//! let scitter = Scitter::new("bob", "secret");
//! if scitter.verify_credentials().await? {
//!     for status in scitter.friends_timeline(&[QueryParam::count(5)?]).await? {
//!         println!("{status}");
//!     }
//! }
//! # Ok(()) }
//! ```
pub mod client;
pub mod credentials;
pub mod decode;
pub mod error;
pub mod params;
pub mod types;

pub use client::{DEFAULT_BASE_URL, Endpoints, Scitter, ScitterBuilder};
pub use credentials::Credentials;
pub use decode::DecodeError;
pub use error::{Result, ScitterError};
pub use params::QueryParam;
pub use scitter_http::TransportErrorKind;
pub use types::{Status, Timeline, User};
