//! # Hookrelay Webhooks
//!
//! Webhook gateway for hookrelay providing:
//! - Envelope construction from inbound requests
//! - Best-effort publishing to a named event destination
//! - Optional `X-Hub-Signature-256` verification
//! - Repository details and file download for downstream consumers
//!
//! ## Example
//!
//! ```rust,ignore
//! use hookrelay_webhooks::{webhook_routes, WebhookGateway};
//!
//! let gateway = WebhookGateway::new(context).with_secret("s3cr3t");
//! let app = webhook_routes(Arc::new(gateway));
//! axum::serve(listener, app).await?;
//! ```

mod envelope;
mod error;
#[cfg(feature = "http-client")]
mod fetcher;
mod gateway;
mod repository;
mod routes;
mod signature;

pub use envelope::{canonical_header_key, Envelope, ENTERPRISE_HOST_HEADER, EVENT_HEADER};
pub use error::{WebhookError, WebhookResult};
#[cfg(feature = "http-client")]
pub use fetcher::{RepositoryFileFetcher, GITHUB_API_URL};
pub use gateway::{Accepted, WebhookGateway, DEFAULT_DESTINATION};
pub use repository::{commit_ref, RepositoryEvent, RepositoryInfo};
pub use routes::webhook_routes;
pub use signature::{SignatureError, WebhookSigner, SIGNATURE_HEADER};
