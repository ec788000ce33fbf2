//! refscope science — PMC/PubMed identifier resolution and record reconciliation.

pub mod error;
pub mod http;
pub mod sources;
pub mod resolver;
pub mod enrichment;

pub use error::{Result, ScienceError};
pub use http::{Clock, RateLimitedClient, RateLimiter, SystemClock};
pub use resolver::{IdentifierResolver, Resolver};
pub use enrichment::{AuthorReport, ReconcileOptions, ReconcileOutcome, ReconcileReport, RecordReconciler};
