pub mod error;
pub mod extract;
pub mod fetcher;
pub mod frontier;
pub mod identity;
pub mod page;

pub use error::{FetchError, ParseError, RotationError};
pub use extract::ContentExtractor;
pub use fetcher::{FetchedPage, Fetcher, HttpFetcher};
pub use frontier::FrontierState;
pub use identity::{IdentityControl, IdentityRotator, TorControl};
pub use page::{ClassificationResult, Evidence, EvidenceSource, PageRecord};
