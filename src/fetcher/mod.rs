pub mod limited;

pub use limited::{RateLimitedFetcher, DEFAULT_MAX_CONCURRENCY, DEFAULT_TIMEOUT};
