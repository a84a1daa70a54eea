pub mod api_key;
pub mod rate_limit;
pub mod submission;

pub use api_key::ApiKey;
pub use rate_limit::{FixedWindowLimiter, RateLimiter, Unlimited, WindowRecord};
pub use submission::{CanonicalRecord, Category, Source, Submission, UnknownVariant};
