// Usage endpoint access and views
pub mod client;
pub mod summary;
pub mod types;

pub use client::{FetchError, UsageClient, UsageSource};
pub use summary::UsageSummary;
pub use types::UsageSnapshot;
