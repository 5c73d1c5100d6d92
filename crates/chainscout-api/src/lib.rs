// Remote API access: GitHub search/contributors and the DeFi Llama protocol listing
pub mod github;
pub mod http;
pub mod llama;
#[cfg(any(test, feature = "stub-server"))]
pub mod stub;
pub mod throttle;

// Re-export common types
pub use github::{ContributorPage, GitHubClient, GitHubContributor, GitHubRepo};
pub use http::{FetchError, HttpFetcher, JsonResponse};
pub use llama::{LlamaClient, RawProtocol};
pub use throttle::{FixedDelay, NoDelay, Throttle};
