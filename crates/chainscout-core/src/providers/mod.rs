// Provider implementations bridging API clients to RepoSource
pub mod github;

pub use github::GitHubProvider;
