// GitHub provider implementation - bridges API client with RepoSource trait
use async_trait::async_trait;
use chainscout_api::{GitHubClient, GitHubContributor, GitHubRepo};

use crate::{
    contributors::ContributorBatch,
    models::{ContributorRecord, RepositoryRecord, ANONYMOUS_ACCOUNT_TYPE, ANONYMOUS_USERNAME},
    search::RepoSource,
    Result,
};

/// Wrapper around GitHubClient that implements RepoSource
pub struct GitHubProvider {
    client: GitHubClient,
}

impl GitHubProvider {
    pub fn new(token: Option<String>, api_url: &str) -> Result<Self> {
        Ok(Self {
            client: GitHubClient::with_base_url(token, api_url.to_string())?,
        })
    }
}

#[async_trait]
impl RepoSource for GitHubProvider {
    async fn search(&self, query: &str, per_page: Option<u32>) -> Result<Vec<RepositoryRecord>> {
        let repos = self.client.search_repositories(query, per_page).await?;
        Ok(repos.into_iter().map(github_to_record).collect())
    }

    async fn contributors_page(
        &self,
        full_name: &str,
        page: u32,
        include_anonymous: bool,
    ) -> Result<ContributorBatch> {
        let page = self
            .client
            .list_contributors(full_name, page, include_anonymous)
            .await?;

        Ok(ContributorBatch {
            contributors: page.contributors.into_iter().map(github_to_contributor).collect(),
            has_next: page.has_next,
        })
    }
}

/// Convert a GitHub search hit to our record. Enrichment fields start empty.
fn github_to_record(gh: GitHubRepo) -> RepositoryRecord {
    RepositoryRecord {
        id: gh.id,
        full_name: gh.full_name,
        stars: gh.stargazers_count,
        forks: gh.forks_count,
        last_updated: gh.updated_at,
        description: gh.description.unwrap_or_default(),
        topics: gh.topics,
        url: gh.html_url,
        language: Some(gh.language),
        contributors: None,
        contributors_complete: false,
    }
}

fn github_to_contributor(gh: GitHubContributor) -> ContributorRecord {
    ContributorRecord {
        username: gh
            .login
            .unwrap_or_else(|| ANONYMOUS_USERNAME.to_string()),
        contributions: gh.contributions,
        profile_url: gh.html_url.unwrap_or_default(),
        account_type: gh
            .account_type
            .unwrap_or_else(|| ANONYMOUS_ACCOUNT_TYPE.to_string()),
        source_repo: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contributors::ContributorCollector;
    use chainscout_api::stub::StubServer;
    use chainscout_api::NoDelay;

    #[test]
    fn test_null_description_becomes_empty() {
        let gh: GitHubRepo = serde_json::from_str(
            r#"{
                "id": 9,
                "full_name": "acme/ledger",
                "stargazers_count": 77,
                "forks_count": 4,
                "updated_at": "2024-03-03T03:03:03Z",
                "description": null,
                "topics": ["defi", "solana"],
                "html_url": "https://github.com/acme/ledger",
                "language": "Rust"
            }"#,
        )
        .unwrap();

        let record = github_to_record(gh);
        assert_eq!(record.description, "");
        assert_eq!(record.stars, 77);
        assert_eq!(record.topics, vec!["defi", "solana"]);
        assert_eq!(record.language, Some(Some("Rust".to_string())));
        assert_eq!(record.contributors, None);
        assert!(!record.contributors_complete);
    }

    #[test]
    fn test_contributor_without_login_is_anonymous() {
        let gh: GitHubContributor =
            serde_json::from_str(r#"{"email": "x@example.com", "contributions": 5}"#).unwrap();

        let record = github_to_contributor(gh);
        assert_eq!(record.username, "anonymous");
        assert_eq!(record.account_type, "Anonymous");
        assert_eq!(record.profile_url, "");
        assert_eq!(record.contributions, 5);
    }

    #[test]
    fn test_contributor_with_login() {
        let gh: GitHubContributor = serde_json::from_str(
            r#"{"login": "alice", "contributions": 120, "html_url": "https://github.com/alice", "type": "User"}"#,
        )
        .unwrap();

        let record = github_to_contributor(gh);
        assert_eq!(record.username, "alice");
        assert_eq!(record.account_type, "User");
        assert_eq!(record.profile_url, "https://github.com/alice");
    }

    #[tokio::test]
    async fn test_empty_repository_contributors_are_complete() {
        let server = StubServer::respond("204 No Content", &[], "").await;
        let provider = GitHubProvider::new(None, &server.base_url).unwrap();

        let collection = ContributorCollector::new(&provider, &NoDelay)
            .collect("acme/empty")
            .await;

        assert!(collection.contributors.is_empty());
        assert!(collection.complete);
        assert!(server
            .request()
            .await
            .starts_with("get /repos/acme/empty/contributors?page=1&per_page=100 "));
    }
}
