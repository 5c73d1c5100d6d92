use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::{HttpFetcher, Result};

const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// GitHub caps contributor pages at 100 entries
pub const CONTRIBUTORS_PER_PAGE: u32 = 100;

pub struct GitHubClient {
    fetcher: HttpFetcher,
    base_url: String,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_base_url(token, GITHUB_API_BASE.to_string())
    }

    /// For GitHub Enterprise or a local stub server
    pub fn with_base_url(token: Option<String>, base_url: String) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::new(token, GITHUB_ACCEPT)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Run one repository search sorted by stars, descending.
    ///
    /// `per_page` of `None` leaves GitHub's default (30) in place.
    pub async fn search_repositories(
        &self,
        query: &str,
        per_page: Option<u32>,
    ) -> Result<Vec<GitHubRepo>> {
        let url = search_url(&self.base_url, query, per_page);
        let context = format!("search query '{}'", query);

        let response = self.fetcher.get_json::<SearchResponse>(&url, &context).await?;
        debug!(
            "Query '{}' matched {} repositories, got {}",
            query,
            response.body.total_count,
            response.body.items.len()
        );

        Ok(response.body.items)
    }

    /// Fetch a single page of contributors for `owner/repo`
    pub async fn list_contributors(
        &self,
        full_name: &str,
        page: u32,
        include_anonymous: bool,
    ) -> Result<ContributorPage> {
        let url = contributors_url(
            &self.base_url,
            full_name,
            page,
            CONTRIBUTORS_PER_PAGE,
            include_anonymous,
        );
        let context = format!("contributors of {} (page {})", full_name, page);

        let response = self
            .fetcher
            .get_json::<Vec<GitHubContributor>>(&url, &context)
            .await?;

        Ok(ContributorPage {
            has_next: has_next_page(response.link.as_deref()),
            contributors: response.body,
        })
    }
}

/// Build the search URL. Qualifiers like `stars:>=10` ride inside the query text.
pub fn search_url(base_url: &str, query: &str, per_page: Option<u32>) -> String {
    let mut url = format!(
        "{}/search/repositories?q={}&sort=stars&order=desc",
        base_url,
        urlencoding::encode(query)
    );
    if let Some(per_page) = per_page {
        url.push_str(&format!("&per_page={}", per_page));
    }
    url
}

pub fn contributors_url(
    base_url: &str,
    full_name: &str,
    page: u32,
    per_page: u32,
    include_anonymous: bool,
) -> String {
    let mut url = format!(
        "{}/repos/{}/contributors?page={}&per_page={}",
        base_url, full_name, page, per_page
    );
    if include_anonymous {
        url.push_str("&anon=true");
    }
    url
}

/// True when a `Link` header advertises a `rel="next"` page.
///
/// No header at all means a single page of results.
pub fn has_next_page(link: Option<&str>) -> bool {
    link.map(|header| {
        header.split(',').any(|entry| {
            entry
                .split(';')
                .skip(1)
                .any(|param| param.trim().replace(' ', "") == "rel=\"next\"")
        })
    })
    .unwrap_or(false)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub items: Vec<GitHubRepo>,
}

/// The slice of a search hit we care about
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub id: u64,
    pub full_name: String,
    #[serde(default)]
    pub stargazers_count: u32,
    #[serde(default)]
    pub forks_count: u32,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub html_url: String,
    #[serde(default)]
    pub language: Option<String>,
}

/// Contributor entry. Anonymous ones (`anon=true`) come without login or profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubContributor {
    #[serde(default)]
    pub login: Option<String>,
    pub contributions: u64,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default, rename = "type")]
    pub account_type: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ContributorPage {
    pub contributors: Vec<GitHubContributor>,
    pub has_next: bool,
}
