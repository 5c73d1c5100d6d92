use async_trait::async_trait;
use chainscout_api::Throttle;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::{
    contributors::{ContributorBatch, ContributorCollector},
    models::{ContributorRecord, RepositoryRecord},
    Result,
};

/// Domain terms paired with a language in language-scoped searches
pub const BLOCKCHAIN_KEYWORDS: [&str; 10] = [
    "blockchain",
    "cryptocurrency",
    "web3",
    "crypto",
    "defi",
    "smart-contracts",
    "consensus",
    "distributed-ledger",
    "nft",
    "dao",
];

/// Chains/frameworks paired with a language in language-scoped searches
pub const BLOCKCHAIN_PLATFORMS: [&str; 9] = [
    "ethereum",
    "solana",
    "polkadot",
    "cosmos",
    "near",
    "cardano",
    "avalanche",
    "polygon",
    "substrate",
];

/// Where repositories and contributor pages come from.
///
/// Production uses `GitHubProvider`; tests script responses with a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RepoSource: Send + Sync {
    /// One search call, sorted by stars descending
    async fn search(&self, query: &str, per_page: Option<u32>) -> Result<Vec<RepositoryRecord>>;

    /// One page of a repo's contributors, 1-based
    async fn contributors_page(
        &self,
        full_name: &str,
        page: u32,
        include_anonymous: bool,
    ) -> Result<ContributorBatch>;
}

/// The two flavours of scrape we know how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchVariant {
    /// Popular repos around one chain, e.g. `solana`
    Blockchain,
    /// Blockchain repos written in one language, e.g. `rust`
    Language,
}

impl SearchVariant {
    /// Ordered, distinct queries to run for `keyword`
    pub fn queries(&self, keyword: &str, filters: &SearchFilters) -> Vec<String> {
        let candidates: Vec<String> = match self {
            SearchVariant::Blockchain => {
                let qualifier = filters.qualifier();
                [
                    format!("topic:{}", keyword),
                    format!("language:rust {}", keyword),
                    format!("{} blockchain", keyword),
                    format!("{} web3", keyword),
                ]
                .into_iter()
                .map(|q| format!("{} {}", q, qualifier))
                .collect()
            }
            SearchVariant::Language => BLOCKCHAIN_KEYWORDS
                .iter()
                .chain(BLOCKCHAIN_PLATFORMS.iter())
                .map(|term| format!("language:{} {}", keyword, term))
                .collect(),
        };

        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|q| seen.insert(q.clone()))
            .collect()
    }

    /// Page size sent with each search; `None` keeps GitHub's default
    pub fn per_page(&self) -> Option<u32> {
        match self {
            SearchVariant::Blockchain => Some(100),
            SearchVariant::Language => None,
        }
    }

    pub fn includes_anonymous(&self) -> bool {
        matches!(self, SearchVariant::Blockchain)
    }

    /// Blockchain runs also export one flat contributor list across repos
    pub fn tags_source_repo(&self) -> bool {
        matches!(self, SearchVariant::Blockchain)
    }

    pub fn keeps_language(&self) -> bool {
        matches!(self, SearchVariant::Language)
    }

    pub fn normalize_keyword(&self, keyword: &str) -> String {
        match self {
            SearchVariant::Blockchain => keyword.trim().to_lowercase(),
            SearchVariant::Language => keyword.trim().to_string(),
        }
    }

    pub fn report_title(&self, keyword: &str) -> String {
        match self {
            SearchVariant::Blockchain => format!("Popular {} Repositories", title_case(keyword)),
            SearchVariant::Language => format!("{} Blockchain Repositories", title_case(keyword)),
        }
    }
}

/// Capitalize the first letter of every word, lowercase the rest
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

/// Minimum popularity thresholds. Zero means no filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub min_stars: u32,
    pub min_forks: u32,
}

impl SearchFilters {
    /// Search qualifier so GitHub filters server-side where it can
    pub fn qualifier(&self) -> String {
        format!("stars:>={} forks:>={}", self.min_stars, self.min_forks)
    }

    pub fn admits(&self, repo: &RepositoryRecord) -> bool {
        repo.stars >= self.min_stars && repo.forks >= self.min_forks
    }
}

/// What one run should look for
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub variant: SearchVariant,
    pub keyword: String,
    pub filters: SearchFilters,
    pub fetch_contributors: bool,
}

impl SearchRequest {
    pub fn new(variant: SearchVariant, keyword: &str) -> Self {
        Self {
            variant,
            keyword: variant.normalize_keyword(keyword),
            filters: SearchFilters::default(),
            fetch_contributors: false,
        }
    }

    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_contributors(mut self, fetch: bool) -> Self {
        self.fetch_contributors = fetch;
        self
    }
}

/// How a single query went: number of new repos it added, or why it failed
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub query: String,
    pub result: std::result::Result<usize, String>,
}

impl QueryOutcome {
    pub fn is_failure(&self) -> bool {
        self.result.is_err()
    }
}

/// Result of a whole run
#[derive(Debug, Clone, Default)]
pub struct SearchReport {
    /// Unique by id, sorted by stars descending
    pub repositories: Vec<RepositoryRecord>,
    pub outcomes: Vec<QueryOutcome>,
}

impl SearchReport {
    pub fn failed_queries(&self) -> Vec<&QueryOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure()).collect()
    }

    /// Every collected contributor, in report order
    pub fn all_contributors(&self) -> Vec<ContributorRecord> {
        self.repositories
            .iter()
            .filter_map(|r| r.contributors.as_ref())
            .flatten()
            .cloned()
            .collect()
    }

    /// Repos whose contributor list was cut short by an error
    pub fn incomplete_contributor_lists(&self) -> Vec<&RepositoryRecord> {
        self.repositories
            .iter()
            .filter(|r| r.contributors.is_some() && !r.contributors_complete)
            .collect()
    }
}

/// Runs every query for a request, one at a time, and folds the hits together.
///
/// A failing query is logged and recorded, never fatal. The first query to
/// return a given repo id wins; later copies are ignored.
pub struct SearchAggregator {
    source: Box<dyn RepoSource>,
    page_throttle: Box<dyn Throttle>,
    query_throttle: Box<dyn Throttle>,
}

impl SearchAggregator {
    pub fn new(
        source: Box<dyn RepoSource>,
        page_throttle: Box<dyn Throttle>,
        query_throttle: Box<dyn Throttle>,
    ) -> Self {
        Self {
            source,
            page_throttle,
            query_throttle,
        }
    }

    pub async fn run(&self, request: &SearchRequest) -> SearchReport {
        let queries = request.variant.queries(&request.keyword, &request.filters);
        let collector = ContributorCollector::new(&*self.source, &*self.page_throttle)
            .include_anonymous(request.variant.includes_anonymous())
            .tag_source_repo(request.variant.tags_source_repo());

        let mut seen = HashSet::new();
        let mut repositories = Vec::new();
        let mut outcomes = Vec::with_capacity(queries.len());

        for (i, query) in queries.iter().enumerate() {
            if i > 0 {
                self.query_throttle.wait().await;
            }

            info!("Running query {}/{}: '{}'", i + 1, queries.len(), query);
            let result = match self.source.search(query, request.variant.per_page()).await {
                Ok(hits) => {
                    let mut added = 0;
                    for mut repo in hits {
                        if !request.filters.admits(&repo) || !seen.insert(repo.id) {
                            continue;
                        }

                        if !request.variant.keeps_language() {
                            repo.language = None;
                        }

                        if request.fetch_contributors {
                            let collection = collector.collect(&repo.full_name).await;
                            repo.contributors_complete = collection.complete;
                            repo.contributors = Some(collection.contributors);
                        } else {
                            repo.contributors = None;
                            repo.contributors_complete = false;
                        }

                        repositories.push(repo);
                        added += 1;
                    }
                    Ok(added)
                }
                Err(e) => {
                    warn!("Error fetching results for query '{}': {}", query, e);
                    Err(e.to_string())
                }
            };

            outcomes.push(QueryOutcome {
                query: query.clone(),
                result,
            });
        }

        // Stable sort: equal star counts keep query/insertion order
        repositories.sort_by(|a, b| b.stars.cmp(&a.stars));

        info!(
            "Collected {} unique repositories from {} queries",
            repositories.len(),
            outcomes.len()
        );

        SearchReport {
            repositories,
            outcomes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::Exporter;
    use chainscout_api::{FetchError, NoDelay};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn repo(id: u64, name: &str, stars: u32, forks: u32) -> RepositoryRecord {
        RepositoryRecord {
            id,
            full_name: name.to_string(),
            stars,
            forks,
            last_updated: "2024-06-01T00:00:00Z".to_string(),
            description: String::new(),
            topics: vec![],
            url: format!("https://github.com/{}", name),
            language: Some(Some("Rust".to_string())),
            contributors: None,
            contributors_complete: false,
        }
    }

    fn aggregator(source: MockRepoSource) -> SearchAggregator {
        SearchAggregator::new(Box::new(source), Box::new(NoDelay), Box::new(NoDelay))
    }

    #[test]
    fn test_blockchain_queries() {
        let filters = SearchFilters {
            min_stars: 500,
            min_forks: 50,
        };
        let queries = SearchVariant::Blockchain.queries("solana", &filters);
        assert_eq!(
            queries,
            vec![
                "topic:solana stars:>=500 forks:>=50",
                "language:rust solana stars:>=500 forks:>=50",
                "solana blockchain stars:>=500 forks:>=50",
                "solana web3 stars:>=500 forks:>=50",
            ]
        );
    }

    #[test]
    fn test_language_queries() {
        let queries = SearchVariant::Language.queries("solidity", &SearchFilters::default());
        assert_eq!(queries.len(), 19);
        assert_eq!(queries[0], "language:solidity blockchain");
        assert_eq!(queries[9], "language:solidity dao");
        assert_eq!(queries[10], "language:solidity ethereum");
        assert_eq!(queries[18], "language:solidity substrate");
        assert!(queries.iter().all(|q| !q.contains("stars:")));
    }

    #[test]
    fn test_queries_are_distinct() {
        for variant in [SearchVariant::Blockchain, SearchVariant::Language] {
            let queries = variant.queries("web3", &SearchFilters::default());
            let unique: HashSet<_> = queries.iter().collect();
            assert_eq!(unique.len(), queries.len());
        }
    }

    #[test]
    fn test_keyword_normalization_and_titles() {
        let request = SearchRequest::new(SearchVariant::Blockchain, " Solana ");
        assert_eq!(request.keyword, "solana");
        assert_eq!(
            SearchVariant::Blockchain.report_title("solana"),
            "Popular Solana Repositories"
        );

        let request = SearchRequest::new(SearchVariant::Language, "Rust");
        assert_eq!(request.keyword, "Rust");
        assert_eq!(
            SearchVariant::Language.report_title("c++"),
            "C++ Blockchain Repositories"
        );
        assert_eq!(title_case("smart-contracts"), "Smart-Contracts");
    }

    #[tokio::test]
    async fn test_dedup_first_seen_wins_and_sorted() {
        let mut source = MockRepoSource::new();
        source.expect_search().returning(|query, _| {
            Ok(if query.starts_with("topic:") {
                vec![repo(1, "a/one", 50, 5), repo(2, "a/two", 300, 9)]
            } else if query.starts_with("language:rust") {
                // Same id as the first hit but a fresher star count
                vec![repo(1, "a/one-renamed", 999, 5), repo(3, "a/three", 50, 1)]
            } else {
                vec![repo(4, "a/four", 120, 0), repo(2, "a/two", 300, 9)]
            })
        });

        let request = SearchRequest::new(SearchVariant::Blockchain, "solana");
        let report = aggregator(source).run(&request).await;

        let names: Vec<&str> = report
            .repositories
            .iter()
            .map(|r| r.full_name.as_str())
            .collect();
        assert_eq!(names, vec!["a/two", "a/four", "a/one", "a/three"]);

        let ids: HashSet<u64> = report.repositories.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), report.repositories.len());

        assert!(report
            .repositories
            .windows(2)
            .all(|w| w[0].stars >= w[1].stars));

        // Blockchain runs don't carry language
        assert!(report.repositories.iter().all(|r| r.language.is_none()));
        assert!(report.repositories.iter().all(|r| r.contributors.is_none()));
    }

    #[tokio::test]
    async fn test_failing_query_is_skipped() {
        let mut source = MockRepoSource::new();
        source.expect_search().times(4).returning(|query, _| {
            if query.contains("blockchain") {
                Err(FetchError::Status {
                    status: 422,
                    context: format!("search query '{}'", query),
                    body: "Validation Failed".to_string(),
                }
                .into())
            } else if query.starts_with("topic:") {
                Ok(vec![repo(1, "a/one", 10, 1)])
            } else {
                Ok(vec![repo(2, "a/two", 20, 2)])
            }
        });

        let request = SearchRequest::new(SearchVariant::Blockchain, "near");
        let report = aggregator(source).run(&request).await;

        assert_eq!(report.repositories.len(), 2);
        assert_eq!(report.outcomes.len(), 4);

        let failed = report.failed_queries();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].query.starts_with("near blockchain"));
        assert!(failed[0].result.as_ref().unwrap_err().contains("422"));
        assert_eq!(report.outcomes[0].result, Ok(1));
        assert_eq!(report.outcomes[3].result, Ok(0));
    }

    #[tokio::test]
    async fn test_client_side_filters() {
        let mut source = MockRepoSource::new();
        source.expect_search().returning(|_, per_page| {
            assert_eq!(per_page, None);
            Ok(vec![
                repo(1, "a/big", 1000, 100),
                repo(2, "a/few-forks", 1000, 3),
                repo(3, "a/few-stars", 10, 100),
            ])
        });

        let request = SearchRequest::new(SearchVariant::Language, "rust").with_filters(
            SearchFilters {
                min_stars: 100,
                min_forks: 10,
            },
        );
        let report = aggregator(source).run(&request).await;

        assert_eq!(report.repositories.len(), 1);
        assert_eq!(report.repositories[0].full_name, "a/big");
        assert_eq!(
            report.repositories[0].language,
            Some(Some("Rust".to_string()))
        );
        assert_eq!(report.outcomes.len(), 19);
    }

    #[tokio::test]
    async fn test_contributors_fetched_once_per_repo() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let mut source = MockRepoSource::new();
        source
            .expect_search()
            .returning(|_, _| Ok(vec![repo(1, "a/one", 10, 1), repo(2, "a/two", 5, 1)]));
        source
            .expect_contributors_page()
            .returning(move |name, page, anon| {
                counter.fetch_add(1, Ordering::SeqCst);
                assert!(anon);
                if name == "a/two" && page == 1 {
                    return Err(FetchError::Status {
                        status: 403,
                        context: "contributors".to_string(),
                        body: String::new(),
                    }
                    .into());
                }
                Ok(ContributorBatch {
                    contributors: if page == 1 {
                        vec![ContributorRecord {
                            username: "alice".to_string(),
                            contributions: 42,
                            profile_url: "https://github.com/alice".to_string(),
                            account_type: "User".to_string(),
                            source_repo: None,
                        }]
                    } else {
                        vec![]
                    },
                    has_next: true,
                })
            });

        let request = SearchRequest::new(SearchVariant::Blockchain, "solana").with_contributors(true);
        let report = aggregator(source).run(&request).await;

        // a/one: page 1 + empty page 2; a/two: failing page 1. Duplicates from
        // later queries never trigger another fetch.
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let one = &report.repositories[0];
        assert_eq!(one.full_name, "a/one");
        assert!(one.contributors_complete);
        assert_eq!(one.contributors.as_ref().unwrap().len(), 1);

        let two = &report.repositories[1];
        assert!(!two.contributors_complete);
        assert_eq!(two.contributors.as_deref(), Some(&[][..]));

        let flat = report.all_contributors();
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].source_repo.as_deref(), Some("a/one"));
        assert_eq!(report.incomplete_contributor_lists().len(), 1);
    }

    #[tokio::test]
    async fn test_waits_between_queries_only() {
        struct CountingThrottle(Arc<AtomicU32>);

        #[async_trait]
        impl Throttle for CountingThrottle {
            async fn wait(&self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let waits = Arc::new(AtomicU32::new(0));
        let mut source = MockRepoSource::new();
        source.expect_search().returning(|_, _| Ok(vec![]));

        let aggregator = SearchAggregator::new(
            Box::new(source),
            Box::new(NoDelay),
            Box::new(CountingThrottle(Arc::clone(&waits))),
        );
        aggregator
            .run(&SearchRequest::new(SearchVariant::Blockchain, "cosmos"))
            .await;

        assert_eq!(waits.load(Ordering::SeqCst), 3);
    }

    /// Ties on stars, cross-query duplicates and paged contributors
    fn scripted_source() -> MockRepoSource {
        let mut source = MockRepoSource::new();
        source.expect_search().returning(|query, _| {
            Ok(if query.starts_with("topic:") {
                vec![repo(10, "z/tied-first", 100, 1), repo(11, "m/top", 900, 3)]
            } else if query.starts_with("language:rust") {
                vec![repo(12, "a/tied-second", 100, 2), repo(10, "z/tied-dup", 100, 1)]
            } else if query.contains("blockchain") {
                vec![repo(13, "b/tied-third", 100, 0)]
            } else {
                vec![repo(11, "m/top-dup", 5, 3), repo(14, "c/low", 1, 0)]
            })
        });
        source
            .expect_contributors_page()
            .returning(|name, page, _| {
                let contributor = |login: &str, contributions| ContributorRecord {
                    username: login.to_string(),
                    contributions,
                    profile_url: format!("https://github.com/{}", login),
                    account_type: "User".to_string(),
                    source_repo: None,
                };
                Ok(ContributorBatch {
                    contributors: vec![
                        contributor(&format!("{}-p{}", name.replace('/', "-"), page), 3),
                        contributor("shared", 3),
                    ],
                    has_next: page < 2,
                })
            });
        source
    }

    #[tokio::test]
    async fn test_identical_runs_export_identical_json() {
        let request = SearchRequest::new(SearchVariant::Blockchain, "solana").with_contributors(true);

        let first = aggregator(scripted_source()).run(&request).await;
        let second = aggregator(scripted_source()).run(&request).await;

        let names: Vec<&str> = first
            .repositories
            .iter()
            .map(|r| r.full_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["m/top", "z/tied-first", "a/tied-second", "b/tied-third", "c/low"]
        );

        let first_json = Exporter::repos_to_json(&first.repositories).unwrap();
        let second_json = Exporter::repos_to_json(&second.repositories).unwrap();
        assert_eq!(first_json, second_json);

        let flat_first = Exporter::contributors_to_csv(&first.all_contributors());
        let flat_second = Exporter::contributors_to_csv(&second.all_contributors());
        assert_eq!(flat_first, flat_second);
        assert!(flat_first.lines().nth(1).unwrap().starts_with("m-top-p1,3,"));
    }

    #[tokio::test]
    async fn test_language_run_keeps_unknown_language_as_null() {
        let mut source = MockRepoSource::new();
        source.expect_search().returning(|query, _| {
            let mut untyped = repo(1, "a/untyped", 10, 1);
            untyped.language = Some(None);
            Ok(if query.ends_with("blockchain") {
                vec![untyped]
            } else {
                vec![]
            })
        });

        let report = aggregator(source)
            .run(&SearchRequest::new(SearchVariant::Language, "rust"))
            .await;

        assert_eq!(report.repositories.len(), 1);
        assert_eq!(report.repositories[0].language, Some(None));

        let json = Exporter::repos_to_json(&report.repositories).unwrap();
        assert!(json.contains(r#""language": null"#));
    }
}
