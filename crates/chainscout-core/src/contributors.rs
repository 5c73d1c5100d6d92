// Paginated contributor collection
use chainscout_api::Throttle;
use tracing::{debug, warn};

use crate::{models::ContributorRecord, search::RepoSource};

/// One page worth of contributors, plus whether GitHub advertised another page
#[derive(Debug, Clone, Default)]
pub struct ContributorBatch {
    pub contributors: Vec<ContributorRecord>,
    pub has_next: bool,
}

/// Everything collected for one repository
#[derive(Debug, Clone, PartialEq)]
pub struct ContributorCollection {
    pub contributors: Vec<ContributorRecord>,
    /// False when a page failed and we stopped early
    pub complete: bool,
}

/// Walks the contributors endpoint page by page until it runs dry.
///
/// A failing page never throws away what was already collected: the
/// collection comes back marked incomplete instead.
pub struct ContributorCollector<'a> {
    source: &'a dyn RepoSource,
    throttle: &'a dyn Throttle,
    include_anonymous: bool,
    tag_source_repo: bool,
}

impl<'a> ContributorCollector<'a> {
    pub fn new(source: &'a dyn RepoSource, throttle: &'a dyn Throttle) -> Self {
        Self {
            source,
            throttle,
            include_anonymous: false,
            tag_source_repo: false,
        }
    }

    /// Ask GitHub to include contributors that only exist as commit emails
    pub fn include_anonymous(mut self, include: bool) -> Self {
        self.include_anonymous = include;
        self
    }

    /// Stamp each record with the repo it came from
    pub fn tag_source_repo(mut self, tag: bool) -> Self {
        self.tag_source_repo = tag;
        self
    }

    pub async fn collect(&self, full_name: &str) -> ContributorCollection {
        let mut contributors = Vec::new();
        let mut page = 1;

        loop {
            let batch = match self
                .source
                .contributors_page(full_name, page, self.include_anonymous)
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    warn!("Error fetching contributors for {}: {}", full_name, e);
                    return ContributorCollection {
                        contributors,
                        complete: false,
                    };
                }
            };

            if batch.contributors.is_empty() {
                break;
            }

            debug!(
                "{}: page {} had {} contributors",
                full_name,
                page,
                batch.contributors.len()
            );

            let tag = self.tag_source_repo.then(|| full_name.to_string());
            contributors.extend(batch.contributors.into_iter().map(|mut c| {
                if tag.is_some() {
                    c.source_repo = tag.clone();
                }
                c
            }));

            if !batch.has_next {
                break;
            }

            page += 1;
            self.throttle.wait().await;
        }

        ContributorCollection {
            contributors,
            complete: true,
        }
    }
}
