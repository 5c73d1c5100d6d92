// Core business logic lives here - search, enrichment, reports
pub mod config;
pub mod contributors;
pub mod error;
pub mod export;
pub mod models;
pub mod protocols;
pub mod providers;
pub mod search;

pub use config::Config;
pub use contributors::{ContributorCollection, ContributorCollector};
pub use error::Error;
pub use export::{ExportFormat, Exporter, ReportWriter};
pub use models::{ContributorRecord, FieldValue, ProtocolRecord, RepositoryRecord};
pub use protocols::ProtocolTable;
pub use search::{
    QueryOutcome, RepoSource, SearchAggregator, SearchFilters, SearchReport, SearchRequest,
    SearchVariant,
};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
