use crate::{
    models::{ContributorRecord, RepositoryRecord},
    protocols::ProtocolTable,
    Result,
};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use tracing::info;

/// How many contributors each repo section lists
const TOP_CONTRIBUTORS: usize = 10;

const CONTRIBUTOR_CSV_HEADER: &str = "username,contributions,profile,type,repo";

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Markdown,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Markdown => "md",
        }
    }
}

/// Renders records to report text. Pure; `ReportWriter` does the disk part.
pub struct Exporter;

impl Exporter {
    /// Full collection, field for field
    pub fn repos_to_json(repos: &[RepositoryRecord]) -> Result<String> {
        Ok(serde_json::to_string_pretty(repos)?)
    }

    pub fn repos_to_markdown(
        title: &str,
        repos: &[RepositoryRecord],
        generated_at: NaiveDateTime,
    ) -> String {
        let mut output = String::new();

        output.push_str(&format!("# {}\n\n", title));
        output.push_str(&format!(
            "Generated on: {}\n\n",
            generated_at.format("%Y-%m-%d %H:%M:%S")
        ));

        for repo in repos {
            output.push_str(&format!("## [{}]({})\n", repo.full_name, repo.url));
            output.push_str(&format!(
                "⭐ Stars: {} | 🔄 Forks: {}\n\n",
                repo.stars, repo.forks
            ));
            output.push_str(&format!("{}\n\n", repo.description));

            if !repo.topics.is_empty() {
                output.push_str(&format!("**Topics:** {}\n\n", repo.topics.join(", ")));
            }

            let top = repo.top_contributors(TOP_CONTRIBUTORS);
            if !top.is_empty() {
                output.push_str("### Top Contributors:\n");
                for contributor in top {
                    output.push_str(&format!(
                        "- [{}]({}): {} contributions\n",
                        contributor.username, contributor.profile_url, contributor.contributions
                    ));
                }
                output.push('\n');
            }

            output.push_str("---\n\n");
        }

        output
    }

    pub fn contributors_to_json(contributors: &[ContributorRecord]) -> Result<String> {
        Ok(serde_json::to_string_pretty(contributors)?)
    }

    pub fn contributors_to_csv(contributors: &[ContributorRecord]) -> String {
        let mut output = String::new();
        output.push_str(CONTRIBUTOR_CSV_HEADER);
        output.push('\n');

        for c in contributors {
            output.push_str(&format!(
                "{},{},{},{},{}\n",
                Self::escape_csv(&c.username),
                c.contributions,
                Self::escape_csv(&c.profile_url),
                Self::escape_csv(&c.account_type),
                Self::escape_csv(c.source_repo.as_deref().unwrap_or("")),
            ));
        }

        output
    }

    /// Header is the derived column union; absent cells stay empty
    pub fn protocols_to_csv(table: &ProtocolTable) -> String {
        let mut output = String::new();

        let header: Vec<String> = table.columns.iter().map(|c| Self::escape_csv(c)).collect();
        output.push_str(&header.join(","));
        output.push('\n');

        for row in table.rows(&table.columns) {
            let cells: Vec<String> = row.iter().map(|c| Self::escape_csv(c)).collect();
            output.push_str(&cells.join(","));
            output.push('\n');
        }

        output
    }

    /// Same data twice: key columns up top, everything under "Additional Details"
    pub fn protocols_to_markdown(chain: &str, table: &ProtocolTable) -> String {
        let key_columns = table.key_columns();

        format!(
            "# {chain} DeFi Protocols\n\n\
             <details>\n\
             <summary>View Protocol List (Click to expand)</summary>\n\n\
             {key}\n\n\
             </details>\n\n\
             ## Additional Details\n\n\
             <details>\n\
             <summary>Full Protocol Information</summary>\n\n\
             {full}\n\n\
             </details>\n",
            chain = chain,
            key = Self::markdown_table(&key_columns, &table.rows(&key_columns)),
            full = Self::markdown_table(&table.columns, &table.rows(&table.columns)),
        )
    }

    fn markdown_table(columns: &[String], rows: &[Vec<String>]) -> String {
        if columns.is_empty() {
            return "_No data_".to_string();
        }

        let mut lines = Vec::with_capacity(rows.len() + 2);
        let header: Vec<String> = columns.iter().map(|c| Self::escape_cell(c)).collect();
        lines.push(format!("| {} |", header.join(" | ")));
        lines.push(format!("|{}", "---|".repeat(columns.len())));

        for row in rows {
            let cells: Vec<String> = row.iter().map(|c| Self::escape_cell(c)).collect();
            lines.push(format!("| {} |", cells.join(" | ")));
        }

        lines.join("\n")
    }

    /// Escape CSV special characters
    fn escape_csv(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }

    /// Keep a value inside its table cell
    fn escape_cell(s: &str) -> String {
        s.replace('|', "\\|").replace("\r\n", " ").replace('\n', " ")
    }
}

/// Writes reports under dated, per-target directories below `root`.
///
/// Same-day reruns overwrite the previous files.
pub struct ReportWriter {
    root: PathBuf,
    generated_at: NaiveDateTime,
}

impl ReportWriter {
    pub fn new(root: impl Into<PathBuf>, generated_at: NaiveDateTime) -> Self {
        Self {
            root: root.into(),
            generated_at,
        }
    }

    fn date_stamp(&self) -> String {
        self.generated_at.format("%Y-%m-%d").to_string()
    }

    fn dated_file(&self, dir: &Path, stem: &str, format: ExportFormat) -> PathBuf {
        dir.join(format!("{}{}.{}", stem, self.date_stamp(), format.extension()))
    }

    /// `<root>/<target>-repos/<target>_repos_<date>.{md,json}`
    pub fn write_repositories(
        &self,
        target: &str,
        title: &str,
        repos: &[RepositoryRecord],
    ) -> Result<Vec<PathBuf>> {
        let dir = self.root.join(format!("{}-repos", target));
        let stem = format!("{}_repos_", target);

        let md_path = self.dated_file(&dir, &stem, ExportFormat::Markdown);
        write_file(
            &md_path,
            &Exporter::repos_to_markdown(title, repos, self.generated_at),
        )?;

        let json_path = self.dated_file(&dir, &stem, ExportFormat::Json);
        write_file(&json_path, &Exporter::repos_to_json(repos)?)?;

        Ok(vec![md_path, json_path])
    }

    /// `<root>/<target>-contributors/<target>_contributors_<date>.{json,csv}`
    pub fn write_contributors(
        &self,
        target: &str,
        contributors: &[ContributorRecord],
    ) -> Result<Vec<PathBuf>> {
        let dir = self.root.join(format!("{}-contributors", target));
        let stem = format!("{}_contributors_", target);

        let json_path = self.dated_file(&dir, &stem, ExportFormat::Json);
        write_file(&json_path, &Exporter::contributors_to_json(contributors)?)?;

        let csv_path = self.dated_file(&dir, &stem, ExportFormat::Csv);
        write_file(&csv_path, &Exporter::contributors_to_csv(contributors))?;

        Ok(vec![json_path, csv_path])
    }

    /// `<root>/<chain>-defi-llama-data/<chain>/protocols-<date>.{csv,md}`
    pub fn write_protocols(&self, chain: &str, table: &ProtocolTable) -> Result<Vec<PathBuf>> {
        let slug = chain.to_lowercase();
        let dir = self
            .root
            .join(format!("{}-defi-llama-data", slug))
            .join(&slug);

        let csv_path = self.dated_file(&dir, "protocols-", ExportFormat::Csv);
        write_file(&csv_path, &Exporter::protocols_to_csv(table))?;

        let md_path = self.dated_file(&dir, "protocols-", ExportFormat::Markdown);
        write_file(&md_path, &Exporter::protocols_to_markdown(chain, table))?;

        Ok(vec![csv_path, md_path])
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    info!("Wrote {}", path.display());
    Ok(())
}
