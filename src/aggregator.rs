use crate::config::HarvestConfig;
use crate::error::HarvestError;
use crate::results::{FailureRecord, PageResult, RunSummary};
use crate::utils::sanitize_filename;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Whole-run artifact layout
#[derive(Serialize)]
struct RunArtifact<'a> {
    #[serde(rename = "configuracion")]
    configuration: &'a Value,
    #[serde(rename = "resumen")]
    summary: &'a RunSummary,
    #[serde(rename = "errores")]
    failures: &'a [FailureRecord],
    #[serde(rename = "paginas")]
    pages: &'a [PageResult],
}

/// Names and writes the JSON artifacts of a run
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
    prefix: String,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>, prefix: &str) -> Self {
        Self {
            dir: dir.into(),
            prefix: sanitize_filename(prefix),
        }
    }

    pub fn page_path(&self, page: u32) -> PathBuf {
        self.dir.join(format!("{}_pagina_{}.json", self.prefix, page))
    }

    pub fn run_path(&self) -> PathBuf {
        self.dir.join(format!("{}_final.json", self.prefix))
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), HarvestError> {
        let json = serde_json::to_string_pretty(value)?;
        std::fs::create_dir_all(&self.dir).map_err(|source| HarvestError::Persist {
            path: self.dir.clone(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| HarvestError::Persist {
            path: path.to_path_buf(),
            source,
        })?;
        ::log::debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// Owns the ordered page results of a run and persists them
pub struct ResultAggregator {
    requested_pages: u32,
    configuration: Value,
    save_per_page: bool,
    writer: ArtifactWriter,
    started_at: DateTime<Utc>,
    pages: Vec<PageResult>,
    /// Summary of the last finalize, dropped by the next record
    finalized: Option<RunSummary>,
}

impl ResultAggregator {
    pub fn new(config: &HarvestConfig) -> Result<Self, HarvestError> {
        Ok(Self {
            requested_pages: config.max_pages,
            configuration: serde_json::to_value(config)?,
            save_per_page: config.save_per_page,
            writer: ArtifactWriter::new(&config.output_dir, &config.artifact_prefix),
            started_at: Utc::now(),
            pages: Vec::new(),
            finalized: None,
        })
    }

    pub fn pages(&self) -> &[PageResult] {
        &self.pages
    }

    pub fn writer(&self) -> &ArtifactWriter {
        &self.writer
    }

    /// Append a page result and, when enabled, write its own artifact
    ///
    /// A failed per-page write is logged; the page still reaches the final artifact.
    pub fn record(&mut self, result: PageResult) {
        debug_assert!(
            self.pages.last().is_none_or(|last| last.page < result.page),
            "page results must be recorded in increasing page order"
        );

        if self.save_per_page {
            let path = self.writer.page_path(result.page);
            match self.writer.write_json(&path, &result) {
                Ok(()) => ::log::info!("Saved page {} to {}", result.page, path.display()),
                Err(e) => ::log::error!("Could not save page {}: {}", result.page, e),
            }
        }

        self.pages.push(result);
        self.finalized = None;
    }

    /// Fold the recorded pages into a summary and write the whole-run artifact
    ///
    /// Calling it again without an intervening `record` rewrites the same summary.
    pub fn finalize(&mut self) -> Result<RunSummary, HarvestError> {
        let summary = match &self.finalized {
            Some(summary) => summary.clone(),
            None => {
                let summary = RunSummary::fold(
                    self.requested_pages,
                    &self.pages,
                    self.started_at,
                    Utc::now(),
                );
                self.finalized = Some(summary.clone());
                summary
            }
        };

        let artifact = RunArtifact {
            configuration: &self.configuration,
            summary: &summary,
            failures: &summary.failures,
            pages: &self.pages,
        };
        let path = self.writer.run_path();
        self.writer.write_json(&path, &artifact)?;
        ::log::info!("Saved run results to {}", path.display());

        Ok(summary)
    }
}
