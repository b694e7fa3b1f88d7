use crate::error::ErrorKind;
use crate::utils::rounded_mean;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Terminal state of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageStatus {
    Success,
    SkippedEmpty,
    Failed,
}

/// Classification and message of the error that failed a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFailure {
    #[serde(rename = "tipo")]
    pub kind: ErrorKind,
    #[serde(rename = "mensaje")]
    pub message: String,
}

/// Outcome of one page, as persisted in the artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    #[serde(rename = "numero_pagina")]
    pub page: u32,
    pub url: String,
    #[serde(rename = "estado")]
    pub status: PageStatus,
    #[serde(rename = "productos")]
    pub items: Vec<Value>,
    /// Item count as reported by the extraction
    #[serde(rename = "total_productos")]
    pub reported_count: u64,
    /// Whether a further page is believed to exist
    #[serde(rename = "hay_siguiente_pagina")]
    pub has_next: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "comentarios_extraccion")]
    pub note: String,
    #[serde(rename = "intentos")]
    pub attempts: u32,
    /// Success with fewer items than expected
    #[serde(rename = "pocos_productos")]
    pub under_extracted: bool,
    /// Soft outcome recorded without retry (`empty-content`, `under-extraction`)
    #[serde(rename = "advertencia", skip_serializing_if = "Option::is_none", default)]
    pub warning: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<PageFailure>,
}

impl PageResult {
    pub fn is_success(&self) -> bool {
        self.status == PageStatus::Success
    }
}

/// One page that ended as failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    #[serde(rename = "pagina")]
    pub page: u32,
    #[serde(rename = "tipo")]
    pub kind: ErrorKind,
    #[serde(rename = "error")]
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Run-level totals, folded from the page results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(rename = "total_paginas_solicitadas")]
    pub requested_pages: u32,
    #[serde(rename = "total_paginas_procesadas")]
    pub pages_attempted: u32,
    #[serde(rename = "paginas_exitosas")]
    pub pages_succeeded: u32,
    #[serde(rename = "paginas_con_errores")]
    pub pages_failed: u32,
    #[serde(rename = "paginas_vacias")]
    pub pages_skipped: u32,
    #[serde(rename = "total_productos_extraidos")]
    pub total_items: u64,
    #[serde(rename = "promedio_productos_por_pagina")]
    pub mean_items_per_page: u64,
    #[serde(rename = "paginas_con_pocos_productos")]
    pub pages_under_extracted: u32,
    #[serde(rename = "fecha_inicio")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "fecha_fin")]
    pub finished_at: DateTime<Utc>,
    /// Written to the artifact as the top-level `errores` list
    #[serde(skip)]
    pub failures: Vec<FailureRecord>,
}

impl RunSummary {
    /// Fold the ordered page results into a summary
    pub fn fold(
        requested_pages: u32,
        pages: &[PageResult],
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let mut summary = Self {
            requested_pages,
            pages_attempted: pages.len() as u32,
            pages_succeeded: 0,
            pages_failed: 0,
            pages_skipped: 0,
            total_items: 0,
            mean_items_per_page: 0,
            pages_under_extracted: 0,
            started_at,
            finished_at,
            failures: Vec::new(),
        };

        for page in pages {
            summary.total_items = summary.total_items.saturating_add(page.reported_count);
            if page.under_extracted {
                summary.pages_under_extracted += 1;
            }
            match page.status {
                PageStatus::Success => summary.pages_succeeded += 1,
                PageStatus::SkippedEmpty => summary.pages_skipped += 1,
                PageStatus::Failed => {
                    summary.pages_failed += 1;
                    let (kind, message) = match &page.error {
                        Some(failure) => (failure.kind, failure.message.clone()),
                        None => (ErrorKind::ProviderError, page.note.clone()),
                    };
                    summary.failures.push(FailureRecord {
                        page: page.page,
                        kind,
                        message,
                        timestamp: page.timestamp,
                    });
                }
            }
        }

        summary.mean_items_per_page =
            rounded_mean(summary.total_items, summary.pages_succeeded as u64);
        summary
    }
}
