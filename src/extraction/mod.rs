pub mod openai;

pub use openai::OpenAiEngine;

use crate::error::ExtractionError;
use crate::parsers::{self, ContentFormat};
use crate::schema::ExtractionSchema;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// Structured-extraction collaborator
///
/// Turns page content into a value shaped by the schema. Implementations only
/// report provider-level failures; schema conformance is checked by [`Extractor`].
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    async fn extract(
        &self,
        content: &str,
        schema: &ExtractionSchema,
        format: ContentFormat,
    ) -> Result<Value, ExtractionError>;
}

/// Validated record of one listing page
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Listing {
    #[serde(rename = "productos")]
    pub items: Vec<Value>,
    #[serde(rename = "total_productos")]
    pub reported_count: f64,
    #[serde(rename = "hay_siguiente_pagina")]
    pub has_next: bool,
    #[serde(rename = "comentarios_extraccion", default)]
    pub note: Option<String>,
}

impl Listing {
    /// Reported count as an integer in `0..=max_items`
    pub fn reported_items(&self, max_items: usize) -> u64 {
        if self.reported_count.is_finite() && self.reported_count > 0.0 {
            (self.reported_count.round() as u64).min(max_items as u64)
        } else {
            0
        }
    }
}

/// Adapter that reduces content, calls the engine and validates the answer
pub struct Extractor<E> {
    engine: E,
    schema: ExtractionSchema,
    format: ContentFormat,
}

impl<E: ExtractionEngine> Extractor<E> {
    pub fn new(engine: E, schema: ExtractionSchema, format: ContentFormat) -> Self {
        Self {
            engine,
            schema,
            format,
        }
    }

    pub fn schema(&self) -> &ExtractionSchema {
        &self.schema
    }

    /// Extract one listing from raw page content
    ///
    /// Answers that do not fit the schema come back as `MalformedOutput`.
    pub async fn extract(&self, raw_content: &str) -> Result<Listing, ExtractionError> {
        let content = parsers::reduce(raw_content, self.format);
        let value = self
            .engine
            .extract(&content, &self.schema, self.format)
            .await?;

        if let Err(violations) = self.schema.validate(&value) {
            for v in &violations {
                ::log::debug!("Schema violation at {}", v);
            }
            let shown: Vec<String> = violations.iter().take(5).map(|v| v.to_string()).collect();
            let more = violations.len().saturating_sub(shown.len());
            let mut message = shown.join("; ");
            if more > 0 {
                message.push_str(&format!(" (and {} more)", more));
            }
            return Err(ExtractionError::MalformedOutput(message));
        }

        serde_json::from_value(value).map_err(|e| ExtractionError::MalformedOutput(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct CannedEngine {
        answer: Result<Value, ExtractionError>,
        seen: Mutex<Vec<(String, ContentFormat)>>,
    }

    impl CannedEngine {
        fn new(answer: Result<Value, ExtractionError>) -> Self {
            Self {
                answer,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ExtractionEngine for CannedEngine {
        async fn extract(
            &self,
            content: &str,
            _schema: &ExtractionSchema,
            format: ContentFormat,
        ) -> Result<Value, ExtractionError> {
            self.seen.lock().unwrap().push((content.to_string(), format));
            self.answer.clone()
        }
    }

    fn extractor(answer: Result<Value, ExtractionError>, format: ContentFormat) -> Extractor<CannedEngine> {
        Extractor::new(
            CannedEngine::new(answer),
            ExtractionSchema::product_listing(10).unwrap(),
            format,
        )
    }

    fn listing_value(count: usize) -> Value {
        let items: Vec<Value> = (0..count)
            .map(|i| json!({ "titulo": format!("P{}", i), "precio": "$ 1", "enlace": "https://x/p" }))
            .collect();
        json!({
            "productos": items,
            "pagina_actual": 1,
            "total_productos": count,
            "hay_siguiente_pagina": false,
            "comentarios_extraccion": "todo bien",
        })
    }

    #[tokio::test]
    async fn test_valid_answer_becomes_listing() {
        let extractor = extractor(Ok(listing_value(3)), ContentFormat::Html);
        let listing = extractor.extract("<div>producto</div>").await.unwrap();
        assert_eq!(listing.items.len(), 3);
        assert_eq!(listing.reported_items(10), 3);
        assert!(!listing.has_next);
        assert_eq!(listing.note.as_deref(), Some("todo bien"));
    }

    #[tokio::test]
    async fn test_content_is_reduced_before_the_call() {
        let extractor = extractor(Ok(listing_value(1)), ContentFormat::Text);
        extractor
            .extract("<html><body><script>x()</script><p>producto A</p></body></html>")
            .await
            .unwrap();
        let seen = extractor.engine.seen.lock().unwrap();
        assert_eq!(seen[0], ("producto A".to_string(), ContentFormat::Text));
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_malformed() {
        let mut value = listing_value(1);
        value["total_productos"] = json!("many");
        let extractor = extractor(Ok(value), ContentFormat::Html);
        let err = extractor.extract("producto").await.unwrap_err();
        match err {
            ExtractionError::MalformedOutput(msg) => assert!(msg.contains("total_productos")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cardinality_violation_is_malformed() {
        let extractor = extractor(Ok(listing_value(11)), ContentFormat::Html);
        let err = extractor.extract("producto").await.unwrap_err();
        assert!(matches!(err, ExtractionError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn test_provider_errors_pass_through() {
        let extractor = extractor(
            Err(ExtractionError::Provider("rate limited".to_string())),
            ContentFormat::Html,
        );
        let err = extractor.extract("producto").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Provider(_)));
    }

    #[test]
    fn test_reported_items_clamps() {
        let listing = Listing {
            items: Vec::new(),
            reported_count: -3.0,
            has_next: false,
            note: None,
        };
        assert_eq!(listing.reported_items(10), 0);

        let inflated = Listing {
            reported_count: 1e20,
            ..listing.clone()
        };
        assert_eq!(inflated.reported_items(50), 50);

        let not_a_number = Listing {
            reported_count: f64::INFINITY,
            ..listing
        };
        assert_eq!(not_a_number.reported_items(50), 0);
    }
}
