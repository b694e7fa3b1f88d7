mod scenarios;

use crate::aggregator::ResultAggregator;
use crate::config::HarvestConfig;
use crate::crawlers::{NavigateOptions, PageSource};
use crate::error::{ExtractionError, NavigationError};
use crate::extraction::{ExtractionEngine, Extractor};
use crate::gate::ContentGate;
use crate::pagination::PaginationDriver;
use crate::parsers::ContentFormat;
use crate::schema::ExtractionSchema;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub(crate) const BASE_URL: &str = "https://listado.example.com/ofertas?promotion_type=deal";

pub(crate) type NavigateFn =
    dyn Fn(&str, u32) -> Result<String, NavigationError> + Send + Sync;

/// What the fake browser saw during a run
#[derive(Debug, Default)]
pub(crate) struct SourceLog {
    pub navigations: Vec<String>,
    pub closes: u32,
}

/// Page source answering from a closure of (url, attempt number at that url)
pub(crate) struct FakeSource {
    navigate: Box<NavigateFn>,
    attempts: HashMap<String, u32>,
    current: String,
    pub log: Arc<Mutex<SourceLog>>,
}

impl FakeSource {
    pub fn new<F>(navigate: F) -> Self
    where
        F: Fn(&str, u32) -> Result<String, NavigationError> + Send + Sync + 'static,
    {
        Self {
            navigate: Box::new(navigate),
            attempts: HashMap::new(),
            current: String::new(),
            log: Arc::new(Mutex::new(SourceLog::default())),
        }
    }

    /// A source that always serves a page with listing markers
    pub fn listing() -> Self {
        Self::new(|_, _| Ok(listing_html()))
    }
}

#[async_trait]
impl PageSource for FakeSource {
    async fn navigate(
        &mut self,
        url: &str,
        _options: &NavigateOptions,
    ) -> Result<String, NavigationError> {
        let attempt = self.attempts.entry(url.to_string()).or_insert(0);
        *attempt += 1;
        self.log.lock().unwrap().navigations.push(url.to_string());
        let content = (self.navigate)(url, *attempt)?;
        self.current = content.clone();
        Ok(content)
    }

    async fn scroll_to_bottom(&mut self) -> Result<(), NavigationError> {
        Ok(())
    }

    async fn current_content(&mut self) -> Result<String, NavigationError> {
        Ok(self.current.clone())
    }

    async fn close(&mut self) -> Result<(), NavigationError> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}

pub(crate) type ExtractFn = dyn Fn(&str) -> Result<Value, ExtractionError> + Send + Sync;

/// Extraction engine answering from a closure of the content
pub(crate) struct FakeEngine {
    answer: Box<ExtractFn>,
    pub calls: Arc<Mutex<u32>>,
}

impl FakeEngine {
    pub fn new<F>(answer: F) -> Self
    where
        F: Fn(&str) -> Result<Value, ExtractionError> + Send + Sync + 'static,
    {
        Self {
            answer: Box::new(answer),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// An engine that always finds `count` products
    pub fn products(count: usize) -> Self {
        Self::new(move |_| Ok(listing_answer(count, true)))
    }
}

#[async_trait]
impl ExtractionEngine for FakeEngine {
    async fn extract(
        &self,
        content: &str,
        _schema: &ExtractionSchema,
        _format: ContentFormat,
    ) -> Result<Value, ExtractionError> {
        *self.calls.lock().unwrap() += 1;
        (self.answer)(content)
    }
}

pub(crate) fn listing_html() -> String {
    r#"<html><body><ol><li class="item"><h2>Producto</h2><span>$ 10</span></li></ol></body></html>"#
        .to_string()
}

pub(crate) fn listing_answer(count: usize, has_next: bool) -> Value {
    let items: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "titulo": format!("Producto {}", i),
                "precio": "$ 10",
                "enlace": format!("https://listado.example.com/p/{}", i),
            })
        })
        .collect();
    json!({
        "productos": items,
        "pagina_actual": 1,
        "total_productos": count,
        "hay_siguiente_pagina": has_next,
        "comentarios_extraccion": "ok",
    })
}

pub(crate) fn test_config(dir: &Path, max_pages: u32, max_retries: u32) -> HarvestConfig {
    HarvestConfig {
        base_url: BASE_URL.to_string(),
        max_pages,
        max_retries,
        page_delay_ms: 0,
        load_delay_ms: 0,
        scroll_delay_ms: 0,
        retry_delay_ms: 0,
        min_expected_items: 2,
        output_dir: dir.to_path_buf(),
        artifact_prefix: "run".to_string(),
        ..HarvestConfig::default()
    }
}

pub(crate) fn driver(config: &HarvestConfig, engine: FakeEngine) -> PaginationDriver<FakeEngine> {
    let schema = ExtractionSchema::product_listing(config.max_items_per_page).unwrap();
    PaginationDriver::new(
        config.clone(),
        Extractor::new(engine, schema, config.format),
        ContentGate::new(&config.content_markers).unwrap(),
    )
}

pub(crate) fn aggregator(config: &HarvestConfig) -> ResultAggregator {
    ResultAggregator::new(config).unwrap()
}

pub(crate) fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}
