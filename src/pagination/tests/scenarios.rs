use super::*;
use crate::error::{ErrorKind, HarvestError};
use crate::results::PageStatus;

fn timeout_error(url: &str) -> NavigationError {
    NavigationError::Timeout {
        url: url.to_string(),
        timeout_ms: 60_000,
    }
}

#[tokio::test]
async fn test_recovers_from_navigation_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 3, 2);
    let source = FakeSource::new(|url, attempt| {
        if url.contains("page=2") && attempt == 1 {
            Err(timeout_error(url))
        } else {
            Ok(listing_html())
        }
    });
    let log = source.log.clone();
    let mut aggregator = aggregator(&config);

    let summary = driver(&config, FakeEngine::products(5))
        .run(source, &mut aggregator)
        .await
        .unwrap();

    assert_eq!(aggregator.pages().len(), 3);
    assert_eq!(summary.pages_succeeded, 3);
    assert_eq!(summary.pages_failed, 0);
    assert!(summary.failures.is_empty());
    assert_eq!(summary.total_items, 15);
    assert_eq!(summary.mean_items_per_page, 5);
    assert_eq!(aggregator.pages()[1].attempts, 2);

    let log = log.lock().unwrap();
    assert_eq!(log.navigations.len(), 4);
    assert_eq!(log.closes, 1);

    let artifact = read_json(&aggregator.writer().run_path());
    assert_eq!(artifact["errores"].as_array().unwrap().len(), 0);
    assert_eq!(artifact["resumen"]["paginas_exitosas"], 3);
}

#[tokio::test]
async fn test_malformed_output_fails_without_retry() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 2, 3);
    let engine = FakeEngine::new(|_| Ok(json!({ "productos": "none" })));
    let calls = engine.calls.clone();
    let mut aggregator = aggregator(&config);

    let summary = driver(&config, engine)
        .run(FakeSource::listing(), &mut aggregator)
        .await
        .unwrap();

    assert_eq!(summary.pages_failed, 2);
    assert_eq!(summary.pages_succeeded, 0);
    assert_eq!(summary.mean_items_per_page, 0);
    // One extraction call per page, no retries
    assert_eq!(*calls.lock().unwrap(), 2);
    for page in aggregator.pages() {
        assert_eq!(page.status, PageStatus::Failed);
        assert_eq!(page.attempts, 1);
        assert_eq!(page.error.as_ref().unwrap().kind, ErrorKind::MalformedOutput);
    }

    let artifact = read_json(&aggregator.writer().run_path());
    let errors = artifact["errores"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["pagina"], 1);
    assert_eq!(errors[1]["pagina"], 2);
    assert_eq!(errors[0]["tipo"], "malformed-output");
}

#[tokio::test]
async fn test_empty_page_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 3, 3);
    let source = FakeSource::new(|url, _| {
        if url.contains("page=2") {
            Ok(String::new())
        } else {
            Ok(listing_html())
        }
    });
    let log = source.log.clone();
    let engine = FakeEngine::products(4);
    let calls = engine.calls.clone();
    let mut aggregator = aggregator(&config);

    let summary = driver(&config, engine)
        .run(source, &mut aggregator)
        .await
        .unwrap();

    let page2 = &aggregator.pages()[1];
    assert_eq!(page2.status, PageStatus::SkippedEmpty);
    assert!(page2.items.is_empty());
    assert_eq!(page2.reported_count, 0);
    assert_eq!(page2.attempts, 1);
    assert!(page2.error.is_none());
    assert_eq!(page2.warning, Some(ErrorKind::EmptyContent));
    assert_eq!(aggregator.pages()[0].warning, None);

    assert!(summary.failures.is_empty());
    assert_eq!(summary.pages_skipped, 1);
    assert_eq!(summary.pages_succeeded, 2);
    assert_eq!(summary.total_items, 8);
    // No extraction call was spent on the empty page
    assert_eq!(*calls.lock().unwrap(), 2);
    assert_eq!(log.lock().unwrap().navigations.len(), 3);
}

#[tokio::test]
async fn test_exhausted_page_is_recorded_and_run_continues() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 2, 3);
    let source = FakeSource::new(|url, _| {
        if url.contains("page=") {
            Ok(listing_html())
        } else {
            Err(timeout_error(url))
        }
    });
    let log = source.log.clone();
    let mut aggregator = aggregator(&config);

    let summary = driver(&config, FakeEngine::products(3))
        .run(source, &mut aggregator)
        .await
        .unwrap();

    let page1 = &aggregator.pages()[0];
    assert_eq!(page1.status, PageStatus::Failed);
    assert_eq!(page1.attempts, 3);
    assert_eq!(page1.error.as_ref().unwrap().kind, ErrorKind::NavigationTimeout);

    assert_eq!(aggregator.pages()[1].status, PageStatus::Success);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].page, 1);
    assert_eq!(log.lock().unwrap().navigations.len(), 4);
}

#[tokio::test]
async fn test_fatal_error_aborts_and_keeps_recorded_pages() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 3, 3);
    let engine = FakeEngine::new(|_| Ok(listing_answer(3, true)));
    let calls = engine.calls.clone();
    let source = FakeSource::listing();
    let log = source.log.clone();
    let mut aggregator = aggregator(&config);

    // The second call is rejected as a configuration failure
    let fatal_engine = FakeEngine {
        answer: Box::new({
            let calls = calls.clone();
            move |content| {
                if *calls.lock().unwrap() >= 2 {
                    Err(ExtractionError::FatalConfig("key rejected".to_string()))
                } else {
                    (engine.answer)(content)
                }
            }
        }),
        calls,
    };

    let err = driver(&config, fatal_engine)
        .run(source, &mut aggregator)
        .await
        .unwrap_err();

    assert!(matches!(err, HarvestError::Fatal { page: 2, .. }));
    assert_eq!(aggregator.pages().len(), 1);
    assert_eq!(log.lock().unwrap().closes, 1);
    // Only one navigation for the fatal page: no retry budget consumed
    assert_eq!(log.lock().unwrap().navigations.len(), 2);

    let artifact = read_json(&aggregator.writer().run_path());
    assert_eq!(artifact["paginas"].as_array().unwrap().len(), 1);
    assert!(aggregator.writer().page_path(1).exists());
    assert!(!aggregator.writer().page_path(2).exists());
}

#[tokio::test]
async fn test_pages_visited_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 4, 1);
    let source = FakeSource::listing();
    let log = source.log.clone();
    let mut aggregator = aggregator(&config);

    driver(&config, FakeEngine::products(2))
        .run(source, &mut aggregator)
        .await
        .unwrap();

    let indices: Vec<u32> = aggregator.pages().iter().map(|p| p.page).collect();
    assert_eq!(indices, vec![1, 2, 3, 4]);
    let log = log.lock().unwrap();
    assert_eq!(log.navigations[0], BASE_URL);
    assert_eq!(log.navigations[3], format!("{}&page=4", BASE_URL));
    for i in 1..=4 {
        assert!(aggregator.writer().page_path(i).exists());
    }
}

#[tokio::test]
async fn test_under_extraction_is_flagged_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 2, 3);
    let engine = FakeEngine::products(0);
    let calls = engine.calls.clone();
    let mut aggregator = aggregator(&config);

    let summary = driver(&config, engine)
        .run(FakeSource::listing(), &mut aggregator)
        .await
        .unwrap();

    assert_eq!(*calls.lock().unwrap(), 2);
    assert_eq!(summary.pages_succeeded, 2);
    assert_eq!(summary.pages_under_extracted, 2);
    assert_eq!(summary.total_items, 0);
    assert!(aggregator.pages().iter().all(|p| p.under_extracted && p.attempts == 1));

    let page = read_json(&aggregator.writer().page_path(1));
    assert_eq!(page["pocos_productos"], true);
    assert_eq!(page["advertencia"], "under-extraction");
    assert_eq!(page["estado"], "success");
}

#[tokio::test]
async fn test_stop_without_next_page() {
    let dir = tempfile::tempdir().unwrap();
    let config = HarvestConfig {
        stop_without_next: true,
        ..test_config(dir.path(), 5, 1)
    };
    let engine = FakeEngine::new(|_| Ok(listing_answer(3, false)));
    let mut aggregator = aggregator(&config);

    let summary = driver(&config, engine)
        .run(FakeSource::listing(), &mut aggregator)
        .await
        .unwrap();

    assert_eq!(summary.pages_attempted, 1);
    assert_eq!(summary.requested_pages, 5);
}

#[tokio::test]
async fn test_continuation_flag_ignored_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 3, 1);
    let engine = FakeEngine::new(|_| Ok(listing_answer(3, false)));
    let mut aggregator = aggregator(&config);

    let summary = driver(&config, engine)
        .run(FakeSource::listing(), &mut aggregator)
        .await
        .unwrap();

    assert_eq!(summary.pages_attempted, 3);
    assert!(aggregator.pages().iter().all(|p| !p.has_next));
}

#[tokio::test]
async fn test_inflated_reported_count_is_capped() {
    let dir = tempfile::tempdir().unwrap();
    let config = HarvestConfig {
        max_items_per_page: 40,
        ..test_config(dir.path(), 2, 1)
    };
    let engine = FakeEngine::new(|_| {
        let mut answer = listing_answer(3, true);
        answer["total_productos"] = json!(1e20);
        Ok(answer)
    });
    let mut aggregator = aggregator(&config);

    let summary = driver(&config, engine)
        .run(FakeSource::listing(), &mut aggregator)
        .await
        .unwrap();

    assert_eq!(summary.total_items, 80);
    assert_eq!(summary.mean_items_per_page, 40);
    assert!(aggregator.pages().iter().all(|p| p.reported_count == 40));

    let artifact = read_json(&aggregator.writer().run_path());
    assert_eq!(artifact["resumen"]["total_productos_extraidos"], 80);
}
