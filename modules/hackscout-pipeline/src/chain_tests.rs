//! Chain tests: end-to-end with mocks.
//!
//! Each test follows MOCK → FUNCTION → OUTPUT:
//! script the browser and the model, call `Pipeline::run`, assert on the
//! record and on what the session was asked to do.

use std::sync::Arc;
use std::time::Duration;

use hackscout_common::{FinalRecord, PipelineError};
use serde_json::json;

use crate::extractor::ExtractionProfile;
use crate::pipeline::Pipeline;
use crate::renderer::Renderer;
use crate::testing::*;

const HACK_URL: &str = "https://example.com/hack";
const EX25_SEARCH: &str = "https://x.com/search?q=%23ex25&src=typed_query&f=media";
const SHIP_SEARCH: &str = "https://x.com/search?q=%23ship&src=typed_query&f=media";

fn pipeline(browser: MockBrowser, generator: Arc<MockGenerator>) -> Pipeline {
    Pipeline::new(Arc::new(browser), generator, ExtractionProfile::hashtags())
        .with_renderer(Renderer::new().with_scroll_pause(Duration::ZERO))
}

fn example_hack() -> MockBrowser {
    MockBrowser::new().on_page(HACK_URL, "Example Hack", "Join Example Hack. Post with #ex25.")
}

// ---------------------------------------------------------------------------
// Chain Test 1: Full enrichment
//
// render → extract (empty title, prize pool, difficulty, one tag) → reconcile
// → probe #ex25 (42 videos).
// ---------------------------------------------------------------------------

#[tokio::test]
async fn hackathon_page_is_enriched_and_tag_probed() {
    let browser = example_hack().on_media(EX25_SEARCH, &[42]);
    let log = browser.log();
    let generator = Arc::new(MockGenerator::replying_json(json!({
        "title": "",
        "prize_pool": "$10,000",
        "difficulty": "Advanced",
        "hashtags": ["#ex25"]
    })));

    let record = pipeline(browser, generator.clone()).run(HACK_URL).await.unwrap();

    assert_eq!(
        record,
        FinalRecord {
            title: "Example Hack".to_string(),
            url: HACK_URL.to_string(),
            prize_pool: "$10,000".to_string(),
            difficulty: "Advanced".to_string(),
            hashtag_counts: "#ex25: 42 videos".to_string(),
            ..Default::default()
        }
    );

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].ends_with("Join Example Hack. Post with #ex25."));

    let log = log.lock().unwrap();
    assert_eq!(log.opened, 1);
    assert_eq!(log.closed, 1);
    assert_eq!(log.loads, vec![HACK_URL.to_string(), EX25_SEARCH.to_string()]);
}

#[tokio::test]
async fn primary_and_probe_loads_use_their_own_timeouts() {
    let browser = example_hack().on_media(EX25_SEARCH, &[1]);
    let log = browser.log();
    let generator = Arc::new(MockGenerator::replying_json(json!({ "hashtags": ["#ex25"] })));

    pipeline(browser, generator).run(HACK_URL).await.unwrap();

    assert_eq!(
        log.lock().unwrap().load_timeouts,
        vec![Duration::from_secs(60), Duration::from_secs(30)]
    );
}

// ---------------------------------------------------------------------------
// Chain Test 2: Extraction degrades, the run does not
// ---------------------------------------------------------------------------

#[tokio::test]
async fn extraction_service_failure_yields_rendered_fields_only() {
    let browser = example_hack();
    let log = browser.log();
    let generator = Arc::new(MockGenerator::failing("503 Service Unavailable"));

    let record = pipeline(browser, generator).run(HACK_URL).await.unwrap();

    assert_eq!(
        record,
        FinalRecord {
            title: "Example Hack".to_string(),
            url: HACK_URL.to_string(),
            ..Default::default()
        }
    );
    // No tags, so the only load is the primary page.
    assert_eq!(log.lock().unwrap().loads, vec![HACK_URL.to_string()]);
}

#[tokio::test]
async fn undecodable_model_output_yields_rendered_fields_only() {
    let generator = Arc::new(MockGenerator::replying("Sorry, I can't help with that."));

    let record = pipeline(example_hack(), generator).run(HACK_URL).await.unwrap();

    assert_eq!(record.title, "Example Hack");
    assert_eq!(record.description, "");
    assert_eq!(record.difficulty, "");
    assert_eq!(record.hashtag_counts, "");
}

#[tokio::test]
async fn no_tags_means_no_probe() {
    let browser = example_hack();
    let log = browser.log();
    let generator = Arc::new(MockGenerator::replying_json(json!({
        "description": "A weekend of building.",
        "hashtags": []
    })));

    let record = pipeline(browser, generator).run(HACK_URL).await.unwrap();

    assert_eq!(record.description, "A weekend of building.");
    assert_eq!(record.hashtag_counts, "");
    let log = log.lock().unwrap();
    assert_eq!(log.loads.len(), 1);
    assert_eq!(log.scrolls, 0);
}

// ---------------------------------------------------------------------------
// Chain Test 3: Probe fan-out
//
// Every tag gets exactly one entry; a failing tag is isolated.
// ---------------------------------------------------------------------------

#[tokio::test]
async fn each_tag_is_reported_once_and_failures_are_isolated() {
    let browser = example_hack()
        .on_media(EX25_SEARCH, &[40, 90, 130])
        .failing_load(SHIP_SEARCH, "Navigation timeout of 30000 ms exceeded");
    let generator = Arc::new(MockGenerator::replying_json(json!({
        "hashtags": ["#ex25", "#ship"]
    })));

    let record = pipeline(browser, generator).run(HACK_URL).await.unwrap();

    assert_eq!(record.hashtag_counts, "#ex25: 100+ videos, #ship: Check failed");
}

#[tokio::test]
async fn caller_tags_are_probed_after_extracted_tags() {
    let browser = example_hack()
        .on_media(EX25_SEARCH, &[3])
        .on_media(SHIP_SEARCH, &[0]);
    let generator = Arc::new(MockGenerator::replying_json(json!({ "hashtags": ["#ex25"] })));

    let record = pipeline(browser, generator)
        .run_with_tags(HACK_URL, &["#EX25".to_string(), "#ship".to_string()])
        .await
        .unwrap();

    assert_eq!(record.hashtag_counts, "#ex25: 3 videos, #ship: 0 videos");
}

// ---------------------------------------------------------------------------
// Chain Test 4: Fatal paths still release the session
// ---------------------------------------------------------------------------

#[tokio::test]
async fn render_failure_fails_the_run_and_closes_the_session() {
    let browser = MockBrowser::new().failing_load(HACK_URL, "net::ERR_CONNECTION_REFUSED");
    let log = browser.log();
    let generator = Arc::new(MockGenerator::replying("{}"));

    let err = pipeline(browser, generator.clone()).run(HACK_URL).await.unwrap_err();

    match err {
        PipelineError::Render(e) => {
            assert_eq!(e.url, HACK_URL);
            assert!(e.message.contains("ERR_CONNECTION_REFUSED"));
        }
        other => panic!("expected render error, got {other:?}"),
    }
    assert!(generator.prompts().is_empty());

    let log = log.lock().unwrap();
    assert_eq!(log.opened, 1);
    assert_eq!(log.closed, 1);
}

#[tokio::test]
async fn unavailable_browser_is_a_session_error() {
    let browser = MockBrowser::new().failing_open("Chrome binary not found");
    let log = browser.log();
    let generator = Arc::new(MockGenerator::replying("{}"));

    let err = pipeline(browser, generator).run(HACK_URL).await.unwrap_err();

    assert!(matches!(err, PipelineError::Session(ref m) if m.contains("Chrome binary not found")));
    assert_eq!(log.lock().unwrap().closed, 0);
}

#[tokio::test]
async fn cancelled_run_still_closes_its_session() {
    let browser = example_hack();
    let log = browser.log();
    let generator = Arc::new(MockGenerator::hanging());
    let pipeline = pipeline(browser, generator.clone());

    let outcome = tokio::time::timeout(Duration::from_millis(50), pipeline.run(HACK_URL)).await;
    assert!(outcome.is_err(), "run should still be waiting on the model");
    assert_eq!(generator.prompts().len(), 1);

    // The close happens on a spawned task; give it a few turns to run.
    for _ in 0..20 {
        if log.lock().unwrap().closed > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let log = log.lock().unwrap();
    assert_eq!(log.opened, 1);
    assert_eq!(log.closed, 1);
}

// ---------------------------------------------------------------------------
// Chain Test 5: Concurrent runs get their own sessions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_runs_use_separate_sessions() {
    let browser = example_hack().on_page("https://example.org/jam", "Game Jam", "Make a game.");
    let log = browser.log();
    let generator = Arc::new(MockGenerator::replying("{}"));
    let pipeline = pipeline(browser, generator);

    let (a, b) = tokio::join!(
        pipeline.run(HACK_URL),
        pipeline.run("https://example.org/jam")
    );

    assert_eq!(a.unwrap().title, "Example Hack");
    assert_eq!(b.unwrap().title, "Game Jam");
    let log = log.lock().unwrap();
    assert_eq!(log.opened, 2);
    assert_eq!(log.closed, 2);
}
