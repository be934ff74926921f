use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use haiven_catalog::{CatalogConfig, PromptCatalog};
use haiven_core::{BridgeError, PromptContent, PromptKind, PromptSource, PromptSummary};

#[derive(Default)]
struct FakeSource {
    catalog: Mutex<Vec<PromptSummary>>,
    summary_error: Mutex<Option<BridgeError>>,
    content_error: Mutex<Option<BridgeError>>,
    summary_delay: Duration,
    content_delay: Duration,
    summary_calls: AtomicUsize,
    content_calls: AtomicUsize,
}

impl FakeSource {
    fn with_ids(ids: &[&str]) -> Self {
        let s = Self::default();
        s.set_ids(ids);
        s
    }

    fn set_ids(&self, ids: &[&str]) {
        *self.catalog.lock().unwrap() = ids.iter().map(|id| summary(id)).collect();
    }

    fn fail_summaries(&self, err: Option<BridgeError>) {
        *self.summary_error.lock().unwrap() = err;
    }

    fn fail_content(&self, err: Option<BridgeError>) {
        *self.content_error.lock().unwrap() = err;
    }

    fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }

    fn content_calls(&self) -> usize {
        self.content_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PromptSource for FakeSource {
    async fn fetch_summaries(&self) -> Result<Vec<PromptSummary>, BridgeError> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        if !self.summary_delay.is_zero() {
            tokio::time::sleep(self.summary_delay).await;
        }
        if let Some(e) = self.summary_error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(self.catalog.lock().unwrap().clone())
    }

    async fn fetch_content(&self, prompt_id: &str) -> Result<PromptContent, BridgeError> {
        self.content_calls.fetch_add(1, Ordering::SeqCst);
        if !self.content_delay.is_zero() {
            tokio::time::sleep(self.content_delay).await;
        }
        if let Some(e) = self.content_error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(PromptContent {
            prompt_id: prompt_id.to_string(),
            title: format!("Title {prompt_id}"),
            content: format!("Body of {prompt_id}"),
            kind: PromptKind::Chat,
            follow_ups: Vec::new(),
        })
    }
}

fn summary(id: &str) -> PromptSummary {
    PromptSummary {
        identifier: id.to_string(),
        title: format!("Title {id}"),
        categories: vec!["testing".to_string()],
        help_description: None,
        help_user_input: None,
        help_sample_input: None,
        kind: PromptKind::Chat,
    }
}

fn catalog(source: &Arc<FakeSource>, config: CatalogConfig) -> PromptCatalog {
    PromptCatalog::new(source.clone(), config)
}

/// TTLs that expire immediately but keep stale values servable for a minute.
fn expiring() -> CatalogConfig {
    CatalogConfig {
        summary_ttl: Duration::ZERO,
        content_ttl: Duration::ZERO,
        stale_grace: Duration::from_secs(60),
    }
}

#[tokio::test]
async fn summaries_within_ttl_hit_upstream_once() -> anyhow::Result<()> {
    let source = Arc::new(FakeSource::with_ids(&["a", "b"]));
    let cat = catalog(&source, CatalogConfig::default());

    let first = cat.get_summaries(false).await?;
    let second = cat.get_summaries(false).await?;
    assert_eq!(first.len(), 2);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(source.summary_calls(), 1);

    cat.get_summaries(true).await?;
    assert_eq!(source.summary_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn expired_summaries_are_refetched() -> anyhow::Result<()> {
    let source = Arc::new(FakeSource::with_ids(&["a"]));
    let cat = catalog(&source, expiring());

    cat.get_summaries(false).await?;
    tokio::time::sleep(Duration::from_millis(5)).await;
    cat.get_summaries(false).await?;
    assert_eq!(source.summary_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn concurrent_refreshes_collapse() -> anyhow::Result<()> {
    let source = Arc::new(FakeSource::with_ids(&["a"]));
    let cat = Arc::new(catalog(&source, CatalogConfig::default()));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let cat = cat.clone();
            tokio::spawn(async move { cat.get_summaries(false).await })
        })
        .collect();
    for t in tasks {
        t.await??;
    }
    assert_eq!(source.summary_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn content_for_listed_id_matches_request() -> anyhow::Result<()> {
    let source = Arc::new(FakeSource::with_ids(&["adr-1"]));
    let cat = catalog(&source, CatalogConfig::default());

    let content = cat.get_content("adr-1").await?;
    assert_eq!(content.prompt_id, "adr-1");
    cat.get_content("adr-1").await?;
    assert_eq!(source.content_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn absent_id_is_not_found_without_content_call() -> anyhow::Result<()> {
    let source = Arc::new(FakeSource::with_ids(&["a"]));
    let cat = catalog(&source, CatalogConfig::default());

    let err = cat.get_content("missing").await.unwrap_err();
    assert!(matches!(err, BridgeError::NotFound(ref m) if m.contains("missing")));
    assert_eq!(source.content_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn concurrent_cold_content_reads_share_one_fetch() -> anyhow::Result<()> {
    let source = Arc::new(FakeSource {
        content_delay: Duration::from_millis(50),
        ..FakeSource::with_ids(&["slow"])
    });
    let cat = Arc::new(catalog(&source, CatalogConfig::default()));

    let (a, b) = tokio::join!(cat.get_content("slow"), cat.get_content("slow"));
    assert_eq!(a?, b?);
    assert_eq!(source.content_calls(), 1);
    Ok(())
}

#[tokio::test]
async fn refresh_evicts_content_of_removed_prompts() -> anyhow::Result<()> {
    let source = Arc::new(FakeSource::with_ids(&["keep", "drop"]));
    let cat = catalog(&source, CatalogConfig::default());

    cat.get_content("drop").await?;
    assert_eq!(source.content_calls(), 1);

    source.set_ids(&["keep"]);
    cat.get_summaries(true).await?;
    let err = cat.get_content("drop").await.unwrap_err();
    assert!(matches!(err, BridgeError::NotFound(_)));
    assert_eq!(source.content_calls(), 1);

    // Back in the catalog, the evicted entry is a miss again.
    source.set_ids(&["keep", "drop"]);
    cat.get_summaries(true).await?;
    cat.get_content("drop").await?;
    assert_eq!(source.content_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn stale_catalog_served_while_upstream_is_down() -> anyhow::Result<()> {
    let source = Arc::new(FakeSource::with_ids(&["a"]));
    let cat = catalog(&source, expiring());
    cat.get_summaries(false).await?;

    source.fail_summaries(Some(BridgeError::UpstreamUnavailable("503".into())));
    tokio::time::sleep(Duration::from_millis(5)).await;
    let snap = cat.get_summaries(false).await?;
    assert!(snap.contains("a"));
    assert_eq!(source.summary_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn auth_failure_is_never_masked_by_stale_data() -> anyhow::Result<()> {
    let source = Arc::new(FakeSource::with_ids(&["a"]));
    let cat = catalog(&source, expiring());
    cat.get_summaries(false).await?;

    source.fail_summaries(Some(BridgeError::Auth("401".into())));
    let err = cat.get_summaries(true).await.unwrap_err();
    assert!(matches!(err, BridgeError::Auth(_)));
    Ok(())
}

#[tokio::test]
async fn stale_window_is_bounded() -> anyhow::Result<()> {
    let source = Arc::new(FakeSource::with_ids(&["a"]));
    let cat = catalog(
        &source,
        CatalogConfig {
            summary_ttl: Duration::ZERO,
            content_ttl: Duration::ZERO,
            stale_grace: Duration::ZERO,
        },
    );
    cat.get_summaries(false).await?;

    source.fail_summaries(Some(BridgeError::UpstreamUnavailable("down".into())));
    tokio::time::sleep(Duration::from_millis(5)).await;
    let err = cat.get_summaries(false).await.unwrap_err();
    assert!(matches!(err, BridgeError::UpstreamUnavailable(_)));
    Ok(())
}

#[tokio::test]
async fn cold_failure_propagates() {
    let source = Arc::new(FakeSource::with_ids(&["a"]));
    source.fail_summaries(Some(BridgeError::UpstreamUnavailable("down".into())));
    let cat = catalog(&source, CatalogConfig::default());

    let err = cat.get_summaries(false).await.unwrap_err();
    assert!(matches!(err, BridgeError::UpstreamUnavailable(_)));
    // warm() swallows the same failure.
    cat.warm().await;
}

#[tokio::test]
async fn stale_content_served_only_for_transient_errors() -> anyhow::Result<()> {
    let source = Arc::new(FakeSource::with_ids(&["a"]));
    let cat = catalog(
        &source,
        CatalogConfig {
            summary_ttl: Duration::from_secs(300),
            content_ttl: Duration::ZERO,
            stale_grace: Duration::from_secs(60),
        },
    );
    let first = cat.get_content("a").await?;

    source.fail_content(Some(BridgeError::UpstreamUnavailable("timeout".into())));
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(cat.get_content("a").await?, first);

    source.fail_content(Some(BridgeError::NotFound("prompt 'a'".into())));
    let err = cat.get_content("a").await.unwrap_err();
    assert!(matches!(err, BridgeError::NotFound(_)));
    assert_eq!(source.content_calls(), 3);
    Ok(())
}

#[tokio::test]
async fn concurrent_cold_refreshes_share_a_failure() {
    let source = Arc::new(FakeSource {
        summary_delay: Duration::from_millis(200),
        ..FakeSource::with_ids(&["a"])
    });
    source.fail_summaries(Some(BridgeError::UpstreamUnavailable("timeout".into())));
    let cat = catalog(&source, CatalogConfig::default());

    let started = Instant::now();
    let (a, b, c) = tokio::join!(
        cat.get_summaries(false),
        cat.get_summaries(false),
        cat.get_summaries(false)
    );
    for res in [a, b, c] {
        assert!(matches!(res, Err(BridgeError::UpstreamUnavailable(_))));
    }
    assert_eq!(source.summary_calls(), 1);
    assert!(started.elapsed() < Duration::from_millis(400));

    // A later call is a new attempt.
    let _ = cat.get_summaries(false).await;
    assert_eq!(source.summary_calls(), 2);
}

#[tokio::test]
async fn waiters_behind_failed_refresh_get_the_stale_catalog() -> anyhow::Result<()> {
    let source = Arc::new(FakeSource {
        summary_delay: Duration::from_millis(50),
        ..FakeSource::with_ids(&["a"])
    });
    let cat = catalog(&source, expiring());
    cat.get_summaries(false).await?;

    source.fail_summaries(Some(BridgeError::UpstreamUnavailable("503".into())));
    tokio::time::sleep(Duration::from_millis(5)).await;
    let (a, b) = tokio::join!(cat.get_summaries(false), cat.get_summaries(false));
    assert!(a?.contains("a"));
    assert!(b?.contains("a"));
    assert_eq!(source.summary_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn concurrent_cold_content_reads_share_a_failure() -> anyhow::Result<()> {
    let source = Arc::new(FakeSource {
        content_delay: Duration::from_millis(200),
        ..FakeSource::with_ids(&["p"])
    });
    source.fail_content(Some(BridgeError::UpstreamUnavailable("timeout".into())));
    let cat = catalog(&source, CatalogConfig::default());
    cat.get_summaries(false).await?;

    let started = Instant::now();
    let (a, b) = tokio::join!(cat.get_content("p"), cat.get_content("p"));
    assert!(matches!(a, Err(BridgeError::UpstreamUnavailable(_))));
    assert!(matches!(b, Err(BridgeError::UpstreamUnavailable(_))));
    assert_eq!(source.content_calls(), 1);
    assert!(started.elapsed() < Duration::from_millis(400));

    source.fail_content(None);
    assert_eq!(cat.get_content("p").await?.prompt_id, "p");
    assert_eq!(source.content_calls(), 2);
    Ok(())
}
