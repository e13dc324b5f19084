//! Debounced, switch-latest search view over the product store.
//!
//! Query text is pushed into a [`SearchProjection`]; after a quiet period the
//! latest text becomes a live store subscription, replacing (and cancelling)
//! the previous one. Consumers watch [`SearchResults`].

use crate::error::Result;
use crate::product::Product;
use crate::store::{ProductQuery, ProductStore, Subscription};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// Quiet period between the last keystroke and the query being issued
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Anything that can open live product queries
pub trait QuerySource: Send + Sync + 'static {
    fn subscribe(&self, query: ProductQuery) -> Subscription<Vec<Product>>;
}

impl QuerySource for ProductStore {
    fn subscribe(&self, query: ProductQuery) -> Subscription<Vec<Product>> {
        ProductStore::subscribe(self, query)
    }
}

/// Current state of the search view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    /// Text (trimmed) the products belong to
    pub query: String,
    pub products: Vec<Product>,
    /// Last storage fault, cleared by the next good snapshot
    pub error: Option<String>,
}

/// Blank text lists everything; anything else is a trimmed substring search
pub fn query_for_text(text: &str) -> ProductQuery {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        ProductQuery::All
    } else {
        ProductQuery::Search(trimmed.to_string())
    }
}

/// Background task turning query text into live results
pub struct SearchProjection {
    input: watch::Sender<String>,
    results: watch::Receiver<SearchResults>,
    task: JoinHandle<()>,
}

impl SearchProjection {
    /// Start the projection with an empty query (which lists everything)
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S: QuerySource>(source: S, debounce: Duration) -> Self {
        let (input, input_rx) = watch::channel(String::new());
        let (results_tx, results) = watch::channel(SearchResults::default());
        let task = tokio::spawn(run(source, debounce, input_rx, results_tx));
        Self {
            input,
            results,
            task,
        }
    }

    /// Replace the query text; identical text is ignored
    pub fn set_query(&self, text: &str) {
        self.input.send_if_modified(|current| {
            if current == text {
                false
            } else {
                *current = text.to_string();
                true
            }
        });
    }

    /// Receiver for the results; `changed()` fires on every new snapshot
    pub fn results(&self) -> watch::Receiver<SearchResults> {
        self.results.clone()
    }

    pub fn current(&self) -> SearchResults {
        self.results.borrow().clone()
    }
}

impl Drop for SearchProjection {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct ActiveQuery {
    query: ProductQuery,
    text: String,
    subscription: Subscription<Vec<Product>>,
}

async fn next_snapshot(active: &mut Option<ActiveQuery>) -> Option<Result<Vec<Product>>> {
    match active {
        Some(active) => active.subscription.next().await,
        None => std::future::pending().await,
    }
}

async fn run<S: QuerySource>(
    source: S,
    debounce: Duration,
    mut input: watch::Receiver<String>,
    output: watch::Sender<SearchResults>,
) {
    let mut active: Option<ActiveQuery> = None;
    // The initial (empty) text is debounced like any other.
    let mut deadline = Some(Instant::now() + debounce);

    loop {
        tokio::select! {
            changed = input.changed() => {
                if changed.is_err() {
                    break;
                }
                deadline = Some(Instant::now() + debounce);
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                let text = input.borrow_and_update().trim().to_string();
                let query = query_for_text(&text);
                if active.as_ref().map(|a| &a.query) == Some(&query) {
                    continue;
                }
                if let Some(mut previous) = active.take() {
                    previous.subscription.cancel();
                }
                log::debug!("Search switched to {:?}", query);
                let subscription = source.subscribe(query.clone());
                active = Some(ActiveQuery { query, text, subscription });
            }
            snapshot = next_snapshot(&mut active), if active.is_some() => {
                let Some(current) = active.as_ref() else { continue };
                match snapshot {
                    Some(Ok(products)) => {
                        output.send_replace(SearchResults {
                            query: current.text.clone(),
                            products,
                            error: None,
                        });
                    }
                    Some(Err(e)) => {
                        log::warn!("Search for {:?} failed: {}", current.text, e);
                        output.send_modify(|results| results.error = Some(e.to_string()));
                    }
                    None => {
                        active = None;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    const TEST_DEBOUNCE: Duration = Duration::from_millis(50);

    /// Store wrapper that records every query it is asked to open
    #[derive(Clone)]
    struct RecordingSource {
        store: ProductStore,
        issued: Arc<Mutex<Vec<ProductQuery>>>,
    }

    impl RecordingSource {
        fn new(store: ProductStore) -> Self {
            Self {
                store,
                issued: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn issued(&self) -> Vec<ProductQuery> {
            self.issued.lock().unwrap().clone()
        }
    }

    impl QuerySource for RecordingSource {
        fn subscribe(&self, query: ProductQuery) -> Subscription<Vec<Product>> {
            self.issued.lock().unwrap().push(query.clone());
            self.store.subscribe(query)
        }
    }

    async fn seeded_store() -> ProductStore {
        let store = ProductStore::open_in_memory().unwrap();
        store.insert(Product::new("111", "abc cereal")).await.unwrap();
        store.insert(Product::new("222", "ABC cookies")).await.unwrap();
        store.insert(Product::new("333", "bread")).await.unwrap();
        store
    }

    async fn wait_until<F>(projection: &SearchProjection, predicate: F) -> SearchResults
    where
        F: Fn(&SearchResults) -> bool,
    {
        let mut rx = projection.results();
        let results = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|r| predicate(r)))
            .await
            .expect("timed out waiting for search results")
            .expect("projection stopped");
        results.clone()
    }

    #[test]
    fn test_blank_text_lists_everything() {
        assert_eq!(query_for_text(""), ProductQuery::All);
        assert_eq!(query_for_text("   "), ProductQuery::All);
        assert_eq!(
            query_for_text("  abc "),
            ProductQuery::Search("abc".to_string())
        );
    }

    #[tokio::test]
    async fn test_rapid_typing_issues_only_the_last_query() {
        let source = RecordingSource::new(seeded_store().await);
        let projection = SearchProjection::spawn(source.clone(), TEST_DEBOUNCE);

        projection.set_query("a");
        projection.set_query("ab");
        projection.set_query("abc");

        let results = wait_until(&projection, |r| r.query == "abc").await;
        assert_eq!(results.products.len(), 1);
        assert_eq!(results.products[0].name, "abc cereal");
        assert_eq!(source.issued(), vec![ProductQuery::Search("abc".to_string())]);
    }

    #[tokio::test]
    async fn test_empty_query_shows_all_products() {
        let source = RecordingSource::new(seeded_store().await);
        let projection = SearchProjection::spawn(source.clone(), TEST_DEBOUNCE);

        let results = wait_until(&projection, |r| r.products.len() == 3).await;
        assert_eq!(results.query, "");
        assert_eq!(source.issued(), vec![ProductQuery::All]);
    }

    #[tokio::test]
    async fn test_new_query_replaces_previous_one() {
        let store = seeded_store().await;
        let projection = SearchProjection::spawn(store.clone(), TEST_DEBOUNCE);

        projection.set_query("cereal");
        wait_until(&projection, |r| r.query == "cereal").await;

        projection.set_query("bread");
        wait_until(&projection, |r| r.query == "bread").await;

        // A write matching the abandoned query must not leak into the view.
        store.insert(Product::new("444", "cereal bars")).await.unwrap();
        store.insert(Product::new("555", "rye bread")).await.unwrap();
        let results = wait_until(&projection, |r| r.products.len() == 2).await;
        assert_eq!(results.query, "bread");
        assert!(results.products.iter().all(|p| p.name.contains("bread")));
    }

    #[tokio::test]
    async fn test_results_follow_store_writes() {
        let store = seeded_store().await;
        let projection = SearchProjection::spawn(store.clone(), TEST_DEBOUNCE);
        projection.set_query("bread");
        wait_until(&projection, |r| r.query == "bread" && r.products.len() == 1).await;

        store.insert(Product::new("666", "flatbread")).await.unwrap();
        let results = wait_until(&projection, |r| r.products.len() == 2).await;
        assert_eq!(results.products[0].name, "flatbread");
    }

    #[tokio::test]
    async fn test_equivalent_text_does_not_requery() {
        let source = RecordingSource::new(seeded_store().await);
        let projection = SearchProjection::spawn(source.clone(), TEST_DEBOUNCE);

        projection.set_query("abc");
        wait_until(&projection, |r| r.query == "abc").await;
        projection.set_query("abc  ");
        tokio::time::sleep(TEST_DEBOUNCE * 4).await;

        assert_eq!(source.issued(), vec![ProductQuery::Search("abc".to_string())]);
        assert_eq!(projection.current().query, "abc");
    }
}
