//! Boundary dataset loading.
//!
//! The map draws every boundary layer from one TopoJSON document. The
//! [`BoundaryLoader`] fetches it once, converts the `boundaries` object to
//! GeoJSON and publishes the result to any number of observers. A failed
//! load is logged and published as `None`; there is no retry.

mod source;

pub use source::{
    BoundaryLocation, BoundarySource, FileBoundarySource, HttpBoundarySource,
    HttpBoundarySourceBuilder, USER_AGENT,
};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use geojson::FeatureCollection;
use tokio::sync::OnceCell;

use crate::error::BoundaryError;
use crate::store::{Subscription, Writable};
use crate::topology::Topology;

/// Default boundary document location, relative to the page.
pub const DEFAULT_BOUNDARIES_PATH: &str = "./boundaries.json";

/// Default name of the topology object holding the boundaries.
pub const DEFAULT_OBJECT_NAME: &str = "boundaries";

/// Published loader value: the converted collection, or `None` while
/// loading and after a failure.
pub type Boundaries = Option<Arc<FeatureCollection>>;

/// Progress of the one-shot load.
#[derive(Debug, Clone, Default)]
pub enum LoadState {
    #[default]
    NotStarted,
    Loading,
    Ready(Arc<FeatureCollection>),
    /// Terminal failure, with the logged error message.
    Failed(String),
}

impl LoadState {
    /// Whether the load has finished, successfully or not.
    pub fn is_settled(&self) -> bool {
        matches!(self, LoadState::Ready(_) | LoadState::Failed(_))
    }
}

struct LoaderInner {
    source: Box<dyn BoundarySource>,
    object_name: String,
    value: Writable<Boundaries>,
    state: Writable<LoadState>,
    result: OnceCell<Boundaries>,
    started: AtomicBool,
}

/// One-shot, shared boundary load.
///
/// Cloning the loader shares the same load; the source is fetched at most
/// once per loader, and later subscribers receive the cached result.
#[derive(Clone)]
pub struct BoundaryLoader {
    inner: Arc<LoaderInner>,
}

impl BoundaryLoader {
    pub fn new(source: impl BoundarySource + 'static) -> Self {
        Self::from_boxed(Box::new(source), DEFAULT_OBJECT_NAME)
    }

    pub fn from_boxed(source: Box<dyn BoundarySource>, object_name: &str) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                source,
                object_name: object_name.to_string(),
                value: Writable::new(None),
                state: Writable::new(LoadState::NotStarted),
                result: OnceCell::new(),
                started: AtomicBool::new(false),
            }),
        }
    }

    /// Currently published value.
    pub fn value(&self) -> Boundaries {
        self.inner.value.get()
    }

    pub fn state(&self) -> LoadState {
        self.inner.state.get()
    }

    /// Observe the published value, starting the load if needed.
    ///
    /// The callback fires immediately with the current value (`None` until
    /// the load settles), then once more when the load completes.
    pub fn subscribe<F>(&self, f: F) -> Subscription
    where
        F: Fn(&Boundaries) + Send + Sync + 'static,
    {
        let subscription = self.inner.value.subscribe(f);
        self.start();
        subscription
    }

    /// Observe load state transitions without starting the load.
    pub fn subscribe_state<F>(&self, f: F) -> Subscription
    where
        F: Fn(&LoadState) + Send + Sync + 'static,
    {
        self.inner.state.subscribe(f)
    }

    /// Spawn the load on the current tokio runtime, once.
    pub fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let loader = self.clone();
                handle.spawn(async move {
                    loader.load().await;
                });
            }
            Err(_) => {
                self.inner.started.store(false, Ordering::SeqCst);
                tracing::warn!(
                    "No async runtime available; boundary load from {} deferred",
                    self.inner.source.describe()
                );
            }
        }
    }

    /// Run the load, or wait for the one already in flight, and return the
    /// published value.
    pub async fn load(&self) -> Boundaries {
        self.inner.started.store(true, Ordering::SeqCst);
        self.inner.result.get_or_init(|| self.run()).await.clone()
    }

    async fn run(&self) -> Boundaries {
        self.inner.state.set(LoadState::Loading);

        match self.fetch_collection().await {
            Ok(collection) => {
                tracing::info!(
                    "Loaded {} boundary feature(s) from {}",
                    collection.features.len(),
                    self.inner.source.describe()
                );
                let collection = Arc::new(collection);
                self.inner
                    .state
                    .set(LoadState::Ready(Arc::clone(&collection)));
                self.inner.value.set(Some(Arc::clone(&collection)));
                Some(collection)
            }
            Err(e) => {
                tracing::error!(
                    "Error fetching boundaries from {}: {}",
                    self.inner.source.describe(),
                    e
                );
                self.inner.state.set(LoadState::Failed(e.to_string()));
                self.inner.value.set(None);
                None
            }
        }
    }

    async fn fetch_collection(&self) -> Result<FeatureCollection, BoundaryError> {
        let bytes = self.inner.source.fetch().await?;
        let topology = Topology::from_slice(&bytes)?;
        Ok(topology.feature_collection(&self.inner.object_name)?)
    }
}

impl std::fmt::Debug for BoundaryLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundaryLoader")
            .field("source", &self.inner.source.describe())
            .field("object_name", &self.inner.object_name)
            .field("state", &self.inner.state.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::Notify;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Counts ERROR events seen by the thread's subscriber.
    struct ErrorCounter(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> Layer<S> for ErrorCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::ERROR {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn count_errors() -> (Arc<AtomicUsize>, tracing::subscriber::DefaultGuard) {
        let errors = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(ErrorCounter(Arc::clone(&errors)));
        (errors, tracing::subscriber::set_default(subscriber))
    }

    const TOPOLOGY: &str = r#"{
        "type": "Topology",
        "objects": {
            "boundaries": {
                "type": "GeometryCollection",
                "geometries": [
                    { "type": "Polygon", "arcs": [[0, 1]], "id": "a" },
                    { "type": "Polygon", "arcs": [[-2, -1]], "id": "b" }
                ]
            }
        },
        "arcs": [[[0, 0], [1, 0], [1, 1]], [[1, 1], [0, 1], [0, 0]]]
    }"#;

    /// In-memory source that counts fetches and can be held back.
    struct StubSource {
        body: Result<Vec<u8>, String>,
        fetches: Arc<AtomicUsize>,
        gate: Option<Arc<Notify>>,
    }

    impl StubSource {
        fn ok(body: &str) -> Self {
            Self {
                body: Ok(body.as_bytes().to_vec()),
                fetches: Arc::new(AtomicUsize::new(0)),
                gate: None,
            }
        }

        fn failing() -> Self {
            Self {
                body: Err("connection refused".to_string()),
                fetches: Arc::new(AtomicUsize::new(0)),
                gate: None,
            }
        }
    }

    #[async_trait]
    impl BoundarySource for StubSource {
        async fn fetch(&self) -> Result<Vec<u8>, BoundaryError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.body.clone().map_err(|e| {
                BoundaryError::Io(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e))
            })
        }

        fn describe(&self) -> String {
            "stub".to_string()
        }
    }

    fn feature_counts() -> (
        Arc<Mutex<Vec<Option<usize>>>>,
        impl Fn(&Boundaries) + Send + Sync + 'static,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |value: &Boundaries| {
            sink.lock()
                .unwrap()
                .push(value.as_ref().map(|fc| fc.features.len()))
        })
    }

    #[tokio::test]
    async fn test_load_publishes_collection() {
        let loader = BoundaryLoader::new(StubSource::ok(TOPOLOGY));

        let value = loader.load().await.unwrap();

        assert_eq!(value.features.len(), 2);
        assert!(matches!(loader.state(), LoadState::Ready(_)));
        assert_eq!(loader.value().map(|fc| fc.features.len()), Some(2));
    }

    #[tokio::test]
    async fn test_failed_fetch_publishes_none_once() {
        let (errors, _guard) = count_errors();
        let source = StubSource::failing();
        let fetches = Arc::clone(&source.fetches);
        let loader = BoundaryLoader::new(source);

        assert!(loader.load().await.is_none());
        assert!(loader.load().await.is_none());

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        match loader.state() {
            LoadState::Failed(message) => assert!(message.contains("connection refused")),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_document_publishes_none() {
        let loader = BoundaryLoader::new(StubSource::ok("<html>404</html>"));
        assert!(loader.load().await.is_none());
        assert!(matches!(loader.state(), LoadState::Failed(_)));
    }

    #[tokio::test]
    async fn test_missing_object_publishes_none() {
        let loader = BoundaryLoader::from_boxed(Box::new(StubSource::ok(TOPOLOGY)), "wards");
        assert!(loader.load().await.is_none());
        match loader.state() {
            LoadState::Failed(message) => assert!(message.contains("wards")),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_subscribers_attached_before_completion_share_result() {
        let gate = Arc::new(Notify::new());
        let mut source = StubSource::ok(TOPOLOGY);
        source.gate = Some(Arc::clone(&gate));
        let fetches = Arc::clone(&source.fetches);
        let loader = BoundaryLoader::new(source);

        let (first, cb_first) = feature_counts();
        let (second, cb_second) = feature_counts();
        let _a = loader.subscribe(cb_first);
        let _b = loader.subscribe(cb_second);

        // Let the spawned load reach the gate.
        tokio::task::yield_now().await;
        assert!(matches!(loader.state(), LoadState::Loading));

        gate.notify_one();
        loader.load().await;

        assert_eq!(*first.lock().unwrap(), vec![None, Some(2)]);
        assert_eq!(*second.lock().unwrap(), vec![None, Some(2)]);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_subscribers_both_see_failure() {
        let (errors, _guard) = count_errors();
        let loader = BoundaryLoader::new(StubSource::failing());
        let (first, cb_first) = feature_counts();
        let (second, cb_second) = feature_counts();
        let _a = loader.subscribe(cb_first);
        let _b = loader.subscribe(cb_second);

        loader.load().await;

        assert_eq!(first.lock().unwrap().last(), Some(&None));
        assert_eq!(second.lock().unwrap().last(), Some(&None));
        assert!(loader.state().is_settled());

        // Let the load spawned by the first subscribe observe the settled cell.
        tokio::task::yield_now().await;
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_cached_value() {
        let source = StubSource::ok(TOPOLOGY);
        let fetches = Arc::clone(&source.fetches);
        let loader = BoundaryLoader::new(source);
        loader.load().await;

        let (seen, cb) = feature_counts();
        let _sub = loader.subscribe(cb);
        tokio::task::yield_now().await;

        assert_eq!(*seen.lock().unwrap(), vec![Some(2)]);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let loader = BoundaryLoader::new(StubSource::ok(TOPOLOGY));
        let states = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&states);
        let _sub = loader.subscribe_state(move |s| {
            let label = match s {
                LoadState::NotStarted => "not-started",
                LoadState::Loading => "loading",
                LoadState::Ready(_) => "ready",
                LoadState::Failed(_) => "failed",
            };
            sink.lock().unwrap().push(label);
        });

        loader.load().await;

        assert_eq!(*states.lock().unwrap(), vec!["not-started", "loading", "ready"]);
    }

    #[test]
    fn test_subscribe_without_runtime_defers_load() {
        let loader = BoundaryLoader::new(StubSource::ok(TOPOLOGY));
        let _sub = loader.subscribe(|_| {});
        assert!(matches!(loader.state(), LoadState::NotStarted));
    }
}
