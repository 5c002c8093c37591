//! Background cache worker: offline caching and out-of-tab alerts.
//!
//! [`BackgroundWorker`] models an independently-lived worker the
//! platform may run, suspend, or terminate regardless of page
//! lifetime. It owns the versioned response cache (network-first with
//! write-through), precaches the static asset list on install, purges
//! stale cache generations on activate, and renders alerts for both
//! externally-pushed payloads and in-page `SHOW_NOTIFICATION`
//! messages. The page communicates with it only through a
//! [`WorkerHandle`] over an async channel — no shared memory.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::config::NotifyConfig;
use crate::dispatch::{Alert, AlertAction, AlertSink};
use crate::error::{NotifyError, Result};

/// Maximum cached responses per cache generation.
const MAX_BUCKET_ENTRIES: u64 = 512;

/// Vibration pattern applied to worker-rendered alerts.
const VIBRATE_PATTERN: [u32; 3] = [100, 50, 100];

/// Coalescing tag for in-page notification requests.
const PRAYER_TAG: &str = "prayer-notification";

/// Fallback push title when the payload carries none.
const DEFAULT_PUSH_TITLE: &str = "Jadwal Imsakiyah";

/// Fallback push body when the payload carries none.
const DEFAULT_PUSH_BODY: &str = "Waktunya prayer time!";

/// Page URL focused/opened when an alert is clicked.
const ROOT_URL: &str = "/";

/// Message protocol from the page to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PageMessage {
    /// Render an alert immediately on the page's behalf.
    #[serde(rename = "SHOW_NOTIFICATION")]
    ShowNotification {
        /// Alert title.
        title: String,
        /// Alert body.
        body: String,
        /// Icon path.
        icon: String,
    },
}

/// An externally delivered push payload. Every field is optional;
/// absence falls back to generic alert text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushPayload {
    /// Alert title.
    #[serde(default)]
    pub title: Option<String>,
    /// Alert body.
    #[serde(default)]
    pub body: Option<String>,
    /// Opaque correlation key from the push service.
    #[serde(default, rename = "primaryKey")]
    pub primary_key: Option<String>,
}

/// Request identity for cache keying: method plus fragment-less URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    method: String,
    url: String,
}

impl RequestKey {
    /// Build a key from a method and URL.
    ///
    /// The method is uppercased and the fragment stripped; a fragment
    /// never reaches the server, so it must not split cache entries.
    /// Absolute URLs are otherwise normalised; path-only URLs
    /// (precached assets like `/manifest.json`) are kept verbatim.
    pub fn new(method: &str, url: &str) -> Self {
        let url = match url::Url::parse(url) {
            Ok(mut parsed) => {
                parsed.set_fragment(None);
                parsed.to_string()
            }
            Err(_) => match url.split_once('#') {
                Some((before, _)) => before.to_string(),
                None => url.to_string(),
            },
        };
        Self {
            method: method.to_uppercase(),
            url,
        }
    }

    /// Convenience for a GET request key.
    pub fn get(url: &str) -> Self {
        Self::new("GET", url)
    }

    /// The normalised URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// A cached response body and when it was captured.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The response body, byte-identical to the network response.
    pub body: Vec<u8>,
    /// When the successful fetch happened.
    pub captured_at: SystemTime,
}

type Bucket = Cache<RequestKey, CacheEntry>;

/// Named cache generations shared across worker versions.
///
/// Each generation is one versioned bucket; activation of a new worker
/// deletes every generation not matching the current name.
#[derive(Clone, Default)]
pub struct CacheStorage {
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
}

impl CacheStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (creating if needed) the named cache generation.
    pub fn open(&self, name: &str) -> Bucket {
        let mut buckets = match self.buckets.lock() {
            Ok(buckets) => buckets,
            Err(poisoned) => poisoned.into_inner(),
        };
        buckets
            .entry(name.to_string())
            .or_insert_with(|| Cache::builder().max_capacity(MAX_BUCKET_ENTRIES).build())
            .clone()
    }

    /// Enumerate existing generation names.
    pub fn names(&self) -> Vec<String> {
        match self.buckets.lock() {
            Ok(buckets) => buckets.keys().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Delete a generation wholesale. Returns `true` when it existed.
    pub fn delete(&self, name: &str) -> bool {
        match self.buckets.lock() {
            Ok(mut buckets) => buckets.remove(name).is_some(),
            Err(_) => false,
        }
    }
}

/// Network backend for fetch interception and precaching.
pub trait NetworkFetch: Send + Sync {
    /// Fetch the response body for a request.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Network`] when the network is
    /// unreachable; the worker then falls back to the cache.
    fn fetch(&self, key: &RequestKey) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Worker lifecycle, driven by install/activate/new-version events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerLifecycle {
    /// Precaching static assets.
    Installing,
    /// Installed but not yet controlling pages.
    Waiting,
    /// Controlling pages and serving fetches.
    Active,
    /// Replaced by a newer version.
    Redundant,
}

/// Events delivered to the worker's run loop.
#[derive(Debug)]
pub enum WorkerEvent {
    /// In-page message (see [`PageMessage`]).
    Message(PageMessage),
    /// External push delivery; `None` models an empty payload.
    Push(Option<String>),
    /// The user clicked a rendered alert.
    NotificationClick,
    /// Intercepted network request awaiting a response.
    Fetch {
        /// Request identity.
        key: RequestKey,
        /// Where to deliver the body or failure.
        reply: oneshot::Sender<Result<Vec<u8>>>,
    },
}

/// Page-side handle to a registered worker.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::UnboundedSender<WorkerEvent>,
    controlling: Arc<AtomicBool>,
}

impl WorkerHandle {
    /// Returns `true` once the worker has activated and claimed pages.
    pub fn is_controlling(&self) -> bool {
        self.controlling.load(Ordering::SeqCst)
    }

    /// Post an in-page message to the worker.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::WorkerUnavailable`] when the worker is
    /// not yet controlling the page or has gone away.
    pub fn post_message(&self, message: PageMessage) -> Result<()> {
        if !self.is_controlling() {
            return Err(NotifyError::WorkerUnavailable(
                "worker is not controlling the page".into(),
            ));
        }
        self.tx
            .send(WorkerEvent::Message(message))
            .map_err(|_| NotifyError::WorkerUnavailable("worker channel closed".into()))
    }

    /// Deliver an external push payload (platform side).
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::WorkerUnavailable`] when the worker has
    /// gone away. Push delivery does not require a controlled page.
    pub fn push(&self, payload: Option<String>) -> Result<()> {
        self.tx
            .send(WorkerEvent::Push(payload))
            .map_err(|_| NotifyError::WorkerUnavailable("worker channel closed".into()))
    }

    /// Report an alert click (platform side).
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::WorkerUnavailable`] when the worker has
    /// gone away.
    pub fn notification_click(&self) -> Result<()> {
        self.tx
            .send(WorkerEvent::NotificationClick)
            .map_err(|_| NotifyError::WorkerUnavailable("worker channel closed".into()))
    }

    /// Route an intercepted request through the worker's cache.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::WorkerUnavailable`] when the worker has
    /// gone away, otherwise whatever the fetch resolved to.
    pub async fn fetch(&self, key: RequestKey) -> Result<Vec<u8>> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(WorkerEvent::Fetch { key, reply })
            .map_err(|_| NotifyError::WorkerUnavailable("worker channel closed".into()))?;
        response
            .await
            .map_err(|_| NotifyError::WorkerUnavailable("worker dropped the request".into()))?
    }
}

/// The background cache worker.
pub struct BackgroundWorker<N: NetworkFetch> {
    cache_name: String,
    precache_assets: Vec<String>,
    icon: String,
    storage: CacheStorage,
    network: N,
    alerts: Arc<dyn AlertSink>,
    lifecycle: WorkerLifecycle,
    controlling: Arc<AtomicBool>,
}

impl<N: NetworkFetch> BackgroundWorker<N> {
    /// Create a worker over shared cache storage.
    ///
    /// Storage is passed in rather than owned so a newer worker
    /// version can see (and purge) the generations of older ones.
    pub fn new(
        config: &NotifyConfig,
        storage: CacheStorage,
        network: N,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            cache_name: config.cache_name.clone(),
            precache_assets: config.precache_assets.clone(),
            icon: config.icon_path.clone(),
            storage,
            network,
            alerts,
            lifecycle: WorkerLifecycle::Installing,
            controlling: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build a page-side handle bound to this worker's control flag.
    pub fn handle(&self, tx: mpsc::UnboundedSender<WorkerEvent>) -> WorkerHandle {
        WorkerHandle {
            tx,
            controlling: self.controlling.clone(),
        }
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> WorkerLifecycle {
        self.lifecycle
    }

    /// Install: precache the static asset list under the versioned
    /// cache name.
    ///
    /// A failed asset fetch is logged and skipped — offline support
    /// for that asset degrades, install still completes.
    pub async fn install(&mut self) {
        self.lifecycle = WorkerLifecycle::Installing;
        let bucket = self.storage.open(&self.cache_name);

        let network = &self.network;
        let fetches = self.precache_assets.iter().map(|asset| {
            let key = RequestKey::get(asset);
            async move {
                let result = network.fetch(&key).await;
                (key, result)
            }
        });
        for (key, result) in futures::future::join_all(fetches).await {
            match result {
                Ok(body) => {
                    bucket
                        .insert(
                            key,
                            CacheEntry {
                                body,
                                captured_at: SystemTime::now(),
                            },
                        )
                        .await;
                }
                Err(err) => {
                    tracing::warn!(url = key.url(), %err, "precache fetch failed; skipping asset");
                }
            }
        }
        self.lifecycle = WorkerLifecycle::Waiting;
        tracing::debug!(cache = %self.cache_name, "worker installed");
    }

    /// Activate: delete every cache generation not matching the
    /// current name, then claim open pages so this worker controls
    /// them without a reload.
    pub async fn activate(&mut self) {
        for name in self.storage.names() {
            if name != self.cache_name {
                self.storage.delete(&name);
                tracing::debug!(cache = %name, "stale cache generation purged");
            }
        }
        self.controlling.store(true, Ordering::SeqCst);
        self.lifecycle = WorkerLifecycle::Active;
        tracing::debug!(cache = %self.cache_name, "worker active and controlling");
    }

    /// Demote this worker after a newer version installed.
    pub fn mark_redundant(&mut self) {
        self.controlling.store(false, Ordering::SeqCst);
        self.lifecycle = WorkerLifecycle::Redundant;
    }

    /// Network-first fetch interception with write-through caching.
    ///
    /// On success the response is stored under the request identity
    /// and returned live; on network failure the most recent cached
    /// response is served instead.
    ///
    /// # Errors
    ///
    /// Propagates the network failure when no cached response exists.
    pub async fn fetch_with_cache(&self, key: &RequestKey) -> Result<Vec<u8>> {
        let bucket = self.storage.open(&self.cache_name);
        match self.network.fetch(key).await {
            Ok(body) => {
                bucket
                    .insert(
                        key.clone(),
                        CacheEntry {
                            body: body.clone(),
                            captured_at: SystemTime::now(),
                        },
                    )
                    .await;
                Ok(body)
            }
            Err(err) => match bucket.get(key).await {
                Some(entry) => {
                    tracing::debug!(url = key.url(), %err, "network failed; serving cached response");
                    Ok(entry.body)
                }
                None => Err(err),
            },
        }
    }

    /// Render an alert for an in-page message.
    ///
    /// Repeated identical requests coalesce visually via a fixed tag;
    /// `require_interaction` keeps the alert until dismissed.
    pub fn handle_message(&self, message: PageMessage) {
        let PageMessage::ShowNotification { title, body, icon } = message;
        let icon = if icon.is_empty() {
            self.icon.clone()
        } else {
            icon
        };
        let outcome = self.alerts.show(Alert {
            title,
            body,
            icon,
            badge: Some(self.icon.clone()),
            tag: Some(PRAYER_TAG.into()),
            require_interaction: true,
            vibrate: VIBRATE_PATTERN.to_vec(),
            actions: Vec::new(),
        });
        if let Err(err) = outcome {
            tracing::warn!(%err, "message alert failed to render");
        }
    }

    /// Render an alert for an external push delivery.
    ///
    /// A missing or malformed payload falls back to generic text.
    pub fn handle_push(&self, payload: Option<&str>) {
        let parsed = match payload {
            Some(raw) => match serde_json::from_str::<PushPayload>(raw) {
                Ok(parsed) => parsed,
                Err(err) => {
                    tracing::warn!(%err, "malformed push payload; using defaults");
                    PushPayload::default()
                }
            },
            None => PushPayload::default(),
        };

        let primary_key = parsed.primary_key.unwrap_or_else(|| "1".into());
        tracing::debug!(primary_key, "push payload received");

        let outcome = self.alerts.show(Alert {
            title: parsed.title.unwrap_or_else(|| DEFAULT_PUSH_TITLE.into()),
            body: parsed.body.unwrap_or_else(|| DEFAULT_PUSH_BODY.into()),
            icon: self.icon.clone(),
            badge: Some(self.icon.clone()),
            tag: None,
            require_interaction: false,
            vibrate: VIBRATE_PATTERN.to_vec(),
            actions: vec![
                AlertAction {
                    action: "open".into(),
                    title: "Buka App".into(),
                },
                AlertAction {
                    action: "dismiss".into(),
                    title: "Tutup".into(),
                },
            ],
        });
        if let Err(err) = outcome {
            tracing::warn!(%err, "push alert failed to render");
        }
    }

    /// Handle an alert click: the alert closes and the app's root page
    /// is focused or opened. Returns the URL to open.
    pub fn handle_notification_click(&self) -> &'static str {
        tracing::debug!(url = ROOT_URL, "notification clicked; opening app");
        ROOT_URL
    }

    /// Run the worker: install, activate immediately (skip waiting),
    /// then serve events until every handle is dropped.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<WorkerEvent>) {
        self.install().await;
        self.activate().await;

        while let Some(event) = events.recv().await {
            match event {
                WorkerEvent::Message(message) => self.handle_message(message),
                WorkerEvent::Push(payload) => self.handle_push(payload.as_deref()),
                WorkerEvent::NotificationClick => {
                    let _ = self.handle_notification_click();
                }
                WorkerEvent::Fetch { key, reply } => {
                    let result = self.fetch_with_cache(&key).await;
                    // The requesting page may have navigated away.
                    let _ = reply.send(result);
                }
            }
        }
        tracing::debug!("worker channel closed; shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records rendered alerts.
    #[derive(Default)]
    struct RecordingSink {
        shown: Mutex<Vec<Alert>>,
    }

    impl AlertSink for RecordingSink {
        fn show(&self, alert: Alert) -> Result<()> {
            if let Ok(mut shown) = self.shown.lock() {
                shown.push(alert);
            }
            Ok(())
        }
    }

    /// Serves canned bodies per URL, switchable to offline.
    struct MockNetwork {
        responses: Mutex<HashMap<String, Vec<u8>>>,
        offline: AtomicBool,
    }

    impl MockNetwork {
        fn new(entries: &[(&str, &str)]) -> Self {
            let responses = entries
                .iter()
                .map(|(url, body)| (RequestKey::get(url).url().to_string(), body.as_bytes().to_vec()))
                .collect();
            Self {
                responses: Mutex::new(responses),
                offline: AtomicBool::new(false),
            }
        }

        fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }

        fn set_body(&self, url: &str, body: &str) {
            if let Ok(mut responses) = self.responses.lock() {
                responses.insert(RequestKey::get(url).url().to_string(), body.as_bytes().to_vec());
            }
        }
    }

    impl NetworkFetch for &MockNetwork {
        async fn fetch(&self, key: &RequestKey) -> Result<Vec<u8>> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(NotifyError::Network("offline".into()));
            }
            let responses = self.responses.lock().expect("lock");
            responses
                .get(key.url())
                .cloned()
                .ok_or_else(|| NotifyError::Network(format!("no route to {}", key.url())))
        }
    }

    fn make_worker<'a>(
        network: &'a MockNetwork,
        storage: CacheStorage,
    ) -> (BackgroundWorker<&'a MockNetwork>, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let worker = BackgroundWorker::new(
            &NotifyConfig::default(),
            storage,
            network,
            sink.clone() as Arc<dyn AlertSink>,
        );
        (worker, sink)
    }

    fn precache_network() -> MockNetwork {
        MockNetwork::new(&[
            ("/", "<html>app shell</html>"),
            ("/manifest.json", "{\"name\": \"Jadwal Imsakiyah\"}"),
            ("/logo-imsakiyah.png", "PNGBYTES"),
        ])
    }

    #[test]
    fn request_key_normalises_method_and_fragment() {
        let a = RequestKey::new("get", "https://api.example.com/jadwal?x=1#frag");
        let b = RequestKey::new("GET", "https://api.example.com/jadwal?x=1");
        assert_eq!(a, b);
    }

    #[test]
    fn request_key_keeps_path_only_urls() {
        let key = RequestKey::get("/manifest.json");
        assert_eq!(key.url(), "/manifest.json");
    }

    #[test]
    fn request_key_strips_fragment_on_path_only_urls() {
        assert_eq!(RequestKey::get("/page#section"), RequestKey::get("/page"));
        assert_eq!(RequestKey::get("/page#section").url(), "/page");
    }

    #[test]
    fn request_key_distinguishes_methods() {
        assert_ne!(
            RequestKey::new("GET", "https://example.com/"),
            RequestKey::new("POST", "https://example.com/")
        );
    }

    #[test]
    fn page_message_matches_wire_protocol() {
        let message = PageMessage::ShowNotification {
            title: "Waktunya Maghrib".into(),
            body: "Jadwal Maghrib untuk wilayah JAKARTA telah tiba.".into(),
            icon: "/logo-imsakiyah.png".into(),
        };
        let json = serde_json::to_string(&message).expect("serialize");
        assert!(json.contains("\"type\":\"SHOW_NOTIFICATION\""));

        let decoded: PageMessage = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded, message);
    }

    #[tokio::test]
    async fn install_precaches_asset_list() {
        let network = precache_network();
        let storage = CacheStorage::new();
        let (mut worker, _sink) = make_worker(&network, storage.clone());

        worker.install().await;
        assert_eq!(worker.lifecycle(), WorkerLifecycle::Waiting);

        let bucket = storage.open("imsakiyah-cache-v2");
        for asset in ["/", "/manifest.json", "/logo-imsakiyah.png"] {
            assert!(
                bucket.get(&RequestKey::get(asset)).await.is_some(),
                "{asset} should be precached"
            );
        }
    }

    #[tokio::test]
    async fn failed_precache_asset_is_skipped() {
        let network = MockNetwork::new(&[("/", "<html>app shell</html>")]);
        let storage = CacheStorage::new();
        let (mut worker, _sink) = make_worker(&network, storage.clone());

        worker.install().await;
        assert_eq!(worker.lifecycle(), WorkerLifecycle::Waiting);

        let bucket = storage.open("imsakiyah-cache-v2");
        assert!(bucket.get(&RequestKey::get("/")).await.is_some());
        assert!(bucket.get(&RequestKey::get("/manifest.json")).await.is_none());
    }

    #[tokio::test]
    async fn activate_purges_stale_generations_and_claims() {
        let network = precache_network();
        let storage = CacheStorage::new();
        storage.open("imsakiyah-cache-v1");

        let (mut worker, _sink) = make_worker(&network, storage.clone());
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = worker.handle(tx);
        assert!(!handle.is_controlling());

        worker.install().await;
        worker.activate().await;

        assert_eq!(worker.lifecycle(), WorkerLifecycle::Active);
        assert!(handle.is_controlling());
        assert_eq!(storage.names(), vec!["imsakiyah-cache-v2".to_string()]);
    }

    #[tokio::test]
    async fn fetch_is_network_first_with_write_through() {
        let network = precache_network();
        let storage = CacheStorage::new();
        let (worker, _sink) = make_worker(&network, storage.clone());

        let key = RequestKey::get("https://api.myquran.com/v2/sholat/jadwal/1301/2026/2");
        network.set_body(
            "https://api.myquran.com/v2/sholat/jadwal/1301/2026/2",
            "{\"status\": true}",
        );

        let body = worker.fetch_with_cache(&key).await.expect("online fetch");
        assert_eq!(body, b"{\"status\": true}");

        // A later success refreshes the cache.
        network.set_body(
            "https://api.myquran.com/v2/sholat/jadwal/1301/2026/2",
            "{\"status\": true, \"fresh\": true}",
        );
        let body = worker.fetch_with_cache(&key).await.expect("online fetch");
        assert_eq!(body, b"{\"status\": true, \"fresh\": true}");

        network.set_offline(true);
        let offline = worker.fetch_with_cache(&key).await.expect("cached fetch");
        assert_eq!(offline, b"{\"status\": true, \"fresh\": true}");
    }

    #[tokio::test]
    async fn offline_response_is_byte_identical() {
        let network = precache_network();
        let storage = CacheStorage::new();
        let (worker, _sink) = make_worker(&network, storage);

        let key = RequestKey::get("/manifest.json");
        let online = worker.fetch_with_cache(&key).await.expect("online fetch");

        network.set_offline(true);
        let offline = worker.fetch_with_cache(&key).await.expect("cached fetch");
        assert_eq!(online, offline);
    }

    #[tokio::test]
    async fn offline_without_cache_propagates_failure() {
        let network = precache_network();
        network.set_offline(true);
        let storage = CacheStorage::new();
        let (worker, _sink) = make_worker(&network, storage);

        let err = worker
            .fetch_with_cache(&RequestKey::get("/never-fetched"))
            .await
            .expect_err("no cache entry");
        assert!(matches!(err, NotifyError::Network(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn message_alert_coalesces_and_requires_interaction() {
        let network = precache_network();
        let (worker, sink) = make_worker(&network, CacheStorage::new());

        worker.handle_message(PageMessage::ShowNotification {
            title: "Waktunya Maghrib".into(),
            body: "Jadwal Maghrib untuk wilayah JAKARTA telah tiba.".into(),
            icon: "/logo-imsakiyah.png".into(),
        });

        let shown = sink.shown.lock().expect("lock");
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].tag.as_deref(), Some("prayer-notification"));
        assert!(shown[0].require_interaction);
        assert_eq!(shown[0].vibrate, vec![100, 50, 100]);
        assert_eq!(shown[0].badge.as_deref(), Some("/logo-imsakiyah.png"));
    }

    #[tokio::test]
    async fn message_with_empty_icon_falls_back_to_configured_icon() {
        let network = precache_network();
        let (worker, sink) = make_worker(&network, CacheStorage::new());

        worker.handle_message(PageMessage::ShowNotification {
            title: "T".into(),
            body: "B".into(),
            icon: String::new(),
        });

        let shown = sink.shown.lock().expect("lock");
        assert_eq!(shown[0].icon, "/logo-imsakiyah.png");
    }

    #[tokio::test]
    async fn push_with_payload_uses_its_text() {
        let network = precache_network();
        let (worker, sink) = make_worker(&network, CacheStorage::new());

        worker.handle_push(Some(
            r#"{"title": "Sahur", "body": "30 menit menuju imsak", "primaryKey": "42"}"#,
        ));

        let shown = sink.shown.lock().expect("lock");
        assert_eq!(shown[0].title, "Sahur");
        assert_eq!(shown[0].body, "30 menit menuju imsak");
        assert_eq!(shown[0].actions.len(), 2);
        assert_eq!(shown[0].actions[0].action, "open");
        assert_eq!(shown[0].actions[1].title, "Tutup");
    }

    #[tokio::test]
    async fn push_without_payload_uses_defaults() {
        let network = precache_network();
        let (worker, sink) = make_worker(&network, CacheStorage::new());

        worker.handle_push(None);

        let shown = sink.shown.lock().expect("lock");
        assert_eq!(shown[0].title, "Jadwal Imsakiyah");
        assert_eq!(shown[0].body, "Waktunya prayer time!");
    }

    #[tokio::test]
    async fn malformed_push_payload_uses_defaults() {
        let network = precache_network();
        let (worker, sink) = make_worker(&network, CacheStorage::new());

        worker.handle_push(Some("][ not json"));

        let shown = sink.shown.lock().expect("lock");
        assert_eq!(shown[0].title, "Jadwal Imsakiyah");
    }

    #[test]
    fn click_opens_root_page() {
        let network = precache_network();
        let (worker, _sink) = make_worker(&network, CacheStorage::new());
        assert_eq!(worker.handle_notification_click(), "/");
    }

    #[tokio::test]
    async fn post_message_requires_control() {
        let network = precache_network();
        let (mut worker, _sink) = make_worker(&network, CacheStorage::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = worker.handle(tx);

        let message = PageMessage::ShowNotification {
            title: "T".into(),
            body: "B".into(),
            icon: "I".into(),
        };

        let err = handle.post_message(message.clone()).expect_err("not controlling");
        assert!(matches!(err, NotifyError::WorkerUnavailable(_)), "got {err:?}");

        worker.install().await;
        worker.activate().await;
        handle.post_message(message).expect("controlling now");
    }

    #[tokio::test]
    async fn redundant_worker_stops_controlling() {
        let network = precache_network();
        let (mut worker, _sink) = make_worker(&network, CacheStorage::new());
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = worker.handle(tx);

        worker.install().await;
        worker.activate().await;
        assert!(handle.is_controlling());

        worker.mark_redundant();
        assert_eq!(worker.lifecycle(), WorkerLifecycle::Redundant);
        assert!(!handle.is_controlling());
    }

    #[tokio::test]
    async fn run_loop_serves_fetches_and_alerts() {
        let network = Box::leak(Box::new(precache_network()));
        let storage = CacheStorage::new();
        let (worker, sink) = make_worker(network, storage);

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = worker.handle(tx);
        let task = tokio::spawn(worker.run(rx));

        // The run loop installs and activates before serving events.
        let body = handle
            .fetch(RequestKey::get("/manifest.json"))
            .await
            .expect("fetch through worker");
        assert_eq!(body, b"{\"name\": \"Jadwal Imsakiyah\"}");
        assert!(handle.is_controlling());

        handle
            .post_message(PageMessage::ShowNotification {
                title: "Waktunya Isya".into(),
                body: "Jadwal Isya untuk wilayah JAKARTA telah tiba.".into(),
                icon: "/logo-imsakiyah.png".into(),
            })
            .expect("post message");
        handle.push(None).expect("push");
        handle.notification_click().expect("click");

        // Closing the last sender ends the run loop, proving the
        // queued events were all drained first.
        drop(handle);
        task.await.expect("worker task");

        let shown = sink.shown.lock().expect("lock");
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].title, "Waktunya Isya");
        assert_eq!(shown[1].title, "Jadwal Imsakiyah");
    }
}
