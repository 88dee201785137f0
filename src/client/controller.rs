use super::PageFetcher;
use crate::media::{MediaItem, MediaResponse};
use std::{collections::HashSet, sync::Arc, time::Duration};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagingState {
    Idle,
    Loading,
    Exhausted,
    Errored(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The response was applied to the collection.
    Applied,
    /// No request was issued (already loading, exhausted or errored).
    Skipped,
    /// A newer request superseded this one; its response was dropped.
    Discarded,
    Failed,
}

/// Shortest refresh period the controller will schedule.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct PagingOptions {
    pub limit: usize,
    pub refresh_interval: Duration,
}

impl Default for PagingOptions {
    fn default() -> Self {
        Self {
            limit: 20,
            refresh_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PagingSnapshot {
    pub state: PagingState,
    pub items: Vec<MediaItem>,
    pub next_page: usize,
    pub has_more: bool,
    pub total: usize,
}

struct Progress {
    state: PagingState,
    items: Vec<MediaItem>,
    next_page: usize,
    has_more: bool,
    total: usize,
    generation: u64,
    issued: u64,
}

struct Ticket {
    page: usize,
    generation: u64,
    seq: u64,
}

enum LoadKind {
    Next,
    Restart,
}

struct Shared<F> {
    fetcher: F,
    limit: usize,
    progress: Mutex<Progress>,
}

impl<F: PageFetcher> Shared<F> {
    async fn load(&self, kind: LoadKind) -> LoadOutcome {
        let ticket = {
            let mut progress = self.progress.lock().await;
            let page = match kind {
                LoadKind::Next => {
                    if progress.state != PagingState::Idle || !progress.has_more {
                        return LoadOutcome::Skipped;
                    }
                    progress.next_page
                }
                LoadKind::Restart => {
                    progress.generation += 1;
                    1
                }
            };
            progress.issued += 1;
            progress.state = PagingState::Loading;
            Ticket {
                page,
                generation: progress.generation,
                seq: progress.issued,
            }
        };

        let result = self.fetcher.fetch(ticket.page, self.limit).await;

        let mut progress = self.progress.lock().await;
        if ticket.generation != progress.generation || ticket.seq != progress.issued {
            debug!(
                "Discarding stale response for page {} (request {}, latest {})",
                ticket.page, ticket.seq, progress.issued
            );
            return LoadOutcome::Discarded;
        }

        match result {
            Ok(response) => {
                progress.apply(ticket.page, response);
                LoadOutcome::Applied
            }
            Err(e) => {
                warn!("Failed to load page {}: {}", ticket.page, e);
                progress.state = PagingState::Errored(e.to_string());
                LoadOutcome::Failed
            }
        }
    }
}

impl Progress {
    fn apply(&mut self, page: usize, response: MediaResponse) {
        if page == 1 {
            self.items = response.items;
        } else {
            let known: HashSet<String> = self.items.iter().map(|i| i.id.clone()).collect();
            self.items
                .extend(response.items.into_iter().filter(|i| !known.contains(&i.id)));
        }

        self.next_page = page + 1;
        self.has_more = response.has_more;
        self.total = response.total;
        self.state = if self.has_more {
            PagingState::Idle
        } else {
            PagingState::Exhausted
        };
    }
}

/// Incrementally loads listing pages for an infinitely scrolling grid.
pub struct PagingController<F: PageFetcher> {
    shared: Arc<Shared<F>>,
    refresh_interval: Duration,
    refresh_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl<F: PageFetcher> PagingController<F> {
    pub fn new(fetcher: F, options: PagingOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                fetcher,
                limit: options.limit.max(1),
                progress: Mutex::new(Progress {
                    state: PagingState::Idle,
                    items: Vec::new(),
                    next_page: 1,
                    has_more: true,
                    total: 0,
                    generation: 0,
                    issued: 0,
                }),
            }),
            refresh_interval: options.refresh_interval.max(MIN_REFRESH_INTERVAL),
            refresh_task: std::sync::Mutex::new(None),
        }
    }

    /// The trailing sentinel scrolled into view; loads the next page when idle.
    pub async fn on_sentinel_visible(&self) -> LoadOutcome {
        self.shared.load(LoadKind::Next).await
    }

    /// Reloads from page 1, replacing the collection. Clears an error state.
    pub async fn reset(&self) -> LoadOutcome {
        self.shared.load(LoadKind::Restart).await
    }

    pub async fn state(&self) -> PagingState {
        self.shared.progress.lock().await.state.clone()
    }

    pub async fn items(&self) -> Vec<MediaItem> {
        self.shared.progress.lock().await.items.clone()
    }

    pub async fn snapshot(&self) -> PagingSnapshot {
        let progress = self.shared.progress.lock().await;
        PagingSnapshot {
            state: progress.state.clone(),
            items: progress.items.clone(),
            next_page: progress.next_page,
            has_more: progress.has_more,
            total: progress.total,
        }
    }

    /// Periodically restarts from page 1 while exhausted to pick up new uploads.
    pub fn start_refresh(&self) {
        let mut slot = match self.refresh_task.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.is_some() {
            return;
        }

        let shared = self.shared.clone();
        let period = self.refresh_interval;
        *slot = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // Skip the first immediate tick

            loop {
                interval.tick().await;
                let exhausted = shared.progress.lock().await.state == PagingState::Exhausted;
                if exhausted {
                    debug!("Refreshing exhausted listing from page 1");
                    shared.load(LoadKind::Restart).await;
                }
            }
        }));
        info!("Listing refresh every {:?}", period);
    }

    pub fn shutdown(&self) {
        let mut slot = match self.refresh_task.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(task) = slot.take() {
            task.abort();
        }
    }
}

impl<F: PageFetcher> Drop for PagingController<F> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use async_trait::async_trait;
    use chrono::Utc;
    use reqwest::StatusCode;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn item(id: &str) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            title: id.to_uppercase(),
            path: format!("/uploads/{}.png", id),
            created_at: Utc::now(),
        }
    }

    fn response(ids: &[&str], has_more: bool, total: usize) -> MediaResponse {
        MediaResponse {
            items: ids.iter().map(|id| item(id)).collect(),
            has_more,
            total,
        }
    }

    fn ids(items: &[MediaItem]) -> Vec<String> {
        items.iter().map(|i| i.id.clone()).collect()
    }

    type Scripted = Result<MediaResponse, ClientError>;

    /// Replays queued responses in order; an optional gate holds back the first reply.
    struct ScriptedFetcher {
        replies: std::sync::Mutex<VecDeque<Scripted>>,
        gate: std::sync::Mutex<Option<oneshot::Receiver<()>>>,
        calls: AtomicUsize,
        pages: std::sync::Mutex<Vec<usize>>,
    }

    impl ScriptedFetcher {
        fn new(replies: Vec<Scripted>) -> Self {
            Self {
                replies: std::sync::Mutex::new(replies.into()),
                gate: std::sync::Mutex::new(None),
                calls: AtomicUsize::new(0),
                pages: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn gated(replies: Vec<Scripted>) -> (Self, oneshot::Sender<()>) {
            let (tx, rx) = oneshot::channel();
            let fetcher = Self::new(replies);
            *fetcher.gate.lock().unwrap() = Some(rx);
            (fetcher, tx)
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, page: usize, _limit: usize) -> Result<MediaResponse, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pages.lock().unwrap().push(page);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected fetch");
            let gate = self.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            reply
        }
    }

    fn controller(replies: Vec<Scripted>) -> PagingController<ScriptedFetcher> {
        PagingController::new(ScriptedFetcher::new(replies), PagingOptions::default())
    }

    #[tokio::test]
    async fn test_first_page_replaces_then_appends() {
        let controller = controller(vec![
            Ok(response(&["c", "b"], true, 3)),
            Ok(response(&["b", "a"], false, 3)),
        ]);

        assert_eq!(controller.on_sentinel_visible().await, LoadOutcome::Applied);
        assert_eq!(ids(&controller.items().await), vec!["c", "b"]);
        assert_eq!(controller.state().await, PagingState::Idle);

        assert_eq!(controller.on_sentinel_visible().await, LoadOutcome::Applied);
        let snapshot = controller.snapshot().await;
        assert_eq!(ids(&snapshot.items), vec!["c", "b", "a"]);
        assert_eq!(snapshot.state, PagingState::Exhausted);
        assert_eq!(snapshot.next_page, 3);
        assert!(!snapshot.has_more);
        assert_eq!(snapshot.total, 3);
        assert_eq!(*controller.shared.fetcher.pages.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_reset_replaces_without_duplicates() {
        let controller = controller(vec![
            Ok(response(&["b", "a"], false, 2)),
            Ok(response(&["c", "b", "a"], false, 3)),
        ]);

        controller.on_sentinel_visible().await;
        assert_eq!(controller.state().await, PagingState::Exhausted);

        assert_eq!(controller.reset().await, LoadOutcome::Applied);
        assert_eq!(ids(&controller.items().await), vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_exhausted_does_not_fetch() {
        let controller = controller(vec![Ok(response(&["a"], false, 1))]);

        controller.on_sentinel_visible().await;
        assert_eq!(controller.on_sentinel_visible().await, LoadOutcome::Skipped);
        assert_eq!(controller.shared.fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_error_halts_until_reset() {
        let controller = controller(vec![
            Err(ClientError::Status(StatusCode::INTERNAL_SERVER_ERROR)),
            Ok(response(&["a"], true, 2)),
        ]);

        assert_eq!(controller.on_sentinel_visible().await, LoadOutcome::Failed);
        match controller.state().await {
            PagingState::Errored(message) => assert!(message.contains("500")),
            other => panic!("expected error state, got {:?}", other),
        }

        assert_eq!(controller.on_sentinel_visible().await, LoadOutcome::Skipped);
        assert_eq!(controller.shared.fetcher.calls.load(Ordering::SeqCst), 1);

        assert_eq!(controller.reset().await, LoadOutcome::Applied);
        assert_eq!(controller.state().await, PagingState::Idle);
        assert_eq!(ids(&controller.items().await), vec!["a"]);
    }

    #[tokio::test]
    async fn test_concurrent_sentinel_triggers_fetch_once() {
        let (fetcher, release) = ScriptedFetcher::gated(vec![Ok(response(&["a"], true, 5))]);
        let controller = Arc::new(PagingController::new(fetcher, PagingOptions::default()));

        let pending = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.on_sentinel_visible().await })
        };
        while controller.state().await != PagingState::Loading {
            tokio::task::yield_now().await;
        }

        assert_eq!(controller.on_sentinel_visible().await, LoadOutcome::Skipped);
        release.send(()).unwrap();
        assert_eq!(pending.await.unwrap(), LoadOutcome::Applied);
        assert_eq!(controller.shared.fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_response_after_reset_is_discarded() {
        let (fetcher, release) = ScriptedFetcher::gated(vec![
            Ok(response(&["old-2"], true, 10)),
            Ok(response(&["new-1"], false, 1)),
        ]);
        let controller = Arc::new(PagingController::new(fetcher, PagingOptions::default()));

        let stale = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.on_sentinel_visible().await })
        };
        while controller.state().await != PagingState::Loading {
            tokio::task::yield_now().await;
        }

        assert_eq!(controller.reset().await, LoadOutcome::Applied);
        release.send(()).unwrap();
        assert_eq!(stale.await.unwrap(), LoadOutcome::Discarded);

        let snapshot = controller.snapshot().await;
        assert_eq!(ids(&snapshot.items), vec!["new-1"]);
        assert_eq!(snapshot.state, PagingState::Exhausted);
    }

    #[tokio::test]
    async fn test_refresh_restarts_when_exhausted_and_stops_on_shutdown() {
        let fetcher = ScriptedFetcher::new(vec![
            Ok(response(&["a"], false, 1)),
            Ok(response(&["b", "a"], false, 2)),
            Ok(response(&["b", "a"], false, 2)),
            Ok(response(&["b", "a"], false, 2)),
            Ok(response(&["b", "a"], false, 2)),
            Ok(response(&["b", "a"], false, 2)),
        ]);
        let controller = PagingController::new(
            fetcher,
            PagingOptions {
                limit: 20,
                refresh_interval: Duration::from_millis(40),
            },
        );

        controller.on_sentinel_visible().await;
        controller.start_refresh();

        for _ in 0..100 {
            if controller.items().await.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(ids(&controller.items().await), vec!["b", "a"]);

        controller.shutdown();
        let calls = controller.shared.fetcher.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(controller.shared.fetcher.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_zero_refresh_interval_is_clamped() {
        let replies = (0..200).map(|_| Ok(response(&["a"], false, 1))).collect();
        let controller = PagingController::new(
            ScriptedFetcher::new(replies),
            PagingOptions {
                limit: 20,
                refresh_interval: Duration::ZERO,
            },
        );
        assert_eq!(controller.refresh_interval, MIN_REFRESH_INTERVAL);

        controller.on_sentinel_visible().await;
        controller.start_refresh();

        for _ in 0..100 {
            if controller.shared.fetcher.calls.load(Ordering::SeqCst) >= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(controller.shared.fetcher.calls.load(Ordering::SeqCst) >= 3);

        let finished = controller
            .refresh_task
            .lock()
            .unwrap()
            .as_ref()
            .map(|task| task.is_finished());
        assert_eq!(finished, Some(false));
        assert_eq!(controller.state().await, PagingState::Exhausted);

        controller.shutdown();
    }
}
