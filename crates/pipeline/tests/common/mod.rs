//! Shared fakes and fixtures for dispatcher tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chaincast_core::catalog::{Catalog, ContentUnit};
use chaincast_core::cursor::{DispatchState, RateLimitPolicy, VersionedState};
use chaincast_core::memory_store::MemoryStateStore;
use chaincast_core::ports::{
    ContentGenerator, GenerationError, GenerationRequest, PublishError, Publisher,
};
use chaincast_core::types::Timestamp;
use chaincast_pipeline::retry::RetryPolicy;
use chaincast_pipeline::{Dispatcher, DispatcherConfig};
use chrono::{TimeZone, Utc};

pub const BOT: &str = "test-bot";

pub fn at(secs: i64) -> Timestamp {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Three units named Alpha, Beta and Gamma.
pub fn catalog_abc() -> Arc<Catalog> {
    let units = ["Alpha", "Beta", "Gamma"]
        .iter()
        .map(|name| {
            ContentUnit::new(
                *name,
                format!("{}.xyz", name.to_lowercase()),
                format!("@{name}"),
                format!("{name} protocol"),
                "DeFi",
            )
        })
        .collect();
    Arc::new(Catalog::new(units).unwrap())
}

pub fn config(limit: u32, window_secs: i64) -> DispatcherConfig {
    let policy = RateLimitPolicy::new(limit, chrono::Duration::seconds(window_secs)).unwrap();
    let mut config = DispatcherConfig::new(BOT, policy);
    config.retry = RetryPolicy {
        timeout: Duration::from_secs(2),
        backoff: Duration::from_millis(1),
        max_attempts: 2,
    };
    config.thread_delay = Duration::ZERO;
    config.dispatch_budget = config.min_dispatch_budget();
    config
}

pub fn state(last_index: usize, window_count: u32, window_start: Timestamp) -> VersionedState {
    VersionedState {
        state: DispatchState {
            last_index,
            last_dispatch_at: Some(window_start),
            window_count,
            window_start,
        },
        version: 7,
    }
}

/// Three paragraphs, shaped into a three-part thread.
pub fn threaded_text(unit: &ContentUnit) -> String {
    format!(
        "{} is worth a closer look this week, and here is why it matters.\n\n\
         First, the team keeps shipping real features while others mostly talk.\n\n\
         Second, {} has a community that shows up. Keep an eye on it.",
        unit.name, unit.handle
    )
}

/// Text the fake generator produces for `unit`.
pub fn generated_text(unit: &ContentUnit) -> String {
    format!(
        "{} is worth a closer look this week. The {} team keeps shipping while others talk, \
         and {} deserves attention from anyone following {}.",
        unit.name, unit.name, unit.handle, unit.category
    )
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeGenerator {
    /// Consumed one per call before anything else.
    queued_failures: Mutex<VecDeque<GenerationError>>,
    permanent_failure: Mutex<Option<GenerationError>>,
    requests: Mutex<Vec<GenerationRequest>>,
    delay: Duration,
    threaded: bool,
}

impl FakeGenerator {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing(err: GenerationError) -> Self {
        let generator = Self::default();
        *generator.permanent_failure.lock().unwrap() = Some(err);
        generator
    }

    pub fn failing_once(err: GenerationError) -> Self {
        let generator = Self::default();
        generator.queued_failures.lock().unwrap().push_back(err);
        generator
    }

    pub fn threaded() -> Self {
        Self {
            threaded: true,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn recover(&self) {
        *self.permanent_failure.lock().unwrap() = None;
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.requests.lock().unwrap().last().map(|r| r.prompt.clone())
    }

    pub fn requested_units(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.unit.name.clone())
            .collect()
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(err) = self.queued_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        if let Some(err) = self.permanent_failure.lock().unwrap().clone() {
            return Err(err);
        }
        if self.threaded {
            return Ok(threaded_text(&request.unit));
        }
        Ok(generated_text(&request.unit))
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakePublisher {
    queued_failures: Mutex<VecDeque<PublishError>>,
    permanent_failure: Mutex<Option<PublishError>>,
    /// Fail every reply, cutting threads after the first segment.
    partial_threads: bool,
    /// How long each reply takes before it answers.
    reply_delay: Duration,
    /// `(text, in_reply_to)` of every segment that went live.
    live: Mutex<Vec<(String, Option<String>)>>,
    attempts: AtomicU64,
    next_id: AtomicU64,
}

impl FakePublisher {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing(err: PublishError) -> Self {
        let publisher = Self::default();
        *publisher.permanent_failure.lock().unwrap() = Some(err);
        publisher
    }

    pub fn failing_once(err: PublishError) -> Self {
        let publisher = Self::default();
        publisher.queued_failures.lock().unwrap().push_back(err);
        publisher
    }

    pub fn partial() -> Self {
        Self {
            partial_threads: true,
            ..Self::default()
        }
    }

    /// First segments go live at once; every reply stalls for `delay`.
    pub fn stalling_replies(delay: Duration) -> Self {
        Self {
            reply_delay: delay,
            ..Self::default()
        }
    }

    /// Calls made, failed ones included.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Segments that went live without replying to anything.
    pub fn live_first_segments(&self) -> usize {
        self.live
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, parent)| parent.is_none())
            .count()
    }

    pub fn live_segments(&self) -> usize {
        self.live.lock().unwrap().len()
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn post_segment(
        &self,
        text: &str,
        in_reply_to: Option<&str>,
    ) -> Result<String, PublishError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.queued_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        if let Some(err) = self.permanent_failure.lock().unwrap().clone() {
            return Err(err);
        }
        if in_reply_to.is_some() {
            if self.partial_threads {
                return Err(PublishError::Transport {
                    message: "connection reset".into(),
                });
            }
            if !self.reply_delay.is_zero() {
                tokio::time::sleep(self.reply_delay).await;
            }
        }

        self.live
            .lock()
            .unwrap()
            .push((text.to_string(), in_reply_to.map(str::to_string)));
        Ok((self.next_id.fetch_add(1, Ordering::SeqCst) + 1000).to_string())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub store: Arc<MemoryStateStore>,
    pub generator: Arc<FakeGenerator>,
    pub publisher: Arc<FakePublisher>,
    pub dispatcher: Arc<Dispatcher>,
}

pub fn harness(
    catalog: Arc<Catalog>,
    store: MemoryStateStore,
    generator: FakeGenerator,
    publisher: FakePublisher,
    config: DispatcherConfig,
) -> Harness {
    let store = Arc::new(store);
    let generator = Arc::new(generator);
    let publisher = Arc::new(publisher);
    let dispatcher = Arc::new(Dispatcher::new(
        catalog,
        store.clone(),
        generator.clone(),
        publisher.clone(),
        config,
    ));
    Harness {
        store,
        generator,
        publisher,
        dispatcher,
    }
}
