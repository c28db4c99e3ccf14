//! One dispatch attempt under the bot's lease.
//!
//! ```text
//! acquire lease ─▶ rate check ─▶ select ─▶ generate ─▶ renew lease ─▶ publish ─▶ commit
//!       │              │                      │             │             │          │
//!   in flight     window full          fallback/fail    taken over    throttled   conflict
//! ```
//!
//! Every path except a successful commit releases the lease and leaves the
//! persisted state exactly as it was.

use std::sync::Arc;

use chaincast_core::catalog::{Catalog, ContentUnit};
use chaincast_core::content::{
    extract_hashtags, extract_mentions, fallback_post, shape_post, ShapedPost,
};
use chaincast_core::cursor::{check_rate_limit, record_dispatch, select_next, DispatchState, RateDecision};
use chaincast_core::dispatch::{
    ContentOrigin, DispatchError, DispatchOutcome, DispatchResult, NewPublishedPost,
    PublishedDispatch, PublishedPost, RateLimitReason, RateLimitedDispatch,
};
use chaincast_core::ports::{
    ContentGenerator, DispatchLease, GenerationError, GenerationRequest, PublishError,
    Publisher, StateStore,
};
use chaincast_core::prompt::{build_prompt, pick_style};
use chaincast_core::types::Timestamp;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::config::DispatcherConfig;
use crate::publish::publish_thread;
use crate::retry::call_with_retry;

/// Runs the select → generate → publish → persist loop.
pub struct Dispatcher {
    catalog: Arc<Catalog>,
    store: Arc<dyn StateStore>,
    generator: Arc<dyn ContentGenerator>,
    publisher: Arc<dyn Publisher>,
    config: DispatcherConfig,
}

/// Whole seconds until `delay` has elapsed, rounded up.
fn ceil_secs(delay: chrono::Duration) -> u64 {
    let millis = delay.num_milliseconds().max(0);
    u64::try_from((millis + 999) / 1000).unwrap_or(0)
}

fn to_chrono(duration: std::time::Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

fn rate_limited(reason: RateLimitReason, retry_after_secs: Option<u64>) -> DispatchOutcome {
    DispatchOutcome::RateLimited(RateLimitedDispatch {
        reason,
        retry_after_secs,
    })
}

impl Dispatcher {
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<dyn StateStore>,
        generator: Arc<dyn ContentGenerator>,
        publisher: Arc<dyn Publisher>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            catalog,
            store,
            generator,
            publisher,
            config,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// State a bot starts from before its first dispatch.
    pub fn initial_state(&self) -> DispatchState {
        DispatchState::initial(self.catalog.len())
    }

    /// Run one attempt now.
    pub async fn dispatch(&self) -> DispatchResult {
        self.dispatch_at(Utc::now()).await
    }

    /// Run one attempt with `now` as the dispatch clock.
    pub async fn dispatch_at(&self, now: Timestamp) -> DispatchResult {
        let started = Instant::now();
        let bot_id = self.config.bot_id.as_str();

        let Some(lease) = self
            .store
            .try_acquire(bot_id, &self.initial_state(), now, self.config.dispatch_budget)
            .await?
        else {
            tracing::info!(bot_id, "Dispatch already in flight");
            return Ok(rate_limited(RateLimitReason::DispatchInFlight, None));
        };

        let result = self.run_leased(&lease, now, started).await;

        if !matches!(result, Ok(DispatchOutcome::Published(_))) {
            if let Err(e) = self.store.release(&lease).await {
                // The lease expires on its own after the dispatch budget.
                tracing::warn!(bot_id, error = %e, "Failed to release dispatch lease");
            }
        }

        match &result {
            Ok(DispatchOutcome::Published(p)) => tracing::info!(
                bot_id,
                index = p.index,
                unit = %p.unit.slug,
                post_id = %p.post_id,
                origin = p.origin.as_str(),
                version = p.state.version,
                "Dispatch published",
            ),
            Ok(DispatchOutcome::RateLimited(r)) => tracing::info!(
                bot_id,
                reason = ?r.reason,
                retry_after_secs = ?r.retry_after_secs,
                "Dispatch rate limited",
            ),
            Err(e) => tracing::error!(bot_id, kind = e.kind(), error = %e, "Dispatch failed"),
        }

        result
    }

    async fn run_leased(
        &self,
        lease: &DispatchLease,
        now: Timestamp,
        started: Instant,
    ) -> DispatchResult {
        let state = lease.snapshot.state;
        let policy = self.config.rate_limit;

        if let RateDecision::Limited { retry_after } = check_rate_limit(&state, now, &policy) {
            return Ok(rate_limited(
                RateLimitReason::WindowExhausted,
                Some(ceil_secs(retry_after)),
            ));
        }

        let index = select_next(&state, self.catalog.len());
        // select_next keeps index below the catalog length.
        let unit = &self.catalog.units()[index];
        tracing::debug!(bot_id = %lease.bot_id, index, unit = %unit.slug, "Selected unit");

        let recent = self
            .store
            .recent_posts(&lease.bot_id, Some(&unit.slug), self.config.recent_posts)
            .await?;

        let (post, origin) = match self.compose(unit, &recent).await {
            Ok(post) => (post, ContentOrigin::Generated),
            Err(source) if self.config.fallback_enabled => {
                tracing::warn!(
                    index,
                    unit = %unit.slug,
                    error = %source,
                    "Generation failed, using fallback post",
                );
                (fallback_post(unit), ContentOrigin::Fallback)
            }
            Err(source) => return Err(DispatchError::Generation { index, source }),
        };

        // Nothing is live yet. The lease must still be ours and must outlast
        // the whole publish step.
        let reach = started.elapsed().saturating_add(self.config.publish_budget());
        let until = now
            .checked_add_signed(to_chrono(reach))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        if !self.store.renew(lease, until).await? {
            tracing::warn!(
                bot_id = %lease.bot_id,
                index,
                "Dispatch lease taken over before publishing",
            );
            return Ok(rate_limited(RateLimitReason::DispatchInFlight, None));
        }

        let receipt = match publish_thread(
            self.publisher.as_ref(),
            &post,
            &self.config.retry,
            self.config.thread_delay,
        )
        .await
        {
            Ok(receipt) => receipt,
            Err(PublishError::RateLimited { retry_after_secs }) => {
                return Ok(rate_limited(
                    RateLimitReason::PublisherThrottled,
                    retry_after_secs,
                ));
            }
            Err(source) => return Err(DispatchError::Publish { index, source }),
        };

        if !receipt.complete {
            tracing::warn!(
                post_id = %receipt.post_id,
                published = receipt.thread_post_ids.len(),
                planned = post.segments().len(),
                "Thread only partially published",
            );
        }

        let next = record_dispatch(&state, index, now, &policy);
        let record = NewPublishedPost {
            catalog_index: index,
            unit_slug: unit.slug.clone(),
            content: post.text(),
            content_hash: post.fingerprint(),
            post_id: receipt.post_id.clone(),
            thread_post_ids: receipt.thread_post_ids.clone(),
            origin,
            published_at: now,
        };

        let committed = self.store.commit(lease, &next, &record).await.map_err(|e| {
            tracing::error!(
                post_id = %receipt.post_id,
                error = %e,
                "Post is live but the dispatch state was not committed",
            );
            DispatchError::Persistence(e)
        })?;

        let hashtags = extract_hashtags(&record.content);
        let mentions = extract_mentions(&record.content);
        Ok(DispatchOutcome::Published(PublishedDispatch {
            index,
            unit: unit.clone(),
            content: record.content,
            segments: post.segments().to_vec(),
            hashtags,
            mentions,
            post_id: receipt.post_id,
            thread_post_ids: receipt.thread_post_ids,
            origin,
            complete: receipt.complete,
            published_at: now,
            state: committed,
        }))
    }

    /// Generate and shape a post for `unit`, rejecting repeats of `recent`.
    async fn compose(
        &self,
        unit: &ContentUnit,
        recent: &[PublishedPost],
    ) -> Result<ShapedPost, GenerationError> {
        let recent_texts: Vec<String> = recent.iter().map(|p| p.content.clone()).collect();
        let style = pick_style(&mut rand::rng());
        let request = GenerationRequest {
            unit: unit.clone(),
            prompt: build_prompt(unit, style, &recent_texts),
        };
        tracing::debug!(unit = %unit.slug, style, "Generating content");

        let raw = call_with_retry("generate", &self.config.retry, || {
            self.generator.generate(&request)
        })
        .await?;

        let post = shape_post(&raw).map_err(|e| GenerationError::Malformed(e.to_string()))?;
        let fingerprint = post.fingerprint();
        if recent.iter().any(|p| p.content_hash == fingerprint) {
            return Err(GenerationError::Duplicate);
        }
        Ok(post)
    }
}
