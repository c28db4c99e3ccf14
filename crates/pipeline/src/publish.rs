//! Posting a shaped post as a reply chain.
//!
//! Until the first segment is live nothing has been published, so only that
//! request is retried. Each reply gets a single attempt under the same
//! per-request timeout, and the first failed reply ends the thread.

use std::time::Duration;

use chaincast_core::content::ShapedPost;
use chaincast_core::ports::{PublishError, PublishReceipt, Publisher};

use crate::retry::{call_with_retry, RetryPolicy};

pub async fn publish_thread(
    publisher: &dyn Publisher,
    post: &ShapedPost,
    retry: &RetryPolicy,
    reply_delay: Duration,
) -> Result<PublishReceipt, PublishError> {
    let Some((first, replies)) = post.segments().split_first() else {
        return Err(PublishError::Invalid("post has no segments".to_string()));
    };

    let first_id = call_with_retry("publish", retry, || publisher.post_segment(first, None)).await?;
    tracing::info!(
        post_id = %first_id,
        segments = post.segments().len(),
        "Published first segment",
    );

    let reply_policy = retry.single_attempt();
    let mut ids = vec![first_id.clone()];
    let mut parent = first_id;
    for (i, segment) in replies.iter().enumerate() {
        if !reply_delay.is_zero() {
            tokio::time::sleep(reply_delay).await;
        }
        let reply = call_with_retry("reply", &reply_policy, || {
            publisher.post_segment(segment, Some(parent.as_str()))
        })
        .await;
        match reply {
            Ok(id) => {
                ids.push(id.clone());
                parent = id;
            }
            Err(e) => {
                tracing::warn!(
                    post_id = %ids[0],
                    segment = i + 2,
                    error = %e,
                    "Thread stopped early",
                );
                break;
            }
        }
    }

    Ok(PublishReceipt {
        post_id: ids[0].clone(),
        complete: ids.len() == post.segments().len(),
        thread_post_ids: ids,
    })
}
