//! The publisher: fidelity ladder with per-rung retries.
//!
//! One publish attempt walks down the ladder — media group, single
//! photo, text-only — until the channel acknowledges a delivery.
//! Transport errors are retried on the same rung with backoff; a
//! non-success response drops straight to the next rung. Only a failure
//! of the final text rung is reported to the caller, and the caller (the
//! pipeline) commits the dedup record strictly after a success.

use crate::retry::{retry_async, RetryPolicy};
use crate::telegram::{format_caption, Channel, DeliveryError};
use crate::utils::truncate_for_log;
use tracing::{info, instrument, warn};

/// Delivery mode actually achieved, ordered by richness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fidelity {
    Album,
    Photo,
    Text,
}

pub struct Publisher<C: Channel> {
    channel: C,
    caption_limit: usize,
    retry: RetryPolicy,
}

impl<C: Channel> Publisher<C> {
    pub fn new(channel: C, caption_limit: usize, retry: RetryPolicy) -> Self {
        Self {
            channel,
            caption_limit,
            retry,
        }
    }

    /// Deliver one item at the best achievable fidelity.
    #[instrument(level = "info", skip_all, fields(title = %truncate_for_log(title, 60), images = images.len()))]
    pub async fn publish(
        &self,
        title: &str,
        excerpt: &str,
        images: &[String],
    ) -> Result<Fidelity, DeliveryError> {
        let caption = format_caption(title, excerpt, self.caption_limit);

        if images.len() >= 2 {
            match self
                .attempt(|| self.channel.send_media_group(&caption, images))
                .await
            {
                Ok(()) => {
                    info!(count = images.len(), "Delivered as media group");
                    return Ok(Fidelity::Album);
                }
                Err(e) => warn!(error = %e, "Media group failed; trying single photo"),
            }
        }

        if let Some(first) = images.first() {
            match self
                .attempt(|| self.channel.send_photo(&caption, first))
                .await
            {
                Ok(()) => {
                    info!("Delivered as single photo");
                    return Ok(Fidelity::Photo);
                }
                Err(e) => warn!(error = %e, "Single photo failed; trying text-only"),
            }
        }

        self.attempt(|| self.channel.send_message(&caption))
            .await
            .map(|()| {
                info!("Delivered as text");
                Fidelity::Text
            })
    }

    async fn attempt<F, Fut>(&self, op: F) -> Result<(), DeliveryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), DeliveryError>>,
    {
        retry_async(self.retry, op, DeliveryError::is_transient).await
    }
}

#[cfg(test)]
impl<C: Channel> Publisher<C> {
    pub(crate) fn channel(&self) -> &C {
        &self.channel
    }
}
