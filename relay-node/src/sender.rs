//! Reply assembly and delivery.

use std::sync::Arc;
use tracing::info;

use crate::channel::ApiChannel;
use crate::dispatch::LinkHit;
use crate::error::Result;
use crate::event::EventEnvelope;

pub struct Sender {
    api: Arc<ApiChannel>,
}

impl Sender {
    pub fn new(api: Arc<ApiChannel>) -> Self {
        Self { api }
    }

    /// Send the relay reply for a matched link into the originating
    /// session.
    pub async fn send_hit(&self, event: &EventEnvelope, hit: &LinkHit) -> Result<()> {
        let text = format_reply(hit);
        self.api
            .send_text(event.group_id, event.user_id, &text)
            .await?;

        info!(
            platform = hit.platform,
            resource = %hit.resource,
            session = %event.session(),
            "relay reply sent"
        );
        Ok(())
    }
}

fn format_reply(hit: &LinkHit) -> String {
    format!("[{}] {} -> {}", hit.platform, hit.link, hit.resource)
}
