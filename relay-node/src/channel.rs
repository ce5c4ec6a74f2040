//! Reaction channel over the platform's OneBot-style HTTP API.
//!
//! Implements the protocol's `observe`/`mark` pair with the platform's
//! message-reaction endpoints, and carries the ordinary message-sending
//! calls the reply path needs. The HTTP client is owned here and injected
//! at construction; there is no process-global session.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

use relay_protocol::{ChannelError, MarkTag, ParticipantId, ReactionChannel, ResourceId};

use crate::config::ApiConfig;
use crate::error::{RelayError, Result};

/// Reaction id encoding the claim tag on the wire.
///
/// Fixed protocol encoding, shared by every participant deployment.
pub const CLAIM_EMOJI_ID: u32 = 282;

/// Reaction id encoding the confirmation tag on the wire.
pub const CONFIRM_EMOJI_ID: u32 = 355;

/// Reaction family the protocol emoji belong to on this platform.
const EMOJI_TYPE: &str = "1";

fn emoji_id(tag: MarkTag) -> u32 {
    match tag {
        MarkTag::Claim => CLAIM_EMOJI_ID,
        MarkTag::Confirm => CONFIRM_EMOJI_ID,
    }
}

/// HTTP client for the platform API.
#[derive(Debug, Clone)]
pub struct ApiChannel {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl ApiChannel {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    /// Call one API action and return its `data` payload.
    async fn call(&self, action: &str, payload: Value) -> std::result::Result<Value, ChannelError> {
        let url = format!("{}/{}", self.base_url, action);

        let mut request = self.http.post(&url).json(&payload);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChannelError::Api(format!(
                "{action} returned HTTP {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ChannelError::Payload(e.to_string()))?;

        match body.get("retcode").and_then(Value::as_i64) {
            Some(0) => Ok(body.get("data").cloned().unwrap_or(Value::Null)),
            Some(code) => Err(ChannelError::Api(format!("{action} retcode {code}"))),
            None => Err(ChannelError::Payload(format!(
                "{action} response missing retcode"
            ))),
        }
    }

    /// Send a plain-text reply into the session the event came from.
    pub async fn send_text(&self, group_id: Option<i64>, user_id: Option<u64>, text: &str) -> Result<()> {
        let (action, payload) = match (group_id, user_id) {
            (Some(group), _) => (
                "send_group_msg",
                json!({ "group_id": group, "message": text }),
            ),
            (None, Some(user)) => (
                "send_private_msg",
                json!({ "user_id": user, "message": text }),
            ),
            (None, None) => {
                return Err(RelayError::Api("reply target unknown".to_string()));
            }
        };

        self.call(action, payload)
            .await
            .map_err(|e| RelayError::Api(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ReactionChannel for ApiChannel {
    async fn observe(
        &self,
        resource: ResourceId,
        tag: MarkTag,
    ) -> std::result::Result<HashSet<ParticipantId>, ChannelError> {
        let data = self
            .call(
                "fetch_emoji_like",
                json!({
                    "message_id": resource.0,
                    "emojiId": emoji_id(tag).to_string(),
                    "emojiType": EMOJI_TYPE,
                }),
            )
            .await?;

        let likes = data
            .get("emojiLikesList")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        // Malformed entries are skipped, not fatal: a partial read of the
        // participant set is still a read.
        let mut participants = HashSet::new();
        for item in &likes {
            match parse_tiny_id(item) {
                Some(id) => {
                    participants.insert(ParticipantId(id));
                }
                None => debug!(%resource, ?item, "skipping malformed reaction entry"),
            }
        }

        Ok(participants)
    }

    async fn mark(&self, resource: ResourceId, tag: MarkTag) -> std::result::Result<(), ChannelError> {
        self.call(
            "set_msg_emoji_like",
            json!({
                "message_id": resource.0,
                "emoji_id": emoji_id(tag),
                "emoji_type": EMOJI_TYPE,
                "set": true,
            }),
        )
        .await?;
        Ok(())
    }
}

/// The platform reports reactor identities as `tinyId`, sometimes as a
/// JSON string, sometimes as a number.
fn parse_tiny_id(item: &Value) -> Option<u64> {
    let raw = item.get("tinyId")?;
    raw.as_u64().or_else(|| raw.as_str()?.parse().ok())
}
