use serde::Deserialize;
use tracing::debug;

use relay_protocol::{ArbitrationContext, ParticipantId, ResourceId};

/// Inbound event envelope posted by the platform adapter.
///
/// Everything is optional at the wire level; which fields a given
/// pipeline stage requires is that stage's decision. In particular the
/// arbitration preconditions are checked here, not by serde.
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    #[serde(default)]
    pub post_type: Option<String>,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub message_id: Option<i64>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub self_id: Option<u64>,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub raw_message: Option<String>,
    /// Structured message segments, when the adapter supplies them.
    #[serde(default)]
    pub message: Option<serde_json::Value>,
}

impl EventEnvelope {
    pub fn is_message(&self) -> bool {
        self.post_type.as_deref() == Some("message")
    }

    pub fn is_group(&self) -> bool {
        self.message_type.as_deref() == Some("group")
    }

    pub fn text(&self) -> Option<&str> {
        self.raw_message.as_deref().filter(|t| !t.is_empty())
    }

    /// The text the dispatcher should match against: for share-card
    /// messages (a leading `json` segment), the URL buried in the card
    /// payload; otherwise the plain message text.
    pub fn relay_text(&self) -> Option<String> {
        self.card_url()
            .or_else(|| self.text().map(str::to_string))
    }

    /// Extract the jump URL from a share-card message, if this is one.
    fn card_url(&self) -> Option<String> {
        let segments = self.message.as_ref()?.as_array()?;
        let first = segments.first()?;
        if first.get("type")?.as_str()? != "json" {
            return None;
        }
        let payload = first.get("data")?.get("data")?.as_str()?;
        let card: serde_json::Value = serde_json::from_str(payload).ok()?;
        extract_card_url(&card)
    }

    /// Session key for debounce scoping.
    pub fn session(&self) -> String {
        match (self.group_id, self.user_id) {
            (Some(group), _) => format!("group:{group}"),
            (None, Some(user)) => format!("private:{user}"),
            (None, None) => "unknown".to_string(),
        }
    }

    /// Extract the fixed inputs of one arbitration round.
    ///
    /// `None` means the protocol preconditions are unmet: the event lacks
    /// an identity, a trustworthy source timestamp, or our own identity.
    /// That is "protocol not applicable" (replayed or synthetic event),
    /// not an arbitration loss, and not an error.
    pub fn arbitration_context(&self) -> Option<ArbitrationContext> {
        let (Some(message_id), Some(time), Some(self_id)) =
            (self.message_id, self.time, self.self_id)
        else {
            debug!(
                message_id = ?self.message_id,
                time = ?self.time,
                self_id = ?self.self_id,
                "arbitration preconditions unmet"
            );
            return None;
        };

        Some(ArbitrationContext::new(
            ResourceId(message_id),
            time,
            ParticipantId(self_id),
        ))
    }
}

/// Share cards nest their target URL under `meta`, in one of a few known
/// slots depending on the card flavor (music share, doc share, news).
fn extract_card_url(card: &serde_json::Value) -> Option<String> {
    let meta = card.get("meta")?;
    for (outer, inner) in [
        ("music", "musicUrl"),
        ("detail_1", "qqdocurl"),
        ("news", "jumpUrl"),
        ("music", "jumpUrl"),
    ] {
        if let Some(url) = meta
            .get(outer)
            .and_then(|m| m.get(inner))
            .and_then(|u| u.as_str())
        {
            if !url.is_empty() {
                return Some(url.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(json: &str) -> EventEnvelope {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn full_group_message_yields_a_context() {
        let ev = envelope(
            r#"{"post_type":"message","message_type":"group","message_id":42,
                "time":1700000000,"self_id":10001,"user_id":20002,
                "group_id":300,"raw_message":"hello"}"#,
        );
        assert!(ev.is_message());
        assert!(ev.is_group());
        assert_eq!(ev.session(), "group:300");

        let ctx = ev.arbitration_context().unwrap();
        assert_eq!(ctx.resource, ResourceId(42));
        assert_eq!(ctx.event_time, 1_700_000_000);
        assert_eq!(ctx.self_id, ParticipantId(10001));
    }

    #[test]
    fn missing_time_is_a_precondition_failure() {
        let ev = envelope(
            r#"{"post_type":"message","message_type":"group","message_id":42,
                "self_id":10001,"raw_message":"hello"}"#,
        );
        assert!(ev.arbitration_context().is_none());
    }

    #[test]
    fn wrong_time_type_fails_at_deserialization() {
        let parsed: Result<EventEnvelope, _> = serde_json::from_str(
            r#"{"post_type":"message","message_id":42,"time":"yesterday","self_id":1}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn empty_text_is_no_text() {
        let ev = envelope(r#"{"post_type":"message","raw_message":""}"#);
        assert!(ev.text().is_none());
        assert!(ev.relay_text().is_none());
    }

    #[test]
    fn share_card_url_wins_over_raw_text() {
        let card = r#"{"meta":{"news":{"jumpUrl":"https://b23.tv/abcDEF"}}}"#;
        let ev = EventEnvelope {
            message: Some(serde_json::json!([
                {"type": "json", "data": {"data": card}}
            ])),
            ..envelope(r#"{"post_type":"message","raw_message":"[CQ:json]"}"#)
        };
        assert_eq!(ev.relay_text().as_deref(), Some("https://b23.tv/abcDEF"));
    }

    #[test]
    fn music_card_prefers_music_url() {
        let card = r#"{"meta":{"music":{"musicUrl":"https://music.163.com/#/song?id=7",
                                          "jumpUrl":"https://other.example"}}}"#;
        let ev = EventEnvelope {
            message: Some(serde_json::json!([
                {"type": "json", "data": {"data": card}}
            ])),
            ..envelope(r#"{"post_type":"message"}"#)
        };
        assert_eq!(
            ev.relay_text().as_deref(),
            Some("https://music.163.com/#/song?id=7")
        );
    }

    #[test]
    fn malformed_card_payload_falls_back_to_text() {
        let ev = EventEnvelope {
            message: Some(serde_json::json!([
                {"type": "json", "data": {"data": "not json at all"}}
            ])),
            ..envelope(r#"{"post_type":"message","raw_message":"plain"}"#)
        };
        assert_eq!(ev.relay_text().as_deref(), Some("plain"));
    }
}
