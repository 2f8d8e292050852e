//! Typed inbound messages and text replies.

use std::collections::BTreeMap;

use crate::error::{Result, WechatError};
use crate::xml::{parse_fields, XmlBuilder};

/// Prefix WeChat puts on the scene of a QR code scanned by a new follower.
const SCENE_PREFIX: &str = "qrscene_";

/// Addressing shared by every inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    /// The official account.
    pub to_user: String,
    /// The sender's openid.
    pub from_user: String,
    pub create_time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WechatEvent {
    /// New follower; `scene` is set when they followed by scanning a QR code.
    Subscribe { scene: Option<String> },
    /// An existing follower scanned a parameterised QR code.
    Scan { scene: Option<String> },
    Unsubscribe,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Text {
        header: MessageHeader,
        content: String,
        msg_id: Option<String>,
    },
    Event {
        header: MessageHeader,
        event: WechatEvent,
    },
    Other {
        header: MessageHeader,
        msg_type: String,
    },
}

impl InboundMessage {
    /// Parse a decrypted message document.
    pub fn parse(xml: &str) -> Result<Self> {
        Self::from_fields(&parse_fields(xml)?)
    }

    pub fn from_fields(fields: &BTreeMap<String, String>) -> Result<Self> {
        let header = MessageHeader {
            to_user: required(fields, "ToUserName")?,
            from_user: required(fields, "FromUserName")?,
            create_time: fields
                .get("CreateTime")
                .and_then(|t| t.trim().parse().ok())
                .unwrap_or(0),
        };
        let msg_type = required(fields, "MsgType")?;

        let message = match msg_type.as_str() {
            "text" => InboundMessage::Text {
                header,
                content: fields.get("Content").cloned().unwrap_or_default(),
                msg_id: fields.get("MsgId").cloned(),
            },
            "event" => {
                let scene = fields.get("EventKey").and_then(|key| scene_from_key(key));
                let event = match required(fields, "Event")?.as_str() {
                    "subscribe" => WechatEvent::Subscribe { scene },
                    "SCAN" => WechatEvent::Scan { scene },
                    "unsubscribe" => WechatEvent::Unsubscribe,
                    other => WechatEvent::Other(other.to_string()),
                };
                InboundMessage::Event { header, event }
            }
            _ => InboundMessage::Other { header, msg_type },
        };

        Ok(message)
    }

    pub fn header(&self) -> &MessageHeader {
        match self {
            InboundMessage::Text { header, .. }
            | InboundMessage::Event { header, .. }
            | InboundMessage::Other { header, .. } => header,
        }
    }

    /// The sender's openid.
    pub fn openid(&self) -> &str {
        &self.header().from_user
    }

    pub fn msg_type(&self) -> &str {
        match self {
            InboundMessage::Text { .. } => "text",
            InboundMessage::Event { .. } => "event",
            InboundMessage::Other { msg_type, .. } => msg_type,
        }
    }

    /// Event name for event messages.
    pub fn event_name(&self) -> Option<&str> {
        match self {
            InboundMessage::Event { event, .. } => Some(match event {
                WechatEvent::Subscribe { .. } => "subscribe",
                WechatEvent::Scan { .. } => "SCAN",
                WechatEvent::Unsubscribe => "unsubscribe",
                WechatEvent::Other(name) => name.as_str(),
            }),
            _ => None,
        }
    }

    /// Login scene carried by a subscribe or scan event.
    pub fn scene(&self) -> Option<&str> {
        match self {
            InboundMessage::Event {
                event: WechatEvent::Subscribe { scene } | WechatEvent::Scan { scene },
                ..
            } => scene.as_deref(),
            _ => None,
        }
    }
}

fn required(fields: &BTreeMap<String, String>, name: &'static str) -> Result<String> {
    fields
        .get(name)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or(WechatError::MissingField(name))
}

fn scene_from_key(key: &str) -> Option<String> {
    let scene = key.strip_prefix(SCENE_PREFIX).unwrap_or(key).trim();
    (!scene.is_empty()).then(|| scene.to_string())
}

/// A passive text reply to `inbound`, sent from the account to the user.
pub fn text_reply(inbound: &MessageHeader, content: &str, create_time: i64) -> String {
    XmlBuilder::new()
        .text("ToUserName", &inbound.from_user)
        .text("FromUserName", &inbound.to_user)
        .number("CreateTime", create_time)
        .text("MsgType", "text")
        .text("Content", content)
        .build()
}
