//! WeChat official-account callback protocol.
//!
//! - [`MsgCrypt`]: SHA1 request signatures and the AES-256-CBC message envelope
//! - [`xml`]: flat `<xml>` documents
//! - [`InboundMessage`]: typed text messages and events, including the login
//!   scene of QR code scans
//!
//! # Example
//!
//! ```rust,ignore
//! use wechat::{InboundMessage, WechatConfig};
//!
//! let crypt = WechatConfig::from_env()?.msg_crypt()?;
//! if crypt.verify_signature(&msg_signature, &timestamp, &nonce, Some(&encrypted)) {
//!     let message = InboundMessage::parse(&crypt.decrypt(&encrypted)?)?;
//!     println!("{} sent {}", message.openid(), message.msg_type());
//! }
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod message;
pub mod xml;

pub use config::WechatConfig;
pub use crypto::MsgCrypt;
pub use error::{Result, WechatError};
pub use message::{text_reply, InboundMessage, MessageHeader, WechatEvent};
pub use xml::{parse_fields, XmlBuilder};
