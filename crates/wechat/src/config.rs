//! WeChat account configuration.

use std::env;

use crate::crypto::MsgCrypt;
use crate::error::{Result, WechatError};

/// Credentials of the official account's message server.
#[derive(Clone)]
pub struct WechatConfig {
    pub app_id: String,
    pub token: String,
    pub encoding_aes_key: String,
}

impl std::fmt::Debug for WechatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WechatConfig")
            .field("app_id", &self.app_id)
            .finish_non_exhaustive()
    }
}

impl WechatConfig {
    /// Read `WECHAT_APP_ID`, `WECHAT_TOKEN` and `WECHAT_ENCODING_AES_KEY`.
    ///
    /// All three are required; the callback is disabled otherwise.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            app_id: require("WECHAT_APP_ID")?,
            token: require("WECHAT_TOKEN")?,
            encoding_aes_key: require("WECHAT_ENCODING_AES_KEY")?,
        })
    }

    /// Build the crypto helper, validating the AES key.
    pub fn msg_crypt(&self) -> Result<MsgCrypt> {
        MsgCrypt::new(&self.token, &self.encoding_aes_key, &self.app_id)
    }
}

fn require(name: &'static str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(WechatError::NotConfigured(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env() {
        // Combined into one test because env vars are process-global
        env::remove_var("WECHAT_APP_ID");
        env::remove_var("WECHAT_TOKEN");
        env::remove_var("WECHAT_ENCODING_AES_KEY");
        assert_eq!(
            WechatConfig::from_env().err(),
            Some(WechatError::NotConfigured("WECHAT_APP_ID"))
        );

        env::set_var("WECHAT_APP_ID", "wx123");
        env::set_var("WECHAT_TOKEN", "token");
        assert_eq!(
            WechatConfig::from_env().err(),
            Some(WechatError::NotConfigured("WECHAT_ENCODING_AES_KEY"))
        );

        env::set_var(
            "WECHAT_ENCODING_AES_KEY",
            "abcdefghijklmnopqrstuvwxyz0123456789ABCDEFG",
        );
        let config = WechatConfig::from_env().unwrap();
        assert_eq!(config.app_id, "wx123");
        assert_eq!(config.msg_crypt().unwrap().app_id(), "wx123");
        assert!(!format!("{config:?}").contains("token"));

        env::remove_var("WECHAT_APP_ID");
        env::remove_var("WECHAT_TOKEN");
        env::remove_var("WECHAT_ENCODING_AES_KEY");
    }
}
