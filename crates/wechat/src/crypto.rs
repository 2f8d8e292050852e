//! Message signatures and the AES envelope used in safe mode.
//!
//! Frame layout before encryption:
//!
//! ```text
//! random(16) | length(4, big endian) | message | app_id | PKCS7 padding (block 32)
//! ```
//!
//! The frame is encrypted with AES-256-CBC. The key is the base64 decoding of
//! the 43-character EncodingAESKey plus `=`, and the IV is its first 16 bytes.

use aes::Aes256;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::Engine;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use sha1::{Digest, Sha1};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::{Result, WechatError};
use crate::xml::XmlBuilder;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// PKCS7 block size used by WeChat (not the AES block size).
const PAD_BLOCK: usize = 32;
const RANDOM_LEN: usize = 16;
const LENGTH_LEN: usize = 4;

/// EncodingAESKeys are 43 arbitrary base64 characters, so the final symbol
/// may carry non-zero trailing bits.
const KEY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Signs, verifies, encrypts and decrypts callback payloads for one account.
#[derive(Clone)]
pub struct MsgCrypt {
    token: String,
    key: [u8; 32],
    app_id: String,
}

impl std::fmt::Debug for MsgCrypt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MsgCrypt")
            .field("app_id", &self.app_id)
            .finish_non_exhaustive()
    }
}

impl MsgCrypt {
    pub fn new(token: &str, encoding_aes_key: &str, app_id: &str) -> Result<Self> {
        let decoded = KEY_ENGINE
            .decode(format!("{encoding_aes_key}="))
            .map_err(|e| WechatError::InvalidAesKey(e.to_string()))?;
        let key: [u8; 32] = decoded.try_into().map_err(|bytes: Vec<u8>| {
            WechatError::InvalidAesKey(format!("expected 32 bytes, got {}", bytes.len()))
        })?;

        Ok(Self {
            token: token.to_string(),
            key,
            app_id: app_id.to_string(),
        })
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Hex SHA1 of the token, timestamp, nonce and (optionally) the encrypted
    /// payload, sorted and concatenated.
    pub fn signature(&self, timestamp: &str, nonce: &str, encrypt: Option<&str>) -> String {
        let mut parts = vec![self.token.as_str(), timestamp, nonce];
        if let Some(encrypt) = encrypt {
            parts.push(encrypt);
        }
        parts.sort_unstable();

        let mut hasher = Sha1::new();
        for part in parts {
            hasher.update(part.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Check a signature in constant time.
    pub fn verify_signature(
        &self,
        signature: &str,
        timestamp: &str,
        nonce: &str,
        encrypt: Option<&str>,
    ) -> bool {
        let expected = self.signature(timestamp, nonce, encrypt);
        expected
            .as_bytes()
            .ct_eq(signature.to_ascii_lowercase().as_bytes())
            .into()
    }

    /// Decrypt an `Encrypt` payload and return the inner XML.
    pub fn decrypt(&self, encrypted: &str) -> Result<String> {
        let ciphertext = STANDARD
            .decode(encrypted.trim())
            .map_err(|e| WechatError::InvalidBase64(e.to_string()))?;
        if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
            return Err(WechatError::Decrypt(format!(
                "ciphertext length {} is not a multiple of the block size",
                ciphertext.len()
            )));
        }

        let padded = Aes256CbcDec::new_from_slices(&self.key, &self.key[..16])
            .map_err(|e| WechatError::Decrypt(e.to_string()))?
            .decrypt_padded_vec_mut::<NoPadding>(&ciphertext)
            .map_err(|e| WechatError::Decrypt(e.to_string()))?;
        let frame = pkcs7_unpad(&padded)?;

        if frame.len() < RANDOM_LEN + LENGTH_LEN {
            return Err(WechatError::Decrypt("frame too short".to_string()));
        }
        let mut length = [0u8; LENGTH_LEN];
        length.copy_from_slice(&frame[RANDOM_LEN..RANDOM_LEN + LENGTH_LEN]);
        let length = u32::from_be_bytes(length) as usize;

        let start = RANDOM_LEN + LENGTH_LEN;
        let end = start
            .checked_add(length)
            .filter(|end| *end <= frame.len())
            .ok_or_else(|| WechatError::Decrypt(format!("message length {length} overruns frame")))?;

        let message = std::str::from_utf8(&frame[start..end])
            .map_err(|e| WechatError::Decrypt(format!("message is not UTF-8: {e}")))?;
        let app_id = String::from_utf8_lossy(&frame[end..]);
        if app_id != self.app_id {
            return Err(WechatError::AppIdMismatch {
                expected: self.app_id.clone(),
                actual: app_id.into_owned(),
            });
        }

        debug!("Decrypted {} byte message", message.len());
        Ok(message.to_string())
    }

    /// Encrypt a plaintext message into a base64 `Encrypt` payload.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut prefix = [0u8; RANDOM_LEN];
        rand::thread_rng().fill_bytes(&mut prefix);
        self.encrypt_with_prefix(plaintext, prefix)
    }

    fn encrypt_with_prefix(&self, plaintext: &str, prefix: [u8; RANDOM_LEN]) -> Result<String> {
        let message = plaintext.as_bytes();
        let length = frame_length(message.len())?;

        let mut frame =
            Vec::with_capacity(RANDOM_LEN + LENGTH_LEN + message.len() + self.app_id.len() + PAD_BLOCK);
        frame.extend_from_slice(&prefix);
        frame.extend_from_slice(&length.to_be_bytes());
        frame.extend_from_slice(message);
        frame.extend_from_slice(self.app_id.as_bytes());
        pkcs7_pad(&mut frame);

        let ciphertext = Aes256CbcEnc::new_from_slices(&self.key, &self.key[..16])
            .map_err(|e| WechatError::InvalidAesKey(e.to_string()))?
            .encrypt_padded_vec_mut::<NoPadding>(&frame);

        Ok(STANDARD.encode(ciphertext))
    }

    /// Encrypt a reply and wrap it in the signed envelope WeChat expects.
    pub fn reply_envelope(&self, reply_xml: &str, timestamp: &str, nonce: &str) -> Result<String> {
        let encrypted = self.encrypt(reply_xml)?;
        let signature = self.signature(timestamp, nonce, Some(&encrypted));

        Ok(XmlBuilder::new()
            .text("Encrypt", &encrypted)
            .text("MsgSignature", &signature)
            .raw("TimeStamp", timestamp)
            .text("Nonce", nonce)
            .build())
    }
}

/// The big-endian length field written ahead of the message.
fn frame_length(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| WechatError::PayloadTooLarge(len))
}

fn pkcs7_pad(frame: &mut Vec<u8>) {
    let pad = PAD_BLOCK - frame.len() % PAD_BLOCK;
    frame.resize(frame.len() + pad, pad as u8);
}

fn pkcs7_unpad(data: &[u8]) -> Result<&[u8]> {
    let pad = data.last().copied().map(usize::from).unwrap_or(0);
    if pad == 0 || pad > PAD_BLOCK || pad > data.len() {
        return Err(WechatError::Decrypt(format!("invalid padding {pad}")));
    }
    Ok(&data[..data.len() - pad])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_fields;

    // 43 characters, decodes to 32 bytes
    const AES_KEY: &str = "abcdefghijklmnopqrstuvwxyz0123456789ABCDEFG";
    const TOKEN: &str = "pamtest";
    const APP_ID: &str = "wxb11529c136998cb6";

    fn crypt() -> MsgCrypt {
        MsgCrypt::new(TOKEN, AES_KEY, APP_ID).unwrap()
    }

    #[test]
    fn test_key_must_be_32_bytes() {
        assert!(matches!(
            MsgCrypt::new(TOKEN, "short", APP_ID),
            Err(WechatError::InvalidAesKey(_))
        ));
        assert!(MsgCrypt::new(TOKEN, AES_KEY, APP_ID).is_ok());
    }

    #[test]
    fn test_signature_is_sorted_sha1() {
        let c = crypt();
        let mut parts = [TOKEN, "1409304348", "xxxxxx"];
        parts.sort_unstable();
        let expected = hex::encode(Sha1::digest(parts.concat().as_bytes()));

        assert_eq!(c.signature("1409304348", "xxxxxx", None), expected);
        assert_ne!(
            c.signature("1409304348", "xxxxxx", Some("payload")),
            expected
        );
    }

    #[test]
    fn test_signature_rejects_any_single_character_change() {
        let c = crypt();
        let signature = c.signature("1409304348", "nonce", Some("ENCRYPTED"));
        assert!(c.verify_signature(&signature, "1409304348", "nonce", Some("ENCRYPTED")));
        assert!(c.verify_signature(
            &signature.to_uppercase(),
            "1409304348",
            "nonce",
            Some("ENCRYPTED")
        ));

        for i in 0..signature.len() {
            let mut mutated: Vec<u8> = signature.clone().into_bytes();
            mutated[i] = if mutated[i] == b'0' { b'1' } else { b'0' };
            let mutated = String::from_utf8(mutated).unwrap();
            assert!(!c.verify_signature(&mutated, "1409304348", "nonce", Some("ENCRYPTED")));
        }

        assert!(!c.verify_signature(&signature, "1409304349", "nonce", Some("ENCRYPTED")));
        assert!(!c.verify_signature(&signature, "1409304348", "nonce", Some("ENCRYPTEd")));
        assert!(!c.verify_signature("", "1409304348", "nonce", Some("ENCRYPTED")));
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let c = crypt();
        let long = "x".repeat(1000);
        for text in [
            "<xml><Content><![CDATA[hello]]></Content></xml>",
            "你好，今天感觉怎么样？🌿",
            "",
            long.as_str(),
        ] {
            let encrypted = c.encrypt(text).unwrap();
            assert_eq!(c.decrypt(&encrypted).unwrap(), text);
        }
    }

    #[test]
    fn test_random_prefix_changes_ciphertext() {
        let c = crypt();
        assert_ne!(c.encrypt("same").unwrap(), c.encrypt("same").unwrap());
        assert_eq!(
            c.encrypt_with_prefix("same", [7; 16]).unwrap(),
            c.encrypt_with_prefix("same", [7; 16]).unwrap()
        );
    }

    #[test]
    fn test_frame_length_limit() {
        assert_eq!(frame_length(5), Ok(5));
        assert_eq!(frame_length(u32::MAX as usize), Ok(u32::MAX));

        #[cfg(target_pointer_width = "64")]
        {
            let too_large = u32::MAX as usize + 1;
            assert_eq!(
                frame_length(too_large),
                Err(WechatError::PayloadTooLarge(too_large))
            );
        }
    }

    #[test]
    fn test_padding_fills_32_byte_blocks() {
        let mut frame = vec![0u8; 32];
        pkcs7_pad(&mut frame);
        assert_eq!(frame.len(), 64);
        assert_eq!(frame[63], 32);

        let mut frame = vec![0u8; 31];
        pkcs7_pad(&mut frame);
        assert_eq!(frame.len(), 32);
        assert_eq!(pkcs7_unpad(&frame).unwrap().len(), 31);

        assert!(pkcs7_unpad(&[0u8; 32]).is_err());
        assert!(pkcs7_unpad(&[33u8; 32]).is_err());
    }

    #[test]
    fn test_decrypt_rejects_other_app_id() {
        let sender = MsgCrypt::new(TOKEN, AES_KEY, "wx_other").unwrap();
        let encrypted = sender.encrypt("<xml/>").unwrap();
        assert!(matches!(
            crypt().decrypt(&encrypted),
            Err(WechatError::AppIdMismatch { .. })
        ));
    }

    #[test]
    fn test_decrypt_rejects_garbage() {
        let c = crypt();
        assert!(matches!(c.decrypt("not base64!"), Err(WechatError::InvalidBase64(_))));
        assert!(matches!(
            c.decrypt(&STANDARD.encode([1u8; 15])),
            Err(WechatError::Decrypt(_))
        ));
        assert!(c.decrypt(&STANDARD.encode([1u8; 32])).is_err());
    }

    #[test]
    fn test_reply_envelope_is_signed() {
        let c = crypt();
        let envelope = c
            .reply_envelope("<xml><Content><![CDATA[hi]]></Content></xml>", "1700000000", "n1")
            .unwrap();
        let fields = parse_fields(&envelope).unwrap();

        let encrypted = &fields["Encrypt"];
        assert_eq!(fields["TimeStamp"], "1700000000");
        assert_eq!(fields["Nonce"], "n1");
        assert!(c.verify_signature(&fields["MsgSignature"], "1700000000", "n1", Some(encrypted)));
        assert_eq!(
            c.decrypt(encrypted).unwrap(),
            "<xml><Content><![CDATA[hi]]></Content></xml>"
        );
    }
}
