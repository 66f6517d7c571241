//! Record encryption.
//!
//! Readings are serialized to JSON and sealed with AES-256-CBC using PKCS7
//! padding and a fresh random 16-byte IV per call, so sealing the same
//! reading twice never yields the same ciphertext. The key is fixed at store
//! construction; there is no rotation.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use rand::Rng;

use crate::config::KEY_LEN;
use crate::error::{Error, Result};
use crate::models::Reading;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Length of the initialization vector in bytes.
pub const IV_LEN: usize = 16;

/// An encrypted reading payload.
#[derive(Debug, Clone)]
pub struct SealedReading {
    /// Random per-encryption IV.
    pub iv: [u8; IV_LEN],
    /// AES-256-CBC ciphertext of the JSON-encoded reading.
    pub ciphertext: Vec<u8>,
}

/// Symmetric codec for record payloads.
#[derive(Clone)]
pub struct Codec {
    key: [u8; KEY_LEN],
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_struct("Codec").finish_non_exhaustive()
    }
}

impl Codec {
    /// Create a codec from a 256-bit key.
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key }
    }

    /// Serialize and encrypt a reading.
    pub fn seal(&self, reading: &Reading) -> Result<SealedReading> {
        let plaintext = serde_json::to_vec(reading)?;

        let mut iv = [0u8; IV_LEN];
        rand::rng().fill(&mut iv[..]);

        let ciphertext = Aes256CbcEnc::new((&self.key).into(), (&iv).into())
            .encrypt_padded_vec_mut::<Pkcs7>(&plaintext);

        Ok(SealedReading { iv, ciphertext })
    }

    /// Decrypt and deserialize a reading.
    ///
    /// Fails with [`Error::Decrypt`] on a wrong key, truncated or corrupt
    /// ciphertext, and with [`Error::Serialization`] if the plaintext is not
    /// a valid reading.
    pub fn open(&self, iv: &[u8], ciphertext: &[u8]) -> Result<Reading> {
        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| Error::InvalidIv {
            expected: IV_LEN,
            actual: iv.len(),
        })?;

        let plaintext = Aes256CbcDec::new((&self.key).into(), (&iv).into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| Error::Decrypt)?;

        let reading = serde_json::from_slice(&plaintext)?;
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_codec() -> Codec {
        Codec::new([0x42; KEY_LEN])
    }

    #[test]
    fn test_seal_open_round_trip() {
        let codec = test_codec();
        let reading = Reading::new(21.5, 40.0, 1_700_000_000_000);

        let sealed = codec.seal(&reading).unwrap();
        let opened = codec.open(&sealed.iv, &sealed.ciphertext).unwrap();

        assert_eq!(opened, reading);
    }

    #[test]
    fn test_seal_is_non_deterministic() {
        let codec = test_codec();
        let reading = Reading::new(21.5, 40.0, 1_700_000_000_000);

        let a = codec.seal(&reading).unwrap();
        let b = codec.seal(&reading).unwrap();

        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
        assert_eq!(codec.open(&a.iv, &a.ciphertext).unwrap(), reading);
        assert_eq!(codec.open(&b.iv, &b.ciphertext).unwrap(), reading);
    }

    #[test]
    fn test_open_rejects_truncated_ciphertext() {
        let codec = test_codec();
        let sealed = codec.seal(&Reading::new(20.0, 50.0, 1000)).unwrap();

        let truncated = &sealed.ciphertext[..sealed.ciphertext.len() - 1];
        assert!(codec.open(&sealed.iv, truncated).is_err());
    }

    #[test]
    fn test_open_rejects_corrupt_ciphertext() {
        let codec = test_codec();
        let mut sealed = codec.seal(&Reading::new(20.0, 50.0, 1000)).unwrap();

        // Flipping bits in the final block breaks the PKCS7 padding (or the
        // JSON) with overwhelming probability.
        let len = sealed.ciphertext.len();
        for byte in &mut sealed.ciphertext[len - 16..] {
            *byte ^= 0xFF;
        }
        assert!(codec.open(&sealed.iv, &sealed.ciphertext).is_err());
    }

    #[test]
    fn test_open_rejects_wrong_key() {
        let codec = test_codec();
        let other = Codec::new([0x13; KEY_LEN]);
        let sealed = codec.seal(&Reading::new(20.0, 50.0, 1000)).unwrap();

        assert!(other.open(&sealed.iv, &sealed.ciphertext).is_err());
    }

    #[test]
    fn test_open_rejects_bad_iv_length() {
        let codec = test_codec();
        let sealed = codec.seal(&Reading::new(20.0, 50.0, 1000)).unwrap();

        let result = codec.open(&sealed.iv[..8], &sealed.ciphertext);
        assert!(matches!(
            result,
            Err(Error::InvalidIv {
                expected: 16,
                actual: 8
            })
        ));
    }
}
