use crate::crypto::errors::{CryptoResult, Error};
use openssl::symm::{Cipher as OpenSslCipher, Crypter, Mode, decrypt_aead};

const AES_BLOCK_SIZE: usize = 16;
const GCM_IV_SIZE: usize = 12;
const GCM_TAG_SIZE: usize = 16;

/// Block ciphers used for XML-Encryption content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cipher {
    /// AES-128-CBC cipher
    Aes128Cbc,
    /// AES-192-CBC cipher
    Aes192Cbc,
    /// AES-256-CBC cipher
    Aes256Cbc,
    /// AES-128-GCM cipher
    Aes128Gcm,
    /// AES-192-GCM cipher
    Aes192Gcm,
    /// AES-256-GCM cipher
    Aes256Gcm,
}

impl Cipher {
    /// Get the key size of the cipher in bytes
    pub const fn key_size(self) -> usize {
        match self {
            Self::Aes128Cbc | Self::Aes128Gcm => 16,
            Self::Aes192Cbc | Self::Aes192Gcm => 24,
            Self::Aes256Cbc | Self::Aes256Gcm => 32,
        }
    }

    /// Whether this is an authenticated (GCM) mode
    pub const fn is_aead(self) -> bool {
        matches!(self, Self::Aes128Gcm | Self::Aes192Gcm | Self::Aes256Gcm)
    }

    /// Convert the cipher to an OpenSSL cipher
    pub fn to_openssl_cipher(self) -> OpenSslCipher {
        match self {
            Self::Aes128Cbc => OpenSslCipher::aes_128_cbc(),
            Self::Aes192Cbc => OpenSslCipher::aes_192_cbc(),
            Self::Aes256Cbc => OpenSslCipher::aes_256_cbc(),
            Self::Aes128Gcm => OpenSslCipher::aes_128_gcm(),
            Self::Aes192Gcm => OpenSslCipher::aes_192_gcm(),
            Self::Aes256Gcm => OpenSslCipher::aes_256_gcm(),
        }
    }

    /// Decrypt an XML-Encryption cipher value.
    ///
    /// The IV is the leading part of `data`. CBC plaintext carries the
    /// XML-Encryption padding (last byte = padding length); GCM data ends
    /// with the 128-bit authentication tag.
    pub fn decrypt(self, key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
        if key.len() != self.key_size() {
            return Err(Error::InvalidKey(format!(
                "{self:?} expects a {} byte key, got {}",
                self.key_size(),
                key.len()
            )));
        }

        if self.is_aead() {
            self.decrypt_gcm(key, data)
        } else {
            self.decrypt_cbc(key, data)
        }
    }

    fn decrypt_cbc(self, key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
        if data.len() < 2 * AES_BLOCK_SIZE || data.len() % AES_BLOCK_SIZE != 0 {
            return Err(Error::Invalid(format!(
                "CBC cipher value has invalid length {}",
                data.len()
            )));
        }
        let (iv, ciphertext) = data.split_at(AES_BLOCK_SIZE);

        let mut decrypter = Crypter::new(self.to_openssl_cipher(), Mode::Decrypt, key, Some(iv))?;
        decrypter.pad(false);

        let mut plaintext = vec![0u8; ciphertext.len() + AES_BLOCK_SIZE];
        let mut count = decrypter.update(ciphertext, &mut plaintext)?;
        count += decrypter.finalize(&mut plaintext[count..])?;
        plaintext.truncate(count);

        xmlenc_unpad(plaintext)
    }

    fn decrypt_gcm(self, key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
        if data.len() < GCM_IV_SIZE + GCM_TAG_SIZE {
            return Err(Error::Invalid(format!(
                "GCM cipher value has invalid length {}",
                data.len()
            )));
        }
        let (iv, rest) = data.split_at(GCM_IV_SIZE);
        let (ciphertext, tag) = rest.split_at(rest.len() - GCM_TAG_SIZE);

        Ok(decrypt_aead(
            self.to_openssl_cipher(),
            key,
            Some(iv),
            &[],
            ciphertext,
            tag,
        )?)
    }
}

/// Remove XML-Encryption block padding.
///
/// Only the last byte is significant; the remaining padding bytes are arbitrary.
fn xmlenc_unpad(mut data: Vec<u8>) -> CryptoResult<Vec<u8>> {
    let pad_len = data.last().copied().unwrap_or(0) as usize;
    if pad_len == 0 || pad_len > AES_BLOCK_SIZE || pad_len > data.len() {
        return Err(Error::Invalid("Invalid block padding".into()));
    }
    data.truncate(data.len() - pad_len);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use openssl::symm::{encrypt, encrypt_aead};

    const AES256_KEY: &[u8] = &[
        0x60, 0x3d, 0xeb, 0x10, 0x15, 0xca, 0x71, 0xbe, 0x2b, 0x73, 0xae, 0xf0, 0x85, 0x7d, 0x77,
        0x81, 0x1f, 0x35, 0x2c, 0x07, 0x3b, 0x61, 0x08, 0xd7, 0x2d, 0x98, 0x10, 0xa3, 0x09, 0x14,
        0xdf, 0xf4,
    ];

    const TEST_IV: &[u8] = &[
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
        0x0f,
    ];

    const TEST_PLAINTEXT: &[u8] = b"<saml2:NameID>TESTID</saml2:NameID>";

    #[test]
    fn test_cbc_decrypt_with_iv_prefix() {
        // openssl applies PKCS#7, which is a valid instance of XML-Encryption padding
        let ciphertext = encrypt(
            OpenSslCipher::aes_256_cbc(),
            AES256_KEY,
            Some(TEST_IV),
            TEST_PLAINTEXT,
        )
        .unwrap();
        let mut data = TEST_IV.to_vec();
        data.extend_from_slice(&ciphertext);

        let plaintext = Cipher::Aes256Cbc.decrypt(AES256_KEY, &data).unwrap();
        assert_eq!(plaintext, TEST_PLAINTEXT);
    }

    #[test]
    fn test_gcm_decrypt_with_tag_suffix() {
        let iv = &TEST_IV[..GCM_IV_SIZE];
        let key = &AES256_KEY[..16];
        let mut tag = [0u8; GCM_TAG_SIZE];
        let ciphertext = encrypt_aead(
            OpenSslCipher::aes_128_gcm(),
            key,
            Some(iv),
            &[],
            TEST_PLAINTEXT,
            &mut tag,
        )
        .unwrap();

        let mut data = iv.to_vec();
        data.extend_from_slice(&ciphertext);
        data.extend_from_slice(&tag);

        let plaintext = Cipher::Aes128Gcm.decrypt(key, &data).unwrap();
        assert_eq!(plaintext, TEST_PLAINTEXT);

        // a flipped tag bit must fail authentication
        let last = data.len() - 1;
        data[last] ^= 0x01;
        assert!(Cipher::Aes128Gcm.decrypt(key, &data).is_err());
    }

    #[test]
    fn test_wrong_key_size() {
        let result = Cipher::Aes128Cbc.decrypt(AES256_KEY, &[0u8; 32]);
        assert!(matches!(result, Err(Error::InvalidKey(_))));
    }

    #[test]
    fn test_unpad_rejects_invalid_padding() {
        assert!(xmlenc_unpad(vec![1, 2, 3, 0]).is_err());
        assert!(xmlenc_unpad(vec![1, 2, 3, 17]).is_err());
        assert_eq!(xmlenc_unpad(vec![1, 2, 9, 9, 3]).unwrap(), vec![1, 2]);
    }
}
