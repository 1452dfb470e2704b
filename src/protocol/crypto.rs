//! AES-128/CFB-8 stream wrappers and the key material helpers used during login.
//!
//! The protocol seeds both the key and the IV with the same 16-byte shared secret, and keeps one
//! cipher state per direction for the whole connection.

use crate::error::{ClientError, Result};
use aes::cipher::{inout::InOutBuf, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use sha1::{Digest, Sha1};
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

pub type Aes128Cfb8Enc = cfb8::Encryptor<aes::Aes128>;
pub type Aes128Cfb8Dec = cfb8::Decryptor<aes::Aes128>;

pub const SECRET_LEN: usize = 16;

/// Generates a fresh shared secret.
pub fn generate_secret() -> [u8; SECRET_LEN] {
    let mut secret = [0u8; SECRET_LEN];
    OsRng.fill_bytes(&mut secret);
    secret
}

pub fn create_cipher(key: &[u8]) -> Result<(Aes128Cfb8Enc, Aes128Cfb8Dec)> {
    let invalid = |_| ClientError::CryptoError(format!("Invalid key length {}", key.len()));
    Ok((
        Aes128Cfb8Enc::new_from_slices(key, key).map_err(invalid)?,
        Aes128Cfb8Dec::new_from_slices(key, key).map_err(invalid)?,
    ))
}

pub fn encrypt_bytes(cipher: &mut Aes128Cfb8Enc, data: &mut [u8]) {
    // CFB-8 works on one-byte blocks, so there is never a tail.
    let (chunks, _) = InOutBuf::from(data).into_chunks();
    cipher.encrypt_blocks_inout_mut(chunks);
}

pub fn decrypt_bytes(cipher: &mut Aes128Cfb8Dec, data: &mut [u8]) {
    let (chunks, _) = InOutBuf::from(data).into_chunks();
    cipher.decrypt_blocks_inout_mut(chunks);
}

/// Encrypts `data` with the server's DER-encoded (SubjectPublicKeyInfo) RSA key.
pub fn encrypt_with_public_key(public_key_der: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let key = RsaPublicKey::from_public_key_der(public_key_der)
        .map_err(|e| ClientError::CryptoError(format!("Invalid server public key: {}", e)))?;
    key.encrypt(&mut OsRng, Pkcs1v15Encrypt, data)
        .map_err(|e| ClientError::CryptoError(format!("RSA encryption failed: {}", e)))
}

/// Session hash sent to the authentication service: SHA-1 over server id, secret and public key,
/// printed as a signed two's complement number in lowercase hex.
pub fn server_hash(server_id: &str, secret: &[u8], public_key: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(server_id.as_bytes());
    hasher.update(secret);
    hasher.update(public_key);
    let mut digest: [u8; 20] = hasher.finalize().into();

    let negative = digest[0] & 0x80 != 0;
    if negative {
        let mut carry = true;
        for byte in digest.iter_mut().rev() {
            *byte = !*byte;
            if carry {
                let (sum, overflow) = byte.overflowing_add(1);
                *byte = sum;
                carry = overflow;
            }
        }
    }

    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    let trimmed = hex.trim_start_matches('0');
    let trimmed = if trimmed.is_empty() { "0" } else { trimmed };
    if negative {
        format!("-{}", trimmed)
    } else {
        trimmed.to_owned()
    }
}

/// Read half of the connection. Passes bytes through until a key is installed, decrypts
/// everything after that.
pub struct CipherReader<R> {
    inner: R,
    cipher: Option<Aes128Cfb8Dec>,
}

impl<R> CipherReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cipher: None,
        }
    }

    /// Starts decrypting. Can only happen once per connection.
    pub fn install(&mut self, cipher: Aes128Cfb8Dec) -> Result<()> {
        if self.cipher.is_some() {
            return Err(ClientError::CryptoError(
                "Decryption is already enabled".to_owned(),
            ));
        }
        self.cipher = Some(cipher);
        Ok(())
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for CipherReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;
        if let Some(cipher) = this.cipher.as_mut() {
            decrypt_bytes(cipher, &mut buf.filled_mut()[before..]);
        }
        Poll::Ready(Ok(()))
    }
}

/// Write half of the connection. Once a key is installed, bytes are encrypted as soon as they are
/// accepted; ciphertext the inner writer could not take yet waits for the next write or flush.
pub struct CipherWriter<W> {
    inner: W,
    cipher: Option<Aes128Cfb8Enc>,
    pending: Vec<u8>,
}

impl<W> CipherWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            cipher: None,
            pending: Vec::new(),
        }
    }

    /// Starts encrypting. Can only happen once per connection.
    pub fn install(&mut self, cipher: Aes128Cfb8Enc) -> Result<()> {
        if self.cipher.is_some() {
            return Err(ClientError::CryptoError(
                "Encryption is already enabled".to_owned(),
            ));
        }
        self.cipher = Some(cipher);
        Ok(())
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }
}

impl<W: AsyncWrite + Unpin> CipherWriter<W> {
    fn poll_drain(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while !self.pending.is_empty() {
            let n = ready!(Pin::new(&mut self.inner).poll_write(cx, &self.pending))?;
            if n == 0 {
                return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
            }
            self.pending.drain(..n);
        }
        Poll::Ready(Ok(()))
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for CipherWriter<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.cipher.is_none() {
            return Pin::new(&mut this.inner).poll_write(cx, buf);
        }

        ready!(this.poll_drain(cx))?;
        let mut data = buf.to_vec();
        if let Some(cipher) = this.cipher.as_mut() {
            encrypt_bytes(cipher, &mut data);
        }
        this.pending = data;

        // The cipher state already moved past these bytes, so they count as written.
        if let Poll::Ready(Err(e)) = this.poll_drain(cx) {
            return Poll::Ready(Err(e));
        }
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_drain(cx))?;
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}
