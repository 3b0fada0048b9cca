//! 배치 봉인 -- 전송 페이로드 압축 및 암호화
//!
//! 전송기는 직렬화된 JSON 배치를 gzip으로 압축한 뒤 공유 비밀에서 유도한 키로
//! ChaCha20-Poly1305 암호화합니다. 수집 서버는 [`open`]으로 역변환합니다.
//!
//! 암호문 형식: `nonce(12) || ciphertext || tag(16)`

use std::fmt;
use std::io::{Read, Write};

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use rand::RngCore;

use crate::error::CodecError;

/// 키 크기 (256비트)
pub const KEY_SIZE: usize = 32;
/// 논스 크기 (96비트)
pub const NONCE_SIZE: usize = 12;
/// 인증 태그 크기 (128비트)
pub const TAG_SIZE: usize = 16;

/// 압축 해제 최대 크기 (압축 폭탄 방지)
const MAX_DECOMPRESSED_SIZE: u64 = 512 * 1024 * 1024;

/// BLAKE3 키 유도 컨텍스트
const KEY_CONTEXT: &str = "tailpost v1 batch encryption key";

/// 공유 비밀에서 유도한 대칭 키
#[derive(Clone, PartialEq, Eq)]
pub struct SharedKey {
    bytes: [u8; KEY_SIZE],
}

impl SharedKey {
    /// 공유 비밀 문자열에서 키를 유도합니다.
    ///
    /// 같은 비밀은 항상 같은 키를 만듭니다.
    pub fn derive(secret: &str) -> Self {
        Self {
            bytes: blake3::derive_key(KEY_CONTEXT, secret.as_bytes()),
        }
    }

    /// 원시 바이트로 키를 생성합니다.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let bytes: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            CodecError::Encrypt(format!(
                "key must be exactly {KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self { bytes })
    }
}

impl fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// 평문을 암호화합니다.
pub fn encrypt(key: &SharedKey, plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
    let cipher = ChaCha20Poly1305::new_from_slice(&key.bytes)
        .map_err(|e| CodecError::Encrypt(format!("failed to create cipher: {e}")))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CodecError::Encrypt(e.to_string()))?;

    let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// [`encrypt`]로 만든 암호문을 복호화합니다.
pub fn decrypt(key: &SharedKey, data: &[u8]) -> Result<Vec<u8>, CodecError> {
    if data.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CodecError::Decrypt(format!(
            "ciphertext too short: {} bytes (min: {})",
            data.len(),
            NONCE_SIZE + TAG_SIZE
        )));
    }

    let cipher = ChaCha20Poly1305::new_from_slice(&key.bytes)
        .map_err(|e| CodecError::Decrypt(format!("failed to create cipher: {e}")))?;

    let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CodecError::Decrypt("authentication failed".to_owned()))
}

/// gzip 압축
pub fn compress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 4), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| CodecError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CodecError::Compression(e.to_string()))
}

/// gzip 압축 해제
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    let read = GzDecoder::new(data)
        .take(MAX_DECOMPRESSED_SIZE + 1)
        .read_to_end(&mut out)
        .map_err(|e| CodecError::Compression(e.to_string()))?;

    if read as u64 > MAX_DECOMPRESSED_SIZE {
        return Err(CodecError::Compression(format!(
            "decompressed payload exceeds {MAX_DECOMPRESSED_SIZE} bytes"
        )));
    }
    Ok(out)
}

/// 압축 후 암호화합니다.
pub fn seal(key: &SharedKey, plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
    encrypt(key, &compress(plaintext)?)
}

/// [`seal`]의 역변환
pub fn open(key: &SharedKey, sealed: &[u8]) -> Result<Vec<u8>, CodecError> {
    decompress(&decrypt(key, sealed)?)
}
