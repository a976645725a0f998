//! Checksum computation and encoding.
//!
//! The catalog registers checksums in two families with different
//! encodings: the sha-2 family is prefixed `sha2:` and base64-encoded, the
//! legacy md5 family is unprefixed and hex-encoded. Computed digests must
//! use the matching encoding or every comparison would be a false
//! mismatch.

use std::io::Read;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use md5::{Digest as _, Md5};
use sha2::Sha256;

use crate::{Result, StoreError};

/// Read granularity when streaming content through a hasher.
pub const CHUNK_SIZE: usize = 8192;

/// Checksum algorithm families the catalog understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    /// Legacy family, hex-encoded.
    Md5,
    /// sha-2 family (sha256), base64-encoded.
    Sha2,
}

impl ChecksumAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Md5 => "md5",
            ChecksumAlgorithm::Sha2 => "sha2",
        }
    }
}

/// A checksum registered in the catalog, split into its algorithm family
/// and comparison value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedChecksum {
    pub algorithm: ChecksumAlgorithm,
    /// The value to compare against, with any algorithm prefix removed.
    pub value: String,
}

impl ExpectedChecksum {
    /// Parse a registered checksum string.
    ///
    /// `"sha2:<base64>"` selects the sha-2 family; a bare value is the
    /// legacy hex family. Any other `prefix:` is an error rather than a
    /// silent fallback, since hashing with the wrong algorithm would
    /// fabricate mismatches.
    pub fn parse(raw: &str) -> Result<Self> {
        if let Some(value) = raw.strip_prefix("sha2:") {
            return Ok(Self {
                algorithm: ChecksumAlgorithm::Sha2,
                value: value.to_string(),
            });
        }
        if let Some((prefix, _)) = raw.split_once(':') {
            return Err(StoreError::UnsupportedChecksum(prefix.to_string()));
        }
        Ok(Self {
            algorithm: ChecksumAlgorithm::Md5,
            value: raw.to_string(),
        })
    }
}

/// Incremental digest over one of the supported algorithm families.
///
/// Used directly by backends that receive content in chunks; local files
/// go through [`digest_reader`].
pub enum DigestState {
    Md5(Md5),
    Sha2(Sha256),
}

impl DigestState {
    pub fn new(algorithm: ChecksumAlgorithm) -> Self {
        match algorithm {
            ChecksumAlgorithm::Md5 => DigestState::Md5(Md5::new()),
            ChecksumAlgorithm::Sha2 => DigestState::Sha2(Sha256::new()),
        }
    }

    pub fn update(&mut self, chunk: &[u8]) {
        match self {
            DigestState::Md5(h) => h.update(chunk),
            DigestState::Sha2(h) => h.update(chunk),
        }
    }

    /// Finish and encode in the family's catalog encoding.
    pub fn finalize(self) -> String {
        match self {
            DigestState::Md5(h) => hex::encode(h.finalize()),
            DigestState::Sha2(h) => BASE64.encode(h.finalize()),
        }
    }
}

/// Stream a reader through the requested hash in fixed-size chunks.
pub fn digest_reader<R: Read>(algorithm: ChecksumAlgorithm, mut reader: R) -> Result<String> {
    let mut state = DigestState::new(algorithm);
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        state.update(&buf[..n]);
    }
    Ok(state.finalize())
}
