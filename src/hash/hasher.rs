use std::fmt::{Display, Formatter};
use std::str::FromStr;
use md5::Md5;
use sha2::{Digest, Sha256};
use crate::error::BlobError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha256,
    Md5,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Md5 => "md5",
        }
    }

    /// Length of the lowercase hex digest.
    pub fn hex_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 64,
            HashAlgorithm::Md5 => 32,
        }
    }

    pub fn hasher(&self) -> Box<dyn Hasher> {
        match self {
            HashAlgorithm::Sha256 => Box::new(Sha256Hasher::new()),
            HashAlgorithm::Md5 => Box::new(Md5Hasher::new()),
        }
    }
}

impl Display for HashAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = BlobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "md5" => Ok(HashAlgorithm::Md5),
            _ => Err(BlobError::invalid_argument(format!("Unknown algorithm: {}", s))),
        }
    }
}

/// Incremental digest fed one chunk at a time.
pub trait Hasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize_hex(self: Box<Self>) -> String;
}

#[derive(Default)]
pub struct Sha256Hasher(Sha256);

impl Sha256Hasher {
    pub fn new() -> Self { Self(Sha256::new()) }
}

impl Hasher for Sha256Hasher {
    fn update(&mut self, data: &[u8]) { self.0.update(data); }
    fn finalize_hex(self: Box<Self>) -> String { hex::encode(self.0.finalize()) }
}

#[derive(Default)]
pub struct Md5Hasher(Md5);

impl Md5Hasher {
    pub fn new() -> Self { Self(Md5::new()) }
}

impl Hasher for Md5Hasher {
    fn update(&mut self, data: &[u8]) { self.0.update(data); }
    fn finalize_hex(self: Box<Self>) -> String { hex::encode(self.0.finalize()) }
}
