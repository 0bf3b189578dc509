mod hasher;
mod file_hash;

pub use self::hasher::{HashAlgorithm, Hasher, Md5Hasher, Sha256Hasher};
pub use self::file_hash::{hash_file, hash_file_with_chunk_size};
