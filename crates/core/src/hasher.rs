use std::io::Read;

use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::fs::FileSystem;

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedContent {
    pub digest: Digest,
    pub length: u64,
}

pub fn hash_file(fs: &dyn FileSystem, path: &str) -> Result<HashedContent> {
    let mut reader = fs.open_read(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0_u8; CHUNK_SIZE];
    let mut length = 0_u64;

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|err| Error::io(path, err))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
        length = length.saturating_add(bytes_read as u64);
    }

    Ok(HashedContent {
        digest: hasher.finalize().into(),
        length,
    })
}

pub fn compute_digest(fs: &dyn FileSystem, path: &str) -> Result<Digest> {
    hash_file(fs, path).map(|hashed| hashed.digest)
}
