use ring::digest::{Context, SHA256};

/// Length of every content hash the service uses
pub const HASH_LEN: usize = 32;

pub fn sha256_digest(data: &[u8]) -> [u8; HASH_LEN] {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    let mut out = [0u8; HASH_LEN];
    out.copy_from_slice(digest.as_ref());
    out
}
