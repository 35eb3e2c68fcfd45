const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Prefix shared by every backend list key.
pub const KEY_PREFIX: &str = "queue:";

/// FNV-1a 32-bit digest of `name`, as 8 lowercase hex characters.
///
/// Implementations in other languages produce the same digest, so processes
/// written in different languages agree on where a logical queue lives.
#[must_use]
pub fn fingerprint(name: &str) -> String {
    let hash = name.as_bytes().iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    });

    format!("{hash:08x}")
}

/// Backend key for the logical queue `name`.
#[must_use]
pub fn queue_key(name: &str) -> String {
    format!("{KEY_PREFIX}{}", fingerprint(name))
}
