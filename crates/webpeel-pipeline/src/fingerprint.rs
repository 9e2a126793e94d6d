//! Content fingerprinting shared by Stage 7 (change tracking) and Stage 8
//! (the result record's `fingerprint` field) — same basis, computed twice
//! because they run over different snapshots of `ctx.content`.

use sha2::{Digest, Sha256};

const FINGERPRINT_BYTES: usize = 8;

pub fn fingerprint(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().take(FINGERPRINT_BYTES).map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_sixteen_hex_chars() {
        let fp = fingerprint("hello world");
        assert_eq!(fp.len(), FINGERPRINT_BYTES * 2);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn changes_with_content() {
        assert_ne!(fingerprint("a"), fingerprint("b"));
    }
}
