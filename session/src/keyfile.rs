use hex;
use sha2::{Digest, Sha256};

/// Key blobs at rest carry a 32-byte SHA-256 of the public half in
/// front of the raw key; the hex form of that digest is the string ID
/// peers exchange and the auth callback is keyed by.

pub const KEY_ID_SIZE: usize = 32;

pub fn key_id(public: &[u8]) -> [u8; KEY_ID_SIZE] {
    let mut hasher = Sha256::default();
    hasher.input(public);
    let digest = hasher.result();
    let mut id = [0u8; KEY_ID_SIZE];
    id.copy_from_slice(&digest);
    id
}

pub fn key_id_hex(public: &[u8]) -> String {
    hex::encode(&key_id(public)[..])
}

/// `id || key`, the on-disk layout.
pub fn encode(id: &[u8; KEY_ID_SIZE], key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(KEY_ID_SIZE + key.len());
    out.extend_from_slice(id);
    out.extend_from_slice(key);
    out
}

pub fn parse(blob: &[u8]) -> Option<([u8; KEY_ID_SIZE], &[u8])> {
    if blob.len() < KEY_ID_SIZE {
        return None;
    }
    let mut id = [0u8; KEY_ID_SIZE];
    id.copy_from_slice(&blob[..KEY_ID_SIZE]);
    Some((id, &blob[KEY_ID_SIZE..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blobs_round_trip() {
        let public = b"public key material";
        let private = b"private key material";

        let id = key_id(public);
        let blob = encode(&id, private);
        let (parsed_id, parsed_key) = parse(&blob).unwrap();

        assert_eq!(parsed_id, id);
        assert_eq!(parsed_key, private);
    }

    #[test]
    fn ids_are_stable_hex() {
        let id = key_id_hex(b"fixed input");
        assert_eq!(id.len(), 64);
        assert_eq!(id, key_id_hex(b"fixed input"));
        assert_ne!(id, key_id_hex(b"other input"));
    }

    #[test]
    fn truncated_blobs_are_rejected() {
        assert!(parse(&[0u8; 31]).is_none());
        assert!(parse(&[]).is_none());
        let (_, key) = parse(&[0u8; 32]).unwrap();
        assert!(key.is_empty());
    }
}
