use common_types::CipherKind;

use crypto::chacha20::ChaCha20 as ChaChaCore;
use crypto::digest::Digest;
use crypto::sha2::Sha256;
use crypto::symmetriccipher::SynchronousStreamCipher;

/// A keystream cipher operating in place over buffer slices.
///
/// Re-keying resets the keystream to counter zero under the currently
/// installed nonce. Encryption and decryption are the same XOR; the
/// keystream position advances by the number of bytes processed, so
/// sub-block calls of any size compose into one contiguous stream.
pub trait Cipher {
    fn kind(&self) -> CipherKind;

    fn key_size(&self) -> usize;
    fn nonce_size(&self) -> usize;

    /// Install a key. Longer keys are folded through SHA-256, shorter
    /// ones are zero-padded on the right.
    fn set_key(&mut self, key: &[u8]);

    /// Install a nonce; only the first `nonce_size` bytes are used.
    fn set_nonce(&mut self, nonce: &[u8]);

    fn encrypt(&mut self, buf: &mut [u8]);
    fn decrypt(&mut self, buf: &mut [u8]);
}

pub fn new_cipher(kind: CipherKind) -> Box<dyn Cipher> {
    match kind {
        CipherKind::ChaCha20 => Box::new(ChaCha20::new()),
        CipherKind::Plain => Box::new(Plain),
    }
}

const CHACHA20_KEY_SIZE: usize = 32;
const CHACHA20_NONCE_SIZE: usize = 8;

pub struct ChaCha20 {
    key: [u8; CHACHA20_KEY_SIZE],
    nonce: [u8; CHACHA20_NONCE_SIZE],
    core: ChaChaCore,
}

impl ChaCha20 {
    pub fn new() -> Self {
        let key = [0; CHACHA20_KEY_SIZE];
        let nonce = [0; CHACHA20_NONCE_SIZE];
        ChaCha20 {
            key: key,
            nonce: nonce,
            core: ChaChaCore::new(&key, &nonce),
        }
    }

    fn reset(&mut self) {
        self.core = ChaChaCore::new(&self.key, &self.nonce);
    }
}

impl Cipher for ChaCha20 {
    fn kind(&self) -> CipherKind {
        CipherKind::ChaCha20
    }

    fn key_size(&self) -> usize {
        CHACHA20_KEY_SIZE
    }

    fn nonce_size(&self) -> usize {
        CHACHA20_NONCE_SIZE
    }

    fn set_key(&mut self, key: &[u8]) {
        if key.len() > CHACHA20_KEY_SIZE {
            let mut hasher = Sha256::new();
            hasher.input(key);
            hasher.result(&mut self.key);
        } else {
            self.key = [0; CHACHA20_KEY_SIZE];
            self.key[..key.len()].copy_from_slice(key);
        }
        self.reset();
    }

    fn set_nonce(&mut self, nonce: &[u8]) {
        let take = ::std::cmp::min(nonce.len(), CHACHA20_NONCE_SIZE);
        self.nonce = [0; CHACHA20_NONCE_SIZE];
        self.nonce[..take].copy_from_slice(&nonce[..take]);
        self.reset();
    }

    fn encrypt(&mut self, buf: &mut [u8]) {
        if buf.is_empty() {
            return;
        }
        let input = buf.to_vec();
        self.core.process(&input, buf);
    }

    fn decrypt(&mut self, buf: &mut [u8]) {
        self.encrypt(buf);
    }
}

/// The identity transform, negotiable as "plain".
pub struct Plain;

impl Cipher for Plain {
    fn kind(&self) -> CipherKind {
        CipherKind::Plain
    }

    fn key_size(&self) -> usize {
        0
    }

    fn nonce_size(&self) -> usize {
        0
    }

    fn set_key(&mut self, _key: &[u8]) {}

    fn set_nonce(&mut self, _nonce: &[u8]) {}

    fn encrypt(&mut self, _buf: &mut [u8]) {}

    fn decrypt(&mut self, _buf: &mut [u8]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    // first keystream block of ChaCha20 under the all-zero key and nonce
    const ZERO_BLOCK: [u8; 64] = hex!("76b8e0ada0f13d90405d6ae55386bd28bdd219b8a08ded1aa836efcc8b770dc7da41597c5157488d7724e03fb8d84a376a43b8f41518a11cc387b669b2ee6586");

    #[test]
    fn chacha20_zero_key_keystream() {
        let mut cipher = ChaCha20::new();
        cipher.set_key(&[0; 32]);
        cipher.set_nonce(&[0; 8]);

        let mut buf = [0u8; 64];
        cipher.encrypt(&mut buf);
        assert_eq!(&buf[..], &ZERO_BLOCK[..]);
    }

    #[test]
    fn chacha20_sub_block_calls_compose() {
        let mut whole = ChaCha20::new();
        whole.set_key(b"key");
        whole.set_nonce(&[7; 8]);
        let mut expected = [0u8; 100];
        whole.encrypt(&mut expected);

        let mut pieces = ChaCha20::new();
        pieces.set_key(b"key");
        pieces.set_nonce(&[7; 8]);
        let mut got = [0u8; 100];
        {
            let (a, rest) = got.split_at_mut(1);
            let (b, rest) = rest.split_at_mut(13);
            let (c, d) = rest.split_at_mut(64);
            pieces.encrypt(a);
            pieces.encrypt(b);
            pieces.encrypt(c);
            pieces.encrypt(d);
        }
        assert_eq!(&got[..], &expected[..]);
    }

    #[test]
    fn chacha20_decrypt_inverts_encrypt() {
        let mut enc = new_cipher(CipherKind::ChaCha20);
        let mut dec = new_cipher(CipherKind::ChaCha20);
        for cipher in &mut [&mut enc, &mut dec] {
            cipher.set_key(b"some shared key material");
            cipher.set_nonce(&[42; 8]);
        }

        let mut buf = b"attack at dawn".to_vec();
        enc.encrypt(&mut buf);
        assert_ne!(&buf[..], b"attack at dawn");
        dec.decrypt(&mut buf);
        assert_eq!(&buf[..], b"attack at dawn");
    }

    #[test]
    fn chacha20_long_keys_are_folded() {
        let long_key = [0xabu8; 57];

        let mut direct = ChaCha20::new();
        direct.set_key(&long_key);

        // folding is SHA-256 of the over-long key
        use crypto::digest::Digest;
        use crypto::sha2::Sha256;
        let mut hasher = Sha256::new();
        hasher.input(&long_key);
        let mut folded = [0u8; 32];
        hasher.result(&mut folded);

        let mut via_digest = ChaCha20::new();
        via_digest.set_key(&folded);

        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        direct.encrypt(&mut a);
        via_digest.encrypt(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn rekey_restarts_the_keystream() {
        let mut cipher = ChaCha20::new();
        cipher.set_key(b"first");
        cipher.set_nonce(&[1; 8]);
        let mut first = [0u8; 32];
        cipher.encrypt(&mut first);

        cipher.set_key(b"first");
        let mut again = [0u8; 32];
        cipher.encrypt(&mut again);
        assert_eq!(first, again);
    }

    #[test]
    fn plain_is_identity() {
        let mut cipher = new_cipher(CipherKind::Plain);
        cipher.set_key(b"ignored");
        cipher.set_nonce(b"ignored");
        let mut buf = b"unchanged".to_vec();
        cipher.encrypt(&mut buf);
        assert_eq!(&buf[..], b"unchanged");
        cipher.decrypt(&mut buf);
        assert_eq!(&buf[..], b"unchanged");
    }
}
