#![forbid(unsafe_code)]

extern crate base64;
extern crate byteorder;
extern crate common_types;
extern crate symmetric;

pub mod handshake;
pub mod packet;

pub use self::handshake::{HandshakeFini, HandshakeInit};
pub use self::packet::{PacketError, PacketKind, PacketReader, PacketView};

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    //! Helpers for protocol tests: matching cipher/MAC pairs keyed the
    //! same way on both ends of a simulated connection.

    use common_types::{CipherKind, MacKind};
    use symmetric::{new_cipher, new_mac, Cipher, Mac};

    pub fn keyed_cipher(kind: CipherKind, key: &[u8], nonce: &[u8]) -> Box<dyn Cipher> {
        let mut cipher = new_cipher(kind);
        cipher.set_key(key);
        cipher.set_nonce(nonce);
        cipher
    }

    pub fn keyed_mac(kind: MacKind, key: &[u8]) -> Box<dyn Mac> {
        let mut mac = new_mac(kind);
        mac.set_key(key);
        mac
    }
}
