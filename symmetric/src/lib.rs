#![forbid(unsafe_code)]

extern crate common_types;
extern crate crypto;
extern crate hmac;
extern crate rand;
extern crate sha2;

#[cfg(test)]
#[macro_use]
extern crate hex_literal;

pub mod cipher;
pub mod mac;
pub mod random;

pub use self::cipher::{new_cipher, Cipher};
pub use self::mac::{new_mac, Mac};
pub use self::random::{random_bytes, random_u32_below, random_vec};

// constant-time comparison for MAC trailers and auth replies
pub use crypto::util::fixed_time_eq;
