#![forbid(unsafe_code)]

//! A post-quantum secure channel: supersingular-isogeny key exchange and
//! authentication underneath an ordered, framed, encrypted and
//! authenticated byte-stream session protocol.
//!
//! The heavy lifting lives in the member crates; this crate re-exports
//! their public surface under one roof.

extern crate common_types;
extern crate session;
extern crate sidh;
extern crate symmetric;
extern crate wire;

pub use common_types::{
    AuthKind, AuthSet, CipherKind, CipherSet, KexKind, KexSet, MacKind, MacSet,
};

pub use symmetric::{fixed_time_eq, new_cipher, new_mac, Cipher, Mac};

pub use sidh::{
    balanced_strategy, random_z, random_z_below, Curve, Gf, Isogeny, ParamSet, Point, Side,
    SidhKey, SidhKeyBasic, SidhParams, SmallIsogeny, Z,
};

pub use wire::{HandshakeFini, HandshakeInit, PacketKind, PacketReader};

pub use session::{
    generate_auth_key, new_auth, new_kex, Auth, Config, ConfigError, ErrorKind, Kex, KexRole,
    Role, Session, State,
};

pub use session::{auth, config, keyfile, kex};
