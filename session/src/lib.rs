#![forbid(unsafe_code)]

extern crate base64;
extern crate common_types;
extern crate hex;
extern crate sha2;
extern crate sidh;
extern crate symmetric;
extern crate wire;

#[macro_use]
extern crate log;

extern crate serde;
#[macro_use]
extern crate serde_derive;

pub mod auth;
pub mod config;
pub mod keyfile;
pub mod kex;

mod machine;
pub use self::machine::{ErrorKind, Role, Session, State};

pub use self::auth::{generate_auth_key, new_auth, Auth};
pub use self::config::{Config, ConfigError};
pub use self::kex::{new_kex, Kex, KexRole};
