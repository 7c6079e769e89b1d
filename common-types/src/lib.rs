#![forbid(unsafe_code)]

#[macro_use]
extern crate bitflags;

mod algorithms;
pub use self::algorithms::{
    AuthKind, AuthSet, CipherKind, CipherSet, KexKind, KexSet, MacKind, MacSet,
};
