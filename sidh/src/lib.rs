#![forbid(unsafe_code)]

extern crate num_bigint;
extern crate num_integer;
extern crate num_traits;
extern crate symmetric;

#[macro_use]
extern crate lazy_static;

pub mod num;
pub mod gf;
pub mod weierstrass;
pub mod isogeny;
pub mod params;
pub mod key;

pub use self::num::{random_z, random_z_below, Z};
pub use self::gf::Gf;
pub use self::weierstrass::{Curve, Point};
pub use self::isogeny::{Isogeny, SmallIsogeny};
pub use self::params::{balanced_strategy, ParamSet, Side, SidhParams};
pub use self::key::{SidhKey, SidhKeyBasic, HASH_SEED_SIZE};
