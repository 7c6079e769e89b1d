use std::sync::Arc;

use isogeny::Isogeny;
use num::{random_z_below, Z};
use params::SidhParams;
use symmetric::random::{random_bytes, random_u32_below};
use weierstrass::{Curve, Point};

/// An SIDH key: private scalars (m, n) and/or the public triple
/// (codomain curve, φ(P_peer), φ(Q_peer)).
///
/// The private sampler keeps (m, n) outside ℓ·ℤ² by fixing one scalar to
/// one: with probability ℓ/(ℓ+1) it picks m = 1 and n random below ℓᵉ,
/// otherwise m random in ℓ·[0, ℓᵉ⁻¹) and n = 1. The distribution is
/// deliberately kept as is; changing it silently would change the key
/// space.
#[derive(Clone)]
pub struct SidhKeyBasic {
    params: SidhParams,
    m: Z,
    n: Z,
    isogeny: Option<Isogeny>,
    curve: Arc<Curve>,
    p_image: Point,
    q_image: Point,
    has_private: bool,
    has_public: bool,
}

impl SidhKeyBasic {
    pub fn new(params: SidhParams) -> SidhKeyBasic {
        let curve = params.curve().clone();
        let identity = Point::identity(&curve);
        SidhKeyBasic {
            params: params,
            m: Z::zero(),
            n: Z::zero(),
            isogeny: None,
            curve: curve,
            p_image: identity.clone(),
            q_image: identity,
            has_private: false,
            has_public: false,
        }
    }

    pub fn params(&self) -> &SidhParams {
        &self.params
    }

    pub fn has_private(&self) -> bool {
        self.has_private
    }

    pub fn has_public(&self) -> bool {
        self.has_public
    }

    pub fn m(&self) -> &Z {
        &self.m
    }

    pub fn n(&self) -> &Z {
        &self.n
    }

    pub fn p_image(&self) -> &Point {
        &self.p_image
    }

    pub fn q_image(&self) -> &Point {
        &self.q_image
    }

    pub fn curve_image(&self) -> &Arc<Curve> {
        &self.curve
    }

    pub fn generate_private(&mut self) -> bool {
        if self.has_private {
            return true;
        }
        if self.has_public {
            return false;
        }

        if random_u32_below(self.params.l() + 1) != 0 {
            self.m = Z::one();
            self.n = random_z_below(self.params.le());
        } else {
            self.m = &random_z_below(self.params.lem1()) * self.params.l();
            self.n = Z::one();
        }

        self.has_private = true;
        self.has_public = false;
        self.isogeny = None;
        true
    }

    fn ensure_isogeny(&mut self) -> bool {
        if self.isogeny.is_some() {
            return true;
        }
        if !self.has_private {
            return false;
        }

        let generator = &(self.params.p_gen() * &self.m) + &(self.params.q_gen() * &self.n);
        self.isogeny = Isogeny::with_strategy(
            &generator,
            self.params.l(),
            self.params.e(),
            self.params.strategy(),
        );
        self.isogeny.is_some()
    }

    pub fn generate_public(&mut self) -> bool {
        if self.has_public {
            return true;
        }
        if !self.ensure_isogeny() {
            return false;
        }

        if let Some(ref isogeny) = self.isogeny {
            self.curve = isogeny.image().clone();
            self.p_image = isogeny.apply(self.params.p_peer());
            self.q_image = isogeny.apply(self.params.q_peer());
        }

        self.has_public = true;
        true
    }

    pub fn generate(&mut self) {
        self.has_private = false;
        self.has_public = false;
        self.isogeny = None;

        self.generate_private();
        self.generate_public();
    }

    /// Shared secret with a public key of the opposite side: rebuild the
    /// walk with generator m·φ'(P) + n·φ'(Q) on the peer's codomain and
    /// serialize its j-invariant. Empty on side mismatch, missing
    /// material, or peer points too degenerate to carry the walk.
    pub fn compute_shared_secret(&self, peer: &SidhKeyBasic) -> Vec<u8> {
        if !self.has_private || !peer.has_public() {
            return Vec::new();
        }
        if self.params.side() == peer.params().side() {
            return Vec::new();
        }

        let generator = &(peer.p_image() * &self.m) + &(peer.q_image() * &self.n);
        let isogeny = match Isogeny::with_strategy(
            &generator,
            self.params.l(),
            self.params.e(),
            self.params.strategy(),
        ) {
            Some(isogeny) => isogeny,
            None => return Vec::new(),
        };
        isogeny.image().j_invariant().serialize()
    }

    fn scalar_width(&self) -> usize {
        self.params.le().byte_length()
    }

    /// One tag byte (0 ⇒ n is the free scalar, 1 ⇒ m) plus the free
    /// scalar in fixed width.
    pub fn export_private(&self) -> Vec<u8> {
        if !self.has_private {
            return Vec::new();
        }

        let width = self.scalar_width();
        let mut out = Vec::with_capacity(1 + width);
        if self.m.is_one() {
            out.push(0);
            out.extend_from_slice(&self.n.serialize(width));
        } else {
            out.push(1);
            out.extend_from_slice(&self.m.serialize(width));
        }
        out
    }

    /// `curve || φ(P_peer) || φ(Q_peer)`.
    pub fn export_public(&self) -> Vec<u8> {
        if !self.has_public {
            return Vec::new();
        }

        let mut out = self.curve.serialize();
        out.extend_from_slice(&self.p_image.serialize());
        out.extend_from_slice(&self.q_image.serialize());
        out
    }

    pub fn export_both(&self) -> Vec<u8> {
        if !self.has_private || !self.has_public {
            return Vec::new();
        }

        let mut out = self.export_private();
        out.extend_from_slice(&self.export_public());
        out
    }

    fn private_size(&self) -> usize {
        1 + self.scalar_width()
    }

    fn public_size(&self) -> usize {
        let p = self.params.prime();
        Curve::byte_size(p) + 2 * Point::byte_size(p)
    }

    pub fn import_private(&mut self, raw: &[u8]) -> bool {
        if raw.len() != self.private_size() {
            return false;
        }

        let scalar = Z::unserialize(&raw[1..]);
        if &scalar >= self.params.le() {
            return false;
        }

        match raw[0] {
            0 => {
                self.m = Z::one();
                self.n = scalar;
            }
            1 => {
                self.m = scalar;
                self.n = Z::one();
            }
            _ => return false,
        }

        self.has_private = true;
        self.has_public = false;
        self.isogeny = None;
        true
    }

    pub fn import_public(&mut self, raw: &[u8]) -> bool {
        if raw.len() != self.public_size() {
            return false;
        }

        let p = self.params.prime();
        let curve_size = Curve::byte_size(p);
        let point_size = Point::byte_size(p);

        let curve = match Curve::unserialize(p, &raw[..curve_size]) {
            Some(curve) => Arc::new(curve),
            None => return false,
        };
        let p_image = match Point::unserialize(&curve, &raw[curve_size..curve_size + point_size]) {
            Some(point) => point,
            None => return false,
        };
        let q_image = match Point::unserialize(&curve, &raw[curve_size + point_size..]) {
            Some(point) => point,
            None => return false,
        };

        self.curve = curve;
        self.p_image = p_image;
        self.q_image = q_image;
        self.has_private = false;
        self.has_public = true;
        self.isogeny = None;
        true
    }

    /// Accepts a private export, a public export, or both concatenated.
    pub fn import(&mut self, raw: &[u8]) -> bool {
        let private_size = self.private_size();
        let public_size = self.public_size();

        if raw.len() == private_size {
            self.import_private(raw)
        } else if raw.len() == public_size {
            self.import_public(raw)
        } else if raw.len() == private_size + public_size {
            let backup = self.clone();
            if !self.import_private(&raw[..private_size]) {
                return false;
            }
            if !self.import_public(&raw[private_size..]) {
                *self = backup;
                return false;
            }
            self.has_private = true;
            self.has_public = true;
            true
        } else {
            false
        }
    }
}

pub const HASH_SEED_SIZE: usize = 32;

/// An SIDH key extended with a hash seed, the HMAC key of the
/// challenge–response authentication. The seed travels with both the
/// private and the public export.
#[derive(Clone)]
pub struct SidhKey {
    basic: SidhKeyBasic,
    hash_seed: [u8; HASH_SEED_SIZE],
}

impl SidhKey {
    pub fn new(params: SidhParams) -> SidhKey {
        SidhKey {
            basic: SidhKeyBasic::new(params),
            hash_seed: [0; HASH_SEED_SIZE],
        }
    }

    pub fn basic(&self) -> &SidhKeyBasic {
        &self.basic
    }

    pub fn params(&self) -> &SidhParams {
        self.basic.params()
    }

    pub fn has_private(&self) -> bool {
        self.basic.has_private()
    }

    pub fn has_public(&self) -> bool {
        self.basic.has_public()
    }

    pub fn hash_seed(&self) -> &[u8] {
        &self.hash_seed
    }

    fn generate_hash_seed(&mut self) {
        random_bytes(&mut self.hash_seed);
    }

    pub fn generate(&mut self) {
        self.basic.generate();
        self.generate_hash_seed();
    }

    pub fn export_private(&self) -> Vec<u8> {
        let mut out = self.basic.export_private();
        if out.is_empty() {
            return out;
        }
        out.extend_from_slice(&self.hash_seed);
        out
    }

    pub fn export_public(&self) -> Vec<u8> {
        let mut out = self.basic.export_public();
        if out.is_empty() {
            return out;
        }
        out.extend_from_slice(&self.hash_seed);
        out
    }

    pub fn export_both(&self) -> Vec<u8> {
        let mut out = self.basic.export_both();
        if out.is_empty() {
            return out;
        }
        out.extend_from_slice(&self.hash_seed);
        out
    }

    fn import_with<F>(&mut self, raw: &[u8], import: F) -> bool
    where
        F: FnOnce(&mut SidhKeyBasic, &[u8]) -> bool,
    {
        if raw.len() <= HASH_SEED_SIZE {
            return false;
        }
        let split = raw.len() - HASH_SEED_SIZE;
        if !import(&mut self.basic, &raw[..split]) {
            return false;
        }
        self.hash_seed.copy_from_slice(&raw[split..]);
        true
    }

    pub fn import_private(&mut self, raw: &[u8]) -> bool {
        self.import_with(raw, |basic, raw| basic.import_private(raw))
    }

    pub fn import_public(&mut self, raw: &[u8]) -> bool {
        self.import_with(raw, |basic, raw| basic.import_public(raw))
    }

    pub fn import(&mut self, raw: &[u8]) -> bool {
        self.import_with(raw, |basic, raw| basic.import(raw))
    }

    pub fn compute_shared_secret(&self, peer: &SidhKeyBasic) -> Vec<u8> {
        self.basic.compute_shared_secret(peer)
    }
}
