use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::sync::Arc;

use gf::Gf;
use num::{random_z_below, Z};
use symmetric::random::random_u32_below;

/* Short Weierstrass form y² = x³ + ax + b over GF(p²).

   For characteristic other than 2 and 3 the j-invariant collapses to
     j = 6912·a³ / (4a³ + 27b²) = 1728·4a³ / (4a³ + 27b²).  */

/// A curve, shared by reference between its points and isogenies.
#[derive(Clone, PartialEq)]
pub struct Curve {
    a: Gf,
    b: Gf,
}

impl Curve {
    pub fn new(a: Gf, b: Gf) -> Curve {
        Curve { a: a, b: b }
    }

    pub fn a(&self) -> &Gf {
        &self.a
    }

    pub fn b(&self) -> &Gf {
        &self.b
    }

    pub fn prime(&self) -> &Arc<Z> {
        self.a.modulus()
    }

    pub fn j_invariant(&self) -> Gf {
        let a3m4 = &(&self.a.square() * &self.a) * 4;
        let denom = &a3m4 + &(&self.b.square() * 27);
        &(&a3m4 * 1728) / &denom
    }

    pub fn byte_size(p: &Z) -> usize {
        4 * p.byte_length()
    }

    /// `a_bytes || b_bytes`.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = self.a.serialize();
        out.extend_from_slice(&self.b.serialize());
        out
    }

    pub fn unserialize(p: &Arc<Z>, raw: &[u8]) -> Option<Curve> {
        if raw.len() != Curve::byte_size(p) {
            return None;
        }
        let half = raw.len() / 2;
        let a = Gf::unserialize(p, &raw[..half])?;
        let b = Gf::unserialize(p, &raw[half..])?;
        Some(Curve::new(a, b))
    }

    /// A uniformly random affine point: sample x until x³ + ax + b is a
    /// square, take a root, flip its sign half of the time.
    pub fn random_point(curve: &Arc<Curve>) -> Point {
        let p = curve.prime().clone();
        loop {
            let x = Gf::new(&p, random_z_below(&p), random_z_below(&p));
            let rhs = &(&(&x.square() + &curve.a) * &x) + &curve.b;
            if !rhs.is_square() {
                continue;
            }
            let mut y = rhs.sqrt();
            if random_u32_below(2) == 1 {
                y = -&y;
            }
            return Point::new(curve.clone(), x, y);
        }
    }

    /// A point of exact order dividing ℓᵃ whose order does not divide
    /// ℓᵃ⁻¹: multiply random points by the cofactor until the result
    /// survives multiplication by ℓᵃ⁻¹.
    pub fn torsion_point(curve: &Arc<Curve>, cofactor: &Z, factor_div_l: &Z) -> Point {
        loop {
            let candidate = &Curve::random_point(curve) * cofactor;
            if !(&candidate * factor_div_l).is_identity() {
                return candidate;
            }
        }
    }

    /// A basis (P, Q) of the ℓᵃ-torsion: two torsion points whose Weil
    /// pairing has full order.
    pub fn basis(curve: &Arc<Curve>, la: u32, ea: u32, lb: u32, eb: u32, f: u32) -> (Point, Point) {
        let cofactor = &Z::from(lb).pow(eb) * &Z::from(f);
        let factor_div_l = Z::from(la).pow(ea - 1);
        let factor = &factor_div_l * &Z::from(la);

        let p = Curve::torsion_point(curve, &cofactor, &factor_div_l);
        loop {
            let q = Curve::torsion_point(curve, &cofactor, &factor_div_l);
            if !p.weil_pairing(&q, &factor).pow(&factor_div_l).is_one() {
                return (p, q);
            }
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "y² = x³ + ({})·x + ({})", self.a, self.b)
    }
}

impl fmt::Debug for Curve {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Affine point or the identity.
#[derive(Clone)]
pub struct Point {
    curve: Arc<Curve>,
    coords: Option<(Gf, Gf)>,
}

impl Point {
    pub fn identity(curve: &Arc<Curve>) -> Point {
        Point {
            curve: curve.clone(),
            coords: None,
        }
    }

    pub fn new(curve: Arc<Curve>, x: Gf, y: Gf) -> Point {
        Point {
            curve: curve,
            coords: Some((x, y)),
        }
    }

    pub fn curve(&self) -> &Arc<Curve> {
        &self.curve
    }

    pub fn is_identity(&self) -> bool {
        self.coords.is_none()
    }

    pub fn x(&self) -> Option<&Gf> {
        self.coords.as_ref().map(|c| &c.0)
    }

    pub fn y(&self) -> Option<&Gf> {
        self.coords.as_ref().map(|c| &c.1)
    }

    fn xy(&self) -> (&Gf, &Gf) {
        match self.coords {
            Some(ref c) => (&c.0, &c.1),
            None => unreachable!("the identity has no affine coordinates"),
        }
    }

    /// Whether the coordinates satisfy the curve equation.
    pub fn check(&self) -> bool {
        match self.coords {
            None => true,
            Some((ref x, ref y)) => {
                y.square() == &(&(&x.square() + &self.curve.a) * x) + &self.curve.b
            }
        }
    }

    /// The ψ endomorphism (x, y) → (−x, y·i) used for producing the
    /// second basis point from the first.
    pub fn psi(&self) -> Point {
        match self.coords {
            None => self.clone(),
            Some((ref x, ref y)) => {
                let i = Gf::i(x.modulus());
                Point::new(self.curve.clone(), -x, y * &i)
            }
        }
    }

    pub fn byte_size(p: &Z) -> usize {
        1 + 4 * p.byte_length()
    }

    /// One tag byte (0 identity, 1 affine) followed by two field
    /// elements; the identity keeps the full width with zero bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let p = self.curve.prime();
        match self.coords {
            None => vec![0u8; Point::byte_size(p)],
            Some((ref x, ref y)) => {
                let mut out = Vec::with_capacity(Point::byte_size(p));
                out.push(1);
                out.extend_from_slice(&x.serialize());
                out.extend_from_slice(&y.serialize());
                out
            }
        }
    }

    /// Validates the tag and the widths, not the curve equation.
    pub fn unserialize(curve: &Arc<Curve>, raw: &[u8]) -> Option<Point> {
        let p = curve.prime();
        if raw.len() != Point::byte_size(p) {
            return None;
        }
        match raw[0] {
            0 => Some(Point::identity(curve)),
            1 => {
                let half = (raw.len() - 1) / 2;
                let x = Gf::unserialize(p, &raw[1..1 + half])?;
                let y = Gf::unserialize(p, &raw[1 + half..])?;
                Some(Point::new(curve.clone(), x, y))
            }
            _ => None,
        }
    }

    /// Evaluate at Q the line through `self` and `r` (tangent when they
    /// coincide, vertical when they are opposite); Miller-loop helper.
    pub fn line(&self, r: &Point, q: &Point) -> Gf {
        let p = self.curve.prime();

        if q.is_identity() {
            return Gf::one(p);
        }

        let (qx, qy) = q.xy();

        if self.is_identity() || r.is_identity() {
            if self == r {
                return Gf::one(p);
            } else if self.is_identity() {
                return qx - r.xy().0;
            } else {
                return qx - self.xy().0;
            }
        }

        let (sx, sy) = self.xy();
        let (rx, ry) = r.xy();

        if self != r {
            if sx == rx {
                qx - sx
            } else {
                let slope = &(ry - sy) / &(rx - sx);
                &(qy - sy) - &(&slope * &(qx - sx))
            }
        } else if sy.is_zero() {
            qx - sx
        } else {
            let slope = &(&(&sx.square() * 3) + &self.curve.a) / &(sy * 2);
            &(qy - sy) - &(&slope * &(qx - sx))
        }
    }

    /// Miller's algorithm: f_{n,self}(q) by double-and-add over the bits
    /// of |n|.
    pub fn miller(&self, q: &Point, n: &Z) -> Gf {
        let p = self.curve.prime();

        if q.is_identity() || n.is_zero() {
            return Gf::zero(p);
        }

        let negative = n.is_negative();
        let n = n.abs();

        let mut t = Gf::one(p);
        let mut v = self.clone();

        let mut i = n.bit_length() as isize - 2;
        while i >= 0 {
            let s = &v + &v;
            let num = v.line(&v, q);
            let den = s.line(&-&s, q);
            t = &t.square() * &(&num / &den);
            v = s;
            if n.bit(i as usize) {
                let s = &v + self;
                let num = v.line(self, q);
                let den = s.line(&-&s, q);
                t = &t * &(&num / &den);
                v = s;
            }
            i -= 1;
        }

        if negative {
            let den = v.line(&-&v, q);
            t = (&t * &den).inverse();
        }

        t
    }

    /// Weil pairing e_n(self, q). Degenerate inputs (identity, equal
    /// points, or points outside the n-torsion) give 1.
    pub fn weil_pairing(&self, q: &Point, n: &Z) -> Gf {
        let p = self.curve.prime();

        if !(self * n).is_identity() || !(q * n).is_identity() {
            return Gf::one(p);
        }
        if self == q || self.is_identity() || q.is_identity() {
            return Gf::one(p);
        }

        let denominator = q.miller(self, n);
        if denominator.is_zero() {
            return Gf::one(p);
        }

        let mut numerator = self.miller(q, n);
        if n.bit(0) {
            numerator = -&numerator;
        }
        &numerator / &denominator
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Point) -> bool {
        match (&self.coords, &other.coords) {
            (&None, &None) => true,
            (&Some(ref a), &Some(ref b)) => a.0 == b.0 && a.1 == b.1,
            _ => false,
        }
    }
}

impl<'a> Neg for &'a Point {
    type Output = Point;
    fn neg(self) -> Point {
        match self.coords {
            None => self.clone(),
            Some((ref x, ref y)) => Point::new(self.curve.clone(), x.clone(), -y),
        }
    }
}

impl<'a, 'b> Add<&'b Point> for &'a Point {
    type Output = Point;

    fn add(self, other: &'b Point) -> Point {
        if self.is_identity() {
            return other.clone();
        }
        if other.is_identity() {
            return self.clone();
        }

        let (x1, y1) = self.xy();
        let (x2, y2) = other.xy();

        if x1 == x2 {
            if y1 == &-y2 {
                return Point::identity(&self.curve);
            }
            // doubling
            let slope = &(&(&x1.square() * 3) + &self.curve.a) / &(y1 * 2);
            let x3 = &(&slope.square() - x1) - x1;
            let y3 = &(&slope * &(x1 - &x3)) - y1;
            Point::new(self.curve.clone(), x3, y3)
        } else {
            let slope = &(y2 - y1) / &(x2 - x1);
            let x3 = &(&slope.square() - x1) - x2;
            let y3 = &(&slope * &(x1 - &x3)) - y1;
            Point::new(self.curve.clone(), x3, y3)
        }
    }
}

impl<'a, 'b> Sub<&'b Point> for &'a Point {
    type Output = Point;
    fn sub(self, other: &'b Point) -> Point {
        self + &-other
    }
}

impl<'a, 'b> Mul<&'b Z> for &'a Point {
    type Output = Point;

    /// Montgomery ladder over the bits of `n`, most significant first.
    /// Negative scalars are not supported; callers reduce first.
    fn mul(self, n: &'b Z) -> Point {
        let mut r0 = Point::identity(&self.curve);
        let mut r1 = self.clone();

        let mut i = n.bit_length() as isize - 1;
        while i >= 0 {
            if n.bit(i as usize) {
                r0 = &r0 + &r1;
                r1 = &r1 + &r1;
            } else {
                r1 = &r1 + &r0;
                r0 = &r0 + &r0;
            }
            i -= 1;
        }
        r0
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.coords {
            None => write!(f, "identity ∈ {}", self.curve),
            Some((ref x, ref y)) => write!(f, "({}, {}) ∈ {}", x, y, self.curve),
        }
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use params::SidhParams;

    fn toy() -> SidhParams {
        SidhParams::side_a()
    }

    #[test]
    fn base_points_lie_on_the_curve() {
        let params = toy();
        assert!(params.p_gen().check());
        assert!(params.q_gen().check());
        assert!(params.p_peer().check());
        assert!(params.q_peer().check());
    }

    #[test]
    fn psi_maps_onto_the_curve() {
        let params = toy();
        let q = params.p_gen().psi();
        assert!(q.check());
        assert_eq!(q, *params.q_gen());
    }

    #[test]
    fn base_point_orders() {
        let a = toy();
        let b = a.other_side();

        // order exactly 2⁶³
        assert!((a.p_gen() * a.le()).is_identity());
        assert!(!(a.p_gen() * a.lem1()).is_identity());

        // order exactly 3⁴¹
        assert!((b.p_gen() * b.le()).is_identity());
        assert!(!(b.p_gen() * b.lem1()).is_identity());
    }

    #[test]
    fn scalar_multiplication_distributes() {
        let params = toy();
        let p = params.p_gen();

        let n: Z = "2575042839726612324".parse().unwrap();
        let m: Z = "8801426132580632841".parse().unwrap();

        let lhs = &(p * &n) + &(p * &m);
        let rhs = p * &(&n + &m);
        assert_eq!(lhs, rhs);

        let nested = &(p * &n) * &m;
        let flat = p * &(&n * &m);
        assert_eq!(nested, flat);
    }

    #[test]
    fn small_scalars_match_repeated_addition() {
        let params = toy();
        let p = params.p_gen();

        assert!((p * &Z::zero()).is_identity());
        assert_eq!(&(p * &Z::from(1u32)), p);
        assert_eq!(p * &Z::from(2u32), p + p);
        assert_eq!(p * &Z::from(3u32), &(p + p) + p);
        assert!((&(p + p) - &(p + p)).is_identity());
    }

    #[test]
    fn addition_with_the_identity() {
        let params = toy();
        let p = params.p_gen();
        let identity = Point::identity(p.curve());

        assert_eq!(&(p + &identity), p);
        assert_eq!(&(&identity + p), p);
        assert!((&identity + &identity).is_identity());
        assert!((p + &-p).is_identity());
    }

    #[test]
    fn weil_pairing_detects_independence() {
        let params = toy();
        let p = params.p_gen();
        let q = params.q_gen();

        let pairing = p.weil_pairing(q, params.le());
        // ζ is an ℓᵉ-th root of unity of full order for a basis
        assert!(pairing.pow(params.le()).is_one());
        assert!(!pairing.pow(params.lem1()).is_one());

        // e(P, P) and identity inputs are degenerate
        assert!(p.weil_pairing(p, params.le()).is_one());
        let identity = Point::identity(p.curve());
        assert!(p.weil_pairing(&identity, params.le()).is_one());
    }

    #[test]
    fn curve_serialization_round_trips() {
        let params = toy();
        let curve = params.curve();
        let raw = curve.serialize();
        assert_eq!(raw.len(), Curve::byte_size(params.prime()));
        let back = Curve::unserialize(params.prime(), &raw).unwrap();
        assert_eq!(&back, &**curve);
        assert!(Curve::unserialize(params.prime(), &raw[..raw.len() - 1]).is_none());
    }

    #[test]
    fn point_serialization_round_trips() {
        let params = toy();
        let p = params.p_gen();

        let raw = p.serialize();
        assert_eq!(raw.len(), Point::byte_size(params.prime()));
        let back = Point::unserialize(p.curve(), &raw).unwrap();
        assert_eq!(&back, p);

        let identity = Point::identity(p.curve());
        let raw = identity.serialize();
        assert_eq!(raw.len(), Point::byte_size(params.prime()));
        assert!(Point::unserialize(p.curve(), &raw).unwrap().is_identity());

        let mut bad_tag = p.serialize();
        bad_tag[0] = 7;
        assert!(Point::unserialize(p.curve(), &bad_tag).is_none());
    }

    #[test]
    fn basis_search_finds_independent_generators() {
        let params = toy();
        let (p, q) = Curve::basis(
            params.curve(),
            params.l(),
            params.e(),
            params.other_side().l(),
            params.other_side().e(),
            params.cofactor(),
        );

        assert!((&p * params.le()).is_identity());
        assert!(!(&p * params.lem1()).is_identity());
        assert!((&q * params.le()).is_identity());

        let pairing = p.weil_pairing(&q, params.le());
        assert!(!pairing.pow(params.lem1()).is_one());
    }

    #[test]
    fn random_points_satisfy_the_equation() {
        let params = toy();
        for _ in 0..4 {
            let point = Curve::random_point(params.curve());
            assert!(point.check());
            assert!(!point.is_identity());
        }
    }
}
