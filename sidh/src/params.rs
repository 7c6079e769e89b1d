use std::str::FromStr;
use std::sync::Arc;

use gf::Gf;
use num::Z;
use weierstrass::{Curve, Point};

/// Which of the two torsion subgroups a participant works in. Peers must
/// use opposite sides of the same parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

/// A full two-sided parameter set: the prime, the base curve, torsion
/// bases for both sides and the per-side isogeny-walk strategies.
#[derive(Clone)]
pub struct ParamSet {
    la: u32,
    ea: u32,
    lb: u32,
    eb: u32,
    f: u32,
    prime: Arc<Z>,
    curve: Arc<Curve>,
    pa: Point,
    qa: Point,
    pb: Point,
    qb: Point,
    lea: Z,
    leam1: Z,
    leb: Z,
    lebm1: Z,
    strategy_a: Arc<Vec<usize>>,
    strategy_b: Arc<Vec<usize>>,
}

impl ParamSet {
    /// Assembles and validates a parameter set. The modulus must be prime
    /// and ≡ 3 (mod 4); violations abort, they can never come from peer
    /// input.
    pub fn new(
        la: u32,
        ea: u32,
        lb: u32,
        eb: u32,
        f: u32,
        prime: Arc<Z>,
        curve: Arc<Curve>,
        pa: Point,
        qa: Point,
        pb: Point,
        qb: Point,
    ) -> ParamSet {
        assert!(Gf::check_modulus(&prime), "modulus must be prime and 3 mod 4");
        assert!(ea >= 1 && eb >= 1);

        let zla = Z::from(la);
        let zlb = Z::from(lb);

        ParamSet {
            la: la,
            ea: ea,
            lb: lb,
            eb: eb,
            f: f,
            prime: prime,
            curve: curve,
            pa: pa,
            qa: qa,
            pb: pb,
            qb: qb,
            lea: zla.pow(ea),
            leam1: zla.pow(ea - 1),
            leb: zlb.pow(eb),
            lebm1: zlb.pow(eb - 1),
            strategy_a: Arc::new(balanced_strategy(ea)),
            strategy_b: Arc::new(balanced_strategy(eb)),
        }
    }

    /// The toy set embedded in this library:
    /// p = 2⁶³·3⁴¹·11 − 1, base curve y² = x³ + x.
    pub fn toy() -> ParamSet {
        let prime: Z = Z::from_str("3700444163740528325594401040305817124863")
            .expect("malformed modulus literal");
        let prime = Arc::new(prime);

        let curve = Arc::new(Curve::new(Gf::one(&prime), Gf::zero(&prime)));

        let pa = Point::new(
            curve.clone(),
            Gf::from_dec(
                &prime,
                "2524646701852396349308425328218203569693",
                "2374093068336250774107936421407893885897",
            ),
            Gf::from_dec(
                &prime,
                "1309099413211767078055232768460483417201",
                "1944869260414574206229153243510104781725",
            ),
        );
        let pb = Point::new(
            curve.clone(),
            Gf::from_dec(
                &prime,
                "1747407329595165241335131647929866065215",
                "1556716033657530876728525059284431761206",
            ),
            Gf::from_dec(
                &prime,
                "1975912874247458572654720717155755005566",
                "3456956202852028835529419995475915388483",
            ),
        );
        let qa = pa.psi();
        let qb = pb.psi();

        ParamSet::new(2, 63, 3, 41, 11, prime, curve, pa, qa, pb, qb)
    }
}

lazy_static! {
    static ref TOY: Arc<ParamSet> = Arc::new(ParamSet::toy());
}

/// One side's view of a parameter set.
#[derive(Clone)]
pub struct SidhParams {
    set: Arc<ParamSet>,
    side: Side,
}

impl SidhParams {
    pub fn new(set: Arc<ParamSet>, side: Side) -> SidhParams {
        SidhParams {
            set: set,
            side: side,
        }
    }

    /// Side A of the embedded toy set.
    pub fn side_a() -> SidhParams {
        SidhParams::new(TOY.clone(), Side::A)
    }

    /// Side B of the embedded toy set.
    pub fn side_b() -> SidhParams {
        SidhParams::new(TOY.clone(), Side::B)
    }

    /// The mirror view of the same set.
    pub fn other_side(&self) -> SidhParams {
        let side = match self.side {
            Side::A => Side::B,
            Side::B => Side::A,
        };
        SidhParams::new(self.set.clone(), side)
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn l(&self) -> u32 {
        match self.side {
            Side::A => self.set.la,
            Side::B => self.set.lb,
        }
    }

    pub fn e(&self) -> u32 {
        match self.side {
            Side::A => self.set.ea,
            Side::B => self.set.eb,
        }
    }

    /// ℓᵉ for this side.
    pub fn le(&self) -> &Z {
        match self.side {
            Side::A => &self.set.lea,
            Side::B => &self.set.leb,
        }
    }

    /// ℓᵉ⁻¹ for this side.
    pub fn lem1(&self) -> &Z {
        match self.side {
            Side::A => &self.set.leam1,
            Side::B => &self.set.lebm1,
        }
    }

    pub fn prime(&self) -> &Arc<Z> {
        &self.set.prime
    }

    pub fn curve(&self) -> &Arc<Curve> {
        &self.set.curve
    }

    pub fn p_gen(&self) -> &Point {
        match self.side {
            Side::A => &self.set.pa,
            Side::B => &self.set.pb,
        }
    }

    pub fn q_gen(&self) -> &Point {
        match self.side {
            Side::A => &self.set.qa,
            Side::B => &self.set.qb,
        }
    }

    pub fn p_peer(&self) -> &Point {
        match self.side {
            Side::A => &self.set.pb,
            Side::B => &self.set.pa,
        }
    }

    pub fn q_peer(&self) -> &Point {
        match self.side {
            Side::A => &self.set.qb,
            Side::B => &self.set.qa,
        }
    }

    pub fn cofactor(&self) -> u32 {
        self.set.f
    }

    pub fn strategy(&self) -> &[usize] {
        match self.side {
            Side::A => &self.set.strategy_a,
            Side::B => &self.set.strategy_b,
        }
    }
}

/// The balanced walk schedule: split every subtree of height h at ⌊h/2⌋.
/// Index 0 is unused and strategy[1] = 1 is the single-isogeny base case.
pub fn balanced_strategy(e: u32) -> Vec<usize> {
    let mut strategy = Vec::with_capacity(e as usize + 1);
    for h in 0..=(e as usize) {
        strategy.push(if h < 2 { h } else { h / 2 });
    }
    strategy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toy_set_is_consistent() {
        let a = SidhParams::side_a();
        let b = SidhParams::side_b();

        assert_eq!(a.l(), 2);
        assert_eq!(a.e(), 63);
        assert_eq!(b.l(), 3);
        assert_eq!(b.e(), 41);

        assert_eq!(a.le(), &"9223372036854775808".parse().unwrap());
        assert_eq!(a.lem1(), &"4611686018427387904".parse().unwrap());
        assert_eq!(b.le(), &"36472996377170786403".parse().unwrap());
        assert_eq!(b.lem1(), &"12157665459056928801".parse().unwrap());

        // p = 2⁶³ · 3⁴¹ · 11 − 1
        let product = &(&(a.le() * b.le()) * &Z::from(11u32)) - &Z::one();
        assert_eq!(&product, &**a.prime());
    }

    #[test]
    fn sides_mirror_each_other() {
        let a = SidhParams::side_a();
        let b = a.other_side();
        assert_eq!(b.side(), Side::B);
        assert_eq!(b.other_side().side(), Side::A);
        assert_eq!(a.p_peer(), b.p_gen());
        assert_eq!(a.q_gen(), b.q_peer());
    }

    #[test]
    fn strategy_shape() {
        let s = balanced_strategy(63);
        assert_eq!(s.len(), 64);
        assert_eq!(s[0], 0);
        assert_eq!(s[1], 1);
        assert_eq!(s[2], 1);
        assert_eq!(s[63], 31);
        for h in 2..64 {
            assert!(s[h] >= 1 && s[h] < h);
        }
    }

    #[test]
    #[should_panic]
    fn bad_modulus_is_rejected() {
        // 17 ≡ 1 (mod 4)
        let prime = Arc::new(Z::from(17u32));
        let curve = Arc::new(Curve::new(Gf::one(&prime), Gf::zero(&prime)));
        let identity = Point::identity(&curve);
        ParamSet::new(
            2,
            2,
            3,
            1,
            1,
            prime,
            curve.clone(),
            identity.clone(),
            identity.clone(),
            identity.clone(),
            identity,
        );
    }
}
