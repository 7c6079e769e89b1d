use std::fmt;
use std::ops::{Add, BitAnd, Div, Mul, Neg, Rem, Shl, Shr, Sub};
use std::str::FromStr;

use num_bigint::{BigInt, BigUint, ParseBigIntError, Sign};
use num_integer::Integer;
use num_traits::{One, Pow, Signed, ToPrimitive, Zero};

use symmetric::random::random_bytes;

/// Signed arbitrary-precision integer.
///
/// Thin facade over the bignum backend adding the modular toolbox the
/// curve arithmetic needs (floor modulus, inverse, square roots for
/// p ≡ 3 (mod 4), primality) and the fixed-width little-endian byte
/// serialization used by every wire format in this project.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Z(BigInt);

impl Z {
    pub fn zero() -> Self {
        Z(BigInt::zero())
    }

    pub fn one() -> Self {
        Z(BigInt::one())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.0.is_one()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn abs(&self) -> Z {
        Z(self.0.abs())
    }

    pub fn pow(&self, exp: u32) -> Z {
        Z(Pow::pow(&self.0, exp))
    }

    /// Non-negative remainder, `self mod m` with the sign of `m` (here
    /// always positive).
    pub fn modulo(&self, m: &Z) -> Z {
        Z(self.0.mod_floor(&m.0))
    }

    pub fn modpow(&self, exp: &Z, m: &Z) -> Z {
        Z(self.0.modpow(&exp.0, &m.0))
    }

    /// Modular inverse by the extended Euclidean algorithm; `None` when
    /// `gcd(self, m) != 1`.
    pub fn invmod(&self, m: &Z) -> Option<Z> {
        let a = self.0.mod_floor(&m.0);
        if a.is_zero() {
            return None;
        }

        let mut r0 = m.0.clone();
        let mut r1 = a;
        let mut t0 = BigInt::zero();
        let mut t1 = BigInt::one();

        while !r1.is_zero() {
            let q = &r0 / &r1;
            let r2 = &r0 - &q * &r1;
            r0 = ::std::mem::replace(&mut r1, r2);
            let t2 = &t0 - &q * &t1;
            t0 = ::std::mem::replace(&mut t1, t2);
        }

        if !r0.is_one() {
            return None;
        }
        Some(Z(t0.mod_floor(&m.0)))
    }

    /// Square root modulo a prime p ≡ 3 (mod 4), computed as
    /// `self^((p+1)/4)`. The caller checks `is_square_mod` first.
    pub fn sqrtmod(&self, p: &Z) -> Z {
        let exp = Z((&p.0 + BigInt::one()) >> 2);
        self.modpow(&exp, p)
    }

    /// Euler criterion: `self^((p-1)/2) == 1`. Zero is not counted as a
    /// square here.
    pub fn is_square_mod(&self, p: &Z) -> bool {
        let exp = Z((&p.0 - BigInt::one()) >> 1);
        self.modpow(&exp, p).is_one()
    }

    /// Miller–Rabin with random bases.
    pub fn probably_prime(&self, rounds: u32) -> bool {
        let two = Z::from(2u32);
        let three = Z::from(3u32);

        if self < &two {
            return false;
        }
        if self <= &three {
            return true;
        }
        if !self.bit(0) {
            return false;
        }

        for small in &[3u32, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37] {
            let q = Z::from(*small);
            if self == &q {
                return true;
            }
            if self.modulo(&q).is_zero() {
                return false;
            }
        }

        let n_minus_1 = self - &Z::one();
        let mut d = n_minus_1.clone();
        let mut s = 0usize;
        while !d.bit(0) {
            d = &d >> 1;
            s += 1;
        }

        let sample_limit = self - &three;
        for _ in 0..rounds {
            let a = &random_z_below(&sample_limit) + &two;
            let mut x = a.modpow(&d, self);
            if x.is_one() || x == n_minus_1 {
                continue;
            }
            let mut witness = true;
            for _ in 1..s {
                x = x.modpow(&two, self);
                if x == n_minus_1 {
                    witness = false;
                    break;
                }
            }
            if witness {
                return false;
            }
        }
        true
    }

    pub fn bit_length(&self) -> usize {
        self.0.bits() as usize
    }

    pub fn byte_length(&self) -> usize {
        (self.bit_length() + 7) / 8
    }

    pub fn bit(&self, index: usize) -> bool {
        self.0.bit(index as u64)
    }

    pub fn to_u32(&self) -> Option<u32> {
        self.0.to_u32()
    }

    /// Fixed-width little-endian bytes; values wider than `len` bytes are
    /// silently truncated to the low bytes.
    pub fn serialize(&self, len: usize) -> Vec<u8> {
        let (_, mut bytes) = self.0.to_bytes_le();
        bytes.resize(len, 0);
        bytes
    }

    /// Parse little-endian unsigned bytes.
    pub fn unserialize(raw: &[u8]) -> Z {
        Z(BigInt::from_biguint(Sign::Plus, BigUint::from_bytes_le(raw)))
    }
}

impl From<u32> for Z {
    fn from(v: u32) -> Z {
        Z(BigInt::from(v))
    }
}

impl From<u64> for Z {
    fn from(v: u64) -> Z {
        Z(BigInt::from(v))
    }
}

impl FromStr for Z {
    type Err = ParseBigIntError;

    fn from_str(s: &str) -> Result<Z, Self::Err> {
        BigInt::from_str(s).map(Z)
    }
}

impl fmt::Display for Z {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Z {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<'a, 'b> Add<&'b Z> for &'a Z {
    type Output = Z;
    fn add(self, other: &'b Z) -> Z {
        Z(&self.0 + &other.0)
    }
}

impl<'a, 'b> Sub<&'b Z> for &'a Z {
    type Output = Z;
    fn sub(self, other: &'b Z) -> Z {
        Z(&self.0 - &other.0)
    }
}

impl<'a, 'b> Mul<&'b Z> for &'a Z {
    type Output = Z;
    fn mul(self, other: &'b Z) -> Z {
        Z(&self.0 * &other.0)
    }
}

impl<'a, 'b> Div<&'b Z> for &'a Z {
    type Output = Z;
    fn div(self, other: &'b Z) -> Z {
        Z(&self.0 / &other.0)
    }
}

impl<'a, 'b> Rem<&'b Z> for &'a Z {
    type Output = Z;
    fn rem(self, other: &'b Z) -> Z {
        Z(&self.0 % &other.0)
    }
}

impl<'a> Neg for &'a Z {
    type Output = Z;
    fn neg(self) -> Z {
        Z(-&self.0)
    }
}

impl<'a> Shl<usize> for &'a Z {
    type Output = Z;
    fn shl(self, shift: usize) -> Z {
        Z(&self.0 << shift)
    }
}

impl<'a> Shr<usize> for &'a Z {
    type Output = Z;
    fn shr(self, shift: usize) -> Z {
        Z(&self.0 >> shift)
    }
}

impl<'a, 'b> BitAnd<&'b Z> for &'a Z {
    type Output = Z;
    fn bitand(self, other: &'b Z) -> Z {
        Z(&self.0 & &other.0)
    }
}

impl<'a> Mul<u32> for &'a Z {
    type Output = Z;
    fn mul(self, other: u32) -> Z {
        Z(&self.0 * BigInt::from(other))
    }
}

impl<'a> Add<u32> for &'a Z {
    type Output = Z;
    fn add(self, other: u32) -> Z {
        Z(&self.0 + BigInt::from(other))
    }
}

impl<'a> Sub<u32> for &'a Z {
    type Output = Z;
    fn sub(self, other: u32) -> Z {
        Z(&self.0 - BigInt::from(other))
    }
}

/// Uniform random integer of at most `bits` bits.
pub fn random_z(bits: usize) -> Z {
    let nbytes = (bits + 7) / 8;
    let mut buf = vec![0u8; nbytes];
    random_bytes(&mut buf);
    let extra = nbytes * 8 - bits;
    &Z::unserialize(&buf) >> extra
}

/// Uniform random integer in `[0, limit)` by rejection sampling.
pub fn random_z_below(limit: &Z) -> Z {
    let bits = limit.bit_length();
    loop {
        let candidate = random_z(bits);
        if &candidate < limit {
            return candidate;
        }
    }
}
