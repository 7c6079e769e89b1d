use std::sync::Arc;

use gf::Gf;
use num::Z;
use weierstrass::{Curve, Point};

/// A degree-ℓ isogeny (ℓ ∈ {2, 3}) with kernel ⟨generator⟩, realized by
/// Vélu's formulas.
#[derive(Clone)]
pub struct SmallIsogeny {
    image: Arc<Curve>,
    generator: Point,
    degree: u32,
}

impl SmallIsogeny {
    /* Codomain of E/⟨G⟩ in short Weierstrass form: with the power sums
       σ, σ₂ of the abscissas of the nontrivial kernel points,
         t = a·(ℓ−1) + 3·(σ² − 2σ₂)        (σ² collapses for ℓ = 2)
         w = 2b·(ℓ−1) + 3aσ + 5·(σ³ − 3σσ₂)
       and the image is y² = x³ + (a − 5t)x + (b − 7w).

       `None` when the generator is the identity, which a peer can force
       by handing over degenerate public-key points; callers turn that
       into a key-agreement failure. */
    pub fn new(curve: &Arc<Curve>, generator: Point, degree: u32) -> Option<SmallIsogeny> {
        let a = curve.a();
        let b = curve.b();

        let gx = match generator.x() {
            Some(x) => x.clone(),
            None => return None,
        };

        let mut t = a * (degree - 1);
        let mut w = &(b * (degree - 1)) * 2;

        match degree {
            2 => {
                let ss = gx.square();
                t = &t + &(&ss * 3);
                w = &(&w + &(&(a * &gx) * 3)) + &(&(&ss * &gx) * 5);
            }
            3 => {
                let s = &gx * 2;
                let s2 = gx.square();
                let ss = &s2 * 4;
                t = &t + &(&(&ss - &(&s2 * 2)) * 3);
                w = &(&w + &(&(a * &s) * 3)) + &(&(&(&ss * &s) - &(&(&s * &s2) * 3)) * 5);
            }
            _ => panic!("unsupported isogeny degree {}", degree),
        }

        let image = Curve::new(a - &(&t * 5), b - &(&w * 7));
        Some(SmallIsogeny {
            image: Arc::new(image),
            generator: generator,
            degree: degree,
        })
    }

    pub fn image(&self) -> &Arc<Curve> {
        &self.image
    }

    pub fn generator(&self) -> &Point {
        &self.generator
    }

    pub fn degree(&self) -> u32 {
        self.degree
    }

    /// Vélu evaluation: accumulate, over the nontrivial kernel points kG,
    /// the differences x(P + kG) − x(kG) and y(P + kG) − y(kG) onto the
    /// coordinates of P. Points of the kernel map to the identity.
    pub fn apply(&self, source: &Point) -> Point {
        if source.is_identity() {
            return Point::identity(&self.image);
        }

        let mut x = match source.x() {
            Some(x) => x.clone(),
            None => return Point::identity(&self.image),
        };
        let mut y = match source.y() {
            Some(y) => y.clone(),
            None => return Point::identity(&self.image),
        };

        let mut from_kernel = self.generator.clone();
        for _ in 0..self.degree - 1 {
            let sum = source + &from_kernel;
            if sum.is_identity() {
                return Point::identity(&self.image);
            }
            let (sum_x, sum_y) = (sum.x(), sum.y());
            let (ker_x, ker_y) = (from_kernel.x(), from_kernel.y());
            match (sum_x, sum_y, ker_x, ker_y) {
                (Some(sx), Some(sy), Some(kx), Some(ky)) => {
                    x = &x + &(sx - kx);
                    y = &y + &(sy - ky);
                }
                _ => return Point::identity(&self.image),
            }
            from_kernel = &from_kernel + &self.generator;
        }

        Point::new(self.image.clone(), x, y)
    }
}

/// A degree-ℓᵉ isogeny as a chain of e small ones.
#[derive(Clone)]
pub struct Isogeny {
    degree_base: u32,
    degree_exp: u32,
    steps: Vec<SmallIsogeny>,
}

impl Isogeny {
    /// Naive construction: at step i the kernel generator is
    /// [ℓ^(e−i−1)]·R with R pushed through every previous step. Costs
    /// O(e²) scalar multiplications. `None` when a step's kernel
    /// degenerates to the identity, i.e. the generator's order does not
    /// reach ℓᵉ.
    pub fn new(generator: &Point, base: u32, exp: u32) -> Option<Isogeny> {
        assert!(exp >= 1, "isogeny exponent must be positive");

        let zbase = Z::from(base);
        let mut curve = generator.curve().clone();
        let mut r = generator.clone();
        let mut steps = Vec::with_capacity(exp as usize);

        for i in 0..exp {
            let kernel = &r * &zbase.pow(exp - i - 1);
            let step = SmallIsogeny::new(&curve, kernel, base)?;
            curve = step.image().clone();
            if i < exp - 1 {
                r = step.apply(&r);
            }
            steps.push(step);
        }

        Some(Isogeny {
            degree_base: base,
            degree_exp: exp,
            steps: steps,
        })
    }

    /// Strategy-driven construction. `strategy[h]` gives the split point
    /// for a subtree of height h; the traversal balances multiplications
    /// by ℓ against pushes of stacked points through finished steps,
    /// costing O(e·log e) of each. Fails like [`Isogeny::new`] on
    /// degenerate generators.
    pub fn with_strategy(
        generator: &Point,
        base: u32,
        exp: u32,
        strategy: &[usize],
    ) -> Option<Isogeny> {
        assert!(exp >= 1, "isogeny exponent must be positive");
        assert!(
            strategy.len() > exp as usize,
            "strategy array must cover heights up to the exponent"
        );

        let zbase = Z::from(base);
        let mut points: Vec<Point> = vec![generator.clone()];
        let mut heights: Vec<usize> = vec![exp as usize];
        let mut steps = Vec::with_capacity(exp as usize);

        while !points.is_empty() {
            let mut tmp = points[points.len() - 1].clone();
            let mut h = heights[heights.len() - 1];
            let mut split = strategy[h];

            while h > 1 {
                for _ in 0..h - split {
                    tmp = &tmp * &zbase;
                }
                points.push(tmp.clone());
                heights.push(split);
                h = split;
                split = strategy[h];
            }

            let kernel = match points.pop() {
                Some(point) => point,
                None => break,
            };
            heights.pop();

            let domain = kernel.curve().clone();
            let step = SmallIsogeny::new(&domain, kernel, base)?;

            for point in points.iter_mut() {
                *point = step.apply(point);
            }
            for height in heights.iter_mut() {
                *height -= 1;
            }

            steps.push(step);
        }

        Some(Isogeny {
            degree_base: base,
            degree_exp: exp,
            steps: steps,
        })
    }

    pub fn degree(&self) -> Z {
        Z::from(self.degree_base).pow(self.degree_exp)
    }

    /// The final codomain curve, the only one public-key users see.
    pub fn image(&self) -> &Arc<Curve> {
        match self.steps.last() {
            Some(step) => step.image(),
            None => unreachable!("an isogeny chain is never empty"),
        }
    }

    /// Left-to-right composition of the small steps.
    pub fn apply(&self, source: &Point) -> Point {
        let mut result = source.clone();
        for step in &self.steps {
            result = step.apply(&result);
        }
        result
    }
}
