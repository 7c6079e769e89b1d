use std::cell::RefCell;

use crypto::chacha20::ChaCha20 as ChaChaCore;
use crypto::symmetriccipher::SynchronousStreamCipher;
use rand::rngs::OsRng;
use rand::RngCore;

// Per-thread generator: a ChaCha20 keystream seeded once from the OS
// entropy source. Seeding failure is fatal.
thread_local! {
    static GENERATOR: RefCell<Generator> = RefCell::new(Generator::seeded());
}

struct Generator {
    core: ChaChaCore,
}

impl Generator {
    fn seeded() -> Self {
        let mut seed = [0u8; 40];
        let mut os = OsRng::new().expect("cannot open the OS entropy source");
        os.fill_bytes(&mut seed);
        Generator {
            core: ChaChaCore::new(&seed[..32], &seed[32..]),
        }
    }

    fn fill(&mut self, out: &mut [u8]) {
        if out.is_empty() {
            return;
        }
        let zeros = vec![0u8; out.len()];
        self.core.process(&zeros, out);
    }
}

pub fn random_bytes(out: &mut [u8]) {
    GENERATOR.with(|gen| gen.borrow_mut().fill(out));
}

pub fn random_vec(size: usize) -> Vec<u8> {
    let mut result = vec![0u8; size];
    random_bytes(&mut result);
    result
}

pub fn random_u32() -> u32 {
    let mut buf = [0u8; 4];
    random_bytes(&mut buf);
    u32::from(buf[0]) | u32::from(buf[1]) << 8 | u32::from(buf[2]) << 16 | u32::from(buf[3]) << 24
}

/// Uniform value in `[0, limit)` by rejection sampling.
pub fn random_u32_below(limit: u32) -> u32 {
    assert!(limit > 0);
    let zone = u32::max_value() - u32::max_value() % limit;
    loop {
        let candidate = random_u32();
        if candidate < zone {
            return candidate % limit;
        }
    }
}
