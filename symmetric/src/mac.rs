use common_types::MacKind;

use hmac::{Hmac, Mac as HmacImpl};
use sha2::{Sha256, Sha512};

/// Keyed message authentication with a streaming interface.
///
/// `digest` finishes the running computation and resets the state, so the
/// next `update` starts a fresh message under the same key.
pub trait Mac {
    fn kind(&self) -> MacKind;

    /// Digest size in bytes.
    fn size(&self) -> usize;

    fn set_key(&mut self, key: &[u8]);

    fn init(&mut self);
    fn update(&mut self, data: &[u8]);
    fn digest(&mut self) -> Vec<u8>;

    fn compute(&mut self, data: &[u8]) -> Vec<u8> {
        self.init();
        self.update(data);
        self.digest()
    }
}

pub fn new_mac(kind: MacKind) -> Box<dyn Mac> {
    match kind {
        MacKind::HmacSha256 => Box::new(HmacSha256::new()),
        MacKind::HmacSha512 => Box::new(HmacSha512::new()),
    }
}

pub struct HmacSha256 {
    key: Vec<u8>,
    ctx: Option<Hmac<Sha256>>,
}

impl HmacSha256 {
    pub fn new() -> Self {
        HmacSha256 {
            key: Vec::new(),
            ctx: None,
        }
    }
}

impl Mac for HmacSha256 {
    fn kind(&self) -> MacKind {
        MacKind::HmacSha256
    }

    fn size(&self) -> usize {
        32
    }

    fn set_key(&mut self, key: &[u8]) {
        self.key = key.to_vec();
        self.ctx = None;
    }

    fn init(&mut self) {
        self.ctx = Some(Hmac::new(&self.key));
    }

    fn update(&mut self, data: &[u8]) {
        if self.ctx.is_none() {
            self.init();
        }
        if let Some(ref mut ctx) = self.ctx {
            ctx.input(data);
        }
    }

    fn digest(&mut self) -> Vec<u8> {
        let ctx = match self.ctx.take() {
            Some(ctx) => ctx,
            None => Hmac::new(&self.key),
        };
        ctx.result().code().to_vec()
    }
}

pub struct HmacSha512 {
    key: Vec<u8>,
    ctx: Option<Hmac<Sha512>>,
}

impl HmacSha512 {
    pub fn new() -> Self {
        HmacSha512 {
            key: Vec::new(),
            ctx: None,
        }
    }
}

impl Mac for HmacSha512 {
    fn kind(&self) -> MacKind {
        MacKind::HmacSha512
    }

    fn size(&self) -> usize {
        64
    }

    fn set_key(&mut self, key: &[u8]) {
        self.key = key.to_vec();
        self.ctx = None;
    }

    fn init(&mut self) {
        self.ctx = Some(Hmac::new(&self.key));
    }

    fn update(&mut self, data: &[u8]) {
        if self.ctx.is_none() {
            self.init();
        }
        if let Some(ref mut ctx) = self.ctx {
            ctx.input(data);
        }
    }

    fn digest(&mut self) -> Vec<u8> {
        let ctx = match self.ctx.take() {
            Some(ctx) => ctx,
            None => Hmac::new(&self.key),
        };
        ctx.result().code().to_vec()
    }
}
