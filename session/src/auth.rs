use common_types::{AuthKind, MacKind};
use sidh::{SidhKey, SidhKeyBasic, SidhParams};
use symmetric::{fixed_time_eq, new_mac, Mac};

/// Challenge–response peer authentication.
///
/// The requester holds the peer's public key (with its hash seed) and
/// sends a fresh ephemeral public; the signer recovers the SIDH shared
/// secret between its static key and the ephemeral, and answers with
/// `HMAC(hash_seed, message || secret)`. The requester computed the same
/// tag at request time and compares in constant time.
pub trait Auth {
    fn kind(&self) -> AuthKind;

    fn set_request_key(&mut self, raw: &[u8]) -> bool;
    fn set_sign_key(&mut self, raw: &[u8]) -> bool;

    fn can_request(&self) -> bool;
    fn can_sign(&self) -> bool;

    /// Returns the serialized ephemeral public key to send along with
    /// `message`; empty when no request key is installed.
    fn request(&mut self, message: &[u8]) -> Vec<u8>;

    /// Returns the reply tag for a received request; empty on failure.
    fn sign(&mut self, message: &[u8], request: &[u8]) -> Vec<u8>;

    /// Whether `reply` matches the tag stored by `request`.
    fn verify(&self, reply: &[u8]) -> bool;
}

pub fn new_auth(kind: AuthKind) -> Box<dyn Auth> {
    match kind {
        AuthKind::SidhexSha512 => Box::new(SidhexAuth::new()),
    }
}

/// A fresh long-term key for the given method. Static keys live on side
/// A; the requester's ephemerals take the opposite side.
pub fn generate_auth_key(kind: AuthKind) -> SidhKey {
    match kind {
        AuthKind::SidhexSha512 => {
            let mut key = SidhKey::new(SidhParams::side_a());
            key.generate();
            key
        }
    }
}

pub struct SidhexAuth {
    mac: Box<dyn Mac>,
    request_key: SidhKey,
    sign_key: SidhKey,
    secret: Vec<u8>,
}

impl SidhexAuth {
    pub fn new() -> SidhexAuth {
        SidhexAuth {
            mac: new_mac(MacKind::HmacSha512),
            request_key: SidhKey::new(SidhParams::side_a()),
            sign_key: SidhKey::new(SidhParams::side_a()),
            secret: Vec::new(),
        }
    }

    fn tag(&mut self, message: &[u8], shared: &[u8]) -> Vec<u8> {
        self.mac.init();
        self.mac.update(message);
        self.mac.update(shared);
        self.mac.digest()
    }
}

impl Auth for SidhexAuth {
    fn kind(&self) -> AuthKind {
        AuthKind::SidhexSha512
    }

    fn set_request_key(&mut self, raw: &[u8]) -> bool {
        self.request_key.import(raw) && self.request_key.has_public()
    }

    fn set_sign_key(&mut self, raw: &[u8]) -> bool {
        self.sign_key.import(raw) && self.sign_key.has_private()
    }

    fn can_request(&self) -> bool {
        self.request_key.has_public()
    }

    fn can_sign(&self) -> bool {
        self.sign_key.has_private()
    }

    fn request(&mut self, message: &[u8]) -> Vec<u8> {
        if !self.can_request() {
            return Vec::new();
        }

        let mut ephemeral = SidhKeyBasic::new(self.request_key.params().other_side());
        ephemeral.generate();

        let shared = ephemeral.compute_shared_secret(self.request_key.basic());
        if shared.is_empty() {
            return Vec::new();
        }

        let seed = self.request_key.hash_seed().to_vec();
        self.mac.set_key(&seed);
        self.secret = self.tag(message, &shared);

        ephemeral.export_public()
    }

    fn sign(&mut self, message: &[u8], request: &[u8]) -> Vec<u8> {
        if !self.can_sign() {
            return Vec::new();
        }

        let mut ephemeral = SidhKeyBasic::new(self.sign_key.params().other_side());
        if !ephemeral.import_public(request) {
            return Vec::new();
        }

        let shared = self.sign_key.compute_shared_secret(&ephemeral);
        if shared.is_empty() {
            return Vec::new();
        }

        let seed = self.sign_key.hash_seed().to_vec();
        self.mac.set_key(&seed);
        self.tag(message, &shared)
    }

    fn verify(&self, reply: &[u8]) -> bool {
        !self.secret.is_empty()
            && reply.len() == self.secret.len()
            && fixed_time_eq(reply, &self.secret)
    }
}
