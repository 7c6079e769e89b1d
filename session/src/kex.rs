use base64;
use common_types::KexKind;
use sidh::{SidhKeyBasic, SidhParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KexRole {
    Server,
    Client,
}

/// One run of a key exchange. `init` emits the local contribution,
/// `fini` digests the peer's and returns the session key; an empty
/// session key signals failure.
pub trait Kex {
    fn kind(&self) -> KexKind;
    fn init(&mut self) -> String;
    fn fini(&mut self, peer: &str) -> Vec<u8>;
}

pub fn new_kex(kind: KexKind, role: KexRole) -> Box<dyn Kex> {
    match kind {
        KexKind::Sidhex => Box::new(Sidhex::new(role)),
    }
}

/// Supersingular-isogeny key exchange. The server walks side A of the
/// parameter set, the client side B; the shared secret is the serialized
/// j-invariant both walks end on.
pub struct Sidhex {
    key: SidhKeyBasic,
}

impl Sidhex {
    pub fn new(role: KexRole) -> Sidhex {
        let params = match role {
            KexRole::Server => SidhParams::side_a(),
            KexRole::Client => SidhParams::side_b(),
        };
        Sidhex {
            key: SidhKeyBasic::new(params),
        }
    }
}

impl Kex for Sidhex {
    fn kind(&self) -> KexKind {
        KexKind::Sidhex
    }

    fn init(&mut self) -> String {
        self.key.generate();
        base64::encode(&self.key.export_public())
    }

    fn fini(&mut self, peer: &str) -> Vec<u8> {
        let raw = match base64::decode(peer) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        if raw.is_empty() {
            return Vec::new();
        }

        let mut peer_key = SidhKeyBasic::new(self.key.params().other_side());
        if !peer_key.import_public(&raw) {
            return Vec::new();
        }

        self.key.compute_shared_secret(&peer_key)
    }
}
