use std::fmt;

/// Stream ciphers negotiable on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherKind {
    ChaCha20,
    Plain,
}

/// Frame authentication codes negotiable on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacKind {
    HmacSha256,
    HmacSha512,
}

/// Key-exchange algorithms negotiable on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KexKind {
    Sidhex,
}

/// Peer authentication methods negotiable on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthKind {
    SidhexSha512,
}

impl CipherKind {
    pub const ALL: &'static [CipherKind] = &[CipherKind::ChaCha20, CipherKind::Plain];

    pub fn name(&self) -> &'static str {
        match *self {
            CipherKind::ChaCha20 => "ChaCha20",
            CipherKind::Plain => "plain",
        }
    }

    // names match case-insensitively on the wire
    pub fn from_name(name: &str) -> Option<Self> {
        for kind in Self::ALL {
            if name.eq_ignore_ascii_case(kind.name()) {
                return Some(*kind);
            }
        }
        None
    }
}

impl Default for CipherKind {
    fn default() -> Self {
        CipherKind::ChaCha20
    }
}

impl fmt::Display for CipherKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl MacKind {
    pub const ALL: &'static [MacKind] = &[MacKind::HmacSha256, MacKind::HmacSha512];

    pub fn name(&self) -> &'static str {
        match *self {
            MacKind::HmacSha256 => "sha256",
            MacKind::HmacSha512 => "sha512",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        for kind in Self::ALL {
            if name.eq_ignore_ascii_case(kind.name()) {
                return Some(*kind);
            }
        }
        None
    }
}

impl Default for MacKind {
    fn default() -> Self {
        MacKind::HmacSha512
    }
}

impl fmt::Display for MacKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl KexKind {
    pub const ALL: &'static [KexKind] = &[KexKind::Sidhex];

    pub fn name(&self) -> &'static str {
        match *self {
            KexKind::Sidhex => "SIDHex",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        for kind in Self::ALL {
            if name.eq_ignore_ascii_case(kind.name()) {
                return Some(*kind);
            }
        }
        None
    }
}

impl Default for KexKind {
    fn default() -> Self {
        KexKind::Sidhex
    }
}

impl fmt::Display for KexKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl AuthKind {
    pub const ALL: &'static [AuthKind] = &[AuthKind::SidhexSha512];

    pub fn name(&self) -> &'static str {
        match *self {
            AuthKind::SidhexSha512 => "SIDHex-sha512",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        for kind in Self::ALL {
            if name.eq_ignore_ascii_case(kind.name()) {
                return Some(*kind);
            }
        }
        None
    }
}

impl Default for AuthKind {
    fn default() -> Self {
        AuthKind::SidhexSha512
    }
}

impl fmt::Display for AuthKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    pub struct CipherSet: u32 {
        const CHACHA20 = 1 << 0;
        const PLAIN    = 1 << 1;
    }
}

bitflags! {
    pub struct MacSet: u32 {
        const HMAC_SHA256 = 1 << 0;
        const HMAC_SHA512 = 1 << 1;
    }
}

bitflags! {
    pub struct KexSet: u32 {
        const SIDHEX = 1 << 0;
    }
}

bitflags! {
    pub struct AuthSet: u32 {
        const SIDHEX_SHA512 = 1 << 0;
    }
}

impl CipherSet {
    pub fn of(kind: CipherKind) -> Self {
        match kind {
            CipherKind::ChaCha20 => CipherSet::CHACHA20,
            CipherKind::Plain => CipherSet::PLAIN,
        }
    }

    pub fn defaults() -> Self {
        CipherSet::CHACHA20
    }

    pub fn has(&self, kind: CipherKind) -> bool {
        self.contains(Self::of(kind))
    }

    pub fn set(&mut self, kind: CipherKind, enable: bool) {
        if enable {
            self.insert(Self::of(kind));
        } else {
            self.remove(Self::of(kind));
        }
    }

    /// Members in registry order; negotiation prefers the first common one.
    pub fn kinds(&self) -> Vec<CipherKind> {
        CipherKind::ALL.iter().cloned().filter(|k| self.has(*k)).collect()
    }

    pub fn first(&self) -> Option<CipherKind> {
        CipherKind::ALL.iter().cloned().find(|k| self.has(*k))
    }
}

impl MacSet {
    pub fn of(kind: MacKind) -> Self {
        match kind {
            MacKind::HmacSha256 => MacSet::HMAC_SHA256,
            MacKind::HmacSha512 => MacSet::HMAC_SHA512,
        }
    }

    pub fn defaults() -> Self {
        MacSet::HMAC_SHA256 | MacSet::HMAC_SHA512
    }

    pub fn has(&self, kind: MacKind) -> bool {
        self.contains(Self::of(kind))
    }

    pub fn set(&mut self, kind: MacKind, enable: bool) {
        if enable {
            self.insert(Self::of(kind));
        } else {
            self.remove(Self::of(kind));
        }
    }

    pub fn kinds(&self) -> Vec<MacKind> {
        MacKind::ALL.iter().cloned().filter(|k| self.has(*k)).collect()
    }

    pub fn first(&self) -> Option<MacKind> {
        MacKind::ALL.iter().cloned().find(|k| self.has(*k))
    }
}

impl KexSet {
    pub fn of(kind: KexKind) -> Self {
        match kind {
            KexKind::Sidhex => KexSet::SIDHEX,
        }
    }

    pub fn defaults() -> Self {
        KexSet::SIDHEX
    }

    pub fn has(&self, kind: KexKind) -> bool {
        self.contains(Self::of(kind))
    }

    pub fn set(&mut self, kind: KexKind, enable: bool) {
        if enable {
            self.insert(Self::of(kind));
        } else {
            self.remove(Self::of(kind));
        }
    }
}

impl AuthSet {
    pub fn of(kind: AuthKind) -> Self {
        match kind {
            AuthKind::SidhexSha512 => AuthSet::SIDHEX_SHA512,
        }
    }

    pub fn defaults() -> Self {
        AuthSet::SIDHEX_SHA512
    }

    pub fn has(&self, kind: AuthKind) -> bool {
        self.contains(Self::of(kind))
    }

    pub fn set(&mut self, kind: AuthKind, enable: bool) {
        if enable {
            self.insert(Self::of(kind));
        } else {
            self.remove(Self::of(kind));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in CipherKind::ALL {
            assert_eq!(CipherKind::from_name(kind.name()), Some(*kind));
        }
        for kind in MacKind::ALL {
            assert_eq!(MacKind::from_name(kind.name()), Some(*kind));
        }
        for kind in KexKind::ALL {
            assert_eq!(KexKind::from_name(kind.name()), Some(*kind));
        }
        for kind in AuthKind::ALL {
            assert_eq!(AuthKind::from_name(kind.name()), Some(*kind));
        }
    }

    #[test]
    fn names_match_case_insensitively() {
        assert_eq!(CipherKind::from_name("chacha20"), Some(CipherKind::ChaCha20));
        assert_eq!(CipherKind::from_name("PLAIN"), Some(CipherKind::Plain));
        assert_eq!(MacKind::from_name("SHA512"), Some(MacKind::HmacSha512));
        assert_eq!(KexKind::from_name("sidhex"), Some(KexKind::Sidhex));
        assert_eq!(AuthKind::from_name("sidhex-SHA512"), Some(AuthKind::SidhexSha512));
        assert_eq!(CipherKind::from_name("rc4"), None);
    }

    #[test]
    fn sets_intersect_and_pick_in_registry_order() {
        let ours = CipherSet::CHACHA20 | CipherSet::PLAIN;
        let theirs = CipherSet::PLAIN;
        assert_eq!((ours & theirs).first(), Some(CipherKind::Plain));

        let macs = MacSet::defaults();
        assert_eq!(macs.first(), Some(MacKind::HmacSha256));
        assert_eq!(macs.kinds(), vec![MacKind::HmacSha256, MacKind::HmacSha512]);

        let mut set = CipherSet::defaults();
        assert!(set.has(CipherKind::ChaCha20));
        set.set(CipherKind::ChaCha20, false);
        assert!(set.is_empty());
    }
}
