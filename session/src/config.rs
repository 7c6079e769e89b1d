use std::error::Error;
use std::fmt;

use common_types::{AuthKind, CipherKind, KexKind, MacKind};

use machine::Session;

/// Plain-data session configuration, applied before the handshake.
/// Algorithms are listed by their wire names so the struct can be read
/// from whatever configuration format the embedder uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Bytes written between rekeys, per direction.
    pub rekey_after: usize,
    pub ciphers: Vec<String>,
    pub macs: Vec<String>,
    pub kexes: Vec<String>,
    pub auths: Vec<String>,
    /// The key exchange a client insists on.
    pub kex: Option<String>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            rekey_after: 1 << 30,
            ciphers: vec![CipherKind::ChaCha20.name().to_string()],
            macs: vec![
                MacKind::HmacSha256.name().to_string(),
                MacKind::HmacSha512.name().to_string(),
            ],
            kexes: vec![KexKind::Sidhex.name().to_string()],
            auths: vec![AuthKind::SidhexSha512.name().to_string()],
            kex: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    UnknownCipher(String),
    UnknownMac(String),
    UnknownKex(String),
    UnknownAuth(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::UnknownCipher(ref name) => write!(f, "unknown cipher: {}", name),
            ConfigError::UnknownMac(ref name) => write!(f, "unknown MAC: {}", name),
            ConfigError::UnknownKex(ref name) => write!(f, "unknown key exchange: {}", name),
            ConfigError::UnknownAuth(ref name) => write!(f, "unknown auth method: {}", name),
        }
    }
}

impl Error for ConfigError {}

impl Config {
    /// Apply to a fresh session: replace the enabled sets, the preferred
    /// key exchange and the rekey threshold.
    pub fn apply(&self, session: &mut Session) -> Result<(), ConfigError> {
        let mut ciphers = Vec::with_capacity(self.ciphers.len());
        for name in &self.ciphers {
            match CipherKind::from_name(name) {
                Some(kind) => ciphers.push(kind),
                None => return Err(ConfigError::UnknownCipher(name.clone())),
            }
        }
        let mut macs = Vec::with_capacity(self.macs.len());
        for name in &self.macs {
            match MacKind::from_name(name) {
                Some(kind) => macs.push(kind),
                None => return Err(ConfigError::UnknownMac(name.clone())),
            }
        }
        let mut kexes = Vec::with_capacity(self.kexes.len());
        for name in &self.kexes {
            match KexKind::from_name(name) {
                Some(kind) => kexes.push(kind),
                None => return Err(ConfigError::UnknownKex(name.clone())),
            }
        }
        let mut auths = Vec::with_capacity(self.auths.len());
        for name in &self.auths {
            match AuthKind::from_name(name) {
                Some(kind) => auths.push(kind),
                None => return Err(ConfigError::UnknownAuth(name.clone())),
            }
        }
        let kex = match self.kex {
            Some(ref name) => match KexKind::from_name(name) {
                Some(kind) => Some(kind),
                None => return Err(ConfigError::UnknownKex(name.clone())),
            },
            None => None,
        };

        for kind in CipherKind::ALL {
            session.cipher_enable(*kind, ciphers.contains(kind));
        }
        for kind in MacKind::ALL {
            session.mac_enable(*kind, macs.contains(kind));
        }
        for kind in KexKind::ALL {
            session.kex_enable(*kind, kexes.contains(kind));
        }
        for kind in AuthKind::ALL {
            session.auth_enable(*kind, auths.contains(kind));
        }
        if let Some(kind) = kex {
            session.set_kex(kind);
        }
        session.set_rekey_after(self.rekey_after);

        Ok(())
    }
}
