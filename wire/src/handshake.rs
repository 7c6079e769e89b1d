use common_types::{AuthKind, CipherKind, CipherSet, KexKind, MacKind, MacSet};

/* The handshake is two plain-text packets, each a run of LF-terminated
   "Name: value" lines closed by one blank line. Field names match
   case-insensitively, values are case-sensitive identifiers or base64.
   The parser is strict: unknown fields, repeated fields and a missing
   blank line are errors. The producer always emits fields in one fixed
   order. */

fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        line.get(prefix.len()..)
    } else {
        None
    }
}

fn next_line(input: &str, pos: usize) -> Option<(&str, usize)> {
    let rest = input.get(pos..)?;
    let nl = rest.find('\n')?;
    Some((&rest[..nl], pos + nl + 1))
}

fn parse_cipher_list(value: &str) -> CipherSet {
    let mut set = CipherSet::empty();
    for word in value.split_whitespace() {
        if let Some(kind) = CipherKind::from_name(word) {
            set.insert(CipherSet::of(kind));
        }
    }
    set
}

fn parse_mac_list(value: &str) -> MacSet {
    let mut set = MacSet::empty();
    for word in value.split_whitespace() {
        if let Some(kind) = MacKind::from_name(word) {
            set.insert(MacSet::of(kind));
        }
    }
    set
}

/// The first handshake packet, sent by both peers.
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeInit {
    pub version: u32,
    /// Present when the client speaks, absent for the server.
    pub server_name: Option<String>,
    /// `None` covers both a missing field and an unrecognized name; the
    /// session rejects either.
    pub kex: Option<KexKind>,
    pub auth: Option<AuthKind>,
    pub supported_ciphers: CipherSet,
    pub supported_macs: MacSet,
    pub server_auth: Option<String>,
    pub client_auths: Vec<String>,
    pub encrypted_secret: Option<String>,
    pub auth_request: Option<String>,
}

impl HandshakeInit {
    pub fn new() -> HandshakeInit {
        HandshakeInit {
            version: 0,
            server_name: None,
            kex: None,
            auth: None,
            supported_ciphers: CipherSet::empty(),
            supported_macs: MacSet::empty(),
            server_auth: None,
            client_auths: Vec::new(),
            encrypted_secret: None,
            auth_request: None,
        }
    }

    /// Parse one packet from the head of `input`; returns the packet and
    /// the number of bytes consumed, up to and including the blank line.
    pub fn parse(input: &str) -> Option<(HandshakeInit, usize)> {
        let mut result = HandshakeInit::new();

        let (first, mut pos) = next_line(input, 0)?;
        let rest = strip_prefix_ci(first, "Post-quantum hello v")?;

        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return None;
        }
        result.version = rest[..digits].parse().ok()?;

        let tail = &rest[digits..];
        if tail == "." {
            // no server name
        } else if tail.starts_with(", ") && tail.ends_with('.') && tail.len() > 3 {
            result.server_name = Some(tail[2..tail.len() - 1].to_string());
        } else {
            return None;
        }

        let mut seen_kex = false;
        let mut seen_auth = false;
        let mut seen_ciphers = false;
        let mut seen_macs = false;

        loop {
            let (line, next) = next_line(input, pos)?;
            pos = next;

            if line.is_empty() {
                break;
            }

            if let Some(value) = strip_prefix_ci(line, "Key-exchange: ") {
                if seen_kex {
                    return None;
                }
                result.kex = KexKind::from_name(value);
                seen_kex = true;
            } else if let Some(value) = strip_prefix_ci(line, "Auth-type: ") {
                if seen_auth {
                    return None;
                }
                result.auth = AuthKind::from_name(value);
                seen_auth = true;
            } else if let Some(value) = strip_prefix_ci(line, "Supported-ciphers: ") {
                if seen_ciphers {
                    return None;
                }
                result.supported_ciphers = parse_cipher_list(value);
                seen_ciphers = true;
            } else if let Some(value) = strip_prefix_ci(line, "Supported-MACs: ") {
                if seen_macs {
                    return None;
                }
                result.supported_macs = parse_mac_list(value);
                seen_macs = true;
            } else if let Some(value) = strip_prefix_ci(line, "Server-auth: ") {
                if result.server_auth.is_some() {
                    return None;
                }
                result.server_auth = Some(value.to_string());
            } else if let Some(value) = strip_prefix_ci(line, "Client-auth: ") {
                result.client_auths.push(value.to_string());
            } else if let Some(value) = strip_prefix_ci(line, "Encrypted-secret: ") {
                if result.encrypted_secret.is_some() {
                    return None;
                }
                result.encrypted_secret = Some(value.to_string());
            } else if let Some(value) = strip_prefix_ci(line, "Auth-request: ") {
                if result.auth_request.is_some() {
                    return None;
                }
                result.auth_request = Some(value.to_string());
            } else {
                return None;
            }
        }

        Some((result, pos))
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        match self.server_name {
            Some(ref name) => {
                out.push_str(&format!("Post-quantum hello v{}, {}.\n", self.version, name))
            }
            None => out.push_str(&format!("Post-quantum hello v{}.\n", self.version)),
        }

        if let Some(kex) = self.kex {
            out.push_str(&format!("Key-exchange: {}\n", kex.name()));
        }

        out.push_str("Supported-ciphers:");
        for kind in self.supported_ciphers.kinds() {
            out.push(' ');
            out.push_str(kind.name());
        }
        out.push('\n');

        out.push_str("Supported-MACs:");
        for kind in self.supported_macs.kinds() {
            out.push(' ');
            out.push_str(kind.name());
        }
        out.push('\n');

        if let Some(auth) = self.auth {
            out.push_str(&format!("Auth-type: {}\n", auth.name()));
        }
        if let Some(ref id) = self.server_auth {
            out.push_str(&format!("Server-auth: {}\n", id));
        }
        for id in &self.client_auths {
            out.push_str(&format!("Client-auth: {}\n", id));
        }
        if let Some(ref secret) = self.encrypted_secret {
            out.push_str(&format!("Encrypted-secret: {}\n", secret));
        }
        if let Some(ref request) = self.auth_request {
            out.push_str(&format!("Auth-request: {}\n", request));
        }

        out.push('\n');
        out
    }
}

/// The second handshake packet, closing the negotiation.
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakeFini {
    pub cipher: Option<CipherKind>,
    pub mac: Option<MacKind>,
    pub nonce: Option<String>,
    pub auth_reply: Option<String>,
}

impl HandshakeFini {
    pub fn new() -> HandshakeFini {
        HandshakeFini {
            cipher: None,
            mac: None,
            nonce: None,
            auth_reply: None,
        }
    }

    pub fn parse(input: &str) -> Option<(HandshakeFini, usize)> {
        let mut result = HandshakeFini::new();

        let (first, mut pos) = next_line(input, 0)?;
        if !first.eq_ignore_ascii_case("KEX: OK") {
            return None;
        }

        loop {
            let (line, next) = next_line(input, pos)?;
            pos = next;

            if line.is_empty() {
                break;
            }

            if let Some(value) = strip_prefix_ci(line, "Cipher: ") {
                if result.cipher.is_some() {
                    return None;
                }
                result.cipher = Some(CipherKind::from_name(value)?);
            } else if let Some(value) = strip_prefix_ci(line, "MAC: ") {
                if result.mac.is_some() {
                    return None;
                }
                result.mac = Some(MacKind::from_name(value)?);
            } else if let Some(value) = strip_prefix_ci(line, "Nonce: ") {
                if result.nonce.is_some() {
                    return None;
                }
                result.nonce = Some(value.to_string());
            } else if let Some(value) = strip_prefix_ci(line, "Auth-reply: ") {
                if result.auth_reply.is_some() {
                    return None;
                }
                result.auth_reply = Some(value.to_string());
            } else {
                return None;
            }
        }

        Some((result, pos))
    }

    pub fn render(&self) -> String {
        let mut out = String::from("KEX: OK\n");

        if let Some(cipher) = self.cipher {
            out.push_str(&format!("Cipher: {}\n", cipher.name()));
        }
        if let Some(mac) = self.mac {
            out.push_str(&format!("MAC: {}\n", mac.name()));
        }
        if let Some(ref nonce) = self.nonce {
            out.push_str(&format!("Nonce: {}\n", nonce));
        }
        if let Some(ref reply) = self.auth_reply {
            out.push_str(&format!("Auth-reply: {}\n", reply));
        }

        out.push('\n');
        out
    }
}
