#[cfg(test)]
mod test_session;

use std::cmp;
use std::error;
use std::fmt;
use std::mem;
use std::str;

use base64;

use common_types::{AuthKind, AuthSet, CipherKind, CipherSet, KexKind, KexSet, MacKind, MacSet};
use symmetric::{new_cipher, new_mac, Cipher, Mac};
use wire::handshake::{HandshakeFini, HandshakeInit};
use wire::packet;
use wire::{PacketKind, PacketReader};

use auth::{new_auth, Auth};
use kex::{new_kex, Kex, KexRole};

// a handshake packet must show its blank line within this many bytes
const MAX_HANDSHAKE_SIZE: usize = 4096;

// nonces are at least this long regardless of the cipher's appetite
const MIN_NONCE_SIZE: usize = 32;

const PROTOCOL_VERSION: u32 = 1;

const DEFAULT_REKEY_AFTER: usize = 1024 * 1024 * 1024;

/// Failures surfaced by a session; any of them parks the session in the
/// absorbing ERROR state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The peer failed the authentication challenge.
    WrongAuth,
    /// Handshake text malformed, oversized, or no acceptable algorithms.
    BadHandshake,
    /// A decrypted frame has an unknown tag or an impossible length.
    BadPacket,
    /// A frame failed MAC verification.
    BadMac,
    /// A rekey frame carried a nonce that is too short.
    BadRekey,
    /// Bytes kept arriving after the peer's CLOSE.
    AlreadyClosed,
    /// A failure below this layer.
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match *self {
            ErrorKind::WrongAuth => "authentication failed",
            ErrorKind::BadHandshake => "malformed or unacceptable handshake",
            ErrorKind::BadPacket => "malformed packet",
            ErrorKind::BadMac => "packet failed MAC verification",
            ErrorKind::BadRekey => "rekey nonce too short",
            ErrorKind::AlreadyClosed => "data received after close",
            ErrorKind::Other => "subsystem failure",
        };
        f.write_str(text)
    }
}

impl error::Error for ErrorKind {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Init,
    Handshaking,
    /// Crypto is up in both directions but our own handshake bytes have
    /// not all left the outgoing buffer yet.
    HandshakingTillSent,
    Normal,
    Closing,
    Closed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    None,
    Server,
    Client,
}

pub type AuthCallback = Box<dyn Fn(&str) -> Vec<u8>>;

/// One end of the secure channel.
///
/// The session never touches a socket: the embedder feeds received
/// bytes into `write_incoming` and ships the bytes drained from
/// `read_outgoing`; application data flows through `write` and `read`.
/// Everything runs synchronously on the caller's thread.
pub struct Session {
    state: State,
    role: Role,
    error: Option<ErrorKind>,
    peer_closed: bool,

    rekey_after: usize,
    since_last_rekey: usize,
    since_last_peer_rekey: usize,

    incoming_handshake: Vec<u8>,
    incoming: Vec<u8>,
    outgoing: Vec<u8>,

    reader: PacketReader,

    session_key: Vec<u8>,
    ephemeral_key: Vec<u8>,
    peer_ephemeral_key: Vec<u8>,

    server_name: Option<String>,

    kex: Option<Box<dyn Kex>>,
    use_kex: KexKind,

    auth: Option<Box<dyn Auth>>,
    use_auth: Option<AuthKind>,
    expect_auth_reply: bool,
    server_auth_id: Option<String>,
    server_auth_key: Vec<u8>,
    pending_auth_request: Option<(String, String)>,
    pending_auth_reply: Option<String>,
    auth_callback: Option<AuthCallback>,

    cipher: Option<Box<dyn Cipher>>,
    mac: Option<Box<dyn Mac>>,

    enabled_ciphers: CipherSet,
    enabled_macs: MacSet,
    enabled_kexes: KexSet,
    enabled_auths: AuthSet,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Session {{ state: {:?}, role: {:?}, error: {:?}, peer_closed: {} }}",
            self.state, self.role, self.error, self.peer_closed,
        )
    }
}

impl Session {
    pub fn new() -> Session {
        Session {
            state: State::Init,
            role: Role::None,
            error: None,
            peer_closed: false,

            rekey_after: DEFAULT_REKEY_AFTER,
            since_last_rekey: 0,
            since_last_peer_rekey: 0,

            incoming_handshake: Vec::new(),
            incoming: Vec::new(),
            outgoing: Vec::new(),

            reader: PacketReader::new(),

            session_key: Vec::new(),
            ephemeral_key: Vec::new(),
            peer_ephemeral_key: Vec::new(),

            server_name: None,

            kex: None,
            use_kex: KexKind::default(),

            auth: None,
            use_auth: None,
            expect_auth_reply: false,
            server_auth_id: None,
            server_auth_key: Vec::new(),
            pending_auth_request: None,
            pending_auth_reply: None,
            auth_callback: None,

            cipher: None,
            mac: None,

            enabled_ciphers: CipherSet::defaults(),
            enabled_macs: MacSet::defaults(),
            enabled_kexes: KexSet::defaults(),
            enabled_auths: AuthSet::defaults(),
        }
    }

    pub fn cipher_enable(&mut self, kind: CipherKind, enable: bool) {
        self.enabled_ciphers.set(kind, enable);
    }

    pub fn is_cipher_enabled(&self, kind: CipherKind) -> bool {
        self.enabled_ciphers.has(kind)
    }

    pub fn mac_enable(&mut self, kind: MacKind, enable: bool) {
        self.enabled_macs.set(kind, enable);
    }

    pub fn is_mac_enabled(&self, kind: MacKind) -> bool {
        self.enabled_macs.has(kind)
    }

    pub fn kex_enable(&mut self, kind: KexKind, enable: bool) {
        self.enabled_kexes.set(kind, enable);
    }

    pub fn is_kex_enabled(&self, kind: KexKind) -> bool {
        self.enabled_kexes.has(kind)
    }

    pub fn auth_enable(&mut self, kind: AuthKind, enable: bool) {
        self.enabled_auths.set(kind, enable);
    }

    pub fn is_auth_enabled(&self, kind: AuthKind) -> bool {
        self.enabled_auths.has(kind)
    }

    pub fn set_kex(&mut self, kind: KexKind) {
        self.use_kex = kind;
    }

    pub fn kex(&self) -> KexKind {
        self.use_kex
    }

    /// Configure the peer's long-term public auth key; a client set up
    /// this way demands authentication during its handshake.
    pub fn set_server_auth(&mut self, id: &str, public_key: &[u8]) {
        self.server_auth_id = Some(id.to_string());
        self.server_auth_key = public_key.to_vec();
    }

    /// Serve authentication requests with one fixed private key.
    pub fn set_auth(&mut self, private_key: &[u8]) {
        let key = private_key.to_vec();
        self.auth_callback = Some(Box::new(move |_id: &str| key.clone()));
    }

    /// Serve authentication requests by looking private keys up by their
    /// string ID; return an empty vector on miss.
    pub fn set_auth_callback<F>(&mut self, callback: F)
    where
        F: Fn(&str) -> Vec<u8> + 'static,
    {
        self.auth_callback = Some(Box::new(callback));
    }

    pub fn set_rekey_after(&mut self, bytes: usize) {
        self.rekey_after = bytes;
    }

    pub fn rekey_after(&self) -> usize {
        self.rekey_after
    }

    pub fn since_last_rekey(&self) -> usize {
        self.since_last_rekey
    }

    pub fn since_last_peer_rekey(&self) -> usize {
        self.since_last_peer_rekey
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn error(&self) -> Option<ErrorKind> {
        self.error
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_handshaken(&self) -> bool {
        match self.state {
            State::Normal | State::Closing | State::Closed => true,
            _ => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    pub fn is_peer_closed(&self) -> bool {
        self.peer_closed
    }

    pub fn bytes_available(&self) -> usize {
        self.incoming.len()
    }

    pub fn bytes_outgoing_available(&self) -> usize {
        self.outgoing.len()
    }

    /// On a server: the name the client addressed in its hello.
    /// On a client: the name passed to `start_client`.
    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_ref().map(|name| name.as_str())
    }

    fn set_error(&mut self, kind: ErrorKind) {
        debug!("session error: {}", kind);
        self.error = Some(kind);
        self.state = State::Error;
    }

    fn fail(&mut self, kind: ErrorKind) -> bool {
        self.set_error(kind);
        false
    }

    /// Take the server role; the first handshake bytes come from the
    /// peer.
    pub fn start_server(&mut self) {
        if self.role != Role::None {
            return;
        }
        self.role = Role::Server;
    }

    /// Take the client role and emit the opening handshake packet.
    pub fn start_client(&mut self, server_name: &str) {
        if self.role != Role::None {
            return;
        }
        self.role = Role::Client;
        self.server_name = Some(server_name.to_string());

        let mut kex = new_kex(self.use_kex, KexRole::Client);
        let secret = kex.init();
        self.kex = Some(kex);

        self.prepare_auth_request(&secret);
        self.send_handshake_init(&secret);
    }

    fn prepare_auth_request(&mut self, encrypted_secret: &str) {
        let id = match self.server_auth_id {
            Some(ref id) => id.clone(),
            None => return,
        };
        if self.server_auth_key.is_empty() {
            return;
        }

        let kind = AuthKind::default();
        if !self.enabled_auths.has(kind) {
            return;
        }

        let mut auth = new_auth(kind);
        let key = self.server_auth_key.clone();
        if !auth.set_request_key(&key) {
            return;
        }

        // the challenge binds the peer's reply to this session's own
        // key-exchange contribution
        let request = auth.request(encrypted_secret.as_bytes());
        if request.is_empty() {
            return;
        }

        self.use_auth = Some(kind);
        self.auth = Some(auth);
        self.expect_auth_reply = true;
        self.pending_auth_request = Some((id, base64::encode(&request)));
    }

    fn send_handshake_init(&mut self, encrypted_secret: &str) {
        let mut hs = HandshakeInit::new();
        hs.version = PROTOCOL_VERSION;
        if self.role == Role::Client {
            hs.server_name = self.server_name.clone();
        }
        hs.kex = Some(self.use_kex);
        hs.supported_ciphers = self.enabled_ciphers;
        hs.supported_macs = self.enabled_macs;
        hs.auth = self.use_auth;
        if let Some((ref id, ref request)) = self.pending_auth_request {
            hs.server_auth = Some(id.clone());
            hs.auth_request = Some(request.clone());
        }
        hs.encrypted_secret = Some(encrypted_secret.to_string());

        self.outgoing.extend_from_slice(hs.render().as_bytes());
    }

    fn send_handshake_fini(&mut self, nonce: &[u8]) {
        let mut hs = HandshakeFini::new();
        hs.cipher = self.cipher.as_ref().map(|cipher| cipher.kind());
        hs.mac = self.mac.as_ref().map(|mac| mac.kind());
        hs.nonce = Some(base64::encode(nonce));
        hs.auth_reply = self.pending_auth_reply.take();

        self.outgoing.extend_from_slice(hs.render().as_bytes());
    }

    /// Feed bytes received from the transport.
    pub fn write_incoming(&mut self, data: &[u8]) {
        if self.peer_closed {
            self.set_error(ErrorKind::AlreadyClosed);
        }
        if self.state == State::Error {
            return;
        }

        match self.state {
            State::Init | State::Handshaking | State::HandshakingTillSent => {
                self.handle_handshake(data)
            }
            _ => self.handle_incoming(data),
        }
    }

    fn handle_handshake(&mut self, data: &[u8]) {
        self.incoming_handshake.extend_from_slice(data);

        loop {
            if self.incoming_handshake.is_empty() {
                return;
            }
            match self.state {
                State::Init => {
                    if !self.process_init() {
                        return;
                    }
                }
                State::Handshaking => {
                    if !self.process_fini() {
                        return;
                    }
                }
                State::Normal => {
                    // whatever followed the handshake text is already
                    // encrypted traffic
                    let rest = mem::replace(&mut self.incoming_handshake, Vec::new());
                    self.handle_incoming(&rest);
                    return;
                }
                _ => return,
            }
        }
    }

    /// The complete text packet at the head of the handshake buffer, or
    /// `None` when more bytes are needed or the buffer went bad.
    fn pending_handshake_text(&mut self) -> Option<String> {
        let blank = self
            .incoming_handshake
            .windows(2)
            .position(|pair| pair == b"\n\n");

        match blank {
            Some(index) => match str::from_utf8(&self.incoming_handshake[..index + 2]) {
                Ok(text) => Some(text.to_string()),
                Err(_) => {
                    self.set_error(ErrorKind::BadHandshake);
                    None
                }
            },
            None => {
                if self.incoming_handshake.len() > MAX_HANDSHAKE_SIZE {
                    self.set_error(ErrorKind::BadHandshake);
                }
                None
            }
        }
    }

    fn process_init(&mut self) -> bool {
        let text = match self.pending_handshake_text() {
            Some(text) => text,
            None => return false,
        };

        let (hs, consumed) = match HandshakeInit::parse(&text) {
            Some(parsed) => parsed,
            None => return self.fail(ErrorKind::BadHandshake),
        };
        self.incoming_handshake.drain(..consumed);

        let available_ciphers = hs.supported_ciphers & self.enabled_ciphers;
        let available_macs = hs.supported_macs & self.enabled_macs;

        let kex_kind = match hs.kex {
            Some(kind) => kind,
            None => return self.fail(ErrorKind::BadHandshake),
        };

        if hs.version != PROTOCOL_VERSION
            || !self.enabled_kexes.has(kex_kind)
            || (self.role == Role::Client && kex_kind != self.use_kex)
            || available_ciphers.is_empty()
            || available_macs.is_empty()
        {
            return self.fail(ErrorKind::BadHandshake);
        }

        let peer_secret = match hs.encrypted_secret {
            Some(ref secret) => secret.clone(),
            None => return self.fail(ErrorKind::BadHandshake),
        };

        let cipher_kind = match available_ciphers.first() {
            Some(kind) => kind,
            None => return self.fail(ErrorKind::BadHandshake),
        };
        let mac_kind = match available_macs.first() {
            Some(kind) => kind,
            None => return self.fail(ErrorKind::BadHandshake),
        };
        let mut cipher = new_cipher(cipher_kind);
        let mut mac = new_mac(mac_kind);

        let mut own_secret = None;
        if self.role == Role::Server {
            self.server_name = hs.server_name.clone();
            self.use_kex = kex_kind;

            let mut kex = new_kex(kex_kind, KexRole::Server);
            own_secret = Some(kex.init());
            self.kex = Some(kex);

            if let Some(auth_kind) = hs.auth {
                if !self.enabled_auths.has(auth_kind) {
                    return self.fail(ErrorKind::BadHandshake);
                }
                self.pending_auth_reply = self.make_auth_reply(auth_kind, &hs, &peer_secret);
            }
        }

        let session_key = match self.kex {
            Some(ref mut kex) => kex.fini(&peer_secret),
            None => return self.fail(ErrorKind::BadHandshake),
        };
        if session_key.is_empty() {
            return self.fail(ErrorKind::BadHandshake);
        }

        let nonce_size = cmp::max(MIN_NONCE_SIZE, cipher.nonce_size());
        let nonce = ::symmetric::random_vec(nonce_size);

        // the per-direction key is the session key put through an HMAC
        // keyed with this direction's nonce
        mac.set_key(&nonce);
        let ephemeral = mac.compute(&session_key);
        cipher.set_key(&ephemeral);
        cipher.set_nonce(&nonce);

        self.session_key = session_key;
        self.ephemeral_key = ephemeral;
        self.cipher = Some(cipher);
        self.mac = Some(mac);

        if let Some(ref secret) = own_secret {
            self.send_handshake_init(secret);
        }
        self.send_handshake_fini(&nonce);

        self.state = State::Handshaking;
        true
    }

    fn make_auth_reply(
        &mut self,
        kind: AuthKind,
        hs: &HandshakeInit,
        message: &str,
    ) -> Option<String> {
        let request = match hs.auth_request {
            Some(ref request) => match base64::decode(request) {
                Ok(raw) => raw,
                Err(_) => return None,
            },
            None => return None,
        };
        let key_id = hs.server_auth.as_ref()?;

        let key = match self.auth_callback {
            Some(ref callback) => callback(key_id),
            None => return None,
        };
        if key.is_empty() {
            debug!("no private key for auth ID {}", key_id);
            return None;
        }

        let mut auth = new_auth(kind);
        if !auth.set_sign_key(&key) {
            return None;
        }

        let reply = auth.sign(message.as_bytes(), &request);
        if reply.is_empty() {
            return None;
        }
        Some(base64::encode(&reply))
    }

    fn process_fini(&mut self) -> bool {
        let text = match self.pending_handshake_text() {
            Some(text) => text,
            None => return false,
        };

        let (hs, consumed) = match HandshakeFini::parse(&text) {
            Some(parsed) => parsed,
            None => return self.fail(ErrorKind::BadHandshake),
        };
        self.incoming_handshake.drain(..consumed);

        let cipher_kind = match hs.cipher {
            Some(kind) if self.enabled_ciphers.has(kind) => kind,
            _ => return self.fail(ErrorKind::BadHandshake),
        };
        let mac_kind = match hs.mac {
            Some(kind) if self.enabled_macs.has(kind) => kind,
            _ => return self.fail(ErrorKind::BadHandshake),
        };
        let peer_nonce = match hs.nonce {
            Some(ref nonce) => match base64::decode(nonce) {
                Ok(raw) => raw,
                Err(_) => return self.fail(ErrorKind::BadHandshake),
            },
            None => return self.fail(ErrorKind::BadHandshake),
        };

        let mut peer_cipher = new_cipher(cipher_kind);
        let mut peer_mac = new_mac(mac_kind);

        if peer_nonce.len() < cmp::max(MIN_NONCE_SIZE, peer_cipher.nonce_size()) {
            return self.fail(ErrorKind::BadHandshake);
        }

        peer_mac.set_key(&peer_nonce);
        let peer_ephemeral = peer_mac.compute(&self.session_key);
        peer_cipher.set_key(&peer_ephemeral);
        peer_cipher.set_nonce(&peer_nonce);

        if self.expect_auth_reply {
            let verified = match hs.auth_reply {
                Some(ref reply) => match base64::decode(reply) {
                    Ok(raw) => match self.auth {
                        Some(ref auth) => auth.verify(&raw),
                        None => false,
                    },
                    Err(_) => false,
                },
                None => false,
            };
            if !verified {
                return self.fail(ErrorKind::WrongAuth);
            }
            debug!("peer authenticated");
        }

        self.peer_ephemeral_key = peer_ephemeral;
        self.reader.install(peer_mac, peer_cipher);

        self.state = if self.outgoing.is_empty() {
            State::Normal
        } else {
            State::HandshakingTillSent
        };
        debug!("handshake complete, state {:?}", self.state);
        true
    }

    fn handle_incoming(&mut self, data: &[u8]) {
        self.reader.write_incoming(data);

        loop {
            let view = match self.reader.next_packet() {
                Ok(Some(view)) => view,
                Ok(None) => break,
                Err(_) => return self.set_error(ErrorKind::BadPacket),
            };

            if !self.reader.verify(&view) {
                return self.set_error(ErrorKind::BadMac);
            }

            let kind = view.kind;
            let payload = self.reader.payload(&view).to_vec();
            self.reader.pop_packet();

            match kind {
                PacketKind::Close => self.handle_close(),
                PacketKind::Data => {
                    self.since_last_peer_rekey += payload.len();
                    self.incoming.extend_from_slice(&payload);
                }
                PacketKind::Rekey => self.handle_rekey(&payload),
            }

            if self.state == State::Error {
                return;
            }
        }
    }

    fn handle_close(&mut self) {
        debug!("peer closed the channel");
        self.peer_closed = true;
        if self.state == State::Closing {
            self.state = State::Closed;
        }
    }

    fn handle_rekey(&mut self, payload: &[u8]) {
        if payload.len() < MIN_NONCE_SIZE {
            return self.set_error(ErrorKind::BadRekey);
        }

        let previous = mem::replace(&mut self.peer_ephemeral_key, Vec::new());
        match self.reader.rekey(payload, &previous) {
            Some(next) => self.peer_ephemeral_key = next,
            None => return self.set_error(ErrorKind::Other),
        }

        self.since_last_peer_rekey = 0;
        debug!("peer rekeyed its direction");
    }

    /// Queue application bytes, framed and encrypted, onto the outgoing
    /// buffer. Dropped outside the NORMAL state.
    pub fn write(&mut self, data: &[u8]) {
        if self.state != State::Normal || data.is_empty() {
            return;
        }

        for chunk in data.chunks(packet::MAX_DATA_PAYLOAD) {
            self.write_packet(chunk);
            if self.state == State::Error {
                return;
            }
        }
    }

    fn write_packet(&mut self, chunk: &[u8]) {
        match (self.mac.as_mut(), self.cipher.as_mut()) {
            (Some(mac), Some(cipher)) => {
                packet::write_data(&mut self.outgoing, chunk, mac.as_mut(), cipher.as_mut());
            }
            _ => return,
        }

        self.since_last_rekey += chunk.len();
        if self.since_last_rekey > self.rekey_after {
            self.do_rekey();
        }
    }

    fn do_rekey(&mut self) {
        let nonce = ::symmetric::random_vec(MIN_NONCE_SIZE);

        match (self.mac.as_mut(), self.cipher.as_mut()) {
            (Some(mac), Some(cipher)) => {
                // the rekey frame itself still travels under the old keys
                packet::write_rekey(&mut self.outgoing, &nonce, mac.as_mut(), cipher.as_mut());

                mac.set_key(&nonce);
                let next = mac.compute(&self.ephemeral_key);
                cipher.set_key(&next);
                self.ephemeral_key = next;
            }
            _ => return,
        }

        self.since_last_rekey = 0;
        debug!("rekeyed the sending direction");
    }

    /// Read decrypted application bytes; `None` when nothing is
    /// available (including after an error).
    pub fn read(&mut self, buf: &mut [u8]) -> Option<usize> {
        match self.state {
            State::Normal | State::Closing | State::Closed => {}
            _ => return None,
        }
        if self.incoming.is_empty() {
            return None;
        }

        let n = cmp::min(buf.len(), self.incoming.len());
        buf[..n].copy_from_slice(&self.incoming[..n]);
        self.incoming.drain(..n);
        Some(n)
    }

    /// Drain bytes destined for the transport. Keeps working in the
    /// ERROR state so an in-flight CLOSE can still reach the peer.
    pub fn read_outgoing(&mut self, buf: &mut [u8]) -> usize {
        let n = cmp::min(buf.len(), self.outgoing.len());
        buf[..n].copy_from_slice(&self.outgoing[..n]);
        self.outgoing.drain(..n);

        if self.outgoing.is_empty() {
            match self.state {
                State::HandshakingTillSent => {
                    self.state = State::Normal;
                    debug!("handshake flushed, state {:?}", self.state);
                    if !self.incoming_handshake.is_empty() {
                        let rest = mem::replace(&mut self.incoming_handshake, Vec::new());
                        self.handle_incoming(&rest);
                    }
                }
                State::Closing => {
                    self.state = State::Closed;
                    debug!("session closed");
                }
                _ => {}
            }
        }

        n
    }

    /// Announce the end of the stream; the session closes once the
    /// CLOSE frame has drained.
    pub fn close(&mut self) {
        if self.state != State::Normal {
            return;
        }

        match (self.mac.as_mut(), self.cipher.as_mut()) {
            (Some(mac), Some(cipher)) => {
                packet::write_close(&mut self.outgoing, mac.as_mut(), cipher.as_mut());
            }
            _ => return,
        }

        self.state = State::Closing;
        debug!("closing");
    }
}
