use std::error::Error;
use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use symmetric::{fixed_time_eq, Cipher, Mac};

/* Binary frames: a tag byte, a kind-specific header, the payload and a
   MAC trailer. The MAC covers the plaintext header and payload; after
   signing, the whole frame including the trailer is encrypted in place
   by the sending direction's stream cipher.

     CLOSE  00                      MAC
     DATA   01 LEN_BE4  payload     MAC
     REKEY  02 LEN1     new nonce   MAC  */

pub const TAG_CLOSE: u8 = 0x00;
pub const TAG_DATA: u8 = 0x01;
pub const TAG_REKEY: u8 = 0x02;

pub const CLOSE_HEADER_SIZE: usize = 1;
pub const DATA_HEADER_SIZE: usize = 5;
pub const REKEY_HEADER_SIZE: usize = 2;

/// The length field is four bytes wide, but the writer splits
/// application data at this bound and the reader rejects anything
/// larger.
pub const MAX_DATA_PAYLOAD: usize = 65536;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Close,
    Data,
    Rekey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    UnknownTag(u8),
    OversizedData(usize),
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PacketError::UnknownTag(tag) => write!(f, "unknown packet tag: {:#04x}", tag),
            PacketError::OversizedData(len) => {
                write!(f, "data packet payload of {} bytes exceeds the limit", len)
            }
        }
    }
}

impl Error for PacketError {}

fn seal(out: &mut Vec<u8>, start: usize, mac: &mut dyn Mac, cipher: &mut dyn Cipher) {
    let tag = mac.compute(&out[start..]);
    out.extend_from_slice(&tag);
    cipher.encrypt(&mut out[start..]);
}

/// Frame a CLOSE at the end of `out`.
pub fn write_close(out: &mut Vec<u8>, mac: &mut dyn Mac, cipher: &mut dyn Cipher) {
    let start = out.len();
    out.reserve(CLOSE_HEADER_SIZE + mac.size());
    out.push(TAG_CLOSE);
    seal(out, start, mac, cipher);
}

/// Frame one DATA payload at the end of `out`. Callers split their data
/// at `MAX_DATA_PAYLOAD` beforehand.
pub fn write_data(out: &mut Vec<u8>, payload: &[u8], mac: &mut dyn Mac, cipher: &mut dyn Cipher) {
    assert!(payload.len() <= MAX_DATA_PAYLOAD);

    let start = out.len();
    out.reserve(DATA_HEADER_SIZE + payload.len() + mac.size());
    out.push(TAG_DATA);
    let mut len = [0u8; 4];
    BigEndian::write_u32(&mut len, payload.len() as u32);
    out.extend_from_slice(&len);
    out.extend_from_slice(payload);
    seal(out, start, mac, cipher);
}

/// Frame a REKEY carrying the next nonce at the end of `out`.
pub fn write_rekey(out: &mut Vec<u8>, nonce: &[u8], mac: &mut dyn Mac, cipher: &mut dyn Cipher) {
    assert!(nonce.len() <= 255);

    let start = out.len();
    out.reserve(REKEY_HEADER_SIZE + nonce.len() + mac.size());
    out.push(TAG_REKEY);
    out.push(nonce.len() as u8);
    out.extend_from_slice(nonce);
    seal(out, start, mac, cipher);
}

/// Location of one completed packet inside the reader's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketView {
    pub kind: PacketKind,
    payload_start: usize,
    payload_len: usize,
    total: usize,
}

impl PacketView {
    pub fn payload_size(&self) -> usize {
        self.payload_len
    }
}

/// Incremental reader for the incoming byte stream.
///
/// Bytes are appended as they arrive; the reader decrypts in place only
/// as far as needed to identify and complete the next packet, and keeps
/// at most one completed packet at the front of its buffer until it is
/// popped.
pub struct PacketReader {
    buf: Vec<u8>,
    decrypted: usize,
    need: usize,
    pending: Option<PacketView>,
    complete: bool,
    error: Option<PacketError>,
    mac: Option<Box<dyn Mac>>,
    cipher: Option<Box<dyn Cipher>>,
}

impl PacketReader {
    pub fn new() -> PacketReader {
        PacketReader {
            buf: Vec::new(),
            decrypted: 0,
            need: 0,
            pending: None,
            complete: false,
            error: None,
            mac: None,
            cipher: None,
        }
    }

    /// Hand over the receiving direction's MAC and cipher. Nothing is
    /// decrypted until both are present.
    pub fn install(&mut self, mac: Box<dyn Mac>, cipher: Box<dyn Cipher>) {
        self.mac = Some(mac);
        self.cipher = Some(cipher);
    }

    pub fn is_installed(&self) -> bool {
        self.mac.is_some() && self.cipher.is_some()
    }

    /// Re-key the receiving direction: key the MAC with `nonce`, derive
    /// the next ephemeral key from the previous one, re-key the cipher
    /// with it. Returns the new ephemeral key.
    pub fn rekey(&mut self, nonce: &[u8], previous_key: &[u8]) -> Option<Vec<u8>> {
        let next_key = match self.mac {
            Some(ref mut mac) => {
                mac.set_key(nonce);
                mac.compute(previous_key)
            }
            None => return None,
        };
        match self.cipher {
            Some(ref mut cipher) => cipher.set_key(&next_key),
            None => return None,
        }
        Some(next_key)
    }

    pub fn write_incoming(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    fn decrypt_to_need(&mut self) -> bool {
        if self.buf.len() < self.need {
            return false;
        }
        if self.decrypted < self.need {
            if let Some(ref mut cipher) = self.cipher {
                cipher.decrypt(&mut self.buf[self.decrypted..self.need]);
            }
            self.decrypted = self.need;
        }
        true
    }

    /// Decrypt just enough of the stream to surface the next packet.
    /// `Ok(None)` means more bytes are needed; errors are sticky.
    pub fn next_packet(&mut self) -> Result<Option<PacketView>, PacketError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.complete {
            return Ok(self.pending);
        }
        if !self.is_installed() {
            return Ok(None);
        }

        let mac_size = match self.mac {
            Some(ref mac) => mac.size(),
            None => return Ok(None),
        };

        // a tag byte and the trailer bound every packet from below
        if self.decrypted < 1 + mac_size {
            self.need = 1 + mac_size;
        } else if let Some(ref view) = self.pending {
            self.need = view.total;
        }

        loop {
            if !self.decrypt_to_need() {
                return Ok(None);
            }

            if self.pending.is_some() {
                self.complete = true;
                return Ok(self.pending);
            }

            let view = match self.buf[0] {
                TAG_CLOSE => PacketView {
                    kind: PacketKind::Close,
                    payload_start: CLOSE_HEADER_SIZE,
                    payload_len: 0,
                    total: CLOSE_HEADER_SIZE + mac_size,
                },
                TAG_DATA => {
                    let len = BigEndian::read_u32(&self.buf[1..5]) as usize;
                    if len > MAX_DATA_PAYLOAD {
                        self.error = Some(PacketError::OversizedData(len));
                        return Err(PacketError::OversizedData(len));
                    }
                    PacketView {
                        kind: PacketKind::Data,
                        payload_start: DATA_HEADER_SIZE,
                        payload_len: len,
                        total: DATA_HEADER_SIZE + len + mac_size,
                    }
                }
                TAG_REKEY => {
                    let len = self.buf[1] as usize;
                    PacketView {
                        kind: PacketKind::Rekey,
                        payload_start: REKEY_HEADER_SIZE,
                        payload_len: len,
                        total: REKEY_HEADER_SIZE + len + mac_size,
                    }
                }
                tag => {
                    self.error = Some(PacketError::UnknownTag(tag));
                    return Err(PacketError::UnknownTag(tag));
                }
            };

            self.need = view.total;
            self.pending = Some(view);
        }
    }

    /// Recompute the MAC over the decrypted header and payload and
    /// compare it to the trailer in constant time.
    pub fn verify(&mut self, view: &PacketView) -> bool {
        let mac_size = match self.mac {
            Some(ref mac) => mac.size(),
            None => return false,
        };
        let signed = view.total - mac_size;
        let computed = match self.mac {
            Some(ref mut mac) => mac.compute(&self.buf[..signed]),
            None => return false,
        };
        fixed_time_eq(&computed, &self.buf[signed..view.total])
    }

    pub fn payload(&self, view: &PacketView) -> &[u8] {
        &self.buf[view.payload_start..view.payload_start + view.payload_len]
    }

    /// Drop the completed packet from the front of the buffer.
    pub fn pop_packet(&mut self) {
        if !self.complete {
            return;
        }
        let total = match self.pending {
            Some(ref view) => view.total,
            None => return,
        };
        self.buf.drain(..total);
        self.decrypted = 0;
        self.need = 0;
        self.pending = None;
        self.complete = false;
    }
}
