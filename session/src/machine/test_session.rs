use super::*;

use auth::generate_auth_key;
use common_types::{CipherKind, MacKind};
use keyfile;
use symmetric::random_vec;

/// Shuttle bytes both ways until neither session has anything left to
/// send.
fn pump(a: &mut Session, b: &mut Session) {
    let mut buf = [0u8; 509];
    loop {
        let mut moved = false;
        loop {
            let n = a.read_outgoing(&mut buf);
            if n == 0 {
                break;
            }
            moved = true;
            b.write_incoming(&buf[..n]);
        }
        loop {
            let n = b.read_outgoing(&mut buf);
            if n == 0 {
                break;
            }
            moved = true;
            a.write_incoming(&buf[..n]);
        }
        if !moved {
            return;
        }
    }
}

fn drain(session: &mut Session) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 256];
    while let Some(n) = session.read(&mut buf) {
        out.extend_from_slice(&buf[..n]);
    }
    out
}

fn handshaken_pair() -> (Session, Session) {
    let mut client = Session::new();
    let mut server = Session::new();

    server.start_server();
    client.start_client("pqctelnet.test");
    pump(&mut client, &mut server);

    assert!(client.is_handshaken(), "client: {:?}", client);
    assert!(server.is_handshaken(), "server: {:?}", server);
    (client, server)
}

#[test]
fn handshake_completes_in_two_round_trips() {
    let (client, server) = handshaken_pair();

    assert_eq!(client.state(), State::Normal);
    assert_eq!(server.state(), State::Normal);
    assert_eq!(client.role(), Role::Client);
    assert_eq!(server.role(), Role::Server);
    assert_eq!(server.server_name(), Some("pqctelnet.test"));
    assert!(!client.is_error());
    assert!(!server.is_error());
}

#[test]
fn handshake_with_restricted_algorithm_sets() {
    let mut client = Session::new();
    let mut server = Session::new();
    for session in &mut [&mut client, &mut server] {
        session.mac_enable(MacKind::HmacSha256, false);
    }

    server.start_server();
    client.start_client("pqctelnet.test");
    pump(&mut client, &mut server);

    assert!(client.is_handshaken());
    assert!(server.is_handshaken());
}

#[test]
fn handshake_fails_without_common_ciphers() {
    let mut client = Session::new();
    let mut server = Session::new();
    server.cipher_enable(CipherKind::ChaCha20, false);
    server.cipher_enable(CipherKind::Plain, true);

    server.start_server();
    client.start_client("pqctelnet.test");
    pump(&mut client, &mut server);

    assert_eq!(server.error(), Some(ErrorKind::BadHandshake));
    assert!(!client.is_handshaken());
}

#[test]
fn oversized_handshake_is_rejected() {
    let mut server = Session::new();
    server.start_server();
    server.write_incoming(&vec![b'a'; MAX_HANDSHAKE_SIZE + 1]);
    assert_eq!(server.error(), Some(ErrorKind::BadHandshake));
}

#[test]
fn malformed_handshake_is_rejected() {
    let mut server = Session::new();
    server.start_server();
    server.write_incoming(b"Post-quantum hello v1.\nBogus-field: nope\n\n");
    assert_eq!(server.error(), Some(ErrorKind::BadHandshake));
}

#[test]
fn data_echoes_exactly() {
    let (mut client, mut server) = handshaken_pair();

    client.write(b"test1");
    pump(&mut client, &mut server);

    assert_eq!(server.bytes_available(), 5);
    let mut buf = [0u8; 64];
    let n = server.read(&mut buf).unwrap();
    assert_eq!(n, 5);
    assert_eq!(&buf[..n], b"test1");
    assert!(server.read(&mut buf).is_none());
}

#[test]
fn data_flows_both_ways_in_order() {
    let (mut client, mut server) = handshaken_pair();

    client.write(b"first ");
    client.write(b"second ");
    client.write(b"third");
    server.write(b"reply");
    pump(&mut client, &mut server);

    assert_eq!(drain(&mut server), b"first second third".to_vec());
    assert_eq!(drain(&mut client), b"reply".to_vec());
}

#[test]
fn large_writes_split_and_reassemble() {
    let (mut client, mut server) = handshaken_pair();

    // spans three frames, the first of exactly the split size
    let message = random_vec(2 * 65536 + 17);
    client.write(&message);
    pump(&mut client, &mut server);

    assert_eq!(drain(&mut server), message);
    assert!(!server.is_error());
}

#[test]
fn rekey_fires_past_the_threshold() {
    let (mut client, mut server) = handshaken_pair();
    client.set_rekey_after(1024);

    let message = random_vec(1600);
    client.write(&message);
    assert!(client.since_last_rekey() < 1024);

    pump(&mut client, &mut server);
    assert_eq!(drain(&mut server), message);
    assert!(server.since_last_peer_rekey() < 1024);

    // traffic keeps flowing under the ratcheted keys
    let more = random_vec(100);
    client.write(&more);
    server.write(b"pong");
    pump(&mut client, &mut server);
    assert_eq!(drain(&mut server), more);
    assert_eq!(drain(&mut client), b"pong".to_vec());
}

#[test]
fn many_rekeys_stay_in_sync() {
    let (mut client, mut server) = handshaken_pair();
    client.set_rekey_after(64);

    for i in 0..20 {
        let message = random_vec(48 + i);
        client.write(&message);
        pump(&mut client, &mut server);
        assert_eq!(drain(&mut server), message, "round {}", i);
    }
}

#[test]
fn a_flipped_bit_breaks_the_mac() {
    let (mut client, mut server) = handshaken_pair();

    server.write(b"some protected bytes");
    let mut wire_bytes = Vec::new();
    let mut buf = [0u8; 256];
    loop {
        let n = server.read_outgoing(&mut buf);
        if n == 0 {
            break;
        }
        wire_bytes.extend_from_slice(&buf[..n]);
    }

    wire_bytes[9] ^= 0x01;
    client.write_incoming(&wire_bytes);

    assert_eq!(client.error(), Some(ErrorKind::BadMac));
    assert_eq!(client.state(), State::Error);
    assert!(client.read(&mut buf).is_none());
}

#[test]
fn short_rekey_nonces_are_rejected() {
    let (mut client, mut server) = handshaken_pair();

    // hand-feed the server a REKEY frame whose payload is too short;
    // build it through a third session's writer keyed like the client
    let mut forged = Vec::new();
    {
        let mac = client.mac.as_mut().expect("client mac");
        let cipher = client.cipher.as_mut().expect("client cipher");
        packet::write_rekey(&mut forged, &[0u8; 16], mac.as_mut(), cipher.as_mut());
    }
    server.write_incoming(&forged);
    assert_eq!(server.error(), Some(ErrorKind::BadRekey));
}

#[test]
fn graceful_close() {
    let (mut client, mut server) = handshaken_pair();

    client.write(b"last words");
    client.close();
    assert_eq!(client.state(), State::Closing);

    pump(&mut client, &mut server);

    assert!(client.is_closed());
    assert_eq!(drain(&mut server), b"last words".to_vec());
    assert!(server.is_peer_closed());
    assert!(!server.is_error());
}

#[test]
fn bytes_after_peer_close_are_an_error() {
    let (mut client, mut server) = handshaken_pair();

    client.close();
    pump(&mut client, &mut server);
    assert!(server.is_peer_closed());

    server.write_incoming(b"straggler");
    assert_eq!(server.error(), Some(ErrorKind::AlreadyClosed));
}

#[test]
fn both_sides_close() {
    let (mut client, mut server) = handshaken_pair();

    client.close();
    pump(&mut client, &mut server);
    server.close();
    pump(&mut client, &mut server);

    assert!(client.is_closed());
    assert!(server.is_closed());
}

#[test]
fn writes_outside_normal_are_dropped() {
    let mut client = Session::new();
    client.start_client("pqctelnet.test");
    let queued = client.bytes_outgoing_available();

    client.write(b"too early");
    assert_eq!(client.bytes_outgoing_available(), queued);

    let (mut done, _) = handshaken_pair();
    done.close();
    let after_close = done.bytes_outgoing_available();
    done.write(b"too late");
    assert_eq!(done.bytes_outgoing_available(), after_close);
}

#[test]
fn authenticated_handshake_succeeds() {
    let key = generate_auth_key(Default::default());
    let public = key.export_public();
    let id = keyfile::key_id_hex(&public);

    let mut server = Session::new();
    server.set_auth(&key.export_both());
    server.start_server();

    let mut client = Session::new();
    client.set_server_auth(&id, &public);
    client.start_client("pqctelnet.test");

    pump(&mut client, &mut server);

    assert!(client.is_handshaken(), "client: {:?}", client);
    assert!(server.is_handshaken());
    assert!(!client.is_error());
}

#[test]
fn auth_callback_is_keyed_by_id() {
    let key = generate_auth_key(Default::default());
    let public = key.export_public();
    let id = keyfile::key_id_hex(&public);
    let private = key.export_both();

    let expected = id.clone();
    let mut server = Session::new();
    server.set_auth_callback(move |requested| {
        if requested == expected {
            private.clone()
        } else {
            Vec::new()
        }
    });
    server.start_server();

    let mut client = Session::new();
    client.set_server_auth(&id, &public);
    client.start_client("pqctelnet.test");

    pump(&mut client, &mut server);
    assert!(client.is_handshaken());
}

#[test]
fn wrong_server_key_fails_authentication() {
    let honest = generate_auth_key(Default::default());
    let impostor = generate_auth_key(Default::default());

    let mut server = Session::new();
    server.set_auth(&impostor.export_both());
    server.start_server();

    let honest_public = honest.export_public();
    let mut client = Session::new();
    client.set_server_auth(&keyfile::key_id_hex(&honest_public), &honest_public);
    client.start_client("pqctelnet.test");

    pump(&mut client, &mut server);

    assert_eq!(client.error(), Some(ErrorKind::WrongAuth));
    assert!(!client.is_handshaken());
}

#[test]
fn missing_auth_key_fails_the_requester() {
    let key = generate_auth_key(Default::default());
    let public = key.export_public();

    // server has no callback at all
    let mut server = Session::new();
    server.start_server();

    let mut client = Session::new();
    client.set_server_auth(&keyfile::key_id_hex(&public), &public);
    client.start_client("pqctelnet.test");

    pump(&mut client, &mut server);
    assert_eq!(client.error(), Some(ErrorKind::WrongAuth));
}

#[test]
fn short_handshake_nonces_are_rejected() {
    let mut server = Session::new();
    server.start_server();

    // a legitimate opening packet, hand-assembled
    let mut kex = new_kex(Default::default(), KexRole::Client);
    let blob = kex.init();
    let hello = format!(
        "Post-quantum hello v1, by-hand.\n\
         Key-exchange: SIDHex\n\
         Supported-ciphers: ChaCha20\n\
         Supported-MACs: sha256 sha512\n\
         Encrypted-secret: {}\n\n",
        blob
    );
    server.write_incoming(hello.as_bytes());
    assert_eq!(server.state(), State::Handshaking);

    // now a closing packet whose nonce is shorter than 32 bytes
    let fini = format!(
        "KEX: OK\nCipher: ChaCha20\nMAC: sha512\nNonce: {}\n\n",
        ::base64::encode(&[7u8; 16])
    );
    server.write_incoming(fini.as_bytes());
    assert_eq!(server.error(), Some(ErrorKind::BadHandshake));
}

#[test]
fn identity_point_public_keys_are_rejected() {
    use sidh::{Curve, SidhParams};

    let mut server = Session::new();
    server.start_server();

    // a hello whose key-exchange blob carries identity-tagged image
    // points: the deserializer accepts them, so the failure has to come
    // out of key agreement as BAD_HANDSHAKE rather than a crash
    let mut kex = new_kex(Default::default(), KexRole::Client);
    let blob = kex.init();
    let mut raw = ::base64::decode(&blob).unwrap();
    let curve_size = Curve::byte_size(SidhParams::side_b().prime());
    for byte in raw[curve_size..].iter_mut() {
        *byte = 0;
    }

    let hello = format!(
        "Post-quantum hello v1, by-hand.\n\
         Key-exchange: SIDHex\n\
         Supported-ciphers: ChaCha20\n\
         Supported-MACs: sha256 sha512\n\
         Encrypted-secret: {}\n\n",
        ::base64::encode(&raw)
    );
    server.write_incoming(hello.as_bytes());

    assert_eq!(server.error(), Some(ErrorKind::BadHandshake));
    assert_eq!(server.state(), State::Error);
}

#[test]
fn wrong_protocol_versions_are_rejected() {
    let mut server = Session::new();
    server.start_server();
    server.write_incoming(
        b"Post-quantum hello v2.\n\
          Key-exchange: SIDHex\n\
          Supported-ciphers: ChaCha20\n\
          Supported-MACs: sha512\n\
          Encrypted-secret: YmxvYg==\n\n",
    );
    assert_eq!(server.error(), Some(ErrorKind::BadHandshake));
}

#[test]
fn roles_are_claimed_once() {
    let mut session = Session::new();
    assert_eq!(session.kex(), Default::default());
    session.start_server();
    session.start_client("ignored");
    assert_eq!(session.role(), Role::Server);
    assert_eq!(session.server_name(), None);
}
