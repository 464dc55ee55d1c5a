// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/undertone

//! End-to-end round trips through the full channel: cipher → framing →
//! embedding → detection → extraction → reassembly → decipher.

mod common;

use common::MockCodec;
use undertone_core::{
    has_steg, ChannelConfig, CipherConfig, CoverCodec, StegChannel, StegCollection, StegError,
    StegStatus, DEFAULT_STEG_THRESHOLD,
};

const COVER_A: &str = "KB2BBC KA1AAB DD44";
const COVER_B: &str = "KA1AAB KB2BBC DD44";

fn channel(
    codec: MockCodec,
    passphrase: Option<&str>,
    cipher: CipherConfig,
    cover_noise: usize,
) -> StegChannel<MockCodec> {
    StegChannel::new(
        codec,
        passphrase,
        ChannelConfig { cipher, cover_noise, steg_threshold: DEFAULT_STEG_THRESHOLD },
    )
}

#[test]
fn defcon22_single_packet_scenario() {
    let codec = MockCodec::new();
    let channel = channel(codec.clone(), Some("k1"), CipherConfig::None, 0);

    let packets = channel
        .encode_transmission(&[COVER_A, COVER_B], Some(b"DEFCON22"))
        .unwrap();
    assert_eq!(packets.len(), 2);

    // The eight-byte message plus status header fill exactly one packet;
    // the second codeword passes through clean.
    let canonical_b = MockCodec::new().encode(COVER_B).unwrap();
    assert_eq!(packets[1], canonical_b);
    assert!(!has_steg(&codec, COVER_B, &packets[1], DEFAULT_STEG_THRESHOLD).unwrap());
    assert!(has_steg(&codec, COVER_A, &packets[0], DEFAULT_STEG_THRESHOLD).unwrap());

    let decoded = channel.decode_transmission(&packets).unwrap();
    assert_eq!(decoded.cover_texts, vec![COVER_A.to_string(), COVER_B.to_string()]);
    assert_eq!(decoded.hidden.as_deref(), Some(&b"DEFCON22"[..]));
}

#[test]
fn roundtrip_every_cipher_across_noise_levels() {
    let covers = [COVER_A, COVER_B, COVER_A, COVER_B, COVER_A, COVER_B, COVER_A, COVER_B];
    let message = b"BEACON FTW AND DEF CON 22";

    let configs: Vec<(&str, CipherConfig)> = vec![
        ("none", CipherConfig::None),
        ("xor", CipherConfig::Xor { key: b"XOR rox and all that jazz".to_vec() }),
        ("arc4", CipherConfig::Arc4 {
            key: b"RC4 is the most secure algorithm in the world".to_vec(),
        }),
        ("aes-ecb", CipherConfig::AesEcb {
            passphrase: "AES is totes secure, right? Yeah".into(),
        }),
        ("aes-cbc", CipherConfig::AesCbc {
            passphrase: "AES is totes secure, right? Yeah".into(),
        }),
        ("aes-cfb", CipherConfig::AesCfb {
            passphrase: "AES is totes secure, right? Yeah".into(),
        }),
        ("otp", CipherConfig::Otp {
            key: b"I LOVE SECURITY AND STUFF AND ALSO VERY LONG PADS".to_vec(),
        }),
    ];

    for (name, cipher) in configs {
        for noise in 0..=5 {
            let codec = MockCodec::new();
            let channel = channel(codec, Some("monitor everything"), cipher.clone(), noise);
            let packets = channel.encode_transmission(&covers, Some(message)).unwrap();
            let decoded = channel.decode_transmission(&packets).unwrap();
            assert_eq!(
                decoded.hidden.as_deref(),
                Some(&message[..]),
                "cipher {name}, noise {noise}"
            );
            assert_eq!(decoded.cover_texts.len(), covers.len(), "cipher {name}, noise {noise}");
            for (text, cover) in decoded.cover_texts.iter().zip(covers) {
                assert_eq!(text, cover, "cipher {name}, noise {noise}");
            }
        }
    }
}

#[test]
fn multi_packet_xor_with_exact_cover_count() {
    let covers = [COVER_A, COVER_B, COVER_A];
    let codec = MockCodec::new();
    let channel = channel(
        codec,
        Some("k1"),
        CipherConfig::Xor { key: b"XOR rox and all that jazz".to_vec() },
        2,
    );
    let message = b"DEF CON 22 VEGAS NEVADA"; // 23 bytes -> three chunks
    let packets = channel.encode_transmission(&covers, Some(message)).unwrap();
    let decoded = channel.decode_transmission(&packets).unwrap();
    assert_eq!(decoded.hidden.as_deref(), Some(&message[..]));
}

#[test]
fn unused_cover_packets_pass_through() {
    let covers = [COVER_A, COVER_B, COVER_A, COVER_B];
    let codec = MockCodec::new();
    let channel = channel(codec.clone(), Some("k1"), CipherConfig::None, 3);
    // 8 bytes + header = one payload packet; three pure cover packets.
    let packets = channel.encode_transmission(&covers, Some(b"DEFCON22")).unwrap();

    for (packet, cover) in packets.iter().zip(covers).skip(1) {
        let canonical = codec.encode(cover).unwrap();
        assert_eq!(*packet, canonical, "pass-through packet was modified");
        assert!(!has_steg(&codec, cover, packet, DEFAULT_STEG_THRESHOLD).unwrap());
    }

    let decoded = channel.decode_transmission(&packets).unwrap();
    assert_eq!(decoded.hidden.as_deref(), Some(&b"DEFCON22"[..]));
}

#[test]
fn embedding_is_deterministic() {
    let message = b"DEF CON 22";
    let make = || {
        let codec = MockCodec::new();
        channel(
            codec,
            Some("shared passphrase"),
            CipherConfig::Xor { key: b"XOR rox and all that jazz".to_vec() },
            4,
        )
    };
    let a = make().encode_transmission(&[COVER_A, COVER_B], Some(message)).unwrap();
    let b = make().encode_transmission(&[COVER_A, COVER_B], Some(message)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn reassembler_gates_until_declared_total() {
    let covers = [COVER_A, COVER_B, COVER_A];
    let codec = MockCodec::new();
    let channel = channel(codec, Some("k1"), CipherConfig::None, 0);
    let message = b"DEF CON 22 VEGAS NEV"; // 20 bytes -> three chunks
    let packets = channel.encode_transmission(&covers, Some(message)).unwrap();

    let mut collection = StegCollection::new();
    let first = channel.decode_packet(&packets[0], &mut collection).unwrap();
    assert_eq!(first.steg, Some(StegStatus::Pending { received: 1, expected: 3 }));
    let second = channel.decode_packet(&packets[1], &mut collection).unwrap();
    assert_eq!(second.steg, Some(StegStatus::Pending { received: 2, expected: 3 }));
    assert!(!collection.is_empty(), "collection must hold partial transmission");

    let third = channel.decode_packet(&packets[2], &mut collection).unwrap();
    match third.steg {
        Some(StegStatus::Message(hidden)) => assert_eq!(hidden, message),
        other => panic!("expected completed message, got {other:?}"),
    }
    assert!(collection.is_empty(), "collection must reset after draining");
}

#[test]
fn mid_stream_join_reports_anomaly_and_recovers() {
    let covers = [COVER_A, COVER_B, COVER_A];
    let codec = MockCodec::new();
    let channel = channel(codec, Some("k1"), CipherConfig::None, 0);
    let message = b"DEF CON 22 VEGAS NEV";
    let packets = channel.encode_transmission(&covers, Some(message)).unwrap();

    let mut collection = StegCollection::new();
    // Joined after the header packet went by.
    let late = channel.decode_packet(&packets[1], &mut collection).unwrap();
    assert_eq!(late.steg, Some(StegStatus::Anomaly));
    assert!(collection.is_empty());

    // The retransmission is caught in full.
    for (i, packet) in packets.iter().enumerate() {
        let decoded = channel.decode_packet(packet, &mut collection).unwrap();
        if i == packets.len() - 1 {
            assert!(matches!(decoded.steg, Some(StegStatus::Message(ref m)) if m == message));
        }
    }
}

#[test]
fn hidden_without_passphrase_is_key_missing() {
    let codec = MockCodec::new();
    let channel = channel(codec, None, CipherConfig::None, 0);
    assert!(matches!(
        channel.encode_transmission(&[COVER_A], Some(b"secret")),
        Err(StegError::KeyMissing)
    ));
    // Cover-only traffic still works.
    assert_eq!(channel.encode_transmission(&[COVER_A], None).unwrap().len(), 1);
}

#[test]
fn payload_larger_than_cover_traffic_is_rejected() {
    let codec = MockCodec::new();
    let channel = channel(codec, Some("k1"), CipherConfig::None, 0);
    // 20 bytes need three packets; only two covers supplied.
    let result = channel.encode_transmission(&[COVER_A, COVER_B], Some(&[7u8; 20]));
    match result {
        Err(StegError::CapacityExceeded { required: 3, available: 2 }) => {}
        other => panic!("expected CapacityExceeded, got {other:?}"),
    }
}

#[test]
fn wrong_passphrase_never_yields_the_message() {
    let codec = MockCodec::new();
    let sender = channel(codec.clone(), Some("right horse battery"), CipherConfig::None, 0);
    let receiver = channel(codec, Some("wrong horse battery"), CipherConfig::None, 0);

    let message = b"DEF CON 22";
    let packets = sender
        .encode_transmission(&[COVER_A, COVER_B], Some(message))
        .unwrap();
    let decoded = receiver.decode_transmission(&packets).unwrap();
    // The wrong key replays wrong positions; whatever comes out is not the
    // hidden message, and the cover traffic is unharmed either way.
    assert_ne!(decoded.hidden.as_deref(), Some(&message[..]));
    assert_eq!(decoded.cover_texts[0], COVER_A);
}

/// Keyring stand-in: length-prefixed XOR, self-delimiting so trailing chunk
/// padding is ignored on decrypt (the contract real keyring formats meet).
struct TestKeyring;

impl undertone_core::ExternalKeyring for TestKeyring {
    fn encrypt(&self, data: &[u8], recipient: &str) -> Result<Vec<u8>, StegError> {
        if recipient != "KA1AAB" {
            return Err(StegError::CipherBackendUnavailable(format!(
                "unknown recipient {recipient}"
            )));
        }
        let mut out = vec![data.len() as u8];
        out.extend(data.iter().map(|b| b ^ 0xA5));
        Ok(out)
    }

    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, StegError> {
        let len = *data.first().ok_or_else(|| {
            StegError::CipherBackendUnavailable("empty ciphertext".into())
        })? as usize;
        if data.len() < 1 + len {
            return Err(StegError::CipherBackendUnavailable("truncated ciphertext".into()));
        }
        Ok(data[1..1 + len].iter().map(|b| b ^ 0xA5).collect())
    }
}

#[test]
fn keyring_mode_roundtrip() {
    let codec = MockCodec::new();
    let channel = StegChannel::with_keyring(
        codec,
        Some("k1"),
        ChannelConfig {
            cipher: CipherConfig::Keyring { recipient: "KA1AAB".into() },
            cover_noise: 1,
            steg_threshold: DEFAULT_STEG_THRESHOLD,
        },
        Box::new(TestKeyring),
    );

    let message = b"DEF CON 22";
    let packets = channel
        .encode_transmission(&[COVER_A, COVER_B], Some(message))
        .unwrap();
    let decoded = channel.decode_transmission(&packets).unwrap();
    assert_eq!(decoded.hidden.as_deref(), Some(&message[..]));
}

#[test]
fn keyring_mode_unknown_recipient_fails_before_embedding() {
    let codec = MockCodec::new();
    let channel = StegChannel::with_keyring(
        codec,
        Some("k1"),
        ChannelConfig {
            cipher: CipherConfig::Keyring { recipient: "N0CALL".into() },
            ..ChannelConfig::default()
        },
        Box::new(TestKeyring),
    );
    assert!(matches!(
        channel.encode_transmission(&[COVER_A], Some(b"x")),
        Err(StegError::CipherBackendUnavailable(_))
    ));
}

#[test]
fn cover_noise_only_camouflage_decodes_clean() {
    use undertone_core::{cover_noise_only, diff_count, NoiseKey};

    let codec = MockCodec::new();
    let canonical = codec.encode(COVER_A).unwrap();
    let mut key = NoiseKey::derive("k1");

    let noisy = cover_noise_only(&canonical, &mut key, 4).unwrap();
    assert!(diff_count(&noisy, &canonical) <= 4);
    // Still decodes to the cover text through the error correction.
    assert_eq!(codec.decode(&noisy).unwrap(), COVER_A);
}
