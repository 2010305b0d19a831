mod common;

use agile_offcrypto::{
    decrypt_encrypted_package, decrypt_package, decrypt_package_with_options,
    parse_encrypted_package_stream, recover_document_key, verify_data_integrity, verify_password,
    AgileCryptoError, DecryptFailureReason, DecryptOptions,
};
use pretty_assertions::assert_eq;

#[test]
fn fixtures_decrypt_to_expected_plaintext() {
    for name in common::FIXTURES {
        let fixture = common::load(name);
        let plaintext =
            decrypt_package(fixture.ciphertext(), &fixture.password, &fixture.descriptor)
                .unwrap_or_else(|err| panic!("{name}: {err}"));
        assert_eq!(
            plaintext,
            common::expected_plaintext(fixture.descriptor.total_size as usize),
            "{name}"
        );
    }
}

#[test]
fn fixtures_verify_only_with_the_right_password() {
    for name in common::FIXTURES {
        let fixture = common::load(name);
        assert!(verify_password(&fixture.password, &fixture.descriptor).unwrap(), "{name}");
        assert!(!verify_password("not the password", &fixture.descriptor).unwrap(), "{name}");
    }
}

#[test]
fn one_shot_decrypt_checks_integrity_and_password() {
    for name in common::FIXTURES {
        let fixture = common::load(name);
        let plaintext = decrypt_encrypted_package(
            &fixture.stream,
            &fixture.password,
            &fixture.descriptor,
            &DecryptOptions::default(),
        )
        .unwrap_or_else(|err| panic!("{name}: {err}"));
        assert_eq!(
            plaintext,
            common::expected_plaintext(fixture.descriptor.total_size as usize),
            "{name}"
        );

        let err = decrypt_encrypted_package(
            &fixture.stream,
            "wrong",
            &fixture.descriptor,
            &DecryptOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, AgileCryptoError::WrongPassword, "{name}");
    }
}

#[test]
fn parallel_and_sequential_decryption_agree() {
    for name in common::FIXTURES {
        let fixture = common::load(name);
        let sequential = DecryptOptions {
            parallel: false,
            ..DecryptOptions::default()
        };
        let a = decrypt_package_with_options(
            fixture.ciphertext(),
            &fixture.password,
            &fixture.descriptor,
            &sequential,
        )
        .unwrap();
        let b = decrypt_package_with_options(
            fixture.ciphertext(),
            &fixture.password,
            &fixture.descriptor,
            &DecryptOptions::default(),
        )
        .unwrap();
        assert_eq!(a, b, "{name}");
    }
}

#[test]
fn parallel_path_handles_many_segments() {
    // Extend the CFB fixture with filler segments; the original two still decrypt to the
    // expected plaintext wherever they run.
    let fixture = common::load("agile_sha1_cfb");
    let mut descriptor = fixture.descriptor.clone();
    let mut ciphertext = fixture.ciphertext().to_vec();
    ciphertext.resize(4096 * 32, 0xC3);
    descriptor.total_size = ciphertext.len() as u64;

    let sequential = DecryptOptions {
        parallel: false,
        ..DecryptOptions::default()
    };
    let a =
        decrypt_package_with_options(&ciphertext, &fixture.password, &descriptor, &sequential)
            .unwrap();
    let b = decrypt_package_with_options(
        &ciphertext,
        &fixture.password,
        &descriptor,
        &DecryptOptions::default(),
    )
    .unwrap();
    assert_eq!(a.len(), 4096 * 32);
    assert_eq!(a, b);
    assert_eq!(&a[..5000], &common::expected_plaintext(5000)[..]);
}

#[test]
fn flipped_ciphertext_byte_fails_integrity() {
    for name in common::FIXTURES {
        let fixture = common::load(name);
        let mut stream = fixture.stream.clone();
        stream[8 + 100] ^= 0x01;

        let err = decrypt_encrypted_package(
            &stream,
            &fixture.password,
            &fixture.descriptor,
            &DecryptOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, AgileCryptoError::IntegrityMismatch, "{name}");

        // With integrity checking disabled the tampered package still decrypts.
        let options = DecryptOptions {
            verify_integrity: false,
            ..DecryptOptions::default()
        };
        let plaintext =
            decrypt_encrypted_package(&stream, &fixture.password, &fixture.descriptor, &options)
                .unwrap();
        assert_eq!(plaintext.len() as u64, fixture.descriptor.total_size);
    }
}

#[test]
fn integrity_can_be_checked_separately() {
    let fixture = common::load("agile_sha512_cbc");
    let key = recover_document_key(&fixture.password, &fixture.descriptor).unwrap();
    verify_data_integrity(&fixture.stream, key.as_bytes(), &fixture.descriptor).unwrap();

    let mut descriptor = fixture.descriptor.clone();
    descriptor.data_integrity = None;
    let err = verify_data_integrity(&fixture.stream, key.as_bytes(), &descriptor).unwrap_err();
    assert!(
        matches!(
            err,
            AgileCryptoError::DecryptionFailure {
                field: "dataIntegrity",
                reason: DecryptFailureReason::Missing,
            }
        ),
        "got {err:?}"
    );
}

#[test]
fn stream_prefix_matches_declared_size() {
    for name in common::FIXTURES {
        let fixture = common::load(name);
        let package = parse_encrypted_package_stream(&fixture.stream).unwrap();
        assert_eq!(package.total_size, fixture.descriptor.total_size);
        assert_eq!(package.ciphertext.len() % 16, 0);
    }
}

#[test]
fn truncated_ciphertext_is_a_decryption_failure() {
    let fixture = common::load("agile_sha512_cbc");
    let ciphertext = &fixture.ciphertext()[..4096];
    let err = decrypt_package(ciphertext, &fixture.password, &fixture.descriptor).unwrap_err();
    assert!(
        matches!(
            err,
            AgileCryptoError::DecryptionFailure {
                reason: DecryptFailureReason::ShorterThanDeclared {
                    declared: 9000,
                    available: 4096
                },
                ..
            }
        ),
        "got {err:?}"
    );
}

#[test]
fn resource_limits_are_enforced() {
    let fixture = common::load("agile_sha512_cbc");
    let options = DecryptOptions {
        max_spin_count: Some(999),
        ..DecryptOptions::default()
    };
    let err = decrypt_encrypted_package(
        &fixture.stream,
        &fixture.password,
        &fixture.descriptor,
        &options,
    )
    .unwrap_err();
    assert_eq!(
        err,
        AgileCryptoError::ResourceLimit {
            limit: "spinCount",
            value: 1000,
            max: 999
        }
    );

    let options = DecryptOptions {
        max_total_size: Some(8999),
        ..DecryptOptions::default()
    };
    let err = decrypt_encrypted_package(
        &fixture.stream,
        &fixture.password,
        &fixture.descriptor,
        &options,
    )
    .unwrap_err();
    assert_eq!(
        err,
        AgileCryptoError::ResourceLimit {
            limit: "totalSize",
            value: 9000,
            max: 8999
        }
    );
}
