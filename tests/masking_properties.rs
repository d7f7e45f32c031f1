//! Property tests for the quoting model, matcher and stream filter.

use proptest::prelude::*;
use shell_mask::masking::{FilterState, MaskingFilter, Matcher};
use shell_mask::shell::{Dialect, QuotingContext};

/// Passwords that exercise quote handling in every position.
const PASSWORDS: &[&str] = &[
    "ab'cd''ef'''gh",
    "'abc'",
    "'ab'cd'",
    "abc",
    "ab'cd",
    "ab''cd",
    "ab'c'd",
    "'a\"b\"c d",
    "a\"b\"c d'",
    "}#T14'GAz&H!{$U_",
    "a'b\"c\\d(e)#",
    "'\"'(foo)'\"'",
    "!\"#$%&'()*+,-./ 0123456789:;<=>? @ABCDEFGHIJKLMNO PQRSTUVWXYZ[\\]^_ `abcdefghijklmno pqrstuvwxyz{|}~",
    "'",
    "'''",
    "line1\nline2",
];

// Delimiters no variant can contain, so a match cannot reach outside `V`.
const OPEN: &[u8] = b"\x01\x02";
const CLOSE: &[u8] = b"\x02\x01";

fn mask_all(secrets: &[&[u8]], dialect: Dialect, chunks: &[&[u8]]) -> Vec<u8> {
    let mut filter = MaskingFilter::new();
    for (i, secret) in secrets.iter().enumerate() {
        filter
            .register_secret(format!("S{i}"), secret, dialect)
            .unwrap();
    }
    let mut out = Vec::new();
    for chunk in chunks {
        out.extend(filter.feed(chunk).unwrap());
    }
    out.extend(filter.finish().unwrap());
    assert_eq!(filter.state(), FilterState::Closed);
    out
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// What an `echo` script produces under `set -x`, for both quoting styles.
fn trace_log(dialect: Dialect, secret: &[u8]) -> Vec<u8> {
    let word = |arg: &[u8]| {
        if dialect.needs_quoting(arg) {
            dialect.encode(arg, QuotingContext::SingleQuoted)
        } else {
            arg.to_vec()
        }
    };
    let arg2 = [b"begin2 ".as_slice(), secret, b" end2".as_slice()].concat();

    let mut log = Vec::new();
    log.extend_from_slice(b"+ echo begin0 ");
    log.extend(word(secret));
    log.extend_from_slice(b" end0\nbegin0 ");
    log.extend_from_slice(secret);
    log.extend_from_slice(b" end0\n+ echo ");
    log.extend(word(arg2.as_slice()));
    log.extend_from_slice(b"\n");
    log.extend_from_slice(&arg2);
    log.extend_from_slice(b"\n");
    log
}

#[test]
fn echoed_passwords_are_masked_in_every_dialect() {
    for dialect in Dialect::ALL {
        for password in PASSWORDS {
            let secret = password.as_bytes();
            let log = trace_log(dialect, secret);
            let out = mask_all(&[secret], dialect, &[&log]);

            assert!(
                contains(&out, b"begin0 **** end0"),
                "{dialect}: {password:?} -> {}",
                String::from_utf8_lossy(&out)
            );
            assert!(contains(&out, b"begin2 **** end2"), "{dialect}: {password:?}");
            // Shorter secrets can coincide with the quoting around them.
            if secret.len() >= 4 {
                assert!(!contains(&out, secret), "{dialect}: {password:?} leaked");
            }
        }
    }
}

#[test]
fn every_variant_is_matched_whole() {
    for dialect in Dialect::ALL {
        for password in PASSWORDS {
            let matcher = Matcher::compile(password.as_bytes(), dialect).unwrap();
            for variant in matcher.variants() {
                let buffer = [OPEN, variant.as_slice(), CLOSE].concat();
                let spans = matcher.scan(&buffer);
                assert_eq!(spans.len(), 1, "{dialect}: {password:?}");
                assert_eq!(&buffer[spans[0].range()], variant.as_slice());
            }
        }
    }
}

#[test]
fn quoted_variants_decode_to_the_secret() {
    for dialect in Dialect::ALL {
        for password in PASSWORDS {
            let secret = password.as_bytes();
            let word = |context| dialect.encode(secret, context);
            let embedded_single = [
                b"'".as_slice(),
                word(QuotingContext::EmbeddedSingleQuoted).as_slice(),
                b"'".as_slice(),
            ]
            .concat();
            let embedded_double = [
                b"\"".as_slice(),
                word(QuotingContext::EmbeddedDoubleQuoted).as_slice(),
                b"\"".as_slice(),
            ]
            .concat();

            for rendered in [
                word(QuotingContext::SingleQuoted),
                word(QuotingContext::DoubleQuoted),
                word(QuotingContext::Unquoted),
                embedded_single,
                embedded_double,
            ] {
                assert_eq!(
                    dialect.decode_word(&rendered),
                    secret,
                    "{dialect}: {}",
                    String::from_utf8_lossy(&rendered)
                );
            }
        }
    }
}

#[test]
fn single_quoted_variant_is_not_combinatorial() {
    let matcher = Matcher::compile(b"ab'cd''ef'''gh", Dialect::Posix).unwrap();
    let single = Dialect::Posix.encode(b"ab'cd''ef'''gh", QuotingContext::SingleQuoted);
    let wrapped: Vec<_> = matcher
        .variants()
        .iter()
        .filter(|v| v.first() == Some(&b'\''))
        .collect();
    assert_eq!(wrapped, vec![&single]);
}

#[test]
fn boundary_quotes_leave_no_empty_segment() {
    for dialect in [Dialect::Posix, Dialect::Bash] {
        let single = dialect.encode(b"'abc'", QuotingContext::SingleQuoted);
        assert!(!single.starts_with(b"''"), "{dialect}");
        assert!(!single.ends_with(b"''"), "{dialect}");
    }
}

#[test]
fn split_quoted_rendering_is_fully_masked() {
    let secret = b"a'b";
    let variant = Dialect::Posix.encode(secret, QuotingContext::SingleQuoted);
    for k in 1..variant.len() {
        let first = [b"+ echo ".as_slice(), &variant[..k]].concat();
        let second = [&variant[k..], b" done".as_slice()].concat();
        let out = mask_all(&[secret], Dialect::Posix, &[&first, &second]);
        assert_eq!(out, b"+ echo **** done", "split at {k}");
    }
}

#[test]
fn overlapping_secrets_mask_longest_once() {
    let out = mask_all(&[b"pass", b"password"], Dialect::Posix, &[b"my password!"]);
    assert_eq!(out, b"my ****!");
}

#[test]
fn prefixes_of_masked_secret_do_not_survive() {
    let secret = b"correct-horse-battery";
    let out = mask_all(&[secret], Dialect::Posix, &[b"a correct-horse-battery b"]);
    for len in 4..secret.len() {
        assert!(!contains(&out, &secret[..len]));
        assert!(!contains(&out, &secret[secret.len() - len..]));
    }
}

fn dialect_strategy() -> impl Strategy<Value = Dialect> {
    prop_oneof![
        Just(Dialect::Posix),
        Just(Dialect::Bash),
        Just(Dialect::PowerShell),
    ]
}

proptest! {
    #[test]
    fn chunk_boundaries_do_not_change_output(
        secret in "[ -~]{1,16}",
        text in proptest::collection::vec(any::<u8>(), 0..64),
        dialect in dialect_strategy(),
        context in 0usize..6,
        split in any::<prop::sample::Index>(),
    ) {
        let variant = dialect.encode(secret.as_bytes(), QuotingContext::ALL[context]);
        let stream = [text.as_slice(), variant.as_slice(), text.as_slice()].concat();
        let k = split.index(stream.len() + 1);

        let whole = mask_all(&[secret.as_bytes()], dialect, &[&stream]);
        let split = mask_all(&[secret.as_bytes()], dialect, &[&stream[..k], &stream[k..]]);
        prop_assert_eq!(whole, split);
    }

    #[test]
    fn byte_at_a_time_matches_one_shot(
        secret in "[ -~]{1,12}",
        dialect in dialect_strategy(),
    ) {
        let stream = trace_log(dialect, secret.as_bytes());
        let bytes: Vec<&[u8]> = stream.chunks(1).collect();

        let whole = mask_all(&[secret.as_bytes()], dialect, &[&stream]);
        let trickled = mask_all(&[secret.as_bytes()], dialect, &bytes);
        prop_assert_eq!(whole, trickled);
    }

    #[test]
    fn variants_are_matched_whole(
        secret in "[ -~]{1,24}",
        dialect in dialect_strategy(),
    ) {
        let matcher = Matcher::compile(secret.as_bytes(), dialect).unwrap();
        for variant in matcher.variants() {
            let buffer = [OPEN, variant.as_slice(), CLOSE].concat();
            let spans = matcher.scan(&buffer);
            prop_assert_eq!(spans.len(), 1);
            prop_assert_eq!(&buffer[spans[0].range()], variant.as_slice());
        }
    }

    #[test]
    fn held_suffix_stays_bounded(
        secret in "[ -~]{1,16}",
        chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..32), 0..8),
    ) {
        let mut filter = MaskingFilter::new();
        filter.register_secret("S", secret.as_bytes(), Dialect::Posix).unwrap();
        for chunk in &chunks {
            filter.feed(chunk).unwrap();
            prop_assert!(filter.held_len() < filter.max_variant_len());
        }
    }
}
