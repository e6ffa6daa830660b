//! End-to-end tests over hand-assembled archives, through the public API only.

use std::sync::Arc;

use proptest::prelude::*;
use runsa::{
    Archive, Compression, ExtractError, Extractor, PadMode, ParseError, ParseOptions, extract,
    parse,
};

/// (name, flag, stored bytes, raw expanded size)
type Entry<'a> = (&'a str, u8, Vec<u8>, u32);

fn build(pad: bool, entries: &[Entry]) -> Vec<u8> {
    let header_len = if pad { 7 } else { 6 };
    let directory_len: usize = entries.iter().map(|(n, ..)| n.len() + 14).sum();
    let base = (header_len + directory_len) as u32;

    let mut out = Vec::new();
    if pad {
        out.push(0);
    }
    out.extend_from_slice(&(entries.len() as u16).to_be_bytes());
    out.extend_from_slice(&base.to_be_bytes());

    let mut rel = 0u32;
    for (name, flag, data, expanded) in entries {
        out.extend_from_slice(name.as_bytes());
        out.push(0);
        out.push(*flag);
        out.extend_from_slice(&rel.to_be_bytes());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(&expanded.to_be_bytes());
        rel += data.len() as u32;
    }
    for (_, _, data, _) in entries {
        out.extend_from_slice(data);
    }
    out
}

/// LZSS stream made only of literals: a `1` flag bit then 8 data bits each.
fn lzss_literals(data: &[u8]) -> Vec<u8> {
    let mut bits: Vec<bool> = Vec::new();
    for &b in data {
        bits.push(true);
        bits.extend((0..8).rev().map(|i| (b >> i) & 1 == 1));
    }
    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (i, &bit)| acc | (u8::from(bit) << (7 - i)))
        })
        .collect()
}

#[test]
fn single_stored_entry_extracts_its_bytes() {
    let data = build(false, &[("a.png", 0, vec![1, 2, 3, 4, 5], 5)]);
    let archive = parse(data).unwrap();

    assert_eq!(archive.len(), 1);
    let entry = archive.find("a.png").unwrap();
    assert_eq!(entry.compression, Compression::None);
    assert_eq!(extract(&archive, entry).unwrap(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn data_offset_beyond_buffer_is_invalid_header() {
    let mut data = build(false, &[("a.png", 0, vec![1, 2, 3, 4, 5], 5)]);
    data[2..6].copy_from_slice(&9999u32.to_be_bytes());
    assert!(matches!(parse(data), Err(ParseError::InvalidHeader(_))));
}

#[test]
fn duplicate_names_resolve_to_the_first() {
    let data = build(
        false,
        &[
            ("dup.txt", 0, b"first".to_vec(), 5),
            ("dup.txt", 0, b"second".to_vec(), 6),
        ],
    );
    let archive = parse(data).unwrap();

    let found = archive.find("dup.txt").unwrap();
    assert_eq!(found.index, 0);
    assert_eq!(extract(&archive, found).unwrap(), b"first");
    assert_eq!(archive.find_all("dup.txt").count(), 2);
}

#[test]
fn unknown_flag_is_rejected_at_parse_time() {
    let data = build(false, &[("ok.txt", 0, b"x".to_vec(), 1), ("bad.bin", 3, b"y".to_vec(), 1)]);
    match parse(data) {
        Err(ParseError::InvalidDirectory { index, name, .. }) => {
            assert_eq!((index, name.as_str()), (1, "bad.bin"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn truncated_directory_is_truncated_input() {
    let data = build(false, &[("a.txt", 0, b"abc".to_vec(), 3), ("b.txt", 0, b"d".to_vec(), 1)]);
    // Cut inside the first record's offset field and point the data block
    // at the start so only the directory read can fail.
    let mut short = data[..6 + "a.txt".len() + 3].to_vec();
    short[2..6].copy_from_slice(&0u32.to_be_bytes());
    assert!(matches!(
        Archive::parse_with(short, &ParseOptions {
            pad: PadMode::Absent,
            count_fallback: false,
        }),
        Err(ParseError::TruncatedInput { .. })
    ));
}

#[test]
fn lzss_respects_declared_size() {
    let text = b"*define\nsavename\n";
    let packed = lzss_literals(text);
    let data = build(
        false,
        &[
            ("0.txt", 2, packed.clone(), text.len() as u32),
            ("1.txt", 2, packed, text.len() as u32 + 10),
        ],
    );
    let extractor = Extractor::new(Arc::new(parse(data).unwrap()));

    assert_eq!(extractor.extract_by_name("0.txt").unwrap(), text);
    assert!(matches!(
        extractor.extract_by_name("1.txt"),
        Err(ExtractError::SizeMismatch { index: 1, .. })
    ));
}

#[test]
fn padded_archive_is_detected() {
    let data = build(true, &[("bg\\a.bmp", 0, vec![9; 8], 8)]);
    let archive = parse(data).unwrap();
    assert!(archive.header().pad_present);
    assert!(archive.find("bg/a.bmp").is_ok());
}

fn entries_strategy() -> impl Strategy<Value = Vec<(String, u8, Vec<u8>)>> {
    prop::collection::vec(
        (
            "[a-z]{1,12}\\.(txt|dat)",
            prop::sample::select(vec![0u8, 1, 2, 4]),
            prop::collection::vec(any::<u8>(), 0..64),
        ),
        0..24,
    )
}

proptest! {
    #[test]
    fn parsed_archives_keep_count_and_bounds(entries in entries_strategy(), pad in any::<bool>()) {
        let owned: Vec<Entry> = entries
            .iter()
            .map(|(n, f, d)| (n.as_str(), *f, d.clone(), d.len() as u32))
            .collect();
        let data = build(pad, &owned);
        let len = data.len() as u64;

        let options = ParseOptions {
            pad: if pad { PadMode::Present } else { PadMode::Absent },
            count_fallback: false,
        };
        let archive = Archive::parse_with(data, &options).unwrap();

        prop_assert_eq!(archive.entries().len(), archive.header().object_count as usize);
        prop_assert_eq!(archive.len(), entries.len());
        let base = archive.header().data_base_offset;
        for entry in archive.entries() {
            let (_, end) = entry.span(base);
            prop_assert!(end <= len);
        }
    }

    #[test]
    fn stored_entries_extract_their_exact_region(
        payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..48), 1..12)
    ) {
        let names: Vec<String> = (0..payloads.len()).map(|i| format!("f{i}.bin")).collect();
        let owned: Vec<Entry> = names
            .iter()
            .zip(&payloads)
            .map(|(n, d)| (n.as_str(), 0, d.clone(), d.len() as u32))
            .collect();
        let options = ParseOptions { pad: PadMode::Absent, count_fallback: false };
        let archive = Archive::parse_with(build(false, &owned), &options).unwrap();

        for (entry, payload) in archive.entries().iter().zip(&payloads) {
            prop_assert_eq!(&extract(&archive, entry).unwrap(), payload);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn auto_detection_matches_the_written_layout(
        entries in entries_strategy(),
        pad in any::<bool>(),
        tail in 60_000usize..300_000,
    ) {
        let mut owned: Vec<Entry> = entries
            .iter()
            .map(|(n, f, d)| (n.as_str(), *f, d.clone(), d.len() as u32))
            .collect();
        owned.push(("tail.bin", 0, vec![0xA5; tail], tail as u32));

        let archive = parse(build(pad, &owned)).unwrap();
        prop_assert_eq!(archive.header().pad_present, pad);
        prop_assert_eq!(archive.len(), owned.len());
        prop_assert_eq!(archive.entries()[owned.len() - 1].stored_size as usize, tail);
    }
}
