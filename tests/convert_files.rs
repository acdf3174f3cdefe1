use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::fs;
use std::io::Write;
use tempfile::tempdir;

use kmp_updater::{
    ConversionStatus, ConvertOptions, ErrorKind, SECTION_LAYOUTS, convert_batch, convert_bytes,
    parse_course, section,
};

const OUTPUT_SECTION_START: usize = 0x12 * 4 + 0x10;

/// Tag, entry count, extra value, raw entry bytes.
type RawSection = (&'static [u8; 4], u16, u16, Vec<u8>);

/// Writes a course file whose sections appear in the given order.
fn course_file(version: i32, sections: &[RawSection]) -> Vec<u8> {
    let count = sections.len();
    let start = count * 4 + 0x10;

    let mut body = Vec::new();
    let mut offsets = Vec::new();
    for (tag, entries, extra, payload) in sections {
        offsets.push(body.len() as u32);
        body.write_all(*tag).unwrap();
        body.write_u16::<LittleEndian>(*entries).unwrap();
        body.write_u16::<LittleEndian>(*extra).unwrap();
        body.write_all(payload).unwrap();
    }

    let mut file = Vec::new();
    file.write_all(b"DMDC").unwrap();
    file.write_u32::<LittleEndian>((start + body.len()) as u32).unwrap();
    file.write_u16::<LittleEndian>(count as u16).unwrap();
    file.write_u16::<LittleEndian>(0x4C).unwrap();
    file.write_i32::<LittleEndian>(version).unwrap();
    for offset in offsets {
        file.write_u32::<LittleEndian>(offset).unwrap();
    }
    file.extend_from_slice(&body);
    file
}

fn slot(bytes: &[u8], index: usize) -> usize {
    LittleEndian::read_u32(&bytes[0x10 + index * 4..]) as usize
}

#[test]
fn sparse_course_is_filled_to_canonical_layout() -> kmp_updater::Result<()> {
    let tptk: Vec<u8> = (0..0x1C * 2).map(|i| i as u8).collect();
    let hplg = vec![0x55; 0x0C];
    let input = course_file(
        0xBB8,
        &[(b"HPLG", 1, 3, hplg.clone()), (b"TPTK", 2, 0, tptk.clone())],
    );

    let out = convert_bytes(&input)?.bytes;

    assert_eq!(LittleEndian::read_u32(&out[4..]) as usize, out.len());
    assert_eq!(LittleEndian::read_u16(&out[8..]), 0x12);
    assert_eq!(LittleEndian::read_u16(&out[10..]), 0x58);
    assert_eq!(LittleEndian::read_i32(&out[12..]), 0xC1C);

    // TPTK leads, then 16 header-only sections, then HPLG
    assert_eq!(slot(&out, 0), 0);
    let tptk_len = 8 + tptk.len();
    for index in 1..18 {
        assert_eq!(slot(&out, index), tptk_len + (index - 1) * 8);
    }
    let hplg_pos = OUTPUT_SECTION_START + slot(&out, 17);
    assert_eq!(&out[hplg_pos..hplg_pos + 4], b"HPLG");
    assert_eq!(LittleEndian::read_u16(&out[hplg_pos + 6..]), 3);
    assert_eq!(&out[hplg_pos + 8..], hplg.as_slice());
    assert_eq!(&out[OUTPUT_SECTION_START + 8..OUTPUT_SECTION_START + tptk_len], tptk.as_slice());

    let reparsed = parse_course(&out)?;
    assert!(reparsed.warnings.is_empty());
    assert_eq!(reparsed.sections.len(), 18);
    let empty = reparsed
        .sections
        .values()
        .filter(|s| s.entry_count == 0)
        .count();
    assert_eq!(empty, 16);
    Ok(())
}

#[test]
fn input_order_does_not_change_output() -> kmp_updater::Result<()> {
    let a: RawSection = (b"AERA", 1, 0, vec![1; 0x30]);
    let b: RawSection = (b"IGTS", 1, 9, vec![2; 0x0C]);
    let c: RawSection = (b"TPNE", 2, 0, vec![3; 0x18 * 2]);
    let forward = course_file(0xC1C, &[a.clone(), b.clone(), c.clone()]);
    let backward = course_file(0xC1C, &[c, b, a]);
    assert_eq!(convert_bytes(&forward)?.bytes, convert_bytes(&backward)?.bytes);
    Ok(())
}

#[test]
fn legacy_objects_are_widened_once() -> kmp_updater::Result<()> {
    let legacy = course_file(0x960, &[(b"JBOG", 2, 0, vec![0x11; 0x3C * 2])]);
    let upgraded = convert_bytes(&legacy)?.bytes;

    let course = parse_course(&upgraded)?;
    assert_eq!(course.header.version, 0xC1C);
    let jbog = course.section(section::JBOG).expect("JBOG carried over");
    assert_eq!(jbog.entries.len(), 2);
    for entry in &jbog.entries {
        assert_eq!(entry.len(), 0x40);
        assert_eq!(&entry[0x3C..], &[0xFF, 0xFF, 0x00, 0x00]);
    }

    // already canonical: converting again changes nothing
    assert_eq!(convert_bytes(&upgraded)?.bytes, upgraded);
    Ok(())
}

#[test]
fn unknown_sections_are_dropped() -> kmp_updater::Result<()> {
    let input = course_file(
        0xC1C,
        &[(b"MYST", 1, 0, vec![0; 32]), (b"HPKC", 1, 0, vec![7; 0x10])],
    );
    let conversion = convert_bytes(&input)?;
    assert_eq!(conversion.warnings.len(), 1);

    let course = parse_course(&conversion.bytes)?;
    let tags: Vec<_> = SECTION_LAYOUTS.iter().map(|(t, _)| *t).collect();
    assert!(course.sections.keys().all(|t| tags.contains(t)));
    assert_eq!(
        course.section(section::HPKC).map(|s| s.entries.clone()),
        Some(vec![vec![7; 0x10]])
    );
    Ok(())
}

#[test]
fn batch_converts_files_independently() -> std::io::Result<()> {
    let dir = tempdir()?;
    let good = dir.path().join("Course.kmp");
    let bad = dir.path().join("Broken.kmp");
    let missing = dir.path().join("Missing.kmp");
    fs::write(&good, course_file(0xC1C, &[(b"TPTI", 1, 0, vec![4; 0x14])]))?;
    fs::write(&bad, b"SARC\0\0\0\0\0\0\0\0\0\0\0\0")?;

    let outcomes = convert_batch([&bad, &missing, &good], &ConvertOptions::default());
    assert_eq!(outcomes.len(), 3);

    assert!(matches!(
        outcomes[0].status,
        ConversionStatus::Failed {
            kind: ErrorKind::BadMagic,
            ..
        }
    ));
    assert!(!dir.path().join("Broken.new.kmp").exists());
    assert!(matches!(outcomes[1].status, ConversionStatus::Skipped));

    let ConversionStatus::Converted {
        output,
        bytes_written,
        crc32c: checksum,
        ..
    } = &outcomes[2].status
    else {
        panic!("expected conversion, got {:?}", outcomes[2].status);
    };
    assert_eq!(output, &dir.path().join("Course.new.kmp"));
    let written = fs::read(output)?;
    assert_eq!(written.len(), *bytes_written);
    assert_eq!(crc32c::crc32c(&written), *checksum);
    Ok(())
}

#[test]
fn output_dir_redirects_converted_files() -> std::io::Result<()> {
    let src = tempdir()?;
    let dst = tempdir()?;
    let input = src.path().join("Stage.szs.kmp");
    fs::write(&input, course_file(0xC1C, &[(b"EMAC", 0, 0, vec![])]))?;

    let options = ConvertOptions {
        output_dir: Some(dst.path().to_path_buf()),
    };
    let outcomes = convert_batch([&input], &options);
    assert!(!outcomes[0].is_failure());
    assert!(dst.path().join("Stage.szs.new.kmp").exists());
    assert!(!src.path().join("Stage.szs.new.kmp").exists());
    Ok(())
}
