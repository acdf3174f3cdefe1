//! Canonical course writer.
//!
//! Output always carries every tag of [`SECTION_LAYOUTS`] in that order:
//!
//! ```text
//! [magic "DMDC"][file_size: u32][0x12: u16][0x58: u16][0xC1C: i32]
//! [offset table: 18 x u32, relative to the end of the table]
//! [section] x 18
//! ```
//!
//! Section lengths are only known once a section has been written, so each
//! offset slot is patched after the fact: note the position, seek back to
//! the slot, write it, seek forward again, then write the section.

use std::collections::HashMap;

use crate::byte_cursor::ByteWriter;
use crate::error::Result;
use crate::kmp_parser::{FIXED_HEADER_LEN, KMP_MAGIC, section_start};
use crate::section::{SECTION_LAYOUTS, Section, Tag, write_section};

pub const CANONICAL_SECTION_COUNT: u16 = SECTION_LAYOUTS.len() as u16;
pub const CANONICAL_HEADER_SIZE: u16 = 0x58;
/// Every converted file is stamped with this version.
pub const CANONICAL_VERSION: i32 = 0xC1C;

const FILE_SIZE_POS: usize = 4;

/// Orders `sections` canonically, filling in empty sections for missing tags.
///
/// Sections with tags outside the canonical list are dropped.
pub fn assemble(mut sections: HashMap<Tag, Section>) -> Vec<Section> {
    SECTION_LAYOUTS
        .iter()
        .map(|(tag, _)| sections.remove(tag).unwrap_or_else(|| Section::empty(*tag)))
        .collect()
}

/// Serializes canonically ordered sections into a complete course file.
pub fn write_course(sections: &[Section]) -> Result<Vec<u8>> {
    let section_count = sections.len() as u16;
    let start = section_start(section_count);

    let mut writer = ByteWriter::new();
    writer.write_tag(KMP_MAGIC)?;
    writer.skip(4);
    writer.write_u16(section_count)?;
    writer.write_u16(CANONICAL_HEADER_SIZE)?;
    writer.write_i32(CANONICAL_VERSION)?;

    writer.skip(section_count as usize * 4);

    for (slot, section) in sections.iter().enumerate() {
        let section_pos = writer.position();
        writer.set_position(FIXED_HEADER_LEN + slot * 4);
        writer.write_u32((section_pos - start) as u32)?;
        writer.set_position(section_pos);
        write_section(&mut writer, section)?;
    }

    let file_size = writer.len() as u32;
    writer.set_position(FILE_SIZE_POS);
    writer.write_u32(file_size)?;

    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_cursor::ByteReader;
    use crate::section::{HPLG, JBOG, SECTION_HEADER_LEN, TPTK};

    fn with_entries(tag: Tag, entries: Vec<Vec<u8>>) -> Section {
        Section {
            tag,
            entry_count: entries.len() as u16,
            extra: 0,
            entries,
        }
    }

    #[test]
    fn assemble_fills_canonical_order() {
        let mut parsed = HashMap::new();
        parsed.insert(HPLG, with_entries(HPLG, vec![vec![1; 0x0C]]));
        parsed.insert(TPTK, with_entries(TPTK, vec![vec![2; 0x1C]]));
        parsed.insert(Tag::new(*b"ABCD"), Section::empty(Tag::new(*b"ABCD")));

        let ordered = assemble(parsed);
        let tags: Vec<Tag> = ordered.iter().map(|s| s.tag).collect();
        let canonical: Vec<Tag> = SECTION_LAYOUTS.iter().map(|(t, _)| *t).collect();
        assert_eq!(tags, canonical);
        assert_eq!(ordered.iter().filter(|s| s.entry_count == 0).count(), 16);
        assert_eq!(ordered[0].entries.len(), 1);
        assert_eq!(ordered[17].entries.len(), 1);
    }

    #[test]
    fn empty_course_has_header_only_sections() -> Result<()> {
        let bytes = write_course(&assemble(HashMap::new()))?;
        let start = section_start(CANONICAL_SECTION_COUNT);
        assert_eq!(bytes.len(), start + 18 * SECTION_HEADER_LEN);

        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_tag()?, KMP_MAGIC);
        assert_eq!(reader.read_u32()? as usize, bytes.len());
        assert_eq!(reader.read_u16()?, 0x12);
        assert_eq!(reader.read_u16()?, 0x58);
        assert_eq!(reader.read_i32()?, 0xC1C);
        for slot in 0..18 {
            assert_eq!(reader.read_u32()? as usize, slot * SECTION_HEADER_LEN);
        }
        Ok(())
    }

    #[test]
    fn offsets_chain_over_variable_payloads() -> Result<()> {
        let mut parsed = HashMap::new();
        parsed.insert(TPTK, with_entries(TPTK, vec![vec![0xA; 0x1C]; 2]));
        parsed.insert(JBOG, with_entries(JBOG, vec![vec![0xB; 0x40]]));
        let ordered = assemble(parsed);
        let bytes = write_course(&ordered)?;
        let start = section_start(CANONICAL_SECTION_COUNT);

        let mut reader = ByteReader::new(&bytes);
        reader.set_position(FIXED_HEADER_LEN);
        let mut expected = 0;
        for section in &ordered {
            let offset = reader.read_u32()? as usize;
            assert_eq!(offset, expected, "{}", section.tag);

            let mut at = ByteReader::new(&bytes);
            at.set_position(start + offset);
            assert_eq!(at.read_tag()?, section.tag);
            expected += section.encoded_len();
        }
        assert_eq!(start + expected, bytes.len());
        Ok(())
    }
}
