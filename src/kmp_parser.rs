use std::collections::HashMap;
use std::collections::hash_map::Entry;
use thiserror::Error;
use tracing::{debug, warn};

use crate::byte_cursor::ByteReader;
use crate::error::{KmpError, Result};
use crate::section::{EntryLayout, Section, Tag, layout_for, read_section};

/// ASCII identifier at the start of every course file.
pub const KMP_MAGIC: Tag = Tag::new(*b"DMDC");

/// Size of the fixed header fields that precede the offset table.
pub const FIXED_HEADER_LEN: usize = 0x10;

/// Start of section data for a file with `section_count` offset slots.
/// Offsets in the table are relative to this position.
pub fn section_start(section_count: u16) -> usize {
    section_count as usize * 4 + FIXED_HEADER_LEN
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmpHeader {
    /// Total file length as declared by the header.
    pub file_size: u32,
    pub section_count: u16,
    pub header_size: u16,
    pub version: i32,
}

/// Non-fatal problems found while walking the offset table.
#[derive(Debug, Error)]
pub enum ParseWarning {
    #[error("duplicate section: {0}")]
    DuplicateSection(Tag),

    #[error("slot {slot}: section skipped: {source}")]
    SkippedSlot { slot: usize, source: KmpError },

    #[error("{tag} declares {count} entries but carries no entry data")]
    PayloadlessEntries { tag: Tag, count: u16 },

    #[error("header declares {declared} bytes, file is {actual} bytes")]
    DeclaredSizeMismatch { declared: u32, actual: usize },
}

#[derive(Debug)]
pub struct ParsedCourse {
    pub header: KmpHeader,
    /// Decoded sections keyed by tag. Unknown and undecodable sections are absent.
    pub sections: HashMap<Tag, Section>,
    pub warnings: Vec<ParseWarning>,
}

impl ParsedCourse {
    pub fn section(&self, tag: Tag) -> Option<&Section> {
        self.sections.get(&tag)
    }
}

/// Parses a complete course file held in memory.
pub fn parse_course(data: &[u8]) -> Result<ParsedCourse> {
    let mut reader = ByteReader::new(data);

    let magic = reader.read_tag()?;
    if magic != KMP_MAGIC {
        return Err(KmpError::BadMagic { found: magic });
    }

    let header = KmpHeader {
        file_size: reader.read_u32()?,
        section_count: reader.read_u16()?,
        header_size: reader.read_u16()?,
        version: reader.read_i32()?,
    };
    debug!(?header, "read course header");

    if header.section_count == 0 {
        return Err(KmpError::InvalidSectionCount(header.section_count));
    }

    let mut warnings = Vec::new();
    if header.file_size as usize != data.len() {
        warnings.push(ParseWarning::DeclaredSizeMismatch {
            declared: header.file_size,
            actual: data.len(),
        });
    }

    let start = section_start(header.section_count);
    let mut sections = HashMap::new();

    for slot in 0..header.section_count as usize {
        let offset = reader.read_u32()? as usize;
        let table_pos = reader.position();

        reader.set_position(start.saturating_add(offset));
        let decoded = read_section(&mut reader, header.version);
        reader.set_position(table_pos);

        let section = match decoded {
            Ok(section) => section,
            Err(source) => {
                warnings.push(ParseWarning::SkippedSlot { slot, source });
                continue;
            }
        };

        if section.entry_count > 0
            && layout_for(section.tag) == Some(EntryLayout::Payloadless)
        {
            warnings.push(ParseWarning::PayloadlessEntries {
                tag: section.tag,
                count: section.entry_count,
            });
        }

        match sections.entry(section.tag) {
            Entry::Occupied(_) => warnings.push(ParseWarning::DuplicateSection(section.tag)),
            Entry::Vacant(vacant) => {
                vacant.insert(section);
            }
        }
    }

    for warning in &warnings {
        warn!("{warning}");
    }

    Ok(ParsedCourse {
        header,
        sections,
        warnings,
    })
}
