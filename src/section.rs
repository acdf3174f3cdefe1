//! Section records and the per-tag entry codec.
//!
//! A section on disk is:
//!
//! ```text
//! [tag: 4 ASCII bytes][entry_count: u16 LE][extra: u16 LE][entries...]
//! ```
//!
//! How many bytes one entry occupies depends only on the tag (and, for JBOG,
//! on the file version). [`SECTION_LAYOUTS`] lists every tag the converter
//! understands, in the order the canonical output uses.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::byte_cursor::{ByteReader, ByteWriter};
use crate::error::{KmpError, Result};

pub const TAG_LEN: usize = 4;

/// Size of the tag + entry count + extra value prefix of every section.
pub const SECTION_HEADER_LEN: usize = TAG_LEN + 2 + 2;

/// Newest file version that still stores JBOG entries without the trailing
/// route settings word.
pub const LEGACY_JBOG_MAX_VERSION: i32 = 0xBB8;
const LEGACY_JBOG_ENTRY_LEN: usize = 0x3C;
pub const JBOG_ENTRY_LEN: usize = 0x40;
/// Appended to legacy JBOG entries to reach [`JBOG_ENTRY_LEN`].
pub const JBOG_LEGACY_PADDING: [u8; 4] = [0xFF, 0xFF, 0x00, 0x00];

/// ITOP entries are a u16 point count, a u16 setting, then 0x10 bytes per point.
const ITOP_HEADER_LEN: usize = 4;
const ITOP_POINT_LEN: usize = 0x10;

/// A 4-character section identifier, kept as the raw bytes read from disk.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag([u8; TAG_LEN]);

impl Tag {
    pub const fn new(raw: [u8; TAG_LEN]) -> Self {
        Self(raw)
    }

    pub fn as_bytes(&self) -> &[u8; TAG_LEN] {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.0 {
            if byte.is_ascii_graphic() || byte == b' ' {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "\\x{byte:02X}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub const TPTK: Tag = Tag::new(*b"TPTK");
pub const TPNE: Tag = Tag::new(*b"TPNE");
pub const HPNE: Tag = Tag::new(*b"HPNE");
pub const TPTI: Tag = Tag::new(*b"TPTI");
pub const HPTI: Tag = Tag::new(*b"HPTI");
pub const TPKC: Tag = Tag::new(*b"TPKC");
pub const HPKC: Tag = Tag::new(*b"HPKC");
pub const JBOG: Tag = Tag::new(*b"JBOG");
pub const ITOP: Tag = Tag::new(*b"ITOP");
pub const AERA: Tag = Tag::new(*b"AERA");
pub const EMAC: Tag = Tag::new(*b"EMAC");
pub const TPGJ: Tag = Tag::new(*b"TPGJ");
pub const TPNC: Tag = Tag::new(*b"TPNC");
pub const TPSM: Tag = Tag::new(*b"TPSM");
pub const IGTS: Tag = Tag::new(*b"IGTS");
pub const SROC: Tag = Tag::new(*b"SROC");
pub const TPLG: Tag = Tag::new(*b"TPLG");
pub const HPLG: Tag = Tag::new(*b"HPLG");

/// How the entries of a section are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryLayout {
    /// Every entry is exactly this many bytes.
    Fixed(usize),
    /// Object entries: 0x3C bytes up to [`LEGACY_JBOG_MAX_VERSION`], 0x40 after.
    VersionedObject,
    /// Route entries sized by their own leading point count.
    PointList,
    /// The entry count is stored but no entry bytes follow.
    Payloadless,
}

/// Every known tag with its entry layout, in canonical output order.
pub const SECTION_LAYOUTS: [(Tag, EntryLayout); 18] = [
    (TPTK, EntryLayout::Fixed(0x1C)),
    (TPNE, EntryLayout::Fixed(0x18)),
    (HPNE, EntryLayout::Fixed(0x48)),
    (TPTI, EntryLayout::Fixed(0x14)),
    (HPTI, EntryLayout::Fixed(0x1C)),
    (TPKC, EntryLayout::Fixed(0x18)),
    (HPKC, EntryLayout::Fixed(0x10)),
    (JBOG, EntryLayout::VersionedObject),
    (ITOP, EntryLayout::PointList),
    (AERA, EntryLayout::Fixed(0x30)),
    (EMAC, EntryLayout::Fixed(0x48)),
    (TPGJ, EntryLayout::Fixed(0x1C)),
    (TPNC, EntryLayout::Payloadless),
    (TPSM, EntryLayout::Payloadless),
    (IGTS, EntryLayout::Fixed(0x0C)),
    (SROC, EntryLayout::Payloadless),
    (TPLG, EntryLayout::Fixed(0x18)),
    (HPLG, EntryLayout::Fixed(0x0C)),
];

pub fn layout_for(tag: Tag) -> Option<EntryLayout> {
    SECTION_LAYOUTS
        .iter()
        .find(|(known, _)| *known == tag)
        .map(|(_, layout)| *layout)
}

impl EntryLayout {
    /// Reads one entry, normalized to the newest on-disk shape.
    ///
    /// Returns `None` for [`EntryLayout::Payloadless`], which consumes nothing.
    fn read_entry(&self, reader: &mut ByteReader<'_>, version: i32) -> Result<Option<Vec<u8>>> {
        let entry = match *self {
            EntryLayout::Fixed(len) => reader.read_bytes(len)?.to_vec(),
            EntryLayout::VersionedObject if version <= LEGACY_JBOG_MAX_VERSION => {
                let mut entry = Vec::with_capacity(JBOG_ENTRY_LEN);
                entry.extend_from_slice(reader.read_bytes(LEGACY_JBOG_ENTRY_LEN)?);
                entry.extend_from_slice(&JBOG_LEGACY_PADDING);
                entry
            }
            EntryLayout::VersionedObject => reader.read_bytes(JBOG_ENTRY_LEN)?.to_vec(),
            EntryLayout::PointList => {
                let points = reader.peek_u16()? as usize;
                reader
                    .read_bytes(ITOP_HEADER_LEN + points * ITOP_POINT_LEN)?
                    .to_vec()
            }
            EntryLayout::Payloadless => return Ok(None),
        };
        Ok(Some(entry))
    }
}

/// One decoded section. `entries` holds raw entry bytes in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub tag: Tag,
    /// Entry count as stored in the file. Equals `entries.len()` except for
    /// payloadless tags, whose count is kept even though no bytes follow.
    pub entry_count: u16,
    pub extra: u16,
    pub entries: Vec<Vec<u8>>,
}

impl Section {
    /// A placeholder for a tag the input did not contain.
    pub fn empty(tag: Tag) -> Self {
        Self {
            tag,
            entry_count: 0,
            extra: 0,
            entries: Vec::new(),
        }
    }

    pub fn payload_len(&self) -> usize {
        self.entries.iter().map(Vec::len).sum()
    }

    /// Bytes this section occupies when written.
    pub fn encoded_len(&self) -> usize {
        SECTION_HEADER_LEN + self.payload_len()
    }
}

/// Decodes the section starting at the reader's position.
///
/// Fails with [`KmpError::UnknownTag`] when the tag has no known layout; in
/// that case only the section header has been consumed.
pub fn read_section(reader: &mut ByteReader<'_>, version: i32) -> Result<Section> {
    let tag = reader.read_tag()?;
    let entry_count = reader.read_u16()?;
    let extra = reader.read_u16()?;
    let layout = layout_for(tag).ok_or(KmpError::UnknownTag(tag))?;

    let mut entries = Vec::new();
    for _ in 0..entry_count {
        if let Some(entry) = layout.read_entry(reader, version)? {
            entries.push(entry);
        }
    }

    Ok(Section {
        tag,
        entry_count,
        extra,
        entries,
    })
}

/// Writes a section at the writer's position.
pub fn write_section(writer: &mut ByteWriter, section: &Section) -> Result<()> {
    writer.write_tag(section.tag)?;
    writer.write_u16(section.entry_count)?;
    writer.write_u16(section.extra)?;
    for entry in &section.entries {
        writer.write_bytes(entry)?;
    }
    Ok(())
}
