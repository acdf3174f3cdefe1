//! Upgrades KMP course definition files (`DMDC` containers) to the newest
//! canonical layout.
//!
//! A course file is a header, an offset table and a set of sections keyed by
//! 4-character tags. Conversion decodes every known section, widens legacy
//! JBOG entries to the current 0x40-byte shape, and writes all 18 known
//! sections back in a fixed order with fresh offsets, file size and version.
//!
//! ```no_run
//! use std::path::Path;
//! use kmp_updater::{ConvertOptions, convert_file};
//!
//! let outcome = convert_file(Path::new("course.kmp"), &ConvertOptions::default());
//! println!("{:?}", outcome.status);
//! ```

pub mod byte_cursor;
pub mod convert;
pub mod error;
pub mod kmp_parser;
pub mod kmp_writer;
pub mod section;

pub use convert::{
    Conversion, ConversionOutcome, ConversionStatus, ConvertOptions, CourseSummary,
    convert_batch, convert_bytes, convert_file, inspect_file, output_path,
};
pub use error::{ErrorKind, KmpError, Result};
pub use kmp_parser::{KmpHeader, ParseWarning, ParsedCourse, parse_course};
pub use kmp_writer::{assemble, write_course};
pub use section::{EntryLayout, SECTION_LAYOUTS, Section, Tag};
