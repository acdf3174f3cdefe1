use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{ErrorKind, Result};
use crate::kmp_parser::{ParseWarning, ParsedCourse, parse_course};
use crate::kmp_writer::{assemble, write_course};
use crate::section::{SECTION_LAYOUTS, Tag};

/// Extension given to converted files, replacing the input's own.
pub const OUTPUT_EXTENSION: &str = "new.kmp";

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Directory for converted files. `None` writes next to each input.
    pub output_dir: Option<PathBuf>,
}

/// An in-memory conversion result.
#[derive(Debug)]
pub struct Conversion {
    pub source_version: i32,
    pub bytes: Vec<u8>,
    pub warnings: Vec<ParseWarning>,
}

/// Parses `data` and re-emits it in the canonical layout.
pub fn convert_bytes(data: &[u8]) -> Result<Conversion> {
    let course = parse_course(data)?;
    let bytes = write_course(&assemble(course.sections))?;
    Ok(Conversion {
        source_version: course.header.version,
        bytes,
        warnings: course.warnings,
    })
}

/// `dir/name.ext` becomes `dir/name.new.kmp`, or `output_dir/name.new.kmp`.
pub fn output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let renamed = input.with_extension(OUTPUT_EXTENSION);
    match (output_dir, renamed.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => renamed,
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionStatus {
    Converted {
        output: PathBuf,
        source_version: i32,
        bytes_written: usize,
        crc32c: u32,
        warnings: Vec<String>,
    },
    /// The input path does not exist.
    Skipped,
    Failed {
        kind: ErrorKind,
        detail: String,
    },
}

#[derive(Debug, Serialize)]
pub struct ConversionOutcome {
    pub input: PathBuf,
    #[serde(flatten)]
    pub status: ConversionStatus,
}

impl ConversionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, ConversionStatus::Failed { .. })
    }
}

fn convert_to(input: &Path, output: &Path) -> Result<(Conversion, u32)> {
    let data = fs::read(input)?;
    let conversion = convert_bytes(&data)?;
    fs::write(output, &conversion.bytes)?;
    let checksum = crc32c::crc32c(&conversion.bytes);
    Ok((conversion, checksum))
}

/// Converts one file. Never fails: problems are reported in the outcome.
pub fn convert_file(input: &Path, options: &ConvertOptions) -> ConversionOutcome {
    if !input.exists() {
        debug!(input = %input.display(), "input does not exist, skipping");
        return ConversionOutcome {
            input: input.to_path_buf(),
            status: ConversionStatus::Skipped,
        };
    }

    let output = output_path(input, options.output_dir.as_deref());
    let status = match convert_to(input, &output) {
        Ok((conversion, crc32c)) => {
            info!(
                input = %input.display(),
                output = %output.display(),
                source_version = conversion.source_version,
                "converted file"
            );
            ConversionStatus::Converted {
                output,
                source_version: conversion.source_version,
                bytes_written: conversion.bytes.len(),
                crc32c,
                warnings: conversion.warnings.iter().map(ToString::to_string).collect(),
            }
        }
        Err(e) => {
            warn!(input = %input.display(), "conversion failed: {e}");
            ConversionStatus::Failed {
                kind: e.kind(),
                detail: e.to_string(),
            }
        }
    };

    ConversionOutcome {
        input: input.to_path_buf(),
        status,
    }
}

/// Converts every input in order. One file's failure never stops the rest.
pub fn convert_batch<I, P>(inputs: I, options: &ConvertOptions) -> Vec<ConversionOutcome>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    inputs
        .into_iter()
        .map(|input| convert_file(input.as_ref(), options))
        .collect()
}

#[derive(Debug, Serialize)]
pub struct SectionSummary {
    pub tag: Tag,
    pub entry_count: u16,
    pub extra: u16,
    pub payload_bytes: usize,
}

#[derive(Debug, Serialize)]
pub struct CourseSummary {
    pub file_size: u32,
    pub section_count: u16,
    pub header_size: u16,
    pub version: i32,
    /// Decoded sections in canonical order.
    pub sections: Vec<SectionSummary>,
    pub warnings: Vec<String>,
}

impl From<&ParsedCourse> for CourseSummary {
    fn from(course: &ParsedCourse) -> Self {
        let sections = SECTION_LAYOUTS
            .iter()
            .filter_map(|(tag, _)| course.section(*tag))
            .map(|section| SectionSummary {
                tag: section.tag,
                entry_count: section.entry_count,
                extra: section.extra,
                payload_bytes: section.payload_len(),
            })
            .collect();

        Self {
            file_size: course.header.file_size,
            section_count: course.header.section_count,
            header_size: course.header.header_size,
            version: course.header.version,
            sections,
            warnings: course.warnings.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Parses a file without converting it.
pub fn inspect_file(input: &Path) -> Result<CourseSummary> {
    let data = fs::read(input)?;
    let course = parse_course(&data)?;
    Ok(CourseSummary::from(&course))
}
