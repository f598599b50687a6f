//! Customer validation for data files
//!
//! A data file is a zip archive carrying a `request.xml` descriptor; the
//! first `<CustomerName>` element in it names the customer the file
//! belongs to. Destinations only accept files for the customers listed in
//! their configuration.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{info, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::eligibility::CandidateFile;
use crate::error::ValidationError;

/// Archive entry holding the descriptor document
pub const DESCRIPTOR_ENTRY: &str = "request.xml";

/// Element whose text is the customer identifier
pub const IDENTIFIER_NODE: &str = "CustomerName";

/// Reads the customer identifier out of the data file at `path`
///
/// # Errors
/// - The file cannot be opened or is not a zip archive
/// - The archive has no `request.xml` entry
/// - The descriptor is not well-formed XML
/// - No `<CustomerName>` element exists (`ValidationError::MissingIdentifier`)
pub fn extract_customer(path: &Path) -> Result<String, ValidationError> {
    let file = File::open(path).map_err(|source| ValidationError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|source| {
        ValidationError::Archive {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let entry = archive.by_name(DESCRIPTOR_ENTRY).map_err(|source| match source {
        ZipError::FileNotFound => ValidationError::MissingDescriptor {
            path: path.to_path_buf(),
            entry: DESCRIPTOR_ENTRY,
        },
        source => ValidationError::Archive {
            path: path.to_path_buf(),
            source,
        },
    })?;

    find_identifier(BufReader::new(entry))
        .map_err(|source| ValidationError::Markup {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| ValidationError::MissingIdentifier {
            path: path.to_path_buf(),
            node: IDENTIFIER_NODE,
        })
}

/// Text of the first identifier element at any depth, trimmed
fn find_identifier<R: Read>(source: BufReader<R>) -> Result<Option<String>, quick_xml::Error> {
    let mut reader = Reader::from_reader(source);
    let mut buf = Vec::new();
    let mut inside = false;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if !inside && e.local_name().as_ref() == IDENTIFIER_NODE.as_bytes() => {
                inside = true;
            }
            Event::Empty(e) if !inside && e.local_name().as_ref() == IDENTIFIER_NODE.as_bytes() => {
                return Ok(Some(String::new()));
            }
            Event::Text(t) if inside => text.push_str(&t.unescape()?),
            Event::CData(t) if inside => text.push_str(&String::from_utf8_lossy(&t)),
            Event::End(e) if inside && e.local_name().as_ref() == IDENTIFIER_NODE.as_bytes() => {
                return Ok(Some(text.trim().to_string()));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

/// Whether the candidate's customer is one of `expected`
///
/// # Errors
/// Any `extract_customer` failure; the identifier is read once per file.
pub fn validate(candidate: &CandidateFile, expected: &[String]) -> Result<bool, ValidationError> {
    let actual = candidate.customer()?;
    Ok(expected.iter().any(|c| c == actual))
}

/// Drops candidates whose customer is not accepted by every destination
///
/// # Arguments
/// * `allowlists` - (destination label, accepted customers) per destination
///
/// Mismatches and unreadable descriptors are logged per file and the file
/// is left where it is; they never fail the directory.
pub fn retain_valid_customers(candidates: &mut Vec<CandidateFile>, allowlists: &[(&str, &[String])]) {
    candidates.retain(|candidate| match check_all(candidate, allowlists) {
        Ok(()) => true,
        Err(e) => {
            warn!(file = %candidate.path.display(), error = %e, "Skipping file failing customer validation");
            false
        }
    });
}

fn check_all(candidate: &CandidateFile, allowlists: &[(&str, &[String])]) -> Result<(), ValidationError> {
    for (label, expected) in allowlists {
        let actual = candidate.customer()?;
        info!(destination = %label, expected = ?expected, actual = %actual, "Validate config customer");
        if !validate(candidate, expected)? {
            return Err(ValidationError::Mismatch {
                path: candidate.path.clone(),
                expected: expected.to_vec(),
                actual: actual.to_string(),
            });
        }
    }
    Ok(())
}
