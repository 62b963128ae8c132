//! Company labels derived from CSV source identifiers
//!
//! `goldman_sachs.csv` becomes "Goldman Sachs"; words that already carry
//! an uppercase letter ("eBay", "IBM") are kept as written.

use std::path::Path;

/// Company label for a CSV file path (from its file stem)
pub fn company_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let label = company_label(stem);
    if label.is_empty() {
        None
    } else {
        Some(label)
    }
}

/// Normalize separators to spaces and title-case all-lowercase words
pub fn company_label(source_id: &str) -> String {
    source_id
        .replace(['_', '-'], " ")
        .split_whitespace()
        .map(|word| {
            if word.chars().any(char::is_uppercase) {
                word.to_string()
            } else {
                title_case(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Uppercase every letter that follows a non-letter, lowercase the rest
fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut previous_is_letter = false;

    for c in word.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }

    out
}
