//! Per-company frequency CSV reader
//!
//! Each row is parsed then validated into a [`CompanyFrequencyRecord`] or
//! a [`RowRejection`]; a bad row never aborts the file.

use cprep_common::models::PROBLEM_URL_PREFIX;
use cprep_common::{CompanyFrequencyRecord, Error, Result};
use csv::StringRecord;
use std::io::Read;
use std::path::Path;

use crate::company::company_from_path;
use crate::slug::slug_from_link_or_bare;

/// Accepted spellings of the problem name column, in priority order
pub const NAME_HEADERS: [&str; 4] = ["problem_name", "Problem Name", "name", "Title"];
/// Accepted spellings of the link column, in priority order
pub const LINK_HEADERS: [&str; 5] = ["problem_link", "Problem Link", "link", "URL", "url"];
/// Accepted spellings of the occurrence count column, in priority order
pub const COUNT_HEADERS: [&str; 5] = ["num_occur", "Num Occur", "Frequency", "Count", "Occurrences"];

/// Why a row was not turned into a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRejection {
    MissingName,
    MissingLink,
    /// Link present but no slug could be extracted
    UnresolvableLink(String),
    /// Row could not be read as CSV
    Malformed(String),
}

/// Column positions for each logical field, in header priority order
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    name: Vec<usize>,
    link: Vec<usize>,
    count: Vec<usize>,
}

impl ColumnIndex {
    pub fn from_headers(headers: &StringRecord) -> Self {
        let normalized: Vec<&str> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim())
            .collect();
        let positions = |candidates: &[&str]| -> Vec<usize> {
            candidates
                .iter()
                .filter_map(|c| normalized.iter().position(|h| h == c))
                .collect()
        };

        Self {
            name: positions(&NAME_HEADERS),
            link: positions(&LINK_HEADERS),
            count: positions(&COUNT_HEADERS),
        }
    }

    /// True when both required columns were found
    pub fn is_usable(&self) -> bool {
        !self.name.is_empty() && !self.link.is_empty()
    }
}

/// First non-empty value among candidate columns
fn pick<'r>(row: &'r StringRecord, columns: &[usize]) -> &'r str {
    columns
        .iter()
        .filter_map(|&i| row.get(i))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or("")
}

/// Occurrence count; unparsable or negative values count as 0
pub fn parse_count(raw: &str) -> u32 {
    raw.trim()
        .parse::<i64>()
        .map(|n| n.clamp(0, i64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}

/// Validate one row
pub fn parse_row(
    columns: &ColumnIndex,
    row: &StringRecord,
    company: &str,
) -> std::result::Result<CompanyFrequencyRecord, RowRejection> {
    let problem_name = pick(row, &columns.name);
    let problem_link = pick(row, &columns.link);

    if problem_link.is_empty() {
        return Err(RowRejection::MissingLink);
    }
    if problem_name.is_empty() {
        return Err(RowRejection::MissingName);
    }

    let slug = slug_from_link_or_bare(problem_link)
        .ok_or_else(|| RowRejection::UnresolvableLink(problem_link.to_string()))?;

    // Sources spell links differently; store one canonical form
    Ok(CompanyFrequencyRecord {
        problem_name: problem_name.to_string(),
        problem_link: format!("{}{}/", PROBLEM_URL_PREFIX, slug),
        slug,
        company: company.to_string(),
        occurrence_count: parse_count(pick(row, &columns.count)),
    })
}

/// Parsed content of one company CSV
#[derive(Debug, Clone, Default)]
pub struct CsvBatch {
    pub source: String,
    pub company: String,
    pub records: Vec<CompanyFrequencyRecord>,
    /// (line number, reason)
    pub rejections: Vec<(u64, RowRejection)>,
}

/// Read a company CSV; the company label comes from the file name
pub fn read_company_csv(path: &Path) -> Result<CsvBatch> {
    let company = company_from_path(path).ok_or_else(|| {
        Error::InvalidInput(format!("no company name in file name {}", path.display()))
    })?;
    let file = std::fs::File::open(path)?;

    let mut batch = read_company_csv_from_reader(&company, file)?;
    batch.source = path.display().to_string();
    Ok(batch)
}

/// Read company CSV content from any reader
pub fn read_company_csv_from_reader<R: Read>(company: &str, reader: R) -> Result<CsvBatch> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| Error::InvalidInput(format!("unreadable CSV header: {}", e)))?
        .clone();
    let columns = ColumnIndex::from_headers(&headers);
    if !columns.is_usable() {
        return Err(Error::InvalidInput(format!(
            "CSV for {} has no recognised name/link columns (headers: {:?})",
            company,
            headers.iter().collect::<Vec<_>>()
        )));
    }

    let mut batch = CsvBatch {
        source: company.to_string(),
        company: company.to_string(),
        ..Default::default()
    };

    for (index, result) in csv_reader.records().enumerate() {
        // Header is line 1
        let fallback_line = index as u64 + 2;
        match result {
            Ok(row) => {
                let line = row.position().map(|p| p.line()).unwrap_or(fallback_line);
                match parse_row(&columns, &row, company) {
                    Ok(record) => batch.records.push(record),
                    Err(rejection) => batch.rejections.push((line, rejection)),
                }
            }
            Err(e) => batch
                .rejections
                .push((fallback_line, RowRejection::Malformed(e.to_string()))),
        }
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("12"), 12);
        assert_eq!(parse_count(" 7 "), 7);
        assert_eq!(parse_count("seven"), 0);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("-4"), 0);
    }

    #[test]
    fn test_header_variants() {
        let content = "Title,URL,Frequency\nTwo Sum,https://leetcode.com/problems/two-sum/,9\n";
        let batch = read_company_csv_from_reader("Google", content.as_bytes()).unwrap();

        assert_eq!(batch.records.len(), 1);
        let record = &batch.records[0];
        assert_eq!(record.problem_name, "Two Sum");
        assert_eq!(record.slug, "two-sum");
        assert_eq!(record.occurrence_count, 9);
        assert_eq!(record.company, "Google");
        assert_eq!(record.problem_link, "https://leetcode.com/problems/two-sum/");
    }

    #[test]
    fn test_priority_falls_back_to_next_non_empty_column() {
        let content = "problem_name,name,problem_link,num_occur\n,Two Sum,two-sum,3\n";
        let batch = read_company_csv_from_reader("Google", content.as_bytes()).unwrap();

        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].problem_name, "Two Sum");
    }

    #[test]
    fn test_rejections_are_reported_with_reasons() {
        let content = "problem_name,problem_link,num_occur\n\
                       ,https://leetcode.com/problems/two-sum/,3\n\
                       Two Sum,,3\n\
                       Weird,Not A Link,1\n\
                       LRU Cache,https://leetcode.com/problems/lru-cache/,abc\n";
        let batch = read_company_csv_from_reader("Amazon", content.as_bytes()).unwrap();

        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].occurrence_count, 0);
        let reasons: Vec<&RowRejection> = batch.rejections.iter().map(|(_, r)| r).collect();
        assert_eq!(
            reasons,
            vec![
                &RowRejection::MissingName,
                &RowRejection::MissingLink,
                &RowRejection::UnresolvableLink("Not A Link".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_required_columns_is_error() {
        let content = "foo,bar\n1,2\n";
        assert!(read_company_csv_from_reader("Google", content.as_bytes()).is_err());
    }

    #[test]
    fn test_bom_prefixed_header() {
        let content = "\u{feff}problem_name,problem_link,num_occur\nTwo Sum,two-sum,2\n";
        let batch = read_company_csv_from_reader("Google", content.as_bytes()).unwrap();
        assert_eq!(batch.records.len(), 1);
    }
}
