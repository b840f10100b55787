//! Parses a CSV upload into a list of original URLs for `createBulk`.
//! First column is the URL; a header row naming it `url` or
//! `originalUrl` is recognized and skipped, any other header is treated
//! as the first data row.

pub const MAX_CSV_BYTES: usize = 1024 * 1024;
pub const MAX_CSV_ROWS: usize = 100;

const RECOGNIZED_HEADERS: &[&str] = &["url", "originalurl"];

#[derive(Debug)]
pub struct CsvError(pub String);

impl std::fmt::Display for CsvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for CsvError {}

/// Returns the list of candidate URLs found in the first column of each
/// row, capped at [`MAX_CSV_ROWS`]. Blank rows are skipped. Does not
/// validate the URLs themselves — that's `Shortener::create`'s job.
pub fn parse_urls(bytes: &[u8]) -> Result<Vec<String>, CsvError> {
    if bytes.len() > MAX_CSV_BYTES {
        return Err(CsvError(format!(
            "CSV upload exceeds maximum size of {MAX_CSV_BYTES} bytes"
        )));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut urls = Vec::new();
    let mut first_row = true;

    for result in reader.records() {
        let record = result.map_err(|e| CsvError(format!("malformed CSV row: {e}")))?;
        let Some(first_col) = record.get(0) else {
            continue;
        };
        let candidate = first_col.trim();

        if first_row {
            first_row = false;
            if RECOGNIZED_HEADERS.contains(&candidate.to_lowercase().as_str()) {
                continue;
            }
        }

        if candidate.is_empty() {
            continue;
        }

        urls.push(candidate.to_string());
        if urls.len() >= MAX_CSV_ROWS {
            break;
        }
    }

    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_rows_without_header() {
        let csv = "https://a.com\nhttps://b.com\n";
        let urls = parse_urls(csv.as_bytes()).unwrap();
        assert_eq!(urls, vec!["https://a.com", "https://b.com"]);
    }

    #[test]
    fn skips_recognized_header_row() {
        let csv = "originalUrl\nhttps://a.com\n";
        let urls = parse_urls(csv.as_bytes()).unwrap();
        assert_eq!(urls, vec!["https://a.com"]);
    }

    #[test]
    fn skips_blank_rows() {
        let csv = "https://a.com\n\nhttps://b.com\n";
        let urls = parse_urls(csv.as_bytes()).unwrap();
        assert_eq!(urls, vec!["https://a.com", "https://b.com"]);
    }

    #[test]
    fn caps_at_100_rows() {
        let csv = (0..150).map(|i| format!("https://example.com/{i}")).collect::<Vec<_>>().join("\n");
        let urls = parse_urls(csv.as_bytes()).unwrap();
        assert_eq!(urls.len(), MAX_CSV_ROWS);
    }

    #[test]
    fn rejects_oversized_upload() {
        let huge = vec![b'a'; MAX_CSV_BYTES + 1];
        assert!(parse_urls(&huge).is_err());
    }
}
