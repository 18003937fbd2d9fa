//! Record counting heuristics.
//!
//! The format is picked from the lowercase extension of the whole storage key.
//! Content is always decoded as text, dropping invalid UTF-8 sequences, and the
//! count never fails: anything the heuristics cannot handle falls back to a
//! size-based estimate.

use std::fmt;

use serde::de::{Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};

/// Bytes per record assumed by the size-based estimate.
const ESTIMATED_RECORD_BYTES: usize = 100;

/// Deepest `.json` nesting that is parsed. Deeper documents get the estimate.
pub const MAX_JSON_DEPTH: usize = 1000;

/// Record layout inferred from a key's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// `.jsonl`: one record per non-empty line.
    JsonLines,
    /// `.json`: elements of a top-level array, else a single record.
    Json,
    /// `.csv`: non-empty lines minus a header row.
    Csv,
    /// `.tsv`: non-empty lines. No header row is subtracted.
    Tsv,
    /// `.txt`: non-empty lines.
    Text,
    /// Anything else: non-empty lines, at least one.
    Other,
}

impl RecordFormat {
    pub fn from_key(key: &str) -> Self {
        match extension(key).as_str() {
            "jsonl" => RecordFormat::JsonLines,
            "json" => RecordFormat::Json,
            "csv" => RecordFormat::Csv,
            "tsv" => RecordFormat::Tsv,
            "txt" => RecordFormat::Text,
            _ => RecordFormat::Other,
        }
    }

    pub fn has_header_row(&self) -> bool {
        matches!(self, RecordFormat::Csv)
    }
}

/// Errors that push counting onto the size-based estimate.
#[derive(Debug, thiserror::Error)]
pub enum CountError {
    #[error("JSON nesting depth {depth} exceeds the limit of {limit}")]
    NestingTooDeep { depth: usize, limit: usize },
}

/// Lowercase text after the last `.` of the key, or empty when there is none.
///
/// The whole key is inspected, so a dot in a directory name counts.
pub fn extension(key: &str) -> String {
    key.rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

/// Count the records in `content`, using `key` to pick the format.
pub fn count_records(content: &[u8], key: &str) -> u64 {
    let format = RecordFormat::from_key(key);
    match try_count(content, format) {
        Ok(count) => count,
        Err(e) => {
            let estimate = estimate_from_size(content);
            tracing::warn!(
                error = %e,
                key = %key,
                size_bytes = content.len(),
                estimate,
                "Record counting failed, using size-based estimate"
            );
            estimate
        }
    }
}

/// Count records for a known format without the estimate fallback.
pub fn try_count(content: &[u8], format: RecordFormat) -> Result<u64, CountError> {
    let text = decode_lossy(content);
    let lines = count_non_empty_lines(&text);

    let count = match format {
        RecordFormat::Json => {
            let depth = max_nesting_depth(&text);
            if depth > MAX_JSON_DEPTH {
                return Err(CountError::NestingTooDeep {
                    depth,
                    limit: MAX_JSON_DEPTH,
                });
            }
            parse_json_records(&text).unwrap_or(lines)
        }
        RecordFormat::Other => lines.max(1),
        _ if format.has_header_row() => lines.saturating_sub(1),
        _ => lines,
    };

    Ok(count)
}

/// `max(1, len / 100)`.
pub fn estimate_from_size(content: &[u8]) -> u64 {
    (content.len() / ESTIMATED_RECORD_BYTES).max(1) as u64
}

fn decode_lossy(content: &[u8]) -> String {
    let mut text = String::with_capacity(content.len());
    for chunk in content.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

fn count_non_empty_lines(text: &str) -> u64 {
    text.split('\n')
        .filter(|line| !line.trim().is_empty())
        .count() as u64
}

/// Element count of a top-level array, `1` for any other JSON value.
///
/// Elements are skipped without being built, and the stack grows on demand so
/// nesting up to [`MAX_JSON_DEPTH`] parses.
fn parse_json_records(text: &str) -> Result<u64, serde_json::Error> {
    let mut json = serde_json::Deserializer::from_str(text);
    json.disable_recursion_limit();
    let count = TopLevelCount::deserialize(serde_stacker::Deserializer::new(&mut json))?;
    json.end()?;
    Ok(count.0)
}

struct TopLevelCount(u64);

impl<'de> Deserialize<'de> for TopLevelCount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TopLevelCountVisitor)
    }
}

struct TopLevelCountVisitor;

impl<'de> Visitor<'de> for TopLevelCountVisitor {
    type Value = TopLevelCount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut count = 0u64;
        while seq.next_element::<IgnoredAny>()?.is_some() {
            count += 1;
        }
        Ok(TopLevelCount(count))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(TopLevelCount(1))
    }

    fn visit_bool<E>(self, _: bool) -> Result<Self::Value, E> {
        Ok(TopLevelCount(1))
    }

    fn visit_i64<E>(self, _: i64) -> Result<Self::Value, E> {
        Ok(TopLevelCount(1))
    }

    fn visit_u64<E>(self, _: u64) -> Result<Self::Value, E> {
        Ok(TopLevelCount(1))
    }

    fn visit_f64<E>(self, _: f64) -> Result<Self::Value, E> {
        Ok(TopLevelCount(1))
    }

    fn visit_str<E>(self, _: &str) -> Result<Self::Value, E> {
        Ok(TopLevelCount(1))
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(TopLevelCount(1))
    }
}

/// Deepest array/object nesting in `text`, ignoring brackets inside strings.
fn max_nesting_depth(text: &str) -> usize {
    let mut depth = 0usize;
    let mut max = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for byte in text.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                max = max.max(depth);
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }

    max
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_csv_is_zero_not_negative() {
        assert_eq!(count_records(b"", "f.csv"), 0);
        assert_eq!(count_records(b"\n\n  \n", "f.csv"), 0);
    }

    #[test]
    fn test_text_counts_lines() {
        assert_eq!(count_records(b"a\nb\nc\n", "f.txt"), 3);
        assert_eq!(count_records(b"a\r\n\r\nb\r\n", "f.txt"), 2);
    }

    #[test]
    fn test_csv_subtracts_header() {
        assert_eq!(count_records(b"h\nr1\nr2\n", "f.csv"), 2);
        assert_eq!(count_records(b"header only", "f.csv"), 0);
    }

    #[test]
    fn test_tsv_keeps_header_row() {
        assert_eq!(count_records(b"h\tx\nr1\t1\nr2\t2\n", "f.tsv"), 3);
    }

    #[test]
    fn test_json_array_and_object() {
        assert_eq!(count_records(br#"[{"a":1},{"a":2}]"#, "f.json"), 2);
        assert_eq!(count_records(br#"{"a":1}"#, "f.json"), 1);
        assert_eq!(count_records(b"42", "f.json"), 1);
        assert_eq!(count_records(b"[]", "f.json"), 0);
    }

    #[test]
    fn test_invalid_json_falls_back_to_lines() {
        assert_eq!(count_records(b"not json", "f.json"), 1);
        assert_eq!(count_records(b"{\"a\":1}\n{\"a\":2}\n", "f.json"), 2);
        assert_eq!(count_records(b"", "f.json"), 0);
    }

    #[test]
    fn test_jsonl_counts_non_empty_lines() {
        assert_eq!(count_records(b"l1\nl2\n", "f.jsonl"), 2);
        assert_eq!(count_records(b"\n  l1  \n\n\tl2\n\n", "f.jsonl"), 2);
    }

    #[test]
    fn test_other_extension_is_at_least_one() {
        assert_eq!(count_records(b"", "blob.bin"), 1);
        assert_eq!(count_records(b"", "no_extension"), 1);
        assert_eq!(count_records(b"a\nb\n", "data.log"), 2);
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        assert_eq!(RecordFormat::from_key("DATA.CSV"), RecordFormat::Csv);
        assert_eq!(count_records(b"h\nr1\n", "DATA.CSV"), 1);
        assert_eq!(RecordFormat::from_key("x.JsonL"), RecordFormat::JsonLines);
    }

    #[test]
    fn test_extension_spans_whole_key() {
        assert_eq!(extension("dir.v2/file"), "v2/file");
        assert_eq!(extension("a/b/c"), "");
        assert_eq!(extension("archive.tar.GZ"), "gz");
        assert_eq!(RecordFormat::from_key("dir.csv/file"), RecordFormat::Other);
    }

    #[test]
    fn test_invalid_utf8_is_dropped() {
        let content = b"caf\xff\xfe\nr1\n\xff\n";
        assert_eq!(count_records(content, "f.txt"), 2);
        assert_eq!(count_records(b"\xff\xff\xff", "f.txt"), 0);
    }

    #[test]
    fn test_deeply_nested_json_is_parsed() {
        let content = format!("{}{}", "[".repeat(200), "]".repeat(200));
        assert_eq!(count_records(content.as_bytes(), "f.json"), 1);

        let content = format!("[1, {}{}, 3]", "[".repeat(900), "]".repeat(900));
        assert_eq!(count_records(content.as_bytes(), "f.json"), 3);

        let content = format!("{}1{}", "{\"a\":".repeat(300), "}".repeat(300));
        assert_eq!(count_records(content.as_bytes(), "f.json"), 1);
    }

    #[test]
    fn test_json_beyond_depth_limit_uses_size_estimate() {
        let depth = MAX_JSON_DEPTH + 1;
        let content = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
        assert!(matches!(
            try_count(content.as_bytes(), RecordFormat::Json),
            Err(CountError::NestingTooDeep { depth: 1001, limit: 1000 })
        ));
        assert_eq!(count_records(content.as_bytes(), "deep.json"), 20);
    }

    #[test]
    fn test_nesting_depth_ignores_brackets_in_strings() {
        assert_eq!(max_nesting_depth(r#"[["a"], {"b": "[[[["}]"#), 2);
        assert_eq!(max_nesting_depth(r#"["\"[[", 1]"#), 1);
        assert_eq!(max_nesting_depth("plain"), 0);
    }

    #[test]
    fn test_json_with_trailing_garbage_counts_lines() {
        assert_eq!(count_records(b"[1, 2]\n[3]\n", "f.json"), 2);
    }

    #[test]
    fn test_estimate_is_at_least_one() {
        assert_eq!(estimate_from_size(b""), 1);
        assert_eq!(estimate_from_size(&[b'x'; 99]), 1);
        assert_eq!(estimate_from_size(&[b'x'; 250]), 2);
    }

    #[test]
    fn test_never_panics_on_arbitrary_bytes() {
        let names = ["a.json", "a.jsonl", "a.csv", "a.tsv", "a.txt", "a", "a.bin", ".", ""];
        let samples: Vec<Vec<u8>> = vec![
            vec![],
            vec![0xff; 17],
            b"[1,2,".to_vec(),
            (0u8..=255).collect(),
            b"\n\n\n".to_vec(),
        ];

        for name in names {
            for sample in &samples {
                let _ = count_records(sample, name);
            }
        }
    }
}
