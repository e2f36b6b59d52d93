//! The quote-stripping CSV transform.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use hygiene_core::constants::TRANSFER_BUFFER_SIZE;

const QUOTE: char = '"';

/// Copy CSV records from `input` to `output` with every `"` removed from every field.
///
/// Records may have differing field counts. No header row is assumed. Fields that
/// still need quoting after the strip (embedded delimiters or newlines) are
/// re-quoted on output. Returns the number of records written.
pub fn strip_quotes<R: Read, W: Write>(input: R, output: W) -> Result<u64> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);
    let mut writer = WriterBuilder::new().flexible(true).from_writer(output);

    let mut records = 0u64;
    for (index, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV record {}", index + 1))?;
        let cleaned: Vec<String> = record.iter().map(|field| field.replace(QUOTE, "")).collect();
        writer
            .write_record(&cleaned)
            .with_context(|| format!("Failed to write CSV record {}", index + 1))?;
        records += 1;
    }

    writer.flush().context("Failed to flush CSV output")?;
    Ok(records)
}

/// File-to-file variant of [`strip_quotes`]. Blocking; run it off the async runtime.
pub fn strip_quotes_file(source: &Path, target: &Path) -> Result<u64> {
    let input = File::open(source)
        .with_context(|| format!("Failed to open {}", source.display()))?;
    let output = File::create(target)
        .with_context(|| format!("Failed to create {}", target.display()))?;

    strip_quotes(
        BufReader::with_capacity(TRANSFER_BUFFER_SIZE, input),
        BufWriter::with_capacity(TRANSFER_BUFFER_SIZE, output),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str) -> String {
        let mut out = Vec::new();
        strip_quotes(input.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn removes_enclosing_quotes() {
        assert_eq!(run("\"id\",\"name\"\n\"1\",\"dress\"\n"), "id,name\n1,dress\n");
    }

    #[test]
    fn removes_escaped_quotes_inside_fields() {
        assert_eq!(run("1,\"Fashmob \"\"Bandana\"\" Prints\"\n"), "1,Fashmob Bandana Prints\n");
    }

    #[test]
    fn stray_quotes_in_unquoted_fields_are_removed() {
        assert_eq!(
            run("Xi29ep|Fashmob \"Bandana\" Maxi Dress|csa_refash_liv\n"),
            "Xi29ep|Fashmob Bandana Maxi Dress|csa_refash_liv\n"
        );
    }

    #[test]
    fn ragged_rows_are_kept() {
        assert_eq!(run("a,b,c\nd\ne,f\n"), "a,b,c\nd\ne,f\n");
    }

    #[test]
    fn fields_with_delimiters_stay_quoted() {
        assert_eq!(run("\"a,b\",c\n"), "\"a,b\",c\n");
    }

    #[test]
    fn counts_records() {
        let mut out = Vec::new();
        let count = strip_quotes("x\ny\nz\n".as_bytes(), &mut out).unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn file_variant_writes_target() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.csv.download");
        let target = dir.path().join("in.csv");
        std::fs::write(&source, "\"q\",\"r\"\n").unwrap();

        strip_quotes_file(&source, &target).unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "q,r\n");
    }

    #[test]
    fn missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = strip_quotes_file(&dir.path().join("nope"), &dir.path().join("out"));
        assert!(result.is_err());
    }
}
