//! CSV reader/writer construction and text decoding.
//!
//! Sources are read once into memory (the cache hashes the same bytes it
//! parses), decoded with `encoding_rs`, and parsed with a flexible, headered
//! `csv` reader; the loader checks each row's width against the header.
//! Exports are always UTF-8; the `-` path writes to stdout.

use std::{
    fs::File,
    io::{BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

use crate::error::PipelineError;

pub const EXPORT_DELIMITER: u8 = b',';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn read_source(path: &Path) -> Result<Vec<u8>, PipelineError> {
    std::fs::read(path).map_err(|source| PipelineError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn decode_bytes(
    bytes: &[u8],
    encoding: &'static Encoding,
    row: usize,
) -> Result<String, PipelineError> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(PipelineError::Decode {
            row,
            encoding: encoding.name(),
        })
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
    row: usize,
) -> Result<Vec<String>, PipelineError> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding, row))
        .collect()
}

/// Decoded header names with surrounding whitespace removed.
pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> Result<Vec<String>, PipelineError>
where
    R: Read,
{
    let headers = reader
        .byte_headers()
        .map_err(|source| PipelineError::Csv { row: 1, source })?
        .clone();
    let decoded = decode_record(&headers, encoding, 1)?;
    Ok(decoded
        .into_iter()
        .map(|name| name.trim_start_matches('\u{feff}').trim().to_string())
        .collect())
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    })
}

pub fn open_csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(EXPORT_DELIMITER)
        .quote_style(csv::QuoteStyle::Necessary)
        .double_quote(true);
    builder.from_writer(writer)
}
