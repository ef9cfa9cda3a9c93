use anyhow::Result;
use csv::Reader;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufRead, Write};
use std::path::Path;

pub fn read_line<R: BufRead>(stdin: &mut R) -> Result<String> {
    Ok(read_line_or_eof(stdin)?.unwrap_or_default())
}

/// Like [`read_line`], but `None` once input is exhausted.
pub fn read_line_or_eof<R: BufRead>(stdin: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if stdin.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

pub fn clear<W: Write>(out: &mut W) -> io::Result<()> {
    write!(out, "{esc}[2J{esc}[1;1H", esc = 27 as char)
}

pub fn create_reader(path: &Path) -> csv::Result<Reader<File>> {
    csv::ReaderBuilder::new()
        .delimiter(b'|')
        .quote(b'#')
        .has_headers(true)
        .from_path(path)
}

/// Reads all rows of a table. A missing file is an empty table.
pub fn read_table<T: DeserializeOwned>(path: &Path) -> csv::Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = create_reader(path)?;
    reader.deserialize().collect()
}

/// Replaces a table. Rows go to a sibling temp file first, which is then
/// renamed over the old table so readers never see half a file.
pub fn write_table<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> csv::Result<()> {
    let tmp = path.with_extension("csv.tmp");
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'|')
        .quote(b'#')
        .has_headers(false)
        .from_path(&tmp)?;
    writer.write_record(header)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    drop(writer);
    fs::rename(&tmp, path)?;
    Ok(())
}
