//! JSON export of fetched records.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::Result;

/// Write `value` to `path` as pretty-printed UTF-8 JSON.
///
/// Non-ASCII text (kana, kanji) is written as-is, not escaped. An existing
/// file is overwritten.
pub fn export_to_json<T: Serialize + ?Sized>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    info!(path = %path.display(), "exported JSON");
    Ok(())
}

/// Pretty-printed JSON text.
pub fn to_json_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
