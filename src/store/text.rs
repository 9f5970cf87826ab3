//! Watermarks as a plain text file: `<source_id> <watermark>` per line.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::warn;

use super::repo::{WatermarkStore, Watermarks};
use crate::error::StoreError;

pub struct TextWatermarkStore {
    path: PathBuf,
}

impl TextWatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

/// Parse the store format. Comments after `#` and blank lines are ignored;
/// a missing or non-numeric watermark reads as 0.
pub fn parse(text: &str) -> Watermarks {
    let mut marks = Watermarks::new();
    for line in text.lines() {
        let content = line.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let mut fields = content.splitn(2, char::is_whitespace);
        let Some(id) = fields.next() else { continue };
        let raw = fields.next().unwrap_or("").trim();
        let mark = raw.parse().unwrap_or_else(|_| {
            warn!("{id}: unreadable watermark {raw:?}, starting from 0");
            0
        });
        marks.set(id, mark);
    }
    marks
}

pub fn render(marks: &Watermarks) -> String {
    let mut out = String::new();
    for (id, mark) in marks.iter() {
        out.push_str(&format!("{} {}\n", id.trim(), mark));
    }
    out
}

impl WatermarkStore for TextWatermarkStore {
    fn load(&self) -> Result<Watermarks, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(parse(&text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Watermarks::new()),
            Err(e) => Err(self.io_err(e)),
        }
    }

    fn save(&self, marks: &Watermarks) -> Result<(), StoreError> {
        // write beside the target, then rename over it
        let tmp = self.path.with_extension("tmp");
        let write = || -> io::Result<()> {
            if let Some(dir) = self.path.parent() {
                fs::create_dir_all(dir)?;
            }
            let mut f = fs::File::create(&tmp)?;
            f.write_all(render(marks).as_bytes())?;
            f.sync_all()?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|e| self.io_err(e))
    }
}
