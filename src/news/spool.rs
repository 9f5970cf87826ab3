//! A [`Source`] backed by a traditional news spool on local disk.
//!
//! Layout: `<root>/<group with dots as slashes>/<article number>`, one
//! article per file. Something else (a feeder, `suck`, a local INN) keeps
//! the spool filled; this side only reads.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use super::decoders::{body_lines, overview_from_article};
use super::{GroupInfo, Source, SourceProvider};
use crate::domain::article::{ArticleNumber, OverviewEntry};
use crate::error::SourceError;

#[derive(Debug, Clone, Default)]
pub struct SpoolProvider {
    spools: HashMap<String, PathBuf>,
}

impl SpoolProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, source_id: impl Into<String>, root: impl Into<PathBuf>) {
        self.spools.insert(source_id.into(), root.into());
    }
}

impl SourceProvider for SpoolProvider {
    fn connect(&self, source_id: &str) -> Result<Box<dyn Source + '_>, SourceError> {
        let root = self
            .spools
            .get(source_id)
            .ok_or_else(|| SourceError::Connection {
                server: source_id.to_string(),
                reason: "no spool configured".to_string(),
            })?;
        if !root.is_dir() {
            return Err(SourceError::Connection {
                server: source_id.to_string(),
                reason: format!("spool {} is not a directory", root.display()),
            });
        }
        Ok(Box::new(SpoolSource::new(source_id, root)))
    }
}

pub struct SpoolSource {
    server: String,
    root: PathBuf,
    // Message-ID -> article file, filled by list_overview
    index: HashMap<String, PathBuf>,
}

impl SpoolSource {
    pub fn new(server: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            server: server.into(),
            root: root.into(),
            index: HashMap::new(),
        }
    }

    fn group_dir(&self, group: &str) -> Result<PathBuf, SourceError> {
        let dir = self.root.join(group.replace('.', "/"));
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(SourceError::Protocol {
                server: self.server.clone(),
                reason: format!("no such group {group}"),
            })
        }
    }

    fn protocol(&self, reason: String) -> SourceError {
        SourceError::Protocol {
            server: self.server.clone(),
            reason,
        }
    }
}

/// Article files in `dir` by number. File names are kept as found so that
/// zero-padded names still resolve.
fn article_files(dir: &Path) -> io::Result<Vec<(ArticleNumber, PathBuf)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(n) = entry
            .file_name()
            .to_str()
            .and_then(|s| s.parse::<ArticleNumber>().ok())
        {
            files.push((n, entry.path()));
        }
    }
    files.sort_unstable();
    Ok(files)
}

impl Source for SpoolSource {
    fn advertised_range(&mut self, group: &str) -> Result<GroupInfo, SourceError> {
        let files = article_files(&self.group_dir(group)?)?;
        Ok(match (files.first(), files.last()) {
            (Some((first, _)), Some((last, _))) => GroupInfo {
                first: *first,
                last: *last,
                count: files.len() as u64,
            },
            // empty group: first > last, like a news server reports it
            _ => GroupInfo {
                first: 1,
                last: 0,
                count: 0,
            },
        })
    }

    fn list_overview(
        &mut self,
        group: &str,
        first: ArticleNumber,
        last: ArticleNumber,
    ) -> Result<Vec<OverviewEntry>, SourceError> {
        let dir = self.group_dir(group)?;
        let mut out = Vec::new();
        for (number, path) in article_files(&dir)?
            .into_iter()
            .filter(|(n, _)| (first..=last).contains(n))
        {
            let raw = match fs::read(&path) {
                Ok(raw) => raw,
                // expired between the directory scan and now
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            match overview_from_article(number, &raw) {
                Some(entry) => {
                    self.index.insert(entry.message_id.clone(), path);
                    out.push(entry);
                }
                None => debug!("{}: article {number} has no Message-ID", self.server),
            }
        }
        Ok(out)
    }

    fn fetch_body(&mut self, message_id: &str) -> Result<Vec<String>, SourceError> {
        let path = self
            .index
            .get(message_id)
            .ok_or_else(|| self.protocol(format!("no such article {message_id}")))?;
        let raw = fs::read(path)?;
        Ok(body_lines(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_article(dir: &Path, number: u64, subject: &str) {
        let text = format!(
            "From: sender{number}@example.net\nSubject: {subject}\nDate: today\n\
             Message-ID: <{number}@example.net>\n\nbody of {number}\n"
        );
        fs::write(dir.join(number.to_string()), text).unwrap();
    }

    fn spool() -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let group = tmp.path().join("alt/anonymous/messages");
        fs::create_dir_all(&group).unwrap();
        (tmp, group)
    }

    #[test]
    fn range_listing_and_body() {
        let (tmp, group) = spool();
        for n in [3, 4, 5, 9] {
            write_article(&group, n, &format!("subject {n}"));
        }
        fs::write(group.join(".overview"), "junk").unwrap();

        let mut provider = SpoolProvider::new();
        provider.add("local", tmp.path());
        let mut src = provider.connect("local").unwrap();

        let info = src.advertised_range("alt.anonymous.messages").unwrap();
        assert_eq!(info, GroupInfo { first: 3, last: 9, count: 4 });

        let listed = src.list_overview("alt.anonymous.messages", 4, 9).unwrap();
        let numbers: Vec<_> = listed.iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec![4, 5, 9]);
        assert_eq!(listed[0].subject, "subject 4");

        assert_eq!(src.fetch_body("<5@example.net>").unwrap(), vec!["body of 5"]);
        assert!(matches!(
            src.fetch_body("<3@example.net>"),
            Err(SourceError::Protocol { .. })
        ));
    }

    #[test]
    fn zero_padded_article_names() {
        let (tmp, group) = spool();
        write_article(&group, 4, "subject 4");
        fs::rename(group.join("4"), group.join("0004")).unwrap();

        let mut src = SpoolSource::new("local", tmp.path());
        let info = src.advertised_range("alt.anonymous.messages").unwrap();
        assert_eq!((info.first, info.last, info.count), (4, 4, 1));

        let listed = src.list_overview("alt.anonymous.messages", 1, 10).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].number, 4);
        assert_eq!(src.fetch_body("<4@example.net>").unwrap(), vec!["body of 4"]);
    }

    #[test]
    fn empty_group_advertises_nothing() {
        let (tmp, _group) = spool();
        let mut src = SpoolSource::new("local", tmp.path());
        let info = src.advertised_range("alt.anonymous.messages").unwrap();
        assert!(info.first > info.last);
        assert_eq!(info.count, 0);
    }

    #[test]
    fn missing_group_and_spool() {
        let (tmp, _group) = spool();
        let mut src = SpoolSource::new("local", tmp.path());
        assert!(matches!(
            src.advertised_range("alt.test"),
            Err(SourceError::Protocol { .. })
        ));

        let mut provider = SpoolProvider::new();
        provider.add("gone", tmp.path().join("nope"));
        assert!(matches!(
            provider.connect("gone"),
            Err(SourceError::Connection { .. })
        ));
        assert!(matches!(
            provider.connect("unknown"),
            Err(SourceError::Connection { .. })
        ));
    }
}
