use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::Utc;

use super::Mailbox;
use crate::domain::article::DeliveredMessage;
use crate::error::DeliveryError;

pub struct MboxSink {
    path: PathBuf,
    file: Option<BufWriter<File>>,
}

impl MboxSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>, DeliveryError> {
        if self.file.is_none() {
            if let Some(dir) = self.path.parent() {
                fs::create_dir_all(dir)?;
            }
            let f = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            self.file = Some(BufWriter::new(f));
        }
        self.file.as_mut().ok_or_else(|| DeliveryError::Sink {
            sink: self.path.display().to_string(),
            reason: "mbox not open".to_string(),
        })
    }
}

/// One mbox record: separator line, message with `From ` lines quoted, a
/// trailing blank line.
pub fn render(msg: &DeliveredMessage) -> String {
    let mut out = format!(
        "From MAILER-DAEMON {}\n",
        Utc::now().format("%a %b %e %H:%M:%S %Y")
    );
    for line in msg.to_rfc822().lines() {
        if line.trim_start_matches('>').starts_with("From ") {
            out.push('>');
        }
        out.push_str(line);
        out.push('\n');
    }
    out.push('\n');
    out
}

impl Mailbox for MboxSink {
    fn name(&self) -> String {
        format!("mbox {}", self.path.display())
    }

    fn add(&mut self, msg: &DeliveredMessage) -> Result<(), DeliveryError> {
        let record = render(msg);
        let w = self.writer()?;
        w.write_all(record.as_bytes())?;
        // on disk before the engine may move the watermark past it
        w.flush()?;
        w.get_ref().sync_all()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DeliveryError> {
        if let Some(mut f) = self.file.take() {
            f.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(id: &str, body: &[&str]) -> DeliveredMessage {
        DeliveredMessage {
            date: "today".into(),
            from: "nym@example.net".into(),
            message_id: id.into(),
            body: body.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn quotes_from_lines() {
        let text = render(&msg("<1@x>", &["From here on", ">From quoted", "Fromage"]));
        assert!(text.starts_with("From MAILER-DAEMON "));
        assert!(text.contains("\n>From here on\n"));
        assert!(text.contains("\n>>From quoted\n"));
        assert!(text.contains("\nFromage\n"));
        assert!(text.ends_with("Fromage\n\n"));
    }

    #[test]
    fn appends_across_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mail/aam.mbox");
        let mut sink = MboxSink::new(&path);
        sink.add(&msg("<1@x>", &["one"])).unwrap();
        sink.close().unwrap();
        sink.add(&msg("<2@x>", &["two"])).unwrap();
        sink.close().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("\nFrom MAILER-DAEMON ").count() + 1, 2);
        assert!(text.contains("Message-ID: <1@x>"));
        assert!(text.contains("Message-ID: <2@x>"));
    }

    #[test]
    fn add_is_durable_before_close() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("aam.mbox");
        let mut sink = MboxSink::new(&path);
        sink.add(&msg("<1@x>", &["one"])).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("Message-ID: <1@x>"));
        assert!(text.ends_with("one\n\n"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn full_device_fails_add() {
        let mut sink = MboxSink::new("/dev/full");
        assert!(sink.add(&msg("<1@x>", &["one"])).is_err());
    }
}
