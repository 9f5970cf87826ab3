use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use super::Mailbox;
use crate::domain::article::DeliveredMessage;
use crate::error::DeliveryError;

static DELIVERIES: AtomicU64 = AtomicU64::new(0);

pub struct MaildirSink {
    root: PathBuf,
    ready: bool,
}

impl MaildirSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ready: false,
        }
    }

    fn ensure_dirs(&mut self) -> Result<(), DeliveryError> {
        if self.ready {
            return Ok(());
        }
        for sub in ["cur", "new", "tmp"] {
            fs::create_dir_all(self.root.join(sub))?;
        }
        self.ready = true;
        Ok(())
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| fs::read_to_string("/etc/hostname").ok())
        .map(|h| h.trim().replace(['/', ':'], "_"))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// `<secs>.<pid>_<seq>.<host>`, unique per delivery on this machine.
fn unique_name() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let seq = DELIVERIES.fetch_add(1, Ordering::Relaxed);
    format!("{secs}.{}_{seq}.{}", std::process::id(), hostname())
}

impl Mailbox for MaildirSink {
    fn name(&self) -> String {
        format!("maildir {}", self.root.display())
    }

    fn add(&mut self, msg: &DeliveredMessage) -> Result<(), DeliveryError> {
        self.ensure_dirs()?;
        let name = unique_name();
        let tmp = self.root.join("tmp").join(&name);
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(msg.to_rfc822().as_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp, self.root.join("new").join(&name))?;
        Ok(())
    }
}
