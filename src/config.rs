use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;

use crate::delivery::{MailboxRouter, MaildirSink, MboxSink};
use crate::error::ConfigError;
use crate::matching::esub::EsubEntry;
use crate::matching::{
    EncryptedSubjectMatcher, HashedSubjectMatcher, MatchRules, PlainTextMatcher, hsub,
};
use crate::news::spool::SpoolProvider;
use crate::retrieval::context::{DEFAULT_FETCH_LIMIT, DEFAULT_NEWSGROUP};
use crate::retrieval::{RunContext, Settings};
use crate::store::TextWatermarkStore;

pub const ENV_CONFIG: &str = "AAM2MAIL";
pub const DEFAULT_FETCH_INTERVAL: u64 = 60 * 60;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub log_level: Option<String>,
    pub newsgroup: Option<String>,
    pub fetch_limit: Option<u64>,
    pub fetch_all: Option<bool>,
    /// Seconds between cycles in daemon mode.
    pub fetch_interval: Option<u64>,
    /// Hex digits in generated hsubs.
    pub hsub_len: Option<usize>,
    pub state_dir: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub subjects: SubjectsConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub id: String,
    pub spool: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SubjectsConfig {
    #[serde(default)]
    pub text: Vec<String>,
    #[serde(default)]
    pub hsub: Vec<String>,
    #[serde(default)]
    pub esub: Vec<EsubConfig>,
}

#[derive(Deserialize, Clone)]
pub struct EsubConfig {
    pub text: String,
    pub key: String,
}

impl std::fmt::Debug for EsubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EsubConfig")
            .field("text", &self.text)
            .field("key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DeliveryConfig {
    pub maildir: Option<String>,
    pub mbox: Option<String>,
}

const TEMPLATE: &str = r#"# aam2mail configuration

log_level = "info"
newsgroup = "alt.anonymous.messages"
# Most articles examined per server per cycle.
fetch_limit = 500
# Fetch every body, not just the wanted ones, so the fetch pattern does not
# reveal which messages are yours.
fetch_all = true
# Seconds between cycles when running as a daemon.
fetch_interval = 3600
hsub_len = 48

# One entry per upstream. The spool is a local news spool kept filled by
# your feeder.
[[sources]]
id = "news.example.net"
spool = "/var/spool/news"

[subjects]
# Exact plain text Subjects.
text = ["CHANGE ME"]
# hsub texts.
hsub = []

# esub text and shared key pairs.
# [[subjects.esub]]
# text = "my esub text"
# key = "shared secret"

[delivery]
maildir = "~/Maildir/aam2mail"
# mbox = "~/mbox.aam2mail"
"#;

fn config_dir() -> Result<PathBuf, ConfigError> {
    Ok(dirs::config_dir()
        .ok_or_else(|| ConfigError::InvalidValue {
            key: "config_dir".into(),
            message: "no config dir available".into(),
        })?
        .join("aam2mail"))
}

/// `--config` path, else `$AAM2MAIL`, else the per-user config dir.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }
    if let Some(p) = std::env::var_os(ENV_CONFIG) {
        return Ok(PathBuf::from(p));
    }
    Ok(config_dir()?.join("config.toml"))
}

pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let path = config_path(explicit)?;
    if !path.exists() {
        if explicit.is_some() || std::env::var_os(ENV_CONFIG).is_some() {
            return Err(ConfigError::InvalidValue {
                key: "config".into(),
                message: format!("{} does not exist", path.display()),
            });
        }
        // create a template config for users to edit
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, TEMPLATE)?;
        return Err(ConfigError::InvalidValue {
            key: "config".into(),
            message: format!(
                "created template config at {} - edit it and run again",
                path.display()
            ),
        });
    }
    let s = fs::read_to_string(&path)?;
    Config::parse(&s)
}

/// Like [`load_config`] but never writes a template. `None` when there is no
/// config file yet.
pub fn read_existing_config(explicit: Option<&Path>) -> Result<Option<Config>, ConfigError> {
    let path = config_path(explicit)?;
    if !path.exists() {
        return Ok(None);
    }
    let s = fs::read_to_string(&path)?;
    Config::parse(&s).map(Some)
}

/// `~/` prefixed paths are taken relative to the home directory.
pub fn expand_home(p: &str) -> PathBuf {
    if let Some(rest) = p.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(p)
}

impl Config {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn fetch_interval(&self) -> u64 {
        self.fetch_interval.unwrap_or(DEFAULT_FETCH_INTERVAL)
    }

    pub fn hsub_len(&self) -> Result<usize, ConfigError> {
        let len = self.hsub_len.unwrap_or(hsub::DEFAULT_DIGITS);
        if len % 2 != 0 || !(hsub::MIN_DIGITS..=hsub::MAX_DIGITS).contains(&len) {
            return Err(ConfigError::InvalidValue {
                key: "hsub_len".into(),
                message: format!(
                    "{len} must be even and between {} and {}",
                    hsub::MIN_DIGITS,
                    hsub::MAX_DIGITS
                ),
            });
        }
        Ok(len)
    }

    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let fetch_limit = self.fetch_limit.unwrap_or(DEFAULT_FETCH_LIMIT);
        if fetch_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "fetch_limit".into(),
                message: "must be a positive integer".into(),
            });
        }
        let newsgroup = self
            .newsgroup
            .clone()
            .unwrap_or_else(|| DEFAULT_NEWSGROUP.to_string());
        if newsgroup.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "newsgroup".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(Settings {
            newsgroup,
            fetch_limit,
            fetch_all: self.fetch_all.unwrap_or(true),
        })
    }

    /// Compile the configured subjects. Having none at all is fatal.
    pub fn match_rules(&self) -> Result<MatchRules, ConfigError> {
        let s = &self.subjects;
        let rules = MatchRules::new()
            .with(PlainTextMatcher::new(s.text.iter().cloned()))
            .with(HashedSubjectMatcher::new(s.hsub.iter().cloned()))
            .with(EncryptedSubjectMatcher::new(
                s.esub.iter().map(|e| EsubEntry::new(e.text.clone(), &e.key)),
            ));
        if rules.is_empty() {
            return Err(ConfigError::NoMatchRules);
        }
        Ok(rules)
    }

    /// Configured source ids in order, duplicates removed.
    pub fn source_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for s in &self.sources {
            if ids.contains(&s.id) {
                warn!("{}: listed twice, using the first entry", s.id);
                continue;
            }
            ids.push(s.id.clone());
        }
        ids
    }

    pub fn spool_provider(&self) -> SpoolProvider {
        let mut provider = SpoolProvider::new();
        for id in self.source_ids() {
            if let Some(s) = self.sources.iter().find(|s| s.id == id) {
                provider.add(id, expand_home(&s.spool));
            }
        }
        provider
    }

    /// Open the configured mailboxes. Having none is fatal.
    pub fn mailbox_router(&self) -> Result<MailboxRouter, ConfigError> {
        let mut router = MailboxRouter::new();
        if let Some(p) = self.delivery.maildir.as_deref().filter(|p| !p.is_empty()) {
            router = router.with(MaildirSink::new(expand_home(p)));
        }
        if let Some(p) = self.delivery.mbox.as_deref().filter(|p| !p.is_empty()) {
            router = router.with(MboxSink::new(expand_home(p)));
        }
        if router.is_empty() {
            return Err(ConfigError::NoDeliverySink);
        }
        Ok(router)
    }

    pub fn state_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.state_dir {
            Some(p) => Ok(expand_home(p)),
            None => Ok(dirs::data_dir()
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "state_dir".into(),
                    message: "no data dir available, set state_dir".into(),
                })?
                .join("aam2mail")),
        }
    }

    /// Create the state directory if needed and open the watermark store in
    /// it.
    pub fn watermark_store(&self) -> Result<TextWatermarkStore, ConfigError> {
        let dir = self.state_dir()?;
        create_private_dir(&dir)?;
        Ok(TextWatermarkStore::new(dir.join("servers")))
    }

    /// Everything a cycle needs, validated.
    pub fn run_context(&self) -> Result<RunContext, ConfigError> {
        let settings = self.settings()?;
        let rules = self.match_rules()?;
        let sources = self.source_ids();
        if sources.is_empty() {
            warn!("no sources configured, cycles will do nothing");
        }
        Ok(RunContext::new(settings, rules, sources))
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    if dir.is_dir() {
        return Ok(());
    }
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::Scheme;

    #[test]
    fn template_is_valid() {
        let cfg = Config::parse(TEMPLATE).unwrap();
        let ctx = cfg.run_context().unwrap();
        assert_eq!(ctx.settings, Settings::default());
        assert_eq!(ctx.sources, vec!["news.example.net"]);
        assert_eq!(ctx.rules.describe(), vec![(Scheme::PlainText, 1)]);
        assert_eq!(cfg.mailbox_router().unwrap().len(), 1);
        assert_eq!(cfg.fetch_interval(), 3600);
        assert_eq!(cfg.hsub_len().unwrap(), 48);
    }

    #[test]
    fn full_config() {
        let cfg = Config::parse(
            r#"
            newsgroup = "alt.test"
            fetch_limit = 50
            fetch_all = false
            state_dir = "/tmp/aam2mail-state"

            [[sources]]
            id = "a.example"
            spool = "/srv/a"
            [[sources]]
            id = "b.example"
            spool = "/srv/b"
            [[sources]]
            id = "a.example"
            spool = "/srv/elsewhere"

            [subjects]
            hsub = ["tag one", "tag two"]
            [[subjects.esub]]
            text = "text"
            key = "key"

            [delivery]
            maildir = "/tmp/md"
            mbox = "/tmp/mbox"
            "#,
        )
        .unwrap();

        let ctx = cfg.run_context().unwrap();
        assert_eq!(
            ctx.settings,
            Settings {
                newsgroup: "alt.test".into(),
                fetch_limit: 50,
                fetch_all: false,
            }
        );
        assert_eq!(ctx.sources, vec!["a.example", "b.example"]);
        assert_eq!(
            ctx.rules.describe(),
            vec![(Scheme::Hashed, 2), (Scheme::Encrypted, 1)]
        );
        assert!(ctx.rules.is_wanted("14857375e7174ae1dd83b80612f8a148e2777c7ae78c4c7d"));
        assert_eq!(cfg.mailbox_router().unwrap().len(), 2);
        assert_eq!(cfg.state_dir().unwrap(), PathBuf::from("/tmp/aam2mail-state"));
        assert!(!format!("{:?}", cfg.subjects.esub[0]).contains("\"key\""));
    }

    #[test]
    fn no_rules_is_fatal() {
        let cfg = Config::parse("[delivery]\nmaildir = \"/tmp/md\"\n").unwrap();
        assert!(matches!(cfg.run_context(), Err(ConfigError::NoMatchRules)));
    }

    #[test]
    fn no_sink_is_fatal() {
        let cfg = Config::parse("[subjects]\ntext = [\"hello\"]\n[delivery]\nmbox = \"\"\n").unwrap();
        assert!(matches!(cfg.mailbox_router(), Err(ConfigError::NoDeliverySink)));
    }

    #[test]
    fn bad_values() {
        let cfg = Config::parse("fetch_limit = 0\n[subjects]\ntext = [\"x\"]\n").unwrap();
        assert!(matches!(
            cfg.run_context(),
            Err(ConfigError::InvalidValue { .. })
        ));
        let cfg = Config::parse("hsub_len = 47\n").unwrap();
        assert!(cfg.hsub_len().is_err());
        assert!(matches!(
            Config::parse("fetch_limit = \"lots\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn explicit_missing_file_is_not_templated() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("missing.toml");
        assert!(load_config(Some(path.as_path())).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn read_existing_config_never_templates() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        assert!(read_existing_config(Some(path.as_path())).unwrap().is_none());
        assert!(!path.exists());

        fs::write(&path, "hsub_len = 64\n").unwrap();
        let cfg = read_existing_config(Some(path.as_path())).unwrap().unwrap();
        assert_eq!(cfg.hsub_len().unwrap(), 64);
    }

    #[test]
    fn watermark_store_creates_state_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("state");
        let cfg = Config {
            state_dir: Some(dir.display().to_string()),
            ..Config::default()
        };
        let store = cfg.watermark_store().unwrap();
        assert!(dir.is_dir());
        assert_eq!(store.path(), dir.join("servers"));
    }
}
