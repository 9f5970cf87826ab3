use crate::matching::MatchRules;

pub const DEFAULT_NEWSGROUP: &str = "alt.anonymous.messages";
pub const DEFAULT_FETCH_LIMIT: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub newsgroup: String,
    /// Most articles examined per source per cycle.
    pub fetch_limit: u64,
    /// Fetch every body, wanted or not, so the fetch pattern gives nothing
    /// away.
    pub fetch_all: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            newsgroup: DEFAULT_NEWSGROUP.to_string(),
            fetch_limit: DEFAULT_FETCH_LIMIT,
            fetch_all: true,
        }
    }
}

/// Everything a cycle reads but never changes. Built once at startup and
/// shared by reference with every cycle.
pub struct RunContext {
    pub settings: Settings,
    pub rules: MatchRules,
    pub sources: Vec<String>,
}

impl RunContext {
    pub fn new(settings: Settings, rules: MatchRules, sources: Vec<String>) -> Self {
        Self {
            settings,
            rules,
            sources,
        }
    }
}
