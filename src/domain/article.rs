pub type ArticleNumber = u64;

/// One line of an overview listing: what a source advertises about an
/// article without transferring its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverviewEntry {
    pub number: ArticleNumber,
    pub subject: String,
    pub sender: String,
    pub date: String,
    pub message_id: String,
}

/// Inclusive interval of article numbers to request from a source.
///
/// `first > last` means there is nothing to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArticleRange {
    pub first: ArticleNumber,
    pub last: ArticleNumber,
}

impl ArticleRange {
    pub fn new(first: ArticleNumber, last: ArticleNumber) -> Self {
        Self { first, last }
    }

    /// `last - first`, the distance compared against the fetch limit.
    pub fn span(&self) -> u64 {
        self.last.saturating_sub(self.first)
    }

    /// Number of article numbers covered by the range.
    pub fn len(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.last - self.first + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first > self.last
    }

    pub fn contains(&self, number: ArticleNumber) -> bool {
        number >= self.first && number <= self.last
    }
}

/// A matched article ready for a mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredMessage {
    pub date: String,
    pub from: String,
    pub message_id: String,
    pub body: Vec<String>,
}

impl DeliveredMessage {
    pub fn new(entry: &OverviewEntry, body: Vec<String>) -> Self {
        Self {
            date: entry.date.clone(),
            from: entry.sender.clone(),
            message_id: entry.message_id.clone(),
            body,
        }
    }

    /// The synthetic subject. The real one is a tag and means nothing to a
    /// mail reader.
    pub fn subject(&self) -> String {
        format!("Nym message from {}", self.from)
    }

    pub fn headers(&self) -> String {
        format!(
            "Date: {}\nFrom: {}\nSubject: {}\nMessage-ID: {}\n",
            self.date,
            self.from,
            self.subject(),
            self.message_id
        )
    }

    /// Headers, blank line, body. Newline terminated.
    pub fn to_rfc822(&self) -> String {
        let mut out = self.headers();
        out.push('\n');
        for line in &self.body {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}
