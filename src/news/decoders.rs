use mailparse::MailHeaderMap;

use crate::domain::article::{ArticleNumber, OverviewEntry};

/// Overview fields from a raw article. `None` without a Message-ID, since
/// such an article can be neither deduplicated nor fetched again.
pub fn overview_from_article(number: ArticleNumber, raw: &[u8]) -> Option<OverviewEntry> {
    let (headers, _body_offset) = mailparse::parse_headers(raw).ok()?;
    let field = |name: &str| {
        headers
            .get_first_value(name)
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };

    let message_id = field("Message-ID");
    if message_id.is_empty() {
        return None;
    }
    Some(OverviewEntry {
        number,
        subject: field("Subject"),
        sender: field("From"),
        date: field("Date"),
        message_id,
    })
}

/// Body of a raw article as text lines, headers stripped.
pub fn body_lines(raw: &[u8]) -> Vec<String> {
    let offset = match mailparse::parse_headers(raw) {
        Ok((_, offset)) => offset,
        Err(_) => 0,
    };
    String::from_utf8_lossy(&raw[offset.min(raw.len())..])
        .lines()
        .map(str::to_string)
        .collect()
}
