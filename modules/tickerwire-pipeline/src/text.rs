//! TextNormalizer: derives the two text views (raw-with-links,
//! clean-without-links) from an inbound message, extracts attribution, and
//! rejects degenerate inputs before any service call is made.

use std::sync::LazyLock;

use regex::Regex;

use tickerwire_common::{ExtractedText, InboundMessage, RejectReason};

const MIN_RAW_LEN: usize = 10;
const MIN_CLEAN_LEN: usize = 5;

static MD_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]+)\)").expect("md link regex"));

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://\S+").expect("url regex"));

/// A markdown link whose destination is an image file, with nothing else.
static IMAGE_LINK_ONLY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\[[^\]]*\]\(\s*https?://\S+\.(?:png|jpe?g|gif|webp|svg)(?:\?\S*)?\s*\)$")
        .expect("image link regex")
});

/// A lone social-post URL (bare or markdown-wrapped) with no other text.
static TWEET_LINK_ONLY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:\[[^\]]*\]\(\s*)?https?://(?:www\.)?(?:twitter\.com|x\.com)/[A-Za-z0-9_]+/status/\d+\S*?(?:\s*\))?$",
    )
    .expect("tweet link regex")
});

/// Social-profile URL; capture group 1 is the username.
static PROFILE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:www\.)?(?:twitter\.com|x\.com)/([A-Za-z0-9_]+)")
        .expect("profile regex")
});

/// Path segments that look like usernames but are platform routes.
const RESERVED_PATHS: &[&str] = &["i", "intent", "home", "search", "hashtag", "share", "explore"];

/// Build the raw and clean views for one message.
///
/// `raw` is the primary text plus embed titles/descriptions, in that order.
/// `clean` strips URLs and markdown link syntax and collapses whitespace.
pub fn extract_text(msg: &InboundMessage) -> Result<ExtractedText, RejectReason> {
    let mut parts: Vec<&str> = Vec::new();
    let content = msg.content.trim();
    if !content.is_empty() {
        parts.push(content);
    }
    for embed in &msg.embeds {
        if let Some(title) = embed.title.as_deref() {
            let title = title.trim();
            if !title.is_empty() {
                parts.push(title);
            }
        }
        if let Some(desc) = embed.description.as_deref() {
            let desc = desc.trim();
            if !desc.is_empty() {
                parts.push(desc);
            }
        }
    }

    let raw = parts.join("\n").trim().to_string();
    if raw.is_empty() {
        return Err(RejectReason::NoContent);
    }
    if IMAGE_LINK_ONLY_RE.is_match(&raw) || TWEET_LINK_ONLY_RE.is_match(&raw) {
        return Err(RejectReason::NoContent);
    }
    if raw.chars().count() < MIN_RAW_LEN {
        return Err(RejectReason::InsufficientContent);
    }

    let clean = clean_view(&raw);
    if clean.chars().count() < MIN_CLEAN_LEN {
        return Err(RejectReason::InsufficientContent);
    }

    let (author, retransmit_author) = attribution(&raw, msg.author_name.as_deref());

    Ok(ExtractedText {
        raw,
        clean,
        author,
        retransmit_author,
    })
}

/// Markdown links become their link text, bare URLs are removed, whitespace
/// collapses to single spaces.
pub fn clean_view(raw: &str) -> String {
    let no_links = MD_LINK_RE.replace_all(raw, "$1");
    let no_urls = URL_RE.replace_all(&no_links, "");
    no_urls.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First social-profile URL in raw is the author; a second distinct one is
/// the retransmitting author. Falls back to the declared author name, then
/// to "unknown".
fn attribution(raw: &str, declared: Option<&str>) -> (String, Option<String>) {
    let mut handles: Vec<String> = Vec::new();
    for caps in PROFILE_RE.captures_iter(raw) {
        let handle = caps[1].to_string();
        if RESERVED_PATHS.contains(&handle.to_lowercase().as_str()) {
            continue;
        }
        if !handles.iter().any(|h| h.eq_ignore_ascii_case(&handle)) {
            handles.push(handle);
        }
        if handles.len() == 2 {
            break;
        }
    }

    let mut iter = handles.into_iter();
    match iter.next() {
        Some(author) => (author, iter.next()),
        None => (
            declared
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("unknown")
                .to_string(),
            None,
        ),
    }
}
