// Blocking diagnostics - identifies why YouTube refused to serve a video
//
// Works on free-form failure text: playability reasons from the player
// endpoint and stderr from yt-dlp share most of their wording.

use serde::{Deserialize, Serialize};

/// Reasons why YouTube might refuse a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockingReason {
    /// HTTP 403 Forbidden - general access denied
    Http403Forbidden,

    /// PO Token (Proof of Origin) required
    PoTokenRequired,

    /// Age-restricted content requiring login
    AgeRestricted,

    /// Geographic restriction
    GeoBlocked,

    /// Rate limiting (429 or similar)
    RateLimited,

    /// Bot detection triggered
    BotDetection,

    /// Private video requiring authorization
    PrivateVideo,

    /// Video deleted or unavailable
    VideoUnavailable,

    /// DRM-protected content (Premium, Music, Movies)
    DrmProtected,

    /// Member-only content (requires channel membership)
    MembersOnly,

    /// Live stream that has not started yet
    LiveNotStarted,

    /// Generic/unknown blocking
    Unknown,
}

impl BlockingReason {
    /// Stable label used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http403Forbidden => "http_403",
            Self::PoTokenRequired => "po_token_required",
            Self::AgeRestricted => "age_restricted",
            Self::GeoBlocked => "geo_blocked",
            Self::RateLimited => "rate_limited",
            Self::BotDetection => "bot_detection",
            Self::PrivateVideo => "private_video",
            Self::VideoUnavailable => "video_unavailable",
            Self::DrmProtected => "drm_protected",
            Self::MembersOnly => "members_only",
            Self::LiveNotStarted => "live_not_started",
            Self::Unknown => "unknown",
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Http403Forbidden => "Access denied (HTTP 403)",
            Self::PoTokenRequired => "Proof of Origin token required",
            Self::AgeRestricted => "Age-restricted content",
            Self::GeoBlocked => "Geographic restriction",
            Self::RateLimited => "Rate limited by YouTube",
            Self::BotDetection => "Bot detection triggered",
            Self::PrivateVideo => "Private video",
            Self::VideoUnavailable => "Video unavailable",
            Self::DrmProtected => "DRM-protected content",
            Self::MembersOnly => "Members-only content",
            Self::LiveNotStarted => "Live stream has not started",
            Self::Unknown => "Unknown blocking reason",
        }
    }
}

/// Text that points at a network-level failure rather than a refusal
pub fn looks_like_network_failure(error: &str) -> bool {
    let lower = error.to_lowercase();
    lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection refused")
        || lower.contains("connection reset")
        || lower.contains("network unreachable")
        || lower.contains("name resolution")
}

/// `word` occurs with no alphanumeric character directly on either side.
///
/// Keeps short tokens from matching inside video ids (`x429y`) or longer
/// words (`parental`).
fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + word.len()..].chars().next();
        !before.map_or(false, char::is_alphanumeric) && !after.map_or(false, char::is_alphanumeric)
    })
}

/// Analyze error message and return blocking reason
pub fn diagnose_error(error: &str) -> Option<BlockingReason> {
    let lower = error.to_lowercase();

    // Checked in order of specificity

    if contains_word(&lower, "drm")
        || lower.contains("widevine")
        || lower.contains("playready")
        || lower.contains("fairplay")
        || lower.contains("youtube premium")
        || lower.contains("requires purchase")
        || contains_word(&lower, "rental")
        || lower.contains("this video requires payment")
    {
        return Some(BlockingReason::DrmProtected);
    }

    if lower.contains("members only")
        || lower.contains("members-only")
        || lower.contains("join this channel")
        || lower.contains("available to members")
    {
        return Some(BlockingReason::MembersOnly);
    }

    if lower.contains("po token") || lower.contains("proof of origin") {
        return Some(BlockingReason::PoTokenRequired);
    }

    if lower.contains("age-restricted")
        || lower.contains("sign in to confirm your age")
        || lower.contains("inappropriate for some users")
    {
        return Some(BlockingReason::AgeRestricted);
    }

    if lower.contains("private video")
        || lower.contains("video is private")
        || lower.contains("sign in if you've been granted access")
    {
        return Some(BlockingReason::PrivateVideo);
    }

    if lower.contains("premieres in")
        || lower.contains("live event will begin")
        || lower.contains("this live event")
    {
        return Some(BlockingReason::LiveNotStarted);
    }

    if lower.contains("video unavailable")
        || lower.contains("video has been removed")
        || lower.contains("no longer available")
        || lower.contains("video is unavailable")
        || lower.contains("this video isn't available")
    {
        return Some(BlockingReason::VideoUnavailable);
    }

    if lower.contains("not available in your country")
        || lower.contains("blocked in your country")
        || lower.contains("geo restricted")
        || lower.contains("geo-restricted")
    {
        return Some(BlockingReason::GeoBlocked);
    }

    if contains_word(&lower, "429") || lower.contains("rate limit") || lower.contains("too many requests") {
        return Some(BlockingReason::RateLimited);
    }

    if lower.contains("not a bot")
        || lower.contains("captcha")
        || lower.contains("unusual traffic")
        || lower.contains("automated")
    {
        return Some(BlockingReason::BotDetection);
    }

    if contains_word(&lower, "403") || lower.contains("forbidden") {
        return Some(BlockingReason::Http403Forbidden);
    }

    None
}
