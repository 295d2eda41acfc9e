use anyhow::{Context, Result, anyhow, bail};
use reqwest::Url;
use std::time::Duration;

pub(crate) const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: i64 = 10_000;

pub(crate) fn retriable_status(code: u16) -> bool {
    matches!(code, 500 | 502 | 503 | 504 | 429 | 408)
}

pub(crate) fn backoff(current: Duration, max: Duration) -> Duration {
    let next = current.mul_f64(1.5);
    if next > max { max } else { next }
}

/// Appends `segments` to the path of `base`, each one percent-encoded as a
/// single path segment.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url> {
    // `.` and `..` would be dropped or resolved instead of appended.
    if let Some(dots) = segments.iter().find(|s| is_dot_segment(s)) {
        bail!("{:?} is not a valid path segment", dots);
    }
    let trimmed = base.trim_end_matches('/');
    let mut url = Url::parse(trimmed).with_context(|| format!("invalid base URL {:?}", base))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("base URL cannot carry a path: {}", base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Values outside `1..=10000` fall back to the default page size.
pub(crate) fn normalize_limit(limit: i64) -> u32 {
    if (1..=MAX_LIMIT).contains(&limit) {
        limit as u32
    } else {
        DEFAULT_LIMIT
    }
}

pub(crate) fn require_id<'a>(name: &str, id: &'a str) -> Result<&'a str> {
    let id = id.trim();
    if id.is_empty() {
        bail!("{} must not be empty", name);
    }
    if is_dot_segment(id) {
        bail!("{} must not be {:?}", name, id);
    }
    Ok(id)
}

fn is_dot_segment(segment: &str) -> bool {
    matches!(segment, "." | "..")
}

pub(crate) fn job_id_from_location(location: &str) -> Option<String> {
    let path = location.split(['?', '#']).next().unwrap_or(location);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
        .map(str::to_string)
}
