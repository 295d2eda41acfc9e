use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::client::ClientConfig;

/// Public GeoLabs (ZOO-Project) test server, used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://tb17.geolabs.fr:8101/ogc-api";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const RC_FILE: &str = ".ogcapirc";

#[derive(Debug, Default)]
struct RcConfig {
    url: Option<String>,
    key: Option<String>,
    verify: Option<bool>,
    timeout: Option<Duration>,
}

pub(crate) fn load_config(
    url: Option<String>,
    key: Option<String>,
    verify: Option<bool>,
) -> Result<ClientConfig> {
    resolve(url, key, verify, |name| std::env::var(name).ok(), &rc_candidates())
}

fn resolve<E>(
    url: Option<String>,
    key: Option<String>,
    verify: Option<bool>,
    env: E,
    rc_candidates: &[PathBuf],
) -> Result<ClientConfig>
where
    E: Fn(&str) -> Option<String>,
{
    let mut url = url.or_else(|| env("OGCAPI_URL"));
    let mut key = key.or_else(|| env("OGCAPI_KEY"));

    let mut rc = RcConfig::default();
    for rc_path in rc_candidates {
        if rc_path.exists() {
            rc = read_rc(rc_path).with_context(|| {
                format!("failed to read configuration file {}", rc_path.display())
            })?;
            debug!(path = %rc_path.display(), "loaded configuration file");
            break;
        }
    }

    if url.is_none() {
        url = rc.url;
    }
    if key.is_none() {
        key = rc.key;
    }

    let url = url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!(
            "invalid base URL {:?}: expected an http:// or https:// URL (set OGCAPI_URL or put `url:` in {})",
            url,
            RC_FILE
        );
    }

    let key = key.filter(|k| !k.trim().is_empty());
    let verify = verify.or(rc.verify).unwrap_or(true);
    let timeout = rc.timeout.unwrap_or(DEFAULT_TIMEOUT);

    Ok(ClientConfig {
        url,
        key,
        verify,
        timeout,
    })
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    let mut cfg = RcConfig::default();

    // `url:` or `key:` may be left empty with the value on the next line.
    let mut pending_key: Option<&str> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(pk) = pending_key.take() {
            // URLs contain a colon, so only a recognised key ends the continuation.
            if !starts_with_known_key(line) {
                let v = strip_quotes(line).to_string();
                match pk {
                    "url" => cfg.url = Some(v),
                    _ => cfg.key = Some(v),
                }
                continue;
            }
        }

        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim();
            let v = strip_quotes(v.trim());
            match k {
                "url" => {
                    if !v.is_empty() {
                        cfg.url = Some(v.to_string());
                    } else {
                        pending_key = Some("url");
                    }
                }
                "key" => {
                    if !v.is_empty() {
                        cfg.key = Some(v.to_string());
                    } else {
                        pending_key = Some("key");
                    }
                }
                "verify" => {
                    if !v.is_empty() {
                        cfg.verify = Some(v != "0");
                    }
                }
                "timeout" => {
                    if !v.is_empty() {
                        let secs: u64 = v
                            .parse()
                            .with_context(|| format!("timeout must be whole seconds, got {:?}", v))?;
                        cfg.timeout = Some(Duration::from_secs(secs));
                    }
                }
                _ => {}
            }
        }
    }

    Ok(cfg)
}

fn starts_with_known_key(line: &str) -> bool {
    line.split_once(':').is_some_and(|(k, _)| {
        matches!(k.trim(), "url" | "key" | "verify" | "timeout")
    })
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // 1) OGCAPI_RC (explicit)
    // 2) ./.ogcapirc
    // 3) ~/.ogcapirc
    if let Ok(p) = std::env::var("OGCAPI_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(RC_FILE));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(RC_FILE));
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_rc(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn defaults_without_any_source() {
        let cfg = resolve(None, None, None, no_env, &[]).unwrap();
        assert_eq!(cfg.url, DEFAULT_BASE_URL);
        assert_eq!(cfg.key, None);
        assert!(cfg.verify);
        assert_eq!(cfg.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn read_rc_supports_comments_quotes_and_continuations() {
        let dir = TempDir::new().unwrap();
        let path = write_rc(
            &dir,
            "rc",
            "# processing server\nurl:\n  https://processes.example.org/ogc-api\nkey: 'abc123'\nverify: 0\ntimeout: 15\n",
        );
        let cfg = read_rc(&path).unwrap();
        assert_eq!(cfg.url.as_deref(), Some("https://processes.example.org/ogc-api"));
        assert_eq!(cfg.key.as_deref(), Some("abc123"));
        assert_eq!(cfg.verify, Some(false));
        assert_eq!(cfg.timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn read_rc_empty_key_followed_by_key_line() {
        let dir = TempDir::new().unwrap();
        let path = write_rc(&dir, "rc", "key:\nurl: http://localhost:5000\n");
        let cfg = read_rc(&path).unwrap();
        assert_eq!(cfg.key, None);
        assert_eq!(cfg.url.as_deref(), Some("http://localhost:5000"));
    }

    #[test]
    fn read_rc_rejects_bad_timeout() {
        let dir = TempDir::new().unwrap();
        let path = write_rc(&dir, "rc", "timeout: soon\n");
        let err = read_rc(&path).unwrap_err();
        assert!(err.to_string().contains("timeout must be whole seconds"));
    }

    #[test]
    fn precedence_argument_env_file() {
        let dir = TempDir::new().unwrap();
        let rc = write_rc(
            &dir,
            ".ogcapirc",
            "url: http://from-file/ogc-api\nkey: file-key\nverify: 0\n",
        );
        let env: HashMap<&str, &str> = [("OGCAPI_URL", "http://from-env/ogc-api")].into();
        let lookup = |name: &str| env.get(name).map(|v| v.to_string());

        let cfg = resolve(None, None, None, lookup, &[rc.clone()]).unwrap();
        assert_eq!(cfg.url, "http://from-env/ogc-api");
        assert_eq!(cfg.key.as_deref(), Some("file-key"));
        assert!(!cfg.verify);

        let cfg = resolve(
            Some("http://from-arg/ogc-api".into()),
            Some("arg-key".into()),
            Some(true),
            lookup,
            &[rc],
        )
        .unwrap();
        assert_eq!(cfg.url, "http://from-arg/ogc-api");
        assert_eq!(cfg.key.as_deref(), Some("arg-key"));
        assert!(cfg.verify);
    }

    #[test]
    fn first_existing_candidate_wins() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let first = write_rc(&dir, "first", "url: http://first/ogc-api\n");
        let second = write_rc(&dir, "second", "url: http://second/ogc-api\n");

        let cfg = resolve(None, None, None, no_env, &[missing, first, second]).unwrap();
        assert_eq!(cfg.url, "http://first/ogc-api");
    }

    #[test]
    fn blank_key_is_ignored() {
        let cfg = resolve(None, Some("   ".into()), None, no_env, &[]).unwrap();
        assert_eq!(cfg.key, None);
    }

    #[test]
    fn non_http_url_is_rejected() {
        let err = resolve(Some("ftp://example.org".into()), None, None, no_env, &[]).unwrap_err();
        assert!(err.to_string().contains("invalid base URL"));
    }
}
