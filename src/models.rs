use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Members not modelled above, e.g. `hreflang`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Accepted,
    Running,
    Successful,
    Failed,
    Dismissed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Running => "running",
            Self::Successful => "successful",
            Self::Failed => "failed",
            Self::Dismissed => "dismissed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Successful | Self::Failed | Self::Dismissed)
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "accepted" => Ok(Self::Accepted),
            "running" => Ok(Self::Running),
            "successful" => Ok(Self::Successful),
            "failed" => Ok(Self::Failed),
            "dismissed" => Ok(Self::Dismissed),
            other => bail!("unknown job status [{}]", other),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The document served at `/jobs/{jobId}`.
///
/// Serializes back to the members the server sent, including ones this
/// struct does not model (kept in `extra`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    #[serde(
        default,
        rename = "jobID",
        alias = "jobId",
        alias = "job_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub job_id: Option<String>,
    #[serde(default, rename = "processID", alias = "processId", skip_serializing_if = "Option::is_none")]
    pub process_id: Option<String>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,
    /// Members not modelled above, e.g. the required `type`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StatusInfo {
    pub fn job_status(&self) -> Result<JobStatus> {
        self.status.parse()
    }

    pub fn link(&self, rel: &str) -> Option<&Link> {
        self.links
            .iter()
            .flatten()
            .find(|l| l.rel.as_deref() == Some(rel))
    }

    pub fn results_url(&self) -> Option<&str> {
        self.link("results")
            .or_else(|| self.link("http://www.opengis.net/def/rel/ogc/1.0/results"))
            .map(|l| l.href.as_str())
    }
}

/// How the server should run an execute request, expressed through the
/// `Prefer` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Let the server pick.
    #[default]
    Auto,
    Sync,
    Async,
}

impl ExecutionMode {
    pub(crate) fn prefer_header(self) -> Option<&'static str> {
        match self {
            Self::Auto => None,
            Self::Sync => Some("wait"),
            Self::Async => Some("respond-async"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "sync" | "wait" => Ok(Self::Sync),
            "async" | "respond-async" => Ok(Self::Async),
            other => Err(anyhow!(
                "unknown execution mode `{}` (expected auto, sync or async)",
                other
            )),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Sync => "sync",
            Self::Async => "async",
        })
    }
}

/// What the server answered to an execute request.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionOutcome {
    /// HTTP status code: 200 for a synchronous result, 201 for a created job.
    pub status: u16,
    /// The `Location` header, resolved against the request URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "jobID", skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Decoded response body, `null` when empty or not JSON.
    pub body: Value,
}

const EXECUTE_KEYS: [&str; 4] = ["inputs", "outputs", "response", "subscriber"];

/// Builds the execute request document. Objects that already look like one
/// are sent untouched; anything else becomes the `inputs` member.
pub(crate) fn execute_request(value: Value) -> Value {
    match value {
        Value::Object(map) if EXECUTE_KEYS.iter().any(|k| map.contains_key(*k)) => {
            Value::Object(map)
        }
        other => {
            let mut map = Map::new();
            map.insert("inputs".to_string(), other);
            Value::Object(map)
        }
    }
}
