use percent_encoding::percent_decode_str;
use reqwest::{StatusCode, Url};
use std::fmt;

/// Exception report returned by OGC API servers (RFC 7807 problem details).
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct ExceptionReport {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub instance: Option<String>,
    // Older servers (pygeoapi, ZOO-Project) respond with {"code":...,"description":...}
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ExceptionReport {
    fn parse(body: &str) -> Option<Self> {
        let report: Self = serde_json::from_str(body).ok()?;
        let empty = report.kind.is_none()
            && report.title.is_none()
            && report.detail.is_none()
            && report.code.is_none()
            && report.description.is_none();
        if empty { None } else { Some(report) }
    }

    fn title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.code.as_deref())
            .unwrap_or("")
    }

    fn detail(&self) -> &str {
        self.detail
            .as_deref()
            .or(self.description.as_deref())
            .unwrap_or("")
    }
}

/// A request that reached the server but came back with a non-success status.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    url: String,
    report: Option<ExceptionReport>,
    body: String,
}

impl ApiError {
    pub(crate) fn from_response(status: StatusCode, url: &str, body: &str) -> Self {
        Self {
            status,
            url: url.to_string(),
            report: ExceptionReport::parse(body),
            body: body.trim().to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn report(&self) -> Option<&ExceptionReport> {
        self.report.as_ref()
    }

    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }

    /// Names the process or job the failing URL points at, e.g. "job `42`".
    fn resource(&self) -> Option<String> {
        let url = Url::parse(&self.url).ok()?;
        let segments: Vec<&str> = url.path_segments()?.collect();
        let (kind, id) = segments.windows(2).rev().find_map(|pair| match pair {
            ["jobs", id] if !id.is_empty() => Some(("job", *id)),
            ["processes", id] if !id.is_empty() => Some(("process", *id)),
            _ => None,
        })?;
        Some(format!("{} `{}`", kind, percent_decode_str(id).decode_utf8_lossy()))
    }

    fn server_message(&self) -> (&str, &str) {
        match &self.report {
            Some(report) => (report.title(), report.detail()),
            None => ("", self.body.as_str()),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (title, detail) = self.server_message();
        let status_in_body = self
            .report
            .as_ref()
            .and_then(|r| r.status)
            .unwrap_or(self.status.as_u16());

        if self.status == StatusCode::NOT_FOUND {
            return match self.resource() {
                Some(resource) => write!(
                    f,
                    "OGC API {} not found (HTTP 404).\n- Check the identifier, e.g. with get_process_list or get_job_list\n\nServer message: {}\n{}\nrequest: {}",
                    resource, title, detail, self.url
                ),
                None => write!(
                    f,
                    "OGC API endpoint not found (HTTP 404).\n- The configured base URL should point at the API root, e.g. http://tb17.geolabs.fr:8101/ogc-api\n\nServer message: {}\n{}\nrequest: {}",
                    title, detail, self.url
                ),
            };
        }

        if self.status == StatusCode::UNAUTHORIZED || self.status == StatusCode::FORBIDDEN {
            let instance = self
                .report
                .as_ref()
                .and_then(|r| r.instance.as_deref())
                .unwrap_or("(none)");
            return write!(
                f,
                "OGC API authentication/authorization failed (HTTP {}).\n- Set OGCAPI_KEY or put `key:` in .ogcapirc if the server expects a bearer token\n- Ensure the token is not expired\n\nServer message: {}\n{}\ninstance: {}\nrequest: {}",
                status_in_body, title, detail, instance, self.url
            );
        }

        write!(
            f,
            "API request failed: HTTP {} for url ({})\n{}\n{}",
            status_in_body, self.url, title, detail
        )
    }
}

impl std::error::Error for ApiError {}
