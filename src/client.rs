use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, LOCATION, USER_AGENT};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::load_config;
use crate::error::ApiError;
use crate::models::{ExecutionMode, ExecutionOutcome, JobStatus, StatusInfo, execute_request};
use crate::util::{
    backoff, endpoint, job_id_from_location, normalize_limit, require_id, retriable_status,
};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `http://tb17.geolabs.fr:8101/ogc-api`.
    pub url: String,
    /// Optional bearer token sent as `Authorization: Bearer <key>`.
    pub key: Option<String>,
    /// Whether to verify TLS certificates.
    pub verify: bool,
    /// Per-request timeout.
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct Client {
    url: String,
    key: Option<String>,

    retry_max: usize,
    sleep_max: Duration,
    poll_interval: Duration,
    progress: bool,

    http: HttpClient,
}

impl Client {
    /// Creates a client using environment variables and/or `.ogcapirc`.
    ///
    /// This is equivalent to `Client::new(None, None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::new(None, None, None)
    }

    /// Creates a client using (in order of precedence):
    /// - explicit `url`/`key`/`verify` arguments
    /// - environment variables `OGCAPI_URL` / `OGCAPI_KEY`
    /// - config file from `OGCAPI_RC` or `.ogcapirc`
    /// - [`DEFAULT_BASE_URL`](crate::DEFAULT_BASE_URL)
    pub fn new(url: Option<String>, key: Option<String>, verify: Option<bool>) -> Result<Self> {
        let cfg = load_config(url, key, verify)?;
        Self::from_config(cfg)
    }

    pub fn from_config(cfg: ClientConfig) -> Result<Self> {
        // Fail early on a base URL no endpoint can be built from.
        endpoint(&cfg.url, &[])?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ogc-processes-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("ogc-processes-rs")),
        );
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = HttpClient::builder()
            .default_headers(default_headers)
            .timeout(cfg.timeout);

        if !cfg.verify {
            warn!("TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            url: cfg.url.trim_end_matches('/').to_string(),
            key: cfg.key,
            retry_max: 1,
            sleep_max: Duration::from_secs(120),
            poll_interval: Duration::from_secs(1),
            progress: true,
            http,
        })
    }

    /// Attempts per GET/DELETE request; transient failures are retried.
    /// Execution requests are never retried.
    pub fn with_retry_max(mut self, retry_max: usize) -> Self {
        self.retry_max = retry_max.max(1);
        self
    }

    /// Pause between retries, and the upper bound of the job polling back-off.
    pub fn with_sleep_max(mut self, sleep_max: Duration) -> Self {
        self.sleep_max = sleep_max;
        self
    }

    /// First pause between status polls in [`Client::wait_for_job`]; never
    /// below 10ms.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.url
    }

    /// `GET /`
    pub fn get_landing_page(&self) -> Result<Value> {
        self.api_json(Method::GET, self.endpoint(&[])?)
    }

    /// `GET /conformance`: the conformance classes the server implements.
    pub fn get_conformance(&self) -> Result<Value> {
        self.api_json(Method::GET, self.endpoint(&["conformance"])?)
    }

    /// `GET /processes?limit=N`.
    ///
    /// A `limit` outside `1..=10000` falls back to the default of 10.
    pub fn get_process_list(&self, limit: i64) -> Result<Value> {
        let mut url = self.endpoint(&["processes"])?;
        url.query_pairs_mut()
            .append_pair("limit", &normalize_limit(limit).to_string());
        self.api_json(Method::GET, url)
    }

    /// `GET /processes/{processID}`.
    pub fn get_process_description(&self, process_id: &str) -> Result<Value> {
        let process_id = require_id("process_id", process_id)?;
        self.api_json(Method::GET, self.endpoint(&["processes", process_id])?)
    }

    /// `POST /processes/{processID}/execution`.
    ///
    /// `inputs` is either a complete execute request (an object with an
    /// `inputs` member) or just the inputs, which are then wrapped.
    pub fn post_process_execution<T: Serialize + ?Sized>(
        &self,
        process_id: &str,
        inputs: &T,
        mode: ExecutionMode,
    ) -> Result<ExecutionOutcome> {
        let process_id = require_id("process_id", process_id)?;
        let url = self.endpoint(&["processes", process_id, "execution"])?;
        let inputs = serde_json::to_value(inputs).context("failed to serialize process inputs")?;
        let body = execute_request(inputs);

        let mut req = self.apply_auth(self.http.post(url.clone())).json(&body);
        if let Some(prefer) = mode.prefer_header() {
            req = req.header("Prefer", prefer);
        }
        let resp = req
            .send()
            .with_context(|| format!("could not connect to {}", url))?;

        let status = resp.status();
        debug!(method = "POST", %url, status = status.as_u16(), "response");
        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|l| url.join(l).map(String::from).unwrap_or_else(|_| l.to_string()));
        let text = resp
            .text()
            .with_context(|| format!("failed to read response body from {}", url))?;

        if !status.is_success() {
            return Err(ApiError::from_response(status, url.as_str(), &text).into());
        }

        // Synchronous raw results need not be JSON.
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::Null);
        let job_id = body
            .get("jobID")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| {
                (status == StatusCode::CREATED)
                    .then(|| location.as_deref().and_then(job_id_from_location))
                    .flatten()
            });

        info!(
            process_id,
            status = status.as_u16(),
            job_id = job_id.as_deref().unwrap_or("-"),
            "execution request accepted"
        );

        Ok(ExecutionOutcome {
            status: status.as_u16(),
            location,
            job_id,
            body,
        })
    }

    /// `GET /jobs`.
    pub fn get_job_list(&self) -> Result<Value> {
        self.api_json(Method::GET, self.endpoint(&["jobs"])?)
    }

    /// `GET /jobs/{jobID}`: the job's status info.
    pub fn get_job_status_info(&self, job_id: &str) -> Result<Value> {
        let job_id = require_id("job_id", job_id)?;
        self.api_json(Method::GET, self.endpoint(&["jobs", job_id])?)
    }

    /// `GET /jobs/{jobID}/results`.
    pub fn get_job_results(&self, job_id: &str) -> Result<Value> {
        let job_id = require_id("job_id", job_id)?;
        self.api_json(Method::GET, self.endpoint(&["jobs", job_id, "results"])?)
    }

    /// `DELETE /jobs/{jobID}`: dismisses the job.
    ///
    /// Returns the status info the server answers with, or `null` for an
    /// empty body.
    pub fn delete_job(&self, job_id: &str) -> Result<Value> {
        let job_id = require_id("job_id", job_id)?;
        let url = self.endpoint(&["jobs", job_id])?;
        let (status, text) = self.fetch(Method::DELETE, &url)?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse API JSON (url={}, status={})", url, status))
    }

    /// Polls `GET /jobs/{jobID}` until the job is successful, failed or
    /// dismissed, and returns the final status info.
    pub fn wait_for_job(&self, job_id: &str) -> Result<StatusInfo> {
        let job_id = require_id("job_id", job_id)?;
        let url = self.endpoint(&["jobs", job_id])?;

        let pb = if self.progress {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::with_template("{spinner:.green} job {prefix}: {msg} [{elapsed}]")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_prefix(job_id.to_string());
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        } else {
            None
        };

        let result = self
            .poll_job(&url, job_id, pb.as_ref())
            .with_context(|| format!("while waiting for job {}", job_id));
        if let Some(pb) = &pb {
            match &result {
                Ok(_) => pb.finish_and_clear(),
                Err(_) => pb.abandon(),
            }
        }
        result
    }

    fn poll_job(&self, url: &Url, job_id: &str, pb: Option<&ProgressBar>) -> Result<StatusInfo> {
        let mut sleep = self.poll_interval;
        let mut last_status: Option<JobStatus> = None;
        loop {
            let info: StatusInfo = self.api_json(Method::GET, url.clone())?;
            let status = info.job_status()?;

            if last_status != Some(status) {
                last_status = Some(status);
                info!(job_id, %status, progress = info.progress, "job status");
            }
            if let Some(pb) = pb {
                pb.set_message(match info.progress {
                    Some(p) => format!("{} ({}%)", status, p),
                    None => status.to_string(),
                });
            }

            if status.is_terminal() {
                return Ok(info);
            }

            thread::sleep(sleep);
            sleep = backoff(sleep, self.sleep_max).max(MIN_POLL_INTERVAL);
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        endpoint(&self.url, segments)
    }

    fn apply_auth(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.key {
            Some(key) => req.bearer_auth(key.trim()),
            None => req,
        }
    }

    fn api_json<T: DeserializeOwned>(&self, method: Method, url: Url) -> Result<T> {
        let (status, text) = self.fetch(method, &url)?;
        serde_json::from_str::<T>(&text)
            .with_context(|| format!("failed to parse API JSON (url={}, status={})", url, status))
    }

    /// Issues an idempotent request and returns the body of a 2xx response.
    fn fetch(&self, method: Method, url: &Url) -> Result<(StatusCode, String)> {
        let resp = self.robust_request(url, || {
            self.apply_auth(self.http.request(method.clone(), url.clone()))
                .send()
        })?;

        let status = resp.status();
        debug!(%method, %url, status = status.as_u16(), "response");
        let text = resp
            .text()
            .with_context(|| format!("failed to read response body from {}", url))?;
        if !status.is_success() {
            return Err(ApiError::from_response(status, url.as_str(), &text).into());
        }
        Ok((status, text))
    }

    fn robust_request<F>(&self, url: &Url, mut f: F) -> Result<Response>
    where
        F: FnMut() -> std::result::Result<Response, reqwest::Error>,
    {
        let mut tries = 0usize;
        loop {
            tries += 1;
            match f() {
                Ok(resp) => {
                    let code = resp.status().as_u16();
                    if retriable_status(code) && tries < self.retry_max {
                        warn!(%url, status = code, attempt = tries, "transient HTTP status, retrying");
                        thread::sleep(self.sleep_max);
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if tries >= self.retry_max {
                        return Err(err).with_context(|| format!("could not connect to {}", url));
                    }
                    // timeouts / transient connection errors
                    warn!(%url, attempt = tries, error = %err, "request failed, retrying");
                    thread::sleep(self.sleep_max);
                }
            }
        }
    }
}
