use anyhow::{Context, Result, anyhow, bail};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::client::Client;
use crate::models::ExecutionMode;
use crate::util::DEFAULT_LIMIT;

/// An operation the command line can invoke by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    LandingPage,
    Conformance,
    ProcessList,
    ProcessDescription,
    ProcessExecution,
    JobList,
    JobStatusInfo,
    JobResults,
    DeleteJob,
    WaitForJob,
}

impl Function {
    pub const ALL: [Function; 10] = [
        Function::LandingPage,
        Function::Conformance,
        Function::ProcessList,
        Function::ProcessDescription,
        Function::ProcessExecution,
        Function::JobList,
        Function::JobStatusInfo,
        Function::JobResults,
        Function::DeleteJob,
        Function::WaitForJob,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Function::LandingPage => "get_landing_page",
            Function::Conformance => "get_conformance",
            Function::ProcessList => "get_process_list",
            Function::ProcessDescription => "get_process_description",
            Function::ProcessExecution => "post_process_execution",
            Function::JobList => "get_job_list",
            Function::JobStatusInfo => "get_job_status_info",
            Function::JobResults => "get_job_results",
            Function::DeleteJob => "delete_job",
            Function::WaitForJob => "wait_for_job",
        }
    }

    /// The command-line flag this function cannot run without.
    fn required_flag(self) -> Option<&'static str> {
        match self {
            Function::ProcessDescription | Function::ProcessExecution => Some("--process_id"),
            Function::JobStatusInfo
            | Function::JobResults
            | Function::DeleteJob
            | Function::WaitForJob => Some("--job_id"),
            _ => None,
        }
    }
}

impl FromStr for Function {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Function::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| {
                anyhow!(
                    "unknown function `{}`; expected one of: {}",
                    s,
                    Function::ALL.map(Function::name).join(", ")
                )
            })
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Arguments shared by all functions; each function reads the ones it needs.
#[derive(Debug, Clone)]
pub struct Request {
    pub process_id: String,
    pub job_id: String,
    pub limit: i64,
    /// JSON text: the process inputs or a complete execute request.
    pub process_inputs: String,
    pub mode: ExecutionMode,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            process_id: String::new(),
            job_id: String::new(),
            limit: i64::from(DEFAULT_LIMIT),
            process_inputs: "{}".to_string(),
            mode: ExecutionMode::Auto,
        }
    }
}

/// Runs `function` against `client` and returns its result as JSON.
pub fn dispatch(client: &Client, function: Function, request: &Request) -> Result<Value> {
    if let Some(flag) = function.required_flag() {
        let id = match flag {
            "--process_id" => &request.process_id,
            _ => &request.job_id,
        };
        if id.trim().is_empty() {
            bail!("{} requires {}", function, flag);
        }
    }

    match function {
        Function::LandingPage => client.get_landing_page(),
        Function::Conformance => client.get_conformance(),
        Function::ProcessList => client.get_process_list(request.limit),
        Function::ProcessDescription => client.get_process_description(&request.process_id),
        Function::ProcessExecution => {
            let text = request.process_inputs.trim();
            let inputs: Value = if text.is_empty() {
                Value::Object(Default::default())
            } else {
                serde_json::from_str(text).context("--process_inputs is not valid JSON")?
            };
            let outcome =
                client.post_process_execution(&request.process_id, &inputs, request.mode)?;
            Ok(serde_json::to_value(outcome)?)
        }
        Function::JobList => client.get_job_list(),
        Function::JobStatusInfo => client.get_job_status_info(&request.job_id),
        Function::JobResults => client.get_job_results(&request.job_id),
        Function::DeleteJob => client.delete_job(&request.job_id),
        Function::WaitForJob => Ok(serde_json::to_value(client.wait_for_job(&request.job_id)?)?),
    }
}
