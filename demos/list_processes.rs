use anyhow::Result;
use ogc_processes::{Client, ExecutionMode};
use serde_json::json;

fn main() -> Result<()> {
    // Uses OGCAPI_URL / .ogcapirc, or the GeoLabs test server.
    let client = Client::from_env()?;

    let processes = client.get_process_list(5)?;
    println!("{:#}", processes);

    let outcome = client.post_process_execution(
        "echo",
        &json!({ "a": "Hello from Rust" }),
        ExecutionMode::Async,
    )?;

    if let Some(job_id) = outcome.job_id {
        let status = client.wait_for_job(&job_id)?;
        println!("job {} finished as {}", job_id, status.status);
        println!("{:#}", client.get_job_results(&job_id)?);
    }
    Ok(())
}
