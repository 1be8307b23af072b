use serde_json::{json, Value};
use std::time::Duration;

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;
use crate::config::config;

pub fn default_url() -> String {
    format!("http://localhost:{}", config().server.port)
}

pub async fn handle(url: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let base = url.unwrap_or_else(default_url);
    let endpoint = format!("{}/health", base.trim_end_matches('/'));

    let client = reqwest::Client::new();
    let response = client
        .get(&endpoint)
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Could not reach {}: {}", endpoint, e))?;

    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if status.is_success() {
        output_success(
            &output_format,
            &format!("{} is healthy", base),
            Some(json!({ "status": status.as_u16(), "health": body["data"] })),
        )
    } else {
        output_error(
            &output_format,
            &format!("{} answered {}", base, status),
            body["code"].as_str(),
        )?;
        anyhow::bail!("server is not healthy")
    }
}
