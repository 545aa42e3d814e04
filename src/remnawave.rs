use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Provider {
    #[serde(default)]
    pub name: Option<String>,
}

/// A node as returned by the Remnawave panel. Only the consumed fields are modelled.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Node {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "countryCode", default)]
    pub country_code: Option<String>,
    #[serde(rename = "isDisabled", default, deserialize_with = "null_as_false")]
    pub is_disabled: bool,
    #[serde(default)]
    pub provider: Option<Provider>,
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl Node {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unknown")
    }

    pub fn country(&self) -> &str {
        self.country_code.as_deref().unwrap_or("XX")
    }

    /// Provider name, or an empty string when the node has none.
    pub fn provider_name(&self) -> &str {
        self.provider
            .as_ref()
            .and_then(|p| p.name.as_deref())
            .unwrap_or("")
    }
}

pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("remnawave-sync/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

pub async fn fetch_nodes(client: &reqwest::Client, api_url: &str, api_token: &str) -> Result<Vec<Node>> {
    debug!("Fetching nodes from Remnawave API: {}", api_url);

    let response = client
        .get(api_url)
        .header("Authorization", format!("Bearer {}", api_token))
        .header("Content-Type", "application/json")
        .send()
        .await
        .context("API request failed")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Remnawave API returned error status {}: {}", status, body);
    }

    let payload: Value = response
        .json()
        .await
        .context("Failed to parse Remnawave API response")?;

    let nodes: Vec<Node> = serde_json::from_value(unwrap_envelope(payload))
        .context("Remnawave API response is not a list of nodes")?;

    debug!("Successfully fetched {} nodes", nodes.len());

    Ok(nodes)
}

/// The panel wraps results as `{"response": ...}`; bare payloads pass through.
pub fn unwrap_envelope(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) if map.contains_key("response") => {
            map.remove("response").unwrap_or(Value::Null)
        }
        other => other,
    }
}
