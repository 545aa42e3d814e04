use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::countries;
use crate::remnawave::Node;

pub const NODE_EXPORTER_PORT: u16 = 9100;

/// One entry of a Prometheus `file_sd` document.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FileSdTarget {
    pub targets: Vec<String>,
    pub labels: NodeLabels,
}

// Field order is the label order in the rendered JSON.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct NodeLabels {
    pub node: String,
    pub location: String,
    pub provider: String,
    pub ip: String,
    pub country_code: String,
}

/// Convert Remnawave nodes to `file_sd` targets, dropping disabled nodes.
///
/// An enabled node without an address fails the whole build.
pub fn build_targets(nodes: &[Node]) -> Result<Vec<FileSdTarget>> {
    let mut targets = Vec::with_capacity(nodes.len());

    for (index, node) in nodes.iter().enumerate() {
        if node.is_disabled {
            debug!("Skipping disabled node {}", node.display_name());
            continue;
        }

        let address = node.address.as_deref().with_context(|| {
            format!(
                "Node #{} ({}) has no address field",
                index,
                node.display_name()
            )
        })?;
        let country = node.country();

        targets.push(FileSdTarget {
            targets: vec![format!("{}:{}", address, NODE_EXPORTER_PORT)],
            labels: NodeLabels {
                node: format!("{} {}", countries::flag(country), node.display_name()),
                location: countries::location(country),
                provider: node.provider_name().to_string(),
                ip: address.to_string(),
                country_code: country.to_string(),
            },
        });
    }

    Ok(targets)
}

/// Render targets as 2-space indented JSON with non-ASCII left as is.
pub fn render_file_sd(targets: &[FileSdTarget]) -> Result<String> {
    serde_json::to_string_pretty(targets).context("Failed to serialize file_sd targets")
}
