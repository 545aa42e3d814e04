use tracing::{debug, info};

use crate::subscription::ProxyUri;

pub const WHITEBOX_TARGET_URL: &str = "https://google.com";

/// Generate the whitebox exporter service-discovery YAML for proxy URIs.
pub fn generate_config(uris: &[String]) -> String {
    let mut config = String::new();

    // Header
    config.push_str("# Auto-generated by remnawave-sync, do not edit by hand\n");
    config.push_str("# Source: SUBSCRIPTION_URL\n");

    for uri in uris {
        let parsed = ProxyUri::parse(uri);
        debug!(
            "Probe target {} from {:?}",
            parsed.client,
            parsed.name.as_deref().unwrap_or_default()
        );

        config.push('\n');
        config.push_str(&format!("- targets: [\"{}\"]\n", WHITEBOX_TARGET_URL));
        config.push_str("  labels:\n");
        config.push_str(&format!("    ctx: \"{}\"\n", escape_double_quoted(&parsed.uri)));
        config.push_str(&format!("    client: \"{}\"\n", parsed.client));
        config.push_str(&format!("    protocol: \"{}\"\n", parsed.protocol));
    }

    info!("Rendered {} whitebox probe targets", uris.len());

    config
}

/// Escape for a YAML double-quoted scalar.
fn escape_double_quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_block_per_uri() {
        let uris = vec![
            "vless://uuid@host:443?type=tcp#My%20Node".to_string(),
            "trojan://pw@other:443".to_string(),
        ];
        let config = generate_config(&uris);

        let expected = "\
# Auto-generated by remnawave-sync, do not edit by hand
# Source: SUBSCRIPTION_URL

- targets: [\"https://google.com\"]
  labels:
    ctx: \"vless://uuid@host:443?type=tcp#My%20Node\"
    client: \"my-node\"
    protocol: \"vless\"

- targets: [\"https://google.com\"]
  labels:
    ctx: \"trojan://pw@other:443\"
    client: \"unknown\"
    protocol: \"trojan\"
";
        assert_eq!(config, expected);
    }

    #[test]
    fn quotes_in_uri_are_escaped() {
        let config = generate_config(&["ss://a\"b\\c#x".to_string()]);
        assert!(config.contains(r#"    ctx: "ss://a\"b\\c#x""#), "{config}");
    }

    #[test]
    fn empty_list_is_header_only() {
        let config = generate_config(&[]);
        assert_eq!(
            config,
            "# Auto-generated by remnawave-sync, do not edit by hand\n# Source: SUBSCRIPTION_URL\n"
        );
    }
}
