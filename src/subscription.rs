use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use tracing::{debug, warn};

pub const SUPPORTED_PROTOCOLS: &[&str] = &["vless", "vmess", "trojan", "ss", "hysteria2", "tuic"];

const SCHEME_SEPARATOR: &str = "://";
const UNKNOWN_CLIENT: &str = "unknown";

// Subscriptions come padded or unpadded, in either alphabet.
const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

static NON_LABEL_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9-]+").unwrap());
static DASH_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());

/// A proxy URI from the subscription feed with the bits the probe labels need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyUri {
    pub uri: String,
    pub protocol: String,
    pub name: Option<String>,
    pub client: String,
}

impl ProxyUri {
    pub fn parse(uri: &str) -> Self {
        let protocol = scheme(uri).unwrap_or(uri).to_lowercase();

        let name = uri
            .split_once('#')
            .map(|(_, fragment)| percent_decode_str(fragment).decode_utf8_lossy().into_owned());

        let client = match name.as_deref() {
            Some(name) => sanitize_client(name),
            None => UNKNOWN_CLIENT.to_string(),
        };

        ProxyUri {
            uri: uri.to_string(),
            protocol,
            name,
            client,
        }
    }
}

// `\n`, `\r`, vertical tab, form feed, separators 0x1c-0x1e, NEL and U+2028/U+2029.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn scheme(line: &str) -> Option<&str> {
    line.split_once(SCHEME_SEPARATOR).map(|(scheme, _)| scheme)
}

pub fn is_supported_protocol(scheme: &str) -> bool {
    let scheme = scheme.to_lowercase();
    SUPPORTED_PROTOCOLS.contains(&scheme.as_str())
}

/// Turn a display name into a Prometheus-friendly label value.
pub fn sanitize_client(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let dashed = NON_LABEL_CHARS.replace_all(&lowered, "-");
    let collapsed = DASH_RUNS.replace_all(&dashed, "-");
    let client = collapsed.trim_matches('-');

    if client.is_empty() {
        UNKNOWN_CLIENT.to_string()
    } else {
        client.to_string()
    }
}

/// Decode a subscription body: base64 first, raw UTF-8 (lossy) otherwise.
pub fn decode_body(raw: &[u8]) -> String {
    let cleaned: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    if !cleaned.is_empty() {
        for engine in [&STANDARD_LENIENT, &URL_SAFE_LENIENT] {
            if let Ok(bytes) = engine.decode(&cleaned) {
                if let Ok(text) = String::from_utf8(bytes) {
                    return text;
                }
            }
        }
    }

    String::from_utf8_lossy(raw).into_owned()
}

/// Keep the lines whose scheme is a supported proxy protocol, in feed order.
pub fn extract_proxy_uris(text: &str) -> Vec<String> {
    text.split(is_line_break)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| scheme(line).is_some_and(is_supported_protocol))
        .map(str::to_string)
        .collect()
}

/// Fetch the subscription feed. Failures are logged and yield no URIs.
pub async fn fetch_subscription(client: &reqwest::Client, url: &str) -> Vec<String> {
    match fetch_body(client, url).await {
        Ok(raw) => {
            let uris = extract_proxy_uris(&decode_body(&raw));
            debug!("Subscription contained {} supported proxy URIs", uris.len());
            uris
        }
        Err(e) => {
            warn!("Failed to fetch subscription: {:#}", e);
            Vec::new()
        }
    }
}

async fn fetch_body(client: &reqwest::Client, url: &str) -> anyhow::Result<Vec<u8>> {
    debug!("Fetching subscription: {}", url);

    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        anyhow::bail!("subscription returned error status {}", response.status());
    }

    Ok(response.bytes().await?.to_vec())
}
