//! Auth service base URL resolution.
//!
//! Local development talks to the auth service on a fixed port. When the app
//! runs inside a cloud workspace, the forwarded hostname embeds the app's
//! port; the auth service is reachable on the same hostname with that port
//! segment swapped for [`AUTH_SERVICE_PORT`].

use url::Url;

/// Port the auth service listens on.
pub const AUTH_SERVICE_PORT: u16 = 8081;

/// Path prefix of the auth API on the auth service.
pub const AUTH_API_PATH: &str = "/api/auth";

/// Base URL used when no cloud workspace origin is detected.
pub const DEFAULT_AUTH_URL: &str = "http://localhost:8081/api/auth";

/// Where a cloud workspace encodes the forwarded port in the first host label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PortPlacement {
    /// `<name>-<port>.app.github.dev`
    Suffix,
    /// `<port>-<workspace>.ws-eu01.gitpod.io`
    Prefix,
}

const CLOUD_WORKSPACE_DOMAINS: &[(&str, PortPlacement)] = &[
    ("app.github.dev", PortPlacement::Suffix),
    ("gitpod.io", PortPlacement::Prefix),
];

/// Resolve the auth base URL from the origin the app is served from.
///
/// Returns [`DEFAULT_AUTH_URL`] when `origin` is absent, unparsable, or not a
/// recognised cloud workspace host.
pub fn resolve_base_url(origin: Option<&str>) -> String {
    origin
        .and_then(cloud_workspace_auth_url)
        .unwrap_or_else(|| DEFAULT_AUTH_URL.to_string())
}

fn cloud_workspace_auth_url(origin: &str) -> Option<String> {
    let url = Url::parse(origin).ok()?;
    let host = url.host_str()?;
    let (label, domain) = host.split_once('.')?;

    let placement = CLOUD_WORKSPACE_DOMAINS
        .iter()
        .find(|(known, _)| domain == *known || domain.ends_with(&format!(".{}", known)))
        .map(|(_, placement)| *placement)?;

    let label = rewrite_port_segment(label, placement, AUTH_SERVICE_PORT)?;
    Some(format!("https://{}.{}{}", label, domain, AUTH_API_PATH))
}

fn rewrite_port_segment(label: &str, placement: PortPlacement, port: u16) -> Option<String> {
    match placement {
        PortPlacement::Suffix => {
            let (name, current) = label.rsplit_once('-')?;
            is_port(current).then(|| format!("{}-{}", name, port))
        }
        PortPlacement::Prefix => {
            let (current, rest) = label.split_once('-')?;
            is_port(current).then(|| format!("{}-{}", port, rest))
        }
    }
}

fn is_port(segment: &str) -> bool {
    !segment.is_empty()
        && segment.len() <= 5
        && segment.chars().all(|c| c.is_ascii_digit())
        && segment.parse::<u16>().is_ok()
}
