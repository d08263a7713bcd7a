//! NTRIP/1.0 HTTP handshake contract, grounded in
//! `services/ntrip_client.py`'s `NtripForwarder._build_request`. Describes
//! the request a forwarder sends and the settings it needs; carries no
//! socket or serial I/O.

pub const PROTOCOL_VERSION: &str = "Ntrip/2.0";
pub const USER_AGENT: &str = "LawnBerry-NTRIP/1.0";
pub const DEFAULT_PORT: u16 = 2101;
pub const DEFAULT_GGA_INTERVAL_S: f64 = 10.0;

/// Everything a caster connection needs, mirroring `NtripSettings`.
#[derive(Debug, Clone)]
pub struct NtripSettings {
    pub host: String,
    pub port: u16,
    pub mountpoint: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub gga_interval_s: f64,
}

/// Builds the raw HTTP/1.1 GET request a caster expects, exactly as the
/// source's `_build_request` does (CRLF-terminated, blank line, Basic auth
/// only when credentials are present).
pub fn build_request(settings: &NtripSettings) -> String {
    let mount = if settings.mountpoint.starts_with('/') {
        settings.mountpoint.clone()
    } else {
        format!("/{}", settings.mountpoint)
    };

    let mut lines = vec![
        format!("GET {mount} HTTP/1.1"),
        format!("Host: {}", settings.host),
        format!("Ntrip-Version: {PROTOCOL_VERSION}"),
        format!("User-Agent: {USER_AGENT}"),
    ];
    if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
        use base64::Engine;
        let raw = format!("{user}:{pass}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(raw.as_bytes());
        lines.push(format!("Authorization: Basic {encoded}"));
    }
    lines.push("Connection: keep-alive".to_string());
    lines.push(String::new());
    lines.push(String::new());
    lines.join("\r\n")
}

/// A forwarder is expected to respond to these in its connect loop; no
/// implementation lives in this process.
pub trait CorrectionForwarder {
    fn settings(&self) -> &NtripSettings;
    fn build_request(&self) -> String {
        build_request(self.settings())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> NtripSettings {
        NtripSettings {
            host: "rtk.example.com".to_string(),
            port: DEFAULT_PORT,
            mountpoint: "MOUNT1".to_string(),
            username: None,
            password: None,
            gga_interval_s: DEFAULT_GGA_INTERVAL_S,
        }
    }

    #[test]
    fn request_prefixes_mountpoint_with_slash() {
        let request = build_request(&settings());
        assert!(request.starts_with("GET /MOUNT1 HTTP/1.1\r\n"));
    }

    #[test]
    fn request_omits_auth_header_without_credentials() {
        let request = build_request(&settings());
        assert!(!request.contains("Authorization"));
    }

    #[test]
    fn request_includes_basic_auth_when_credentials_present() {
        let mut s = settings();
        s.username = Some("rover".to_string());
        s.password = Some("hunter2".to_string());
        let request = build_request(&s);
        assert!(request.contains("Authorization: Basic"));
    }
}
