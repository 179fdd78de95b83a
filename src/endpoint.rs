use url::Url;

use crate::error::Error;

/// Hub endpoint derived from a hosting origin.
///
/// The secure transport variant mirrors the origin scheme: `https` (or `wss`)
/// origins upgrade to `wss`, plain `http`/`ws` origins use `ws`. The final
/// URL is recomputed on every connection attempt rather than cached, so a
/// manager created once keeps targeting the current origin.
#[derive(Debug, Clone)]
pub struct Endpoint {
    origin: Url,
    path: String,
}

impl Endpoint {
    /// Build an endpoint from an origin URL and a hub path.
    ///
    /// Accepts `http`, `https`, `ws` and `wss` origins; anything else is a
    /// validation error.
    pub fn from_origin(origin: &str, path: impl Into<String>) -> crate::Result<Self> {
        let origin = Url::parse(origin)?;

        match origin.scheme() {
            "http" | "https" | "ws" | "wss" => {}
            other => {
                return Err(Error::validation(format!(
                    "origin scheme must be http(s) or ws(s), got {other}"
                )));
            }
        }

        if origin.host_str().is_none() {
            return Err(Error::validation("origin must include a host"));
        }

        let mut path = path.into();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }

        Ok(Self { origin, path })
    }

    /// Resolve the WebSocket URL for the next connection attempt.
    #[must_use]
    pub fn resolve(&self) -> String {
        let scheme = match self.origin.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        format!("{scheme}://{}{}", self.origin.authority(), self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Kind;

    #[test]
    fn secure_origin_upgrades_to_wss() {
        let endpoint = Endpoint::from_origin("https://hub.example.com", "/realtime").unwrap();
        assert_eq!(endpoint.resolve(), "wss://hub.example.com/realtime");
    }

    #[test]
    fn plain_origin_uses_ws() {
        let endpoint = Endpoint::from_origin("http://127.0.0.1:8080", "/realtime").unwrap();
        assert_eq!(endpoint.resolve(), "ws://127.0.0.1:8080/realtime");
    }

    #[test]
    fn ws_schemes_pass_through() {
        let endpoint = Endpoint::from_origin("wss://hub.example.com", "/realtime").unwrap();
        assert_eq!(endpoint.resolve(), "wss://hub.example.com/realtime");

        let endpoint = Endpoint::from_origin("ws://hub.example.com:9000", "/realtime").unwrap();
        assert_eq!(endpoint.resolve(), "ws://hub.example.com:9000/realtime");
    }

    #[test]
    fn missing_leading_slash_is_added() {
        let endpoint = Endpoint::from_origin("https://hub.example.com", "feed").unwrap();
        assert_eq!(endpoint.resolve(), "wss://hub.example.com/feed");
    }

    #[test]
    fn rejects_non_web_schemes() {
        let err = Endpoint::from_origin("ftp://hub.example.com", "/realtime").unwrap_err();
        assert_eq!(err.kind(), Kind::Validation);
    }

    #[test]
    fn rejects_invalid_url() {
        let err = Endpoint::from_origin("not a url", "/realtime").unwrap_err();
        assert_eq!(err.kind(), Kind::Validation);
    }
}
