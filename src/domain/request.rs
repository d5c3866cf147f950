//! Invocation context
//!
//! One value per trigger, built by whichever adapter received it (CLI or
//! HTTP listener). The core never reads ambient process state; everything
//! it may inspect about the caller is captured here.

use std::collections::BTreeMap;

/// Where the trigger came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Command-line invocation by a trusted operator. Never authorized
    /// against the allow-list.
    Direct,
    /// Push notification from a remote caller. Must pass the allow-list.
    Networked,
}

/// Context for a single deployment trigger.
#[derive(Debug, Clone)]
pub struct RequestContext {
    origin: Origin,
    /// Raw connection peer address, as seen by the listener.
    remote_addr: Option<String>,
    /// Request headers as delivered by the listener, lowercased names.
    headers: BTreeMap<String, String>,
    /// Raw request body text.
    body: Option<String>,
    /// Form fields decoded from the body, when it was form-encoded.
    form: BTreeMap<String, String>,
}

impl RequestContext {
    /// A trusted direct invocation.
    pub fn direct() -> Self {
        Self {
            origin: Origin::Direct,
            remote_addr: None,
            headers: BTreeMap::new(),
            body: None,
            form: BTreeMap::new(),
        }
    }

    /// A networked invocation with the given connection peer address.
    pub fn networked(remote_addr: Option<String>) -> Self {
        Self {
            origin: Origin::Networked,
            remote_addr,
            headers: BTreeMap::new(),
            body: None,
            form: BTreeMap::new(),
        }
    }

    /// Attach the request headers. Names are stored lowercased.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.headers = headers
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.as_ref().to_string()))
            .collect();
        self
    }

    /// Attach the raw body. Form fields are decoded eagerly so the payload
    /// field is available for audit logging; a body that is not
    /// form-encoded just stays raw.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        let body = body.into();
        self.form = serde_urlencoded::from_str::<Vec<(String, String)>>(&body)
            .map(|pairs| pairs.into_iter().collect())
            .unwrap_or_default();
        self.body = Some(body);
        self
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Resolve the caller address: CDN-forwarded header first, then the
    /// general forwarded-for header (first entry of a comma-separated
    /// chain), then the raw connection address. First non-empty wins;
    /// `None` means authorization must fail closed.
    pub fn resolved_address(&self) -> Option<String> {
        self.header_value("cf-connecting-ip")
            .or_else(|| self.header_value("x-forwarded-for"))
            .or_else(|| first_entry(self.remote_addr.as_deref()?))
    }

    fn header_value(&self, name: &str) -> Option<String> {
        first_entry(self.headers.get(name)?)
    }

    /// The body as it should appear in the audit log: the `payload` form
    /// field parsed as JSON and pretty-printed when possible, the raw field
    /// text when parsing fails, otherwise the raw body.
    pub fn payload_for_log(&self) -> Option<String> {
        if let Some(payload) = self.form.get("payload") {
            return Some(
                serde_json::from_str::<serde_json::Value>(payload)
                    .and_then(|value| serde_json::to_string_pretty(&value))
                    .unwrap_or_else(|_| payload.clone()),
            );
        }
        self.body.clone().filter(|body| !body.is_empty())
    }
}

/// First entry of a possibly comma-separated list, trimmed; empty → None.
fn first_entry(value: &str) -> Option<String> {
    let first = value.split(',').next()?.trim();
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_for_takes_first_entry() {
        let ctx = RequestContext::networked(Some("10.0.0.1".to_string()))
            .with_headers([("X-Forwarded-For", "203.0.113.5, 10.0.0.1")]);
        assert_eq!(ctx.resolved_address(), Some("203.0.113.5".to_string()));
    }

    #[test]
    fn test_cdn_header_wins_over_forwarded_for() {
        let ctx = RequestContext::networked(Some("10.0.0.1".to_string())).with_headers([
            ("CF-Connecting-IP", "198.51.100.9"),
            ("X-Forwarded-For", "203.0.113.5"),
        ]);
        assert_eq!(ctx.resolved_address(), Some("198.51.100.9".to_string()));
    }

    #[test]
    fn test_connection_address_is_the_fallback() {
        let ctx = RequestContext::networked(Some("192.30.252.1".to_string()));
        assert_eq!(ctx.resolved_address(), Some("192.30.252.1".to_string()));
    }

    #[test]
    fn test_empty_header_value_falls_through() {
        let ctx = RequestContext::networked(Some("192.30.252.1".to_string()))
            .with_headers([("cf-connecting-ip", "")]);
        assert_eq!(ctx.resolved_address(), Some("192.30.252.1".to_string()));
    }

    #[test]
    fn test_no_source_resolves_to_none() {
        let ctx = RequestContext::networked(None);
        assert_eq!(ctx.resolved_address(), None);
    }

    #[test]
    fn test_header_names_are_lowercased() {
        let ctx = RequestContext::networked(None)
            .with_headers([("X-GitHub-Event", "push")]);
        assert_eq!(
            ctx.headers().get("x-github-event"),
            Some(&"push".to_string())
        );
    }

    #[test]
    fn test_payload_field_is_pretty_printed() {
        let ctx = RequestContext::networked(None)
            .with_body("payload=%7B%22ref%22%3A%22refs%2Fheads%2Fmaster%22%7D");
        let logged = ctx.payload_for_log().unwrap();
        assert!(logged.contains("\"ref\": \"refs/heads/master\""));
    }

    #[test]
    fn test_unparsable_payload_falls_back_to_raw_text() {
        let ctx = RequestContext::networked(None).with_body("payload=not-json");
        assert_eq!(ctx.payload_for_log(), Some("not-json".to_string()));
    }

    #[test]
    fn test_json_body_without_payload_field_logged_raw() {
        let ctx = RequestContext::networked(None).with_body(r#"{"ref":"refs/heads/master"}"#);
        assert_eq!(
            ctx.payload_for_log(),
            Some(r#"{"ref":"refs/heads/master"}"#.to_string())
        );
    }

    #[test]
    fn test_direct_context_carries_nothing() {
        let ctx = RequestContext::direct();
        assert_eq!(ctx.origin(), Origin::Direct);
        assert_eq!(ctx.resolved_address(), None);
        assert_eq!(ctx.payload_for_log(), None);
    }
}
