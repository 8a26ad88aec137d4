use crate::models::config::{ProxyRoute, StreamConfiguration, UnknownOriginPolicy};
use crate::models::error::StreamError;

/// Rewrites camera stream addresses so they load from an https page.
///
/// Browsers block plain `http://` media on a secure page. Known gateways are
/// reachable through a same-origin proxy, so their origin is swapped for the
/// proxy prefix and the rest of the address is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressTranslator {
    routes: Vec<ProxyRoute>,
    policy: UnknownOriginPolicy,
}

impl AddressTranslator {
    pub fn new(routes: Vec<ProxyRoute>, policy: UnknownOriginPolicy) -> Self {
        Self { routes, policy }
    }

    pub fn from_config(config: &StreamConfiguration) -> Self {
        Self::new(config.proxy_routes.clone(), config.unknown_origin_policy)
    }

    pub fn routes(&self) -> &[ProxyRoute] {
        &self.routes
    }

    /// Compute the effective address for `source`.
    ///
    /// Only fails under `UnknownOriginPolicy::Reject`, for a plain-http
    /// source on a secure page that no route covers.
    pub fn translate(&self, source: &str, page_is_secure: bool) -> Result<String, StreamError> {
        if !page_is_secure {
            return Ok(source.to_string());
        }
        if let Some(rewritten) = translate(&self.routes, source, page_is_secure) {
            return Ok(rewritten);
        }
        if self.policy == UnknownOriginPolicy::Reject && is_plain_http(source) {
            return Err(StreamError::MixedContent(source.to_string()));
        }
        Ok(source.to_string())
    }
}

impl Default for AddressTranslator {
    fn default() -> Self {
        Self::from_config(&StreamConfiguration::default())
    }
}

/// Pure rewrite against a route table. Returns `None` when the address is
/// left unchanged.
pub fn translate(routes: &[ProxyRoute], source: &str, page_is_secure: bool) -> Option<String> {
    if !page_is_secure {
        return None;
    }
    routes.iter().find_map(|route| {
        let rest = source.strip_prefix(route.gateway_origin.as_str())?;
        // "http://host:8001" must not match "http://host:80012/..."
        if !(rest.is_empty() || rest.starts_with(['/', '?', '#'])) {
            return None;
        }
        Some(format!("{}{}", route.proxy_prefix, rest))
    })
}

fn is_plain_http(source: &str) -> bool {
    source
        .get(..7)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("http://"))
}
