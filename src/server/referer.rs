//! Referer allow-list filtering.
//!
//! Patterns are host names where `*` matches any run of characters and every
//! other character (including `.`) is literal. Matching is case-insensitive
//! and must cover the whole host of the `Referer` URL:
//!
//! | Pattern          | `https://sub.example.com/page` | `https://example.com/` | `https://evil.com/` |
//! |------------------|--------------------------------|------------------------|---------------------|
//! | `*.example.com`  | allowed                        | forbidden              | forbidden           |
//! | `example.com`    | forbidden                      | allowed                | forbidden           |
//!
//! An empty allow-list allows every request, with or without a `Referer`.

use axum::{
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::Response,
};
use regex::Regex;
use tracing::debug;
use url::Url;

use crate::error::ColorError;

// =============================================================================
// Referer Policy
// =============================================================================

/// Compiled referer allow-list.
///
/// # Example
///
/// ```
/// use img2color::server::RefererPolicy;
///
/// let policy = RefererPolicy::from_list("*.example.com, localhost").unwrap();
/// assert!(policy.is_allowed(Some("https://sub.example.com/page")));
/// assert!(policy.is_allowed(Some("http://localhost:8080/")));
/// assert!(!policy.is_allowed(Some("https://evil.com")));
/// assert!(!policy.is_allowed(None));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RefererPolicy {
    patterns: Vec<String>,
    matchers: Vec<Regex>,
}

impl RefererPolicy {
    /// A policy that allows every request.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Compile `patterns`. Blank patterns are skipped.
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut policy = Self::default();
        for pattern in patterns {
            let pattern = normalize_pattern(pattern.as_ref());
            if pattern.is_empty() {
                continue;
            }
            policy.matchers.push(compile_pattern(&pattern)?);
            policy.patterns.push(pattern);
        }
        Ok(policy)
    }

    /// Compile a comma-separated pattern list, e.g. `"*.example.com,localhost"`.
    pub fn from_list(list: &str) -> Result<Self, regex::Error> {
        Self::new(list.split(','))
    }

    /// Check if no patterns are configured.
    pub fn allows_all(&self) -> bool {
        self.matchers.is_empty()
    }

    /// The normalized patterns, in configuration order.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Check a `Referer` header value against the allow-list.
    ///
    /// A missing or unparsable referer is only allowed by an empty list.
    pub fn is_allowed(&self, referer: Option<&str>) -> bool {
        if self.allows_all() {
            return true;
        }

        let Some(host) = referer.and_then(referer_host) else {
            return false;
        };

        self.matchers.iter().any(|re| re.is_match(&host))
    }
}

fn normalize_pattern(pattern: &str) -> String {
    let pattern = pattern.trim();
    let pattern = pattern
        .strip_prefix("https://")
        .or_else(|| pattern.strip_prefix("http://"))
        .unwrap_or(pattern);
    pattern.trim_end_matches('/').to_ascii_lowercase()
}

fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("(?i)^{}$", body))
}

/// Host of a `Referer` value. Values without a scheme are read as `http://`.
fn referer_host(referer: &str) -> Option<String> {
    let referer = referer.trim();
    if referer.is_empty() {
        return None;
    }

    let parsed = Url::parse(referer)
        .ok()
        .filter(|url| url.has_host())
        .or_else(|| Url::parse(&format!("http://{}", referer)).ok())?;

    parsed.host_str().map(|host| host.to_ascii_lowercase())
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Reject requests whose `Referer` is not allowed by the policy.
///
/// `OPTIONS` requests are never filtered so CORS preflight always succeeds.
///
/// # Example
///
/// ```ignore
/// use axum::{middleware, routing::get, Router};
/// use img2color::server::{referer_middleware, RefererPolicy};
///
/// let policy = RefererPolicy::from_list("*.example.com")?;
/// let app = Router::new()
///     .route("/api", get(color_handler))
///     .route_layer(middleware::from_fn_with_state(policy, referer_middleware));
/// ```
pub async fn referer_middleware(
    State(policy): State<RefererPolicy>,
    request: Request,
    next: Next,
) -> Result<Response, ColorError> {
    if request.method() == Method::OPTIONS || policy.allows_all() {
        return Ok(next.run(request).await);
    }

    let referer = request
        .headers()
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if !policy.is_allowed(referer.as_deref()) {
        return Err(ColorError::ForbiddenReferer {
            referer: referer.unwrap_or_default(),
        });
    }

    debug!(referer = ?referer, "Referer allowed");
    Ok(next.run(request).await)
}

// =============================================================================
// Tests
// =============================================================================
