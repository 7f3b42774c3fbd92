//! Shared HTTP constants (headers, problem URIs).

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const HEADER_DIAGNOSTICS_TOKEN: &str = "x-lodestone-diagnostics-token";

pub(crate) const PROBLEM_INTERNAL: &str = "https://lodestone.dev/problems/internal";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://lodestone.dev/problems/bad-request";
pub(crate) const PROBLEM_FORBIDDEN: &str = "https://lodestone.dev/problems/forbidden";
pub(crate) const PROBLEM_NOT_FOUND: &str = "https://lodestone.dev/problems/not-found";
pub(crate) const PROBLEM_CONFLICT: &str = "https://lodestone.dev/problems/conflict";
pub(crate) const PROBLEM_ENGINE_UNAVAILABLE: &str =
    "https://lodestone.dev/problems/engine-unavailable";
pub(crate) const PROBLEM_ENGINE_TIMEOUT: &str = "https://lodestone.dev/problems/engine-timeout";

pub(crate) const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";
