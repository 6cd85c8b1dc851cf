use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Exponential backoff bounds for one external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl RetryPolicy {
    /// Connection-level failures (SMTP).
    pub fn network() -> Self {
        Self {
            attempts: 3,
            min_wait: Duration::from_secs(2),
            max_wait: Duration::from_secs(30),
        }
    }

    /// Rate limits and temporary upstream failures (analytics, AI).
    pub fn api() -> Self {
        Self {
            attempts: 5,
            min_wait: Duration::from_secs(5),
            max_wait: Duration::from_secs(60),
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.min_wait.saturating_mul(factor).min(self.max_wait)
    }
}

/// Non-2xx HTTP response from an upstream API.
#[derive(Debug, Clone)]
pub struct HttpStatusError {
    pub service: &'static str,
    pub status: u16,
    pub body: String,
}

impl fmt::Display for HttpStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} HTTP {}: {}", self.service, self.status, self.body)
    }
}

impl std::error::Error for HttpStatusError {}

/// Timeouts, connection failures, 429 and 5xx responses.
pub fn is_transient_http(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(e) = cause.downcast_ref::<reqwest::Error>() {
            return e.is_timeout() || e.is_connect() || e.is_request();
        }
        if let Some(e) = cause.downcast_ref::<HttpStatusError>() {
            return e.status == 429 || e.status >= 500;
        }
        false
    })
}

/// Run `op` until it succeeds, fails with a non-retryable error, or attempts run out.
pub async fn retry<T, F, Fut, P>(
    what: &str,
    policy: RetryPolicy,
    is_retryable: P,
    mut op: F,
) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
    P: Fn(&anyhow::Error) -> bool,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return Ok(v),
            Err(err) => {
                if attempt >= policy.attempts || !is_retryable(&err) {
                    return Err(err);
                }
                let backoff = policy.backoff(attempt);
                tracing::warn!(what, attempt, ?backoff, error = %err, "call failed; retrying");
                tokio::time::sleep(backoff).await;
            }
        }
    }
}
