//! Blocking downloads with a size cap and retries on transient failures.

use std::io::{self, Read, Write};
use std::sync::OnceLock;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(8);

/// Why a download did not produce a body.
#[derive(Debug, Error)]
pub(crate) enum FetchError {
    #[error("server answered HTTP {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("response is larger than {limit} bytes")]
    TooLarge { limit: u64 },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl FetchError {
    /// Rate limiting, server errors and connection trouble may clear up.
    fn is_transient(&self) -> bool {
        match self {
            Self::Status(code) => *code == 429 || *code >= 500,
            Self::Transport(_) => true,
            Self::TooLarge { .. } | Self::Io(_) => false,
        }
    }
}

/// Retry schedule: `base_delay`, doubled per retry, capped at 8 seconds.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RetryPolicy {
    /// Total requests, including the first one.
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(MAX_RETRY_DELAY)
            .min(MAX_RETRY_DELAY)
    }
}

fn agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .user_agent(concat!("caltree/", env!("CARGO_PKG_VERSION")))
            .build()
    })
}

/// GET `url` into `writer` and return the number of body bytes.
///
/// Only the request is retried. A body that turns out to exceed `limit`
/// fails after up to `limit` bytes were written, so callers stream into a
/// temp file they can discard.
pub(crate) fn fetch_to_writer(
    url: &str,
    writer: &mut impl Write,
    limit: u64,
    policy: RetryPolicy,
) -> Result<u64, FetchError> {
    let response = get_with_retries(url, policy)?;
    let announced = response
        .header("Content-Length")
        .and_then(|value| value.parse::<u64>().ok());
    if announced.is_some_and(|length| length > limit) {
        return Err(FetchError::TooLarge { limit });
    }
    let mut body = response.into_reader().take(limit.saturating_add(1));
    let copied = io::copy(&mut body, writer)?;
    if copied > limit {
        return Err(FetchError::TooLarge { limit });
    }
    Ok(copied)
}

fn get_with_retries(url: &str, policy: RetryPolicy) -> Result<ureq::Response, FetchError> {
    let mut attempt = 1;
    loop {
        let err = match agent().get(url).call() {
            Ok(response) => return Ok(response),
            Err(ureq::Error::Status(code, _)) => FetchError::Status(code),
            Err(ureq::Error::Transport(transport)) => FetchError::Transport(transport.to_string()),
        };
        if attempt >= policy.attempts || !err.is_transient() {
            return Err(err);
        }
        let delay = policy.delay_after(attempt);
        warn!("Download attempt {attempt} failed ({err}); retrying in {delay:?}");
        std::thread::sleep(delay);
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    const NO_WAIT: RetryPolicy = RetryPolicy {
        attempts: 3,
        base_delay: Duration::ZERO,
    };

    /// Answer successive connections with `replies`; returns the URL and a
    /// counter of connections served.
    fn serve(replies: Vec<String>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/cal_housing.tgz", listener.local_addr().unwrap());
        let served = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&served);
        thread::spawn(move || {
            for reply in replies {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let mut request = [0u8; 1024];
                let _ = stream.read(&mut request);
                let _ = stream.write_all(reply.as_bytes());
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        (url, served)
    }

    fn reply(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    #[test]
    fn server_errors_are_retried_until_success() {
        let (url, served) = serve(vec![
            reply("503 Service Unavailable", ""),
            reply("200 OK", "archive"),
        ]);
        let mut sink = Vec::new();
        let written = fetch_to_writer(&url, &mut sink, 64, NO_WAIT).unwrap();
        assert_eq!(written, 7);
        assert_eq!(sink, b"archive");
        assert_eq!(served.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn client_errors_fail_on_first_attempt() {
        let (url, served) = serve(vec![
            reply("404 Not Found", ""),
            reply("200 OK", "archive"),
        ]);
        let err = fetch_to_writer(&url, &mut Vec::new(), 64, NO_WAIT).unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));
        assert_eq!(served.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn gives_up_after_the_last_attempt() {
        let busy = reply("429 Too Many Requests", "");
        let (url, _) = serve(vec![busy.clone(), busy.clone(), busy]);
        let err = fetch_to_writer(&url, &mut Vec::new(), 64, NO_WAIT).unwrap_err();
        assert!(matches!(err, FetchError::Status(429)));
    }

    #[test]
    fn announced_length_over_limit_is_rejected_before_reading() {
        let (url, _) = serve(vec![
            "HTTP/1.1 200 OK\r\nContent-Length: 100\r\nConnection: close\r\n\r\nok".to_string(),
        ]);
        let mut sink = Vec::new();
        let err = fetch_to_writer(&url, &mut sink, 10, NO_WAIT).unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 10 }));
        assert!(sink.is_empty());
    }

    #[test]
    fn unannounced_body_over_limit_is_rejected() {
        let body = "a".repeat(32);
        let (url, _) = serve(vec![format!("HTTP/1.0 200 OK\r\n\r\n{body}")]);
        let err = fetch_to_writer(&url, &mut Vec::new(), 16, NO_WAIT).unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 16 }));
    }

    #[test]
    fn retry_delay_doubles_up_to_the_cap() {
        let policy = RetryPolicy {
            attempts: 10,
            base_delay: Duration::from_secs(1),
        };
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
        assert_eq!(policy.delay_after(5), MAX_RETRY_DELAY);
        assert_eq!(policy.delay_after(40), MAX_RETRY_DELAY);
    }
}
