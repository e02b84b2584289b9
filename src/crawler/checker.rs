//! Link liveness checker
//!
//! Issues lightweight HEAD probes against resolved link targets. The
//! checker never raises to its caller: any failure to build or send the
//! request is reported as status 500, which classifies the link as broken.

use std::time::Duration;

use reqwest::Client;

use crate::error::FetchError;

/// Status code reported when the probe itself fails
const PROBE_FAILURE_CODE: u16 = 500;

/// Liveness prober for resolved page links
pub struct LinkChecker {
    client: Client,
}

impl LinkChecker {
    /// Build the probe client with a short timeout and the crawler's
    /// user agent
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the client cannot be created.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    /// Probe a link and yield its status code
    ///
    /// Transport failures and timeouts yield 500. Redirects follow the
    /// client's default policy.
    pub async fn check(&self, url: &str) -> u16 {
        match self.client.head(url).send().await {
            Ok(response) => response.status().as_u16(),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "link probe failed");
                PROBE_FAILURE_CODE
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checker_creation() {
        let checker = LinkChecker::new("sitecheck/test", Duration::from_secs(10));
        assert!(checker.is_ok());
    }

    #[tokio::test]
    async fn test_unroutable_target_reports_500() {
        let checker = LinkChecker::new("sitecheck/test", Duration::from_millis(200)).unwrap();
        // Invalid scheme: request construction fails, never raised
        let code = checker.check("not-a-scheme://nowhere").await;
        assert_eq!(code, 500);
    }
}
