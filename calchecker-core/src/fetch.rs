//! Calendar feed download.

use std::time::Duration;

use tracing::{debug, info};
use url::Url;

use crate::error::{CalCheckerError, CalCheckerResult};

/// Timeout for a single feed request.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Download the raw feed at `url` with the default timeout.
pub async fn fetch_calendar(url: &str) -> CalCheckerResult<Vec<u8>> {
    fetch_calendar_with_timeout(url, FETCH_TIMEOUT).await
}

/// Download the raw feed at `url`.
///
/// A single attempt is made. Timeouts, connection errors and non-2xx
/// responses all fail the call. Neither logs nor errors carry more of the URL
/// than [`feed_origin`].
pub async fn fetch_calendar_with_timeout(url: &str, timeout: Duration) -> CalCheckerResult<Vec<u8>> {
    let origin = feed_origin(url);
    debug!(origin = %origin, timeout_secs = timeout.as_secs(), "fetching calendar");

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("calchecker/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| CalCheckerError::Http(e.without_url()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CalCheckerError::HttpStatus {
            status,
            host: origin,
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| CalCheckerError::Http(e.without_url()))?;
    info!(bytes = body.len(), "fetched calendar");

    Ok(body.to_vec())
}

/// `scheme://host[:port]` of a feed URL, safe to log.
///
/// Private feed URLs carry their access token in the path or query, so those
/// parts are never shown.
pub fn feed_origin(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}://{}:{}", parsed.scheme(), host, port),
            (Some(host), None) => format!("{}://{}", parsed.scheme(), host),
            (None, _) => "<no host>".to_string(),
        },
        Err(_) => "<invalid url>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/feed.ics"))
            .respond_with(ResponseTemplate::new(200).set_body_string("BEGIN:VCALENDAR"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let body = fetch_calendar(&format!("{}/feed.ics", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(body, b"BEGIN:VCALENDAR");
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_status_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let result = fetch_calendar(&format!("{}/feed.ics", mock_server.uri())).await;
        match result {
            Err(CalCheckerError::HttpStatus { status, .. }) => assert_eq!(status.as_u16(), 500),
            other => panic!("expected HttpStatus error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_status_error_hides_feed_path() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let url = format!("{}/private-s3cr3t/basic.ics?token=abc", mock_server.uri());
        let err = fetch_calendar(&url).await.unwrap_err();
        let message = err.to_string();

        assert!(message.contains("403"), "{message}");
        assert!(message.contains(&mock_server.uri()), "{message}");
        assert!(!message.contains("private-s3cr3t"), "{message}");
        assert!(!message.contains("token=abc"), "{message}");
    }

    #[tokio::test]
    async fn test_connection_error_hides_feed_path() {
        // Nothing listens on port 9 of localhost
        let err = fetch_calendar_with_timeout(
            "http://127.0.0.1:9/private-s3cr3t/basic.ics",
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CalCheckerError::Http(_)));
        assert!(!err.to_string().contains("private-s3cr3t"), "{err}");
    }

    #[test]
    fn test_feed_origin_strips_path_and_query() {
        assert_eq!(
            feed_origin("https://calendar.example.com/ical/private-abc123/basic.ics?key=1"),
            "https://calendar.example.com"
        );
        assert_eq!(
            feed_origin("http://127.0.0.1:8080/feed.ics"),
            "http://127.0.0.1:8080"
        );
        assert_eq!(feed_origin("not a url"), "<invalid url>");
    }

    #[tokio::test]
    async fn test_fetch_not_found_is_status_error() {
        let mock_server = MockServer::start().await;

        let result = fetch_calendar(&format!("{}/missing.ics", mock_server.uri())).await;
        assert!(matches!(result, Err(CalCheckerError::HttpStatus { .. })));
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("BEGIN:VCALENDAR")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&mock_server)
            .await;

        let result = fetch_calendar_with_timeout(
            &format!("{}/feed.ics", mock_server.uri()),
            Duration::from_millis(200),
        )
        .await;
        match result {
            Err(CalCheckerError::Http(e)) => assert!(e.is_timeout()),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
