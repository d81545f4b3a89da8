//! Page retrieval shared by the fetchers, the enricher and the registry.
//!
//! Stages never call `reqwest` directly; they go through [`PageFetch`] so
//! they can be exercised against in-memory pages in tests.

use reqwest::{Client, Response};
use tracing::{debug, instrument};
use url::Url;

use crate::config::FetchSettings;
use crate::error::FetchError;

/// Retrieve the body of a document by URL.
pub trait PageFetch {
    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError>;

    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        let bytes = self.fetch_bytes(url).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// [`PageFetch`] over a shared `reqwest` client with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(settings: &FetchSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self { client })
    }

    /// The underlying client, for callers that need custom requests.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl HttpFetcher {
    /// Send a GET and reject non-2xx answers.
    async fn get(&self, url: &Url) -> Result<Response, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| request_error(url, source))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

fn request_error(url: &Url, source: reqwest::Error) -> FetchError {
    FetchError::Request {
        url: url.to_string(),
        source,
    }
}

impl PageFetch for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let bytes = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|source| request_error(url, source))?;
        debug!(bytes = bytes.len(), "Fetched page");
        Ok(bytes.to_vec())
    }

    /// Decodes with the charset named in `Content-Type`, UTF-8 otherwise.
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        let text = self
            .get(url)
            .await?
            .text()
            .await
            .map_err(|source| request_error(url, source))?;
        debug!(chars = text.chars().count(), "Fetched page text");
        Ok(text)
    }
}

#[cfg(test)]
pub mod testing {
    //! In-memory pages for exercising stages without a network.

    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer a single HTTP request on a loopback port with a canned response.
    ///
    /// Returns the server's root URL; any path on it gets the same answer.
    pub async fn serve_once(status_line: &str, headers: &[(&str, &str)], body: &[u8]) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n",
            body.len()
        )
        .into_bytes();
        for (name, value) in headers {
            response.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        }
        response.extend_from_slice(b"\r\n");
        response.extend_from_slice(body);

        tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let _ = socket.write_all(&response).await;
            let _ = socket.shutdown().await;
        });

        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    #[derive(Debug, Clone)]
    enum Page {
        Body(String),
        Status(u16),
        Slow(Duration, String),
        TimedOut,
    }

    /// Serves registered pages; anything unregistered is unreachable.
    #[derive(Debug, Clone, Default)]
    pub struct FakePages {
        pages: HashMap<String, Page>,
    }

    impl FakePages {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(key(url), Page::Body(body.to_string()));
            self
        }

        pub fn status(mut self, url: &str, status: u16) -> Self {
            self.pages.insert(key(url), Page::Status(status));
            self
        }

        /// A page whose request times out.
        pub fn timed_out(mut self, url: &str) -> Self {
            self.pages.insert(key(url), Page::TimedOut);
            self
        }

        /// A page that only answers after `delay`.
        pub fn slow(mut self, url: &str, delay: Duration, body: &str) -> Self {
            self.pages
                .insert(key(url), Page::Slow(delay, body.to_string()));
            self
        }
    }

    fn key(url: &str) -> String {
        Url::parse(url).map(|u| u.to_string()).unwrap_or_else(|_| url.to_string())
    }

    impl PageFetch for FakePages {
        async fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
            match self.pages.get(url.as_str()) {
                Some(Page::Body(body)) => Ok(body.clone().into_bytes()),
                Some(Page::Status(status)) => Err(FetchError::Status {
                    url: url.to_string(),
                    status: *status,
                }),
                Some(Page::Slow(delay, body)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(body.clone().into_bytes())
                }
                Some(Page::TimedOut) => Err(FetchError::Unreachable {
                    url: url.to_string(),
                    reason: "operation timed out".to_string(),
                }),
                None => Err(FetchError::Unreachable {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{FakePages, serve_once};
    use super::*;

    #[test]
    fn test_client_builds_from_defaults() {
        assert!(HttpFetcher::new(&FetchSettings::default()).is_ok());
    }

    #[tokio::test]
    async fn test_fake_pages_serve_and_fail() {
        let pages = FakePages::new()
            .page("https://example.com/a", "hello")
            .status("https://example.com/b", 503);

        let a = Url::parse("https://example.com/a").unwrap();
        assert_eq!(pages.fetch_text(&a).await.unwrap(), "hello");

        let b = Url::parse("https://example.com/b").unwrap();
        assert!(matches!(
            pages.fetch_text(&b).await,
            Err(FetchError::Status { status: 503, .. })
        ));

        let c = Url::parse("https://example.com/c").unwrap();
        assert!(matches!(
            pages.fetch_text(&c).await,
            Err(FetchError::Unreachable { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_text_decodes_declared_charset() {
        let url = serve_once(
            "200 OK",
            &[("Content-Type", "text/html; charset=iso-8859-1")],
            b"<html><body><h2>Caf\xe9 na\xefve</h2></body></html>",
        )
        .await;
        let fetcher = HttpFetcher::new(&FetchSettings::default()).unwrap();

        let text = fetcher.fetch_text(&url).await.unwrap();
        assert!(text.contains("Caf\u{e9} na\u{ef}ve"), "{text}");
    }

    #[tokio::test]
    async fn test_fetch_bytes_keeps_raw_body() {
        let url = serve_once("200 OK", &[("Content-Type", "application/rss+xml")], b"<rss>\xe9</rss>").await;
        let fetcher = HttpFetcher::new(&FetchSettings::default()).unwrap();
        assert_eq!(fetcher.fetch_bytes(&url).await.unwrap(), b"<rss>\xe9</rss>".to_vec());
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let url = serve_once("404 Not Found", &[], b"gone").await;
        let fetcher = HttpFetcher::new(&FetchSettings::default()).unwrap();
        assert!(matches!(
            fetcher.fetch_text(&url).await,
            Err(FetchError::Status { status: 404, .. })
        ));
    }
}
