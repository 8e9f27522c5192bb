use async_trait::async_trait;
use std::time::Duration;

use super::FeedError;
use crate::config::FeedConfig;
use crate::domain::value_objects::FeedUrl;

/// Where supplier feeds come from.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &FeedUrl) -> Result<Vec<u8>, FeedError>;
}

/// Fetches feeds over HTTP(S).
pub struct HttpFeedSource {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpFeedSource {
    pub fn new(config: &FeedConfig) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FeedError::Fetch(e.to_string()))?;
        Ok(Self { client, max_bytes: config.max_bytes })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    #[tracing::instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &FeedUrl) -> Result<Vec<u8>, FeedError> {
        let mut response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FeedError::Fetch(e.to_string()))?;

        if response.content_length().is_some_and(|len| len > self.max_bytes as u64) {
            return Err(FeedError::TooLarge { limit: self.max_bytes });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| FeedError::Fetch(e.to_string()))? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(FeedError::TooLarge { limit: self.max_bytes });
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(bytes = body.len(), "Feed fetched");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const CHUNK: usize = 16 * 1024;

    /// Serves one request with a chunked body of `chunks` chunks and no
    /// Content-Length, counting the body bytes it managed to write.
    async fn chunked_server(chunks: usize) -> (FeedUrl, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = FeedUrl::parse(format!("http://{}/feed.yaml", listener.local_addr().unwrap())).unwrap();
        let written = Arc::new(AtomicUsize::new(0));
        let counter = written.clone();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let head = "HTTP/1.1 200 OK\r\nContent-Type: text/yaml\r\nTransfer-Encoding: chunked\r\n\r\n";
            if socket.write_all(head.as_bytes()).await.is_err() {
                return;
            }
            let payload = vec![b'#'; CHUNK];
            for _ in 0..chunks {
                let size = format!("{CHUNK:x}\r\n");
                let frame: Vec<u8> = [size.as_bytes(), payload.as_slice(), &b"\r\n"[..]].concat();
                if socket.write_all(&frame).await.is_err() {
                    return;
                }
                counter.fetch_add(CHUNK, Ordering::SeqCst);
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
        });
        (url, written)
    }

    fn source(max_bytes: usize) -> HttpFeedSource {
        HttpFeedSource::new(&FeedConfig { timeout_secs: 5, max_bytes }).unwrap()
    }

    #[tokio::test]
    async fn test_chunked_feed_over_limit_is_cut_off() {
        let (url, written) = chunked_server(4096).await;
        let err = source(1024).fetch(&url).await.unwrap_err();
        assert!(matches!(err, FeedError::TooLarge { limit: 1024 }));
        assert!(written.load(Ordering::SeqCst) < 4096 * CHUNK);
    }

    #[tokio::test]
    async fn test_chunked_feed_within_limit() {
        let (url, _) = chunked_server(2).await;
        let body = source(4 * CHUNK).fetch(&url).await.unwrap();
        assert_eq!(body.len(), 2 * CHUNK);
    }
}
