use crate::core::rate::{FetchError, Rate, RateFetcher};
use crate::providers::feed;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info, instrument};

pub const DEFAULT_FEED_URL: &str = "https://www.bank.lv/vk/ecb_rss.xml";

/// Fetches the ECB reference rates published as RSS by Latvijas Banka.
pub struct BankLvFetcher {
    url: String,
    client: reqwest::Client,
}

impl BankLvFetcher {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fxsync/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

#[async_trait]
impl RateFetcher for BankLvFetcher {
    #[instrument(name = "BankLvFetch", skip(self, code), fields(currency = %code))]
    async fn fetch(&self, code: &str) -> Result<Vec<Rate>, FetchError> {
        info!(url = %self.url, "Sending request for exchange rates");
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        info!(url = %self.url, status = status.as_u16(), "Received response for exchange rates");
        if status != StatusCode::OK {
            return Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let rates = feed::parse(&body)?;
        debug!(rate_count = rates.len(), "Searching for currency in feed");

        Ok(rates.into_iter().filter(|rate| rate.code == code).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MOCK_FEED: &str = include_str!("testdata/bank_lv_feed.xml");

    async fn create_mock_server(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/vk/ecb_rss.xml"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn fetcher_for(server: &MockServer) -> BankLvFetcher {
        let url = format!("{}/vk/ecb_rss.xml", server.uri());
        BankLvFetcher::new(&url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_filters_by_currency() {
        let mock_server = create_mock_server(200, MOCK_FEED).await;
        let fetcher = fetcher_for(&mock_server);

        let rates = fetcher.fetch("AUD").await.unwrap();

        assert_eq!(rates.len(), 2);
        assert!(rates.iter().all(|r| r.code == "AUD"));
        let values: Vec<&str> = rates.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(values, vec!["1.76500000", "1.77750000"]);
    }

    #[tokio::test]
    async fn test_fetch_unknown_currency_is_empty() {
        let mock_server = create_mock_server(200, MOCK_FEED).await;
        let fetcher = fetcher_for(&mock_server);

        let rates = fetcher.fetch("USD").await.unwrap();

        assert!(rates.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_unexpected_status() {
        let mock_server = create_mock_server(503, "").await;
        let fetcher = fetcher_for(&mock_server);

        let result = fetcher.fetch("AUD").await;

        assert!(matches!(
            result,
            Err(FetchError::UnexpectedStatus { status: 503 })
        ));
    }

    #[tokio::test]
    async fn test_fetch_parse_error() {
        let mock_server = create_mock_server(200, "<rss><channel></channel></rss>").await;
        let fetcher = fetcher_for(&mock_server);

        let result = fetcher.fetch("AUD").await;

        assert!(matches!(
            result,
            Err(FetchError::Parse(feed::ParseError::EmptyFeed))
        ));
    }

    #[tokio::test]
    async fn test_fetch_transport_error() {
        // Nothing listens on the discard port.
        let fetcher =
            BankLvFetcher::new("http://127.0.0.1:9/ecb_rss.xml", Duration::from_secs(2)).unwrap();

        let result = fetcher.fetch("AUD").await;

        assert!(matches!(result, Err(FetchError::Transport(_))));
    }

    #[tokio::test]
    async fn test_fetch_requests_feed_on_every_call() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vk/ecb_rss.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MOCK_FEED))
            .expect(2)
            .mount(&mock_server)
            .await;
        let fetcher = fetcher_for(&mock_server);

        fetcher.fetch("AUD").await.unwrap();
        fetcher.fetch("BGN").await.unwrap();
    }
}
