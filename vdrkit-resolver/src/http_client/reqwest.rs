use super::HttpClient;
use http::{Request, Response};
use reqwest::Client;
use std::sync::Arc;

/// [`HttpClient`] implementation for [reqwest].
#[derive(Clone, Debug, Default)]
pub struct ReqwestClient {
    client: Arc<Client>,
}

impl ReqwestClient {
    pub fn new() -> Self {
        ReqwestClientBuilder::new().build()
    }
}

#[derive(Debug, Default)]
pub struct ReqwestClientBuilder {
    client: Option<Client>,
}

impl ReqwestClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }
    pub fn build(self) -> ReqwestClient {
        ReqwestClient { client: Arc::new(self.client.unwrap_or_default()) }
    }
}

impl HttpClient for ReqwestClient {
    async fn send_http(
        &self,
        request: Request<Vec<u8>>,
    ) -> core::result::Result<Response<Vec<u8>>, Box<dyn std::error::Error + Send + Sync + 'static>>
    {
        let response = self.client.execute(request.try_into()?).await?;
        let mut builder = Response::builder().status(response.status());
        for (k, v) in response.headers() {
            builder = builder.header(k, v);
        }
        builder.body(response.bytes().await?.to_vec()).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn send_through_mock_server() -> core::result::Result<(), Box<dyn std::error::Error>> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/hello")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body("world")
            .create_async()
            .await;
        let client = ReqwestClient::new();
        let request = Request::builder().uri(format!("{}/hello", server.url())).body(Vec::new())?;
        let response = client.send_http(request).await.map_err(|e| e.to_string())?;
        mock.assert_async().await;
        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), b"world");
        Ok(())
    }

    #[test]
    fn builder_with_client() -> core::result::Result<(), Box<dyn std::error::Error>> {
        let client = ReqwestClientBuilder::new()
            .client(Client::builder().timeout(Duration::from_secs(30)).build()?)
            .build();
        let _ = client.clone();
        Ok(())
    }
}
