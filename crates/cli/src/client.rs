//! HTTP client for a running penguin-server

use anyhow::{Context, Result};
use classifier_lib::{ErrorResponse, Prediction, RawObservation};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// Classify one observation with the server's model
    pub async fn predict(&self, observation: &RawObservation) -> Result<Prediction> {
        self.post("predict", observation).await
    }

    /// Error bodies are `{ "error": ... }`; fall back to the raw text otherwise
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classifier_lib::SpeciesLabel;

    fn observation(island: &str) -> RawObservation {
        RawObservation {
            bill_length_mm: 39.1,
            bill_depth_mm: 18.7,
            flipper_length_mm: 181.0,
            body_mass_g: 3750.0,
            year: 2007,
            sex: "male".to_string(),
            island: island.to_string(),
        }
    }

    #[tokio::test]
    async fn test_predict_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/predict")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"prediction": 0, "species": "Adelie"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let prediction = client.predict(&observation("Biscoe")).await.unwrap();

        assert_eq!(prediction.prediction, 0);
        assert_eq!(prediction.species, SpeciesLabel::Adelie);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_predict_error_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(422)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "invalid value for 'island': 'Atlantis' is not one of [Biscoe, Dream, Torgersen]"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client.predict(&observation("Atlantis")).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("422"));
        assert!(message.contains("Atlantis"));
    }

    #[test]
    fn test_invalid_url() {
        assert!(ApiClient::new("not a url").is_err());
    }
}
