use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::series::{Labeling, SeriesBatch};

/// Generic trait for the remote ingestion API
///
/// The collector only speaks to the backend through this seam; the
/// default implementation is [`http::HttpTransport`].
#[async_trait]
pub trait IngestApi: Send + Sync + 'static {
    /// Initialize an incremental dataset and return its remote-assigned id
    async fn init_dataset(
        &self,
        name: &str,
        meta_data: &Value,
        time_series: &[String],
        labeling: Option<&Labeling>,
    ) -> Result<String>;

    /// Append one batch of buffered points to an existing dataset
    async fn append_batch(
        &self,
        dataset_id: &str,
        data: Vec<SeriesBatch>,
        labeling: Option<Labeling>,
    ) -> Result<()>;
}

/// Upload a whole, pre-assembled dataset to the ingestion endpoint in a
/// single call and return the server-reported message.
pub async fn send_dataset<T>(endpoint: &str, api_key: &str, dataset: &T) -> Result<String>
where
    T: Serialize + Sync + ?Sized,
{
    let transport = http::HttpTransport::new(endpoint, api_key)?;
    transport.upload_dataset(dataset).await
}

/// Module for the HTTP transport implementation
pub mod http {
    use super::*;
    use log::{debug, warn};
    use serde::Deserialize;

    use crate::error::ClientError;

    const UPLOAD_DATASET_PATH: &str = "/api/deviceapi/uploadDataset";
    const INIT_DATASET_PATH: &str = "/ds/api/dataset/init";
    const APPEND_BATCH_PATH: &str = "/ds/api/dataset/append";

    #[derive(Serialize)]
    struct UploadRequest<'a, T: Serialize + ?Sized> {
        key: &'a str,
        payload: &'a T,
    }

    #[derive(Deserialize)]
    struct UploadResponse {
        message: String,
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct InitRequest<'a> {
        name: &'a str,
        meta_data: &'a Value,
        time_series: &'a [String],
        labeling: Option<&'a Labeling>,
    }

    #[derive(Deserialize)]
    struct InitResponse {
        #[serde(default)]
        id: Option<String>,
    }

    #[derive(Serialize)]
    struct AppendRequest<'a> {
        data: &'a [SeriesBatch],
        labeling: Option<&'a Labeling>,
    }

    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<String>,
    }

    /// HTTP transport against the ingestion endpoint
    pub struct HttpTransport {
        client: reqwest::Client,
        endpoint: String,
        api_key: String,
    }

    impl HttpTransport {
        /// Create a new transport for the given endpoint and device API key
        pub fn new(endpoint: &str, api_key: &str) -> Result<Self> {
            let client = reqwest::Client::builder()
                .build()
                .map_err(|e| ClientError::Transport(format!("Failed to build HTTP client: {}", e)))?;

            Ok(Self {
                client,
                endpoint: endpoint.trim_end_matches('/').to_string(),
                api_key: api_key.to_string(),
            })
        }

        /// Upload a complete dataset in one request
        pub async fn upload_dataset<T>(&self, dataset: &T) -> Result<String>
        where
            T: Serialize + Sync + ?Sized,
        {
            let url = format!("{}{}", self.endpoint, UPLOAD_DATASET_PATH);
            let body = UploadRequest {
                key: &self.api_key,
                payload: dataset,
            };

            let response = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(send_error)?;
            let response = check_response(response).await?;

            let reply: UploadResponse = response
                .json()
                .await
                .map_err(|e| ClientError::Transport(format!("Malformed upload response: {}", e)))?;

            debug!("Uploaded dataset: {}", reply.message);

            Ok(reply.message)
        }
    }

    #[async_trait]
    impl IngestApi for HttpTransport {
        async fn init_dataset(
            &self,
            name: &str,
            meta_data: &Value,
            time_series: &[String],
            labeling: Option<&Labeling>,
        ) -> Result<String> {
            let url = format!("{}{}/{}", self.endpoint, INIT_DATASET_PATH, self.api_key);
            let body = InitRequest {
                name,
                meta_data,
                time_series,
                labeling,
            };

            let response = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(send_error)?;
            let response = check_response(response).await?;

            let reply: InitResponse = response.json().await.map_err(|e| {
                ClientError::Initialization(format!("Malformed init response: {}", e))
            })?;

            match reply.id {
                Some(id) if !id.is_empty() => {
                    debug!("Initialized dataset '{}' with id {}", name, id);
                    Ok(id)
                }
                _ => Err(ClientError::Initialization(
                    "Could not generate dataset collector: response carried no dataset id"
                        .to_string(),
                )),
            }
        }

        async fn append_batch(
            &self,
            dataset_id: &str,
            data: Vec<SeriesBatch>,
            labeling: Option<Labeling>,
        ) -> Result<()> {
            let url = format!(
                "{}{}/{}/{}",
                self.endpoint, APPEND_BATCH_PATH, self.api_key, dataset_id
            );
            let body = AppendRequest {
                data: &data,
                labeling: labeling.as_ref(),
            };

            let response = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(send_error)?;
            check_response(response).await?;

            debug!(
                "Appended {} series to dataset {}",
                data.len(),
                dataset_id
            );

            Ok(())
        }
    }

    /// Normalize a request that produced no response at all
    fn send_error(err: reqwest::Error) -> ClientError {
        warn!("Request failed without a response: {}", err);
        ClientError::Transport("Server error".to_string())
    }

    /// Normalize a non-success response into a single error-message string.
    ///
    /// A structured `{error}` body is surfaced directly; anything else is
    /// surfaced as the raw body, prefixed with the HTTP status code.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(ErrorBody { error: Some(error) }) => error,
            _ => body,
        };

        Err(ClientError::Transport(format!(
            "{}: {}",
            status.as_u16(),
            message
        )))
    }

}
