use futures::StreamExt;
use reqwest::StatusCode;
use url::Url;

use crate::{
    error::{OttError, OttResult},
    stream::Chunk,
    util::http::HttpClient,
};

/// Requests `url`, returning the body of a 2xx response.
pub async fn fetch(client: &HttpClient, url: Url) -> OttResult<bytes::Bytes> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        let status = response.status();
        if let Ok(body) = response.text().await {
            tracing::warn!("Error body: {body}");
        }
        return Err(OttError::HttpError(status));
    }

    Ok(response.bytes().await?)
}

/// Outcome of one chunk request that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkResponse {
    /// Final url, after redirects
    pub url: Url,
    pub status: StatusCode,
    pub content_length: u64,
}

/// Issues the request of a single chunk.
///
/// Any response, whatever its status, is a success. Only transport failures are errors.
pub trait ChunkFetcher {
    fn fetch_chunk(
        &self,
        chunk: &Chunk,
    ) -> impl std::future::Future<Output = OttResult<ChunkResponse>> + Send;
}

impl ChunkFetcher for HttpClient {
    fn fetch_chunk(
        &self,
        chunk: &Chunk,
    ) -> impl std::future::Future<Output = OttResult<ChunkResponse>> + Send {
        let request = self.get(chunk.url.clone());
        let index = chunk.index;
        let chunk_url = chunk.url.clone();
        async move {
            let into_error = |source| OttError::ChunkFetchError {
                index,
                url: chunk_url.clone(),
                source,
            };

            let response = request.send().await.map_err(into_error)?;
            let url = response.url().clone();
            let status = response.status();
            let declared_length = response.content_length();

            // the body is discarded, only its size matters
            let mut received = 0u64;
            let mut body = response.bytes_stream();
            while let Some(bytes) = body.next().await {
                received += bytes.map_err(into_error)?.len() as u64;
            }

            Ok(ChunkResponse {
                url,
                status,
                content_length: declared_length.unwrap_or(received),
            })
        }
    }
}
