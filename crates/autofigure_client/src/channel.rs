use autofigure_core::JobId;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use url::Url;

use crate::api::parse_base_url;
use crate::sse::{SseDecoder, SseFrame};
use crate::{ApiError, ChannelError, ClientSettings};

/// Frames of one live channel connection. The stream ends when the server
/// closes the connection.
pub type EventStream = BoxStream<'static, Result<SseFrame, ChannelError>>;

/// Server-push subscription for a single job.
#[async_trait::async_trait]
pub trait LiveChannel: Send + Sync {
    async fn connect(&self, job_id: &JobId) -> Result<EventStream, ChannelError>;
}

#[derive(Debug, Clone)]
pub struct HttpLiveChannel {
    client: reqwest::Client,
    base: Url,
}

impl HttpLiveChannel {
    pub fn new(settings: &ClientSettings) -> Result<Self, ApiError> {
        // No overall timeout: the stream lives as long as the job.
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .read_timeout(settings.channel_read_timeout)
            .build()?;
        Ok(Self {
            client,
            base: parse_base_url(&settings.base_url)?,
        })
    }
}

#[async_trait::async_trait]
impl LiveChannel for HttpLiveChannel {
    async fn connect(&self, job_id: &JobId) -> Result<EventStream, ChannelError> {
        let url = self
            .base
            .join(&format!("api/events/{job_id}"))
            .map_err(|err| ChannelError::Connect(err.to_string()))?;
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|err| ChannelError::Connect(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChannelError::HttpStatus(status.as_u16()));
        }

        let mut decoder = SseDecoder::new();
        let frames = response
            .bytes_stream()
            .map(move |chunk: Result<Bytes, reqwest::Error>| match chunk {
                Ok(bytes) => match decoder.feed(&bytes) {
                    Ok(frames) => frames.into_iter().map(Ok).collect::<Vec<_>>(),
                    Err(err) => vec![Err(err)],
                },
                Err(err) => vec![Err(ChannelError::Interrupted(err.to_string()))],
            })
            .flat_map(stream::iter);
        Ok(frames.boxed())
    }
}
