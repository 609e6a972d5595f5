use crate::model::Thumbnail;
use std::time::Duration;
use tracing::debug;

/// Largest edge of the preview shown under the labels
const PREVIEW_WIDTH: u32 = 320;
const PREVIEW_HEIGHT: u32 = 180;

/// Upper bound for the whole thumbnail request, body included
pub const THUMBNAIL_TIMEOUT: Duration = Duration::from_secs(5);

/// Downloads and decodes the thumbnail advertised in the video metadata.
pub async fn fetch_thumbnail(url: &str) -> Option<Thumbnail> {
    fetch_thumbnail_within(url, THUMBNAIL_TIMEOUT).await
}

/// Same as [`fetch_thumbnail`] with an explicit deadline.
pub async fn fetch_thumbnail_within(url: &str, timeout: Duration) -> Option<Thumbnail> {
    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            debug!("Cannot build thumbnail client: {}", e);
            return None;
        }
    };

    // Any HTTP, timeout or decode error just means no preview
    let fetch = async {
        let resp = client.get(url).send().await?.error_for_status()?;
        resp.bytes().await
    };
    let bytes = match tokio::time::timeout(timeout, fetch).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(e)) => {
            debug!("Thumbnail fetch failed for {}: {}", url, e);
            return None;
        }
        Err(_) => {
            debug!("Thumbnail fetch for {} timed out after {:?}", url, timeout);
            return None;
        }
    };
    decode_thumbnail(&bytes)
}

/// Decodes image bytes into a downscaled RGBA buffer.
pub fn decode_thumbnail(bytes: &[u8]) -> Option<Thumbnail> {
    let img = image::load_from_memory(bytes)
        .ok()?
        .thumbnail(PREVIEW_WIDTH, PREVIEW_HEIGHT)
        .to_rgba8();
    let size = [img.width() as usize, img.height() as usize];
    Some(Thumbnail {
        size,
        rgba: img.into_raw(),
    })
}
