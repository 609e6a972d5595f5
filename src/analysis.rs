use tracing::{info, warn};

use crate::error::TaskError;
use crate::extractor::MediaExtractor;
use crate::model::AnalysisResult;
use crate::thumbnail::fetch_thumbnail;

/// Queries metadata for `url` without downloading any media.
///
/// Every extractor failure collapses into [`TaskError::Analysis`]; the cause
/// only goes to the log.
pub async fn run_analysis(
    extractor: &dyn MediaExtractor,
    url: &str,
) -> Result<AnalysisResult, TaskError> {
    info!("Analyzing {}", url);
    let info = extractor.extract_info(url).await.map_err(|e| {
        warn!("Analysis of {} failed: {}", url, e);
        TaskError::Analysis
    })?;

    let thumbnail = match info.thumbnail.as_deref() {
        Some(thumb_url) => fetch_thumbnail(thumb_url).await,
        None => None,
    };

    let result = AnalysisResult::from_info(info, thumbnail);
    info!(
        "Analysis done: {:?} ({} streams, best {})",
        result.title_label(),
        result.streams.len(),
        result.quality_label()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::fake::FakeExtractor;
    use crate::thumbnail::{THUMBNAIL_TIMEOUT, test_support::silent_server};
    use std::time::Duration;

    #[tokio::test]
    async fn success_carries_title_and_streams() {
        let fake = FakeExtractor::new("My Video", &[Some(720), None, Some(1440)]);
        let result = run_analysis(&fake, "https://example.com/v").await.unwrap();
        assert_eq!(result.title.as_deref(), Some("My Video"));
        assert_eq!(result.best_resolution(), Some(1440));
        assert!(result.thumbnail.is_none());
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn failure_is_generic() {
        let fake = FakeExtractor::new("x", &[]).failing_info("ERROR: Unsupported URL: nope");
        let err = run_analysis(&fake, "nope").await.unwrap_err();
        assert_eq!(err, TaskError::Analysis);
        assert!(!err.to_string().contains("Unsupported"));
    }

    #[tokio::test]
    async fn stalled_thumbnail_host_does_not_hold_the_worker() {
        let fake = FakeExtractor::new("My Video", &[Some(720)]).with_thumbnail(&silent_server());
        let result = tokio::time::timeout(
            THUMBNAIL_TIMEOUT + Duration::from_secs(5),
            run_analysis(&fake, "https://example.com/v"),
        )
        .await
        .expect("analysis should finish once the thumbnail deadline passes")
        .unwrap();

        assert_eq!(result.title_label(), "My Video");
        assert_eq!(result.quality_label(), "720p");
        assert!(result.thumbnail.is_none());
    }
}
