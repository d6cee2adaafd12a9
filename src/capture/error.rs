use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("a capture session is already active")]
    AlreadyActive,
    #[error("failed to open measurement source: {0}")]
    SourceUnavailable(#[source] std::io::Error),
    #[error("measurement source closed")]
    SourceClosed,
    #[error("failed to render chart: {0}")]
    Chart(String),
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for CaptureError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        CaptureError::Chart(format!("{value:?}"))
    }
}

impl From<image::ImageError> for CaptureError {
    fn from(value: image::ImageError) -> Self {
        CaptureError::Chart(value.to_string())
    }
}
