use std::collections::VecDeque;

use crate::capture::CaptureError;

/// Something that can yield complete lines of instrument output without
/// blocking the caller.
pub trait LineSource {
    /// Returns the next complete line if one is available right now.
    ///
    /// `Ok(None)` means nothing is buffered yet; `Err(SourceClosed)` means
    /// the stream ended or errored and will never produce more lines.
    fn try_read_line(&mut self) -> Result<Option<String>, CaptureError>;
}

/// In-memory source useful for tests and deterministic playback.
pub struct ScriptedSource {
    queue: VecDeque<String>,
    close_when_drained: bool,
}

impl ScriptedSource {
    /// Yields the given lines, then reports `Ok(None)` forever.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: lines.into_iter().map(Into::into).collect(),
            close_when_drained: false,
        }
    }

    /// Yields the given lines, then reports the stream as closed.
    pub fn closing<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: lines.into_iter().map(Into::into).collect(),
            close_when_drained: true,
        }
    }
}

impl LineSource for ScriptedSource {
    fn try_read_line(&mut self) -> Result<Option<String>, CaptureError> {
        match self.queue.pop_front() {
            Some(line) => Ok(Some(line)),
            None if self.close_when_drained => Err(CaptureError::SourceClosed),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_source_drains_then_idles() {
        let mut source = ScriptedSource::new(["a", "b"]);
        assert_eq!(source.try_read_line().unwrap(), Some("a".to_owned()));
        assert_eq!(source.try_read_line().unwrap(), Some("b".to_owned()));
        assert_eq!(source.try_read_line().unwrap(), None);
        assert_eq!(source.try_read_line().unwrap(), None);
    }

    #[test]
    fn closing_source_reports_closed_after_draining() {
        let mut source = ScriptedSource::closing(["a"]);
        assert_eq!(source.try_read_line().unwrap(), Some("a".to_owned()));
        assert!(matches!(
            source.try_read_line(),
            Err(CaptureError::SourceClosed)
        ));
    }
}
