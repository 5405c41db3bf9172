use std::sync::Arc;

use tokio::sync::mpsc;

use crate::decode::DecodedImage;
use crate::error::LoadError;

/// What a caller is told about a load.
#[derive(Debug, Clone)]
pub enum LoadResult {
    Success(Arc<DecodedImage>),
    /// The resource is being fetched; carries the caller's placeholder.
    Underway(Option<Arc<DecodedImage>>),
    Failure(LoadError),
}

impl LoadResult {
    /// `Success` and `Failure` end a load; `Underway` does not.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoadResult::Underway(_))
    }

    pub fn image(&self) -> Option<&Arc<DecodedImage>> {
        match self {
            LoadResult::Success(image) => Some(image),
            LoadResult::Underway(placeholder) => placeholder.as_ref(),
            LoadResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            LoadResult::Failure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<Result<Arc<DecodedImage>, LoadError>> for LoadResult {
    fn from(outcome: Result<Arc<DecodedImage>, LoadError>) -> Self {
        match outcome {
            Ok(image) => LoadResult::Success(image),
            Err(err) => LoadResult::Failure(err),
        }
    }
}

/// One item of a load's event stream.
#[derive(Debug, Clone)]
pub enum LoadEvent {
    Progress(f32),
    Result(LoadResult),
}

/// Receiving end of a load.
///
/// Yields zero or one `Underway` result and any number of progress ticks,
/// followed by exactly one terminal result, after which the stream ends.
#[derive(Debug)]
pub struct LoadHandle {
    events: mpsc::UnboundedReceiver<LoadEvent>,
}

impl LoadHandle {
    pub(super) fn channel() -> (mpsc::UnboundedSender<LoadEvent>, Self) {
        let (tx, events) = mpsc::unbounded_channel();
        (tx, Self { events })
    }

    /// Next event, or `None` once the load is over.
    pub async fn next(&mut self) -> Option<LoadEvent> {
        self.events.recv().await
    }

    /// Wait for the terminal result, skipping everything before it.
    pub async fn outcome(mut self) -> LoadResult {
        while let Some(event) = self.next().await {
            if let LoadEvent::Result(result) = event {
                if result.is_terminal() {
                    return result;
                }
            }
        }
        LoadResult::Failure(LoadError::Shutdown)
    }
}
