use super::LoadResult;

/// Something that displays or otherwise consumes load results: an image view,
/// a button's background, a texture slot.
///
/// Implemented per consumer and handed to
/// [`ImageLoader::load_into`](super::ImageLoader::load_into). The sink decides
/// what to do with a placeholder, e.g. only show it while nothing else is
/// displayed.
pub trait ResultSink: Send + 'static {
    fn apply_result(&mut self, result: LoadResult);

    fn apply_progress(&mut self, _fraction: f32) {}
}

impl<F> ResultSink for F
where
    F: FnMut(LoadResult) + Send + 'static,
{
    fn apply_result(&mut self, result: LoadResult) {
        self(result)
    }
}

/// Adapts a pair of callbacks to [`ResultSink`].
pub(super) struct Callbacks<P, R> {
    pub(super) on_progress: P,
    pub(super) on_result: R,
}

impl<P, R> ResultSink for Callbacks<P, R>
where
    P: FnMut(f32) + Send + 'static,
    R: FnMut(LoadResult) + Send + 'static,
{
    fn apply_result(&mut self, result: LoadResult) {
        (self.on_result)(result)
    }

    fn apply_progress(&mut self, fraction: f32) {
        (self.on_progress)(fraction)
    }
}
