/// Receives the "new work available" signal from the block template feed.
///
/// Invocations for one manager are never concurrent. The signal carries no payload; the session
/// layer fetches the template itself through
/// [`BlockTemplateSource`](crate::BlockTemplateSource).
pub trait WorkReadyHandler: Send + Sync {
    /// Called whenever fresh work should be handed to miners.
    fn on_work_ready(&self);
}

impl<F> WorkReadyHandler for F
where
    F: Fn() + Send + Sync,
{
    fn on_work_ready(&self) {
        self()
    }
}
