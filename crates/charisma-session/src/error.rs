#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The worker could not be started; the caller gets no session id.
    #[error("failed to spawn session worker: {0}")]
    Spawn(String),
}
