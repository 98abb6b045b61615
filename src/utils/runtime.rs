use anyhow::Result;

/// The tracker runs its scheduler, signal handling and (in `tui` mode) the dashboard side by
/// side, so commands get a multi threaded runtime.
pub fn multi_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}
