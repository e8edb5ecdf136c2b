//! Image pull step.

use rollgate_engine::EngineClient;
use rollgate_store::ExecutionLog;

use crate::error::DeployResult;
use crate::reference::pull_reference;

/// Pull the requested image through the engine, logging filtered progress.
pub async fn pull(engine: &EngineClient, image_ref: &str, log: &ExecutionLog) -> DeployResult<()> {
    let (from_image, tag) = pull_reference(image_ref);
    log.append(&format!("[pull] Pulling image: {image_ref}"));

    let mut on_status = |status: &str| log.append(&format!("[pull] {status}"));
    engine
        .pull_image(&from_image, tag.as_deref(), &mut on_status)
        .await?;

    log.append(&format!("[pull] Image pulled: {image_ref}"));
    Ok(())
}
