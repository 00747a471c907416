use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::DetectionFrame;

use super::pipeline::DetectionPipeline;

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Process frames as the detector pushes them. Exits on cancel or when every
/// sender is gone.
pub async fn detection_loop(
    mut frames: mpsc::Receiver<DetectionFrame>,
    mut pipeline: DetectionPipeline,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("detection loop shutting down");
                break;
            }
            frame = frames.recv() => match frame {
                Some(frame) => {
                    pipeline.process(&frame);
                }
                None => {
                    log_info!("detector feed closed; detection loop exiting");
                    break;
                }
            },
        }
    }
}
