//! Page video through `Page.startScreencast`, encoded to WebM by `ffmpeg`.
//!
//! Frames arrive as base64 JPEG, are acknowledged one by one and piped into
//! `ffmpeg` as an MJPEG stream. The file is complete once [`VideoRecorder::finish`]
//! has returned.

use crate::config::Viewport;
use crate::result::{ProbeError, ProbeResult};
use base64::Engine;
use chromiumoxide::cdp::browser_protocol::page::{
    EventScreencastFrame, ScreencastFrameAckParams, StartScreencastFormat, StartScreencastParams,
    StopScreencastParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

const ENCODER: &str = "ffmpeg";
const JPEG_QUALITY: i64 = 80;

fn video_error(e: impl std::fmt::Display) -> ProbeError {
    ProbeError::Video {
        message: e.to_string(),
    }
}

/// `ffmpeg` arguments that read MJPEG from stdin and write VP8 WebM
fn encoder_args(output: &Path) -> Vec<String> {
    [
        "-y", "-loglevel", "error", "-f", "image2pipe", "-vcodec", "mjpeg", "-i", "-", "-c:v",
        "libvpx", "-b:v", "1M", "-pix_fmt", "yuv420p",
    ]
    .iter()
    .map(ToString::to_string)
    .chain(std::iter::once(output.display().to_string()))
    .collect()
}

/// A running screencast of one page
pub(crate) struct VideoRecorder {
    page: Page,
    path: PathBuf,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<ProbeResult<()>>,
}

impl VideoRecorder {
    /// Start recording into a fresh file under `dir`.
    ///
    /// Returns `Ok(None)` when `ffmpeg` is not installed.
    pub(crate) async fn start(page: &Page, dir: &Path, viewport: Viewport) -> ProbeResult<Option<Self>> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.webm", Uuid::new_v4()));

        let mut child = match Command::new(ENCODER)
            .args(encoder_args(&path))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("{ENCODER} not found on PATH; video recording disabled");
                return Ok(None);
            }
            Err(e) => return Err(video_error(e)),
        };
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| video_error("encoder stdin unavailable"))?;

        let mut frames = page
            .event_listener::<EventScreencastFrame>()
            .await
            .map_err(video_error)?;
        page.execute(StartScreencastParams {
            format: Some(StartScreencastFormat::Jpeg),
            quality: Some(JPEG_QUALITY),
            max_width: Some(i64::from(viewport.width)),
            max_height: Some(i64::from(viewport.height)),
            every_nth_frame: Some(1),
        })
        .await
        .map_err(video_error)?;

        let (stop, mut stopped) = oneshot::channel::<()>();
        let ack_page = page.clone();
        let task = tokio::spawn(async move {
            let mut written = 0_usize;
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    frame = frames.next() => {
                        let Some(frame) = frame else { break };
                        if let Err(e) = ack_page
                            .execute(ScreencastFrameAckParams::new(frame.session_id))
                            .await
                        {
                            debug!(error = %e, "screencast ack failed");
                        }
                        let data: &str = frame.data.as_ref();
                        match base64::engine::general_purpose::STANDARD.decode(data) {
                            Ok(jpeg) => {
                                if stdin.write_all(&jpeg).await.is_err() {
                                    break;
                                }
                                written += 1;
                            }
                            Err(e) => debug!(error = %e, "dropping undecodable frame"),
                        }
                    }
                }
            }
            drop(stdin);
            let status = child.wait().await.map_err(video_error)?;
            debug!(frames = written, %status, "encoder finished");
            if status.success() || written == 0 {
                Ok(())
            } else {
                Err(video_error(format!("{ENCODER} exited with {status}")))
            }
        });

        debug!(path = %path.display(), "screencast started");
        Ok(Some(Self {
            page: page.clone(),
            path,
            stop: Some(stop),
            task,
        }))
    }

    /// Final location of the video
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Stop the screencast and wait for the encoder to write the file
    pub(crate) async fn finish(mut self) -> ProbeResult<()> {
        if let Err(e) = self.page.execute(StopScreencastParams::default()).await {
            debug!(error = %e, "stop screencast failed");
        }
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.task.await.map_err(video_error)?
    }
}
