//! Chrome DevTools Protocol backend over chromiumoxide.
//!
//! Each context is a CDP browser context (`Target.createBrowserContext`), so
//! cookies and storage never leak between scenarios that share a process.

mod page;
mod video;

pub use page::CdpPage;

use crate::browser::{resolve_channel, BrowserKind, ContextOptions, LaunchOptions};
use crate::driver::{BrowserSession, ContextSession, Launcher, PageDriver};
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use video::VideoRecorder;

const BACKEND: &str = "chromiumoxide";

/// Launches Chromium-family browsers
#[derive(Debug, Default, Clone, Copy)]
pub struct CdpLauncher;

impl CdpLauncher {
    /// Create the launcher
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn config(options: &LaunchOptions) -> ProbeResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .window_size(options.viewport.width, options.viewport.height)
            .launch_timeout(options.launch_timeout);

        if !options.headless {
            builder = builder.with_head();
        }
        if !options.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = resolve_channel(options.channel.as_deref())? {
            builder = builder.chrome_executable(path);
        }
        for arg in &options.args {
            builder = builder.arg(arg.as_str());
        }

        builder
            .build()
            .map_err(|message| ProbeError::BrowserLaunch { message })
    }
}

#[async_trait]
impl Launcher for CdpLauncher {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn launch(
        &self,
        kind: BrowserKind,
        options: &LaunchOptions,
    ) -> ProbeResult<Box<dyn BrowserSession>> {
        match kind {
            BrowserKind::Chromium => {}
            BrowserKind::Firefox | BrowserKind::Webkit => {
                return Err(ProbeError::UnsupportedBrowser {
                    kind: kind.to_string(),
                    backend: BACKEND,
                })
            }
        }

        let config = Self::config(options)?;
        let (browser, mut handler) =
            Browser::launch(config)
                .await
                .map_err(|e| ProbeError::BrowserLaunch {
                    message: e.to_string(),
                })?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        debug!(headless = options.headless, "browser launched");

        Ok(Box::new(CdpBrowser {
            inner: Arc::new(Mutex::new(browser)),
            handle,
        }))
    }
}

/// A running Chromium process
struct CdpBrowser {
    inner: Arc<Mutex<Browser>>,
    handle: tokio::task::JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for CdpBrowser {
    async fn new_context(&self, options: &ContextOptions) -> ProbeResult<Box<dyn ContextSession>> {
        let browser = self.inner.lock().await;
        let id = browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| ProbeError::Context {
                message: e.to_string(),
            })?
            .result
            .browser_context_id;

        Ok(Box::new(CdpContext {
            browser: Arc::clone(&self.inner),
            id,
            options: options.clone(),
            pages: Mutex::new(Vec::new()),
            recorders: Mutex::new(Vec::new()),
            video_path: StdMutex::new(None),
        }))
    }

    async fn close(&self) -> ProbeResult<()> {
        let mut browser = self.inner.lock().await;
        let closed = browser.close().await;
        // The handler loop ends once the connection drops
        let _ = browser.wait().await;
        self.handle.abort();
        closed.map(|_| ()).map_err(|e| ProbeError::BrowserLaunch {
            message: format!("close failed: {e}"),
        })
    }
}

/// One isolated browser context
struct CdpContext {
    browser: Arc<Mutex<Browser>>,
    id: BrowserContextId,
    options: ContextOptions,
    pages: Mutex<Vec<Arc<CdpPage>>>,
    recorders: Mutex<Vec<VideoRecorder>>,
    video_path: StdMutex<Option<PathBuf>>,
}

#[async_trait]
impl ContextSession for CdpContext {
    async fn new_page(&self) -> ProbeResult<Arc<dyn PageDriver>> {
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(self.id.clone())
            .build()
            .map_err(|message| ProbeError::Context { message })?;

        let raw = {
            let browser = self.browser.lock().await;
            browser.new_page(params).await.map_err(|e| ProbeError::Context {
                message: e.to_string(),
            })?
        };

        let page = Arc::new(CdpPage::new(raw));
        page.emulate(&self.options).await?;

        if let Some(dir) = &self.options.record_video_dir {
            if let Some(recorder) = VideoRecorder::start(page.raw(), dir, self.options.viewport).await? {
                self.video_path
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get_or_insert_with(|| recorder.path().to_path_buf());
                self.recorders.lock().await.push(recorder);
            }
        }

        self.pages.lock().await.push(Arc::clone(&page));
        Ok(page)
    }

    fn video_path(&self) -> Option<PathBuf> {
        self.video_path
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn close(&self) -> ProbeResult<()> {
        let recorders: Vec<VideoRecorder> = self.recorders.lock().await.drain(..).collect();
        for recorder in recorders {
            if let Err(e) = recorder.finish().await {
                warn!(error = %e, "video recording did not finish cleanly");
            }
        }

        let pages: Vec<Arc<CdpPage>> = self.pages.lock().await.drain(..).collect();
        for page in pages {
            if let Err(e) = page.close().await {
                debug!(error = %e, "page already closed");
            }
        }

        let browser = self.browser.lock().await;
        browser
            .execute(DisposeBrowserContextParams::new(self.id.clone()))
            .await
            .map(|_| ())
            .map_err(|e| ProbeError::Context {
                message: e.to_string(),
            })
    }
}
