//! [`PageDriver`] over a chromiumoxide page.
//!
//! Locators are resolved in the page with JavaScript. To act on a match with
//! real input events, the element is tagged with a one-off token attribute and
//! then fetched through the protocol by that attribute.

use crate::browser::ContextOptions;
use crate::driver::PageDriver;
use crate::locator::{ElementState, Locator};
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetLocaleOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::page::{Page, ScreenshotParams};
use serde::de::DeserializeOwned;
use std::fmt;
use uuid::Uuid;

const TARGET_ATTR: &str = "data-todoprobe-target";

const CLEAR_VALUE_JS: &str = "function() { \
    this.focus(); \
    this.value = ''; \
    this.dispatchEvent(new Event('input', { bubbles: true })); \
}";

fn page_error(e: impl fmt::Display) -> ProbeError {
    ProbeError::page(e.to_string())
}

/// A page (tab) in a CDP browser context
pub struct CdpPage {
    inner: Page,
}

impl fmt::Debug for CdpPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CdpPage").finish_non_exhaustive()
    }
}

impl CdpPage {
    pub(crate) const fn new(inner: Page) -> Self {
        Self { inner }
    }

    pub(crate) const fn raw(&self) -> &Page {
        &self.inner
    }

    /// Apply viewport, locale and `Accept-Language` to the page
    pub(crate) async fn emulate(&self, options: &ContextOptions) -> ProbeResult<()> {
        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(options.viewport.width))
            .height(i64::from(options.viewport.height))
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(page_error)?;
        self.inner.execute(metrics).await.map_err(page_error)?;

        self.inner
            .execute(SetLocaleOverrideParams {
                locale: Some(options.locale.clone()),
            })
            .await
            .map_err(page_error)?;

        let user_agent: String = self.eval("navigator.userAgent").await?;
        let agent = SetUserAgentOverrideParams::builder()
            .user_agent(user_agent)
            .accept_language(options.accept_language.clone())
            .build()
            .map_err(page_error)?;
        self.inner.execute(agent).await.map_err(page_error)?;
        Ok(())
    }

    async fn eval<T: DeserializeOwned>(&self, expression: &str) -> ProbeResult<T> {
        self.inner
            .evaluate(expression)
            .await
            .map_err(page_error)?
            .into_value()
            .map_err(page_error)
    }

    /// First match of `locator` as a protocol element handle
    async fn target(&self, locator: &Locator) -> ProbeResult<Element> {
        let token = Uuid::new_v4().simple().to_string();
        let tag = format!(
            "(() => {{ const el = {}; if (!el) return false; el.setAttribute('{TARGET_ATTR}', '{token}'); return true; }})()",
            locator.to_query()
        );
        if !self.eval::<bool>(&tag).await? {
            return Err(ProbeError::ElementNotFound {
                locator: locator.to_string(),
            });
        }
        self.inner
            .find_element(format!("[{TARGET_ATTR}=\"{token}\"]"))
            .await
            .map_err(|_| ProbeError::ElementNotFound {
                locator: locator.to_string(),
            })
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn goto(&self, url: &str) -> ProbeResult<()> {
        self.inner
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| ProbeError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn reload(&self) -> ProbeResult<()> {
        self.inner.reload().await.map(|_| ()).map_err(page_error)
    }

    async fn url(&self) -> ProbeResult<String> {
        Ok(self.inner.url().await.map_err(page_error)?.unwrap_or_default())
    }

    async fn title(&self) -> ProbeResult<String> {
        Ok(self
            .inner
            .get_title()
            .await
            .map_err(page_error)?
            .unwrap_or_default())
    }

    async fn query_all(&self, locator: &Locator) -> ProbeResult<Vec<ElementState>> {
        self.eval(&locator.to_state_query()).await
    }

    async fn click(&self, locator: &Locator) -> ProbeResult<()> {
        let element = self.target(locator).await?;
        element.click().await.map_err(page_error)?;
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str) -> ProbeResult<()> {
        let element = self.target(locator).await?;
        element
            .call_js_fn(CLEAR_VALUE_JS, false)
            .await
            .map_err(page_error)?;
        if !value.is_empty() {
            element.type_str(value).await.map_err(page_error)?;
        }
        Ok(())
    }

    async fn press(&self, locator: &Locator, key: &str) -> ProbeResult<()> {
        let element = self.target(locator).await?;
        element.focus().await.map_err(page_error)?;
        element.press_key(key).await.map_err(page_error)?;
        Ok(())
    }

    async fn hover(&self, locator: &Locator) -> ProbeResult<()> {
        let element = self.target(locator).await?;
        element.hover().await.map_err(page_error)?;
        Ok(())
    }

    async fn screenshot(&self, full_page: bool) -> ProbeResult<Vec<u8>> {
        self.inner
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(full_page)
                    .build(),
            )
            .await
            .map_err(|e| ProbeError::Screenshot {
                message: e.to_string(),
            })
    }

    async fn close(&self) -> ProbeResult<()> {
        self.inner.clone().close().await.map_err(page_error)
    }
}
