//! Unified browser automation interface behind the `headless` feature
//! (spec.md §4.1 tiers 2-4), plus a `chromiumoxide`-backed implementation.
//!
//! Kept as a trait object rather than calling `chromiumoxide` directly from
//! [`crate::strategy`] so that the headless/stealth/cloaked tiers share one
//! navigate/evaluate/screenshot surface regardless of which engine backs it.

use async_trait::async_trait;

use crate::errors::FetchError;

#[async_trait]
pub trait BrowserEngine: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>, FetchError>;
    async fn close(&self) -> Result<(), FetchError>;
}

#[async_trait]
pub trait PageHandle: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), FetchError>;
    async fn content(&self) -> Result<String, FetchError>;
    async fn url(&self) -> Result<String, FetchError>;
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, FetchError>;
    async fn screenshot(&self) -> Result<Vec<u8>, FetchError>;
    async fn wait_for_navigation(&self) -> Result<(), FetchError>;
    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), FetchError>;
    async fn close(&self) -> Result<(), FetchError>;
}

#[cfg(feature = "headless")]
pub mod chromiumoxide_impl {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chromiumoxide::{Browser, BrowserConfig, Page};
    use futures::StreamExt;

    use super::{BrowserEngine, PageHandle};
    use crate::errors::FetchError;

    fn engine_err(message: impl ToString) -> FetchError {
        FetchError::EngineUnavailable {
            message: message.to_string(),
        }
    }

    pub struct ChromiumoxideEngine {
        browser: Arc<Browser>,
    }

    impl ChromiumoxideEngine {
        /// Launch a headless Chromium instance and spawn its CDP event loop.
        pub async fn launch(user_agent: Option<&str>) -> Result<Self, FetchError> {
            let mut builder = BrowserConfig::builder().no_sandbox();
            if let Some(ua) = user_agent {
                builder = builder.user_agent(ua);
            }
            let config = builder.build().map_err(engine_err)?;
            let (browser, mut handler) = Browser::launch(config).await.map_err(engine_err)?;
            tokio::spawn(async move { while handler.next().await.is_some() {} });
            Ok(Self {
                browser: Arc::new(browser),
            })
        }
    }

    #[async_trait]
    impl BrowserEngine for ChromiumoxideEngine {
        async fn new_page(&self) -> Result<Box<dyn PageHandle>, FetchError> {
            let page = self
                .browser
                .new_page("about:blank")
                .await
                .map_err(engine_err)?;
            Ok(Box::new(ChromiumoxidePage { page }))
        }

        async fn close(&self) -> Result<(), FetchError> {
            // chromiumoxide's Browser::close takes &mut self; with Arc-shared
            // ownership the process closes on last-drop instead.
            Ok(())
        }
    }

    pub struct ChromiumoxidePage {
        page: Page,
    }

    #[async_trait]
    impl PageHandle for ChromiumoxidePage {
        async fn goto(&self, url: &str) -> Result<(), FetchError> {
            self.page.goto(url).await.map_err(engine_err)?;
            Ok(())
        }

        async fn content(&self) -> Result<String, FetchError> {
            self.page.content().await.map_err(engine_err)
        }

        async fn url(&self) -> Result<String, FetchError> {
            Ok(self.page.url().await.map_err(engine_err)?.unwrap_or_default())
        }

        async fn evaluate(&self, script: &str) -> Result<serde_json::Value, FetchError> {
            let result = self.page.evaluate(script).await.map_err(engine_err)?;
            result.into_value().map_err(engine_err)
        }

        async fn screenshot(&self) -> Result<Vec<u8>, FetchError> {
            self.page
                .screenshot(chromiumoxide::page::ScreenshotParams::builder().full_page(true).build())
                .await
                .map_err(engine_err)
        }

        async fn wait_for_navigation(&self) -> Result<(), FetchError> {
            self.page.wait_for_navigation().await.map_err(engine_err)?;
            Ok(())
        }

        async fn set_viewport(&self, width: u32, height: u32) -> Result<(), FetchError> {
            self.page
                .set_viewport(chromiumoxide::handler::viewport::Viewport {
                    width,
                    height,
                    ..Default::default()
                })
                .await
                .map_err(engine_err)?;
            Ok(())
        }

        async fn close(&self) -> Result<(), FetchError> {
            Ok(())
        }
    }
}
