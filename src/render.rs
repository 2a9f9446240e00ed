/// Shared scripting-capable rendering session.
///
/// Hosting pages only populate their parameter blob after client-side script
/// runs, so candidates are loaded in a real browser. The session is a single
/// exclusively-owned resource; all navigations serialize through it.
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::spawn_blocking;
use tracing::{debug, info};

use crate::config::RenderConfig;
use crate::error::RenderError;

/// Operations the extraction stage needs from a rendering session.
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// Load a page and wait for navigation to settle.
    async fn navigate(&self, url: &str) -> Result<(), RenderError>;

    /// Read the value of a named form field from the rendered DOM.
    /// `Ok(None)` means the element or its value is absent.
    async fn form_field_value(&self, name: &str) -> Result<Option<String>, RenderError>;

    /// Leave any origin page. The underlying process is torn down when the
    /// session handle drops, including on panics and interrupts.
    async fn release(&self) -> Result<(), RenderError>;
}

/// Rendering session backed by a headless Chrome process.
pub struct HeadlessChromeRenderer {
    _browser: Browser,
    tab: Arc<Tab>,
    page_timeout: Duration,
}

impl HeadlessChromeRenderer {
    /// Launch a browser process and open the single tab the session owns.
    /// Failure here is fatal for a run: no episode resolves without rendering.
    pub fn launch(config: &RenderConfig) -> Result<Self, RenderError> {
        let page_timeout = Duration::from_secs(config.page_timeout_seconds);
        let args = vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--mute-audio"),
        ];

        let mut builder = LaunchOptions::default_builder();
        builder
            .headless(config.headless)
            .window_size(Some((config.window_width, config.window_height)))
            .idle_browser_timeout(Duration::from_secs(600))
            .args(args);

        if let Some(extension) = &config.adblock_extension {
            info!("loading content-blocking extension: {}", extension.display());
            builder.extensions(vec![extension.as_os_str()]);
        } else {
            info!("no content-blocking extension configured, rendering without ad blocking");
        }

        let options = builder
            .build()
            .map_err(|e| RenderError::Unavailable(e.to_string()))?;

        let browser = Browser::new(options).map_err(|e| RenderError::Unavailable(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| RenderError::Unavailable(e.to_string()))?;
        tab.set_default_timeout(page_timeout);

        info!("🖥️ Rendering session ready (headless: {})", config.headless);

        Ok(Self {
            _browser: browser,
            tab,
            page_timeout,
        })
    }
}

#[async_trait]
impl RenderSession for HeadlessChromeRenderer {
    async fn navigate(&self, url: &str) -> Result<(), RenderError> {
        let tab = Arc::clone(&self.tab);
        let target = url.to_string();
        let timeout_secs = self.page_timeout.as_secs();

        let task = spawn_blocking(move || {
            tab.navigate_to(&target)
                .and_then(|t| t.wait_until_navigated())
                .map(|_| ())
                .map_err(|e| RenderError::Navigation(target.clone(), e.to_string()))
        });

        match tokio::time::timeout(self.page_timeout, task).await {
            Err(_) => Err(RenderError::Timeout(url.to_string(), timeout_secs)),
            Ok(Err(join_err)) => Err(RenderError::Navigation(url.to_string(), join_err.to_string())),
            Ok(Ok(result)) => result,
        }
    }

    async fn form_field_value(&self, name: &str) -> Result<Option<String>, RenderError> {
        let tab = Arc::clone(&self.tab);
        let timeout_secs = self.page_timeout.as_secs();
        let script = format!(
            r#"(function() {{
                var el = document.getElementsByName("{name}")[0];
                if (!el) {{ return null; }}
                var value = el.value;
                if (value === undefined || value === "") {{
                    value = el.getAttribute("value");
                }}
                return value;
            }})()"#
        );

        let task = spawn_blocking(move || {
            tab.evaluate(&script, true)
                .map(|result| result.value.and_then(|v| v.as_str().map(str::to_string)))
                .map_err(|e| RenderError::Read(e.to_string()))
        });

        match tokio::time::timeout(self.page_timeout, task).await {
            Err(_) => Err(RenderError::Timeout(format!("field '{name}'"), timeout_secs)),
            Ok(Err(join_err)) => Err(RenderError::Read(join_err.to_string())),
            Ok(Ok(result)) => result,
        }
    }

    async fn release(&self) -> Result<(), RenderError> {
        debug!("releasing rendering session");
        let tab = Arc::clone(&self.tab);
        let _ = spawn_blocking(move || tab.navigate_to("about:blank").map(|_| ())).await;
        Ok(())
    }
}
