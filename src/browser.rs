use headless_chrome::{Browser, LaunchOptions, Tab};
use log::info;
use serde_json::json;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {0} failed: {1}")]
    Navigation(String, String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("timed out after {waited:?} waiting for {condition}")]
    Timeout { condition: String, waited: Duration },

    #[error("javascript evaluation failed: {0}")]
    Js(String),
}

/// A live Chrome session. The browser process stays open for the whole
/// search and is torn down when the session is dropped.
pub struct BrowserSession {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl BrowserSession {
    pub fn launch(headless: bool) -> Result<Self, BrowserError> {
        let options = LaunchOptions::default_builder()
            .headless(headless)
            .window_size(Some((1366, 900)))
            .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
            .build()
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let browser = Browser::new(options).map_err(|e| BrowserError::Launch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        info!("Browser session started (headless: {})", headless);
        Ok(BrowserSession { _browser: browser, tab })
    }

    pub fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.tab
            .navigate_to(url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| BrowserError::Navigation(url.to_string(), e.to_string()))?;
        info!("Navigated to {}", url);
        Ok(())
    }

    /// Waits for an element to be present in the DOM. Timing out here is a
    /// `Timeout` error; it says nothing about visibility.
    pub fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map(|_| ())
            .map_err(|_| BrowserError::Timeout {
                condition: format!("presence of {}", selector),
                waited: timeout,
            })
    }

    pub fn type_into(&self, selector: &str, text: &str) -> Result<(), BrowserError> {
        let element = self
            .tab
            .find_element(selector)
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element
            .type_into(text)
            .map_err(|e| BrowserError::Js(e.to_string()))?;
        Ok(())
    }

    /// Selects a dropdown option by its visible label. Returns `false` when
    /// no option carries the label; the select is left untouched in that case.
    pub fn select_by_label(&self, selector: &str, label: &str) -> Result<bool, BrowserError> {
        self.select_option(selector, "o.textContent.trim() === target", label)
    }

    /// Selects a dropdown option by its value attribute.
    pub fn select_by_value(&self, selector: &str, value: &str) -> Result<bool, BrowserError> {
        self.select_option(selector, "o.value === target", value)
    }

    fn select_option(
        &self,
        selector: &str,
        predicate: &str,
        needle: &str,
    ) -> Result<bool, BrowserError> {
        let element = self
            .tab
            .find_element(selector)
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;

        let function = format!(
            r#"function(target) {{
                const opt = Array.from(this.options).find(o => {});
                if (!opt) {{ return false; }}
                this.value = opt.value;
                this.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }}"#,
            predicate
        );

        let result = element
            .call_js_fn(&function, vec![json!(needle)], false)
            .map_err(|e| BrowserError::Js(e.to_string()))?;

        Ok(matches!(result.value, Some(serde_json::Value::Bool(true))))
    }

    /// Clicks an element through JavaScript, sidestepping click
    /// interception by overlays.
    pub fn js_click(&self, selector: &str) -> Result<(), BrowserError> {
        let element = self
            .tab
            .find_element(selector)
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element
            .call_js_fn("function() { this.click(); }", vec![], false)
            .map_err(|e| BrowserError::Js(e.to_string()))?;
        Ok(())
    }

    pub fn inner_text(&self, selector: &str) -> Result<String, BrowserError> {
        let element = self
            .tab
            .find_element(selector)
            .map_err(|_| BrowserError::ElementNotFound(selector.to_string()))?;
        element
            .get_inner_text()
            .map_err(|e| BrowserError::Js(e.to_string()))
    }

    /// Visibility in the layout sense: present and taking part in layout.
    /// An absent element is simply not visible, not an error.
    pub fn is_visible(&self, selector: &str) -> Result<bool, BrowserError> {
        let expression = format!(
            "(() => {{ const el = document.querySelector({}); return !!el && el.offsetParent !== null; }})()",
            json!(selector)
        );
        let result = self
            .tab
            .evaluate(&expression, false)
            .map_err(|e| BrowserError::Js(e.to_string()))?;
        Ok(matches!(result.value, Some(serde_json::Value::Bool(true))))
    }

    pub fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        poll_until(timeout, &format!("{} to become visible", selector), || {
            self.is_visible(selector)
        })
    }

    pub fn wait_hidden(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        poll_until(timeout, &format!("{} to disappear", selector), || {
            Ok(!self.is_visible(selector)?)
        })
    }

    pub fn page_html(&self) -> Result<String, BrowserError> {
        self.tab
            .get_content()
            .map_err(|e| BrowserError::Js(e.to_string()))
    }
}

/// Polls `check` at a fixed interval until it reports true or `timeout`
/// elapses. The bound is explicit; there are no implicit waits.
fn poll_until<F>(timeout: Duration, condition: &str, check: F) -> Result<(), BrowserError>
where
    F: Fn() -> Result<bool, BrowserError>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if check()? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(BrowserError::Timeout {
                condition: condition.to_string(),
                waited: timeout,
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}
