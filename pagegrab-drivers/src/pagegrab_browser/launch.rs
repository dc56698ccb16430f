use pagegrab_common::DEFAULT_USER_AGENT;
use serde_json::json;
use std::time::Duration;
use webdriver::capabilities::Capabilities;

/// Options for one browser session.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// WebDriver endpoint, e.g. chromedriver on `http://localhost:9515`.
    pub webdriver_url: String,
    pub headless: bool,
    pub window_size: (u32, u32),
    pub user_agent: String,
    pub page_load_timeout: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            window_size: (1920, 1080),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            page_load_timeout: Duration::from_secs(30),
        }
    }
}

/// Construct Chrome command-line arguments for the given options.
pub fn build_chrome_arguments(options: &BrowserOptions) -> Vec<String> {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
        "--disable-extensions".to_string(),
        format!("--user-agent={}", options.user_agent),
        format!(
            "--window-size={},{}",
            options.window_size.0, options.window_size.1
        ),
    ];
    if options.headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }
    args
}

/// `goog:chromeOptions` capabilities for a new session.
pub fn build_capabilities(options: &BrowserOptions) -> Capabilities {
    let mut caps = Capabilities::new();
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({ "args": build_chrome_arguments(options) }),
    );
    caps
}

/// Run right after navigation to hide the most obvious automation flag.
pub const CORE_EVASIONS: &str = r#"
    Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
    if (!window.chrome) window.chrome = { runtime: {} };
"#;

/// Evaluates to the full document height in CSS pixels.
pub const DOCUMENT_HEIGHT_SCRIPT: &str = r#"
    return Math.max(
        document.body ? document.body.scrollHeight : 0,
        document.documentElement ? document.documentElement.scrollHeight : 0
    );
"#;
