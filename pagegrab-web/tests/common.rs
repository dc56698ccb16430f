use std::sync::OnceLock;

use pagegrab_common::observability::LogConfig;

static INIT_PATH: OnceLock<std::path::PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "pagegrab-tests",
            log_dir: Some(std::env::temp_dir().join("pagegrab-test-logs")),
            emit_stderr: true,
            default_filter: "pagegrab_web=debug,pagegrab_http=debug".to_string(),
            ..LogConfig::default()
        };

        pagegrab_common::observability::init_logging(config).unwrap_or_default()
    });
}
