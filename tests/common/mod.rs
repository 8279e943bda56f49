//! Shared test utilities for integration tests.
//!
//! Import from integration test files as:
//! ```ignore
//! mod common;
//! ```

use std::path::PathBuf;
use tempfile::TempDir;

/// Initialize tracing for tests, respecting RUST_LOG env var.
///
/// Safe to call multiple times, subsequent calls are no-ops.
#[allow(dead_code)]
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Create a site root with `index.html`, a stylesheet, a script, an image and a dotfile.
///
/// Returns the path to the root directory (e.g. `<temp_dir>/site/`).
#[allow(dead_code)]
pub fn create_test_site(temp_dir: &TempDir) -> PathBuf {
    let root = temp_dir.path().join("site");
    std::fs::create_dir_all(root.join("img")).unwrap();

    let index = r#"<!DOCTYPE html>
<html lang="en">
<head><title>Military Essentials - Discord Bot Hosting</title></head>
<body>
<section id="home" class="section active">Home</section>
<section id="tos" class="section">Terms</section>
<section id="privacy" class="section">Privacy</section>
</body>
</html>
"#;
    std::fs::write(root.join("index.html"), index).unwrap();
    std::fs::write(root.join("styles.css"), "body { margin: 0; }\n").unwrap();
    std::fs::write(root.join("app.js"), "console.log('ready');\n").unwrap();
    std::fs::write(root.join("img").join("logo.png"), [0x89, b'P', b'N', b'G']).unwrap();
    std::fs::write(root.join(".htpasswd"), "admin:secret\n").unwrap();

    root
}
