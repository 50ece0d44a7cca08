use std::fs;
use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use mapdump_core::fetch::DEFAULT_USER_AGENT;
use mapdump_core::{run, Config, HttpFetcher, MemoryFetcher, OutputDirError, RunError};
use tempfile::tempdir;

fn config(out: &std::path::Path) -> Config {
    let mut config = Config::new(out);
    config.concurrency = 2;
    config.retry_attempts = 1;
    config.timeout = Duration::from_secs(5);
    config
}

#[tokio::test]
async fn partial_failure_still_succeeds() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/index.html");
        then.status(200).body(
            r#"<html><script src="/static/app.js"></script><script src="static/broken.js"></script></html>"#,
        );
    });
    server.mock(|when, then| {
        when.method(GET).path("/static/app.js");
        then.status(200).body("console.log(1);\n//# sourceMappingURL=app.js.map\n");
    });
    server.mock(|when, then| {
        when.method(GET).path("/static/app.js.map");
        then.status(200).body(
            r#"{"version":3,"sources":["webpack:///./src/index.js"],"sourcesContent":["export default 1;\n"],"mappings":"AAAA"}"#,
        );
    });
    server.mock(|when, then| {
        when.method(GET).path("/static/broken.js");
        then.status(200).body("x();\n//# sourceMappingURL=/maps/broken.js.map");
    });
    let broken_map = server.mock(|when, then| {
        when.method(GET).path("/maps/broken.js.map");
        then.status(500);
    });

    let dir = tempdir().unwrap();
    let out = dir.path().join("out");
    let fetcher = HttpFetcher::new(Duration::from_secs(5), DEFAULT_USER_AGENT, 1).unwrap();
    let report = run(&server.url("/index.html"), &config(&out), Arc::new(fetcher))
        .await
        .expect("partial success is not an error");

    broken_map.assert();
    assert_eq!(report.scripts.assets, 2);
    assert_eq!(report.scripts.maps, 2);
    assert_eq!(report.scripts.maps_decoded, 1);
    assert_eq!(report.files.written, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].contains("broken.js.map"));
    assert_eq!(fs::read_to_string(out.join("src/index.js")).unwrap(), "export default 1;\n");
}

#[tokio::test]
async fn cross_origin_assets_resolve_against_their_own_host() {
    let page = "https://site.test/";
    let fetcher = MemoryFetcher::new()
        .with_body(page, r#"<script src="https://cdn.test/js/main.js"></script>"#)
        .with_body("https://cdn.test/js/main.js", "//# sourceMappingURL=/maps/main.js.map")
        .with_body(
            "https://cdn.test/maps/main.js.map",
            r#"{"sources":["a.js","b.js","../../etc/passwd"],"sourcesContent":["content-a",null,"root:x"]}"#,
        );

    let dir = tempdir().unwrap();
    let report = run(page, &config(dir.path()), Arc::new(fetcher)).await.unwrap();

    assert!(report.failures.is_empty());
    assert_eq!(report.files.written, 1);
    assert_eq!(report.files.skipped, 1);
    assert_eq!(report.files.rejected, 1);
    assert_eq!(fs::read_to_string(dir.path().join("a.js")).unwrap(), "content-a");
    assert!(!dir.path().join("b.js").exists());
}

#[tokio::test]
async fn assets_without_maps_are_not_failures() {
    let page = "https://site.test/";
    let fetcher = MemoryFetcher::new()
        .with_body(page, r#"<script src="plain.js"></script>"#)
        .with_body("https://site.test/plain.js", "console.log('no map');");

    let dir = tempdir().unwrap();
    let report = run(page, &config(dir.path()), Arc::new(fetcher)).await.unwrap();
    assert_eq!(report.scripts.assets, 1);
    assert_eq!(report.scripts.maps, 0);
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn stylesheets_followed_when_enabled() {
    let page = "https://site.test/";
    let fetcher = MemoryFetcher::new()
        .with_body(page, r#"<link href="/css/site.css" rel="stylesheet"><script src="/app.js"></script>"#)
        .with_body("https://site.test/app.js", "")
        .with_body("https://site.test/css/site.css", "a{}\n/*# sourceMappingURL=site.css.map */")
        .with_body(
            "https://site.test/css/site.css.map",
            r#"{"sources":["webpack:///./styles/site.scss"],"sourcesContent":["a { }"]}"#,
        );

    let dir = tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.download_styles = true;
    let report = run(page, &cfg, Arc::new(fetcher)).await.unwrap();

    let styles = report.styles.expect("style counts present");
    assert_eq!(styles.assets, 1);
    assert_eq!(styles.maps_decoded, 1);
    assert_eq!(fs::read_to_string(dir.path().join("styles/site.scss")).unwrap(), "a { }");
}

#[tokio::test]
async fn page_without_assets_is_fatal() {
    let page = "https://site.test/";
    let fetcher = MemoryFetcher::new().with_body(page, "<html>nothing here</html>");
    let dir = tempdir().unwrap();
    let err = run(page, &config(dir.path()), Arc::new(fetcher)).await.unwrap_err();
    assert!(matches!(err, RunError::DiscoveryEmpty(_)));
}

#[tokio::test]
async fn invalid_inputs_fail_before_fetching() {
    let dir = tempdir().unwrap();
    let err = run("not a url", &config(dir.path()), Arc::new(MemoryFetcher::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::InvalidUrl(_)));

    fs::write(dir.path().join("existing.txt"), "x").unwrap();
    let err = run("https://site.test/", &config(dir.path()), Arc::new(MemoryFetcher::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::OutputDir(_)));
}

#[tokio::test]
async fn missing_stylesheets_only_warn() {
    let page = "https://site.test/";
    let fetcher = MemoryFetcher::new()
        .with_body(page, r#"<script src="/app.js"></script>"#)
        .with_body("https://site.test/app.js", "//# sourceMappingURL=app.js.map")
        .with_body("https://site.test/app.js.map", r#"{"sources":["a.js"],"sourcesContent":["A"]}"#);

    let dir = tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.download_styles = true;
    let report = run(page, &cfg, Arc::new(fetcher)).await.unwrap();

    assert_eq!(report.styles.unwrap().assets, 0);
    assert_eq!(report.scripts.maps_decoded, 1);
    assert_eq!(report.files.written, 1);
}

#[tokio::test]
async fn unwritable_output_root_is_fatal() {
    let page = "https://site.test/";
    let fetcher = MemoryFetcher::new().with_body(page, r#"<script src="/app.js"></script>"#);
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "x").unwrap();

    let err = run(page, &config(&blocker.join("out")), Arc::new(fetcher)).await.unwrap_err();
    assert!(matches!(err, RunError::OutputDir(OutputDirError::Unwritable { .. })));
}

#[tokio::test]
async fn unreachable_page_is_fatal() {
    let page = "https://site.test/";
    let fetcher = MemoryFetcher::new().with_status(page, 503);
    let dir = tempdir().unwrap();
    let err = run(page, &config(dir.path()), Arc::new(fetcher)).await.unwrap_err();
    assert!(matches!(err, RunError::PageFetch { .. }));
}

#[tokio::test]
async fn opaque_map_path_is_recorded_and_skipped() {
    let page = "https://site.test/";
    let fetcher = MemoryFetcher::new()
        .with_body(page, r#"<script src="/app.js"></script>"#)
        .with_body("https://site.test/app.js", "//# sourceMappingURL=webpack://app/app.js.map");

    let dir = tempdir().unwrap();
    let report = run(page, &config(dir.path()), Arc::new(fetcher)).await.unwrap();
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].contains("cannot resolve source map path"));
    assert_eq!(report.scripts.maps, 1);
    assert_eq!(report.files.written, 0);
}

#[tokio::test]
async fn undecodable_map_is_recorded_and_skipped() {
    let page = "https://site.test/";
    let fetcher = MemoryFetcher::new()
        .with_body(page, r#"<script src="/good.js"></script><script src="/bad.js"></script>"#)
        .with_body("https://site.test/good.js", "//# sourceMappingURL=good.js.map")
        .with_body("https://site.test/good.js.map", r#"{"sources":["good.js"],"sourcesContent":["ok"]}"#)
        .with_body("https://site.test/bad.js", "//# sourceMappingURL=bad.js.map")
        .with_body("https://site.test/bad.js.map", "<html>404</html>");

    let dir = tempdir().unwrap();
    let report = run(page, &config(dir.path()), Arc::new(fetcher)).await.unwrap();
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].contains("could not decode source map https://site.test/bad.js.map"));
    assert_eq!(report.files.written, 1);
    assert_eq!(fs::read_to_string(dir.path().join("good.js")).unwrap(), "ok");
}
