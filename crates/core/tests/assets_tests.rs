use mapdump_core::{extract_assets, AssetClasses, AssetKind};
use mapdump_core::assets::of_kind;
use url::Url;

const PAGE: &str = r#"<!doctype html>
<html>
<head>
  <link rel="stylesheet" href="/static/css/main.css">
  <link rel="stylesheet" href='theme.css'>
  <script src="/static/js/main.js"></script>
  <script src="https://cdn.example.com/lib/vendor.js"></script>
</head>
<body>
  <script src="/static/js/main.js"></script>
  <script>window.chunk = 'chunks/lazy_1.js';</script>
</body>
</html>
"#;

fn base() -> Url {
    Url::parse("https://site.test/app/index.html").unwrap()
}

#[test]
fn scripts_only_by_default() {
    let assets = extract_assets(PAGE, &base(), AssetClasses::scripts_only());
    let urls: Vec<&str> = assets.iter().map(|a| a.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://site.test/static/js/main.js",
            "https://cdn.example.com/lib/vendor.js",
            "https://site.test/app/chunks/lazy_1.js",
        ]
    );
    assert!(assets.iter().all(|a| a.kind == AssetKind::Script));
}

#[test]
fn duplicate_literals_yield_one_asset() {
    let page = r#"<script src="main.js"></script><script src="main.js"></script>"#;
    let assets = extract_assets(page, &base(), AssetClasses::scripts_only());
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].url.as_str(), "https://site.test/app/main.js");
}

#[test]
fn styles_when_requested() {
    let assets = extract_assets(PAGE, &base(), AssetClasses::all());
    let styles: Vec<&str> = of_kind(&assets, AssetKind::Stylesheet)
        .map(|a| a.url.as_str())
        .collect();
    assert_eq!(
        styles,
        vec!["https://site.test/static/css/main.css", "https://site.test/app/theme.css"]
    );
    assert_eq!(of_kind(&assets, AssetKind::Script).count(), 3);
}

#[test]
fn literals_with_unsafe_characters_are_ignored() {
    let page = r#"var a = "not a path.js"; var b = "x<y>.js";"#;
    assert!(extract_assets(page, &base(), AssetClasses::scripts_only()).is_empty());
}

#[test]
fn empty_page_is_not_an_error() {
    assert!(extract_assets("<html></html>", &base(), AssetClasses::all()).is_empty());
}

#[test]
fn scheme_like_literals_stay_on_the_page_origin() {
    let page = r#"<script src="blob:app.js"></script>"#;
    let assets = extract_assets(page, &base(), AssetClasses::scripts_only());
    assert_eq!(assets.len(), 1);
    assert_eq!(assets[0].url.as_str(), "https://site.test/app/blob:app.js");
}
