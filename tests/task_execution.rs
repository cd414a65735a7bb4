//! Integration tests for task execution

#![cfg(unix)]

mod common;

use assetpipe::error::{PipelineError, TaskError};
use common::{env_with, harness, Project, STUB_TOOLS};
use std::fs;

#[tokio::test]
async fn test_build_dev_writes_every_output() {
    let project = Project::new();
    let h = harness(&project, STUB_TOOLS, env_with(&[]));

    h.runner.run("build:dev").await.unwrap();

    assert_eq!(project.read("build/css/styles.css"), "body { color: red; }");
    assert!(!project.exists("build/css/_variables.css"));
    assert_eq!(project.read("build/css/normalize.css"), "html{}");
    assert_eq!(project.read("build/fonts/lato.woff"), "woff");
    assert_eq!(project.read("build/js/vendor.js"), "var $;\nvar plugin;");
    assert_eq!(project.read("build/js/scripts.js"), "var app = 1;");
    assert_eq!(project.read("build/images/logo.png"), "png");
    assert_eq!(
        project.read("build/index.html"),
        project.read("index.html"),
        "dev markup is copied verbatim"
    );
    assert!(h.notifier.titles().is_empty());
}

#[tokio::test]
async fn test_dev_copies_are_byte_identical_across_runs() {
    let project = Project::new();
    let h = harness(&project, STUB_TOOLS, env_with(&[]));
    let copied = [
        "build/css/normalize.css",
        "build/fonts/lato.woff",
        "build/js/scripts.js",
        "build/index.html",
    ];

    h.runner.run("build:dev").await.unwrap();
    let first: Vec<Vec<u8>> = copied.iter().map(|p| fs::read(project.path(p)).unwrap()).collect();

    h.runner.run("build:dev").await.unwrap();
    let second: Vec<Vec<u8>> = copied.iter().map(|p| fs::read(project.path(p)).unwrap()).collect();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_sequence_halts_at_failing_step() {
    let project = Project::new();
    let yaml = r#"
tools:
  sass_dev:
    - name: sass
      run: "echo 'Invalid CSS after \"body\"' >&2; exit 65"
composites:
  broken:
    sequence: [html:dev, sass:dev, css, fonts]
"#;
    let h = harness(&project, yaml, env_with(&[]));

    let err = h.runner.run("broken").await.unwrap_err();
    match err {
        PipelineError::Task(TaskError::Transform { task, stage, message }) => {
            assert_eq!(task, "sass:dev");
            assert_eq!(stage, "sass");
            assert_eq!(message, "Invalid CSS after \"body\"");
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(project.exists("build/index.html"));
    assert!(!project.exists("build/css/normalize.css"));
    assert!(!project.exists("build/fonts/lato.woff"));
    assert_eq!(h.notifier.titles(), vec!["Error running sass:dev task [sass]"]);
}

#[tokio::test]
async fn test_parallel_failure_fails_group() {
    let project = Project::new();
    let yaml = r#"
tools:
  images:
    - name: imagemin
      run: "echo 'Corrupt image' >&2; exit 1"
composites:
  assets:
    parallel: [css, images]
  after:
    sequence: [assets, fonts]
"#;
    let h = harness(&project, yaml, env_with(&[]));

    let err = h.runner.run("after").await.unwrap_err();
    assert_eq!(err.to_string(), "Corrupt image");
    assert!(!project.exists("build/fonts/lato.woff"));
    assert_eq!(h.notifier.titles(), vec!["Error running images task [imagemin]"]);
}

#[tokio::test]
async fn test_parallel_failure_cancels_running_sibling() {
    let project = Project::new();
    let yaml = r#"
tools:
  images:
    - name: imagemin
      run: "echo 'Corrupt image' >&2; exit 1"
  js_prod:
    - name: uglify
      run: "sleep 1; touch minified.marker"
composites:
  assets:
    parallel: [js:prod, images]
"#;
    let h = harness(&project, yaml, env_with(&[]));

    let err = h.runner.run("assets").await.unwrap_err();
    assert_eq!(err.to_string(), "Corrupt image");

    // Long enough for the sibling's stage to have finished had it kept running
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    assert!(!project.exists("minified.marker"));
    assert_eq!(h.notifier.titles(), vec!["Error running images task [imagemin]"]);
}

#[tokio::test]
async fn test_html_prod_without_cdn_writes_nothing() {
    let project = Project::new();
    let h = harness(&project, STUB_TOOLS, env_with(&[]));

    let err = h.runner.run("html:prod").await.unwrap_err();
    assert_eq!(err.to_string(), "S3_CDN_URL is not declared.");
    assert!(!project.exists("build"));
}

#[tokio::test]
async fn test_html_prod_rewrites_markup() {
    let project = Project::new();
    let env = env_with(&[("S3_CDN_URL", "https://cdn.example.com/spring")]);
    let h = harness(&project, STUB_TOOLS, env);

    h.runner.run("html:prod").await.unwrap();
    assert_eq!(
        project.read("build/index.html"),
        r#"<link rel="stylesheet" href="https://cdn.example.com/spring/css/styles.css"><input name="asset_2">"#
    );
}

#[tokio::test]
async fn test_deploy_with_partial_credentials_uploads_nothing() {
    let project = Project::new();
    project.write("build/css/old.css", "previous");
    let env = env_with(&[
        ("S3_BUCKET", "assets"),
        ("AWS_ACCESS_KEY_ID", "AKIA"),
        ("S3_CDN_URL", "https://cdn.example.com"),
    ]);
    let h = harness(&project, STUB_TOOLS, env);

    let err = h.runner.run("deploy").await.unwrap_err();
    assert!(err.to_string().contains("S3_BUCKET_PATH"));
    assert!(h.store.puts.lock().unwrap().is_empty());
    // preflight runs before clean
    assert!(project.exists("build/css/old.css"));
}

#[tokio::test]
async fn test_deploy_uploads_build_except_markup() {
    let project = Project::new();
    let env = env_with(&[
        ("S3_BUCKET", "assets"),
        ("S3_BUCKET_PATH", "campaigns/spring"),
        ("AWS_ACCESS_KEY_ID", "AKIA"),
        ("AWS_SECRET_ACCESS_KEY", "secret"),
        ("S3_CDN_URL", "https://cdn.example.com/campaigns/spring"),
    ]);
    let h = harness(&project, STUB_TOOLS, env);

    h.runner.run("deploy").await.unwrap();

    let puts = h.store.puts.lock().unwrap();
    let keys: Vec<&str> = puts.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "campaigns/spring/css/normalize.css",
            "campaigns/spring/css/styles.css",
            "campaigns/spring/fonts/lato.woff",
            "campaigns/spring/images/logo.png",
            "campaigns/spring/js/scripts.js",
            "campaigns/spring/js/vendor.js",
        ]
    );
    assert!(puts.iter().all(|p| p.bucket == "assets"));
}

#[tokio::test]
async fn test_zip_packages_project() {
    let project = Project::new();
    project.write(".git/HEAD", "ref: refs/heads/main");
    project.write("node_modules/sass/package.json", "{}");
    project.write("build/index.html", "built");
    let h = harness(&project, "", env_with(&[]));

    h.runner.run("zip").await.unwrap();

    let file = fs::File::open(project.path("archive.zip")).unwrap();
    let archive = zip::ZipArchive::new(file).unwrap();
    let names: Vec<&str> = archive.file_names().collect();

    assert!(!names.iter().any(|n| n.starts_with(".git/")));
    assert!(!names.iter().any(|n| n.starts_with("build/")));
    assert!(!names.iter().any(|n| n.starts_with("node_modules/")));
    for dir in ["css/", "fonts/", "images/", "js/", "scss/"] {
        assert!(names.iter().any(|n| n.starts_with(dir)), "nothing from {}", dir);
    }
    assert!(names.contains(&"index.html"));
}
