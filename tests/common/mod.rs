//! Common test utilities
#![allow(dead_code)]

use assetpipe::config::parse_config;
use assetpipe::runner::{Context, Runner, TaskRegistry};
use assetpipe::tasks::{ObjectStore, PutObject};
use assetpipe::ui::{Notification, Notifier};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create a temporary directory with an assetpipe.yml file
pub fn create_test_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("assetpipe.yml");
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}

/// A scratch project with the stock source layout
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let project = Project {
            dir: TempDir::new().unwrap(),
        };
        project.write("index.html", r#"<link rel="stylesheet" href="css/styles.css"><input name="inputEmail">"#);
        project.write("scss/styles.scss", "body { color: red; }");
        project.write("scss/_variables.scss", "$red: red;");
        project.write("css/normalize.css", "html{}");
        project.write("fonts/lato.woff", "woff");
        project.write("js/vendor/a-jquery.js", "var $;");
        project.write("js/vendor/b-plugin.js", "var plugin;");
        project.write("js/scripts.js", "var app = 1;");
        project.write("images/logo.png", "png");
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }
}

/// Notifier that keeps every notification
#[derive(Default)]
pub struct RecordingNotifier {
    pub notes: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        self.notes.lock().unwrap().iter().map(|n| n.title.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) {
        self.notes.lock().unwrap().push(notification.clone());
    }
}

/// Object store that records uploads instead of performing them
#[derive(Default)]
pub struct RecordingStore {
    pub puts: Mutex<Vec<PutObject>>,
}

#[async_trait]
impl ObjectStore for RecordingStore {
    async fn put(&self, _ctx: &Context, object: &PutObject) -> Result<(), String> {
        self.puts.lock().unwrap().push(object.clone());
        Ok(())
    }
}

/// Environment with only `PATH` plus `extra`
pub fn env_with(extra: &[(&str, &str)]) -> HashMap<String, String> {
    let mut env = HashMap::new();
    env.insert("PATH".to_string(), std::env::var("PATH").unwrap_or_default());
    for (key, value) in extra {
        env.insert(key.to_string(), value.to_string());
    }
    env
}

/// Tool stages that copy instead of invoking the real binaries
pub const STUB_TOOLS: &str = r#"
tools:
  sass_dev:
    - name: sass
      run: cp ${input} ${output}
  sass_prod:
    - name: sass
      run: cp ${input} ${output}
  js_prod:
    - name: uglify
      run: cp ${input} ${output}
  images:
    - name: imagemin
      run: cp ${input} ${output_dir}/
"#;

pub struct Harness {
    pub runner: Runner,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<RecordingStore>,
}

/// Build a runner for `project` from YAML config and an explicit environment
pub fn harness(project: &Project, yaml: &str, env: HashMap<String, String>) -> Harness {
    let config = parse_config(yaml).unwrap();
    let registry = TaskRegistry::from_config(&config).unwrap();
    let store = Arc::new(RecordingStore::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let ctx = Context::new(project.root().to_path_buf(), config)
        .with_env(env)
        .with_store(store.clone());
    let runner = Runner::new(registry, ctx).with_notifier(notifier.clone());

    Harness {
        runner,
        notifier,
        store,
    }
}
