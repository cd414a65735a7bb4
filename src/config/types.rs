//! Core configuration types
//!
//! This module defines the data structures that represent an assetpipe.yml
//! configuration file. Every field is optional; the defaults describe the
//! stock layout (`scss/`, `css/`, `js/`, `images/`, `fonts/`, `index.html`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Application name (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Source globs and output locations
    pub paths: Paths,

    /// External tool invocations
    pub tools: Tools,

    /// Ordered literal replacements applied to production markup
    pub replacements: Vec<Replacement>,

    /// Extra or overriding composite tasks
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub composites: BTreeMap<String, CompositeSpec>,

    /// Watch pattern to task mapping used by the dev server
    pub watch: Vec<WatchRule>,

    /// Dev server settings
    pub server: ServerSettings,

    /// Upload settings
    pub deploy: DeploySettings,

    /// Interpreter used for tool commands (e.g., ["sh", "-c"])
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<Vec<String>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            name: None,
            paths: Paths::default(),
            tools: Tools::default(),
            replacements: default_replacements(),
            composites: BTreeMap::new(),
            watch: default_watch_rules(),
            server: ServerSettings::default(),
            deploy: DeploySettings::default(),
            interpreter: None,
        }
    }
}

/// Source globs, all relative to the project root
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Paths {
    /// Build output root
    pub build: String,
    /// Stylesheet entry point
    pub styles: String,
    /// Plain CSS files copied as-is
    pub css: String,
    /// Font files
    pub fonts: String,
    /// Vendor scripts concatenated into `js/vendor.js`
    pub vendor_scripts: String,
    /// Application script
    pub script: String,
    /// Images to optimize
    pub images: String,
    /// Markup file
    pub html: String,
    /// Handoff archive, written at the project root
    pub archive: String,
    /// Globs left out of the handoff archive
    pub archive_exclude: Vec<String>,
}

impl Default for Paths {
    fn default() -> Self {
        Paths {
            build: "build".to_string(),
            styles: "scss/styles.scss".to_string(),
            css: "css/*".to_string(),
            fonts: "fonts/**/*.{css,otf,eot,svg,ttf,woff,woff2}".to_string(),
            vendor_scripts: "js/vendor/*.js".to_string(),
            script: "js/scripts.js".to_string(),
            images: "images/*".to_string(),
            html: "index.html".to_string(),
            archive: "archive.zip".to_string(),
            archive_exclude: vec![
                ".git/**".to_string(),
                "build/**".to_string(),
                "node_modules/**".to_string(),
            ],
        }
    }
}

/// One step of an external transform
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Stage {
    /// Stage label shown in failure notifications
    pub name: String,
    /// Command template; `${input}`, `${output}`, `${output_dir}` and `${root}` are bound
    pub run: String,
}

impl Stage {
    pub fn new(name: &str, run: &str) -> Self {
        Stage {
            name: name.to_string(),
            run: run.to_string(),
        }
    }
}

/// Commands wrapping the third-party tools
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Tools {
    pub sass_dev: Vec<Stage>,
    pub sass_prod: Vec<Stage>,
    pub js_prod: Vec<Stage>,
    pub images: Vec<Stage>,
    /// Upload command run once per file; binds `${file}`, `${bucket}`, `${key}` and `${acl}`
    pub upload: String,
    /// Browser targets exported to the stages as `BROWSERSLIST`
    pub browsers: Vec<String>,
}

impl Default for Tools {
    fn default() -> Self {
        Tools {
            sass_dev: vec![
                Stage::new(
                    "sass",
                    "sass --style=expanded --embed-source-map ${input} ${output}",
                ),
                Stage::new(
                    "autoprefixer",
                    "postcss ${output} --use autoprefixer --map --replace",
                ),
            ],
            sass_prod: vec![
                Stage::new("sass", "sass --no-source-map ${input} ${output}"),
                Stage::new(
                    "autoprefixer",
                    "postcss ${output} --use autoprefixer --no-map --replace",
                ),
                Stage::new("cleanCSS", "cleancss -o ${output} ${output}"),
            ],
            js_prod: vec![Stage::new(
                "uglify",
                "uglifyjs ${input} --compress --mangle --output ${output}",
            )],
            images: vec![Stage::new(
                "imagemin",
                "imagemin ${input} --out-dir=${output_dir}",
            )],
            upload: "aws s3 cp ${file} s3://${bucket}/${key} --acl ${acl}".to_string(),
            browsers: vec!["> 1%".to_string(), "last 2 versions".to_string()],
        }
    }
}

/// A literal find/replace pair
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Replacement {
    #[serde(rename = "match")]
    pub pattern: String,
    pub replacement: String,
}

impl Replacement {
    pub fn new(pattern: &str, replacement: &str) -> Self {
        Replacement {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
        }
    }
}

/// Form field identifiers rewritten to opaque asset ids in production markup
pub fn default_replacements() -> Vec<Replacement> {
    [
        ("inputEmail", "asset_2"),
        ("inputPhone", "asset_4"),
        ("inputFName", "asset_7"),
        ("inputLName", "asset_8"),
        ("inputAddress", "asset_11"),
        ("inputAddress2", "asset_12"),
        ("inputAddress3", "asset_13"),
        ("inputCity", "asset_14"),
        ("inputStProvince", "asset_15"),
        ("inputZip", "asset_16"),
        ("inputCountry", "asset_17"),
        ("inputBirthdate", "asset_18"),
        ("inputGender", "asset_19"),
        ("inputCompanyName", "asset_20"),
        ("inputMobilePhone", "asset_21"),
        ("inputTitle", "asset_24"),
        ("inputWorkPhone", "asset_25"),
        ("inputFax", "asset_26"),
        ("inputWorkFax", "asset_27"),
        ("inputComment", "asset_42"),
    ]
    .iter()
    .map(|(pattern, replacement)| Replacement::new(pattern, replacement))
    .collect()
}

/// A composite task declared in the configuration file
///
/// Exactly one of `sequence` or `parallel` must be given.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CompositeSpec {
    /// Usage description for help text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    /// Steps run one after another
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sequence: Vec<String>,

    /// Members run concurrently
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parallel: Vec<String>,
}

/// What the live-reload client should do after a watched task succeeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadKind {
    /// Push the rebuilt assets to the page
    Inject,
    /// Force a full page reload
    Full,
    #[default]
    None,
}

/// Watch patterns mapped to the leaf task they re-run
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WatchRule {
    pub patterns: Vec<String>,
    pub task: String,
    #[serde(default)]
    pub reload: ReloadKind,
}

impl WatchRule {
    pub fn new(patterns: &[&str], task: &str, reload: ReloadKind) -> Self {
        WatchRule {
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            task: task.to_string(),
            reload,
        }
    }
}

pub fn default_watch_rules() -> Vec<WatchRule> {
    vec![
        WatchRule::new(&["scss/*.scss", "scss/**/*.scss"], "sass:dev", ReloadKind::Inject),
        WatchRule::new(&["js/vendor/*.js"], "vendorscripts", ReloadKind::Inject),
        WatchRule::new(&["js/scripts.js"], "js:dev", ReloadKind::Inject),
        WatchRule::new(&["images/*"], "images", ReloadKind::None),
        WatchRule::new(&["css/*"], "css", ReloadKind::None),
        WatchRule::new(&["fonts/*"], "fonts", ReloadKind::None),
        WatchRule::new(&["index.html"], "html:dev", ReloadKind::Full),
    ]
}

/// Dev server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Window used to coalesce bursts of file events
    pub debounce_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 3000,
            debounce_ms: 100,
        }
    }
}

/// Upload settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeploySettings {
    pub acl: String,
}

impl Default for DeploySettings {
    fn default() -> Self {
        DeploySettings {
            acl: "public-read".to_string(),
        }
    }
}
