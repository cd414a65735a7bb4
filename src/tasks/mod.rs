//! Leaf tasks
//!
//! Each leaf wraps one category of transform. Tool-backed transforms run
//! the configured command stages; file manipulation is done in-process.

pub mod clean;
pub mod copy;
pub mod html;
pub mod images;
pub mod package;
pub mod scripts;
pub mod styles;
pub mod upload;

pub use html::{apply_replacements, cdnify};
pub use package::{archive_entries, write_archive};
pub use upload::{object_key, CommandStore, ObjectStore, PutObject};

use crate::error::{TaskError, TaskResult};
use crate::runner::gate::{self, Precondition};
use crate::runner::Runner;
use std::path::PathBuf;

/// Files a leaf wrote (absolute paths)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOutput {
    pub files: Vec<PathBuf>,
}

impl TaskOutput {
    pub fn new(files: Vec<PathBuf>) -> Self {
        TaskOutput { files }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// The built-in units of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LeafTask {
    Clean,
    SassDev,
    SassProd,
    Css,
    Fonts,
    VendorScripts,
    JsDev,
    JsProd,
    Images,
    HtmlDev,
    HtmlProd,
    Zip,
    S3,
    DevServer,
}

const HTML_PROD_GATE: &[Precondition] = &[Precondition::non_empty(gate::CDN_URL)];

const UPLOAD_GATE: &[Precondition] = &[
    Precondition::non_empty(gate::ACCESS_KEY_ID),
    Precondition::non_empty(gate::SECRET_ACCESS_KEY),
    Precondition::non_empty(gate::BUCKET),
    Precondition::declared(gate::BUCKET_PATH),
];

impl LeafTask {
    pub const ALL: [LeafTask; 14] = [
        LeafTask::Clean,
        LeafTask::SassDev,
        LeafTask::SassProd,
        LeafTask::Css,
        LeafTask::Fonts,
        LeafTask::VendorScripts,
        LeafTask::JsDev,
        LeafTask::JsProd,
        LeafTask::Images,
        LeafTask::HtmlDev,
        LeafTask::HtmlProd,
        LeafTask::Zip,
        LeafTask::S3,
        LeafTask::DevServer,
    ];

    /// Name used on the command line and in the config
    pub fn name(&self) -> &'static str {
        match self {
            LeafTask::Clean => "clean",
            LeafTask::SassDev => "sass:dev",
            LeafTask::SassProd => "sass:prod",
            LeafTask::Css => "css",
            LeafTask::Fonts => "fonts",
            LeafTask::VendorScripts => "vendorscripts",
            LeafTask::JsDev => "js:dev",
            LeafTask::JsProd => "js:prod",
            LeafTask::Images => "images",
            LeafTask::HtmlDev => "html:dev",
            LeafTask::HtmlProd => "html:prod",
            LeafTask::Zip => "zip",
            LeafTask::S3 => "s3",
            LeafTask::DevServer => "dev-server",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        LeafTask::ALL.iter().copied().find(|leaf| leaf.name() == name)
    }

    pub fn usage(&self) -> &'static str {
        match self {
            LeafTask::Clean => "Remove everything in the build directory",
            LeafTask::SassDev => "Compile styles with source maps",
            LeafTask::SassProd => "Compile, autoprefix and minify styles",
            LeafTask::Css => "Copy plain CSS files",
            LeafTask::Fonts => "Copy font files",
            LeafTask::VendorScripts => "Concatenate vendor scripts",
            LeafTask::JsDev => "Copy the application script",
            LeafTask::JsProd => "Minify the application script",
            LeafTask::Images => "Optimize images",
            LeafTask::HtmlDev => "Copy the markup",
            LeafTask::HtmlProd => "Obfuscate field names and point assets at the CDN",
            LeafTask::Zip => "Package the project for handoff",
            LeafTask::S3 => "Upload the build to the object store",
            LeafTask::DevServer => "Serve the build with live reload and watch sources",
        }
    }

    /// Environment values this task cannot run without
    pub fn preconditions(&self) -> &'static [Precondition] {
        match self {
            LeafTask::HtmlProd => HTML_PROD_GATE,
            LeafTask::S3 => UPLOAD_GATE,
            _ => &[],
        }
    }

    /// Execute the transform. Preconditions are checked by the runner.
    pub async fn run(self, runner: &Runner) -> TaskResult<TaskOutput> {
        let ctx = runner.context();
        match self {
            LeafTask::Clean => clean::clean(ctx).await,
            LeafTask::SassDev => {
                styles::compile(self.name(), &ctx.config.tools.sass_dev, ctx).await
            }
            LeafTask::SassProd => {
                styles::compile(self.name(), &ctx.config.tools.sass_prod, ctx).await
            }
            LeafTask::Css => copy::copy_files(self.name(), &ctx.config.paths.css, "css", ctx).await,
            LeafTask::Fonts => {
                copy::copy_files(self.name(), &ctx.config.paths.fonts, "fonts", ctx).await
            }
            LeafTask::VendorScripts => scripts::concat_vendor(self.name(), ctx).await,
            LeafTask::JsDev => {
                copy::copy_files(self.name(), &ctx.config.paths.script, "js", ctx).await
            }
            LeafTask::JsProd => scripts::minify(self.name(), ctx).await,
            LeafTask::Images => images::optimize(self.name(), ctx).await,
            LeafTask::HtmlDev => copy::copy_files(self.name(), &ctx.config.paths.html, "", ctx).await,
            LeafTask::HtmlProd => html::build_production(self.name(), ctx).await,
            LeafTask::Zip => package::package(self.name(), ctx).await,
            LeafTask::S3 => upload::upload_build(self.name(), ctx).await,
            LeafTask::DevServer => crate::server::serve_until_shutdown(runner)
                .await
                .map(|_| TaskOutput::default())
                .map_err(|e| TaskError::transform(self.name(), "server", format!("{:#}", e))),
        }
    }
}

impl std::fmt::Display for LeafTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for leaf in LeafTask::ALL {
            assert_eq!(LeafTask::from_name(leaf.name()), Some(leaf));
        }
        assert_eq!(LeafTask::from_name("build:dev"), None);
    }

    #[test]
    fn test_gated_tasks() {
        assert_eq!(LeafTask::HtmlProd.preconditions().len(), 1);
        assert_eq!(LeafTask::S3.preconditions().len(), 4);
        assert!(LeafTask::HtmlDev.preconditions().is_empty());
    }
}
