//! Main CLI application

use crate::config::{load_config, load_environment, validate_config, PipelineConfig};
use crate::error::{ConfigError, PipelineError};
use crate::logging::init_logging;
use crate::runner::{Context, Runner, TaskRegistry, Verbosity};
use crate::tasks::LeafTask;
use crate::ui::render_task_list;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

/// Task run when no subcommand is given
pub const DEFAULT_TASK: &str = "default";

/// CLI application
pub struct App {
    /// The clap command
    command: Command,
    /// Parsed configuration
    config: PipelineConfig,
    /// Project root (directory of the config file, or the working directory)
    root: PathBuf,
    /// Leaf and composite tasks
    registry: TaskRegistry,
}

impl App {
    /// Load and validate the configuration, searching upwards from the
    /// working directory unless a file is given
    pub fn new(config_file: Option<PathBuf>) -> Result<Self, PipelineError> {
        let (config, root) = load_config(config_file.as_deref())?;
        validate_config(&config)?;
        let registry = TaskRegistry::from_config(&config)?;

        let command = build_command(&config, &registry);

        Ok(App {
            command,
            config,
            root,
            registry,
        })
    }

    /// Run the application with the process arguments
    pub fn run(self) -> Result<(), PipelineError> {
        self.run_from(std::env::args_os())
    }

    /// Run the application with explicit arguments
    pub fn run_from<I, T>(self, args: I) -> Result<(), PipelineError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command.clone().get_matches_from(args);

        let verbosity = get_verbosity(&matches);
        init_logging(verbosity);

        match matches.subcommand() {
            Some(("list", _)) => {
                print!("{}", render_task_list(&self.registry));
                Ok(())
            }
            Some(("completions", sub_matches)) => {
                let shell = sub_matches
                    .get_one::<Shell>("shell")
                    .copied()
                    .ok_or_else(|| ConfigError::Invalid("missing shell".to_string()))?;
                let mut command = self.command;
                let bin_name = command.get_name().to_string();
                clap_complete::generate(shell, &mut command, bin_name, &mut io::stdout());
                Ok(())
            }
            Some((task_name, _)) => {
                let task_name = task_name.to_string();
                self.execute(&task_name, verbosity)
            }
            None => self.execute(DEFAULT_TASK, verbosity),
        }
    }

    /// Run a task to completion on a fresh multi-threaded runtime
    fn execute(self, task_name: &str, verbosity: Verbosity) -> Result<(), PipelineError> {
        let env = load_environment(&self.root)?;
        let ctx = Context::new(self.root, self.config)
            .with_env(env)
            .with_verbosity(verbosity);
        let runner = Runner::new(self.registry, ctx);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(runner.run(task_name))
    }
}

/// Build the clap command from configuration
fn build_command(config: &PipelineConfig, registry: &TaskRegistry) -> Command {
    let mut cmd = Command::new(config.name.clone().unwrap_or_else(|| "assetpipe".to_string()))
        .version(env!("CARGO_PKG_VERSION"))
        .about("Builds, serves and deploys frontend assets")
        .after_help("Runs the `default` task when no task is given.")
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Path to assetpipe.yml config file")
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print errors")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        );

    for composite in registry.composites() {
        let about = composite
            .usage
            .clone()
            .unwrap_or_else(|| composite.members().join(", "));
        cmd = cmd.subcommand(Command::new(composite.name.clone()).about(about));
    }

    for leaf in LeafTask::ALL {
        cmd = cmd.subcommand(Command::new(leaf.name()).about(leaf.usage()));
    }

    cmd.subcommand(Command::new("list").about("List every task"))
        .subcommand(
            Command::new("completions")
                .about("Print a shell completion script")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(value_parser!(Shell)),
                ),
        )
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Run the CLI application with the process arguments
pub fn run() -> Result<(), PipelineError> {
    // The config decides the subcommands, so --file is read before clap parses
    let args: Vec<String> = std::env::args().collect();
    let app = App::new(extract_file_arg(&args))?;
    app.run()
}

/// Extract --file argument before clap parsing
fn extract_file_arg(args: &[String]) -> Option<PathBuf> {
    for (i, arg) in args.iter().enumerate() {
        if (arg == "--file" || arg == "-f") && i + 1 < args.len() {
            return Some(PathBuf::from(&args[i + 1]));
        }
        if let Some(path) = arg.strip_prefix("--file=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}
