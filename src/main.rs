//! go-splitter - Split a Go file into a self-contained module.
//!
//! Buckets declarations into types/functions/methods files, vendors the
//! external dependencies into `third_party/` and shades their import paths.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};

use go_splitter::debug_log;
use go_splitter::error::SplitError;
use go_splitter::splitter::{
    classifier_for, pruner_for, GoCommand, PrunerKind, ShadeFailurePolicy, SplitConfig, Splitter,
};

#[derive(Debug, Parser)]
#[clap(name = "go-splitter", version)]
struct App {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Split a Go file into a standalone module with vendored dependencies.
    Split(SplitArgs),
    /// Shade the imports of an existing output tree again.
    Shade(ShadeArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PrunerArg {
    Usage,
    Goimports,
}

#[derive(Debug, Args)]
struct CommonArgs {
    /// Module directory the go toolchain runs in
    #[clap(long, short = 'C', default_value = ".")]
    work_dir: PathBuf,

    /// Configuration file (defaults to go-splitter.toml in the work directory)
    #[clap(long)]
    config: Option<PathBuf>,

    #[clap(long, short = 'v')]
    verbose: bool,

    #[clap(long)]
    no_progress: bool,

    /// Shade files one at a time
    #[clap(long)]
    no_parallel: bool,

    /// Stop shading at the first file that fails
    #[clap(long)]
    fail_fast: bool,

    /// Import path root treated as external (repeatable)
    #[clap(long = "external-root")]
    external_roots: Vec<String>,
}

#[derive(Debug, Args)]
struct SplitArgs {
    /// Go source file to split
    input: PathBuf,

    /// Output root (defaults to <work-dir>/<package>_split)
    #[clap(long, short = 'o')]
    output: Option<PathBuf>,

    #[clap(flatten)]
    common: CommonArgs,

    #[clap(long, value_enum)]
    pruner: Option<PrunerArg>,

    /// go binary
    #[clap(long = "go")]
    go_binary: Option<String>,

    #[clap(long)]
    goimports: Option<String>,

    /// Skip the final `go mod tidy`
    #[clap(long)]
    no_tidy: bool,

    /// Write the run report as JSON
    #[clap(long)]
    report_json: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ShadeArgs {
    /// Output tree to shade
    root: PathBuf,

    /// Private import namespace, e.g. mylib_split/third_party
    #[clap(long)]
    prefix: String,

    #[clap(flatten)]
    common: CommonArgs,
}

impl CommonArgs {
    /// File configuration with command-line flags applied on top
    fn load_config(&self) -> Result<SplitConfig, SplitError> {
        let mut config = match &self.config {
            Some(path) => SplitConfig::load(path)?,
            None => SplitConfig::discover(&self.work_dir)?.unwrap_or_default(),
        };
        config.work_dir = self.work_dir.clone();
        config.verbose |= self.verbose;
        if self.no_progress {
            config.progress = false;
        }
        if self.no_parallel {
            config.parallel = false;
        }
        if self.fail_fast {
            config.shade_policy = ShadeFailurePolicy::Abort;
        }
        config.external_roots.extend(self.external_roots.iter().cloned());
        Ok(config)
    }
}

fn run_split(args: &SplitArgs) -> Result<(), SplitError> {
    let mut config = args.common.load_config()?;
    if let Some(output) = &args.output {
        config.output_dir = Some(output.clone());
    }
    if let Some(pruner) = args.pruner {
        config.pruner = match pruner {
            PrunerArg::Usage => PrunerKind::Usage,
            PrunerArg::Goimports => PrunerKind::Goimports,
        };
    }
    if let Some(go) = &args.go_binary {
        config.go_binary = go.clone();
    }
    if let Some(goimports) = &args.goimports {
        config.goimports_binary = goimports.clone();
    }
    if args.no_tidy {
        config.tidy = false;
    }

    let toolchain = GoCommand::new(config.go_binary.clone(), config.verbose);
    let pruner = pruner_for(&config, classifier_for(&config));
    let splitter = Splitter::new(config, &toolchain, pruner.as_ref());
    let report = splitter.run(&args.input)?;

    for warning in &report.warnings {
        eprintln!("warning: {}", warning);
    }
    println!(
        "Split {} into {} ({} files, {} imports shaded)",
        args.input.display(),
        report.layout.root.display(),
        report.buckets.len(),
        report.shading.imports_rewritten
    );

    if let Some(path) = &args.report_json {
        let json = serde_json::to_string_pretty(&report).map_err(|e| SplitError::Serialization {
            file: path.display().to_string(),
            message: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| SplitError::io(path, e))?;
    }
    Ok(())
}

fn run_shade(args: &ShadeArgs) -> Result<(), SplitError> {
    let config = args.common.load_config()?;
    let toolchain = GoCommand::new(config.go_binary.clone(), config.verbose);
    let pruner = pruner_for(&config, classifier_for(&config));
    let splitter = Splitter::new(config, &toolchain, pruner.as_ref());
    let report = splitter.shade_only(&args.root, &args.prefix)?;
    println!(
        "Shaded {} imports in {} of {} files",
        report.imports_rewritten, report.files_rewritten, report.files_visited
    );
    Ok(())
}

fn main() -> ExitCode {
    go_splitter::debug_log::init();
    let app = App::parse();
    debug_log!("{:?}", app);

    let result = match &app.command {
        Command::Split(args) => run_split(args),
        Command::Shade(args) => run_shade(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if e.leaves_partial_output() {
                eprintln!("note: the output directory may be partially written; inspect or remove it before re-running");
            }
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
