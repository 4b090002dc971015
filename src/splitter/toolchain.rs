//! Go toolchain invocations: `go mod init`, `go mod vendor`, `go mod tidy`.

use std::path::Path;
use std::process::Command;

use crate::constants::GO_MOD_FILE;
use crate::error::SplitError;

/// The dependency-manager commands the pipeline needs.
pub trait GoToolchain {
    /// Create `go.mod` for module `name` in `dir`
    fn mod_init(&self, dir: &Path, name: &str) -> Result<(), SplitError>;

    /// Vendor the dependencies of the module in `work_dir` into `out_dir`
    fn mod_vendor(&self, work_dir: &Path, out_dir: &Path) -> Result<(), SplitError>;

    fn mod_tidy(&self, dir: &Path) -> Result<(), SplitError>;
}

/// Runs the real `go` binary
#[derive(Debug, Clone)]
pub struct GoCommand {
    program: String,
    verbose: bool,
}

impl GoCommand {
    pub fn new(program: impl Into<String>, verbose: bool) -> Self {
        Self {
            program: program.into(),
            verbose,
        }
    }

    fn run(&self, dir: &Path, args: &[&str]) -> Result<(), SplitError> {
        let command = format!("{} {}", self.program, args.join(" "));
        if self.verbose {
            println!("   $ {} (in {})", command, dir.display());
        }
        crate::debug_log!("running `{}` in {}", command, dir.display());

        let output = Command::new(&self.program)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| SplitError::Toolchain {
                command: command.clone(),
                message: format!("failed to start: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            };
            return Err(SplitError::Toolchain { command, message });
        }
        Ok(())
    }
}

impl GoToolchain for GoCommand {
    fn mod_init(&self, dir: &Path, name: &str) -> Result<(), SplitError> {
        if dir.join(GO_MOD_FILE).is_file() {
            crate::debug_log!("{} already has {}, skipping init", dir.display(), GO_MOD_FILE);
            return Ok(());
        }
        self.run(dir, &["mod", "init", name])
    }

    fn mod_vendor(&self, work_dir: &Path, out_dir: &Path) -> Result<(), SplitError> {
        let out = out_dir.to_string_lossy();
        self.run(work_dir, &["mod", "vendor", "-o", &out])
    }

    fn mod_tidy(&self, dir: &Path) -> Result<(), SplitError> {
        self.run(dir, &["mod", "tidy"])
    }
}
