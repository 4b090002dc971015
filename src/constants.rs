//! Static configuration constants for the splitter.

/// Default output folder pattern; `{package}` is replaced by the package name
pub const DEFAULT_OUTPUT_PATTERN: &str = "{package}_split";

/// Private vendored dependency subtree, relative to the output root
pub const THIRD_PARTY_DIR: &str = "third_party";

/// Go source file extension
pub const GO_EXT: &str = "go";

/// Module identity descriptor created by `go mod init`
pub const GO_MOD_FILE: &str = "go.mod";

/// Manifest written by `go mod vendor`
pub const VENDOR_MANIFEST: &str = "modules.txt";

/// Prefix of the scoped vendor workspace created inside the work directory
pub const VENDOR_WORKSPACE_PREFIX: &str = ".go-splitter-vendor-";

/// Environment variable naming the debug log file
pub const DEBUG_LOG_ENV: &str = "GO_SPLITTER_DEBUG_LOG";

/// Configuration file looked up in the work directory
pub const CONFIG_FILE: &str = "go-splitter.toml";

/// Default Go toolchain binary
pub const DEFAULT_GO_BINARY: &str = "go";

/// Default goimports binary
pub const DEFAULT_GOIMPORTS_BINARY: &str = "goimports";

/// Bucket file suffixes (`<stem>_types.go` etc.)
pub const TYPES_SUFFIX: &str = "_types";
pub const FUNCS_SUFFIX: &str = "_funcs";
pub const METHODS_SUFFIX: &str = "_methods";
