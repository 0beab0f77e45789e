use std::path::PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use impmap::ModuleType;

#[derive(Debug, Parser, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct CLI {
    /// Path to the manifest. Defaults to `importmap.toml` in the current directory
    #[clap(long, global = true, env = "IMPMAP_MANIFEST")]
    pub(crate) manifest: Option<PathBuf>,
    /// Show debug output (overridden by `RUST_LOG`)
    #[clap(short, long, global = true)]
    pub(crate) verbose: bool,
    #[command(subcommand)]
    pub(crate) command: ImpmapCommand,
}

#[derive(Debug, Subcommand, Clone, PartialEq)]
pub enum ImpmapCommand {
    /// Creates an empty `importmap.toml` if there is none
    Init,
    /// Adds packages or local files to the import map
    Require {
        /// Packages to add: [@scope/]name[/subpath][@version][=alias]
        #[clap(required = true)]
        packages: Vec<String>,
        /// Use a local file instead of a registry package (one package only)
        #[clap(long)]
        path: Option<String>,
        /// Mark the entry as an entrypoint
        #[clap(long)]
        entrypoint: bool,
        /// Module type of the entry
        #[clap(long = "type", value_enum, default_value_t = TypeArg::Js)]
        kind: TypeArg,
    },
    /// Removes entries from the import map
    Remove {
        #[clap(required = true)]
        names: Vec<String>,
    },
    /// Lists all entries in manifest order
    List {
        /// Print the entries as JSON
        #[clap(long)]
        json: bool,
    },
    /// Prints the root directory local paths are resolved against
    Root,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TypeArg {
    Js,
    Css,
}

impl From<TypeArg> for ModuleType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::Js => ModuleType::Js,
            TypeArg::Css => ModuleType::Css,
        }
    }
}
