//! # impmap Core Library
//!
//! This crate reads, validates and writes import map manifests (`importmap.toml`): the file that
//! binds the names used in `import` statements to either a local file or a package version that a
//! front-end asset pipeline resolves through a registry.
//!
//! The `impmap` CLI is a thin layer over this library; an asset pipeline can use the same types to
//! load the manifest it serves.
//!
//! ## Modules Overview
//! - [`entry`] – Entries, module types and the ordered entry collection
//! - [`specifier`] – Parsing `[@scope/]name[/subpath][@version][=alias]` package specifiers
//! - [`manifest`] – Loading and atomically saving `importmap.toml`
//! - [`legacy`] – Version recovery from old `url`-style entries
//! - [`resolver`] – Turning require requests into entries
//! - [`error`] – Error types
//! - [`util`] – Shared helpers (paths, version checks)
//! - [`logging`] – tracing subscriber setup for the CLI


pub mod entry;
pub mod error;
pub mod legacy;
pub mod logging;
pub mod manifest;
pub mod resolver;
pub mod specifier;
pub mod util;

pub use entry::*;
pub use error::{EntryError, ManifestError};
pub use legacy::*;
pub use manifest::*;
pub use resolver::*;
pub use specifier::*;
pub use util::*;
