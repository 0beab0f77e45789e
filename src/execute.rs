use std::path::Path;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde::Serialize;
use impmap::manifest::ImportMapManifest;
use impmap::resolver::{PackageResolver, PinnedResolver, RequireOptions};
use impmap::specifier::{PackageRequest, SPECIFIER_FORMATS};
use impmap::util::get_manifest_path;
use impmap::{ImportMapEntries, ModuleType};
use crate::cli::{ImpmapCommand, TypeArg, CLI};

pub fn execute(cli: CLI) -> Result<()> {
    let manifest_path = match cli.manifest {
        Some(path) => path,
        None => get_manifest_path()?,
    };
    let mut manifest = ImportMapManifest::new(manifest_path);
    match cli.command {
        ImpmapCommand::Init => {
            execute_init(&mut manifest)
        }
        ImpmapCommand::Require { packages, path, entrypoint, kind } => {
            execute_require(&mut manifest, &packages, path, entrypoint, kind)
        }
        ImpmapCommand::Remove { names } => {
            execute_remove(&mut manifest, &names)
        }
        ImpmapCommand::List { json } => {
            execute_list(&mut manifest, json)
        }
        ImpmapCommand::Root => {
            println!("{}", manifest.root_directory().display());
            Ok(())
        }
    }
}

pub fn execute_init(manifest: &mut ImportMapManifest) -> Result<()> {
    if manifest.path().exists() {
        println!("{} already exists", manifest.path().display());
        return Ok(());
    }
    manifest.save(ImportMapEntries::new())
        .with_context(|| format!("Could not create {}", manifest.path().display()))?;
    println!("Created {}", manifest.path().display());
    Ok(())
}

pub fn execute_require(
    manifest: &mut ImportMapManifest,
    packages: &[String],
    path: Option<String>,
    entrypoint: bool,
    kind: TypeArg,
) -> Result<()> {
    if path.is_some() && packages.len() != 1 {
        bail!("The --path option can only be used with a single package.");
    }

    let mut requests = Vec::new();
    let mut invalid = 0;
    for package in packages {
        match PackageRequest::parse(package) {
            Some(request) => {
                let mut options = RequireOptions::new(request);
                options.path = path.as_deref().map(|path| {
                    manifest.to_manifest_path(Path::new(path)).unwrap_or_else(|| path.to_string())
                });
                options.entrypoint = entrypoint;
                options.kind = ModuleType::from(kind);
                requests.push(options);
            }
            None => {
                invalid += 1;
                eprintln!(
                    "{} The package \"{}\" is not valid. Valid formats are {}.",
                    "error:".red().bold(),
                    package,
                    SPECIFIER_FORMATS
                );
            }
        }
    }

    if !requests.is_empty() {
        let resolved = PinnedResolver.resolve(&requests)?;
        let mut entries = manifest.load()?.clone();
        for entry in resolved {
            let name = entry.import_name().to_string();
            let target = entry.path().or(entry.version()).unwrap_or_default().to_string();
            entries.add(entry);
            println!("{} {} ({})", "added".green(), name, target);
        }
        manifest.save(entries)?;
    }

    if invalid > 0 {
        bail!("{} of {} packages could not be parsed", invalid, packages.len());
    }
    Ok(())
}

pub fn execute_remove(manifest: &mut ImportMapManifest, names: &[String]) -> Result<()> {
    let mut entries = manifest.load()?.clone();
    let missing: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| !entries.has(name))
        .collect();
    if !missing.is_empty() {
        bail!("Not in the import map: {}", missing.join(", "));
    }
    for name in names {
        entries.remove(name);
        println!("{} {}", "removed".yellow(), name);
    }
    manifest.save(entries)?;
    Ok(())
}

#[derive(Serialize)]
struct ListedEntry<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
    #[serde(rename = "type")]
    kind: ModuleType,
    entrypoint: bool,
}

pub fn execute_list(manifest: &mut ImportMapManifest, json: bool) -> Result<()> {
    let entries = manifest.load()?.clone();

    if json {
        let listed: Vec<ListedEntry> = entries
            .iter()
            .map(|entry| ListedEntry {
                name: entry.import_name(),
                path: entry.path(),
                version: entry.version(),
                kind: entry.kind(),
                entrypoint: entry.is_entrypoint(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listed)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No entries");
        return Ok(());
    }

    for entry in &entries {
        match (entry.path(), entry.version()) {
            (Some(path), _) => {
                println!("{}: {}", entry.import_name().bold(), path);
                println!("   file: {}", manifest.to_filesystem_path(path).display());
            }
            (_, Some(version)) => println!("{}: {}", entry.import_name().bold(), version),
            (None, None) => {}
        }
        if entry.kind() != ModuleType::Js {
            println!("   type: {}", entry.kind());
        }
        if entry.is_entrypoint() {
            println!("   entrypoint");
        }
    }
    Ok(())
}
