//! xform operator CLI
//!
//! Inspects the capability manifest, validates stored plans offline and
//! checks resolver configuration files. No reasoning or retrieval service
//! is contacted.

use anyhow::Context;
use async_trait::async_trait;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::{Component, Path, PathBuf};
use tracing_subscriber::EnvFilter;
use xform_core::{parse_plan, validate_plan, AdvisoryParams, Manifest, PlanMerger, ResolverConfig};
use xform_ops::{FontCatalog, FontLookupError, OperationKind};

/// Custom fonts looked up in a local directory
#[derive(Debug)]
struct LocalFontDirectory {
    root: Option<PathBuf>,
}

#[async_trait]
impl FontCatalog for LocalFontDirectory {
    async fn font_exists(&self, path: &str) -> Result<bool, FontLookupError> {
        let Some(root) = &self.root else {
            return Err(FontLookupError::new("custom font given but no --fonts-dir"));
        };
        let relative = Path::new(path);
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            tracing::warn!(path, "font path escapes the fonts directory");
            return Ok(false);
        }
        tokio::fs::try_exists(root.join(path))
            .await
            .map_err(|e| FontLookupError::new(e.to_string()))
    }
}

fn cli() -> Command {
    Command::new("xform")
        .version(xform_core::VERSION)
        .about("Transformation resolution engine tools")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("manifest")
                .about("List operations, tags and parameters")
                .arg(
                    Arg::new("manifest")
                        .long("manifest")
                        .value_name("FILE")
                        .value_parser(value_parser!(PathBuf))
                        .help("YAML manifest to use instead of the built-in one"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate and merge a stored plan, printing directives as JSON")
                .arg(
                    Arg::new("plan")
                        .long("plan")
                        .value_name("FILE")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Plan JSON: {\"steps\": [{\"operation\": ..., \"params\": {...}}]}"),
                )
                .arg(
                    Arg::new("advisory")
                        .long("advisory")
                        .value_name("FILE")
                        .value_parser(value_parser!(PathBuf))
                        .help("Advisory JSON: {\"params\": {\"long name\": value}}"),
                )
                .arg(
                    Arg::new("fonts-dir")
                        .long("fonts-dir")
                        .value_name("DIR")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory custom font paths are resolved against"),
                ),
        )
        .subcommand(
            Command::new("check-config")
                .about("Parse a resolver config and print the effective settings")
                .arg(
                    Arg::new("file")
                        .value_name("FILE")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn read(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

async fn manifest_command(args: &ArgMatches) -> anyhow::Result<()> {
    let manifest = match args.get_one::<PathBuf>("manifest") {
        Some(path) => Manifest::load(path).await?,
        None => Manifest::builtin()?.clone(),
    };

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    for entry in manifest.entries() {
        println!("{}", entry.operation);
        println!("  {}", entry.description);
        if !entry.tags.is_empty() {
            println!("  tags: {}", entry.tags.join(", "));
        }
        for parameter in &entry.parameters {
            println!("    {:<32} {}", parameter.name, parameter.description);
        }
        println!();
    }
    Ok(())
}

async fn validate_command(args: &ArgMatches) -> anyhow::Result<()> {
    let plan_path = args
        .get_one::<PathBuf>("plan")
        .context("--plan is required")?;
    let steps = parse_plan(&read(plan_path).await?, &OperationKind::ALL)
        .with_context(|| format!("invalid plan in {}", plan_path.display()))?;

    let advisory = match args.get_one::<PathBuf>("advisory") {
        Some(path) => AdvisoryParams::from_reply(&read(path).await?)
            .with_context(|| format!("invalid advisory parameters in {}", path.display()))?,
        None => AdvisoryParams::new(),
    };

    let fonts = LocalFontDirectory {
        root: args.get_one::<PathBuf>("fonts-dir").cloned(),
    };
    let validated = validate_plan(&steps, &fonts).await?;
    let directives = PlanMerger::new().merge(validated, &advisory);
    tracing::info!(steps = steps.len(), directives = directives.len(), "plan validated");

    println!("{}", serde_json::to_string_pretty(&directives)?);
    Ok(())
}

async fn check_config_command(args: &ArgMatches) -> anyhow::Result<()> {
    let path = args
        .get_one::<PathBuf>("file")
        .context("config file is required")?;
    let config = ResolverConfig::load(path).await?;
    if let Some(manifest) = &config.manifest_path {
        let manifest = Manifest::load(manifest).await?;
        tracing::info!(operations = manifest.len(), "manifest override is valid");
    }
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("manifest", args)) => manifest_command(args).await,
        Some(("validate", args)) => validate_command(args).await,
        Some(("check-config", args)) => check_config_command(args).await,
        _ => Ok(()),
    }
}
