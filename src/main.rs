use anyhow::{Context, Result};
use clap::Parser;
use pom_class_finder::cache::PersistentCache;
use pom_class_finder::cli::{Cli, Commands, OutputFormat};
use pom_class_finder::config::{clear_db, resolve_db_path, resolve_m2_repo};
use pom_class_finder::coordinate::Scope;
use pom_class_finder::extract::ClassRepresentation;
use pom_class_finder::finder::{ClassFinder, ClassLookup, FinderCaches};
use pom_class_finder::repository::Repository;
use pom_class_finder::resolver::ResolveOptions;
use pom_class_finder::tools::{ToolCall, ToolResponse, dispatch};
use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();
    let cli = parse_cli()?;

    match cli.command.clone() {
        Commands::Clear => {
            let db_path = resolve_db_path(&cli)?;
            clear_db(&db_path)?;
        }
        Commands::Stats => {
            let db_path = resolve_db_path(&cli)?;
            let cache = PersistentCache::open(db_path)?;
            let stats = cache.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Find {
            class_name,
            pom,
            format,
            output,
        } => {
            let finder = build_finder(&cli)?;
            let class_name = normalize_class_name(&class_name);
            let found = finder
                .lookup_class(&class_name, Some(&pom), &ResolveOptions::default())?
                .with_context(|| format!("class {class_name} not found in dependencies"))?;
            write_find_output(&found, format, output.as_deref())?;
        }
        Commands::Resolve {
            pom,
            no_transitive,
            scopes,
            max_depth,
        } => {
            let finder = build_finder(&cli)?;
            let mut options = ResolveOptions {
                include_transitive: !no_transitive,
                max_depth,
                ..ResolveOptions::default()
            };
            if !scopes.is_empty() {
                options.scopes = scopes.iter().map(|s| Scope::parse(s)).collect::<BTreeSet<_>>();
            }
            let coordinates = finder.resolve_dependencies(Some(&pom), &options)?;
            println!("{}", serde_json::to_string_pretty(&coordinates)?);
        }
        Commands::Search { jar_path, pattern } => {
            let finder = build_finder(&cli)?;
            for class in finder.search_classes(&jar_path, &pattern)? {
                println!("{class}");
            }
        }
        Commands::Extract {
            class_name,
            jar,
            sources,
            format,
        } => {
            let finder = build_finder(&cli)?;
            let class_name = normalize_class_name(&class_name);
            let repr = finder.extract_class(&class_name, &jar, sources.as_deref());
            if repr.source.is_none() {
                anyhow::bail!("class {class_name} not found in {}", jar.display());
            }
            let content = match format {
                OutputFormat::Json => serde_json::to_string_pretty(repr.as_ref())?,
                OutputFormat::Text => representation_summary(&repr),
                OutputFormat::Code => repr.source.clone().unwrap_or_default(),
            };
            emit(&content, None)?;
        }
        Commands::Serve => {
            let finder = build_finder(&cli)?;
            serve(&finder)?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_cli() -> Result<Cli> {
    let args: Vec<String> = std::env::args().collect();
    Ok(Cli::parse_from(rewrite_args_for_implicit_find(args)))
}

fn rewrite_args_for_implicit_find(mut args: Vec<String>) -> Vec<String> {
    if args.len() <= 1 {
        return args;
    }

    let subcommands = [
        "find", "resolve", "search", "extract", "serve", "stats", "clear", "help",
    ];

    let mut idx = 1usize;
    while idx < args.len() {
        let a = args[idx].as_str();
        if a == "--" {
            idx += 1;
            break;
        }

        if a == "--m2" || a == "--db" {
            idx += 2;
            continue;
        }

        if a.starts_with('-') {
            idx += 1;
            continue;
        }

        break;
    }

    if idx < args.len() {
        let token = args[idx].as_str();
        if !subcommands.contains(&token) {
            args.insert(idx, "find".to_string());
        }
    }

    args
}

fn build_finder(cli: &Cli) -> Result<ClassFinder> {
    let repository = Repository::new(resolve_m2_repo(cli)?);
    let store = if cli.no_store {
        None
    } else {
        let db_path = resolve_db_path(cli)?;
        match PersistentCache::open(db_path.clone()) {
            Ok(store) => Some(store),
            Err(e) => {
                warn!(db = %db_path.display(), error = %e, "persistent cache unavailable, continuing without it");
                None
            }
        }
    };
    Ok(ClassFinder::new(repository, FinderCaches::default(), store))
}

/// One JSON request per stdin line, one JSON response per stdout line.
fn serve(finder: &ClassFinder) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read request from stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<ToolCall>(&line) {
            Ok(call) => dispatch(finder, &call.tool, &call.arguments),
            Err(e) => ToolResponse::error(format!("invalid request: {e}")),
        };
        serde_json::to_writer(&mut out, &response)?;
        out.write_all(b"\n")?;
        out.flush()?;
    }
    Ok(())
}

fn normalize_class_name(raw: &str) -> String {
    let mut s = raw.trim();
    for keyword in ["import", "static"] {
        if let Some(rest) = s.strip_prefix(keyword)
            && rest.starts_with(char::is_whitespace)
        {
            s = rest.trim();
        }
    }
    if s.ends_with(';') {
        s = s.trim_end_matches(';').trim();
    }
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn representation_summary(repr: &ClassRepresentation) -> String {
    let mut out = String::new();
    out.push_str(&format!("class_name: {}\n", repr.class_name));
    out.push_str(&format!("archive: {}\n", repr.archive_path.display()));
    out.push_str(&format!("from_sources: {}\n", repr.is_from_sources));
    for f in &repr.fields {
        out.push_str(&format!(
            "- field: {} {} {}\n",
            f.modifiers.join(" "),
            f.field_type,
            f.name
        ));
    }
    for m in &repr.methods {
        out.push_str(&format!(
            "- method: {} {}{}({})\n",
            m.modifiers.join(" "),
            m.return_type
                .as_deref()
                .map(|t| format!("{t} "))
                .unwrap_or_default(),
            m.name,
            m.parameters.join(", ")
        ));
    }
    out
}

fn write_find_output(found: &ClassLookup, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(found)?,
        OutputFormat::Text => {
            let mut out = String::new();
            out.push_str(&format!("coordinate: {}\n", found.location.coordinate));
            out.push_str(&format!("dependencies_scanned: {}\n", found.dependencies_scanned));
            out.push_str(&format!("duration_ms: {}\n", found.duration_ms));
            out.push_str(&representation_summary(&found.representation));
            out
        }
        OutputFormat::Code => found.representation.source.clone().unwrap_or_default(),
    };
    emit(&content, output)
}

fn emit(content: &str, output: Option<&Path>) -> Result<()> {
    if let Some(path) = output {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write output: {}", path.display()))?;
    } else {
        print!("{content}");
        if !content.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}
