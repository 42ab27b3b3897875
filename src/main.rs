use std::path::PathBuf;

use anyhow::{Result, anyhow, bail};
use shader_function_graph::{
    FunctionGraph, FunctionId,
    catalog,
    config::{self, AssemblerConfig},
    manifest,
};

const USAGE: &str = "supported: --catalog <name>, --manifest <library.json>, --root <function>, \
--config <config.json>, --output <file>, --define NAME[=VALUE], --validate, --list";

#[derive(Debug, Default, Clone)]
struct Cli {
    catalog: Option<String>,
    manifest: Option<PathBuf>,
    roots: Vec<String>,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    defines: Vec<(String, String)>,
    validate: bool,
    list: bool,
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        let value = |name: &str| {
            args.get(i + 1)
                .cloned()
                .ok_or_else(|| anyhow!("missing value for {name}"))
        };
        match args[i].as_str() {
            "--catalog" => {
                cli.catalog = Some(value("--catalog")?);
                i += 2;
            }
            "--manifest" => {
                cli.manifest = Some(PathBuf::from(value("--manifest")?));
                i += 2;
            }
            "--root" => {
                cli.roots.push(value("--root")?);
                i += 2;
            }
            "--config" => {
                cli.config = Some(PathBuf::from(value("--config")?));
                i += 2;
            }
            "--output" | "-o" => {
                cli.output = Some(PathBuf::from(value("--output")?));
                i += 2;
            }
            "--define" | "-D" => {
                let def = value("--define")?;
                let (name, val) = def.split_once('=').unwrap_or((def.as_str(), "1"));
                if name.is_empty() {
                    bail!("empty macro name in --define {def}");
                }
                cli.defines.push((name.to_string(), val.to_string()));
                i += 2;
            }
            "--validate" => {
                cli.validate = true;
                i += 1;
            }
            "--list" => {
                cli.list = true;
                i += 1;
            }
            other => bail!("unknown argument: {other} ({USAGE})"),
        }
    }

    match (&cli.catalog, &cli.manifest) {
        (Some(_), Some(_)) => bail!("--catalog and --manifest are mutually exclusive"),
        (None, None) => bail!("one of --catalog or --manifest is required ({USAGE})"),
        _ => {}
    }
    Ok(cli)
}

fn root_ids(graph: &FunctionGraph, names: &[String]) -> Result<Vec<FunctionId>> {
    names
        .iter()
        .map(|name| {
            graph
                .find(name)
                .ok_or_else(|| anyhow!("unknown root function: {name}"))
        })
        .collect()
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match cli.config.as_deref() {
        Some(path) => config::load_config_from_path(path)?,
        None => AssemblerConfig::default(),
    };
    config.validation.enabled |= cli.validate;
    config.validation.defines.extend(cli.defines);

    let loaded;
    let (graph, default_roots): (&FunctionGraph, Vec<FunctionId>) =
        match (cli.catalog.as_deref(), cli.manifest.as_deref()) {
            (Some(name), _) => {
                let graph = catalog::by_name(name)
                    .ok_or_else(|| anyhow!("unknown catalog: {name} (available: blinn-phong)"))?;
                (graph, Vec::new())
            }
            (None, Some(path)) => {
                loaded = manifest::load_manifest_from_path(path)?;
                (&loaded.graph, loaded.roots.clone())
            }
            (None, None) => bail!("no function library given"),
        };

    let roots = if cli.roots.is_empty() {
        default_roots
    } else {
        root_ids(graph, &cli.roots)?
    };
    if roots.is_empty() {
        bail!("no roots requested; pass --root <function>");
    }

    let resolution = graph.resolve(&roots)?;
    tracing::info!(
        roots = roots.len(),
        functions = resolution.len(),
        "resolved shader functions"
    );

    if cli.list {
        for name in resolution.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let text = config.assembler().assemble(&resolution);

    if config.validation.enabled {
        config
            .glsl_validation()
            .validate_with_context(&text, &format!("roots {:?}", cli.roots))?;
        tracing::info!("assembled GLSL passed naga validation");
    }

    match cli.output {
        Some(path) => {
            std::fs::write(&path, &text)
                .map_err(|e| anyhow!("failed to write {}: {e}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = text.len(), "wrote assembled GLSL");
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&argv)?;
    run(cli)
}
