use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tp_aggregation::{ReduceReport, RuleKind, reduce, rule_for};
use tp_elements::Element;
use tp_graph::{ConnectionGraph, GraphError};
use tp_project::{ProjectError, build_graph, load, load_reduce_config, reduce_options};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tp-cli")]
#[command(about = "TopoFlow CLI - Hydraulic topology aggregation tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a network file and build its graph
    Validate {
        /// Path to the network YAML or JSON file
        network_path: PathBuf,
    },
    /// Reduce a network and print the aggregated topology
    Reduce {
        /// Path to the network YAML or JSON file
        network_path: PathBuf,
        /// Reduction settings overriding the file's `reduce:` section
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the aggregation rules in default order
    Rules,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Reduce(#[from] tp_aggregation::ReduceError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

type CliResult<T> = Result<T, CliError>;

fn main() -> CliResult<()> {
    // RUST_LOG controls verbosity; warnings about skipped matches by default
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { network_path } => cmd_validate(&network_path),
        Commands::Reduce {
            network_path,
            config,
            json,
        } => cmd_reduce(&network_path, config.as_deref(), json),
        Commands::Rules => {
            cmd_rules();
            Ok(())
        }
    }
}

fn cmd_validate(network_path: &Path) -> CliResult<()> {
    println!("Validating network: {}", network_path.display());
    let file = load(network_path)?;
    let built = build_graph(&file)?;
    println!(
        "✓ Network is valid ({} elements, {} connections)",
        built.graph.element_count(),
        built.graph.get_connections().len()
    );
    Ok(())
}

fn cmd_reduce(network_path: &Path, config: Option<&Path>, json: bool) -> CliResult<()> {
    let file = load(network_path)?;
    let config = match config {
        Some(path) => Some(load_reduce_config(path)?),
        None => file.reduce.clone(),
    };
    let options = reduce_options(config.as_ref())?;
    let mut graph = build_graph(&file)?.graph;
    info!(network = %file.name, rules = options.rules.len(), "starting reduction");
    let report = reduce(&mut graph, &options)?;

    if json {
        let value = report_json(&graph, &report)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_report(&graph, &report)?;
    }
    Ok(())
}

fn cmd_rules() {
    let options = tp_aggregation::ReduceOptions::default();
    println!("Aggregation rules (default order):");
    for kind in RuleKind::ALL {
        let rule = rule_for(kind, &options);
        println!("  {:<22} creates {}", kind.name(), rule.kind());
    }
}

/// Resolved attributes of an element, as `name = value` strings.
fn attribute_lines(element: &Element) -> Vec<(String, String)> {
    element
        .kind
        .schema()
        .iter()
        .map(|def| {
            element.request(def.name);
            let value = element
                .get_attribute(def.name)
                .map_or_else(|| "undetermined".to_string(), |v| v.to_string());
            (def.name.to_string(), value)
        })
        .collect()
}

fn print_report(graph: &ConnectionGraph, report: &ReduceReport) -> CliResult<()> {
    println!(
        "Reduced {} elements to {}",
        report.nodes_before, report.nodes_after
    );
    for rule in &report.rules {
        println!(
            "  {:<22} created {:>3}, skipped {:>3}",
            rule.rule, rule.created, rule.skipped
        );
    }
    println!();
    println!("Elements:");
    for element in graph.elements() {
        println!(
            "  {} [{}] ({} physical)",
            element.name,
            element.kind,
            element.leaf_count()
        );
        for (name, value) in attribute_lines(element) {
            println!("      {name} = {value}");
        }
    }
    println!();
    println!("Connections:");
    for (a, b) in graph.get_connections() {
        println!("  {} <-> {}", graph.port_reference(a)?, graph.port_reference(b)?);
    }
    Ok(())
}

fn report_json(graph: &ConnectionGraph, report: &ReduceReport) -> CliResult<serde_json::Value> {
    let elements: Vec<serde_json::Value> = graph
        .elements()
        .map(|element| {
            let attributes: serde_json::Map<String, serde_json::Value> = attribute_lines(element)
                .into_iter()
                .map(|(name, value)| (name, serde_json::Value::String(value)))
                .collect();
            serde_json::json!({
                "name": element.name,
                "guid": element.guid,
                "type": element.kind.name(),
                "members": element.leaf_count(),
                "attributes": attributes,
                "undetermined": element
                    .undetermined()
                    .iter()
                    .map(|n| n.as_str())
                    .collect::<Vec<_>>(),
            })
        })
        .collect();
    let mut connections = Vec::new();
    for (a, b) in graph.get_connections() {
        connections.push(serde_json::json!([
            graph.port_reference(a)?,
            graph.port_reference(b)?
        ]));
    }
    let rules: Vec<serde_json::Value> = report
        .rules
        .iter()
        .map(|r| {
            serde_json::json!({
                "rule": r.rule,
                "created": r.created,
                "skipped": r.skipped,
                "stale": r.stale,
                "passes": r.passes,
            })
        })
        .collect();
    Ok(serde_json::json!({
        "nodes_before": report.nodes_before,
        "nodes_after": report.nodes_after,
        "rules": rules,
        "elements": elements,
        "connections": connections,
    }))
}
