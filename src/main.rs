use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{CommandFactory, Parser, Subcommand};
use futures::future::BoxFuture;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use agentgraph_core::config::AppConfig;
use agentgraph_core::types::AgentConfig;
use agentgraph_core::Result as GraphResult;
use agentgraph_engine::graph::{
    AgentGraph, AgentGraphNode, Direction, ExecutionContext, GraphDocument, NodeVisitor,
};

#[derive(Parser)]
#[command(name = "agentgraph", version, about = "Build and walk agent handoff graphs")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "agentgraph.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the visitation levels of a graph
    Plan {
        /// Graph document (.json or .toml)
        graph: PathBuf,
        /// Plan the reverse traversal (terminal nodes first)
        #[arg(long)]
        reverse: bool,
        /// Print levels as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show nodes, their neighbours and outgoing handoffs
    Inspect {
        /// Graph document (.json or .toml)
        graph: PathBuf,
    },
    /// Dry run: walk the graph and collect the handoffs each node receives
    Run {
        /// Graph document (.json or .toml)
        graph: PathBuf,
        #[arg(long)]
        reverse: bool,
    },
    /// Print the effective configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "agentgraph", &mut std::io::stdout());
        return Ok(());
    }

    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!(config = %cli.config.display(), "Configuration loaded");

    match cli.command {
        Commands::Plan {
            graph,
            reverse,
            json,
        } => {
            let graph = load_graph(&graph, &config)?;
            let levels = graph.index().levels(direction(reverse));
            if json {
                println!("{}", serde_json::to_string_pretty(&levels)?);
            } else {
                for level in &levels {
                    println!("{:>3}  {}", level.rank, level.keys.join(", "));
                }
            }
        }
        Commands::Inspect { graph } => {
            let graph = load_graph(&graph, &config)?;
            print_inspection(&graph);
        }
        Commands::Run { graph, reverse } => {
            let graph = load_graph(&graph, &config)?;
            let mut visitor = HandoffRecorder { graph: &graph };
            let index = graph.index();
            let result = match direction(reverse) {
                Direction::Forward => {
                    index
                        .traverse_async(&mut visitor, ExecutionContext::new())
                        .await?
                }
                Direction::Reverse => {
                    index
                        .reverse_traverse_async(&mut visitor, ExecutionContext::new())
                        .await?
                }
            };
            info!(
                run_id = %result.run_id(),
                visited = result.order().len(),
                elapsed_ms = result.elapsed_ms(),
                "Dry run finished"
            );
            let report = serde_json::json!({
                "run_id": result.run_id().to_string(),
                "direction": result.direction(),
                "order": result.order(),
                "context": result.context().data(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

fn direction(reverse: bool) -> Direction {
    if reverse {
        Direction::Reverse
    } else {
        Direction::Forward
    }
}

/// Load a graph document and build it.
///
/// Agents come from the document's inline `[agents]` table. A document
/// without one is treated as fully enabled, which is what a dry run wants.
fn load_graph(path: &Path, config: &AppConfig) -> anyhow::Result<AgentGraph> {
    let document = GraphDocument::load(path)
        .with_context(|| format!("reading graph document {}", path.display()))?;

    let built = if document.agents.is_empty() {
        let resolver = |key: &str| AgentConfig::enabled(key, serde_json::json!({}));
        AgentGraph::try_build(&document, &resolver)
    } else {
        AgentGraph::try_build(&document, &document.inline_resolver())
    };
    let graph = built.with_context(|| format!("graph {} is not usable", path.display()))?;

    Ok(graph.with_max_depth_limit(config.traversal.max_depth_limit))
}

fn print_inspection(graph: &AgentGraph) {
    println!("graph: {}", graph.key());
    println!("root:  {}", graph.index().root_key());
    println!();

    for node in graph.index().nodes() {
        let children: Vec<&str> = graph
            .get_child_nodes(node.key())
            .iter()
            .map(|n| n.key())
            .collect();
        let parents: Vec<&str> = graph
            .get_parent_nodes(node.key())
            .iter()
            .map(|n| n.key())
            .collect();
        let marker = if children.is_empty() { " (terminal)" } else { "" };

        println!("{}{}", node.key(), marker);
        println!("  parents:  {}", join_or_dash(&parents));
        println!("  children: {}", join_or_dash(&children));
        for edge in node.edges() {
            println!("  -> {} {}", edge.target_key(), edge.handoff());
        }
    }
}

fn join_or_dash(keys: &[&str]) -> String {
    if keys.is_empty() {
        "-".to_string()
    } else {
        keys.join(", ")
    }
}

/// Dry-run visitor: records the handoff payloads a node receives from
/// neighbours that have already been visited.
struct HandoffRecorder<'g> {
    graph: &'g AgentGraph,
}

impl HandoffRecorder<'_> {
    fn received(
        &self,
        node: &AgentGraphNode,
        context: &ExecutionContext<serde_json::Value>,
    ) -> Vec<serde_json::Value> {
        let mut received = Vec::new();
        // Forward: handoffs on edges from visited parents into this node.
        for parent in self.graph.get_parent_nodes(node.key()) {
            if !context.contains(parent.key()) {
                continue;
            }
            if let Some(edge) = parent.edge_to(node.key()) {
                received.push(serde_json::json!({
                    "from": parent.key(),
                    "handoff": edge.handoff(),
                }));
            }
        }
        // Reverse: results flow back up this node's own edges.
        for edge in node.edges() {
            if edge.is_self_loop() || !context.contains(edge.target_key()) {
                continue;
            }
            if received.iter().any(|r| r["from"] == edge.target_key()) {
                continue;
            }
            received.push(serde_json::json!({
                "from": edge.target_key(),
                "handoff": edge.handoff(),
            }));
        }
        received
    }
}

impl NodeVisitor<serde_json::Value> for HandoffRecorder<'_> {
    fn visit<'a>(
        &'a mut self,
        node: &'a AgentGraphNode,
        context: &'a ExecutionContext<serde_json::Value>,
    ) -> BoxFuture<'a, GraphResult<serde_json::Value>> {
        Box::pin(async move {
            let received = self.received(node, context);
            debug!(node_key = %node.key(), received = received.len(), "Recorded handoffs");
            Ok(serde_json::json!({
                "agent": node.key(),
                "received": received,
            }))
        })
    }
}
