//! triad-hook CLI - pre-tool-use interjection, apply-updates, and routing
//! entry points invoked by the host agent harness.
//!
//! Every subcommand speaks the hook protocol documented for its call site:
//! JSON (or plain text) on stdin, a narrow JSON shape or plain text on
//! stdout, and an exit code the host treats as the entire signal. Nothing
//! here ever panics past `main` — a hook that crashes the host is worse
//! than one that silently does nothing.

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use triad_graph::GraphStore;
use triad_hooks::{decide, HookEnv, HookOutcome, PreToolUseInput};
use triad_knowledge::{apply_updates, DefaultTriadRouter};
use triad_llm::HashEmbedder;
use triad_router::{
    apply_manual_selection, route_turn, RouterConfig, RouterState, RouterStateStore, RoutingOutcome,
    SemanticRouter, TriadRoute,
};
use triad_support::config::flag_set;

#[derive(Parser)]
#[command(name = "triad-hook")]
#[command(about = "Pre-tool-use interjection, apply-updates, and routing for the triad runtime", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Override home directory resolution (defaults to the OS home dir).
    #[arg(long, env = "TRIADS_HOME", global = true)]
    home: Option<PathBuf>,

    /// Directory holding `<triad>_graph.json` files (defaults to `<home>/.claude/graphs`).
    #[arg(long, env = "TRIADS_GRAPHS_DIR", global = true)]
    graphs_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide whether to block, inject context for, or ignore a pending tool call.
    ///
    /// Reads a `{tool_name, tool_input, cwd}` JSON object from stdin.
    PreToolUse,

    /// Apply `[GRAPH_UPDATE]` blocks found in conversation text read from
    /// stdin, and persist any lessons extract-lessons finds in the same
    /// text into `default_triad`'s graph.
    ApplyUpdates {
        /// Attribution for nodes/edges this pass creates or modifies.
        #[arg(long, default_value = "system")]
        actor: String,
        /// Triad an update falls back to when no router rule resolves one.
        #[arg(long, default_value = "implementation")]
        default_triad: String,
    },

    /// Route one conversational turn to a triad, or resolve a prior ambiguous turn.
    Route {
        /// The prompt to route; read from stdin if omitted.
        #[arg(long)]
        prompt: Option<String>,
        /// Path to the JSON array of routable triads (defaults to `<home>/.claude/router/routes.json`).
        #[arg(long, env = "TRIADS_ROUTES_FILE")]
        routes: Option<PathBuf>,
        /// Session identifier the persisted router state is keyed on.
        #[arg(long, default_value = "default")]
        session: String,
        /// Resolve a prior `needs_manual_selection` by naming the chosen triad.
        #[arg(long)]
        select: Option<String>,
    },
}

fn resolve_home(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn read_all_stdin() -> Option<String> {
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf).ok()?;
    Some(buf)
}

#[tokio::main]
async fn main() {
    triad_support::logging::init_for_hook();

    let cli = Cli::parse();
    let home = resolve_home(cli.home);
    let graphs_dir = cli
        .graphs_dir
        .unwrap_or_else(|| home.join(".claude").join("graphs"));

    match cli.command {
        Commands::PreToolUse => handle_pre_tool_use(&home, &graphs_dir),
        Commands::ApplyUpdates { actor, default_triad } => {
            handle_apply_updates(&graphs_dir, &actor, &default_triad)
        }
        Commands::Route { prompt, routes, session, select } => {
            handle_route(&home, routes, &session, prompt, select).await
        }
    }
}

/// Everything that can go wrong reading stdin, loading state, or deciding
/// collapses into `Noop` — the robustness contract for this hook is that
/// it never blocks the host on an internal failure.
fn run_pre_tool_use(home: &Path, graphs_dir: &Path) -> Option<HookOutcome> {
    let raw = read_all_stdin()?;
    let input: PreToolUseInput = serde_json::from_str(&raw).ok()?;

    let env = HookEnv {
        no_experience: flag_set("TRIADS_NO_EXPERIENCE"),
        no_block: flag_set("TRIADS_NO_BLOCK"),
    };

    let active_triad = RouterStateStore::at_home(home)
        .load()
        .ok()
        .flatten()
        .and_then(|s| s.active_triad);
    let triad = active_triad?;

    let store = GraphStore::new(graphs_dir).ok()?;
    let graph = store.load(&triad, true).ok()?;

    Some(decide(&input, &graph, Some(triad.as_str()), env))
}

fn handle_pre_tool_use(home: &Path, graphs_dir: &Path) {
    match run_pre_tool_use(home, graphs_dir).unwrap_or(HookOutcome::Noop) {
        HookOutcome::Noop => {}
        HookOutcome::Inject { additional_context } => {
            let payload = serde_json::json!({ "additionalContext": additional_context });
            println!("{payload}");
        }
        HookOutcome::Block { message } => {
            eprint!("{message}");
            std::process::exit(2);
        }
    }
}

fn handle_apply_updates(graphs_dir: &Path, actor: &str, default_triad: &str) {
    let Some(text) = read_all_stdin() else {
        eprintln!("failed to read conversation text from stdin");
        std::process::exit(1);
    };

    let store = match GraphStore::new(graphs_dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("failed to open graph store at {}: {e}", graphs_dir.display());
            std::process::exit(1);
        }
    };
    let router = DefaultTriadRouter { default: default_triad.to_string() };

    match apply_updates(&store, &text, &router, actor) {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("failed to serialize apply-updates report: {e}"),
        },
        Err(e) => {
            eprintln!("apply-updates failed: {e}");
            std::process::exit(1);
        }
    }
}

fn load_routes(path: &Path) -> anyhow::Result<Vec<TriadRoute>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

async fn handle_route(
    home: &Path,
    routes_path: Option<PathBuf>,
    session: &str,
    prompt: Option<String>,
    select: Option<String>,
) {
    let config = match RouterConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid router configuration: {e}");
            std::process::exit(1);
        }
    };

    let state_store = RouterStateStore::at_home(home);
    let mut state = state_store
        .load()
        .ok()
        .flatten()
        .unwrap_or_else(|| RouterState::new(session));

    let telemetry_log = config.telemetry_enabled.then(|| triad_router::TelemetryLog::at_home(home));

    if let Some(chosen) = select {
        let outcome = apply_manual_selection(&mut state, chosen, telemetry_log.as_ref());
        if let Err(e) = state_store.save(&state) {
            eprintln!("failed to persist router state: {e}");
        }
        print_routing_outcome(&outcome);
        return;
    }

    let Some(prompt) = prompt.or_else(read_all_stdin).map(|p| p.trim().to_string()).filter(|p| !p.is_empty())
    else {
        eprintln!("no prompt provided on the command line or stdin");
        std::process::exit(1);
    };

    let routes_path = routes_path
        .unwrap_or_else(|| home.join(".claude").join("router").join("routes.json"));
    let routes = match load_routes(&routes_path) {
        Ok(routes) => routes,
        Err(e) => {
            eprintln!("failed to load routes from {}: {e}", routes_path.display());
            std::process::exit(1);
        }
    };

    // A real deployment supplies its own `Embedder`/`ChatModel` (see
    // `triad_llm::provider`) keyed off `config.model_path`; this binary
    // ships only the deterministic default so routing stays exercisable
    // without network credentials.
    let embedder = HashEmbedder::default();
    let router = match SemanticRouter::load(routes, &embedder).await {
        Ok(router) => router,
        Err(e) => {
            eprintln!("failed to build semantic router: {e}");
            std::process::exit(1);
        }
    };

    let recent_turns: Vec<String> = Vec::new();
    let outcome = route_turn(
        &mut state,
        config.confidence_threshold,
        config.ambiguity_threshold,
        config.grace_turns,
        config.grace_minutes,
        config.llm_timeout_ms,
        &router,
        &embedder,
        None,
        &recent_turns,
        telemetry_log.as_ref(),
        &prompt,
    )
    .await;

    if let Err(e) = state_store.save(&state) {
        eprintln!("failed to persist router state: {e}");
    }
    print_routing_outcome(&outcome);
}

fn print_routing_outcome(outcome: &RoutingOutcome) {
    let payload = match outcome {
        RoutingOutcome::StayedInGracePeriod { triad } => {
            serde_json::json!({ "status": "grace_period", "triad": triad })
        }
        RoutingOutcome::Routed { triad, method, confidence } => {
            serde_json::json!({ "status": "routed", "triad": triad, "method": method, "confidence": confidence })
        }
        RoutingOutcome::NeedsManualSelection { candidates } => {
            serde_json::json!({ "status": "needs_manual_selection", "candidates": candidates })
        }
        RoutingOutcome::Cancelled => serde_json::json!({ "status": "cancelled" }),
    };
    println!("{payload}");
}
