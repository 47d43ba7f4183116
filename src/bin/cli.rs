//! Conch CLI - command-line interface for the conversation graph
//!
//! Usage: conch-cli [OPTIONS] <COMMAND>
//!
//! Every command loads the graph file, runs, and writes the file back.
//! Supports JSON output for scripting.

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use conch_lib::{
    db::Node,
    error::{GraphError, Result},
    import, settings,
    settings::{EmbeddingBackend, LlmBackend, Settings},
    vcs::{self, Git},
    Conversation, Storage,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// Main CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "conch-cli")]
#[command(version, about = "Branching conversation graph CLI", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Graph file path (default: settings, then auto-detect)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Settings file path (default: $CONCH_CONFIG, then the app data dir)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Output as JSON for scripting
    #[arg(long, global = true)]
    json: bool,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Detailed logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Graph(GraphCommands),
    /// Configuration settings
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum GraphCommands {
    /// Start a new thread
    New {
        /// Prompt for the root node
        prompt: String,
    },
    /// Reply under an existing node
    Reply {
        /// Parent node ID
        parent: String,
        /// Prompt for the reply
        prompt: String,
    },
    /// Show a node
    View {
        /// Node ID
        id: String,
    },
    /// Print the reply tree (all threads if no ID is given)
    Tree {
        /// Root of the subtree to print
        id: Option<String>,
    },
    /// List a node's ancestors, nearest first
    Ancestors {
        id: String,
    },
    /// List a node's descendants, depth-first
    Descendants {
        id: String,
    },
    /// Replace a node's response
    Edit {
        id: String,
        /// New response text
        text: String,
    },
    /// Attach a comment to a node
    Comment {
        id: String,
        text: String,
    },
    /// Regenerate a node's response
    Retry {
        id: String,
        /// Replace the prompt before regenerating
        #[arg(long, short)]
        prompt: Option<String>,
    },
    /// Tag operations
    Tag {
        #[command(subcommand)]
        cmd: TagCommands,
    },
    /// Add a citation edge FROM -> TO
    Cite {
        from: String,
        to: String,
    },
    /// Show what a node cites and what cites it
    Cites {
        id: String,
    },
    /// Nodes linked to a node by citations in either direction
    Related {
        id: String,
    },
    /// Keyword search over prompts, responses, comments and tags
    Search {
        term: String,
    },
    /// Summarize a subtree and store the summary on its root
    Summarize {
        id: String,
    },
    /// Embedding operations
    Embed {
        #[command(subcommand)]
        cmd: EmbedCommands,
    },
    /// Semantic search over embedded nodes
    Simsearch {
        query: String,
        /// Number of results
        #[arg(long, short, default_value = "3")]
        k: usize,
    },
    /// Ask a one-off question (with a node's citations as context if given)
    Ask {
        prompt: String,
        /// Node whose citations provide context
        #[arg(long)]
        node: Option<String>,
    },
    /// Retrieval-augmented question over the graph
    SmartAsk {
        question: String,
        /// Anchor node
        #[arg(long)]
        from: Option<String>,
        /// Number of similar nodes to retrieve (default: settings)
        #[arg(long, short)]
        k: Option<usize>,
    },
    /// Turn the last smart-ask into a child of PARENT
    Promote {
        parent: String,
    },
    /// Add the last smart-ask's sources as citations of TARGET (default: its anchor)
    CiteSmartAsk {
        target: Option<String>,
    },
    /// Smart-ask, promote and cite in one step
    SmartThread {
        question: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long, short)]
        k: Option<usize>,
    },
    /// Ask the model for suggestions about a node
    Suggest {
        #[command(subcommand)]
        cmd: SuggestCommands,
    },
    /// Document operations
    Doc {
        #[command(subcommand)]
        cmd: DocCommands,
    },
    /// Web search results
    Web {
        #[command(subcommand)]
        cmd: WebCommands,
    },
    /// Export the graph
    Export {
        #[command(subcommand)]
        cmd: ExportCommands,
    },
    /// Replace the graph with a snapshot file
    ImportGraph {
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum TagCommands {
    /// Add a tag (no-op if present)
    Add { id: String, tag: String },
    /// Remove a tag (no-op if absent)
    Remove { id: String, tag: String },
}

#[derive(Subcommand)]
enum EmbedCommands {
    /// Embed a single node
    Node {
        id: String,
        /// Look up the node but store nothing
        #[arg(long)]
        dry_run: bool,
    },
    /// Embed every node
    All {
        #[arg(long)]
        dry_run: bool,
    },
    /// Embed a node and its descendants
    Subtree {
        id: String,
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum SuggestCommands {
    /// Follow-up questions
    Replies {
        id: String,
        #[arg(long, short, default_value = "3")]
        k: usize,
    },
    /// Tags for organizing the node
    Tags {
        id: String,
        #[arg(long, short, default_value = "3")]
        k: usize,
    },
    /// Sources to fact-check the response
    Sources {
        id: String,
        #[arg(long, short, default_value = "3")]
        k: usize,
    },
}

#[derive(Subcommand)]
enum DocCommands {
    /// Import a text, markdown or PDF file
    Import {
        path: PathBuf,
        /// Parent node
        #[arg(long)]
        parent: Option<String>,
        /// Keep only the first N characters
        #[arg(long)]
        truncate: Option<usize>,
    },
    /// Write a node's response to a file
    Save { id: String, path: PathBuf },
    /// Create an improved draft of a document node
    Improve { id: String },
    /// Commit the node's response to a git repository
    Version {
        id: String,
        #[arg(long, default_value = "doc_versions")]
        repo: PathBuf,
    },
    /// Diff the responses of two nodes
    Diff { first: String, second: String },
    /// Diff the last two committed versions of a node's document
    DiffVersions {
        id: String,
        #[arg(long, default_value = "doc_versions")]
        repo: PathBuf,
    },
}

#[derive(Subcommand)]
enum WebCommands {
    /// Search the web (deterministic mock results)
    Search {
        query: String,
        #[arg(long, short, default_value = "5")]
        n: usize,
    },
    /// Save one search result as a node
    Save {
        query: String,
        /// Result index as printed by `web search`
        index: usize,
        /// Result count of the search the index refers to
        #[arg(long, short, default_value = "5")]
        n: usize,
        #[arg(long)]
        parent: Option<String>,
        /// Also cite the saved result from this node
        #[arg(long)]
        cite_from: Option<String>,
    },
}

#[derive(Subcommand)]
enum ExportCommands {
    /// Mermaid diagram of replies and citations
    Mermaid {
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Mermaid diagram of citations only
    Citations {
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// JSON snapshot of the whole graph
    Snapshot { path: PathBuf },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show all settings
    Show,
    /// Print the settings file path
    Path,
    /// Choose the generation or embedding backend
    SetBackend {
        kind: BackendKind,
        /// mock or ollama
        backend: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendKind {
    Llm,
    Embedding,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = run_cli(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr; RUST_LOG overrides the flag-derived level.
fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run_cli(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(settings::default_config_path);

    // Completions and config never open the graph
    let command = match cli.command {
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "conch-cli", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Config { cmd } => {
            return handle_config(cmd, Settings::load(&config_path), &config_path, cli.json)
        }
        Commands::Graph(command) => command,
    };
    let settings = Settings::load(&config_path);

    let db_path = cli
        .db
        .map(PathBuf::from)
        .unwrap_or_else(|| settings::default_storage_path(&settings));
    tracing::debug!(path = %db_path.display(), "using graph file");

    let mut conv = Conversation::open(Storage::File(db_path), settings)?;
    let json = cli.json;

    match command {
        GraphCommands::New { prompt } => {
            let id = conv.new_thread(&prompt)?;
            print_created(&conv, &id, json)
        }
        GraphCommands::Reply { parent, prompt } => {
            let id = conv.reply(&parent, &prompt)?;
            print_created(&conv, &id, json)
        }
        GraphCommands::View { id } => handle_view(&conv, &id, json),
        GraphCommands::Tree { id } => handle_tree(&conv, id, json),
        GraphCommands::Ancestors { id } => {
            let ids = conv.graph().ancestors(&id)?;
            print_ids(&conv, &ids, json)
        }
        GraphCommands::Descendants { id } => {
            let ids = conv.graph().descendants(&id)?;
            print_ids(&conv, &ids, json)
        }
        GraphCommands::Edit { id, text } => {
            conv.edit_response(&id, &text)?;
            print_ok(&format!("Updated {}", id), json)
        }
        GraphCommands::Comment { id, text } => {
            conv.set_comment(&id, &text)?;
            print_ok(&format!("Commented on {}", id), json)
        }
        GraphCommands::Retry { id, prompt } => {
            conv.retry(&id, prompt.as_deref())?;
            print_created(&conv, &id, json)
        }
        GraphCommands::Tag { cmd } => handle_tag(&mut conv, cmd, json),
        GraphCommands::Cite { from, to } => {
            let added = conv.add_citation(&from, &to)?;
            if json {
                println!("{}", json!({ "from": from, "to": to, "added": added }));
            } else if added {
                println!("{} now cites {}", from, to);
            } else {
                println!("{} already cites {}", from, to);
            }
            Ok(())
        }
        GraphCommands::Cites { id } => handle_cites(&conv, &id, json),
        GraphCommands::Related { id } => {
            let ids = conv.graph().related(&id)?;
            print_ids(&conv, &ids, json)
        }
        GraphCommands::Search { term } => {
            let ids = conv.graph().search(&term);
            print_ids(&conv, &ids, json)
        }
        GraphCommands::Summarize { id } => {
            let summary = conv.graph_mut().summarize_subtree(&id)?;
            print_text("summary", &summary, json)
        }
        GraphCommands::Embed { cmd } => handle_embed(&mut conv, cmd, json),
        GraphCommands::Simsearch { query, k } => {
            let results = conv.similarity_search(&query, k)?;
            if json {
                let items: Vec<_> = results
                    .iter()
                    .map(|(id, score)| json!({ "id": id, "score": score }))
                    .collect();
                println!("{}", json!(items));
            } else if results.is_empty() {
                println!("No embedded nodes found.");
            } else {
                for (id, score) in &results {
                    println!("{:>10.4}  {}", score, conv.graph().preview(id));
                }
            }
            Ok(())
        }
        GraphCommands::Ask { prompt, node } => {
            let answer = match node {
                Some(ref id) => conv.ask_with_context(id, &prompt)?,
                None => conv.ask_direct(&prompt)?,
            };
            print_text("answer", &answer, json)
        }
        GraphCommands::SmartAsk { question, from, k } => {
            let answer = conv.smart_ask(&question, from.as_deref(), k)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&conv.graph().last_smart_ask())?);
            } else {
                println!("{}", answer);
                if let Some(cached) = conv.graph().last_smart_ask() {
                    if !cached.citations.is_empty() {
                        println!("\nSources:");
                        for line in conv.graph().describe(&cached.citations) {
                            println!("  {}", line);
                        }
                    }
                }
            }
            Ok(())
        }
        GraphCommands::Promote { parent } => {
            let id = conv.promote_smart_ask(&parent)?;
            print_created(&conv, &id, json)
        }
        GraphCommands::CiteSmartAsk { target } => {
            let added = conv.cite_smart_ask(target.as_deref())?;
            if json {
                println!("{}", json!({ "added": added }));
            } else {
                println!("Added {} citation(s)", added);
            }
            Ok(())
        }
        GraphCommands::SmartThread { question, from, k } => {
            let (id, _answer) = conv.smart_thread(&question, from.as_deref(), k)?;
            print_created(&conv, &id, json)
        }
        GraphCommands::Suggest { cmd } => {
            let (kind, text) = match cmd {
                SuggestCommands::Replies { id, k } => ("replies", conv.suggest_replies(&id, k)?),
                SuggestCommands::Tags { id, k } => ("tags", conv.suggest_tags(&id, k)?),
                SuggestCommands::Sources { id, k } => ("sources", conv.suggest_validation_sources(&id, k)?),
            };
            print_text(kind, &text, json)
        }
        GraphCommands::Doc { cmd } => handle_doc(&mut conv, cmd, json),
        GraphCommands::Web { cmd } => handle_web(&mut conv, cmd, json),
        GraphCommands::Export { cmd } => handle_export(&conv, cmd, json),
        GraphCommands::ImportGraph { path } => {
            let count = conv.import_graph(&path)?;
            if json {
                println!("{}", json!({ "nodes": count }));
            } else {
                println!("Imported {} nodes from {}", count, path.display());
            }
            Ok(())
        }
    }
}

// ============================================================================
// Output helpers
// ============================================================================

/// Node as JSON, with the embedding replaced by its length.
fn node_json(node: &Node) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(node)?;
    if let Some(obj) = value.as_object_mut() {
        if let Some(embedding) = obj.remove("embedding") {
            let dim = embedding.as_array().map(|a| a.len());
            obj.insert("embedding_dim".to_string(), json!(dim));
        }
    }
    Ok(value)
}

fn print_created(conv: &Conversation, id: &str, json: bool) -> Result<()> {
    let node = conv.graph().node(id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&node_json(node)?)?);
    } else {
        println!("[{}] {}", node.id, node.prompt);
        if !node.response.is_empty() {
            println!("\n{}", node.response);
        }
    }
    Ok(())
}

fn print_ids(conv: &Conversation, ids: &[String], json: bool) -> Result<()> {
    if json {
        println!("{}", json!(ids));
    } else if ids.is_empty() {
        println!("(none)");
    } else {
        for id in ids {
            println!("{}", conv.graph().preview(id));
        }
    }
    Ok(())
}

fn print_text(key: &str, text: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", json!({ key: text }));
    } else {
        println!("{}", text);
    }
    Ok(())
}

fn print_ok(message: &str, json: bool) -> Result<()> {
    if json {
        println!(r#"{{"status":"ok"}}"#);
    } else {
        println!("{}", message);
    }
    Ok(())
}

fn write_or_print(text: &str, out: Option<&Path>, json: bool) -> Result<()> {
    match out {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(path, text)?;
            print_ok(&format!("Exported graph to {}", path.display()), json)
        }
        None => print_text("mermaid", text, json),
    }
}

// ============================================================================
// Handlers
// ============================================================================

fn handle_view(conv: &Conversation, id: &str, json: bool) -> Result<()> {
    let node = conv.graph().node(id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&node_json(node)?)?);
        return Ok(());
    }

    println!("ID:        {}", node.id);
    if let Some(ref parent) = node.parent_id {
        println!("Parent:    {}", parent);
        println!("Thread:    {}", conv.graph().root_of(id)?);
    }
    if let Some(node_type) = node.node_type {
        println!("Type:      {}", node_type.as_str());
    }
    if let Some(ref filename) = node.filename {
        println!("File:      {}", filename);
    }
    if let Some(ref url) = node.url {
        println!("URL:       {}", url);
    }
    if !node.tags.is_empty() {
        println!("Tags:      {}", node.tags.join(", "));
    }
    if !node.children.is_empty() {
        println!("Children:  {}", node.children.join(", "));
    }
    if !node.citations.is_empty() {
        println!("Cites:     {}", node.citations.join(", "));
    }
    if let Some(ref embedding) = node.embedding {
        println!("Embedding: {} dims", embedding.len());
    }
    println!("\nPrompt:\n{}", node.prompt);
    println!("\nResponse:\n{}", node.response);
    if let Some(ref comment) = node.comment {
        println!("\nComment:\n{}", comment);
    }
    if let Some(ref summary) = node.summary {
        println!("\nSummary:\n{}", summary);
    }
    if let Some(ref summary) = node.subtree_summary {
        println!("\nSubtree summary:\n{}", summary);
    }
    Ok(())
}

fn handle_tree(conv: &Conversation, id: Option<String>, json: bool) -> Result<()> {
    let roots = match id {
        Some(id) => vec![id],
        None => conv.graph().roots(),
    };
    if json {
        let mut trees = Vec::new();
        for root in &roots {
            trees.push(json!({ "root": root, "nodes": conv.graph().subtree(root)? }));
        }
        println!("{}", json!(trees));
        return Ok(());
    }
    if roots.is_empty() {
        println!("(empty graph)");
    }
    for root in &roots {
        print!("{}", conv.graph().render_tree(root)?);
    }
    Ok(())
}

fn handle_tag(conv: &mut Conversation, cmd: TagCommands, json: bool) -> Result<()> {
    let (id, message) = match cmd {
        TagCommands::Add { id, tag } => {
            conv.graph_mut().add_tag(&id, &tag)?;
            let message = format!("Tagged {} with {}", id, tag);
            (id, message)
        }
        TagCommands::Remove { id, tag } => {
            conv.graph_mut().remove_tag(&id, &tag)?;
            let message = format!("Removed {} from {}", tag, id);
            (id, message)
        }
    };
    if json {
        println!("{}", json!({ "id": id, "tags": conv.graph().node(&id)?.tags }));
        Ok(())
    } else {
        print_ok(&message, false)
    }
}

fn handle_cites(conv: &Conversation, id: &str, json: bool) -> Result<()> {
    let cites = conv.graph().citations_of(id)?;
    let cited_by = conv.graph().cited_by(id)?;
    if json {
        println!("{}", json!({ "id": id, "cites": cites, "cited_by": cited_by }));
        return Ok(());
    }
    println!("Cites:");
    for line in conv.graph().describe(&cites) {
        println!("  {}", line);
    }
    println!("Cited by:");
    for line in conv.graph().describe(&cited_by) {
        println!("  {}", line);
    }
    Ok(())
}

fn handle_embed(conv: &mut Conversation, cmd: EmbedCommands, json: bool) -> Result<()> {
    let (count, dry_run) = match cmd {
        EmbedCommands::Node { id, dry_run } => {
            conv.embed_node(&id, dry_run)?;
            (1, dry_run)
        }
        EmbedCommands::All { dry_run } => (conv.embed_all(dry_run)?, dry_run),
        EmbedCommands::Subtree { id, dry_run } => (conv.embed_subtree(&id, dry_run)?, dry_run),
    };
    if json {
        println!("{}", json!({ "embedded": if dry_run { 0 } else { count }, "dry_run": dry_run }));
    } else if dry_run {
        println!("[DRY RUN] Would embed {} node(s)", count);
    } else {
        println!("Embedded {} node(s)", count);
    }
    Ok(())
}

fn handle_doc(conv: &mut Conversation, cmd: DocCommands, json: bool) -> Result<()> {
    match cmd {
        DocCommands::Import { path, parent, truncate } => {
            let id = conv.import_doc(&path, parent.as_deref(), truncate)?;
            if json {
                println!("{}", json!({ "id": id }));
            } else {
                println!("Imported {} as node {}", path.display(), id);
            }
            Ok(())
        }
        DocCommands::Save { id, path } => {
            conv.save_doc(&id, &path)?;
            print_ok(&format!("Saved node {} to {}", id, path.display()), json)
        }
        DocCommands::Improve { id } => {
            let new_id = conv.improve_doc(&id)?;
            print_created(conv, &new_id, json)
        }
        DocCommands::Version { id, repo } => {
            let path = vcs::save_doc_version(conv.graph(), &Git, &id, &repo)?;
            print_ok(&format!("Committed {}", path.display()), json)
        }
        DocCommands::Diff { first, second } => {
            let diff = vcs::diff_docs(conv.graph(), &Git, &first, &second)?;
            print_text("diff", &diff, json)
        }
        DocCommands::DiffVersions { id, repo } => {
            let diff = vcs::diff_doc_versions(conv.graph(), &Git, &id, &repo)?;
            print_text("diff", &diff, json)
        }
    }
}

fn handle_web(conv: &mut Conversation, cmd: WebCommands, json: bool) -> Result<()> {
    match cmd {
        WebCommands::Search { query, n } => {
            let results = import::mock_websearch(&query, n);
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for (i, r) in results.iter().enumerate() {
                    println!("[{}] {}\n    {}\n    {}", i, r.title, r.snippet, r.url);
                }
            }
            Ok(())
        }
        WebCommands::Save { query, index, n, parent, cite_from } => {
            let results = import::mock_websearch(&query, n);
            let result = results
                .get(index)
                .ok_or_else(|| GraphError::InvalidInput(format!("no result at index {}", index)))?;
            let id = conv.save_web_result(result, parent.as_deref())?;
            if let Some(ref from) = cite_from {
                conv.add_citation(from, &id)?;
            }
            print_created(conv, &id, json)
        }
    }
}

fn handle_export(conv: &Conversation, cmd: ExportCommands, json: bool) -> Result<()> {
    match cmd {
        ExportCommands::Mermaid { out } => {
            write_or_print(&conv.graph().export_mermaid(), out.as_deref(), json)
        }
        ExportCommands::Citations { out } => {
            write_or_print(&conv.graph().export_citation_graph(), out.as_deref(), json)
        }
        ExportCommands::Snapshot { path } => {
            conv.graph().export_to_file(&path)?;
            print_ok(&format!("Exported {} nodes to {}", conv.graph().len(), path.display()), json)
        }
    }
}

fn handle_config(cmd: ConfigCommands, mut settings: Settings, config_path: &Path, json: bool) -> Result<()> {
    match cmd {
        ConfigCommands::Show => {
            if json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                println!("llm-backend:            {}", settings.llm_backend.as_str());
                println!("embedding-backend:      {}", settings.embedding_backend.as_str());
                println!("ollama-url:             {}", settings.ollama_url());
                println!("ollama-model:           {}", settings.ollama_model);
                println!("ollama-embedding-model: {}", settings.ollama_embedding_model);
                println!("embedding-dim:          {}", settings.embedding_dim);
                println!("auto-embed:             {}", settings.auto_embed);
                println!("smart-ask-top-k:        {}", settings.smart_ask_top_k);
                println!("request-timeout-secs:   {}", settings.request_timeout_secs);
                println!("storage:                {}", settings::default_storage_path(&settings).display());
            }
            Ok(())
        }
        ConfigCommands::Path => print_text("path", &config_path.display().to_string(), json),
        ConfigCommands::SetBackend { kind, backend } => {
            let unknown = || GraphError::InvalidInput(format!("unknown backend '{}' (use mock or ollama)", backend));
            match kind {
                BackendKind::Llm => {
                    settings.llm_backend = LlmBackend::from_str(&backend).ok_or_else(unknown)?;
                }
                BackendKind::Embedding => {
                    settings.embedding_backend = EmbeddingBackend::from_str(&backend).ok_or_else(unknown)?;
                }
            }
            settings.save(config_path)?;
            print_ok(&format!("Saved settings to {}", config_path.display()), json)
        }
    }
}
