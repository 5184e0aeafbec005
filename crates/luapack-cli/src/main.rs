use anyhow::{bail, Context};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::Parser;
use luapack_core::config::{BundleTarget, BundlerOptions, CliOverrides, ProjectConfig};
use luapack_core::{Bundler, DependencyGraph};
use rustc_hash::FxHashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_PROJECT_FILE: &str = "luapack.yaml";

/// luapack - bundle a Lua module tree into a single file
#[derive(Parser, Debug, Clone)]
#[command(name = "luapack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Entry files to bundle (default: the targets of the project file)
    #[arg(value_name = "ENTRY")]
    entries: Vec<PathBuf>,

    /// Write the bundle here instead of stdout (single entry only)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Path to the luapack.yaml project file
    #[arg(short, long, value_name = "FILE")]
    project: Option<PathBuf>,

    /// Also write the base64 stringified bundle here (single entry only)
    #[arg(long, value_name = "FILE")]
    stringify: Option<PathBuf>,

    /// Extra module search directory (repeatable)
    #[arg(short = 'I', long = "search-path", value_name = "DIR")]
    search_paths: Vec<PathBuf>,

    /// Module provided by the host at run time (repeatable)
    #[arg(long = "external", value_name = "NAME")]
    externals: Vec<String>,

    /// Source file extension
    #[arg(long, value_name = "EXT")]
    extension: Option<String>,

    /// Print the dependency graph instead of the bundle
    #[arg(long)]
    graph: bool,

    /// Print the dependency graph as JSON
    #[arg(long, requires = "graph")]
    json: bool,

    /// Re-bundle whenever a module file changes
    #[arg(short, long)]
    watch: bool,

    /// Initialize a new luapack project
    #[arg(long)]
    init: bool,
}

/// One unit of work
#[derive(Debug, Clone)]
enum Job {
    /// Bundle printed to stdout
    Print(PathBuf),
    /// Bundle written to disk with its auxiliary files
    Target(BundleTarget),
}

impl Job {
    fn entry(&self) -> &Path {
        match self {
            Job::Print(entry) => entry,
            Job::Target(target) => &target.entry,
        }
    }

    fn name(&self) -> String {
        match self {
            Job::Print(entry) => entry.display().to_string(),
            Job::Target(target) => target.display_name(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so a bundle printed to stdout stays clean
    // Set RUST_LOG=debug for detailed logs
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.init {
        return init_project(Path::new("."));
    }

    let (options, jobs) = load_jobs(&cli)?;
    debug!("Options: {:?}", options);
    let bundler = Bundler::new(options);

    if cli.graph {
        return print_graphs(&bundler, &jobs, cli.json);
    }

    if cli.watch {
        watch_mode(&bundler, &jobs)
    } else {
        run_jobs(&bundler, &jobs)
    }
}

/// Write a starter project file and a two-module sample
fn init_project(dir: &Path) -> anyhow::Result<()> {
    let config_path = dir.join(DEFAULT_PROJECT_FILE);
    if config_path.exists() {
        bail!("{} already exists", config_path.display());
    }

    let config = r#"# luapack project file

bundlerOptions:
  searchPaths: []        # Extra directories for module lookup
  externals: []          # Modules the host provides at run time

targets:
  - name: main
    entry: src/main.lua
    output: dist/main.lua
"#;
    fs::write(&config_path, config)?;
    println!("Created {}", DEFAULT_PROJECT_FILE);

    let src = dir.join("src");
    fs::create_dir_all(&src)?;
    fs::write(
        src.join("main.lua"),
        "local greet = require(\"./greet\")\n\nprint(greet(\"World\"))\n",
    )?;
    fs::write(
        src.join("greet.lua"),
        "return function(name)\n    return \"Hello, \" .. name .. \"!\"\nend\n",
    )?;
    println!("Created src/main.lua and src/greet.lua");

    println!("\nProject initialized. Run 'luapack' to bundle it into dist/main.lua.");
    Ok(())
}

/// Resolve the options and work list from the command line and, when no
/// entries are given, from the project file
fn load_jobs(cli: &Cli) -> anyhow::Result<(BundlerOptions, Vec<Job>)> {
    let project = match &cli.project {
        Some(path) => Some(
            ProjectConfig::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
        ),
        None if cli.entries.is_empty() => {
            let default_path = PathBuf::from(DEFAULT_PROJECT_FILE);
            if !default_path.exists() {
                bail!(
                    "No entry files given and no {} found. Use --help for usage information.",
                    DEFAULT_PROJECT_FILE
                );
            }
            Some(ProjectConfig::from_file(&default_path)?)
        }
        None => None,
    };

    let mut options = project
        .as_ref()
        .map(|config| config.bundler_options.clone())
        .unwrap_or_default();
    options.merge(&CliOverrides {
        search_paths: cli.search_paths.clone(),
        externals: cli.externals.clone(),
        extension: cli.extension.clone(),
    });

    if cli.entries.is_empty() {
        if cli.output.is_some() || cli.stringify.is_some() {
            bail!("--output and --stringify need an entry file");
        }
        let targets = project.map(|config| config.targets).unwrap_or_default();
        if targets.is_empty() {
            bail!("The project file defines no targets");
        }
        return Ok((options, targets.into_iter().map(Job::Target).collect()));
    }

    if cli.entries.len() > 1 && (cli.output.is_some() || cli.stringify.is_some()) {
        bail!("--output and --stringify take a single entry file");
    }

    let jobs = match (&cli.output, &cli.stringify) {
        (None, None) => cli.entries.iter().cloned().map(Job::Print).collect(),
        (output, stringify) => {
            let entry = cli.entries[0].clone();
            vec![Job::Target(BundleTarget {
                name: None,
                output: output
                    .clone()
                    .unwrap_or_else(|| default_output_path(&entry)),
                entry,
                copy: Vec::new(),
                stringify: stringify.clone(),
            })]
        }
    };
    Ok((options, jobs))
}

/// `src/main.lua` -> `src/main.bundle.lua`
fn default_output_path(entry: &Path) -> PathBuf {
    let stem = entry
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "bundle".to_string());
    entry.with_file_name(format!("{}.bundle.lua", stem))
}

/// Run every job in parallel and report each failure. Bundles destined for
/// stdout are printed in command-line order once all jobs are done.
fn run_jobs(bundler: &Bundler, jobs: &[Job]) -> anyhow::Result<()> {
    use rayon::prelude::*;

    let results: Vec<(String, anyhow::Result<Option<String>>)> = jobs
        .par_iter()
        .map(|job| (job.name(), run_job(bundler, job)))
        .collect();

    let mut failed = 0;
    for (name, result) in results {
        match result {
            Ok(Some(bundle)) => print!("{}", bundle),
            Ok(None) => {}
            Err(err) => {
                error!("{}: {:#}", name, err);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} target(s) failed", failed, jobs.len());
    }
    Ok(())
}

fn run_job(bundler: &Bundler, job: &Job) -> anyhow::Result<Option<String>> {
    match job {
        Job::Print(entry) => Ok(Some(bundler.bundle(entry)?)),
        Job::Target(target) => {
            run_target(bundler, target)?;
            Ok(None)
        }
    }
}

fn run_target(bundler: &Bundler, target: &BundleTarget) -> anyhow::Result<()> {
    let name = target.display_name();
    info!("Bundling {}...", name);

    let bundle = bundler.bundle(&target.entry)?;
    write_file(&target.output, &bundle)?;

    for copy in &target.copy {
        create_parent_dir(&copy.to)?;
        fs::copy(&copy.from, &copy.to).with_context(|| {
            format!(
                "Failed to copy {} to {}",
                copy.from.display(),
                copy.to.display()
            )
        })?;
        debug!("Copied {} to {}", copy.from.display(), copy.to.display());
    }

    if let Some(ref path) = target.stringify {
        write_file(path, &stringify(&bundle))?;
        debug!("Wrote stringified bundle to {}", path.display());
    }

    info!("Done bundling {}", name);
    Ok(())
}

/// A Lua chunk returning the bundle as a base64 string
fn stringify(bundle: &str) -> String {
    luapack_runtime::stringified::wrap(&STANDARD.encode(bundle))
}

fn write_file(path: &Path, content: &str) -> anyhow::Result<()> {
    create_parent_dir(path)?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

fn create_parent_dir(path: &Path) -> anyhow::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display())),
        _ => Ok(()),
    }
}

fn print_graphs(bundler: &Bundler, jobs: &[Job], json: bool) -> anyhow::Result<()> {
    let mut graphs = Vec::with_capacity(jobs.len());
    for job in jobs {
        graphs.push((job.name(), bundler.build_graph(job.entry())?));
    }

    if json {
        let value: Vec<serde_json::Value> = graphs
            .iter()
            .map(|(name, graph)| graph_json(name, graph))
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for (name, graph) in &graphs {
        println!("{} ({} modules)", name, graph.len());
        for module in graph.modules() {
            println!("  {}", module.id);
            for dependency in module.dependencies() {
                println!("    -> {}", dependency);
            }
        }
        for group in graph.circular_groups() {
            let ids: Vec<&str> = group.iter().map(|id| id.as_str()).collect();
            println!("  cycle: {}", ids.join(" -> "));
        }
    }
    Ok(())
}

fn graph_json(name: &str, graph: &DependencyGraph) -> serde_json::Value {
    let modules: Vec<serde_json::Value> = graph
        .modules()
        .map(|module| {
            serde_json::json!({
                "id": module.id,
                "path": module.path,
                "dependencies": module.dependencies(),
            })
        })
        .collect();

    serde_json::json!({
        "name": name,
        "entry": graph.entry(),
        "modules": modules,
        "cycles": graph.circular_groups(),
    })
}

/// Every module file reachable from the jobs' entries. Entries that fail
/// to resolve still contribute their own path so fixing them is noticed.
fn module_files(bundler: &Bundler, jobs: &[Job]) -> FxHashSet<PathBuf> {
    let mut files = FxHashSet::default();
    for job in jobs {
        match bundler.build_graph(job.entry()) {
            Ok(graph) => files.extend(graph.modules().map(|module| module.path.clone())),
            Err(err) => {
                warn!("{}: {}", job.name(), err);
                let entry = job.entry();
                files.insert(dunce::canonicalize(entry).unwrap_or_else(|_| entry.to_path_buf()));
            }
        }
    }
    files
}

/// Re-run all jobs whenever one of their module files changes
fn watch_mode(bundler: &Bundler, jobs: &[Job]) -> anyhow::Result<()> {
    use notify::{Event, EventKind};
    use std::sync::mpsc::{channel, RecvTimeoutError};

    println!("Watching for changes... (Press Ctrl+C to stop)");
    if let Err(err) = run_jobs(bundler, jobs) {
        error!("{:#}", err);
    }

    let (tx, rx) = channel();
    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })?;

    let mut watched_dirs: FxHashSet<PathBuf> = FxHashSet::default();
    let mut files = module_files(bundler, jobs);
    watch_dirs(&mut watcher, &files, &mut watched_dirs)?;

    let mut debouncer = Debouncer::new(Duration::from_millis(100));

    loop {
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    continue;
                }
                let touched = event.paths.iter().any(|path| {
                    let path = dunce::canonicalize(path).unwrap_or_else(|_| path.clone());
                    files.contains(&path)
                });
                if touched {
                    debouncer.touch(Instant::now());
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                bail!("File watcher disconnected");
            }
        }

        if debouncer.ready(Instant::now()) {
            println!("\nModule changed, re-bundling...");
            if let Err(err) = run_jobs(bundler, jobs) {
                error!("{:#}", err);
            }
            files = module_files(bundler, jobs);
            watch_dirs(&mut watcher, &files, &mut watched_dirs)?;
        }
    }
}

/// Trailing-edge debounce: fires once a burst of changes has been quiet
/// for `quiet`
#[derive(Debug)]
struct Debouncer {
    quiet: Duration,
    pending: Option<Instant>,
}

impl Debouncer {
    fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    fn touch(&mut self, now: Instant) {
        self.pending = Some(now);
    }

    /// True at most once per burst
    fn ready(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(last) if now.duration_since(last) >= self.quiet => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }
}

fn watch_dirs(
    watcher: &mut impl notify::Watcher,
    files: &FxHashSet<PathBuf>,
    watched: &mut FxHashSet<PathBuf>,
) -> anyhow::Result<()> {
    for dir in files.iter().filter_map(|file| file.parent()) {
        if watched.insert(dir.to_path_buf()) {
            watcher.watch(dir, notify::RecursiveMode::NonRecursive)?;
            debug!("Watching {}", dir.display());
        }
    }
    Ok(())
}
