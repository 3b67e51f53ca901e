use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use darkroom_graph::{PreviewInputs, ValidationReport};
use darkroom_store::{ListFilter, Pipeline};

use darkroom_cli::{
    activate_pipeline, create_pipeline, deactivate_pipeline, default_store_path, delete_pipeline,
    export_pipeline, import_pipeline, list_pipelines, pipeline_history, pipeline_version,
    preview_pipeline, show_pipeline, store_stats, update_pipeline, validate_pipeline,
};

#[derive(Parser)]
#[command(
    name = "darkroom",
    version,
    about = "Photo pipeline definition and validation utilities"
)]
struct Cli {
    /// Store file path (default: pipelines.json)
    #[arg(long, value_name = "PATH", global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Create(CreateArgs),
    List(ListArgs),
    Show(ShowArgs),
    Update(UpdateArgs),
    Delete(DeleteArgs),
    Validate(ValidateArgs),
    Activate(IdArgs),
    Deactivate(IdArgs),
    Preview(PreviewArgs),
    History(HistoryArgs),
    ShowVersion(ShowVersionArgs),
    Export(ExportArgs),
    Import(ImportArgs),
    Stats(StatsArgs),
}

#[derive(Parser)]
struct CreateArgs {
    /// Path to a YAML pipeline definition
    #[arg(long, value_name = "PATH", required = true)]
    definition: PathBuf,
    /// Change summary recorded in version history
    #[arg(long)]
    summary: Option<String>,
    /// Author recorded in version history
    #[arg(long)]
    changed_by: Option<String>,
    /// Output JSON instead of key=value lines
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct ListArgs {
    /// Only active pipelines
    #[arg(long, conflicts_with = "inactive")]
    active: bool,
    /// Only inactive pipelines
    #[arg(long)]
    inactive: bool,
    /// Only valid pipelines
    #[arg(long, conflicts_with = "invalid")]
    valid: bool,
    /// Only invalid pipelines
    #[arg(long)]
    invalid: bool,
    /// Output JSON instead of key=value lines
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct ShowArgs {
    /// Pipeline id
    #[arg(value_name = "ID")]
    id: u64,
    /// Output JSON instead of key=value lines
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct UpdateArgs {
    /// Pipeline id
    #[arg(value_name = "ID")]
    id: u64,
    /// Path to a YAML definition replacing the graph
    #[arg(long, value_name = "PATH")]
    definition: Option<PathBuf>,
    /// New pipeline name
    #[arg(long)]
    name: Option<String>,
    /// New description
    #[arg(long)]
    description: Option<String>,
    /// Change summary recorded in version history
    #[arg(long)]
    summary: Option<String>,
    /// Author recorded in version history
    #[arg(long)]
    changed_by: Option<String>,
    /// Reject the update unless the pipeline is still at this version
    #[arg(long, value_name = "VERSION")]
    expected_version: Option<u32>,
    /// Output JSON instead of key=value lines
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct DeleteArgs {
    /// Pipeline id
    #[arg(value_name = "ID")]
    id: u64,
}

#[derive(Parser)]
struct ValidateArgs {
    /// Pipeline id
    #[arg(value_name = "ID")]
    id: u64,
    /// Output JSON instead of key=value lines
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct IdArgs {
    /// Pipeline id
    #[arg(value_name = "ID")]
    id: u64,
}

#[derive(Parser)]
struct PreviewArgs {
    /// Pipeline id
    #[arg(value_name = "ID")]
    id: u64,
    /// Camera id fed into the capture pattern
    #[arg(long)]
    camera_id: Option<String>,
    /// Counter fed into the capture pattern
    #[arg(long)]
    counter: Option<String>,
    /// Output JSON instead of key=value lines
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct HistoryArgs {
    /// Pipeline id
    #[arg(value_name = "ID")]
    id: u64,
    /// Output JSON instead of key=value lines
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct ShowVersionArgs {
    /// Pipeline id
    #[arg(value_name = "ID")]
    id: u64,
    /// Version to show
    #[arg(value_name = "VERSION")]
    version: u32,
    /// Output JSON instead of key=value lines
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct ExportArgs {
    /// Pipeline id
    #[arg(value_name = "ID")]
    id: u64,
    /// Export a historical version instead of the current one
    #[arg(long, value_name = "VERSION")]
    version: Option<u32>,
    /// Output path (writes to stdout when omitted)
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,
}

#[derive(Parser)]
struct ImportArgs {
    /// Path to a YAML pipeline document
    #[arg(long, value_name = "PATH", required = true)]
    input: PathBuf,
    /// Author recorded in version history
    #[arg(long)]
    changed_by: Option<String>,
    /// Output JSON instead of key=value lines
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct StatsArgs {
    /// Output JSON instead of key=value lines
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    let store_path = cli.store.clone().unwrap_or_else(default_store_path);

    let result = match cli.command {
        Commands::Create(args) => run_create(&store_path, args),
        Commands::List(args) => run_list(&store_path, args),
        Commands::Show(args) => run_show(&store_path, args),
        Commands::Update(args) => run_update(&store_path, args),
        Commands::Delete(args) => run_delete(&store_path, args),
        Commands::Validate(args) => run_validate(&store_path, args),
        Commands::Activate(args) => run_activate(&store_path, args),
        Commands::Deactivate(args) => run_deactivate(&store_path, args),
        Commands::Preview(args) => run_preview(&store_path, args),
        Commands::History(args) => run_history(&store_path, args),
        Commands::ShowVersion(args) => run_show_version(&store_path, args),
        Commands::Export(args) => run_export(&store_path, args),
        Commands::Import(args) => run_import(&store_path, args),
        Commands::Stats(args) => run_stats(&store_path, args),
    };

    if let Err(err) = result {
        eprintln!("{}", err);
        std::process::exit(1);
    }
}

fn print_pipeline(pipeline: &Pipeline, json: bool) -> Result<(), String> {
    if json {
        let text = serde_json::to_string_pretty(pipeline)
            .map_err(|err| format!("json encode: {}", err))?;
        println!("{}", text);
        return Ok(());
    }
    println!("id={}", pipeline.id);
    println!("name={}", pipeline.name);
    if let Some(description) = pipeline.description.as_ref() {
        println!("description={}", description);
    }
    println!("version={}", pipeline.version);
    println!("nodes={}", pipeline.nodes.len());
    println!("edges={}", pipeline.edges.len());
    println!("is_active={}", pipeline.is_active);
    println!("is_valid={}", pipeline.is_valid);
    if let Some(errors) = pipeline.validation_errors.as_ref() {
        for error in errors {
            println!("validation_error={}", error);
        }
    }
    println!("updated_at={}", pipeline.updated_at);
    Ok(())
}

fn print_report(report: &ValidationReport, json: bool) -> Result<(), String> {
    if json {
        let text = serde_json::to_string_pretty(report)
            .map_err(|err| format!("json encode: {}", err))?;
        println!("{}", text);
        return Ok(());
    }
    println!("is_valid={}", report.is_valid);
    println!("error_count={}", report.errors.len());
    for error in &report.errors {
        println!("error={}", error);
        if let Some(suggestion) = error.suggestion.as_ref() {
            println!("  suggestion={}", suggestion);
        }
    }
    Ok(())
}

fn run_create(store_path: &PathBuf, args: CreateArgs) -> Result<(), String> {
    let pipeline = create_pipeline(
        store_path,
        &args.definition,
        args.summary,
        args.changed_by,
    )?;
    print_pipeline(&pipeline, args.json)
}

fn run_list(store_path: &PathBuf, args: ListArgs) -> Result<(), String> {
    let filter = ListFilter {
        is_active: flag_pair(args.active, args.inactive),
        is_valid: flag_pair(args.valid, args.invalid),
    };
    let pipelines = list_pipelines(store_path, filter)?;
    if args.json {
        let text = serde_json::to_string_pretty(&pipelines)
            .map_err(|err| format!("json encode: {}", err))?;
        println!("{}", text);
        return Ok(());
    }
    println!("count={}", pipelines.len());
    for pipeline in &pipelines {
        println!(
            "pipeline id={} name={:?} version={} active={} valid={}",
            pipeline.id, pipeline.name, pipeline.version, pipeline.is_active, pipeline.is_valid
        );
    }
    Ok(())
}

fn flag_pair(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn run_show(store_path: &PathBuf, args: ShowArgs) -> Result<(), String> {
    let pipeline = show_pipeline(store_path, args.id)?;
    print_pipeline(&pipeline, args.json)
}

fn run_update(store_path: &PathBuf, args: UpdateArgs) -> Result<(), String> {
    let pipeline = update_pipeline(
        store_path,
        args.id,
        args.definition.as_deref(),
        args.name,
        args.description,
        args.summary,
        args.changed_by,
        args.expected_version,
    )?;
    print_pipeline(&pipeline, args.json)
}

fn run_delete(store_path: &PathBuf, args: DeleteArgs) -> Result<(), String> {
    let deleted = delete_pipeline(store_path, args.id)?;
    println!("deleted={}", deleted);
    Ok(())
}

fn run_validate(store_path: &PathBuf, args: ValidateArgs) -> Result<(), String> {
    let report = validate_pipeline(store_path, args.id)?;
    print_report(&report, args.json)
}

fn run_activate(store_path: &PathBuf, args: IdArgs) -> Result<(), String> {
    let pipeline = activate_pipeline(store_path, args.id)?;
    println!("activated={}", pipeline.id);
    println!("name={}", pipeline.name);
    Ok(())
}

fn run_deactivate(store_path: &PathBuf, args: IdArgs) -> Result<(), String> {
    let pipeline = deactivate_pipeline(store_path, args.id)?;
    println!("deactivated={}", pipeline.id);
    Ok(())
}

fn run_preview(store_path: &PathBuf, args: PreviewArgs) -> Result<(), String> {
    let preview = preview_pipeline(
        store_path,
        args.id,
        &PreviewInputs {
            camera_id: args.camera_id,
            counter: args.counter,
        },
    )?;
    if args.json {
        let text = serde_json::to_string_pretty(&preview)
            .map_err(|err| format!("json encode: {}", err))?;
        println!("{}", text);
        return Ok(());
    }
    println!("base_filename={}", preview.base_filename);
    for file in &preview.expected_files {
        println!(
            "file={} optional={} path={}",
            file.filename, file.optional, file.path
        );
    }
    for termination in &preview.terminations {
        println!(
            "termination={} classification={}",
            termination.node_id, termination.classification
        );
    }
    Ok(())
}

fn run_history(store_path: &PathBuf, args: HistoryArgs) -> Result<(), String> {
    let entries = pipeline_history(store_path, args.id)?;
    if args.json {
        let text = serde_json::to_string_pretty(&entries)
            .map_err(|err| format!("json encode: {}", err))?;
        println!("{}", text);
        return Ok(());
    }
    println!("entries={}", entries.len());
    for entry in &entries {
        println!(
            "version={} valid={} created_at={} summary={} by={}",
            entry.version,
            entry.is_valid,
            entry.created_at,
            entry.change_summary.as_deref().unwrap_or("-"),
            entry.changed_by.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn run_show_version(store_path: &PathBuf, args: ShowVersionArgs) -> Result<(), String> {
    let pipeline = pipeline_version(store_path, args.id, args.version)?;
    print_pipeline(&pipeline, args.json)
}

fn run_export(store_path: &PathBuf, args: ExportArgs) -> Result<(), String> {
    let yaml = export_pipeline(store_path, args.id, args.version)?;
    match args.out {
        Some(path) => {
            fs::write(&path, yaml).map_err(|err| format!("write {}: {}", path.display(), err))?;
            println!("exported={}", path.display());
        }
        None => print!("{}", yaml),
    }
    Ok(())
}

fn run_import(store_path: &PathBuf, args: ImportArgs) -> Result<(), String> {
    let pipeline = import_pipeline(store_path, &args.input, args.changed_by)?;
    print_pipeline(&pipeline, args.json)
}

fn run_stats(store_path: &PathBuf, args: StatsArgs) -> Result<(), String> {
    let stats = store_stats(store_path)?;
    if args.json {
        let text = serde_json::to_string_pretty(&stats)
            .map_err(|err| format!("json encode: {}", err))?;
        println!("{}", text);
        return Ok(());
    }
    println!("total_pipelines={}", stats.total_pipelines);
    println!("valid_pipelines={}", stats.valid_pipelines);
    match (stats.active_pipeline_id, stats.active_pipeline_name.as_ref()) {
        (Some(id), Some(name)) => println!("active_pipeline={} name={}", id, name),
        _ => println!("active_pipeline=none"),
    }
    Ok(())
}
