use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use dockwizard::{
    Config, GridAxis, GridMode, HeadlessUi, Result, RunOutcome, SceneViewer, ScoringMethod, SearchMode,
    WizardSession,
};

/// Walk a docking server through receptor, ligands, parameters and a run.
#[derive(Parser)]
#[command(name = "dockwizard", version)]
struct Cli {
    /// TOML settings file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Server base URL; wins over the config file and DOCKWIZARD_SERVER_URL.
    #[arg(long)]
    server: Option<String>,
    #[arg(long)]
    project: String,
    /// Receptor structure (.pdb).
    #[arg(long)]
    receptor: PathBuf,
    /// Ligand files or zip archives; repeat or list several.
    #[arg(long = "ligand", required = true, num_args = 1..)]
    ligands: Vec<PathBuf>,
    /// Build the box around these residues (chain:number, comma separated)
    /// instead of the whole receptor.
    #[arg(long, value_delimiter = ',')]
    residues: Vec<String>,
    /// Grid center as x,y,z, replacing the generated one.
    #[arg(long, value_parser = parse_triple, allow_hyphen_values = true)]
    center: Option<[f64; 3]>,
    /// Grid size as x,y,z in Å, replacing the generated one.
    #[arg(long, value_parser = parse_triple, allow_hyphen_values = true)]
    size: Option<[f64; 3]>,
    #[arg(long, default_value = "balanced")]
    search_mode: SearchMode,
    /// Overrides the search mode's preset.
    #[arg(long)]
    exhaustiveness: Option<u32>,
    #[arg(long, default_value_t = 9)]
    num_modes: u32,
    #[arg(long)]
    gpu: bool,
    /// Only honoured with --gpu.
    #[arg(long, default_value = "vina")]
    scoring: ScoringMethod,
    /// Where to save the zipped results.
    #[arg(long)]
    results: Option<PathBuf>,
    /// Where to save the score table.
    #[arg(long)]
    scores: Option<PathBuf>,
}

fn parse_triple(s: &str) -> std::result::Result<[f64; 3], String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("'{v}': {e}")))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    match values.as_slice() {
        [x, y, z] => Ok([*x, *y, *z]),
        _ => Err(format!("expected three comma-separated numbers, got '{s}'")),
    }
}

async fn run(cli: Cli) -> Result<RunOutcome> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.apply_env();
    if let Some(server) = cli.server {
        config.server_url = server;
    }

    let ui = Arc::new(HeadlessUi::new(true));
    let viewer = Arc::new(SceneViewer::new());
    let mut session = WizardSession::new(config, ui, viewer)?;

    session.create_project(&cli.project).await?;
    session.upload_receptor(Some(&cli.receptor)).await?;
    if !cli.residues.is_empty() {
        session.generate_grid(&GridMode::targeted(&cli.residues)?).await?;
    }

    if let Some([x, y, z]) = cli.center {
        session.on_slider_change(GridAxis::CenterX, x)?;
        session.on_slider_change(GridAxis::CenterY, y)?;
        session.on_slider_change(GridAxis::CenterZ, z)?;
    }
    if let Some([x, y, z]) = cli.size {
        session.on_slider_change(GridAxis::SizeX, x)?;
        session.on_slider_change(GridAxis::SizeY, y)?;
        session.on_slider_change(GridAxis::SizeZ, z)?;
    }
    session.prepare_receptor().await?;

    session.upload_ligands(&cli.ligands).await?;

    session.set_search_mode(cli.search_mode);
    if let Some(exhaustiveness) = cli.exhaustiveness {
        session.set_exhaustiveness(exhaustiveness)?;
    }
    session.set_num_modes(cli.num_modes)?;
    session.set_gpu(cli.gpu);
    if cli.gpu {
        session.set_scoring_method(cli.scoring)?;
    } else if cli.scoring != ScoringMethod::Vina {
        log::warn!("--scoring {} needs --gpu; using vina", cli.scoring);
    }
    session.submit_params().await?;

    session.start_run().await?;
    let outcome = session.wait_for_run().await?;

    if outcome == RunOutcome::Completed {
        if let Some(path) = &cli.results {
            session.client().download_results(path).await?;
        }
        if let Some(path) = &cli.scores {
            session.client().download_scores(path).await?;
        }
    }
    Ok(outcome)
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()).await {
        Ok(RunOutcome::Completed) => log::info!("docking run completed"),
        Ok(outcome) => {
            log::error!("docking run did not complete: {outcome:?}");
            std::process::exit(1);
        }
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    }
}
