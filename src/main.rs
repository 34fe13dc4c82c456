use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use freight_presolve::{Presolve, ScenarioConfig};


#[derive(Parser)]
#[command(name = "freight-presolve")]
#[command(about = "Weights a freight network and computes the shortest path edge restriction",
          long_about = None)]
struct Cli {
    /// Scenario config yaml
    config: PathBuf,

    /// Write the output tables here instead of the config's output_dir
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let cfg = ScenarioConfig::from_file(&cli.config)?;
    let presolve = Presolve::from_cfg(&cfg)?;
    let results = presolve.run()?;

    let output_dir = cli.output_dir.unwrap_or_else(|| cfg.output_dir.clone());
    results.write(presolve.network(), &output_dir)?;

    println!("commodities: {}", presolve.catalog().commodities.len());
    println!("OD pairs: {}", results.od_pairs.len());
    if results.ndr_enabled {
        println!("routed: {}", results.num_routes());
        println!("unreachable: {}", results.num_unreachable());
    } else {
        println!("shortest path restriction off, all {} edges eligible",
                 results.routes.shortest_edges.len());
    }
    Ok(())
}
