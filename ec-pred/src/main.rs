//! Core module for EC number prediction
//! Alejandro Gonzales-Irribarren, 2025
//!
//! This binary predicts the Enzyme Commission class of every protein
//! in a FASTA file. Proteins are first scored against the six main EC
//! classes with pre-trained kernel models; confident main-class hits
//! then descend through up to three levels of subclasses. Scores from
//! the spmap, blast and pepstats feature pipelines can be used alone or
//! fused with fixed per-class weights. The final report lists, for each
//! protein with at least 40 residues, its deepest confident EC number,
//! "non Enzyme" or "no Prediction", together with a confidence score.

use clap::Parser;
use config::ArgCheck;
use log::{error, info, Level};
use simple_logger::init_with_level;

use ec_pred::cli::Args;
use ec_pred::core::predict_enzymes;

fn main() {
    let start = std::time::Instant::now();
    if let Err(e) = init_with_level(Level::Info) {
        eprintln!("Cannot initialize logger: {}", e);
    }

    let args: Args = Args::parse();

    args.check().unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    predict_enzymes(args).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    let elapsed = start.elapsed();
    info!("Elapsed time: {:.3?}", elapsed);
}
