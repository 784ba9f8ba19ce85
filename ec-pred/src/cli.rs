use clap::Parser;
use config::{ArgCheck, MIN_THREADS};

use std::path::PathBuf;

use crate::types::Mode;

#[derive(Parser, Debug)]
#[command(version, about = "Predict EC numbers of protein sequences", long_about = None)]
pub struct Args {
    #[arg(
        short = 'm',
        long = "method",
        required = true,
        value_enum,
        value_name = "METHOD",
        help = "Prediction method: blast, spmap, pepstats or weighted"
    )]
    pub method: Mode,

    #[arg(
        short = 'i',
        long = "input",
        required = true,
        value_name = "PATH",
        help = "Path to protein FASTA file"
    )]
    pub input: PathBuf,

    #[arg(
        short = 'l',
        long = "library",
        required = true,
        value_name = "DIR",
        help = "Path to the pre-trained model library [EC/ and subclasses/]"
    )]
    pub library: PathBuf,

    #[arg(
        short = 'f',
        long = "features",
        required = false,
        value_name = "DIR",
        help = "Directory with blast/pepstats vectors as <class>/<method>.vec"
    )]
    pub features: Option<PathBuf>,

    #[arg(
        short = 'o',
        long = "output",
        required = false,
        value_name = "PATH",
        help = "Output file [prints to stdout if not given]"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        short = 't',
        long = "threads",
        help = "Number of threads",
        value_name = "THREADS",
        default_value_t = num_cpus::get()
    )]
    pub threads: usize,
}

impl Args {
    /// thread budget, values below the minimum fall back to all cores
    pub fn threads(&self) -> usize {
        if self.threads < MIN_THREADS {
            num_cpus::get()
        } else {
            self.threads
        }
    }
}

impl ArgCheck for Args {
    fn get_input(&self) -> &PathBuf {
        &self.input
    }

    fn get_library(&self) -> &PathBuf {
        &self.library
    }

    fn get_features(&self) -> Option<&PathBuf> {
        self.features.as_ref()
    }

    fn needs_features(&self) -> bool {
        self.method.needs_features()
    }
}
