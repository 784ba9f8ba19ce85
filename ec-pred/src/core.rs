use anyhow::{anyhow, Result};
use config::{write_rows, MIN_PROTEIN_LENGTH};
use ec_spmap::{FastaCache, SequenceStore};
use ec_svm::ModelCache;
use log::info;

use std::sync::Arc;

use crate::calibrate::ReferenceCache;
use crate::cli::Args;
use crate::features::{FeatureProducer, ProfileProducer, VectorFileProducer};
use crate::library::{Library, LibraryTables};
use crate::pipeline::Pipeline;
use crate::scheduler::Scheduler;
use crate::scorer::{MethodScorer, SvmScorer};
use crate::types::Method;
use crate::utils::format_report;

pub fn predict_enzymes(args: Args) -> Result<()> {
    info!("Running in {:?} mode with args: {:?}", args.method, &args);

    let library = Library::new(&args.library);
    let tables = LibraryTables::load(library.clone())?;

    let sequences = FastaCache::new().get(&args.input)?;
    let proteins = sequences.included_ids(MIN_PROTEIN_LENGTH);
    info!(
        "{} of {} proteins have at least {} residues",
        proteins.len(),
        sequences.len(),
        MIN_PROTEIN_LENGTH
    );

    let models = Arc::new(ModelCache::new());
    let references = Arc::new(ReferenceCache::new());

    let scorers = args
        .method
        .methods()
        .into_iter()
        .map(|method| -> Result<Box<dyn MethodScorer>> {
            let producer: Box<dyn FeatureProducer> = match method {
                Method::Spmap => Box::new(ProfileProducer::new(
                    library.clone(),
                    sequences.clone() as Arc<dyn SequenceStore>,
                )),
                Method::Blast | Method::Pepstats => {
                    let features = args.features.clone().ok_or_else(|| {
                        anyhow!("--features is required for {} vectors", method)
                    })?;
                    Box::new(VectorFileProducer::new(method, features, library.clone()))
                }
            };

            Ok(Box::new(SvmScorer::new(
                producer,
                library.clone(),
                Arc::clone(&models),
                Arc::clone(&references),
            )))
        })
        .collect::<Result<Vec<_>>>()?;

    let scheduler = Scheduler::new(args.threads())?;
    let pipeline = Pipeline::new(
        scheduler,
        Box::new(tables),
        scorers,
        args.method.is_fused(),
    );

    let records = pipeline.run(&proteins)?;
    info!(
        "{} models and {} reference sets loaded",
        models.len(),
        references.len()
    );

    // INFO: rows carry the header text as written, not the lookup id
    let records = records
        .into_iter()
        .map(|(id, record)| {
            let name = sequences.header(&id).map_or_else(|| id.clone(), str::to_string);
            (name, record)
        })
        .collect::<Vec<_>>();

    let rows = format_report(&records);
    write_rows(&rows, args.output.as_deref())?;

    Ok(())
}
