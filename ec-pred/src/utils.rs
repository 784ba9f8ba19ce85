use config::{NON_ENZYME_LABEL, NO_PREDICTION_LABEL, REPORT_HEADER};

use crate::types::{Decision, PredictionRecord};

/// `id<TAB>label<TAB>confidence` for one protein
pub fn format_row(id: &str, record: &PredictionRecord) -> String {
    match record.final_decision() {
        Decision::NonEnzyme { confidence } => {
            format!("{}\t{}\t{:.2}", id, NON_ENZYME_LABEL, confidence)
        }
        Decision::NoPrediction => format!("{}\t{}\t{:.2}", id, NO_PREDICTION_LABEL, 0.0),
        Decision::Classified { class, confidence } => {
            format!("{}\t{}\t{:.2}", id, class, confidence)
        }
    }
}

/// header plus one row per record, in record order
pub fn format_report(records: &[(String, PredictionRecord)]) -> Vec<String> {
    let mut rows = Vec::with_capacity(records.len() + 1);
    rows.push(REPORT_HEADER.to_string());
    rows.extend(records.iter().map(|(id, record)| format_row(id, record)));
    rows
}
