use super::schema::{EstimationResult, MitigationMeasure};
use super::views::DownloadKind;
use serde::Serialize;

/// A file offered for download alongside a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadArtifact {
    pub file_name: String,
    pub content_type: &'static str,
    pub body: String,
}

#[derive(Debug)]
pub enum ExportError {
    Csv(csv::Error),
    Encoding(std::string::FromUtf8Error),
    Flush(String),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Csv(err) => write!(f, "failed to write measures CSV: {}", err),
            ExportError::Encoding(err) => write!(f, "measures CSV is not valid UTF-8: {}", err),
            ExportError::Flush(err) => write!(f, "failed to flush measures CSV: {}", err),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Csv(err) => Some(err),
            ExportError::Encoding(err) => Some(err),
            ExportError::Flush(_) => None,
        }
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<std::string::FromUtf8Error> for ExportError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::Encoding(err)
    }
}

/// Build the requested artifact, or `None` when the result does not carry it.
pub fn artifact(
    result: &EstimationResult,
    kind: DownloadKind,
) -> Result<Option<DownloadArtifact>, ExportError> {
    let artifact = match kind {
        DownloadKind::Step2Memo => result.step2_memo_pack.as_ref().map(|body| DownloadArtifact {
            file_name: format!("step2_memo_{}.txt", file_stem(&result.request_id)),
            content_type: "text/plain; charset=utf-8",
            body: body.clone(),
        }),
        DownloadKind::RefNoisePack => result.ref_noise_pack.as_ref().map(|body| DownloadArtifact {
            file_name: format!("ref_noise_pack_{}.txt", file_stem(&result.request_id)),
            content_type: "text/plain; charset=utf-8",
            body: body.clone(),
        }),
        DownloadKind::MeasuresCsv => {
            if result.measures().next().is_none() {
                None
            } else {
                Some(DownloadArtifact {
                    file_name: format!("mitigation_measures_{}.csv", file_stem(&result.request_id)),
                    content_type: "text/csv; charset=utf-8",
                    body: measures_csv(result)?,
                })
            }
        }
    };

    Ok(artifact)
}

/// The request id as it may appear in a file name or a `Content-Disposition`
/// header: anything outside `[A-Za-z0-9._-]` becomes `_`.
fn file_stem(request_id: &str) -> String {
    request_id
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Serialize)]
struct MeasureRow<'a> {
    group: &'static str,
    id: &'a str,
    title: &'a str,
    reduction_db: Option<f64>,
    applicable: bool,
    feasibility: &'static str,
    cost: &'static str,
    implementation_time: &'a str,
    reason: &'a str,
}

impl<'a> MeasureRow<'a> {
    fn new(group: &'static str, measure: &'a MitigationMeasure) -> Self {
        Self {
            group,
            id: &measure.id,
            title: &measure.title,
            reduction_db: measure.reduction_db,
            applicable: measure.applicable,
            feasibility: measure.feasibility.map_or("", |value| value.label()),
            cost: measure.cost.map_or("", |value| value.label()),
            implementation_time: &measure.implementation_time,
            reason: measure.reason.as_deref().unwrap_or_default(),
        }
    }
}

/// Mitigation measures as CSV: standard rows first, then additional ones.
pub fn measures_csv(result: &EstimationResult) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let rows = result
        .standard_measures
        .iter()
        .map(|measure| MeasureRow::new("standard", measure))
        .chain(
            result
                .additional_measures
                .iter()
                .map(|measure| MeasureRow::new("additional", measure)),
        );
    for row in rows {
        writer.serialize(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Flush(err.error().to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result_with_packs() -> EstimationResult {
        serde_json::from_value(json!({
            "request_id": "abc123",
            "predicted_level_db": 60.0,
            "background_db": 45.0,
            "nml_db": 55.0,
            "exceed_background_db": 15.0,
            "exceed_nml_db": 5.0,
            "impact_band": "affected",
            "step2_memo_pack": "STEP 2 MEMO",
            "standard_measures": [
                {"id": "S1", "title": "Hoarding, 2.4m", "reduction_db": 5.0, "cost": "low"}
            ],
            "additional_measures": [
                {"id": "A1", "title": "Respite offer", "applicable": false, "reason": "No eligible receivers"}
            ]
        }))
        .expect("result parses")
    }

    #[test]
    fn packs_are_named_by_request_id() {
        let result = result_with_packs();
        let memo = artifact(&result, DownloadKind::Step2Memo)
            .expect("memo builds")
            .expect("memo present");
        assert_eq!(memo.file_name, "step2_memo_abc123.txt");
        assert_eq!(memo.body, "STEP 2 MEMO");

        let missing = artifact(&result, DownloadKind::RefNoisePack).expect("ref pack builds");
        assert!(missing.is_none());
    }

    #[test]
    fn request_ids_are_made_safe_for_file_names() {
        let mut result = result_with_packs();
        result.request_id = "../run/1\"\n2".to_string();

        let memo = artifact(&result, DownloadKind::Step2Memo)
            .expect("memo builds")
            .expect("memo present");
        assert_eq!(memo.file_name, "step2_memo_.._run_1__2.txt");

        let csv = artifact(&result, DownloadKind::MeasuresCsv)
            .expect("csv builds")
            .expect("csv present");
        assert_eq!(csv.file_name, "mitigation_measures_.._run_1__2.csv");
    }

    #[test]
    fn measures_csv_lists_standard_before_additional() {
        let csv = measures_csv(&result_with_packs()).expect("csv writes");
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "group,id,title,reduction_db,applicable,feasibility,cost,implementation_time,reason"
        );
        assert_eq!(lines[1], "standard,S1,\"Hoarding, 2.4m\",5.0,true,,Low,,");
        assert_eq!(
            lines[2],
            "additional,A1,Respite offer,,false,,,,No eligible receivers"
        );
    }
}
