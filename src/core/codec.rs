//! Legacy JSON blobs for templates and measurement lists
//!
//! Part type templates travel as `{"dimensoes":[...]}` and measurement lists
//! as a bare JSON array of records. Malformed input is an error, never an
//! empty list.

use serde::{Deserialize, Serialize};

use crate::core::store::StoreResult;
use crate::entities::{DimensionSpec, MeasurementRecord};

#[derive(Serialize, Deserialize)]
struct TemplateBlob {
    dimensoes: Vec<DimensionSpec>,
}

#[derive(Serialize)]
struct TemplateBlobRef<'a> {
    dimensoes: &'a [DimensionSpec],
}

/// Encode a template as the `metadados_cotas` blob
pub fn encode_template(specs: &[DimensionSpec]) -> StoreResult<String> {
    Ok(serde_json::to_string(&TemplateBlobRef { dimensoes: specs })?)
}

/// Decode a `metadados_cotas` blob
pub fn decode_template(json: &str) -> StoreResult<Vec<DimensionSpec>> {
    let blob: TemplateBlob = serde_json::from_str(json)?;
    Ok(blob.dimensoes)
}

/// Encode measurements as the `medicoes_json` blob
pub fn encode_measurements(records: &[MeasurementRecord]) -> StoreResult<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Decode a `medicoes_json` blob
pub fn decode_measurements(json: &str) -> StoreResult<Vec<MeasurementRecord>> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::StoreError;
    use crate::entities::Verdict;

    #[test]
    fn test_decode_template_blob() {
        let json = r#"{"dimensoes":[
            {"nome":"comprimento","label":"Comprimento","tipo":"number","unidade":"mm","tolerancia":0.1,"valorPadrao":50.0},
            {"nome":"acabamento","label":"Acabamento","tipo":"text","unidade":""}
        ]}"#;
        let specs = decode_template(json).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].range(), Some((50.0, 0.1)));
        assert_eq!(specs[1].kind.as_deref(), Some("text"));
        assert_eq!(specs[1].range(), None);

        let encoded = encode_template(&specs).unwrap();
        assert!(encoded.starts_with(r#"{"dimensoes":["#));
        assert!(encoded.contains(r#""valorPadrao":50.0"#));
    }

    #[test]
    fn test_decode_measurements_accepts_naive_dates() {
        let json = r#"[
            {"id":1,"data":"2024-05-02T14:03:11.512","pecaNumero":1,"dimensoes":{"comprimento":50.05},"observacoes":"","status":"APROVADO"},
            {"id":2,"data":"2024-05-02T14:05:00Z","pecaNumero":2,"dimensoes":{"comprimento":50.5},"status":"REPROVADO"}
        ]"#;
        let records = decode_measurements(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].verdict, Verdict::Approved);
        assert_eq!(records[1].piece_number, 2);
        assert_eq!(records[1].note, None);
    }

    #[test]
    fn test_malformed_blobs_are_errors() {
        assert!(matches!(
            decode_template("not json"),
            Err(StoreError::Codec(_))
        ));
        assert!(decode_template(r#"{"cotas":[]}"#).is_err());
        assert!(decode_measurements(r#"[{"id":1}]"#).is_err());
        assert!(decode_measurements("").is_err());
    }

    #[test]
    fn test_empty_list_is_valid() {
        assert!(decode_measurements("[]").unwrap().is_empty());
        assert_eq!(encode_measurements(&[]).unwrap(), "[]");
    }
}
