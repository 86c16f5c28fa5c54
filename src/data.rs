use crate::spec::{ChartConfig, FitFunction};
use anyhow::{anyhow, bail, Context, Result};
use indexmap::IndexSet;
use serde_json::{Map, Value};
use std::io::Read;

impl ChartConfig {
    /// Parse and validate a JSON chart config
    pub fn from_json(text: &str) -> Result<Self> {
        let config: ChartConfig =
            serde_json::from_str(text).context("Failed to parse chart config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs the pipeline cannot give a meaning to
    pub fn validate(&self) -> Result<()> {
        let mut seen = IndexSet::new();
        for (i, spec) in self.specs.iter().enumerate() {
            if spec.id.is_empty() {
                bail!("Spec #{} has an empty id", i);
            }
            if !seen.insert(spec.id.as_str()) {
                bail!("Duplicate spec id '{}'", spec.id);
            }
            if spec.y_accessors.is_empty() {
                bail!("Spec '{}' declares no y accessors", spec.id);
            }
            if spec.y0_accessors.len() > spec.y_accessors.len() {
                bail!(
                    "Spec '{}' has {} y0 accessors but only {} y accessors",
                    spec.id,
                    spec.y0_accessors.len(),
                    spec.y_accessors.len()
                );
            }
            if spec.fit.function == FitFunction::Explicit && spec.fit.value.is_none() {
                bail!("Spec '{}' uses an explicit fit without a value", spec.id);
            }
        }
        Ok(())
    }

    /// Replace the dataset of one spec. Without an id the config must hold
    /// exactly one spec.
    pub fn set_spec_data(&mut self, spec_id: Option<&str>, records: Vec<Value>) -> Result<()> {
        let spec = match spec_id {
            Some(id) => self
                .specs
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(|| anyhow!("Spec '{}' not found in config", id))?,
            None => match self.specs.as_mut_slice() {
                [only] => only,
                specs => bail!(
                    "Config has {} specs, pass --spec to choose which one receives the data",
                    specs.len()
                ),
            },
        };
        spec.data = records;
        Ok(())
    }
}

/// Infer a JSON value from a CSV cell: integers and floats become numbers,
/// an empty cell becomes null, anything else stays a string.
fn infer_cell(cell: &str) -> Value {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(cell.to_string()))
}

/// Read CSV with a header row into one JSON object per row
pub fn records_from_csv<R: Read>(reader: R) -> Result<Vec<Value>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader
        .headers()
        .context("Failed to read CSV headers")?
        .clone();

    let mut records = Vec::new();
    for (i, result) in csv_reader.records().enumerate() {
        let row = result.with_context(|| format!("Failed to read CSV row {}", i + 1))?;
        let object: Map<String, Value> = headers
            .iter()
            .zip(row.iter())
            .map(|(header, cell)| (header.to_string(), infer_cell(cell)))
            .collect();
        records.push(Value::Object(object));
    }
    Ok(records)
}

/// Parse a JSON array of records. Elements are kept as they are; the
/// pipeline drops the ones it cannot use.
pub fn records_from_json(text: &str) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_str(text).context("Failed to parse JSON records")?;
    match value {
        Value::Array(records) => Ok(records),
        _ => Err(anyhow!("Input data must be a JSON array of records")),
    }
}
