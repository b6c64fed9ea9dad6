//! Subcommand implementations

use anyhow::{bail, Context, Result};
use gearview_core::{CommandDispatcher, GeneratedModel, ParamForm, ParamSet, PartCatalog, PartEntry};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::client::GenerationClient;

/// Parse a `name=value` override
pub fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got {:?}", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in {:?}", raw));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Complete parameter set for `entry`: catalog defaults with `overrides` applied
///
/// The whole set is validated the same way the viewer's form is.
pub fn build_params(entry: &PartEntry, overrides: &[(String, String)]) -> Result<ParamSet> {
    let mut form = ParamForm::new(&entry.id, &entry.field, &ParamSet::new());
    for (name, value) in overrides {
        let Some(row) = form.entries.iter_mut().find(|row| &row.field.name == name) else {
            let known: Vec<&str> = entry.field.iter().map(|f| f.name.as_str()).collect();
            bail!("{} has no parameter {:?} (known: {})", entry.id, name, known.join(", "));
        };
        row.text = value.clone();
    }
    Ok(form.submit()?)
}

/// Print the catalog
pub fn list_parts(catalog: &PartCatalog) {
    for part in &catalog.part {
        let model = part.model.as_deref().unwrap_or("-");
        println!("{} ({})  model: {}", part.id, part.label, model);
        for field in &part.field {
            println!(
                "    {:<12} {} [{} .. {}] default {}",
                field.name, field.label, field.min, field.max, field.default
            );
        }
        let phrases: Vec<&str> = catalog
            .keyword
            .iter()
            .filter(|k| k.part == part.id)
            .map(|k| k.phrase.as_str())
            .collect();
        if !phrases.is_empty() {
            println!("    keywords: {}", phrases.join(", "));
        }
    }
}

/// Dispatch a free-text command, generate it, and save the model
pub async fn generate(
    client: &GenerationClient,
    catalog: &PartCatalog,
    text: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let dispatch = CommandDispatcher::from_catalog(catalog).dispatch(text)?;
    info!(part = %dispatch.intent, command = %dispatch.command, "Generating");

    let response = client.generate(&dispatch.command).await?;
    let model = response.into_model(Some(dispatch.intent.as_str()))?;
    save_model(&model, output, dispatch.intent.as_str())
}

/// Regenerate a part with explicit parameters and save the model
pub async fn regenerate(
    client: &GenerationClient,
    catalog: &PartCatalog,
    part_type: &str,
    overrides: &[(String, String)],
    output: Option<PathBuf>,
) -> Result<()> {
    let entry = catalog
        .get(part_type)
        .with_context(|| format!("Unknown part type: {}", part_type))?;
    let params = build_params(entry, overrides)?;
    info!(part = %part_type, ?params, "Regenerating");

    let response = client.regenerate(part_type, &params).await?;
    let model = response.into_model(Some(part_type))?;
    save_model(&model, output, part_type)
}

fn save_model(model: &GeneratedModel, output: Option<PathBuf>, fallback_part: &str) -> Result<()> {
    let part_type = model.part_type.as_deref().unwrap_or(fallback_part);
    let path = output.unwrap_or_else(|| PathBuf::from(format!("{}.glb", part_type)));
    write_model(&path, &model.bytes)?;

    println!("Saved {} ({} bytes) to {}", part_type, model.bytes.len(), path.display());
    if let Some(params) = &model.params {
        for (name, value) in params {
            println!("    {} = {}", name, value);
        }
    }
    Ok(())
}

fn write_model(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gear() -> PartEntry {
        PartCatalog::default()
            .get("gear")
            .cloned()
            .expect("built-in catalog has a gear")
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("teeth = 30").unwrap(),
            ("teeth".to_string(), "30".to_string())
        );
        assert!(parse_assignment("teeth").is_err());
        assert!(parse_assignment("=30").is_err());
    }

    #[test]
    fn test_overrides_apply_on_defaults() {
        let entry = gear();
        let params = build_params(&entry, &[("teeth".to_string(), "30".to_string())]).unwrap();

        assert_eq!(params["teeth"], 30.0);
        assert_eq!(params.len(), entry.field.len());
        for field in entry.field.iter().filter(|f| f.name != "teeth") {
            assert_eq!(params[&field.name], field.default);
        }
    }

    #[test]
    fn test_invalid_override_rejects_everything() {
        let entry = gear();
        let err = build_params(&entry, &[("teeth".to_string(), "many".to_string())]).unwrap_err();
        assert!(err.to_string().contains("not a number"));

        let err = build_params(&entry, &[("spokes".to_string(), "4".to_string())]).unwrap_err();
        assert!(err.to_string().contains("spokes"));
    }

    #[test]
    fn test_write_model() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("gear.glb");
        write_model(&path, b"glTF").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"glTF");
    }
}
