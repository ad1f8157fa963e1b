//! Markdown documentation for registered pipelines.

use super::spec::{EndpointDescriptor, PipelineSpec};
use crate::error::Result;
use serde::Serialize;
use std::fmt::Write as _;

/// `fill_nulls` -> `Fill Nulls`
fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn render_endpoint(md: &mut String, heading: &str, endpoint: &EndpointDescriptor) -> Result<()> {
    let _ = writeln!(md, "## {heading}\n");
    let _ = writeln!(md, "- **Type**: {}", endpoint.kind);
    if endpoint.settings.is_empty() {
        md.push_str("- **Configuration**: *none*\n\n");
    } else {
        let json = serde_json::to_string_pretty(&endpoint.settings)?;
        let _ = writeln!(md, "- **Configuration**:\n\n```json\n{json}\n```\n");
    }
    Ok(())
}

/// One numbered section per directive, listing every field except `type`.
fn render_directives<T: Serialize>(
    md: &mut String,
    heading: &str,
    items: &[T],
) -> Result<()> {
    let _ = writeln!(md, "## {heading} ({})\n", items.len());
    if items.is_empty() {
        md.push_str("*None configured.*\n\n");
        return Ok(());
    }

    for (i, item) in items.iter().enumerate() {
        let value = serde_json::to_value(item)?;
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or("unknown");
        let _ = writeln!(md, "### {}. {}\n", i + 1, title_case(kind));

        if let Some(fields) = value.as_object() {
            for (key, field) in fields.iter().filter(|(k, _)| k.as_str() != "type") {
                let shown = match field {
                    serde_json::Value::String(s) => s.clone(),
                    serde_json::Value::Null => "all columns".to_owned(),
                    other => other.to_string(),
                };
                let _ = writeln!(md, "- **{}**: {shown}", title_case(key));
            }
        }
        md.push('\n');
    }
    Ok(())
}

/// Render a pipeline spec as Markdown: overview, source, destination, then
/// numbered transformations and quality checks.
pub fn render_markdown(spec: &PipelineSpec) -> Result<String> {
    let mut md = String::new();

    let _ = writeln!(md, "# {} Pipeline Documentation\n", spec.name);

    md.push_str("## Overview\n\n");
    let _ = writeln!(md, "- **Framework**: {}", spec.framework);
    let _ = writeln!(
        md,
        "- **Created**: {}",
        spec.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(md, "- **Schedule**: {}", spec.schedule);
    let _ = writeln!(md, "- **State**: {}\n", spec.state);

    render_endpoint(&mut md, "Data Source", &spec.source)?;
    render_endpoint(&mut md, "Data Destination", &spec.destination)?;

    render_directives(&mut md, "Transformations", &spec.transformations)?;
    render_directives(&mut md, "Quality Checks", &spec.quality_checks)?;

    Ok(md)
}
