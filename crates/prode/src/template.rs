// Bracket template loading from the edition's TOML file.
//
// Layout: a top-level `edition` string followed by one `[[match]]` table per
// leg. Participants are inline tables, `{ team = "..." }` or `{ slot = "..." }`.

use std::path::Path;

use prode_core::bracket::BracketTemplate;
use prode_core::error::TemplateError;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum TemplateLoadError {
    #[error("failed to read template {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse template {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("inconsistent template {path}: {source}")]
    Inconsistent {
        path: String,
        source: TemplateError,
    },
}

/// Parse and validate a template from TOML text.
pub fn parse_template(text: &str) -> Result<BracketTemplate, TemplateLoadError> {
    parse_named(text, "<inline>")
}

/// Load and validate the template at `path`. A template that fails the
/// slot-graph checks is rejected here, before any resolution runs.
pub fn load_template(path: &Path) -> Result<BracketTemplate, TemplateLoadError> {
    let text = std::fs::read_to_string(path).map_err(|e| TemplateLoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let template = parse_named(&text, &path.display().to_string())?;
    info!(
        "Loaded template '{}' with {} matches from {}",
        template.edition,
        template.matches.len(),
        path.display()
    );
    Ok(template)
}

fn parse_named(text: &str, name: &str) -> Result<BracketTemplate, TemplateLoadError> {
    let template: BracketTemplate = toml::from_str(text).map_err(|e| TemplateLoadError::Parse {
        path: name.to_string(),
        source: e,
    })?;
    template
        .ties()
        .map_err(|e| TemplateLoadError::Inconsistent {
            path: name.to_string(),
            source: e,
        })?;
    Ok(template)
}
