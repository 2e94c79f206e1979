pub mod file;
pub mod stdin;

use proforma_core::AnalysisSettings;
use serde::de::DeserializeOwned;

/// Deserialise a command input from `--input` or piped stdin.
pub fn read_input<T: DeserializeOwned>(
    path: Option<&str>,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return file::read_structured(path);
    }
    match stdin::read_stdin()? {
        Some(data) => Ok(serde_json::from_value(data)?),
        None => Err("--input <file.json> or stdin required".into()),
    }
}

/// Like [`read_input`], but `None` when neither a file nor stdin is given,
/// so the command can fall back to its individual flags.
pub fn try_read_input<T: DeserializeOwned>(
    path: Option<&str>,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(Some(file::read_structured(path)?));
    }
    match stdin::read_stdin()? {
        Some(data) => Ok(Some(serde_json::from_value(data)?)),
        None => Ok(None),
    }
}

/// Settings from `--config`, or the defaults.
pub fn load_settings(path: Option<&str>) -> Result<AnalysisSettings, Box<dyn std::error::Error>> {
    let settings = match path {
        Some(path) => {
            tracing::debug!(path, "loading analysis settings");
            file::read_structured::<AnalysisSettings>(path)?
        }
        None => AnalysisSettings::default(),
    };
    settings.validate()?;
    Ok(settings)
}
