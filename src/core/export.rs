// EveTranslator - core/export.rs
//
// CSV and JSON export of discovery registries.
// Core layer: writes to any Write trait object.

use crate::core::model::{GroupInfo, GroupRegistry, IdentityInfo, IdentityRegistry};
use crate::util::error::ExportError;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Both registries from one scan, as exported to JSON.
#[derive(Debug, Serialize)]
pub struct RegistryReport<'a> {
    pub identities: Vec<&'a IdentityInfo>,
    pub groups: Vec<&'a GroupInfo>,
}

impl<'a> RegistryReport<'a> {
    pub fn new(identities: &'a IdentityRegistry, groups: &'a GroupRegistry) -> Self {
        Self {
            identities: identities.iter().collect(),
            groups: groups.iter().collect(),
        }
    }
}

/// Export both registries as one CSV table, one row per entry.
///
/// Writes: kind, id, name, path, modified, created, system, active.
/// Columns that do not apply to a kind are left empty.
pub fn export_csv<W: Write>(
    identities: &IdentityRegistry,
    groups: &GroupRegistry,
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let csv_err = |e: csv::Error| ExportError::Csv {
        path: export_path.to_path_buf(),
        source: e,
    };
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record(["kind", "id", "name", "path", "modified", "created", "system", "active"])
        .map_err(csv_err)?;

    let mut count = 0;
    for info in identities.iter() {
        let path = info.latest_log_path.display().to_string();
        let modified = info.log_mtime.to_rfc3339();
        csv_writer
            .write_record([
                "identity",
                info.character_id.as_str(),
                info.character_name.as_str(),
                path.as_str(),
                modified.as_str(),
                "",
                info.system_name.as_deref().unwrap_or(""),
                bool_str(info.is_active),
            ])
            .map_err(csv_err)?;
        count += 1;
    }

    for info in groups.iter() {
        let path = info.log_path.display().to_string();
        let modified = info.log_mtime.to_rfc3339();
        let created = info.created_time.to_rfc3339();
        csv_writer
            .write_record([
                "group",
                info.fleet_id.as_str(),
                info.listener_name.as_str(),
                path.as_str(),
                modified.as_str(),
                created.as_str(),
                "",
                bool_str(info.is_active),
            ])
            .map_err(csv_err)?;
        count += 1;
    }

    csv_writer.flush().map_err(|e| ExportError::Io {
        path: export_path.to_path_buf(),
        source: e,
    })?;

    Ok(count)
}

/// Export both registries as a JSON object with `identities` and `groups`.
pub fn export_json<W: Write>(
    identities: &IdentityRegistry,
    groups: &GroupRegistry,
    writer: W,
    export_path: &Path,
) -> Result<usize, ExportError> {
    let report = RegistryReport::new(identities, groups);
    serde_json::to_writer_pretty(writer, &report).map_err(|e| ExportError::Json {
        path: export_path.to_path_buf(),
        source: e,
    })?;
    Ok(identities.len() + groups.len())
}

fn bool_str(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}
