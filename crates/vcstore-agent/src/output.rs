use std::io::Write;
use std::path::Path;

use anyhow::Context;

/// Hands the data source to the store's translation proxy.
///
/// Writes to `path` (owner read/write only) when given, otherwise prints it
/// on stdout.
pub fn publish_data_source(path: Option<&Path>, data_source: &str) -> anyhow::Result<()> {
    let Some(path) = path else {
        println!("{data_source}");
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    // `mode` only applies to newly created files.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to restrict {}", path.display()))?;
    }

    file.write_all(data_source.as_bytes())
        .and_then(|()| file.sync_all())
        .with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), "Data source written");
    Ok(())
}
