use crate::error::Res;
use anyhow::Context;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Write a file.
pub(crate) async fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Res<()> {
    let path = path.as_ref();
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Unable to write to {}", path.display()))
}

/// Write a file that holds secrets. On Unix the file is only readable by its owner.
pub(crate) async fn write_secret(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Res<()> {
    let path = path.as_ref();
    write(path, contents).await?;

    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, Permissions::from_mode(0o600))
            .await
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

/// Read a file to a `String`.
pub(crate) async fn read(path: &Path) -> Res<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file at {}", path.display()))
}

/// Deserialize a JSON file into type `T`.
pub(crate) async fn deserialize<T>(path: &Path) -> Res<T>
where
    T: DeserializeOwned,
{
    let content = read(path).await?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON file at {}", path.display()))
}

/// Create a directory and any missing parents.
pub(crate) async fn make_dir(path: impl AsRef<Path>) -> Res<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path)
        .await
        .with_context(|| format!("Unable to create directory at {}", path.display()))
}

/// Resolve `path` to an absolute path with no symlinks. The path must exist.
pub(crate) async fn canonicalize(path: impl AsRef<Path>) -> Res<PathBuf> {
    let path = path.as_ref();
    tokio::fs::canonicalize(path)
        .await
        .with_context(|| format!("Unable to canonicalize the path {}", path.display()))
}

/// Copy a file from `from` to `to`.
pub(crate) async fn copy(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Res<()> {
    let (from, to) = (from.as_ref(), to.as_ref());
    tokio::fs::copy(from, to).await.with_context(|| {
        format!(
            "Unable to copy file from '{}' to '{}'",
            from.display(),
            to.display()
        )
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_secret_permissions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        write_secret(&path, "{}").await.unwrap();
        assert_eq!(read(&path).await.unwrap(), "{}");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_deserialize_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        write(&path, "{ not json").await.unwrap();
        let err = deserialize::<serde_json::Value>(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }
}
