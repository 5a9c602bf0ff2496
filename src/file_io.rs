use std::io;
use std::path::Path;

/// Writes `data` to `path` atomically.
///
/// The bytes land in a `.part` sibling first and are renamed over the
/// destination, so a failed or interrupted download never leaves a partial
/// output file behind. The file ends up mode 0o644 on Unix.
pub async fn write_file_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "output path has no file name"))?;
    let mut part_name = file_name.to_os_string();
    part_name.push(".part");
    let part_path = path.with_file_name(part_name);

    tokio::fs::write(&part_path, data).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&part_path, std::fs::Permissions::from_mode(0o644)).await?;
    }
    if let Err(err) = tokio::fs::rename(&part_path, path).await {
        let _ = tokio::fs::remove_file(&part_path).await;
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_exact_contents_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.bin");
        let data: Vec<u8> = (0u8..=255).cycle().take(5000).collect();

        write_file_atomic(&target, &data).await.unwrap();

        assert_eq!(tokio::fs::read(&target).await.unwrap(), data);
        assert!(!dir.path().join("out.bin.part").exists());
    }

    #[tokio::test]
    async fn overwrites_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.bin");
        tokio::fs::write(&target, b"old").await.unwrap();

        write_file_atomic(&target, b"new contents").await.unwrap();
        assert_eq!(tokio::fs::read(&target).await.unwrap(), b"new contents");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sets_expected_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.bin");
        write_file_atomic(&target, b"x").await.unwrap();
        let mode = tokio::fs::metadata(&target).await.unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
