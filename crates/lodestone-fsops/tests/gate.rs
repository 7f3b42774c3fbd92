use std::fs;

use lodestone_core::JobId;
use lodestone_fsops::{DownloadGate, FsOpsError};

fn job() -> JobId {
    JobId::from("abcdef0123456789abcdef0123456789abcdef01")
}

#[tokio::test]
async fn contained_files_resolve_to_canonical_paths() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    fs::create_dir_all(dir.path().join("LinuxISO"))?;
    fs::write(dir.path().join("LinuxISO/disc.iso"), b"iso")?;

    let gate = DownloadGate::open(dir.path()).await?;
    let resolved = gate.resolve(&job(), "LinuxISO/disc.iso").await?;
    assert!(resolved.starts_with(gate.root()));
    assert!(resolved.ends_with("LinuxISO/disc.iso"));
    assert!(gate.root_writable().await);
    Ok(())
}

#[tokio::test]
async fn traversal_is_forbidden_whether_or_not_target_exists() -> Result<(), Box<dyn std::error::Error>> {
    let outer = tempfile::tempdir()?;
    let root = outer.path().join("downloads/nested");
    fs::write(outer.path().join("secret"), b"top secret")?;

    let gate = DownloadGate::open(&root).await?;
    for requested in ["../../secret", "../../missing", "/etc/passwd"] {
        let result = gate.resolve(&job(), requested).await;
        assert!(
            matches!(result, Err(FsOpsError::Forbidden { .. })),
            "{requested}: {result:?}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn missing_contained_file_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let gate = DownloadGate::open(dir.path()).await?;
    let result = gate.resolve(&job(), "not/there.bin").await;
    assert!(matches!(result, Err(FsOpsError::NotFound { .. })));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn symlink_escapes_are_forbidden() -> Result<(), Box<dyn std::error::Error>> {
    let outer = tempfile::tempdir()?;
    let root = outer.path().join("downloads");
    fs::create_dir_all(&root)?;
    fs::write(outer.path().join("secret"), b"top secret")?;
    std::os::unix::fs::symlink(outer.path().join("secret"), root.join("innocent"))?;

    let gate = DownloadGate::open(&root).await?;
    let result = gate.resolve(&job(), "innocent").await;
    assert!(matches!(result, Err(FsOpsError::Forbidden { .. })));
    Ok(())
}
