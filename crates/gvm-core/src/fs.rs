use std::io::Write;
use std::path::{Path, PathBuf};

/// Write `data` to `path` through a uniquely named sibling temp file and a
/// rename, so readers observe either the old or the new content.
///
/// # Errors
/// Returns an error if the temp file cannot be created, written or renamed.
pub fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let parent = parent_of(path)?;
    let file_name = file_name_of(path);

    let mut tmp_path = None;
    for candidate in temp_candidates(parent, file_name) {
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
        {
            Ok(mut file) => {
                let written = file.write_all(data).and_then(|()| file.sync_all());
                if let Err(error) = written {
                    let _ = std::fs::remove_file(&candidate);
                    return Err(error);
                }
                tmp_path = Some(candidate);
                break;
            }
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(error) => return Err(error),
        }
    }

    let Some(tmp_path) = tmp_path else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "failed to create unique temp file",
        ));
    };

    if let Err(error) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(error);
    }

    Ok(())
}

/// Point the symlink at `link` to `target`, replacing any previous link in a
/// single rename.
///
/// # Errors
/// Returns an error if the temporary link cannot be created or renamed over
/// `link`.
pub fn replace_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    let parent = parent_of(link)?;
    let file_name = file_name_of(link);

    let mut tmp_link = None;
    for candidate in temp_candidates(parent, file_name) {
        match symlink_dir(target, &candidate) {
            Ok(()) => {
                tmp_link = Some(candidate);
                break;
            }
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(error) => return Err(error),
        }
    }

    let Some(tmp_link) = tmp_link else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "failed to create unique temp link",
        ));
    };

    if let Err(error) = std::fs::rename(&tmp_link, link) {
        let _ = std::fs::remove_file(&tmp_link);
        return Err(error);
    }

    Ok(())
}

/// Remove a file or symlink, treating "already gone" as success.
///
/// # Errors
/// Returns any error other than `NotFound`.
pub fn remove_file_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(error) if error.kind() != std::io::ErrorKind::NotFound => Err(error),
        _ => Ok(()),
    }
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

fn parent_of(path: &Path) -> std::io::Result<&Path> {
    path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no parent")
    })
}

fn file_name_of(path: &Path) -> &str {
    path.file_name()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("gvm")
}

fn temp_candidates<'a>(
    parent: &'a Path,
    file_name: &'a str,
) -> impl Iterator<Item = PathBuf> + 'a {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    let pid = std::process::id();

    (0..16_u8).map(move |attempt| {
        parent.join(format!(".{file_name}.{pid}.{timestamp}.{attempt}.tmp"))
    })
}
