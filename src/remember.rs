// remember.rs - "Remember me" pre-fill file
//
// The file holds the login and the password as two plaintext lines. It only
// serves to pre-fill the form and is never used for authentication.

use std::fs;
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RememberedCredentials {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct RememberFile {
    path: PathBuf,
}

impl RememberFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or malformed files mean "nothing remembered".
    pub fn load(&self) -> Option<RememberedCredentials> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!("Could not read {}: {}", self.path.display(), err);
                return None;
            }
        };

        let mut lines = content.lines();
        match (lines.next(), lines.next()) {
            (Some(login), Some(password)) if !login.is_empty() => Some(RememberedCredentials {
                login: login.to_string(),
                password: password.to_string(),
            }),
            _ => {
                debug!("Ignoring malformed {}", self.path.display());
                None
            }
        }
    }

    pub fn save(&self, login: &str, password: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&self.path)?;
        // Files left by older versions keep their mode otherwise
        #[cfg(unix)]
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
        file.write_all(format!("{}\n{}", login, password).as_bytes())
    }

    pub fn forget(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_file_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let file = RememberFile::new(tmp.path().join(".temp.dat"));
        assert_eq!(file.load(), None);
        file.forget().unwrap();
    }

    #[test]
    fn test_save_writes_two_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let file = RememberFile::new(tmp.path().join("sub").join(".temp.dat"));
        file.save("alice", "secret").unwrap();

        assert_eq!(fs::read_to_string(file.path()).unwrap(), "alice\nsecret");
        assert_eq!(
            file.load(),
            Some(RememberedCredentials {
                login: "alice".to_string(),
                password: "secret".to_string(),
            })
        );

        file.forget().unwrap();
        assert_eq!(file.load(), None);
    }

    #[test]
    fn test_single_line_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let file = RememberFile::new(tmp.path().join(".temp.dat"));
        fs::write(file.path(), "alice").unwrap();
        assert_eq!(file.load(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_private() {
        let tmp = tempfile::tempdir().unwrap();
        let file = RememberFile::new(tmp.path().join(".temp.dat"));
        file.save("alice", "secret").unwrap();
        let mode = fs::metadata(file.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        fs::set_permissions(file.path(), fs::Permissions::from_mode(0o644)).unwrap();
        file.save("alice", "changed").unwrap();
        let mode = fs::metadata(file.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "alice\nchanged");
    }
}
