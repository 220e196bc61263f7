use crate::error::{GraduateError, Result};
use std::path::{Path, PathBuf};

/// Resolve the public key to hand to the remote for push access.
/// Tries `~/.ssh/id_ed25519.pub`, then `~/.ssh/id_rsa.pub`.
pub fn default_public_key() -> Result<PathBuf> {
    let home = home::home_dir().ok_or(GraduateError::HomeNotFound)?;
    find_public_key(&home.join(".ssh"))
}

fn find_public_key(ssh_dir: &Path) -> Result<PathBuf> {
    let candidates = [ssh_dir.join("id_ed25519.pub"), ssh_dir.join("id_rsa.pub")];
    candidates
        .into_iter()
        .find(|p| p.is_file())
        .ok_or(GraduateError::PublicKeyNotFound)
}

pub fn read_public_key(path: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(path)?.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn prefers_ed25519() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("id_rsa.pub"), "ssh-rsa AAAA rsa").unwrap();
        std::fs::write(dir.path().join("id_ed25519.pub"), "ssh-ed25519 AAAA ed\n").unwrap();
        let path = find_public_key(dir.path()).unwrap();
        assert_eq!(read_public_key(&path).unwrap(), "ssh-ed25519 AAAA ed");
    }

    #[test]
    fn falls_back_to_rsa() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("id_rsa.pub"), "ssh-rsa AAAA rsa").unwrap();
        assert!(find_public_key(dir.path())
            .unwrap()
            .ends_with("id_rsa.pub"));
    }

    #[test]
    fn none_found() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            find_public_key(dir.path()),
            Err(GraduateError::PublicKeyNotFound)
        ));
    }
}
