//! RSA-4096 keypair generation for the `gen-key` subcommand.

use std::fs;
use std::path::Path;

use dead_drop_common::crypto;
use dead_drop_common::error::DeadDropError;

/// Generates a fresh RSA-4096 keypair and writes PKCS#1 PEM files at
/// `priv_path` and `pub_path`.
pub fn generate_keypair_files(priv_path: &Path, pub_path: &Path) -> Result<(), DeadDropError> {
    let (private_key, public_key) = crypto::generate_keypair()?;

    let private_pem = crypto::private_key_to_pem(&private_key)?;
    let public_pem = crypto::public_key_to_pem(&public_key)?;

    fs::write(priv_path, private_pem)
        .map_err(|e| DeadDropError::internal(format!("failed to write private key: {e}")))?;
    fs::write(pub_path, public_pem)
        .map_err(|e| DeadDropError::internal(format!("failed to write public key: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(priv_path, fs::Permissions::from_mode(0o600))
            .map_err(|e| DeadDropError::internal(format!("failed to set private key permissions: {e}")))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn generates_parseable_pem_files() {
        let dir = tempdir().unwrap();
        let priv_path = dir.path().join("id_rsa");
        let pub_path = dir.path().join("id_rsa.pub");

        generate_keypair_files(&priv_path, &pub_path).unwrap();

        let priv_pem = fs::read_to_string(&priv_path).unwrap();
        let pub_pem = fs::read(&pub_path).unwrap();

        assert!(crypto::private_key_from_pem(&priv_pem).is_ok());
        assert!(crypto::public_key_from_pem(&pub_pem).is_ok());
    }
}
