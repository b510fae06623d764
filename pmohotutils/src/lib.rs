//! Utilitaires de base pour pmohotplug.
//!
//! Cette crate fournit les briques réutilisées par les autres crates du
//! workspace :
//! - [`retry`] : boucle de réessai bornée à délai fixe
//! - [`template`] : substitution en flux d'un jeton dans un fichier modèle
//! - [`mount`] : attente d'un point de montage dans la table des montages
//! - [`fsdir`] : répertoire de contrôle et verrou consultatif

pub mod fsdir;
pub mod mount;
pub mod retry;
pub mod template;

pub use fsdir::{DirError, LockError, LockFile, ensure_dir};
pub use mount::{MountError, MountTable, mount_point_for};
pub use retry::{Exhausted, RetryPolicy, retry};
pub use template::{TemplateError, expand, expand_file};
