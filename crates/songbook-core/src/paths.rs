use directories::ProjectDirs;
use std::path::PathBuf;

use crate::error::JournalError;

pub const APP_QUALIFIER: &str = "com";
pub const APP_ORG: &str = "songbook";
pub const APP_NAME: &str = "songbook";

pub fn data_dir() -> Result<PathBuf, JournalError> {
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .ok_or_else(|| JournalError::Settings("cannot determine data directory".into()))?;
    Ok(dirs.data_dir().to_path_buf())
}
