//! chronicle-drive - recent Google Drive activity and Google Doc text export
//!
//! ```text
//! CredentialProvider ──► DriveClient ──► Vec<DriveFile> ──► activity file
//!                                   └──► export_text(doc) ──► plain text
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod model;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::instrument;

pub use auth::{AccessToken, AuthorizedUserProvider, CredentialProvider, StaticToken};
pub use client::DriveClient;
pub use error::{DriveError, Result};
pub use model::{preview, DriveFile, GOOGLE_DOC_MIME};

/// First Google Doc in listing order.
pub fn first_google_doc(files: &[DriveFile]) -> Option<&DriveFile> {
    files.iter().find(|file| file.is_google_doc())
}

/// Save listed file metadata as a JSON array indented by four spaces.
#[instrument(skip_all, fields(path = %path.as_ref().display(), count = files.len()))]
pub fn write_activity(path: impl AsRef<Path>, files: &[DriveFile]) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut out = BufWriter::new(file);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    files.serialize(&mut ser)?;
    out.flush()?;
    Ok(())
}
