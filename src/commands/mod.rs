pub mod apply;
pub mod list;
pub mod sync;

use anyhow::Result;

use crate::Context;
use crate::config::Manifest;
use crate::paths;
use crate::transport::{self, HttpTransport};

/// Manifest used only for its connection settings
///
/// A manifest named with --manifest must exist; the default one is optional.
pub fn connection_manifest(ctx: &Context) -> Result<Manifest> {
    let path = paths::manifest_path(ctx.manifest.as_deref())?;
    if ctx.manifest.is_some() {
        Manifest::load(&path)
    } else {
        Manifest::load_optional(&path)
    }
}

/// Open a connection using manifest settings overridden by the command line
pub fn connect(ctx: &Context, manifest: &Manifest) -> Result<HttpTransport> {
    let settings = manifest
        .connection
        .clone()
        .merged(ctx.connection.clone())
        .resolve()?;
    log::info!("Connecting to {}", settings.base_url);
    transport::connect(&settings)
}
