//! `cartwheel new`: create a blank manifest and track it.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use std::path::PathBuf;

use crate::config::Settings;
use crate::manifest::{self, DependencyRecord, ManifestKind};
use crate::roster::Roster;

/// Manifest flavor argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// A Carthage-style Cartfile.
    Cartfile,
    /// A CocoaPods-style Podfile.
    Podfile,
}

impl From<KindArg> for ManifestKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Cartfile => ManifestKind::Cartfile,
            KindArg::Podfile => ManifestKind::Podfile,
        }
    }
}

/// Create a blank manifest in a directory and append the resulting record
/// to the roster.
///
/// Refuses to overwrite an existing manifest.
#[derive(Args)]
pub struct NewCommand {
    /// Directory to create the manifest in (created if absent).
    directory: PathBuf,

    /// Which manifest flavor to create.
    #[arg(long, value_enum, default_value_t = KindArg::Cartfile)]
    kind: KindArg,
}

impl NewCommand {
    /// Execute the new command.
    pub async fn execute(self, settings: &Settings) -> Result<()> {
        let kind = ManifestKind::from(self.kind);
        crate::utils::fs::ensure_dir(&self.directory)?;

        let path = manifest::write_blank(kind, &self.directory)?;
        println!("Created {}", path.display());

        let record = DependencyRecord::from_path(&self.directory, kind)
            .with_context(|| format!("Created manifest at {} but could not construct its record", path.display()))?;

        let mut roster = Roster::load(settings)?;
        roster.append(record);
        roster.flush().await;
        println!("Tracking it as record {}", roster.len() - 1);

        Ok(())
    }
}
