//! Flags and helpers shared by `mirror plan` and `mirror sync`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use mirror_core::{config, ConfigOverrides, MirrorConfig};
use mirror_s3::S3Store;
use mirror_sync::{SyncOptions, SyncTarget};

/// Connection and selection flags. Each one overrides the config file.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// YAML config file [default: <config dir>/mirror/config.yaml, if present].
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// S3-compatible endpoint, e.g. http://localhost:9000.
    #[arg(long, value_name = "URL")]
    pub endpoint_url: Option<String>,

    /// Target bucket.
    #[arg(long, value_name = "NAME")]
    pub bucket_name: Option<String>,

    /// Local directory to mirror. Keys start with its final path segment.
    #[arg(long, value_name = "DIR")]
    pub local_path: Option<PathBuf>,

    /// Create the bucket if it does not exist.
    #[arg(long, conflicts_with = "no_create_bucket")]
    pub create_bucket: bool,

    /// Never create the bucket, even if the config file allows it.
    #[arg(long)]
    pub no_create_bucket: bool,

    /// Region used for signing and bucket creation [default: us-east-1].
    #[arg(long)]
    pub region: Option<String>,

    /// Only mirror files with this extension; repeatable.
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Emit machine-readable JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

impl ConfigArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            endpoint_url: self.endpoint_url.clone(),
            bucket_name: self.bucket_name.clone(),
            local_path: self.local_path.clone(),
            create_bucket: self.create_bucket_override(),
            region: self.region.clone(),
            extensions: Some(self.extensions.clone()),
            ..ConfigOverrides::default()
        }
    }

    fn create_bucket_override(&self) -> Option<bool> {
        if self.create_bucket {
            Some(true)
        } else if self.no_create_bucket {
            Some(false)
        } else {
            None
        }
    }

    /// Merge the config file with `overrides` and the environment.
    pub fn resolve(&self, overrides: ConfigOverrides) -> Result<MirrorConfig> {
        let file = match &self.config {
            Some(path) => Some(config::load_file_at(path)?),
            None => config::load_default_file()?,
        };
        Ok(MirrorConfig::resolve(file, overrides)?)
    }
}

/// Everything a command needs to talk to the store.
pub struct Session {
    pub config: MirrorConfig,
    pub store: S3Store,
    pub target: SyncTarget,
    pub options: SyncOptions,
}

impl Session {
    pub fn open(config: MirrorConfig) -> Result<Self> {
        let store = S3Store::connect(&config).context("failed to configure S3 client")?;
        Ok(Self {
            target: SyncTarget::from_config(&config),
            options: SyncOptions::from_config(&config),
            store,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use mirror_core::ConfigFile;

    use super::*;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: ConfigArgs,
    }

    fn parse(flags: &[&str]) -> Result<ConfigArgs, clap::Error> {
        Harness::try_parse_from(std::iter::once("mirror").chain(flags.iter().copied()))
            .map(|h| h.args)
    }

    #[test]
    fn create_bucket_is_left_to_the_config_file_by_default() {
        let args = parse(&[]).expect("parse");
        assert_eq!(args.overrides().create_bucket, None);
    }

    #[test]
    fn create_bucket_flags_override_both_ways() {
        let on = parse(&["--create-bucket"]).expect("parse");
        assert_eq!(on.overrides().create_bucket, Some(true));
        let off = parse(&["--no-create-bucket"]).expect("parse");
        assert_eq!(off.overrides().create_bucket, Some(false));
    }

    #[test]
    fn create_bucket_flags_conflict() {
        assert!(parse(&["--create-bucket", "--no-create-bucket"]).is_err());
    }

    #[test]
    fn no_create_bucket_beats_config_file() {
        let file = ConfigFile {
            create_bucket: Some(true),
            ..ConfigFile::default()
        };
        let args = parse(&[
            "--no-create-bucket",
            "--endpoint-url",
            "http://localhost:9000",
            "--bucket-name",
            "b",
            "--local-path",
            ".",
        ])
        .expect("parse");
        let resolved = MirrorConfig::resolve_with_env(Some(file), args.overrides(), |name| {
            Some(format!("{name}-value"))
        });
        assert!(!resolved.expect("resolve").create_bucket);
    }
}
