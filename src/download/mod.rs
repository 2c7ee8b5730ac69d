//! Recursive download of an Amazon S3 prefix into a local directory.
use clap::{App, Arg, ArgMatches, SubCommand};
use rusoto_s3::*;
use tokio::fs::{self, File};
use tokio::io::{copy, AsyncWriteExt};

use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::cli;
use crate::paths;
use crate::summary::Summary;
use crate::types::UtilResult;
use crate::walker::ObjectWalker;

/// Generates an appropriate `SubCommand` for this module.
pub fn cmd<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("download")
        .about("Download an Amazon S3 prefix into a local directory")
        .args(&cli::global_args())
        .arg(
            Arg::with_name("target")
                .help("A local directory to download files into")
                .index(2)
                .required(true),
        )
}

/// Executes this subcommand and returns a `UtilResult` to indicate success.
pub async fn exec(s3: S3Client, args: &ArgMatches<'_>) -> UtilResult<()> {
    // parse all global arguments
    let dryrun = cli::is_dry_run(args);
    let pattern = cli::get_pattern(args)?;
    let (bucket, prefix) = cli::get_bucket_pair(args)?;

    // make sure there's somewhere to write to
    let target = PathBuf::from(cli::required(args, "target")?);
    prepare_target(&target, dryrun).await?;

    let mut summary = Summary::new();
    let mut walker = ObjectWalker::new(&s3, bucket.clone(), prefix.clone());

    // walk across all remote objects
    while let Some(object) = walker.next().await? {
        let key = match object.key {
            Some(key) => key,
            None => continue,
        };

        // skip non-matching files
        if !cli::is_match(&pattern, &key) {
            debug!("Skipping {} (pattern)", key);
            summary.skip();
            continue;
        }

        let relative = match paths::key_to_relative(prefix.as_deref(), &key) {
            Ok(Some(relative)) => relative,
            Ok(None) => {
                debug!("Skipping {} (outside of prefix)", key);
                summary.skip();
                continue;
            }
            Err(err) => {
                error!("Unable to download {}: {}", key, err);
                summary.fail();
                continue;
            }
        };

        let local = target.join(relative);

        // "folders" in S3 are zero byte markers
        if key.ends_with('/') {
            debug!("Creating {}", local.display());

            if !dryrun {
                if let Err(err) = fs::create_dir_all(&local).await {
                    error!("Unable to create {}: {}", local.display(), err);
                    summary.fail();
                }
            }
            continue;
        }

        info!("Downloading s3://{}/{} -> {}", bucket, key, local.display());

        if dryrun {
            summary.success(0);
            continue;
        }

        match download_object(&s3, &bucket, &key, &local).await {
            Ok(bytes) => summary.success(bytes),
            Err(err) => {
                error!("Unable to download {}: {}", key, err);
                summary.fail();
            }
        }
    }

    summary.finish(dryrun)
}

/// Ensures the target directory exists, creating it as necessary.
async fn prepare_target(target: &Path, dry: bool) -> UtilResult<()> {
    match fs::metadata(target).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(format!("'{}' is not a valid directory", target.display()).into()),
        Err(ref err) if err.kind() == ErrorKind::NotFound => {
            if !dry {
                fs::create_dir_all(target).await?;
            }
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// Downloads a single object to a local file, returning the bytes written.
///
/// Parent directories are created on demand; a file left incomplete by a
/// failed transfer is removed again before the error is passed back.
async fn download_object(s3: &S3Client, bucket: &str, key: &str, path: &Path) -> UtilResult<u64> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let request = GetObjectRequest {
        bucket: bucket.to_string(),
        key: key.to_string(),
        ..GetObjectRequest::default()
    };

    let response = s3.get_object(request).await?;

    save_body(path, response.body).await
}

/// Writes an (optional) object body to a new file at `path`.
///
/// The file is removed again if the body can't be written in full.
async fn save_body(path: &Path, body: Option<StreamingBody>) -> UtilResult<u64> {
    let mut file = File::create(path).await?;

    let written = match body {
        Some(body) => write_body(&mut file, body).await,
        None => file.flush().await.map(|_| 0),
    };

    if written.is_err() {
        drop(file);
        if let Err(err) = fs::remove_file(path).await {
            error!("Unable to remove partial file {}: {}", path.display(), err);
        }
    }

    Ok(written?)
}

/// Streams an object body into an open file.
async fn write_body(file: &mut File, body: StreamingBody) -> io::Result<u64> {
    let mut reader = body.into_async_read();
    let written = copy(&mut reader, file).await?;

    file.flush().await?;

    Ok(written)
}
