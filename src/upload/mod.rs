//! Upload of local files, or entire directory trees, into Amazon S3.
use clap::{App, Arg, ArgGroup, ArgMatches, SubCommand};
use rusoto_s3::*;
use tokio::fs::{self, File};
use tokio::io::AsyncReadExt;

use std::path::{Path, PathBuf};

use crate::cli;
use crate::paths::{self, LocalEntry};
use crate::summary::Summary;
use crate::types::UtilResult;

mod multipart;

/// Size of the parts sent for multipart uploads, matching the AWS CLI.
pub const CHUNK_SIZE: u64 = 8 * 1024 * 1024;

/// Generates an appropriate `SubCommand` for this module.
pub fn cmd<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("upload")
        .about("Upload files or a directory tree into an Amazon S3 prefix")
        .args(&cli::global_args())
        .args(&[
            Arg::with_name("file")
                .help("One or more local files to upload")
                .short("f")
                .long("file")
                .takes_value(true)
                .multiple(true),
            Arg::with_name("folder")
                .help("A local directory to upload recursively")
                .short("F")
                .long("folder")
                .takes_value(true),
            Arg::with_name("follow")
                .help("Follow symbolic links when walking a directory")
                .short("L")
                .long("follow-links"),
        ])
        .group(
            ArgGroup::with_name("sources")
                .args(&["file", "folder"])
                .multiple(true)
                .required(true),
        )
}

/// Executes this subcommand and returns a `UtilResult` to indicate success.
pub async fn exec(s3: S3Client, args: &ArgMatches<'_>) -> UtilResult<()> {
    // parse all global arguments
    let dryrun = cli::is_dry_run(args);
    let pattern = cli::get_pattern(args)?;
    let (bucket, prefix) = cli::get_bucket_pair(args)?;

    let files: Vec<PathBuf> = args
        .values_of("file")
        .map(|values| values.map(PathBuf::from).collect())
        .unwrap_or_else(Vec::new);
    let folder = args.value_of("folder").map(PathBuf::from);

    // nothing is sent unless every source exists
    verify_sources(&files, folder.as_deref()).await?;

    let mut summary = Summary::new();

    // explicit files land directly beneath the prefix
    for file in &files {
        let key = match paths::file_key(prefix.as_deref(), file) {
            Ok(key) => key,
            Err(err) => {
                error!("Unable to upload {}: {}", file.display(), err);
                summary.fail();
                continue;
            }
        };

        if !cli::is_match(&pattern, &key) {
            debug!("Skipping {} (pattern)", file.display());
            summary.skip();
            continue;
        }

        transfer(&s3, &bucket, &key, file, dryrun, &mut summary).await;
    }

    if let Some(folder) = folder {
        let follow = args.is_present("follow");

        for entry in paths::local_files(&folder, follow) {
            let (path, relative) = match entry {
                Ok(LocalEntry::File(path, relative)) => (path, relative),
                Ok(LocalEntry::Other(path)) => {
                    debug!("Skipping {} (not a regular file)", path.display());
                    summary.skip();
                    continue;
                }
                Err(err) => {
                    error!("Unable to read {}: {}", folder.display(), err);
                    summary.fail();
                    continue;
                }
            };

            if !cli::is_match(&pattern, &relative) {
                debug!("Skipping {} (pattern)", path.display());
                summary.skip();
                continue;
            }

            let key = paths::join_key(prefix.as_deref(), &relative);

            transfer(&s3, &bucket, &key, &path, dryrun, &mut summary).await;
        }
    }

    summary.finish(dryrun)
}

/// Verifies that all provided files and folders exist, with the right types.
async fn verify_sources(files: &[PathBuf], folder: Option<&Path>) -> UtilResult<()> {
    for file in files {
        match fs::metadata(file).await {
            Ok(meta) if meta.is_file() => (),
            _ => return Err(format!("'{}' is not a valid file path", file.display()).into()),
        }
    }

    if let Some(folder) = folder {
        match fs::metadata(folder).await {
            Ok(meta) if meta.is_dir() => (),
            _ => return Err(format!("'{}' is not a valid directory", folder.display()).into()),
        }
    }

    Ok(())
}

/// Uploads a single file, logging and recording the outcome.
async fn transfer(
    s3: &S3Client,
    bucket: &str,
    key: &str,
    path: &Path,
    dry: bool,
    summary: &mut Summary,
) {
    info!("Uploading {} -> s3://{}/{}", path.display(), bucket, key);

    if dry {
        summary.success(0);
        return;
    }

    match upload_file(s3, bucket, key, path).await {
        Ok(bytes) => summary.success(bytes),
        Err(err) => {
            error!("Unable to upload {}: {}", path.display(), err);
            summary.fail();
        }
    }
}

/// Uploads a local file to the provided key, returning the bytes sent.
///
/// Files below `CHUNK_SIZE` are sent in a single request; anything larger
/// is sent as a multipart upload, one part at a time.
async fn upload_file(s3: &S3Client, bucket: &str, key: &str, path: &Path) -> UtilResult<u64> {
    let mut file = File::open(path).await?;
    let size = fs::metadata(path).await?.len();

    if size >= CHUNK_SIZE {
        return multipart::upload(s3, bucket, key, &mut file, size).await;
    }

    let mut buffer = Vec::with_capacity(size as usize);
    file.read_to_end(&mut buffer).await?;

    let length = buffer.len() as u64;
    let request = PutObjectRequest {
        bucket: bucket.to_string(),
        key: key.to_string(),
        content_length: Some(length as i64),
        body: Some(buffer.into()),
        ..PutObjectRequest::default()
    };

    s3.put_object(request).await?;

    Ok(length)
}
