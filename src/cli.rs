//! CLI bindings for all internal commands and modules.
//!
//! This module focuses on the common CLI bindings required to provide easy
//! APIs and consistency across all other modules. This is where the parent
//! CLI can be found, as well as utilities for fetching common switches and
//! values.
use clap::{App, AppSettings, Arg, ArgMatches};
use regex::Regex;
use rusoto_core::Region;
use rusoto_s3::*;

use std::str::FromStr;

use crate::types::UtilResult;

/// Constructs a new CLI application using Clap.
///
/// This will register all subcommand modules and embed all metadata. All
/// metadata is fetched dynamically from Cargo and shouldn't require to
/// be updated (ever).
pub fn build<'a, 'b>() -> App<'a, 'b> {
    App::new("")
        .name(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .subcommand(crate::download::cmd())
        .subcommand(crate::upload::cmd())
        .settings(&[
            AppSettings::ArgRequiredElseHelp,
            AppSettings::DisableHelpSubcommand,
            AppSettings::SubcommandRequiredElseHelp,
            AppSettings::VersionlessSubcommands,
        ])
}

/// Executes a subcommand based on the parsed arguments from the CLI.
///
/// This will pass a singleton `S3Client` to each submodule to avoid
/// having to construct a client inside each module.
pub async fn exec(s3: S3Client, args: &ArgMatches<'_>) -> UtilResult<()> {
    match args.subcommand() {
        ("download", Some(subargs)) => crate::download::exec(s3, subargs).await,
        ("upload", Some(subargs)) => crate::upload::exec(s3, subargs).await,
        _ => {
            build().print_help()?;
            Ok(())
        }
    }
}

/// Fetches a bucket/prefix pair from the common argument set.
///
/// The prefix is `None` when no prefix (or only a `/`) follows the bucket.
pub fn get_bucket_pair(args: &ArgMatches<'_>) -> UtilResult<(String, Option<String>)> {
    // parse the bucket argument
    let mut splitn = required(args, "bucket")?
        .trim_start_matches("s3://")
        .splitn(2, '/');

    // bucket is required, prefix is optional after `/`
    let bucket = splitn.next().unwrap_or_default().to_string();
    let prefix = splitn
        .next()
        .map(|s| s.trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty());

    if bucket.is_empty() {
        return Err("A bucket name must be provided".into());
    }

    Ok((bucket, prefix))
}

/// Compiles the optional filter pattern provided to a command.
pub fn get_pattern(args: &ArgMatches<'_>) -> UtilResult<Option<Regex>> {
    match args.value_of("pattern") {
        Some(pattern) => Ok(Some(Regex::new(pattern)?)),
        None => Ok(None),
    }
}

/// Resolves the region to talk to, falling back to the AWS environment.
pub fn get_region(args: &ArgMatches<'_>) -> UtilResult<Region> {
    match args.value_of("region") {
        Some(region) => Ok(Region::from_str(region)?),
        None => Ok(Region::default()),
    }
}

/// Fetches the set of global arguments which should be attached on each command.
pub fn global_args<'a, 'b>() -> [Arg<'a, 'b>; 7] {
    [
        Arg::with_name("dry")
            .help("Only print out the calculated transfers")
            .short("d")
            .long("dry-run"),
        Arg::with_name("quiet")
            .help("Only prints errors during execution")
            .short("q")
            .long("quiet")
            .conflicts_with("verbose"),
        Arg::with_name("verbose")
            .help("Prints debug output during execution")
            .short("v")
            .long("verbose"),
        Arg::with_name("region")
            .help("The AWS region to connect to")
            .short("r")
            .long("region")
            .takes_value(true),
        Arg::with_name("credentials")
            .help("An INI file containing an [aws] access_key and secret_key")
            .short("c")
            .long("credentials")
            .takes_value(true),
        Arg::with_name("pattern")
            .help("Only transfer keys matching this pattern")
            .short("p")
            .long("pattern")
            .takes_value(true),
        Arg::with_name("bucket")
            .help("An S3 bucket prefix to work within")
            .index(1)
            .required(true),
    ]
}

/// Determines if the dry-run switch was provided in this execution.
pub fn is_dry_run(args: &ArgMatches<'_>) -> bool {
    args.is_present("dry")
}

/// Fetches the value of an argument Clap has already enforced.
pub fn required<'a>(args: &'a ArgMatches<'_>, name: &str) -> UtilResult<&'a str> {
    args.value_of(name)
        .ok_or_else(|| format!("Missing required argument: {}", name).into())
}

/// Determines whether a key (or relative path) passes the optional filter.
pub fn is_match(pattern: &Option<Regex>, key: &str) -> bool {
    pattern.as_ref().map_or(true, |regex| regex.is_match(key))
}
