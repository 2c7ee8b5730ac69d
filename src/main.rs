//! Bulk transfer of files between local disk and Amazon S3.
//!
//! This tool should be used from a command line, either to download an
//! entire bucket prefix into a local directory, or to upload files (and
//! directory trees) into a bucket prefix.
//!
//! Credentials are resolved via guidelines in the [AWS Documentation]
//! (https://docs.aws.amazon.com/cli/latest/userguide/cli-environment.html),
//! unless an explicit credentials file is provided.
#[macro_use]
extern crate log as logger;

mod auth;
mod cli;
mod log;
mod paths;
mod summary;
mod types;
mod walker;

mod download;
mod upload;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> types::UtilResult<()> {
    // build the CLI and grab all arguments
    let args = cli::build().get_matches();

    // logging switches live on each subcommand
    if let (_, Some(subargs)) = args.subcommand() {
        log::init(subargs)?;

        // create the S3 client for the subcommand
        let s3 = auth::connect(subargs).await?;

        // delegate to the cli mod
        return cli::exec(s3, &args).await;
    }

    cli::build().print_help()?;
    Ok(())
}
