//! Credential resolution and S3 client construction.
//!
//! By default credentials are resolved through the standard AWS chain
//! (environment, profile files, instance metadata). An explicit INI file
//! can be provided instead, in which case the keys are checked against STS
//! before anything is transferred.
use clap::ArgMatches;
use ini::Ini;
use rusoto_core::credential::{ChainProvider, StaticProvider};
use rusoto_core::{HttpClient, Region};
use rusoto_s3::S3Client;
use rusoto_sts::{GetCallerIdentityRequest, Sts, StsClient};

use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use crate::cli;
use crate::types::{UtilError, UtilResult};

/// Section of the credentials file containing the access keys.
const SECTION: &str = "aws";

/// Static key pair read from a credentials file.
#[derive(Debug, PartialEq)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
}

impl Credentials {
    /// Reads a `Credentials` pair from an INI file on disk.
    ///
    /// A missing file is treated the same as a file without the keys.
    pub fn from_file(path: &Path) -> UtilResult<Self> {
        let not_found = || format!("AWS credentials not found in {}", path.display());

        let ini = match Ini::load_from_file(path) {
            Ok(ini) => ini,
            Err(ini::Error::Io(ref err)) if err.kind() == ErrorKind::NotFound => {
                return Err(not_found().into())
            }
            Err(err) => return Err(err.into()),
        };

        Self::from_ini(&ini).ok_or_else(|| not_found().into())
    }

    /// Pulls the `access_key` and `secret_key` out of the `[aws]` section.
    fn from_ini(ini: &Ini) -> Option<Self> {
        let section = ini.section(Some(SECTION))?;
        let access_key = section.get("access_key")?.trim();
        let secret_key = section.get("secret_key")?.trim();

        if access_key.is_empty() || secret_key.is_empty() {
            return None;
        }

        Some(Self {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    /// Converts this key pair into a Rusoto credentials provider.
    fn into_provider(self) -> StaticProvider {
        StaticProvider::new_minimal(self.access_key, self.secret_key)
    }
}

/// Constructs the `S3Client` used by every command.
///
/// When a credentials file is passed, the credentials are validated before
/// the client is handed back; otherwise the default provider chain is used
/// and failures surface on the first request instead.
pub async fn connect(args: &ArgMatches<'_>) -> UtilResult<S3Client> {
    let region = cli::get_region(args)?;

    let path = match args.value_of("credentials") {
        Some(path) => Path::new(path),
        None => {
            // default chain, with a short metadata timeout
            let mut chain = ChainProvider::new();
            chain.set_timeout(Duration::from_millis(500));

            return Ok(S3Client::new_with(HttpClient::new()?, chain, region));
        }
    };

    let provider = Credentials::from_file(path)?.into_provider();

    validate(&provider, &region).await?;

    Ok(S3Client::new_with(HttpClient::new()?, provider, region))
}

/// Validates a set of credentials using a single STS identity call.
async fn validate(provider: &StaticProvider, region: &Region) -> UtilResult<()> {
    let sts = StsClient::new_with(HttpClient::new()?, provider.clone(), region.clone());

    let identity = sts
        .get_caller_identity(GetCallerIdentityRequest::default())
        .await
        .map_err(|err| format!("Invalid AWS credentials: {}", UtilError::from(err)))?;

    info!(
        "AWS credentials are valid ({})",
        identity.arn.as_deref().unwrap_or("unknown identity")
    );

    Ok(())
}
