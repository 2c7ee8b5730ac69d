//! Types module for the main runtime, exposing error and result types.
//!
//! Most code in this module is based around coercion of error types into
//! a common error type, to be used as the general "Error" of this crate.
use logger::SetLoggerError;
use quick_xml::events::Event;
use quick_xml::Reader;
use rusoto_core::region::ParseRegionError;
use rusoto_core::request;

use std::fmt::{self, Debug, Display, Formatter};
use std::io;

/// Public type alias for a result with a `UtilError` error type.
pub type UtilResult<T> = Result<T, UtilError>;

/// Delegating error wrapper for every failure raised during a transfer.
///
/// Errors are only ever printed to the operator, so the message is all
/// that is carried; conversions bind the source message through.
pub struct UtilError(String);

impl UtilError {
    /// Retrieves the inner message of this error.
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Debug implementation for `UtilError`.
impl Debug for UtilError {
    /// Formats an `UtilError` by delegating to `Display`.
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// Display implementation for `UtilError`.
impl Display for UtilError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Macro to implement `From` for provided types.
macro_rules! derive_from {
    ($type:ty) => {
        impl<'a> From<$type> for UtilError {
            fn from(t: $type) -> UtilError {
                UtilError(t.to_string())
            }
        }
    };
}

// Easy derivations of derive_from.
derive_from!(&'a str);
derive_from!(io::Error);
derive_from!(clap::Error);
derive_from!(ini::Error);
derive_from!(ParseRegionError);
derive_from!(SetLoggerError);
derive_from!(regex::Error);
derive_from!(request::TlsError);
derive_from!(walkdir::Error);
derive_from!(String);

/// Pulls the `<Message>` text out of an XML error body, if there is one.
///
/// S3 failures which can't be mapped to a typed error are rendered with
/// their raw XML response.
fn extract_message(msg: &str) -> Option<String> {
    if !msg.starts_with("<?xml") {
        return None;
    }

    // create an XML reader and buffer
    let mut reader = Reader::from_str(msg);
    let mut buffer = Vec::new();

    loop {
        match reader.read_event(&mut buffer) {
            // end, or error, just give up
            Ok(Event::Eof) | Err(_) => return None,

            // the first message tag wins
            Ok(Event::Start(ref e)) if e.name() == b"Message" => {
                return reader.read_text(b"Message", &mut Vec::new()).ok();
            }

            _ => (),
        }
        buffer.clear();
    }
}

/// Macro to implement `From` for Rusoto types.
macro_rules! derive_from_rusoto {
    ($type:ty) => {
        impl From<rusoto_core::RusotoError<$type>> for UtilError {
            /// Converts a Rusoto error to a `UtilError`.
            fn from(err: rusoto_core::RusotoError<$type>) -> UtilError {
                let msg = err.to_string();
                UtilError(extract_message(&msg).unwrap_or(msg))
            }
        }
    };
}

// derive error display for all used rusoto types
derive_from_rusoto!(rusoto_s3::AbortMultipartUploadError);
derive_from_rusoto!(rusoto_s3::CompleteMultipartUploadError);
derive_from_rusoto!(rusoto_s3::CreateMultipartUploadError);
derive_from_rusoto!(rusoto_s3::GetObjectError);
derive_from_rusoto!(rusoto_s3::ListObjectsV2Error);
derive_from_rusoto!(rusoto_s3::PutObjectError);
derive_from_rusoto!(rusoto_s3::UploadPartError);
derive_from_rusoto!(rusoto_sts::GetCallerIdentityError);
