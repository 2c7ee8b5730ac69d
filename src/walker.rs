//! Common object traversal structures for AWS S3.
//!
//! This module doesn't contain anything special beyond a pseudo-iterator
//! to walk over objects in S3 in a more idiomatic manner, hiding away the
//! continuation tokens used to page through large listings.
use rusoto_s3::*;

use std::collections::VecDeque;

use crate::types::UtilResult;

/// Pseudo `Iterator` structure to walk over `Object` types in AWS S3.
///
/// As this is a fallible (and asynchronous) iteration, a `for` style loop
/// cannot be used easily. Instead, this pattern must be used:
///
/// ```rust,ignore
/// let mut walker = ObjectWalker::new(&s3, bucket, prefix);
///
/// while let Some(object) = walker.next().await? {
///     // do something...
/// }
/// ```
pub struct ObjectWalker<'a> {
    s3: &'a S3Client,
    token: Option<String>,
    bucket: String,
    prefix: Option<String>,
    buffer: VecDeque<Object>,
    finished: bool,
}

impl<'a> ObjectWalker<'a> {
    /// Construct a new `ObjectWalker` for a bucket/prefix pair.
    pub fn new(s3: &'a S3Client, bucket: String, prefix: Option<String>) -> Self {
        Self {
            s3,
            bucket,
            prefix,
            token: None,
            buffer: VecDeque::new(),
            finished: false,
        }
    }

    /// Attempts to fetch the next `Object` in the S3 listing.
    ///
    /// Calls can fail, which is why a `Result` is returned. Even if a call
    /// succeeds there is no guarantee an `Object` exists, which is why an
    /// `Option` is returned.
    ///
    /// Calling this method does not guarantee a call will be made to AWS;
    /// there may already be buffered data to be returned immediately.
    pub async fn next(&mut self) -> UtilResult<Option<Object>> {
        loop {
            // always check the buffer first
            if let Some(object) = self.buffer.pop_front() {
                return Ok(Some(object));
            }

            // if done, no fetch
            if self.finished {
                return Ok(None);
            }

            // create a request to list objects
            let request = ListObjectsV2Request {
                bucket: self.bucket.clone(),
                prefix: self.prefix.clone(),
                continuation_token: self.token.clone(),
                ..ListObjectsV2Request::default()
            };

            let response = self.s3.list_objects_v2(request).await?;

            // store the page and next identifier
            self.buffer.extend(response.contents.unwrap_or_default());
            self.token = response.next_continuation_token;

            // a page without a token is the last one
            if self.token.is_none() {
                self.finished = true;
            }

            debug!(
                "Listed {} objects in s3://{}/{}",
                self.buffer.len(),
                self.bucket,
                self.prefix.as_deref().unwrap_or_default()
            );
        }
    }
}
