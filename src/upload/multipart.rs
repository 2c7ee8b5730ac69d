//! Sequential multipart uploads for files too large for a single request.
use rusoto_s3::*;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use super::CHUNK_SIZE;
use crate::types::{UtilError, UtilResult};

/// S3 rejects multipart uploads with more parts than this.
const MAX_PARTS: u64 = 10_000;

/// Calculates the part size to use for a file of `size` bytes.
///
/// Parts stay at `CHUNK_SIZE` unless that would exceed `MAX_PARTS`, in
/// which case they grow (in whole megabytes) until the file fits.
pub(super) fn part_size(size: u64) -> u64 {
    const MEGABYTE: u64 = 1024 * 1024;

    let minimum = (size + MAX_PARTS - 1) / MAX_PARTS;
    let rounded = (minimum + MEGABYTE - 1) / MEGABYTE * MEGABYTE;

    rounded.max(CHUNK_SIZE)
}

/// Uploads an open file as a multipart upload, returning the bytes sent.
///
/// The upload is aborted if any part fails.
pub(super) async fn upload(
    s3: &S3Client,
    bucket: &str,
    key: &str,
    file: &mut File,
    size: u64,
) -> UtilResult<u64> {
    let creation = CreateMultipartUploadRequest {
        bucket: bucket.to_string(),
        key: key.to_string(),
        ..CreateMultipartUploadRequest::default()
    };

    // init the request against AWS, and retrieve the identifier
    let created = s3.create_multipart_upload(creation).await?;
    let upload_id = created
        .upload_id
        .ok_or("Multipart upload was created without an identifier")?;

    match upload_parts(s3, bucket, key, &upload_id, file, size).await {
        Ok(sent) => Ok(sent),
        Err(err) => {
            abort_request(s3, bucket, key, &upload_id).await;
            Err(err)
        }
    }
}

/// Sends all parts of a file and completes the multipart upload.
async fn upload_parts(
    s3: &S3Client,
    bucket: &str,
    key: &str,
    upload_id: &str,
    file: &mut File,
    size: u64,
) -> UtilResult<u64> {
    let chunk = part_size(size);

    let mut sent = 0;
    let mut part_number = 1;
    let mut completed = Vec::new();

    while sent < size {
        let mut buffer = Vec::with_capacity(chunk.min(size - sent) as usize);
        let read = (&mut *file).take(chunk).read_to_end(&mut buffer).await?;

        // the file shrank underneath us
        if read == 0 {
            return Err(format!("Unexpected end of file after {} bytes", sent).into());
        }

        debug!("Uploading part {} of {} ({} bytes)", part_number, key, read);

        let request = UploadPartRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id: upload_id.to_string(),
            part_number,
            content_length: Some(read as i64),
            body: Some(buffer.into()),
            ..UploadPartRequest::default()
        };

        let response = s3.upload_part(request).await?;

        completed.push(CompletedPart {
            e_tag: response.e_tag,
            part_number: Some(part_number),
        });

        sent += read as u64;
        part_number += 1;
    }

    // create our multipart completion request
    let complete = CompleteMultipartUploadRequest {
        bucket: bucket.to_string(),
        key: key.to_string(),
        upload_id: upload_id.to_string(),
        multipart_upload: Some(CompletedMultipartUpload {
            parts: Some(completed),
        }),
        ..CompleteMultipartUploadRequest::default()
    };

    s3.complete_multipart_upload(complete).await?;

    Ok(sent)
}

/// Aborts a multipart request in S3 by upload_id.
async fn abort_request(s3: &S3Client, bucket: &str, key: &str, upload_id: &str) {
    error!("Aborting upload of {}...", key);

    let abort = AbortMultipartUploadRequest {
        bucket: bucket.to_string(),
        key: key.to_string(),
        upload_id: upload_id.to_string(),
        ..AbortMultipartUploadRequest::default()
    };

    // attempt to abort the request, log on fail (can't short circuit)
    if let Err(err) = s3.abort_multipart_upload(abort).await {
        error!("Unable to abort {}: {}", upload_id, UtilError::from(err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, Requests};
    use std::fs as stdfs;

    const CREATED: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<InitiateMultipartUploadResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">"#,
        "<Bucket>bucket</Bucket><Key>big.bin</Key><UploadId>upload-1</UploadId>",
        "</InitiateMultipartUploadResult>"
    );

    const COMPLETED: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<CompleteMultipartUploadResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">"#,
        "<Location>https://bucket.s3.amazonaws.com/big.bin</Location>",
        "<Bucket>bucket</Bucket><Key>big.bin</Key><ETag>&quot;abc-2&quot;</ETag>",
        "</CompleteMultipartUploadResult>"
    );

    async fn open_sized(dir: &tempfile::TempDir, size: u64) -> File {
        let path = dir.path().join("big.bin");
        stdfs::write(&path, vec![7u8; size as usize]).unwrap();
        File::open(path).await.unwrap()
    }

    #[tokio::test]
    async fn uploading_in_parts() {
        let dir = tempfile::tempdir().unwrap();
        let size = CHUNK_SIZE + 10;
        let mut file = open_sized(&dir, size).await;

        let requests = Requests::default();
        let s3 = testing::client(vec![
            requests.respond(200, CREATED),
            requests.respond(200, ""),
            requests.respond(200, ""),
            requests.respond(200, COMPLETED),
        ]);

        let sent = upload(&s3, "bucket", "big.bin", &mut file, size).await.unwrap();

        assert_eq!(sent, size);
        assert_eq!(requests.methods(), vec!["POST", "PUT", "PUT", "POST"]);

        let sent = requests.all();

        assert!(sent[0].params.contains_key("uploads"));
        assert_eq!(sent[1].param("partNumber"), Some("1"));
        assert_eq!(sent[2].param("partNumber"), Some("2"));
        assert_eq!(sent[2].param("uploadId"), Some("upload-1"));
        assert_eq!(sent[3].param("uploadId"), Some("upload-1"));
    }

    #[tokio::test]
    async fn aborting_failed_part_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let size = CHUNK_SIZE * 2;
        let mut file = open_sized(&dir, size).await;

        let requests = Requests::default();
        let failure = testing::error_body("InternalError", "We encountered an internal error.");
        let s3 = testing::client(vec![
            requests.respond(200, CREATED),
            requests.respond(500, &failure),
            requests.respond(204, ""),
        ]);

        let result = upload(&s3, "bucket", "big.bin", &mut file, size).await;

        assert!(result.is_err());

        // no further parts are sent once one fails
        assert_eq!(requests.methods(), vec!["POST", "PUT", "DELETE"]);
        assert_eq!(requests.all()[2].param("uploadId"), Some("upload-1"));
    }

    #[test]
    fn sizing_small_files() {
        assert_eq!(part_size(0), CHUNK_SIZE);
        assert_eq!(part_size(CHUNK_SIZE), CHUNK_SIZE);
        assert_eq!(part_size(CHUNK_SIZE * MAX_PARTS), CHUNK_SIZE);
    }

    #[test]
    fn sizing_huge_files() {
        let size = CHUNK_SIZE * MAX_PARTS + 1;
        let part = part_size(size);

        assert_eq!(part, 9 * 1024 * 1024);
        assert!(part * MAX_PARTS >= size);
    }

    #[test]
    fn sizing_within_the_part_limit() {
        let size = 5 * 1024 * 1024 * 1024 * 1024_u64;
        let part = part_size(size);

        assert_eq!(part % (1024 * 1024), 0);
        assert!(part * MAX_PARTS >= size);
        assert!((part - 1024 * 1024) * MAX_PARTS < size);
    }
}
