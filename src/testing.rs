//! Shared helpers for exercising S3 calls against canned responses.
use rusoto_core::signature::SignedRequest;
use rusoto_core::Region;
use rusoto_mock::{MockCredentialsProvider, MockRequestDispatcher, MultipleMockRequestDispatcher};
use rusoto_s3::S3Client;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// A request as seen by the mocked dispatcher.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub params: BTreeMap<String, Option<String>>,
}

impl Recorded {
    /// Retrieves the value of a query parameter, if it was sent.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(|value| value.as_deref())
    }
}

/// Log of every request dispatched through a set of mocked responses.
#[derive(Clone, Default)]
pub struct Requests(Arc<Mutex<Vec<Recorded>>>);

impl Requests {
    /// Creates a canned response which records the request it answers.
    pub fn respond(&self, status: u16, body: &str) -> MockRequestDispatcher {
        let log = self.0.clone();

        MockRequestDispatcher::with_status(status)
            .with_body(body)
            .with_request_checker(move |request: &SignedRequest| {
                log.lock().unwrap().push(Recorded {
                    method: request.method.clone(),
                    path: request.path.clone(),
                    params: request
                        .params
                        .iter()
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect(),
                });
            })
    }

    /// Returns a snapshot of all requests made so far.
    pub fn all(&self) -> Vec<Recorded> {
        self.0.lock().unwrap().clone()
    }

    /// Returns the methods of all requests made so far, in order.
    pub fn methods(&self) -> Vec<String> {
        self.all().into_iter().map(|request| request.method).collect()
    }
}

/// Builds an `S3Client` answering each request with the next response.
pub fn client(responses: Vec<MockRequestDispatcher>) -> S3Client {
    S3Client::new_with(
        MultipleMockRequestDispatcher::new(responses),
        MockCredentialsProvider,
        Region::UsEast1,
    )
}

/// Renders a `ListObjectsV2` page containing the provided keys.
pub fn list_page(keys: &[&str], next: Option<&str>) -> String {
    let contents = keys
        .iter()
        .map(|key| {
            format!(
                "<Contents><Key>{}</Key><LastModified>2020-01-01T00:00:00.000Z</LastModified>\
                 <ETag>&quot;d41d8cd98f00b204e9800998ecf8427e&quot;</ETag><Size>5</Size>\
                 <StorageClass>STANDARD</StorageClass></Contents>",
                key
            )
        })
        .collect::<String>();

    let token = next
        .map(|token| format!("<NextContinuationToken>{}</NextContinuationToken>", token))
        .unwrap_or_default();

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <ListBucketResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
         <Name>bucket</Name><Prefix></Prefix><KeyCount>{}</KeyCount><MaxKeys>1000</MaxKeys>\
         <IsTruncated>{}</IsTruncated>{}{}</ListBucketResult>",
        keys.len(),
        next.is_some(),
        contents,
        token
    )
}

/// Renders an S3 error body.
pub fn error_body(code: &str, message: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Error><Code>{}</Code><Message>{}</Message><RequestId>1D2E3F</RequestId></Error>",
        code, message
    )
}
