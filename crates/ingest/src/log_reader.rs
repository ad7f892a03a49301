//! Fetches and gzip-decodes a delivered log object.

use std::io::Read;

use aws_credential_types::Credentials;
use aws_sdk_s3::config::BehaviorVersion;
use aws_sdk_s3::Client;
use flate2::read::GzDecoder;
use tracing::info;

use beacon_core::config::AwsConfig;

use crate::error::IngestError;

/// Builds the S3 client explicitly from [`AwsConfig`], the same way the
/// queue crate builds its SQS client — never through `aws_config::defaults()`.
pub fn build_client(aws: &AwsConfig) -> Client {
    let region = aws_sdk_s3::config::Region::new(aws.region.clone());

    let mut config = aws_sdk_s3::Config::builder()
        .region(region)
        .behavior_version(BehaviorVersion::latest());

    if let (Some(key_id), Some(secret)) = (&aws.access_key_id, &aws.secret_access_key) {
        let creds = Credentials::new(key_id, secret, aws.session_token.clone(), None, "beacon-ingest-static");
        config = config.credentials_provider(creds);
    }

    if let Some(ref endpoint) = aws.endpoint_url {
        if !endpoint.is_empty() {
            let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
                endpoint.clone()
            } else {
                format!("https://{endpoint}")
            };
            config = config.endpoint_url(&url).force_path_style(true);
        }
    }

    Client::from_conf(config.build())
}

pub struct LogObjectReader {
    client: Client,
}

impl LogObjectReader {
    pub fn new(aws: &AwsConfig) -> Self {
        Self { client: build_client(aws) }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetch `bucket/key` and gzip-decode it to a UTF-8 string.
    pub async fn read_object(&self, bucket: &str, key: &str) -> Result<String, IngestError> {
        info!(bucket, key, "fetching log object");

        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| IngestError::Fetch(format!("{e:?}")))?;

        let bytes = resp
            .body
            .collect()
            .await
            .map_err(|e| IngestError::Fetch(format!("{e:?}")))?
            .into_bytes();

        let mut decoder = GzDecoder::new(&bytes[..]);
        let mut content = String::new();
        decoder
            .read_to_string(&mut content)
            .map_err(|e| IngestError::Decode(e.to_string()))?;

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn gzip_roundtrip_decodes() {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"hello\tworld\n").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut decoder = GzDecoder::new(&compressed[..]);
        let mut out = String::new();
        decoder.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello\tworld\n");
    }
}
