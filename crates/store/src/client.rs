//! Explicit DynamoDB client construction.
//!
//! Mirrors the queue crate's SQS client setup: built directly from an
//! [`AwsConfig`], never through `aws_config::defaults()`, so a locally
//! configured `AWS_ENDPOINT_URL` (pointed at DynamoDB Local / LocalStack)
//! can never leak into a different service's client.

use aws_credential_types::Credentials;
use aws_sdk_dynamodb::config::BehaviorVersion;
use aws_sdk_dynamodb::Client;

use beacon_core::config::AwsConfig;

pub fn build_client(aws: &AwsConfig) -> Client {
    let region = aws_sdk_dynamodb::config::Region::new(aws.region.clone());

    let mut config = aws_sdk_dynamodb::Config::builder()
        .region(region)
        .behavior_version(BehaviorVersion::latest());

    if let (Some(key_id), Some(secret)) = (&aws.access_key_id, &aws.secret_access_key) {
        let creds = Credentials::new(
            key_id,
            secret,
            aws.session_token.clone(),
            None,
            "beacon-store-static",
        );
        config = config.credentials_provider(creds);
    }

    if let Some(ref endpoint) = aws.endpoint_url {
        if !endpoint.is_empty() {
            let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
                endpoint.clone()
            } else {
                format!("https://{endpoint}")
            };
            config = config.endpoint_url(&url);
        }
    }

    Client::from_conf(config.build())
}
