use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client;
use std::time::Duration;

use crate::core::config::Settings;

/// S3-compatible client for the answer-sheet bucket.
#[derive(Debug, Clone)]
pub(crate) struct StorageService {
    client: Client,
    bucket: String,
}

impl StorageService {
    pub(crate) async fn from_settings(settings: &Settings) -> anyhow::Result<Option<Self>> {
        let storage = settings.storage();
        if !storage.is_configured() {
            return Ok(None);
        }

        let creds = Credentials::new(
            storage.access_key.clone(),
            storage.secret_key.clone(),
            None,
            None,
            "exam-connect-static",
        );

        let config = aws_config::defaults(BehaviorVersion::latest())
            .endpoint_url(storage.endpoint.clone())
            .region(aws_config::Region::new(storage.region.clone()))
            .credentials_provider(creds)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config).force_path_style(true).build();
        let client = Client::from_conf(s3_config);

        Ok(Some(Self { client, bucket: storage.bucket.clone() }))
    }

    pub(crate) fn bucket(&self) -> &str {
        &self.bucket
    }

    pub(crate) async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> anyhow::Result<String> {
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(PresigningConfig::expires_in(expires_in)?)
            .await?;

        Ok(presigned.uri().to_string())
    }

    pub(crate) async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client.delete_object().bucket(&self.bucket).key(key).send().await?;
        Ok(())
    }
}

/// Object key for a stored file URL: everything after the last `/<bucket>/` segment. URLs
/// without that segment are assumed to already be a bare key.
pub(crate) fn object_key_from_url<'a>(file_url: &'a str, bucket: &str) -> &'a str {
    let marker = format!("/{bucket}/");
    match file_url.rsplit_once(marker.as_str()) {
        Some((_, key)) => key,
        None => file_url,
    }
}
