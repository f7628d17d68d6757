//! S3 object storage client.

use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    primitives::ByteStream,
    types::ObjectCannedAcl,
    Client,
};
use gatepass_config::StorageConfig;
use gatepass_core::{GatepassError, GatepassResult, ObjectStorage, StoredObject};
use tracing::{debug, info, warn};

/// Path under which the REST layer serves stored images.
pub const IMAGE_ROUTE: &str = "/api/users/image";

/// Builds the public URL of a stored image.
#[must_use]
pub fn public_url(base_url: &str, key: &str) -> String {
    format!("{}{IMAGE_ROUTE}/{key}", base_url.trim_end_matches('/'))
}

/// S3-backed object storage.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    public_base_url: String,
}

impl S3Storage {
    /// Creates a client from configuration.
    ///
    /// Static credentials are used when both keys are set; otherwise the
    /// default provider chain applies.
    pub async fn new(config: &StorageConfig) -> Self {
        let mut loader = defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key, secret_key, None, None, "static",
            ));
        }
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let shared = loader.load().await;
        let conf = S3ConfigBuilder::from(&shared)
            .force_path_style(config.force_path_style)
            .build();

        info!(
            "S3 storage configured (region: {}, endpoint: {})",
            config.region,
            config.endpoint.as_deref().unwrap_or("aws")
        );

        Self {
            client: Client::from_conf(conf),
            public_base_url: config.public_base_url.clone(),
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> GatepassResult<String> {
        debug!("Uploading object {}/{} ({} bytes)", bucket, key, body.len());

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .acl(ObjectCannedAcl::PublicRead)
            .content_type(content_type)
            .content_disposition("inline")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                let message = e.into_service_error().to_string();
                warn!("S3 put_object failed for {}: {}", key, message);
                GatepassError::upload_failed(message)
            })?;

        Ok(public_url(&self.public_base_url, key))
    }

    async fn download(&self, bucket: &str, key: &str) -> GatepassResult<StoredObject> {
        debug!("Downloading object {}/{}", bucket, key);

        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    GatepassError::not_found("Image", key)
                } else {
                    GatepassError::external("s3", service_error.to_string())
                }
            })?;

        let content_type = output.content_type().map(str::to_string);
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| GatepassError::external("s3", e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(StoredObject {
            bytes,
            content_type,
        })
    }
}

impl std::fmt::Debug for S3Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Storage")
            .field("public_base_url", &self.public_base_url)
            .finish_non_exhaustive()
    }
}
