use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::{ByteStream, DateTime as AwsDateTime};
use aws_sdk_s3::types::{
    Delete, ObjectCannedAcl, ObjectIdentifier, ServerSideEncryption, StorageClass,
};
use chrono::{DateTime, Utc};

use super::{MetadataPolicy, ObjectPage, RemoteStore, StoreError};

const PAGE_SIZE: i32 = 200;

/// Production adapter over the AWS S3 API. Also speaks to S3-compatible
/// stores (MinIO, R2) via a custom endpoint with path-style addressing.
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub async fn new(
        bucket: &str,
        region: &str,
        endpoint: Option<&str>,
        access_key: &str,
        secret_key: &str,
    ) -> Self {
        let credentials = Credentials::new(access_key, secret_key, None, None, "s3backup-config");
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(credentials)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(url) = endpoint {
            builder = builder.endpoint_url(url).force_path_style(true);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: bucket.to_string(),
        }
    }

    /// Sort a send() failure into the transient/permanent taxonomy, keeping
    /// the bucket name and the service message for the operator.
    fn classify<E>(&self, op: &'static str, err: SdkError<E>) -> StoreError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let transient = match &err {
            SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => true,
            SdkError::ServiceError(ctx) => {
                let status = ctx.raw().status().as_u16();
                status >= 500 || status == 429
            }
            _ => false,
        };
        let message = match err.as_service_error() {
            Some(svc) => format!("bucket {}: {svc}", self.bucket),
            None => format!("bucket {}: {err}", self.bucket),
        };
        if transient {
            StoreError::Transient { op, message }
        } else {
            StoreError::Permanent { op, message }
        }
    }
}

fn to_chrono(ts: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
}

#[async_trait::async_trait]
impl RemoteStore for S3Store {
    async fn head(&self, key: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(out) => Ok(Some(
                out.last_modified()
                    .and_then(to_chrono)
                    .unwrap_or(DateTime::UNIX_EPOCH),
            )),
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                    Ok(None)
                } else {
                    Err(self.classify("head", err))
                }
            }
        }
    }

    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        policy: &MetadataPolicy,
    ) -> Result<(), StoreError> {
        let length = body.len() as i64;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_length(length)
            .content_type(content_type)
            .set_acl(policy.acl.as_deref().map(ObjectCannedAcl::from))
            .set_content_disposition(policy.content_disposition.clone())
            .set_server_side_encryption(
                policy
                    .server_side_encryption
                    .as_deref()
                    .map(ServerSideEncryption::from),
            )
            .set_storage_class(policy.storage_class.as_deref().map(StorageClass::from))
            .send()
            .await
            .map_err(|err| self.classify("put", err))?;
        Ok(())
    }

    async fn list_page(&self, token: Option<&str>) -> Result<ObjectPage, StoreError> {
        let out = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .max_keys(PAGE_SIZE)
            .set_continuation_token(token.map(str::to_string))
            .send()
            .await
            .map_err(|err| self.classify("list", err))?;

        let keys = out
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(str::to_string))
            .collect();
        let next = if out.is_truncated().unwrap_or(false) {
            out.next_continuation_token().map(str::to_string)
        } else {
            None
        };
        Ok(ObjectPage { keys, next })
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        // S3 returns success for a key that is already gone, which is the
        // contract we want.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| self.classify("delete", err))?;
        Ok(())
    }

    async fn delete_batch(&self, keys: &[String]) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut objects = Vec::with_capacity(keys.len());
        for key in keys {
            let id = ObjectIdentifier::builder().key(key).build().map_err(|e| {
                StoreError::permanent("delete_batch", format!("bucket {}: {e}", self.bucket))
            })?;
            objects.push(id);
        }
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .build()
            .map_err(|e| {
                StoreError::permanent("delete_batch", format!("bucket {}: {e}", self.bucket))
            })?;

        let out = self
            .client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|err| self.classify("delete_batch", err))?;

        // Per-key errors come back in the 200 response. A key that was
        // already gone is not reported as an error, so anything here is real.
        let errors = out.errors();
        if let Some(first) = errors.first() {
            return Err(StoreError::permanent(
                "delete_batch",
                format!(
                    "bucket {}: {} object(s) failed to delete, first: {} ({})",
                    self.bucket,
                    errors.len(),
                    first.key().unwrap_or("<unknown key>"),
                    first.message().unwrap_or("no error message"),
                ),
            ));
        }
        Ok(())
    }
}
