//! Job photo uploads to S3 / MinIO.

use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Maps an accepted image MIME type to its file extension.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type.trim().to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

pub fn image_key(job_id: Uuid, extension: &str) -> String {
    format!("jobs/{job_id}/{}.{extension}", Uuid::new_v4())
}

/// Path-style object URL, which works for both MinIO and S3.
pub fn public_url(endpoint: &str, bucket: &str, key: &str) -> String {
    format!("{}/{bucket}/{key}", endpoint.trim_end_matches('/'))
}

/// Checks type and size, then uploads. Returns the object's public URL.
pub async fn upload_job_image(
    s3: &aws_sdk_s3::Client,
    endpoint: &str,
    bucket: &str,
    job_id: Uuid,
    content_type: &str,
    data: Bytes,
) -> Result<String, AppError> {
    let extension = extension_for(content_type).ok_or_else(|| {
        AppError::Validation(format!(
            "unsupported image type '{content_type}', use jpeg, png or webp"
        ))
    })?;
    if data.is_empty() {
        return Err(AppError::Validation("image is empty".to_string()));
    }
    if data.len() > MAX_IMAGE_BYTES {
        return Err(AppError::Validation(format!(
            "image is larger than {} MiB",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }

    let key = image_key(job_id, extension);
    s3.put_object()
        .bucket(bucket)
        .key(&key)
        .body(ByteStream::from(data))
        .content_type(content_type)
        .send()
        .await
        .map_err(|e| AppError::S3(format!("upload of {key} failed: {e}")))?;

    info!("Uploaded job image to s3://{bucket}/{key}");
    Ok(public_url(endpoint, bucket, &key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for_known_types() {
        assert_eq!(extension_for("image/jpeg"), Some("jpg"));
        assert_eq!(extension_for("IMAGE/PNG"), Some("png"));
        assert_eq!(extension_for("image/webp"), Some("webp"));
        assert_eq!(extension_for("application/pdf"), None);
    }

    #[test]
    fn test_image_key_layout() {
        let job_id = Uuid::new_v4();
        let key = image_key(job_id, "png");
        assert!(key.starts_with(&format!("jobs/{job_id}/")));
        assert!(key.ends_with(".png"));
    }

    #[test]
    fn test_public_url_trims_slash() {
        assert_eq!(
            public_url("http://localhost:9000/", "jobs-bucket", "jobs/a/b.jpg"),
            "http://localhost:9000/jobs-bucket/jobs/a/b.jpg"
        );
    }
}
