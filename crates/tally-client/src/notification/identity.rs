use tracing::{debug, error, info};

use crate::notification::{ObjectIdentity, StorageEntity, UploadNotification, UploadRecord};
use crate::{ClientError, ClientResult};

/// Returns the object named by the first record of `notification`.
///
/// `Ok(None)` means there is nothing to process. A missing notification is a
/// caller bug and fails with `invalid_argument`; a record naming only one of
/// bucket and key fails with `inconsistent_object_identity`.
pub fn extract_identity(
    notification: Option<&UploadNotification>,
) -> ClientResult<Option<ObjectIdentity>> {
    let Some(notification) = notification else {
        error!("upload notification is missing");
        return Err(ClientError::invalid_argument(
            "Upload notification cannot be missing.",
        ));
    };

    let Some(records) = notification.records.as_ref() else {
        info!("upload notification has no record list");
        return Ok(None);
    };

    let Some(first_record) = records.first() else {
        info!("upload notification has no records");
        return Ok(None);
    };

    if records.len() > 1 {
        // The storage trigger is scoped to a single statement upload, so only
        // the first record is acted on.
        info!(
            record_count = records.len(),
            "upload notification has more than one record; processing the first"
        );
    }

    identity_from_record(first_record)
}

fn identity_from_record(record: &UploadRecord) -> ClientResult<Option<ObjectIdentity>> {
    let Some(storage) = record.s3.as_ref() else {
        debug!("upload record has no storage entity");
        return Ok(None);
    };

    let Some(object) = storage.object.as_ref() else {
        debug!("upload record has no object entity");
        return Ok(None);
    };

    let bucket = bucket_name(storage);
    build_identity(
        bucket,
        object.key.as_deref(),
        object.version_id.as_deref(),
    )
}

fn bucket_name(storage: &StorageEntity) -> Option<&str> {
    let Some(bucket) = storage.bucket.as_ref() else {
        debug!("upload record has no bucket entity");
        return None;
    };
    bucket.name.as_deref()
}

fn build_identity(
    bucket: Option<&str>,
    key: Option<&str>,
    version_id: Option<&str>,
) -> ClientResult<Option<ObjectIdentity>> {
    debug!(
        bucket = bucket.unwrap_or("<none>"),
        key = key.unwrap_or("<none>"),
        version_id = version_id.unwrap_or("<none>"),
        "building object identity"
    );

    let bucket_value = present(bucket);
    let key_value = present(key);

    match (bucket_value, key_value) {
        (None, None) => Ok(None),
        (Some(bucket_name), Some(object_key)) => Ok(Some(ObjectIdentity {
            bucket: bucket_name.to_string(),
            key: object_key.to_string(),
            version_id: non_blank(version_id).map(str::to_string),
        })),
        _ => {
            error!(
                bucket = bucket.unwrap_or("<none>"),
                key = key.unwrap_or("<none>"),
                "only one of bucket name and object key is present"
            );
            Err(ClientError::inconsistent_object_identity(bucket, key))
        }
    }
}

// Blankness is judged on trimmed text; the name itself is kept verbatim.
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|raw| !raw.trim().is_empty())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    let raw = value?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed)
}
