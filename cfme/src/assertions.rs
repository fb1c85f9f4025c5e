//! Response assertions shared by the REST cases

use miqapi::api::common::HrefRef;
use miqapi::api::{ActionResult, CustomAttribute, CustomAttributeApi, CustomAttributesApi};
use miqapi::ApiError;
use tokio::time::Instant;

use crate::config::WaitConfig;
use crate::error::{CaseError, CaseResult};

pub const NOT_FOUND: &str = "ActiveRecord::RecordNotFound";
pub const BAD_REQUEST: &str = "Api::BadRequestError";

pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> CaseResult {
    if condition {
        Ok(())
    } else {
        Err(CaseError::Assertion(message()))
    }
}

/// The call must have failed with HTTP `status` and server error class `klass`
pub fn expect_api_error<T>(
    result: Result<T, ApiError>,
    status: u16,
    klass: &str,
) -> CaseResult<ApiError> {
    match result {
        Ok(_) => Err(CaseError::UnexpectedSuccess {
            status,
            klass: klass.to_string(),
        }),
        Err(err) if err.status() == Some(status) && err.klass() == Some(klass) => Ok(err),
        Err(err) => Err(CaseError::WrongError {
            status,
            klass: klass.to_string(),
            actual: err,
        }),
    }
}

pub fn assert_action_success(result: &ActionResult) -> CaseResult {
    ensure(result.success, || {
        format!(
            "action reported failure: {}",
            result.message.as_deref().unwrap_or("no message")
        )
    })
}

pub fn assert_action_results(results: &[ActionResult], expected: usize) -> CaseResult {
    ensure(results.len() == expected, || {
        format!("expected {} action results, got {}", expected, results.len())
    })?;
    results.iter().try_for_each(assert_action_success)
}

/// Polls the detail endpoint until it answers 404
pub async fn wait_not_exists(detail: &CustomAttributeApi<'_>, waits: &WaitConfig) -> CaseResult {
    let deadline = Instant::now() + waits.delete_timeout();
    loop {
        match detail.get().await {
            Err(err) if err.is_not_found() => return Ok(()),
            Err(err) => return Err(err.into()),
            Ok(_) if Instant::now() >= deadline => {
                return Err(CaseError::Timeout {
                    what: format!("{} to disappear", detail.href()),
                    seconds: waits.delete_timeout_secs,
                })
            }
            Ok(_) => tokio::time::sleep(waits.delete_delay()).await,
        }
    }
}

/// Batch-deletes `attributes` through the collection, waits until each one is
/// gone and, with `not_found`, checks that repeating the delete yields 404.
pub async fn delete_resources_from_collection(
    collection: &CustomAttributesApi<'_>,
    attributes: &[CustomAttribute],
    not_found: bool,
    waits: &WaitConfig,
) -> CaseResult {
    let details = attributes
        .iter()
        .map(|attr| collection.attribute(attr))
        .collect::<Result<Vec<_>, _>>()?;
    let refs: Vec<HrefRef> = details.iter().map(|d| d.reference()).collect();

    let results = collection.delete(&refs).await?;
    assert_action_results(&results, refs.len())?;

    for detail in &details {
        wait_not_exists(detail, waits).await?;
    }

    if not_found {
        expect_api_error(collection.delete(&refs).await, 404, NOT_FOUND)?;
    }
    Ok(())
}
