use crate::{EarnRequest, EarnRequestBatch, EarnRequestFullBatch, Error};

/// Partition `requests` into consecutive batches of related requests with
/// at most `batch_size` entries each.
///
/// Every chunk must be homogeneous in its shared fields. Either all batches
/// are returned or the first error is.
///
/// # Errors
/// - [`Error::EmptyBatch`] if `requests` is empty.
/// - [`Error::InvalidArgument`] if `batch_size` is zero.
/// - [`Error::BatchShapeMismatch`] if any chunk mixes unrelated requests.
pub fn make_many_earn_request_batches(
    requests: &[EarnRequest],
    batch_size: usize,
) -> crate::Result<Vec<EarnRequestBatch>> {
    let batches = chunks(requests, batch_size)?
        .map(EarnRequestBatch::try_from_requests)
        .collect::<crate::Result<Vec<_>>>()?;
    tracing::debug!(
        requests = requests.len(),
        batch_size,
        batches = batches.len(),
        "made related batches"
    );
    Ok(batches)
}

/// Partition `requests` into consecutive batches of unrelated requests with
/// at most `batch_size` entries each.
///
/// # Errors
/// - [`Error::EmptyBatch`] if `requests` is empty.
/// - [`Error::InvalidArgument`] if `batch_size` is zero.
pub fn make_many_earn_request_full_batches(
    requests: &[EarnRequest],
    batch_size: usize,
) -> crate::Result<Vec<EarnRequestFullBatch>> {
    let batches = chunks(requests, batch_size)?
        .map(EarnRequestFullBatch::from_requests)
        .collect::<crate::Result<Vec<_>>>()?;
    tracing::debug!(
        requests = requests.len(),
        batch_size,
        batches = batches.len(),
        "made full batches"
    );
    Ok(batches)
}

fn chunks(
    requests: &[EarnRequest],
    batch_size: usize,
) -> crate::Result<std::slice::Chunks<'_, EarnRequest>> {
    if requests.is_empty() {
        return Err(Error::EmptyBatch);
    }
    if batch_size == 0 {
        return Err(Error::InvalidArgument("batch size must be positive"));
    }
    Ok(requests.chunks(batch_size))
}
