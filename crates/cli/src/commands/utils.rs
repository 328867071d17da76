use std::path::Path;

use accrual_kernels::Validate;
use eyre::WrapErr;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{fs, io::AsyncReadExt};

/// Read a JSON document from `input`, or from stdin if it is not given.
pub(crate) async fn read_json<T>(input: Option<&Path>) -> eyre::Result<T>
where
    T: DeserializeOwned,
{
    let content = match input {
        Some(path) => fs::read_to_string(path)
            .await
            .wrap_err_with(|| format!("failed to read `{}`", path.display()))?,
        None => {
            let mut buffer = String::new();
            tokio::io::stdin().read_to_string(&mut buffer).await?;
            buffer
        }
    };
    serde_json::from_str(&content).wrap_err("failed to parse input")
}

pub(crate) fn print_json(value: &impl Serialize) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Validate every item, reporting the index of the first invalid one.
pub(crate) fn validate_all<'a, T: Validate + 'a>(
    items: impl IntoIterator<Item = &'a T>,
) -> eyre::Result<()> {
    for (idx, item) in items.into_iter().enumerate() {
        item.validate()
            .wrap_err_with(|| format!("invalid entry at index {idx}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use accrual_kernels::{test::earn_request, EarnRequest, Error};

    use super::*;

    #[test]
    fn test_validate_all_reports_index() {
        let requests = vec![
            earn_request("s", "ss", 1, "1"),
            earn_request("s", "", 1, "1"),
        ];
        let err = validate_all(&requests).unwrap_err();
        assert_eq!(err.to_string(), "invalid entry at index 1");
        assert_eq!(err.downcast_ref::<Error>(), Some(&Error::EmptySubSource));
        assert!(validate_all::<EarnRequest>([]).is_ok());
    }
}
