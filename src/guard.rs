use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::SqlProviderError;

pub(crate) fn check_cancelled(cancel: Option<&CancellationToken>) -> Result<(), SqlProviderError> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(SqlProviderError::Cancelled),
        _ => Ok(()),
    }
}

/// Race one awaited I/O step against the command timeout and the caller's token.
///
/// A timeout of `None` or `0` waits indefinitely.
pub(crate) async fn guard_io<T, F>(
    fut: F,
    timeout_secs: Option<u32>,
    cancel: Option<&CancellationToken>,
) -> Result<T, SqlProviderError>
where
    F: Future<Output = Result<T, SqlProviderError>>,
{
    check_cancelled(cancel)?;

    let timed = async {
        match timeout_secs {
            Some(secs) if secs > 0 => {
                tokio::time::timeout(Duration::from_secs(u64::from(secs)), fut)
                    .await
                    .map_err(|_| SqlProviderError::Timeout(secs))?
            }
            _ => fut.await,
        }
    };

    match cancel {
        Some(token) => tokio::select! {
            biased;
            () = token.cancelled() => Err(SqlProviderError::Cancelled),
            res = timed => res,
        },
        None => timed.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn expired_timeout_surfaces_seconds() {
        let res: Result<(), _> = guard_io(
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            Some(1),
            None,
        )
        .await;
        let err = res.unwrap_err();
        assert!(matches!(err, SqlProviderError::Timeout(1)));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let token = CancellationToken::new();
        token.cancel();
        let err = guard_io(async { Ok(1) }, Some(30), Some(&token))
            .await
            .unwrap_err();
        assert!(matches!(err, SqlProviderError::Cancelled));
    }

    #[tokio::test]
    async fn passes_through_success() {
        let token = CancellationToken::new();
        let v = guard_io(async { Ok(5) }, Some(0), Some(&token)).await.unwrap();
        assert_eq!(v, 5);
    }
}
