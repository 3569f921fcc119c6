//! Cancellation helpers.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// A child of `parent` that also cancels itself after `timeout`.
///
/// Must be called inside a Tokio runtime. The timer task exits as soon as
/// the token is cancelled by either side.
pub fn deadline_token(parent: &CancellationToken, timeout: Duration) -> CancellationToken {
    let token = parent.child_token();
    let timer = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => timer.cancel(),
            _ = timer.cancelled() => {}
        }
    });
    token
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_fires() {
        let parent = CancellationToken::new();
        let token = deadline_token(&parent, Duration::from_millis(10));
        assert!(!token.is_cancelled());

        tokio::time::timeout(Duration::from_secs(5), token.cancelled())
            .await
            .unwrap();
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn test_parent_cancels_child() {
        let parent = CancellationToken::new();
        let token = deadline_token(&parent, Duration::from_secs(3600));
        parent.cancel();
        assert!(token.is_cancelled());
    }
}
