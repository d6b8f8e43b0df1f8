//! Power actions through `shutdown`.

use tracing::debug;

use super::invoke;
use crate::domain::{ShutdownAction, ShutdownOptions};
use crate::error::Result;
use crate::ports::CommandRunner;

/// Runs `shutdown`.
pub struct ShutdownService<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> ShutdownService<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub async fn execute(&self, options: &ShutdownOptions) -> Result<String> {
        let output = invoke(&self.runner, options).await?;
        debug!(action = ?options.action, remote = ?options.remote, "shutdown accepted");
        Ok(output)
    }

    /// Cancel a pending shutdown, locally or on `remote`.
    pub async fn abort(&self, remote: Option<&str>) -> Result<String> {
        let mut options = ShutdownOptions::new(ShutdownAction::Abort);
        if let Some(remote) = remote {
            options = options.with_remote(remote);
        }
        self.execute(&options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::MockRunner;
    use crate::domain::{ReasonKind, ShutdownReason};
    use crate::error::Error;
    use crate::ports::CommandOutput;

    #[tokio::test]
    async fn test_restart() {
        let service = ShutdownService::new(MockRunner::new().respond_stdout(""));
        let options = ShutdownOptions::new(ShutdownAction::Restart)
            .with_timeout(60)
            .with_reason(ShutdownReason::new(ReasonKind::Planned, 4, 1));

        service.execute(&options).await.unwrap();

        assert_eq!(service.runner().calls(), vec!["shutdown /r /t 60 /d p:4:1"]);
    }

    #[tokio::test]
    async fn test_abort() {
        let service = ShutdownService::new(
            MockRunner::new().respond_stdout("").respond_stdout(""),
        );

        service.abort(None).await.unwrap();
        service.abort(Some("srv01")).await.unwrap();

        assert_eq!(
            service.runner().calls(),
            vec!["shutdown /a", r"shutdown /a /m \\srv01"]
        );
    }

    #[tokio::test]
    async fn test_nothing_to_abort() {
        let service = ShutdownService::new(MockRunner::new().respond(CommandOutput {
            status: Some(1116),
            stdout: String::new(),
            stderr: "Unable to abort the system shutdown because no shutdown was in progress.(1116)"
                .into(),
        }));

        let err = service.abort(None).await.unwrap_err();

        assert!(matches!(err, Error::Invocation { .. }));
    }

    #[tokio::test]
    async fn test_invalid_options_rejected() {
        let service = ShutdownService::new(MockRunner::new());
        let options = ShutdownOptions::new(ShutdownAction::PowerOff).with_timeout(10);

        assert!(matches!(
            service.execute(&options).await,
            Err(Error::InvalidParameter(_))
        ));
        assert!(service.runner().calls().is_empty());
    }
}
