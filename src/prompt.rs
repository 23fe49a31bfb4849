//! Operator prompts: device selection and the "press ENTER" pause.

use crate::error::{AuditError, AuditResult};
use crate::models::DeviceProfile;
use crate::session::CompletionSignal;
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tracing::debug;

const DEVICE_QUESTION: &str = "Select device type for Lighthouse audit (mobile/desktop): ";

/// Line-oriented console over any reader/writer pair.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<BufReader<Stdin>, Stdout> {
    /// Console bound to the process's stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Ask for a device type until the answer is `mobile` or `desktop`.
    pub async fn select_device(&mut self) -> AuditResult<DeviceProfile> {
        loop {
            let answer = self.ask(DEVICE_QUESTION).await?;
            match answer.parse::<DeviceProfile>() {
                Ok(device) => return Ok(device),
                Err(e) => debug!("Rejected device answer: {}", e),
            }
        }
    }

    /// Print `question` and read one line. EOF is an error.
    async fn ask(&mut self, question: &str) -> AuditResult<String> {
        self.output.write_all(question.as_bytes()).await?;
        self.output.flush().await?;

        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            return Err(AuditError::PromptClosed);
        }
        Ok(line)
    }
}

#[async_trait]
impl<R, W> CompletionSignal for Console<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn wait_for_operator(&mut self, instructions: &str) -> AuditResult<()> {
        self.output.write_all(instructions.as_bytes()).await?;
        self.ask("Press ENTER here to continue... ").await?;
        Ok(())
    }
}
