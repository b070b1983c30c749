use crate::assistant::{self, Assistant, Mode};
use crate::chat::{self as session, ChatSession, Message, Role};
use crate::clock::Clock;
use crate::commands::{open_escrow, Out};
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::warn;

const PROMPT: &str = "> ";

/// Chats with the assistant. With `message` the question is asked once and the reply printed;
/// without it questions are read from stdin, one per line, until end of input.
pub async fn chat(
    config: &Config,
    clock: Arc<dyn Clock>,
    mode: Mode,
    message: Option<&str>,
) -> Result<Out<Vec<Message>>> {
    let assistant = assistant::assistant(config, mode).pub_result(ErrorType::Service)?;
    match message {
        Some(text) => chat_once(config, clock, assistant.as_ref(), text).await,
        None => {
            let stdin = BufReader::new(tokio::io::stdin());
            let stdout = tokio::io::stdout();
            chat_interactive(config, clock, assistant.as_ref(), stdin, stdout).await
        }
    }
}

async fn chat_once(
    config: &Config,
    clock: Arc<dyn Clock>,
    assistant: &dyn Assistant,
    text: &str,
) -> Result<Out<Vec<Message>>> {
    let escrow = open_escrow(config, clock).await?;
    let mut session = ChatSession::new();
    let reply = session
        .submit(escrow.state(), assistant, text)
        .await
        .pub_result(ErrorType::Validation)?
        .text
        .clone();
    Ok(Out::new(reply, session.transcript().to_vec()))
}

async fn chat_interactive<R, W>(
    config: &Config,
    clock: Arc<dyn Clock>,
    assistant: &dyn Assistant,
    reader: R,
    mut writer: W,
) -> Result<Out<Vec<Message>>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut escrow = open_escrow(config, clock).await?;
    let mut session = ChatSession::new();
    write_line(&mut writer, session::GREETING).await?;
    write_prompt(&mut writer).await?;

    let mut lines = reader.lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("Unable to read from stdin")?
    {
        if line.trim().is_empty() {
            write_prompt(&mut writer).await?;
            continue;
        }
        // The scheduler may be running in another process.
        if let Err(e) = escrow.reload().await {
            warn!("Unable to reload the wallet, answering from the last copy: {e:#}");
        }
        let reply = session
            .submit(escrow.state(), assistant, &line)
            .await
            .pub_result(ErrorType::Validation)?
            .text
            .clone();
        write_line(&mut writer, &reply).await?;
        write_prompt(&mut writer).await?;
    }
    write_line(&mut writer, "").await?;

    let exchanged = session
        .transcript()
        .iter()
        .filter(|m| m.role == Role::User)
        .count();
    Ok(Out::new(
        format!("Chat ended after {exchanged} messages"),
        session.transcript().to_vec(),
    ))
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, text: &str) -> Result<()> {
    writer
        .write_all(format!("{text}\n").as_bytes())
        .await
        .context("Unable to write to stdout")?;
    writer.flush().await.context("Unable to write to stdout")
}

async fn write_prompt<W: AsyncWrite + Unpin>(writer: &mut W) -> Result<()> {
    writer
        .write_all(PROMPT.as_bytes())
        .await
        .context("Unable to write to stdout")?;
    writer.flush().await.context("Unable to write to stdout")
}

/// Asks the assistant for a one-sentence summary of the payment history.
pub async fn analyze(config: &Config, clock: Arc<dyn Clock>, mode: Mode) -> Result<Out<String>> {
    let assistant = assistant::assistant(config, mode).pub_result(ErrorType::Service)?;
    analyze_with(config, clock, assistant.as_ref()).await
}

async fn analyze_with(
    config: &Config,
    clock: Arc<dyn Clock>,
    assistant: &dyn Assistant,
) -> Result<Out<String>> {
    let escrow = open_escrow(config, clock).await?;
    let summary = session::analyze(escrow.state(), assistant).await;
    Ok(Out::new(summary.clone(), summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::TestAssistant;
    use crate::chat::{CONNECTION_FALLBACK, GREETING};
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_chat_once() {
        let env = TestEnv::new().await;
        let assistant = TestAssistant::with_replies(["You have $1,200.00."]);
        let out = chat_once(&env.config(), env.clock(), &assistant, "Balance?")
            .await
            .unwrap();
        assert_eq!(out.message(), "You have $1,200.00.");
        assert_eq!(out.structure().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_chat_once_blank_is_rejected() {
        let env = TestEnv::new().await;
        let assistant = TestAssistant::default();
        assert!(chat_once(&env.config(), env.clock(), &assistant, " ")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_chat_in_test_mode() {
        let env = TestEnv::new().await;
        let out = chat(&env.config(), env.clock(), Mode::Test, Some("hello"))
            .await
            .unwrap();
        assert_eq!(out.message(), "(test mode) You said: hello");
    }

    #[tokio::test]
    async fn test_chat_interactive() {
        let env = TestEnv::new().await;
        let assistant = TestAssistant::with_replies(["first reply"]);
        let input: &[u8] = b"What is my balance?\n\n   \nDraft a text to Alex\n";
        let mut output = Vec::new();

        let out = chat_interactive(&env.config(), env.clock(), &assistant, input, &mut output)
            .await
            .unwrap();

        let transcript = out.structure().unwrap();
        assert_eq!(transcript.len(), 5);
        assert_eq!(transcript[0].text, GREETING);
        assert_eq!(transcript[1].text, "What is my balance?");
        assert_eq!(transcript[2].text, "first reply");
        assert_eq!(transcript[4].text, "(test mode) You said: Draft a text to Alex");
        assert_eq!(out.message(), "Chat ended after 2 messages");

        let printed = String::from_utf8(output).unwrap();
        assert!(printed.starts_with(GREETING));
        assert!(printed.contains("> first reply\n"));

        let calls = assistant.calls();
        assert!(calls[1]
            .system
            .as_deref()
            .unwrap()
            .contains("Current Balance: $1,200.00"));
    }

    #[tokio::test]
    async fn test_chat_interactive_failure_keeps_going() {
        let env = TestEnv::new().await;
        let assistant = TestAssistant::failing();
        let input: &[u8] = b"one\ntwo\n";
        let mut output = Vec::new();
        let out = chat_interactive(&env.config(), env.clock(), &assistant, input, &mut output)
            .await
            .unwrap();
        let transcript = out.structure().unwrap();
        assert_eq!(transcript.len(), 5);
        assert_eq!(transcript[2].text, CONNECTION_FALLBACK);
        assert_eq!(transcript[4].text, CONNECTION_FALLBACK);
    }

    #[tokio::test]
    async fn test_analyze() {
        let env = TestEnv::new().await;
        let assistant = TestAssistant::with_replies(["Steady weekly payments."]);
        let out = analyze_with(&env.config(), env.clock(), &assistant)
            .await
            .unwrap();
        assert_eq!(out.message(), "Steady weekly payments.");
    }
}
