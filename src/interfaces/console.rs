//! Line-oriented chat host for driving the plugin from a terminal or a pipe.
//!
//! ```text
//! /cointip U1 balance        command `cointip` from user U1
//! /btc U1                    command `btc`
//! react U1 U2 cointip_5      U1 reacts with cointip_5 on a post by U2
//! ```

use crate::application::plugin::CointipPlugin;
use crate::domain::event::{Reply, TipEvent};
use crate::error::{Result, TipError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Debug, PartialEq, Eq)]
pub enum HostInput {
    Command {
        name: String,
        user_key: String,
        text: String,
    },
    Reaction(TipEvent),
}

/// Parses one input line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<HostInput>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    if let Some(rest) = line.strip_prefix('/') {
        let mut parts = rest.splitn(3, char::is_whitespace);
        let name = parts.next().unwrap_or_default();
        let user_key = parts.next().unwrap_or_default();
        if name.is_empty() || user_key.is_empty() {
            return Err(TipError::validation("usage: /<command> <user> [text]"));
        }
        return Ok(Some(HostInput::Command {
            name: name.to_string(),
            user_key: user_key.to_string(),
            text: parts.next().unwrap_or_default().trim().to_string(),
        }));
    }

    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        ["react", actor, target, symbol] => {
            Ok(Some(HostInput::Reaction(TipEvent::new(*actor, *target, *symbol))))
        }
        _ => Err(TipError::validation(
            "expected `/<command> <user> [text]` or `react <actor> <target> <symbol>`",
        )),
    }
}

fn render(reply: &Reply) -> String {
    let scope = if reply.in_channel { "channel" } else { "private" };
    format!("[{scope}] {}\n", reply.text)
}

/// Feeds every input line to `plugin` and writes replies to `output` until
/// the input ends or `cancel` fires.
pub async fn serve<R, W>(
    plugin: &CointipPlugin,
    input: R,
    mut output: W,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let io_error = |e: std::io::Error| TipError::Config(format!("console i/o failed: {e}"));
    let mut lines = input.lines();

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            line = lines.next_line() => line.map_err(io_error)?,
        };
        let Some(line) = line else {
            return Ok(());
        };

        let rendered = match parse_line(&line) {
            Ok(None) => continue,
            Ok(Some(HostInput::Command {
                name,
                user_key,
                text,
            })) => match plugin.dispatch_command(&name, &user_key, &text).await {
                Ok(reply) => render(&reply),
                Err(TipError::PluginStopped) => return Ok(()),
                Err(e) => format!("[error] {e}\n"),
            },
            Ok(Some(HostInput::Reaction(event))) => match plugin.dispatch_reaction(event).await {
                Err(TipError::PluginStopped) => return Ok(()),
                _ => continue,
            },
            Err(e) => {
                warn!(error = %e, %line, "ignoring console input");
                format!("[error] {e}\n")
            }
        };
        output
            .write_all(rendered.as_bytes())
            .await
            .map_err(io_error)?;
        output.flush().await.map_err(io_error)?;
    }
}
