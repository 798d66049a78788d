//! Stdin and stdout handling for the CLI
//!
//! - `check` writes one JSON report object to stdout
//! - `audit` reads one JSON notification payload per stdin line

use std::io::{self, Write};

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use super::errors::CliResult;

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

/// Forward non-blank lines from `reader` into `events` until EOF or until the
/// receiver is closed. Returns the number of lines forwarded.
pub async fn forward_lines<R>(reader: R, events: mpsc::Sender<Vec<u8>>) -> CliResult<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if events.send(line.into_bytes()).await.is_err() {
            break;
        }
        forwarded += 1;
    }

    Ok(forwarded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forward_lines_skips_blank() {
        let input: &[u8] = b"first\n\n  \nsecond\n";
        let (tx, mut rx) = mpsc::channel(8);

        let forwarded = forward_lines(input, tx).await.unwrap();

        assert_eq!(forwarded, 2);
        assert_eq!(rx.recv().await.unwrap(), b"first".to_vec());
        assert_eq!(rx.recv().await.unwrap(), b"second".to_vec());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_forward_lines_stops_when_closed() {
        let input: &[u8] = b"a\nb\nc\n";
        let (tx, rx) = mpsc::channel(8);
        drop(rx);

        assert_eq!(forward_lines(input, tx).await.unwrap(), 0);
    }
}
