//! Terminal-event enforcement for run streams
//!
//! Every run stream handed to a caller ends with exactly one terminal
//! event. Transports cannot always guarantee that (connections drop,
//! bodies truncate), so this wrapper synthesizes a fatal error terminus
//! whenever the underlying channel ends without one.

use std::pin::Pin;

use futures::{Stream, StreamExt};

use crate::transport::RawRunStream;
use teleflow_core::RunMessage;

/// Wraps a raw transport stream into one with guaranteed termination
///
/// - messages pass through until the first terminal event, which is the
///   last item yielded;
/// - a channel-level error becomes a fatal [`RunMessage::Error`] terminus;
/// - if the channel ends with no terminal event, a synthetic fatal error
///   is appended.
pub(crate) fn ensure_terminal(
    mut inner: RawRunStream,
) -> Pin<Box<dyn Stream<Item = RunMessage> + Send>> {
    Box::pin(async_stream::stream! {
        while let Some(item) = inner.next().await {
            match item {
                Ok(message) => {
                    let terminal = message.is_terminal();
                    yield message;
                    if terminal {
                        return;
                    }
                }
                Err(e) => {
                    yield RunMessage::fatal_error(format!("run stream failed: {e}"));
                    return;
                }
            }
        }
        yield RunMessage::fatal_error("run stream ended without a terminal event");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use futures::stream;

    fn raw(items: Vec<crate::error::Result<RunMessage>>) -> RawRunStream {
        Box::pin(stream::iter(items))
    }

    #[tokio::test]
    async fn test_passes_messages_through_in_order() {
        let collected: Vec<_> = ensure_terminal(raw(vec![
            Ok(RunMessage::RunStarted { run_id: None }),
            Ok(RunMessage::SequenceStatus {
                sequence_id: "fill_form".to_string(),
                success: true,
                error: None,
            }),
            Ok(RunMessage::completed()),
        ]))
        .collect()
        .await;

        assert_eq!(collected.len(), 3);
        assert_eq!(collected[0], RunMessage::RunStarted { run_id: None });
        assert_eq!(collected[2], RunMessage::completed());
    }

    #[tokio::test]
    async fn test_stops_at_first_terminal_event() {
        let collected: Vec<_> = ensure_terminal(raw(vec![
            Ok(RunMessage::RunStarted { run_id: None }),
            Ok(RunMessage::completed()),
            Ok(RunMessage::fatal_error("should never be seen")),
        ]))
        .collect()
        .await;

        assert_eq!(collected.len(), 2);
        assert_eq!(collected[1], RunMessage::completed());
    }

    #[tokio::test]
    async fn test_truncated_stream_gets_synthetic_terminus() {
        let collected: Vec<_> = ensure_terminal(raw(vec![
            Ok(RunMessage::RunStarted { run_id: None }),
            Ok(RunMessage::Error {
                error: "transient".to_string(),
                fatal: false,
            }),
        ]))
        .collect()
        .await;

        assert_eq!(collected.len(), 3);
        let last = collected.last().unwrap();
        assert!(last.is_terminal());
        match last {
            RunMessage::Error { error, fatal } => {
                assert!(*fatal);
                assert!(error.contains("without a terminal event"));
            }
            other => panic!("expected fatal error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_channel_error_becomes_fatal_terminus() {
        let collected: Vec<_> = ensure_terminal(raw(vec![
            Ok(RunMessage::RunStarted { run_id: None }),
            Err(ClientError::WebSocket("connection reset".to_string())),
            Ok(RunMessage::completed()),
        ]))
        .collect()
        .await;

        assert_eq!(collected.len(), 2);
        match &collected[1] {
            RunMessage::Error { error, fatal } => {
                assert!(*fatal);
                assert!(error.contains("connection reset"));
            }
            other => panic!("expected fatal error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exactly_one_terminal_event() {
        let streams = [
            raw(vec![Ok(RunMessage::completed())]),
            raw(vec![Err(ClientError::Connection("refused".to_string()))]),
            raw(vec![Ok(RunMessage::RunStarted { run_id: None })]),
            raw(vec![]),
        ];
        for stream in streams {
            let collected: Vec<_> = ensure_terminal(stream).collect().await;
            let terminal_count = collected.iter().filter(|m| m.is_terminal()).count();
            assert_eq!(terminal_count, 1);
            assert!(collected.last().unwrap().is_terminal());
        }
    }
}
