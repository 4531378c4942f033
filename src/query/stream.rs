//! Answer streams
//!
//! A query's answers travel through a bounded multi-producer,
//! single-consumer channel. Any number of runner tasks hold [`Channel`]
//! writers; the submitter holds the [`AnswerStream`] reader. When the last
//! writer clone is dropped, a single end-of-stream marker is published, so
//! the reader observes the end exactly once and only after every answer
//! that was pushed before it.
//!
//! Backpressure is cooperative: `push` blocks while the buffer is full.
//! Per-writer ordering is preserved; answers from different writers
//! interleave arbitrarily.

use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::time::Duration;

use super::Answer;

enum StreamItem {
    Answer(Answer),
    Eos,
}

// Held by every Channel clone; the last drop publishes EOS.
struct EosGuard {
    tx: SyncSender<StreamItem>,
}

impl Drop for EosGuard {
    fn drop(&mut self) {
        // The reader may already be gone; EOS is then implied.
        let _ = self.tx.send(StreamItem::Eos);
    }
}

/// The writer endpoint of an answer stream. Clone it to hand additional
/// runner tasks their own writer.
#[derive(Clone)]
pub struct Channel {
    tx: SyncSender<StreamItem>,
    _guard: Arc<EosGuard>,
}

impl Channel {
    /// Push an answer, blocking while the buffer is full. Returns `false`
    /// when the reader has gone away and the answer was discarded.
    pub fn push(&self, answer: Answer) -> bool {
        self.tx.send(StreamItem::Answer(answer)).is_ok()
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel").finish_non_exhaustive()
    }
}

/// The reader endpoint of an answer stream.
#[derive(Debug)]
pub struct AnswerStream {
    rx: Receiver<StreamItem>,
}

impl AnswerStream {
    /// Create a bounded stream, returning the initial writer and the
    /// reader.
    pub fn create(capacity: usize) -> (Channel, AnswerStream) {
        let (tx, rx) = sync_channel(capacity.max(1));
        let guard = Arc::new(EosGuard { tx: tx.clone() });
        (Channel { tx, _guard: guard }, AnswerStream { rx })
    }

    /// Receive the next answer, blocking until one arrives or the stream
    /// ends. `None` is returned exactly once, after all pushed answers.
    pub fn recv(&self) -> Option<Answer> {
        match self.rx.recv() {
            Ok(StreamItem::Answer(answer)) => Some(answer),
            Ok(StreamItem::Eos) | Err(_) => None,
        }
    }

    /// Like [`recv`](Self::recv) with an upper bound on the wait.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Answer>, RecvTimeoutError> {
        match self.rx.recv_timeout(timeout) {
            Ok(StreamItem::Answer(answer)) => Ok(Some(answer)),
            Ok(StreamItem::Eos) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
            Err(e @ RecvTimeoutError::Timeout) => Err(e),
        }
    }
}

impl Iterator for AnswerStream {
    type Item = Answer;

    fn next(&mut self) -> Option<Answer> {
        self.recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{Substitution, Term, Variable};
    use std::thread;

    fn answer(var: &str, value: &str) -> Answer {
        let mut sub = Substitution::new();
        sub.set(Variable::new(var), Term::atom(value));
        Answer::new(Arc::new(sub))
    }

    #[test]
    fn eos_follows_all_pushes() {
        let (channel, stream) = AnswerStream::create(8);
        channel.push(answer("X", "a"));
        channel.push(answer("X", "b"));
        drop(channel);

        let collected: Vec<_> = stream.collect();
        assert_eq!(collected.len(), 2);
    }

    #[test]
    fn empty_stream_is_a_legitimate_result() {
        let (channel, stream) = AnswerStream::create(4);
        drop(channel);
        assert!(stream.recv().is_none());
        // a second recv stays at end of stream
        assert!(stream.recv().is_none());
    }

    #[test]
    fn eos_waits_for_every_writer() {
        let (channel, stream) = AnswerStream::create(8);
        let second = channel.clone();
        drop(channel);

        // the remaining writer keeps the stream open
        assert!(stream
            .recv_timeout(Duration::from_millis(20))
            .is_err());

        second.push(answer("X", "a"));
        assert!(stream.recv().is_some());
        drop(second);
        assert!(stream.recv().is_none());
    }

    #[test]
    fn per_writer_order_is_preserved() {
        let (channel, stream) = AnswerStream::create(64);
        let writer = channel.clone();
        drop(channel);

        let producer = thread::spawn(move || {
            for value in ["a", "b", "c", "d"] {
                writer.push(answer("X", value));
            }
        });

        let received: Vec<String> = stream
            .map(|a| a.substitution().get_by_name("X").unwrap().to_string())
            .collect();
        producer.join().unwrap();
        assert_eq!(received, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn writers_block_under_backpressure_until_reader_drains() {
        let (channel, stream) = AnswerStream::create(1);
        let producer = thread::spawn(move || {
            for value in ["a", "b", "c"] {
                channel.push(answer("X", value));
            }
        });

        let mut count = 0;
        for _ in stream {
            count += 1;
            thread::yield_now();
        }
        producer.join().unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn push_after_reader_drop_reports_false() {
        let (channel, stream) = AnswerStream::create(1);
        drop(stream);
        assert!(!channel.push(answer("X", "a")));
    }
}
