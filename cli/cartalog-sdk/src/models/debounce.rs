//! Settling of the free text keyword.
//!
//! Raw keyword edits arrive once per keystroke. A value is only handed on
//! once no further edit arrived for a quiet period, which is longer after
//! deletions so trimming a search term does not query for every prefix.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

/// How long the keyword must stay unchanged before it settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietPeriod {
    pub typing: Duration,
    pub deletion: Duration,
}

impl Default for QuietPeriod {
    fn default() -> Self {
        QuietPeriod {
            typing: Duration::from_millis(300),
            deletion: Duration::from_millis(2000),
        }
    }
}

impl QuietPeriod {
    pub fn for_edit(&self, edit: &KeywordEdit) -> Duration {
        if edit.deletion {
            self.deletion
        } else {
            self.typing
        }
    }
}

/// The keyword after a single keystroke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordEdit {
    pub value: String,
    /// Whether the keystroke removed text.
    pub deletion: bool,
}

impl KeywordEdit {
    pub fn typed(value: impl Into<String>) -> Self {
        KeywordEdit {
            value: value.into(),
            deletion: false,
        }
    }

    pub fn deleted(value: impl Into<String>) -> Self {
        KeywordEdit {
            value: value.into(),
            deletion: true,
        }
    }

    /// Classify an edit without a key event, a shorter value counts as a deletion.
    pub fn between(previous: &str, current: impl Into<String>) -> Self {
        let value = current.into();
        KeywordEdit {
            deletion: value.chars().count() < previous.chars().count(),
            value,
        }
    }
}

#[derive(Debug)]
enum Input {
    Edit(KeywordEdit),
    /// The keyword was cleared elsewhere.
    Reset,
}

/// A background task settling keyword edits.
///
/// Dropping the debouncer stops the task,
/// a pending value is discarded and never reaches the sink.
#[derive(Debug)]
pub struct KeywordDebouncer {
    edits: mpsc::UnboundedSender<Input>,
    task: JoinHandle<()>,
}

impl KeywordDebouncer {
    /// Spawn the debouncer onto the current runtime.
    ///
    /// `on_settled` receives every settled keyword that differs from the
    /// previously settled one. The keyword is assumed to start out empty,
    /// and is empty again after [`KeywordDebouncer::reset`].
    pub fn spawn<F>(quiet: QuietPeriod, on_settled: F) -> Self
    where
        F: FnMut(String) + Send + 'static,
    {
        let (edits, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(settle(receiver, quiet, on_settled));
        KeywordDebouncer { edits, task }
    }

    /// Feed an edit, restarting the quiet period.
    ///
    /// Returns `false` if the debouncer is no longer running.
    pub fn push(&self, edit: KeywordEdit) -> bool {
        self.edits.send(Input::Edit(edit)).is_ok()
    }

    /// Discard the pending value and start over from an empty keyword.
    ///
    /// Edits pushed before the reset never settle.
    pub fn reset(&self) -> bool {
        self.edits.send(Input::Reset).is_ok()
    }
}

impl Drop for KeywordDebouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn settle<F>(mut edits: mpsc::UnboundedReceiver<Input>, quiet: QuietPeriod, mut on_settled: F)
where
    F: FnMut(String),
{
    let mut pending: Option<(String, Instant)> = None;
    let mut last_settled = String::new();

    loop {
        let deadline = pending.as_ref().map(|(_, deadline)| *deadline);
        let edit = match deadline {
            // queued input wins over an expired deadline
            Some(deadline) => tokio::select! {
                biased;
                edit = edits.recv() => edit,
                _ = tokio::time::sleep_until(deadline) => {
                    let Some((value, _)) = pending.take() else {
                        continue;
                    };
                    if value == last_settled {
                        trace!("keyword unchanged, not settling");
                    } else {
                        debug!(keyword = %value, "keyword settled");
                        last_settled = value.clone();
                        on_settled(value);
                    }
                    continue;
                },
            },
            None => edits.recv().await,
        };

        let edit = match edit {
            Some(Input::Edit(edit)) => edit,
            Some(Input::Reset) => {
                debug!(discarded = pending.is_some(), "keyword reset");
                pending = None;
                last_settled.clear();
                continue;
            },
            None => {
                debug!(discarded = pending.is_some(), "keyword input closed");
                break;
            },
        };

        let wait = quiet.for_edit(&edit);
        trace!(keyword = %edit.value, deletion = edit.deletion, ?wait, "keyword edited");
        pending = Some((edit.value, Instant::now() + wait));
    }
}
