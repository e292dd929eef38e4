//! Change-notification vocabulary.
//!
//! A [`Watcher`] reports [`Event`]s for the paths it was asked to watch. The
//! crate defines the contract and the values; it ships no watcher.

use std::fmt;
use std::path::Path;

use crossbeam_channel::Receiver;

use crate::FsError;

bitflags::bitflags! {
    /// Kinds of change carried by an [`Event`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct Op: u32 {
        /// An entry was created.
        const CREATE = 1 << 0;
        /// A file was written.
        const WRITE = 1 << 1;
        /// An entry was removed.
        const REMOVE = 1 << 2;
        /// An entry was renamed.
        const RENAME = 1 << 3;
        /// Permissions changed.
        const CHMOD = 1 << 4;
    }
}

impl fmt::Display for Op {
    /// Flag names joined by `|`, always in the order
    /// `CREATE|REMOVE|WRITE|RENAME|CHMOD`; an empty set prints nothing.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const ORDER: [(Op, &str); 5] = [
            (Op::CREATE, "CREATE"),
            (Op::REMOVE, "REMOVE"),
            (Op::WRITE, "WRITE"),
            (Op::RENAME, "RENAME"),
            (Op::CHMOD, "CHMOD"),
        ];
        let mut first = true;
        for (flag, name) in ORDER {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A change to one path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    /// Path of the changed entry.
    pub name: String,
    /// What happened to it.
    pub op: Op,
}

impl Event {
    /// An event for `name`.
    pub fn new(name: impl Into<String>, op: Op) -> Self {
        Self {
            name: name.into(),
            op,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.name, self.op)
    }
}

/// A source of change events for a set of watched paths.
///
/// Events and errors arrive on separate channels. A watcher that drops
/// events because its queue is full sends [`FsError::EventOverflow`] on the
/// error channel. After [`close`](Self::close) both channels disconnect.
pub trait Watcher: Send + Sync {
    /// Start watching `path`.
    fn add(&self, path: &Path) -> Result<(), FsError>;

    /// Stop watching `path`. Fails with `NotFound` if it was not watched.
    fn remove(&self, path: &Path) -> Result<(), FsError>;

    /// Change events.
    fn events(&self) -> &Receiver<Event>;

    /// Errors encountered while watching.
    fn errors(&self) -> &Receiver<FsError>;

    /// Stop watching everything.
    fn close(&self) -> Result<(), FsError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    use crossbeam_channel::{Sender, TrySendError, bounded, unbounded};
    use parking_lot::Mutex;

    /// Forwards changes reported by hand, with a one-slot event queue.
    struct ManualWatcher {
        watched: Mutex<BTreeSet<PathBuf>>,
        senders: Mutex<Option<(Sender<Event>, Sender<FsError>)>>,
        events: Receiver<Event>,
        errors: Receiver<FsError>,
    }

    impl ManualWatcher {
        fn new() -> Self {
            let (event_tx, events) = bounded(1);
            let (error_tx, errors) = unbounded();
            Self {
                watched: Mutex::new(BTreeSet::new()),
                senders: Mutex::new(Some((event_tx, error_tx))),
                events,
                errors,
            }
        }

        fn report(&self, path: &str, op: Op) {
            if !self.watched.lock().contains(Path::new(path)) {
                return;
            }
            if let Some((events, errors)) = self.senders.lock().as_ref() {
                if let Err(TrySendError::Full(_)) = events.try_send(Event::new(path, op)) {
                    let _ = errors.send(FsError::EventOverflow);
                }
            }
        }
    }

    impl Watcher for ManualWatcher {
        fn add(&self, path: &Path) -> Result<(), FsError> {
            self.watched.lock().insert(path.to_path_buf());
            Ok(())
        }

        fn remove(&self, path: &Path) -> Result<(), FsError> {
            if self.watched.lock().remove(path) {
                Ok(())
            } else {
                Err(FsError::NotFound {
                    path: path.to_path_buf(),
                })
            }
        }

        fn events(&self) -> &Receiver<Event> {
            &self.events
        }

        fn errors(&self) -> &Receiver<FsError> {
            &self.errors
        }

        fn close(&self) -> Result<(), FsError> {
            self.watched.lock().clear();
            self.senders.lock().take();
            Ok(())
        }
    }

    #[test]
    fn watcher_is_object_safe() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn Watcher>();
        let _: Box<dyn Watcher> = Box::new(ManualWatcher::new());
    }

    #[test]
    fn watcher_delivers_events_for_watched_paths() {
        let watcher = ManualWatcher::new();
        watcher.add(Path::new("/a")).unwrap();
        watcher.report("/b", Op::CREATE);
        watcher.report("/a", Op::WRITE);
        let event = watcher.events().try_recv().unwrap();
        assert_eq!(event, Event::new("/a", Op::WRITE));
        assert!(watcher.events().try_recv().is_err());

        watcher.remove(Path::new("/a")).unwrap();
        assert!(watcher.remove(Path::new("/a")).unwrap_err().is_not_found());
    }

    #[test]
    fn full_queue_reports_overflow() {
        let watcher = ManualWatcher::new();
        watcher.add(Path::new("/a")).unwrap();
        watcher.report("/a", Op::CREATE);
        watcher.report("/a", Op::WRITE);
        assert!(matches!(
            watcher.errors().try_recv(),
            Ok(FsError::EventOverflow)
        ));
        assert_eq!(
            FsError::EventOverflow.to_string(),
            "event queue overflow"
        );
    }

    #[test]
    fn close_disconnects_channels() {
        let watcher = ManualWatcher::new();
        watcher.add(Path::new("/a")).unwrap();
        watcher.close().unwrap();
        assert!(watcher.events().recv().is_err());
        assert!(watcher.errors().recv().is_err());
    }

    #[test]
    fn op_display_uses_fixed_order() {
        let op = Op::CHMOD | Op::WRITE | Op::CREATE | Op::REMOVE;
        assert_eq!(op.to_string(), "CREATE|REMOVE|WRITE|CHMOD");
        assert_eq!(Op::RENAME.to_string(), "RENAME");
        assert_eq!(Op::empty().to_string(), "");
    }

    #[test]
    fn event_display_quotes_name() {
        let event = Event::new("/tmp/a b", Op::CREATE | Op::WRITE);
        assert_eq!(event.to_string(), "\"/tmp/a b\": CREATE|WRITE");
    }
}
