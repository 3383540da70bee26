//! One-shot recovery from "not mounted" metadata failures.

use std::sync::Weak;

use tracing::{debug, warn};

use crate::error::{LoadError, LoadResult};
use crate::location::{Location, SourceFile};

/// Credentials handed back from a password prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountCredentials {
    pub username: String,
    pub password: String,
    pub domain: Option<String>,
}

/// User-interaction hooks used while mounting a volume.
///
/// Both prompts default to "no answer", which makes the mount fail if the
/// backend needs one.
pub trait MountOperation: Send + Sync {
    fn ask_password(&self, _message: &str, _default_user: &str) -> Option<MountCredentials> {
        None
    }

    /// Returns the index of the chosen answer.
    fn ask_question(&self, _message: &str, _choices: &[&str]) -> Option<usize> {
        None
    }
}

/// Produces a [`MountOperation`] for a given document.
pub trait MountOperationFactory: Send + Sync {
    fn create(&self, file: Option<&dyn SourceFile>) -> Box<dyn MountOperation>;
}

/// Mount operation that never answers a prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInteraction;

impl MountOperation for NoInteraction {}

impl MountOperationFactory for NoInteraction {
    fn create(&self, _file: Option<&dyn SourceFile>) -> Box<dyn MountOperation> {
        Box::new(NoInteraction)
    }
}

/// Tracks whether mount recovery was already attempted for one operation.
#[derive(Debug, Default)]
pub(crate) struct MountRecovery {
    tried: bool,
}

impl MountRecovery {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn can_attempt(&self) -> bool {
        !self.tried
    }

    /// Mount the volume enclosing `location`.
    ///
    /// The attempt is consumed even when the mount fails.
    pub(crate) async fn recover(
        &mut self,
        location: &dyn Location,
        file: &Weak<dyn SourceFile>,
        factory: &dyn MountOperationFactory,
    ) -> LoadResult<()> {
        self.tried = true;

        let operation = {
            let file = file.upgrade();
            factory.create(file.as_deref())
        };

        warn!(location = %location.display_name(), "location not mounted, trying to mount it");
        location
            .mount_enclosing_volume(operation.as_ref())
            .await
            .map_err(LoadError::MountFailed)?;

        if let Some(file) = file.upgrade() {
            file.mark_mounted();
        }
        debug!(location = %location.display_name(), "enclosing volume mounted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{MemoryFile, MemoryLocation};

    #[test]
    fn test_no_interaction_answers_nothing() {
        let op = NoInteraction.create(None);
        assert_eq!(op.ask_password("password?", "me"), None);
        assert_eq!(op.ask_question("continue?", &["yes", "no"]), None);
    }

    #[tokio::test]
    async fn test_recovery_marks_file_mounted() {
        let location = Arc::new(MemoryLocation::new(b"abc".to_vec()).not_mounted_times(1));
        let file: Arc<dyn SourceFile> = Arc::new(MemoryFile::new(location.clone()));
        let weak = Arc::downgrade(&file);

        let mut recovery = MountRecovery::new();
        assert!(recovery.can_attempt());
        recovery.recover(location.as_ref(), &weak, &NoInteraction).await.unwrap();
        assert!(!recovery.can_attempt());
        assert_eq!(location.mount_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_mount_consumes_attempt() {
        let location = MemoryLocation::new(Vec::<u8>::new()).fail_mount();
        let file: Weak<dyn SourceFile> = Weak::<MemoryFile>::new();

        let mut recovery = MountRecovery::new();
        let err = recovery.recover(&location, &file, &NoInteraction).await.unwrap_err();
        assert!(matches!(err, LoadError::MountFailed(_)));
        assert!(!recovery.can_attempt());
    }
}
