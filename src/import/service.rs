//! Import service backing the HTTP surface.
//!
//! Owns the single [`SharedSession`] of the process together with the mapper
//! and importer it runs. Uploads parse synchronously; runs are spawned on the
//! tokio runtime and report progress into the session.

use crate::config::ImportConfig;
use crate::import::batch::{BatchImporter, ImportDefaults};
use crate::import::coordinator::{begin_import, load_export, run_import};
use crate::import::error::ImportError;
use crate::import::mapper::FieldMapper;
use crate::import::session::{ImportSession, SessionError, SessionSnapshot, SharedSession};
use crate::store::ProductStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct ImportService {
    session: SharedSession,
    mapper: FieldMapper,
    importer: BatchImporter,
    config: ImportConfig,
}

impl ImportService {
    pub fn new(store: Arc<dyn ProductStore>, mapper: FieldMapper, config: ImportConfig) -> Self {
        let importer = BatchImporter::new(store, config.batch_size);
        Self {
            session: ImportSession::shared(),
            mapper,
            importer,
            config,
        }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Reset the session and load a selected export file.
    pub fn upload(&self, file_name: &str, input: &[u8]) -> Result<SessionSnapshot, ImportError> {
        load_export(
            &self.session,
            file_name,
            input,
            &self.mapper,
            self.config.preview_size,
        )
    }

    /// Release the in-flight parse after its worker died without reporting back.
    pub fn abandon_parse(&self, message: &str) {
        let mut guard = self.session.lock();
        if let (true, Some(run_id)) = (guard.is_parsing(), guard.run_id()) {
            guard.fail_parse(run_id, message);
        }
    }

    /// Start a background run over the loaded records.
    pub fn start(&self, defaults: ImportDefaults) -> Result<SessionSnapshot, ImportError> {
        let records = begin_import(&self.session, &defaults)?;
        let snapshot = self.session.lock().snapshot();

        let session = self.session.clone();
        let importer = self.importer.clone();
        tokio::spawn(async move {
            if let Err(err) = run_import(session, importer, records, defaults).await {
                log::error!("import run failed: {}", err);
            }
        });

        Ok(snapshot)
    }

    pub fn status(&self) -> SessionSnapshot {
        self.session.lock().snapshot()
    }

    pub fn reset(&self) -> Result<SessionSnapshot, SessionError> {
        let mut guard = self.session.lock();
        guard.reset()?;
        Ok(guard.snapshot())
    }
}
