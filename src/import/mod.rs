//! Product export import pipeline.
//!
//! Moves a storefront CSV export into the catalog service:
//!
//! 1. **Parsing** (`parser`) - CSV bytes into header-keyed [`RawRow`]s
//! 2. **Mapping** (`mapper`) - heuristic extraction into [`ProductRecord`]s
//! 3. **Batch import** (`batch`) - bounded-concurrency creates with progress
//! 4. **Session** (`session`) - transient state surfaced to the operator
//! 5. **Coordination** (`coordinator`) - runs the stages against a session
//! 6. **Service** (`service`) - the process-wide session behind the HTTP routes
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use catalog_import::import::{BatchImporter, FieldMapper, ImportDefaults, parse_export};
//!
//! let parsed = parse_export("wc-export.csv", &bytes, &FieldMapper::new(mapper_config))?;
//! let importer = BatchImporter::new(store, 10);
//! let summary = importer
//!     .import(&parsed.records, &ImportDefaults::default(), |p| println!("{}%", p.percent))
//!     .await?;
//!
//! println!("{}", summary.message());
//! ```

pub mod batch;
pub mod coordinator;
pub mod error;
pub mod mapper;
pub mod parser;
pub mod record;
pub mod service;
pub mod session;
pub mod stats;

pub use batch::{BatchImporter, BatchProgress, ImportDefaults, ImportSummary, RecordFailure, RunOutcome};
pub use coordinator::{ParsedExport, begin_import, load_export, parse_export, run_import};
pub use error::{ImportError, ParseError};
pub use mapper::{DescriptionField, FieldMapper};
pub use parser::{RawRow, parse_rows, validate_file_name};
pub use record::{CreatedProduct, ProductRecord};
pub use service::ImportService;
pub use session::{ImportSession, SessionError, SessionSnapshot, SharedSession};
pub use stats::ImportStats;
