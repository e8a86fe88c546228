//! # Tessera Editor
//!
//! Structural editing of JSX/TSX source driven by element identities.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: source text → Module (with spans)   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: identities + edit requests          │
//! │  - inject / strip data-oid attributes       │
//! │  - class and text edits                     │
//! │  - move, insert, remove, group, ungroup     │
//! │  - report dirty spans for reprinting        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ printer: Module → source, untouched text    │
//! │ copied verbatim                             │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tessera_editor::{parse_requests, transform_source};
//!
//! let requests = parse_requests(r#"[{ "oid": "a1b2c3d", "textContent": "Hi" }]"#)?;
//! let edit = transform_source(&source, "app/page.tsx", &requests)?;
//! assert_ne!(edit.original, edit.generated);
//! ```

mod actions;
pub mod classes;
mod errors;
pub mod ids;
pub mod layout;
mod request;
mod transform;

pub use classes::{apply_class_edit, merge_classes, ClassEdit};
pub use errors::{TransformError, TransformWarning};
pub use ids::{
    collect_oids, element_oid, generate_oid, inject, inject_node, inject_source, strip,
    strip_source, InjectReport, StripReport, MOVE_KEY_ATTRIBUTE, OID_ATTRIBUTE, RESERVED_PREFIX,
};
pub use request::*;
pub use transform::{transform, transform_source, SourceEdit, TransformReport};
