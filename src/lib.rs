pub mod adapter;
pub mod error;
pub mod model;
pub mod resolver;
pub mod schema;
pub mod serializer;
pub mod source;

use serde::{Deserialize, Serialize};

pub use adapter::{Adapter, CompatConfig, DirectoryMeta};
pub use error::CompatError;
pub use model::{Author, BodyNode, DocCategory, DocDate, Document, StructuralKind};
pub use resolver::{AliasResolver, AliasTable, ResolvedKey};
pub use serializer::Serializer;
pub use source::{FetchOutcome, Fragment, FragmentMeta, IndexableSource, MemorySource};

/// How reference fragments appear in serialized output: embedded literally
/// (`Inline`) or left as an include pointer for the consumer to resolve
/// (`Reference`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IncludeMode {
    Inline,
    Reference,
}
