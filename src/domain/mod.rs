pub mod error;
pub mod flow;
pub mod normalize;
pub mod registry;
pub mod schema;
pub mod template;
pub mod tier;

pub use error::{FlowError, ModelError};
pub use flow::{FlowDefinition, ModelConfig};
pub use normalize::{ValidationError, ValidationReason, normalize};
pub use registry::FlowRegistry;
pub use schema::{FieldKind, FieldSchema, Record, Schema, verify_schema};
pub use template::{RenderError, TemplateRenderer};
pub use tier::{AccessRule, Tier, TierGate};
