// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tool and entity-type registries.

mod entity_type;
mod tool;

pub use entity_type::{EntityTypeDefinition, EntityTypeRegistry};
pub use tool::{ToolAnnotations, ToolDefinition, ToolHandler, ToolRegistry};
