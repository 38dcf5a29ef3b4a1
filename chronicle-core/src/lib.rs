pub mod config;
pub mod conversation;
pub mod error;
pub mod export;
pub mod linearize;
pub mod pipeline;

pub use config::ChronicleConfig;
pub use conversation::{
    ConversationTree, FlattenedConversation, Message, MessageNode, MessageRole, DEFAULT_TITLE,
};
pub use error::{ChronicleError, Result};
pub use export::{load_export, resolve_export_path, write_flattened};
pub use linearize::{linearize, linearize_tree, select_root, Linearized};
pub use pipeline::{assemble, parse_export_file, Assembly, AssemblyReport};
