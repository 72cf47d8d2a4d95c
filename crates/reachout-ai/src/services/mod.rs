mod generation;
mod template;
mod types;

pub use generation::GenerationService;
pub use template::{render_template, CreateTemplateRequest, TemplateService};
pub use types::AiError;
