mod model_client;
mod template;

pub use model_client::HttpModelClient;
pub use template::MiniJinjaRenderer;
