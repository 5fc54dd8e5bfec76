mod model_client;

pub use model_client::{GenerateRequest, ModelClient, ScriptedModelClient};
