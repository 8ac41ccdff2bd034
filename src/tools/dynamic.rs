//! Tools discovered at runtime from an external tool server.

use std::sync::Arc;

use async_trait::async_trait;

use super::arguments::ToolArguments;
use super::tool::Tool;
use super::types::AgentToolParameters;
use crate::error::AgentError;

/// A tool advertised by a [`DynamicToolProvider`].
#[derive(Debug, Clone)]
pub struct DynamicTool {
    pub name: String,
    pub description: String,
    pub parameters: AgentToolParameters,
}

/// Source of runtime-discovered tools that also executes them.
#[async_trait]
pub trait DynamicToolProvider: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<DynamicTool>, AgentError>;

    async fn execute_tool(
        &self,
        name: &str,
        args: &ToolArguments,
    ) -> Result<serde_json::Value, AgentError>;
}

/// Exposes one [`DynamicTool`] through the [`Tool`] trait.
pub struct DynamicToolAdapter {
    provider: Arc<dyn DynamicToolProvider>,
    name: String,
    description: String,
    parameters: AgentToolParameters,
}

impl DynamicToolAdapter {
    pub fn new(provider: Arc<dyn DynamicToolProvider>, tool: DynamicTool) -> Self {
        Self {
            provider,
            name: tool.name,
            description: tool.description,
            parameters: tool.parameters,
        }
    }
}

#[async_trait]
impl Tool for DynamicToolAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &AgentToolParameters {
        &self.parameters
    }

    async fn execute(&self, args: &ToolArguments) -> Result<serde_json::Value, AgentError> {
        self.provider.execute_tool(&self.name, args).await
    }
}

/// Wrap every tool the provider lists as a [`Tool`].
pub async fn discover_tools(
    provider: Arc<dyn DynamicToolProvider>,
) -> Result<Vec<Arc<dyn Tool>>, AgentError> {
    let tools = provider.list_tools().await?;
    Ok(tools
        .into_iter()
        .map(|tool| Arc::new(DynamicToolAdapter::new(Arc::clone(&provider), tool)) as Arc<dyn Tool>)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingProvider {
        last_call: Mutex<Option<(String, serde_json::Value)>>,
    }

    #[async_trait]
    impl DynamicToolProvider for RecordingProvider {
        async fn list_tools(&self) -> Result<Vec<DynamicTool>, AgentError> {
            Ok(vec![
                DynamicTool {
                    name: "find".into(),
                    description: "Run a find query".into(),
                    parameters: AgentToolParameters::empty(),
                },
                DynamicTool {
                    name: "count".into(),
                    description: "Count documents".into(),
                    parameters: AgentToolParameters::empty(),
                },
            ])
        }

        async fn execute_tool(
            &self,
            name: &str,
            args: &ToolArguments,
        ) -> Result<serde_json::Value, AgentError> {
            *self.last_call.lock().expect("lock should succeed") =
                Some((name.to_string(), args.raw().clone()));
            Ok(serde_json::json!({ "ok": true }))
        }
    }

    #[tokio::test]
    async fn discovered_tools_delegate_to_provider() {
        let provider = Arc::new(RecordingProvider {
            last_call: Mutex::new(None),
        });
        let tools = discover_tools(provider.clone()).await.unwrap();
        assert_eq!(
            tools.iter().map(|t| t.name()).collect::<Vec<_>>(),
            vec!["find", "count"]
        );

        let result = tools[1]
            .execute(&ToolArguments::new(serde_json::json!({"collection": "todos"})))
            .await
            .expect("execute should succeed");
        assert_eq!(result["ok"], true);

        let last_call = provider.last_call.lock().expect("lock should succeed").clone();
        assert_eq!(
            last_call,
            Some(("count".to_string(), serde_json::json!({"collection": "todos"})))
        );
    }
}
