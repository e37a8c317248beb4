use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("tool provider '{provider}' failed to connect: {reason}")]
    ProviderConnect { provider: String, reason: String },

    #[error("mcp error: {0}")]
    Mcp(String),

    #[error("unknown tool: {0}")]
    ToolNotFound(String),

    #[error("invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("tool '{tool}' failed: {source}")]
    ToolExecution {
        tool: String,
        #[source]
        source: Box<Error>,
    },

    #[error("http error: {0}")]
    Http(String),

    #[error("model client error: {0}")]
    Model(String),

    #[error("channel error: {0}")]
    Channel(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a failure raised while a tool was running.
    pub fn tool_execution(tool: impl Into<String>, source: Error) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_execution_keeps_tool_name_and_cause() {
        let err = Error::tool_execution("github___list_commits", Error::Mcp("pipe closed".into()));
        let text = err.to_string();
        assert!(text.contains("github___list_commits"));
        assert!(text.contains("pipe closed"));

        let source = std::error::Error::source(&err).expect("source should be set");
        assert!(source.to_string().contains("pipe closed"));
    }
}
