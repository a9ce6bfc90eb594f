use std::sync::Arc;

use ragpipe_core::{Error, Result, SearchProvider};
use ragpipe_local::search::{ExaSearchProvider, TavilySearchProvider};

/// One registered search capability: a stable name, a line of routing
/// guidance, and the provider that implements it.
pub struct SearchTool {
    pub name: &'static str,
    pub description: &'static str,
    pub provider: Arc<dyn SearchProvider>,
}

/// Capability table mapping tool names to providers.
///
/// Built once at startup from whatever the environment configures and then
/// passed by reference into the orchestrator; tool dispatch is a plain
/// lookup, never reflection.
#[derive(Default)]
pub struct SearchToolRegistry {
    tools: Vec<SearchTool>,
}

impl SearchToolRegistry {
    /// Registers every provider the environment has credentials for.
    /// Registration order doubles as the default preference order.
    pub fn from_env(client: &reqwest::Client) -> Self {
        let mut registry = Self::default();
        if let Ok(provider) = ExaSearchProvider::from_env(client.clone()) {
            registry.register(SearchTool {
                name: "exa_search",
                description: "Web search via Exa; strongest on technical and programming topics.",
                provider: Arc::new(provider),
            });
        }
        if let Ok(provider) = TavilySearchProvider::from_env(client.clone()) {
            registry.register(SearchTool {
                name: "tavily_search",
                description: "General-purpose web search via Tavily.",
                provider: Arc::new(provider),
            });
        }
        registry
    }

    pub fn register(&mut self, tool: SearchTool) {
        self.tools.push(tool);
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name).collect()
    }

    pub fn get(&self, name: &str) -> Option<&SearchTool> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// Resolves the tool to use: the explicit preference if given, else the
    /// first registered one.
    pub fn resolve(&self, preference: Option<&str>) -> Result<&SearchTool> {
        match preference {
            Some(name) => self.get(name).ok_or_else(|| {
                Error::NotConfigured(format!(
                    "unknown or unconfigured search tool {name:?}; available: {:?}",
                    self.names()
                ))
            }),
            None => self.tools.first().ok_or_else(|| {
                Error::NotConfigured(
                    "no search tool configured; set EXA_API_KEY or TAVILY_API_KEY".to_string(),
                )
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragpipe_core::{SearchQuery, SearchResponse};

    struct NullProvider(&'static str);

    #[async_trait::async_trait]
    impl SearchProvider for NullProvider {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn search(&self, _q: &SearchQuery) -> Result<SearchResponse> {
            Ok(SearchResponse {
                results: Vec::new(),
                provider: self.0.to_string(),
            })
        }
    }

    fn tool(name: &'static str) -> SearchTool {
        SearchTool {
            name,
            description: "test tool",
            provider: Arc::new(NullProvider(name)),
        }
    }

    #[test]
    fn resolve_defaults_to_the_first_registered_tool() {
        let mut registry = SearchToolRegistry::default();
        registry.register(tool("exa_search"));
        registry.register(tool("tavily_search"));
        assert_eq!(registry.resolve(None).unwrap().name, "exa_search");
    }

    #[test]
    fn resolve_honors_an_explicit_preference() {
        let mut registry = SearchToolRegistry::default();
        registry.register(tool("exa_search"));
        registry.register(tool("tavily_search"));
        assert_eq!(
            registry.resolve(Some("tavily_search")).unwrap().name,
            "tavily_search"
        );
    }

    #[test]
    fn unknown_or_missing_tools_are_configuration_errors() {
        let mut registry = SearchToolRegistry::default();
        assert!(matches!(
            registry.resolve(None),
            Err(Error::NotConfigured(_))
        ));
        registry.register(tool("exa_search"));
        assert!(matches!(
            registry.resolve(Some("bing_search")),
            Err(Error::NotConfigured(_))
        ));
    }
}
