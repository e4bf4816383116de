use crate::config::PipelineConfig;

/// Per-run overrides. Anything left unset falls back to the `[pipeline]` config.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub kind: Option<String>,
    pub pages: Option<u32>,
}

impl RunOptions {
    pub fn resolve(&self, config: &PipelineConfig) -> (String, u32) {
        let kind = self
            .kind
            .clone()
            .unwrap_or_else(|| config.default_kind.to_string());
        let pages = self.pages.unwrap_or(config.default_pages);

        (kind, pages)
    }
}
