//! HTML template rendering.
//!
//! A thin wrapper around [`tera`]: templates are loaded once at startup
//! from a directory glob and rendered with the `{message, payload}` context
//! every reply carries. The wrapper is passed around explicitly (the router
//! owns one handle), never stored in global state.

use std::path::Path;

use serde_json::Value;

/// Loaded template set.
pub struct Templates {
    tera: tera::Tera,
}

impl Templates {
    /// Load every `*.html` file under the given directory.
    ///
    /// Template names are relative to the directory, e.g.
    /// `todos/index.html`.
    pub fn load(dir: &Path) -> Result<Self, tera::Error> {
        let glob = format!("{}/**/*.html", dir.display());
        let tera = tera::Tera::new(&glob)?;
        Ok(Self { tera })
    }

    /// An empty template set. Useful for JSON-only deployments and tests.
    pub fn empty() -> Self {
        Self {
            tera: tera::Tera::default(),
        }
    }

    /// Register a template from a string.
    pub fn add_raw(&mut self, name: &str, body: &str) -> Result<(), tera::Error> {
        self.tera.add_raw_template(name, body)
    }

    /// Render a template with the reply context.
    pub fn render(
        &self,
        name: &str,
        message: &str,
        payload: Option<&Value>,
    ) -> Result<String, tera::Error> {
        let mut context = tera::Context::new();
        context.insert("message", message);
        if let Some(payload) = payload {
            context.insert("payload", payload);
        }
        self.tera.render(name, &context)
    }

    /// Names of the loaded templates, for the startup log.
    pub fn names(&self) -> Vec<&str> {
        self.tera.get_template_names().collect()
    }
}
