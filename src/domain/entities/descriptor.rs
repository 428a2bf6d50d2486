use serde::{Deserialize, Serialize};

/// Static description of a loadable module, built from configuration and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleDescriptor {
    /// Name the module is shown and addressed as.
    pub display_name: String,
    /// Identifier resolved through the module factory at load time.
    pub entry_type: String,
    /// Backing artifacts, in load order.
    #[serde(default)]
    pub files: Vec<String>,
}

impl ModuleDescriptor {
    pub fn new(display_name: impl Into<String>, entry_type: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            entry_type: entry_type.into(),
            files: Vec::new(),
        }
    }

    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }
}
