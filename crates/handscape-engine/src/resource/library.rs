use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::ResourceError;

pub const PRIMITIVE_SHADER: &str = "primitive";
pub const PASSTHROUGH_SHADER: &str = "passthrough";
pub const DUMMY_SHADER: &str = "dummy";

const BUILTIN: &[(&str, &str)] = &[
    (PRIMITIVE_SHADER, include_str!("../shaders/primitive.wgsl")),
    (PASSTHROUGH_SHADER, include_str!("../shaders/passthrough.wgsl")),
    (DUMMY_SHADER, include_str!("../shaders/dummy.wgsl")),
];

/// Where shader sources come from: built-ins, sources registered at run
/// time, then `<dir>/<name>.wgsl` in each search directory, in that order.
#[derive(Debug, Clone, Default)]
pub struct ShaderLibrary {
    registered: HashMap<String, String>,
    search_dirs: Vec<PathBuf>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.registered.insert(name.into(), source.into());
    }

    pub fn add_search_dir(&mut self, dir: impl Into<PathBuf>) {
        self.search_dirs.push(dir.into());
    }

    pub fn builtin(name: &str) -> Option<&'static str> {
        BUILTIN.iter().find(|(n, _)| *n == name).map(|(_, src)| *src)
    }

    pub fn source(&self, name: &str) -> Result<Cow<'_, str>, ResourceError> {
        if let Some(src) = self.registered.get(name) {
            return Ok(Cow::Borrowed(src));
        }
        if let Some(src) = Self::builtin(name) {
            return Ok(Cow::Borrowed(src));
        }
        for dir in &self.search_dirs {
            let path = dir.join(format!("{name}.wgsl"));
            if path.is_file() {
                return read(&path).map(Cow::Owned);
            }
        }
        Err(ResourceError::ShaderNotFound(name.to_owned()))
    }
}

fn read(path: &Path) -> Result<String, ResourceError> {
    std::fs::read_to_string(path).map_err(|source| ResourceError::Io { path: path.display().to_string(), source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_sources_shadow_builtins() {
        let mut lib = ShaderLibrary::new();
        assert!(lib.source(PRIMITIVE_SHADER).unwrap().contains("fs_main"));
        lib.register(PRIMITIVE_SHADER, "// custom");
        assert_eq!(lib.source(PRIMITIVE_SHADER).unwrap(), "// custom");
    }

    #[test]
    fn unknown_names_are_not_found() {
        let mut lib = ShaderLibrary::new();
        lib.add_search_dir("/nonexistent/handscape/shaders");
        assert!(matches!(lib.source("glow"), Err(ResourceError::ShaderNotFound(n)) if n == "glow"));
    }
}
