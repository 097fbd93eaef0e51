//! Program sources and pipeline stages.

use serde::{Deserialize, Serialize};

/// Programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 2] = [ShaderStage::Vertex, ShaderStage::Fragment];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

/// Source text handed to the backend compiler.
///
/// `Stage` compiles into an independently bindable single-stage program;
/// `Linked` compiles both stages into one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgramSource {
    Stage { stage: ShaderStage, code: String },
    Linked { vertex: String, fragment: String },
}

impl ProgramSource {
    pub fn stage(stage: ShaderStage, code: impl Into<String>) -> Self {
        ProgramSource::Stage {
            stage,
            code: code.into(),
        }
    }

    pub fn linked(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        ProgramSource::Linked {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    pub fn is_linked(&self) -> bool {
        matches!(self, ProgramSource::Linked { .. })
    }

    /// Name used in compile error messages.
    pub fn stage_name(&self) -> &'static str {
        match self {
            ProgramSource::Stage { stage, .. } => stage.name(),
            ProgramSource::Linked { .. } => "linked",
        }
    }

    /// True if any stage's text contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        match self {
            ProgramSource::Stage { code, .. } => code.contains(needle),
            ProgramSource::Linked { vertex, fragment } => {
                vertex.contains(needle) || fragment.contains(needle)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linked_source_searches_both_stages() {
        let src = ProgramSource::linked("attribute vec4 pos;", "uniform sampler2D tex;");
        assert!(src.contains("pos"));
        assert!(src.contains("sampler2D"));
        assert!(!src.contains("gl_FragDepth"));
    }

    #[test]
    fn stage_name_matches_stage() {
        assert_eq!(ProgramSource::stage(ShaderStage::Fragment, "").stage_name(), "fragment");
        assert_eq!(ProgramSource::linked("", "").stage_name(), "linked");
    }

    #[test]
    fn source_deserializes_from_tagged_json() {
        let src: ProgramSource =
            serde_json::from_str(r#"{"kind":"stage","stage":"vertex","code":"main"}"#).unwrap();
        assert_eq!(src, ProgramSource::stage(ShaderStage::Vertex, "main"));
    }
}
