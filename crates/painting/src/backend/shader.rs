//! Shader sources and interface discovery

use super::BackendError;

/// What a program draws
///
/// GPU backends compile the GLSL text and ignore this; the software backend
/// uses it to pick the matching rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    /// Round brush stamps drawn as point primitives
    Stamp,
    /// Textured quad copied through a sampler
    Blit,
}

/// Vertex and fragment source for one program
#[derive(Debug, Clone, Copy)]
pub struct ShaderSource<'a> {
    pub label: &'a str,
    pub kind: ShaderKind,
    pub vertex: &'a str,
    pub fragment: &'a str,
}

impl ShaderSource<'static> {
    /// Brush stamp program: `pos` attribute, `uRadius`, `uColor` and matrices
    pub const fn stamp() -> Self {
        Self {
            label: "stamp",
            kind: ShaderKind::Stamp,
            vertex: include_str!("../../shaders/stamp.vert"),
            fragment: include_str!("../../shaders/stamp.frag"),
        }
    }

    /// Full-canvas copy program: `pos`/`uv` attributes, `uSampler` and matrices
    pub const fn blit() -> Self {
        Self {
            label: "blit",
            kind: ShaderKind::Blit,
            vertex: include_str!("../../shaders/blit.vert"),
            fragment: include_str!("../../shaders/blit.frag"),
        }
    }
}

/// Uniform and attribute names declared by a program's sources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderInterface {
    pub uniforms: Vec<String>,
    pub attributes: Vec<String>,
}

impl ShaderInterface {
    /// Scan both stages for `uniform` and `attribute` declarations
    ///
    /// Fails if either stage has no `main` entry point.
    pub fn parse(source: &ShaderSource<'_>) -> Result<Self, BackendError> {
        for (stage, text) in [("vertex", source.vertex), ("fragment", source.fragment)] {
            if !text.contains("void main") {
                return Err(BackendError::ShaderCompile {
                    label: source.label.to_string(),
                    reason: format!("{stage} stage has no main()"),
                });
            }
        }

        let mut interface = Self::default();
        for text in [source.vertex, source.fragment] {
            for (qualifier, name) in declarations(text) {
                let list = match qualifier {
                    "uniform" => &mut interface.uniforms,
                    "attribute" => &mut interface.attributes,
                    _ => continue,
                };
                if !list.iter().any(|n| n == name) {
                    list.push(name.to_string());
                }
            }
        }

        Ok(interface)
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.iter().any(|n| n == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|n| n == name)
    }
}

/// `(qualifier, name)` pairs for every top-level declaration statement
fn declarations(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.split(';').filter_map(|statement| {
        // Only the tail after the last brace belongs to this statement
        let statement = statement.rsplit(|c: char| c == '{' || c == '}').next()?;
        let mut tokens = statement.split_whitespace();
        let qualifier = tokens.next()?;
        let name = tokens.last()?;
        let name = name.split('[').next()?;
        Some((qualifier, name))
    })
}
