//! Optional GLSL validation of assembled output using naga.
//!
//! Assembled text is not a complete program: it references a symbol
//! environment it doesn't declare. Validation wraps it in a `#version` line,
//! a caller-supplied prelude declaring that environment, and an empty entry
//! point, then runs naga's GLSL frontend and validator over the result.
//!
//! naga's GLSL frontend rejects `const in` parameter qualifiers, so the wrapped
//! copy spells them `in`. The assembled text itself is never modified.

use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Declarations the Blinn-Phong catalog expects from its surroundings.
pub const BLINN_PHONG_PRELUDE: &str = "\
#define RECIPROCAL_PI 0.3183098861837907
#define saturate( a ) clamp( a, 0.0, 1.0 )

vec3 NormalView;
vec3 PositionViewDirection;
vec4 MaterialDiffuseColor;
vec3 MaterialSpecularColor;
float MaterialSpecularShininess;
vec3 Irradiance;
vec3 ReflectedLightDirectDiffuse;
vec3 ReflectedLightDirectSpecular;
vec3 ReflectedLightIndirectDiffuse;

float pow2( float x ) { return x * x; }
float pow4( float x ) { float x2 = x * x; return x2 * x2; }
";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlslShaderStage {
    Vertex,
    #[default]
    Fragment,
    Compute,
}

impl GlslShaderStage {
    fn naga(self) -> naga::ShaderStage {
        match self {
            GlslShaderStage::Vertex => naga::ShaderStage::Vertex,
            GlslShaderStage::Fragment => naga::ShaderStage::Fragment,
            GlslShaderStage::Compute => naga::ShaderStage::Compute,
        }
    }

    fn entry_point(self) -> &'static str {
        match self {
            GlslShaderStage::Compute => "layout(local_size_x = 1) in;\nvoid main() {}\n",
            _ => "void main() {}\n",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GlslValidation {
    pub stage: GlslShaderStage,
    /// Symbol environment placed ahead of the assembled functions.
    pub prelude: String,
    /// Preprocessor defines, e.g. `PHYSICALLY_CORRECT_LIGHTS` -> `1`.
    pub defines: BTreeMap<String, String>,
}

impl GlslValidation {
    pub fn wrap(&self, assembled: &str) -> String {
        format!(
            "#version 450\n\n{}\n{}\n{}",
            self.prelude,
            relax_param_qualifiers(assembled),
            self.stage.entry_point()
        )
    }

    /// Parse and validate `assembled` inside the wrapper program.
    ///
    /// # Errors
    /// Parse or validation failures, with a numbered listing of the wrapped
    /// program.
    pub fn validate(&self, assembled: &str) -> Result<naga::Module> {
        let program = self.wrap(assembled);

        let mut parser = naga::front::glsl::Frontend::default();
        let options = naga::front::glsl::Options {
            stage: self.stage.naga(),
            defines: self
                .defines
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };

        let module = parser
            .parse(&options, &program)
            .map_err(|e| anyhow!("GLSL parse failed: {e:?}\n{}", numbered_listing(&program)))?;

        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .map_err(|e| anyhow!("GLSL validation failed: {e:?}\n{}", numbered_listing(&program)))?;

        tracing::debug!(
            functions = module.functions.len(),
            "assembled GLSL validated"
        );
        Ok(module)
    }

    /// Validate and describe what produced the source on failure.
    pub fn validate_with_context(&self, assembled: &str, context: &str) -> Result<naga::Module> {
        self.validate(assembled)
            .with_context(|| format!("{context} assembled invalid GLSL"))
    }
}

fn relax_param_qualifiers(source: &str) -> String {
    source.replace("const in ", "in ").replace("const in\t", "in\t")
}

fn numbered_listing(source: &str) -> String {
    let mut output = String::from("Program:\n---\n");
    for (line_num, line) in source.lines().enumerate() {
        output.push_str(&format!("{:4} | {}\n", line_num + 1, line));
    }
    output.push_str("---\n");
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUARDED: &str = "\
float base() { return 0.5; }

float top() {
#if defined(DOUBLE)
    return base() * 2.0;
#else
    return undefined_helper();
#endif
}
";

    #[test]
    fn test_valid_fragments() {
        let validation = GlslValidation::default();
        let module = validation
            .validate("float base() { return 0.5; }\n\nfloat top() { return base() * 2.0; }\n")
            .unwrap();
        assert!(module.functions.len() >= 2);
    }

    #[test]
    fn test_unknown_call_fails() {
        let validation = GlslValidation::default();
        assert!(validation.validate("float f() { return missing(); }\n").is_err());
    }

    #[test]
    fn test_defines_select_branch() {
        let mut validation = GlslValidation::default();
        assert!(validation.validate(GUARDED).is_err());

        validation
            .defines
            .insert("DOUBLE".to_string(), "1".to_string());
        assert!(validation.validate(GUARDED).is_ok());
    }

    #[test]
    fn test_prelude_supplies_environment() {
        let fragment = "float shade() { return Exposure * 2.0; }\n";
        let mut validation = GlslValidation::default();
        assert!(validation.validate(fragment).is_err());

        validation.prelude = "float Exposure;\n".to_string();
        assert!(validation.validate(fragment).is_ok());
    }

    #[test]
    fn test_context_in_error() {
        let err = GlslValidation::default()
            .validate_with_context("not glsl at all", "root RE_Direct")
            .unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("root RE_Direct"));
        assert!(msg.contains("   1 | #version 450"));
    }

    #[test]
    fn test_const_in_params_accepted() {
        let fragment = "vec3 tint( const in vec3 c, const in float k ) { return c * k; }\n";
        let validation = GlslValidation::default();
        assert!(validation.wrap(fragment).contains("vec3 tint( in vec3 c, in float k )"));
        validation.validate(fragment).unwrap();
    }

    #[test]
    fn test_wrap_layout() {
        let validation = GlslValidation {
            prelude: "float k;".to_string(),
            ..Default::default()
        };
        let wrapped = validation.wrap("float f() { return k; }");
        assert!(wrapped.starts_with("#version 450\n"));
        assert!(wrapped.find("float k;").unwrap() < wrapped.find("float f()").unwrap());
        assert!(wrapped.ends_with("void main() {}\n"));
    }
}
