//! Function header scanning.
//!
//! Only the declaration in front of the first `{` is inspected: comments and
//! preprocessor lines ahead of it are skipped and the body is never looked at.
//! This is enough to name a fragment and to tell overloads apart from
//! redefinitions without parsing the shading language.

use std::fmt;

const PARAM_QUALIFIERS: &[&str] = &[
    "const", "in", "out", "inout", "highp", "mediump", "lowp", "precise",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSignature {
    pub return_type: String,
    pub name: String,
    /// Parameter types with qualifiers and parameter names removed.
    pub param_types: Vec<String>,
}

impl FunctionSignature {
    /// Key used to detect two definitions of the same overload, e.g.
    /// `F_Schlick(vec3,vec3,float)`.
    pub fn key(&self) -> String {
        format!("{}({})", self.name, self.param_types.join(","))
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}({})",
            self.return_type,
            self.name,
            self.param_types.join(", ")
        )
    }
}

/// Read the signature of the single function defined by `source`.
///
/// Returns `None` when the text before the first `{` is not shaped like
/// `<type> <name>( <params> )`.
pub fn scan_signature(source: &str) -> Option<FunctionSignature> {
    let header = declaration_header(source)?;

    let open = header.find('(')?;
    let close = header.rfind(')')?;
    if close < open || !header[close + 1..].trim().is_empty() {
        return None;
    }

    let mut head = header[..open].split_whitespace().rev();
    let name = head.next()?;
    if !is_identifier(name) {
        return None;
    }
    let return_type = head.next()?;
    if !is_identifier(return_type) {
        return None;
    }

    let params = header[open + 1..close].trim();
    let param_types = if params.is_empty() || params == "void" {
        Vec::new()
    } else {
        params
            .split(',')
            .map(param_type)
            .collect::<Option<Vec<_>>>()?
    };

    Some(FunctionSignature {
        return_type: return_type.to_string(),
        name: name.to_string(),
        param_types,
    })
}

/// Text between the last skipped comment/directive and the first `{`, with
/// comments removed and whitespace collapsed.
fn declaration_header(source: &str) -> Option<String> {
    let bytes = source.as_bytes();
    let mut out = String::new();
    let mut i = 0;
    let mut line_start = true;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = skip_line(bytes, i);
                line_start = true;
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = source[i + 2..].find("*/")?;
                i += 2 + end + 2;
                out.push(' ');
                continue;
            }
            b'#' if line_start => {
                i = skip_line(bytes, i);
                continue;
            }
            b'{' => {
                let header = out.split_whitespace().collect::<Vec<_>>().join(" ");
                return (!header.is_empty()).then_some(header);
            }
            b'\n' => {
                line_start = true;
                out.push(' ');
            }
            b => {
                if !b.is_ascii_whitespace() {
                    line_start = false;
                }
                out.push(b as char);
            }
        }
        i += 1;
    }

    None
}

fn skip_line(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |p| from + p + 1)
}

fn param_type(param: &str) -> Option<String> {
    let mut tokens: Vec<&str> = param
        .split_whitespace()
        .filter(|t| !PARAM_QUALIFIERS.contains(t))
        .collect();
    // `vec3 lightDirection` -> `vec3`; a lone type (prototype style) is kept.
    if tokens.len() > 1 {
        tokens.pop();
    }
    let ty = tokens.join(" ");
    (!ty.is_empty()).then_some(ty)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scans_qualified_params() {
        let sig = scan_signature(
            "\nvec3 F_Schlick( const in vec3 f0, const in vec3 f90, const in float dotVH ) {\n\treturn f0;\n}",
        )
        .unwrap();
        assert_eq!(sig.name, "F_Schlick");
        assert_eq!(sig.return_type, "vec3");
        assert_eq!(sig.param_types, vec!["vec3", "vec3", "float"]);
        assert_eq!(sig.key(), "F_Schlick(vec3,vec3,float)");
    }

    #[test]
    fn test_empty_and_void_params() {
        let a = scan_signature("float G_BlinnPhong_Implicit() {\n\treturn 0.25;\n}").unwrap();
        let b = scan_signature("void RE_IndirectDiffuse_BlinnPhong( ) { }").unwrap();
        let c = scan_signature("void f(void) { }").unwrap();
        assert!(a.param_types.is_empty());
        assert!(b.param_types.is_empty());
        assert!(c.param_types.is_empty());
    }

    #[test]
    fn test_skips_leading_comments_and_directives() {
        let source = "// helper\n/* block\n   comment */\n#ifdef FOO\nfloat helper( float x ) {\n#endif\n\treturn x;\n}";
        let sig = scan_signature(source).unwrap();
        assert_eq!(sig.name, "helper");
        assert_eq!(sig.param_types, vec!["float"]);
    }

    #[test]
    fn test_body_comments_do_not_matter() {
        let source = "float g() {\n\t// ( const in float dotNL )\n\treturn 0.25;\n}";
        assert_eq!(scan_signature(source).unwrap().key(), "g()");
    }

    #[test]
    fn test_rejects_non_function_text() {
        assert!(scan_signature("").is_none());
        assert!(scan_signature("uniform vec3 color;").is_none());
        assert!(scan_signature("struct Light { vec3 color; };").is_none());
        assert!(scan_signature("1.0 + (2.0) { }").is_none());
    }

    #[test]
    fn test_display() {
        let sig = scan_signature("vec3 BRDF_Lambert( const in vec3 diffuseColor ) { }").unwrap();
        assert_eq!(sig.to_string(), "vec3 BRDF_Lambert(vec3)");
    }
}
