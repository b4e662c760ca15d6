//! Structural checks of GLSL source for [`HeadlessContext`].
//!
//! This is not a compiler. It catches the mistakes that matter when no
//! driver is around to catch them (missing `#version`, unbalanced
//! delimiters, no entry point) and extracts the global interface a linker
//! needs: uniforms, stage inputs and stage outputs. Diagnostics mimic the
//! `ERROR: 0:<line>: ...` shape real drivers print.
//!
//! [`HeadlessContext`]: crate::headless::HeadlessContext

/// GLSL types a uniform can be declared with, as far as uniform writes care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UniformKind {
    Int,
    Bool,
    Float,
    Mat4,
    Sampler,
    /// Any other type (`vec3`, `mat3`, ...). None of the setters fit it.
    Other,
}

impl UniformKind {
    fn from_type_name(name: &str) -> Self {
        match name {
            "int" | "uint" => Self::Int,
            "bool" => Self::Bool,
            "float" => Self::Float,
            "mat4" => Self::Mat4,
            name if name.starts_with("sampler") => Self::Sampler,
            _ => Self::Other,
        }
    }
}

/// The global declarations of one compiled stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct StageInterface {
    pub uniforms: Vec<(String, UniformKind)>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

/// Qualifiers that can precede a storage qualifier or type and carry no
/// meaning for the interface.
const IGNORED_QUALIFIERS: &[&str] = &[
    "flat",
    "smooth",
    "noperspective",
    "centroid",
    "highp",
    "mediump",
    "lowp",
    "invariant",
];

/// Check `source` and extract its interface, or return a diagnostic.
pub(crate) fn check(source: &str) -> Result<StageInterface, String> {
    let code = strip_comments(source);

    match code.lines().find(|line| !line.trim().is_empty()) {
        Some(line) if line.trim_start().starts_with("#version") => {}
        _ => return Err("ERROR: 0:1: '' : missing #version directive".to_owned()),
    }

    check_delimiters(&code)?;

    let normalized = code.split_whitespace().collect::<Vec<_>>().join(" ");
    if !normalized.contains("void main(") && !normalized.contains("void main (") {
        return Err("ERROR: 0:0: '' : missing entry point 'void main()'".to_owned());
    }

    let without_directives = code
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");

    let mut interface = StageInterface::default();
    for statement in global_statements(&without_directives) {
        declare(&statement, &mut interface);
    }
    Ok(interface)
}

/// Replace comments with spaces, keeping newlines so line numbers survive.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek().copied()) {
            ('/', Some('/')) => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if c == '\n' {
                        out.push('\n');
                    }
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

fn check_delimiters(code: &str) -> Result<(), String> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    for (index, line) in code.lines().enumerate() {
        let line_number = index + 1;
        for c in line.chars() {
            match c {
                '{' | '(' | '[' => stack.push((c, line_number)),
                '}' | ')' | ']' => {
                    let expected = match c {
                        '}' => '{',
                        ')' => '(',
                        _ => '[',
                    };
                    match stack.pop() {
                        Some((open, _)) if open == expected => {}
                        _ => {
                            return Err(format!(
                                "ERROR: 0:{line_number}: '{c}' : syntax error, unexpected '{c}'"
                            ));
                        }
                    }
                }
                _ => {}
            }
        }
    }
    match stack.pop() {
        Some((open, line_number)) => Err(format!(
            "ERROR: 0:{line_number}: '{open}' : unexpected end of file, unclosed '{open}'"
        )),
        None => Ok(()),
    }
}

/// Split the file-scope text into `;`-terminated statements, skipping
/// anything inside braces (function bodies, blocks).
fn global_statements(code: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in code.chars() {
        match c {
            '{' => {
                depth += 1;
                current.clear();
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.clear();
            }
            ';' if depth == 0 => {
                let statement = current.trim();
                if !statement.is_empty() {
                    statements.push(statement.to_owned());
                }
                current.clear();
            }
            _ if depth == 0 => current.push(c),
            _ => {}
        }
    }
    statements
}

/// Record a single global declaration if it is a uniform, input or output.
fn declare(statement: &str, interface: &mut StageInterface) {
    let mut rest = statement.trim();
    if rest.starts_with("layout") {
        match rest.find(')') {
            Some(close) => rest = &rest[close + 1..],
            None => return,
        }
    }

    let mut tokens = rest
        .split_whitespace()
        .filter(|token| !IGNORED_QUALIFIERS.contains(token));
    let Some(storage) = tokens.next() else {
        return;
    };
    if !matches!(storage, "uniform" | "in" | "out") {
        return;
    }
    let Some(type_name) = tokens.next() else {
        return;
    };
    let declarators = tokens.collect::<Vec<_>>().join(" ");

    for name in declarators.split(',') {
        let name = name.split(['[', '=']).next().unwrap_or_default().trim();
        if name.is_empty() {
            continue;
        }
        match storage {
            "uniform" => interface
                .uniforms
                .push((name.to_owned(), UniformKind::from_type_name(type_name))),
            "in" => interface.inputs.push(name.to_owned()),
            _ => interface.outputs.push(name.to_owned()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const VERTEX: &str = r"#version 330 core
layout (location = 0) in vec3 aPos;
layout (location = 1) in vec3 aColor;

uniform mat4 Model;
uniform mat4 View, Projection; // combined declaration

out vec3 vColor;

void main() {
    vColor = aColor;
    gl_Position = Projection * View * Model * vec4(aPos, 1.0);
}
";

    #[test]
    fn extracts_uniforms_inputs_and_outputs() {
        let interface = check(VERTEX).unwrap();
        assert_eq!(
            interface.uniforms,
            vec![
                ("Model".to_owned(), UniformKind::Mat4),
                ("View".to_owned(), UniformKind::Mat4),
                ("Projection".to_owned(), UniformKind::Mat4),
            ]
        );
        assert_eq!(interface.inputs, vec!["aPos", "aColor"]);
        assert_eq!(interface.outputs, vec!["vColor"]);
    }

    #[test]
    fn ignores_declarations_inside_function_bodies() {
        let src = "#version 330 core\nvoid helper() { int in_body; }\nuniform sampler2D Tex;\nvoid main() { float x = 1.0; }\n";
        let interface = check(src).unwrap();
        assert_eq!(
            interface.uniforms,
            vec![("Tex".to_owned(), UniformKind::Sampler)]
        );
    }

    #[test]
    fn commented_out_uniforms_are_not_declared() {
        let src = "#version 330 core\n/* uniform float Hidden; */\n// uniform int Gone;\nvoid main() {}\n";
        assert!(check(src).unwrap().uniforms.is_empty());
    }

    #[test]
    fn missing_version_is_reported() {
        let err = check("void main() {}").unwrap_err();
        assert!(err.contains("#version"), "{err}");
    }

    #[test]
    fn unclosed_brace_reports_its_line() {
        let err = check("#version 330 core\nvoid main() {\n  gl_Position = vec4(0.0);\n").unwrap_err();
        assert!(err.starts_with("ERROR: 0:2:"), "{err}");
    }

    #[test]
    fn stray_parenthesis_is_a_syntax_error() {
        let err = check("#version 330 core\nvoid main() { x = 1.0); }\n").unwrap_err();
        assert!(err.contains("unexpected ')'"), "{err}");
    }

    #[test]
    fn misspelled_entry_point_is_reported() {
        let err = check("#version 330 core\nvoi main() {}\n").unwrap_err();
        assert!(err.contains("entry point"), "{err}");
    }

    #[test]
    fn uniform_kinds_from_type_names() {
        assert_eq!(UniformKind::from_type_name("samplerCube"), UniformKind::Sampler);
        assert_eq!(UniformKind::from_type_name("bool"), UniformKind::Bool);
        assert_eq!(UniformKind::from_type_name("vec3"), UniformKind::Other);
    }
}
