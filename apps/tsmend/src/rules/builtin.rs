//! Built-in catalog for TypeScript sources.
//!
//! Used when no external catalog is configured. Every rule here must be a
//! no-op on its own output.

use super::{Catalog, FixRule, FixStep, Transform};
use crate::error::CatalogError;
use regex::Captures;

/// Matches `Promise<...>` including one level of nested generics.
const PROMISE_GENERIC: &str = r"Promise<[^<>()]*(?:<[^<>()]*>[^<>()]*)*>";

pub fn catalog() -> Result<Catalog, CatalogError> {
    Catalog::new(vec![
        basic_syntax()?,
        promise_patterns()?,
        type_assertions()?,
        missing_types()?,
    ])
}

fn basic_syntax() -> Result<FixStep, CatalogError> {
    Ok(FixStep::new(
        "Basic Syntax",
        "Whitespace and punctuation debris left by earlier edits",
        1,
        vec![
            FixRule::new(
                "Trailing whitespace",
                r"(?mR)[ \t]+$",
                Transform::Literal(String::new()),
            )?,
            FixRule::new(
                "Duplicate semicolons",
                r"(?mR);{2,}[ \t]*$",
                Transform::Literal(";".into()),
            )?,
            FixRule::new(
                "Optional chain assignment",
                r"([\w$]+)\?\.([\w$]+)(\s*)=([^=>])",
                Transform::Template("${1}!.${2}${3}=${4}".into()),
            )?,
        ],
    ))
}

fn promise_patterns() -> Result<FixStep, CatalogError> {
    Ok(FixStep::new(
        "Promise Patterns",
        "Generic arguments written on Promise statics instead of the call",
        2,
        vec![
            FixRule::new(
                "Promise<T>.resolve() syntax",
                &format!(r"{PROMISE_GENERIC}\.resolve\("),
                Transform::Literal("Promise.resolve(".into()),
            )?,
            FixRule::new(
                "Promise<T> static call syntax",
                &format!(r"{PROMISE_GENERIC}\.(reject|allSettled|all|race|any)\("),
                Transform::Template("Promise.${1}(".into()),
            )?,
        ],
    ))
}

fn type_assertions() -> Result<FixStep, CatalogError> {
    Ok(FixStep::new(
        "Type Assertions",
        "Redundant or JSX-incompatible casts",
        3,
        vec![
            FixRule::new(
                "Repeated as-any cast",
                r"\bas any(?:\s+as any)+\b",
                Transform::Literal("as any".into()),
            )?,
            FixRule::new(
                "Stacked non-null assertions",
                r"([\w$)\]])!{2,}\.",
                Transform::Template("${1}!.".into()),
            )?,
            FixRule::new(
                "Angle-bracket assertion in TSX",
                r"\(\s*<([A-Z][\w$]*)>([\w$.]+)\s*\)",
                Transform::Template("(${2} as ${1})".into()),
            )?
            .with_files("**/*.tsx")?,
        ],
    ))
}

fn missing_types() -> Result<FixStep, CatalogError> {
    Ok(FixStep::new(
        "Missing Types",
        "Annotations for bindings the checker reports as implicitly any or unknown",
        4,
        vec![
            FixRule::new(
                "Route handler parameters",
                r"\(\s*req\s*,\s*res\s*\)\s*=>",
                Transform::Literal("(req: Request, res: Response) =>".into()),
            )?
            .with_files("**/routes/**")?
            .with_codes(["TS7006"]),
            FixRule::new(
                "Implicit any arrow parameters",
                r"\(\s*([A-Za-z_$][\w$]*(?:\s*,\s*[A-Za-z_$][\w$]*)*)\s*\)\s*=>",
                Transform::func(annotate_params),
            )?
            .with_codes(["TS7006"]),
            FixRule::new(
                "Untyped catch binding",
                r"catch\s*\(\s*([A-Za-z_$][\w$]*)\s*\)",
                Transform::Template("catch (${1}: any)".into()),
            )?
            .with_codes(["TS18046", "TS2571"]),
        ],
    ))
}

fn annotate_params(caps: &Captures<'_>) -> Result<String, String> {
    let list = caps
        .get(1)
        .ok_or_else(|| "missing parameter list".to_string())?
        .as_str();
    let params: Vec<String> = list
        .split(',')
        .map(|p| format!("{}: any", p.trim()))
        .collect();
    Ok(format!("({}) =>", params.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::apply_step;
    use std::path::Path;

    fn step(priority: u32) -> FixStep {
        catalog()
            .unwrap()
            .all_steps()
            .iter()
            .find(|s| s.priority == priority)
            .cloned()
            .unwrap()
    }

    fn run(priority: u32, text: &str, file: &str) -> (String, usize) {
        let out = apply_step(&step(priority), text, Path::new(file), Path::new(file), None);
        (out.text, out.counts.values().sum())
    }

    #[test]
    fn builtin_catalog_is_valid() {
        let cat = catalog().unwrap();
        let ids: Vec<u32> = cat.all_steps().iter().map(|s| s.priority).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn promise_resolve_generic_is_removed() {
        let src = "const p = Promise<string>.resolve(x);\n";
        let out = apply_step(&step(2), src, Path::new("a.ts"), Path::new("a.ts"), None);
        assert!(out.text.contains("Promise.resolve(x)"));
        assert_eq!(out.counts.get("Promise<T>.resolve() syntax"), Some(&1));
    }

    #[test]
    fn promise_statics_with_nested_generics() {
        let (out, n) = run(2, "Promise<Array<number>>.all([a, b])", "a.ts");
        assert_eq!(out, "Promise.all([a, b])");
        assert_eq!(n, 1);
    }

    #[test]
    fn basic_syntax_rules() {
        let (out, n) = run(1, "let a = 1;;  \nobj?.x = 2;\nif (a?.b == c) {}\n", "a.ts");
        assert_eq!(out, "let a = 1;\nobj!.x = 2;\nif (a?.b == c) {}\n");
        assert_eq!(n, 3);
    }

    #[test]
    fn basic_syntax_keeps_crlf() {
        let (out, n) = run(1, "let a = 1;; \t\r\nlet b = 2;\r\n", "a.ts");
        assert_eq!(out, "let a = 1;\r\nlet b = 2;\r\n");
        assert_eq!(n, 2);
    }

    #[test]
    fn tsx_only_assertion_rule() {
        let src = "const v = (<Props>raw);";
        let (tsx, n) = run(3, src, "ui/view.tsx");
        assert_eq!(tsx, "const v = (raw as Props);");
        assert_eq!(n, 1);
        let (ts, n) = run(3, src, "ui/view.ts");
        assert_eq!(ts, src);
        assert_eq!(n, 0);
    }

    #[test]
    fn implicit_any_params_are_annotated() {
        let (out, _) = run(4, "list.map((item, idx) => item)", "a.ts");
        // scoped rules need diagnostics; without them nothing changes
        assert_eq!(out, "list.map((item, idx) => item)");

        let codes = ["TS7006".to_string()].into_iter().collect();
        let out = apply_step(
            &step(4),
            "list.map((item, idx) => item)",
            Path::new("a.ts"),
            Path::new("a.ts"),
            Some(&codes),
        );
        assert_eq!(out.text, "list.map((item: any, idx: any) => item)");
    }

    #[test]
    fn route_rule_precedes_generic_annotation() {
        let codes = ["TS7006".to_string()].into_iter().collect();
        let out = apply_step(
            &step(4),
            "router.get('/', (req, res) => res.send());",
            Path::new("src/routes/index.ts"),
            Path::new("/app/src/routes/index.ts"),
            Some(&codes),
        );
        assert_eq!(out.text, "router.get('/', (req: Request, res: Response) => res.send());");
        assert_eq!(out.counts.get("Route handler parameters"), Some(&1));
        assert_eq!(out.counts.get("Implicit any arrow parameters"), Some(&0));
    }

    #[test]
    fn every_builtin_step_is_idempotent() {
        let codes = ["TS7006", "TS18046"].iter().map(|s| s.to_string()).collect();
        let src = "\
const a = Promise<number>.resolve(1);;
const b = x as any as any;
const c = y!!.z;
try { run(); } catch (err) { log(err); }
items.forEach((it) => use(it));
";
        let mut text = src.to_string();
        for s in catalog().unwrap().all_steps() {
            text = apply_step(s, &text, Path::new("a.ts"), Path::new("a.ts"), Some(&codes)).text;
        }
        assert_ne!(text, src);
        for s in catalog().unwrap().all_steps() {
            let again = apply_step(s, &text, Path::new("a.ts"), Path::new("a.ts"), Some(&codes));
            assert_eq!(again.counts.values().sum::<usize>(), 0, "step {}", s.name);
            assert_eq!(again.text, text);
        }
    }
}
