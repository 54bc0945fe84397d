//! Rewriting of form scripts into browser script.
//!
//! Only a fixed set of idioms is understood. Each rule rewrites one idiom
//! and no rule's output is matched by another rule, so the table can be
//! applied in any order with the same result.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::trace;

struct RewriteRule {
    name: &'static str,
    pattern: Regex,
    rewrite: fn(&Captures) -> String,
}

impl RewriteRule {
    fn new(name: &'static str, pattern: &str, rewrite: fn(&Captures) -> String) -> Self {
        RewriteRule {
            name,
            pattern: Regex::new(pattern).expect("rewrite patterns are valid"),
            rewrite,
        }
    }

    fn apply(&self, script: &str) -> String {
        self.pattern
            .replace_all(script, |caps: &Captures| (self.rewrite)(caps))
            .into_owned()
    }
}

static RULES: LazyLock<Vec<RewriteRule>> = LazyLock::new(|| {
    vec![
        RewriteRule::new(
            "get_field",
            r#"(getField\("|this\.getField\(")([A-Za-z0-9_\-.\s]*)("\))"#,
            |c| format!(r#"document.querySelector("[name='{}']")"#, c[2].trim()),
        ),
        RewriteRule::new("text_size", r"(\.textSize\s=\s)([0-9]*)", |c| {
            format!(r#".setAttribute("maxlength", {})"#, &c[2])
        }),
        RewriteRule::new("value_yes", r#"\.value\s*==\s*"Yes""#, |_| {
            ".checked === true".to_string()
        }),
        RewriteRule::new("value_no", r#"\.value\s*==\s*"No""#, |_| {
            ".checked === false".to_string()
        }),
        RewriteRule::new("display_hidden", r"\.display\s*=\s*display\.hidden", |_| {
            r#".style.display = "none""#.to_string()
        }),
        RewriteRule::new("display_visible", r"\.display\s*=\s*display\.visible", |_| {
            r#".style.display = "block""#.to_string()
        }),
        RewriteRule::new("alert", r"app\.alert", |_| "window.alert".to_string()),
        RewriteRule::new(
            "fill_color_rgb",
            r"(fillColor\s*=\s*\[')(RGB)',\s*([0-9.]+),\s*([0-9.]+),\s*([0-9.]+)\]",
            |c| {
                format!(
                    r#"style["background-color"] = rgb({}, {}, {})"#,
                    &c[3], &c[4], &c[5]
                )
            },
        ),
        RewriteRule::new("fill_color_transparent", r"fillColor\s*=\s*\['T'\]", |_| {
            r#"style["background-color"] = rgba(0,0,0,0)"#.to_string()
        }),
        RewriteRule::new("required", r"\.required\s*=\s*(true|false)", |c| {
            format!(r#".setAttribute("required", {})"#, &c[1])
        }),
        RewriteRule::new("set_focus", r"\.setFocus\(\)", |_| ".focus()".to_string()),
    ]
});

fn rewrite_in_order(script: &str, order: impl IntoIterator<Item = usize>) -> String {
    order.into_iter().fold(script.to_string(), |acc, i| {
        let rule = &RULES[i];
        let out = rule.apply(&acc);
        if out != acc {
            trace!("script rule {} applied", rule.name);
        }
        out
    })
}

/// Rewrite the body of a script without the error envelope.
pub fn rewrite_script(script: &str) -> String {
    rewrite_in_order(script, 0..RULES.len())
}

/// Translate a form script and wrap it so that a runtime failure is logged
/// against `annotation_id` instead of propagating.
pub fn translate_script(script: &str, annotation_id: &str) -> String {
    format!(
        "try {{{}}} catch(ex) {{console.log(\"Error executing javascript annotation for {}\"); console.log(\"Error message: \" + ex)}}",
        rewrite_script(script),
        annotation_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn get_field_value_yes_becomes_checked_comparison() {
        assert_eq!(
            rewrite_script(r#"this.getField("Name").value == "Yes""#),
            r#"document.querySelector("[name='Name']").checked === true"#
        );
    }

    #[test]
    fn get_field_name_is_trimmed() {
        assert_eq!(
            rewrite_script(r#"getField(" first.name ").value=="No""#),
            r#"document.querySelector("[name='first.name']").checked === false"#
        );
    }

    #[test]
    fn property_assignments() {
        assert_eq!(
            rewrite_script("f.textSize = 12;"),
            r#"f.setAttribute("maxlength", 12);"#
        );
        assert_eq!(
            rewrite_script("f.display = display.hidden; g.display=display.visible;"),
            r#"f.style.display = "none"; g.style.display = "block";"#
        );
        assert_eq!(
            rewrite_script("f.required = true; f.setFocus();"),
            r#"f.setAttribute("required", true); f.focus();"#
        );
        assert_eq!(rewrite_script(r#"app.alert("x")"#), r#"window.alert("x")"#);
    }

    #[test]
    fn fill_colors() {
        assert_eq!(
            rewrite_script("f.fillColor = ['RGB', 1, 0.5, 0]"),
            r#"f.style["background-color"] = rgb(1, 0.5, 0)"#
        );
        assert_eq!(
            rewrite_script("f.fillColor = ['T']"),
            r#"f.style["background-color"] = rgba(0,0,0,0)"#
        );
    }

    #[test]
    fn envelope_names_the_annotation() {
        let out = translate_script("app.alert(1)", "12R");
        assert_eq!(
            out,
            "try {window.alert(1)} catch(ex) {console.log(\"Error executing javascript annotation for 12R\"); console.log(\"Error message: \" + ex)}"
        );
    }

    #[test]
    fn unknown_idioms_pass_through() {
        assert_eq!(rewrite_script("var x = 1 + 2;"), "var x = 1 + 2;");
    }

    const SNIPPETS: &[&str] = &[
        r#"this.getField("Name")"#,
        r#"getField("other_field")"#,
        ".textSize = 10",
        r#".value == "Yes""#,
        r#".value=="No""#,
        ".display = display.hidden",
        ".display=display.visible",
        r#"app.alert("done")"#,
        "fillColor = ['RGB', 1, 0.5, 0]",
        "fillColor = ['T']",
        ".required = false",
        ".setFocus()",
        "; ",
        "if (x) { ",
        "}",
        "\n",
    ];

    proptest! {
        #[test]
        fn rule_order_does_not_change_output(
            parts in prop::collection::vec(0..SNIPPETS.len(), 0..24),
            order in Just((0..RULES.len()).collect::<Vec<usize>>()).prop_shuffle(),
        ) {
            let script: String = parts.iter().map(|&i| SNIPPETS[i]).collect();
            prop_assert_eq!(rewrite_in_order(&script, order), rewrite_script(&script));
        }
    }
}
