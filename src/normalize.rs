//! Markdown normalization: a fixed, ordered pipeline of textual rewrites.
//!
//! Backends leave artifacts behind (pandoc's fenced divs and attribute
//! spans, stray `<div>` lines from the in-process converter, runs of blank
//! lines). [`normalize`] cleans them up in a fixed order:
//!
//! 1. **pandoc only**: a backslash followed by a newline becomes a newline.
//! 2. **Literal removals** from config, anywhere in the text.
//! 3. **Method rules**, applied line by line, in table order.
//! 4. **Global rules**, applied to the whole text, in table order.
//!
//! Later steps rely on earlier ones: removing a literal can leave a line
//! that only a regex rule then recognizes as junk.
//!
//! ## Line rules
//!
//! Each line rule runs over the text one line at a time (`\n` or `\r\n`
//! terminators, no phantom line after a final newline) and every line is
//! re-emitted with a single `\n`, the last one included. A line that a rule
//! empties completely is dropped rather than left behind as a blank line.
//! If no line rule runs, the text keeps whatever ending it had.
//!
//! ## Built-in tables
//!
//! | Method | Pattern | Effect |
//! |---|---|---|
//! | pandoc | `^:::.*$` | drop fenced-div markers |
//! | pandoc | ``^```[^`\s]*\s+\S.*$`` | `` ```python {.x} `` → `` ``` `` |
//! | pandoc | `[{][.#][A-Za-z0-9-]+?[}]` | drop `{.class}` / `{#id}` spans |
//! | pandoc | `(\W\|^)\[(.*)\]` | `[text]` → `__text__` |
//! | godown | `^<div>$` | drop bare `<div>` lines |
//! | global | `\n{3,}` | at most one blank line in a row |

use crate::config::NormalizeConfig;
use crate::types::Method;
use regex::Regex;

/// How a rule is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Independently to each line's content.
    Line,
    /// Once to the whole text; may span lines.
    Text,
}

/// A single pattern → replacement rewrite.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    pattern: Regex,
    replacement: String,
    scope: Scope,
}

impl RewriteRule {
    pub fn new(pattern: Regex, replacement: &str, scope: Scope) -> Self {
        Self {
            pattern,
            replacement: replacement.to_string(),
            scope,
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn apply(&self, text: &str) -> String {
        match self.scope {
            Scope::Text => self
                .pattern
                .replace_all(text, self.replacement.as_str())
                .into_owned(),
            Scope::Line => {
                let mut out = String::with_capacity(text.len());
                for line in text.lines() {
                    let rewritten = self.pattern.replace_all(line, self.replacement.as_str());
                    if rewritten.is_empty() && !line.is_empty() {
                        continue;
                    }
                    out.push_str(&rewritten);
                    out.push('\n');
                }
                out
            }
        }
    }
}

/// Built-in rules never fail to compile; a typo here is caught by the tests.
fn builtin(pattern: &str, replacement: &str, scope: Scope) -> RewriteRule {
    let regex = Regex::new(pattern).expect("built-in rewrite pattern must compile");
    RewriteRule::new(regex, replacement, scope)
}

fn pandoc_rules() -> Vec<RewriteRule> {
    vec![
        builtin(r"^:::.*$", "", Scope::Line),
        builtin(r"^```[^`\s]*\s+\S.*$", "```", Scope::Line),
        builtin(r"[{][.#][A-Za-z0-9-]+?[}]", "", Scope::Line),
        builtin(r"(\W|^)\[(.*)\]", "${1}__${2}__", Scope::Line),
    ]
}

fn godown_rules() -> Vec<RewriteRule> {
    vec![builtin(r"^<div>$", "", Scope::Line)]
}

fn global_rules() -> Vec<RewriteRule> {
    vec![builtin(r"\n{3,}", "\n\n", Scope::Text)]
}

/// Every table the normalizer uses. Built once at startup and shared
/// read-only by all workers.
#[derive(Debug, Clone)]
pub struct RuleSet {
    removals: Vec<String>,
    pandoc: Vec<RewriteRule>,
    godown: Vec<RewriteRule>,
    global: Vec<RewriteRule>,
}

impl RuleSet {
    /// Built-in tables plus the given literal removals.
    pub fn new(removals: Vec<String>) -> Self {
        Self::with_rules(removals, pandoc_rules(), godown_rules(), global_rules())
    }

    pub fn from_config(config: &NormalizeConfig) -> Self {
        Self::new(config.remove.clone())
    }

    /// Fully custom tables.
    pub fn with_rules(
        removals: Vec<String>,
        pandoc: Vec<RewriteRule>,
        godown: Vec<RewriteRule>,
        global: Vec<RewriteRule>,
    ) -> Self {
        Self {
            removals,
            pandoc,
            godown,
            global,
        }
    }

    pub fn removals(&self) -> &[String] {
        &self.removals
    }

    pub fn method_rules(&self, method: Method) -> &[RewriteRule] {
        match method {
            Method::Pandoc => &self.pandoc,
            Method::Godown => &self.godown,
        }
    }

    pub fn global_rules(&self) -> &[RewriteRule] {
        &self.global
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Normalize backend output for `method`. Pure and deterministic.
pub fn normalize(markdown: &str, method: Method, rules: &RuleSet) -> String {
    let mut text = if method == Method::Pandoc {
        markdown.replace("\\\n", "\n")
    } else {
        markdown.to_string()
    };

    for literal in rules.removals() {
        if !literal.is_empty() {
            text = text.replace(literal.as_str(), "");
        }
    }

    for rule in rules.method_rules(method) {
        text = rule.apply(&text);
    }

    for rule in rules.global_rules() {
        text = rule.apply(&text);
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pandoc(text: &str) -> String {
        normalize(text, Method::Pandoc, &RuleSet::default())
    }

    fn godown(text: &str) -> String {
        normalize(text, Method::Godown, &RuleSet::default())
    }

    // =========================================================================
    // Global rules
    // =========================================================================

    #[test]
    fn collapses_blank_line_runs_for_both_methods() {
        assert_eq!(pandoc("a\n\n\n\nb"), "a\n\nb\n");
        assert_eq!(godown("a\n\n\n\nb"), "a\n\nb\n");
    }

    #[test]
    fn long_blank_runs_collapse_to_exactly_one_blank_line() {
        assert_eq!(godown("a\n\n\n\n\n\n\nb\n"), "a\n\nb\n");
    }

    #[test]
    fn single_blank_line_kept() {
        assert_eq!(godown("a\n\nb\n"), "a\n\nb\n");
    }

    // =========================================================================
    // Line rules and newline discipline
    // =========================================================================

    #[test]
    fn line_rules_add_trailing_newline_to_last_line() {
        assert_eq!(godown("a\nb"), "a\nb\n");
    }

    #[test]
    fn crlf_lines_are_rejoined_with_lf() {
        assert_eq!(godown("a\r\nb\r\n"), "a\nb\n");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(godown(""), "");
        assert_eq!(pandoc(""), "");
    }

    #[test]
    fn empty_rule_tables_leave_text_untouched() {
        let rules = RuleSet::with_rules(vec![], vec![], vec![], vec![]);
        assert_eq!(normalize("a\n\n\n\nb", Method::Godown, &rules), "a\n\n\n\nb");
    }

    #[test]
    fn line_rule_never_spans_lines() {
        let rule = RewriteRule::new(Regex::new(r"a\nb").unwrap(), "X", Scope::Line);
        assert_eq!(rule.apply("a\nb\n"), "a\nb\n");
        let text_rule = RewriteRule::new(Regex::new(r"a\nb").unwrap(), "X", Scope::Text);
        assert_eq!(text_rule.apply("a\nb\n"), "X\n");
    }

    // =========================================================================
    // godown rules
    // =========================================================================

    #[test]
    fn godown_drops_bare_div_lines() {
        assert_eq!(godown("<div>\nHello [link](page)\n"), "Hello [link](page)\n");
    }

    #[test]
    fn godown_keeps_div_with_attributes_or_text() {
        assert_eq!(godown("<div class=\"x\">\n <div>\n"), "<div class=\"x\">\n <div>\n");
    }

    #[test]
    fn godown_keeps_backslash_newlines() {
        assert_eq!(godown("a\\\nb\n"), "a\\\nb\n");
    }

    // =========================================================================
    // pandoc rules
    // =========================================================================

    #[test]
    fn pandoc_collapses_line_continuations() {
        assert_eq!(pandoc("first\\\nsecond\n"), "first\nsecond\n");
        assert_eq!(pandoc("para\n\\\nnext\n"), "para\n\nnext\n");
    }

    #[test]
    fn pandoc_drops_fenced_div_markers() {
        let input = "Intro\n\n::: note\nInside\n:::\n\nOutro\n";
        assert_eq!(pandoc(input), "Intro\n\nInside\n\nOutro\n");
    }

    #[test]
    fn pandoc_colons_mid_line_kept() {
        assert_eq!(pandoc("time ::: now\n"), "time ::: now\n");
    }

    #[test]
    fn pandoc_collapses_fence_with_attributes() {
        assert_eq!(pandoc("```python {.line-numbers}\nx = 1\n```\n"), "```\nx = 1\n```\n");
        assert_eq!(pandoc("``` {.java .numberLines}\nint x;\n```\n"), "```\nint x;\n```\n");
        assert_eq!(pandoc("``` python\nx\n```\n"), "```\nx\n```\n");
    }

    #[test]
    fn pandoc_keeps_plain_language_fence() {
        assert_eq!(pandoc("```rust\nfn main() {}\n```\n"), "```rust\nfn main() {}\n```\n");
    }

    #[test]
    fn pandoc_strips_attribute_spans() {
        assert_eq!(pandoc("Heading {#intro}\n"), "Heading \n");
        assert_eq!(pandoc("word{.smallcaps} more\n"), "word more\n");
        assert_eq!(pandoc("keep {not-an-attr}\n"), "keep {not-an-attr}\n");
    }

    #[test]
    fn pandoc_line_of_only_attribute_span_is_dropped() {
        assert_eq!(pandoc("a\n{.wrapper}\nb\n"), "a\nb\n");
    }

    #[test]
    fn pandoc_rewrites_bracketed_text() {
        assert_eq!(pandoc("see [Note] here\n"), "see __Note__ here\n");
        assert_eq!(pandoc("[Start] of line\n"), "__Start__ of line\n");
    }

    #[test]
    fn pandoc_bracket_rule_keeps_preceding_char() {
        assert_eq!(pandoc("(see [x])\n"), "(see __x__)\n");
    }

    #[test]
    fn pandoc_bracket_inside_word_untouched() {
        assert_eq!(pandoc("arr[0]\n"), "arr[0]\n");
    }

    #[test]
    fn pandoc_rules_do_not_run_for_godown() {
        assert_eq!(godown("::: note\n"), "::: note\n");
        assert_eq!(godown("see [Note]\n"), "see [Note]\n");
    }

    // =========================================================================
    // Literal removals and ordering
    // =========================================================================

    #[test]
    fn removals_delete_every_occurrence() {
        let rules = RuleSet::new(vec!["Powered by Wiki".into()]);
        let out = normalize(
            "Body Powered by Wiki\nPowered by Wiki\nend\n",
            Method::Godown,
            &rules,
        );
        assert_eq!(out, "Body \n\nend\n");
    }

    #[test]
    fn removals_run_before_regex_rules() {
        // Only after the literal is gone does the line start with `:::`.
        let rules = RuleSet::new(vec!["JUNK".into()]);
        let out = normalize("JUNK::: sidebar\nkeep\n", Method::Pandoc, &rules);
        assert_eq!(out, "keep\n");
    }

    #[test]
    fn continuation_collapse_runs_before_removals() {
        // The removal only matches once the escaped newline is collapsed.
        let rules = RuleSet::new(vec!["x\ny".into()]);
        let out = normalize("ax\\\nyb\n", Method::Pandoc, &rules);
        assert_eq!(out, "ab\n");
    }

    #[test]
    fn fence_rule_runs_before_attribute_rule() {
        // Were attributes stripped first, the fence would keep `python `.
        assert_eq!(pandoc("```python {.x}\n```\n"), "```\n```\n");
    }

    #[test]
    fn global_rules_run_after_method_rules() {
        // Dropped div lines can leave blank runs that the global rule collapses.
        assert_eq!(godown("a\n\n<div>\n\n\nb\n"), "a\n\nb\n");
    }

    #[test]
    fn from_config_uses_remove_list() {
        let config = NormalizeConfig {
            remove: vec!["footer".into()],
        };
        let rules = RuleSet::from_config(&config);
        assert_eq!(rules.removals(), ["footer".to_string()]);
        assert_eq!(rules.method_rules(Method::Pandoc).len(), 4);
        assert_eq!(rules.method_rules(Method::Godown).len(), 1);
        assert!(rules.global_rules().iter().all(|r| r.scope() == Scope::Text));
    }

    proptest! {
        #[test]
        fn blank_line_collapse_is_idempotent(text in "[ab \n]{0,60}") {
            let once = godown(&text);
            let twice = godown(&once);
            prop_assert_eq!(&once, &twice);
            prop_assert!(!once.contains("\n\n\n"));
        }

        #[test]
        fn pandoc_output_never_has_blank_runs(text in "[a-z:{}.#\\[\\]` \n]{0,80}") {
            let out = pandoc(&text);
            prop_assert!(!out.contains("\n\n\n"));
        }
    }
}
