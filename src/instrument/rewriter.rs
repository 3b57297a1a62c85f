use crate::parser::{
    classify, collect_statement, comment_start, is_branch_keyword, leading_keyword,
    measure_indent, parse_directives, strip_comments, IndentUnit, LogicalStatement,
    Statement, HEADER_NO_PROBE,
};

use super::guards;
use super::linemap::LineIndexMap;
use super::preamble::PREAMBLE;
use super::probes;

/// Knobs the rewriter needs from the caller's configuration.
#[derive(Debug, Clone, Copy)]
pub struct RewriteOptions {
    pub unit: IndentUnit,
    pub call_limit: usize,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        RewriteOptions {
            unit: IndentUnit::Spaces(4),
            call_limit: 100,
        }
    }
}

/// The instrumented program plus its pre-run source map. Regenerated from
/// scratch on every pass; owns nothing beyond its text.
#[derive(Debug, Clone)]
pub struct GeneratedProgram {
    pub program: String,
    pub line_map: LineIndexMap,
}

/// Rewrite `source` into its observable variant.
pub fn instrument(source: &str, opts: &RewriteOptions) -> GeneratedProgram {
    let lines: Vec<&str> = source.lines().collect();

    let mut rw = Rewriter {
        lines,
        unit: opts.unit,
        call_limit: opts.call_limit.max(1),
        ids: 0,
        out: String::from(PREAMBLE),
    };
    rw.rewrite_block(0, 0, 0);

    let program = rw.out;
    let line_map = LineIndexMap::from_generated(&program);
    GeneratedProgram { program, line_map }
}

struct Rewriter<'a> {
    lines: Vec<&'a str>,
    unit: IndentUnit,
    call_limit: usize,
    ids: usize,
    out: String,
}

impl Rewriter<'_> {
    /// Monotonic per-pass counter for injected identifiers (guard sites,
    /// hoisted temporaries, shadow clones).
    fn next_id(&mut self) -> usize {
        self.ids += 1;
        self.ids
    }

    fn emit(&mut self, level: usize, text: &str) {
        self.out.push_str(&self.unit.render(level));
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Emit fused statement text: the first line re-indented to `level`,
    /// continuation lines verbatim (their leading whitespace may be string
    /// content or bracket-relative alignment).
    fn emit_fused(&mut self, level: usize, text: &str) {
        let mut parts = text.split('\n');
        if let Some(first) = parts.next() {
            self.emit(level, first.trim_start());
        }
        for rest in parts {
            self.out.push_str(rest);
            self.out.push('\n');
        }
    }

    fn measured(&self, line_index: usize) -> usize {
        measure_indent(self.lines[line_index], self.unit)
    }

    fn is_blank(&self, line_index: usize) -> bool {
        let raw = self.lines[line_index];
        let code = match comment_start(raw) {
            Some(c) => &raw[..c],
            None => raw,
        };
        code.trim().is_empty()
    }

    /// Process statements whose measured indent stays at or above
    /// `min_measured`, emitting at `level`. Returns the cursor of the first
    /// line outside the block.
    fn rewrite_block(&mut self, mut cursor: usize, min_measured: usize, level: usize) -> usize {
        while cursor < self.lines.len() {
            if self.is_blank(cursor) {
                let probe = probes::probe_empty(cursor);
                self.emit(level, &probe);
                cursor += 1;
                continue;
            }
            if self.measured(cursor) < min_measured {
                break;
            }
            cursor = self.rewrite_statement(cursor, level);
        }
        cursor
    }

    fn rewrite_statement(&mut self, cursor: usize, level: usize) -> usize {
        let stmt = collect_statement(&self.lines, cursor);
        let idx = stmt.start;
        let next = stmt.end + 1;

        let directives = parse_directives(&stmt.text);
        let code = strip_comments(&stmt.text);

        // decorators pass through untouched
        if code.trim_start().starts_with('@') {
            self.emit_fused(level, &code);
            return next;
        }

        // a mocked def is cloned and invoked; nothing below applies to it
        if leading_keyword(&code) == Some("def") {
            if let Some(mock) = directives.mock.clone() {
                return self.rewrite_mocked_def(&stmt, &code, &mock, level);
            }
        }

        // call-safety rewriting happens before any construct case mutates
        // the line
        let safety = guards::apply_call_safety(&code, &directives, self.call_limit);
        let code = safety.code;
        if let Some(limit) = safety.guard_limit {
            let site = self.next_id();
            self.emit(level, &probes::guard_call(site, limit, idx));
        }

        // branch-entry markers; elif/else cannot legally be preceded by
        // injected statements, so the if header pre-registers its siblings
        if let Some(kw) = leading_keyword(&code) {
            if is_branch_keyword(kw) && kw != "elif" && kw != "else" {
                let reg = probes::register_branch(idx);
                self.emit(level, &reg);
                if kw == "if" {
                    for sibling in self.scan_branch_siblings(&stmt) {
                        let reg = probes::register_branch(sibling);
                        self.emit(level, &reg);
                    }
                }
            }
        }

        let statement = classify(&code);
        match statement {
            Statement::Decorator => {
                self.emit_fused(level, &code);
                next
            }
            Statement::Assignment { target } | Statement::TypedAssignment { target } => {
                self.emit_fused(level, &code);
                self.emit(level, &probes::probe_value(idx, &target));
                self.emit_interior(&stmt, level);
                next
            }
            Statement::AugmentedAssignment { target, op, rhs } => {
                let tmp = format!("_probe_aug{}", self.next_id());
                self.emit(level, &format!("{tmp} = ({rhs})"));
                let would_be = format!("{target} {op} {tmp}");
                self.emit(level, &probes::probe_value(idx, &would_be));
                self.emit(level, &format!("{target} {op}= {tmp}"));
                self.emit_interior(&stmt, level);
                next
            }
            Statement::PrintCall if !stmt.is_multi_line() && !stmt.return_led => {
                let rewritten = rewrite_print(&code, idx);
                self.emit(level, &rewritten);
                next
            }
            Statement::PrintCall => {
                // multi-line print calls are executed as-is
                self.emit_fused(level, &code);
                self.emit(level, &probes::probe_empty(idx));
                self.emit_interior(&stmt, level);
                next
            }
            Statement::ForHeader { iterable } => {
                self.emit_interior(&stmt, level);
                self.emit(level, &probes::probe_value(idx, &iterable));
                self.emit_fused(level, &code);
                self.emit(level + 1, &probes::enter_branch(idx));
                self.rewrite_block(next, self.measured(idx) + 1, level + 1)
            }
            Statement::ReturnStatement { value } => {
                // probes for consumed lines are hoisted above the return so
                // nothing executes after it
                self.emit_interior(&stmt, level);
                let probe = match value {
                    Some(expr) => probes::probe_value(idx, &expr),
                    None => probes::probe_empty(idx),
                };
                self.emit(level, &probe);
                self.emit_fused(level, &code);
                next
            }
            Statement::DefHeader { name: _, params } => {
                self.emit_interior(&stmt, level);
                self.emit_fused(level, &code);
                for param in &params {
                    self.emit(level + 1, &probes::probe_param(idx, param));
                }
                self.rewrite_block(next, self.measured(idx) + 1, level + 1)
            }
            Statement::CompoundHeader { keyword } => {
                let kw = keyword.as_deref().unwrap_or("");
                // clause continuations (elif/else/except/finally) cannot be
                // preceded by injected statements; their interior probes go
                // inside the body instead
                let clause = HEADER_NO_PROBE.contains(&kw);
                if !clause {
                    self.emit_interior(&stmt, level);
                    self.emit(level, &probes::probe_empty(idx));
                }
                self.emit_fused(level, &code);
                if is_branch_keyword(kw) {
                    self.emit(level + 1, &probes::enter_branch(idx));
                }
                if clause {
                    self.emit_interior(&stmt, level + 1);
                }
                self.rewrite_block(next, self.measured(idx) + 1, level + 1)
            }
            Statement::InlineCompound { head, body } => {
                let kw = leading_keyword(&head).unwrap_or("");
                if !HEADER_NO_PROBE.contains(&kw) {
                    self.emit(level, &probes::probe_empty(idx));
                }
                self.emit(level, &format!("{head}:"));
                if is_branch_keyword(kw) {
                    self.emit(level + 1, &probes::enter_branch(idx));
                }
                self.rewrite_inline(&body, idx, level + 1);
                self.emit_interior(&stmt, level + 1);
                next
            }
            Statement::BareKeyword => {
                self.emit_fused(level, &code);
                self.emit_interior(&stmt, level);
                next
            }
            Statement::Plain => {
                self.emit_fused(level, &code);
                self.emit(level, &probes::probe_empty(idx));
                self.emit_interior(&stmt, level);
                next
            }
        }
    }

    /// Existence probes for every physical line a statement consumed
    /// beyond its first.
    fn emit_interior(&mut self, stmt: &LogicalStatement, level: usize) {
        if !stmt.is_multi_line() {
            return;
        }
        for line in stmt.continuation_lines() {
            let probe = probes::probe_empty(line);
            self.emit(level, &probe);
        }
    }

    /// One statement inside an inline `header: body` one-liner; all probes
    /// carry the one-liner's original line index.
    fn rewrite_inline(&mut self, code: &str, idx: usize, level: usize) {
        match classify(code) {
            Statement::Assignment { target } | Statement::TypedAssignment { target } => {
                self.emit(level, code);
                self.emit(level, &probes::probe_value(idx, &target));
            }
            Statement::AugmentedAssignment { target, op, rhs } => {
                let tmp = format!("_probe_aug{}", self.next_id());
                self.emit(level, &format!("{tmp} = ({rhs})"));
                let would_be = format!("{target} {op} {tmp}");
                self.emit(level, &probes::probe_value(idx, &would_be));
                self.emit(level, &format!("{target} {op}= {tmp}"));
            }
            Statement::PrintCall => {
                let rewritten = rewrite_print(code, idx);
                self.emit(level, &rewritten);
            }
            Statement::ReturnStatement { value } => {
                let probe = match value {
                    Some(expr) => probes::probe_value(idx, &expr),
                    None => probes::probe_empty(idx),
                };
                self.emit(level, &probe);
                self.emit(level, code);
            }
            Statement::InlineCompound { head, body } => {
                let kw = leading_keyword(&head).unwrap_or("");
                if is_branch_keyword(kw) && kw != "elif" && kw != "else" {
                    self.emit(level, &probes::register_branch(idx));
                }
                if !HEADER_NO_PROBE.contains(&kw) {
                    self.emit(level, &probes::probe_empty(idx));
                }
                self.emit(level, &format!("{head}:"));
                if is_branch_keyword(kw) {
                    self.emit(level + 1, &probes::enter_branch(idx));
                }
                self.rewrite_inline(&body, idx, level + 1);
            }
            Statement::BareKeyword => {
                self.emit(level, code);
            }
            _ => {
                self.emit(level, code);
                self.emit(level, &probes::probe_empty(idx));
            }
        }
    }

    /// Forward scan from an `if` header: register markers for every sibling
    /// `elif`/`else` at the same indentation, stopping when indentation
    /// drops below the header or a non-sibling statement appears.
    fn scan_branch_siblings(&self, stmt: &LogicalStatement) -> Vec<usize> {
        let header_level = self.measured(stmt.start);
        let mut out = Vec::new();
        let mut j = stmt.end + 1;
        while j < self.lines.len() {
            if self.is_blank(j) {
                j += 1;
                continue;
            }
            let m = self.measured(j);
            if m < header_level {
                break;
            }
            if m > header_level {
                j += 1;
                continue;
            }
            let sibling = collect_statement(&self.lines, j);
            match leading_keyword(sibling.text.trim_start()) {
                Some("elif") | Some("else") => {
                    out.push(j);
                    j = sibling.end + 1;
                }
                _ => break,
            }
        }
        out
    }

    /// A `def` carrying a `mock(...)` directive: emit the instrumented
    /// function, then an instrumented shadow clone invoked once with the
    /// mock arguments, so the body's probes fire even if the program never
    /// calls the function itself.
    fn rewrite_mocked_def(
        &mut self,
        stmt: &LogicalStatement,
        code: &str,
        mock_args: &str,
        level: usize,
    ) -> usize {
        let Statement::DefHeader { name, params } = classify(code) else {
            self.emit_fused(level, code);
            return stmt.end + 1;
        };
        let idx = stmt.start;
        let body_min = self.measured(idx) + 1;

        self.emit_interior(stmt, level);
        self.emit_fused(level, code);
        for param in &params {
            self.emit(level + 1, &probes::probe_param(idx, param));
        }
        let body_end = self.rewrite_block(stmt.end + 1, body_min, level + 1);

        // shadow clone: same instrumented body, reserved name
        let shadow = format!("_probe_mock{}_{}", self.next_id(), name);
        let after_def = code.trim_start().strip_prefix("def").unwrap_or("").trim_start();
        let signature = &after_def[name.len()..];
        self.emit_fused(level, &format!("def {shadow}{signature}"));
        for param in &params {
            self.emit(level + 1, &probes::probe_param(idx, param));
        }
        self.rewrite_block(stmt.end + 1, body_min, level + 1);
        self.emit(level, &format!("{shadow}({mock_args})"));

        body_end
    }
}

/// Splice the probe tag into a single-line `print(...)` call: the first
/// argument is wrapped so the tag lands at the front of the printed value,
/// remaining arguments and separators are preserved.
fn rewrite_print(code: &str, idx: usize) -> String {
    use crate::parser::find_unquoted_char;

    let trimmed = code.trim();
    let open = match trimmed.find('(') {
        Some(p) => p,
        None => return trimmed.to_string(),
    };
    let after_open = &trimmed[open + 1..];
    let close = match find_unquoted_char(after_open, ')', 0) {
        Some(p) => p,
        None => return trimmed.to_string(),
    };
    let inner = &after_open[..close];

    if inner.trim().is_empty() {
        return probes::probe_empty(idx);
    }
    match find_unquoted_char(inner, ',', 0) {
        Some(comma) => {
            let first = &inner[..comma];
            let rest = &inner[comma + 1..];
            format!("print(\"{idx}:\" + str({first}),{rest})")
        }
        None => format!("print(\"{idx}:\" + str({inner}))"),
    }
}
