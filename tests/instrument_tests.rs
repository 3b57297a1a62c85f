use lineprobe::parser::{
    classify, collect_statement, entry_indent, find_unquoted_char, measure_indent,
    parse_directives, scan_open_state, strip_comments, IndentUnit, Statement, StringState,
};
use lineprobe::{instrument, RunConfig};

fn generate(source: &str) -> String {
    instrument(source, &RunConfig::default()).program
}

// Helper: byte offset of a snippet inside generated text
fn offset_of(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("generated program should contain {:?}", needle))
}

#[cfg(test)]
mod scanner_tests {
    use super::*;

    #[test]
    fn test_bracket_delta_and_string_carry() {
        let (delta, state) = scan_open_state("x = (1 + [2", StringState::None);
        assert_eq!(delta, 2, "two brackets open");
        assert_eq!(state, StringState::None);

        let (delta, state) = scan_open_state("s = 'a # b' + (", StringState::None);
        assert_eq!(delta, 1, "hash inside string must not start a comment");
        assert_eq!(state, StringState::None);

        let (_, state) = scan_open_state("s = \"\"\"open", StringState::None);
        assert_eq!(state, StringState::Triple);

        let (delta, state) = scan_open_state("still inside", StringState::Triple);
        assert_eq!(delta, 0);
        assert_eq!(state, StringState::Triple);

        let (delta, state) = scan_open_state("done\"\"\" + (", StringState::Triple);
        assert_eq!(delta, 1);
        assert_eq!(state, StringState::None);

        let (delta, state) = scan_open_state("x = 1  # ignore (", StringState::None);
        assert_eq!(delta, 0, "brackets inside comments do not count");
        assert_eq!(state, StringState::None);
    }

    #[test]
    fn test_find_unquoted_char() {
        assert_eq!(find_unquoted_char("f(a, b), c", ',', 0), Some(7));
        assert_eq!(find_unquoted_char("'x,y' , z", ',', 0), Some(6));
        assert_eq!(find_unquoted_char("a: b", ':', 0), Some(1));
        assert_eq!(find_unquoted_char("d[1:2]", ':', 0), None);
        assert_eq!(find_unquoted_char("x  # ,", ',', 0), None);
    }

    #[test]
    fn test_statement_fusion_over_brackets() {
        let lines = vec!["total = (1 +", "    2 +", "    3)", "x = 1"];
        let stmt = collect_statement(&lines, 0);
        assert_eq!(stmt.start, 0);
        assert_eq!(stmt.end, 2, "open bracket consumes until balance");
        assert!(stmt.text.contains("2 +"));
        assert!(!stmt.return_led);
    }

    #[test]
    fn test_statement_fusion_backslash_and_triple() {
        let lines = vec!["x = 1 + \\", "    2", "y = 3"];
        let stmt = collect_statement(&lines, 0);
        assert_eq!(stmt.end, 1, "backslash continues the statement");

        let lines = vec!["s = \"\"\"a", "b\"\"\"", "z = 1"];
        let stmt = collect_statement(&lines, 0);
        assert_eq!(stmt.end, 1, "triple-quoted string spans lines");
    }

    #[test]
    fn test_unterminated_bracket_consumes_to_eof() {
        let lines = vec!["x = (1,", "2"];
        let stmt = collect_statement(&lines, 0);
        assert_eq!(stmt.end, 1, "unbalanced bracket at EOF never panics");
    }

    #[test]
    fn test_strip_comments() {
        assert_eq!(strip_comments("x = 1  # note"), "x = 1");
        assert_eq!(strip_comments("s = '#not' # real"), "s = '#not'");
        assert_eq!(strip_comments("a = (1, # one\n       2)"), "a = (1,\n       2)");
    }
}

#[cfg(test)]
mod indent_tests {
    use super::*;

    #[test]
    fn test_measure_indent() {
        assert_eq!(measure_indent("        x", IndentUnit::Spaces(4)), 2);
        assert_eq!(measure_indent("   x", IndentUnit::Spaces(4)), 0);
        assert_eq!(measure_indent("  x", IndentUnit::Spaces(2)), 1);
        assert_eq!(measure_indent("\t\tx", IndentUnit::Tab), 2);
        assert_eq!(measure_indent("x", IndentUnit::Tab), 0);
    }

    #[test]
    fn test_entry_indent_predicts_block_level() {
        assert_eq!(entry_indent("    if x:  # c", IndentUnit::Spaces(4), false), 2);
        assert_eq!(entry_indent("    if x:  # c", IndentUnit::Spaces(4), true), 1);
        assert_eq!(entry_indent("x = 1", IndentUnit::Spaces(4), false), 0);
    }
}

#[cfg(test)]
mod recognizer_tests {
    use super::*;

    #[test]
    fn test_assignment_forms() {
        assert_eq!(
            classify("x = 5"),
            Statement::Assignment {
                target: "x".to_string()
            }
        );
        assert_eq!(
            classify("self.total = 5"),
            Statement::Assignment {
                target: "self.total".to_string()
            }
        );
        assert_eq!(classify("x == 5"), Statement::Plain, "comparison is not assignment");
        assert_eq!(classify("data[0] = 5"), Statement::Plain, "subscript targets fall through");
        assert_eq!(
            classify("count: int = 0"),
            Statement::TypedAssignment {
                target: "count".to_string()
            }
        );
    }

    #[test]
    fn test_augmented_assignment() {
        assert_eq!(
            classify("x += f()"),
            Statement::AugmentedAssignment {
                target: "x".to_string(),
                op: '+',
                rhs: "f()".to_string()
            }
        );
        assert_eq!(classify("x //= 2"), Statement::Plain, "only + - * / are augmented forms");
    }

    #[test]
    fn test_headers_and_keywords() {
        assert_eq!(classify("print(x)"), Statement::PrintCall);
        assert_eq!(
            classify("for i in range(3):"),
            Statement::ForHeader {
                iterable: "range(3)".to_string()
            }
        );
        assert_eq!(
            classify("for x in [v for v in vals]:"),
            Statement::ForHeader {
                iterable: "[v for v in vals]".to_string()
            },
            "nested comprehension `in` is not top-level"
        );
        assert_eq!(
            classify("return a + b"),
            Statement::ReturnStatement {
                value: Some("a + b".to_string())
            }
        );
        assert_eq!(classify("return"), Statement::ReturnStatement { value: None });
        assert_eq!(
            classify("else:"),
            Statement::CompoundHeader {
                keyword: Some("else".to_string())
            }
        );
        assert_eq!(classify("break"), Statement::BareKeyword);
    }

    #[test]
    fn test_def_signature() {
        assert_eq!(
            classify("def add(a, b=2):"),
            Statement::DefHeader {
                name: "add".to_string(),
                params: vec!["a".to_string(), "b".to_string()]
            }
        );
        assert_eq!(
            classify("def method(self, x: int = 1):"),
            Statement::DefHeader {
                name: "method".to_string(),
                params: vec!["x".to_string()]
            },
            "leading self, annotations and defaults are stripped"
        );
    }

    #[test]
    fn test_inline_compound_split() {
        assert_eq!(
            classify("if x: y = 1"),
            Statement::InlineCompound {
                head: "if x".to_string(),
                body: "y = 1".to_string()
            }
        );
        assert_eq!(
            classify("x: int"),
            Statement::Plain,
            "a bare annotation is not an inline compound"
        );
    }
}

#[cfg(test)]
mod directive_tests {
    use super::*;

    #[test]
    fn test_mock_and_limit_compose() {
        let d = parse_directives("x = input()  # mock(42) limit(5)");
        assert_eq!(d.mock.as_deref(), Some("42"));
        assert_eq!(d.limit, Some(5));

        let d = parse_directives("x = input()  # limit(3) mock('y')");
        assert_eq!(d.mock.as_deref(), Some("'y'"));
        assert_eq!(d.limit, Some(3));
    }

    #[test]
    fn test_spacing_and_nesting() {
        let d = parse_directives("x = input()  # mock ('a b')");
        assert_eq!(d.mock.as_deref(), Some("'a b'"));

        let d = parse_directives("f()  # mock(g(1, 2))");
        assert_eq!(d.mock.as_deref(), Some("g(1, 2)"));

        assert!(parse_directives("x = 1  # plain comment").is_empty());
    }
}

#[cfg(test)]
mod rewriter_tests {
    use super::*;

    #[test]
    fn test_empty_line_yields_single_probe() {
        let program = generate("\n");
        assert_eq!(
            program.matches("print(\"0:\")").count(),
            1,
            "an empty line gets exactly one empty probe"
        );
    }

    #[test]
    fn test_assignment_probed_after_execution() {
        let program = generate("x = 5");
        let code_at = offset_of(&program, "x = 5");
        let probe_at = offset_of(&program, "print(\"0:\" + str(x))");
        assert!(code_at < probe_at, "value is probed after the assignment runs");
    }

    #[test]
    fn test_augmented_assignment_hoists_rhs_once() {
        let program = generate("x = 1\nx += 2");
        let tmp_at = offset_of(&program, "_probe_aug1 = (2)");
        let probe_at = offset_of(&program, "print(\"1:\" + str((x + _probe_aug1)))");
        let mutate_at = offset_of(&program, "x += _probe_aug1");
        assert!(tmp_at < probe_at, "rhs is evaluated before the probe");
        assert!(probe_at < mutate_at, "probe comes before the mutation");
    }

    #[test]
    fn test_print_splice() {
        let program = generate("print(\"hi\", 99)");
        assert!(program.contains("print(\"0:\" + str(\"hi\"), 99)"));

        let program = generate("print(x)");
        assert!(program.contains("print(\"0:\" + str(x))"));

        let program = generate("print()");
        assert!(program.contains("print(\"0:\")"));
    }

    #[test]
    fn test_for_header_probes_iterable() {
        let program = generate("for i in range(3):\n    pass");
        assert!(program.contains("print(\"0:\" + str((range(3))))"));
        assert!(program.contains("_probe_register(\"0\")"));
        assert!(program.contains("    _probe_enter(\"0\")"));
        assert!(program.contains("    pass"), "pass body passes through unprobed");
    }

    #[test]
    fn test_if_preregisters_siblings() {
        let source = "if x > 1:\n    y = 1\nelse:\n    y = 2";
        let program = generate(source);
        let reg_if = offset_of(&program, "_probe_register(\"0\")");
        let reg_else = offset_of(&program, "_probe_register(\"2\")");
        let header = offset_of(&program, "if x > 1:");
        assert!(
            reg_if < header && reg_else < header,
            "else marker is pre-registered at the if header"
        );
        let else_at = offset_of(&program, "else:");
        let enter_else = offset_of(&program, "_probe_enter(\"2\")");
        assert!(else_at < enter_else, "counter bumps at the top of the else body");
    }

    #[test]
    fn test_return_hoists_interior_probes() {
        let source = "def f():\n    return (1 +\n            2)";
        let program = generate(source);
        let interior = offset_of(&program, "print(\"2:\")");
        let value = offset_of(&program, "print(\"1:\" + str((");
        let ret = offset_of(&program, "return (1 +");
        assert!(
            interior < value && value < ret,
            "nothing may execute after the return"
        );
    }

    #[test]
    fn test_def_params_probed() {
        let program = generate("def add(a, b=1):\n    return a + b");
        assert!(program.contains("print(\"0:a: \" + str(a))"));
        assert!(program.contains("print(\"0:b: \" + str(b))"));
    }

    #[test]
    fn test_input_is_mocked_and_guarded() {
        let program = generate("x = input()  # mock(42)");
        assert!(program.contains("x = 42"), "the blocking call is replaced");
        assert!(!program.contains("input("), "the real input call must be gone");
        assert!(program.contains("_probe_guard(\"s1\", 100, 0)"));
    }

    #[test]
    fn test_input_defaults_to_empty_string() {
        let program = generate("name = input(\"who? \")");
        assert!(program.contains("name = \"\""));
        assert!(!program.contains("input(\"who? \")"));
    }

    #[test]
    fn test_limit_directive_overrides_guard() {
        let program = generate("do_thing()  # limit(2)");
        assert!(program.contains("_probe_guard(\"s1\", 2, 0)"));
        assert!(program.contains("do_thing()"));
    }

    #[test]
    fn test_mocked_def_gets_shadow_clone() {
        let source = "def add(a, b):  # mock(1, 2)\n    return a + b";
        let program = generate(source);
        assert!(program.contains("def add(a, b):"), "the real def survives");
        assert!(program.contains("def _probe_mock"));
        assert!(program.contains("(1, 2)"), "the shadow is invoked with mock args");
    }

    #[test]
    fn test_inline_compound_indents_body() {
        let program = generate("if x: y = 1");
        assert!(program.contains("if x:"));
        assert!(program.contains("    y = 1"));
        assert!(program.contains("    print(\"0:\" + str(y))"));
        assert!(program.contains("    _probe_enter(\"0\")"));
    }

    #[test]
    fn test_tab_mode_renders_tabs() {
        let mut config = RunConfig::default();
        config.indent_mode = lineprobe::config::IndentMode::Tabs;
        let program = instrument("if x:\n\ty = 1", &config).program;
        assert!(program.contains("\t_probe_enter(\"0\")"));
        assert!(program.contains("\ty = 1"));
    }
}

#[cfg(test)]
mod linemap_tests {
    use super::*;
    use lineprobe::instrument::LineIndexMap;

    #[test]
    fn test_pre_run_map_inherits_last_probe() {
        let generated = instrument("x = 5\ny = x", &RunConfig::default());
        let lines: Vec<&str> = generated.program.lines().collect();

        let probe0 = lines
            .iter()
            .position(|l| l.contains("print(\"0:\""))
            .expect("probe for line 0");
        assert_eq!(generated.line_map.get(probe0), Some(0));

        let second = lines
            .iter()
            .position(|l| l.trim() == "y = x")
            .expect("second assignment");
        assert_eq!(
            generated.line_map.get(second),
            Some(0),
            "a plain generated line inherits the most recent probe target"
        );
    }

    #[test]
    fn test_resolve_falls_back_to_identity() {
        let map = LineIndexMap::default();
        assert_eq!(map.resolve(7), 7);
    }

    #[test]
    fn test_post_run_map_from_chunk_tags() {
        let chunks = ["3:a", "nonsense", "1:b"];
        let map = LineIndexMap::from_output(chunks.iter().copied());
        assert_eq!(map.get(0), Some(3));
        assert_eq!(map.get(1), None, "untagged chunks stay unset");
        assert_eq!(map.get(2), Some(1));
        assert_eq!(map.resolve(1), 1);
    }
}

#[cfg(test)]
mod fuser_tests {
    use lineprobe::harness::fuse;

    fn chunks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_and_drop_empty() {
        let results = fuse(&chunks(&["2:a", "2:b", "5:"]));
        assert_eq!(results.len(), 1, "the empty payload entry is dropped");
        assert_eq!(results[0].line, 2);
        assert_eq!(results[0].value, "a b");
        assert!(!results[0].is_error);
    }

    #[test]
    fn test_exact_duplicates_collapse() {
        let results = fuse(&chunks(&["1:x\n", "1:x\n", "1:y\n"]));
        assert_eq!(results[0].value, "x y");
    }

    #[test]
    fn test_multiline_payload_is_escaped() {
        let results = fuse(&chunks(&["0:multi\nline\n"]));
        assert_eq!(results[0].value, "multi\\nline");
    }

    #[test]
    fn test_untagged_chunks_are_unattributed() {
        let results = fuse(&chunks(&["garbage", "3:v"]));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].line, 3);

        assert!(fuse(&chunks(&["no tags here"])).is_empty());
    }
}

#[cfg(test)]
mod stream_tests {
    use lineprobe::harness::ChunkDemuxer;

    #[test]
    fn test_tail_rejoined_across_chunk_boundary() {
        let mut demux = ChunkDemuxer::new();
        demux.push("2:he");
        demux.push("llo\n3:x");
        assert_eq!(demux.chunks(), &["2:hello\n".to_string()]);

        let chunks = demux.finish();
        assert_eq!(chunks, vec!["2:hello\n".to_string(), "3:x".to_string()]);
    }

    #[test]
    fn test_split_only_at_tag_boundaries() {
        let mut demux = ChunkDemuxer::new();
        demux.push("0:line one\nstill line one\n1:two\n");
        let chunks = demux.finish();
        assert_eq!(
            chunks,
            vec![
                "0:line one\nstill line one\n".to_string(),
                "1:two\n".to_string()
            ],
            "untagged continuation text belongs to the previous chunk"
        );
    }

    #[test]
    fn test_digits_split_across_arrivals() {
        let mut demux = ChunkDemuxer::new();
        demux.push("1:a\n1");
        demux.push("2:b\n");
        let chunks = demux.finish();
        assert_eq!(chunks, vec!["1:a\n".to_string(), "12:b\n".to_string()]);
    }
}

#[cfg(test)]
mod stderr_tests {
    use lineprobe::harness::{classify_stderr, StderrReport};

    #[test]
    fn test_guard_marker_extraction() {
        let report = classify_stderr("RuntimeError: ClemExcep7: call limit of 2 reached\n");
        assert_eq!(
            report,
            StderrReport::Guard {
                line: 7,
                message: "call limit of 2 reached".to_string()
            }
        );
    }

    #[test]
    fn test_traceback_innermost_frame_wins() {
        let text = "Traceback (most recent call last):\n  File \"<string>\", line 12, in <module>\n  File \"<string>\", line 42, in f\nZeroDivisionError: division by zero\n";
        match classify_stderr(text) {
            StderrReport::Runtime { gen_line, message } => {
                assert_eq!(gen_line, Some(42));
                assert_eq!(message, "ZeroDivisionError: division by zero");
            }
            other => panic!("expected runtime report, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_stderr_is_quiet() {
        assert_eq!(classify_stderr("  \n"), StderrReport::Quiet);
    }
}

#[cfg(test)]
mod orchestrator_tests {
    use std::time::Duration;

    use lineprobe::{DocumentSessionRegistry, LineResult};

    #[test]
    fn test_new_run_supersedes_in_flight() {
        let registry = DocumentSessionRegistry::new(Duration::ZERO);

        let first = registry.begin_run("doc.py").expect("first run starts");
        let second = registry.begin_run("doc.py").expect("second run starts");

        assert!(first.cancel.is_cancelled(), "starting a run cancels the previous one");
        assert!(!second.cancel.is_cancelled());

        let stale = vec![LineResult {
            line: 0,
            value: "stale".to_string(),
            is_error: false,
        }];
        assert!(
            !registry.commit("doc.py", first.token, stale),
            "a superseded run must not commit"
        );

        let fresh = vec![LineResult {
            line: 0,
            value: "fresh".to_string(),
            is_error: false,
        }];
        assert!(registry.commit("doc.py", second.token, fresh.clone()));
        assert_eq!(registry.results("doc.py"), Some(fresh));
    }

    #[test]
    fn test_debounce_window_suppresses_rapid_runs() {
        let registry = DocumentSessionRegistry::new(Duration::from_secs(60));
        assert!(registry.begin_run("doc.py").is_some());
        assert!(
            registry.begin_run("doc.py").is_none(),
            "second run inside the window is suppressed"
        );
        assert!(
            registry.begin_run("other.py").is_some(),
            "documents are independent"
        );
    }
}
