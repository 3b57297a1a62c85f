mod directives;
mod indent;
mod scanner;
mod statements;
mod types;

pub use directives::{parse_directives, Directives};
pub use indent::{ends_with_colon, entry_indent, measure_indent, IndentUnit};
pub use scanner::{
    collect_statement, comment_start, find_last_top_level_in, find_unquoted_char,
    leading_keyword, scan_open_state, strip_comments, StringState,
};
pub use statements::{
    classify, is_branch_keyword, Statement, BARE_PASSTHROUGH, BRANCH_KEYWORDS,
    HEADER_NO_PROBE,
};
pub use types::LogicalStatement;
