/// Runtime support prepended to every generated program: call-count
/// guards, branch-entry bookkeeping and the exit hook that reports
/// never-executed branches.
///
/// Branch keys are original line indices as strings; the exit hook prints
/// `<key>:!!! Never runs` for a registered branch whose counter stayed at
/// zero and `<key>:<count> iterations` otherwise, both in the normal probe
/// wire format.
pub const PREAMBLE: &str = r#"_probe_branches = {}
_probe_calls = {}
def _probe_register(key):
    if key not in _probe_branches:
        _probe_branches[key] = 0
def _probe_enter(key):
    _probe_branches[key] = _probe_branches.get(key, 0) + 1
def _probe_guard(site, limit, line):
    _probe_calls[site] = _probe_calls.get(site, 0) + 1
    if _probe_calls[site] > limit:
        raise RuntimeError("ClemExcep" + str(line) + ": call limit of " + str(limit) + " reached")
def _probe_flush():
    for _probe_key in _probe_branches:
        if _probe_branches[_probe_key] == 0:
            print(_probe_key + ":!!! Never runs")
        else:
            print(_probe_key + ":" + str(_probe_branches[_probe_key]) + " iterations")
import atexit
atexit.register(_probe_flush)
"#;
