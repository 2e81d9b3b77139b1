//! Static catalog of named procedures, each a fixed ordered list of
//! subroutines. Mirrors a routing table, not a database — entries are
//! compiled in, per spec.md §4.5's "picks a named Procedure" model.

use cyrus_core::{Procedure, Subroutine};
use std::sync::LazyLock;

fn subroutine(name: &str, description: &str, prompt_path: &str, max_turns: u32, kind: &str) -> Subroutine {
    Subroutine {
        name: name.to_string(),
        description: description.to_string(),
        prompt_path: prompt_path.into(),
        max_turns,
        kind: kind.to_string(),
    }
}

static CATALOG: LazyLock<Vec<Procedure>> = LazyLock::new(|| {
    vec![
        Procedure {
            name: "builder-basic".into(),
            subroutines: vec![subroutine(
                "build",
                "implement the requested change end to end",
                "prompts/builder/build.md",
                40,
                "builder",
            )],
        },
        Procedure {
            name: "debugger-full".into(),
            subroutines: vec![
                subroutine(
                    "reproduce",
                    "reproduce the reported failure",
                    "prompts/debugger/reproduce.md",
                    15,
                    "debugger",
                ),
                subroutine(
                    "diagnose",
                    "locate the root cause",
                    "prompts/debugger/diagnose.md",
                    20,
                    "debugger",
                ),
                subroutine(
                    "fix",
                    "apply and verify a fix",
                    "prompts/debugger/fix.md",
                    20,
                    "debugger",
                ),
            ],
        },
        Procedure {
            name: "debugger-full-controlled".into(),
            subroutines: vec![
                subroutine(
                    "reproduce",
                    "reproduce the reported failure, pausing for operator review",
                    "prompts/debugger/reproduce-controlled.md",
                    15,
                    "debugger",
                ),
                subroutine(
                    "diagnose",
                    "locate the root cause, pausing for operator review",
                    "prompts/debugger/diagnose-controlled.md",
                    20,
                    "debugger",
                ),
                subroutine(
                    "fix",
                    "apply and verify a fix, pausing for operator review",
                    "prompts/debugger/fix-controlled.md",
                    20,
                    "debugger",
                ),
            ],
        },
        Procedure {
            name: "scoper-basic".into(),
            subroutines: vec![subroutine(
                "scope",
                "produce an implementation plan without writing code",
                "prompts/scoper/scope.md",
                10,
                "scoper",
            )],
        },
        Procedure {
            name: "orchestrator-basic".into(),
            subroutines: vec![subroutine(
                "delegate",
                "split the issue into child sessions and track their completion",
                "prompts/orchestrator/delegate.md",
                10,
                "orchestrator",
            )],
        },
    ]
});

/// Look up a procedure by name.
#[must_use]
pub fn get_procedure(name: &str) -> Option<Procedure> {
    CATALOG.iter().find(|p| p.name == name).cloned()
}

/// The default procedure for a classification with no label override.
#[must_use]
pub fn default_procedure_name(classification: cyrus_core::Classification) -> &'static str {
    use cyrus_core::Classification::{Builder, Debugger, Orchestrator, Scoper};
    match classification {
        Debugger => "debugger-full",
        Orchestrator => "orchestrator-basic",
        Builder => "builder-basic",
        Scoper => "scoper-basic",
    }
}

/// Append `-controlled` to `procedure_name` if a controlled variant exists
/// in the catalog, otherwise return it unchanged (spec.md §4.5 control-mode
/// suffix).
#[must_use]
pub fn apply_control_mode(procedure_name: &str) -> String {
    let controlled = format!("{procedure_name}-controlled");
    if get_procedure(&controlled).is_some() {
        controlled
    } else {
        procedure_name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_default_procedure_exists_in_catalog() {
        for classification in [
            cyrus_core::Classification::Debugger,
            cyrus_core::Classification::Orchestrator,
            cyrus_core::Classification::Builder,
            cyrus_core::Classification::Scoper,
        ] {
            let name = default_procedure_name(classification);
            assert!(get_procedure(name).is_some(), "missing catalog entry for {name}");
        }
    }

    #[test]
    fn control_mode_substitutes_registered_variant() {
        assert_eq!(apply_control_mode("debugger-full"), "debugger-full-controlled");
    }

    #[test]
    fn control_mode_is_noop_when_no_variant_registered() {
        assert_eq!(apply_control_mode("builder-basic"), "builder-basic");
    }

    #[test]
    fn unknown_procedure_name_returns_none() {
        assert!(get_procedure("does-not-exist").is_none());
    }
}
