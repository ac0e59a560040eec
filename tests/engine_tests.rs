//! Integration tests for declaration, execution and the trace

mod common;
use common::{events, push, quiet_engine, recorded, Collector, Recorder};
use nestest::{Engine, ErrorKind, Options};

mod nesting {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_trace_mirrors_declarations() {
        let mut t = quiet_engine();
        t.test("A", |t| {
            t.test("b", |t| {
                t.assert().eq(1, 2);
                Ok(())
            });
            t.test("c", |t| {
                t.test("d", |t| {
                    t.assert().truthy(false);
                    Ok(())
                });
                Ok(())
            });
            Ok(())
        });
        t.test("E", |t| {
            t.assert().none(Some(1));
            Ok(())
        });
        let stats = t.run(false).unwrap();
        assert_eq!(stats.fail, 3);

        let report = t.report();
        assert_eq!(report.trace.descriptions(), vec!["A", "E"]);
        let paths: Vec<Vec<String>> = report
            .trace
            .all_failures()
            .into_iter()
            .map(|(path, _)| path)
            .collect();
        assert_eq!(
            paths,
            vec![
                vec!["A".to_string(), "b".to_string()],
                vec!["A".to_string(), "c".to_string(), "d".to_string()],
                vec!["E".to_string()],
            ]
        );
    }

    #[test]
    fn test_tests_without_failures_still_appear() {
        let mut t = quiet_engine();
        t.test("quiet", |t| {
            t.test("inner", |_| Ok(()));
            Ok(())
        });
        t.run(false).unwrap();
        let report = t.report();
        let inner = report.trace.at_path(&["quiet", "inner"]).unwrap();
        assert!(inner.is_empty());
    }

    #[test]
    fn test_nested_tests_run_after_body_returns() {
        let log = events();
        let mut t = quiet_engine();
        let outer = log.clone();
        t.test("parent", move |t| {
            push(&outer, "parent start");
            let inner = outer.clone();
            t.test("child", move |_| {
                push(&inner, "child");
                Ok(())
            });
            push(&outer, "parent end");
            Ok(())
        });
        t.run(false).unwrap();
        assert_eq!(recorded(&log), vec!["parent start", "parent end", "child"]);
    }
}

mod hooks {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_hook_order() {
        let log = events();
        let mut t = quiet_engine();
        for (name, kind) in [("before_all", 0), ("before_each", 1), ("after_each", 2), ("after_all", 3)] {
            let log = log.clone();
            let body = move |_: &mut Engine| -> nestest::Outcome {
                push(&log, name);
                Ok(())
            };
            match kind {
                0 => t.before_all(body),
                1 => t.before_each(body),
                2 => t.after_each(body),
                _ => t.after_all(body),
            }
        }
        for name in ["one", "two"] {
            let log = log.clone();
            t.test(name, move |_| {
                push(&log, name);
                Ok(())
            });
        }
        t.run(false).unwrap();
        assert_eq!(
            recorded(&log),
            vec![
                "before_all",
                "before_each",
                "one",
                "after_each",
                "before_each",
                "two",
                "after_each",
                "after_all",
            ]
        );
    }

    #[test]
    fn test_before_each_resets_shared_counter() {
        let mut t = quiet_engine();
        t.test("A", |t| {
            t.before_each(|t| {
                t.set_var("counter", 0_i32);
                Ok(())
            });
            t.test("starts at zero", |t| {
                let counter = t.var::<i32>("counter");
                t.assert().eq(counter, Some(0));
                Ok(())
            });
            t.test("increments", |t| {
                t.with_var::<i32, _>("counter", |counter| *counter += 1);
                let counter = t.var::<i32>("counter");
                t.assert().eq(counter, Some(1));
                Ok(())
            });
            Ok(())
        });
        let stats = t.run(false).unwrap();
        assert_eq!((stats.pass, stats.fail, stats.error), (2, 0, 0));
        let report = t.report();
        assert_eq!(
            report.trace.at_path(&["A"]).unwrap().descriptions(),
            vec!["starts at zero", "increments"]
        );
    }

    #[test]
    fn test_hooks_are_scoped_to_their_suite() {
        let log = events();
        let mut t = quiet_engine();
        let scoped = log.clone();
        t.test("with hook", move |t| {
            let hook = scoped.clone();
            t.before_each(move |_| {
                push(&hook, "hook");
                Ok(())
            });
            t.test("nested", |_| Ok(()));
            Ok(())
        });
        let sibling = log.clone();
        t.test("sibling", move |_| {
            push(&sibling, "sibling");
            Ok(())
        });
        t.run(false).unwrap();
        assert_eq!(recorded(&log), vec!["hook", "sibling"]);
    }

    #[test]
    fn test_failing_hook_does_not_stop_tests() {
        let log = events();
        let mut t = quiet_engine();
        t.before_each(|_| panic!("hook exploded"));
        let ran = log.clone();
        t.test("still runs", move |_| {
            push(&ran, "ran");
            Ok(())
        });
        let stats = t.run(false).unwrap();
        assert_eq!(recorded(&log), vec!["ran"]);
        assert_eq!(stats.error, 1);
        assert!(t.info().unwrap().fail.contains("hook exploded"));
    }
}

mod isolation {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_root_siblings_do_not_share_state() {
        let mut t = quiet_engine();
        t.test("first", |t| {
            t.set_var("leak", "value");
            Ok(())
        });
        t.test("second", |t| {
            let leaked = t.has_var("leak");
            t.assert().falsy(leaked);
            Ok(())
        });
        let stats = t.run(false).unwrap();
        assert_eq!((stats.pass, stats.fail), (1, 0));
    }

    #[test]
    fn test_nested_tests_share_parent_state() {
        let mut t = quiet_engine();
        t.test("parent", |t| {
            t.set_var("n", 0_i32);
            t.test("first", |t| {
                t.with_var::<i32, _>("n", |n| *n += 1);
                Ok(())
            });
            t.test("second", |t| {
                let n = t.var::<i32>("n");
                t.assert().eq(n, Some(1));
                Ok(())
            });
            Ok(())
        });
        let stats = t.run(false).unwrap();
        assert_eq!((stats.pass, stats.fail), (1, 0));
    }

    #[test]
    fn test_explicit_isolation_when_nested() {
        let mut t = quiet_engine();
        t.test("parent", |t| {
            t.set_var("secret", 1_i32);
            t.test_isolated("isolated", |t| {
                let seen = t.has_var("secret");
                t.assert().falsy(seen);
                Ok(())
            });
            t.test("inherits", |t| {
                let seen = t.var::<i32>("secret");
                t.assert().eq(seen, Some(1));
                Ok(())
            });
            Ok(())
        });
        let stats = t.run(false).unwrap();
        assert_eq!((stats.pass, stats.fail), (2, 0));
    }
}

mod stopping {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stop_from_deep_inside_aborts_everything() {
        let log = events();
        let mut t = quiet_engine();
        let root_after = log.clone();
        t.after_each(move |_| {
            push(&root_after, "root after_each");
            Ok(())
        });
        let root_after_all = log.clone();
        t.after_all(move |_| {
            push(&root_after_all, "root after_all");
            Ok(())
        });
        let a = log.clone();
        t.test("A", move |t| {
            t.assert().truthy(true);
            let hook = a.clone();
            t.after_each(move |_| {
                push(&hook, "A after_each");
                Ok(())
            });
            let deep = a.clone();
            t.test("b", move |t| {
                let deep = deep.clone();
                t.test("c", move |t| {
                    t.assert().eq(1, 2);
                    push(&deep, "before stop");
                    t.stop()?;
                    push(&deep, "after stop");
                    Ok(())
                });
                Ok(())
            });
            let sibling = a.clone();
            t.test("sibling", move |_| {
                push(&sibling, "sibling");
                Ok(())
            });
            Ok(())
        });
        let b = log.clone();
        t.test("B", move |_| {
            push(&b, "B");
            Ok(())
        });

        let stats = t.run(false).unwrap();
        assert_eq!(recorded(&log), vec!["before stop"]);
        assert_eq!((stats.pass, stats.fail, stats.error), (1, 1, 0));
        assert!(!t.is_running());

        let report = t.report();
        let c = report.trace.at_path(&["A", "b", "c"]).unwrap();
        assert_eq!(c.failures().count(), 1);
        assert_eq!(report.trace.descriptions(), vec!["A"]);
    }

    #[test]
    fn test_stop_outside_run_is_an_error() {
        let mut t = quiet_engine();
        let err = t.stop().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotRunning);
    }

    #[test]
    fn test_engine_runs_again_after_stop() {
        let mut t = quiet_engine();
        t.test("stops", |t| {
            t.assert().truthy(true);
            t.stop()?;
            Ok(())
        });
        t.run(false).unwrap();
        let stats = t.run(false).unwrap();
        assert_eq!(stats.pass, 1);
        assert_eq!(t.report().trace.descriptions(), vec!["stops"]);
    }
}

mod runs {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_continue_accumulates_and_fresh_run_resets() {
        let mut t = quiet_engine();
        t.test("once", |t| {
            t.assert().truthy(true);
            Ok(())
        });
        assert_eq!(t.run(false).unwrap().pass, 1);
        assert_eq!(t.run(true).unwrap().pass, 2);
        assert_eq!(t.report().trace.descriptions(), vec!["once", "once"]);

        assert_eq!(t.run(false).unwrap().pass, 1);
        assert_eq!(t.report().trace.descriptions(), vec!["once"]);
    }

    #[test]
    fn test_nested_run_is_rejected() {
        let mut t = quiet_engine();
        t.test("outer", |t| {
            let kind = t.run(true).map(|_| ()).map_err(|err| err.kind());
            t.assert().eq(kind, Err::<(), _>(ErrorKind::RunInProgress));
            Ok(())
        });
        let stats = t.run(false).unwrap();
        assert_eq!((stats.pass, stats.fail), (1, 0));
    }

    #[test]
    fn test_stats_match_report() {
        let mut t = quiet_engine();
        t.test("mixed", |t| {
            t.assert().truthy(true);
            t.negate().truthy(true);
            Err(anyhow::anyhow!("and an error"))
        });
        let stats = t.run(false).unwrap();
        let report = t.report();
        assert_eq!(stats, report.stats);
        assert_eq!((stats.pass, stats.fail, stats.error), (1, 1, 1));
        assert!(!report.passed());
    }
}

mod errors {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, thiserror::Error)]
    #[error("disk on fire")]
    struct DiskError;

    fn write_file() -> Result<(), DiskError> {
        Err(DiskError)
    }

    #[test]
    fn test_returned_error_is_recorded() {
        let mut t = quiet_engine();
        t.test("writes", |_| {
            write_file()?;
            Ok(())
        });
        let stats = t.run(false).unwrap();
        assert_eq!(stats.error, 1);
        let failure = t.info().unwrap();
        assert!(failure.is_error());
        assert_eq!(failure.fail, "disk on fire");
        assert!(failure.at.as_deref().unwrap_or_default().contains("engine_tests.rs"));
    }

    #[test]
    fn test_panic_is_recorded_and_siblings_run() {
        let mut t = quiet_engine();
        t.test("panics", |_| panic!("index out of range"));
        t.test("passes", |t| {
            t.assert().truthy(true);
            Ok(())
        });
        let stats = t.run(false).unwrap();
        assert_eq!((stats.pass, stats.error), (1, 1));
        let report = t.report();
        let failure = report.trace.at_path(&["panics"]).unwrap().failures().next().unwrap();
        assert!(failure.fail.contains("index out of range"));
    }

    #[test]
    fn test_nested_tests_declared_before_error_still_run() {
        let log = events();
        let mut t = quiet_engine();
        let parent = log.clone();
        t.test("parent", move |t| {
            let child = parent.clone();
            t.test("child", move |_| {
                push(&child, "child");
                Ok(())
            });
            Err(anyhow::anyhow!("parent failed after declaring"))
        });
        let stats = t.run(false).unwrap();
        assert_eq!(stats.error, 1);
        assert_eq!(recorded(&log), vec!["child"]);
    }

    #[test]
    fn test_stray_throw_is_an_uncaught_error() {
        let mut t = quiet_engine();
        t.test("throws", |_| nestest::throw_bare("nobody listens"));
        let stats = t.run(false).unwrap();
        assert_eq!(stats.error, 1);
        assert!(t.info().unwrap().fail.contains("nobody listens"));
    }
}

mod presentation {
    use super::*;
    use pretty_assertions::assert_eq;

    fn failing_suite(t: &mut Engine) {
        t.test("A", |t| {
            t.test("b", |t| {
                t.set_var("x", 5_i32);
                t.assert().eq(1, 2);
                Ok(())
            });
            Ok(())
        });
    }

    #[test]
    fn test_presenter_sees_qualified_failure() {
        let collector = Collector::default();
        let mut t = Engine::with_options(Options::default());
        t.set_presenter(Box::new(collector.clone()));
        failing_suite(&mut t);
        t.run(false).unwrap();

        let traces = collector.traces.borrow();
        assert_eq!(traces.len(), 1);
        let failures = traces[0].all_failures();
        assert_eq!(failures[0].0, vec!["A", "b"]);
        assert_eq!(failures[0].1.vars["x"], "5");
        assert_eq!(collector.summaries.borrow().len(), 1);
    }

    #[test]
    fn test_quiet_presents_nothing() {
        let collector = Collector::default();
        let mut t = quiet_engine();
        t.set_presenter(Box::new(collector.clone()));
        failing_suite(&mut t);
        t.run(false).unwrap();
        assert!(collector.traces.borrow().is_empty());
        assert!(collector.summaries.borrow().is_empty());
        assert_eq!(t.info().unwrap().fail, "equality test failed");
    }

    #[test]
    fn test_debug_hands_failure_to_inspector() {
        let collector = Collector::default();
        let recorder = Recorder::default();
        let mut t = Engine::with_options(Options::default().with_debug(true));
        t.set_presenter(Box::new(collector.clone()));
        t.set_inspector(Box::new(recorder.clone()));
        failing_suite(&mut t);
        t.run(false).unwrap();

        let traces = collector.traces.borrow();
        let (_, shown) = traces[0].all_failures()[0].clone();
        assert!(shown.vars.is_empty());

        let inspected = recorder.inspected.borrow();
        assert_eq!(inspected.len(), 1);
        assert_eq!(inspected[0].vars["x"], "5");
    }

    #[test]
    fn test_report_json_shape() {
        let mut t = quiet_engine();
        failing_suite(&mut t);
        t.run(false).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&t.report().to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["trace"][0]["A"][0]["b"][0]["fail"], "equality test failed");
        assert_eq!(json["trace"][0]["A"][0]["b"][0]["notes"]["was"], "1");
        assert_eq!(json["stats"]["fail"], 1);
        assert!(json["stats"]["time"].is_number());
    }
}
