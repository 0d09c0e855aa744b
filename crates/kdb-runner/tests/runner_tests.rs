use std::fs;

use kdb_core::{DomainName, HostId};
use kdb_runner::{DomainOutcome, HostOutcome, Runner};
use kdb_source::InMemorySource;
use kdb_tree::{PreviousGeneration, RetentionTree};
use tempfile::tempdir;

fn host(s: &str) -> HostId {
    HostId::parse(s).unwrap()
}

fn dom(s: &str) -> DomainName {
    DomainName::parse(s).unwrap()
}

fn runner(root: &std::path::Path, src: &InMemorySource) -> Runner {
    Runner::new(RetentionTree::initialize(root).unwrap(), Box::new(src.clone()))
}

#[test]
fn second_run_rotates_vanished_domains_and_purges_rewritten_ones() {
    let dir = tempdir().unwrap();
    let h = host("kvm1");
    let src = InMemorySource::new()
        .with_domain(&h, &dom("web"), "<web>1</web>")
        .with_domain(&h, &dom("db"), "<db>1</db>");

    let first = runner(dir.path(), &src).run(&[h.clone()]);
    assert!(!first.has_failures());

    src.remove_domain(&h, &dom("db"));
    src.set_domain(&h, &dom("web"), "<web>2</web>");
    let second = runner(dir.path(), &src).run(&[h.clone()]);

    let root = dir.path();
    assert_eq!(fs::read_to_string(root.join("kvm1/web.xml")).unwrap(), "<web>2</web>");
    assert!(!root.join("kvm1/db.xml").exists());
    assert_eq!(fs::read_to_string(root.join("lost/db.xml")).unwrap(), "<db>1</db>");
    assert!(!root.join("lost/web.xml").exists());

    match second.outcome(&h).unwrap() {
        HostOutcome::Completed { quarantined, discarded, domains } => {
            assert_eq!((*quarantined, *discarded), (2, 0));
            assert_eq!(domains, &vec![(dom("web"), DomainOutcome::Written(PreviousGeneration::Changed))]);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(src.open_sessions(), 0);
}

#[test]
fn unreachable_host_is_skipped_and_left_alone() {
    let dir = tempdir().unwrap();
    let (up, down) = (host("up"), host("down"));
    let src = InMemorySource::new()
        .with_domain(&up, &dom("a"), "<a/>")
        .with_domain(&down, &dom("b"), "<b/>");
    runner(dir.path(), &src).run(&[up.clone(), down.clone()]);

    src.set_unreachable(&down, Some("connection refused"));
    let report = runner(dir.path(), &src).run(&[down.clone(), up.clone()]);

    assert!(report.has_failures());
    assert!(matches!(report.outcome(&down), Some(HostOutcome::Skipped(r)) if r.contains("connection refused")));
    assert!(matches!(report.outcome(&up), Some(HostOutcome::Completed { .. })));
    // still current, not rotated into quarantine
    assert_eq!(fs::read_to_string(dir.path().join("down/b.xml")).unwrap(), "<b/>");
    assert!(!dir.path().join("lost/b.xml").exists());
}

#[test]
fn failed_fetch_keeps_previous_generation_recoverable() {
    let dir = tempdir().unwrap();
    let h = host("kvm1");
    let src = InMemorySource::new()
        .with_domain(&h, &dom("ok"), "<ok/>")
        .with_domain(&h, &dom("flaky"), "<flaky>1</flaky>");
    runner(dir.path(), &src).run(&[h.clone()]);

    let src = src.broken_domain(&h, &dom("flaky"));
    let report = runner(dir.path(), &src).run(&[h.clone()]);

    assert!(report.has_failures());
    match report.outcome(&h).unwrap() {
        HostOutcome::Completed { domains, .. } => {
            assert!(domains.iter().any(|(d, o)| *d == dom("flaky") && matches!(o, DomainOutcome::Failed(_))));
            let reason = domains.iter().find_map(|(d, o)| match o {
                DomainOutcome::Failed(r) if *d == dom("flaky") => Some(r.clone()),
                _ => None,
            });
            // context first, then the source error
            let reason = reason.unwrap();
            assert!(reason.starts_with("fetch flaky: "), "{reason}");
            assert!(reason.contains("simulated failure"), "{reason}");
            assert!(domains.iter().any(|(d, o)| *d == dom("ok") && matches!(o, DomainOutcome::Written(_))));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(fs::read_to_string(dir.path().join("lost/flaky.xml")).unwrap(), "<flaky>1</flaky>");
    assert!(dir.path().join("kvm1/ok.xml").exists());
}

#[test]
fn rotation_failure_fails_host_and_closes_session() {
    let dir = tempdir().unwrap();
    let h = host("kvm1");
    let src = InMemorySource::new().with_domain(&h, &dom("vm"), "<vm/>");
    let r = runner(dir.path(), &src);
    fs::remove_dir(dir.path().join("lost")).unwrap();
    fs::write(dir.path().join("lost"), "not a dir").unwrap();

    let report = r.run(&[h.clone()]);
    assert!(matches!(report.outcome(&h), Some(HostOutcome::Failed(_))));
    assert!(!dir.path().join("kvm1").exists());
    assert_eq!(src.open_sessions(), 0);
    assert_eq!(src.opened_total(), 1);
}

#[test]
fn summary_counts_outcomes() {
    let dir = tempdir().unwrap();
    let (a, b) = (host("a"), host("b"));
    let src = InMemorySource::new()
        .with_domain(&a, &dom("x"), "<x/>")
        .with_domain(&a, &dom("y"), "<y/>")
        .unreachable(&b, "timeout");
    let report = runner(dir.path(), &src).run(&[a, b]);
    assert_eq!(
        report.summary(),
        "2 hosts (1 completed, 1 skipped, 0 failed); 2 domains written (2 new or changed), 0 failed"
    );
}
